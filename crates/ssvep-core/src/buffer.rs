//! Bounded ring buffer at the acquisition/consumption boundary
//!
//! Single writer (the device chunk callback), many readers (classification
//! cycles). The ring is an explicit slot array with a wrapping write index;
//! insertion beyond capacity evicts the oldest sample. Readers copy out
//! under the same short-held lock the writer uses, so a snapshot can never
//! observe a torn sample and neither side blocks the other for longer than
//! one copy.

use crate::error::{SsvepError, SsvepResult};
use crate::types::{Sample, Window};
use std::sync::{Arc, Mutex};

/// Explicit fixed-capacity ring: slot array plus wrapping write index.
#[derive(Debug)]
struct Ring {
    slots: Vec<Sample>,
    capacity: usize,
    next: usize,
}

impl Ring {
    fn new(capacity: usize) -> Self {
        Ring {
            slots: Vec::with_capacity(capacity),
            capacity,
            next: 0,
        }
    }

    fn len(&self) -> usize {
        self.slots.len()
    }

    fn push(&mut self, sample: Sample) {
        if self.slots.len() < self.capacity {
            self.slots.push(sample);
        } else {
            self.slots[self.next] = sample;
        }
        self.next = (self.next + 1) % self.capacity;
    }

    /// Copy of the `n` most recent samples, oldest first.
    fn tail(&self, n: usize) -> Vec<Sample> {
        let len = self.slots.len();
        let n = n.min(len);
        let mut out = Vec::with_capacity(n);
        if len < self.capacity {
            out.extend_from_slice(&self.slots[len - n..]);
        } else {
            // Oldest sample sits at the write index once the ring is full
            for i in 0..n {
                let idx = (self.next + (len - n) + i) % self.capacity;
                out.push(self.slots[idx].clone());
            }
        }
        out
    }

    fn newest_timestamp(&self) -> Option<f64> {
        if self.slots.is_empty() {
            return None;
        }
        let idx = if self.slots.len() < self.capacity {
            self.slots.len() - 1
        } else {
            (self.next + self.capacity - 1) % self.capacity
        };
        Some(self.slots[idx].timestamp)
    }
}

struct BufferInner {
    ring: Mutex<Ring>,
    channels: usize,
    sampling_rate: f32,
    capacity: usize,
}

/// Shared handle to the sample ring. Cloning is cheap; the acquisition
/// callback holds one clone as the sole writer, consumers hold others.
#[derive(Clone)]
pub struct SampleBuffer {
    inner: Arc<BufferInner>,
}

impl SampleBuffer {
    /// Create a buffer holding `buffer_seconds` of data at `sampling_rate`.
    pub fn new(channels: usize, sampling_rate: f32, buffer_seconds: f32) -> SsvepResult<Self> {
        if channels == 0 {
            return Err(SsvepError::InvalidConfig {
                message: "buffer requires at least one channel".to_string(),
            });
        }
        if sampling_rate <= 0.0 || buffer_seconds <= 0.0 {
            return Err(SsvepError::InvalidConfig {
                message: "sampling rate and buffer length must be positive".to_string(),
            });
        }
        let capacity = (sampling_rate * buffer_seconds) as usize;
        if capacity == 0 {
            return Err(SsvepError::InvalidConfig {
                message: "buffer capacity rounds to zero samples".to_string(),
            });
        }
        Ok(SampleBuffer {
            inner: Arc::new(BufferInner {
                ring: Mutex::new(Ring::new(capacity)),
                channels,
                sampling_rate,
                capacity,
            }),
        })
    }

    /// Append one sample, evicting the oldest when full. O(1); the lock is
    /// held only for the slot write so the acquisition callback returns
    /// promptly.
    pub fn append(&self, mut sample: Sample) {
        // Short rows are padded with zeros rather than rejected; the writer
        // path must never fail.
        if sample.values.len() != self.inner.channels {
            sample.values.resize(self.inner.channels, 0.0);
        }
        let mut ring = self.inner.ring.lock().expect("sample ring poisoned");
        ring.push(sample);
    }

    /// Snapshot of up to the last `seconds` of data as a channel-major
    /// window, oldest sample first.
    ///
    /// Returns `InsufficientData` while the buffer holds less than half a
    /// second of samples, the minimum for any useful frequency resolution
    /// at the target bands.
    pub fn recent(&self, seconds: f32) -> SsvepResult<Window> {
        let required = (self.inner.sampling_rate * 0.5) as usize;
        let samples = {
            let ring = self.inner.ring.lock().expect("sample ring poisoned");
            if ring.len() < required.max(1) {
                return Err(SsvepError::InsufficientData {
                    available: ring.len(),
                    required: required.max(1),
                });
            }
            let wanted = (seconds * self.inner.sampling_rate) as usize;
            ring.tail(wanted)
        };

        let n = samples.len();
        let channels = self.inner.channels;
        let mut data = vec![0.0f32; channels * n];
        for (i, sample) in samples.iter().enumerate() {
            for (c, &v) in sample.values.iter().enumerate().take(channels) {
                data[c * n + i] = v;
            }
        }
        let start = samples.first().map(|s| s.timestamp).unwrap_or(0.0);
        let end = samples.last().map(|s| s.timestamp).unwrap_or(0.0);
        Window::new(data, channels, n, self.inner.sampling_rate, start, end)
    }

    /// Timestamp of the newest buffered sample. A caller watching this
    /// value stall detects device silence; the core does not.
    pub fn newest_timestamp(&self) -> Option<f64> {
        self.inner.ring.lock().expect("sample ring poisoned").newest_timestamp()
    }

    pub fn len(&self) -> usize {
        self.inner.ring.lock().expect("sample ring poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    pub fn channel_count(&self) -> usize {
        self.inner.channels
    }

    pub fn sampling_rate(&self) -> f32 {
        self.inner.sampling_rate
    }

    /// Discard all buffered samples, keeping capacity.
    pub fn clear(&self) {
        let mut ring = self.inner.ring.lock().expect("sample ring poisoned");
        *ring = Ring::new(self.inner.capacity);
    }
}
