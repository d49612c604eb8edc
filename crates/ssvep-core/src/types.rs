//! Sample and window containers for multi-channel EEG data

use crate::error::{SsvepError, SsvepResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One timestamped multi-channel sample, immutable once appended.
///
/// `values` holds one amplitude per configured logical channel, in fixed
/// channel order. Degraded channels carry 0.0.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Seconds since Unix epoch, assigned at chunk arrival
    pub timestamp: f64,
    /// One value per logical channel, fixed order
    pub values: Vec<f32>,
}

impl Sample {
    pub fn new(timestamp: f64, values: Vec<f32>) -> Self {
        Self { timestamp, values }
    }
}

/// Immutable channel-major snapshot of recent samples.
///
/// Produced by `SampleBuffer::recent`; scoped to one classification cycle.
/// Channel `c` occupies `data[c * samples .. (c + 1) * samples]`.
#[derive(Debug, Clone)]
pub struct Window {
    /// Unique identifier for this snapshot
    pub id: Uuid,
    data: Vec<f32>,
    channels: usize,
    samples: usize,
    sampling_rate: f32,
    /// Timestamp of the oldest sample in the window
    pub start_timestamp: f64,
    /// Timestamp of the newest sample in the window
    pub end_timestamp: f64,
}

impl Window {
    /// Create a window from channel-major data.
    pub fn new(
        data: Vec<f32>,
        channels: usize,
        samples: usize,
        sampling_rate: f32,
        start_timestamp: f64,
        end_timestamp: f64,
    ) -> SsvepResult<Self> {
        if channels == 0 || sampling_rate <= 0.0 {
            return Err(SsvepError::InvalidConfig {
                message: "window requires at least one channel and a positive sampling rate"
                    .to_string(),
            });
        }
        if data.len() != channels * samples {
            return Err(SsvepError::InvalidConfig {
                message: format!(
                    "window data length {} does not match {} channels x {} samples",
                    data.len(),
                    channels,
                    samples
                ),
            });
        }
        Ok(Window {
            id: Uuid::new_v4(),
            data,
            channels,
            samples,
            sampling_rate,
            start_timestamp,
            end_timestamp,
        })
    }

    /// Build a window from per-channel series of equal length.
    pub fn from_channels(
        series: Vec<Vec<f32>>,
        sampling_rate: f32,
        start_timestamp: f64,
        end_timestamp: f64,
    ) -> SsvepResult<Self> {
        let channels = series.len();
        let samples = series.first().map(|s| s.len()).unwrap_or(0);
        if series.iter().any(|s| s.len() != samples) {
            return Err(SsvepError::InvalidConfig {
                message: "all channel series must have equal length".to_string(),
            });
        }
        let mut data = Vec::with_capacity(channels * samples);
        for channel in &series {
            data.extend_from_slice(channel);
        }
        Window::new(data, channels, samples, sampling_rate, start_timestamp, end_timestamp)
    }

    /// Number of channels
    pub fn channel_count(&self) -> usize {
        self.channels
    }

    /// Samples per channel
    pub fn samples_per_channel(&self) -> usize {
        self.samples
    }

    /// Sampling rate in Hz
    pub fn sampling_rate(&self) -> f32 {
        self.sampling_rate
    }

    /// Window duration in seconds
    pub fn duration(&self) -> f32 {
        self.samples as f32 / self.sampling_rate
    }

    pub fn is_empty(&self) -> bool {
        self.samples == 0
    }

    /// Time series for one channel
    pub fn channel(&self, index: usize) -> SsvepResult<&[f32]> {
        if index >= self.channels {
            return Err(SsvepError::ChannelOutOfBounds {
                index,
                count: self.channels,
            });
        }
        Ok(&self.data[index * self.samples..(index + 1) * self.samples])
    }

    /// All channel series as slices
    pub fn all_channels(&self) -> Vec<&[f32]> {
        (0..self.channels)
            .map(|c| &self.data[c * self.samples..(c + 1) * self.samples])
            .collect()
    }

    /// Cross-channel mean series, one value per time sample
    pub fn channel_average(&self) -> Vec<f32> {
        if self.samples == 0 {
            return Vec::new();
        }
        let mut avg = vec![0.0f32; self.samples];
        for c in 0..self.channels {
            let series = &self.data[c * self.samples..(c + 1) * self.samples];
            for (acc, &v) in avg.iter_mut().zip(series) {
                *acc += v;
            }
        }
        let scale = 1.0 / self.channels as f32;
        for v in avg.iter_mut() {
            *v *= scale;
        }
        avg
    }

    /// Copy of this window with every value multiplied by `factor`.
    ///
    /// Used for raw-to-microvolt conversion at snapshot time.
    pub fn scaled(&self, factor: f32) -> Window {
        if factor == 1.0 {
            return self.clone();
        }
        Window {
            id: Uuid::new_v4(),
            data: self.data.iter().map(|v| v * factor).collect(),
            channels: self.channels,
            samples: self.samples,
            sampling_rate: self.sampling_rate,
            start_timestamp: self.start_timestamp,
            end_timestamp: self.end_timestamp,
        }
    }

    /// Basic statistics for one channel
    pub fn channel_stats(&self, index: usize) -> SsvepResult<ChannelStats> {
        Ok(ChannelStats::calculate(self.channel(index)?))
    }
}

/// Basic statistics for a single channel series
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelStats {
    pub mean: f32,
    pub std_dev: f32,
    pub rms: f32,
    pub min: f32,
    pub max: f32,
    pub peak_to_peak: f32,
    pub max_abs: f32,
}

impl ChannelStats {
    pub fn calculate(data: &[f32]) -> Self {
        if data.is_empty() {
            return Self {
                mean: 0.0,
                std_dev: 0.0,
                rms: 0.0,
                min: 0.0,
                max: 0.0,
                peak_to_peak: 0.0,
                max_abs: 0.0,
            };
        }

        let n = data.len() as f32;
        let mean = data.iter().sum::<f32>() / n;
        let variance = data.iter().map(|x| (x - mean).powi(2)).sum::<f32>() / n;
        let rms = (data.iter().map(|x| x * x).sum::<f32>() / n).sqrt();
        let min = data.iter().fold(f32::INFINITY, |a, &b| a.min(b));
        let max = data.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));
        let max_abs = data.iter().fold(0.0f32, |a, &b| a.max(b.abs()));

        Self {
            mean,
            std_dev: variance.sqrt(),
            rms,
            min,
            max,
            peak_to_peak: max - min,
            max_abs,
        }
    }
}
