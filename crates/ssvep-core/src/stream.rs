//! Live EEG stream: device callback into the sample ring
//!
//! Wires a `ChannelMap` and a `SampleBuffer` to an `EegDevice`. The
//! installed callback runs on the device's acquisition thread: it maps
//! stream columns to logical channel order, zero-fills degraded channels,
//! appends, and returns. Stream columns are only queryable once streaming
//! has started, so the callback reads them through a shared slot that
//! `connect` fills in after `start_stream`.

use crate::buffer::SampleBuffer;
use crate::channel_map::ChannelMap;
use crate::device::EegDevice;
use crate::error::{SsvepError, SsvepResult};
use crate::types::{Sample, Window};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, warn};

/// Acquisition-side configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Requested logical channels, in output order
    pub channels: Vec<String>,
    /// Optional name-to-physical-index table; defaults to the CAP layout
    pub channel_mapping: Option<HashMap<String, usize>>,
    /// Nominal sampling rate in Hz
    pub sampling_rate: f32,
    /// Ring capacity in seconds
    pub buffer_seconds: f32,
    /// Raw-unit to microvolt conversion applied at snapshot time
    pub raw_to_uv_scale: f32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            channels: vec!["O1".to_string(), "O2".to_string()],
            channel_mapping: None,
            sampling_rate: 250.0,
            buffer_seconds: 60.0,
            raw_to_uv_scale: 1.0,
        }
    }
}

/// Live buffered EEG stream fed by a device callback
pub struct EegStream {
    config: StreamConfig,
    map: ChannelMap,
    buffer: SampleBuffer,
    /// Stream column per logical channel, shared with the callback.
    /// Filled after streaming starts; `None` entries are zero-filled.
    columns: Arc<Mutex<Vec<Option<usize>>>>,
    connected: bool,
}

impl EegStream {
    pub fn new(config: StreamConfig) -> SsvepResult<Self> {
        if config.sampling_rate <= 0.0 {
            return Err(SsvepError::InvalidConfig {
                message: "sampling rate must be positive".to_string(),
            });
        }
        let map = ChannelMap::new(&config.channels, config.channel_mapping.as_ref())?;
        let buffer = SampleBuffer::new(map.len(), config.sampling_rate, config.buffer_seconds)?;
        let columns = Arc::new(Mutex::new(vec![None; map.len()]));
        Ok(EegStream {
            config,
            map,
            buffer,
            columns,
            connected: false,
        })
    }

    /// Enable channels, install the chunk callback, start streaming and
    /// resolve stream columns. Degraded channels are surfaced as warnings,
    /// never as failures.
    pub fn connect(&mut self, device: &mut dyn EegDevice) -> SsvepResult<()> {
        if self.connected {
            return Ok(());
        }
        for physical in self.map.physical_indices() {
            if let Err(e) = device.set_channel_enabled(physical, true) {
                warn!(physical, error = %e, "channel enable failed");
            }
        }

        device.set_chunk_callback(make_chunk_callback(
            self.buffer.clone(),
            Arc::clone(&self.columns),
            self.config.sampling_rate,
        ));

        device.start_stream()?;

        // Column assignment is only defined once the device is streaming
        self.map.resolve_columns(device);
        {
            let mut columns = self.columns.lock().expect("column table poisoned");
            *columns = self.map.columns();
        }

        let degraded = self.map.degraded_channels();
        if !degraded.is_empty() {
            warn!(channels = ?degraded, "degraded channels will be zero-filled");
        }
        info!(channels = self.map.len(), rate = self.config.sampling_rate, "eeg stream connected");
        self.connected = true;
        Ok(())
    }

    /// Unregister from the device and stop the stream. Buffered data stays
    /// valid for in-flight classification cycles; it simply stops growing.
    pub fn disconnect(&mut self, device: &mut dyn EegDevice) -> SsvepResult<()> {
        if !self.connected {
            return Ok(());
        }
        if device.is_streaming() {
            device.stop_stream()?;
        }
        self.connected = false;
        info!("eeg stream disconnected");
        Ok(())
    }

    /// Snapshot of the last `seconds` of data with its channel order.
    /// Values are scaled to microvolts when a conversion factor is set.
    pub fn recent(&self, seconds: f32) -> SsvepResult<(Window, Vec<String>)> {
        let window = self.buffer.recent(seconds)?;
        let window = if self.config.raw_to_uv_scale != 1.0 {
            window.scaled(self.config.raw_to_uv_scale)
        } else {
            window
        };
        Ok((window, self.map.channel_names()))
    }

    /// Reader handle to the underlying buffer.
    pub fn buffer(&self) -> SampleBuffer {
        self.buffer.clone()
    }

    pub fn channel_map(&self) -> &ChannelMap {
        &self.map
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Timestamp of the newest buffered sample; stalls under device silence.
    pub fn newest_timestamp(&self) -> Option<f64> {
        self.buffer.newest_timestamp()
    }
}

/// Build the acquisition callback. Chunk values are copied into logical
/// channel order; any unmapped column is a zero write, never a lookup
/// failure that could stall the device thread.
fn make_chunk_callback(
    writer: SampleBuffer,
    columns: Arc<Mutex<Vec<Option<usize>>>>,
    sampling_rate: f32,
) -> Box<dyn FnMut(&[Vec<f32>], usize) + Send> {
    let dt = 1.0 / sampling_rate as f64;
    Box::new(move |chunk, count| {
        let base = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        let columns = columns.lock().expect("column table poisoned");
        for i in 0..count {
            let mut values = Vec::with_capacity(columns.len());
            for column in columns.iter() {
                let v = match column {
                    Some(c) if *c < chunk.len() && i < chunk[*c].len() => chunk[*c][i],
                    _ => 0.0,
                };
                values.push(v);
            }
            writer.append(Sample::new(base + i as f64 * dt, values));
        }
    })
}
