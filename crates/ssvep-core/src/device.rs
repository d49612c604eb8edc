//! Device abstraction for EEG acquisition hardware
//!
//! The vendor binding is outside this crate: the device is modeled as a
//! source that delivers fixed-size chunks of per-enabled-channel samples
//! through a registered callback, and may stop calling back at any time.

use crate::error::SsvepResult;

/// Callback invoked by the device for each arriving chunk.
///
/// Arguments: per-enabled-channel sample arrays (indexed by stream column)
/// and the number of samples in the chunk. Invoked from the device's
/// acquisition thread; must append and return without blocking.
pub type ChunkCallback = Box<dyn FnMut(&[Vec<f32>], usize) + Send>;

/// Contract every acquisition device must satisfy.
pub trait EegDevice: Send {
    /// Enable or disable a physical channel by index.
    fn set_channel_enabled(&mut self, physical: usize, enabled: bool) -> SsvepResult<()>;

    /// Resolve a physical channel index to its device-assigned stream
    /// column. Only valid once streaming has started; a failed query marks
    /// the channel degraded, it never aborts the session.
    fn stream_column(&self, physical: usize) -> SsvepResult<usize>;

    /// Register the chunk callback. Must be called before `start_stream`.
    fn set_chunk_callback(&mut self, callback: ChunkCallback);

    /// Begin streaming; the callback starts firing after this returns.
    fn start_stream(&mut self) -> SsvepResult<()>;

    /// Stop streaming; no callbacks fire after this returns.
    fn stop_stream(&mut self) -> SsvepResult<()>;

    /// Whether the device is currently streaming.
    fn is_streaming(&self) -> bool;
}
