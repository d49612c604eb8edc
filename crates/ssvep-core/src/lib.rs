//! SSVEP-Core: Acquisition-side types for SSVEP classification
//!
//! Sample/window containers, the device contract, channel resolution, the
//! bounded sample ring, and the buffered stream that ties them together.

pub mod buffer;
pub mod channel_map;
pub mod device;
pub mod error;
pub mod quality;
pub mod stream;
pub mod types;

pub use buffer::SampleBuffer;
pub use channel_map::{default_physical_mapping, ChannelBinding, ChannelMap};
pub use device::{ChunkCallback, EegDevice};
pub use error::{SsvepError, SsvepResult};
pub use quality::{ChannelQuality, ChannelReport, QualityReport};
pub use stream::{EegStream, StreamConfig};
pub use types::{ChannelStats, Sample, Window};
