//! Heuristic electrode contact check
//!
//! Classifies each channel from basic window statistics: a channel that is
//! nearly flat is disconnected or zero-filled, one with a huge swing is
//! saturated or picking up motion artifact. Thresholds assume values in
//! microvolts. Advisory only; a failing report never blocks classification.

use crate::error::SsvepResult;
use crate::types::{ChannelStats, Window};
use serde::{Deserialize, Serialize};
use tracing::warn;

const STD_MIN: f32 = 1.0;
const PTP_MIN: f32 = 5.0;
const STD_HIGH_ARTIFACT: f32 = 100.0;
const PTP_SATURATION: f32 = 500.0;
const STD_FAIR: f32 = 50.0;
const PTP_FAIR: f32 = 200.0;
const ABS_CLIP_WARN: f32 = 400.0;

/// Contact verdict for one channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelQuality {
    Good,
    Fair,
    Poor,
}

impl ChannelQuality {
    fn classify(stats: &ChannelStats) -> (Self, Option<&'static str>) {
        if stats.std_dev < STD_MIN || stats.peak_to_peak < PTP_MIN {
            return (ChannelQuality::Poor, Some("flat signal, electrode likely disconnected"));
        }
        if stats.std_dev > STD_HIGH_ARTIFACT || stats.peak_to_peak > PTP_SATURATION {
            return (ChannelQuality::Poor, Some("excessive amplitude, saturation or artifact"));
        }
        if stats.max_abs > ABS_CLIP_WARN {
            return (ChannelQuality::Fair, Some("amplitude near clipping range"));
        }
        if stats.std_dev > STD_FAIR || stats.peak_to_peak > PTP_FAIR {
            return (ChannelQuality::Fair, Some("elevated amplitude"));
        }
        (ChannelQuality::Good, None)
    }
}

/// Per-channel quality entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelReport {
    pub name: String,
    pub quality: ChannelQuality,
    pub stats: ChannelStats,
    /// Short human-readable reason when quality is not `Good`
    pub note: Option<String>,
}

/// Whole-window quality summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityReport {
    pub channels: Vec<ChannelReport>,
}

impl QualityReport {
    /// Assess every channel in `window`. `names` pairs with channel order;
    /// missing names fall back to the index.
    pub fn assess(window: &Window, names: &[String]) -> SsvepResult<Self> {
        let mut channels = Vec::with_capacity(window.channel_count());
        for index in 0..window.channel_count() {
            let stats = window.channel_stats(index)?;
            let (quality, note) = ChannelQuality::classify(&stats);
            let name = names
                .get(index)
                .cloned()
                .unwrap_or_else(|| format!("ch{}", index));
            if quality == ChannelQuality::Poor {
                warn!(channel = %name, std_dev = stats.std_dev,
                      peak_to_peak = stats.peak_to_peak, "poor signal quality");
            }
            channels.push(ChannelReport {
                name,
                quality,
                stats,
                note: note.map(|s| s.to_string()),
            });
        }
        Ok(QualityReport { channels })
    }

    /// True when no channel is `Poor`.
    pub fn ok(&self) -> bool {
        self.channels.iter().all(|c| c.quality != ChannelQuality::Poor)
    }

    /// Names of channels rated `Poor`.
    pub fn poor_channels(&self) -> Vec<&str> {
        self.channels
            .iter()
            .filter(|c| c.quality == ChannelQuality::Poor)
            .map(|c| c.name.as_str())
            .collect()
    }
}
