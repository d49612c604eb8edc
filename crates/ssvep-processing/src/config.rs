//! Classifier configuration

use crate::calibration::CalibrationConfig;
use crate::detector::DetectorConfig;
use crate::smoothing::SmoothingConfig;
use ssvep_core::{SsvepError, SsvepResult, StreamConfig};
use serde::{Deserialize, Serialize};

/// Window conditioning parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessConfig {
    /// Bandpass low edge (Hz)
    pub bandpass_low: f32,
    /// Bandpass high edge (Hz)
    pub bandpass_high: f32,
    /// Butterworth order per band edge
    pub filter_order: usize,
    /// Apply common average reference after filtering
    pub car: bool,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            bandpass_low: 5.0,
            bandpass_high: 30.0,
            filter_order: 4,
            car: true,
        }
    }
}

/// Top-level configuration for a classification session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SsvepConfig {
    pub stream: StreamConfig,
    /// Analysis window length per classification cycle (seconds)
    pub window_seconds: f32,
    /// Stimulus frequencies, one per selectable target (Hz)
    pub targets: Vec<f32>,
    pub preprocess: PreprocessConfig,
    pub detector: DetectorConfig,
    pub calibration: CalibrationConfig,
    pub smoothing: SmoothingConfig,
}

impl Default for SsvepConfig {
    fn default() -> Self {
        Self {
            stream: StreamConfig::default(),
            window_seconds: 2.0,
            targets: vec![8.0, 10.0, 12.0],
            preprocess: PreprocessConfig::default(),
            detector: DetectorConfig::default(),
            calibration: CalibrationConfig::default(),
            smoothing: SmoothingConfig::default(),
        }
    }
}

impl SsvepConfig {
    /// Reject configurations that cannot produce meaningful detections.
    pub fn validate(&self) -> SsvepResult<()> {
        if self.targets.is_empty() {
            return Err(SsvepError::InvalidConfig {
                message: "at least one target frequency is required".to_string(),
            });
        }
        let nyquist = self.stream.sampling_rate / 2.0;
        for &freq in &self.targets {
            if freq <= 0.0 || freq >= nyquist {
                return Err(SsvepError::InvalidConfig {
                    message: format!(
                        "target frequency {} Hz outside (0, {}) Hz",
                        freq, nyquist
                    ),
                });
            }
        }
        if self.window_seconds <= 0.0 {
            return Err(SsvepError::InvalidConfig {
                message: "window length must be positive".to_string(),
            });
        }
        if self.window_seconds > self.stream.buffer_seconds {
            return Err(SsvepError::InvalidConfig {
                message: format!(
                    "window of {} s exceeds the {} s buffer",
                    self.window_seconds, self.stream.buffer_seconds
                ),
            });
        }
        if self.detector.tolerance_hz < 0.0 {
            return Err(SsvepError::InvalidConfig {
                message: "spectral tolerance must be non-negative".to_string(),
            });
        }
        if self.smoothing.min_agreements == 0 || self.smoothing.history_len == 0 {
            return Err(SsvepError::InvalidConfig {
                message: "smoothing lengths must be at least one".to_string(),
            });
        }
        if self.smoothing.min_agreements > self.smoothing.history_len {
            return Err(SsvepError::InvalidConfig {
                message: "min agreements cannot exceed history length".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(SsvepConfig::default().validate().is_ok());
    }

    #[test]
    fn test_target_above_nyquist_rejected() {
        let mut config = SsvepConfig::default();
        config.targets = vec![10.0, 130.0]; // 250 Hz stream, 125 Hz Nyquist
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_window_longer_than_buffer_rejected() {
        let mut config = SsvepConfig::default();
        config.window_seconds = config.stream.buffer_seconds + 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_targets_rejected() {
        let mut config = SsvepConfig::default();
        config.targets.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_json_round_trip() {
        let config = SsvepConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: SsvepConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.targets, config.targets);
        assert_eq!(back.window_seconds, config.window_seconds);
    }
}
