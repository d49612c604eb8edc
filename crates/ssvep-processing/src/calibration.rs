//! Rest-baseline calibration
//!
//! A short guided session: the user attends each target in turn, then
//! rests. Target phases confirm the targets are separable; the rest phase
//! supplies the baseline that becomes the detection threshold. The
//! threshold is `rest_mean + margin_std * rest_std`, with the std floored
//! so a perfectly quiet baseline still yields a usable margin.

use ssvep_core::{SsvepError, SsvepResult};
use crate::detector::DetectionOutcome;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Lower bound on the rest-score std used in the threshold formula.
pub const REST_STD_FLOOR: f32 = 1e-6;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationConfig {
    /// Attend time per target (seconds)
    pub seconds_per_target: f32,
    /// Rest time after the last target (seconds)
    pub rest_seconds: f32,
    /// Threshold margin in rest-score standard deviations
    pub margin_std: f32,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            seconds_per_target: 3.0,
            rest_seconds: 3.0,
            margin_std: 1.5,
        }
    }
}

/// Result of a completed calibration session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationProfile {
    /// Best-score threshold separating rest from attention
    pub threshold: f32,
    pub rest_mean: f32,
    pub rest_std: f32,
    /// Mean winning score recorded while attending each target
    pub target_means: Vec<f32>,
}

impl CalibrationProfile {
    pub fn to_json(&self) -> SsvepResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| SsvepError::InvalidConfig {
            message: format!("profile serialization failed: {}", e),
        })
    }

    pub fn from_json(json: &str) -> SsvepResult<Self> {
        serde_json::from_str(json).map_err(|e| SsvepError::InvalidConfig {
            message: format!("profile deserialization failed: {}", e),
        })
    }
}

/// Where a point in session time falls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationPhase {
    /// Attending target `index`
    Target(usize),
    Rest,
    Done,
}

/// Accumulates detector outcomes over a calibration session.
pub struct Calibrator {
    config: CalibrationConfig,
    target_count: usize,
    target_scores: Vec<Vec<f32>>,
    rest_scores: Vec<f32>,
}

impl Calibrator {
    pub fn new(config: CalibrationConfig, target_count: usize) -> SsvepResult<Self> {
        if target_count == 0 {
            return Err(SsvepError::InvalidConfig {
                message: "calibration requires at least one target".to_string(),
            });
        }
        if config.seconds_per_target <= 0.0 || config.rest_seconds <= 0.0 {
            return Err(SsvepError::InvalidConfig {
                message: "calibration phase durations must be positive".to_string(),
            });
        }
        Ok(Self {
            config,
            target_count,
            target_scores: vec![Vec::new(); target_count],
            rest_scores: Vec::new(),
        })
    }

    /// Phase for a given elapsed session time: targets in order, then rest.
    pub fn phase_at(&self, elapsed_seconds: f32) -> CalibrationPhase {
        let per_target = self.config.seconds_per_target;
        let targets_end = per_target * self.target_count as f32;
        if elapsed_seconds < 0.0 {
            return CalibrationPhase::Target(0);
        }
        if elapsed_seconds < targets_end {
            let index = (elapsed_seconds / per_target) as usize;
            return CalibrationPhase::Target(index.min(self.target_count - 1));
        }
        if elapsed_seconds < targets_end + self.config.rest_seconds {
            return CalibrationPhase::Rest;
        }
        CalibrationPhase::Done
    }

    /// Record one detector outcome under the given phase.
    ///
    /// Target phases keep the score of the attended target; the rest phase
    /// keeps the winning score, whatever target it belongs to.
    pub fn record(&mut self, phase: CalibrationPhase, outcome: &DetectionOutcome) {
        match phase {
            CalibrationPhase::Target(index) => {
                if let Some(&score) = outcome.scores.get(index) {
                    self.target_scores[index].push(score);
                }
            }
            CalibrationPhase::Rest => {
                if let Some(score) = outcome.best_score() {
                    self.rest_scores.push(score);
                }
            }
            CalibrationPhase::Done => {}
        }
    }

    /// Number of rest-phase outcomes recorded so far.
    pub fn rest_sample_count(&self) -> usize {
        self.rest_scores.len()
    }

    /// Derive the profile from the recorded session.
    pub fn finish(&self) -> SsvepResult<CalibrationProfile> {
        if self.rest_scores.is_empty() {
            return Err(SsvepError::InsufficientData {
                available: 0,
                required: 1,
            });
        }

        let n = self.rest_scores.len() as f32;
        let rest_mean = self.rest_scores.iter().sum::<f32>() / n;
        let variance = self
            .rest_scores
            .iter()
            .map(|s| (s - rest_mean).powi(2))
            .sum::<f32>()
            / n;
        let rest_std = variance.sqrt().max(REST_STD_FLOOR);
        let threshold = rest_mean + self.config.margin_std * rest_std;

        let target_means = self
            .target_scores
            .iter()
            .map(|scores| {
                if scores.is_empty() {
                    0.0
                } else {
                    scores.iter().sum::<f32>() / scores.len() as f32
                }
            })
            .collect();

        info!(threshold, rest_mean, rest_std, "calibration complete");
        Ok(CalibrationProfile {
            threshold,
            rest_mean,
            rest_std,
            target_means,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(scores: Vec<f32>) -> DetectionOutcome {
        DetectionOutcome::from_scores(scores)
    }

    #[test]
    fn test_phase_schedule() {
        let calibrator = Calibrator::new(CalibrationConfig::default(), 3).unwrap();
        assert_eq!(calibrator.phase_at(0.0), CalibrationPhase::Target(0));
        assert_eq!(calibrator.phase_at(3.5), CalibrationPhase::Target(1));
        assert_eq!(calibrator.phase_at(8.9), CalibrationPhase::Target(2));
        assert_eq!(calibrator.phase_at(9.5), CalibrationPhase::Rest);
        assert_eq!(calibrator.phase_at(12.1), CalibrationPhase::Done);
    }

    #[test]
    fn test_threshold_formula() {
        let mut calibrator = Calibrator::new(CalibrationConfig::default(), 2).unwrap();
        for &score in &[0.1f32, 0.2, 0.3] {
            calibrator.record(CalibrationPhase::Rest, &outcome(vec![score, 0.0]));
        }
        let profile = calibrator.finish().unwrap();
        assert!((profile.rest_mean - 0.2).abs() < 1e-6);
        let expected_std = (0.02f32 / 3.0).sqrt();
        assert!((profile.rest_std - expected_std).abs() < 1e-5);
        assert!((profile.threshold - (0.2 + 1.5 * expected_std)).abs() < 1e-5);
    }

    #[test]
    fn test_quiet_baseline_uses_std_floor() {
        let mut calibrator = Calibrator::new(CalibrationConfig::default(), 1).unwrap();
        for _ in 0..5 {
            calibrator.record(CalibrationPhase::Rest, &outcome(vec![0.25]));
        }
        let profile = calibrator.finish().unwrap();
        assert_eq!(profile.rest_std, REST_STD_FLOOR);
        assert!(profile.threshold > profile.rest_mean);
    }

    #[test]
    fn test_finish_without_rest_data_fails() {
        let mut calibrator = Calibrator::new(CalibrationConfig::default(), 1).unwrap();
        calibrator.record(CalibrationPhase::Target(0), &outcome(vec![0.9]));
        assert!(calibrator.finish().is_err());
    }

    #[test]
    fn test_target_phase_records_attended_score() {
        let mut calibrator = Calibrator::new(CalibrationConfig::default(), 2).unwrap();
        calibrator.record(CalibrationPhase::Target(1), &outcome(vec![0.1, 0.8]));
        calibrator.record(CalibrationPhase::Rest, &outcome(vec![0.1, 0.1]));
        let profile = calibrator.finish().unwrap();
        assert_eq!(profile.target_means, vec![0.0, 0.8]);
    }

    #[test]
    fn test_profile_json_round_trip() {
        let profile = CalibrationProfile {
            threshold: 0.4,
            rest_mean: 0.2,
            rest_std: 0.1,
            target_means: vec![0.7, 0.8],
        };
        let json = profile.to_json().unwrap();
        assert_eq!(CalibrationProfile::from_json(&json).unwrap(), profile);
    }
}
