//! Frequency detector contract and selection
//!
//! A detector scores a conditioned window against each target stimulus
//! frequency. Scores are only comparable within one detector; calibration
//! thresholds therefore belong to a specific method.

use crate::cca::CcaDetector;
use crate::power::PowerSumDetector;
use ssvep_core::{SsvepResult, Window};
use serde::{Deserialize, Serialize};

/// Detection method selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetectorMethod {
    /// Spectral power summed around each target and its second harmonic
    PowerSum,
    /// Canonical correlation against sinusoidal reference sets
    CanonicalCorrelation,
}

/// Detector configuration shared by both methods
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    pub method: DetectorMethod,
    /// Half-width of the spectral band summed per target (Hz)
    pub tolerance_hz: f32,
    /// Include power at twice the target frequency when below Nyquist
    pub include_second_harmonic: bool,
    /// Number of harmonics in each CCA reference set
    pub cca_harmonics: usize,
    /// Number of leading canonical correlations summed into the score
    pub cca_components: usize,
    /// Ridge term added to covariance diagonals before factorization
    pub ridge: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            method: DetectorMethod::CanonicalCorrelation,
            tolerance_hz: 0.5,
            include_second_harmonic: true,
            cca_harmonics: 2,
            cca_components: 1,
            ridge: 1e-4,
        }
    }
}

/// One detection pass over a window
#[derive(Debug, Clone)]
pub struct DetectionOutcome {
    /// Score per target, in target order
    pub scores: Vec<f32>,
    /// Index of the highest-scoring target; first wins on ties
    pub best: Option<usize>,
}

impl DetectionOutcome {
    pub fn from_scores(scores: Vec<f32>) -> Self {
        let best = scores
            .iter()
            .enumerate()
            .fold(None, |acc: Option<(usize, f32)>, (i, &s)| match acc {
                Some((_, max)) if s <= max => acc,
                _ => Some((i, s)),
            })
            .map(|(i, _)| i);
        DetectionOutcome { scores, best }
    }

    /// Score of the winning target.
    pub fn best_score(&self) -> Option<f32> {
        self.best.map(|i| self.scores[i])
    }
}

/// Scores a conditioned window against a set of stimulus frequencies.
pub trait FrequencyDetector: Send {
    /// One score per entry of `targets`, higher meaning stronger evidence.
    fn score(&mut self, window: &Window, targets: &[f32]) -> SsvepResult<DetectionOutcome>;

    fn name(&self) -> &str;
}

/// Construct the detector selected by `config`.
pub fn build_detector(config: &DetectorConfig) -> Box<dyn FrequencyDetector> {
    match config.method {
        DetectorMethod::PowerSum => Box::new(PowerSumDetector::new(config.clone())),
        DetectorMethod::CanonicalCorrelation => Box::new(CcaDetector::new(config.clone())),
    }
}
