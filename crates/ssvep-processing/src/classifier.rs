//! Classification pipeline
//!
//! Ties the stages together for one session: condition the window, score
//! it against the targets, threshold against the calibration baseline, and
//! smooth the resulting label stream.

use crate::calibration::CalibrationProfile;
use crate::config::SsvepConfig;
use crate::detector::{build_detector, DetectionOutcome, FrequencyDetector};
use crate::power;
use crate::preprocess;
use crate::smoothing::{DecisionSmoother, Label};
use realfft::RealFftPlanner;
use ssvep_core::{SsvepResult, Window};
use tracing::debug;

/// Result of one classification cycle
#[derive(Debug, Clone)]
pub struct Classification {
    /// Detector score per target
    pub scores: Vec<f32>,
    /// Highest-scoring target index
    pub best: Option<usize>,
    /// This cycle's label, after thresholding
    pub label: Label,
    /// Smoothed agreement across recent cycles, if any
    pub stable: Option<Label>,
    /// Last stable target, carried through undecided cycles
    pub held: Option<usize>,
}

pub struct SsvepClassifier {
    config: SsvepConfig,
    detector: Box<dyn FrequencyDetector>,
    smoother: DecisionSmoother,
    calibration: Option<CalibrationProfile>,
    planner: RealFftPlanner<f32>,
}

impl SsvepClassifier {
    pub fn new(config: SsvepConfig) -> SsvepResult<Self> {
        config.validate()?;
        let detector = build_detector(&config.detector);
        let smoother = DecisionSmoother::new(config.smoothing.clone());
        Ok(SsvepClassifier {
            config,
            detector,
            smoother,
            calibration: None,
            planner: RealFftPlanner::new(),
        })
    }

    /// Score a window without touching the smoothing state. Used by the
    /// calibration loop, which labels outcomes by phase instead.
    pub fn score_window(&mut self, window: &Window) -> SsvepResult<DetectionOutcome> {
        let conditioned = preprocess::condition(window, &self.config.preprocess)?;
        self.detector.score(&conditioned, &self.config.targets)
    }

    /// Run one classification cycle and feed the smoother.
    ///
    /// Without a calibration profile every cycle labels the winning target;
    /// rest detection needs a baseline to threshold against.
    pub fn classify(&mut self, window: &Window) -> SsvepResult<Classification> {
        let outcome = self.score_window(window)?;
        let label = match (&self.calibration, outcome.best, outcome.best_score()) {
            (Some(profile), Some(_), Some(score)) if score < profile.threshold => {
                debug!(score, threshold = profile.threshold, "below rest threshold");
                Label::Rest
            }
            (_, Some(best), _) => Label::Target(best),
            _ => Label::Rest,
        };
        self.smoother.push(label);

        Ok(Classification {
            scores: outcome.scores,
            best: outcome.best,
            label,
            stable: self.smoother.stable_selection(),
            held: self.smoother.held_selection(),
        })
    }

    /// One-sided power spectrum of the conditioned window, for diagnostics
    /// and stimulus-frequency sweeps.
    pub fn power_spectrum(&mut self, window: &Window) -> SsvepResult<(Vec<f32>, Vec<f32>)> {
        let conditioned = preprocess::condition(window, &self.config.preprocess)?;
        power::power_spectrum(&mut self.planner, &conditioned)
    }

    pub fn set_calibration(&mut self, profile: CalibrationProfile) {
        self.calibration = Some(profile);
        self.smoother.clear();
    }

    pub fn calibration(&self) -> Option<&CalibrationProfile> {
        self.calibration.as_ref()
    }

    pub fn stable_selection(&self) -> Option<Label> {
        self.smoother.stable_selection()
    }

    pub fn held_selection(&self) -> Option<usize> {
        self.smoother.held_selection()
    }

    pub fn config(&self) -> &SsvepConfig {
        &self.config
    }

    pub fn detector_name(&self) -> &str {
        self.detector.name()
    }

    /// Drop smoothing history, keeping calibration.
    pub fn reset(&mut self) {
        self.smoother.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::CalibrationProfile;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::{Distribution, Normal};

    fn stimulus_window(freq: f32, fs: f32, seconds: f32, seed: u64) -> Window {
        let n = (fs * seconds) as usize;
        let mut rng = StdRng::seed_from_u64(seed);
        let noise = Normal::new(0.0f32, 0.3).unwrap();
        let mut make = |phase: f32| -> Vec<f32> {
            (0..n)
                .map(|i| {
                    (2.0 * std::f32::consts::PI * freq * i as f32 / fs + phase).sin()
                        + noise.sample(&mut rng)
                })
                .collect()
        };
        let a = make(0.0);
        let b = make(0.3);
        Window::from_channels(vec![a, b], fs, 0.0, seconds as f64).unwrap()
    }

    fn test_config(min_agreements: usize) -> SsvepConfig {
        let mut config = SsvepConfig::default();
        config.preprocess.car = false; // two synthetic channels share the tone
        config.smoothing.min_agreements = min_agreements;
        config
    }

    #[test]
    fn test_selection_emerges_after_agreement() {
        let mut classifier = SsvepClassifier::new(test_config(3)).unwrap();
        for cycle in 0..3 {
            let window = stimulus_window(10.0, 250.0, 2.0, cycle);
            let result = classifier.classify(&window).unwrap();
            assert_eq!(result.best, Some(1), "cycle {}", cycle);
            if cycle < 2 {
                assert_eq!(result.stable, None, "cycle {}", cycle);
            } else {
                assert_eq!(result.stable, Some(Label::Target(1)));
                assert_eq!(result.held, Some(1));
            }
        }
    }

    #[test]
    fn test_calibrated_threshold_yields_rest() {
        let mut classifier = SsvepClassifier::new(test_config(2)).unwrap();
        classifier.set_calibration(CalibrationProfile {
            threshold: 10.0, // nothing scores this high
            rest_mean: 0.1,
            rest_std: 0.05,
            target_means: vec![0.8, 0.9, 0.85],
        });
        let window = stimulus_window(10.0, 250.0, 2.0, 42);
        let result = classifier.classify(&window).unwrap();
        assert_eq!(result.label, Label::Rest);
    }

    #[test]
    fn test_uncalibrated_always_picks_a_target() {
        let mut classifier = SsvepClassifier::new(test_config(2)).unwrap();
        let window = stimulus_window(12.0, 250.0, 2.0, 5);
        let result = classifier.classify(&window).unwrap();
        assert!(matches!(result.label, Label::Target(_)));
    }

    #[test]
    fn test_reset_clears_smoothing_not_calibration() {
        let mut classifier = SsvepClassifier::new(test_config(2)).unwrap();
        classifier.set_calibration(CalibrationProfile {
            threshold: 0.01,
            rest_mean: 0.0,
            rest_std: 0.005,
            target_means: vec![0.8, 0.9, 0.85],
        });
        let window = stimulus_window(10.0, 250.0, 2.0, 9);
        classifier.classify(&window).unwrap();
        classifier.classify(&window).unwrap();
        assert!(classifier.stable_selection().is_some());

        classifier.reset();
        assert_eq!(classifier.stable_selection(), None);
        assert!(classifier.calibration().is_some());
    }

    #[test]
    fn test_spectrum_peaks_at_stimulus() {
        let mut classifier = SsvepClassifier::new(test_config(2)).unwrap();
        let window = stimulus_window(12.0, 250.0, 4.0, 13);
        let (freqs, power) = classifier.power_spectrum(&window).unwrap();
        let peak = power
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(i, _)| freqs[i])
            .unwrap();
        assert!((peak - 12.0).abs() < 0.6, "peak at {}", peak);
    }

    #[test]
    fn test_invalid_config_rejected_at_construction() {
        let mut config = SsvepConfig::default();
        config.targets.clear();
        assert!(SsvepClassifier::new(config).is_err());
    }
}
