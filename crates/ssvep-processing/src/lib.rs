//! SSVEP-Processing: Detection pipeline for SSVEP classification
//!
//! Window conditioning, frequency detectors, calibration, and decision
//! smoothing, assembled by `SsvepClassifier`.

pub mod calibration;
pub mod cca;
pub mod classifier;
pub mod config;
pub mod detector;
pub mod power;
pub mod preprocess;
pub mod smoothing;

pub use calibration::{
    CalibrationConfig, CalibrationPhase, CalibrationProfile, Calibrator, REST_STD_FLOOR,
};
pub use cca::CcaDetector;
pub use classifier::{Classification, SsvepClassifier};
pub use config::{PreprocessConfig, SsvepConfig};
pub use detector::{
    build_detector, DetectionOutcome, DetectorConfig, DetectorMethod, FrequencyDetector,
};
pub use power::PowerSumDetector;
pub use smoothing::{DecisionSmoother, Label, SmoothingConfig};
