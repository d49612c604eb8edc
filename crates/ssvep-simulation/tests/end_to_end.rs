//! Full-pipeline tests: simulated device -> buffered stream -> classifier

use ssvep_core::{EegStream, StreamConfig};
use ssvep_processing::{
    CalibrationPhase, Calibrator, Label, SsvepClassifier, SsvepConfig,
};
use ssvep_simulation::{SimulatedDevice, SimulatorConfig};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn session_config() -> SsvepConfig {
    let mut config = SsvepConfig::default();
    config.stream = StreamConfig {
        buffer_seconds: 10.0,
        ..Default::default()
    };
    // Both occipital channels carry the same synthetic stimulus, so the
    // common average reference would cancel it
    config.preprocess.car = false;
    config.smoothing.min_agreements = 2;
    config
}

fn simulator_config(stimulus_hz: Option<f32>) -> SimulatorConfig {
    SimulatorConfig {
        stimulus_hz,
        seed: 1234,
        ..Default::default()
    }
}

#[test]
fn test_stimulus_is_classified_and_stabilizes() {
    init_tracing();
    let config = session_config();
    let mut device = SimulatedDevice::new(simulator_config(Some(10.0))).unwrap();
    let mut stream = EegStream::new(config.stream.clone()).unwrap();
    stream.connect(&mut device).unwrap();
    let mut classifier = SsvepClassifier::new(config).unwrap();

    // 10 Hz is the second of the default 8/10/12 Hz targets
    let mut last = None;
    for _ in 0..4 {
        device.pump(500); // two seconds per cycle
        let (window, _) = stream.recent(2.0).unwrap();
        let result = classifier.classify(&window).unwrap();
        assert_eq!(result.best, Some(1));
        last = result.stable;
    }
    assert_eq!(last, Some(Label::Target(1)));
    assert_eq!(classifier.held_selection(), Some(1));

    stream.disconnect(&mut device).unwrap();
}

#[test]
fn test_degraded_channel_session_still_classifies() {
    init_tracing();
    let mut config = session_config();
    // "XX" has no physical mapping and is zero-filled for the whole session
    config.stream.channels = vec!["O1".to_string(), "XX".to_string()];
    let mut device = SimulatedDevice::new(simulator_config(Some(12.0))).unwrap();
    let mut stream = EegStream::new(config.stream.clone()).unwrap();
    stream.connect(&mut device).unwrap();
    assert_eq!(stream.channel_map().degraded_channels(), vec!["XX"]);

    let mut classifier = SsvepClassifier::new(config).unwrap();
    device.pump(750);
    let (window, _) = stream.recent(2.0).unwrap();
    let result = classifier.classify(&window).unwrap();
    assert_eq!(result.best, Some(2));
}

#[test]
fn test_calibrated_rest_detection() {
    init_tracing();
    let mut config = session_config();
    // Wide margin keeps the single post-calibration rest check reliable
    config.calibration.margin_std = 3.0;
    let mut device = SimulatedDevice::new(simulator_config(None)).unwrap();
    let mut stream = EegStream::new(config.stream.clone()).unwrap();
    stream.connect(&mut device).unwrap();
    let mut classifier = SsvepClassifier::new(config.clone()).unwrap();

    // Rest-only calibration: record baseline winning scores with no stimulus
    let mut calibrator =
        Calibrator::new(config.calibration.clone(), config.targets.len()).unwrap();
    for _ in 0..5 {
        device.pump(500);
        let (window, _) = stream.recent(2.0).unwrap();
        let outcome = classifier.score_window(&window).unwrap();
        calibrator.record(CalibrationPhase::Rest, &outcome);
    }
    let profile = calibrator.finish().unwrap();
    assert!(profile.threshold > profile.rest_mean);
    classifier.set_calibration(profile);

    // Still resting: cycles must label Rest
    device.pump(500);
    let (window, _) = stream.recent(2.0).unwrap();
    let result = classifier.classify(&window).unwrap();
    assert_eq!(result.label, Label::Rest);

    // Attention onset: the stimulus pushes the score past the threshold
    device.set_stimulus(Some(10.0));
    device.pump(1000);
    let (window, _) = stream.recent(2.0).unwrap();
    let result = classifier.classify(&window).unwrap();
    assert_eq!(result.label, Label::Target(1));
}

#[tokio::test]
async fn test_background_stream_feeds_classifier() {
    init_tracing();
    let config = session_config();
    let mut device = SimulatedDevice::new(simulator_config(Some(8.0))).unwrap();
    let mut stream = EegStream::new(config.stream.clone()).unwrap();
    stream.connect(&mut device).unwrap();

    let control = device.spawn_stream(25);
    // Let the task accumulate past the half-second floor
    for _ in 0..40 {
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        if stream.buffer().len() >= 250 {
            break;
        }
    }

    let mut classifier = SsvepClassifier::new(config).unwrap();
    let (window, names) = stream.recent(1.0).unwrap();
    assert_eq!(names, vec!["O1".to_string(), "O2".to_string()]);
    let result = classifier.classify(&window).unwrap();
    assert_eq!(result.scores.len(), 3);
    assert_eq!(result.best, Some(0));

    control
        .send(ssvep_simulation::DeviceCommand::Stop)
        .await
        .unwrap();
}
