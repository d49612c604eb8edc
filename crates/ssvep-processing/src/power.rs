//! Spectral power detector
//!
//! Averages channels into one series, takes a real FFT, and sums the power
//! bins within a tolerance band around each target frequency, optionally
//! adding the band around the second harmonic. Cheap and calibration-free,
//! at the cost of discarding cross-channel phase structure.

use crate::detector::{DetectionOutcome, DetectorConfig, FrequencyDetector};
use realfft::RealFftPlanner;
use ssvep_core::{SsvepError, SsvepResult, Window};

pub struct PowerSumDetector {
    config: DetectorConfig,
    planner: RealFftPlanner<f32>,
}

impl PowerSumDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self {
            config,
            planner: RealFftPlanner::new(),
        }
    }

    /// Sum of power bins with |bin_freq - center| <= tolerance.
    fn band_power(power: &[f32], resolution: f32, center: f32, tolerance: f32) -> f32 {
        power
            .iter()
            .enumerate()
            .filter(|(i, _)| (*i as f32 * resolution - center).abs() <= tolerance)
            .map(|(_, &p)| p)
            .sum()
    }
}

/// One-sided power spectrum of the cross-channel average series.
///
/// Returns bin frequencies and power values, for diagnostics and the
/// calibration-time spectrum sweep.
pub fn power_spectrum(
    planner: &mut RealFftPlanner<f32>,
    window: &Window,
) -> SsvepResult<(Vec<f32>, Vec<f32>)> {
    let n = window.samples_per_channel();
    if n < 2 {
        return Err(SsvepError::InsufficientData {
            available: n,
            required: 2,
        });
    }

    let fft = planner.plan_fft_forward(n);
    let mut input = window.channel_average();
    let mut spectrum = fft.make_output_vec();
    fft.process(&mut input, &mut spectrum)
        .map_err(|e| SsvepError::Detection {
            message: format!("fft failed: {}", e),
        })?;

    let resolution = window.sampling_rate() / n as f32;
    let freqs = (0..spectrum.len()).map(|i| i as f32 * resolution).collect();
    let scale = 1.0 / n as f32;
    let power = spectrum.iter().map(|c| c.norm_sqr() * scale).collect();
    Ok((freqs, power))
}

impl FrequencyDetector for PowerSumDetector {
    fn score(&mut self, window: &Window, targets: &[f32]) -> SsvepResult<DetectionOutcome> {
        let (_, power) = power_spectrum(&mut self.planner, window)?;
        let resolution = window.sampling_rate() / window.samples_per_channel() as f32;
        let nyquist = window.sampling_rate() / 2.0;

        let scores = targets
            .iter()
            .map(|&freq| {
                let mut score = Self::band_power(&power, resolution, freq, self.config.tolerance_hz);
                let harmonic = 2.0 * freq;
                if self.config.include_second_harmonic && harmonic < nyquist {
                    score += Self::band_power(&power, resolution, harmonic, self.config.tolerance_hz);
                }
                score
            })
            .collect();

        Ok(DetectionOutcome::from_scores(scores))
    }

    fn name(&self) -> &str {
        "power-sum"
    }
}
