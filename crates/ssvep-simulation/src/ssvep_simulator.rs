//! Synthetic SSVEP signal generation
//!
//! Produces EEG-like data with an optional steady-state response: a
//! stimulus tone plus a weaker second harmonic, per-channel phase offsets,
//! optional powerline interference, and Gaussian background noise. Seeded,
//! so a given configuration replays identically.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use ssvep_core::{SsvepError, SsvepResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatorConfig {
    /// Sampling rate in Hz
    pub sampling_rate: f32,
    /// Stimulus frequency the subject attends; `None` simulates rest
    pub stimulus_hz: Option<f32>,
    /// Fundamental amplitude (microvolts)
    pub amplitude: f32,
    /// Second harmonic amplitude (microvolts)
    pub second_harmonic_amplitude: f32,
    /// Gaussian background noise std (microvolts)
    pub noise_std: f32,
    /// Powerline interference frequency; `None` disables it
    pub powerline_hz: Option<f32>,
    /// Powerline interference amplitude (microvolts)
    pub powerline_amplitude: f32,
    /// RNG seed for reproducible noise
    pub seed: u64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            sampling_rate: 250.0,
            stimulus_hz: Some(10.0),
            amplitude: 2.0,
            second_harmonic_amplitude: 0.6,
            noise_std: 1.0,
            powerline_hz: Some(50.0),
            powerline_amplitude: 0.5,
            seed: 42,
        }
    }
}

pub struct SsvepSimulator {
    config: SimulatorConfig,
    rng: StdRng,
    sample_index: u64,
    noise: Normal<f32>,
}

impl SsvepSimulator {
    pub fn new(config: SimulatorConfig) -> SsvepResult<Self> {
        if config.sampling_rate <= 0.0 {
            return Err(SsvepError::InvalidConfig {
                message: "simulator sampling rate must be positive".to_string(),
            });
        }
        let noise = Normal::new(0.0, config.noise_std.max(0.0)).map_err(|e| {
            SsvepError::InvalidConfig {
                message: format!("invalid noise distribution: {}", e),
            }
        })?;
        Ok(Self {
            rng: StdRng::seed_from_u64(config.seed),
            sample_index: 0,
            noise,
            config,
        })
    }

    /// Small fixed phase lag per channel, mimicking electrode placement.
    fn channel_phase(channel: usize) -> f32 {
        0.3 * channel as f32
    }

    /// Generate `samples` new samples for `channels` channels, advancing
    /// simulated time. Outer index is the channel.
    pub fn generate_chunk(&mut self, channels: usize, samples: usize) -> Vec<Vec<f32>> {
        let fs = self.config.sampling_rate;
        let two_pi = 2.0 * std::f32::consts::PI;
        let mut chunk = vec![Vec::with_capacity(samples); channels];

        for i in 0..samples {
            let t = (self.sample_index + i as u64) as f32 / fs;
            for (c, series) in chunk.iter_mut().enumerate() {
                let mut value = 0.0f32;
                if let Some(freq) = self.config.stimulus_hz {
                    let phase = Self::channel_phase(c);
                    value += self.config.amplitude * (two_pi * freq * t + phase).sin();
                    value += self.config.second_harmonic_amplitude
                        * (two_pi * 2.0 * freq * t + phase).sin();
                }
                if let Some(line) = self.config.powerline_hz {
                    value += self.config.powerline_amplitude * (two_pi * line * t).sin();
                }
                value += self.noise.sample(&mut self.rng);
                series.push(value);
            }
        }

        self.sample_index += samples as u64;
        chunk
    }

    /// Switch the attended stimulus without resetting time or noise.
    pub fn set_stimulus(&mut self, stimulus_hz: Option<f32>) {
        self.config.stimulus_hz = stimulus_hz;
    }

    /// Rewind simulated time to zero, keeping the RNG state.
    pub fn reset_time(&mut self) {
        self.sample_index = 0;
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }
}
