//! Simulated acquisition device
//!
//! Implements the device contract over the synthetic generator. Stream
//! columns follow hardware convention: enabled physical channels are
//! assigned columns in ascending index order, valid only while streaming.
//! Chunks are delivered either synchronously with `pump` (deterministic,
//! for tests) or from a spawned tokio task ticking at the configured
//! chunk rate.

use crate::ssvep_simulator::{SimulatorConfig, SsvepSimulator};
use ssvep_core::{ChunkCallback, EegDevice, SsvepError, SsvepResult};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::time::{interval, Duration};
use tracing::{info, warn};

/// Commands accepted by the background streaming task
#[derive(Debug, Clone)]
pub enum DeviceCommand {
    /// Change the attended stimulus frequency mid-stream
    SetStimulus(Option<f32>),
    Stop,
}

pub struct SimulatedDevice {
    simulator: Arc<Mutex<SsvepSimulator>>,
    enabled: BTreeSet<usize>,
    callback: Arc<Mutex<Option<ChunkCallback>>>,
    streaming: Arc<AtomicBool>,
}

impl SimulatedDevice {
    pub fn new(config: SimulatorConfig) -> SsvepResult<Self> {
        Ok(Self {
            simulator: Arc::new(Mutex::new(SsvepSimulator::new(config)?)),
            enabled: BTreeSet::new(),
            callback: Arc::new(Mutex::new(None)),
            streaming: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Deliver one chunk of `samples` synchronously through the callback.
    /// No-op when not streaming or no channel is enabled.
    pub fn pump(&self, samples: usize) {
        if !self.streaming.load(Ordering::SeqCst) || self.enabled.is_empty() {
            return;
        }
        let chunk = {
            let mut simulator = self.simulator.lock().expect("simulator poisoned");
            simulator.generate_chunk(self.enabled.len(), samples)
        };
        let mut callback = self.callback.lock().expect("callback poisoned");
        if let Some(cb) = callback.as_mut() {
            cb(&chunk, samples);
        }
    }

    /// Change the attended stimulus frequency.
    pub fn set_stimulus(&self, stimulus_hz: Option<f32>) {
        self.simulator
            .lock()
            .expect("simulator poisoned")
            .set_stimulus(stimulus_hz);
    }

    /// Spawn a tokio task delivering `chunk_samples` every chunk interval
    /// until `DeviceCommand::Stop` arrives or the channel closes.
    pub fn spawn_stream(&self, chunk_samples: usize) -> mpsc::Sender<DeviceCommand> {
        let (sender, mut receiver) = mpsc::channel(32);
        let simulator = Arc::clone(&self.simulator);
        let callback = Arc::clone(&self.callback);
        let streaming = Arc::clone(&self.streaming);
        let channels = self.enabled.len();
        let sampling_rate = self
            .simulator
            .lock()
            .expect("simulator poisoned")
            .config()
            .sampling_rate;
        let tick = Duration::from_secs_f32(chunk_samples as f32 / sampling_rate);

        tokio::spawn(async move {
            let mut timer = interval(tick);
            loop {
                tokio::select! {
                    _ = timer.tick() => {
                        if !streaming.load(Ordering::SeqCst) || channels == 0 {
                            continue;
                        }
                        let chunk = {
                            let mut sim = simulator.lock().expect("simulator poisoned");
                            sim.generate_chunk(channels, chunk_samples)
                        };
                        let mut cb = callback.lock().expect("callback poisoned");
                        if let Some(cb) = cb.as_mut() {
                            cb(&chunk, chunk_samples);
                        }
                    }
                    command = receiver.recv() => {
                        match command {
                            Some(DeviceCommand::SetStimulus(freq)) => {
                                simulator
                                    .lock()
                                    .expect("simulator poisoned")
                                    .set_stimulus(freq);
                                info!(?freq, "simulated stimulus changed");
                            }
                            Some(DeviceCommand::Stop) | None => {
                                info!("simulated stream task stopped");
                                break;
                            }
                        }
                    }
                }
            }
        });

        sender
    }
}

impl EegDevice for SimulatedDevice {
    fn set_channel_enabled(&mut self, physical: usize, enabled: bool) -> SsvepResult<()> {
        if self.streaming.load(Ordering::SeqCst) {
            return Err(SsvepError::Device {
                message: "cannot change enabled channels while streaming".to_string(),
            });
        }
        if enabled {
            self.enabled.insert(physical);
        } else {
            self.enabled.remove(&physical);
        }
        Ok(())
    }

    fn stream_column(&self, physical: usize) -> SsvepResult<usize> {
        if !self.streaming.load(Ordering::SeqCst) {
            return Err(SsvepError::Device {
                message: "stream columns are undefined before streaming starts".to_string(),
            });
        }
        self.enabled
            .iter()
            .position(|&p| p == physical)
            .ok_or_else(|| SsvepError::Device {
                message: format!("physical channel {} is not enabled", physical),
            })
    }

    fn set_chunk_callback(&mut self, callback: ChunkCallback) {
        *self.callback.lock().expect("callback poisoned") = Some(callback);
    }

    fn start_stream(&mut self) -> SsvepResult<()> {
        if self.enabled.is_empty() {
            warn!("starting simulated stream with no enabled channels");
        }
        self.streaming.store(true, Ordering::SeqCst);
        info!(channels = self.enabled.len(), "simulated stream started");
        Ok(())
    }

    fn stop_stream(&mut self) -> SsvepResult<()> {
        self.streaming.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_streaming(&self) -> bool {
        self.streaming.load(Ordering::SeqCst)
    }
}
