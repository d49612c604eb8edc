//! SSVEP-Simulation: Synthetic EEG source for development and testing

pub mod simulated_device;
pub mod ssvep_simulator;

pub use simulated_device::{DeviceCommand, SimulatedDevice};
pub use ssvep_simulator::{SimulatorConfig, SsvepSimulator};
