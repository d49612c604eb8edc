//! Error handling for the SSVEP pipeline
//!
//! Every fallible operation in the acquisition and classification path
//! returns `SsvepResult`. Errors are never retried internally; callers
//! decide whether to log, degrade, or abort.

use core::fmt;

/// Result type alias for SSVEP pipeline operations
pub type SsvepResult<T> = Result<T, SsvepError>;

/// Error type for acquisition and classification operations
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum SsvepError {
    /// Invalid configuration value
    InvalidConfig {
        /// Description of the configuration error
        message: String,
    },

    /// Buffer holds fewer samples than the minimum usable window
    InsufficientData {
        /// Samples currently buffered
        available: usize,
        /// Minimum samples required
        required: usize,
    },

    /// Channel index outside the configured channel set
    ChannelOutOfBounds {
        /// Requested channel index
        index: usize,
        /// Configured channel count
        count: usize,
    },

    /// Device-side failure (enable, column query, stream control)
    Device {
        /// Device error description
        message: String,
    },

    /// Detection or conditioning failure not absorbed as a zero score
    Detection {
        /// Description of the failure
        message: String,
    },
}

impl fmt::Display for SsvepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SsvepError::InvalidConfig { message } => {
                write!(f, "Invalid configuration: {}", message)
            }
            SsvepError::InsufficientData { available, required } => {
                write!(f, "Insufficient buffered data: {} samples available, {} required",
                       available, required)
            }
            SsvepError::ChannelOutOfBounds { index, count } => {
                write!(f, "Channel index {} out of bounds ({} channels configured)",
                       index, count)
            }
            SsvepError::Device { message } => {
                write!(f, "Device error: {}", message)
            }
            SsvepError::Detection { message } => {
                write!(f, "Detection error: {}", message)
            }
        }
    }
}

impl std::error::Error for SsvepError {}
