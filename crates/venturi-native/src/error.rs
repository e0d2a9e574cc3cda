//! Error types for native processing
//!
//! Error types for the buffer, extractor, trait engine, orchestrator and
//! runtime using `thiserror`. Cycle errors are local to one cycle and `Clone`,
//! so they can be handed to the result queue alongside successful cycles.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Signal buffer errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BufferError {
    /// Fewer samples buffered than the requested window
    #[error("Insufficient data: got {available} samples, need {required}")]
    InsufficientData {
        /// Samples currently buffered
        available: usize,
        /// Samples required
        required: usize,
    },

    /// Sample shape does not match the session
    #[error("Channel mismatch: session expects {expected} channels, sample has {got}")]
    ChannelMismatch {
        /// Configured channel count
        expected: usize,
        /// Channel count of the rejected sample
        got: usize,
    },
}

/// Feature extraction errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeatureError {
    /// Window contains NaN or infinite values
    #[error("Malformed window: non-finite value at sample {sample_index}, channel {channel}")]
    MalformedWindow {
        /// Position of the sample inside the window (oldest = 0)
        sample_index: usize,
        /// Channel holding the value
        channel: usize,
    },

    /// Window too short for spectral analysis
    #[error("Window too short: {len} samples, need at least {min}")]
    WindowTooShort {
        /// Samples in the window
        len: usize,
        /// Minimum accepted
        min: usize,
    },
}

/// Trait modulation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TraitError {
    /// Elapsed time or feature value outside its domain
    #[error("Invalid cycle input {field}: {value}")]
    InvalidCycleInput {
        /// Name of the offending input
        field: &'static str,
        /// Value that was rejected
        value: f64,
    },
}

/// Errors of a single processing cycle.
///
/// A cycle that fails leaves the session exactly as it was before the call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CycleError {
    /// Ingestion or windowing failure
    #[error(transparent)]
    Buffer(#[from] BufferError),

    /// Feature extraction failure
    #[error(transparent)]
    Feature(#[from] FeatureError),

    /// Trait update rejected its inputs
    #[error(transparent)]
    Trait(#[from] TraitError),
}

/// Errors of the multi-session runtime
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// The session task has stopped accepting samples
    #[error("Session closed: {0}")]
    SessionClosed(uuid::Uuid),

    /// The session task panicked or was cancelled
    #[error("Session task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Flat error taxonomy reported to telemetry consumers
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Buffer not yet full
    InsufficientData,
    /// Sample channel count differs from the session
    ChannelMismatch,
    /// Non-finite values in the analysis window
    MalformedWindow,
    /// Invalid elapsed time or feature value at the trait engine
    InvalidCycleInput,
}

impl CycleError {
    /// Classify this error
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Buffer(BufferError::InsufficientData { .. }) => ErrorKind::InsufficientData,
            Self::Buffer(BufferError::ChannelMismatch { .. }) => ErrorKind::ChannelMismatch,
            Self::Feature(_) => ErrorKind::MalformedWindow,
            Self::Trait(_) => ErrorKind::InvalidCycleInput,
        }
    }
}

/// Result type for buffer operations
pub type BufferResult<T> = Result<T, BufferError>;

/// Result type for feature extraction
pub type FeatureResult<T> = Result<T, FeatureError>;

/// Result type for trait modulation
pub type TraitResult<T> = Result<T, TraitError>;

/// Result type for runtime operations
pub type RuntimeResult<T> = Result<T, RuntimeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let e: CycleError = BufferError::ChannelMismatch { expected: 4, got: 3 }.into();
        assert_eq!(e.kind(), ErrorKind::ChannelMismatch);

        let e: CycleError = FeatureError::MalformedWindow { sample_index: 2, channel: 1 }.into();
        assert_eq!(e.kind(), ErrorKind::MalformedWindow);

        let e: CycleError = TraitError::InvalidCycleInput { field: "elapsed_s", value: -1.0 }.into();
        assert_eq!(e.kind(), ErrorKind::InvalidCycleInput);
    }

    #[test]
    fn test_error_messages() {
        let e = BufferError::InsufficientData { available: 7, required: 8 };
        assert_eq!(e.to_string(), "Insufficient data: got 7 samples, need 8");
    }
}
