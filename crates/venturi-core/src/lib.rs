//! Venturi Core - shared types for the neuroadaptive EEG core
//!
//! This crate provides the vocabulary used by the processing tier: samples,
//! bands, traits, learning/neural states, and the immutable session
//! configuration. It performs no I/O.
//!
//! # Modules
//!
//! - [`types`]: Samples, bands, traits and states
//! - [`config`]: Session configuration and validation
//! - [`error`]: Configuration errors
//! - [`math`]: Statistics and smoothing helpers
//!
//! # Example
//!
//! ```rust
//! use venturi_core::config::SessionConfig;
//! use venturi_core::types::{Trait, TraitVector};
//!
//! let config = SessionConfig::new(256.0, 4, 128);
//! assert!(config.validate().is_ok());
//!
//! let traits = TraitVector::zeros();
//! assert_eq!(traits.get(Trait::Curiosity), 0.0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_precision_loss)]

pub mod config;
pub mod error;
pub mod math;
pub mod types;

// Re-export commonly used types at crate root
pub use config::{
    AdaptationConfig, DegradationConfig, DegradationPolicy, GateConfig, SessionConfig, SignalConfig,
    TransitionConfig,
};
pub use error::{ConfigError, ConfigResult};
pub use types::{EegBand, EegSample, LearningStage, NeuralState, Trait, TraitVector, TRAIT_COUNT};
