//! Venturi Native - neuroadaptive EEG processing
//!
//! This crate turns a stream of multi-channel EEG samples into per-cycle
//! learning-state results:
//! - Ring buffering and windowing of samples
//! - Spectral and statistical feature extraction
//! - The three-gate Venturi pipeline with per-gate latency budgets
//! - Trait modulation and the learning/neural state machine
//! - Per-session orchestration and a multi-session async runtime
//!
//! # Modules
//!
//! - [`buffer`]: Fixed-capacity sample ring buffer
//! - [`processing`]: FFT band power analysis
//! - [`features`]: Feature extraction
//! - [`gates`]: INPUT, PROCESSING and OUTPUT gates
//! - [`modulation`]: Trait drift, plasticity growth and projection
//! - [`state`]: Learning/neural state machine
//! - [`session`]: Cycle orchestrator
//! - [`runtime`]: Concurrent sessions and the result queue
//! - [`config`]: Configuration file loading
//!
//! # Example
//!
//! ```rust
//! use venturi_core::config::SessionConfig;
//! use venturi_core::types::EegSample;
//! use venturi_native::session::{CycleOutcome, Session};
//!
//! let mut session = Session::new(SessionConfig::new(128.0, 2, 32)).unwrap();
//! for i in 0..32u64 {
//!     let v = (i as f64 * 0.8).sin();
//!     let outcome = session.process_window(EegSample::new(i * 7_812, vec![v, -v])).unwrap();
//!     if let CycleOutcome::Complete(result) = outcome {
//!         assert_eq!(result.cycle_id, 1);
//!     }
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]

pub mod buffer;
pub mod clock;
pub mod config;
pub mod degradation;
pub mod error;
pub mod features;
pub mod gates;
pub mod modulation;
pub mod processing;
pub mod runtime;
pub mod session;
pub mod state;

// Re-export key types
pub use clock::{Clock, FrozenClock, MonotonicClock, SteppingClock};
pub use error::{CycleError, ErrorKind};
pub use features::{FeatureExtractor, FeatureVector};
pub use gates::{GateKind, GateTiming, VenturiPipeline};
pub use modulation::{TraitEngine, TraitState};
pub use runtime::{BackpressurePolicy, ResultReceiver, RuntimeConfig, SessionEvent, SessionHandle, SessionRuntime};
pub use session::{CycleOutcome, CycleResult, CycleTiming, Session};
pub use state::MachineState;
