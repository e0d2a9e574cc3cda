//! Venturi stage pipeline
//!
//! Three gates run in sequence on every cycle:
//!
//! ```text
//!  FeatureVector ──▶ INPUT ──▶ PROCESSING ──▶ OUTPUT ──▶ Emission
//!                  throttle    adaptation     smoothing
//!                  normalise   transform
//! ```
//!
//! - [`input`]: Ceiling-limited normalisation against a moving baseline
//! - [`processing`]: Per-trait drives, environment and experience factors
//! - [`output`]: Smoothed, step-limited emission
//!
//! Gates are pure: each takes its previous state by reference and returns the
//! next one, so a cycle that fails later can discard the new state. Each gate
//! is timed against its own budget; an overrun flags the gate as degraded but
//! never stops the pipeline.

pub mod input;
pub mod output;
pub mod processing;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::trace;

use venturi_core::config::SessionConfig;

use crate::clock::Clock;
use crate::features::FeatureVector;

pub use input::{InputGate, InputGateState, NormalizedFeatures};
pub use output::{Emission, OutputGate, OutputGateState, OutputInput};
pub use processing::{AdaptationDrive, ProcessingGate};

/// Identifies a gate
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GateKind {
    /// Normalisation and throttling
    Input,
    /// Adaptation transform
    Processing,
    /// Output shaping
    Output,
}

impl GateKind {
    /// Gate name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Input => "INPUT",
            Self::Processing => "PROCESSING",
            Self::Output => "OUTPUT",
        }
    }
}

/// One stage of the pipeline
pub trait Gate {
    /// Value consumed
    type Input;
    /// Value produced
    type Output;
    /// State carried between cycles
    type State: Clone + Default;

    /// Which gate this is
    const KIND: GateKind;

    /// Transform `input`, returning the output and the state for the next cycle
    fn process(&self, state: &Self::State, input: &Self::Input) -> (Self::Output, Self::State);
}

/// Whether `elapsed` overruns `budget`. A zero budget can never be met.
#[inline]
#[must_use]
pub fn exceeds_budget(elapsed: Duration, budget: Duration) -> bool {
    budget.is_zero() || elapsed > budget
}

/// Latency of one gate in one cycle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateTiming {
    /// Gate measured
    pub gate: GateKind,
    /// Measured processing time
    pub elapsed: Duration,
    /// Configured budget
    pub budget: Duration,
    /// Whether the budget was overrun
    pub degraded: bool,
}

fn timed<G: Gate>(
    gate: &G,
    state: &G::State,
    input: &G::Input,
    budget: Duration,
    clock: &dyn Clock,
) -> (G::Output, G::State, GateTiming) {
    let start = clock.now();
    let (output, next) = gate.process(state, input);
    let elapsed = clock.since(start);

    let timing = GateTiming {
        gate: G::KIND,
        elapsed,
        budget,
        degraded: exceeds_budget(elapsed, budget),
    };
    trace!(gate = G::KIND.name(), elapsed_ns = elapsed.as_nanos() as u64, degraded = timing.degraded, "gate");
    (output, next, timing)
}

/// State of all stateful gates
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PipelineState {
    /// INPUT gate baselines
    pub input: InputGateState,
    /// OUTPUT gate history
    pub output: OutputGateState,
}

/// Everything one pipeline pass produced
#[derive(Clone, Copy, Debug)]
pub struct PipelineRun {
    /// INPUT gate output
    pub normalized: NormalizedFeatures,
    /// PROCESSING gate output
    pub drive: AdaptationDrive,
    /// OUTPUT gate output
    pub emission: Emission,
    /// Per-gate latency in pipeline order
    pub timings: [GateTiming; 3],
    /// Gate state to commit if the cycle succeeds
    pub next_state: PipelineState,
}

impl PipelineRun {
    /// Whether any gate overran its budget
    #[must_use]
    pub fn degraded(&self) -> bool {
        self.timings.iter().any(|t| t.degraded)
    }
}

/// The three-gate pipeline of one session
#[derive(Clone, Debug)]
pub struct VenturiPipeline {
    input: InputGate,
    processing: ProcessingGate,
    output: OutputGate,
    budgets: [Duration; 3],
}

impl VenturiPipeline {
    /// Build the gates from session configuration
    #[must_use]
    pub fn new(config: &SessionConfig) -> Self {
        let gates = &config.gates;
        Self {
            input: InputGate::new(gates),
            processing: ProcessingGate::new(&config.adaptation),
            output: OutputGate::new(gates),
            budgets: [
                Duration::from_micros(gates.input_budget_us),
                Duration::from_micros(gates.processing_budget_us),
                Duration::from_micros(gates.output_budget_us),
            ],
        }
    }

    /// Run all three gates on one feature vector
    pub fn run(&self, state: &PipelineState, features: &FeatureVector, clock: &dyn Clock) -> PipelineRun {
        let (normalized, input_state, t_in) = timed(&self.input, &state.input, features, self.budgets[0], clock);
        let (drive, (), t_proc) = timed(&self.processing, &(), &normalized, self.budgets[1], clock);
        let (emission, output_state, t_out) = timed(
            &self.output,
            &state.output,
            &OutputInput { normalized, drive },
            self.budgets[2],
            clock,
        );

        PipelineRun {
            normalized,
            drive,
            emission,
            timings: [t_in, t_proc, t_out],
            next_state: PipelineState { input: input_state, output: output_state },
        }
    }
}
