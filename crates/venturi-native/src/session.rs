//! Cycle orchestrator
//!
//! A [`Session`] owns every piece of per-user state: the signal buffer, gate
//! baselines, trait vector and state machine. [`Session::process_window`]
//! ingests one sample and, once a full window is buffered, runs a complete
//! cycle:
//!
//! 1. Push the sample into the buffer
//! 2. Extract features from the newest window
//! 3. Run the INPUT, PROCESSING and OUTPUT gates
//! 4. Update traits and plasticity
//! 5. Advance the learning/neural state machine
//!
//! All new state is computed into locals and committed only after the last
//! step succeeds. A failing cycle also takes its sample back out of the buffer.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, trace, warn};

use venturi_core::config::SessionConfig;
use venturi_core::error::ConfigError;
use venturi_core::types::{EegSample, LearningStage, NeuralState, TraitVector};

use crate::buffer::SignalBuffer;
use crate::clock::{Clock, MonotonicClock};
use crate::degradation::WindowGovernor;
use crate::error::{CycleError, FeatureError};
use crate::features::{FeatureExtractor, FeatureVector};
use crate::gates::{exceeds_budget, Emission, GateTiming, PipelineState, VenturiPipeline};
use crate::modulation::{TraitEngine, TraitState};
use crate::state::{self, MachineState};

const MICROS_PER_SECOND: f64 = 1_000_000.0;

/// Latency of a whole cycle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct CycleTiming {
    /// Per-gate timings in pipeline order
    pub gates: [GateTiming; 3],
    /// Entry-to-exit latency of the cycle
    pub total: Duration,
    /// Configured cycle budget
    pub budget: Duration,
    /// Whether the cycle as a whole overran its budget
    pub degraded: bool,
}

/// Output of one completed cycle
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CycleResult {
    /// Sequence number within the session, from 1
    pub cycle_id: u64,
    /// Features of the analysed window
    pub features: FeatureVector,
    /// Smoothed values emitted by the OUTPUT gate
    pub emission: Emission,
    /// Trait vector after this cycle
    pub traits: TraitVector,
    /// Plasticity level after this cycle
    pub plasticity: f64,
    /// Projected trait score after this cycle
    pub trait_score: f64,
    /// Learning stage after this cycle
    pub stage: LearningStage,
    /// Neural state after this cycle
    pub neural_state: NeuralState,
    /// Gate and cycle latency
    pub timing: CycleTiming,
    /// Whether any gate or the whole cycle overran its budget
    pub degraded: bool,
    /// Whether the INPUT gate capped a feature
    pub throttled: bool,
    /// Samples in the analysed window
    pub window_len: usize,
}

/// What one call to [`Session::process_window`] produced
#[derive(Clone, Debug, PartialEq)]
#[allow(clippy::large_enum_variant)]
pub enum CycleOutcome {
    /// Not enough samples buffered for a window yet
    Pending {
        /// Samples buffered so far
        buffered: usize,
        /// Samples the next window needs
        required: usize,
    },
    /// A full cycle ran
    Complete(CycleResult),
}

impl CycleOutcome {
    /// Whether the cycle is still waiting for data
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }

    /// The completed result, if any
    #[must_use]
    pub fn into_result(self) -> Option<CycleResult> {
        match self {
            Self::Complete(result) => Some(result),
            Self::Pending { .. } => None,
        }
    }
}

/// State of one user or device
pub struct Session {
    config: SessionConfig,
    clock: Arc<dyn Clock>,
    buffer: SignalBuffer,
    extractor: FeatureExtractor,
    pipeline: VenturiPipeline,
    engine: TraitEngine,
    governor: WindowGovernor,
    gates: PipelineState,
    traits: TraitState,
    machine: MachineState,
    previous: Option<FeatureVector>,
    cycles: u64,
}

/// Everything a successful cycle will commit
struct Committed {
    result: CycleResult,
    gates: PipelineState,
    traits: TraitState,
    machine: MachineState,
    governor: WindowGovernor,
}

impl Session {
    /// Open a session timed by the wall clock
    ///
    /// # Errors
    ///
    /// Returns the first invalid configuration field.
    pub fn new(config: SessionConfig) -> Result<Self, ConfigError> {
        Self::with_clock(config, Arc::new(MonotonicClock::new()))
    }

    /// Open a session timed by `clock`
    ///
    /// # Errors
    ///
    /// Returns the first invalid configuration field.
    pub fn with_clock(config: SessionConfig, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        config.validate()?;

        debug!(
            sample_rate_hz = config.signal.sample_rate_hz,
            channels = config.signal.channel_count,
            window = config.signal.window_size,
            "Session created"
        );

        Ok(Self {
            buffer: SignalBuffer::new(config.signal.buffer_capacity, config.signal.channel_count),
            extractor: FeatureExtractor::new(config.signal.sample_rate_hz),
            pipeline: VenturiPipeline::new(&config),
            engine: TraitEngine::new(&config.adaptation),
            governor: WindowGovernor::new(&config),
            gates: PipelineState::default(),
            traits: TraitState::default(),
            machine: MachineState::initial(),
            previous: None,
            cycles: 0,
            clock,
            config,
        })
    }

    /// Ingest one sample and run a cycle if a full window is available.
    ///
    /// # Errors
    ///
    /// - `ChannelMismatch` if the sample shape differs from the session's
    /// - `MalformedWindow` if the sample or window holds non-finite values
    /// - `InvalidCycleInput` if time runs backwards between cycles
    ///
    /// On error the session is exactly as it was before the call.
    pub fn process_window(&mut self, sample: EegSample) -> Result<CycleOutcome, CycleError> {
        let start = self.clock.now();
        let non_finite = sample.first_non_finite();
        let receipt = self.buffer.push(sample)?;

        let required = self.governor.current();
        if self.buffer.len() < required {
            if let Some(channel) = non_finite {
                // Would poison every window it ends up in
                let sample_index = self.buffer.len() - 1;
                self.buffer.undo_push(receipt);
                return Err(FeatureError::MalformedWindow { sample_index, channel }.into());
            }
            trace!(buffered = self.buffer.len(), required, "Pending");
            return Ok(CycleOutcome::Pending { buffered: self.buffer.len(), required });
        }

        match self.run_cycle(required, start) {
            Ok(committed) => Ok(CycleOutcome::Complete(self.commit(committed))),
            Err(e) => {
                self.buffer.undo_push(receipt);
                debug!(error = %e, kind = ?e.kind(), "Cycle rejected");
                Err(e)
            }
        }
    }

    fn run_cycle(&mut self, window_len: usize, start: Duration) -> Result<Committed, CycleError> {
        let window = self.buffer.window(window_len)?;
        let features = self.extractor.extract(window, self.previous.as_ref())?;

        let elapsed_s = match &self.previous {
            Some(prev) => (features.timestamp_us as f64 - prev.timestamp_us as f64) / MICROS_PER_SECOND,
            None => window.span_us() as f64 / MICROS_PER_SECOND,
        };

        let run = self.pipeline.run(&self.gates, &features, self.clock.as_ref());
        let update = self.engine.update(&self.traits, &features, &run.drive, elapsed_s)?;
        let machine = state::transition(
            &self.machine,
            &run.normalized,
            update.score,
            features.timestamp_us,
            &self.config.transitions,
        );

        let total = self.clock.since(start);
        let budget = Duration::from_micros(self.config.gates.cycle_budget_us);
        let timing = CycleTiming {
            gates: run.timings,
            total,
            budget,
            degraded: exceeds_budget(total, budget),
        };
        let degraded = timing.degraded || run.degraded();

        Ok(Committed {
            result: CycleResult {
                cycle_id: self.cycles + 1,
                emission: run.emission,
                traits: update.state.traits,
                plasticity: update.state.plasticity,
                trait_score: update.score,
                stage: machine.stage,
                neural_state: machine.neural,
                timing,
                degraded,
                throttled: run.normalized.throttled,
                window_len,
                features,
            },
            gates: run.next_state,
            traits: update.state,
            machine,
            governor: self.governor.after_cycle(degraded),
        })
    }

    fn commit(&mut self, c: Committed) -> CycleResult {
        if c.machine.neural != self.machine.neural || c.machine.stage != self.machine.stage {
            debug!(
                from_stage = self.machine.stage.name(),
                to_stage = c.machine.stage.name(),
                from_neural = self.machine.neural.name(),
                to_neural = c.machine.neural.name(),
                "State transition"
            );
        }
        if c.governor.current() != self.governor.current() {
            debug!(from = self.governor.current(), to = c.governor.current(), "Analysis window resized");
        }

        self.cycles = c.result.cycle_id;
        self.gates = c.gates;
        self.traits = c.traits;
        self.machine = c.machine;
        self.governor = c.governor;
        self.previous = Some(c.result.features.clone());

        let r = c.result;
        if r.degraded {
            warn!(
                cycle = r.cycle_id,
                total_us = r.timing.total.as_micros() as u64,
                budget_us = r.timing.budget.as_micros() as u64,
                "Cycle degraded"
            );
        }
        debug!(
            cycle = r.cycle_id,
            stage = r.stage.name(),
            neural = r.neural_state.name(),
            score = r.trait_score,
            "Cycle complete"
        );
        r
    }

    /// Configuration the session was opened with
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Current traits and plasticity
    #[must_use]
    pub fn traits(&self) -> &TraitState {
        &self.traits
    }

    /// Current learning stage and neural state
    #[must_use]
    pub fn state(&self) -> &MachineState {
        &self.machine
    }

    /// Samples currently buffered
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Completed cycles
    #[must_use]
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Window length the next cycle analyses
    #[must_use]
    pub fn window_len(&self) -> usize {
        self.governor.current()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("cycles", &self.cycles)
            .field("buffered", &self.buffer.len())
            .field("traits", &self.traits)
            .field("machine", &self.machine)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FrozenClock;
    use crate::error::{BufferError, ErrorKind};

    fn sample(i: u64, channels: usize) -> EegSample {
        let v = (i as f64 * 0.7).sin() * 10.0 + (i as f64 * 2.3).cos() * 3.0;
        EegSample::new(i * 4_000, vec![v; channels])
    }

    fn frozen(config: SessionConfig) -> Session {
        Session::with_clock(config, Arc::new(FrozenClock)).unwrap()
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mut config = SessionConfig::new(256.0, 4, 8);
        config.signal.channel_count = 0;
        assert!(Session::new(config).is_err());
    }

    #[test]
    fn test_pending_until_window_full() {
        let mut session = frozen(SessionConfig::new(250.0, 2, 8));
        for i in 0..7 {
            let outcome = session.process_window(sample(i, 2)).unwrap();
            assert_eq!(outcome, CycleOutcome::Pending { buffered: i as usize + 1, required: 8 });
        }
        let outcome = session.process_window(sample(7, 2)).unwrap();
        let result = outcome.into_result().unwrap();
        assert_eq!(result.cycle_id, 1);
        assert_eq!(result.window_len, 8);
        assert_eq!(session.cycles(), 1);
    }

    #[test]
    fn test_channel_mismatch_keeps_session_usable() {
        let mut session = frozen(SessionConfig::new(250.0, 2, 8));
        let err = session.process_window(sample(0, 3)).unwrap_err();
        assert_eq!(err, CycleError::Buffer(BufferError::ChannelMismatch { expected: 2, got: 3 }));
        assert_eq!(session.buffered(), 0);

        assert!(session.process_window(sample(0, 2)).unwrap().is_pending());
        assert_eq!(session.buffered(), 1);
    }

    #[test]
    fn test_non_finite_sample_rejected_while_warming_up() {
        let mut session = frozen(SessionConfig::new(250.0, 2, 8));
        session.process_window(sample(0, 2)).unwrap();

        let bad = EegSample::new(4_000, vec![1.0, f64::NAN]);
        let err = session.process_window(bad).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedWindow);
        assert_eq!(session.buffered(), 1);
    }

    #[test]
    fn test_backwards_time_is_invalid_input() {
        let mut session = frozen(SessionConfig::new(250.0, 1, 8));
        for i in 0..8 {
            session.process_window(sample(i, 1)).unwrap();
        }
        let traits = *session.traits();
        let machine = *session.state();

        let err = session.process_window(EegSample::new(0, vec![1.0])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidCycleInput);
        assert_eq!(*session.traits(), traits);
        assert_eq!(*session.state(), machine);
        assert_eq!(session.cycles(), 1);
        assert_eq!(session.buffered(), 8);

        // The next well-ordered sample completes cycle 2
        let result = session.process_window(sample(8, 1)).unwrap().into_result().unwrap();
        assert_eq!(result.cycle_id, 2);
    }

    #[test]
    fn test_trait_engine_reads_processing_drive() {
        let mut session = frozen(SessionConfig::new(250.0, 2, 16));
        let mut smoothed_differs = false;

        for i in 0..120 {
            let gates = session.gates;
            let traits = session.traits;
            let previous = session.previous.clone();

            let CycleOutcome::Complete(r) = session.process_window(sample(i, 2)).unwrap() else {
                continue;
            };
            let Some(prev) = previous else { continue };

            let run = session.pipeline.run(&gates, &r.features, &FrozenClock);
            let elapsed_s = (r.features.timestamp_us as f64 - prev.timestamp_us as f64) / MICROS_PER_SECOND;
            let expected = session.engine.update(&traits, &r.features, &run.drive, elapsed_s).unwrap();

            assert_eq!(r.traits, expected.state.traits);
            assert_eq!(r.plasticity, expected.state.plasticity);
            smoothed_differs |= r.emission.drive != run.drive;
        }
        // Output smoothing must have diverged at least once for the check to mean anything
        assert!(smoothed_differs);
    }

    #[test]
    fn test_traits_stay_bounded() {
        let mut session = frozen(SessionConfig::new(250.0, 2, 16));
        for i in 0..200 {
            if let CycleOutcome::Complete(r) = session.process_window(sample(i, 2)).unwrap() {
                assert!(r.traits.values().iter().all(|v| (0.0..=1.0).contains(v)));
                assert!(r.plasticity >= 0.0 && r.plasticity <= 1.0);
            }
        }
        assert_eq!(session.cycles(), 200 - 15);
    }
}
