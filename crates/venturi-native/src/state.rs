//! Learning / neural state machine
//!
//! ```text
//!            eng ≥ focus × N           dwell ≥ learning
//!  RESTING ─────────────────▶ FOCUSED ─────────────────▶ LEARNING
//!     ▲   ◀─────────────────     ▲                        │    │
//!     │        eng < rest        │ eng ≥ focus  eng < rest│    │ fatigue
//!     │                          └──── PROCESSING ◀───────┘    │
//!     │  dwell ≥ consolidating             │ dwell ≥ processing │
//!     └──────────────────── CONSOLIDATING ◀┴────────────────────┘
//! ```
//!
//! Learning stages advance on sustained learning and on the projected trait
//! score:
//!
//! ```text
//!  ACQUISITION ─▶ CONSOLIDATION ─▶ RETRIEVAL ─▶ ADAPTATION ─▶ ACQUISITION
//! ```
//!
//! with a fall-back of one stage when the score drops below the entry
//! threshold minus the hysteresis margin.
//!
//! [`transition`] is pure and total: every input, including non-finite
//! values, maps to a defined next state.

use serde::{Deserialize, Serialize};

use venturi_core::config::TransitionConfig;
use venturi_core::types::{LearningStage, NeuralState};

use crate::gates::NormalizedFeatures;

/// Full state carried between cycles
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineState {
    /// Current learning stage
    pub stage: LearningStage,
    /// Current neural state
    pub neural: NeuralState,
    /// Consecutive cycles with engagement at or above the focus threshold
    pub focus_streak: u32,
    /// Completed cycles in the current neural state
    pub neural_dwell: u32,
    /// Completed cycles in the current learning stage
    pub stage_dwell: u32,
    /// LEARNING cycles accumulated during the current stage
    pub learning_total: u32,
    /// Sample time at which the current stage was entered
    pub stage_entered_us: Option<u64>,
    /// Transitions evaluated since session start
    pub cycle: u64,
    /// Sample time of the last stage or neural change
    pub last_transition_us: Option<u64>,
}

impl MachineState {
    /// `(ACQUISITION, RESTING)` with all counters cleared
    #[must_use]
    pub fn initial() -> Self {
        Self::default()
    }
}

/// Compute the state after one successful cycle.
///
/// `features` are the INPUT gate's canonical values, `score` the projected
/// trait score and `timestamp_us` the newest sample time of the window.
#[must_use]
pub fn transition(
    state: &MachineState,
    features: &NormalizedFeatures,
    score: f64,
    timestamp_us: u64,
    config: &TransitionConfig,
) -> MachineState {
    let engaged = features.engagement >= config.focus_engagement;
    let focus_streak = if engaged { state.focus_streak.saturating_add(1) } else { 0 };
    let neural_dwell = state.neural_dwell.saturating_add(1);

    let neural = next_neural(state.neural, features, focus_streak, neural_dwell, config);
    let neural_dwell = if neural == state.neural { neural_dwell } else { 0 };

    let learning_total = if neural == NeuralState::Learning {
        state.learning_total.saturating_add(1)
    } else {
        state.learning_total
    };

    let entered = state.stage_entered_us.unwrap_or(timestamp_us);
    let stage_dwell = state.stage_dwell.saturating_add(1);
    let may_leave = timestamp_us.saturating_sub(entered) >= config.min_stage_dwell_us;

    let stage = if may_leave {
        next_stage(state.stage, neural, score, stage_dwell, learning_total, config)
    } else {
        state.stage
    };

    let changed = stage != state.stage || neural != state.neural;
    let last_transition_us = if changed { Some(timestamp_us) } else { state.last_transition_us };
    let cycle = state.cycle.saturating_add(1);

    if stage == state.stage {
        MachineState {
            stage,
            neural,
            focus_streak,
            neural_dwell,
            stage_dwell,
            learning_total,
            stage_entered_us: Some(entered),
            cycle,
            last_transition_us,
        }
    } else {
        MachineState {
            stage,
            neural,
            focus_streak,
            neural_dwell,
            stage_dwell: 0,
            learning_total: 0,
            stage_entered_us: Some(timestamp_us),
            cycle,
            last_transition_us,
        }
    }
}

fn next_neural(
    current: NeuralState,
    features: &NormalizedFeatures,
    focus_streak: u32,
    dwell: u32,
    config: &TransitionConfig,
) -> NeuralState {
    let engaged = features.engagement >= config.focus_engagement;
    // NaN engagement is neither engaged nor disengaged
    let disengaged = features.engagement < config.rest_engagement;
    let fatigued = features.fatigue >= config.fatigue_threshold;

    match current {
        NeuralState::Resting if focus_streak >= config.focus_cycles => NeuralState::Focused,
        NeuralState::Focused if disengaged => NeuralState::Resting,
        NeuralState::Focused if engaged && dwell >= config.learning_cycles => NeuralState::Learning,
        NeuralState::Learning if fatigued => NeuralState::Consolidating,
        NeuralState::Learning if disengaged => NeuralState::Processing,
        NeuralState::Processing if engaged => NeuralState::Focused,
        NeuralState::Processing if dwell >= config.processing_cycles => NeuralState::Consolidating,
        NeuralState::Consolidating if dwell >= config.consolidating_cycles => NeuralState::Resting,
        other => other,
    }
}

fn next_stage(
    current: LearningStage,
    neural: NeuralState,
    score: f64,
    dwell: u32,
    learning_total: u32,
    config: &TransitionConfig,
) -> LearningStage {
    let attentive = matches!(neural, NeuralState::Focused | NeuralState::Learning);

    match current {
        LearningStage::Acquisition
            if learning_total >= config.acquisition_cycles || neural == NeuralState::Consolidating =>
        {
            LearningStage::Consolidation
        }
        LearningStage::Consolidation if attentive && score >= config.retrieval_score => LearningStage::Retrieval,
        LearningStage::Retrieval if score >= config.adaptation_score => LearningStage::Adaptation,
        LearningStage::Retrieval if score < config.retrieval_score - config.score_hysteresis => {
            LearningStage::Consolidation
        }
        LearningStage::Adaptation if score < config.adaptation_score - config.score_hysteresis => {
            LearningStage::Retrieval
        }
        LearningStage::Adaptation if dwell >= config.adaptation_cycles && neural == NeuralState::Resting => {
            LearningStage::Acquisition
        }
        other => other,
    }
}
