//! INPUT gate: throttle and normalise raw features
//!
//! Each throttled feature keeps a moving baseline. The gate's ceiling is the
//! baseline times the throttle ratio, so a sudden spike passes through only
//! as far as the ceiling while the baseline catches up over several cycles.

use serde::{Deserialize, Serialize};

use venturi_core::config::GateConfig;
use venturi_core::math::{clamp_unit, smooth, squash};

use super::{Gate, GateKind};
use crate::features::FeatureVector;

const ENGAGEMENT: usize = 0;
const ATTENTION: usize = 1;
const FATIGUE: usize = 2;
const THROTTLED: usize = 3;

/// Canonical features leaving the INPUT gate
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedFeatures {
    /// Throttled engagement, squashed into [0, 1)
    pub engagement: f64,
    /// Throttled attention in [0, 1]
    pub attention: f64,
    /// Throttled fatigue in [0, 1]
    pub fatigue: f64,
    /// Engagement trend passed through, in [-1, 1]
    pub trend: f64,
    /// Whether any feature hit its ceiling this cycle
    pub throttled: bool,
}

/// Moving baselines of the throttled features
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct InputGateState {
    baselines: Option<[f64; THROTTLED]>,
}

impl InputGateState {
    /// Baselines of engagement, attention and fatigue, once seeded
    #[must_use]
    pub fn baselines(&self) -> Option<[f64; THROTTLED]> {
        self.baselines
    }
}

/// Normalising, spike-dampening gate
#[derive(Clone, Debug)]
pub struct InputGate {
    throttle_ratio: f64,
    smoothing: f64,
    ceiling_floor: f64,
}

impl InputGate {
    /// Create from gate configuration
    #[must_use]
    pub fn new(config: &GateConfig) -> Self {
        Self {
            throttle_ratio: config.throttle_ratio,
            smoothing: config.baseline_smoothing,
            ceiling_floor: config.ceiling_floor,
        }
    }
}

impl Gate for InputGate {
    type Input = FeatureVector;
    type Output = NormalizedFeatures;
    type State = InputGateState;

    const KIND: GateKind = GateKind::Input;

    fn process(&self, state: &InputGateState, features: &FeatureVector) -> (NormalizedFeatures, InputGateState) {
        let raw = [features.engagement_index, features.attention_index, features.fatigue_index];
        // The first window seeds the baselines, so it always passes unthrottled
        let baselines = state.baselines.unwrap_or(raw);

        let mut throttled = [0.0; THROTTLED];
        let mut next = [0.0; THROTTLED];
        let mut clipped = false;
        for i in 0..THROTTLED {
            let ceiling = (baselines[i] * self.throttle_ratio).max(self.ceiling_floor);
            // Written as a comparison so a NaN input is not masked
            throttled[i] = if raw[i] > ceiling {
                clipped = true;
                ceiling
            } else {
                raw[i]
            };
            next[i] = smooth(baselines[i], throttled[i], self.smoothing);
        }

        let output = NormalizedFeatures {
            engagement: squash(throttled[ENGAGEMENT]),
            attention: clamp_unit(throttled[ATTENTION]),
            fatigue: clamp_unit(throttled[FATIGUE]),
            trend: features.engagement_trend.clamp(-1.0, 1.0),
            throttled: clipped,
        };
        (output, InputGateState { baselines: Some(next) })
    }
}
