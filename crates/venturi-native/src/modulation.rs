//! Trait Modulation Engine
//!
//! One pure update per cycle:
//!
//! - **Drift**: `trait + rate · drive · (1 + env_weight · env)`, clamped to `[0, 1]`
//! - **Growth**: `base · (1 - level / saturation) · experience · ln(1 + elapsed)`
//!   added to the plasticity level, clamped to `[0, saturation]`
//! - **Projection**: `Σ wᵢ · traitᵢ`, the score read by the state machine
//!
//! Inputs are validated before anything is computed, so a rejected update
//! produces no new state at all.

use serde::{Deserialize, Serialize};

use venturi_core::config::AdaptationConfig;
use venturi_core::types::{Trait, TraitVector, TRAIT_COUNT};

use crate::error::{TraitError, TraitResult};
use crate::features::FeatureVector;
use crate::gates::AdaptationDrive;

/// Trait vector and plasticity level of a session; zero at session start
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TraitState {
    /// Per-trait values in `[0, 1]`
    pub traits: TraitVector,
    /// Neuroplasticity level in `[0, saturation]`
    pub plasticity: f64,
}

/// Result of one trait update
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TraitUpdate {
    /// State to commit
    pub state: TraitState,
    /// Plasticity added this cycle
    pub growth: f64,
    /// Projected trait score of the new state
    pub score: f64,
}

/// Applies the adaptation equations with fixed session constants
#[derive(Clone, Debug)]
pub struct TraitEngine {
    adaptation_rate: f64,
    env_weight: f64,
    base_rate: f64,
    saturation: f64,
    weights: [f64; TRAIT_COUNT],
}

impl TraitEngine {
    /// Create from adaptation configuration
    #[must_use]
    pub fn new(config: &AdaptationConfig) -> Self {
        Self {
            adaptation_rate: config.adaptation_rate,
            env_weight: config.env_weight,
            base_rate: config.base_rate,
            saturation: config.saturation,
            weights: config.projection_weights,
        }
    }

    /// Weighted projection of a trait vector onto one score
    #[must_use]
    pub fn project(&self, traits: &TraitVector) -> f64 {
        traits
            .values()
            .iter()
            .zip(self.weights.iter())
            .map(|(t, w)| t * w)
            .sum()
    }

    /// Compute the next trait state.
    ///
    /// # Errors
    ///
    /// `TraitError::InvalidCycleInput` if `elapsed_s` is negative or
    /// non-finite, or any feature, drive or factor is out of its domain.
    pub fn update(
        &self,
        previous: &TraitState,
        features: &FeatureVector,
        drive: &AdaptationDrive,
        elapsed_s: f64,
    ) -> TraitResult<TraitUpdate> {
        validate_inputs(features, drive, elapsed_s)?;

        let env = 1.0 + self.env_weight * drive.env_factor;
        let mut traits = previous.traits;
        for t in Trait::ALL {
            let delta = self.adaptation_rate * drive.drive(t) * env;
            traits.set(t, previous.traits.get(t) + delta);
        }

        let level = previous.plasticity.clamp(0.0, self.saturation);
        let growth = self.base_rate * (1.0 - level / self.saturation) * drive.experience * elapsed_s.ln_1p();
        let plasticity = (level + growth).clamp(0.0, self.saturation);

        let state = TraitState { traits, plasticity };
        Ok(TraitUpdate {
            state,
            growth: plasticity - level,
            score: self.project(&traits),
        })
    }
}

fn validate_inputs(features: &FeatureVector, drive: &AdaptationDrive, elapsed_s: f64) -> TraitResult<()> {
    if !elapsed_s.is_finite() || elapsed_s < 0.0 {
        return Err(TraitError::InvalidCycleInput { field: "elapsed_s", value: elapsed_s });
    }
    if let Some((field, value)) = features.first_out_of_domain() {
        return Err(TraitError::InvalidCycleInput { field, value });
    }
    if let Some(&value) = drive.drives.iter().find(|d| !d.is_finite()) {
        return Err(TraitError::InvalidCycleInput { field: "drive", value });
    }
    if !drive.env_factor.is_finite() {
        return Err(TraitError::InvalidCycleInput { field: "env_factor", value: drive.env_factor });
    }
    if !(0.0..=1.0).contains(&drive.experience) {
        return Err(TraitError::InvalidCycleInput { field: "experience", value: drive.experience });
    }
    Ok(())
}
