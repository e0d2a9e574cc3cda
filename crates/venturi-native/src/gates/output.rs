//! OUTPUT gate: shaping and smoothing of emitted values
//!
//! Consecutive emissions move toward the new values by the smoothing factor
//! and never by more than `max_step` per cycle.

use serde::{Deserialize, Serialize};

use venturi_core::config::GateConfig;
use venturi_core::types::TRAIT_COUNT;

use super::input::NormalizedFeatures;
use super::processing::AdaptationDrive;
use super::{Gate, GateKind};

/// Canonical, smoothed values emitted by a cycle
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Emission {
    /// Smoothed canonical engagement
    pub engagement: f64,
    /// Smoothed canonical attention
    pub attention: f64,
    /// Smoothed canonical fatigue
    pub fatigue: f64,
    /// Smoothed drive and factors, reported only
    pub drive: AdaptationDrive,
}

/// Input of the OUTPUT gate
#[derive(Clone, Copy, Debug)]
pub struct OutputInput {
    /// INPUT gate result
    pub normalized: NormalizedFeatures,
    /// PROCESSING gate result
    pub drive: AdaptationDrive,
}

/// Previous emission, if any
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct OutputGateState {
    previous: Option<Emission>,
}

impl OutputGateState {
    /// Last emitted values
    #[must_use]
    pub fn previous(&self) -> Option<&Emission> {
        self.previous.as_ref()
    }
}

/// Smoothing gate
#[derive(Clone, Debug)]
pub struct OutputGate {
    smoothing: f64,
    max_step: f64,
}

impl OutputGate {
    /// Create from gate configuration
    #[must_use]
    pub fn new(config: &GateConfig) -> Self {
        Self {
            smoothing: config.output_smoothing,
            max_step: config.max_step,
        }
    }

    fn shape(&self, previous: f64, target: f64) -> f64 {
        let step = (self.smoothing * (target - previous)).clamp(-self.max_step, self.max_step);
        previous + step
    }
}

impl Gate for OutputGate {
    type Input = OutputInput;
    type Output = Emission;
    type State = OutputGateState;

    const KIND: GateKind = GateKind::Output;

    fn process(&self, state: &OutputGateState, input: &OutputInput) -> (Emission, OutputGateState) {
        let target = Emission {
            engagement: input.normalized.engagement,
            attention: input.normalized.attention,
            fatigue: input.normalized.fatigue,
            drive: input.drive,
        };

        let emission = match state.previous {
            None => target,
            Some(prev) => {
                let mut drives = [0.0; TRAIT_COUNT];
                for (i, d) in drives.iter_mut().enumerate() {
                    *d = self.shape(prev.drive.drives[i], target.drive.drives[i]);
                }
                Emission {
                    engagement: self.shape(prev.engagement, target.engagement),
                    attention: self.shape(prev.attention, target.attention),
                    fatigue: self.shape(prev.fatigue, target.fatigue),
                    drive: AdaptationDrive {
                        drives,
                        env_factor: self.shape(prev.drive.env_factor, target.drive.env_factor),
                        experience: self.shape(prev.drive.experience, target.drive.experience),
                    },
                }
            }
        };

        (emission, OutputGateState { previous: Some(emission) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(level: f64) -> OutputInput {
        OutputInput {
            normalized: NormalizedFeatures {
                engagement: level,
                attention: level,
                fatigue: 0.0,
                trend: 0.0,
                throttled: false,
            },
            drive: AdaptationDrive {
                drives: [level - 0.5; TRAIT_COUNT],
                env_factor: level,
                experience: level,
            },
        }
    }

    #[test]
    fn test_first_emission_is_unsmoothed() {
        let gate = OutputGate::new(&GateConfig::default());
        let (emission, state) = gate.process(&OutputGateState::default(), &input(0.8));
        assert!((emission.engagement - 0.8).abs() < 1e-12);
        assert_eq!(state.previous(), Some(&emission));
    }

    #[test]
    fn test_jump_is_limited_by_max_step() {
        let gate = OutputGate::new(&GateConfig::default());
        let (_, state) = gate.process(&OutputGateState::default(), &input(0.0));
        let (emission, _) = gate.process(&state, &input(1.0));

        // smoothing 0.5 would move 0.5, max_step caps it at 0.25
        assert!((emission.engagement - 0.25).abs() < 1e-12);
        assert!((emission.drive.drives[0] - (-0.25)).abs() < 1e-12);
    }

    #[test]
    fn test_small_change_is_smoothed() {
        let gate = OutputGate::new(&GateConfig::default());
        let (_, state) = gate.process(&OutputGateState::default(), &input(0.5));
        let (emission, _) = gate.process(&state, &input(0.6));
        assert!((emission.engagement - 0.55).abs() < 1e-12);
    }

    #[test]
    fn test_unit_smoothing_tracks_input_within_step() {
        let config = GateConfig { output_smoothing: 1.0, max_step: 1.0, ..GateConfig::default() };
        let gate = OutputGate::new(&config);
        let (_, state) = gate.process(&OutputGateState::default(), &input(0.1));
        let (emission, _) = gate.process(&state, &input(0.9));
        assert!((emission.engagement - 0.9).abs() < 1e-12);
    }
}
