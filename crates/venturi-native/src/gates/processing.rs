//! PROCESSING gate: the adaptation transform
//!
//! Maps canonical features onto one signed drive per trait, plus the
//! environment and experience factors used by the trait engine.

use serde::{Deserialize, Serialize};

use venturi_core::config::AdaptationConfig;
use venturi_core::types::{Trait, TRAIT_COUNT};

use super::input::NormalizedFeatures;
use super::{Gate, GateKind};

/// Per-trait drive and modulation factors
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AdaptationDrive {
    /// Signed drive per trait in [-1, 1], in [`Trait::ALL`] order
    pub drives: [f64; TRAIT_COUNT],
    /// Environment factor in [-1, 1]: attention net of fatigue
    pub env_factor: f64,
    /// Experience factor in [0, 1]: engagement net of fatigue
    pub experience: f64,
}

impl AdaptationDrive {
    /// Drive of one trait
    #[must_use]
    pub const fn drive(&self, t: Trait) -> f64 {
        self.drives[t.index()]
    }
}

/// Stateless adaptation gate
#[derive(Clone, Debug)]
pub struct ProcessingGate {
    setpoint: f64,
    fatigue_penalty: f64,
}

impl ProcessingGate {
    /// Create from adaptation configuration
    #[must_use]
    pub fn new(config: &AdaptationConfig) -> Self {
        Self {
            setpoint: config.drive_setpoint,
            fatigue_penalty: config.fatigue_penalty,
        }
    }

    fn drive_for(&self, t: Trait, f: &NormalizedFeatures) -> f64 {
        let level = match t {
            Trait::Curiosity => f.engagement,
            Trait::Resilience => f.engagement - self.fatigue_penalty * f.fatigue,
            Trait::Openness => 0.5 * (f.engagement + f.attention),
            Trait::Focus => f.attention,
        };
        (level - self.setpoint).clamp(-1.0, 1.0)
    }
}

impl Gate for ProcessingGate {
    type Input = NormalizedFeatures;
    type Output = AdaptationDrive;
    type State = ();

    const KIND: GateKind = GateKind::Processing;

    fn process(&self, _state: &(), features: &NormalizedFeatures) -> (AdaptationDrive, ()) {
        let mut drives = [0.0; TRAIT_COUNT];
        for t in Trait::ALL {
            drives[t.index()] = self.drive_for(t, features);
        }

        let drive = AdaptationDrive {
            drives,
            env_factor: (features.attention - features.fatigue).clamp(-1.0, 1.0),
            experience: (features.engagement * (1.0 - features.fatigue)).clamp(0.0, 1.0),
        };
        (drive, ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalized(engagement: f64, attention: f64, fatigue: f64) -> NormalizedFeatures {
        NormalizedFeatures { engagement, attention, fatigue, trend: 0.0, throttled: false }
    }

    #[test]
    fn test_setpoint_is_neutral() {
        let gate = ProcessingGate::new(&AdaptationConfig::default());
        let (drive, ()) = gate.process(&(), &normalized(0.5, 0.5, 0.0));

        assert!(drive.drive(Trait::Curiosity).abs() < 1e-12);
        assert!(drive.drive(Trait::Focus).abs() < 1e-12);
        assert!(drive.drive(Trait::Openness).abs() < 1e-12);
        assert!((drive.env_factor - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_fatigue_lowers_resilience_and_experience() {
        let gate = ProcessingGate::new(&AdaptationConfig::default());
        let (fresh, ()) = gate.process(&(), &normalized(0.9, 0.8, 0.0));
        let (tired, ()) = gate.process(&(), &normalized(0.9, 0.8, 0.8));

        assert!(tired.drive(Trait::Resilience) < fresh.drive(Trait::Resilience));
        assert!(tired.experience < fresh.experience);
        assert!(tired.env_factor < fresh.env_factor);
        assert!((fresh.drive(Trait::Curiosity) - tired.drive(Trait::Curiosity)).abs() < 1e-12);
    }

    #[test]
    fn test_drives_are_bounded() {
        let gate = ProcessingGate::new(&AdaptationConfig::default());
        let (drive, ()) = gate.process(&(), &normalized(1.0, 1.0, 1.0));
        assert!(drive.drives.iter().all(|d| (-1.0..=1.0).contains(d)));
        assert!((0.0..=1.0).contains(&drive.experience));
    }
}
