//! Core types for the Venturi EEG core
//!
//! This module provides the vocabulary shared by every processing tier:
//! - Multi-channel EEG samples
//! - Standard EEG frequency bands
//! - The per-user trait vector
//! - Learning stages and neural states

use serde::{Deserialize, Serialize};

// ============================================================================
// EEG Samples
// ============================================================================

/// One time-stamped multi-channel EEG sample.
///
/// Channel values are in microvolts. The channel count is fixed per session
/// and checked at ingestion; a sample is never modified once captured.
///
/// # Example
///
/// ```
/// use venturi_core::types::EegSample;
///
/// let sample = EegSample::new(1_000, vec![12.5, -3.0, 4.25, 0.0]);
/// assert_eq!(sample.channel_count(), 4);
/// assert_eq!(sample.channel(2), Some(4.25));
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EegSample {
    timestamp_us: u64,
    channels: Box<[f64]>,
}

impl EegSample {
    /// Create a sample from a timestamp and per-channel voltages
    #[must_use]
    pub fn new(timestamp_us: u64, channels: impl Into<Vec<f64>>) -> Self {
        Self {
            timestamp_us,
            channels: channels.into().into_boxed_slice(),
        }
    }

    /// Timestamp in microseconds
    #[inline]
    #[must_use]
    pub const fn timestamp_us(&self) -> u64 {
        self.timestamp_us
    }

    /// Number of channels carried by this sample
    #[inline]
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Value of a single channel, if it exists
    #[inline]
    #[must_use]
    pub fn channel(&self, index: usize) -> Option<f64> {
        self.channels.get(index).copied()
    }

    /// All channel values
    #[inline]
    #[must_use]
    pub fn channels(&self) -> &[f64] {
        &self.channels
    }

    /// Index of the first non-finite channel value, if any
    #[must_use]
    pub fn first_non_finite(&self) -> Option<usize> {
        self.channels.iter().position(|v| !v.is_finite())
    }
}

// ============================================================================
// EEG Frequency Bands
// ============================================================================

/// Standard EEG frequency bands.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EegBand {
    /// Delta: 0.5-4 Hz (deep sleep)
    Delta,
    /// Theta: 4-8 Hz (drowsiness, memory)
    Theta,
    /// Alpha: 8-13 Hz (relaxed, eyes closed)
    Alpha,
    /// Beta: 13-30 Hz (active thinking)
    Beta,
    /// Gamma: 30-100 Hz (cognitive processing)
    Gamma,
}

impl EegBand {
    /// All bands in ascending frequency order
    pub const ALL: [Self; 5] = [Self::Delta, Self::Theta, Self::Alpha, Self::Beta, Self::Gamma];

    /// Get the frequency range for this band (low, high) in Hz
    #[inline]
    #[must_use]
    pub const fn range_hz(self) -> (f64, f64) {
        match self {
            Self::Delta => (0.5, 4.0),
            Self::Theta => (4.0, 8.0),
            Self::Alpha => (8.0, 13.0),
            Self::Beta => (13.0, 30.0),
            Self::Gamma => (30.0, 100.0),
        }
    }

    /// Get the band name
    #[inline]
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Delta => "Delta",
            Self::Theta => "Theta",
            Self::Alpha => "Alpha",
            Self::Beta => "Beta",
            Self::Gamma => "Gamma",
        }
    }
}

// ============================================================================
// Traits
// ============================================================================

/// Number of adaptive traits tracked per user
pub const TRAIT_COUNT: usize = 4;

/// An adaptive learning characteristic tracked per user.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trait {
    /// Drive to explore, follows engagement
    Curiosity,
    /// Tolerance to effort, follows engagement net of fatigue
    Resilience,
    /// Receptiveness to new material, follows engagement and attention together
    Openness,
    /// Sustained attention
    Focus,
}

impl Trait {
    /// All traits in vector order
    pub const ALL: [Self; TRAIT_COUNT] = [Self::Curiosity, Self::Resilience, Self::Openness, Self::Focus];

    /// Position of this trait inside a [`TraitVector`]
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Curiosity => 0,
            Self::Resilience => 1,
            Self::Openness => 2,
            Self::Focus => 3,
        }
    }

    /// Trait name
    #[inline]
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Curiosity => "curiosity",
            Self::Resilience => "resilience",
            Self::Openness => "openness",
            Self::Focus => "focus",
        }
    }
}

/// Per-user trait values, each held in `[0, 1]`.
///
/// Every write goes through [`TraitVector::set`], which clamps, so the
/// bound holds after any sequence of updates.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TraitVector {
    values: [f64; TRAIT_COUNT],
}

impl TraitVector {
    /// All traits at zero (session start)
    #[must_use]
    pub const fn zeros() -> Self {
        Self { values: [0.0; TRAIT_COUNT] }
    }

    /// Build from raw values, clamping each into `[0, 1]`
    #[must_use]
    pub fn from_values(values: [f64; TRAIT_COUNT]) -> Self {
        let mut v = Self::zeros();
        for t in Trait::ALL {
            v.set(t, values[t.index()]);
        }
        v
    }

    /// Current value of a trait
    #[inline]
    #[must_use]
    pub const fn get(&self, t: Trait) -> f64 {
        self.values[t.index()]
    }

    /// Set a trait, clamped to `[0, 1]`. Non-finite input leaves the value at 0.
    pub fn set(&mut self, t: Trait, value: f64) {
        self.values[t.index()] = if value.is_finite() { value.clamp(0.0, 1.0) } else { 0.0 };
    }

    /// Raw values in [`Trait::ALL`] order
    #[inline]
    #[must_use]
    pub const fn values(&self) -> &[f64; TRAIT_COUNT] {
        &self.values
    }

    /// Iterate `(trait, value)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (Trait, f64)> + '_ {
        Trait::ALL.into_iter().map(move |t| (t, self.get(t)))
    }
}

// ============================================================================
// Learning / Neural State
// ============================================================================

/// Discrete learning stage of a session.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LearningStage {
    /// Taking in new material
    #[default]
    Acquisition,
    /// Stabilising what was acquired
    Consolidation,
    /// Recalling consolidated material
    Retrieval,
    /// Applying material to new situations
    Adaptation,
}

impl LearningStage {
    /// Stage name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Acquisition => "ACQUISITION",
            Self::Consolidation => "CONSOLIDATION",
            Self::Retrieval => "RETRIEVAL",
            Self::Adaptation => "ADAPTATION",
        }
    }
}

/// Moment-to-moment neural state of a session.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NeuralState {
    /// Low engagement baseline
    #[default]
    Resting,
    /// Sustained engagement
    Focused,
    /// Sustained focus with uptake
    Learning,
    /// Engagement dropped after learning
    Processing,
    /// Recovery after fatigue or long processing
    Consolidating,
}

impl NeuralState {
    /// State name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Resting => "RESTING",
            Self::Focused => "FOCUSED",
            Self::Learning => "LEARNING",
            Self::Processing => "PROCESSING",
            Self::Consolidating => "CONSOLIDATING",
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
