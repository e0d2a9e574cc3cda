//! Session configuration
//!
//! A [`SessionConfig`] is supplied once at session creation and never changes
//! afterwards. Every component receives the section it needs by reference;
//! there is no process-wide configuration state.
//!
//! All sections implement `Default` and are `#[serde(default)]`, so a partial
//! TOML document deserializes into a complete configuration.
//!
//! The adaptation constants are calibration inputs, not validated physiology:
//! the defaults are placeholders until product owners confirm ranges.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::math::constants::WEIGHT_SUM_TOLERANCE;
use crate::types::TRAIT_COUNT;

/// Complete, immutable configuration of one session.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Acquisition shape and analysis window
    pub signal: SignalConfig,
    /// Trait modulation constants
    pub adaptation: AdaptationConfig,
    /// Venturi gate budgets and shaping parameters
    pub gates: GateConfig,
    /// State machine thresholds
    pub transitions: TransitionConfig,
    /// Reaction to latency overruns
    pub degradation: DegradationConfig,
}

/// Acquisition shape.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    /// Sampling rate in Hz
    pub sample_rate_hz: f64,
    /// Channels per sample
    pub channel_count: usize,
    /// Ring buffer capacity in samples
    pub buffer_capacity: usize,
    /// Samples per analysis window
    pub window_size: usize,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 256.0,
            channel_count: 8,
            buffer_capacity: 512,
            window_size: 256,
        }
    }
}

/// Constants of the trait drift, neuroplasticity and projection equations.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptationConfig {
    /// Step size of trait drift per cycle
    pub adaptation_rate: f64,
    /// Weight of the environment factor in trait drift
    pub env_weight: f64,
    /// Base neuroplasticity growth rate
    pub base_rate: f64,
    /// Upper bound of the neuroplasticity level
    pub saturation: f64,
    /// Trait weights of the projected trait score; must sum to 1
    pub projection_weights: [f64; TRAIT_COUNT],
    /// Canonical level at which a feature neither raises nor lowers a trait
    pub drive_setpoint: f64,
    /// How strongly fatigue subtracts from resilience drive
    pub fatigue_penalty: f64,
}

impl Default for AdaptationConfig {
    fn default() -> Self {
        Self {
            adaptation_rate: 0.05,
            env_weight: 0.5,
            base_rate: 0.02,
            saturation: 1.0,
            projection_weights: [0.3, 0.2, 0.25, 0.25],
            drive_setpoint: 0.5,
            fatigue_penalty: 0.5,
        }
    }
}

/// Venturi gate parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// INPUT gate budget in microseconds
    pub input_budget_us: u64,
    /// PROCESSING gate budget in microseconds
    pub processing_budget_us: u64,
    /// OUTPUT gate budget in microseconds
    pub output_budget_us: u64,
    /// End-to-end cycle budget in microseconds
    pub cycle_budget_us: u64,
    /// Ceiling as a multiple of the moving baseline
    pub throttle_ratio: f64,
    /// Smoothing factor of the moving baseline, in (0, 1]
    pub baseline_smoothing: f64,
    /// Lowest ceiling the INPUT gate will ever apply
    pub ceiling_floor: f64,
    /// Smoothing factor of emitted values, in (0, 1]; 1 disables smoothing
    pub output_smoothing: f64,
    /// Largest change of an emitted value between consecutive cycles
    pub max_step: f64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            input_budget_us: 100,
            processing_budget_us: 100,
            output_budget_us: 100,
            cycle_budget_us: 1_000,
            throttle_ratio: 2.0,
            baseline_smoothing: 0.1,
            ceiling_floor: 0.05,
            output_smoothing: 0.5,
            max_step: 0.25,
        }
    }
}

/// Thresholds and dwell counts of the learning/neural state machine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionConfig {
    /// Engagement at or above which a cycle counts toward focus
    pub focus_engagement: f64,
    /// Engagement below which focus is lost
    pub rest_engagement: f64,
    /// Consecutive qualifying cycles for RESTING -> FOCUSED
    pub focus_cycles: u32,
    /// Consecutive qualifying cycles for FOCUSED -> LEARNING
    pub learning_cycles: u32,
    /// Fatigue at or above which LEARNING -> CONSOLIDATING
    pub fatigue_threshold: f64,
    /// Cycles in PROCESSING before CONSOLIDATING
    pub processing_cycles: u32,
    /// Cycles in CONSOLIDATING before RESTING
    pub consolidating_cycles: u32,
    /// LEARNING cycles accumulated in ACQUISITION before CONSOLIDATION
    pub acquisition_cycles: u32,
    /// Projected trait score for CONSOLIDATION -> RETRIEVAL
    pub retrieval_score: f64,
    /// Projected trait score for RETRIEVAL -> ADAPTATION
    pub adaptation_score: f64,
    /// Score margin below a threshold before falling back a stage
    pub score_hysteresis: f64,
    /// Cycles in ADAPTATION before a return to RESTING restarts ACQUISITION
    pub adaptation_cycles: u32,
    /// Minimum time between learning stage changes, in microseconds
    pub min_stage_dwell_us: u64,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            focus_engagement: 0.6,
            rest_engagement: 0.3,
            focus_cycles: 3,
            learning_cycles: 5,
            fatigue_threshold: 0.7,
            processing_cycles: 5,
            consolidating_cycles: 5,
            acquisition_cycles: 10,
            retrieval_score: 0.4,
            adaptation_score: 0.7,
            score_hysteresis: 0.05,
            adaptation_cycles: 20,
            min_stage_dwell_us: 0,
        }
    }
}

/// What the orchestrator does after a degraded cycle.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradationPolicy {
    /// Flag the result only
    #[default]
    Observe,
    /// Halve the next analysis window, recovering after clean cycles
    ShrinkWindow,
}

/// Degradation handling.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DegradationConfig {
    /// Reaction to a degraded cycle
    pub policy: DegradationPolicy,
    /// Smallest analysis window the shrink policy may reach
    pub min_window: usize,
    /// Consecutive clean cycles before the window grows again
    pub recovery_cycles: u32,
}

impl Default for DegradationConfig {
    fn default() -> Self {
        Self {
            policy: DegradationPolicy::Observe,
            min_window: 64,
            recovery_cycles: 8,
        }
    }
}

impl SessionConfig {
    /// Default configuration with the given acquisition shape.
    ///
    /// The buffer holds exactly one window and the shrink floor is capped at
    /// the window size.
    #[must_use]
    pub fn new(sample_rate_hz: f64, channel_count: usize, window_size: usize) -> Self {
        let mut config = Self::default();
        config.signal = SignalConfig {
            sample_rate_hz,
            channel_count,
            buffer_capacity: window_size,
            window_size,
        };
        config.degradation.min_window = config.degradation.min_window.min(window_size);
        config
    }

    /// Check every field against its allowed domain.
    ///
    /// # Errors
    ///
    /// Returns the first `ConfigError::Invalid` found.
    pub fn validate(&self) -> ConfigResult<()> {
        self.signal.validate()?;
        self.adaptation.validate()?;
        self.gates.validate()?;
        self.transitions.validate()?;
        self.degradation.validate(self.signal.window_size)
    }
}

impl SignalConfig {
    fn validate(&self) -> ConfigResult<()> {
        if !(self.sample_rate_hz.is_finite() && self.sample_rate_hz > 0.0) {
            return Err(ConfigError::invalid("signal.sample_rate_hz", "must be finite and positive"));
        }
        if self.channel_count == 0 {
            return Err(ConfigError::invalid("signal.channel_count", "must be at least 1"));
        }
        if self.window_size < 2 {
            return Err(ConfigError::invalid("signal.window_size", "must be at least 2"));
        }
        if self.buffer_capacity < self.window_size {
            return Err(ConfigError::invalid(
                "signal.buffer_capacity",
                format!("{} is smaller than window_size {}", self.buffer_capacity, self.window_size),
            ));
        }
        Ok(())
    }
}

impl AdaptationConfig {
    fn validate(&self) -> ConfigResult<()> {
        non_negative("adaptation.adaptation_rate", self.adaptation_rate)?;
        non_negative("adaptation.env_weight", self.env_weight)?;
        non_negative("adaptation.base_rate", self.base_rate)?;
        non_negative("adaptation.fatigue_penalty", self.fatigue_penalty)?;
        unit("adaptation.drive_setpoint", self.drive_setpoint)?;
        if !(self.saturation.is_finite() && self.saturation > 0.0) {
            return Err(ConfigError::invalid("adaptation.saturation", "must be finite and positive"));
        }
        if self.projection_weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(ConfigError::invalid(
                "adaptation.projection_weights",
                "weights must be finite and non-negative",
            ));
        }
        let sum: f64 = self.projection_weights.iter().sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ConfigError::invalid(
                "adaptation.projection_weights",
                format!("weights sum to {sum}, expected 1"),
            ));
        }
        Ok(())
    }
}

impl GateConfig {
    fn validate(&self) -> ConfigResult<()> {
        if !(self.throttle_ratio.is_finite() && self.throttle_ratio >= 1.0) {
            return Err(ConfigError::invalid("gates.throttle_ratio", "must be finite and at least 1"));
        }
        smoothing("gates.baseline_smoothing", self.baseline_smoothing)?;
        smoothing("gates.output_smoothing", self.output_smoothing)?;
        if !(self.ceiling_floor.is_finite() && self.ceiling_floor > 0.0) {
            return Err(ConfigError::invalid("gates.ceiling_floor", "must be finite and positive"));
        }
        if !(self.max_step.is_finite() && self.max_step > 0.0) {
            return Err(ConfigError::invalid("gates.max_step", "must be finite and positive"));
        }
        Ok(())
    }
}

impl TransitionConfig {
    fn validate(&self) -> ConfigResult<()> {
        unit("transitions.focus_engagement", self.focus_engagement)?;
        unit("transitions.rest_engagement", self.rest_engagement)?;
        unit("transitions.fatigue_threshold", self.fatigue_threshold)?;
        unit("transitions.retrieval_score", self.retrieval_score)?;
        unit("transitions.adaptation_score", self.adaptation_score)?;
        non_negative("transitions.score_hysteresis", self.score_hysteresis)?;
        if self.rest_engagement > self.focus_engagement {
            return Err(ConfigError::invalid(
                "transitions.rest_engagement",
                "must not exceed focus_engagement",
            ));
        }
        if self.retrieval_score > self.adaptation_score {
            return Err(ConfigError::invalid(
                "transitions.retrieval_score",
                "must not exceed adaptation_score",
            ));
        }
        let counts = [
            ("transitions.focus_cycles", self.focus_cycles),
            ("transitions.learning_cycles", self.learning_cycles),
            ("transitions.processing_cycles", self.processing_cycles),
            ("transitions.consolidating_cycles", self.consolidating_cycles),
            ("transitions.acquisition_cycles", self.acquisition_cycles),
            ("transitions.adaptation_cycles", self.adaptation_cycles),
        ];
        for (field, count) in counts {
            if count == 0 {
                return Err(ConfigError::invalid(field, "must be at least 1"));
            }
        }
        Ok(())
    }
}

impl DegradationConfig {
    fn validate(&self, window_size: usize) -> ConfigResult<()> {
        if self.policy == DegradationPolicy::ShrinkWindow {
            if self.min_window < 2 || self.min_window > window_size {
                return Err(ConfigError::invalid(
                    "degradation.min_window",
                    format!("must be within [2, {window_size}]"),
                ));
            }
            if self.recovery_cycles == 0 {
                return Err(ConfigError::invalid("degradation.recovery_cycles", "must be at least 1"));
            }
        }
        Ok(())
    }
}

fn non_negative(field: &'static str, value: f64) -> ConfigResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("{value} is not finite and non-negative")))
    }
}

fn unit(field: &'static str, value: f64) -> ConfigResult<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("{value} is outside [0, 1]")))
    }
}

fn smoothing(field: &'static str, value: f64) -> ConfigResult<()> {
    if value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("{value} is outside (0, 1]")))
    }
}
