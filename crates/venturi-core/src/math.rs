//! Numeric helpers shared by the processing tiers
//!
//! Small, allocation-free statistics and smoothing functions over `f64`.

/// Common constants
pub mod constants {
    /// Tolerance used when checking that weights sum to one
    pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

    /// Smallest denominator used by band-power ratios
    pub const RATIO_EPSILON: f64 = 1e-12;
}

/// Arithmetic mean. Returns 0 for an empty slice.
#[must_use]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance. Returns 0 for fewer than two values.
#[must_use]
pub fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64
}

/// One step of exponential smoothing: move `previous` toward `input` by `alpha`.
#[inline]
#[must_use]
pub fn smooth(previous: f64, input: f64, alpha: f64) -> f64 {
    previous + alpha * (input - previous)
}

/// Clamp into `[0, 1]`, mapping non-finite values to 0
#[inline]
#[must_use]
pub fn clamp_unit(x: f64) -> f64 {
    if x.is_finite() {
        x.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Ratio with a guarded denominator
#[inline]
#[must_use]
pub fn safe_ratio(numerator: f64, denominator: f64) -> f64 {
    numerator / denominator.max(constants::RATIO_EPSILON)
}

/// Squash a non-negative ratio into `[0, 1)`
#[inline]
#[must_use]
pub fn squash(x: f64) -> f64 {
    let x = x.max(0.0);
    x / (1.0 + x)
}
