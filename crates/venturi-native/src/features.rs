//! Feature extraction over an analysis window
//!
//! Extracts spectral and statistical features from buffered EEG for the
//! gate pipeline and the trait engine.

use serde::{Deserialize, Serialize};

use venturi_core::math::{self, safe_ratio, squash};

use crate::buffer::Window;
use crate::error::{FeatureError, FeatureResult};
use crate::processing::fft::{BandPowers, SpectralAnalyzer};

/// Shortest window the extractor accepts
pub const MIN_WINDOW_LEN: usize = 2;

/// Share of the fatigue index taken by the slow-wave ratio; the rest is variance decline
const FATIGUE_SLOW_WAVE_WEIGHT: f64 = 0.5;

/// Features of one analysis window.
///
/// Produced once per cycle and never mutated; the previous cycle's vector is
/// kept only to derive fatigue and trend.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Timestamp of the newest sample in the window
    pub timestamp_us: u64,
    /// Samples in the window
    pub window_len: usize,
    /// Absolute band powers, averaged across channels
    pub band_powers: BandPowers,
    /// Band powers as fractions of total power
    pub relative_powers: BandPowers,
    /// beta / (alpha + theta)
    pub engagement_index: f64,
    /// beta / (beta + theta), in [0, 1]
    pub attention_index: f64,
    /// Slow-wave dominance mixed with variance decline, in [0, 1]
    pub fatigue_index: f64,
    /// Change of squashed engagement since the previous window, in [-1, 1]
    pub engagement_trend: f64,
    /// Mean absolute amplitude across channels (µV)
    pub mean_amplitude: f64,
    /// Mean per-channel variance (µV²)
    pub variance: f64,
}

impl FeatureVector {
    /// Number of named scalar features
    pub const NAMED_COUNT: usize = 11;

    /// Named scalar features, for telemetry
    #[must_use]
    pub fn named(&self) -> [(&'static str, f64); Self::NAMED_COUNT] {
        [
            ("delta_power", self.band_powers.delta),
            ("theta_power", self.band_powers.theta),
            ("alpha_power", self.band_powers.alpha),
            ("beta_power", self.band_powers.beta),
            ("gamma_power", self.band_powers.gamma),
            ("engagement_index", self.engagement_index),
            ("attention_index", self.attention_index),
            ("fatigue_index", self.fatigue_index),
            ("engagement_trend", self.engagement_trend),
            ("mean_amplitude", self.mean_amplitude),
            ("variance", self.variance),
        ]
    }

    /// First feature that is non-finite or negative where it must not be
    #[must_use]
    pub fn first_out_of_domain(&self) -> Option<(&'static str, f64)> {
        self.named().into_iter().find(|&(name, value)| {
            !value.is_finite() || (name != "engagement_trend" && value < 0.0)
        })
    }
}

/// Feature extractor for one session
pub struct FeatureExtractor {
    analyzer: SpectralAnalyzer,
    channel_data: Vec<f64>,
}

impl FeatureExtractor {
    /// Create a new feature extractor
    ///
    /// # Arguments
    ///
    /// * `sample_rate` - EEG sample rate in Hz
    #[must_use]
    pub fn new(sample_rate: f64) -> Self {
        Self {
            analyzer: SpectralAnalyzer::new(sample_rate),
            channel_data: Vec::new(),
        }
    }

    /// Extract features from a window.
    ///
    /// The result depends only on the window and on `previous`; the internal
    /// FFT caches do not affect it.
    ///
    /// # Errors
    ///
    /// - `FeatureError::MalformedWindow` if any value is NaN or infinite
    /// - `FeatureError::WindowTooShort` below [`MIN_WINDOW_LEN`] samples
    pub fn extract(
        &mut self,
        window: Window<'_>,
        previous: Option<&FeatureVector>,
    ) -> FeatureResult<FeatureVector> {
        if window.len() < MIN_WINDOW_LEN {
            return Err(FeatureError::WindowTooShort { len: window.len(), min: MIN_WINDOW_LEN });
        }
        for (sample_index, sample) in window.iter().enumerate() {
            if let Some(channel) = sample.first_non_finite() {
                return Err(FeatureError::MalformedWindow { sample_index, channel });
            }
        }

        let fft_size = window.len();
        let channels = window.channel_count().max(1);
        let mut band_powers = BandPowers::default();
        let mut amplitude_sum = 0.0;
        let mut variance_sum = 0.0;

        for ch in 0..channels {
            self.channel_data.clear();
            self.channel_data.extend(window.channel(ch));

            let mean = math::mean(&self.channel_data);
            variance_sum += math::variance(&self.channel_data);
            amplitude_sum += self.channel_data.iter().map(|v| v.abs()).sum::<f64>() / fft_size as f64;

            // Remove DC so it does not leak into delta
            for v in &mut self.channel_data {
                *v -= mean;
            }
            let psd = self.analyzer.compute_psd(&self.channel_data);
            band_powers.accumulate(&self.analyzer.all_band_powers(&psd, fft_size));
        }

        let scale = 1.0 / channels as f64;
        let band_powers = band_powers.scaled(scale);
        let variance = variance_sum * scale;

        let engagement_index = safe_ratio(band_powers.beta, band_powers.alpha + band_powers.theta);
        let attention_index = safe_ratio(band_powers.beta, band_powers.beta + band_powers.theta);

        let slow = band_powers.theta + band_powers.alpha;
        let slow_wave_ratio = safe_ratio(slow, slow + band_powers.beta);
        let variance_decline = previous
            .filter(|p| p.variance > 0.0)
            .map_or(0.0, |p| ((p.variance - variance) / p.variance).clamp(0.0, 1.0));
        let fatigue_index = FATIGUE_SLOW_WAVE_WEIGHT * slow_wave_ratio
            + (1.0 - FATIGUE_SLOW_WAVE_WEIGHT) * variance_decline;

        let engagement_trend = previous
            .map_or(0.0, |p| squash(engagement_index) - squash(p.engagement_index));

        Ok(FeatureVector {
            timestamp_us: window.last().map_or(0, |s| s.timestamp_us()),
            window_len: fft_size,
            relative_powers: band_powers.relative(),
            band_powers,
            engagement_index,
            attention_index,
            fatigue_index,
            engagement_trend,
            mean_amplitude: amplitude_sum * scale,
            variance,
        })
    }
}
