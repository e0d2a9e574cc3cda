//! FFT-based spectral analysis
//!
//! Provides band power extraction over windows of any length.

use std::collections::HashMap;

use rustfft::{num_complex::Complex, FftPlanner};
use serde::{Deserialize, Serialize};

use venturi_core::types::EegBand;

/// FFT-based spectral analyzer
///
/// Plans and Hann windows are cached per FFT size, so the analyzer can follow
/// an analysis window that changes length between cycles.
pub struct SpectralAnalyzer {
    sample_rate: f64,
    planner: FftPlanner<f64>,
    windows: HashMap<usize, Vec<f64>>,
    buffer: Vec<Complex<f64>>,
    scratch: Vec<Complex<f64>>,
}

impl SpectralAnalyzer {
    /// Create a new spectral analyzer
    ///
    /// # Arguments
    ///
    /// * `sample_rate` - Sample rate in Hz
    #[must_use]
    pub fn new(sample_rate: f64) -> Self {
        Self {
            sample_rate,
            planner: FftPlanner::new(),
            windows: HashMap::new(),
            buffer: Vec::new(),
            scratch: Vec::new(),
        }
    }

    /// Frequency resolution (Hz per bin) for an FFT of `fft_size` points
    #[must_use]
    pub fn frequency_resolution(&self, fft_size: usize) -> f64 {
        self.sample_rate / fft_size.max(1) as f64
    }

    /// Compute power spectrum from time-domain samples
    ///
    /// The FFT size is the number of samples. Returns power spectral density
    /// (magnitude squared) for the non-negative frequencies.
    pub fn compute_psd(&mut self, samples: &[f64]) -> Vec<f64> {
        let fft_size = samples.len();
        if fft_size == 0 {
            return Vec::new();
        }

        let fft = self.planner.plan_fft_forward(fft_size);
        let window = self.windows.entry(fft_size).or_insert_with(|| hann_window(fft_size));

        // Apply window and copy to buffer
        self.buffer.clear();
        self.buffer
            .extend(samples.iter().zip(window.iter()).map(|(&s, &w)| Complex::new(s * w, 0.0)));

        let scratch_len = fft.get_inplace_scratch_len();
        if self.scratch.len() < scratch_len {
            self.scratch.resize(scratch_len, Complex::new(0.0, 0.0));
        }
        fft.process_with_scratch(&mut self.buffer, &mut self.scratch[..scratch_len]);

        // Compute power (magnitude squared), only positive frequencies
        let n_freqs = fft_size / 2 + 1;
        let norm = 1.0 / (fft_size as f64).powi(2);

        self.buffer[..n_freqs]
            .iter()
            .map(|c| (c.re * c.re + c.im * c.im) * norm)
            .collect()
    }

    /// Extract band power over the half-open range `[low_hz, high_hz)`
    ///
    /// `psd` must come from [`compute_psd`](Self::compute_psd) over
    /// `fft_size` samples. Adjacent bands never share a bin. Ranges that
    /// fall outside the spectrum yield 0.
    #[must_use]
    pub fn band_power(&self, psd: &[f64], fft_size: usize, low_hz: f64, high_hz: f64) -> f64 {
        let freq_res = self.frequency_resolution(fft_size);
        let start_bin = (low_hz / freq_res).ceil() as usize;
        let end_bin = ((high_hz / freq_res).ceil() as usize).min(psd.len());

        if start_bin >= end_bin {
            return 0.0;
        }
        psd[start_bin..end_bin].iter().sum()
    }

    /// Extract power for a standard EEG band
    #[must_use]
    pub fn eeg_band_power(&self, psd: &[f64], fft_size: usize, band: EegBand) -> f64 {
        let (low, high) = band.range_hz();
        self.band_power(psd, fft_size, low, high)
    }

    /// Extract all standard EEG band powers
    #[must_use]
    pub fn all_band_powers(&self, psd: &[f64], fft_size: usize) -> BandPowers {
        BandPowers {
            delta: self.eeg_band_power(psd, fft_size, EegBand::Delta),
            theta: self.eeg_band_power(psd, fft_size, EegBand::Theta),
            alpha: self.eeg_band_power(psd, fft_size, EegBand::Alpha),
            beta: self.eeg_band_power(psd, fft_size, EegBand::Beta),
            gamma: self.eeg_band_power(psd, fft_size, EegBand::Gamma),
        }
    }
}

/// EEG band powers container
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BandPowers {
    /// Delta band power (0.5-4 Hz)
    pub delta: f64,
    /// Theta band power (4-8 Hz)
    pub theta: f64,
    /// Alpha band power (8-13 Hz)
    pub alpha: f64,
    /// Beta band power (13-30 Hz)
    pub beta: f64,
    /// Gamma band power (30-100 Hz)
    pub gamma: f64,
}

impl BandPowers {
    /// Power of one band
    #[must_use]
    pub const fn get(&self, band: EegBand) -> f64 {
        match band {
            EegBand::Delta => self.delta,
            EegBand::Theta => self.theta,
            EegBand::Alpha => self.alpha,
            EegBand::Beta => self.beta,
            EegBand::Gamma => self.gamma,
        }
    }

    /// Total power across all bands
    #[must_use]
    pub fn total(&self) -> f64 {
        self.delta + self.theta + self.alpha + self.beta + self.gamma
    }

    /// Each band as a fraction of the total; all zero when there is no power
    #[must_use]
    pub fn relative(&self) -> Self {
        let total = self.total();
        if total > 0.0 {
            Self {
                delta: self.delta / total,
                theta: self.theta / total,
                alpha: self.alpha / total,
                beta: self.beta / total,
                gamma: self.gamma / total,
            }
        } else {
            Self::default()
        }
    }

    /// Element-wise accumulate
    pub fn accumulate(&mut self, other: &Self) {
        self.delta += other.delta;
        self.theta += other.theta;
        self.alpha += other.alpha;
        self.beta += other.beta;
        self.gamma += other.gamma;
    }

    /// Element-wise scale
    #[must_use]
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            delta: self.delta * factor,
            theta: self.theta * factor,
            alpha: self.alpha * factor,
            beta: self.beta * factor,
            gamma: self.gamma * factor,
        }
    }
}

/// Generate Hann window coefficients
fn hann_window(size: usize) -> Vec<f64> {
    if size < 2 {
        return vec![1.0; size];
    }
    (0..size)
        .map(|i| {
            0.5 * (1.0 - (2.0 * std::f64::consts::PI * i as f64 / (size - 1) as f64).cos())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq_hz: f64, sample_rate: f64, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| (2.0 * std::f64::consts::PI * freq_hz * i as f64 / sample_rate).sin())
            .collect()
    }

    #[test]
    fn test_spectral_analyzer() {
        let mut analyzer = SpectralAnalyzer::new(250.0);

        // Generate 10 Hz sine wave
        let samples = sine(10.0, 250.0, 256);
        let psd = analyzer.compute_psd(&samples);

        // Alpha should contain most of the power for a 10 Hz signal
        let alpha_power = analyzer.eeg_band_power(&psd, 256, EegBand::Alpha);
        let total_power: f64 = psd.iter().sum();
        assert!(alpha_power > total_power * 0.5);
    }

    #[test]
    fn test_analyzer_follows_size_changes() {
        let mut analyzer = SpectralAnalyzer::new(128.0);

        let long = analyzer.compute_psd(&sine(20.0, 128.0, 128));
        assert_eq!(long.len(), 65);

        let short = analyzer.compute_psd(&sine(20.0, 128.0, 64));
        assert_eq!(short.len(), 33);

        let beta = analyzer.eeg_band_power(&short, 64, EegBand::Beta);
        let theta = analyzer.eeg_band_power(&short, 64, EegBand::Theta);
        assert!(beta > theta * 100.0);
    }

    #[test]
    fn test_band_outside_spectrum_is_zero() {
        let mut analyzer = SpectralAnalyzer::new(64.0);
        let psd = analyzer.compute_psd(&sine(5.0, 64.0, 16));
        // Nyquist is 32 Hz, so the upper gamma range is clipped and nothing starts above it
        assert!(analyzer.band_power(&psd, 16, 40.0, 60.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_edge_bin_counted_in_one_band() {
        let analyzer = SpectralAnalyzer::new(64.0);
        // 1 Hz per bin, all power at 13 Hz
        let mut psd = vec![0.0; 33];
        psd[13] = 1.0;
        assert!(analyzer.eeg_band_power(&psd, 64, EegBand::Alpha).abs() < f64::EPSILON);
        assert!((analyzer.eeg_band_power(&psd, 64, EegBand::Beta) - 1.0).abs() < f64::EPSILON);

        // Every bin from 1 Hz up to Nyquist lands in exactly one band
        let flat = vec![1.0; 33];
        assert!((analyzer.all_band_powers(&flat, 64).total() - 32.0).abs() < 1e-12);
    }

    #[test]
    fn test_relative_band_powers_sum_to_one() {
        let powers = BandPowers { delta: 1.0, theta: 2.0, alpha: 3.0, beta: 4.0, gamma: 0.0 };
        let rel = powers.relative();
        assert!((rel.total() - 1.0).abs() < 1e-12);
        assert!((rel.get(EegBand::Beta) - 0.4).abs() < 1e-12);
        assert_eq!(BandPowers::default().relative(), BandPowers::default());
    }
}
