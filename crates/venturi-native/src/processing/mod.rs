//! Signal processing
//!
//! - [`fft`]: Spectral analysis and band power

pub mod fft;

pub use fft::{BandPowers, SpectralAnalyzer};
