//! Equal-loudness compensation design for Phon
//!
//! This crate provides the setup-time half of the loudness crossfader:
//! - ISO 226 equal-loudness contours with 0.1 phon interpolation
//! - Linear-phase FIR design from a (target, reference) level pair
//! - A/C/Z/K weighting curves
//! - Broadband level-correction estimation on a pink reference spectrum
//! - Recommended preamp maps and an LRU cache of designs
//!
//! Nothing here runs on the audio thread; the results are immutable values
//! handed to the real-time engine in `phon-audio`.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌─────────────────┐
//! │ ISO 226      │ ──► │ FIR Designer │ ──► │ FirFilter       │
//! │ contours     │     └──────────────┘     └─────────────────┘
//! └──────────────┘                                  │
//!                                                   ▼
//! ┌──────────────┐     ┌──────────────┐     ┌─────────────────┐
//! │ A/C/Z/K      │ ──► │ Correction   │ ──► │ CorrectionGain  │
//! │ weightings   │     │ Estimator    │     └─────────────────┘
//! └──────────────┘     └──────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use phon_loudness::{FirFilter, LevelCorrectionEstimator};
//!
//! // Listening at 60 phon, restore the balance heard at 80 phon
//! let fir = FirFilter::design(60.0, 80.0, 513, 48000)?;
//! let correction = LevelCorrectionEstimator::new(48000)?.estimate(&fir)?;
//!
//! println!("Group delay: {} samples", fir.group_delay());
//! println!("Level correction: {:.2} dB", correction.db);
//! # Ok::<(), phon_loudness::LoudnessError>(())
//! ```

#![deny(unsafe_code)]

mod cache;
mod contour;
mod correction;
mod error;
mod fir;
mod preamp;
mod weighting;

pub use cache::FilterCache;
pub use contour::{
    check_phon, LoudnessCurve, ANCHOR_INDEX, ISO_FREQUENCIES, ISO_POINTS, MAX_PHON, MIN_PHON,
};
pub use correction::{
    compare_powers, level_change_db, summarize, CorrectionGain, LevelCorrectionEstimator,
    PinkSpectrum, WeightedChange, SPECTRUM_LOW_HZ, SPECTRUM_POINTS,
};
pub use error::{LoudnessError, Result, MAX_SAMPLE_RATE, MIN_SAMPLE_RATE};
pub use fir::{FilterMetadata, FirFilter, ANCHOR_HZ, WINDOW_NAME};
pub use preamp::{phon_range, PreampCalculator, PreampEntry, PreampTable, DEFAULT_HEADROOM_DBTP};
pub use weighting::Weighting;

/// Default FIR length
pub const DEFAULT_TAPS: usize = 513;

/// Default listening level (phon)
pub const DEFAULT_TARGET_PHON: f64 = 60.0;

/// Default reference level (phon)
pub const DEFAULT_REFERENCE_PHON: f64 = 80.0;
