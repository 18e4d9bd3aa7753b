//! Error types for loudness-compensation design

use thiserror::Error;

/// Result type for design operations
pub type Result<T> = std::result::Result<T, LoudnessError>;

/// Errors that can occur while designing filters or estimating corrections
#[derive(Error, Debug)]
pub enum LoudnessError {
    /// Requested loudness level lies outside the tabulated contours
    #[error("Phon level {phon} is out of range (must be between {min} and {max})")]
    PhonOutOfRange {
        /// Requested level
        phon: f64,
        /// Lowest tabulated level
        min: f64,
        /// Highest tabulated level
        max: f64,
    },

    /// Tap count cannot produce a filter
    #[error("Invalid tap count: {0} (must be at least 1)")]
    InvalidTapCount(usize),

    /// Invalid sample rate
    #[error("Invalid sample rate: {0} Hz (must be between 8000 and 384000)")]
    InvalidSampleRate(u32),

    /// Any other rejected argument
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Metadata or table serialization failed
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Lowest supported sample rate
pub const MIN_SAMPLE_RATE: u32 = 8_000;

/// Highest supported sample rate
pub const MAX_SAMPLE_RATE: u32 = 384_000;

/// Reject sample rates the designers cannot handle
pub(crate) fn check_sample_rate(sample_rate: u32) -> Result<()> {
    if (MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&sample_rate) {
        Ok(())
    } else {
        Err(LoudnessError::InvalidSampleRate(sample_rate))
    }
}
