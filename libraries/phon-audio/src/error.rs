/// Engine errors
use thiserror::Error;

/// Result type alias using `EngineError`
pub type Result<T> = std::result::Result<T, EngineError>;

/// Engine error types
///
/// Only setup can fail. Once an engine is built, block processing is
/// infallible: numeric edge cases degrade gracefully and device overruns are
/// reported through [`crate::StreamStatus`].
#[derive(Error, Debug)]
pub enum EngineError {
    /// Inconsistent or out-of-range session configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid argument to an engine call
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Filter design or correction estimation failed
    #[error(transparent)]
    Loudness(#[from] phon_loudness::LoudnessError),

    /// Configuration source could not be read or parsed
    #[error("Config load error: {0}")]
    Config(#[from] config::ConfigError),
}

impl EngineError {
    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create an invalid-parameter error
    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }
}
