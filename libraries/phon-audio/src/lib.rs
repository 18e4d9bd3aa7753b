//! Phon real-time engine
//!
//! Blends a dry stereo signal with an equal-loudness-compensated copy of
//! itself, with a click-free ramp between the two:
//! - Streaming FIR with carried-over state and matched dry-path delay
//! - Broadband level correction on the wet path
//! - Equal-power crossfade with per-sample ramping
//! - Mix-position gain curve (fixed or sized from the source content)
//! - Adaptive peak-percentile trim and optional soft-knee, multiband and
//!   look-ahead limiting
//! - Lock-free control handle for a separate control thread
//! - Looping playback session over an in-memory source
//!
//! # Example
//!
//! ```
//! use phon_audio::{EngineConfig, LoudnessEngine};
//!
//! let config = EngineConfig::default();
//! let mut engine = LoudnessEngine::new(&config, 48000)?;
//!
//! // From the control thread
//! let control = engine.control();
//! control.set_target(1.0);
//!
//! // From the audio callback
//! let input = vec![0.0_f32; 512];
//! let mut left = vec![0.0_f32; 512];
//! let mut right = vec![0.0_f32; 512];
//! engine.process_block(&input, &input, &mut left, &mut right);
//!
//! println!("Latency: {:.1} ms", engine.latency_ms());
//! # Ok::<(), phon_audio::EngineError>(())
//! ```

#![deny(unsafe_code)]

mod analysis;
mod config;
mod control;
pub mod effects;
mod engine;
mod error;
mod session;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use analysis::{bass_ratio, ContentAnalysis, ContentAnalyzer, MixProbe, PROBE_RATIOS};
pub use config::{
    validate_sample_rate, AdaptiveSettings, CompensationMode, DynamicsMode, DynamicsSettings,
    EngineConfig, MAX_REDUCTION_DB, MAX_TAPS,
};
pub use control::{Diagnostics, EngineControl};
pub use engine::{LoudnessEngine, CLICK_AMPLITUDE, CLICK_SAMPLES};
pub use error::{EngineError, Result};
pub use session::{BlockReport, PlaybackSession, StreamStatus};

pub use phon_loudness;
