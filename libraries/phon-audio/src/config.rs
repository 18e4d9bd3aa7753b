//! Declarative engine configuration
//!
//! Loaded from an optional TOML file, then overridden by `PHON_*` environment
//! variables (nested keys separated by `__`, e.g. `PHON_DYNAMICS__MODE=multiband`).
//!
//! ```toml
//! target_phon = 60.0
//! reference_phon = 80.0
//! taps = 513
//! fade_ms = 50.0
//!
//! [compensation]
//! mode = "analyzed"
//! analysis_secs = 30.0
//!
//! [dynamics]
//! mode = "multiband"
//! lookahead = true
//! ```

use crate::error::{EngineError, Result};
use phon_loudness::{check_phon, MAX_SAMPLE_RATE, MIN_SAMPLE_RATE};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Deepest curve reduction accepted from configuration or analysis
pub const MAX_REDUCTION_DB: f32 = -24.0;

/// Upper bound on FIR length
pub const MAX_TAPS: usize = 1 << 16;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EngineConfig {
    #[serde(default = "default_target_phon")]
    pub target_phon: f64,

    #[serde(default = "default_reference_phon")]
    pub reference_phon: f64,

    #[serde(default = "default_taps")]
    pub taps: usize,

    #[serde(default = "default_block_size")]
    pub block_size: usize,

    #[serde(default = "default_fade_ms")]
    pub fade_ms: f32,

    /// Expected source rate; a mismatching source is rejected
    #[serde(default)]
    pub sample_rate: Option<u32>,

    /// Mix ratio at startup (0 = dry, 1 = wet)
    #[serde(default)]
    pub initial_mix: f32,

    #[serde(default)]
    pub compensation: CompensationMode,

    #[serde(default)]
    pub adaptive: AdaptiveSettings,

    #[serde(default)]
    pub dynamics: DynamicsSettings,
}

/// How the mix-position gain curve gets its depth
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CompensationMode {
    /// Unity at every mix position
    None,

    /// Parabolic curve with a configured depth
    Fixed {
        #[serde(default = "default_max_reduction_db")]
        max_reduction_db: f32,
    },

    /// Depth and sharpness measured from the first seconds of the source
    Analyzed {
        #[serde(default = "default_analysis_secs")]
        analysis_secs: f32,

        /// Worst-case peak the mix must stay under
        #[serde(default = "default_headroom")]
        headroom: f32,

        #[serde(default = "default_safety_margin_db")]
        safety_margin_db: f32,
    },
}

impl Default for CompensationMode {
    fn default() -> Self {
        Self::Fixed {
            max_reduction_db: default_max_reduction_db(),
        }
    }
}

/// Slow peak-driven trim on top of the static curve
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct AdaptiveSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Number of block peaks kept
    #[serde(default = "default_history_blocks")]
    pub history_blocks: usize,

    /// Percentile of the history compared against the thresholds
    #[serde(default = "default_percentile")]
    pub percentile: f32,

    /// Above this, attenuation grows
    #[serde(default = "default_hot_threshold")]
    pub hot_threshold: f32,

    /// Below this, attenuation relaxes
    #[serde(default = "default_safe_threshold")]
    pub safe_threshold: f32,

    /// Adjustment per block in dB
    #[serde(default = "default_step_db")]
    pub step_db: f32,

    /// Deepest adjustment in dB
    #[serde(default = "default_min_adjustment_db")]
    pub min_adjustment_db: f32,
}

impl Default for AdaptiveSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            history_blocks: default_history_blocks(),
            percentile: default_percentile(),
            hot_threshold: default_hot_threshold(),
            safe_threshold: default_safe_threshold(),
            step_db: default_step_db(),
            min_adjustment_db: default_min_adjustment_db(),
        }
    }
}

/// Band layout of the soft-knee stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DynamicsMode {
    /// No soft-knee stage
    #[default]
    Off,
    /// One soft-knee limiter on the full band
    SoftClip,
    /// Three-band split, each band soft-knee limited
    Multiband,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct DynamicsSettings {
    #[serde(default)]
    pub mode: DynamicsMode,

    #[serde(default = "default_low_crossover_hz")]
    pub low_crossover_hz: f32,

    #[serde(default = "default_high_crossover_hz")]
    pub high_crossover_hz: f32,

    #[serde(default = "default_low_threshold")]
    pub low_threshold: f32,

    #[serde(default = "default_mid_threshold")]
    pub mid_threshold: f32,

    #[serde(default = "default_high_threshold")]
    pub high_threshold: f32,

    /// Threshold of the single-band soft clip
    #[serde(default = "default_full_band_threshold")]
    pub full_band_threshold: f32,

    #[serde(default = "default_knee_width")]
    pub knee_width: f32,

    /// Enable the look-ahead peak limiter
    #[serde(default)]
    pub lookahead: bool,

    #[serde(default = "default_lookahead_ms")]
    pub lookahead_ms: f32,

    #[serde(default = "default_ceiling")]
    pub ceiling: f32,

    /// Per-sample gain follower coefficient
    #[serde(default = "default_smoothing")]
    pub smoothing: f32,
}

impl Default for DynamicsSettings {
    fn default() -> Self {
        Self {
            mode: DynamicsMode::Off,
            low_crossover_hz: default_low_crossover_hz(),
            high_crossover_hz: default_high_crossover_hz(),
            low_threshold: default_low_threshold(),
            mid_threshold: default_mid_threshold(),
            high_threshold: default_high_threshold(),
            full_band_threshold: default_full_band_threshold(),
            knee_width: default_knee_width(),
            lookahead: false,
            lookahead_ms: default_lookahead_ms(),
            ceiling: default_ceiling(),
            smoothing: default_smoothing(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            target_phon: default_target_phon(),
            reference_phon: default_reference_phon(),
            taps: default_taps(),
            block_size: default_block_size(),
            fade_ms: default_fade_ms(),
            sample_rate: None,
            initial_mix: 0.0,
            compensation: CompensationMode::default(),
            adaptive: AdaptiveSettings::default(),
            dynamics: DynamicsSettings::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from an optional file and the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        if let Some(path) = path {
            settings = settings.add_source(config::File::from(path).required(true));
        }

        // Override with environment variables (prefixed with PHON_)
        settings = settings.add_source(
            config::Environment::with_prefix("PHON")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = settings.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = config::Config::builder()
            .add_source(config::File::from_str(text, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        check_phon(self.target_phon)
            .map_err(|e| EngineError::configuration(format!("target_phon: {}", e)))?;
        check_phon(self.reference_phon)
            .map_err(|e| EngineError::configuration(format!("reference_phon: {}", e)))?;

        if self.taps == 0 || self.taps > MAX_TAPS {
            return Err(EngineError::configuration(format!(
                "taps must be between 1 and {}, got {}",
                MAX_TAPS, self.taps
            )));
        }

        if self.block_size == 0 {
            return Err(EngineError::configuration("block_size must be positive"));
        }

        if !(self.fade_ms.is_finite() && self.fade_ms > 0.0) {
            return Err(EngineError::configuration(format!(
                "fade_ms must be positive, got {}",
                self.fade_ms
            )));
        }

        if !(0.0..=1.0).contains(&self.initial_mix) {
            return Err(EngineError::configuration(format!(
                "initial_mix must be within [0, 1], got {}",
                self.initial_mix
            )));
        }

        if let Some(rate) = self.sample_rate {
            validate_sample_rate(rate)?;
        }

        self.validate_compensation()?;
        self.validate_adaptive()?;
        self.validate_dynamics()
    }

    fn validate_compensation(&self) -> Result<()> {
        match self.compensation {
            CompensationMode::None => Ok(()),
            CompensationMode::Fixed { max_reduction_db } => {
                if (MAX_REDUCTION_DB..=0.0).contains(&max_reduction_db) {
                    Ok(())
                } else {
                    Err(EngineError::configuration(format!(
                        "max_reduction_db must be within [{}, 0], got {}",
                        MAX_REDUCTION_DB, max_reduction_db
                    )))
                }
            }
            CompensationMode::Analyzed {
                analysis_secs,
                headroom,
                safety_margin_db,
            } => {
                if !(analysis_secs.is_finite() && analysis_secs > 0.0) {
                    return Err(EngineError::configuration("analysis_secs must be positive"));
                }
                if !(headroom > 0.0 && headroom <= 1.0) {
                    return Err(EngineError::configuration("headroom must be within (0, 1]"));
                }
                if !(safety_margin_db.is_finite() && safety_margin_db >= 0.0) {
                    return Err(EngineError::configuration(
                        "safety_margin_db must be non-negative",
                    ));
                }
                Ok(())
            }
        }
    }

    fn validate_adaptive(&self) -> Result<()> {
        let a = &self.adaptive;
        if a.history_blocks == 0 {
            return Err(EngineError::configuration("adaptive.history_blocks must be positive"));
        }
        if !(0.0..=1.0).contains(&a.percentile) {
            return Err(EngineError::configuration("adaptive.percentile must be within [0, 1]"));
        }
        if !(a.safe_threshold.is_finite() && a.hot_threshold.is_finite())
            || a.safe_threshold >= a.hot_threshold
        {
            return Err(EngineError::configuration(
                "adaptive.safe_threshold must be below adaptive.hot_threshold",
            ));
        }
        if !(a.step_db > 0.0 && a.step_db.is_finite()) {
            return Err(EngineError::configuration("adaptive.step_db must be positive"));
        }
        if !(a.min_adjustment_db <= 0.0 && a.min_adjustment_db >= MAX_REDUCTION_DB) {
            return Err(EngineError::configuration(format!(
                "adaptive.min_adjustment_db must be within [{}, 0]",
                MAX_REDUCTION_DB
            )));
        }
        Ok(())
    }

    fn validate_dynamics(&self) -> Result<()> {
        let d = &self.dynamics;
        if !d.knee_width.is_finite() || d.knee_width < 0.0 {
            return Err(EngineError::configuration("dynamics.knee_width must be non-negative"));
        }
        if !(d.low_crossover_hz > 0.0 && d.low_crossover_hz < d.high_crossover_hz) {
            return Err(EngineError::configuration(
                "dynamics crossovers must satisfy 0 < low < high",
            ));
        }
        for (name, threshold) in [
            ("low_threshold", d.low_threshold),
            ("mid_threshold", d.mid_threshold),
            ("high_threshold", d.high_threshold),
            ("full_band_threshold", d.full_band_threshold),
        ] {
            if !(threshold > d.knee_width && threshold <= 1.0) {
                return Err(EngineError::configuration(format!(
                    "dynamics.{} must be within (knee_width, 1], got {}",
                    name, threshold
                )));
            }
        }
        if !(d.lookahead_ms > 0.0 && d.lookahead_ms.is_finite()) {
            return Err(EngineError::configuration("dynamics.lookahead_ms must be positive"));
        }
        if !(d.ceiling > 0.0 && d.ceiling <= 1.0) {
            return Err(EngineError::configuration("dynamics.ceiling must be within (0, 1]"));
        }
        if !(0.0..1.0).contains(&d.smoothing) {
            return Err(EngineError::configuration("dynamics.smoothing must be within [0, 1)"));
        }
        Ok(())
    }
}

/// Reject sample rates outside the supported range
pub fn validate_sample_rate(rate: u32) -> Result<()> {
    if (MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&rate) {
        Ok(())
    } else {
        Err(EngineError::configuration(format!(
            "sample rate {} Hz outside {}..={} Hz",
            rate, MIN_SAMPLE_RATE, MAX_SAMPLE_RATE
        )))
    }
}

// Default value functions
fn default_target_phon() -> f64 {
    phon_loudness::DEFAULT_TARGET_PHON
}

fn default_reference_phon() -> f64 {
    phon_loudness::DEFAULT_REFERENCE_PHON
}

fn default_taps() -> usize {
    phon_loudness::DEFAULT_TAPS
}

fn default_block_size() -> usize {
    2048
}

fn default_fade_ms() -> f32 {
    50.0
}

fn default_max_reduction_db() -> f32 {
    -3.0
}

fn default_analysis_secs() -> f32 {
    30.0
}

fn default_headroom() -> f32 {
    0.95
}

fn default_safety_margin_db() -> f32 {
    0.5
}

fn default_true() -> bool {
    true
}

fn default_history_blocks() -> usize {
    100
}

fn default_percentile() -> f32 {
    0.95
}

fn default_hot_threshold() -> f32 {
    0.90
}

fn default_safe_threshold() -> f32 {
    0.80
}

fn default_step_db() -> f32 {
    0.01
}

fn default_min_adjustment_db() -> f32 {
    -3.0
}

fn default_low_crossover_hz() -> f32 {
    200.0
}

fn default_high_crossover_hz() -> f32 {
    2000.0
}

fn default_low_threshold() -> f32 {
    0.7
}

fn default_mid_threshold() -> f32 {
    0.8
}

fn default_high_threshold() -> f32 {
    0.9
}

fn default_full_band_threshold() -> f32 {
    0.95
}

fn default_knee_width() -> f32 {
    0.1
}

fn default_lookahead_ms() -> f32 {
    5.0
}

fn default_ceiling() -> f32 {
    0.9
}

fn default_smoothing() -> f32 {
    0.995
}
