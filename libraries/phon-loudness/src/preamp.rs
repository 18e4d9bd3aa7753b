//! Recommended preamp map for (target, reference) level pairs
//!
//! For each pair the preamp is the smaller of two limits:
//!
//! - **SPL target**: `target - reference - average weighted change`, where the
//!   change is measured against the reference→reference design so both filters
//!   share the same truncation effects
//! - **Clip limit**: `headroom - max(0, max boost of the reference design)`
//!
//! Values are rounded to 0.01 dB.

use crate::cache::FilterCache;
use crate::contour::check_phon;
use crate::correction::{compare_powers, LevelCorrectionEstimator};
use crate::error::{LoudnessError, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Default true-peak headroom in dBTP
pub const DEFAULT_HEADROOM_DBTP: f64 = -1.0;

/// One row of the map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreampEntry {
    /// Listening level
    pub target_phon: f64,
    /// Reference level
    pub reference_phon: f64,
    /// Recommended preamp in dB
    pub preamp_db: f64,
    /// Average weighted level change of the target design (dB)
    pub average_change_db: f64,
}

/// Computes preamp recommendations, reusing designs through a [`FilterCache`]
pub struct PreampCalculator {
    estimator: LevelCorrectionEstimator,
    cache: FilterCache,
    taps: usize,
    headroom_db: f64,
}

impl PreampCalculator {
    /// Create a calculator for a tap count and sample rate
    pub fn new(taps: usize, sample_rate: u32, headroom_db: f64) -> Result<Self> {
        if !headroom_db.is_finite() {
            return Err(LoudnessError::InvalidParameter(format!(
                "headroom must be finite, got {}",
                headroom_db
            )));
        }

        Ok(Self {
            estimator: LevelCorrectionEstimator::new(sample_rate)?,
            cache: FilterCache::default(),
            taps,
            headroom_db,
        })
    }

    /// Recommended preamp for one pair
    pub fn preamp(&mut self, target_phon: f64, reference_phon: f64) -> Result<PreampEntry> {
        check_phon(target_phon)?;
        check_phon(reference_phon)?;

        let sample_rate = self.estimator.sample_rate();
        let freqs = self.estimator.spectrum().freqs().to_vec();

        let reference_fir =
            self.cache
                .get_or_design(reference_phon, reference_phon, self.taps, sample_rate)?;
        let reference_powers = self
            .estimator
            .weighted_powers(Some(&reference_fir.power_response(&freqs)));
        let max_boost_db = reference_fir.max_gain_db(&freqs);

        let target_fir =
            self.cache
                .get_or_design(target_phon, reference_phon, self.taps, sample_rate)?;
        let target_powers = self
            .estimator
            .weighted_powers(Some(&target_fir.power_response(&freqs)));

        let (changes, _) = compare_powers(&reference_powers, &target_powers);
        let average_change_db = if changes.is_empty() {
            0.0
        } else {
            changes.iter().map(|c| c.change_db).sum::<f64>() / changes.len() as f64
        };

        let spl_target = target_phon - reference_phon - average_change_db;
        let clip_limit = self.headroom_db - max_boost_db.max(0.0);

        Ok(PreampEntry {
            target_phon,
            reference_phon,
            preamp_db: round_hundredths(spl_target.min(clip_limit)),
            average_change_db,
        })
    }
}

/// Preamp recommendations over a grid of level pairs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreampTable {
    /// Tap count of every design in the table
    pub taps: usize,
    /// Sample rate of every design in the table
    pub sample_rate: u32,
    /// Headroom used for the clip limit
    pub headroom_db: f64,
    /// Rows, one per pair with target ≤ reference
    pub entries: Vec<PreampEntry>,
}

impl PreampTable {
    /// Compute every pair with `target <= reference`
    pub fn generate(
        targets: &[f64],
        references: &[f64],
        taps: usize,
        sample_rate: u32,
        headroom_db: f64,
    ) -> Result<Self> {
        let mut calculator = PreampCalculator::new(taps, sample_rate, headroom_db)?;
        let mut entries = Vec::new();

        for &reference in references {
            for &target in targets.iter().filter(|&&t| t <= reference) {
                entries.push(calculator.preamp(target, reference)?);
            }
        }

        info!(
            entries = entries.len(),
            taps, sample_rate, "Generated preamp table"
        );

        Ok(Self {
            taps,
            sample_rate,
            headroom_db,
            entries,
        })
    }

    /// Preamp for a pair, if it is in the table
    pub fn lookup(&self, target_phon: f64, reference_phon: f64) -> Option<f64> {
        self.entries
            .iter()
            .find(|e| {
                (e.target_phon - target_phon).abs() < 0.05
                    && (e.reference_phon - reference_phon).abs() < 0.05
            })
            .map(|e| e.preamp_db)
    }

    /// Serialize the table as pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a table produced by [`PreampTable::to_json`]
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Evenly spaced levels from `start` to `end` inclusive
pub fn phon_range(start: f64, end: f64, step: f64) -> Vec<f64> {
    if step <= 0.0 || end < start {
        return Vec::new();
    }
    let count = ((end - start) / step + 0.5).floor() as usize + 1;
    (0..count).map(|i| start + step * i as f64).collect()
}

fn round_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
