//! Broadband level-correction estimation
//!
//! Estimates how much a loudness FIR changes the weighted level of a
//! representative broadband spectrum and returns the gain that undoes it.
//!
//! The reference spectrum is analytic (1/f power on a logarithmic grid from
//! 20 Hz to just under Nyquist), so the estimate is fully deterministic.
//!
//! # Example
//!
//! ```
//! use phon_loudness::{FirFilter, LevelCorrectionEstimator};
//!
//! let fir = FirFilter::design(60.0, 80.0, 513, 48000).unwrap();
//! let estimator = LevelCorrectionEstimator::new(48000).unwrap();
//! let correction = estimator.estimate(&fir).unwrap();
//!
//! assert!((correction.db + correction.average_change_db).abs() < 1e-9);
//! ```

use crate::error::{check_sample_rate, LoudnessError, Result};
use crate::fir::FirFilter;
use crate::weighting::Weighting;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Number of points in the reference spectrum
pub const SPECTRUM_POINTS: usize = 1024;

/// Lowest frequency of the reference spectrum
pub const SPECTRUM_LOW_HZ: f64 = 20.0;

/// Weighted reference power at or below this is treated as degenerate
const NEGLIGIBLE_POWER: f64 = 1e-12;

/// Estimated level change under one weighting
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightedChange {
    /// Weighting curve
    pub weighting: Weighting,
    /// Post-filter minus pre-filter weighted level (dB)
    pub change_db: f64,
}

/// Scalar gain that restores the pre-filter weighted loudness
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionGain {
    /// Correction in dB (negative of the average change)
    pub db: f64,
    /// Correction as a linear factor
    pub linear: f64,
    /// Mean weighted change across the weightings that were kept
    pub average_change_db: f64,
    /// Standard deviation of the kept changes (agreement between weightings)
    pub consistency_db: f64,
    /// Per-weighting changes that entered the average
    pub changes: Vec<WeightedChange>,
    /// Weightings dropped because their reference power was negligible
    pub excluded: Vec<Weighting>,
}

impl CorrectionGain {
    /// Gain that changes nothing
    pub fn unity() -> Self {
        Self {
            db: 0.0,
            linear: 1.0,
            average_change_db: 0.0,
            consistency_db: 0.0,
            changes: Vec::new(),
            excluded: Vec::new(),
        }
    }

    /// Change measured under `weighting`, if it was kept
    pub fn change_for(&self, weighting: Weighting) -> Option<f64> {
        self.changes
            .iter()
            .find(|c| c.weighting == weighting)
            .map(|c| c.change_db)
    }
}

/// Pink reference spectrum on a logarithmic frequency grid
#[derive(Debug, Clone)]
pub struct PinkSpectrum {
    freqs: Vec<f64>,
    power: Vec<f64>,
}

impl PinkSpectrum {
    /// Build the spectrum from 20 Hz to `fs/2 - 1` Hz, normalized to unit
    /// total power
    pub fn new(sample_rate: u32) -> Self {
        let high = f64::from(sample_rate) / 2.0 - 1.0;
        let (log_lo, log_hi) = (SPECTRUM_LOW_HZ.log10(), high.log10());
        let step = (log_hi - log_lo) / (SPECTRUM_POINTS - 1) as f64;

        let freqs: Vec<f64> = (0..SPECTRUM_POINTS)
            .map(|i| 10.0_f64.powf(log_lo + step * i as f64))
            .collect();

        let mut power: Vec<f64> = freqs.iter().map(|f| 1.0 / f).collect();
        let total: f64 = power.iter().sum();
        for p in &mut power {
            *p /= total;
        }

        Self { freqs, power }
    }

    /// Grid frequencies in Hz
    pub fn freqs(&self) -> &[f64] {
        &self.freqs
    }

    /// Power at each grid frequency
    pub fn power(&self) -> &[f64] {
        &self.power
    }
}

/// Estimates the [`CorrectionGain`] of loudness filters at one sample rate
#[derive(Debug, Clone)]
pub struct LevelCorrectionEstimator {
    sample_rate: u32,
    spectrum: PinkSpectrum,
    /// Squared weighting magnitude per curve, aligned with the spectrum grid
    weights: Vec<(Weighting, Vec<f64>)>,
    /// Weighted power of the unfiltered spectrum
    reference: Vec<(Weighting, f64)>,
}

impl LevelCorrectionEstimator {
    /// Create an estimator for `sample_rate`
    pub fn new(sample_rate: u32) -> Result<Self> {
        check_sample_rate(sample_rate)?;

        let spectrum = PinkSpectrum::new(sample_rate);
        let weights = Weighting::ALL
            .iter()
            .map(|&w| {
                let squared = spectrum
                    .freqs()
                    .iter()
                    .map(|&f| w.gain(f, sample_rate).powi(2))
                    .collect();
                (w, squared)
            })
            .collect();

        let mut estimator = Self {
            sample_rate,
            spectrum,
            weights,
            reference: Vec::new(),
        };
        estimator.reference = estimator.weighted_powers(None);
        Ok(estimator)
    }

    /// Reference spectrum used by this estimator
    pub fn spectrum(&self) -> &PinkSpectrum {
        &self.spectrum
    }

    /// Estimate the correction for `fir`
    ///
    /// # Errors
    /// Returns [`LoudnessError::InvalidParameter`] if the filter was designed
    /// for a different sample rate.
    pub fn estimate(&self, fir: &FirFilter) -> Result<CorrectionGain> {
        if fir.sample_rate() != self.sample_rate {
            return Err(LoudnessError::InvalidParameter(format!(
                "filter designed for {} Hz, estimator runs at {} Hz",
                fir.sample_rate(),
                self.sample_rate
            )));
        }

        let response = fir.power_response(self.spectrum.freqs());
        let (changes, excluded) = self.weighted_changes(&response);
        let correction = summarize(changes, excluded);

        info!(
            correction_db = correction.db,
            consistency_db = correction.consistency_db,
            kept = correction.changes.len(),
            "Estimated level correction"
        );

        Ok(correction)
    }

    /// Sample rate this estimator was built for
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Weighted power of the reference spectrum, optionally shaped by a filter
    /// power response sampled on the reference grid
    pub fn weighted_powers(&self, power_response: Option<&[f64]>) -> Vec<(Weighting, f64)> {
        self.weights
            .iter()
            .map(|(weighting, squared)| {
                let power: f64 = match power_response {
                    Some(response) => self
                        .spectrum
                        .power()
                        .iter()
                        .zip(squared.iter())
                        .zip(response.iter())
                        .map(|((p, w2), h2)| p * h2 * w2)
                        .sum(),
                    None => self
                        .spectrum
                        .power()
                        .iter()
                        .zip(squared.iter())
                        .map(|(p, w2)| p * w2)
                        .sum(),
                };
                (*weighting, power)
            })
            .collect()
    }

    /// Per-weighting level change of a filter power response relative to the
    /// unfiltered spectrum
    pub fn weighted_changes(&self, power_response: &[f64]) -> (Vec<WeightedChange>, Vec<Weighting>) {
        let filtered = self.weighted_powers(Some(power_response));
        compare_powers(&self.reference, &filtered)
    }
}

/// Per-weighting change from `before` to `after`, excluding weightings whose
/// `before` power is negligible
pub fn compare_powers(
    before: &[(Weighting, f64)],
    after: &[(Weighting, f64)],
) -> (Vec<WeightedChange>, Vec<Weighting>) {
    let mut changes = Vec::with_capacity(before.len());
    let mut excluded = Vec::new();

    for (&(weighting, reference), &(_, filtered)) in before.iter().zip(after.iter()) {
        match level_change_db(reference, filtered) {
            Some(change_db) => {
                debug!(weighting = weighting.name(), change_db, "Weighted level change");
                changes.push(WeightedChange {
                    weighting,
                    change_db,
                });
            }
            None => {
                warn!(
                    weighting = weighting.name(),
                    reference, "Negligible weighted reference power, weighting excluded"
                );
                excluded.push(weighting);
            }
        }
    }

    (changes, excluded)
}

/// 10·log10(after / before), or `None` when `before` is negligible
pub fn level_change_db(before: f64, after: f64) -> Option<f64> {
    if before > NEGLIGIBLE_POWER && after > 0.0 {
        Some(10.0 * (after / before).log10())
    } else {
        None
    }
}

/// Average the kept changes into a correction
pub fn summarize(changes: Vec<WeightedChange>, excluded: Vec<Weighting>) -> CorrectionGain {
    if changes.is_empty() {
        warn!("No usable weighting, level correction falls back to unity");
        return CorrectionGain {
            excluded,
            ..CorrectionGain::unity()
        };
    }

    let n = changes.len() as f64;
    let average = changes.iter().map(|c| c.change_db).sum::<f64>() / n;
    let variance = changes
        .iter()
        .map(|c| (c.change_db - average).powi(2))
        .sum::<f64>()
        / n;

    let db = -average;
    CorrectionGain {
        db,
        linear: 10.0_f64.powf(db / 20.0),
        average_change_db: average,
        consistency_db: variance.sqrt(),
        changes,
        excluded,
    }
}
