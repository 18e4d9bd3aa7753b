//! ISO 226 equal-loudness contours
//!
//! Tabulated sound-pressure levels for 20–100 phon at the 31 third-octave
//! reference frequencies (20 Hz – 20 kHz). Fractional levels are linearly
//! interpolated between the two bracketing tabulated contours after rounding
//! the request to a 0.1 phon grid.
//!
//! # Example
//!
//! ```
//! use phon_loudness::{LoudnessCurve, ISO_FREQUENCIES};
//!
//! let curve = LoudnessCurve::new(65.0).unwrap();
//! assert_eq!(curve.levels().len(), ISO_FREQUENCIES.len());
//!
//! // Halfway between the 60 and 70 phon contours at 1 kHz
//! assert!((curve.level_at_1khz() - 49.3).abs() < 1e-9);
//! ```

use crate::error::{LoudnessError, Result};

/// Number of reference frequencies in each contour
pub const ISO_POINTS: usize = 31;

/// Reference frequencies in Hz
pub const ISO_FREQUENCIES: [f64; ISO_POINTS] = [
    20.0, 25.0, 31.5, 40.0, 50.0, 63.0, 80.0, 100.0, 125.0, 160.0, 200.0, 250.0, 315.0, 400.0,
    500.0, 630.0, 800.0, 1000.0, 1250.0, 1600.0, 2000.0, 2500.0, 3150.0, 4000.0, 5000.0, 6300.0,
    8000.0, 10000.0, 12500.0, 16000.0, 20000.0,
];

/// Index of 1 kHz in [`ISO_FREQUENCIES`]
pub const ANCHOR_INDEX: usize = 17;

/// Lowest tabulated loudness level
pub const MIN_PHON: f64 = 20.0;

/// Highest tabulated loudness level
pub const MAX_PHON: f64 = 100.0;

/// Spacing between tabulated levels
const PHON_STEP: f64 = 10.0;

/// Interpolation grid steps per phon (0.1 phon resolution)
const STEPS_PER_PHON: f64 = 10.0;

/// SPL (dB) per tabulated level, one row per 10 phon from 20 to 100
const ISO_TABLE: [[f64; ISO_POINTS]; 9] = [
    // 20 phon
    [
        74.3, 64.4, 56.3, 49.5, 44.7, 40.6, 37.5, 35.0, 33.1, 31.6, 30.2, 28.9, 27.7, 26.6, 25.6,
        24.7, 23.8, 22.5, 21.2, 20.3, 19.1, 18.1, 17.2, 16.3, 15.0, 13.4, 11.5, 10.4, 10.1, 11.2,
        13.4,
    ],
    // 30 phon
    [
        86.3, 75.3, 66.2, 58.4, 52.7, 48.0, 44.4, 41.3, 39.2, 37.3, 35.7, 34.2, 32.9, 31.7, 30.6,
        29.5, 28.4, 27.1, 25.8, 24.7, 23.3, 22.1, 21.0, 19.9, 18.2, 16.1, 14.6, 13.6, 13.3, 14.6,
        17.1,
    ],
    // 40 phon
    [
        96.9, 85.4, 76.3, 68.3, 62.1, 57.0, 52.5, 48.7, 46.2, 44.0, 42.1, 40.4, 38.9, 37.5, 36.3,
        35.1, 33.9, 32.6, 31.2, 29.9, 28.4, 27.1, 25.9, 24.7, 22.9, 20.7, 19.0, 17.8, 17.3, 18.6,
        21.4,
    ],
    // 50 phon
    [
        107.6, 95.6, 86.4, 78.3, 71.1, 65.0, 60.1, 56.1, 53.4, 51.0, 48.9, 47.1, 45.4, 43.8, 42.3,
        40.9, 39.4, 38.1, 36.6, 35.1, 33.4, 32.0, 30.6, 29.2, 27.4, 25.1, 23.4, 22.1, 21.6, 22.8,
        25.8,
    ],
    // 60 phon
    [
        118.6, 106.1, 96.8, 88.4, 81.3, 75.0, 69.2, 65.1, 62.2, 59.6, 57.3, 55.3, 53.5, 51.7, 50.1,
        48.6, 47.0, 45.6, 44.0, 42.3, 40.5, 38.9, 37.3, 35.6, 33.7, 31.3, 29.6, 28.3, 27.9, 29.1,
        32.3,
    ],
    // 70 phon
    [
        129.5, 116.9, 107.1, 98.3, 91.2, 84.7, 78.5, 74.2, 71.1, 68.2, 65.7, 63.5, 61.5, 59.6, 57.9,
        56.2, 54.5, 53.0, 51.3, 49.5, 47.6, 45.8, 44.1, 42.3, 40.1, 37.7, 35.9, 34.6, 34.3, 35.4,
        38.7,
    ],
    // 80 phon
    [
        139.9, 127.3, 117.5, 108.6, 101.4, 94.8, 88.4, 83.9, 80.7, 77.6, 74.9, 72.6, 70.4, 68.3,
        66.4, 64.6, 62.8, 61.1, 59.3, 57.4, 55.3, 53.4, 51.4, 49.5, 47.2, 44.8, 43.0, 41.7, 41.2,
        42.2, 45.6,
    ],
    // 90 phon
    [
        150.2, 137.5, 127.7, 118.7, 111.4, 104.8, 98.4, 93.8, 90.4, 87.1, 84.2, 81.7, 79.4, 77.1,
        75.1, 73.3, 71.4, 69.6, 67.6, 65.6, 63.5, 61.5, 59.5, 57.4, 55.1, 52.7, 50.8, 49.4, 48.8,
        49.8, 53.2,
    ],
    // 100 phon
    [
        160.4, 147.6, 137.8, 128.8, 121.4, 114.8, 108.3, 103.7, 100.3, 96.9, 93.9, 91.4, 88.9, 86.6,
        84.5, 82.5, 80.5, 78.6, 76.6, 74.5, 72.4, 70.3, 68.3, 66.2, 63.9, 61.4, 59.5, 58.1, 57.5,
        58.5, 62.0,
    ],
];

/// One equal-loudness contour: SPL at each of the reference frequencies
#[derive(Debug, Clone, PartialEq)]
pub struct LoudnessCurve {
    phon: f64,
    levels: [f64; ISO_POINTS],
}

impl LoudnessCurve {
    /// Build the contour for `phon`
    ///
    /// The level is rounded to 0.1 phon before interpolation.
    ///
    /// # Errors
    /// Returns [`LoudnessError::PhonOutOfRange`] outside 20–100 phon.
    pub fn new(phon: f64) -> Result<Self> {
        check_phon(phon)?;

        let phon = quantize(phon);
        let offset = (phon - MIN_PHON) / PHON_STEP;
        let lo = (offset.floor() as usize).min(ISO_TABLE.len() - 1);
        let hi = (lo + 1).min(ISO_TABLE.len() - 1);
        let weight = offset - lo as f64;

        let mut levels = ISO_TABLE[lo];
        if hi != lo && weight > 0.0 {
            for (level, upper) in levels.iter_mut().zip(ISO_TABLE[hi].iter()) {
                *level = *level * (1.0 - weight) + upper * weight;
            }
        }

        Ok(Self { phon, levels })
    }

    /// Loudness level this contour was built for (after rounding)
    pub fn phon(&self) -> f64 {
        self.phon
    }

    /// SPL in dB at each entry of [`ISO_FREQUENCIES`]
    pub fn levels(&self) -> &[f64; ISO_POINTS] {
        &self.levels
    }

    /// (frequency Hz, SPL dB) pairs in ascending frequency
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        ISO_FREQUENCIES.iter().copied().zip(self.levels.iter().copied())
    }

    /// SPL at 1 kHz
    pub fn level_at_1khz(&self) -> f64 {
        self.levels[ANCHOR_INDEX]
    }

    /// Per-frequency gain (dB) that turns perception at `self` into perception
    /// at `reference`, anchored to exactly 0 dB at 1 kHz
    pub fn compensation_to(&self, reference: &LoudnessCurve) -> [f64; ISO_POINTS] {
        let mut delta = [0.0; ISO_POINTS];
        for (d, (r, t)) in delta
            .iter_mut()
            .zip(reference.levels.iter().zip(self.levels.iter()))
        {
            *d = r - t;
        }

        let anchor = delta[ANCHOR_INDEX];
        for d in &mut delta {
            *d -= anchor;
        }
        delta
    }
}

/// Reject levels outside the tabulated interval
pub fn check_phon(phon: f64) -> Result<()> {
    if phon.is_finite() && (MIN_PHON..=MAX_PHON).contains(&phon) {
        Ok(())
    } else {
        Err(LoudnessError::PhonOutOfRange {
            phon,
            min: MIN_PHON,
            max: MAX_PHON,
        })
    }
}

/// Round to the 0.1 phon grid
fn quantize(phon: f64) -> f64 {
    (phon * STEPS_PER_PHON).round() / STEPS_PER_PHON
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tabulated_levels_are_exact() {
        for (row, phon) in (20..=100).step_by(10).enumerate() {
            let curve = LoudnessCurve::new(phon as f64).unwrap();
            assert_eq!(curve.levels(), &ISO_TABLE[row]);
        }
    }

    #[test]
    fn test_fractional_level_interpolates() {
        let curve = LoudnessCurve::new(42.5).unwrap();
        let expected = ISO_TABLE[2][0] * 0.75 + ISO_TABLE[3][0] * 0.25;
        assert!((curve.levels()[0] - expected).abs() < 1e-9);
    }

    #[test]
    fn test_quantizes_to_tenth_of_phon() {
        let a = LoudnessCurve::new(42.23).unwrap();
        let b = LoudnessCurve::new(42.2).unwrap();
        assert_eq!(a.levels(), b.levels());
        assert!((a.phon() - 42.2).abs() < 1e-9);
    }

    #[test]
    fn test_out_of_range_rejected() {
        assert!(matches!(
            LoudnessCurve::new(19.9),
            Err(LoudnessError::PhonOutOfRange { .. })
        ));
        assert!(LoudnessCurve::new(100.1).is_err());
        assert!(LoudnessCurve::new(f64::NAN).is_err());
        assert!(LoudnessCurve::new(100.0).is_ok());
    }

    #[test]
    fn test_continuous_across_tabulated_boundary() {
        let below = LoudnessCurve::new(59.9).unwrap();
        let at = LoudnessCurve::new(60.0).unwrap();
        let above = LoudnessCurve::new(60.1).unwrap();

        for i in 0..ISO_POINTS {
            let step_down = (at.levels()[i] - below.levels()[i]).abs();
            let step_up = (above.levels()[i] - at.levels()[i]).abs();
            // A 0.1 phon step never moves more than 0.2 dB in this table
            assert!(step_down < 0.2, "jump below 60 phon at index {}", i);
            assert!(step_up < 0.2, "jump above 60 phon at index {}", i);
        }
    }

    #[test]
    fn test_compensation_is_anchored_at_1khz() {
        let target = LoudnessCurve::new(60.0).unwrap();
        let reference = LoudnessCurve::new(80.0).unwrap();
        let delta = target.compensation_to(&reference);

        assert_eq!(delta[ANCHOR_INDEX], 0.0);
        // Quiet listening needs more bass
        assert!(delta[0] > 5.0);
    }
}
