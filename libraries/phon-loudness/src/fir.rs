//! Linear-phase loudness-compensation FIR design
//!
//! The designer takes the difference between two equal-loudness contours,
//! anchors it at 0 dB for 1 kHz and fits a frequency-sampled, Hann-windowed
//! linear-phase filter through the reference frequencies below Nyquist plus
//! explicit breakpoints at 0 Hz and Nyquist.
//!
//! # Design Steps
//!
//! ```text
//! contour(target) ─┐
//!                  ├─► delta dB ─► anchor @1k ─► linear ─► breakpoints
//! contour(ref) ────┘                                            │
//!                                                               ▼
//!         taps ◄─ renormalize |H(1k)| = 1 ◄─ Hann window ◄─ inverse FFT
//! ```

use crate::contour::{LoudnessCurve, ISO_FREQUENCIES, ISO_POINTS};
use crate::error::{check_sample_rate, LoudnessError, Result};
use rustfft::num_complex::Complex64;
use rustfft::FftPlanner;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::{debug, info, warn};

/// Frequency at which every designed filter has unity gain
pub const ANCHOR_HZ: f64 = 1000.0;

/// Window applied to the sampled impulse response
pub const WINDOW_NAME: &str = "hann";

/// Design parameters carried alongside the coefficients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterMetadata {
    /// Listening level the filter compensates for
    pub target_phon: f64,
    /// Level whose tonal balance is restored
    pub reference_phon: f64,
    /// Realized (odd) tap count
    pub taps: usize,
    /// Tap count the caller asked for
    pub requested_taps: usize,
    /// Design sample rate in Hz
    pub sample_rate: u32,
    /// Window name
    pub window: String,
    /// Group delay in samples
    pub group_delay_samples: usize,
}

/// Designed linear-phase FIR filter
///
/// Always odd-length and symmetric, so the group delay is exactly
/// `(taps - 1) / 2` samples. Normalized to unity gain at 1 kHz.
///
/// # Example
///
/// ```
/// use phon_loudness::FirFilter;
///
/// let fir = FirFilter::design(60.0, 80.0, 513, 48000).unwrap();
/// assert_eq!(fir.len(), 513);
/// assert_eq!(fir.group_delay(), 256);
/// assert!(fir.magnitude_db(1000.0).abs() < 0.05);
/// ```
#[derive(Debug, Clone)]
pub struct FirFilter {
    taps: Vec<f32>,
    metadata: FilterMetadata,
}

impl FirFilter {
    /// Design the filter that makes `target_phon` listening sound like
    /// `reference_phon`
    ///
    /// Even tap counts are promoted to the next odd value; the adjustment is
    /// logged and visible through [`FirFilter::was_adjusted`].
    ///
    /// # Errors
    /// - [`LoudnessError::PhonOutOfRange`] for either level outside 20–100
    /// - [`LoudnessError::InvalidTapCount`] for zero taps
    /// - [`LoudnessError::InvalidSampleRate`] outside 8–384 kHz
    pub fn design(
        target_phon: f64,
        reference_phon: f64,
        taps: usize,
        sample_rate: u32,
    ) -> Result<Self> {
        if taps == 0 {
            return Err(LoudnessError::InvalidTapCount(taps));
        }
        check_sample_rate(sample_rate)?;

        let target = LoudnessCurve::new(target_phon)?;
        let reference = LoudnessCurve::new(reference_phon)?;

        let num_taps = if taps % 2 == 0 {
            warn!(
                requested = taps,
                realized = taps + 1,
                "Even tap count promoted to odd for integer group delay"
            );
            taps + 1
        } else {
            taps
        };

        let nyquist = f64::from(sample_rate) / 2.0;
        let (freqs, gains) = breakpoints(&target.compensation_to(&reference), nyquist);
        debug!(
            breakpoints = freqs.len(),
            low_gain_db = 20.0 * gains[0].log10(),
            high_gain_db = 20.0 * gains[gains.len() - 1].log10(),
            "Loudness compensation breakpoints"
        );

        let mut coeffs = frequency_sampled(num_taps, &freqs, &gains, nyquist);

        // Fitting error leaves 1 kHz slightly off unity
        let anchor_gain = response(coeffs.iter().copied(), ANCHOR_HZ, sample_rate).norm();
        if !anchor_gain.is_finite() || anchor_gain <= f64::EPSILON {
            return Err(LoudnessError::InvalidParameter(format!(
                "degenerate filter response at {} Hz",
                ANCHOR_HZ
            )));
        }
        for c in &mut coeffs {
            *c /= anchor_gain;
        }

        let metadata = FilterMetadata {
            target_phon: target.phon(),
            reference_phon: reference.phon(),
            taps: num_taps,
            requested_taps: taps,
            sample_rate,
            window: WINDOW_NAME.to_string(),
            group_delay_samples: (num_taps - 1) / 2,
        };

        info!(
            target_phon = metadata.target_phon,
            reference_phon = metadata.reference_phon,
            taps = num_taps,
            sample_rate,
            "Designed loudness compensation FIR"
        );

        Ok(Self {
            taps: coeffs.into_iter().map(|c| c as f32).collect(),
            metadata,
        })
    }

    /// Filter coefficients
    pub fn taps(&self) -> &[f32] {
        &self.taps
    }

    /// Number of taps
    pub fn len(&self) -> usize {
        self.taps.len()
    }

    /// Always false for a designed filter
    pub fn is_empty(&self) -> bool {
        self.taps.is_empty()
    }

    /// Group delay in samples
    pub fn group_delay(&self) -> usize {
        self.metadata.group_delay_samples
    }

    /// Design sample rate
    pub fn sample_rate(&self) -> u32 {
        self.metadata.sample_rate
    }

    /// True if the requested tap count was even and got promoted
    pub fn was_adjusted(&self) -> bool {
        self.metadata.taps != self.metadata.requested_taps
    }

    /// Design parameters
    pub fn metadata(&self) -> &FilterMetadata {
        &self.metadata
    }

    /// Design parameters as pretty-printed JSON
    pub fn metadata_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.metadata)?)
    }

    /// Complex frequency response at `freq` Hz
    pub fn response_at(&self, freq: f64) -> Complex64 {
        response(
            self.taps.iter().map(|&t| f64::from(t)),
            freq,
            self.metadata.sample_rate,
        )
    }

    /// Magnitude response in dB at `freq` Hz
    pub fn magnitude_db(&self, freq: f64) -> f64 {
        20.0 * self.response_at(freq).norm().log10()
    }

    /// Squared magnitude |H(f)|² at each frequency
    pub fn power_response(&self, freqs: &[f64]) -> Vec<f64> {
        freqs.iter().map(|&f| self.response_at(f).norm_sqr()).collect()
    }

    /// Largest magnitude gain (dB) over the given frequencies
    pub fn max_gain_db(&self, freqs: &[f64]) -> f64 {
        freqs
            .iter()
            .map(|&f| self.magnitude_db(f))
            .fold(f64::NEG_INFINITY, f64::max)
    }
}

/// Evaluate H(e^{jω}) = Σ h[n]·e^{-jωn} with a rotating phasor
fn response(coeffs: impl Iterator<Item = f64>, freq: f64, sample_rate: u32) -> Complex64 {
    let omega = 2.0 * PI * freq / f64::from(sample_rate);
    let rotation = Complex64::from_polar(1.0, -omega);

    let mut phasor = Complex64::new(1.0, 0.0);
    let mut acc = Complex64::new(0.0, 0.0);
    for h in coeffs {
        acc += phasor * h;
        phasor *= rotation;
    }
    acc
}

/// Breakpoints in Hz and linear gain: DC, every reference frequency below
/// Nyquist, then Nyquist itself
fn breakpoints(gains_db: &[f64; ISO_POINTS], nyquist: f64) -> (Vec<f64>, Vec<f64>) {
    let linear: Vec<f64> = gains_db.iter().map(|db| 10.0_f64.powf(db / 20.0)).collect();

    let mut freqs = Vec::with_capacity(ISO_POINTS + 2);
    let mut gains = Vec::with_capacity(ISO_POINTS + 2);

    freqs.push(0.0);
    gains.push(linear[0]);

    for (&freq, &gain) in ISO_FREQUENCIES.iter().zip(linear.iter()) {
        if freq < nyquist {
            freqs.push(freq);
            gains.push(gain);
        }
    }

    freqs.push(nyquist);
    gains.push(linear[ISO_POINTS - 1]);

    (freqs, gains)
}

/// Frequency-sampling design: interpolate the desired magnitude onto a dense
/// grid, add the linear-phase shift, inverse FFT, truncate and window
fn frequency_sampled(num_taps: usize, freqs: &[f64], gains: &[f64], nyquist: f64) -> Vec<f64> {
    let grid_len = 1 + num_taps.next_power_of_two();
    let fft_len = 2 * (grid_len - 1);
    let delay = (num_taps - 1) as f64 / 2.0;
    let last_bin = grid_len - 1;

    let mut spectrum = vec![Complex64::new(0.0, 0.0); fft_len];
    for k in 0..grid_len {
        let x = k as f64 / last_bin as f64;
        let gain = interpolate(x * nyquist, freqs, gains);
        let mut bin = Complex64::from_polar(gain, -delay * PI * x);

        if k == 0 || k == last_bin {
            // DC and Nyquist bins of a real signal are real
            bin.im = 0.0;
        } else {
            spectrum[fft_len - k] = bin.conj();
        }
        spectrum[k] = bin;
    }

    FftPlanner::new()
        .plan_fft_inverse(fft_len)
        .process(&mut spectrum);

    let scale = 1.0 / fft_len as f64;
    (0..num_taps)
        .map(|n| spectrum[n].re * scale * hann(n, num_taps))
        .collect()
}

/// Piecewise-linear interpolation, clamped at both ends
fn interpolate(x: f64, xs: &[f64], ys: &[f64]) -> f64 {
    let last = xs.len() - 1;
    if x <= xs[0] {
        return ys[0];
    }
    if x >= xs[last] {
        return ys[last];
    }

    let upper = xs.partition_point(|&f| f <= x);
    let (x0, x1) = (xs[upper - 1], xs[upper]);
    let (y0, y1) = (ys[upper - 1], ys[upper]);
    y0 + (y1 - y0) * (x - x0) / (x1 - x0)
}

/// Symmetric Hann window
fn hann(n: usize, len: usize) -> f64 {
    if len == 1 {
        return 1.0;
    }
    0.5 - 0.5 * (2.0 * PI * n as f64 / (len - 1) as f64).cos()
}
