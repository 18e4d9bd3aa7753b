//! Frequency-weighting curves (Z, A, C, K)
//!
//! Used only to estimate how much louder or quieter a filter makes a
//! broadband signal; never applied to audio samples.
//!
//! - **Z**: flat
//! - **A**, **C**: IEC 61672 analog pole/zero models, evaluated at the
//!   bilinear-warped frequency so they match a digital realization at the
//!   given sample rate
//! - **K**: ITU-R BS.1770 pre-filter (high shelf + RLB high-pass),
//!   renormalized to 0 dB at 1 kHz

use rustfft::num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

// IEC 61672 pole frequencies (Hz)
const F1: f64 = 20.598997;
const F2: f64 = 107.65265;
const F3: f64 = 737.86223;
const F4: f64 = 12194.217;

/// Gain (dB) that brings the raw A model to 0 dB at 1 kHz
const A1000_DB: f64 = 1.9997;

/// Gain (dB) that brings the raw C model to 0 dB at 1 kHz
const C1000_DB: f64 = 0.0619;

// BS.1770 stage 1: high shelf
const SHELF_HZ: f64 = 1681.974450955533;
const SHELF_GAIN_DB: f64 = 3.999843853973347;
const SHELF_Q: f64 = 0.7071752369554196;

// BS.1770 stage 2: RLB high-pass
const RLB_HZ: f64 = 38.13547087602444;
const RLB_Q: f64 = 0.5003270373238773;

const ANCHOR_HZ: f64 = 1000.0;

/// Standard weighting curve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Weighting {
    /// A-weighting
    A,
    /// C-weighting
    C,
    /// Zero (flat) weighting
    Z,
    /// K-weighting
    K,
}

impl Weighting {
    /// All curves, in the order the estimator reports them
    pub const ALL: [Weighting; 4] = [Weighting::A, Weighting::C, Weighting::Z, Weighting::K];

    /// Short display name
    pub fn name(&self) -> &'static str {
        match self {
            Weighting::A => "A",
            Weighting::C => "C",
            Weighting::Z => "Z",
            Weighting::K => "K",
        }
    }

    /// Linear magnitude at `freq` Hz
    pub fn gain(&self, freq: f64, sample_rate: u32) -> f64 {
        match self {
            Weighting::Z => 1.0,
            Weighting::A => {
                warped(freq, sample_rate).map_or(0.0, |f| a_model(f) * db_to_linear(A1000_DB))
            }
            Weighting::C => {
                warped(freq, sample_rate).map_or(0.0, |f| c_model(f) * db_to_linear(C1000_DB))
            }
            Weighting::K => {
                let fs = f64::from(sample_rate);
                k_model(freq, fs) / k_model(ANCHOR_HZ, fs)
            }
        }
    }

    /// Magnitude at `freq` Hz in dB
    pub fn gain_db(&self, freq: f64, sample_rate: u32) -> f64 {
        20.0 * self.gain(freq, sample_rate).log10()
    }

    /// Fixed offset (dB) added to the raw pole/zero model so the curve reads
    /// 0 dB at 1 kHz
    pub fn normalization_db(&self, sample_rate: u32) -> f64 {
        match self {
            Weighting::Z => 0.0,
            Weighting::A => A1000_DB,
            Weighting::C => C1000_DB,
            Weighting::K => -20.0 * k_model(ANCHOR_HZ, f64::from(sample_rate)).log10(),
        }
    }
}

impl std::fmt::Display for Weighting {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

fn db_to_linear(db: f64) -> f64 {
    10.0_f64.powf(db / 20.0)
}

/// Analog frequency that the bilinear transform maps onto `freq`;
/// `None` at or above Nyquist
fn warped(freq: f64, sample_rate: u32) -> Option<f64> {
    let fs = f64::from(sample_rate);
    if freq >= fs / 2.0 {
        return None;
    }
    Some(fs / PI * (PI * freq / fs).tan())
}

/// Raw IEC 61672 A-weighting magnitude
fn a_model(f: f64) -> f64 {
    let f2 = f * f;
    (F4 * F4 * f2 * f2)
        / ((f2 + F1 * F1) * ((f2 + F2 * F2) * (f2 + F3 * F3)).sqrt() * (f2 + F4 * F4))
}

/// Raw IEC 61672 C-weighting magnitude
fn c_model(f: f64) -> f64 {
    let f2 = f * f;
    (F4 * F4 * f2) / ((f2 + F1 * F1) * (f2 + F4 * F4))
}

/// Unnormalized BS.1770 pre-filter magnitude
fn k_model(freq: f64, fs: f64) -> f64 {
    let omega = 2.0 * PI * freq / fs;
    let (shelf_b, shelf_a) = shelf_coefficients(fs);
    let (rlb_b, rlb_a) = rlb_coefficients(fs);
    biquad_magnitude(&shelf_b, &shelf_a, omega) * biquad_magnitude(&rlb_b, &rlb_a, omega)
}

fn shelf_coefficients(fs: f64) -> ([f64; 3], [f64; 3]) {
    let k = (PI * SHELF_HZ / fs).tan();
    let vh = db_to_linear(SHELF_GAIN_DB);
    let vb = vh.powf(0.4996667741545416);
    let a0 = 1.0 + k / SHELF_Q + k * k;

    let b = [
        (vh + vb * k / SHELF_Q + k * k) / a0,
        2.0 * (k * k - vh) / a0,
        (vh - vb * k / SHELF_Q + k * k) / a0,
    ];
    let a = [1.0, 2.0 * (k * k - 1.0) / a0, (1.0 - k / SHELF_Q + k * k) / a0];
    (b, a)
}

fn rlb_coefficients(fs: f64) -> ([f64; 3], [f64; 3]) {
    let k = (PI * RLB_HZ / fs).tan();
    let a0 = 1.0 + k / RLB_Q + k * k;

    let b = [1.0, -2.0, 1.0];
    let a = [1.0, 2.0 * (k * k - 1.0) / a0, (1.0 - k / RLB_Q + k * k) / a0];
    (b, a)
}

fn biquad_magnitude(b: &[f64; 3], a: &[f64; 3], omega: f64) -> f64 {
    let z1 = Complex64::from_polar(1.0, -omega);
    let z2 = z1 * z1;
    let num = Complex64::new(b[0], 0.0) + z1 * b[1] + z2 * b[2];
    let den = Complex64::new(a[0], 0.0) + z1 * a[1] + z2 * a[2];
    (num / den).norm()
}
