//! Offline content analysis
//!
//! Measures how loud the mix of a particular source gets in the middle of the
//! blend, and how bass-heavy it is, to size the mix-position gain curve.
//! Runs once at setup on the first seconds of the source, never on the audio
//! thread.
//!
//! The result depends on the analysed material: two sessions over different
//! audio get different curves. `ContentAnalysis` records the analysed span so
//! callers can tell results apart.

use crate::config::MAX_REDUCTION_DB;
use crate::effects::{equal_power_gains, linear_to_db, CurveShape, DelayLine, StreamingFir};
use crate::error::{EngineError, Result};
use phon_loudness::FirFilter;
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;
use tracing::{debug, info};

/// Mix ratios probed for peak level
pub const PROBE_RATIOS: [f32; 5] = [0.3, 0.4, 0.5, 0.6, 0.7];

/// FFT length for the bass estimate
pub const BASS_FFT_SIZE: usize = 4096;

/// Maximum number of FFT windows analysed
pub const BASS_MAX_WINDOWS: usize = 10;

/// Upper edge of the bass band
pub const BASS_CUTOFF_HZ: f64 = 200.0;

/// Peak and RMS of the mix at one ratio
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MixProbe {
    pub ratio: f32,
    pub peak: f32,
    pub rms: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContentAnalysis {
    /// Length of the analysed span
    pub analyzed_secs: f32,
    pub probes: Vec<MixProbe>,
    /// Highest probe peak
    pub max_peak: f32,
    /// Ratio at which `max_peak` occurred
    pub worst_ratio: f32,
    /// Curve depth needed to keep `max_peak` under the headroom (≤ 0)
    pub required_reduction_db: f32,
    /// Share of spectral energy below 200 Hz, averaged over dry and wet
    pub bass_ratio: f32,
}

impl ContentAnalysis {
    /// Curve shape sized by this analysis
    pub fn curve_shape(&self) -> CurveShape {
        CurveShape::Shaped {
            depth_db: self.required_reduction_db,
            exponent: 1.0 + self.bass_ratio,
        }
    }
}

/// Analyses a stereo source against a designed filter
pub struct ContentAnalyzer<'a> {
    filter: &'a FirFilter,
    correction_linear: f32,
    headroom: f32,
    safety_margin_db: f32,
}

impl<'a> ContentAnalyzer<'a> {
    pub fn new(
        filter: &'a FirFilter,
        correction_linear: f32,
        headroom: f32,
        safety_margin_db: f32,
    ) -> Self {
        Self {
            filter,
            correction_linear,
            headroom,
            safety_margin_db,
        }
    }

    /// Analyse the first `max_secs` of the source
    pub fn analyze(&self, left: &[f32], right: &[f32], max_secs: f32) -> Result<ContentAnalysis> {
        if left.len() != right.len() {
            return Err(EngineError::configuration(format!(
                "channel lengths differ: {} vs {}",
                left.len(),
                right.len()
            )));
        }
        if left.is_empty() {
            return Err(EngineError::configuration("cannot analyse an empty source"));
        }

        let rate = self.filter.sample_rate();
        let span = ((max_secs.max(0.0) * rate as f32) as usize).clamp(1, left.len());
        let analyzed_secs = span as f32 / rate as f32;
        info!("Analysing {:.1} s of source audio", analyzed_secs);

        let (dry_l, wet_l) = self.render(&left[..span]);
        let (dry_r, wet_r) = self.render(&right[..span]);

        let probes: Vec<MixProbe> = PROBE_RATIOS
            .iter()
            .map(|&ratio| probe(ratio, [&dry_l, &dry_r], [&wet_l, &wet_r]))
            .collect();
        for p in &probes {
            debug!(
                "Mix {:.0}%: peak={:.3}, rms={:.3}",
                p.ratio * 100.0,
                p.peak,
                p.rms
            );
        }

        let (max_peak, worst_ratio) = probes
            .iter()
            .fold((0.0_f32, PROBE_RATIOS[0]), |(peak, ratio), p| {
                if p.peak > peak {
                    (p.peak, p.ratio)
                } else {
                    (peak, ratio)
                }
            });

        let required_reduction_db = if max_peak > 0.0 {
            (linear_to_db(self.headroom / max_peak) - self.safety_margin_db)
                .clamp(MAX_REDUCTION_DB, 0.0)
        } else {
            0.0
        };

        let bass_ratio = (bass_ratio(&dry_l, rate) + bass_ratio(&wet_l, rate)) / 2.0;

        info!(
            "Content analysis: worst peak {:.3} at {:.0}% mix, reduction {:.2} dB, bass {:.1}%",
            max_peak,
            worst_ratio * 100.0,
            required_reduction_db,
            bass_ratio * 100.0
        );

        Ok(ContentAnalysis {
            analyzed_secs,
            probes,
            max_peak,
            worst_ratio,
            required_reduction_db,
            bass_ratio,
        })
    }

    /// Delay-aligned dry and corrected wet for one channel
    fn render(&self, input: &[f32]) -> (Vec<f32>, Vec<f32>) {
        let mut fir = StreamingFir::new(self.filter, input.len());
        let mut state = fir.new_state();
        let mut wet = vec![0.0; input.len()];
        fir.process(&mut state, input, &mut wet);
        for s in &mut wet {
            *s *= self.correction_linear;
        }

        let mut dry = input.to_vec();
        DelayLine::for_taps(self.filter.len()).process(&mut dry);
        (dry, wet)
    }
}

fn probe(ratio: f32, dry: [&[f32]; 2], wet: [&[f32]; 2]) -> MixProbe {
    let (g_dry, g_wet) = equal_power_gains(ratio);
    let mut peak = 0.0_f32;
    let mut sum_sq = 0.0_f64;
    let mut count = 0_usize;

    for (d, w) in dry.iter().zip(wet.iter()) {
        for (&x, &y) in d.iter().zip(w.iter()) {
            let mixed = x * g_dry + y * g_wet;
            peak = peak.max(mixed.abs());
            sum_sq += f64::from(mixed) * f64::from(mixed);
            count += 1;
        }
    }

    MixProbe {
        ratio,
        peak,
        rms: if count == 0 {
            0.0
        } else {
            (sum_sq / count as f64).sqrt() as f32
        },
    }
}

/// Share of spectral energy below the bass cutoff
///
/// Consecutive rectangular windows of `BASS_FFT_SIZE`; a source shorter
/// than one window is zero-padded.
pub fn bass_ratio(samples: &[f32], sample_rate: u32) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let windows = (samples.len() / BASS_FFT_SIZE).clamp(1, BASS_MAX_WINDOWS);
    let fft = FftPlanner::<f64>::new().plan_fft_forward(BASS_FFT_SIZE);
    let mut buffer = vec![Complex::new(0.0, 0.0); BASS_FFT_SIZE];
    let bin_hz = f64::from(sample_rate) / BASS_FFT_SIZE as f64;

    let mut bass = 0.0;
    let mut total = 0.0;
    for w in 0..windows {
        let start = w * BASS_FFT_SIZE;
        for (i, slot) in buffer.iter_mut().enumerate() {
            let x = samples.get(start + i).copied().unwrap_or(0.0);
            *slot = Complex::new(f64::from(x), 0.0);
        }
        fft.process(&mut buffer);

        for (k, bin) in buffer.iter().take(BASS_FFT_SIZE / 2 + 1).enumerate() {
            let energy = bin.norm_sqr();
            total += energy;
            if (k as f64) * bin_hz < BASS_CUTOFF_HZ {
                bass += energy;
            }
        }
    }

    if total > 1e-12 {
        (bass / total) as f32
    } else {
        0.0
    }
}
