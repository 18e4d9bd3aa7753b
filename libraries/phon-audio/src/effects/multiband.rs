/// Three-band soft-knee limiter
///
/// Each channel is split at the two crossover frequencies, every band is
/// limited with its own soft-knee threshold, and the bands are summed back.
use super::chain::StereoEffect;
use super::compensation::linear_to_db;
use super::crossover::ThreeBandSplitter;
use super::soft_knee::SoftKnee;
use crate::config::DynamicsSettings;

pub struct MultibandLimiter {
    splitters: [ThreeBandSplitter; 2],
    bands: [SoftKnee; 3],
    gain_reduction_db: f32,
}

impl MultibandLimiter {
    pub fn new(settings: &DynamicsSettings, sample_rate: u32) -> Self {
        let splitter = ThreeBandSplitter::new(
            settings.low_crossover_hz,
            settings.high_crossover_hz,
            sample_rate,
        );
        Self {
            splitters: [splitter.clone(), splitter],
            bands: [
                SoftKnee::new(settings.low_threshold, settings.knee_width),
                SoftKnee::new(settings.mid_threshold, settings.knee_width),
                SoftKnee::new(settings.high_threshold, settings.knee_width),
            ],
            gain_reduction_db: 0.0,
        }
    }

    fn process_channel(
        splitter: &mut ThreeBandSplitter,
        bands: &[SoftKnee; 3],
        samples: &mut [f32],
    ) -> f32 {
        let mut ratio = 1.0_f32;
        for sample in samples.iter_mut() {
            let (low, mid, high) = splitter.split(*sample);
            let unlimited = low + mid + high;
            let limited = bands[0].apply(low) + bands[1].apply(mid) + bands[2].apply(high);
            if unlimited.abs() > f32::EPSILON {
                ratio = ratio.min(limited.abs() / unlimited.abs());
            }
            *sample = limited;
        }
        ratio
    }
}

impl StereoEffect for MultibandLimiter {
    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        let [left_split, right_split] = &mut self.splitters;
        let ratio = Self::process_channel(left_split, &self.bands, left)
            .min(Self::process_channel(right_split, &self.bands, right));
        self.gain_reduction_db = linear_to_db(ratio).min(0.0);
    }

    fn reset(&mut self) {
        for splitter in &mut self.splitters {
            splitter.reset();
        }
        self.gain_reduction_db = 0.0;
    }

    fn gain_reduction_db(&self) -> f32 {
        self.gain_reduction_db
    }

    fn name(&self) -> &str {
        "Multiband Limiter"
    }
}
