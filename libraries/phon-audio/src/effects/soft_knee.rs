/// Soft-knee peak limiting
///
/// Below `threshold - knee` samples pass unchanged. Across the knee
/// (`threshold ± knee`) the slope falls quadratically from 1 to 0, landing on
/// the threshold. Beyond it the excess is squashed with `tanh`, so the output
/// never exceeds `threshold + OVERSHOOT_RANGE`. The curve is continuous,
/// monotonically non-decreasing and never raises a sample's magnitude.
use super::chain::StereoEffect;
use super::compensation::linear_to_db;

/// Maximum output excess above the threshold
pub const OVERSHOOT_RANGE: f32 = 0.05;

/// Input gain into the overshoot `tanh`
const OVERSHOOT_DRIVE: f32 = 2.0;

/// Static soft-knee transfer curve
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoftKnee {
    threshold: f32,
    knee: f32,
}

impl SoftKnee {
    /// `knee` is clamped to `[0, threshold]`
    pub fn new(threshold: f32, knee: f32) -> Self {
        let threshold = threshold.max(f32::EPSILON);
        Self {
            threshold,
            knee: knee.clamp(0.0, threshold),
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn knee(&self) -> f32 {
        self.knee
    }

    #[inline]
    pub fn apply(&self, x: f32) -> f32 {
        let magnitude = x.abs();
        let knee_start = self.threshold - self.knee;

        if magnitude <= knee_start {
            return x;
        }

        let knee_end = self.threshold + self.knee;
        let shaped = if magnitude <= knee_end {
            let into = magnitude - knee_start;
            magnitude - into * into / (4.0 * self.knee)
        } else {
            self.threshold
                + OVERSHOOT_RANGE * ((magnitude - knee_end) * OVERSHOOT_DRIVE).tanh()
        };
        x.signum() * shaped
    }
}

/// Full-band soft-knee limiter on both channels
pub struct SoftClipper {
    knee: SoftKnee,
    gain_reduction_db: f32,
}

impl SoftClipper {
    pub fn new(threshold: f32, knee: f32) -> Self {
        Self {
            knee: SoftKnee::new(threshold, knee),
            gain_reduction_db: 0.0,
        }
    }
}

impl StereoEffect for SoftClipper {
    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        let mut ratio = 1.0_f32;
        for sample in left.iter_mut().chain(right.iter_mut()) {
            let input = *sample;
            let output = self.knee.apply(input);
            if input.abs() > f32::EPSILON {
                ratio = ratio.min(output.abs() / input.abs());
            }
            *sample = output;
        }
        self.gain_reduction_db = linear_to_db(ratio).min(0.0);
    }

    fn reset(&mut self) {
        self.gain_reduction_db = 0.0;
    }

    fn gain_reduction_db(&self) -> f32 {
        self.gain_reduction_db
    }

    fn name(&self) -> &str {
        "Soft Clip"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_below_knee_is_identity() {
        let knee = SoftKnee::new(0.9, 0.1);
        for x in [0.0, 0.3, -0.5, 0.8, -0.8] {
            assert_eq!(knee.apply(x), x);
        }
    }

    #[test]
    fn test_continuous_at_boundaries() {
        let knee = SoftKnee::new(0.9, 0.1);
        let eps = 1e-4;
        assert!((knee.apply(0.8 + eps) - knee.apply(0.8)).abs() < 1e-3);
        assert!((knee.apply(1.0 + eps) - knee.apply(1.0)).abs() < 1e-3);
        assert!((knee.apply(1.0) - 0.9).abs() < 1e-6);
        assert!(knee.apply(0.9) < 0.9);
    }

    #[test]
    fn test_output_bounded() {
        let knee = SoftKnee::new(0.9, 0.1);
        for x in [2.0, 10.0, 1000.0] {
            let y = knee.apply(x);
            assert!(y <= 0.9 + OVERSHOOT_RANGE);
            assert!(y > 0.9);
            assert_eq!(knee.apply(-x), -y);
        }
    }

    #[test]
    fn test_never_expands() {
        let knee = SoftKnee::new(0.7, 0.1);
        for i in 0..=300 {
            let x = i as f32 * 0.01;
            assert!(knee.apply(x) <= x + 1e-6);
        }
    }

    #[test]
    fn test_monotonic() {
        let knee = SoftKnee::new(0.7, 0.1);
        let mut previous = knee.apply(-3.0);
        for i in -300..=300 {
            let y = knee.apply(i as f32 * 0.01);
            assert!(y >= previous - 1e-6);
            previous = y;
        }
    }

    #[test]
    fn test_zero_knee_is_hard_threshold_entry() {
        let knee = SoftKnee::new(0.9, 0.0);
        assert_eq!(knee.apply(0.9), 0.9);
        assert!(knee.apply(1.0) < 0.9 + OVERSHOOT_RANGE);
    }

    #[test]
    fn test_clipper_reports_reduction() {
        let mut clipper = SoftClipper::new(0.9, 0.1);
        let mut left = vec![0.1, 1.5];
        let mut right = vec![0.2, -0.3];
        clipper.process(&mut left, &mut right);
        assert!(left[1] < 0.96);
        assert_eq!(right, vec![0.2, -0.3]);
        assert!(clipper.gain_reduction_db() < -3.0);
    }
}
