/// Dry/wet crossfade ramp and equal-power mixing law
///
/// The controller walks `current` toward `target` by a fixed step of
/// `1 / fade_samples` per sample and snaps once within one step, so any
/// move (a full 0 → 1 sweep included) completes within `fade_samples`
/// samples without overshoot.
use std::f32::consts::FRAC_PI_2;

/// Snap tolerance added to the step to absorb accumulated rounding
const SNAP_EPSILON: f64 = 1e-9;

/// Equal-power gains for a mix ratio: `(dry, wet) = (cos(x·π/2), sin(x·π/2))`
///
/// `dry² + wet² = 1` for every ratio in [0, 1].
#[inline]
pub fn equal_power_gains(ratio: f32) -> (f32, f32) {
    let angle = ratio.clamp(0.0, 1.0) * FRAC_PI_2;
    (angle.cos(), angle.sin())
}

/// Fade length in samples for a duration, never below one
pub fn fade_samples(fade_ms: f32, sample_rate: u32) -> usize {
    let samples = (f64::from(fade_ms) * f64::from(sample_rate) / 1000.0).round();
    if samples.is_finite() && samples >= 1.0 {
        samples as usize
    } else {
        1
    }
}

#[derive(Debug, Clone)]
pub struct CrossfadeController {
    current: f64,
    target: f64,
    step: f64,
    fade_samples: usize,
}

impl CrossfadeController {
    /// Controller resting at `initial`
    pub fn new(initial: f32, fade_samples: usize) -> Self {
        let fade_samples = fade_samples.max(1);
        let initial = f64::from(initial.clamp(0.0, 1.0));
        Self {
            current: initial,
            target: initial,
            step: 1.0 / fade_samples as f64,
            fade_samples,
        }
    }

    /// Controller for a fade duration at a sample rate
    pub fn with_duration(initial: f32, fade_ms: f32, sample_rate: u32) -> Self {
        Self::new(initial, fade_samples(fade_ms, sample_rate))
    }

    /// Set the ratio to move toward (clamped to [0, 1])
    pub fn set_target(&mut self, target: f32) {
        let target = if target.is_finite() { target } else { 0.0 };
        self.target = f64::from(target.clamp(0.0, 1.0));
    }

    /// Jump to `ratio` immediately, without a ramp
    pub fn jump_to(&mut self, ratio: f32) {
        self.set_target(ratio);
        self.current = self.target;
    }

    pub fn current(&self) -> f32 {
        self.current as f32
    }

    pub fn target(&self) -> f32 {
        self.target as f32
    }

    pub fn fade_samples(&self) -> usize {
        self.fade_samples
    }

    /// True once the ramp has reached its target
    pub fn is_settled(&self) -> bool {
        self.current == self.target
    }

    /// Advance one sample and return the new ratio
    #[inline]
    pub fn next_ratio(&mut self) -> f32 {
        let diff = self.target - self.current;
        if diff.abs() <= self.step + SNAP_EPSILON {
            self.current = self.target;
        } else {
            self.current += self.step.copysign(diff);
        }
        self.current as f32
    }

    /// Fill `ramp` with successive per-sample ratios
    pub fn fill_ramp(&mut self, ramp: &mut [f32]) {
        for value in ramp.iter_mut() {
            *value = self.next_ratio();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_power_endpoints() {
        assert_eq!(equal_power_gains(0.0), (1.0, 0.0));
        let (dry, wet) = equal_power_gains(1.0);
        assert!(dry.abs() < 1e-6);
        assert!((wet - 1.0).abs() < 1e-6);

        let (dry, wet) = equal_power_gains(0.5);
        assert!((dry - wet).abs() < 1e-6);
        assert!((dry * dry + wet * wet - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_fade_samples() {
        assert_eq!(fade_samples(50.0, 48000), 2400);
        assert_eq!(fade_samples(50.0, 44100), 2205);
        assert_eq!(fade_samples(0.0, 48000), 1);
    }

    #[test]
    fn test_full_sweep_within_fade() {
        let mut fade = CrossfadeController::new(0.0, 100);
        fade.set_target(1.0);

        let mut ramp = vec![0.0; 100];
        fade.fill_ramp(&mut ramp);

        assert_eq!(ramp[99], 1.0);
        assert!(fade.is_settled());
        for pair in ramp.windows(2) {
            assert!(pair[1] >= pair[0]);
        }
    }

    #[test]
    fn test_ramp_down_no_overshoot() {
        let mut fade = CrossfadeController::new(0.8, 10);
        fade.set_target(0.25);

        let mut ramp = vec![0.0; 20];
        fade.fill_ramp(&mut ramp);
        for value in &ramp {
            assert!(*value >= 0.25 - 1e-6);
        }
        assert_eq!(fade.current(), 0.25);
    }

    #[test]
    fn test_target_is_clamped() {
        let mut fade = CrossfadeController::new(0.5, 4);
        fade.set_target(3.0);
        assert_eq!(fade.target(), 1.0);
        fade.set_target(-1.0);
        assert_eq!(fade.target(), 0.0);
        fade.set_target(f32::NAN);
        assert_eq!(fade.target(), 0.0);
    }

    #[test]
    fn test_settled_ramp_is_constant() {
        let mut fade = CrossfadeController::new(0.3, 10);
        let mut ramp = [0.0; 8];
        fade.fill_ramp(&mut ramp);
        assert!(ramp.iter().all(|&x| x == 0.3_f32));
    }

    #[test]
    fn test_jump_to() {
        let mut fade = CrossfadeController::new(0.0, 1000);
        fade.jump_to(1.0);
        assert!(fade.is_settled());
        assert_eq!(fade.next_ratio(), 1.0);
    }
}
