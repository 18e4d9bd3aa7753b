//! Property-based tests for the real-time signal path
//!
//! These tests use proptest to verify invariants across many random inputs.

use phon_audio::effects::{
    equal_power_gains, CrossfadeController, CurveShape, DelayLine, GainCurve, SoftKnee,
    StreamingFir, OVERSHOOT_RANGE,
};
use proptest::prelude::*;

// Helper: plain convolution of a whole signal
fn convolve(taps: &[f32], input: &[f32]) -> Vec<f32> {
    let mut fir = StreamingFir::from_taps(taps, input.len().max(1));
    let mut state = fir.new_state();
    let mut output = vec![0.0; input.len()];
    fir.process(&mut state, input, &mut output);
    output
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: the delay line returns every sample exactly `len` samples later
    #[test]
    fn delay_round_trip(
        len in 0_usize..300,
        samples in prop::collection::vec(-1.0f32..1.0, 1..1000)
    ) {
        let mut delay = DelayLine::new(len);
        let mut buffer = samples.clone();
        delay.process(&mut buffer);

        for (i, &out) in buffer.iter().enumerate() {
            let expected = if i >= len { samples[i - len] } else { 0.0 };
            prop_assert_eq!(out, expected);
        }
    }

    /// Property: splitting a stream into blocks never changes the filter output
    #[test]
    fn fir_block_split_is_bit_identical(
        taps in prop::collection::vec(-0.5f32..0.5, 1..64),
        samples in prop::collection::vec(-1.0f32..1.0, 1..2000),
        max_block in 1_usize..300,
        splits in prop::collection::vec(1_usize..400, 1..20)
    ) {
        let expected = convolve(&taps, &samples);

        let mut fir = StreamingFir::from_taps(&taps, max_block);
        let mut state = fir.new_state();
        let mut actual = vec![0.0; samples.len()];
        let mut offset = 0;
        let mut sizes = splits.iter().cycle();
        while offset < samples.len() {
            let size = sizes.next().copied().unwrap_or(1);
            let end = (offset + size).min(samples.len());
            fir.process(&mut state, &samples[offset..end], &mut actual[offset..end]);
            offset = end;
        }

        prop_assert_eq!(actual, expected);
    }

    /// Property: the ramp reaches any target within the fade length, monotonically
    #[test]
    fn crossfade_converges_monotonically(
        start in 0.0f32..=1.0,
        target in 0.0f32..=1.0,
        fade in 1_usize..3000
    ) {
        let mut fade_ctl = CrossfadeController::new(start, fade);
        fade_ctl.set_target(target);

        let mut ramp = vec![0.0; fade];
        fade_ctl.fill_ramp(&mut ramp);

        prop_assert_eq!(fade_ctl.current(), target);
        let mut previous = start;
        for &value in &ramp {
            if target >= start {
                prop_assert!(value >= previous && value <= target);
            } else {
                prop_assert!(value <= previous && value >= target);
            }
            previous = value;
        }
    }

    /// Property: once settled the ramp holds its value
    #[test]
    fn crossfade_settled_is_idempotent(value in 0.0f32..=1.0, fade in 1_usize..500) {
        let mut fade_ctl = CrossfadeController::new(value, fade);
        let mut ramp = vec![0.0; 64];
        fade_ctl.fill_ramp(&mut ramp);
        fade_ctl.set_target(value);
        fade_ctl.fill_ramp(&mut ramp);

        prop_assert!(ramp.iter().all(|&x| x == value));
        prop_assert!(fade_ctl.is_settled());
    }

    /// Property: equal-power gains keep constant total power
    #[test]
    fn equal_power_law(ratio in 0.0f32..=1.0) {
        let (dry, wet) = equal_power_gains(ratio);
        prop_assert!((dry * dry + wet * wet - 1.0).abs() < 1e-5);
        prop_assert!(dry >= -1e-6 && wet >= 0.0);
    }

    /// Property: every compensation curve is unity at both ends and never boosts
    #[test]
    fn gain_curve_endpoints(
        depth in -24.0f32..=0.0,
        exponent in 1.0f32..2.0,
        x in 0.0f32..=1.0
    ) {
        for shape in [
            CurveShape::Parabolic { depth_db: depth },
            CurveShape::Shaped { depth_db: depth, exponent },
        ] {
            let curve = GainCurve::new(shape);
            prop_assert_eq!(curve.gain(0.0), 1.0);
            prop_assert_eq!(curve.gain(1.0), 1.0);
            prop_assert!(curve.gain(x) <= 1.0 + 1e-6);
            prop_assert!(curve.gain(x) >= curve.gain(0.5) - 1e-6);
        }
    }

    /// Property: soft knee is monotonic and bounded
    #[test]
    fn soft_knee_monotonic_and_bounded(
        threshold in 0.3f32..1.0,
        knee in 0.0f32..0.2,
        a in -4.0f32..4.0,
        b in -4.0f32..4.0
    ) {
        let limiter = SoftKnee::new(threshold, knee);
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(limiter.apply(lo) <= limiter.apply(hi) + 1e-6);

        for x in [a, b] {
            let y = limiter.apply(x);
            prop_assert!(y.abs() <= threshold + OVERSHOOT_RANGE + 1e-6);
            prop_assert!(y.abs() <= x.abs() + 1e-6);
        }
    }
}
