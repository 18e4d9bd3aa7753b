use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::PI;

/// Pink-noise shaping filter numerator (Paul Kellet)
const PINK_B: [f64; 4] = [0.049922035, -0.095993537, 0.050612699, -0.004408786];

/// Pink-noise shaping filter denominator (Paul Kellet)
const PINK_A: [f64; 4] = [1.0, -2.494956002, 2.017265875, -0.522189400];

/// Mono sine of `duration_secs` at `amplitude`
pub fn generate_sine(freq: f32, sample_rate: u32, duration_secs: f32, amplitude: f32) -> Vec<f32> {
    let num_samples = (sample_rate as f32 * duration_secs) as usize;
    (0..num_samples)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            amplitude * (2.0 * PI * freq * t).sin()
        })
        .collect()
}

/// Unit impulse at `position`
pub fn generate_impulse(len: usize, position: usize) -> Vec<f32> {
    let mut samples = vec![0.0; len];
    if let Some(s) = samples.get_mut(position) {
        *s = 1.0;
    }
    samples
}

/// Uniform white noise in [-amplitude, amplitude), reproducible per `seed`
pub fn generate_white_noise(len: usize, seed: u64, amplitude: f32) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len)
        .map(|_| amplitude * rng.gen_range(-1.0_f32..1.0))
        .collect()
}

/// Pink noise scaled so its peak equals `amplitude`
pub fn generate_pink_noise(len: usize, seed: u64, amplitude: f32) -> Vec<f32> {
    let white = generate_white_noise(len, seed, 1.0);
    let mut x = [0.0_f64; 4];
    let mut y = [0.0_f64; 4];

    let mut pink: Vec<f32> = white
        .iter()
        .map(|&input| {
            x.rotate_right(1);
            y.rotate_right(1);
            x[0] = f64::from(input);
            let out = PINK_B[0] * x[0] + PINK_B[1] * x[1] + PINK_B[2] * x[2] + PINK_B[3] * x[3]
                - PINK_A[1] * y[1]
                - PINK_A[2] * y[2]
                - PINK_A[3] * y[3];
            y[0] = out;
            out as f32
        })
        .collect();

    let max = peak(&pink);
    if max > 0.0 {
        let scale = amplitude / max;
        for s in &mut pink {
            *s *= scale;
        }
    }
    pink
}

pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples.iter().map(|&s| f64::from(s) * f64::from(s)).sum();
    (sum / samples.len() as f64).sqrt() as f32
}

/// RMS level in dBFS (silence floors at -120 dB)
pub fn rms_db(samples: &[f32]) -> f32 {
    crate::effects::linear_to_db(rms(samples))
}

pub fn peak(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0_f32, |m, &s| m.max(s.abs()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sine_rms() {
        let sine = generate_sine(1000.0, 48000, 1.0, 1.0);
        assert_eq!(sine.len(), 48000);
        assert!((rms(&sine) - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-3);
    }

    #[test]
    fn test_noise_is_deterministic() {
        assert_eq!(generate_white_noise(64, 7, 1.0), generate_white_noise(64, 7, 1.0));
        assert_ne!(generate_white_noise(64, 7, 1.0), generate_white_noise(64, 8, 1.0));
        assert!(peak(&generate_white_noise(1000, 1, 0.5)) <= 0.5);
    }

    #[test]
    fn test_white_noise_is_uniform() {
        let noise = generate_white_noise(48000, 42, 1.0);
        let mean = noise.iter().map(|&x| f64::from(x)).sum::<f64>() / noise.len() as f64;
        assert!(mean.abs() < 0.02);
        // Uniform on [-1, 1) has RMS 1/sqrt(3)
        assert!((rms(&noise) - 0.57735).abs() < 0.01);
    }

    #[test]
    fn test_pink_peak_is_scaled() {
        let pink = generate_pink_noise(10000, 3, 0.8);
        assert!((peak(&pink) - 0.8).abs() < 1e-5);
    }

    #[test]
    fn test_impulse() {
        let impulse = generate_impulse(8, 3);
        assert_eq!(impulse[3], 1.0);
        assert_eq!(impulse.iter().sum::<f32>(), 1.0);
        assert_eq!(generate_impulse(2, 5), vec![0.0, 0.0]);
    }
}
