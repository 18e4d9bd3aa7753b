/// Linkwitz-Riley band splitting for the multiband limiter
///
/// An LR4 section cascades two Butterworth biquads per side; its low and high
/// outputs sum to an allpass of the input. Three bands come from two LR4
/// sections in series, with the low band passed through a matching allpass
/// so all three bands share the same phase when summed.
use std::f64::consts::{FRAC_1_SQRT_2, PI};

#[derive(Debug, Clone, Copy)]
struct Coefficients {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

impl Coefficients {
    fn butterworth(freq: f64, sample_rate: u32, highpass: bool) -> Self {
        let w0 = 2.0 * PI * freq / f64::from(sample_rate);
        let (sin_w0, cos_w0) = w0.sin_cos();
        let alpha = sin_w0 / (2.0 * FRAC_1_SQRT_2);
        let a0 = 1.0 + alpha;

        let (b0, b1) = if highpass {
            ((1.0 + cos_w0) / 2.0, -(1.0 + cos_w0))
        } else {
            ((1.0 - cos_w0) / 2.0, 1.0 - cos_w0)
        };

        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b0 / a0,
            a1: -2.0 * cos_w0 / a0,
            a2: (1.0 - alpha) / a0,
        }
    }
}

/// Direct form I biquad section
#[derive(Debug, Clone)]
struct Biquad {
    c: Coefficients,
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl Biquad {
    fn new(c: Coefficients) -> Self {
        Self {
            c,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    #[inline]
    fn process(&mut self, x: f64) -> f64 {
        let y = self.c.b0 * x + self.c.b1 * self.x1 + self.c.b2 * self.x2
            - self.c.a1 * self.y1
            - self.c.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;
        y
    }

    fn reset(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }
}

/// 4th-order Linkwitz-Riley crossover (24 dB/oct)
#[derive(Debug, Clone)]
pub struct Lr4Crossover {
    low: [Biquad; 2],
    high: [Biquad; 2],
}

impl Lr4Crossover {
    pub fn new(freq: f32, sample_rate: u32) -> Self {
        let lp = Coefficients::butterworth(f64::from(freq), sample_rate, false);
        let hp = Coefficients::butterworth(f64::from(freq), sample_rate, true);
        Self {
            low: [Biquad::new(lp), Biquad::new(lp)],
            high: [Biquad::new(hp), Biquad::new(hp)],
        }
    }

    /// Split one sample into (low, high)
    #[inline]
    pub fn split(&mut self, input: f32) -> (f32, f32) {
        let x = f64::from(input);
        let low = self.low[0].process(x);
        let low = self.low[1].process(low);
        let high = self.high[0].process(x);
        let high = self.high[1].process(high);
        (low as f32, high as f32)
    }

    /// Allpass with the same phase as the split: `low + high`
    #[inline]
    pub fn allpass(&mut self, input: f32) -> f32 {
        let (low, high) = self.split(input);
        low + high
    }

    pub fn reset(&mut self) {
        for section in self.low.iter_mut().chain(self.high.iter_mut()) {
            section.reset();
        }
    }
}

/// Three-band splitter with phase-aligned bands
#[derive(Debug, Clone)]
pub struct ThreeBandSplitter {
    low_mid: Lr4Crossover,
    mid_high: Lr4Crossover,
    low_compensation: Lr4Crossover,
}

impl ThreeBandSplitter {
    pub fn new(low_hz: f32, high_hz: f32, sample_rate: u32) -> Self {
        Self {
            low_mid: Lr4Crossover::new(low_hz, sample_rate),
            mid_high: Lr4Crossover::new(high_hz, sample_rate),
            low_compensation: Lr4Crossover::new(high_hz, sample_rate),
        }
    }

    /// Split one sample into (low, mid, high)
    #[inline]
    pub fn split(&mut self, input: f32) -> (f32, f32, f32) {
        let (low, rest) = self.low_mid.split(input);
        let (mid, high) = self.mid_high.split(rest);
        let low = self.low_compensation.allpass(low);
        (low, mid, high)
    }

    pub fn reset(&mut self) {
        self.low_mid.reset();
        self.mid_high.reset();
        self.low_compensation.reset();
    }
}
