/// Mix-position gain compensation
///
/// Equal-power mixing of two partially correlated paths bulges in level
/// around the middle of the blend. The curve pulls the gain down there and
/// leaves both endpoints at unity:
///
/// `reduction_db(x) = depth · (4x(1 − x))^exponent`
///
/// The curve is precomputed at construction into a 101-point lookup and read
/// with linear interpolation.

/// Lookup resolution (points across [0, 1])
pub const CURVE_POINTS: usize = 101;

/// Shape of the compensation curve
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CurveShape {
    /// Unity everywhere
    Flat,
    /// Parabolic dip reaching `depth_db` at the midpoint
    Parabolic { depth_db: f32 },
    /// Dip sharpened by `exponent` (1 = parabolic)
    Shaped { depth_db: f32, exponent: f32 },
}

impl CurveShape {
    /// Reduction in dB at mix ratio `x`
    pub fn reduction_db(&self, x: f32) -> f32 {
        let x = x.clamp(0.0, 1.0);
        let bell = 4.0 * x * (1.0 - x);
        match *self {
            Self::Flat => 0.0,
            Self::Parabolic { depth_db } => depth_db * bell,
            Self::Shaped { depth_db, exponent } => depth_db * bell.powf(exponent.max(0.0)),
        }
    }

    /// Deepest reduction in dB (at the midpoint)
    pub fn depth_db(&self) -> f32 {
        match *self {
            Self::Flat => 0.0,
            Self::Parabolic { depth_db } | Self::Shaped { depth_db, .. } => depth_db,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GainCurve {
    shape: CurveShape,
    table: [f32; CURVE_POINTS],
}

impl GainCurve {
    pub fn new(shape: CurveShape) -> Self {
        let mut table = [1.0; CURVE_POINTS];
        for (i, gain) in table.iter_mut().enumerate() {
            let x = i as f32 / (CURVE_POINTS - 1) as f32;
            *gain = db_to_linear(shape.reduction_db(x));
        }
        Self { shape, table }
    }

    pub fn flat() -> Self {
        Self::new(CurveShape::Flat)
    }

    pub fn shape(&self) -> CurveShape {
        self.shape
    }

    /// Linear gain at mix ratio `x` (clamped to [0, 1])
    #[inline]
    pub fn gain(&self, x: f32) -> f32 {
        let position = x.clamp(0.0, 1.0) * (CURVE_POINTS - 1) as f32;
        let index = position.floor() as usize;
        if index >= CURVE_POINTS - 1 {
            return self.table[CURVE_POINTS - 1];
        }
        let frac = position - index as f32;
        self.table[index] + (self.table[index + 1] - self.table[index]) * frac
    }

    /// One gain for a whole block, read at the midpoint of its ramp
    ///
    /// An empty ramp gives unity.
    #[inline]
    pub fn block_gain(&self, ramp: &[f32]) -> f32 {
        ramp.get(ramp.len() / 2).map_or(1.0, |&x| self.gain(x))
    }

    /// Gain at `x` in dB
    pub fn gain_db(&self, x: f32) -> f32 {
        linear_to_db(self.gain(x))
    }
}

impl Default for GainCurve {
    fn default() -> Self {
        Self::flat()
    }
}

/// Convert dB to linear gain
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Convert linear gain to dB (silence floors at -120 dB)
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    if linear <= 1e-6 {
        -120.0
    } else {
        20.0 * linear.log10()
    }
}
