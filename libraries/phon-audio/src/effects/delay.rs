/// Dry-path delay compensation
///
/// Circular buffer of exactly the FIR group delay. Each sample reads the slot
/// before overwriting it, so the output is the input from `len` samples ago.

#[derive(Debug, Clone)]
pub struct DelayLine {
    buffer: Vec<f32>,
    position: usize,
}

impl DelayLine {
    /// Delay of `samples` (0 = passthrough)
    pub fn new(samples: usize) -> Self {
        Self {
            buffer: vec![0.0; samples],
            position: 0,
        }
    }

    /// Delay matching a linear-phase filter of `taps` coefficients
    pub fn for_taps(taps: usize) -> Self {
        Self::new(taps.saturating_sub(1) / 2)
    }

    /// Delay in samples
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    #[inline]
    pub fn process_sample(&mut self, input: f32) -> f32 {
        if self.buffer.is_empty() {
            return input;
        }
        let delayed = self.buffer[self.position];
        self.buffer[self.position] = input;
        self.position += 1;
        if self.position == self.buffer.len() {
            self.position = 0;
        }
        delayed
    }

    /// Delay a block in place, in strict sample order
    pub fn process(&mut self, block: &mut [f32]) {
        for sample in block.iter_mut() {
            *sample = self.process_sample(*sample);
        }
    }

    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.position = 0;
    }

    /// True when the line holds only silence
    pub fn is_clear(&self) -> bool {
        self.buffer.iter().all(|&x| x == 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delays_by_length() {
        let mut delay = DelayLine::new(3);
        let mut block = [1.0, 2.0, 3.0, 4.0, 5.0];
        delay.process(&mut block);
        assert_eq!(block, [0.0, 0.0, 0.0, 1.0, 2.0]);

        let mut next = [6.0, 7.0];
        delay.process(&mut next);
        assert_eq!(next, [3.0, 4.0]);
    }

    #[test]
    fn test_for_taps_matches_group_delay() {
        assert_eq!(DelayLine::for_taps(513).len(), 256);
        assert_eq!(DelayLine::for_taps(1).len(), 0);
    }

    #[test]
    fn test_zero_length_is_passthrough() {
        let mut delay = DelayLine::new(0);
        assert!(delay.is_empty());
        let mut block = [0.25, -0.5];
        delay.process(&mut block);
        assert_eq!(block, [0.25, -0.5]);
    }

    #[test]
    fn test_reset() {
        let mut delay = DelayLine::new(4);
        delay.process(&mut [1.0, 1.0]);
        assert!(!delay.is_clear());

        delay.reset();
        assert!(delay.is_clear());
        assert_eq!(delay.process_sample(2.0), 0.0);
    }
}
