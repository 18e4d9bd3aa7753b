/// Streaming FIR filtering
///
/// Applies a designed [`FirFilter`] block by block while carrying the
/// filter's delay line across calls in a [`FilterState`]. Output is
/// bit-identical to filtering the whole stream in one pass, however the
/// stream is split into blocks.
use phon_loudness::FirFilter;

/// Per-channel carry-over of the FIR delay line
///
/// Holds the last `taps - 1` input samples, oldest first.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterState {
    history: Vec<f32>,
}

impl FilterState {
    /// Zeroed state for a filter of `taps` coefficients
    pub fn new(taps: usize) -> Self {
        Self {
            history: vec![0.0; taps.saturating_sub(1)],
        }
    }

    /// Zero the delay line (stream discontinuity)
    pub fn reset(&mut self) {
        self.history.fill(0.0);
    }

    /// Stored input samples, oldest first
    pub fn history(&self) -> &[f32] {
        &self.history
    }

    /// True when every stored sample is zero
    pub fn is_clear(&self) -> bool {
        self.history.iter().all(|&x| x == 0.0)
    }
}

/// Direct-form FIR convolver with a preallocated work buffer
///
/// # Real-Time Safety
/// - Work buffer sized at construction for `max_block` samples
/// - Longer inputs are processed in `max_block` chunks
/// - No allocations in `process()`
pub struct StreamingFir {
    /// Coefficients in reverse order, so a forward window walk is a convolution
    reversed: Vec<f32>,
    scratch: Vec<f32>,
    max_block: usize,
}

impl StreamingFir {
    pub fn new(filter: &FirFilter, max_block: usize) -> Self {
        Self::from_taps(filter.taps(), max_block)
    }

    /// Build from raw coefficients
    pub fn from_taps(taps: &[f32], max_block: usize) -> Self {
        let max_block = max_block.max(1);
        let history = taps.len().saturating_sub(1);
        Self {
            reversed: taps.iter().rev().copied().collect(),
            scratch: vec![0.0; history + max_block],
            max_block,
        }
    }

    /// Number of coefficients
    pub fn len(&self) -> usize {
        self.reversed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reversed.is_empty()
    }

    /// Fresh zeroed state matching this filter
    pub fn new_state(&self) -> FilterState {
        FilterState::new(self.len())
    }

    /// Filter `input` into `output`, advancing `state`
    ///
    /// `output` must be at least as long as `input`; extra samples are left
    /// untouched.
    pub fn process(&mut self, state: &mut FilterState, input: &[f32], output: &mut [f32]) {
        debug_assert_eq!(state.history.len(), self.len().saturating_sub(1));
        debug_assert!(output.len() >= input.len());

        if self.reversed.is_empty() {
            output[..input.len()].fill(0.0);
            return;
        }

        let history = state.history.len();
        let taps = self.reversed.len();

        for (in_chunk, out_chunk) in input
            .chunks(self.max_block)
            .zip(output.chunks_mut(self.max_block))
        {
            let n = in_chunk.len();
            self.scratch[..history].copy_from_slice(&state.history);
            self.scratch[history..history + n].copy_from_slice(in_chunk);

            for (i, out) in out_chunk.iter_mut().take(n).enumerate() {
                *out = self.scratch[i..i + taps]
                    .iter()
                    .zip(self.reversed.iter())
                    .fold(0.0_f32, |acc, (x, h)| acc + x * h);
            }

            state
                .history
                .copy_from_slice(&self.scratch[n..n + history]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn convolve(taps: &[f32], input: &[f32]) -> Vec<f32> {
        (0..input.len())
            .map(|n| {
                let mut acc = 0.0_f32;
                for (k, h) in taps.iter().enumerate().rev() {
                    if n >= k {
                        acc += h * input[n - k];
                    }
                }
                acc
            })
            .collect()
    }

    #[test]
    fn test_impulse_returns_taps() {
        let taps = [0.1, 0.2, 0.4, 0.2, 0.1];
        let mut fir = StreamingFir::from_taps(&taps, 16);
        let mut state = fir.new_state();

        let mut input = vec![0.0; 8];
        input[0] = 1.0;
        let mut output = vec![0.0; 8];
        fir.process(&mut state, &input, &mut output);

        assert_eq!(&output[..5], &taps);
        assert!(output[5..].iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_matches_direct_convolution() {
        let taps = [0.5, -0.25, 0.125];
        let input: Vec<f32> = (0..20).map(|i| (i as f32 * 0.3).sin()).collect();
        let mut fir = StreamingFir::from_taps(&taps, 64);
        let mut state = fir.new_state();
        let mut output = vec![0.0; input.len()];
        fir.process(&mut state, &input, &mut output);

        for (a, b) in output.iter().zip(convolve(&taps, &input).iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_block_split_is_bit_identical() {
        let taps: Vec<f32> = (0..31).map(|i| ((i as f32) * 0.7).cos() / 31.0).collect();
        let input: Vec<f32> = (0..500).map(|i| ((i * 37 % 101) as f32 / 50.0) - 1.0).collect();

        let mut whole = StreamingFir::from_taps(&taps, 1024);
        let mut state = whole.new_state();
        let mut expected = vec![0.0; input.len()];
        whole.process(&mut state, &input, &mut expected);

        let mut split = StreamingFir::from_taps(&taps, 7);
        let mut state = split.new_state();
        let mut actual = vec![0.0; input.len()];
        let mut offset = 0;
        for size in [1, 13, 64, 2, 200, 220] {
            let end = offset + size;
            split.process(&mut state, &input[offset..end], &mut actual[offset..end]);
            offset = end;
        }

        assert_eq!(offset, input.len());
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_reset_clears_tail() {
        let taps = [0.0, 0.0, 1.0];
        let mut fir = StreamingFir::from_taps(&taps, 4);
        let mut state = fir.new_state();
        let mut output = [0.0; 2];
        fir.process(&mut state, &[1.0, 1.0], &mut output);
        assert!(!state.is_clear());

        state.reset();
        assert!(state.is_clear());
        fir.process(&mut state, &[0.0, 0.0], &mut output);
        assert_eq!(output, [0.0, 0.0]);
    }

    #[test]
    fn test_single_tap_is_gain() {
        let mut fir = StreamingFir::from_taps(&[0.5], 4);
        let mut state = fir.new_state();
        assert!(state.history().is_empty());

        let mut output = [0.0; 3];
        fir.process(&mut state, &[1.0, -1.0, 0.5], &mut output);
        assert_eq!(output, [0.5, -0.5, 0.25]);
    }

    #[test]
    fn test_designed_filter_length() {
        let filter = FirFilter::design(60.0, 80.0, 101, 48000).unwrap();
        let fir = StreamingFir::new(&filter, 256);
        assert_eq!(fir.len(), 101);
        assert_eq!(fir.new_state().history().len(), 100);
    }
}
