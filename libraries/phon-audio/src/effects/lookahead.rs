/// Look-ahead peak limiter
///
/// The signal is delayed by the look-ahead window while the gain is driven
/// from the peak of everything inside that window, so reduction starts before
/// a transient reaches the output. Both channels share one gain.
///
/// The window peak is a running maximum: a monotonic deque of
/// (frame, linked peak) pairs whose values decrease front to back, so each
/// sample costs amortized O(1) instead of a scan of the window.
///
/// # Real-Time Safety
/// - Ring buffers and the deque allocated in the constructor
/// - No allocations in `process()`
use super::chain::StereoEffect;
use super::compensation::linear_to_db;
use crate::config::DynamicsSettings;
use std::collections::VecDeque;

pub struct LookaheadLimiter {
    buffers: [Vec<f32>; 2],
    position: usize,
    /// Candidates for the window maximum; never holds more than a window
    peaks: VecDeque<(u64, f32)>,
    frame: u64,
    ceiling: f32,
    smoothing: f32,
    gain: f32,
    min_gain: f32,
}

impl LookaheadLimiter {
    pub fn new(settings: &DynamicsSettings, sample_rate: u32) -> Self {
        let window = Self::window_samples(settings.lookahead_ms, sample_rate);
        Self {
            buffers: [vec![0.0; window], vec![0.0; window]],
            position: 0,
            peaks: VecDeque::with_capacity(window + 1),
            frame: 0,
            ceiling: settings.ceiling,
            smoothing: settings.smoothing,
            gain: 1.0,
            min_gain: 1.0,
        }
    }

    /// Look-ahead window length in samples (at least one)
    pub fn window_samples(lookahead_ms: f32, sample_rate: u32) -> usize {
        let samples = (lookahead_ms * sample_rate as f32 / 1000.0).round();
        if samples.is_finite() && samples >= 1.0 {
            samples as usize
        } else {
            1
        }
    }

    /// Current smoothed gain
    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// Push one linked frame peak and return the maximum of the last
    /// `window` frames
    #[inline]
    fn push_peak(&mut self, value: f32) -> f32 {
        let window = self.buffers[0].len() as u64;
        while self.peaks.back().is_some_and(|&(_, v)| v <= value) {
            self.peaks.pop_back();
        }
        self.peaks.push_back((self.frame, value));
        while self.peaks.front().is_some_and(|&(f, _)| f + window <= self.frame) {
            self.peaks.pop_front();
        }
        self.frame += 1;
        self.peaks.front().map_or(0.0, |&(_, v)| v)
    }
}

impl StereoEffect for LookaheadLimiter {
    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        let len = self.buffers[0].len();
        self.min_gain = 1.0;

        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let delayed_l = std::mem::replace(&mut self.buffers[0][self.position], *l);
            let delayed_r = std::mem::replace(&mut self.buffers[1][self.position], *r);
            self.position = (self.position + 1) % len;

            let peak = self.push_peak(l.abs().max(r.abs()));
            let target = if peak > self.ceiling {
                self.ceiling / peak
            } else {
                1.0
            };
            self.gain = self.gain * self.smoothing + target * (1.0 - self.smoothing);
            self.min_gain = self.min_gain.min(self.gain);

            *l = delayed_l * self.gain;
            *r = delayed_r * self.gain;
        }
    }

    fn reset(&mut self) {
        for buffer in &mut self.buffers {
            buffer.fill(0.0);
        }
        self.position = 0;
        self.peaks.clear();
        self.frame = 0;
        self.gain = 1.0;
        self.min_gain = 1.0;
    }

    fn latency_samples(&self) -> usize {
        self.buffers[0].len()
    }

    fn gain_reduction_db(&self) -> f32 {
        linear_to_db(self.min_gain).min(0.0)
    }

    fn name(&self) -> &str {
        "Lookahead Limiter"
    }
}
