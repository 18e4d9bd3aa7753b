/// Peak-percentile adaptive gain
///
/// Keeps a rolling history of per-block peaks. Each block the chosen
/// percentile of that history is compared with two thresholds: above the hot
/// threshold the adjustment is lowered by one step, below the safe threshold
/// it recovers by one step toward 0 dB.
use super::compensation::db_to_linear;
use crate::config::AdaptiveSettings;

pub struct AdaptiveGain {
    settings: AdaptiveSettings,
    history: Vec<f32>,
    sorted: Vec<f32>,
    write_pos: usize,
    adjustment_db: f32,
}

impl AdaptiveGain {
    pub fn new(settings: AdaptiveSettings) -> Self {
        let len = settings.history_blocks.max(1);
        Self {
            settings,
            history: vec![0.0; len],
            sorted: vec![0.0; len],
            write_pos: 0,
            adjustment_db: 0.0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.settings.enabled
    }

    /// Record a block peak and update the adjustment
    pub fn update(&mut self, block_peak: f32) {
        if !self.settings.enabled {
            return;
        }

        self.history[self.write_pos] = if block_peak.is_finite() {
            block_peak.abs()
        } else {
            0.0
        };
        self.write_pos = (self.write_pos + 1) % self.history.len();

        let level = self.percentile();
        if level > self.settings.hot_threshold {
            self.adjustment_db =
                (self.adjustment_db - self.settings.step_db).max(self.settings.min_adjustment_db);
        } else if level < self.settings.safe_threshold {
            self.adjustment_db = (self.adjustment_db + self.settings.step_db).min(0.0);
        }
    }

    /// Percentile of the peak history, linearly interpolated between ranks
    pub fn percentile(&mut self) -> f32 {
        self.sorted.copy_from_slice(&self.history);
        self.sorted.sort_unstable_by(f32::total_cmp);

        let rank = self.settings.percentile.clamp(0.0, 1.0) * (self.sorted.len() - 1) as f32;
        let lower = rank.floor() as usize;
        let upper = (lower + 1).min(self.sorted.len() - 1);
        let frac = rank - lower as f32;
        self.sorted[lower] + (self.sorted[upper] - self.sorted[lower]) * frac
    }

    /// Current adjustment in dB (≤ 0)
    pub fn adjustment_db(&self) -> f32 {
        self.adjustment_db
    }

    /// Current adjustment as a linear factor
    pub fn factor(&self) -> f32 {
        db_to_linear(self.adjustment_db)
    }

    pub fn reset(&mut self) {
        self.history.fill(0.0);
        self.write_pos = 0;
        self.adjustment_db = 0.0;
    }
}
