//! Cross-thread control of a running engine
//!
//! The control thread writes the crossfade target and the click request; the
//! audio thread reads them once per block. The target is a single atomic
//! word, so a read always sees a complete value. The audio thread publishes
//! display values back through relaxed atomics; those may be a block stale.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

/// Shared state between the control thread and the audio thread
#[derive(Debug)]
pub struct EngineControl {
    target_bits: AtomicU32,
    click_requested: AtomicBool,
    mix_bits: AtomicU32,
    gain_db_bits: AtomicU32,
    adaptive_db_bits: AtomicU32,
    limiter_db_bits: AtomicU32,
    stream_errors: AtomicU64,
}

/// Snapshot of the values the audio thread publishes
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Diagnostics {
    /// Crossfade target as last set
    pub target: f32,
    /// Ramp position at the end of the last block
    pub mix: f32,
    /// Curve gain times adaptive factor (dB)
    pub effective_gain_db: f32,
    /// Adaptive adjustment (dB)
    pub adaptive_adjustment_db: f32,
    /// Dynamics chain reduction in the last block (dB)
    pub limiter_reduction_db: f32,
    /// Overruns and underruns reported so far
    pub stream_errors: u64,
}

impl EngineControl {
    /// Create a handle with the given starting target
    pub fn new(initial_target: f32) -> Arc<Self> {
        let target = sanitize(initial_target);
        Arc::new(Self {
            target_bits: AtomicU32::new(target.to_bits()),
            click_requested: AtomicBool::new(false),
            mix_bits: AtomicU32::new(target.to_bits()),
            gain_db_bits: AtomicU32::new(0.0_f32.to_bits()),
            adaptive_db_bits: AtomicU32::new(0.0_f32.to_bits()),
            limiter_db_bits: AtomicU32::new(0.0_f32.to_bits()),
            stream_errors: AtomicU64::new(0),
        })
    }

    /// Set the crossfade target (clamped to [0, 1]; NaN is treated as 0)
    pub fn set_target(&self, ratio: f32) {
        self.target_bits
            .store(sanitize(ratio).to_bits(), Ordering::Release);
    }

    pub fn target(&self) -> f32 {
        f32::from_bits(self.target_bits.load(Ordering::Acquire))
    }

    /// Toggle between fully dry and fully wet
    pub fn toggle(&self) -> f32 {
        let next = if self.target() >= 0.5 { 0.0 } else { 1.0 };
        self.set_target(next);
        next
    }

    /// Inject a latency-measurement click at the start of the next block
    pub fn request_click(&self) {
        self.click_requested.store(true, Ordering::Release);
    }

    pub fn click_pending(&self) -> bool {
        self.click_requested.load(Ordering::Acquire)
    }

    /// Consume a pending click request (audio thread)
    pub(crate) fn take_click(&self) -> bool {
        self.click_requested.swap(false, Ordering::AcqRel)
    }

    pub(crate) fn publish(
        &self,
        mix: f32,
        effective_gain_db: f32,
        adaptive_db: f32,
        limiter_db: f32,
    ) {
        self.mix_bits.store(mix.to_bits(), Ordering::Relaxed);
        self.gain_db_bits
            .store(effective_gain_db.to_bits(), Ordering::Relaxed);
        self.adaptive_db_bits
            .store(adaptive_db.to_bits(), Ordering::Relaxed);
        self.limiter_db_bits
            .store(limiter_db.to_bits(), Ordering::Relaxed);
    }

    pub(crate) fn record_stream_error(&self) -> u64 {
        self.stream_errors.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Read the published values
    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics {
            target: self.target(),
            mix: f32::from_bits(self.mix_bits.load(Ordering::Relaxed)),
            effective_gain_db: f32::from_bits(self.gain_db_bits.load(Ordering::Relaxed)),
            adaptive_adjustment_db: f32::from_bits(self.adaptive_db_bits.load(Ordering::Relaxed)),
            limiter_reduction_db: f32::from_bits(self.limiter_db_bits.load(Ordering::Relaxed)),
            stream_errors: self.stream_errors.load(Ordering::Relaxed),
        }
    }
}

fn sanitize(ratio: f32) -> f32 {
    if ratio.is_nan() {
        0.0
    } else {
        ratio.clamp(0.0, 1.0)
    }
}
