//! Looping playback over an in-memory stereo source
//!
//! The session owns the source, the read position and the engine. When the
//! next block would run past the end it wraps to the start and clears the
//! engine's stream state before reading, so the filter tail of the previous
//! pass never bleeds into the new one.

use crate::engine::LoudnessEngine;
use crate::error::{EngineError, Result};
use tracing::{debug, info, warn};

/// Device status reported alongside a callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamStatus {
    #[default]
    Ok,
    /// The device ran out of samples before this callback
    Underflow,
    /// Input samples were dropped before this callback
    Overflow,
}

impl StreamStatus {
    pub fn is_error(self) -> bool {
        self != Self::Ok
    }
}

/// Outcome of one session block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockReport {
    pub frames: usize,
    /// The position wrapped to the start before this block
    pub looped: bool,
    /// Status passed in by the caller, surfaced unchanged
    pub status: StreamStatus,
}

pub struct PlaybackSession {
    left: Vec<f32>,
    right: Vec<f32>,
    position: usize,
    loops: u64,
    engine: LoudnessEngine,
}

impl PlaybackSession {
    /// Take ownership of a stereo source and an engine for it
    pub fn new(left: Vec<f32>, right: Vec<f32>, engine: LoudnessEngine) -> Result<Self> {
        if left.len() != right.len() {
            return Err(EngineError::configuration(format!(
                "channel lengths differ: {} vs {}",
                left.len(),
                right.len()
            )));
        }
        if left.is_empty() {
            return Err(EngineError::configuration("source is empty"));
        }

        info!(
            "Playback session: {} frames ({:.1} s) at {} Hz",
            left.len(),
            left.len() as f32 / engine.sample_rate() as f32,
            engine.sample_rate()
        );

        Ok(Self {
            left,
            right,
            position: 0,
            loops: 0,
            engine,
        })
    }

    /// Render the next block into the output channels
    ///
    /// The block length is the shorter output slice, capped at the source
    /// length. Output samples past the rendered frames are zeroed.
    pub fn process(
        &mut self,
        out_left: &mut [f32],
        out_right: &mut [f32],
        status: StreamStatus,
    ) -> BlockReport {
        if status.is_error() {
            let count = self.engine.control().record_stream_error();
            warn!("Audio stream status {:?} (total {})", status, count);
        }

        let total = self.left.len();
        let frames = out_left.len().min(out_right.len()).min(total);

        let looped = self.position + frames > total;
        if looped {
            self.position = 0;
            self.loops += 1;
            self.engine.reset();
            debug!("Looping to start (loop {}); stream state reset", self.loops);
        }

        let start = self.position;
        let end = start + frames;
        self.engine.process_block(
            &self.left[start..end],
            &self.right[start..end],
            &mut out_left[..frames],
            &mut out_right[..frames],
        );
        self.position = end;
        out_left[frames..].fill(0.0);
        out_right[frames..].fill(0.0);

        BlockReport {
            frames,
            looped,
            status,
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn total_frames(&self) -> usize {
        self.left.len()
    }

    /// Completed loop-backs
    pub fn loops(&self) -> u64 {
        self.loops
    }

    /// Jump to a frame (clamped), resetting stream state
    pub fn seek(&mut self, frame: usize) {
        self.position = frame.min(self.left.len());
        self.engine.reset();
    }

    pub fn engine(&self) -> &LoudnessEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut LoudnessEngine {
        &mut self.engine
    }
}
