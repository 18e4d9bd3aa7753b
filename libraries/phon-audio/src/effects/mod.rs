//! Real-time signal path stages
//!
//! Everything here runs on the audio thread. State is allocated at
//! construction and only mutated in place afterwards.
//!
//! Stages:
//! - **StreamingFir**: block FIR with carried-over `FilterState`
//! - **DelayLine**: dry-path group delay compensation
//! - **CrossfadeController**: per-sample mix ramp and equal-power law
//! - **GainCurve**: mix-position level compensation
//! - **AdaptiveGain**: peak-percentile trim
//! - **SoftClipper / MultibandLimiter / LookaheadLimiter**: output dynamics

mod adaptive;
mod chain;
mod compensation;
mod crossfade;
mod crossover;
mod delay;
mod fir;
mod lookahead;
mod multiband;
mod soft_knee;

pub use adaptive::AdaptiveGain;
pub use chain::{DynamicsChain, StereoEffect};
pub use compensation::{db_to_linear, linear_to_db, CurveShape, GainCurve, CURVE_POINTS};
pub use crossfade::{equal_power_gains, fade_samples, CrossfadeController};
pub use crossover::{Lr4Crossover, ThreeBandSplitter};
pub use delay::DelayLine;
pub use fir::{FilterState, StreamingFir};
pub use lookahead::LookaheadLimiter;
pub use multiband::MultibandLimiter;
pub use soft_knee::{SoftClipper, SoftKnee, OVERSHOOT_RANGE};
