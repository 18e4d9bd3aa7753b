//! Deterministic test signals and level helpers
//!
//! Shared by unit tests, integration tests and benchmarks. Enabled with the
//! `test-utils` feature.

mod signals;

pub use signals::{
    generate_impulse, generate_pink_noise, generate_sine, generate_white_noise, peak, rms, rms_db,
};
