//! End-to-end engine scenarios
//!
//! Tests include:
//! - Full-wet level at 1 kHz against the estimated correction
//! - Full-dry transparency
//! - Loop-back state reset through the playback session
//! - Control-thread target changes while the audio thread processes
//! - Dynamics ceiling on hot material

use phon_audio::test_utils::{
    generate_pink_noise, generate_sine, generate_white_noise, peak, rms_db,
};
use phon_audio::{
    AdaptiveSettings, CompensationMode, DynamicsMode, DynamicsSettings, EngineConfig,
    LoudnessEngine, PlaybackSession, StreamStatus,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

// ============================================================================
// CONSTANTS
// ============================================================================

const SAMPLE_RATE: u32 = 48000;
const BLOCK: usize = 512;

// ========== Helper Functions ==========

/// Route engine logs to the test harness (`RUST_LOG=phon_audio=debug`)
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn base_config() -> EngineConfig {
    EngineConfig {
        adaptive: AdaptiveSettings {
            enabled: false,
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Feed `left`/`right` through the engine in callback-sized blocks
fn render(engine: &mut LoudnessEngine, left: &[f32], right: &[f32]) -> (Vec<f32>, Vec<f32>) {
    let mut out_l = vec![0.0; left.len()];
    let mut out_r = vec![0.0; right.len()];
    let mut offset = 0;
    while offset < left.len() {
        let end = (offset + BLOCK).min(left.len());
        engine.process_block(
            &left[offset..end],
            &right[offset..end],
            &mut out_l[offset..end],
            &mut out_r[offset..end],
        );
        offset = end;
    }
    (out_l, out_r)
}

// ========== Reference Scenarios ==========

#[test]
fn test_full_wet_1khz_matches_correction() {
    init_tracing();
    let config = EngineConfig {
        initial_mix: 1.0,
        compensation: CompensationMode::Fixed {
            max_reduction_db: -3.0,
        },
        ..base_config()
    };
    let mut engine = LoudnessEngine::new(&config, SAMPLE_RATE).unwrap();
    let input = generate_sine(1000.0, SAMPLE_RATE, 1.0, 1.0);
    let (out_l, out_r) = render(&mut engine, &input, &input);

    let settle = engine.latency_samples() + engine.filter().len();
    let measured = rms_db(&out_l[settle..]) - rms_db(&input[..input.len() - settle]);
    let expected = engine.correction().db as f32;

    assert!(
        (measured - expected).abs() < 0.1,
        "measured {:.3} dB, expected {:.3} dB",
        measured,
        expected
    );
    assert_eq!(out_l, out_r);
}

#[test]
fn test_full_dry_is_transparent() {
    let config = EngineConfig {
        initial_mix: 0.0,
        ..base_config()
    };
    let mut engine = LoudnessEngine::new(&config, SAMPLE_RATE).unwrap();
    let left = generate_white_noise(10_000, 1, 0.5);
    let right = generate_white_noise(10_000, 2, 0.5);
    let (out_l, out_r) = render(&mut engine, &left, &right);

    let delay = engine.latency_samples();
    assert_eq!(&out_l[delay..], &left[..left.len() - delay]);
    assert_eq!(&out_r[delay..], &right[..right.len() - delay]);
}

#[test]
fn test_midpoint_curve_reduces_level() {
    let flat = EngineConfig {
        initial_mix: 0.5,
        compensation: CompensationMode::None,
        ..base_config()
    };
    let curved = EngineConfig {
        compensation: CompensationMode::Fixed {
            max_reduction_db: -3.0,
        },
        ..flat.clone()
    };
    let input = generate_pink_noise(24_000, 5, 0.5);

    let (a, _) = render(&mut LoudnessEngine::new(&flat, SAMPLE_RATE).unwrap(), &input, &input);
    let (b, _) = render(
        &mut LoudnessEngine::new(&curved, SAMPLE_RATE).unwrap(),
        &input,
        &input,
    );

    let difference = rms_db(&b[1000..]) - rms_db(&a[1000..]);
    assert!((difference + 3.0).abs() < 0.01, "difference {}", difference);
}

// ========== Loop-Back ==========

#[test]
fn test_loop_resets_filter_and_delay() {
    init_tracing();
    let config = EngineConfig {
        taps: 255,
        initial_mix: 0.5,
        dynamics: DynamicsSettings {
            mode: DynamicsMode::Multiband,
            lookahead: true,
            ..Default::default()
        },
        ..base_config()
    };

    // Three silent blocks, then a loud one right before the end
    let mut source = vec![0.0; BLOCK * 3];
    source.extend(generate_white_noise(BLOCK, 11, 0.8));

    let engine = LoudnessEngine::new(&config, SAMPLE_RATE).unwrap();
    let mut session = PlaybackSession::new(source.clone(), source.clone(), engine).unwrap();
    let mut l = vec![0.0; BLOCK];
    let mut r = vec![0.0; BLOCK];

    for _ in 0..4 {
        assert!(!session.process(&mut l, &mut r, StreamStatus::Ok).looped);
    }

    let report = session.process(&mut l, &mut r, StreamStatus::Ok);
    assert!(report.looped);
    assert!(l.iter().chain(r.iter()).all(|&x| x == 0.0));
    assert_eq!(session.loops(), 1);

    // Without the reset the loud tail would carry into the next block
    let mut continuous = LoudnessEngine::new(&config, SAMPLE_RATE).unwrap();
    let (tail, _) = render(&mut continuous, &source, &source);
    assert!(peak(&tail) > 0.0);
    let mut next_l = vec![0.0; BLOCK];
    let mut next_r = vec![0.0; BLOCK];
    continuous.process_block(&source[..BLOCK], &source[..BLOCK], &mut next_l, &mut next_r);
    assert!(peak(&next_l) > 0.0);
}

// ========== Cross-Thread Control ==========

#[test]
fn test_control_thread_sweeps_target() {
    let config = EngineConfig {
        fade_ms: 5.0,
        ..base_config()
    };
    let mut engine = LoudnessEngine::new(&config, SAMPLE_RATE).unwrap();
    let control = engine.control();
    let running = Arc::new(AtomicBool::new(true));

    let writer = {
        let control = Arc::clone(&control);
        let running = Arc::clone(&running);
        thread::spawn(move || {
            let mut i = 0_u32;
            while running.load(Ordering::Relaxed) {
                control.set_target((i % 11) as f32 / 10.0);
                i = i.wrapping_add(1);
                thread::yield_now();
            }
        })
    };

    let input = generate_sine(220.0, SAMPLE_RATE, 0.02, 0.5);
    let mut out_l = vec![0.0; input.len()];
    let mut out_r = vec![0.0; input.len()];
    for _ in 0..200 {
        engine.process_block(&input, &input, &mut out_l, &mut out_r);
        assert!(out_l.iter().all(|x| x.is_finite()));
        assert!((0.0..=1.0).contains(&engine.mix()));
    }

    running.store(false, Ordering::Relaxed);
    writer.join().unwrap();

    // Settles on the final target once the writer stops
    let target = control.target();
    for _ in 0..4 {
        engine.process_block(&input, &input, &mut out_l, &mut out_r);
    }
    assert_eq!(engine.mix(), target);
}

// ========== Dynamics ==========

#[test]
fn test_lookahead_keeps_hot_mix_near_ceiling() {
    let config = EngineConfig {
        initial_mix: 0.5,
        compensation: CompensationMode::None,
        dynamics: DynamicsSettings {
            mode: DynamicsMode::SoftClip,
            lookahead: true,
            ..Default::default()
        },
        ..base_config()
    };
    let mut engine = LoudnessEngine::new(&config, SAMPLE_RATE).unwrap();
    let input = generate_sine(1000.0, SAMPLE_RATE, 2.0, 1.0);
    let (out, _) = render(&mut engine, &input, &input);

    // Soft clip bounds the mix at 0.95 + 0.05; the look-ahead pulls it to the ceiling
    assert!(peak(&out) <= 1.0 + 1e-6);
    assert!(peak(&out[SAMPLE_RATE as usize..]) < 0.91);

    let diag = engine.control().diagnostics();
    assert!(diag.limiter_reduction_db < 0.0);
}

#[test]
fn test_adaptive_gain_backs_off_hot_material() {
    let config = EngineConfig {
        initial_mix: 0.5,
        compensation: CompensationMode::None,
        adaptive: AdaptiveSettings::default(),
        ..Default::default()
    };
    let mut engine = LoudnessEngine::new(&config, SAMPLE_RATE).unwrap();
    let input = generate_sine(1000.0, SAMPLE_RATE, 3.0, 1.0);
    render(&mut engine, &input, &input);

    let diag = engine.control().diagnostics();
    assert!(diag.adaptive_adjustment_db < -1.0);
    assert!(diag.effective_gain_db < -1.0);
}
