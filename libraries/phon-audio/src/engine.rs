//! Loudness-compensated crossfade engine
//!
//! Per block, for each of the two channels:
//!
//! ```text
//! input ──► StreamingFir ──► × correction ──► wet ─┐
//!   │                                              ├─► equal-power mix ──► × block gain ──► dynamics ──► output
//!   └─────► DelayLine ───────────────────────► dry ┘          ▲
//!                                                  CrossfadeController
//! ```
//!
//! Setup (filter design, correction estimate, optional content analysis) is
//! fallible and allocates. Block processing is neither.

use crate::analysis::{ContentAnalysis, ContentAnalyzer};
use crate::config::{validate_sample_rate, CompensationMode, DynamicsMode, EngineConfig};
use crate::control::EngineControl;
use crate::effects::{
    equal_power_gains, linear_to_db, AdaptiveGain, CrossfadeController, CurveShape, DelayLine,
    DynamicsChain, FilterState, GainCurve, LookaheadLimiter, MultibandLimiter, SoftClipper,
    StreamingFir,
};
use crate::error::{EngineError, Result};
use phon_loudness::{CorrectionGain, FilterCache, FirFilter, LevelCorrectionEstimator};
use std::sync::Arc;
use tracing::info;

/// Samples of the latency-measurement click
pub const CLICK_SAMPLES: usize = 10;

/// Amplitude of the latency-measurement click
pub const CLICK_AMPLITUDE: f32 = 0.5;

pub struct LoudnessEngine {
    sample_rate: u32,
    block_size: usize,
    filter: Arc<FirFilter>,
    correction: CorrectionGain,
    correction_linear: f32,
    analysis: Option<ContentAnalysis>,

    fir: StreamingFir,
    states: [FilterState; 2],
    delays: [DelayLine; 2],
    crossfade: CrossfadeController,
    curve: GainCurve,
    adaptive: AdaptiveGain,
    dynamics: DynamicsChain,
    control: Arc<EngineControl>,

    dry: [Vec<f32>; 2],
    wet: [Vec<f32>; 2],
    ramp: Vec<f32>,
}

impl LoudnessEngine {
    /// Build an engine without source audio
    ///
    /// Fails for `analyzed` compensation, which needs the source; use
    /// [`LoudnessEngine::for_source`] instead.
    pub fn new(config: &EngineConfig, sample_rate: u32) -> Result<Self> {
        let filter = Self::design(config, sample_rate, None)?;
        Self::assemble(config, sample_rate, filter, None)
    }

    /// Build an engine for a stereo source, analysing it if configured to
    pub fn for_source(
        config: &EngineConfig,
        sample_rate: u32,
        left: &[f32],
        right: &[f32],
    ) -> Result<Self> {
        let filter = Self::design(config, sample_rate, None)?;
        Self::assemble(config, sample_rate, filter, Some((left, right)))
    }

    /// Build an engine reusing designs from `cache`
    pub fn with_cache(
        config: &EngineConfig,
        sample_rate: u32,
        cache: &mut FilterCache,
        source: Option<(&[f32], &[f32])>,
    ) -> Result<Self> {
        let filter = Self::design(config, sample_rate, Some(cache))?;
        Self::assemble(config, sample_rate, filter, source)
    }

    fn design(
        config: &EngineConfig,
        sample_rate: u32,
        cache: Option<&mut FilterCache>,
    ) -> Result<Arc<FirFilter>> {
        config.validate()?;
        validate_sample_rate(sample_rate)?;
        if let Some(expected) = config.sample_rate {
            if expected != sample_rate {
                return Err(EngineError::configuration(format!(
                    "source sample rate {} Hz does not match configured {} Hz",
                    sample_rate, expected
                )));
            }
        }

        let filter = match cache {
            Some(cache) => cache.get_or_design(
                config.target_phon,
                config.reference_phon,
                config.taps,
                sample_rate,
            )?,
            None => Arc::new(FirFilter::design(
                config.target_phon,
                config.reference_phon,
                config.taps,
                sample_rate,
            )?),
        };
        Ok(filter)
    }

    fn assemble(
        config: &EngineConfig,
        sample_rate: u32,
        filter: Arc<FirFilter>,
        source: Option<(&[f32], &[f32])>,
    ) -> Result<Self> {
        let correction = LevelCorrectionEstimator::new(sample_rate)?.estimate(&filter)?;
        let correction_linear = correction.linear as f32;

        if let Some((left, right)) = source {
            if left.len() != right.len() {
                return Err(EngineError::configuration(format!(
                    "channel lengths differ: {} vs {}",
                    left.len(),
                    right.len()
                )));
            }
        }

        let (shape, analysis) = match config.compensation {
            CompensationMode::None => (CurveShape::Flat, None),
            CompensationMode::Fixed { max_reduction_db } => (
                CurveShape::Parabolic {
                    depth_db: max_reduction_db,
                },
                None,
            ),
            CompensationMode::Analyzed {
                analysis_secs,
                headroom,
                safety_margin_db,
            } => {
                let (left, right) = source.ok_or_else(|| {
                    EngineError::configuration("analyzed compensation requires source audio")
                })?;
                let analysis =
                    ContentAnalyzer::new(&filter, correction_linear, headroom, safety_margin_db)
                        .analyze(left, right, analysis_secs)?;
                (analysis.curve_shape(), Some(analysis))
            }
        };

        let block_size = config.block_size;
        let fir = StreamingFir::new(&filter, block_size);
        let states = [fir.new_state(), fir.new_state()];
        let delays = [
            DelayLine::for_taps(filter.len()),
            DelayLine::for_taps(filter.len()),
        ];

        let engine = Self {
            sample_rate,
            block_size,
            correction,
            correction_linear,
            analysis,
            fir,
            states,
            delays,
            crossfade: CrossfadeController::with_duration(
                config.initial_mix,
                config.fade_ms,
                sample_rate,
            ),
            curve: GainCurve::new(shape),
            adaptive: AdaptiveGain::new(config.adaptive),
            dynamics: Self::build_dynamics(config, sample_rate)?,
            control: EngineControl::new(config.initial_mix),
            dry: [vec![0.0; block_size], vec![0.0; block_size]],
            wet: [vec![0.0; block_size], vec![0.0; block_size]],
            ramp: vec![0.0; block_size],
            filter,
        };

        info!(
            "Engine ready: {} -> {} phon, {} taps @ {} Hz, correction {:.2} dB, curve {:?}, latency {} samples",
            config.target_phon,
            config.reference_phon,
            engine.filter.len(),
            sample_rate,
            engine.correction.db,
            shape,
            engine.latency_samples()
        );

        Ok(engine)
    }

    fn build_dynamics(config: &EngineConfig, sample_rate: u32) -> Result<DynamicsChain> {
        let settings = &config.dynamics;
        let nyquist = sample_rate as f32 / 2.0;
        let mut chain = DynamicsChain::new();

        match settings.mode {
            DynamicsMode::Off => {}
            DynamicsMode::SoftClip => {
                chain.add_effect(Box::new(SoftClipper::new(
                    settings.full_band_threshold,
                    settings.knee_width,
                )));
            }
            DynamicsMode::Multiband => {
                if settings.high_crossover_hz >= nyquist {
                    return Err(EngineError::configuration(format!(
                        "crossover {} Hz is not below Nyquist ({} Hz)",
                        settings.high_crossover_hz, nyquist
                    )));
                }
                chain.add_effect(Box::new(MultibandLimiter::new(settings, sample_rate)));
            }
        }

        if settings.lookahead {
            chain.add_effect(Box::new(LookaheadLimiter::new(settings, sample_rate)));
        }

        Ok(chain)
    }

    /// Process one block of two-channel audio
    ///
    /// Frames processed is the shortest of the four slices. Blocks longer
    /// than the configured block size are processed in block-size chunks.
    pub fn process_block(
        &mut self,
        in_left: &[f32],
        in_right: &[f32],
        out_left: &mut [f32],
        out_right: &mut [f32],
    ) -> usize {
        let frames = in_left
            .len()
            .min(in_right.len())
            .min(out_left.len())
            .min(out_right.len());

        self.crossfade.set_target(self.control.target());
        let mut click = self.control.take_click();

        let mut offset = 0;
        while offset < frames {
            let n = (frames - offset).min(self.block_size);
            let end = offset + n;
            self.process_chunk(
                [&in_left[offset..end], &in_right[offset..end]],
                [&mut out_left[offset..end], &mut out_right[offset..end]],
                click,
            );
            click = false;
            offset = end;
        }

        frames
    }

    fn process_chunk(&mut self, input: [&[f32]; 2], mut output: [&mut [f32]; 2], click: bool) {
        let n = input[0].len();

        for ch in 0..2 {
            let dry = &mut self.dry[ch][..n];
            let wet = &mut self.wet[ch][..n];
            dry.copy_from_slice(input[ch]);
            if click {
                for s in dry.iter_mut().take(CLICK_SAMPLES) {
                    *s += CLICK_AMPLITUDE;
                }
            }

            self.fir.process(&mut self.states[ch], dry, wet);
            for s in wet.iter_mut() {
                *s *= self.correction_linear;
            }
            self.delays[ch].process(dry);
        }

        self.crossfade.fill_ramp(&mut self.ramp[..n]);

        // Adaptive gain tracks the mix before any gain is applied
        let mut peak = 0.0_f32;
        for (ch, out) in output.iter_mut().enumerate() {
            for (i, sample) in out.iter_mut().enumerate() {
                let (g_dry, g_wet) = equal_power_gains(self.ramp[i]);
                let mixed = self.dry[ch][i] * g_dry + self.wet[ch][i] * g_wet;
                peak = peak.max(mixed.abs());
                *sample = mixed;
            }
        }
        self.adaptive.update(peak);

        let gain = self.curve.block_gain(&self.ramp[..n]) * self.adaptive.factor();
        for out in output.iter_mut() {
            for sample in out.iter_mut() {
                *sample *= gain;
            }
        }

        let [left, right] = output;
        self.dynamics.process(left, right);

        self.control.publish(
            self.crossfade.current(),
            linear_to_db(gain),
            self.adaptive.adjustment_db(),
            self.dynamics.gain_reduction_db(),
        );
    }

    /// Clear every stream-dependent state (loop-back or seek)
    ///
    /// The crossfade position is kept so a loop does not jump the mix.
    pub fn reset(&mut self) {
        for state in &mut self.states {
            state.reset();
        }
        for delay in &mut self.delays {
            delay.reset();
        }
        self.adaptive.reset();
        self.dynamics.reset();
    }

    /// True when no filter or delay state is carried over
    pub fn is_clear(&self) -> bool {
        self.states.iter().all(FilterState::is_clear) && self.delays.iter().all(DelayLine::is_clear)
    }

    /// Handle for the control thread
    pub fn control(&self) -> Arc<EngineControl> {
        Arc::clone(&self.control)
    }

    /// Total delay from input to output in samples
    pub fn latency_samples(&self) -> usize {
        self.filter.group_delay() + self.dynamics.latency_samples()
    }

    pub fn latency_ms(&self) -> f32 {
        self.latency_samples() as f32 * 1000.0 / self.sample_rate as f32
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn filter(&self) -> &FirFilter {
        &self.filter
    }

    pub fn correction(&self) -> &CorrectionGain {
        &self.correction
    }

    /// Content analysis, when the curve was sized from the source
    pub fn analysis(&self) -> Option<&ContentAnalysis> {
        self.analysis.as_ref()
    }

    pub fn curve(&self) -> &GainCurve {
        &self.curve
    }

    /// Current ramp position
    pub fn mix(&self) -> f32 {
        self.crossfade.current()
    }

    /// Names of the active dynamics stages
    pub fn dynamics_stages(&self) -> Vec<&str> {
        self.dynamics.names()
    }
}
