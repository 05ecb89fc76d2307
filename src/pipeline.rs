//! Coordination between the capture cadence and the draw cadence.
//!
//! All state shared by the two cadences lives in one record behind one lock.
//! Capture threads only copy into the write buffer; the draw cadence's tick
//! moves write to read and runs the window, transform and spectrum processor
//! while holding that same lock, so a paint that locks after a tick observes
//! exactly the bars and scale that tick committed.

pub mod session;

use crate::audio::buffers::{BufferRole, ChannelBuffers, SampleChannelBuffers};
use crate::audio::capture::{SampleSink, SessionConfig};
use crate::dsp::fft::{RealFftTransform, Transform};
use crate::dsp::frame::{FrameSnapshot, FrameView, SpectrumFrame};
use crate::dsp::gain::{GainEstimator, ScalingConfig};
use crate::dsp::spectrum::{BinSpectrum, Distribution, SpectrumProcessor};
use crate::dsp::window::{WindowFn, WindowKind};
use crate::error::ConfigError;
use crate::render::layout::DrawStyle;
use crate::util::audio::{DEFAULT_SAMPLE_RATE, DEFAULT_SAMPLE_SIZE};
use parking_lot::Mutex;
use rustfft::num_complex::Complex32;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const DEFAULT_QUIET_THRESHOLD: u32 = 25;
pub const DEFAULT_AUDIBILITY_THRESHOLD: f32 = 0.01;

/// Decides whether a processed tick is worth repainting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedrawPolicy {
    /// Consecutive inaudible ticks still repainted before going idle.
    pub quiet_threshold: u32,
    /// Peak magnitude above which a tick counts as audible.
    pub audibility_threshold: f32,
}

impl Default for RedrawPolicy {
    fn default() -> Self {
        Self {
            quiet_threshold: DEFAULT_QUIET_THRESHOLD,
            audibility_threshold: DEFAULT_AUDIBILITY_THRESHOLD,
        }
    }
}

impl RedrawPolicy {
    fn should_redraw(&self, peak: f32, quiet: &mut u32) -> bool {
        if peak > self.audibility_threshold {
            *quiet = 0;
            true
        } else if *quiet < self.quiet_threshold {
            *quiet += 1;
            true
        } else {
            false
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineConfig {
    pub sample_rate: f32,
    pub sample_size: usize,
    pub channels: usize,
    pub scaling: ScalingConfig,
    pub redraw: RedrawPolicy,
    /// Needed for the bar count: horizontal bars split the width by channel.
    pub style: DrawStyle,
    /// Bar width plus gap width.
    pub bin_width: f32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            sample_size: DEFAULT_SAMPLE_SIZE,
            channels: 2,
            scaling: ScalingConfig::default(),
            redraw: RedrawPolicy::default(),
            style: DrawStyle::default(),
            bin_width: 15.0,
        }
    }
}

impl PipelineConfig {
    pub fn session_config(&self, frame_rate: u32) -> SessionConfig {
        SessionConfig {
            sample_rate: self.sample_rate,
            sample_size: self.sample_size,
            channels: self.channels,
            frame_rate,
        }
    }
}

/// The injected collaborators a running pipeline drives once per tick.
pub struct PipelineComponents {
    pub processor: Box<dyn SpectrumProcessor>,
    pub transform: Box<dyn Transform>,
    pub window: WindowFn,
}

impl std::fmt::Debug for PipelineComponents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineComponents")
            .field("transform_size", &self.transform.size())
            .finish_non_exhaustive()
    }
}

impl PipelineComponents {
    /// `realfft` transform, [`BinSpectrum`] processor and a catalogue window.
    pub fn reference(
        config: &PipelineConfig,
        window: WindowKind,
        smoothing: f32,
        distribution: Distribution,
    ) -> Self {
        let mut processor =
            BinSpectrum::new(config.sample_rate, config.sample_size, config.channels);
        processor.set_smoothing(smoothing);
        processor.set_distribution(distribution);
        Self {
            processor: Box::new(processor),
            transform: Box::new(RealFftTransform::new(config.sample_size)),
            window: window.into_fn(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PipelineStats {
    pub deliveries: u64,
    /// Deliveries that arrived while stopped.
    pub ignored_deliveries: u64,
    /// Ticks that processed new samples.
    pub ticks: u64,
    /// Ticks that found nothing new.
    pub idle_ticks: u64,
    pub redraws: u64,
    pub suppressed: u64,
    pub bar_count: usize,
    pub scale: f32,
    pub peak: f32,
    pub gain_dumps: u64,
}

struct RunningState {
    buffers: SampleChannelBuffers,
    frame: SpectrumFrame,
    gain: GainEstimator,
    components: PipelineComponents,
    fft_out: Vec<Complex32>,
    peak: f32,
    quiet: u32,
    reprocess_needed: bool,
}

struct Shared {
    paused: bool,
    canvas_width: f32,
    running: Option<RunningState>,
    stats: PipelineStats,
}

pub struct PipelineCoordinator {
    config: PipelineConfig,
    shared: Mutex<Shared>,
}

impl std::fmt::Debug for PipelineCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineCoordinator")
            .field("config", &self.config)
            .field("running", &self.is_running())
            .finish()
    }
}

impl PipelineCoordinator {
    pub fn new(config: PipelineConfig) -> Result<Self, ConfigError> {
        if config.channels == 0 {
            return Err(ConfigError::NoChannels);
        }
        if config.sample_size == 0 {
            return Err(ConfigError::EmptySampleWindow);
        }
        if !(config.sample_rate.is_finite() && config.sample_rate > 0.0) {
            return Err(ConfigError::InvalidSampleRate(config.sample_rate));
        }
        GainEstimator::new(config.scaling, config.sample_rate, config.sample_size)?;

        Ok(Self {
            config,
            shared: Mutex::new(Shared {
                paused: false,
                canvas_width: 0.0,
                running: None,
                stats: PipelineStats::default(),
            }),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Allocates the per-session state and takes ownership of the components.
    ///
    /// # Panics
    ///
    /// Panics if the coordinator is already running.
    pub fn start(&self, components: PipelineComponents) -> Result<(), ConfigError> {
        let config = &self.config;
        let mut shared = self.shared.lock();
        assert!(
            shared.running.is_none(),
            "pipeline coordinator already started"
        );

        if components.transform.size() != config.sample_size {
            return Err(ConfigError::TransformSize {
                expected: config.sample_size,
                actual: components.transform.size(),
            });
        }

        let buffers = SampleChannelBuffers::allocate(config.channels, config.sample_size)?;
        let gain = GainEstimator::new(config.scaling, config.sample_rate, config.sample_size)?;
        let fft_out = vec![Complex32::default(); components.transform.output_len()];

        shared.running = Some(RunningState {
            buffers,
            frame: SpectrumFrame::new(config.channels, config.sample_size),
            gain,
            components,
            fft_out,
            peak: 0.0,
            quiet: 0,
            reprocess_needed: false,
        });
        shared.stats = PipelineStats::default();

        info!(
            "[pipeline] started: {} ch, {} samples @ {} Hz, style {}",
            config.channels, config.sample_size, config.sample_rate, config.style
        );
        Ok(())
    }

    /// Releases the per-session state. Returns whether anything was running.
    pub fn stop(&self) -> bool {
        let stopped = self.shared.lock().running.take().is_some();
        if stopped {
            info!("[pipeline] stopped");
        }
        stopped
    }

    pub fn is_running(&self) -> bool {
        self.shared.lock().running.is_some()
    }

    /// Silences all input while set.
    pub fn set_paused(&self, paused: bool) {
        self.shared.lock().paused = paused;
    }

    pub fn is_paused(&self) -> bool {
        self.shared.lock().paused
    }

    /// Records the paint surface width; the next tick recomputes the bar
    /// count if it changed.
    pub fn set_canvas_width(&self, width: f32) {
        self.shared.lock().canvas_width = width;
    }

    /// Capture-side entry point: copies one full window into the write
    /// buffer. Never allocates or performs I/O.
    pub fn on_samples_delivered(&self, samples: &ChannelBuffers) {
        let mut guard = self.shared.lock();
        let Shared {
            paused,
            running,
            stats,
            ..
        } = &mut *guard;

        let Some(state) = running.as_mut() else {
            stats.ignored_deliveries += 1;
            return;
        };

        if *paused {
            state.buffers.zero(BufferRole::Write);
        } else {
            state.buffers.write_mut().copy_from(samples);
        }
        state.reprocess_needed = true;
        stats.deliveries += 1;
    }

    /// Draw-side entry point. Processes the latest delivered window, if any,
    /// and reports whether the result should be painted.
    pub fn on_tick(&self) -> bool {
        let mut guard = self.shared.lock();
        let Shared {
            canvas_width,
            running,
            stats,
            ..
        } = &mut *guard;

        let Some(state) = running.as_mut() else {
            return false;
        };
        if !state.reprocess_needed {
            stats.idle_ticks += 1;
            return false;
        }

        state.buffers.copy(BufferRole::Write, BufferRole::Read);

        let config = &self.config;
        let columns = config.style.columns(config.channels);
        state.frame.resize(
            *canvas_width,
            config.bin_width,
            columns,
            state.components.processor.as_mut(),
        );

        let bar_count = state.frame.bar_count();
        let mut peak = 0.0f32;
        for channel in 0..config.channels {
            let samples = state.buffers.read_mut().channel_mut(channel);
            (state.components.window)(samples);
            state
                .components
                .transform
                .execute(samples, &mut state.fft_out);

            let bars = &mut state.frame.channel_mut(channel)[..bar_count];
            for (bin, bar) in bars.iter_mut().enumerate() {
                *bar = state
                    .components
                    .processor
                    .process_bin(channel, bin, &state.fft_out);
                if *bar > peak {
                    peak = *bar;
                }
            }
        }

        state.peak = peak;
        let scale = state.gain.update(peak);
        state.frame.set_scale(scale);
        state.reprocess_needed = false;

        let redraw = config.redraw.should_redraw(peak, &mut state.quiet);
        stats.ticks += 1;
        if redraw {
            stats.redraws += 1;
        } else {
            stats.suppressed += 1;
        }
        redraw
    }

    /// Runs `paint` over the committed frame while holding the lock. Returns
    /// `None` when stopped.
    pub fn with_frame<R>(&self, paint: impl FnOnce(FrameView<'_>) -> R) -> Option<R> {
        let shared = self.shared.lock();
        shared.running.as_ref().map(|state| paint(state.frame.view()))
    }

    pub fn snapshot(&self) -> Option<FrameSnapshot> {
        let shared = self.shared.lock();
        shared.running.as_ref().map(|state| state.frame.snapshot())
    }

    pub fn stats(&self) -> PipelineStats {
        let shared = self.shared.lock();
        let mut stats = shared.stats;
        if let Some(state) = shared.running.as_ref() {
            stats.bar_count = state.frame.bar_count();
            stats.scale = state.gain.scale();
            stats.peak = state.peak;
            stats.gain_dumps = state.gain.dumps();
        }
        stats
    }

    /// Returns whether a running processor received the new factor.
    pub fn set_smoothing(&self, factor: f32) -> bool {
        let mut shared = self.shared.lock();
        let Some(state) = shared.running.as_mut() else {
            return false;
        };
        state.components.processor.set_smoothing(factor);
        true
    }

    /// Swaps the bin distribution and forces a bar-count recomputation on
    /// the next tick.
    pub fn set_distribution(&self, distribution: Distribution) -> bool {
        let mut shared = self.shared.lock();
        let Some(state) = shared.running.as_mut() else {
            return false;
        };
        state.components.processor.set_distribution(distribution);
        state.frame.invalidate_width();
        debug!("[pipeline] distribution set to {distribution:?}");
        true
    }
}

impl SampleSink for PipelineCoordinator {
    fn on_samples_delivered(&self, samples: &ChannelBuffers) {
        PipelineCoordinator::on_samples_delivered(self, samples);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::layout::{Layout, LayoutParams, PathOp, layout};
    use std::f32::consts::TAU;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const SIZE: usize = 256;

    fn config(channels: usize) -> PipelineConfig {
        PipelineConfig {
            sample_rate: 48_000.0,
            sample_size: SIZE,
            channels,
            ..PipelineConfig::default()
        }
    }

    fn reference(config: &PipelineConfig) -> PipelineComponents {
        PipelineComponents::reference(config, WindowKind::Rectangular, 0.0, Distribution::Linear)
    }

    fn tone(channels: usize, amplitude: f32) -> ChannelBuffers {
        let mut buffers = ChannelBuffers::new(channels, SIZE).unwrap();
        for channel in buffers.iter_mut() {
            for (n, sample) in channel.iter_mut().enumerate() {
                *sample = amplitude * (TAU * 16.0 * n as f32 / SIZE as f32).sin();
            }
        }
        buffers
    }

    // Every bar reports the shared level.
    struct Level(Arc<Mutex<f32>>);

    impl SpectrumProcessor for Level {
        fn recalculate(&mut self, requested: usize) -> usize {
            requested
        }
        fn process_bin(&mut self, _: usize, _: usize, _: &[Complex32]) -> f32 {
            *self.0.lock()
        }
        fn set_smoothing(&mut self, _: f32) {}
        fn set_distribution(&mut self, _: Distribution) {}
    }

    fn level_components(level: &Arc<Mutex<f32>>) -> PipelineComponents {
        PipelineComponents {
            processor: Box::new(Level(Arc::clone(level))),
            transform: Box::new(RealFftTransform::new(SIZE)),
            window: WindowKind::Rectangular.into_fn(),
        }
    }

    #[test]
    fn rejects_invalid_configs() {
        let err = |config| PipelineCoordinator::new(config).unwrap_err();
        assert_eq!(err(config(0)), ConfigError::NoChannels);
        assert_eq!(
            err(PipelineConfig {
                sample_size: 0,
                ..config(1)
            }),
            ConfigError::EmptySampleWindow
        );
        assert!(matches!(
            err(PipelineConfig {
                sample_rate: f32::NAN,
                ..config(1)
            }),
            ConfigError::InvalidSampleRate(_)
        ));
        assert!(matches!(
            err(PipelineConfig {
                scaling: ScalingConfig {
                    fast_window: 10.0,
                    ..ScalingConfig::default()
                },
                ..config(1)
            }),
            ConfigError::GainWindowOrder { .. }
        ));
    }

    #[test]
    fn rejects_mismatched_transform() {
        let pipeline = PipelineCoordinator::new(config(1)).unwrap();
        let mut components = reference(&config(1));
        components.transform = Box::new(RealFftTransform::new(SIZE * 2));
        assert!(matches!(
            pipeline.start(components),
            Err(ConfigError::TransformSize { .. })
        ));
        assert!(!pipeline.is_running());
    }

    #[test]
    #[should_panic(expected = "already started")]
    fn double_start_panics() {
        let pipeline = PipelineCoordinator::new(config(1)).unwrap();
        pipeline.start(reference(&config(1))).unwrap();
        let _ = pipeline.start(reference(&config(1)));
    }

    #[test]
    fn restart_after_stop() {
        let pipeline = PipelineCoordinator::new(config(2)).unwrap();
        pipeline.start(reference(&config(2))).unwrap();
        assert!(pipeline.stop());
        assert!(!pipeline.stop());
        assert!(pipeline.snapshot().is_none());

        pipeline.on_samples_delivered(&tone(2, 0.5));
        assert_eq!(pipeline.stats().ignored_deliveries, 1);

        pipeline.start(reference(&config(2))).unwrap();
        assert!(pipeline.is_running());
        assert_eq!(pipeline.stats(), PipelineStats::default());
    }

    #[test]
    fn tick_without_delivery_is_idle() {
        let pipeline = PipelineCoordinator::new(config(1)).unwrap();
        assert!(!pipeline.on_tick());
        pipeline.start(reference(&config(1))).unwrap();
        assert!(!pipeline.on_tick());
        assert_eq!(pipeline.stats().idle_ticks, 1);
    }

    #[test]
    fn tone_lands_in_frame() {
        let pipeline = PipelineCoordinator::new(config(2)).unwrap();
        pipeline.set_canvas_width(300.0);
        pipeline.start(reference(&config(2))).unwrap();

        pipeline.on_samples_delivered(&tone(2, 0.5));
        assert!(pipeline.on_tick());

        let stats = pipeline.stats();
        assert_eq!(stats.bar_count, 20);
        assert!((stats.peak - 0.5).abs() < 0.01, "peak {}", stats.peak);
        assert!(stats.scale >= 1.0);

        let snapshot = pipeline.snapshot().unwrap();
        let view = snapshot.view();
        assert_eq!(view.channel(0).len(), 20);
        assert_eq!(view.channel(0), view.channel(1));
        assert_eq!(view.peak(), stats.peak);
    }

    #[test]
    fn paused_delivery_equals_silence() {
        let paused = PipelineCoordinator::new(config(2)).unwrap();
        let silent = PipelineCoordinator::new(config(2)).unwrap();
        for pipeline in [&paused, &silent] {
            pipeline.set_canvas_width(300.0);
            pipeline.start(reference(&config(2))).unwrap();
        }

        paused.set_paused(true);
        paused.on_samples_delivered(&tone(2, 0.8));
        silent.on_samples_delivered(&tone(2, 0.0));
        paused.on_tick();
        silent.on_tick();

        assert_eq!(paused.snapshot(), silent.snapshot());
        assert_eq!(paused.stats().peak, 0.0);
        assert_eq!(paused.stats().scale, 0.0);
    }

    #[test]
    fn paused_delivery_matches_silence_after_loud_history() {
        let smoothed = |config: &PipelineConfig| {
            PipelineComponents::reference(config, WindowKind::Hann, 0.6, Distribution::Linear)
        };
        let paused = PipelineCoordinator::new(config(2)).unwrap();
        let silent = PipelineCoordinator::new(config(2)).unwrap();
        for pipeline in [&paused, &silent] {
            pipeline.set_canvas_width(300.0);
            pipeline.start(smoothed(&config(2))).unwrap();
            pipeline.on_samples_delivered(&tone(2, 0.9));
            pipeline.on_tick();
        }
        assert_eq!(paused.snapshot(), silent.snapshot());

        paused.set_paused(true);
        paused.on_samples_delivered(&tone(2, 0.9));
        silent.on_samples_delivered(&tone(2, 0.0));
        assert_eq!(paused.on_tick(), silent.on_tick());

        let snapshot = paused.snapshot().unwrap();
        assert_eq!(Some(&snapshot), silent.snapshot().as_ref());
        // Smoothing carries the loud window over, so the frame is not blank.
        assert!(snapshot.view().peak() > 0.0);
        assert_eq!(paused.stats().peak, silent.stats().peak);
    }

    #[test]
    fn stereo_lines_fit_both_traces() {
        let config = PipelineConfig {
            style: DrawStyle::Lines,
            ..config(2)
        };
        let pipeline = PipelineCoordinator::new(config).unwrap();
        pipeline.set_canvas_width(150.0);
        pipeline.start(reference(&config)).unwrap();
        pipeline.on_samples_delivered(&tone(2, 0.5));
        pipeline.on_tick();

        let bars = pipeline.stats().bar_count;
        assert_eq!(bars, 5);

        let params = LayoutParams {
            style: DrawStyle::Lines,
            width: 150.0,
            height: 80.0,
            bar_width: 10.0,
            gap_width: 5.0,
            clamp: 1.0,
        };
        let Some(Layout::Path(ops)) = pipeline.with_frame(|frame| layout(&params, frame)) else {
            panic!("expected a path");
        };
        assert_eq!(ops.len(), 2 * bars);

        let points: Vec<_> = ops
            .iter()
            .map(|op| match *op {
                PathOp::MoveTo(p) | PathOp::LineTo(p) => p,
                PathOp::QuadTo { control, .. } => control,
            })
            .collect();
        assert!(points.windows(2).all(|w| w[1].x > w[0].x));
        // Both channels carry the same tone, so the second trace mirrors the first.
        for i in 0..bars {
            assert_eq!(points[bars + i].y, points[bars - 1 - i].y, "bin {i}");
        }
    }

    #[test]
    fn quiet_ticks_eventually_stop_redrawing() {
        let level = Arc::new(Mutex::new(0.0f32));
        let pipeline = PipelineCoordinator::new(config(1)).unwrap();
        pipeline.set_canvas_width(150.0);
        pipeline.start(level_components(&level)).unwrap();

        let samples = tone(1, 0.0);
        let tick = |value: f32| {
            *level.lock() = value;
            pipeline.on_samples_delivered(&samples);
            pipeline.on_tick()
        };

        for n in 0..DEFAULT_QUIET_THRESHOLD {
            assert!(tick(0.0), "quiet tick {n} should still redraw");
        }
        assert!(!tick(0.0));
        assert!(!tick(0.005));
        assert!(tick(0.5));
        assert!(tick(0.0));

        let stats = pipeline.stats();
        assert_eq!(stats.suppressed, 2);
        assert_eq!(stats.redraws, u64::from(DEFAULT_QUIET_THRESHOLD) + 2);
    }

    #[test]
    fn width_changes_recompute_bar_count() {
        let pipeline = PipelineCoordinator::new(config(2)).unwrap();
        pipeline.start(reference(&config(2))).unwrap();
        let samples = tone(2, 0.5);

        for (width, expected) in [(300.0, 20), (150.0, 10), (0.0, 0), (30_000.0, 128)] {
            pipeline.set_canvas_width(width);
            pipeline.on_samples_delivered(&samples);
            pipeline.on_tick();
            assert_eq!(pipeline.stats().bar_count, expected, "width {width}");
        }

        let horizontal = PipelineConfig {
            style: DrawStyle::HorizontalBars,
            ..config(2)
        };
        let pipeline = PipelineCoordinator::new(horizontal).unwrap();
        pipeline.set_canvas_width(300.0);
        pipeline.start(reference(&horizontal)).unwrap();
        pipeline.on_samples_delivered(&samples);
        pipeline.on_tick();
        assert_eq!(pipeline.stats().bar_count, 10);
    }

    // Returns a bar count derived from the request and panics on any access
    // at or past it.
    struct Boundary {
        pick: fn(usize) -> usize,
        actual: Arc<AtomicUsize>,
    }

    impl SpectrumProcessor for Boundary {
        fn recalculate(&mut self, requested: usize) -> usize {
            let actual = (self.pick)(requested);
            self.actual.store(actual, Ordering::SeqCst);
            actual
        }
        fn process_bin(&mut self, _: usize, bin: usize, _: &[Complex32]) -> f32 {
            assert!(bin < self.actual.load(Ordering::SeqCst), "bin {bin} past bar count");
            0.25
        }
        fn set_smoothing(&mut self, _: f32) {}
        fn set_distribution(&mut self, _: Distribution) {}
    }

    #[test]
    fn honours_processor_bar_count() {
        let picks: [fn(usize) -> usize; 4] = [|_| 0, |_| 1, |r| r, |r| r + 1];
        for style in DrawStyle::ALL {
            for pick in picks {
                let config = PipelineConfig {
                    style,
                    ..config(2)
                };
                let actual = Arc::new(AtomicUsize::new(0));
                let pipeline = PipelineCoordinator::new(config).unwrap();
                pipeline.set_canvas_width(150.0);
                pipeline
                    .start(PipelineComponents {
                        processor: Box::new(Boundary {
                            pick,
                            actual: Arc::clone(&actual),
                        }),
                        transform: Box::new(RealFftTransform::new(SIZE)),
                        window: WindowKind::Hann.into_fn(),
                    })
                    .unwrap();

                pipeline.on_samples_delivered(&tone(2, 0.5));
                pipeline.on_tick();
                let bars = actual.load(Ordering::SeqCst);
                assert_eq!(pipeline.stats().bar_count, bars);

                let params = LayoutParams {
                    style,
                    width: 150.0,
                    height: 80.0,
                    bar_width: 10.0,
                    gap_width: 5.0,
                    clamp: 1.0,
                };
                let drawn = pipeline
                    .with_frame(|frame| {
                        assert_eq!(frame.bar_count(), bars);
                        layout(&params, frame).len()
                    })
                    .unwrap();
                assert!(drawn <= bars * 2);
            }
        }
    }

    #[test]
    fn distribution_change_forces_recalculation() {
        struct Counting(Arc<AtomicUsize>);
        impl SpectrumProcessor for Counting {
            fn recalculate(&mut self, requested: usize) -> usize {
                self.0.fetch_add(1, Ordering::SeqCst);
                requested
            }
            fn process_bin(&mut self, _: usize, _: usize, _: &[Complex32]) -> f32 {
                0.0
            }
            fn set_smoothing(&mut self, _: f32) {}
            fn set_distribution(&mut self, _: Distribution) {}
        }

        let calls = Arc::new(AtomicUsize::new(0));
        let pipeline = PipelineCoordinator::new(config(1)).unwrap();
        assert!(!pipeline.set_distribution(Distribution::Linear));
        pipeline.set_canvas_width(150.0);
        pipeline
            .start(PipelineComponents {
                processor: Box::new(Counting(Arc::clone(&calls))),
                transform: Box::new(RealFftTransform::new(SIZE)),
                window: WindowKind::Hann.into_fn(),
            })
            .unwrap();

        let samples = tone(1, 0.5);
        for _ in 0..3 {
            pipeline.on_samples_delivered(&samples);
            pipeline.on_tick();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert!(pipeline.set_distribution(Distribution::Equalized));
        assert!(pipeline.set_smoothing(0.5));
        pipeline.on_samples_delivered(&samples);
        pipeline.on_tick();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
