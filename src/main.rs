use anyhow::Context;
use async_channel::TryRecvError;
use spectrabar::audio::synthetic::SyntheticBackend;
use spectrabar::render::canvas::{AsciiCanvas, Painter};
use spectrabar::render::layout::layout;
use spectrabar::util::audio::frame_interval;
use spectrabar::util::telemetry;
use spectrabar::{PipelineCoordinator, Session, Settings, settings};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::info;

const RUN_FOR: Duration = Duration::from_secs(5);
const SURFACE: (f32, f32) = (600.0, 160.0);
const GRID: (usize, usize) = (100, 20);

fn main() -> anyhow::Result<()> {
    telemetry::init();

    let path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(settings::config_path);
    let settings = Settings::load_or_default(&path);
    info!("[main] settings from {path:?}: {:?}", settings.appearance.style);

    let painter = Painter::new(settings.draw_options());
    let (width, height) = painter.surface_size(SURFACE.0, SURFACE.1);
    let params = settings.layout_params(width, height);

    let pipeline = Arc::new(
        PipelineCoordinator::new(settings.pipeline_config()).context("invalid settings")?,
    );
    pipeline.set_canvas_width(width);

    // Two seconds of tone, one of silence, so quiet suppression shows in the stats.
    let windows_per_second =
        (settings.visualizer.sample_rate / settings.pipeline_config().sample_size as f32) as u64;
    let backend = SyntheticBackend::default().with_gate(windows_per_second * 2, windows_per_second);

    let mut session = Session::start(
        settings.session_config(),
        Arc::clone(&pipeline),
        &backend,
        settings.components(),
    )?;
    let redraws = session.redraws();

    let mut canvas = AsciiCanvas::new(GRID.0, GRID.1, width, height);
    let poll = frame_interval(settings.visualizer.frame_rate) / 2;
    let started = Instant::now();
    let mut last_report = started;
    let mut painted = 0u64;

    while started.elapsed() < RUN_FOR {
        match redraws.try_recv() {
            Ok(()) => {
                canvas.clear();
                pipeline.with_frame(|frame| painter.paint(&layout(&params, frame), &mut canvas));
                painted += 1;
            }
            Err(TryRecvError::Empty) => thread::sleep(poll),
            Err(TryRecvError::Closed) => break,
        }

        if last_report.elapsed() >= Duration::from_secs(1) {
            let stats = pipeline.stats();
            info!(
                "[main] painted {painted}, ticks {}, suppressed {}, bars {}, scale {:.3}, peak {:.3}, resets {}",
                stats.ticks,
                stats.suppressed,
                stats.bar_count,
                stats.scale,
                stats.peak,
                stats.gain_dumps
            );
            last_report = Instant::now();
        }
    }

    session.stop()?;
    print!("{}", canvas.render());
    Ok(())
}
