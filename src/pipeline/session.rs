//! Threads driving a coordinator: capture on one, the draw tick on another.

use super::{PipelineComponents, PipelineCoordinator};
use crate::audio::buffers::ChannelBuffers;
use crate::audio::capture::{CaptureBackend, SessionConfig, StopToken};
use crate::util::audio::frame_interval;
use anyhow::{Context, anyhow, ensure};
use async_channel::{Receiver, Sender, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::{debug, error, info, warn};

pub struct Session {
    pipeline: Arc<PipelineCoordinator>,
    stop: StopToken,
    redraw_tx: Sender<()>,
    redraws: Receiver<()>,
    capture: Option<JoinHandle<anyhow::Result<()>>>,
    ticker: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Starts `pipeline` with `components`, then the capture backend and the
    /// tick cadence. On failure nothing is left running.
    pub fn start(
        config: SessionConfig,
        pipeline: Arc<PipelineCoordinator>,
        backend: &dyn CaptureBackend,
        components: PipelineComponents,
    ) -> anyhow::Result<Self> {
        let shape = pipeline.config();
        ensure!(
            shape.channels == config.channels && shape.sample_size == config.sample_size,
            "session shape {}x{} does not match pipeline shape {}x{}",
            config.channels,
            config.sample_size,
            shape.channels,
            shape.sample_size
        );

        pipeline.start(components).context("starting pipeline")?;
        let session = Self::spawn(config, &pipeline, backend);
        if session.is_err() {
            pipeline.stop();
        }
        session
    }

    fn spawn(
        config: SessionConfig,
        pipeline: &Arc<PipelineCoordinator>,
        backend: &dyn CaptureBackend,
    ) -> anyhow::Result<Self> {
        let mut capture_session = backend
            .start(&config)
            .with_context(|| format!("starting {} capture backend", backend.name()))?;
        let mut staging = ChannelBuffers::new(config.channels, config.sample_size)?;

        let stop = StopToken::new();
        let (redraw_tx, redraws) = async_channel::bounded(1);

        let capture = thread::Builder::new()
            .name("spectrabar-capture".into())
            .spawn({
                let stop = stop.clone();
                let pipeline = Arc::clone(pipeline);
                move || {
                    let result = capture_session.run(&stop, &mut staging, pipeline.as_ref());
                    match &result {
                        Ok(()) => debug!("[capture] session ended"),
                        Err(err) => error!("[capture] session failed: {err:#}"),
                    }
                    result
                }
            })
            .context("spawning capture thread")?;

        let ticker = thread::Builder::new()
            .name("spectrabar-ticker".into())
            .spawn({
                let stop = stop.clone();
                let pipeline = Arc::clone(pipeline);
                let redraw_tx = redraw_tx.clone();
                move || tick_loop(&pipeline, &stop, &redraw_tx, config.frame_rate)
            });
        let ticker = match ticker {
            Ok(handle) => handle,
            Err(err) => {
                stop.stop();
                let _ = capture.join();
                return Err(err).context("spawning ticker thread");
            }
        };

        info!(
            "[session] running on {} backend at {} fps",
            backend.name(),
            config.frame_rate
        );

        Ok(Self {
            pipeline: Arc::clone(pipeline),
            stop,
            redraw_tx,
            redraws,
            capture: Some(capture),
            ticker: Some(ticker),
        })
    }

    pub fn pipeline(&self) -> &Arc<PipelineCoordinator> {
        &self.pipeline
    }

    /// Redraw requests. Requests coalesce while one is pending; the channel
    /// closes on stop.
    pub fn redraws(&self) -> Receiver<()> {
        self.redraws.clone()
    }

    pub fn is_running(&self) -> bool {
        self.ticker.is_some()
    }

    /// Stops both threads and the pipeline. Returns the capture session's
    /// error, if it failed. Calling again is a no-op.
    pub fn stop(&mut self) -> anyhow::Result<()> {
        if self.ticker.is_none() && self.capture.is_none() {
            return Ok(());
        }

        self.stop.stop();
        self.redraw_tx.close();

        if let Some(ticker) = self.ticker.take() {
            if ticker.join().is_err() {
                warn!("[session] ticker thread panicked");
            }
        }
        let captured = self.capture.take().map(JoinHandle::join);
        self.pipeline.stop();
        info!("[session] stopped");

        match captured {
            Some(Ok(result)) => result.context("capture session failed"),
            Some(Err(_)) => Err(anyhow!("capture thread panicked")),
            None => Ok(()),
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            warn!("[session] {err:#}");
        }
    }
}

fn tick_loop(
    pipeline: &PipelineCoordinator,
    stop: &StopToken,
    redraw_tx: &Sender<()>,
    frame_rate: u32,
) {
    let interval = frame_interval(frame_rate);
    let mut deadline = Instant::now();

    while !stop.is_stopped() {
        deadline += interval;
        let now = Instant::now();
        if deadline > now {
            thread::sleep(deadline - now);
        } else {
            deadline = now;
        }

        if pipeline.on_tick() {
            match redraw_tx.try_send(()) {
                Ok(()) | Err(TrySendError::Full(())) => {}
                Err(TrySendError::Closed(())) => break,
            }
        }
    }
    debug!("[session] ticker exited");
}
