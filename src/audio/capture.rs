//! Boundary between the pipeline and whatever produces samples.

use super::buffers::ChannelBuffers;
use crate::util::audio::{DEFAULT_SAMPLE_RATE, DEFAULT_SAMPLE_SIZE};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionConfig {
    pub sample_rate: f32,
    /// Samples per channel in one delivered window.
    pub sample_size: usize,
    pub channels: usize,
    /// Draw ticks per second.
    pub frame_rate: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            sample_size: DEFAULT_SAMPLE_SIZE,
            channels: 2,
            frame_rate: 60,
        }
    }
}

/// Shared cancellation flag. Clones observe the same state.
#[derive(Debug, Clone, Default)]
pub struct StopToken(Arc<AtomicBool>);

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Receives full capture windows. Implementations must not block beyond a
/// short lock; they run on the capture thread.
pub trait SampleSink: Send + Sync {
    fn on_samples_delivered(&self, samples: &ChannelBuffers);
}

pub trait CaptureSession: Send {
    /// Delivers windows into `sink` until `stop` is raised or the source ends.
    /// `buffers` is a staging set with the session's shape.
    fn run(
        &mut self,
        stop: &StopToken,
        buffers: &mut ChannelBuffers,
        sink: &dyn SampleSink,
    ) -> anyhow::Result<()>;
}

pub trait CaptureBackend: Send + Sync {
    fn name(&self) -> &str;

    fn start(&self, config: &SessionConfig) -> anyhow::Result<Box<dyn CaptureSession>>;
}
