//! Test-tone capture backend for headless runs and tests.

use super::buffers::ChannelBuffers;
use super::capture::{CaptureBackend, CaptureSession, SampleSink, SessionConfig, StopToken};
use crate::util::audio::capture_interval;
use anyhow::ensure;
use std::f32::consts::TAU;
use std::thread;
use std::time::Instant;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tone {
    pub frequency: f32,
    pub amplitude: f32,
}

impl Tone {
    pub const fn new(frequency: f32, amplitude: f32) -> Self {
        Self {
            frequency,
            amplitude,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyntheticBackend {
    tones: Vec<Tone>,
    realtime: bool,
    max_windows: Option<u64>,
    // (audible windows, silent windows)
    gate: Option<(u64, u64)>,
}

impl Default for SyntheticBackend {
    fn default() -> Self {
        Self::new(vec![
            Tone::new(110.0, 0.5),
            Tone::new(440.0, 0.3),
            Tone::new(3_520.0, 0.1),
        ])
    }
}

impl SyntheticBackend {
    pub fn new(tones: Vec<Tone>) -> Self {
        Self {
            tones,
            realtime: true,
            max_windows: None,
            gate: None,
        }
    }

    pub fn silent() -> Self {
        Self::new(Vec::new())
    }

    /// Deliver windows as fast as the sink accepts them instead of at the
    /// capture cadence.
    pub fn unpaced(mut self) -> Self {
        self.realtime = false;
        self
    }

    /// End the session after `windows` deliveries.
    pub fn with_max_windows(mut self, windows: u64) -> Self {
        self.max_windows = Some(windows);
        self
    }

    /// Alternate `audible` tone windows with `silent` windows of silence.
    pub fn with_gate(mut self, audible: u64, silent: u64) -> Self {
        self.gate = (audible > 0 && silent > 0).then_some((audible, silent));
        self
    }
}

impl CaptureBackend for SyntheticBackend {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn start(&self, config: &SessionConfig) -> anyhow::Result<Box<dyn CaptureSession>> {
        ensure!(
            config.sample_rate.is_finite() && config.sample_rate > 0.0,
            "invalid sample rate {}",
            config.sample_rate
        );
        ensure!(config.channels > 0, "no channels requested");
        ensure!(config.sample_size > 0, "empty sample window requested");

        debug!(
            "[capture] synthetic source: {} tone(s), {} ch, {} Hz, {} samples/window",
            self.tones.len(),
            config.channels,
            config.sample_rate,
            config.sample_size
        );

        Ok(Box::new(SyntheticSession {
            tones: self.tones.clone(),
            config: *config,
            realtime: self.realtime,
            max_windows: self.max_windows,
            gate: self.gate,
            position: 0,
            packet: vec![0.0; config.channels * config.sample_size],
        }))
    }
}

struct SyntheticSession {
    tones: Vec<Tone>,
    config: SessionConfig,
    realtime: bool,
    max_windows: Option<u64>,
    gate: Option<(u64, u64)>,
    position: u64,
    // Interleaved, as a hardware source would hand it over.
    packet: Vec<f32>,
}

impl SyntheticSession {
    fn audible(&self, window: u64) -> bool {
        match self.gate {
            Some((on, off)) => window % (on + off) < on,
            None => true,
        }
    }

    fn render(&mut self, audible: bool) {
        let channels = self.config.channels;
        let rate = self.config.sample_rate;

        if !audible || self.tones.is_empty() {
            self.packet.fill(0.0);
        } else {
            for (frame_idx, frame) in self.packet.chunks_exact_mut(channels).enumerate() {
                let t = (self.position + frame_idx as u64) as f32 / rate;
                for (channel, sample) in frame.iter_mut().enumerate() {
                    // Later channels run quieter so stereo layouts are asymmetric.
                    let gain = 1.0 / (1.0 + channel as f32 * 0.5);
                    *sample = self
                        .tones
                        .iter()
                        .map(|tone| tone.amplitude * gain * (TAU * tone.frequency * t).sin())
                        .sum();
                }
            }
        }
        self.position += self.config.sample_size as u64;
    }
}

impl CaptureSession for SyntheticSession {
    fn run(
        &mut self,
        stop: &StopToken,
        buffers: &mut ChannelBuffers,
        sink: &dyn SampleSink,
    ) -> anyhow::Result<()> {
        let interval = capture_interval(self.config.sample_rate, self.config.sample_size);
        let mut deadline = Instant::now();
        let mut delivered = 0u64;

        while !stop.is_stopped() {
            if self.max_windows.is_some_and(|max| delivered >= max) {
                break;
            }

            let audible = self.audible(delivered);
            self.render(audible);
            buffers.fill_from_interleaved(&self.packet);
            sink.on_samples_delivered(buffers);
            delivered += 1;

            if self.realtime {
                deadline += interval;
                let now = Instant::now();
                if deadline > now {
                    thread::sleep(deadline - now);
                } else {
                    deadline = now;
                }
            }
        }

        debug!("[capture] synthetic source delivered {delivered} window(s)");
        Ok(())
    }
}
