//! User settings, read from `settings.json`. The crate never writes them.

use crate::audio::capture::SessionConfig;
use crate::dsp::gain::ScalingConfig;
use crate::dsp::spectrum::{Distribution, MAX_SMOOTHING};
use crate::dsp::window::WindowKind;
use crate::pipeline::{PipelineComponents, PipelineConfig, RedrawPolicy};
use crate::render::canvas::{DrawOptions, LineCap};
use crate::render::layout::{DrawStyle, LayoutParams};
use crate::util::audio::{DEFAULT_SAMPLE_RATE, DEFAULT_SAMPLE_SIZE};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const MAX_FRAME_RATE: u32 = 240;

pub fn config_dir() -> PathBuf {
    std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("spectrabar")
}

pub fn config_path() -> PathBuf {
    config_dir().join("settings.json")
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualizerSettings {
    pub sample_rate: f32,
    /// Samples per channel per window; `0` derives it from the frame rate.
    pub sample_size: usize,
    pub frame_rate: u32,
    pub window: WindowKind,
    /// Percent of the previous value kept per tick.
    pub smoothing_factor: f32,
    pub distribution: Distribution,
    pub monophonic: bool,
    pub redraw: RedrawPolicy,
}

impl Default for VisualizerSettings {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            sample_size: DEFAULT_SAMPLE_SIZE,
            frame_rate: 60,
            window: WindowKind::default(),
            smoothing_factor: 65.69,
            distribution: Distribution::default(),
            monophonic: false,
            redraw: RedrawPolicy::default(),
        }
    }
}

impl VisualizerSettings {
    pub fn channels(&self) -> usize {
        if self.monophonic { 1 } else { 2 }
    }

    pub fn effective_sample_size(&self) -> usize {
        if self.sample_size > 0 {
            self.sample_size
        } else {
            ((self.sample_rate / self.frame_rate.max(1) as f32) as usize).max(1)
        }
    }

    fn sanitize(&mut self) {
        let defaults = Self::default();
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            self.sample_rate = defaults.sample_rate;
        }
        self.frame_rate = self.frame_rate.clamp(1, MAX_FRAME_RATE);
        self.smoothing_factor = if self.smoothing_factor.is_finite() {
            self.smoothing_factor.clamp(0.0, MAX_SMOOTHING * 100.0)
        } else {
            defaults.smoothing_factor
        };
        if let WindowKind::CosineSum { a0 } = &mut self.window {
            *a0 = if a0.is_finite() { a0.clamp(0.0, 1.0) } else { 0.5 };
        }
        let redraw = &mut self.redraw;
        if !(redraw.audibility_threshold.is_finite() && redraw.audibility_threshold >= 0.0) {
            redraw.audibility_threshold = defaults.redraw.audibility_threshold;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppearanceSettings {
    pub style: DrawStyle,
    pub bar_width: f32,
    pub space_width: f32,
    pub minimum_clamp: f32,
    pub offset_x: f32,
    pub offset_y: f32,
    pub round: bool,
    pub even: bool,
    pub antialias: bool,
    pub line_cap: LineCap,
}

impl Default for AppearanceSettings {
    fn default() -> Self {
        Self {
            style: DrawStyle::default(),
            bar_width: 10.0,
            space_width: 5.0,
            minimum_clamp: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
            round: false,
            even: false,
            antialias: true,
            line_cap: LineCap::default(),
        }
    }
}

impl AppearanceSettings {
    pub fn bin_width(&self) -> f32 {
        self.bar_width + self.space_width
    }

    fn sanitize(&mut self) {
        let defaults = Self::default();
        let non_negative = |v: f32, fallback: f32| {
            if v.is_finite() && v >= 0.0 { v } else { fallback }
        };
        self.bar_width = if self.bar_width.is_finite() && self.bar_width > 0.0 {
            self.bar_width
        } else {
            defaults.bar_width
        };
        self.space_width = non_negative(self.space_width, defaults.space_width);
        self.minimum_clamp = non_negative(self.minimum_clamp, defaults.minimum_clamp);
        if !self.offset_x.is_finite() {
            self.offset_x = 0.0;
        }
        if !self.offset_y.is_finite() {
            self.offset_y = 0.0;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub visualizer: VisualizerSettings,
    pub scaling: ScalingConfig,
    pub appearance: AppearanceSettings,
}

impl Settings {
    /// Reads `path`, falling back to defaults when it is missing or invalid.
    pub fn load_or_default(path: &Path) -> Self {
        let settings = match fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents)
                .map_err(|e| warn!("[settings] parse error {path:?}: {e}"))
                .unwrap_or_default(),
            Err(err) => {
                debug!("[settings] using defaults, {path:?} unreadable: {err}");
                Self::default()
            }
        };
        settings.sanitized()
    }

    pub fn from_json(contents: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<Self>(contents).map(Self::sanitized)
    }

    pub fn sanitize(&mut self) {
        self.visualizer.sanitize();
        self.scaling.sanitize();
        self.appearance.sanitize();
    }

    fn sanitized(mut self) -> Self {
        self.sanitize();
        self
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            sample_rate: self.visualizer.sample_rate,
            sample_size: self.visualizer.effective_sample_size(),
            channels: self.visualizer.channels(),
            scaling: self.scaling,
            redraw: self.visualizer.redraw,
            style: self.appearance.style,
            bin_width: self.appearance.bin_width(),
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        self.pipeline_config()
            .session_config(self.visualizer.frame_rate)
    }

    pub fn components(&self) -> PipelineComponents {
        PipelineComponents::reference(
            &self.pipeline_config(),
            self.visualizer.window,
            self.visualizer.smoothing_factor / 100.0,
            self.visualizer.distribution,
        )
    }

    pub fn layout_params(&self, width: f32, height: f32) -> LayoutParams {
        let appearance = &self.appearance;
        LayoutParams {
            style: appearance.style,
            width,
            height,
            bar_width: appearance.bar_width,
            gap_width: appearance.space_width,
            clamp: appearance.minimum_clamp,
        }
    }

    pub fn draw_options(&self) -> DrawOptions {
        let appearance = &self.appearance;
        DrawOptions {
            offset_x: appearance.offset_x,
            offset_y: appearance.offset_y,
            round: appearance.round,
            even: appearance.even,
            line_width: appearance.bar_width,
            line_cap: appearance.line_cap,
            antialias: appearance.antialias,
        }
    }
}
