//! Adaptive display scale derived from recent per-tick peaks.
//!
//! Two moving windows watch the same peak stream: a short "fast" one and a
//! long "slow" one. The slow window sets the scale; when the fast mean drifts
//! away from it by more than `reset_deviation` standard deviations the slow
//! window is considered stale and its oldest entries are dumped so the scale
//! re-anchors on the new loudness regime.

use super::Reconfigurable;
use crate::error::ConfigError;
use crate::util::audio::window_capacity;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;

// Multiplier on the slow window's standard deviation when deriving the scale.
const SCALE_DEVIATIONS: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScalingConfig {
    /// Fixed scale; `0` enables dynamic estimation.
    pub static_scale: f32,
    /// Slow window length in seconds.
    pub slow_window: f32,
    /// Fast window length in seconds.
    pub fast_window: f32,
    /// Fraction of the slow window dropped on a deviation reset.
    pub dump_percent: f32,
    /// Fast/slow mean distance, in slow standard deviations, that triggers a reset.
    pub reset_deviation: f32,
}

impl Default for ScalingConfig {
    fn default() -> Self {
        Self {
            static_scale: 0.0,
            slow_window: 5.0,
            fast_window: 1.0,
            dump_percent: 0.75,
            reset_deviation: 1.0,
        }
    }
}

impl ScalingConfig {
    pub fn sanitize(&mut self) {
        let finite_or = |v: f32, fallback: f32| if v.is_finite() { v } else { fallback };
        let defaults = Self::default();
        self.static_scale = finite_or(self.static_scale, 0.0).max(0.0);
        self.slow_window = finite_or(self.slow_window, defaults.slow_window).max(0.0);
        self.fast_window = finite_or(self.fast_window, defaults.fast_window).max(0.0);
        self.dump_percent = finite_or(self.dump_percent, defaults.dump_percent).clamp(0.0, 1.0);
        self.reset_deviation = finite_or(self.reset_deviation, defaults.reset_deviation).max(0.0);
    }

    pub fn is_static(&self) -> bool {
        self.static_scale != 0.0
    }
}

/// Bounded history with running mean and standard deviation.
#[derive(Debug, Clone)]
pub struct MovingWindow {
    samples: VecDeque<f64>,
    capacity: usize,
    sum: f64,
    sum_sq: f64,
}

impl MovingWindow {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "moving window capacity must be positive");
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            sum: 0.0,
            sum_sq: 0.0,
        }
    }

    /// Pushes `value`, evicting the oldest sample at capacity, and returns the
    /// updated `(mean, stddev)`.
    pub fn update(&mut self, value: f64) -> (f64, f64) {
        if self.samples.len() == self.capacity {
            if let Some(oldest) = self.samples.pop_front() {
                self.sum -= oldest;
                self.sum_sq -= oldest * oldest;
            }
        }

        self.samples.push_back(value);
        self.sum += value;
        self.sum_sq += value * value;
        self.stats()
    }

    /// Discards the `count` oldest samples and recomputes the statistics from
    /// what remains.
    pub fn drop_oldest(&mut self, count: usize) -> (f64, f64) {
        if count > 0 {
            let count = count.min(self.samples.len());
            self.samples.drain(..count);
            self.sum = self.samples.iter().sum();
            self.sum_sq = self.samples.iter().map(|v| v * v).sum();
        }
        self.stats()
    }

    pub fn mean(&self) -> f64 {
        self.stats().0
    }

    pub fn stddev(&self) -> f64 {
        self.stats().1
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.sum = 0.0;
        self.sum_sq = 0.0;
    }

    fn stats(&self) -> (f64, f64) {
        if self.samples.is_empty() {
            return (0.0, 0.0);
        }
        let len = self.samples.len() as f64;
        let mean = self.sum / len;
        let variance = (self.sum_sq / len - mean * mean).max(0.0);
        (mean, variance.sqrt())
    }
}

#[derive(Debug, Clone)]
struct Windows {
    fast: MovingWindow,
    slow: MovingWindow,
}

#[derive(Debug, Clone)]
pub struct GainEstimator {
    config: ScalingConfig,
    sample_rate: f32,
    sample_size: usize,
    // None when a static scale bypasses estimation.
    windows: Option<Windows>,
    scale: f32,
    dumps: u64,
}

impl GainEstimator {
    pub fn new(
        config: ScalingConfig,
        sample_rate: f32,
        sample_size: usize,
    ) -> Result<Self, ConfigError> {
        let windows = Self::build_windows(&config, sample_rate, sample_size)?;
        Ok(Self {
            scale: config.static_scale,
            config,
            sample_rate,
            sample_size,
            windows,
            dumps: 0,
        })
    }

    fn build_windows(
        config: &ScalingConfig,
        sample_rate: f32,
        sample_size: usize,
    ) -> Result<Option<Windows>, ConfigError> {
        if config.is_static() {
            return Ok(None);
        }

        let slow = window_capacity(config.slow_window, sample_rate, sample_size);
        let fast = window_capacity(config.fast_window, sample_rate, sample_size);
        if slow == 0 || fast == 0 {
            return Err(ConfigError::EmptyGainWindow { fast, slow });
        }
        if fast >= slow {
            return Err(ConfigError::GainWindowOrder { fast, slow });
        }

        Ok(Some(Windows {
            fast: MovingWindow::new(fast),
            slow: MovingWindow::new(slow),
        }))
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn config(&self) -> ScalingConfig {
        self.config
    }

    /// Number of deviation-triggered dumps of the slow window so far.
    pub fn dumps(&self) -> u64 {
        self.dumps
    }

    pub fn window_lengths(&self) -> Option<(usize, usize)> {
        self.windows
            .as_ref()
            .map(|w| (w.fast.len(), w.slow.len()))
    }

    pub fn window_capacities(&self) -> Option<(usize, usize)> {
        self.windows
            .as_ref()
            .map(|w| (w.fast.capacity(), w.slow.capacity()))
    }

    /// Feeds one tick's peak and returns the scale to draw with.
    pub fn update(&mut self, peak: f32) -> f32 {
        let Some(windows) = self.windows.as_mut() else {
            return self.config.static_scale;
        };

        // Silence must not drag the statistics down.
        if !(peak > 0.0) || !peak.is_finite() {
            return self.scale;
        }

        let peak = f64::from(peak);
        let (fast_mean, _) = windows.fast.update(peak);
        let (mut slow_mean, mut slow_stddev) = windows.slow.update(peak);

        let length = windows.slow.len();
        if length >= windows.fast.capacity()
            && (fast_mean - slow_mean).abs() > f64::from(self.config.reset_deviation) * slow_stddev
        {
            let count = (length as f64 * f64::from(self.config.dump_percent)) as usize;
            (slow_mean, slow_stddev) = windows.slow.drop_oldest(count);
            self.dumps += 1;
            debug!(
                "[gain] slow window reset: dropped {count}/{length}, fast mean {fast_mean:.4}, slow mean {slow_mean:.4}"
            );
        }

        let candidate = (slow_mean + SCALE_DEVIATIONS * slow_stddev) as f32;
        self.scale = if candidate > 1.0 {
            candidate
        } else {
            self.scale.max(1.0)
        };
        self.scale
    }

    pub fn reset(&mut self) {
        if let Some(windows) = self.windows.as_mut() {
            windows.fast.clear();
            windows.slow.clear();
        }
        self.scale = self.config.static_scale;
        self.dumps = 0;
    }
}

impl Reconfigurable<ScalingConfig> for GainEstimator {
    type Error = ConfigError;

    fn update_config(&mut self, config: ScalingConfig) -> Result<(), ConfigError> {
        self.windows = Self::build_windows(&config, self.sample_rate, self.sample_size)?;
        self.config = config;
        self.scale = config.static_scale;
        self.dumps = 0;
        Ok(())
    }
}
