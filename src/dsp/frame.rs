//! Per-channel bar magnitudes for the most recent tick.

use super::spectrum::SpectrumProcessor;
use tracing::debug;

/// Bars that fit in `width` when each occupies `bin_width`, divided across
/// `columns` side-by-side channel groups.
pub fn requested_bars(width: f32, bin_width: f32, columns: usize) -> usize {
    if !(width > 0.0) || !(bin_width > 0.0) || !width.is_finite() {
        return 0;
    }
    let bars = (width / bin_width).floor() as usize;
    bars / columns.max(1)
}

/// Bar buffers sized once per session. Each channel keeps `capacity` slots;
/// only the first `bar_count` hold data from the latest tick.
#[derive(Debug, Clone)]
pub struct SpectrumFrame {
    bars: Vec<f32>,
    channels: usize,
    capacity: usize,
    bar_count: usize,
    scale: f32,
    width: Option<f32>,
}

impl SpectrumFrame {
    pub fn new(channels: usize, capacity: usize) -> Self {
        Self {
            bars: vec![0.0; channels * capacity],
            channels,
            capacity,
            bar_count: 0,
            scale: 0.0,
            width: None,
        }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn bar_count(&self) -> usize {
        self.bar_count
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn set_scale(&mut self, scale: f32) {
        self.scale = scale;
    }

    /// Width used for the current `bar_count`, if any.
    pub fn width(&self) -> Option<f32> {
        self.width
    }

    /// Forces the next [`resize`](Self::resize) to consult the processor even
    /// if the width is unchanged.
    pub fn invalidate_width(&mut self) {
        self.width = None;
    }

    /// Recomputes `bar_count` when `width` differs from the cached width.
    /// Returns the new count, or `None` when nothing changed.
    pub fn resize(
        &mut self,
        width: f32,
        bin_width: f32,
        columns: usize,
        processor: &mut dyn SpectrumProcessor,
    ) -> Option<usize> {
        if self.width == Some(width) {
            return None;
        }

        let requested = requested_bars(width, bin_width, columns);
        let actual = processor.recalculate(requested).min(self.capacity);
        if actual != self.bar_count {
            debug!(
                "[frame] bar count {} -> {actual} (requested {requested}, width {width})",
                self.bar_count
            );
        }
        self.bar_count = actual;
        self.width = Some(width);
        Some(actual)
    }

    /// Full-capacity slot slice for `channel`.
    pub fn channel_mut(&mut self, channel: usize) -> &mut [f32] {
        let start = channel * self.capacity;
        &mut self.bars[start..start + self.capacity]
    }

    pub fn clear(&mut self) {
        self.bars.fill(0.0);
        self.scale = 0.0;
    }

    pub fn view(&self) -> FrameView<'_> {
        FrameView {
            data: &self.bars,
            stride: self.capacity,
            channels: self.channels,
            bar_count: self.bar_count,
            scale: self.scale,
        }
    }

    pub fn snapshot(&self) -> FrameSnapshot {
        let mut data = Vec::with_capacity(self.channels * self.bar_count);
        for channel in 0..self.channels {
            data.extend_from_slice(self.view().channel(channel));
        }
        FrameSnapshot {
            data,
            channels: self.channels,
            bar_count: self.bar_count,
            scale: self.scale,
        }
    }
}

/// Borrowed, read-only view of one committed frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    data: &'a [f32],
    stride: usize,
    channels: usize,
    bar_count: usize,
    scale: f32,
}

impl<'a> FrameView<'a> {
    /// Builds a view over `channels` contiguous runs of `bar_count` values.
    ///
    /// # Panics
    ///
    /// Panics if `data` is shorter than `channels * bar_count`.
    pub fn from_contiguous(data: &'a [f32], channels: usize, bar_count: usize, scale: f32) -> Self {
        assert!(data.len() >= channels * bar_count, "frame data too short");
        Self {
            data,
            stride: bar_count,
            channels,
            bar_count,
            scale,
        }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn bar_count(&self) -> usize {
        self.bar_count
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// The meaningful bars of `channel`.
    pub fn channel(&self, channel: usize) -> &'a [f32] {
        let start = channel * self.stride;
        &self.data[start..start + self.bar_count]
    }

    pub fn peak(&self) -> f32 {
        (0..self.channels)
            .flat_map(|c| self.channel(c).iter().copied())
            .filter(|v| v.is_finite())
            .fold(0.0, f32::max)
    }
}

/// Owned copy of a frame, detached from the pipeline lock.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSnapshot {
    data: Vec<f32>,
    channels: usize,
    bar_count: usize,
    scale: f32,
}

impl FrameSnapshot {
    pub fn view(&self) -> FrameView<'_> {
        FrameView::from_contiguous(&self.data, self.channels, self.bar_count, self.scale)
    }

    pub fn bar_count(&self) -> usize {
        self.bar_count
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }
}
