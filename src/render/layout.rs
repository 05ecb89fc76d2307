//! Bar magnitudes to canvas geometry.
//!
//! Pure functions: nothing here touches the pipeline lock. Callers pass a
//! [`FrameView`] obtained under the lock (or from a snapshot) together with
//! the surface dimensions.

use crate::dsp::frame::FrameView;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DrawStyle {
    /// Bars mirrored about the horizontal center line, first channel upward.
    #[default]
    VerticalBars,
    /// Bars rising from the bottom edge, channels side by side.
    HorizontalBars,
    /// One smoothed polyline, the second channel traced back in reverse.
    Lines,
}

impl DrawStyle {
    pub const ALL: [DrawStyle; 3] = [
        DrawStyle::VerticalBars,
        DrawStyle::HorizontalBars,
        DrawStyle::Lines,
    ];

    /// Number of side-by-side channel groups sharing the canvas width.
    pub fn columns(self, channels: usize) -> usize {
        match self {
            DrawStyle::HorizontalBars | DrawStyle::Lines => channels.max(1),
            DrawStyle::VerticalBars => 1,
        }
    }
}

impl std::fmt::Display for DrawStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            DrawStyle::VerticalBars => "Vertical bars",
            DrawStyle::HorizontalBars => "Horizontal bars",
            DrawStyle::Lines => "Lines",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutParams {
    pub style: DrawStyle,
    pub width: f32,
    pub height: f32,
    pub bar_width: f32,
    pub gap_width: f32,
    /// Magnitudes at or below this many units draw as the baseline.
    pub clamp: f32,
}

impl LayoutParams {
    pub fn bin_width(&self) -> f32 {
        self.bar_width + self.gap_width
    }

    fn is_drawable(&self) -> bool {
        self.width > 0.0 && self.height > 0.0 && self.bin_width() > 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// One vertical stroke at `x` from `y_from` to `y_to`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarSegment {
    pub x: f32,
    pub y_from: f32,
    pub y_to: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathOp {
    MoveTo(Point),
    LineTo(Point),
    /// Quadratic curve from the current point through `control` to `to`.
    QuadTo { control: Point, to: Point },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Layout {
    Bars(Vec<BarSegment>),
    Path(Vec<PathOp>),
}

impl Layout {
    fn empty(style: DrawStyle) -> Self {
        match style {
            DrawStyle::VerticalBars | DrawStyle::HorizontalBars => Layout::Bars(Vec::new()),
            DrawStyle::Lines => Layout::Path(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Layout::Bars(segments) => segments.len(),
            Layout::Path(ops) => ops.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Distance from the axis origin to the top of a bar of height `value` on an
/// axis `axis` units long. Values are clamped into `clamp..=axis` and the
/// clamped-off floor is redistributed over the remaining range.
///
/// Returns `None` for NaN input or a degenerate axis.
pub fn calculate_bar(value: f32, axis: f32, clamp: f32) -> Option<f32> {
    if value.is_nan() || !(axis > 0.0) {
        return None;
    }
    let mut bar = value.min(axis).max(clamp) - clamp;
    bar += bar * (clamp / axis);
    let stop = axis - bar;
    stop.is_finite().then_some(stop)
}

// Zero or non-finite scale is the "no estimate yet" sentinel and means
// pass-through.
fn axis_factor(axis: f32, scale: f32) -> f32 {
    let scale = if scale.is_finite() && scale > 0.0 {
        scale
    } else {
        1.0
    };
    axis / scale
}

// Grid rounded to whole bins so no partial bar is drawn; returns the
// exclusive x limit and the first bar's center.
fn grid(params: &LayoutParams) -> (f32, f32) {
    let bin_width = params.bin_width();
    let x_max = (params.width / bin_width).round() * bin_width;
    let x_start = bin_width / 2.0 + (params.width - x_max) / 2.0;
    (x_max, x_start)
}

pub fn layout(params: &LayoutParams, frame: FrameView<'_>) -> Layout {
    if frame.bar_count() == 0 || frame.channels() == 0 || !params.is_drawable() {
        return Layout::empty(params.style);
    }

    match params.style {
        DrawStyle::VerticalBars => Layout::Bars(vertical_bars(params, frame)),
        DrawStyle::HorizontalBars => Layout::Bars(horizontal_bars(params, frame)),
        DrawStyle::Lines => Layout::Path(lines(params, frame)),
    }
}

fn vertical_bars(params: &LayoutParams, frame: FrameView<'_>) -> Vec<BarSegment> {
    let height = params.height;
    let clamp = params.clamp;
    let center = ((height - clamp) / 2.0).max(0.0);
    let factor = axis_factor(center, frame.scale());
    let bin_width = params.bin_width();
    let (x_max, mut x) = grid(params);

    let upper = frame.channel(0);
    let lower = frame.channel(1 % frame.channels());

    let mut segments = Vec::with_capacity(frame.bar_count());
    for bin in 0..frame.bar_count() {
        if x >= x_max {
            break;
        }

        let top = calculate_bar(upper[bin] * factor, center, clamp);
        let bottom = calculate_bar(lower[bin] * factor, center, clamp);
        match (top, bottom) {
            (Some(top), Some(bottom)) => segments.push(BarSegment {
                x,
                y_from: top,
                y_to: height - bottom,
            }),
            _ if clamp > 0.0 => segments.push(BarSegment {
                x,
                y_from: center,
                y_to: center + clamp,
            }),
            _ => {}
        }

        x += bin_width;
    }
    segments
}

fn horizontal_bars(params: &LayoutParams, frame: FrameView<'_>) -> Vec<BarSegment> {
    let height = params.height;
    let factor = axis_factor(height, frame.scale());
    let bin_width = params.bin_width();
    let bar_count = frame.bar_count() as isize;
    let (x_max, mut x) = grid(params);

    let mut segments = Vec::with_capacity(frame.bar_count() * frame.channels());
    let mut bin: isize = 0;
    let mut delta: isize = 1;

    for channel in 0..frame.channels() {
        let values = frame.channel(channel);
        while (0..bar_count).contains(&bin) && x < x_max {
            let stop = calculate_bar(values[bin as usize] * factor, height, params.clamp)
                .unwrap_or(height);
            segments.push(BarSegment {
                x,
                y_from: stop,
                y_to: height,
            });
            x += bin_width;
            bin += delta;
        }
        // Odd channels walk back from the last bin.
        delta = -delta;
        bin += delta;
    }
    segments
}

fn lines(params: &LayoutParams, frame: FrameView<'_>) -> Vec<PathOp> {
    let height = params.height;
    let factor = axis_factor(height, frame.scale());
    let baseline = calculate_bar(0.0, height, params.clamp).unwrap_or(height);
    let bin_width = params.bin_width();
    let bar_count = frame.bar_count() as isize;
    let (x_max, mut x) = grid(params);

    let mut ops = Vec::with_capacity(frame.bar_count() * frame.channels());
    let mut bin: isize = 0;
    let mut delta: isize = 1;
    let mut ys = vec![0.0f32; frame.bar_count()];

    for channel in 0..frame.channels() {
        for (y, &value) in ys.iter_mut().zip(frame.channel(channel)) {
            *y = calculate_bar(value * factor, height, params.clamp).unwrap_or(baseline);
        }

        while (0..bar_count).contains(&bin) && x < x_max {
            let y = ys[bin as usize];
            let point = Point::new(x, y);
            let next = bin + delta;

            if ops.is_empty() {
                ops.push(PathOp::MoveTo(point));
            } else if (0..bar_count).contains(&next) {
                ops.push(PathOp::QuadTo {
                    control: point,
                    to: Point::new(x + bin_width, (y + ys[next as usize]) / 2.0),
                });
            } else {
                ops.push(PathOp::LineTo(point));
            }

            x += bin_width;
            bin += delta;
        }
        delta = -delta;
        bin += delta;
    }
    ops
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(style: DrawStyle, width: f32, height: f32) -> LayoutParams {
        LayoutParams {
            style,
            width,
            height,
            bar_width: 10.0,
            gap_width: 5.0,
            clamp: 1.0,
        }
    }

    fn bars(layout: Layout) -> Vec<BarSegment> {
        match layout {
            Layout::Bars(segments) => segments,
            Layout::Path(_) => panic!("expected bars"),
        }
    }

    fn path(layout: Layout) -> Vec<PathOp> {
        match layout {
            Layout::Path(ops) => ops,
            Layout::Bars(_) => panic!("expected path"),
        }
    }

    #[test]
    fn calculate_bar_edges() {
        assert_eq!(calculate_bar(f32::NAN, 100.0, 1.0), None);
        assert_eq!(calculate_bar(1.0, 0.0, 1.0), None);
        assert_eq!(calculate_bar(0.0, 100.0, 1.0), Some(100.0));
        assert_eq!(calculate_bar(1_000.0, 100.0, 0.0), Some(0.0));
        assert_eq!(calculate_bar(f32::INFINITY, 100.0, 0.0), Some(0.0));
        // Full-scale with a floor leaves clamp^2 / axis of headroom.
        let top = calculate_bar(100.0, 100.0, 1.0).unwrap();
        assert!((top - 0.01).abs() < 1e-4);
    }

    #[test]
    fn degenerate_inputs_yield_empty_layouts() {
        let data = [0.5f32; 8];
        let frame = FrameView::from_contiguous(&data, 2, 4, 1.0);
        let empty = FrameView::from_contiguous(&data, 2, 0, 1.0);

        for style in DrawStyle::ALL {
            assert!(layout(&params(style, 60.0, 100.0), empty).is_empty());
            assert!(layout(&params(style, 0.0, 100.0), frame).is_empty());
            assert!(layout(&params(style, 60.0, 0.0), frame).is_empty());
            assert!(layout(&params(style, -5.0, 100.0), frame).is_empty());
            assert!(!layout(&params(style, 60.0, 100.0), frame).is_empty());
        }
    }

    #[test]
    fn mirrored_vertical_flat_input_is_symmetric() {
        let data = [0.5f32; 8];
        let frame = FrameView::from_contiguous(&data, 2, 4, 1.0);
        let segments = bars(layout(&params(DrawStyle::VerticalBars, 60.0, 100.0), frame));

        let xs: Vec<f32> = segments.iter().map(|s| s.x).collect();
        assert_eq!(xs, [7.5, 22.5, 37.5, 52.5]);
        for segment in &segments {
            assert!((segment.y_from - 25.2702).abs() < 1e-3, "{segment:?}");
            assert!((segment.y_to - 74.7298).abs() < 1e-3, "{segment:?}");
            let up = 50.0 - segment.y_from;
            let down = segment.y_to - 50.0;
            assert!((up - down).abs() < 1e-4);
        }
    }

    #[test]
    fn mono_vertical_mirrors_first_channel() {
        let data = [0.2f32, 0.8];
        let frame = FrameView::from_contiguous(&data, 1, 2, 1.0);
        let segments = bars(layout(&params(DrawStyle::VerticalBars, 30.0, 100.0), frame));
        assert_eq!(segments.len(), 2);
        for segment in segments {
            assert!((segment.y_from + segment.y_to - 100.0).abs() < 1e-4);
        }
    }

    #[test]
    fn vertical_nan_draws_baseline() {
        let data = [f32::NAN, 0.5, 0.5, 0.5];
        let frame = FrameView::from_contiguous(&data, 2, 2, 1.0);
        let segments = bars(layout(&params(DrawStyle::VerticalBars, 30.0, 101.0), frame));
        assert_eq!(
            segments[0],
            BarSegment {
                x: 7.5,
                y_from: 50.0,
                y_to: 51.0
            }
        );
        assert!(segments[1].y_from < 50.0);
    }

    #[test]
    fn zero_scale_is_pass_through() {
        let data = [0.5f32; 4];
        let unscaled = FrameView::from_contiguous(&data, 1, 4, 0.0);
        let unit = FrameView::from_contiguous(&data, 1, 4, 1.0);
        for style in DrawStyle::ALL {
            let p = params(style, 60.0, 100.0);
            assert_eq!(layout(&p, unscaled), layout(&p, unit));
        }
    }

    #[test]
    fn larger_scale_shortens_bars() {
        let data = [0.5f32; 4];
        let p = params(DrawStyle::HorizontalBars, 60.0, 100.0);
        let tall = bars(layout(&p, FrameView::from_contiguous(&data, 1, 4, 1.0)));
        let short = bars(layout(&p, FrameView::from_contiguous(&data, 1, 4, 2.0)));
        assert!(short[0].y_from > tall[0].y_from);
    }

    #[test]
    fn horizontal_walks_second_channel_backwards() {
        // Channel 0 rises, channel 1 is constant; three bars each.
        let data = [0.1f32, 0.2, 0.3, 0.9, 0.9, 0.9];
        let frame = FrameView::from_contiguous(&data, 2, 3, 1.0);
        let segments = bars(layout(&params(DrawStyle::HorizontalBars, 90.0, 100.0), frame));

        assert_eq!(segments.len(), 6);
        let xs: Vec<f32> = segments.iter().map(|s| s.x).collect();
        assert_eq!(xs, [7.5, 22.5, 37.5, 52.5, 67.5, 82.5]);
        assert!(segments.iter().all(|s| s.y_to == 100.0));
        assert!(segments[0].y_from > segments[1].y_from);
        assert!(segments[1].y_from > segments[2].y_from);
        assert!(segments[3..].iter().all(|s| s.y_from < segments[2].y_from));
    }

    #[test]
    fn horizontal_reverse_order_is_visible() {
        let data = [0.0f32, 0.0, 0.1, 0.5];
        let frame = FrameView::from_contiguous(&data, 2, 2, 1.0);
        let segments = bars(layout(&params(DrawStyle::HorizontalBars, 60.0, 100.0), frame));
        // Second channel's last bin comes first.
        assert!(segments[2].y_from < segments[3].y_from);
    }

    #[test]
    fn lines_start_with_move_and_end_with_line() {
        let data = [0.1f32, 0.4, 0.2, 0.3];
        let frame = FrameView::from_contiguous(&data, 1, 4, 1.0);
        let ops = path(layout(&params(DrawStyle::Lines, 60.0, 100.0), frame));

        assert_eq!(ops.len(), 4);
        assert!(matches!(ops[0], PathOp::MoveTo(p) if p.x == 7.5));
        for op in &ops[1..3] {
            let PathOp::QuadTo { control, to } = op else {
                panic!("expected quad, got {op:?}");
            };
            assert_eq!(to.x, control.x + 15.0);
        }
        assert!(matches!(ops[3], PathOp::LineTo(p) if p.x == 52.5));
    }

    #[test]
    fn stereo_lines_trace_back_through_second_channel() {
        let data = [0.1f32, 0.2, 0.3, 0.9, 0.9, 0.8];
        let frame = FrameView::from_contiguous(&data, 2, 3, 1.0);
        let ops = path(layout(&params(DrawStyle::Lines, 90.0, 100.0), frame));

        assert_eq!(ops.len(), 6);
        let points: Vec<Point> = ops.iter().map(vertex).collect();
        let xs: Vec<f32> = points.iter().map(|p| p.x).collect();
        assert_eq!(xs, [7.5, 22.5, 37.5, 52.5, 67.5, 82.5]);
        // Second trace starts at channel 1's last bin.
        assert!(points[3].y > points[4].y);
        assert_eq!(points[4].y, points[5].y);
        // Each trace ends on a straight segment.
        assert!(matches!(ops[2], PathOp::LineTo(_)));
        assert!(matches!(ops[3], PathOp::QuadTo { .. }));
        assert!(matches!(ops[5], PathOp::LineTo(_)));
    }

    fn vertex(op: &PathOp) -> Point {
        match *op {
            PathOp::MoveTo(p) | PathOp::LineTo(p) => p,
            PathOp::QuadTo { control, .. } => control,
        }
    }

    #[test]
    fn lines_replace_nan_with_baseline() {
        let data = [f32::NAN, 0.5];
        let frame = FrameView::from_contiguous(&data, 1, 2, 1.0);
        let ops = path(layout(&params(DrawStyle::Lines, 30.0, 100.0), frame));
        assert_eq!(ops[0], PathOp::MoveTo(Point::new(7.5, 100.0)));
    }

    #[test]
    fn never_reads_past_bar_count() {
        // Data holds exactly channels * bar_count values, so any index past
        // bar_count would panic on the slice.
        for bar_count in [0usize, 1, 4, 5, 40] {
            let data = vec![0.5f32; 2 * bar_count];
            let frame = FrameView::from_contiguous(&data, 2, bar_count, 1.0);
            for style in DrawStyle::ALL {
                let out = layout(&params(style, 60.0, 100.0), frame);
                // Styles that walk every channel can place two passes.
                let limit = match style {
                    DrawStyle::VerticalBars => bar_count,
                    DrawStyle::HorizontalBars | DrawStyle::Lines => 2 * bar_count,
                };
                assert!(out.len() <= limit.min(4));
            }
        }
    }
}
