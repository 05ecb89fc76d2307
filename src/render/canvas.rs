//! Canvas boundary and the painter that feeds layouts into it.

use super::layout::{BarSegment, Layout, PathOp, Point};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LineCap {
    #[default]
    Butt,
    Round,
    Square,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeStyle {
    pub line_width: f32,
    pub line_cap: LineCap,
    pub antialias: bool,
}

/// Minimal 2D path sink. Coordinates are surface units with the origin at the
/// top-left corner.
pub trait Canvas {
    fn set_stroke(&mut self, _style: StrokeStyle) {}

    fn move_to(&mut self, x: f32, y: f32);

    fn line_to(&mut self, x: f32, y: f32);

    fn curve_to(&mut self, c1: Point, c2: Point, to: Point);

    fn stroke(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrawOptions {
    pub offset_x: f32,
    pub offset_y: f32,
    /// Round y coordinates of bar ends to whole units.
    pub round: bool,
    /// Snap surface dimensions down to even values.
    pub even: bool,
    pub line_width: f32,
    pub line_cap: LineCap,
    pub antialias: bool,
}

impl Default for DrawOptions {
    fn default() -> Self {
        Self {
            offset_x: 0.0,
            offset_y: 0.0,
            round: false,
            even: false,
            line_width: 10.0,
            line_cap: LineCap::Butt,
            antialias: true,
        }
    }
}

impl DrawOptions {
    pub fn stroke_style(&self) -> StrokeStyle {
        StrokeStyle {
            line_width: self.line_width,
            line_cap: self.line_cap,
            antialias: self.antialias,
        }
    }
}

/// Applies [`DrawOptions`] while replaying a [`Layout`] onto a [`Canvas`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Painter {
    options: DrawOptions,
}

impl Painter {
    pub fn new(options: DrawOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &DrawOptions {
        &self.options
    }

    /// Surface dimensions to lay out against, after the even snap.
    pub fn surface_size(&self, width: f32, height: f32) -> (f32, f32) {
        if self.options.even {
            (even(width), even(height))
        } else {
            (width, height)
        }
    }

    pub fn paint(&self, layout: &Layout, canvas: &mut dyn Canvas) {
        canvas.set_stroke(self.options.stroke_style());
        match layout {
            Layout::Bars(segments) => self.paint_bars(segments, canvas),
            Layout::Path(ops) => self.paint_path(ops, canvas),
        }
    }

    fn offset(&self, point: Point) -> Point {
        Point::new(
            point.x + self.options.offset_x,
            point.y + self.options.offset_y,
        )
    }

    fn round(&self, value: f32) -> f32 {
        if self.options.round {
            value.round()
        } else {
            value
        }
    }

    fn paint_bars(&self, segments: &[BarSegment], canvas: &mut dyn Canvas) {
        for segment in segments {
            let from = self.offset(Point::new(segment.x, self.round(segment.y_from)));
            let to = self.offset(Point::new(segment.x, self.round(segment.y_to)));
            canvas.move_to(from.x, from.y);
            canvas.line_to(to.x, to.y);
            canvas.stroke();
        }
    }

    fn paint_path(&self, ops: &[PathOp], canvas: &mut dyn Canvas) {
        if ops.is_empty() {
            return;
        }

        let mut current: Option<Point> = None;
        for op in ops {
            match *op {
                PathOp::MoveTo(point) => {
                    let point = self.offset(point);
                    canvas.move_to(point.x, point.y);
                    current = Some(point);
                }
                PathOp::LineTo(point) => {
                    let point = self.offset(point);
                    canvas.line_to(point.x, point.y);
                    current = Some(point);
                }
                PathOp::QuadTo { control, to } => {
                    let control = self.offset(control);
                    let to = self.offset(to);
                    let start = current.unwrap_or_else(|| {
                        canvas.move_to(control.x, control.y);
                        control
                    });
                    let (c1, c2) = quad_to_cubic(start, control, to);
                    canvas.curve_to(c1, c2, to);
                    current = Some(to);
                }
            }
        }
        canvas.stroke();
    }
}

// Degree elevation: a quadratic (p0, p1, p2) is the cubic with controls two
// thirds of the way from each end toward p1.
fn quad_to_cubic(p0: Point, p1: Point, p2: Point) -> (Point, Point) {
    const T: f32 = 2.0 / 3.0;
    (
        Point::new(p0.x + T * (p1.x - p0.x), p0.y + T * (p1.y - p0.y)),
        Point::new(p2.x + T * (p1.x - p2.x), p2.y + T * (p1.y - p2.y)),
    )
}

fn even(value: f32) -> f32 {
    let whole = value.floor();
    if whole.rem_euclid(2.0) == 0.0 {
        whole
    } else {
        whole - 1.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CanvasOp {
    Stroke(StrokeStyle),
    MoveTo(Point),
    LineTo(Point),
    CurveTo { c1: Point, c2: Point, to: Point },
    StrokePath,
}

/// Canvas that records every call, for tests and inspection.
#[derive(Debug, Clone, Default)]
pub struct RecordingCanvas {
    ops: Vec<CanvasOp>,
}

impl RecordingCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> &[CanvasOp] {
        &self.ops
    }

    pub fn strokes(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, CanvasOp::StrokePath))
            .count()
    }

    pub fn clear(&mut self) {
        self.ops.clear();
    }
}

impl Canvas for RecordingCanvas {
    fn set_stroke(&mut self, style: StrokeStyle) {
        self.ops.push(CanvasOp::Stroke(style));
    }

    fn move_to(&mut self, x: f32, y: f32) {
        self.ops.push(CanvasOp::MoveTo(Point::new(x, y)));
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.ops.push(CanvasOp::LineTo(Point::new(x, y)));
    }

    fn curve_to(&mut self, c1: Point, c2: Point, to: Point) {
        self.ops.push(CanvasOp::CurveTo { c1, c2, to });
    }

    fn stroke(&mut self) {
        self.ops.push(CanvasOp::StrokePath);
    }
}

const CURVE_STEPS: usize = 8;

/// Character raster for terminals. Surface coordinates are mapped onto a
/// `columns` x `rows` grid.
#[derive(Debug, Clone)]
pub struct AsciiCanvas {
    columns: usize,
    rows: usize,
    x_scale: f32,
    y_scale: f32,
    cells: Vec<bool>,
    cursor: Option<Point>,
}

impl AsciiCanvas {
    pub fn new(columns: usize, rows: usize, width: f32, height: f32) -> Self {
        let ratio = |cells: usize, extent: f32| {
            if extent > 0.0 {
                cells as f32 / extent
            } else {
                0.0
            }
        };
        Self {
            columns,
            rows,
            x_scale: ratio(columns, width),
            y_scale: ratio(rows, height),
            cells: vec![false; columns * rows],
            cursor: None,
        }
    }

    pub fn clear(&mut self) {
        self.cells.fill(false);
        self.cursor = None;
    }

    pub fn is_blank(&self) -> bool {
        !self.cells.contains(&true)
    }

    pub fn render(&self) -> String {
        let mut out = String::with_capacity((self.columns + 1) * self.rows);
        for row in self.cells.chunks(self.columns.max(1)) {
            out.extend(row.iter().map(|&lit| if lit { '#' } else { ' ' }));
            out.push('\n');
        }
        out
    }

    fn plot(&mut self, point: Point) {
        let column = (point.x * self.x_scale).floor();
        let row = (point.y * self.y_scale).floor();
        if column < 0.0 || row < 0.0 {
            return;
        }
        let (column, row) = (column as usize, row as usize);
        if column < self.columns && row < self.rows {
            self.cells[row * self.columns + column] = true;
        }
    }

    fn segment(&mut self, from: Point, to: Point) {
        let dx = (to.x - from.x) * self.x_scale;
        let dy = (to.y - from.y) * self.y_scale;
        let steps = dx.abs().max(dy.abs()).ceil().max(1.0) as usize;
        for step in 0..=steps {
            let t = step as f32 / steps as f32;
            self.plot(Point::new(
                from.x + (to.x - from.x) * t,
                from.y + (to.y - from.y) * t,
            ));
        }
    }
}

impl Canvas for AsciiCanvas {
    fn move_to(&mut self, x: f32, y: f32) {
        self.cursor = Some(Point::new(x, y));
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let to = Point::new(x, y);
        let from = self.cursor.unwrap_or(to);
        self.segment(from, to);
        self.cursor = Some(to);
    }

    fn curve_to(&mut self, c1: Point, c2: Point, to: Point) {
        let p0 = self.cursor.unwrap_or(c1);
        let mut previous = p0;
        for step in 1..=CURVE_STEPS {
            let t = step as f32 / CURVE_STEPS as f32;
            let u = 1.0 - t;
            let blend = |a: f32, b: f32, c: f32, d: f32| {
                u * u * u * a + 3.0 * u * u * t * b + 3.0 * u * t * t * c + t * t * t * d
            };
            let point = Point::new(
                blend(p0.x, c1.x, c2.x, to.x),
                blend(p0.y, c1.y, c2.y, to.y),
            );
            self.segment(previous, point);
            previous = point;
        }
        self.cursor = Some(to);
    }

    fn stroke(&mut self) {
        self.cursor = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bars_become_one_stroke_each() {
        let layout = Layout::Bars(vec![
            BarSegment {
                x: 5.0,
                y_from: 10.4,
                y_to: 90.6,
            },
            BarSegment {
                x: 20.0,
                y_from: 30.0,
                y_to: 70.0,
            },
        ]);
        let painter = Painter::new(DrawOptions {
            offset_x: 1.0,
            offset_y: -2.0,
            round: true,
            ..DrawOptions::default()
        });
        let mut canvas = RecordingCanvas::new();
        painter.paint(&layout, &mut canvas);

        assert_eq!(canvas.strokes(), 2);
        assert_eq!(canvas.ops()[1], CanvasOp::MoveTo(Point::new(6.0, 8.0)));
        assert_eq!(canvas.ops()[2], CanvasOp::LineTo(Point::new(6.0, 89.0)));
    }

    #[test]
    fn quads_are_elevated_to_cubics() {
        let layout = Layout::Path(vec![
            PathOp::MoveTo(Point::new(0.0, 0.0)),
            PathOp::QuadTo {
                control: Point::new(3.0, 3.0),
                to: Point::new(6.0, 0.0),
            },
            PathOp::LineTo(Point::new(9.0, 0.0)),
        ]);
        let mut canvas = RecordingCanvas::new();
        Painter::default().paint(&layout, &mut canvas);

        let CanvasOp::CurveTo { c1, c2, to } = canvas.ops()[2] else {
            panic!("expected curve, got {:?}", canvas.ops()[2]);
        };
        assert_eq!(c1, Point::new(2.0, 2.0));
        assert_eq!(c2, Point::new(4.0, 2.0));
        assert_eq!(to, Point::new(6.0, 0.0));
        assert_eq!(canvas.strokes(), 1);
        assert_eq!(canvas.ops().last(), Some(&CanvasOp::StrokePath));
    }

    #[test]
    fn even_snap_rounds_down() {
        let painter = Painter::new(DrawOptions {
            even: true,
            ..DrawOptions::default()
        });
        assert_eq!(painter.surface_size(301.0, 120.5), (300.0, 120.0));
        assert_eq!(Painter::default().surface_size(301.0, 120.5), (301.0, 120.5));
    }

    #[test]
    fn ascii_canvas_draws_vertical_strokes() {
        let mut canvas = AsciiCanvas::new(4, 4, 40.0, 40.0);
        let layout = Layout::Bars(vec![BarSegment {
            x: 15.0,
            y_from: 0.0,
            y_to: 39.0,
        }]);
        Painter::default().paint(&layout, &mut canvas);
        assert_eq!(canvas.render(), " #  \n #  \n #  \n #  \n");

        canvas.clear();
        assert!(canvas.is_blank());
    }
}
