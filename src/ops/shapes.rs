use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::f32::consts::{FRAC_PI_6, PI};

use crate::canvas::{Point, Surface};
use crate::ops::paint::{Paint, Primitive, paint_primitives};

/// Arrow barb length in pixels.
const ARROW_HEAD_LEN: f32 = 15.0;
const STAR_SPIKES: usize = 5;
/// Outer radius divided by inner radius.
const STAR_INNER_RATIO: f32 = 2.5;

/// Available shape primitives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    #[default]
    Line,
    Rect,
    Circle,
    Triangle,
    Arrow,
    Star,
}

impl ShapeKind {
    pub fn label(&self) -> &'static str {
        match self {
            ShapeKind::Line => "Line",
            ShapeKind::Rect => "Rectangle",
            ShapeKind::Circle => "Circle",
            ShapeKind::Triangle => "Triangle",
            ShapeKind::Arrow => "Arrow",
            ShapeKind::Star => "Star",
        }
    }

    pub fn all() -> &'static [ShapeKind] {
        &[
            ShapeKind::Line,
            ShapeKind::Rect,
            ShapeKind::Circle,
            ShapeKind::Triangle,
            ShapeKind::Arrow,
            ShapeKind::Star,
        ]
    }

    /// Whether the fill toggle has any effect on this shape.
    pub fn is_fillable(&self) -> bool {
        matches!(
            self,
            ShapeKind::Rect | ShapeKind::Circle | ShapeKind::Triangle | ShapeKind::Star
        )
    }
}

/// How a shape is painted.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShapeStyle {
    pub paint: Paint,
    /// Outline width in pixels.
    pub width: f32,
    pub fill: bool,
}

// ============================================================================
// GEOMETRY
// ============================================================================

/// Resolved outline of a shape dragged from `start` to `end`.
#[derive(Clone, Debug, PartialEq)]
pub enum ShapeGeometry {
    /// Open polyline pieces stroked together (line, arrow).
    Segments(Vec<(Point, Point)>),
    /// Closed polygon (rect, triangle, star).
    Polygon(Vec<Point>),
    Circle { center: Point, radius: f32 },
}

impl ShapeGeometry {
    pub fn build(kind: ShapeKind, start: Point, end: Point) -> Self {
        let (x1, y1, x2, y2) = (start.x, start.y, end.x, end.y);
        match kind {
            ShapeKind::Line => ShapeGeometry::Segments(vec![(start, end)]),
            ShapeKind::Rect => ShapeGeometry::Polygon(vec![
                Point::new(x1, y1),
                Point::new(x2, y1),
                Point::new(x2, y2),
                Point::new(x1, y2),
            ]),
            ShapeKind::Circle => ShapeGeometry::Circle {
                center: start,
                radius: start.distance(end),
            },
            ShapeKind::Triangle => ShapeGeometry::Polygon(vec![
                Point::new(x1, y2),
                Point::new((x1 + x2) / 2.0, y1),
                Point::new(x2, y2),
            ]),
            ShapeKind::Arrow => {
                let angle = (y2 - y1).atan2(x2 - x1);
                let barb = |a: f32| {
                    Point::new(x2 - ARROW_HEAD_LEN * a.cos(), y2 - ARROW_HEAD_LEN * a.sin())
                };
                ShapeGeometry::Segments(vec![
                    (start, end),
                    (end, barb(angle - FRAC_PI_6)),
                    (end, barb(angle + FRAC_PI_6)),
                ])
            }
            ShapeKind::Star => {
                let outer = start.distance(end);
                let inner = outer / STAR_INNER_RATIO;
                let step = PI / STAR_SPIKES as f32;
                let mut rot = PI / 2.0 * 3.0;
                let mut points = Vec::with_capacity(STAR_SPIKES * 2);
                for _ in 0..STAR_SPIKES {
                    points.push(Point::new(x1 + rot.cos() * outer, y1 + rot.sin() * outer));
                    rot += step;
                    points.push(Point::new(x1 + rot.cos() * inner, y1 + rot.sin() * inner));
                    rot += step;
                }
                ShapeGeometry::Polygon(points)
            }
        }
    }

    /// Interior coverage; empty for open shapes.
    pub fn fill_primitives(&self) -> Vec<Primitive> {
        match self {
            ShapeGeometry::Segments(_) => Vec::new(),
            ShapeGeometry::Polygon(points) => vec![Primitive::Polygon {
                points: points.clone(),
            }],
            ShapeGeometry::Circle { center, radius } => vec![Primitive::Disc {
                center: *center,
                radius: *radius,
            }],
        }
    }

    /// Outline stroked at `width` with round joins and caps.
    pub fn outline_primitives(&self, width: f32) -> Vec<Primitive> {
        let radius = width.max(1.0) * 0.5;
        match self {
            ShapeGeometry::Segments(segments) => segments
                .iter()
                .map(|&(a, b)| Primitive::Capsule { a, b, radius })
                .collect(),
            ShapeGeometry::Polygon(points) => {
                let n = points.len();
                (0..n)
                    .map(|i| Primitive::Capsule {
                        a: points[i],
                        b: points[(i + 1) % n],
                        radius,
                    })
                    .collect()
            }
            ShapeGeometry::Circle { center, radius: r } => vec![Primitive::Ring {
                center: *center,
                radius: *r,
                width: width.max(1.0),
            }],
        }
    }
}

/// Render a shape onto `target`: optional fill first, then the outline.
pub fn draw_shape(target: &mut RgbaImage, kind: ShapeKind, start: Point, end: Point, style: &ShapeStyle) {
    let geometry = ShapeGeometry::build(kind, start, end);
    if style.fill && kind.is_fillable() {
        paint_primitives(target, &geometry.fill_primitives(), &style.paint);
    }
    paint_primitives(target, &geometry.outline_primitives(style.width), &style.paint);
}

// ============================================================================
// PREVIEW: capture, restore + redraw per move, commit on release
// ============================================================================

/// Live shape preview. While dragging, every update restores the pre-drag
/// pixels before drawing, so only the latest shape is ever visible.
#[derive(Default)]
pub enum ShapePreview {
    #[default]
    Idle,
    Dragging { start: Point, snapshot: RgbaImage },
}

impl ShapePreview {
    pub fn is_active(&self) -> bool {
        matches!(self, ShapePreview::Dragging { .. })
    }

    pub fn begin(&mut self, surface: &Surface, start: Point) {
        *self = ShapePreview::Dragging {
            start,
            snapshot: surface.capture(),
        };
    }

    /// Redraw the preview for the current pointer position.
    pub fn update(&mut self, surface: &mut Surface, kind: ShapeKind, end: Point, style: &ShapeStyle) {
        if let ShapePreview::Dragging { start, snapshot } = self {
            surface.restore(snapshot);
            draw_shape(surface.pixels_mut(), kind, *start, end, style);
        }
    }

    /// Draw the final shape and return to idle. Returns `false` if no drag was
    /// in progress; the caller records history only on `true`.
    pub fn finish(&mut self, surface: &mut Surface, kind: ShapeKind, end: Point, style: &ShapeStyle) -> bool {
        match std::mem::take(self) {
            ShapePreview::Dragging { start, snapshot } => {
                surface.restore(&snapshot);
                draw_shape(surface.pixels_mut(), kind, start, end, style);
                true
            }
            ShapePreview::Idle => false,
        }
    }
}
