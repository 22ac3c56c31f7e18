use std::f32::consts::{FRAC_PI_6, TAU};

use crate::canvas::{Point, Surface};
use crate::components::tools::{BrushKind, Gesture, ToolState};
use crate::ops::paint::{Paint, Primitive, paint_primitives};

/// Maximum pixel length of one flattened piece of a smoothed curve.
const CURVE_STEP_PX: f32 = 2.0;
const MAX_CURVE_PIECES: usize = 256;

/// Everything that decides how a freehand stroke looks, fixed at pointer-down.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StrokeStyle {
    pub brush: BrushKind,
    pub paint: Paint,
    pub smoothing: bool,
}

impl StrokeStyle {
    /// Erasing always uses the pen path in the background color.
    pub fn from_tools(tools: &ToolState) -> Self {
        let brush = if tools.is_erasing() {
            BrushKind::Pen
        } else {
            tools.properties.brush
        };
        Self {
            brush,
            paint: tools.stroke_paint(),
            smoothing: tools.properties.smoothing,
        }
    }

    fn is_pen_like(&self) -> bool {
        matches!(self.brush, BrushKind::Pen | BrushKind::Pencil | BrushKind::Marker)
    }
}

// ============================================================================
// STROKE RENDERER
// ============================================================================

/// Draws one freehand stroke incrementally. Each pointer sample is
/// rasterized into a single coverage mask and composited once, so
/// translucent brushes never darken where their own pieces overlap.
#[derive(Default)]
pub struct StrokeRenderer {
    gesture: Option<Gesture>,
    style: Option<StrokeStyle>,
    /// Advances once per spray burst; seeds the scatter pattern.
    spray_counter: u32,
}

impl StrokeRenderer {
    pub fn is_active(&self) -> bool {
        self.gesture.is_some()
    }

    /// Pointer-down. `width` is the unscaled brush size.
    pub fn begin(&mut self, surface: &mut Surface, at: Point, width: f32, style: StrokeStyle) {
        match style.brush {
            BrushKind::Spray => self.spray_at(surface, at, width * 0.5, &style.paint),
            BrushKind::Calligraphy => {
                calligraphy_stamp(surface, at, Point::new(at.x + 0.01, at.y + 0.01), width, &style.paint)
            }
            _ => {}
        }
        self.gesture = Some(Gesture::new(at, width));
        self.style = Some(style);
    }

    /// Pointer-move with the (possibly pressure-scaled) width of this sample.
    pub fn extend(&mut self, surface: &mut Surface, to: Point, width: f32) {
        let (Some(mut gesture), Some(style)) = (self.gesture, self.style) else {
            return;
        };
        match style.brush {
            BrushKind::Spray => self.spray_at(surface, to, width * 0.5, &style.paint),
            BrushKind::Calligraphy => calligraphy_stamp(surface, gesture.last, to, width, &style.paint),
            _ if style.smoothing => {
                let mid = gesture.last.midpoint(to);
                let prims = quadratic_capsules(gesture.prev_mid, gesture.last, mid, width * 0.5);
                paint_primitives(surface.pixels_mut(), &prims, &style.paint);
                gesture.prev_mid = mid;
            }
            _ => {
                let prims = [Primitive::Capsule {
                    a: gesture.last,
                    b: to,
                    radius: width * 0.5,
                }];
                paint_primitives(surface.pixels_mut(), &prims, &style.paint);
                gesture.prev_mid = to;
            }
        }
        gesture.advance(to, width);
        self.gesture = Some(gesture);
    }

    /// Pointer-up or cancel. Processes a trailing position, closes the path
    /// and ends the gesture. Returns `false` if no stroke was in progress.
    pub fn finish(&mut self, surface: &mut Surface, at: Option<Point>) -> bool {
        let Some(gesture) = self.gesture else {
            return false;
        };
        if let Some(at) = at
            && at != gesture.last
        {
            self.extend(surface, at, gesture.width);
        }
        if let (Some(gesture), Some(style)) = (self.gesture, self.style)
            && style.is_pen_like()
            && (style.smoothing || gesture.moves == 0)
        {
            let prims = [Primitive::Capsule {
                a: gesture.prev_mid,
                b: gesture.last,
                radius: gesture.width * 0.5,
            }];
            paint_primitives(surface.pixels_mut(), &prims, &style.paint);
        }
        self.gesture = None;
        self.style = None;
        true
    }

    fn spray_at(&mut self, surface: &mut Surface, center: Point, radius: f32, paint: &Paint) {
        self.spray_counter = self.spray_counter.wrapping_add(1);
        let prims = spray_pixels(center, radius, self.spray_counter);
        paint_primitives(surface.pixels_mut(), &prims, &Paint { opacity: 1.0, ..*paint });
    }
}

// ============================================================================
// BRUSH GEOMETRY
// ============================================================================

/// Flatten the quadratic curve `from → (control) → to` into round-capped pieces.
fn quadratic_capsules(from: Point, control: Point, to: Point, radius: f32) -> Vec<Primitive> {
    let approx_len = from.distance(control) + control.distance(to);
    let pieces = ((approx_len / CURVE_STEP_PX).ceil() as usize).clamp(1, MAX_CURVE_PIECES);
    let at = |t: f32| {
        let u = 1.0 - t;
        Point::new(
            u * u * from.x + 2.0 * u * t * control.x + t * t * to.x,
            u * u * from.y + 2.0 * u * t * control.y + t * t * to.y,
        )
    };
    let mut prims = Vec::with_capacity(pieces);
    let mut prev = from;
    for i in 1..=pieces {
        let next = at(i as f32 / pieces as f32);
        prims.push(Primitive::Capsule { a: prev, b: next, radius });
        prev = next;
    }
    prims
}

/// Cheap deterministic hash → u32. Same position and counter always give the
/// same scatter, which keeps replays reproducible.
#[inline]
fn stamp_hash(x: f32, y: f32, counter: u32) -> u32 {
    let ix = (x * 100.0) as i32 as u32;
    let iy = (y * 100.0) as i32 as u32;
    let mut h = ix
        .wrapping_mul(374761393)
        .wrapping_add(iy.wrapping_mul(668265263))
        .wrapping_add(counter.wrapping_mul(1013904223));
    h ^= h >> 13;
    h = h.wrapping_mul(1274126177);
    h ^= h >> 16;
    h
}

#[inline]
fn unit(h: u32) -> f32 {
    (h >> 8) as f32 / (1u32 << 24) as f32
}

/// `max(8, round(1.5 r))` single pixels scattered uniformly in angle and
/// radius around `center`.
fn spray_pixels(center: Point, radius: f32, counter: u32) -> Vec<Primitive> {
    let radius = radius.max(0.0);
    let density = ((radius * 1.5).round() as usize).max(8);
    (0..density)
        .map(|i| {
            let seed = counter.wrapping_mul(7919).wrapping_add((i as u32).wrapping_mul(2));
            let angle = unit(stamp_hash(center.x, center.y, seed)) * TAU;
            let r = unit(stamp_hash(center.x, center.y, seed.wrapping_add(1))) * radius;
            Primitive::Pixel {
                x: (center.x + angle.cos() * r).floor() as i32,
                y: (center.y + angle.sin() * r).floor() as i32,
            }
        })
        .collect()
}

/// Rotated ellipses every ~2 px from `from` to `to`, the nib held at -30°.
fn calligraphy_ellipses(from: Point, to: Point, width: f32) -> Vec<Primitive> {
    let dist = from.distance(to);
    if dist == 0.0 {
        return Vec::new();
    }
    let steps = ((dist / 2.0).floor() as usize).clamp(1, MAX_CURVE_PIECES);
    let rotation = (to.y - from.y).atan2(to.x - from.x) - FRAC_PI_6;
    let rx = width * 0.5;
    let ry = (width * 0.35).max(2.0) * 0.5;
    (0..=steps)
        .map(|i| Primitive::Ellipse {
            center: from.lerp(to, i as f32 / steps as f32),
            rx,
            ry,
            rotation,
        })
        .collect()
}

fn calligraphy_stamp(surface: &mut Surface, from: Point, to: Point, width: f32, paint: &Paint) {
    let prims = calligraphy_ellipses(from, to, width);
    paint_primitives(surface.pixels_mut(), &prims, &Paint { opacity: 1.0, ..*paint });
}
