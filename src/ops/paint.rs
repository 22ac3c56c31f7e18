use image::RgbaImage;
use rayon::prelude::*;

use crate::canvas::Point;
use crate::color::Color;

// ============================================================================
// PAINT: color + opacity + blend applied when compositing a coverage mask
// ============================================================================

/// How source pixels combine with the existing surface content.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum BlendMode {
    #[default]
    Normal,
    Multiply,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Paint {
    pub color: Color,
    /// Global opacity 0..1, multiplied with per-pixel coverage.
    pub opacity: f32,
    pub blend: BlendMode,
}

impl Paint {
    pub fn solid(color: Color) -> Self {
        Self {
            color,
            opacity: 1.0,
            blend: BlendMode::Normal,
        }
    }
}

/// Blend one straight-alpha source color into `dst` with the given effective alpha.
///
/// Uses the separable compositing formula: the blend result is mixed with the
/// source according to the backdrop alpha, then composited source-over.
#[inline]
pub fn blend_pixel(dst: &mut [u8], src: [u8; 4], alpha: f32, mode: BlendMode) {
    let sa = (src[3] as f32 / 255.0) * alpha.clamp(0.0, 1.0);
    if sa <= 0.0 {
        return;
    }
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    for c in 0..3 {
        let cs = src[c] as f32 / 255.0;
        let cb = dst[c] as f32 / 255.0;
        let blended = match mode {
            BlendMode::Normal => cs,
            BlendMode::Multiply => cs * cb,
        };
        let mixed = (1.0 - da) * cs + da * blended;
        let co = sa * mixed + da * (1.0 - sa) * cb;
        dst[c] = if out_a > 0.0 {
            ((co / out_a) * 255.0).round().clamp(0.0, 255.0) as u8
        } else {
            0
        };
    }
    dst[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
}

// ============================================================================
// SDF functions: return signed distance (negative = inside)
// ============================================================================

/// Distance from a point to the segment a→b. Degenerate segments act as points.
#[inline]
fn sdf_line_segment(px: f32, py: f32, ax: f32, ay: f32, bx: f32, by: f32) -> f32 {
    let dx = bx - ax;
    let dy = by - ay;
    let len2 = dx * dx + dy * dy;
    let t = if len2 > 1e-12 {
        (((px - ax) * dx + (py - ay) * dy) / len2).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let cx = ax + t * dx;
    let cy = ay + t * dy;
    ((px - cx) * (px - cx) + (py - cy) * (py - cy)).sqrt()
}

/// Signed distance to a simple polygon (convex or concave).
fn sdf_polygon(verts: &[Point], px: f32, py: f32) -> f32 {
    let n = verts.len();
    if n == 0 {
        return f32::MAX;
    }
    let mut d = (px - verts[0].x).powi(2) + (py - verts[0].y).powi(2);
    let mut s: f32 = 1.0;
    let mut j = n - 1;
    for i in 0..n {
        let ex = verts[j].x - verts[i].x;
        let ey = verts[j].y - verts[i].y;
        let wx = px - verts[i].x;
        let wy = py - verts[i].y;
        let len2 = ex * ex + ey * ey;
        let t = if len2 > 1e-12 {
            ((wx * ex + wy * ey) / len2).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let bx = wx - ex * t;
        let by = wy - ey * t;
        d = d.min(bx * bx + by * by);
        // Winding number contribution (crossing test)
        let c1 = py >= verts[i].y;
        let c2 = py < verts[j].y;
        let c3 = ex * wy > ey * wx;
        if (c1 && c2 && c3) || (!c1 && !c2 && !c3) {
            s = -s;
        }
        j = i;
    }
    s * d.sqrt()
}

/// SDF for an axis-aligned ellipse centred at origin (approximation).
#[inline]
fn sdf_ellipse(px: f32, py: f32, rx: f32, ry: f32) -> f32 {
    let nx = px / rx;
    let ny = py / ry;
    let len = (nx * nx + ny * ny).sqrt();
    if len < 1e-8 {
        return -rx.min(ry);
    }
    let scale = (rx * rx * ny * ny + ry * ry * nx * nx).sqrt() / (rx * ry * len);
    (len - 1.0) / scale
}

#[inline]
fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Anti-aliased coverage of a pixel whose centre has signed distance `d`.
#[inline]
fn coverage_from_distance(d: f32) -> f32 {
    smoothstep(0.5, -0.5, d)
}

// ============================================================================
// PRIMITIVES
// ============================================================================

/// One rasterizable element of a path. A mask is the max-coverage union of its
/// primitives, so overlapping pieces of one stroke never double-blend.
#[derive(Clone, Debug)]
pub enum Primitive {
    /// Round-capped thick segment.
    Capsule { a: Point, b: Point, radius: f32 },
    /// Filled polygon (non-self-intersecting).
    Polygon { points: Vec<Point> },
    /// Filled circle.
    Disc { center: Point, radius: f32 },
    /// Circle outline of the given total width.
    Ring { center: Point, radius: f32, width: f32 },
    /// Filled ellipse rotated by `rotation` radians.
    Ellipse { center: Point, rx: f32, ry: f32, rotation: f32 },
    /// A single fully covered pixel.
    Pixel { x: i32, y: i32 },
}

impl Primitive {
    /// Bounding box in canvas coordinates, padded for anti-aliasing.
    fn bounds(&self) -> (f32, f32, f32, f32) {
        const PAD: f32 = 1.0;
        match self {
            Primitive::Capsule { a, b, radius } => (
                a.x.min(b.x) - radius - PAD,
                a.y.min(b.y) - radius - PAD,
                a.x.max(b.x) + radius + PAD,
                a.y.max(b.y) + radius + PAD,
            ),
            Primitive::Polygon { points } => {
                let mut min_x = f32::MAX;
                let mut min_y = f32::MAX;
                let mut max_x = f32::MIN;
                let mut max_y = f32::MIN;
                for p in points {
                    min_x = min_x.min(p.x);
                    min_y = min_y.min(p.y);
                    max_x = max_x.max(p.x);
                    max_y = max_y.max(p.y);
                }
                (min_x - PAD, min_y - PAD, max_x + PAD, max_y + PAD)
            }
            Primitive::Disc { center, radius } => (
                center.x - radius - PAD,
                center.y - radius - PAD,
                center.x + radius + PAD,
                center.y + radius + PAD,
            ),
            Primitive::Ring { center, radius, width } => {
                let r = radius + width * 0.5 + PAD;
                (center.x - r, center.y - r, center.x + r, center.y + r)
            }
            Primitive::Ellipse { center, rx, ry, .. } => {
                let r = rx.max(*ry) + PAD;
                (center.x - r, center.y - r, center.x + r, center.y + r)
            }
            Primitive::Pixel { x, y } => (*x as f32, *y as f32, *x as f32 + 1.0, *y as f32 + 1.0),
        }
    }

    /// Coverage (0..1) at the pixel centre `(px, py)`.
    fn coverage(&self, px: f32, py: f32) -> f32 {
        match self {
            Primitive::Capsule { a, b, radius } => {
                coverage_from_distance(sdf_line_segment(px, py, a.x, a.y, b.x, b.y) - radius)
            }
            Primitive::Polygon { points } => coverage_from_distance(sdf_polygon(points, px, py)),
            Primitive::Disc { center, radius } => {
                let d = ((px - center.x).powi(2) + (py - center.y).powi(2)).sqrt() - radius;
                coverage_from_distance(d)
            }
            Primitive::Ring { center, radius, width } => {
                let dist = ((px - center.x).powi(2) + (py - center.y).powi(2)).sqrt();
                coverage_from_distance((dist - radius).abs() - width * 0.5)
            }
            Primitive::Ellipse { center, rx, ry, rotation } => {
                if *rx <= 0.0 || *ry <= 0.0 {
                    return 0.0;
                }
                // Inverse-rotate into ellipse-local space
                let (sin_r, cos_r) = rotation.sin_cos();
                let dx = px - center.x;
                let dy = py - center.y;
                let lx = dx * cos_r + dy * sin_r;
                let ly = -dx * sin_r + dy * cos_r;
                coverage_from_distance(sdf_ellipse(lx, ly, *rx, *ry))
            }
            Primitive::Pixel { x, y } => {
                if px.floor() as i32 == *x && py.floor() as i32 == *y {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }
}

// ============================================================================
// COVERAGE MASK
// ============================================================================

/// Per-pixel coverage over a clamped canvas rectangle.
#[derive(Clone, Debug)]
pub struct CoverageMask {
    pub x0: u32,
    pub y0: u32,
    pub width: u32,
    pub height: u32,
    data: Vec<f32>,
}

impl CoverageMask {
    /// Rasterize the union of `primitives`, clamped to a `canvas_w` × `canvas_h`
    /// surface. Returns `None` when nothing falls inside the canvas.
    pub fn rasterize(primitives: &[Primitive], canvas_w: u32, canvas_h: u32) -> Option<Self> {
        if primitives.is_empty() {
            return None;
        }
        let bounds: Vec<(f32, f32, f32, f32)> = primitives.iter().map(Primitive::bounds).collect();
        let mut min_x = f32::MAX;
        let mut min_y = f32::MAX;
        let mut max_x = f32::MIN;
        let mut max_y = f32::MIN;
        for b in &bounds {
            min_x = min_x.min(b.0);
            min_y = min_y.min(b.1);
            max_x = max_x.max(b.2);
            max_y = max_y.max(b.3);
        }
        if !(min_x.is_finite() && min_y.is_finite() && max_x.is_finite() && max_y.is_finite()) {
            return None;
        }

        // Clamp to canvas
        let x0 = (min_x.floor() as i64).max(0);
        let y0 = (min_y.floor() as i64).max(0);
        let x1 = (max_x.ceil() as i64).min(canvas_w as i64);
        let y1 = (max_y.ceil() as i64).min(canvas_h as i64);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        let width = (x1 - x0) as u32;
        let height = (y1 - y0) as u32;
        let mut data = vec![0.0f32; width as usize * height as usize];

        data.par_chunks_mut(width as usize)
            .enumerate()
            .for_each(|(row, row_buf)| {
                let py = (y0 + row as i64) as f32 + 0.5;
                for (col, cov) in row_buf.iter_mut().enumerate() {
                    let px = (x0 + col as i64) as f32 + 0.5;
                    for (prim, b) in primitives.iter().zip(&bounds) {
                        if px < b.0 || px > b.2 || py < b.1 || py > b.3 {
                            continue;
                        }
                        let c = prim.coverage(px, py);
                        if c > *cov {
                            *cov = c;
                            if *cov >= 1.0 {
                                break;
                            }
                        }
                    }
                }
            });

        Some(Self {
            x0: x0 as u32,
            y0: y0 as u32,
            width,
            height,
            data,
        })
    }

    /// Wrap precomputed row-major coverage. `data` must hold `width * height`
    /// values; anything else yields `None`.
    pub fn from_parts(x0: u32, y0: u32, width: u32, height: u32, data: Vec<f32>) -> Option<Self> {
        if width == 0 || height == 0 || data.len() != width as usize * height as usize {
            return None;
        }
        Some(Self {
            x0,
            y0,
            width,
            height,
            data,
        })
    }

    /// Coverage at canvas pixel `(x, y)`; zero outside the mask.
    pub fn get(&self, x: u32, y: u32) -> f32 {
        if x < self.x0 || y < self.y0 || x >= self.x0 + self.width || y >= self.y0 + self.height {
            return 0.0;
        }
        self.data[((y - self.y0) * self.width + (x - self.x0)) as usize]
    }

    /// Composite this mask onto `target` with `paint`.
    pub fn composite(&self, target: &mut RgbaImage, paint: &Paint) {
        let img_w = target.width() as usize;
        let row_bytes = img_w * 4;
        let src = paint.color.0;
        let opacity = paint.opacity;
        let blend = paint.blend;
        let x0 = self.x0 as usize;
        let mask_w = self.width as usize;
        let raw: &mut [u8] = target;

        raw.par_chunks_mut(row_bytes)
            .enumerate()
            .skip(self.y0 as usize)
            .take(self.height as usize)
            .for_each(|(y, row)| {
                let mask_row = &self.data[(y - self.y0 as usize) * mask_w..][..mask_w];
                for (i, &cov) in mask_row.iter().enumerate() {
                    if cov > 0.001 {
                        let idx = (x0 + i) * 4;
                        blend_pixel(&mut row[idx..idx + 4], src, cov * opacity, blend);
                    }
                }
            });
    }
}

/// Rasterize and composite in one step.
pub fn paint_primitives(target: &mut RgbaImage, primitives: &[Primitive], paint: &Paint) {
    if let Some(mask) = CoverageMask::rasterize(primitives, target.width(), target.height()) {
        mask.composite(target, paint);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn white(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba([255, 255, 255, 255]))
    }

    #[test]
    fn normal_blend_opaque_replaces() {
        let mut px = [255, 255, 255, 255];
        blend_pixel(&mut px, [10, 20, 30, 255], 1.0, BlendMode::Normal);
        assert_eq!(px, [10, 20, 30, 255]);
    }

    #[test]
    fn multiply_darkens_existing_color() {
        let mut px = [128, 128, 128, 255];
        blend_pixel(&mut px, [128, 255, 0, 255], 1.0, BlendMode::Multiply);
        assert_eq!(px[1], 128);
        assert!(px[0] < 128);
        assert_eq!(px[2], 0);
    }

    #[test]
    fn partial_alpha_mixes() {
        let mut px = [255, 255, 255, 255];
        blend_pixel(&mut px, [0, 0, 0, 255], 0.25, BlendMode::Normal);
        assert!((190..=192).contains(&px[0]), "got {}", px[0]);
        assert_eq!(px[3], 255);
    }

    #[test]
    fn capsule_covers_its_spine() {
        let prims = [Primitive::Capsule {
            a: Point::new(5.0, 10.0),
            b: Point::new(25.0, 10.0),
            radius: 2.0,
        }];
        let mask = CoverageMask::rasterize(&prims, 40, 20).unwrap();
        assert!(mask.get(15, 9) > 0.99);
        assert!(mask.get(15, 15) < 0.01);
    }

    #[test]
    fn overlapping_primitives_do_not_accumulate() {
        let mut img = white(20, 20);
        let prims = [
            Primitive::Disc { center: Point::new(10.0, 10.0), radius: 4.0 },
            Primitive::Disc { center: Point::new(10.5, 10.0), radius: 4.0 },
        ];
        let paint = Paint {
            color: Color::BLACK,
            opacity: 0.5,
            blend: BlendMode::Normal,
        };
        paint_primitives(&mut img, &prims, &paint);
        let v = img.get_pixel(10, 10)[0];
        assert!((126..=129).contains(&v), "got {}", v);
    }

    #[test]
    fn concave_polygon_leaves_notch_empty() {
        // "U" shape: the notch between the arms must stay uncovered
        let pts = vec![
            Point::new(0.0, 0.0),
            Point::new(4.0, 0.0),
            Point::new(4.0, 16.0),
            Point::new(12.0, 16.0),
            Point::new(12.0, 0.0),
            Point::new(16.0, 0.0),
            Point::new(16.0, 20.0),
            Point::new(0.0, 20.0),
        ];
        let mask = CoverageMask::rasterize(&[Primitive::Polygon { points: pts }], 20, 20).unwrap();
        assert!(mask.get(2, 8) > 0.99);
        assert!(mask.get(8, 8) < 0.01);
        assert!(mask.get(8, 18) > 0.99);
    }

    #[test]
    fn offscreen_primitives_produce_no_mask() {
        let prims = [Primitive::Disc { center: Point::new(-50.0, -50.0), radius: 3.0 }];
        assert!(CoverageMask::rasterize(&prims, 10, 10).is_none());
    }
}
