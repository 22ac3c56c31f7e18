use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::io;

/// A position in surface pixel coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f32 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    pub fn midpoint(self, other: Point) -> Point {
        Point::new((self.x + other.x) * 0.5, (self.y + other.y) * 0.5)
    }

    pub fn lerp(self, other: Point, t: f32) -> Point {
        Point::new(self.x + (other.x - self.x) * t, self.y + (other.y - self.y) * t)
    }
}

// ============================================================================
// SURFACE: the single raster target
// ============================================================================

/// The drawing surface: one RGBA buffer whose size follows the layout size.
pub struct Surface {
    pixels: RgbaImage,
    initialized: bool,
}

impl Surface {
    /// Create an initialized surface filled with `background`.
    pub fn new(width: u32, height: u32, background: Color) -> Self {
        let mut surface = Self::uninitialized();
        surface.resize(width, height, background);
        surface
    }

    /// A 1×1 placeholder; the first `resize` sets the real size and fills it.
    pub fn uninitialized() -> Self {
        Self {
            pixels: RgbaImage::new(1, 1),
            initialized: false,
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut RgbaImage {
        &mut self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> Color {
        Color(self.pixels.get_pixel(x, y).0)
    }

    /// Change the pixel dimensions, preserving content by a PNG round trip
    /// stretched to the new size. Sizes are clamped to at least 1.
    pub fn resize(&mut self, width: u32, height: u32, background: Color) {
        let width = width.max(1);
        let height = height.max(1);

        if !self.initialized {
            self.pixels = RgbaImage::from_pixel(width, height, background.to_rgba());
            self.initialized = true;
            log_info!("Surface initialized at {}x{}", width, height);
            return;
        }
        if width == self.width() && height == self.height() {
            return;
        }

        let preserved = io::encode_png(&self.pixels).and_then(|png| io::decode_image(&png));
        self.pixels = RgbaImage::from_pixel(width, height, background.to_rgba());
        match preserved {
            Ok(old) => self.draw_image_stretched(&old),
            Err(e) => {
                log_warn!("Resize to {}x{} dropped content: {}", width, height, e);
            }
        }
        log_info!("Surface resized to {}x{}", width, height);
    }

    /// Fill the whole buffer with `background`. History is the caller's job.
    pub fn clear(&mut self, background: Color) {
        let px = background.to_rgba();
        for p in self.pixels.pixels_mut() {
            *p = px;
        }
    }

    /// Fill with a new background and composite the existing content over it.
    pub fn refill_background(&mut self, background: Color) {
        let content = self.pixels.clone();
        self.clear(background);
        imageops::overlay(&mut self.pixels, &content, 0, 0);
    }

    /// Raw copy of the buffer (gesture-local, never encoded).
    pub fn capture(&self) -> RgbaImage {
        self.pixels.clone()
    }

    /// Replace the buffer with `image`, stretched if the size differs.
    pub fn restore(&mut self, image: &RgbaImage) {
        if image.dimensions() == self.pixels.dimensions() {
            self.pixels.copy_from_slice(image);
        } else {
            self.pixels = imageops::resize(image, self.width(), self.height(), FilterType::Triangle);
        }
    }

    /// Draw `image` over the full surface, stretched to fit exactly.
    pub fn draw_image_stretched(&mut self, image: &RgbaImage) {
        if image.dimensions() == self.pixels.dimensions() {
            imageops::overlay(&mut self.pixels, image, 0, 0);
        } else {
            let scaled = imageops::resize(image, self.width(), self.height(), FilterType::Triangle);
            imageops::overlay(&mut self.pixels, &scaled, 0, 0);
        }
    }

    /// Draw `image` scaled to fit inside the surface, preserving aspect ratio,
    /// centered. Returns the placed rectangle `(x, y, w, h)`.
    pub fn draw_image_fit(&mut self, image: &RgbaImage) -> Option<(i64, i64, u32, u32)> {
        let (iw, ih) = image.dimensions();
        if iw == 0 || ih == 0 {
            return None;
        }
        let (w, h) = (self.width() as f32, self.height() as f32);
        let scale = (w / iw as f32).min(h / ih as f32);
        let sw = ((iw as f32 * scale).round() as u32).max(1);
        let sh = ((ih as f32 * scale).round() as u32).max(1);
        let x = ((w - sw as f32) / 2.0).round() as i64;
        let y = ((h - sh as f32) / 2.0).round() as i64;
        let scaled = imageops::resize(image, sw, sh, FilterType::Triangle);
        imageops::overlay(&mut self.pixels, &scaled, x, y);
        Some((x, y, sw, sh))
    }

    /// Set one pixel (ignored outside the surface).
    pub fn put_pixel(&mut self, x: i64, y: i64, color: Color) {
        if x >= 0 && y >= 0 && (x as u32) < self.width() && (y as u32) < self.height() {
            self.pixels.put_pixel(x as u32, y as u32, Rgba(color.0));
        }
    }
}
