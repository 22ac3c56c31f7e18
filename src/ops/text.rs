use ab_glyph::{Font, FontArc, GlyphId, ScaleFont, point};
use std::path::{Path, PathBuf};

use crate::canvas::{Point, Surface};
use crate::color::Color;
use crate::ops::paint::{CoverageMask, Paint};

/// Fonts tried, in order, when no usable `font_path` is configured.
#[cfg(target_os = "windows")]
const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    r"C:\Windows\Fonts\arial.ttf",
    r"C:\Windows\Fonts\segoeui.ttf",
    r"C:\Windows\Fonts\tahoma.ttf",
];
#[cfg(target_os = "macos")]
const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "/System/Library/Fonts/Helvetica.ttc",
    "/System/Library/Fonts/Geneva.ttf",
];
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/truetype/liberation2/LiberationSans-Regular.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/freefont/FreeSans.ttf",
    "/usr/share/fonts/noto/NotoSans-Regular.ttf",
    "/usr/share/fonts/truetype/noto/NotoSans-Regular.ttf",
];

#[derive(Debug)]
pub enum TextError {
    /// No configured or system font could be loaded.
    NoFont { tried: Vec<PathBuf> },
}

impl std::fmt::Display for TextError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TextError::NoFont { tried } => {
                write!(f, "no usable font found (tried {} paths)", tried.len())
            }
        }
    }
}

impl std::error::Error for TextError {}

/// Load `preferred` if given and readable, else the first system font that parses.
pub fn load_font(preferred: Option<&Path>) -> Result<FontArc, TextError> {
    let mut tried = Vec::new();
    let candidates = preferred
        .map(Path::to_path_buf)
        .into_iter()
        .chain(SYSTEM_FONT_CANDIDATES.iter().map(PathBuf::from));
    for path in candidates {
        match std::fs::read(&path).map(FontArc::try_from_vec) {
            Ok(Ok(font)) => {
                log_info!("Loaded font {}", path.display());
                return Ok(font);
            }
            Ok(Err(e)) => {
                log_warn!("Font {} is not usable: {}", path.display(), e);
            }
            Err(_) => {}
        }
        tried.push(path);
    }
    Err(TextError::NoFont { tried })
}

/// Lay out text left-aligned with its top edge at y = 0. Lines split on `\n`
/// and advance by the font's line height.
/// Returns `(glyphs, width, height)`.
pub fn layout_text(font: &FontArc, text: &str, font_size: f32) -> (Vec<(GlyphId, f32, f32)>, f32, f32) {
    let scaled = font.as_scaled(font_size);
    let ascent = scaled.ascent();
    let line_height = scaled.height() + scaled.line_gap();

    let mut glyphs = Vec::new();
    let mut max_width = 0.0f32;
    let mut lines = 0usize;
    for (line_idx, line) in text.split('\n').enumerate() {
        let baseline = ascent + line_idx as f32 * line_height;
        let mut cursor_x = 0.0f32;
        let mut last_glyph: Option<GlyphId> = None;
        for ch in line.chars().filter(|c| *c != '\r') {
            let glyph_id = font.glyph_id(ch);
            if let Some(prev) = last_glyph {
                cursor_x += scaled.kern(prev, glyph_id);
            }
            glyphs.push((glyph_id, cursor_x, baseline));
            cursor_x += scaled.h_advance(glyph_id);
            last_glyph = Some(glyph_id);
        }
        max_width = max_width.max(cursor_x);
        lines = line_idx + 1;
    }
    (glyphs, max_width, lines as f32 * line_height)
}

/// Rasterize `text` into a coverage mask with its top-left corner at `origin`,
/// clipped to the canvas. `None` when nothing visible remains.
pub fn rasterize_text(
    font: &FontArc,
    text: &str,
    font_size: f32,
    origin: Point,
    canvas_w: u32,
    canvas_h: u32,
) -> Option<CoverageMask> {
    let (glyphs, _, _) = layout_text(font, text, font_size);
    let outlined: Vec<_> = glyphs
        .iter()
        .filter_map(|&(id, gx, gy)| {
            font.outline_glyph(id.with_scale_and_position(font_size, point(origin.x + gx, origin.y + gy)))
        })
        .collect();
    if outlined.is_empty() {
        return None;
    }

    let mut min_x = f32::MAX;
    let mut min_y = f32::MAX;
    let mut max_x = f32::MIN;
    let mut max_y = f32::MIN;
    for g in &outlined {
        let b = g.px_bounds();
        min_x = min_x.min(b.min.x);
        min_y = min_y.min(b.min.y);
        max_x = max_x.max(b.max.x);
        max_y = max_y.max(b.max.y);
    }

    // Clamp to canvas
    let x0 = (min_x.floor() as i64).max(0);
    let y0 = (min_y.floor() as i64).max(0);
    let x1 = (max_x.ceil() as i64).min(canvas_w as i64);
    let y1 = (max_y.ceil() as i64).min(canvas_h as i64);
    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    let buf_w = (x1 - x0) as usize;
    let buf_h = (y1 - y0) as usize;
    let mut coverage = vec![0.0f32; buf_w * buf_h];

    for g in &outlined {
        let b = g.px_bounds();
        let gx0 = b.min.x as i64;
        let gy0 = b.min.y as i64;
        g.draw(|px, py, cov| {
            let ix = gx0 + px as i64 - x0;
            let iy = gy0 + py as i64 - y0;
            if ix >= 0 && iy >= 0 && (ix as usize) < buf_w && (iy as usize) < buf_h {
                let idx = iy as usize * buf_w + ix as usize;
                coverage[idx] = coverage[idx].max(cov.min(1.0));
            }
        });
    }

    CoverageMask::from_parts(x0 as u32, y0 as u32, buf_w as u32, buf_h as u32, coverage)
}

/// Draw `text` in `color` with its top-left corner at `anchor`.
/// Returns `false` if nothing was painted.
pub fn draw_text(surface: &mut Surface, font: &FontArc, text: &str, font_size: f32, color: Color, anchor: Point) -> bool {
    let (w, h) = (surface.width(), surface.height());
    match rasterize_text(font, text, font_size, anchor, w, h) {
        Some(mask) => {
            mask.composite(surface.pixels_mut(), &Paint::solid(color));
            true
        }
        None => false,
    }
}
