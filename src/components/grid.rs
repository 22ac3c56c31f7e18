use image::RgbaImage;
use rayon::prelude::*;

use crate::color::Color;
use crate::ops::paint::{BlendMode, blend_pixel};

pub const DEFAULT_GRID_GAP: u32 = 25;
/// rgba(0, 0, 0, 0.06)
pub const GRID_COLOR: Color = Color::rgba(0, 0, 0, 15);

/// Guide lines drawn on their own transparent image, never into the surface.
#[derive(Clone, Debug)]
pub struct GridOverlay {
    pub gap: u32,
    pub color: Color,
    image: Option<RgbaImage>,
}

impl Default for GridOverlay {
    fn default() -> Self {
        Self::new(DEFAULT_GRID_GAP)
    }
}

impl GridOverlay {
    pub fn new(gap: u32) -> Self {
        Self {
            gap: gap.max(2),
            color: GRID_COLOR,
            image: None,
        }
    }

    /// The current overlay, `None` when the grid is off.
    pub fn image(&self) -> Option<&RgbaImage> {
        self.image.as_ref()
    }

    /// Re-render for `width` × `height`, or clear when disabled.
    pub fn refresh(&mut self, enabled: bool, width: u32, height: u32) {
        self.image = enabled.then(|| render_grid(width, height, self.gap, self.color));
    }
}

/// 1-px lines on every column and row that is a multiple of `gap`. Columns
/// and rows are stroked as separate passes, so crossings are slightly darker.
pub fn render_grid(width: u32, height: u32, gap: u32, color: Color) -> RgbaImage {
    let gap = gap.max(2);
    let mut img = RgbaImage::new(width.max(1), height.max(1));
    let row_bytes = img.width() as usize * 4;
    let src = color.0;
    let raw: &mut [u8] = &mut img;
    raw.par_chunks_mut(row_bytes).enumerate().for_each(|(y, row)| {
        let on_row = (y as u32).is_multiple_of(gap);
        for (x, px) in row.chunks_exact_mut(4).enumerate() {
            if (x as u32).is_multiple_of(gap) {
                blend_pixel(px, src, 1.0, BlendMode::Normal);
            }
            if on_row {
                blend_pixel(px, src, 1.0, BlendMode::Normal);
            }
        }
    });
    img
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_fall_on_multiples_of_gap() {
        let img = render_grid(60, 60, 25, GRID_COLOR);
        assert_eq!(img.get_pixel(25, 10).0, [0, 0, 0, 15]);
        assert_eq!(img.get_pixel(10, 50).0, [0, 0, 0, 15]);
        assert_eq!(img.get_pixel(10, 10).0[3], 0);
        assert!(img.get_pixel(0, 0).0[3] > 15);
    }

    #[test]
    fn disabled_grid_has_no_image() {
        let mut g = GridOverlay::default();
        g.refresh(true, 30, 30);
        assert!(g.image().is_some());
        g.refresh(false, 30, 30);
        assert!(g.image().is_none());
    }
}
