use crate::canvas::Surface;
use crate::color::Color;
use crate::components::history::HistoryManager;
use crate::io::{self, CodecError, LoadedProject, ProjectDocument};

/// Single open drawing: the surface and its undo history.
pub struct Project {
    pub surface: Surface,
    pub history: HistoryManager,
}

impl Project {
    /// A fresh drawing filled with `background`, with the history baseline
    /// taken from that blank state.
    pub fn new(width: u32, height: u32, background: Color, max_undo_steps: usize) -> Self {
        let surface = Surface::new(width, height, background);
        let mut history = HistoryManager::new(max_undo_steps);
        history.reset(&surface);
        Self { surface, history }
    }

    /// Commit the current surface as one undoable edit.
    pub fn record(&mut self, description: &str) {
        self.history.record(&self.surface, description);
    }

    pub fn undo(&mut self) -> bool {
        self.history.undo(&mut self.surface)
    }

    pub fn redo(&mut self) -> bool {
        self.history.redo(&mut self.surface)
    }

    /// Replace the content with a validated project: background fill, then the
    /// image stretched over the whole surface. Records one history entry.
    pub fn apply_loaded(&mut self, loaded: &LoadedProject) {
        self.surface.clear(loaded.background);
        self.surface.draw_image_stretched(&loaded.image);
        self.record("Load Project");
    }

    /// Draw an imported picture fitted and centered. Records one history entry.
    pub fn import_image(&mut self, image: &image::RgbaImage) -> Option<(i64, i64, u32, u32)> {
        let placed = self.surface.draw_image_fit(image)?;
        self.record("Import Image");
        Some(placed)
    }

    pub fn to_document(&self, background: Color) -> Result<ProjectDocument, CodecError> {
        io::build_project(self.surface.pixels(), background)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn new_project_has_nothing_to_undo() {
        let p = Project::new(10, 10, Color::WHITE, 60);
        assert!(!p.history.can_undo());
        assert_eq!(p.surface.pixel(5, 5), Color::WHITE);
    }

    #[test]
    fn import_is_undoable() {
        let mut p = Project::new(20, 10, Color::WHITE, 60);
        let img = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 255, 255]));
        assert_eq!(p.import_image(&img), Some((5, 0, 10, 10)));
        assert_eq!(p.surface.pixel(10, 5), Color::rgb(0, 0, 255));
        assert!(p.undo());
        assert_eq!(p.surface.pixel(10, 5), Color::WHITE);
        assert!(p.redo());
        assert_eq!(p.surface.pixel(10, 5), Color::rgb(0, 0, 255));
    }

    #[test]
    fn loaded_project_fills_background_then_stretches() {
        let mut p = Project::new(8, 8, Color::WHITE, 60);
        let mut image = RgbaImage::new(4, 4);
        for (x, y) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
            image.put_pixel(x, y, Rgba([255, 0, 0, 255]));
        }
        p.apply_loaded(&LoadedProject {
            background: Color::rgb(0, 255, 0),
            image,
        });
        assert_eq!(p.surface.pixel(0, 0), Color::rgb(255, 0, 0));
        assert_eq!(p.surface.pixel(7, 7), Color::rgb(0, 255, 0));
        assert_eq!(p.history.undo_count(), 1);
    }
}
