use serde::{Deserialize, Serialize};

use crate::canvas::Point;
use crate::color::Color;
use crate::ops::paint::{BlendMode, Paint};
use crate::ops::shapes::{ShapeKind, ShapeStyle};

pub const MIN_BRUSH_SIZE: f32 = 1.0;
pub const MAX_BRUSH_SIZE: f32 = 200.0;
pub const DEFAULT_BRUSH_SIZE: f32 = 5.0;

/// What a primary-button drag on the surface does. Exactly one mode is active.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolMode {
    #[default]
    Freehand,
    Erase,
    Text,
    Shape,
}

impl ToolMode {
    /// Short tool label shown next to the toolbar.
    pub fn label(&self) -> &'static str {
        match self {
            ToolMode::Freehand => "Pen",
            ToolMode::Erase => "Eraser",
            ToolMode::Text => "Text",
            ToolMode::Shape => "Shape",
        }
    }
}

/// Freehand brush style.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrushKind {
    #[default]
    Pen,
    Pencil,
    Marker,
    Spray,
    Calligraphy,
}

impl BrushKind {
    pub fn label(&self) -> &'static str {
        match self {
            BrushKind::Pen => "Pen",
            BrushKind::Pencil => "Pencil",
            BrushKind::Marker => "Marker",
            BrushKind::Spray => "Spray",
            BrushKind::Calligraphy => "Calligraphy",
        }
    }

    pub fn all() -> &'static [BrushKind] {
        &[
            BrushKind::Pen,
            BrushKind::Pencil,
            BrushKind::Marker,
            BrushKind::Spray,
            BrushKind::Calligraphy,
        ]
    }

    /// Global opacity and blend for strokes of this brush.
    pub fn composite(&self) -> (f32, BlendMode) {
        match self {
            BrushKind::Pencil => (0.75, BlendMode::Multiply),
            BrushKind::Marker => (0.25, BlendMode::Normal),
            BrushKind::Pen | BrushKind::Spray | BrushKind::Calligraphy => (1.0, BlendMode::Normal),
        }
    }
}

/// Brush sizes outside the slider range are clamped; non-finite ones reset.
pub fn clamp_brush_size(size: f32) -> f32 {
    if size.is_finite() {
        size.clamp(MIN_BRUSH_SIZE, MAX_BRUSH_SIZE)
    } else {
        DEFAULT_BRUSH_SIZE
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ToolProperties {
    pub size: f32,
    pub color: Color,
    pub background: Color,
    pub brush: BrushKind,
    /// Fill closed shapes with the stroke color.
    pub fill: bool,
    /// Scale width by reported pointer pressure.
    pub pressure: bool,
    /// Quadratic midpoint smoothing for pen-like brushes.
    pub smoothing: bool,
    pub grid: bool,
}

impl Default for ToolProperties {
    fn default() -> Self {
        Self {
            size: DEFAULT_BRUSH_SIZE,
            color: Color::BLACK,
            background: Color::WHITE,
            brush: BrushKind::Pen,
            fill: false,
            pressure: false,
            smoothing: true,
            grid: false,
        }
    }
}

// ============================================================================
// TOOL STATE
// ============================================================================

#[derive(Clone, Debug, Default)]
pub struct ToolState {
    mode: ToolMode,
    shape_kind: ShapeKind,
    /// Mode restored when text entry ends.
    text_return: ToolMode,
    pub properties: ToolProperties,
}

impl ToolState {
    pub fn new(properties: ToolProperties) -> Self {
        Self {
            properties,
            ..Default::default()
        }
    }

    pub fn mode(&self) -> ToolMode {
        self.mode
    }

    pub fn shape_kind(&self) -> ShapeKind {
        self.shape_kind
    }

    pub fn label(&self) -> &'static str {
        self.mode.label()
    }

    pub fn is_erasing(&self) -> bool {
        self.mode == ToolMode::Erase
    }

    pub fn set_size(&mut self, size: f32) {
        self.properties.size = clamp_brush_size(size);
    }

    pub fn set_color(&mut self, color: Color) {
        self.properties.color = color;
    }

    pub fn set_background(&mut self, color: Color) {
        self.properties.background = color;
    }

    pub fn set_brush(&mut self, brush: BrushKind) {
        self.properties.brush = brush;
    }

    pub fn set_fill(&mut self, fill: bool) {
        self.properties.fill = fill;
    }

    pub fn set_pressure(&mut self, pressure: bool) {
        self.properties.pressure = pressure;
    }

    pub fn set_smoothing(&mut self, smoothing: bool) {
        self.properties.smoothing = smoothing;
    }

    pub fn set_grid(&mut self, grid: bool) {
        self.properties.grid = grid;
    }

    pub fn select_pen(&mut self) {
        self.mode = ToolMode::Freehand;
    }

    pub fn select_eraser(&mut self) {
        self.mode = ToolMode::Erase;
    }

    pub fn select_text(&mut self) {
        self.text_return = match self.mode {
            ToolMode::Shape => ToolMode::Shape,
            ToolMode::Text => self.text_return,
            ToolMode::Freehand | ToolMode::Erase => ToolMode::Freehand,
        };
        self.mode = ToolMode::Text;
    }

    /// `None` is the "free" entry of the shape picker: freehand drawing. It
    /// leaves the eraser active if it already was.
    pub fn select_shape(&mut self, kind: Option<ShapeKind>) {
        match kind {
            Some(kind) => {
                self.shape_kind = kind;
                self.mode = ToolMode::Shape;
            }
            None => {
                if self.mode != ToolMode::Erase {
                    self.mode = ToolMode::Freehand;
                }
            }
        }
    }

    /// Return from text mode to the mode it was entered from (never the eraser).
    pub fn leave_text_mode(&mut self) {
        if self.mode == ToolMode::Text {
            self.mode = self.text_return;
        }
    }

    /// Stroke width for a sample with the given pointer pressure.
    pub fn effective_width(&self, pressure: Option<f32>) -> f32 {
        match pressure {
            Some(p) if self.properties.pressure && p > 0.0 => (self.properties.size * p).max(1.0),
            _ => self.properties.size,
        }
    }

    /// Paint for freehand strokes in the current mode.
    pub fn stroke_paint(&self) -> Paint {
        if self.is_erasing() {
            return Paint::solid(self.properties.background);
        }
        let (opacity, blend) = self.properties.brush.composite();
        Paint {
            color: self.properties.color,
            opacity,
            blend,
        }
    }

    pub fn shape_style(&self, width: f32) -> ShapeStyle {
        ShapeStyle {
            paint: self.stroke_paint(),
            width,
            fill: self.properties.fill,
        }
    }
}

// ============================================================================
// GESTURE: per-drag pointer tracking
// ============================================================================

/// Pointer state of one freehand drag, from pointer-down to pointer-up.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Gesture {
    pub last: Point,
    /// End of the previous smoothed curve piece.
    pub prev_mid: Point,
    /// Width used for the last sample.
    pub width: f32,
    pub moves: u32,
}

impl Gesture {
    pub fn new(start: Point, width: f32) -> Self {
        Self {
            last: start,
            prev_mid: start,
            width,
            moves: 0,
        }
    }

    pub fn advance(&mut self, to: Point, width: f32) {
        self.last = to;
        self.width = width;
        self.moves += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modes_are_exclusive() {
        let mut t = ToolState::default();
        assert_eq!(t.label(), "Pen");
        t.select_eraser();
        assert_eq!(t.label(), "Eraser");
        t.select_shape(Some(ShapeKind::Star));
        assert_eq!(t.mode(), ToolMode::Shape);
        assert!(!t.is_erasing());
        t.select_text();
        assert_eq!(t.label(), "Text");
        t.select_pen();
        assert_eq!(t.mode(), ToolMode::Freehand);
    }

    #[test]
    fn free_shape_keeps_eraser() {
        let mut t = ToolState::default();
        t.select_shape(Some(ShapeKind::Rect));
        t.select_shape(None);
        assert_eq!(t.mode(), ToolMode::Freehand);
        t.select_eraser();
        t.select_shape(None);
        assert_eq!(t.mode(), ToolMode::Erase);
    }

    #[test]
    fn text_mode_never_returns_to_eraser() {
        let mut t = ToolState::default();
        t.select_eraser();
        t.select_text();
        t.leave_text_mode();
        assert_eq!(t.mode(), ToolMode::Freehand);

        t.select_shape(Some(ShapeKind::Circle));
        t.select_text();
        t.leave_text_mode();
        assert_eq!(t.mode(), ToolMode::Shape);
        assert_eq!(t.shape_kind(), ShapeKind::Circle);
    }

    #[test]
    fn size_is_clamped() {
        let mut t = ToolState::default();
        t.set_size(0.0);
        assert_eq!(t.properties.size, MIN_BRUSH_SIZE);
        t.set_size(10_000.0);
        assert_eq!(t.properties.size, MAX_BRUSH_SIZE);
        t.set_size(f32::NAN);
        assert_eq!(t.properties.size, DEFAULT_BRUSH_SIZE);
    }

    #[test]
    fn pressure_scales_width_only_when_enabled() {
        let mut t = ToolState::default();
        t.set_size(10.0);
        assert_eq!(t.effective_width(Some(0.5)), 10.0);
        t.set_pressure(true);
        assert_eq!(t.effective_width(Some(0.5)), 5.0);
        assert_eq!(t.effective_width(Some(0.01)), 1.0);
        assert_eq!(t.effective_width(Some(0.0)), 10.0);
        assert_eq!(t.effective_width(None), 10.0);
    }

    #[test]
    fn eraser_paints_opaque_background() {
        let mut t = ToolState::default();
        t.set_brush(BrushKind::Marker);
        t.set_background(Color::rgb(1, 2, 3));
        assert_eq!(t.stroke_paint().opacity, 0.25);
        t.select_eraser();
        let paint = t.stroke_paint();
        assert_eq!(paint.color, Color::rgb(1, 2, 3));
        assert_eq!(paint.opacity, 1.0);
        assert_eq!(paint.blend, BlendMode::Normal);
    }
}
