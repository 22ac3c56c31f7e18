use image::RgbaImage;
use image::imageops;
use serde::{Deserialize, Serialize};

use crate::canvas::{Point, Surface};
use crate::color::Color;
use crate::components::grid::GridOverlay;
use crate::components::history::HistoryManager;
use crate::components::text_entry::{CommitOutcome, TextInserter};
use crate::components::tools::{BrushKind, ToolMode, ToolState};
use crate::io;
use crate::ops::brush::{StrokeRenderer, StrokeStyle};
use crate::ops::shapes::{ShapeKind, ShapePreview};
use crate::project::Project;
use crate::settings::AppSettings;

pub const INVALID_PROJECT_MESSAGE: &str = "Invalid project file.";
pub const IMPORT_FAILED_MESSAGE: &str = "Could not import image.";
pub const EXPORT_FAILED_MESSAGE: &str = "Could not export image.";
pub const NO_FONT_MESSAGE: &str = "No font available for text.";

/// Pointer button that never starts a gesture (context menu).
const SECONDARY_BUTTON: u8 = 2;

// ============================================================================
// EVENTS & EFFECTS
// ============================================================================

/// Everything the host can tell the app. Tagged so that scripts can be
/// replayed from JSON: `{"type": "pointer_down", "x": 10, "y": 20}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    PointerDown {
        x: f32,
        y: f32,
        #[serde(default)]
        button: u8,
        #[serde(default)]
        pressure: Option<f32>,
    },
    PointerMove {
        x: f32,
        y: f32,
        #[serde(default)]
        pressure: Option<f32>,
    },
    PointerUp { x: f32, y: f32 },
    PointerCancel { x: f32, y: f32 },
    Key {
        key: String,
        #[serde(default)]
        ctrl: bool,
        #[serde(default)]
        meta: bool,
        #[serde(default)]
        shift: bool,
    },
    TextInput { text: String },
    TextKey {
        key: String,
        #[serde(default)]
        shift: bool,
    },
    TextBlur,
    SetSize { size: f32 },
    SetColor { color: Color },
    SetBackground { color: Color },
    SelectPen,
    SelectEraser,
    SelectText,
    /// `None` selects freehand drawing.
    SelectShape {
        #[serde(default)]
        shape: Option<ShapeKind>,
    },
    SetBrush { brush: BrushKind },
    SetFill { enabled: bool },
    SetPressure { enabled: bool },
    SetSmoothing { enabled: bool },
    SetGrid { enabled: bool },
    Clear,
    Undo,
    Redo,
    ExportImage,
    SaveProject,
    LoadProject { json: String },
    ImportImage { bytes: Vec<u8> },
    Resize { width: u32, height: u32 },
}

/// Everything the app asks the host to do.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Effect {
    Download {
        file_name: String,
        mime: String,
        #[serde(skip_serializing)]
        bytes: Vec<u8>,
    },
    Notify { message: String },
    ShowTextEntry { x: f32, y: f32, color: Color, size: f32 },
    HideTextEntry,
    EraserCursor { visible: bool, x: f32, y: f32, size: f32 },
    ToolChanged { label: String },
    HistoryChanged { can_undo: bool, can_redo: bool },
}

// ============================================================================
// APP
// ============================================================================

/// The drawing application: one project plus the interactive tool machinery.
pub struct App {
    project: Project,
    tools: ToolState,
    stroke: StrokeRenderer,
    shapes: ShapePreview,
    text: TextInserter,
    grid: GridOverlay,
    /// Last known pointer position (eraser cursor placement).
    cursor: Point,
    /// Width of the last pointer sample in the active gesture.
    gesture_width: f32,
}

impl App {
    /// Build the app with a surface of `width` × `height` filled with the
    /// configured background. The blank state is the first history baseline.
    pub fn new(settings: &AppSettings, width: u32, height: u32) -> Self {
        let tools = ToolState::new(settings.tool_properties());
        let project = Project::new(
            width,
            height,
            tools.properties.background,
            settings.max_undo_steps,
        );
        let mut grid = GridOverlay::new(settings.grid_gap);
        grid.refresh(tools.properties.grid, width, height);
        log_info!(
            "App initialized: {}x{}, {} undo steps",
            project.surface.width(),
            project.surface.height(),
            project.history.max_history_size()
        );
        let gesture_width = tools.properties.size;
        Self {
            project,
            tools,
            stroke: StrokeRenderer::default(),
            shapes: ShapePreview::default(),
            text: TextInserter::new(settings.font_path()),
            grid,
            cursor: Point::default(),
            gesture_width,
        }
    }

    pub fn surface(&self) -> &Surface {
        &self.project.surface
    }

    pub fn tools(&self) -> &ToolState {
        &self.tools
    }

    pub fn history(&self) -> &HistoryManager {
        &self.project.history
    }

    pub fn text_entry(&self) -> &TextInserter {
        &self.text
    }

    pub fn grid(&self) -> &GridOverlay {
        &self.grid
    }

    pub fn is_gesture_active(&self) -> bool {
        self.stroke.is_active() || self.shapes.is_active()
    }

    /// Surface with the grid overlay on top, for display only.
    pub fn composited(&self) -> RgbaImage {
        let mut out = self.project.surface.capture();
        if let Some(grid) = self.grid.image() {
            imageops::overlay(&mut out, grid, 0, 0);
        }
        out
    }

    /// Effects that bring a freshly attached host in sync.
    pub fn status_effects(&self) -> Vec<Effect> {
        vec![self.tool_changed(), self.history_changed()]
    }

    /// Dispatch one event.
    pub fn handle(&mut self, event: Event) -> Vec<Effect> {
        let mut fx = Vec::new();
        match event {
            Event::PointerDown {
                x,
                y,
                button,
                pressure: _,
            } => self.pointer_down(Point::new(x, y), button, &mut fx),
            Event::PointerMove { x, y, pressure } => {
                self.pointer_move(Point::new(x, y), pressure, &mut fx)
            }
            Event::PointerUp { x, y } | Event::PointerCancel { x, y } => {
                self.pointer_up(Point::new(x, y), &mut fx)
            }
            Event::Key {
                key,
                ctrl,
                meta,
                shift,
            } => self.shortcut(&key, ctrl || meta, shift, &mut fx),
            Event::TextInput { text } => self.text.set_text(&text),
            Event::TextKey { key, shift } => match key.as_str() {
                "Enter" if shift => self.text.insert_newline(),
                "Enter" => self.commit_text(&mut fx),
                "Escape" => self.cancel_text(&mut fx),
                _ => {}
            },
            Event::TextBlur => self.commit_text(&mut fx),
            Event::SetSize { size } => {
                self.tools.set_size(size);
                if self.tools.is_erasing() {
                    fx.push(self.eraser_cursor(true));
                }
            }
            Event::SetColor { color } => self.tools.set_color(color),
            Event::SetBackground { color } => self.set_background(color, &mut fx),
            Event::SelectPen => self.select_tool(&mut fx, |t| t.select_pen()),
            Event::SelectEraser => self.select_tool(&mut fx, |t| t.select_eraser()),
            Event::SelectText => {
                self.select_tool(&mut fx, |t| t.select_text());
                self.text.arm();
            }
            Event::SelectShape { shape } => self.select_tool(&mut fx, |t| t.select_shape(shape)),
            Event::SetBrush { brush } => self.tools.set_brush(brush),
            Event::SetFill { enabled } => self.tools.set_fill(enabled),
            Event::SetPressure { enabled } => self.tools.set_pressure(enabled),
            Event::SetSmoothing { enabled } => self.tools.set_smoothing(enabled),
            Event::SetGrid { enabled } => {
                self.tools.set_grid(enabled);
                self.refresh_grid();
            }
            Event::Clear => {
                self.settle_pending(&mut fx);
                let background = self.tools.properties.background;
                self.project.surface.clear(background);
                self.record("Clear", &mut fx);
            }
            Event::Undo => self.undo(&mut fx),
            Event::Redo => self.redo(&mut fx),
            Event::ExportImage => self.export_image(&mut fx),
            Event::SaveProject => self.save_project(&mut fx),
            Event::LoadProject { json } => self.load_project(&json, &mut fx),
            Event::ImportImage { bytes } => self.import_image(&bytes, &mut fx),
            Event::Resize { width, height } => {
                self.settle_pending(&mut fx);
                let background = self.tools.properties.background;
                self.project.surface.resize(width, height, background);
                self.refresh_grid();
            }
        }
        fx
    }

    // ------------------------------------------------------------------
    // Pointer gestures
    // ------------------------------------------------------------------

    fn pointer_down(&mut self, at: Point, button: u8, fx: &mut Vec<Effect>) {
        if button == SECONDARY_BUTTON {
            return;
        }
        self.cursor = at;
        // Clicking away from an open entry commits it and draws nothing.
        if self.text.is_editing() {
            self.commit_text(fx);
            return;
        }
        if self.tools.mode() == ToolMode::Text {
            let color = self.tools.properties.color;
            let size = self.tools.properties.size;
            if self.text.open(at, color, size) {
                fx.push(Effect::ShowTextEntry {
                    x: at.x,
                    y: at.y,
                    color,
                    size,
                });
            }
            return;
        }

        self.settle_pending(fx);
        let size = self.tools.properties.size;
        self.gesture_width = size;
        match self.tools.mode() {
            ToolMode::Shape => self.shapes.begin(&self.project.surface, at),
            _ => {
                let style = StrokeStyle::from_tools(&self.tools);
                self.stroke.begin(&mut self.project.surface, at, size, style);
            }
        }
        if self.tools.is_erasing() {
            fx.push(self.eraser_cursor(true));
        }
    }

    fn pointer_move(&mut self, at: Point, pressure: Option<f32>, fx: &mut Vec<Effect>) {
        self.cursor = at;
        if self.tools.is_erasing() {
            fx.push(self.eraser_cursor(true));
        }
        if !self.is_gesture_active() {
            return;
        }
        let width = self.tools.effective_width(pressure);
        self.gesture_width = width;
        if self.stroke.is_active() {
            self.stroke.extend(&mut self.project.surface, at, width);
        } else {
            let style = self.tools.shape_style(width);
            let kind = self.tools.shape_kind();
            self.shapes.update(&mut self.project.surface, kind, at, &style);
        }
    }

    fn pointer_up(&mut self, at: Point, fx: &mut Vec<Effect>) {
        self.cursor = at;
        if self.tools.is_erasing() {
            fx.push(self.eraser_cursor(false));
        }
        self.finalize_gesture(Some(at), fx);
    }

    /// Commit an open text entry and the active gesture before anything else
    /// touches the surface or the history. Pressing any toolbar button blurs
    /// the entry, which commits it.
    fn settle_pending(&mut self, fx: &mut Vec<Effect>) {
        if self.text.is_editing() {
            self.commit_text(fx);
        }
        self.finalize_gesture(None, fx);
    }

    /// Close the active gesture, if any, and record it as one history entry.
    /// `None` finishes at the last known sample.
    fn finalize_gesture(&mut self, at: Option<Point>, fx: &mut Vec<Effect>) {
        if self.stroke.is_active() {
            self.stroke.finish(&mut self.project.surface, at);
            let label = if self.tools.is_erasing() {
                "Eraser Stroke"
            } else {
                "Brush Stroke"
            };
            self.record(label, fx);
        } else if self.shapes.is_active() {
            let end = at.unwrap_or(self.cursor);
            let style = self.tools.shape_style(self.gesture_width);
            let kind = self.tools.shape_kind();
            if self.shapes.finish(&mut self.project.surface, kind, end, &style) {
                self.record(kind.label(), fx);
            }
        }
    }

    // ------------------------------------------------------------------
    // Text entry
    // ------------------------------------------------------------------

    fn commit_text(&mut self, fx: &mut Vec<Effect>) {
        match self.text.commit(&mut self.project.surface) {
            CommitOutcome::NotEditing => return,
            CommitOutcome::Drawn => self.record("Text", fx),
            CommitOutcome::Empty => {}
            CommitOutcome::Failed(_) => fx.push(Effect::Notify {
                message: NO_FONT_MESSAGE.to_string(),
            }),
        }
        self.close_text_entry(fx);
    }

    fn cancel_text(&mut self, fx: &mut Vec<Effect>) {
        if self.text.cancel() {
            self.close_text_entry(fx);
        }
    }

    fn close_text_entry(&mut self, fx: &mut Vec<Effect>) {
        fx.push(Effect::HideTextEntry);
        self.tools.leave_text_mode();
        fx.push(self.tool_changed());
    }

    // ------------------------------------------------------------------
    // Tools
    // ------------------------------------------------------------------

    fn select_tool(&mut self, fx: &mut Vec<Effect>, select: impl FnOnce(&mut ToolState)) {
        self.settle_pending(fx);
        let was_erasing = self.tools.is_erasing();
        select(&mut self.tools);
        if self.tools.mode() != ToolMode::Text {
            self.text.disarm();
        }
        if was_erasing != self.tools.is_erasing() {
            fx.push(self.eraser_cursor(self.tools.is_erasing()));
        }
        fx.push(self.tool_changed());
    }

    fn set_background(&mut self, color: Color, fx: &mut Vec<Effect>) {
        self.settle_pending(fx);
        self.tools.set_background(color);
        self.project.surface.refill_background(color);
        self.record("Background", fx);
    }

    fn refresh_grid(&mut self) {
        let (w, h) = (self.project.surface.width(), self.project.surface.height());
        self.grid.refresh(self.tools.properties.grid, w, h);
    }

    // ------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------

    fn shortcut(&mut self, key: &str, primary: bool, shift: bool, fx: &mut Vec<Effect>) {
        if !primary {
            return;
        }
        let z = key.eq_ignore_ascii_case("z");
        let y = key.eq_ignore_ascii_case("y");
        if z && !shift {
            self.undo(fx);
        } else if y || (z && shift) {
            self.redo(fx);
        }
    }

    fn undo(&mut self, fx: &mut Vec<Effect>) {
        self.settle_pending(fx);
        if self.project.undo() {
            fx.push(self.history_changed());
        }
    }

    fn redo(&mut self, fx: &mut Vec<Effect>) {
        self.settle_pending(fx);
        if self.project.redo() {
            fx.push(self.history_changed());
        }
    }

    fn record(&mut self, description: &str, fx: &mut Vec<Effect>) {
        self.project.record(description);
        fx.push(self.history_changed());
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    fn export_image(&mut self, fx: &mut Vec<Effect>) {
        match io::encode_png(self.project.surface.pixels()) {
            Ok(bytes) => fx.push(Effect::Download {
                file_name: io::EXPORT_IMAGE_NAME.to_string(),
                mime: "image/png".to_string(),
                bytes,
            }),
            Err(e) => {
                log_err!("PNG export failed: {}", e);
                fx.push(Effect::Notify {
                    message: EXPORT_FAILED_MESSAGE.to_string(),
                });
            }
        }
    }

    fn save_project(&mut self, fx: &mut Vec<Effect>) {
        match self.project.to_document(self.tools.properties.background) {
            Ok(doc) => fx.push(Effect::Download {
                file_name: io::EXPORT_PROJECT_NAME.to_string(),
                mime: "application/json".to_string(),
                bytes: io::project_to_json(&doc).into_bytes(),
            }),
            Err(e) => {
                log_err!("Project save failed: {}", e);
                fx.push(Effect::Notify {
                    message: EXPORT_FAILED_MESSAGE.to_string(),
                });
            }
        }
    }

    fn load_project(&mut self, json: &str, fx: &mut Vec<Effect>) {
        self.settle_pending(fx);
        match io::parse_project(json) {
            Ok(loaded) => {
                self.tools.set_background(loaded.background);
                self.project.apply_loaded(&loaded);
                fx.push(self.history_changed());
                log_info!("Project loaded ({})", loaded.background);
            }
            Err(e) => {
                log_warn!("Project load rejected: {}", e);
                fx.push(Effect::Notify {
                    message: INVALID_PROJECT_MESSAGE.to_string(),
                });
            }
        }
    }

    fn import_image(&mut self, bytes: &[u8], fx: &mut Vec<Effect>) {
        self.settle_pending(fx);
        match io::decode_image(bytes) {
            Ok(image) => {
                if self.project.import_image(&image).is_some() {
                    fx.push(self.history_changed());
                }
            }
            Err(e) => {
                log_warn!("Import failed: {}", e);
                fx.push(Effect::Notify {
                    message: IMPORT_FAILED_MESSAGE.to_string(),
                });
            }
        }
    }

    // ------------------------------------------------------------------
    // Effect builders
    // ------------------------------------------------------------------

    fn tool_changed(&self) -> Effect {
        Effect::ToolChanged {
            label: self.tools.label().to_string(),
        }
    }

    fn history_changed(&self) -> Effect {
        Effect::HistoryChanged {
            can_undo: self.project.history.can_undo(),
            can_redo: self.project.history.can_redo(),
        }
    }

    fn eraser_cursor(&self, visible: bool) -> Effect {
        Effect::EraserCursor {
            visible,
            x: self.cursor.x,
            y: self.cursor.y,
            size: self.tools.properties.size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app() -> App {
        App::new(&AppSettings::default(), 100, 80)
    }

    fn history_effect(fx: &[Effect]) -> Option<&Effect> {
        fx.iter().find(|e| matches!(e, Effect::HistoryChanged { .. }))
    }

    #[test]
    fn right_button_never_draws() {
        let mut a = app();
        let before = a.surface().capture();
        a.handle(Event::PointerDown { x: 10.0, y: 10.0, button: 2, pressure: None });
        a.handle(Event::PointerMove { x: 50.0, y: 10.0, pressure: None });
        let fx = a.handle(Event::PointerUp { x: 50.0, y: 10.0 });
        assert!(history_effect(&fx).is_none());
        assert_eq!(a.surface().pixels(), &before);
    }

    #[test]
    fn pointer_cancel_commits_like_pointer_up() {
        let mut a = app();
        a.handle(Event::PointerDown { x: 10.0, y: 10.0, button: 0, pressure: None });
        a.handle(Event::PointerMove { x: 40.0, y: 10.0, pressure: None });
        let fx = a.handle(Event::PointerCancel { x: 40.0, y: 10.0 });
        assert_eq!(
            history_effect(&fx),
            Some(&Effect::HistoryChanged { can_undo: true, can_redo: false })
        );
        assert_eq!(a.history().undo_count(), 1);
    }

    #[test]
    fn undo_mid_gesture_finalizes_first() {
        let mut a = app();
        a.handle(Event::PointerDown { x: 10.0, y: 10.0, button: 0, pressure: None });
        a.handle(Event::PointerMove { x: 40.0, y: 10.0, pressure: None });
        a.handle(Event::Undo);
        assert!(!a.is_gesture_active());
        assert_eq!(a.surface().pixel(25, 10), Color::WHITE);
        assert!(a.history().can_redo());
    }

    #[test]
    fn eraser_paints_background_color() {
        let mut a = app();
        a.handle(Event::SetColor { color: Color::rgb(255, 0, 0) });
        a.handle(Event::PointerDown { x: 10.0, y: 40.0, button: 0, pressure: None });
        a.handle(Event::PointerUp { x: 90.0, y: 40.0 });
        assert_eq!(a.surface().pixel(50, 40), Color::rgb(255, 0, 0));

        let fx = a.handle(Event::SelectEraser);
        assert!(fx.contains(&Effect::ToolChanged { label: "Eraser".into() }));
        a.handle(Event::SetSize { size: 20.0 });
        a.handle(Event::PointerDown { x: 10.0, y: 40.0, button: 0, pressure: None });
        let fx = a.handle(Event::PointerUp { x: 90.0, y: 40.0 });
        assert!(fx.iter().any(|e| matches!(e, Effect::EraserCursor { visible: false, .. })));
        assert_eq!(a.surface().pixel(50, 40), Color::WHITE);
    }

    #[test]
    fn background_change_keeps_drawing_and_records() {
        let mut a = app();
        a.handle(Event::PointerDown { x: 10.0, y: 40.0, button: 0, pressure: None });
        a.handle(Event::PointerUp { x: 90.0, y: 40.0 });
        a.handle(Event::SetBackground { color: Color::rgb(0, 0, 255) });
        assert_eq!(a.surface().pixel(50, 40), Color::BLACK);
        assert_eq!(a.history().undo_count(), 2);
        assert_eq!(a.tools().properties.background, Color::rgb(0, 0, 255));
    }

    #[test]
    fn clear_is_undoable() {
        let mut a = app();
        a.handle(Event::PointerDown { x: 10.0, y: 40.0, button: 0, pressure: None });
        a.handle(Event::PointerUp { x: 90.0, y: 40.0 });
        a.handle(Event::Clear);
        assert_eq!(a.surface().pixel(50, 40), Color::WHITE);
        a.handle(Event::Undo);
        assert_eq!(a.surface().pixel(50, 40), Color::BLACK);
    }

    #[test]
    fn export_downloads_png() {
        let mut a = app();
        let fx = a.handle(Event::ExportImage);
        let Some(Effect::Download { file_name, mime, bytes }) = fx.first() else {
            panic!("expected a download, got {:?}", fx);
        };
        assert_eq!(file_name, "drawing.png");
        assert_eq!(mime, "image/png");
        let decoded = io::decode_image(bytes).unwrap();
        assert_eq!(decoded.dimensions(), (100, 80));
    }

    #[test]
    fn grid_stays_out_of_the_surface() {
        let mut a = app();
        a.handle(Event::SetGrid { enabled: true });
        assert_eq!(a.surface().pixel(25, 10), Color::WHITE);
        assert_ne!(a.composited().get_pixel(25, 10).0, Color::WHITE.0);
        a.handle(Event::Resize { width: 60, height: 60 });
        assert_eq!(a.grid().image().map(|g| g.dimensions()), Some((60, 60)));
        a.handle(Event::SetGrid { enabled: false });
        assert!(a.grid().image().is_none());
    }

    #[test]
    fn events_deserialize_from_tagged_json() {
        let events: Vec<Event> = serde_json::from_str(
            r##"[
                {"type": "pointer_down", "x": 1, "y": 2},
                {"type": "select_shape", "shape": "star"},
                {"type": "select_shape"},
                {"type": "set_color", "color": "#ff0000"},
                {"type": "key", "key": "z", "ctrl": true}
            ]"##,
        )
        .unwrap();
        assert_eq!(
            events[0],
            Event::PointerDown { x: 1.0, y: 2.0, button: 0, pressure: None }
        );
        assert_eq!(events[1], Event::SelectShape { shape: Some(ShapeKind::Star) });
        assert_eq!(events[2], Event::SelectShape { shape: None });
        assert_eq!(events[3], Event::SetColor { color: Color::rgb(255, 0, 0) });
    }
}
