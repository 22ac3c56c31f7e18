use ab_glyph::FontArc;
use std::path::PathBuf;

use crate::canvas::{Point, Surface};
use crate::color::Color;
use crate::ops::text::{self, TextError};

/// Inline text entry lifecycle.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum TextEntryState {
    #[default]
    Inactive,
    /// Text tool selected; the next click opens an entry.
    Armed,
    Editing {
        anchor: Point,
        text: String,
        color: Color,
        size: f32,
    },
}

/// Result of closing an entry with commit semantics.
#[derive(Debug)]
pub enum CommitOutcome {
    /// Text was rasterized; the caller records history.
    Drawn,
    /// Empty or whitespace-only buffer; treated as a cancel.
    Empty,
    /// No font could be loaded. Nothing was drawn.
    Failed(TextError),
    /// No entry was open.
    NotEditing,
}

/// Places one line (or several, split on `\n`) of text onto the surface.
#[derive(Default)]
pub struct TextInserter {
    state: TextEntryState,
    font_path: Option<PathBuf>,
    font: Option<FontArc>,
}

impl TextInserter {
    pub fn new(font_path: Option<PathBuf>) -> Self {
        Self {
            font_path,
            ..Default::default()
        }
    }

    pub fn state(&self) -> &TextEntryState {
        &self.state
    }

    pub fn is_armed(&self) -> bool {
        self.state == TextEntryState::Armed
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.state, TextEntryState::Editing { .. })
    }

    pub fn arm(&mut self) {
        if !self.is_editing() {
            self.state = TextEntryState::Armed;
        }
    }

    /// Drop an armed (not yet clicked) entry.
    pub fn disarm(&mut self) {
        if self.is_armed() {
            self.state = TextEntryState::Inactive;
        }
    }

    /// Open an entry at `anchor`. Only valid while armed.
    pub fn open(&mut self, anchor: Point, color: Color, size: f32) -> bool {
        if !self.is_armed() {
            return false;
        }
        self.state = TextEntryState::Editing {
            anchor,
            text: String::new(),
            color,
            size,
        };
        true
    }

    /// Replace the buffer with the entry's full current contents.
    pub fn set_text(&mut self, value: &str) {
        if let TextEntryState::Editing { text, .. } = &mut self.state {
            value.clone_into(text);
        }
    }

    pub fn insert_newline(&mut self) {
        if let TextEntryState::Editing { text, .. } = &mut self.state {
            text.push('\n');
        }
    }

    pub fn cancel(&mut self) -> bool {
        let was_editing = self.is_editing();
        self.state = TextEntryState::Inactive;
        was_editing
    }

    /// Close the entry and draw its text. The entry is closed in every case.
    pub fn commit(&mut self, surface: &mut Surface) -> CommitOutcome {
        let TextEntryState::Editing {
            anchor,
            text,
            color,
            size,
        } = std::mem::take(&mut self.state)
        else {
            return CommitOutcome::NotEditing;
        };
        if text.trim().is_empty() {
            return CommitOutcome::Empty;
        }
        let font = match self.font() {
            Ok(font) => font,
            Err(e) => {
                log_err!("Text commit failed: {}", e);
                return CommitOutcome::Failed(e);
            }
        };
        text::draw_text(surface, &font, &text, size, color, anchor);
        CommitOutcome::Drawn
    }

    /// Loaded once, then reused.
    fn font(&mut self) -> Result<FontArc, TextError> {
        if let Some(font) = &self.font {
            return Ok(font.clone());
        }
        let font = text::load_font(self.font_path.as_deref())?;
        self.font = Some(font.clone());
        Ok(font)
    }
}
