use std::collections::VecDeque;

use crate::canvas::Surface;
use crate::io::{self, CodecError};

/// Default number of undo steps.
pub const DEFAULT_HISTORY_SIZE: usize = 60;
/// Capacity the history falls back to once a snapshot could not be encoded.
pub const DEGRADED_HISTORY_SIZE: usize = 15;
/// Default memory cap across both stacks.
pub const DEFAULT_MEMORY_BYTES: usize = 256 * 1024 * 1024;

// ============================================================================
// SNAPSHOT: one PNG-encoded copy of the whole surface
// ============================================================================

/// A history entry: the full surface encoded as PNG, plus the label of the edit
/// that produced it.
#[derive(Clone, Debug)]
pub struct Snapshot {
    png: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub description: String,
}

impl Snapshot {
    pub fn capture(surface: &Surface, description: &str) -> Result<Self, CodecError> {
        Ok(Self {
            png: io::encode_png(surface.pixels())?,
            width: surface.width(),
            height: surface.height(),
            description: description.to_string(),
        })
    }

    /// Decode and draw over the whole surface, stretched if the size changed
    /// since the capture.
    pub fn restore_into(&self, surface: &mut Surface) -> Result<(), CodecError> {
        let image = io::decode_image(&self.png)?;
        surface.restore(&image);
        Ok(())
    }

    pub fn memory_size(&self) -> usize {
        self.png.len() + self.description.len() + std::mem::size_of::<Self>()
    }
}

// ============================================================================
// HISTORY MANAGER
// ============================================================================

/// Bounded undo/redo stacks of full-surface snapshots.
///
/// The manager keeps a *baseline*: the state as of the last committed edit.
/// Recording pushes the previous baseline onto the undo stack, so undo always
/// returns to the state before the most recent edit.
pub struct HistoryManager {
    undo_stack: VecDeque<Snapshot>,
    redo_stack: VecDeque<Snapshot>,
    baseline: Option<Snapshot>,
    max_history_size: usize,
    /// Optional memory cap in bytes.
    max_memory_bytes: Option<usize>,
    /// Running memory total across both stacks.
    total_memory: usize,
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_SIZE)
    }
}

impl HistoryManager {
    pub fn new(max_history_size: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            baseline: None,
            max_history_size: max_history_size.max(1),
            max_memory_bytes: Some(DEFAULT_MEMORY_BYTES),
            total_memory: 0,
        }
    }

    pub fn with_memory_limit(mut self, max_bytes: Option<usize>) -> Self {
        self.max_memory_bytes = max_bytes;
        self
    }

    /// Drop both stacks and take the current surface as the baseline.
    pub fn reset(&mut self, surface: &Surface) {
        self.clear();
        match Snapshot::capture(surface, "Initial State") {
            Ok(snap) => self.baseline = Some(snap),
            Err(e) => {
                log_err!("History baseline capture failed: {}", e);
                self.baseline = None;
            }
        }
    }

    /// Record the current surface as a completed edit.
    pub fn record(&mut self, surface: &Surface, description: &str) {
        self.record_capture(Snapshot::capture(surface, description));
    }

    /// Record an already attempted capture. A failed capture never aborts the
    /// edit; it shrinks the history instead.
    pub fn record_capture(&mut self, capture: Result<Snapshot, CodecError>) {
        self.clear_redo();
        match capture {
            Ok(snap) => {
                if let Some(prev) = self.baseline.replace(snap) {
                    self.total_memory += prev.memory_size();
                    self.undo_stack.push_back(prev);
                }
            }
            Err(e) => {
                if self.max_history_size > DEGRADED_HISTORY_SIZE {
                    log_warn!(
                        "History snapshot failed ({}); reducing undo steps {} -> {}",
                        e,
                        self.max_history_size,
                        DEGRADED_HISTORY_SIZE
                    );
                    self.max_history_size = DEGRADED_HISTORY_SIZE;
                } else {
                    log_warn!("History snapshot failed: {}", e);
                }
            }
        }
        self.prune();
    }

    /// Restore the state before the most recent edit. Returns `false` when
    /// there is nothing to undo.
    pub fn undo(&mut self, surface: &mut Surface) -> bool {
        let Some(target) = self.undo_stack.pop_back() else {
            return false;
        };
        self.total_memory = self.total_memory.saturating_sub(target.memory_size());
        let current = self.capture_live(surface);
        if let Err(e) = target.restore_into(surface) {
            log_err!("Undo failed to decode snapshot: {}", e);
            self.total_memory += target.memory_size();
            self.undo_stack.push_back(target);
            return false;
        }
        if let Some(reverted) = &self.baseline {
            log_info!("Undo: {}", reverted.description);
        }
        self.baseline = Some(target);
        if let Some(current) = current {
            self.total_memory += current.memory_size();
            self.redo_stack.push_back(current);
        }
        true
    }

    /// Re-apply the most recently undone edit. Returns `false` when there is
    /// nothing to redo.
    pub fn redo(&mut self, surface: &mut Surface) -> bool {
        let Some(target) = self.redo_stack.pop_back() else {
            return false;
        };
        self.total_memory = self.total_memory.saturating_sub(target.memory_size());
        if let Err(e) = target.restore_into(surface) {
            log_err!("Redo failed to decode snapshot: {}", e);
            self.total_memory += target.memory_size();
            self.redo_stack.push_back(target);
            return false;
        }
        log_info!("Redo: {}", target.description);
        if let Some(prev) = self.baseline.replace(target) {
            self.total_memory += prev.memory_size();
            self.undo_stack.push_back(prev);
        }
        self.prune();
        true
    }

    /// Snapshot of the live surface, labelled like the baseline it normally
    /// equals. Falls back to the baseline itself when encoding fails.
    fn capture_live(&self, surface: &Surface) -> Option<Snapshot> {
        let label = self
            .baseline
            .as_ref()
            .map(|b| b.description.as_str())
            .unwrap_or("Edit");
        match Snapshot::capture(surface, label) {
            Ok(snap) => Some(snap),
            Err(e) => {
                log_warn!("Redo snapshot failed ({}); reusing baseline", e);
                self.baseline.clone()
            }
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn max_history_size(&self) -> usize {
        self.max_history_size
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.total_memory = 0;
    }

    fn clear_redo(&mut self) {
        for snap in self.redo_stack.drain(..) {
            self.total_memory = self.total_memory.saturating_sub(snap.memory_size());
        }
    }

    /// Prune old entries to stay within limits
    fn prune(&mut self) {
        while self.undo_stack.len() > self.max_history_size {
            if let Some(removed) = self.undo_stack.pop_front() {
                self.total_memory = self.total_memory.saturating_sub(removed.memory_size());
            }
        }
        if let Some(max_bytes) = self.max_memory_bytes {
            while self.total_memory > max_bytes && self.undo_stack.len() > 1 {
                if let Some(removed) = self.undo_stack.pop_front() {
                    self.total_memory = self.total_memory.saturating_sub(removed.memory_size());
                }
            }
        }
    }
}
