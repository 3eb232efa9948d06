//! Snapshot-based undo/redo
//!
//! Two entry kinds share one pair of LIFO stacks: single-layer buffer
//! snapshots for pixel edits, and whole-project frame-sequence snapshots for
//! structural changes. Undo/redo match entries by variant tag, never by
//! position, so the kinds interleave freely. Every snapshot is a deep copy;
//! history never aliases live editor state.

use crate::buffer::PixelBuffer;
use crate::model::{Frame, Layer, LayerId};

/// Maximum retained undo depth; the oldest entry is dropped beyond this.
pub const MAX_HISTORY_DEPTH: usize = 64;

/// An immutable "before" snapshot used to support undo/redo.
#[derive(Debug, Clone)]
pub enum HistoryEntry {
    /// One layer's pixel plane, captured before a pixel edit.
    Buffer { layer: LayerId, pixels: PixelBuffer },
    /// The full frame sequence (records, order and layer stacks), captured
    /// before a structural edit. Restoring it revives deleted frames and
    /// drops inserted ones.
    Frames { frames: Vec<(Frame, Vec<Layer>)> },
}

impl HistoryEntry {
    fn same_kind(&self, other: &HistoryEntry) -> bool {
        matches!(
            (self, other),
            (HistoryEntry::Buffer { .. }, HistoryEntry::Buffer { .. })
                | (HistoryEntry::Frames { .. }, HistoryEntry::Frames { .. })
        )
    }
}

/// Dual-stack undo/redo history.
#[derive(Debug, Default)]
pub struct HistoryStack {
    undo: Vec<HistoryEntry>,
    redo: Vec<HistoryEntry>,
}

impl HistoryStack {
    pub fn new() -> Self {
        HistoryStack::default()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }

    /// Push a single-buffer "before" snapshot. Clears the redo stack.
    pub fn commit_buffer(&mut self, layer: LayerId, before: PixelBuffer) {
        self.push(HistoryEntry::Buffer { layer, pixels: before });
    }

    /// Push a whole-project "before" snapshot. Clears the redo stack.
    pub fn commit_frames(&mut self, before: Vec<(Frame, Vec<Layer>)>) {
        self.push(HistoryEntry::Frames { frames: before });
    }

    fn push(&mut self, entry: HistoryEntry) {
        self.undo.push(entry);
        self.redo.clear();
        if self.undo.len() > MAX_HISTORY_DEPTH {
            self.undo.remove(0);
        }
    }

    /// Pop the most recent undo entry, pushing the matching "current" state
    /// onto the redo stack so the step can be replayed.
    ///
    /// `current` must produce the live counterpart of the popped entry's
    /// kind (the layer's buffer for `Buffer`, the live frame sequence for
    /// `Frames`).
    /// Returns None when the stack is empty; callers are expected to consult
    /// [`HistoryStack::can_undo`] first.
    pub fn undo<F>(&mut self, current: F) -> Option<HistoryEntry>
    where
        F: FnOnce(&HistoryEntry) -> HistoryEntry,
    {
        let entry = self.undo.pop()?;
        let counterpart = current(&entry);
        debug_assert!(entry.same_kind(&counterpart));
        self.redo.push(counterpart);
        Some(entry)
    }

    /// Mirror of [`HistoryStack::undo`]: pop from redo, push the current
    /// state onto undo.
    pub fn redo<F>(&mut self, current: F) -> Option<HistoryEntry>
    where
        F: FnOnce(&HistoryEntry) -> HistoryEntry,
    {
        let entry = self.redo.pop()?;
        let counterpart = current(&entry);
        debug_assert!(entry.same_kind(&counterpart));
        self.undo.push(counterpart);
        Some(entry)
    }
}
