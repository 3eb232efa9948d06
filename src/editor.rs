//! Editor façade - the single-threaded orchestration layer
//!
//! Everything the host UI calls goes through [`Editor`]: pixel strokes,
//! clipboard, selection tools, the floating-selection transform pipeline,
//! structural layer/frame edits, tween insertion, undo/redo and remote patch
//! intake. Editing operations never panic and never raise; precondition
//! failures (locked layer, empty selection, missing clipboard) return as
//! silent no-ops so the editor cannot crash mid-stroke. Boundary input
//! (remote patches) is the exception and gets a typed `Result`.

use crate::buffer::{Canvas, PixelBuffer};
use crate::blend::{blend_pixel, BlendMode};
use crate::compositor::composite_frame;
use crate::floating::FloatingSelection;
use crate::history::{HistoryEntry, HistoryStack};
use crate::model::{Document, FrameId, LayerId};
use crate::patch::{apply_patch, validate_patch, PatchError};
use crate::selection::SelectionMask;
use crate::transform::Affine;
use crate::tween::{tween_frames, Easing};

/// Pixels captured by copy/cut, pasted back by offset.
#[derive(Debug, Clone)]
struct Clipboard {
    pixels: PixelBuffer,
}

/// The engine façade owning the document, history, selection state and the
/// at-most-one floating selection.
pub struct Editor {
    document: Document,
    history: HistoryStack,
    selection: SelectionMask,
    floating: Option<FloatingSelection>,
    /// "Before" buffer snapshotted at lift time, committed to history when
    /// the floating selection lands.
    pre_lift: Option<(LayerId, PixelBuffer)>,
    clipboard: Option<Clipboard>,
}

impl Editor {
    pub fn new(canvas: Canvas) -> Self {
        Editor::from_document(Document::new(canvas))
    }

    /// Wrap an existing document (the snapshot-load path). History starts
    /// empty.
    pub fn from_document(document: Document) -> Self {
        let canvas = document.canvas();
        Editor {
            document,
            history: HistoryStack::new(),
            selection: SelectionMask::new(canvas.width, canvas.height),
            floating: None,
            pre_lift: None,
            clipboard: None,
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn selection(&self) -> &SelectionMask {
        &self.selection
    }

    pub fn has_floating(&self) -> bool {
        self.floating.is_some()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    fn current_frame(&self) -> FrameId {
        self.document.current_frame_id()
    }

    /// The drawing target of the current frame.
    pub fn active_layer_id(&self) -> Option<LayerId> {
        self.document.active_layer_id(self.current_frame())
    }

    /// The drawing target, but only when it accepts edits.
    fn unlocked_active_layer(&self) -> Option<LayerId> {
        let id = self.active_layer_id()?;
        let layer = self.document.layer(id)?;
        if layer.locked {
            None
        } else {
            Some(id)
        }
    }

    // ---- pixel edits ----

    /// Write a color to a set of points on the active layer as one history
    /// step. Locked layer or empty point list is a no-op; off-canvas points
    /// are skipped.
    pub fn draw_pixels(&mut self, points: &[(u32, u32)], color: [u8; 4]) {
        if points.is_empty() {
            return;
        }
        let Some(layer_id) = self.unlocked_active_layer() else { return };
        self.commit_floating();

        let layer = self.document.layer_mut(layer_id).unwrap();
        let before = layer.pixels.clone();
        for &(x, y) in points {
            layer.pixels.set_pixel(x, y, color);
        }
        self.history.commit_buffer(layer_id, before);
    }

    /// Erase (write transparent) at a set of points.
    pub fn erase_pixels(&mut self, points: &[(u32, u32)]) {
        self.draw_pixels(points, [0, 0, 0, 0]);
    }

    // ---- clipboard ----

    /// Copy the selected pixels of the active layer. The clipboard buffer is
    /// the selection's bounding box; unselected pixels inside the box stay
    /// transparent. Empty selection is a no-op.
    pub fn copy_selection(&mut self) {
        let Some(layer_id) = self.active_layer_id() else { return };
        let Some(bounds) = self.selection.bounds() else { return };
        let layer = match self.document.layer(layer_id) {
            Some(layer) => layer,
            None => return,
        };

        let mut pixels = PixelBuffer::new(bounds.width, bounds.height);
        for by in 0..bounds.height {
            for bx in 0..bounds.width {
                let (sx, sy) = (bounds.x + bx, bounds.y + by);
                if self.selection.contains(sx, sy) {
                    if let Some(px) = layer.pixels.get_pixel(sx, sy) {
                        pixels.set_pixel(bx, by, px);
                    }
                }
            }
        }
        self.clipboard = Some(Clipboard { pixels });
    }

    /// Copy the selection, then clear the source pixels (one history step).
    /// Empty selection or locked layer is a no-op.
    pub fn cut_selection(&mut self) {
        let Some(layer_id) = self.unlocked_active_layer() else { return };
        let Some(bounds) = self.selection.bounds() else { return };
        self.copy_selection();

        let layer = self.document.layer_mut(layer_id).unwrap();
        let before = layer.pixels.clone();
        for by in 0..bounds.height {
            for bx in 0..bounds.width {
                let (sx, sy) = (bounds.x + bx, bounds.y + by);
                if self.selection.contains(sx, sy) {
                    layer.pixels.set_pixel(sx, sy, [0, 0, 0, 0]);
                }
            }
        }
        self.history.commit_buffer(layer_id, before);
    }

    /// Alpha-composite the clipboard onto the active layer with its top-left
    /// at `(x, y)`, clipped to canvas bounds. The selection becomes the
    /// pasted pixels. Empty clipboard or locked layer is a no-op.
    pub fn paste_clipboard(&mut self, x: i32, y: i32) {
        let Some(layer_id) = self.unlocked_active_layer() else { return };
        let Some(clipboard) = self.clipboard.clone() else { return };
        self.commit_floating();

        let pasted = FloatingSelection { pixels: clipboard.pixels, x, y };
        let canvas = self.document.canvas();
        let layer = self.document.layer_mut(layer_id).unwrap();
        let before = layer.pixels.clone();
        pasted.composite_onto(&mut layer.pixels);
        self.history.commit_buffer(layer_id, before);
        self.selection = pasted.to_mask(canvas.width, canvas.height);
    }

    // ---- selection tools ----

    /// Replace the selection with a rectangle. Forces an implicit commit of
    /// any floating selection first.
    pub fn select_rect(&mut self, x: u32, y: u32, width: u32, height: u32) {
        self.commit_floating();
        self.selection.clear();
        self.selection.select_rect(x, y, width, height);
    }

    pub fn select_all(&mut self) {
        self.commit_floating();
        self.selection.select_all();
    }

    pub fn clear_selection(&mut self) {
        self.commit_floating();
        self.selection.clear();
    }

    /// Magic-wand select: the 4-connected region of non-transparent pixels
    /// in the current frame's composite around `(x, y)`.
    pub fn select_connected(&mut self, x: u32, y: u32) {
        self.commit_floating();
        let frame_id = self.current_frame();
        let Some(frame) = self.document.frame(frame_id) else { return };
        let composite = composite_frame(&self.document, frame);
        self.selection = SelectionMask::from_connected_region(&composite, x, y);
    }

    pub fn grow_selection(&mut self) {
        self.commit_floating();
        self.selection.grow();
    }

    pub fn shrink_selection(&mut self) {
        self.commit_floating();
        self.selection.shrink();
    }

    // ---- floating transform pipeline ----

    /// Lift the selected pixels off the active layer into a floating
    /// selection, snapshotting the pre-lift buffer for the eventual commit.
    /// Empty selection or locked layer is a no-op. An existing floating
    /// selection is committed first.
    pub fn begin_transform(&mut self) {
        self.commit_floating();
        let Some(layer_id) = self.unlocked_active_layer() else { return };

        let layer = self.document.layer_mut(layer_id).unwrap();
        let before = layer.pixels.clone();
        if let Some(floating) = FloatingSelection::lift(layer, &self.selection) {
            self.floating = Some(floating);
            self.pre_lift = Some((layer_id, before));
        }
    }

    /// Apply an affine transform to the floating selection and rebuild the
    /// canvas-space selection mask from it. No floating selection, or a
    /// degenerate transform, is a no-op.
    pub fn transform_floating(&mut self, matrix: &Affine) {
        let canvas = self.document.canvas();
        if let Some(floating) = &mut self.floating {
            if floating.transform(matrix) {
                self.selection = floating.to_mask(canvas.width, canvas.height);
            }
        }
    }

    /// Scale the floating selection; non-positive factors are a no-op.
    pub fn scale_floating(&mut self, sx: f64, sy: f64) {
        if sx <= 0.0 || sy <= 0.0 {
            return;
        }
        self.transform_floating(&Affine::scale(sx, sy));
    }

    pub fn translate_floating(&mut self, dx: i32, dy: i32) {
        self.transform_floating(&Affine::translate(dx as f64, dy as f64));
    }

    pub fn flip_floating_horizontal(&mut self) {
        if let Some(floating) = &self.floating {
            let matrix = Affine::flip_horizontal(floating.pixels.width());
            self.transform_floating(&matrix);
        }
    }

    pub fn flip_floating_vertical(&mut self) {
        if let Some(floating) = &self.floating {
            let matrix = Affine::flip_vertical(floating.pixels.height());
            self.transform_floating(&matrix);
        }
    }

    pub fn rotate_floating_cw(&mut self) {
        if let Some(floating) = &self.floating {
            let matrix = Affine::rotate90_cw(floating.pixels.height());
            self.transform_floating(&matrix);
        }
    }

    /// Land the floating selection: alpha-composite it onto the active layer
    /// at its current offset, record the pre-lift buffer as the history
    /// "before," and replace the selection with the post-paste mask. No
    /// floating selection is a no-op.
    pub fn commit_floating(&mut self) {
        let Some(floating) = self.floating.take() else { return };
        let Some((layer_id, before)) = self.pre_lift.take() else { return };

        let canvas = self.document.canvas();
        if let Some(layer) = self.document.layer_mut(layer_id) {
            floating.composite_onto(&mut layer.pixels);
            self.history.commit_buffer(layer_id, before);
        }
        self.selection = floating.to_mask(canvas.width, canvas.height);
    }

    // ---- structural edits (whole-project history) ----

    fn structural<F>(&mut self, op: F) -> bool
    where
        F: FnOnce(&mut Document) -> bool,
    {
        self.commit_floating();
        let before = self.document.snapshot_frames();
        let changed = op(&mut self.document);
        if changed {
            self.history.commit_frames(before);
        }
        changed
    }

    pub fn add_layer(&mut self, name: &str) -> Option<LayerId> {
        let frame_id = self.current_frame();
        let mut created = None;
        self.structural(|doc| {
            created = doc.add_layer(frame_id, name);
            created.is_some()
        });
        created
    }

    pub fn duplicate_layer(&mut self, layer_id: LayerId) -> Option<LayerId> {
        let frame_id = self.current_frame();
        let mut created = None;
        self.structural(|doc| {
            created = doc.duplicate_layer(frame_id, layer_id);
            created.is_some()
        });
        created
    }

    pub fn delete_layer(&mut self, layer_id: LayerId) -> bool {
        let frame_id = self.current_frame();
        self.structural(|doc| doc.delete_layer(frame_id, layer_id))
    }

    pub fn reorder_layer(&mut self, layer_id: LayerId, new_index: usize) -> bool {
        let frame_id = self.current_frame();
        self.structural(|doc| doc.reorder_layer(frame_id, layer_id, new_index))
    }

    /// Merge a layer into the one directly below it, honoring the upper
    /// layer's opacity and blend mode. Refused (no-op) for the bottom layer
    /// or when either layer is locked.
    pub fn merge_down(&mut self, layer_id: LayerId) -> bool {
        let frame_id = self.current_frame();
        self.structural(|doc| {
            let Some(frame) = doc.frame(frame_id) else { return false };
            let Some(position) = frame.layer_order.iter().position(|&id| id == layer_id) else {
                return false;
            };
            if position == 0 {
                return false;
            }
            let below_id = frame.layer_order[position - 1];
            let Some(upper) = doc.layer(layer_id) else { return false };
            let Some(below) = doc.layer(below_id) else { return false };
            if upper.locked || below.locked {
                return false;
            }

            let (mode, opacity) = (upper.blend_mode, upper.opacity());
            let mut merged = below.pixels.clone();
            for i in 0..merged.pixel_count() {
                let fg = upper.pixels.pixel_at(i);
                if fg[3] == 0 {
                    continue;
                }
                merged.set_pixel_at(i, blend_pixel(mode, fg, merged.pixel_at(i), opacity));
            }
            doc.layer_mut(below_id).unwrap().pixels = merged;
            doc.delete_layer(frame_id, layer_id)
        })
    }

    /// Collapse the current frame to a single layer holding its composite.
    /// The bottom layer survives (id and name) with opacity 1 and normal
    /// blending; the rest are deleted.
    pub fn flatten_frame(&mut self) -> bool {
        let frame_id = self.current_frame();
        self.structural(|doc| {
            let Some(frame) = doc.frame(frame_id) else { return false };
            if frame.layer_order.len() <= 1 {
                return false;
            }
            let composite = composite_frame(doc, frame);
            let bottom = frame.layer_order[0];
            let doomed: Vec<LayerId> = frame.layer_order[1..].to_vec();

            let layer = doc.layer_mut(bottom).unwrap();
            layer.pixels = composite;
            layer.set_opacity(1.0);
            layer.blend_mode = BlendMode::Normal;
            layer.visible = true;
            for id in doomed {
                doc.delete_layer(frame_id, id);
            }
            true
        })
    }

    pub fn insert_frame(&mut self) -> FrameId {
        let after = self.current_frame();
        let mut created = FrameId(0);
        self.structural(|doc| {
            created = doc.insert_frame(Some(after));
            true
        });
        created
    }

    pub fn duplicate_frame(&mut self) -> Option<FrameId> {
        let frame_id = self.current_frame();
        let mut created = None;
        self.structural(|doc| {
            created = doc.duplicate_frame(frame_id);
            created.is_some()
        });
        created
    }

    pub fn delete_frame(&mut self, frame_id: FrameId) -> bool {
        self.structural(|doc| doc.delete_frame(frame_id))
    }

    /// Generate `count` tweened frames between `start` and `end` and insert
    /// them after `start`, as one history step. Returns the new frame ids
    /// (empty on precondition failure: missing frames or count of 0).
    pub fn insert_tween_frames(
        &mut self,
        start: FrameId,
        end: FrameId,
        count: usize,
        easing: Easing,
    ) -> Vec<FrameId> {
        let generated = tween_frames(&self.document, start, end, count, easing);
        if generated.is_empty() {
            return Vec::new();
        }
        let mut created = Vec::with_capacity(generated.len());
        self.structural(|doc| {
            let mut after = start;
            for tween in generated {
                after = doc.insert_built_frame(
                    Some(after),
                    tween.duration_ms,
                    tween.pivot,
                    tween.layers,
                );
                created.push(after);
            }
            true
        });
        created
    }

    // ---- undo / redo ----

    /// Undo the most recent history step. Returns false on an empty stack;
    /// callers are expected to consult [`Editor::can_undo`].
    pub fn undo(&mut self) -> bool {
        self.commit_floating();
        let document = &self.document;
        let entry = self.history.undo(|popped| live_counterpart(document, popped));
        match entry {
            Some(entry) => {
                self.apply_entry(entry);
                true
            }
            None => false,
        }
    }

    /// Replay the most recently undone step. Returns false on an empty stack.
    pub fn redo(&mut self) -> bool {
        self.commit_floating();
        let document = &self.document;
        let entry = self.history.redo(|popped| live_counterpart(document, popped));
        match entry {
            Some(entry) => {
                self.apply_entry(entry);
                true
            }
            None => false,
        }
    }

    fn apply_entry(&mut self, entry: HistoryEntry) {
        match entry {
            HistoryEntry::Buffer { layer, pixels } => {
                self.document.restore_layer_pixels(layer, pixels);
            }
            HistoryEntry::Frames { frames } => {
                self.document.restore_frames(&frames);
            }
        }
    }

    // ---- remote patches ----

    /// Apply a peer edit to a layer. Validated here at the boundary; the
    /// apply itself trusts the patch. Peer edits bypass local history.
    pub fn apply_remote_patch(&mut self, layer_id: LayerId, patch: &[u32]) -> Result<(), PatchError> {
        let Some(layer) = self.document.layer_mut(layer_id) else { return Ok(()) };
        validate_patch(patch, layer.pixels.pixel_count())?;
        apply_patch(&mut layer.pixels, patch);
        Ok(())
    }
}

/// Build the redo/undo counterpart of a popped entry from live state.
fn live_counterpart(document: &Document, popped: &HistoryEntry) -> HistoryEntry {
    match popped {
        HistoryEntry::Buffer { layer, .. } => HistoryEntry::Buffer {
            layer: *layer,
            pixels: document
                .layer(*layer)
                .map(|l| l.pixels.clone())
                .unwrap_or_else(|| {
                    let canvas = document.canvas();
                    PixelBuffer::new(canvas.width, canvas.height)
                }),
        },
        HistoryEntry::Frames { .. } => HistoryEntry::Frames { frames: document.snapshot_frames() },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: [u8; 4] = [255, 0, 0, 255];

    fn editor_4x4() -> Editor {
        Editor::new(Canvas::new(4, 4).unwrap())
    }

    fn active_pixel(editor: &Editor, x: u32, y: u32) -> [u8; 4] {
        let id = editor.active_layer_id().unwrap();
        editor.document().layer(id).unwrap().pixels.get_pixel(x, y).unwrap()
    }

    #[test]
    fn test_draw_then_undo_then_redo() {
        let mut editor = editor_4x4();
        editor.draw_pixels(&[(1, 1), (2, 2)], RED);
        assert_eq!(active_pixel(&editor, 1, 1), RED);
        assert!(editor.can_undo());

        assert!(editor.undo());
        assert_eq!(active_pixel(&editor, 1, 1), [0, 0, 0, 0]);
        assert!(editor.can_redo());

        assert!(editor.redo());
        assert_eq!(active_pixel(&editor, 1, 1), RED);
        assert_eq!(active_pixel(&editor, 2, 2), RED);
    }

    #[test]
    fn test_draw_on_locked_layer_is_noop() {
        let mut editor = editor_4x4();
        let id = editor.active_layer_id().unwrap();
        editor.document_mut().layer_mut(id).unwrap().locked = true;

        editor.draw_pixels(&[(0, 0)], RED);
        assert_eq!(active_pixel(&editor, 0, 0), [0, 0, 0, 0]);
        assert!(!editor.can_undo());
    }

    #[test]
    fn test_copy_paste_scenario() {
        // 4x4 transparent buffer, (1,1) opaque red, mask cell index 5 only;
        // copy then paste at (2,2) puts red at (2,2) and changes nothing else
        let mut editor = editor_4x4();
        editor.draw_pixels(&[(1, 1)], RED);
        editor.select_rect(1, 1, 1, 1);

        editor.copy_selection();
        editor.paste_clipboard(2, 2);

        let id = editor.active_layer_id().unwrap();
        let pixels = &editor.document().layer(id).unwrap().pixels;
        for y in 0..4 {
            for x in 0..4 {
                let expected = if (x, y) == (1, 1) || (x, y) == (2, 2) { RED } else { [0, 0, 0, 0] };
                assert_eq!(pixels.get_pixel(x, y), Some(expected), "pixel ({x},{y})");
            }
        }
        // Selection now covers the pasted pixel
        assert!(editor.selection().contains(2, 2));
        assert!(!editor.selection().contains(1, 1));
    }

    #[test]
    fn test_copy_with_empty_selection_is_noop() {
        let mut editor = editor_4x4();
        editor.draw_pixels(&[(1, 1)], RED);
        editor.copy_selection();
        editor.paste_clipboard(0, 0);
        // Nothing pasted: clipboard never filled
        assert_eq!(active_pixel(&editor, 0, 0), [0, 0, 0, 0]);
    }

    #[test]
    fn test_cut_clears_source() {
        let mut editor = editor_4x4();
        editor.draw_pixels(&[(1, 1)], RED);
        editor.select_rect(1, 1, 1, 1);
        editor.cut_selection();
        assert_eq!(active_pixel(&editor, 1, 1), [0, 0, 0, 0]);

        editor.paste_clipboard(3, 3);
        assert_eq!(active_pixel(&editor, 3, 3), RED);
    }

    #[test]
    fn test_floating_translate_and_commit() {
        let mut editor = editor_4x4();
        editor.draw_pixels(&[(0, 0)], RED);
        editor.select_rect(0, 0, 1, 1);

        editor.begin_transform();
        assert!(editor.has_floating());
        // Lift clears the source pixel
        assert_eq!(active_pixel(&editor, 0, 0), [0, 0, 0, 0]);

        editor.translate_floating(2, 1);
        assert!(editor.selection().contains(2, 1));
        editor.commit_floating();

        assert!(!editor.has_floating());
        assert_eq!(active_pixel(&editor, 2, 1), RED);
        assert_eq!(active_pixel(&editor, 0, 0), [0, 0, 0, 0]);
    }

    #[test]
    fn test_selection_change_forces_implicit_commit() {
        let mut editor = editor_4x4();
        editor.draw_pixels(&[(0, 0)], RED);
        editor.select_rect(0, 0, 1, 1);
        editor.begin_transform();
        editor.translate_floating(1, 0);

        // Starting a new selection lands the floating pixels first
        editor.select_rect(3, 3, 1, 1);
        assert!(!editor.has_floating());
        assert_eq!(active_pixel(&editor, 1, 0), RED);
    }

    #[test]
    fn test_grow_selection_forces_implicit_commit() {
        let mut editor = editor_4x4();
        editor.draw_pixels(&[(1, 1)], RED);
        editor.select_rect(1, 1, 1, 1);
        editor.begin_transform();
        editor.translate_floating(1, 0);

        editor.grow_selection();
        assert!(!editor.has_floating());
        assert_eq!(active_pixel(&editor, 2, 1), RED);
        // Grown from the landed pixel, not the stale pre-transform mask
        assert!(editor.selection().contains(2, 1));
        assert!(editor.selection().contains(3, 1));
        assert!(editor.selection().contains(2, 0));
        assert!(!editor.selection().contains(1, 0));
    }

    #[test]
    fn test_undo_restores_pre_lift_buffer() {
        let mut editor = editor_4x4();
        editor.draw_pixels(&[(0, 0)], RED);
        editor.select_rect(0, 0, 1, 1);
        editor.begin_transform();
        editor.translate_floating(2, 2);
        editor.commit_floating();
        assert_eq!(active_pixel(&editor, 2, 2), RED);

        // One undo covers the whole lift-transform-commit step
        assert!(editor.undo());
        assert_eq!(active_pixel(&editor, 0, 0), RED);
        assert_eq!(active_pixel(&editor, 2, 2), [0, 0, 0, 0]);
    }

    #[test]
    fn test_merge_down_applies_blend_and_opacity() {
        let mut editor = editor_4x4();
        editor.draw_pixels(&[(1, 1)], [0, 0, 255, 255]);

        let top = editor.add_layer("Top").unwrap();
        let frame_id = editor.document().current_frame_id();
        editor.document_mut().set_active_layer(frame_id, top);
        editor.draw_pixels(&[(1, 1)], [255, 255, 255, 255]);
        editor.document_mut().layer_mut(top).unwrap().blend_mode = BlendMode::Multiply;

        assert!(editor.merge_down(top));
        let frame = editor.document().frame(frame_id).unwrap();
        assert_eq!(frame.layer_order.len(), 1);
        // multiply(255, c) == c
        assert_eq!(active_pixel(&editor, 1, 1), [0, 0, 255, 255]);
    }

    #[test]
    fn test_merge_down_bottom_layer_is_noop() {
        let mut editor = editor_4x4();
        let bottom = editor.active_layer_id().unwrap();
        assert!(!editor.merge_down(bottom));
        assert!(!editor.can_undo());
    }

    #[test]
    fn test_flatten_frame() {
        let mut editor = editor_4x4();
        editor.draw_pixels(&[(0, 0)], RED);
        let top = editor.add_layer("Top").unwrap();
        let frame_id = editor.document().current_frame_id();
        editor.document_mut().set_active_layer(frame_id, top);
        editor.draw_pixels(&[(3, 3)], [0, 255, 0, 255]);

        assert!(editor.flatten_frame());
        let frame = editor.document().frame(frame_id).unwrap();
        assert_eq!(frame.layer_order.len(), 1);
        let flat = editor.document().layer(frame.layer_order[0]).unwrap();
        assert_eq!(flat.pixels.get_pixel(0, 0), Some(RED));
        assert_eq!(flat.pixels.get_pixel(3, 3), Some([0, 255, 0, 255]));
    }

    #[test]
    fn test_structural_undo_restores_layer_stack() {
        let mut editor = editor_4x4();
        let frame_id = editor.document().current_frame_id();
        editor.add_layer("Scratch");
        assert_eq!(editor.document().frame(frame_id).unwrap().layer_order.len(), 2);

        assert!(editor.undo());
        assert_eq!(editor.document().frame(frame_id).unwrap().layer_order.len(), 1);

        assert!(editor.redo());
        assert_eq!(editor.document().frame(frame_id).unwrap().layer_order.len(), 2);
    }

    #[test]
    fn test_undo_delete_frame_restores_frame() {
        let mut editor = editor_4x4();
        let first = editor.document().current_frame_id();
        let second = editor.insert_frame();
        editor.document_mut().set_current_frame_index(1);
        editor.draw_pixels(&[(2, 2)], RED);

        assert!(editor.delete_frame(second));
        assert_eq!(editor.document().frame_count(), 1);

        // Undo of the delete brings the frame back, pixels included
        assert!(editor.undo());
        assert_eq!(editor.document().frame_order(), &[first, second]);
        let revived = editor.document().frame(second).unwrap();
        let layer = editor.document().layer(revived.layer_order[0]).unwrap();
        assert_eq!(layer.pixels.get_pixel(2, 2), Some(RED));

        assert!(editor.redo());
        assert_eq!(editor.document().frame_count(), 1);
        assert_eq!(editor.document().frame_order(), &[first]);
    }

    #[test]
    fn test_undo_insert_frame_removes_frame() {
        let mut editor = editor_4x4();
        let first = editor.document().current_frame_id();
        let inserted = editor.insert_frame();
        assert_eq!(editor.document().frame_count(), 2);

        assert!(editor.undo());
        assert_eq!(editor.document().frame_order(), &[first]);
        assert!(editor.document().frame(inserted).is_none());

        assert!(editor.redo());
        assert_eq!(editor.document().frame_order(), &[first, inserted]);
    }

    #[test]
    fn test_undo_duplicate_frame_removes_copy() {
        let mut editor = editor_4x4();
        editor.draw_pixels(&[(0, 0)], RED);
        let copy = editor.duplicate_frame().unwrap();
        assert_eq!(editor.document().frame_count(), 2);

        assert!(editor.undo());
        assert_eq!(editor.document().frame_count(), 1);
        assert!(editor.document().frame(copy).is_none());
        // The original frame keeps its pixels
        assert_eq!(active_pixel(&editor, 0, 0), RED);
    }

    #[test]
    fn test_insert_tween_frames() {
        let mut editor = editor_4x4();
        let start = editor.document().current_frame_id();
        editor.draw_pixels(&[(0, 0)], [0, 0, 0, 255]);
        let end = editor.insert_frame();
        editor.document_mut().set_current_frame_index(1);
        editor.draw_pixels(&[(0, 0)], [200, 0, 0, 255]);

        let created = editor.insert_tween_frames(start, end, 2, Easing::Linear);
        assert_eq!(created.len(), 2);
        assert_eq!(editor.document().frame_count(), 4);
        // Tweens sit between start and end in animation order
        assert_eq!(editor.document().frame_order()[1], created[0]);
        assert_eq!(editor.document().frame_order()[2], created[1]);
    }

    #[test]
    fn test_tween_with_zero_count_is_noop() {
        let mut editor = editor_4x4();
        let start = editor.document().current_frame_id();
        let end = editor.insert_frame();
        let history_before = editor.can_undo();
        assert!(editor.insert_tween_frames(start, end, 0, Easing::Linear).is_empty());
        assert_eq!(editor.document().frame_count(), 2);
        assert_eq!(editor.can_undo(), history_before);
    }

    #[test]
    fn test_remote_patch_validated_then_applied() {
        let mut editor = editor_4x4();
        let layer_id = editor.active_layer_id().unwrap();

        let bad = [99, 255, 0, 0, 255];
        assert!(matches!(
            editor.apply_remote_patch(layer_id, &bad),
            Err(PatchError::IndexOutOfBounds { .. })
        ));

        let good = [5, 255, 0, 0, 255];
        editor.apply_remote_patch(layer_id, &good).unwrap();
        assert_eq!(active_pixel(&editor, 1, 1), RED);
        // Peer edits do not enter local history
        assert!(!editor.can_undo());
    }

    #[test]
    fn test_select_connected_uses_composite() {
        let mut editor = editor_4x4();
        editor.draw_pixels(&[(0, 0), (1, 0), (1, 1)], RED);
        editor.draw_pixels(&[(3, 3)], RED);

        editor.select_connected(0, 0);
        assert!(editor.selection().contains(0, 0));
        assert!(editor.selection().contains(1, 1));
        assert!(!editor.selection().contains(3, 3));
    }
}
