//! Document model - frames, layers and the arenas that own them
//!
//! Frames and layers are stored in arena vectors addressed by stable integer
//! handles ([`FrameId`], [`LayerId`]) with a side index mapping handle to
//! slot, so compositing never hashes string identifiers. Handles are never
//! reused within a document.
//!
//! Structural rules enforced here:
//! - every frame keeps at least one layer (deleting the last one is refused)
//! - a document keeps at least one frame
//! - each frame tracks an "active layer" used as the drawing target, falling
//!   back to the bottom layer when unset or stale

use crate::blend::BlendMode;
use crate::buffer::{Canvas, PixelBuffer};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Stable handle to a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerId(pub u32);

/// Stable handle to a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameId(pub u32);

/// Default frame duration for new frames.
pub const DEFAULT_FRAME_DURATION_MS: u32 = 100;

/// One opacity/blend-mode-tagged pixel plane within a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub id: LayerId,
    pub name: String,
    opacity: f32,
    pub blend_mode: BlendMode,
    pub visible: bool,
    pub locked: bool,
    pub pixels: PixelBuffer,
}

impl Layer {
    pub fn new(id: LayerId, name: impl Into<String>, canvas: Canvas) -> Self {
        Layer {
            id,
            name: name.into(),
            opacity: 1.0,
            blend_mode: BlendMode::Normal,
            visible: true,
            locked: false,
            pixels: PixelBuffer::new(canvas.width, canvas.height),
        }
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    /// Set opacity, clamped to [0, 1].
    pub fn set_opacity(&mut self, opacity: f32) {
        self.opacity = opacity.clamp(0.0, 1.0);
    }
}

/// One ordered layer stack plus playback metadata; frames sequenced form the
/// animation. `layer_order` is composition order, first = bottom.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub id: FrameId,
    pub duration_ms: u32,
    pub pivot: Option<(f32, f32)>,
    pub layer_order: Vec<LayerId>,
}

/// A named color palette carried with the project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedPalette {
    pub id: u32,
    pub name: String,
    /// Hex color strings, `#RRGGBB` or `#RRGGBBAA`.
    pub colors: Vec<String>,
}

/// The full editable project state: canvas, frame sequence, layer arenas and
/// project-level palette/settings metadata.
#[derive(Debug, Clone)]
pub struct Document {
    canvas: Canvas,
    layers: Vec<Layer>,
    layer_index: HashMap<u32, usize>,
    frames: Vec<Frame>,
    frame_index: HashMap<u32, usize>,
    frame_order: Vec<FrameId>,
    current_frame: usize,
    active_layers: HashMap<FrameId, LayerId>,
    next_layer_id: u32,
    next_frame_id: u32,
    pub palettes: Vec<NamedPalette>,
    pub active_palette_id: Option<u32>,
    pub recent_colors: Vec<String>,
    /// Opaque editor settings, round-tripped through snapshots untouched.
    pub settings: serde_json::Value,
}

impl Document {
    /// Create a document with one frame holding one blank layer.
    pub fn new(canvas: Canvas) -> Self {
        let mut doc = Document {
            canvas,
            layers: Vec::new(),
            layer_index: HashMap::new(),
            frames: Vec::new(),
            frame_index: HashMap::new(),
            frame_order: Vec::new(),
            current_frame: 0,
            active_layers: HashMap::new(),
            next_layer_id: 0,
            next_frame_id: 0,
            palettes: Vec::new(),
            active_palette_id: None,
            recent_colors: Vec::new(),
            settings: serde_json::Value::Null,
        };
        let frame_id = doc.alloc_frame(DEFAULT_FRAME_DURATION_MS, None);
        let layer_id = doc.alloc_layer("Layer 1");
        doc.frame_mut(frame_id).unwrap().layer_order.push(layer_id);
        doc.frame_order.push(frame_id);
        doc
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    // ---- arena plumbing ----

    fn alloc_layer(&mut self, name: impl Into<String>) -> LayerId {
        let id = LayerId(self.next_layer_id);
        self.next_layer_id += 1;
        self.layer_index.insert(id.0, self.layers.len());
        self.layers.push(Layer::new(id, name, self.canvas));
        id
    }

    fn insert_layer_record(&mut self, mut layer: Layer) -> LayerId {
        let id = LayerId(self.next_layer_id);
        self.next_layer_id += 1;
        layer.id = id;
        self.layer_index.insert(id.0, self.layers.len());
        self.layers.push(layer);
        id
    }

    fn remove_layer_record(&mut self, id: LayerId) -> Option<Layer> {
        let slot = self.layer_index.remove(&id.0)?;
        let removed = self.layers.swap_remove(slot);
        if slot < self.layers.len() {
            let moved_id = self.layers[slot].id;
            self.layer_index.insert(moved_id.0, slot);
        }
        Some(removed)
    }

    fn alloc_frame(&mut self, duration_ms: u32, pivot: Option<(f32, f32)>) -> FrameId {
        let id = FrameId(self.next_frame_id);
        self.next_frame_id += 1;
        self.frame_index.insert(id.0, self.frames.len());
        self.frames.push(Frame { id, duration_ms, pivot, layer_order: Vec::new() });
        id
    }

    fn remove_frame_record(&mut self, id: FrameId) -> Option<Frame> {
        let slot = self.frame_index.remove(&id.0)?;
        let removed = self.frames.swap_remove(slot);
        if slot < self.frames.len() {
            let moved_id = self.frames[slot].id;
            self.frame_index.insert(moved_id.0, slot);
        }
        Some(removed)
    }

    // ---- lookups ----

    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.layer_index.get(&id.0).map(|&slot| &self.layers[slot])
    }

    pub fn layer_mut(&mut self, id: LayerId) -> Option<&mut Layer> {
        let slot = *self.layer_index.get(&id.0)?;
        Some(&mut self.layers[slot])
    }

    pub fn frame(&self, id: FrameId) -> Option<&Frame> {
        self.frame_index.get(&id.0).map(|&slot| &self.frames[slot])
    }

    pub fn frame_mut(&mut self, id: FrameId) -> Option<&mut Frame> {
        let slot = *self.frame_index.get(&id.0)?;
        Some(&mut self.frames[slot])
    }

    /// Frame ids in animation order.
    pub fn frame_order(&self) -> &[FrameId] {
        &self.frame_order
    }

    pub fn frame_count(&self) -> usize {
        self.frame_order.len()
    }

    /// Index of the current frame within the animation order.
    pub fn current_frame_index(&self) -> usize {
        self.current_frame
    }

    pub fn current_frame_id(&self) -> FrameId {
        self.frame_order[self.current_frame]
    }

    /// Move the current-frame cursor; out-of-range indices are clamped.
    pub fn set_current_frame_index(&mut self, index: usize) {
        self.current_frame = index.min(self.frame_order.len().saturating_sub(1));
    }

    /// The frame's drawing target. Falls back to the bottom layer when the
    /// recorded active layer is unset or no longer in the frame.
    pub fn active_layer_id(&self, frame_id: FrameId) -> Option<LayerId> {
        let frame = self.frame(frame_id)?;
        if let Some(&active) = self.active_layers.get(&frame_id) {
            if frame.layer_order.contains(&active) {
                return Some(active);
            }
        }
        frame.layer_order.first().copied()
    }

    /// Record the drawing target for a frame; ignored when the layer is not
    /// part of the frame.
    pub fn set_active_layer(&mut self, frame_id: FrameId, layer_id: LayerId) {
        let belongs = self
            .frame(frame_id)
            .map(|f| f.layer_order.contains(&layer_id))
            .unwrap_or(false);
        if belongs {
            self.active_layers.insert(frame_id, layer_id);
        }
    }

    /// Raw active-layer records, for snapshot serialization.
    pub fn active_layer_map(&self) -> &HashMap<FrameId, LayerId> {
        &self.active_layers
    }

    // ---- layer lifecycle ----

    /// Append a blank layer on top of a frame's stack.
    pub fn add_layer(&mut self, frame_id: FrameId, name: impl Into<String>) -> Option<LayerId> {
        self.frame(frame_id)?;
        let layer_id = self.alloc_layer(name);
        self.frame_mut(frame_id).unwrap().layer_order.push(layer_id);
        Some(layer_id)
    }

    /// Duplicate a layer in place, inserting the copy directly above the
    /// original.
    pub fn duplicate_layer(&mut self, frame_id: FrameId, layer_id: LayerId) -> Option<LayerId> {
        let position = self.frame(frame_id)?.layer_order.iter().position(|&id| id == layer_id)?;
        let mut copy = self.layer(layer_id)?.clone();
        copy.name = format!("{} copy", copy.name);
        let copy_id = self.insert_layer_record(copy);
        self.frame_mut(frame_id).unwrap().layer_order.insert(position + 1, copy_id);
        Some(copy_id)
    }

    /// Delete a layer. Refused (returns false) when it is the frame's last
    /// layer, so a frame never goes empty.
    pub fn delete_layer(&mut self, frame_id: FrameId, layer_id: LayerId) -> bool {
        let Some(frame) = self.frame(frame_id) else { return false };
        if frame.layer_order.len() <= 1 || !frame.layer_order.contains(&layer_id) {
            return false;
        }
        self.frame_mut(frame_id).unwrap().layer_order.retain(|&id| id != layer_id);
        self.remove_layer_record(layer_id);
        true
    }

    /// Move a layer to a new position within its frame's stack.
    pub fn reorder_layer(&mut self, frame_id: FrameId, layer_id: LayerId, new_index: usize) -> bool {
        let Some(frame) = self.frame_mut(frame_id) else { return false };
        let Some(position) = frame.layer_order.iter().position(|&id| id == layer_id) else {
            return false;
        };
        let id = frame.layer_order.remove(position);
        let clamped = new_index.min(frame.layer_order.len());
        frame.layer_order.insert(clamped, id);
        true
    }

    /// Replace a layer's pixel plane wholesale (undo/redo restore path).
    pub fn restore_layer_pixels(&mut self, layer_id: LayerId, pixels: PixelBuffer) {
        if let Some(layer) = self.layer_mut(layer_id) {
            layer.pixels = pixels;
        }
    }

    // ---- frame lifecycle ----

    /// Insert a new frame (one blank layer) after `after`, or at the end.
    pub fn insert_frame(&mut self, after: Option<FrameId>) -> FrameId {
        let frame_id = self.alloc_frame(DEFAULT_FRAME_DURATION_MS, None);
        let layer_id = self.alloc_layer("Layer 1");
        self.frame_mut(frame_id).unwrap().layer_order.push(layer_id);
        let position = after
            .and_then(|id| self.frame_order.iter().position(|&f| f == id))
            .map(|p| p + 1)
            .unwrap_or(self.frame_order.len());
        self.frame_order.insert(position, frame_id);
        frame_id
    }

    /// Insert an already-built frame (tween output) after `after`. The
    /// frame's layers are deep-copied into the arena under fresh handles.
    pub fn insert_built_frame(
        &mut self,
        after: Option<FrameId>,
        duration_ms: u32,
        pivot: Option<(f32, f32)>,
        layers: Vec<Layer>,
    ) -> FrameId {
        let frame_id = self.alloc_frame(duration_ms, pivot);
        for layer in layers {
            let layer_id = self.insert_layer_record(layer);
            self.frame_mut(frame_id).unwrap().layer_order.push(layer_id);
        }
        let position = after
            .and_then(|id| self.frame_order.iter().position(|&f| f == id))
            .map(|p| p + 1)
            .unwrap_or(self.frame_order.len());
        self.frame_order.insert(position, frame_id);
        frame_id
    }

    /// Duplicate a frame and its full layer stack, inserting the copy right
    /// after the original.
    pub fn duplicate_frame(&mut self, frame_id: FrameId) -> Option<FrameId> {
        let source = self.frame(frame_id)?.clone();
        let layers: Vec<Layer> = source
            .layer_order
            .iter()
            .filter_map(|&id| self.layer(id).cloned())
            .collect();
        Some(self.insert_built_frame(Some(frame_id), source.duration_ms, source.pivot, layers))
    }

    /// Delete a frame and its layers. Refused when it is the last frame.
    pub fn delete_frame(&mut self, frame_id: FrameId) -> bool {
        if self.frame_order.len() <= 1 {
            return false;
        }
        let Some(position) = self.frame_order.iter().position(|&id| id == frame_id) else {
            return false;
        };
        self.frame_order.remove(position);
        self.active_layers.remove(&frame_id);
        if let Some(frame) = self.remove_frame_record(frame_id) {
            for layer_id in frame.layer_order {
                self.remove_layer_record(layer_id);
            }
        }
        if self.current_frame >= self.frame_order.len() {
            self.current_frame = self.frame_order.len() - 1;
        }
        true
    }

    /// Rebuild a document from deserialized parts (the snapshot decode
    /// path). `frames` is animation order; every id in each frame's
    /// `layer_order` must appear in `layers`. Returns None when the parts
    /// violate the structural invariants (no frames, an empty frame, or a
    /// dangling layer reference).
    pub fn from_parts(
        canvas: Canvas,
        frames: Vec<Frame>,
        layers: Vec<Layer>,
        current_frame_index: usize,
        active_layers: HashMap<FrameId, LayerId>,
    ) -> Option<Document> {
        if frames.is_empty() {
            return None;
        }
        let layer_index: HashMap<u32, usize> =
            layers.iter().enumerate().map(|(slot, l)| (l.id.0, slot)).collect();
        for frame in &frames {
            if frame.layer_order.is_empty() {
                return None;
            }
            for layer_id in &frame.layer_order {
                if !layer_index.contains_key(&layer_id.0) {
                    return None;
                }
            }
        }

        let next_layer_id = layers.iter().map(|l| l.id.0 + 1).max().unwrap_or(0);
        let next_frame_id = frames.iter().map(|f| f.id.0 + 1).max().unwrap_or(0);
        let frame_order: Vec<FrameId> = frames.iter().map(|f| f.id).collect();
        let frame_index: HashMap<u32, usize> =
            frames.iter().enumerate().map(|(slot, f)| (f.id.0, slot)).collect();
        let current_frame = current_frame_index.min(frame_order.len() - 1);

        Some(Document {
            canvas,
            layers,
            layer_index,
            frames,
            frame_index,
            frame_order,
            current_frame,
            active_layers,
            next_layer_id,
            next_frame_id,
            palettes: Vec::new(),
            active_palette_id: None,
            recent_colors: Vec::new(),
            settings: serde_json::Value::Null,
        })
    }

    // ---- whole-project snapshots (history) ----

    /// Deep-copy the animation sequence: every frame record with its ordered
    /// layer stack, in animation order.
    pub fn snapshot_frames(&self) -> Vec<(Frame, Vec<Layer>)> {
        self.frame_order
            .iter()
            .filter_map(|&frame_id| {
                let frame = self.frame(frame_id)?.clone();
                let layers: Vec<Layer> = frame
                    .layer_order
                    .iter()
                    .filter_map(|&id| self.layer(id).cloned())
                    .collect();
                Some((frame, layers))
            })
            .collect()
    }

    /// Restore the full frame sequence from a snapshot: frame records,
    /// animation order and layer stacks. Frames absent from the snapshot are
    /// dropped and deleted frames come back under their original handles, so
    /// undo of frame lifecycle edits round-trips. An empty snapshot is
    /// refused (a document keeps at least one frame).
    pub fn restore_frames(&mut self, snapshot: &[(Frame, Vec<Layer>)]) {
        if snapshot.is_empty() {
            return;
        }
        self.frames.clear();
        self.frame_index.clear();
        self.frame_order.clear();
        self.layers.clear();
        self.layer_index.clear();

        for (frame, layers) in snapshot {
            // Snapshots keep their original handles so the active-layer map
            // and later history entries stay valid.
            self.frame_index.insert(frame.id.0, self.frames.len());
            self.frames.push(frame.clone());
            self.frame_order.push(frame.id);
            self.next_frame_id = self.next_frame_id.max(frame.id.0 + 1);
            for layer in layers {
                self.layer_index.insert(layer.id.0, self.layers.len());
                self.layers.push(layer.clone());
                self.next_layer_id = self.next_layer_id.max(layer.id.0 + 1);
            }
        }
        self.current_frame = self.current_frame.min(self.frame_order.len() - 1);
        self.active_layers.retain(|frame_id, _| self.frame_index.contains_key(&frame_id.0));
    }
}
