//! Project snapshot serialization
//!
//! The persistence collaborator stores whole-project snapshots; this module
//! owns the wire shape. Layer pixel planes travel as base64 over their raw
//! RGBA bytes and must round-trip byte-for-byte. Decoding validates
//! everything (lengths, dimensions, structural invariants) before a
//! [`Document`] is rebuilt — the engine core trusts only already-validated
//! data.

use crate::blend::BlendMode;
use crate::buffer::{BufferError, Canvas, PixelBuffer};
use crate::model::{Document, Frame, FrameId, Layer, LayerId, NamedPalette};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Current snapshot schema version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Error decoding a project snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u32),
    #[error("invalid base64 pixel data for layer {layer}: {source}")]
    Base64 {
        layer: u32,
        #[source]
        source: base64::DecodeError,
    },
    #[error("invalid pixel buffer for layer {layer}: {source}")]
    Buffer {
        layer: u32,
        #[source]
        source: BufferError,
    },
    #[error("snapshot violates structural invariants (empty project, empty frame, or dangling layer reference)")]
    InvalidStructure,
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One layer on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerSnapshot {
    pub id: u32,
    pub name: String,
    pub opacity: f32,
    pub blend_mode: BlendMode,
    pub is_visible: bool,
    pub is_locked: bool,
    /// Base64 over the layer's raw RGBA bytes.
    pub pixel_data: String,
}

/// One frame on the wire. Layer order is composition order, first = bottom.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameSnapshot {
    pub id: u32,
    pub duration_ms: u32,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub pivot: Option<(f32, f32)>,
    pub layers: Vec<LayerSnapshot>,
}

/// The full project snapshot exchanged with the persistence layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    pub version: u32,
    pub canvas: Canvas,
    pub current_frame_index: usize,
    /// frame id -> active layer id
    pub active_layer_ids: HashMap<u32, u32>,
    pub palettes: Vec<NamedPalette>,
    pub active_palette_id: Option<u32>,
    pub recent_colors: Vec<String>,
    /// Opaque editor settings, passed through untouched.
    #[serde(default)]
    pub settings: serde_json::Value,
    pub frames: Vec<FrameSnapshot>,
}

/// Capture a document as a snapshot.
pub fn encode_snapshot(doc: &Document) -> ProjectSnapshot {
    let frames = doc
        .frame_order()
        .iter()
        .filter_map(|&frame_id| {
            let frame = doc.frame(frame_id)?;
            let layers = frame
                .layer_order
                .iter()
                .filter_map(|&layer_id| {
                    let layer = doc.layer(layer_id)?;
                    Some(LayerSnapshot {
                        id: layer.id.0,
                        name: layer.name.clone(),
                        opacity: layer.opacity(),
                        blend_mode: layer.blend_mode,
                        is_visible: layer.visible,
                        is_locked: layer.locked,
                        pixel_data: BASE64.encode(layer.pixels.as_bytes()),
                    })
                })
                .collect();
            Some(FrameSnapshot {
                id: frame.id.0,
                duration_ms: frame.duration_ms,
                pivot: frame.pivot,
                layers,
            })
        })
        .collect();

    ProjectSnapshot {
        version: SNAPSHOT_VERSION,
        canvas: doc.canvas(),
        current_frame_index: doc.current_frame_index(),
        active_layer_ids: doc.active_layer_map().iter().map(|(f, l)| (f.0, l.0)).collect(),
        palettes: doc.palettes.clone(),
        active_palette_id: doc.active_palette_id,
        recent_colors: doc.recent_colors.clone(),
        settings: doc.settings.clone(),
        frames,
    }
}

impl ProjectSnapshot {
    /// Serialize to a JSON string.
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize from a JSON string.
    pub fn from_json(json: &str) -> Result<ProjectSnapshot, SnapshotError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Rebuild a document from a snapshot, validating as it goes.
pub fn decode_snapshot(snapshot: &ProjectSnapshot) -> Result<Document, SnapshotError> {
    if snapshot.version != SNAPSHOT_VERSION {
        return Err(SnapshotError::UnsupportedVersion(snapshot.version));
    }

    let mut frames = Vec::with_capacity(snapshot.frames.len());
    let mut layers = Vec::new();
    for frame_snap in &snapshot.frames {
        let mut layer_order = Vec::with_capacity(frame_snap.layers.len());
        for layer_snap in &frame_snap.layers {
            let bytes = BASE64
                .decode(&layer_snap.pixel_data)
                .map_err(|source| SnapshotError::Base64 { layer: layer_snap.id, source })?;
            let pixels = PixelBuffer::from_raw(snapshot.canvas.width, snapshot.canvas.height, bytes)
                .map_err(|source| SnapshotError::Buffer { layer: layer_snap.id, source })?;

            let mut layer = Layer::new(LayerId(layer_snap.id), layer_snap.name.clone(), snapshot.canvas);
            layer.set_opacity(layer_snap.opacity);
            layer.blend_mode = layer_snap.blend_mode;
            layer.visible = layer_snap.is_visible;
            layer.locked = layer_snap.is_locked;
            layer.pixels = pixels;

            layer_order.push(layer.id);
            layers.push(layer);
        }
        frames.push(Frame {
            id: FrameId(frame_snap.id),
            duration_ms: frame_snap.duration_ms,
            pivot: frame_snap.pivot,
            layer_order,
        });
    }

    let active_layers: HashMap<FrameId, LayerId> = snapshot
        .active_layer_ids
        .iter()
        .map(|(&f, &l)| (FrameId(f), LayerId(l)))
        .collect();

    let mut doc = Document::from_parts(
        snapshot.canvas,
        frames,
        layers,
        snapshot.current_frame_index,
        active_layers,
    )
    .ok_or(SnapshotError::InvalidStructure)?;

    doc.palettes = snapshot.palettes.clone();
    doc.active_palette_id = snapshot.active_palette_id;
    doc.recent_colors = snapshot.recent_colors.clone();
    doc.settings = snapshot.settings.clone();
    Ok(doc)
}
