//! spriteforge - Engine for a raster sprite and animation editor
//!
//! This library provides the headless core of a pixel-art editor:
//! - Layered, multi-frame documents with alpha compositing and blend modes
//! - Selections, floating transforms and snapshot-based undo/redo
//! - Keyframe tweening, palette quantization and dithering
//! - JSON snapshot, pixel patch and palette file interchange

pub mod blend;
pub mod buffer;
pub mod compositor;
pub mod editor;
pub mod floating;
pub mod history;
pub mod model;
pub mod palette_io;
pub mod patch;
pub mod quantize;
pub mod selection;
pub mod snapshot;
pub mod spritesheet;
pub mod transform;
pub mod tween;
pub mod worker;
