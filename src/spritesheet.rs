//! Spritesheet packing - arranging animation frames into one sheet
//!
//! Frames are placed on a fixed grid of uniform cells (the largest frame
//! dimensions, scaled), with configurable outer padding and inter-cell
//! spacing. The per-frame rectangles come back alongside the sheet so
//! callers can build atlas metadata.

use crate::buffer::{PixelBuffer, Rect};
use crate::transform::scale_nearest;
use serde::{Deserialize, Serialize};

/// How frames flow across the sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SheetLayout {
    /// One row, frames left to right.
    Horizontal,
    /// One column, frames top to bottom.
    Vertical,
    /// Fixed column count, rows added as needed.
    Grid { columns: u32 },
}

/// Packing parameters for one spritesheet request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetSettings {
    pub layout: SheetLayout,
    /// Transparent border around the whole sheet, in pixels.
    pub padding: u32,
    /// Transparent gap between cells, in pixels.
    pub spacing: u32,
    /// Integer upscale factor applied to every frame (0 behaves as 1).
    pub scale: u32,
}

impl Default for SheetSettings {
    fn default() -> Self {
        SheetSettings { layout: SheetLayout::Horizontal, padding: 0, spacing: 0, scale: 1 }
    }
}

/// A packed sheet plus the rectangle each input frame landed in.
#[derive(Debug, Clone)]
pub struct Spritesheet {
    pub frame_rects: Vec<Rect>,
    pub width: u32,
    pub height: u32,
    pub pixels: PixelBuffer,
}

/// Pack frames into a spritesheet.
///
/// Cells are uniform: the largest frame width/height (after scaling), so a
/// smaller frame sits at its cell's top-left with transparent padding. An
/// empty frame list yields a 1x1 transparent sheet with no rects.
pub fn pack_spritesheet(frames: &[PixelBuffer], settings: &SheetSettings) -> Spritesheet {
    if frames.is_empty() {
        return Spritesheet {
            frame_rects: Vec::new(),
            width: 1,
            height: 1,
            pixels: PixelBuffer::new(1, 1),
        };
    }

    let scale = settings.scale.max(1);
    let scaled: Vec<PixelBuffer> = if scale == 1 {
        frames.to_vec()
    } else {
        frames.iter().map(|f| scale_nearest(f, scale as f64, scale as f64)).collect()
    };

    let cell_w = scaled.iter().map(|f| f.width()).max().unwrap_or(1).max(1);
    let cell_h = scaled.iter().map(|f| f.height()).max().unwrap_or(1).max(1);

    let count = scaled.len() as u32;
    let columns = match settings.layout {
        SheetLayout::Horizontal => count,
        SheetLayout::Vertical => 1,
        SheetLayout::Grid { columns } => columns.max(1),
    };
    let rows = count.div_ceil(columns);

    let width =
        settings.padding * 2 + columns * cell_w + columns.saturating_sub(1) * settings.spacing;
    let height = settings.padding * 2 + rows * cell_h + rows.saturating_sub(1) * settings.spacing;
    let mut pixels = PixelBuffer::new(width, height);

    let mut frame_rects = Vec::with_capacity(scaled.len());
    for (i, frame) in scaled.iter().enumerate() {
        let col = i as u32 % columns;
        let row = i as u32 / columns;
        let dest_x = settings.padding + col * (cell_w + settings.spacing);
        let dest_y = settings.padding + row * (cell_h + settings.spacing);

        for y in 0..frame.height() {
            for x in 0..frame.width() {
                if let Some(px) = frame.get_pixel(x, y) {
                    pixels.set_pixel(dest_x + x, dest_y + y, px);
                }
            }
        }

        frame_rects.push(Rect::new(dest_x, dest_y, frame.width(), frame.height()));
    }

    Spritesheet { frame_rects, width, height, pixels }
}
