//! Floating selections - lift, transform, commit
//!
//! A selection-backed transform detaches the selected pixels from their
//! layer into a floating buffer, applies affine transforms to it, and
//! eventually composites the result back. The state machine is
//! Idle -> (lift) -> Floating -> (commit | discard) -> Idle; at most one
//! floating selection exists at a time, enforced by the editor.

use crate::blend::composite_over;
use crate::buffer::PixelBuffer;
use crate::model::Layer;
use crate::selection::SelectionMask;
use crate::transform::{resample_nearest, Affine};

/// A detached, transform-in-progress pixel region not yet merged into a
/// layer. `x`/`y` place the buffer relative to the canvas and may go
/// negative while dragging; width/height live on the buffer and may differ
/// from the canvas after scaling.
#[derive(Debug, Clone, PartialEq)]
pub struct FloatingSelection {
    pub pixels: PixelBuffer,
    pub x: i32,
    pub y: i32,
}

impl FloatingSelection {
    /// Lift the masked region out of a layer.
    ///
    /// Extracts the mask's bounding box into a new floating buffer (pixels
    /// inside the box but outside the mask stay transparent) and clears the
    /// source pixels. Returns None when the selection is empty or the layer
    /// is locked; the layer is untouched in both cases.
    pub fn lift(layer: &mut Layer, mask: &SelectionMask) -> Option<FloatingSelection> {
        if layer.locked {
            return None;
        }
        let bounds = mask.bounds()?;

        let mut pixels = PixelBuffer::new(bounds.width, bounds.height);
        for by in 0..bounds.height {
            for bx in 0..bounds.width {
                let sx = bounds.x + bx;
                let sy = bounds.y + by;
                if mask.contains(sx, sy) {
                    if let Some(px) = layer.pixels.get_pixel(sx, sy) {
                        pixels.set_pixel(bx, by, px);
                        layer.pixels.set_pixel(sx, sy, [0, 0, 0, 0]);
                    }
                }
            }
        }

        Some(FloatingSelection { pixels, x: bounds.x as i32, y: bounds.y as i32 })
    }

    /// Apply an affine transform to the floating buffer, resampling with
    /// nearest-neighbor. The offset shifts by the transformed bounding-box
    /// origin so translations move the selection across the canvas.
    ///
    /// Degenerate transforms (singular matrix, zero-extent output) are
    /// rejected as a no-op and return false.
    pub fn transform(&mut self, matrix: &Affine) -> bool {
        if matrix.determinant() == 0.0 {
            return false;
        }
        let resampled = resample_nearest(&self.pixels, matrix);
        if resampled.width() == 0 || resampled.height() == 0 {
            return false;
        }
        let (min_x, min_y, _, _) = matrix.transformed_bounds(self.pixels.width(), self.pixels.height());
        self.x += (min_x + 1e-9).floor() as i32;
        self.y += (min_y + 1e-9).floor() as i32;
        self.pixels = resampled;
        true
    }

    /// Scale the floating buffer. Non-positive factors are rejected as a
    /// no-op.
    pub fn scale(&mut self, sx: f64, sy: f64) -> bool {
        if sx <= 0.0 || sy <= 0.0 {
            return false;
        }
        self.transform(&Affine::scale(sx, sy))
    }

    /// Rebuild the canvas-space selection mask by alpha-testing the floating
    /// buffer at its current offset, clipped to canvas bounds. An all-zero
    /// result is simply an empty mask ("no selection").
    pub fn to_mask(&self, canvas_width: u32, canvas_height: u32) -> SelectionMask {
        let mut mask = SelectionMask::new(canvas_width, canvas_height);
        for fy in 0..self.pixels.height() {
            for fx in 0..self.pixels.width() {
                let px = self.pixels.get_pixel(fx, fy).unwrap_or([0, 0, 0, 0]);
                if px[3] == 0 {
                    continue;
                }
                let cx = self.x + fx as i32;
                let cy = self.y + fy as i32;
                if cx >= 0 && cy >= 0 {
                    mask.set(cx as u32, cy as u32, true);
                }
            }
        }
        mask
    }

    /// Alpha-composite the floating buffer onto a target buffer at the
    /// current offset (over operator), clipped to the target bounds.
    pub fn composite_onto(&self, target: &mut PixelBuffer) {
        for fy in 0..self.pixels.height() {
            for fx in 0..self.pixels.width() {
                let fg = self.pixels.get_pixel(fx, fy).unwrap_or([0, 0, 0, 0]);
                if fg[3] == 0 {
                    continue;
                }
                let cx = self.x + fx as i32;
                let cy = self.y + fy as i32;
                if cx < 0 || cy < 0 {
                    continue;
                }
                let (cx, cy) = (cx as u32, cy as u32);
                if let Some(bg) = target.get_pixel(cx, cy) {
                    target.set_pixel(cx, cy, composite_over(fg, bg));
                }
            }
        }
    }
}
