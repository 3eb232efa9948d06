//! Pixel buffer and canvas primitives
//!
//! A [`PixelBuffer`] is the flat byte representation of one image plane:
//! 4 bytes per pixel (R, G, B, A), row-major, top-left origin. Every layer
//! and floating selection owns exactly one buffer; cloning produces a fully
//! independent copy, which is what history snapshots rely on.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum canvas edge length in pixels.
pub const MAX_CANVAS_DIM: u32 = 4096;

/// Error constructing a canvas or buffer with invalid geometry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BufferError {
    /// Dimension outside 1..=4096
    #[error("canvas dimension {0} out of range (1..={MAX_CANVAS_DIM})")]
    DimensionOutOfRange(u32),
    /// Raw byte length doesn't match width*height*4
    #[error("pixel data length {actual} does not match {width}x{height}x4 = {expected}")]
    LengthMismatch { width: u32, height: u32, expected: usize, actual: usize },
}

/// Fixed pixel dimensions shared by all layers in a project.
///
/// The canvas never changes for the lifetime of a project; resizing means
/// rebuilding every buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Canvas {
    /// Create a canvas, validating both dimensions against 1..=4096.
    pub fn new(width: u32, height: u32) -> Result<Self, BufferError> {
        for dim in [width, height] {
            if dim == 0 || dim > MAX_CANVAS_DIM {
                return Err(BufferError::DimensionOutOfRange(dim));
            }
        }
        Ok(Canvas { width, height })
    }

    /// Number of pixels on the canvas.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// An axis-aligned pixel rectangle (x, y is the top-left corner).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Rect { x, y, width, height }
    }
}

/// A flat RGBA8 pixel plane.
///
/// Invariant: `data.len() == width * height * 4`, maintained by every
/// constructor and mutation. `Clone` deep-copies the bytes.
///
/// # Examples
///
/// ```
/// use spriteforge::buffer::PixelBuffer;
///
/// let mut buf = PixelBuffer::new(4, 4);
/// buf.set_pixel(1, 1, [255, 0, 0, 255]);
/// assert_eq!(buf.get_pixel(1, 1), Some([255, 0, 0, 255]));
/// assert_eq!(buf.get_pixel(0, 0), Some([0, 0, 0, 0]));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Create a fully transparent buffer.
    pub fn new(width: u32, height: u32) -> Self {
        PixelBuffer { width, height, data: vec![0; width as usize * height as usize * 4] }
    }

    /// Create a buffer filled with a single color.
    pub fn from_pixel(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let mut buf = PixelBuffer::new(width, height);
        buf.fill(rgba);
        buf
    }

    /// Wrap raw bytes, checking the length invariant.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self, BufferError> {
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(BufferError::LengthMismatch {
                width,
                height,
                expected,
                actual: data.len(),
            });
        }
        Ok(PixelBuffer { width, height, data })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of pixels (not bytes).
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Raw bytes, row-major RGBA.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Consume the buffer and return its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Flat pixel index for (x, y), without bounds checking.
    #[inline]
    pub fn pixel_index(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize) + x as usize
    }

    /// Read one pixel, or None when (x, y) is off the buffer.
    #[inline]
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.pixel_at(self.pixel_index(x, y)))
    }

    /// Read the pixel at a flat index. Panics if out of range (trusted path).
    #[inline]
    pub fn pixel_at(&self, index: usize) -> [u8; 4] {
        let i = index * 4;
        [self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]]
    }

    /// Write one pixel; off-buffer coordinates are ignored.
    #[inline]
    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let i = self.pixel_index(x, y);
        self.set_pixel_at(i, rgba);
    }

    /// Write the pixel at a flat index. Panics if out of range (trusted path).
    #[inline]
    pub fn set_pixel_at(&mut self, index: usize, rgba: [u8; 4]) {
        let i = index * 4;
        self.data[i..i + 4].copy_from_slice(&rgba);
    }

    /// Overwrite every pixel with one color.
    pub fn fill(&mut self, rgba: [u8; 4]) {
        for chunk in self.data.chunks_exact_mut(4) {
            chunk.copy_from_slice(&rgba);
        }
    }

    /// True when every pixel is fully transparent.
    pub fn is_blank(&self) -> bool {
        self.data.chunks_exact(4).all(|px| px[3] == 0)
    }
}
