//! Affine transforms and nearest-neighbor resampling
//!
//! Flips and 90-degree rotations are expressed as exact integer matrices so
//! pixel edges stay crisp; general rotation is deliberately not offered.
//! Resampling inverse-maps each destination pixel center to a source pixel,
//! defaulting to transparent for out-of-bounds sources.

use crate::buffer::PixelBuffer;

/// 2-D affine matrix: `[x', y'] = [a c; b d] * [x, y] + [e, f]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Affine {
    pub const IDENTITY: Affine = Affine { a: 1.0, b: 0.0, c: 0.0, d: 1.0, e: 0.0, f: 0.0 };

    /// Mirror across the vertical axis of a `width`-pixel buffer.
    pub fn flip_horizontal(width: u32) -> Affine {
        Affine { a: -1.0, b: 0.0, c: 0.0, d: 1.0, e: width as f64, f: 0.0 }
    }

    /// Mirror across the horizontal axis of a `height`-pixel buffer.
    pub fn flip_vertical(height: u32) -> Affine {
        Affine { a: 1.0, b: 0.0, c: 0.0, d: -1.0, e: 0.0, f: height as f64 }
    }

    /// Rotate a `height`-pixel buffer a quarter turn clockwise.
    pub fn rotate90_cw(height: u32) -> Affine {
        Affine { a: 0.0, b: 1.0, c: -1.0, d: 0.0, e: height as f64, f: 0.0 }
    }

    /// Rotate a `width`-pixel buffer a quarter turn counter-clockwise.
    pub fn rotate90_ccw(width: u32) -> Affine {
        Affine { a: 0.0, b: -1.0, c: 1.0, d: 0.0, e: 0.0, f: width as f64 }
    }

    /// Rotate a buffer a half turn.
    pub fn rotate180(width: u32, height: u32) -> Affine {
        Affine { a: -1.0, b: 0.0, c: 0.0, d: -1.0, e: width as f64, f: height as f64 }
    }

    /// Scale about the origin. Callers must reject non-positive factors.
    pub fn scale(sx: f64, sy: f64) -> Affine {
        Affine { a: sx, b: 0.0, c: 0.0, d: sy, e: 0.0, f: 0.0 }
    }

    pub fn translate(dx: f64, dy: f64) -> Affine {
        Affine { a: 1.0, b: 0.0, c: 0.0, d: 1.0, e: dx, f: dy }
    }

    /// Apply the forward transform to a point.
    #[inline]
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (self.a * x + self.c * y + self.e, self.b * x + self.d * y + self.f)
    }

    pub fn determinant(&self) -> f64 {
        self.a * self.d - self.b * self.c
    }

    /// Inverse matrix, or None when singular.
    pub fn invert(&self) -> Option<Affine> {
        let det = self.determinant();
        if det == 0.0 {
            return None;
        }
        Some(Affine {
            a: self.d / det,
            b: -self.b / det,
            c: -self.c / det,
            d: self.a / det,
            e: (self.c * self.f - self.d * self.e) / det,
            f: (self.b * self.e - self.a * self.f) / det,
        })
    }

    /// Bounding box of the transformed `[0,w] x [0,h]` rectangle:
    /// `(min_x, min_y, extent_x, extent_y)`.
    pub fn transformed_bounds(&self, width: u32, height: u32) -> (f64, f64, f64, f64) {
        let w = width as f64;
        let h = height as f64;
        let corners = [self.apply(0.0, 0.0), self.apply(w, 0.0), self.apply(0.0, h), self.apply(w, h)];
        let min_x = corners.iter().map(|c| c.0).fold(f64::INFINITY, f64::min);
        let max_x = corners.iter().map(|c| c.0).fold(f64::NEG_INFINITY, f64::max);
        let min_y = corners.iter().map(|c| c.1).fold(f64::INFINITY, f64::min);
        let max_y = corners.iter().map(|c| c.1).fold(f64::NEG_INFINITY, f64::max);
        (min_x, min_y, max_x - min_x, max_y - min_y)
    }
}

/// Resample a buffer through an affine transform with nearest-neighbor
/// sampling. Output dimensions come from the transformed bounding box; a
/// degenerate (zero-extent or singular) transform yields an empty buffer.
pub fn resample_nearest(src: &PixelBuffer, matrix: &Affine) -> PixelBuffer {
    let Some(inverse) = matrix.invert() else {
        return PixelBuffer::new(0, 0);
    };

    let (min_x, min_y, extent_x, extent_y) = matrix.transformed_bounds(src.width(), src.height());
    // Tolerance absorbs f64 rounding so exact integer extents don't floor down
    let out_w = (extent_x + 1e-9).floor().max(0.0) as u32;
    let out_h = (extent_y + 1e-9).floor().max(0.0) as u32;
    let mut out = PixelBuffer::new(out_w, out_h);

    for dy in 0..out_h {
        for dx in 0..out_w {
            let world_x = min_x + dx as f64 + 0.5;
            let world_y = min_y + dy as f64 + 0.5;
            let (sx, sy) = inverse.apply(world_x, world_y);
            let sxi = sx.floor() as i64;
            let syi = sy.floor() as i64;
            if sxi >= 0 && sxi < src.width() as i64 && syi >= 0 && syi < src.height() as i64 {
                if let Some(px) = src.get_pixel(sxi as u32, syi as u32) {
                    out.set_pixel(dx, dy, px);
                }
            }
        }
    }

    out
}

/// Mirror a full buffer left-to-right.
pub fn flip_horizontal(src: &PixelBuffer) -> PixelBuffer {
    resample_nearest(src, &Affine::flip_horizontal(src.width()))
}

/// Mirror a full buffer top-to-bottom.
pub fn flip_vertical(src: &PixelBuffer) -> PixelBuffer {
    resample_nearest(src, &Affine::flip_vertical(src.height()))
}

/// Rotate a full buffer a quarter turn clockwise (dimensions swap).
pub fn rotate90_cw(src: &PixelBuffer) -> PixelBuffer {
    resample_nearest(src, &Affine::rotate90_cw(src.height()))
}

/// Rotate a full buffer a quarter turn counter-clockwise (dimensions swap).
pub fn rotate90_ccw(src: &PixelBuffer) -> PixelBuffer {
    resample_nearest(src, &Affine::rotate90_ccw(src.width()))
}

/// Rotate a full buffer a half turn.
pub fn rotate180(src: &PixelBuffer) -> PixelBuffer {
    resample_nearest(src, &Affine::rotate180(src.width(), src.height()))
}

/// Scale a full buffer with nearest-neighbor sampling. Output dimensions are
/// `floor(w*sx) x floor(h*sy)`. Non-positive factors are rejected as a no-op
/// (the buffer is returned unchanged).
pub fn scale_nearest(src: &PixelBuffer, sx: f64, sy: f64) -> PixelBuffer {
    if sx <= 0.0 || sy <= 0.0 {
        return src.clone();
    }
    resample_nearest(src, &Affine::scale(sx, sy))
}
