//! Selection masks - boolean pixel overlays and their algebra
//!
//! A [`SelectionMask`] is a 0/1 byte grid the size of the canvas. It never
//! owns pixel data; it only marks which cells an operation applies to.
//! A mask that ends up all-zero after any operation means "no selection" and
//! callers are expected to check [`SelectionMask::is_empty`] before acting.

use crate::buffer::{PixelBuffer, Rect};
use std::collections::VecDeque;

/// Boolean overlay over the canvas, one byte per pixel (0 or 1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionMask {
    width: u32,
    height: u32,
    cells: Vec<u8>,
}

impl SelectionMask {
    /// Create an empty (all-zero) mask.
    pub fn new(width: u32, height: u32) -> Self {
        SelectionMask { width, height, cells: vec![0; width as usize * height as usize] }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize) + x as usize
    }

    /// Whether the cell at (x, y) is selected; out-of-canvas is unselected.
    #[inline]
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height && self.cells[self.index(x, y)] != 0
    }

    /// Set or clear one cell; out-of-canvas coordinates are ignored.
    #[inline]
    pub fn set(&mut self, x: u32, y: u32, selected: bool) {
        if x < self.width && y < self.height {
            let i = self.index(x, y);
            self.cells[i] = selected as u8;
        }
    }

    /// Select every cell.
    pub fn select_all(&mut self) {
        self.cells.fill(1);
    }

    /// Deselect every cell.
    pub fn clear(&mut self) {
        self.cells.fill(0);
    }

    /// True when no cell is selected.
    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(|&c| c == 0)
    }

    /// Select a rectangle, clipped to the canvas.
    pub fn select_rect(&mut self, x: u32, y: u32, width: u32, height: u32) {
        for yy in y..(y + height).min(self.height) {
            for xx in x..(x + width).min(self.width) {
                let i = self.index(xx, yy);
                self.cells[i] = 1;
            }
        }
    }

    /// `a[i] |= b[i]` — requires matching dimensions, no-op otherwise.
    pub fn union(&mut self, other: &SelectionMask) {
        if !self.same_grid(other) {
            return;
        }
        for (a, &b) in self.cells.iter_mut().zip(&other.cells) {
            *a |= b;
        }
    }

    /// `a[i] &= b[i]`
    pub fn intersect(&mut self, other: &SelectionMask) {
        if !self.same_grid(other) {
            return;
        }
        for (a, &b) in self.cells.iter_mut().zip(&other.cells) {
            *a &= b;
        }
    }

    /// `a[i] &= !b[i]`
    pub fn subtract(&mut self, other: &SelectionMask) {
        if !self.same_grid(other) {
            return;
        }
        for (a, &b) in self.cells.iter_mut().zip(&other.cells) {
            *a &= 1 - b;
        }
    }

    /// `a[i] = 1 - a[i]`
    pub fn invert(&mut self) {
        for c in self.cells.iter_mut() {
            *c = 1 - *c;
        }
    }

    fn same_grid(&self, other: &SelectionMask) -> bool {
        self.width == other.width && self.height == other.height
    }

    /// One-pass 4-neighbor morphological dilation. A cell becomes selected
    /// when it or any 4-neighbor was selected; out-of-canvas neighbors count
    /// as unselected.
    pub fn grow(&mut self) {
        let before = self.cells.clone();
        for y in 0..self.height {
            for x in 0..self.width {
                if before[self.index(x, y)] != 0 {
                    continue;
                }
                let neighbor_set = (x > 0 && before[self.index(x - 1, y)] != 0)
                    || (x + 1 < self.width && before[self.index(x + 1, y)] != 0)
                    || (y > 0 && before[self.index(x, y - 1)] != 0)
                    || (y + 1 < self.height && before[self.index(x, y + 1)] != 0);
                if neighbor_set {
                    let i = self.index(x, y);
                    self.cells[i] = 1;
                }
            }
        }
    }

    /// One-pass 4-neighbor morphological erosion. A cell stays selected only
    /// when all four neighbors were selected; the canvas edge erodes.
    pub fn shrink(&mut self) {
        let before = self.cells.clone();
        for y in 0..self.height {
            for x in 0..self.width {
                if before[self.index(x, y)] == 0 {
                    continue;
                }
                let all_neighbors = (x > 0 && before[self.index(x - 1, y)] != 0)
                    && (x + 1 < self.width && before[self.index(x + 1, y)] != 0)
                    && (y > 0 && before[self.index(x, y - 1)] != 0)
                    && (y + 1 < self.height && before[self.index(x, y + 1)] != 0);
                if !all_neighbors {
                    let i = self.index(x, y);
                    self.cells[i] = 0;
                }
            }
        }
    }

    /// Minimal rectangle containing every selected cell, or None when empty.
    pub fn bounds(&self) -> Option<Rect> {
        let mut min_x = u32::MAX;
        let mut min_y = u32::MAX;
        let mut max_x = 0u32;
        let mut max_y = 0u32;
        let mut any = false;

        for y in 0..self.height {
            for x in 0..self.width {
                if self.cells[self.index(x, y)] != 0 {
                    any = true;
                    min_x = min_x.min(x);
                    min_y = min_y.min(y);
                    max_x = max_x.max(x);
                    max_y = max_y.max(y);
                }
            }
        }

        if !any {
            return None;
        }
        Some(Rect::new(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1))
    }

    /// Select the 4-connected region of nonzero-alpha pixels under (x, y) in
    /// a composite buffer — "select the object under the cursor".
    ///
    /// Returns an empty mask when the start pixel is transparent or off the
    /// buffer.
    pub fn from_connected_region(composite: &PixelBuffer, x: u32, y: u32) -> SelectionMask {
        let width = composite.width();
        let height = composite.height();
        let mut mask = SelectionMask::new(width, height);

        let opaque = |px: u32, py: u32| -> bool {
            composite.get_pixel(px, py).map(|p| p[3] != 0).unwrap_or(false)
        };
        if !opaque(x, y) {
            return mask;
        }

        let mut queue = VecDeque::new();
        queue.push_back((x, y));
        mask.set(x, y, true);

        while let Some((cx, cy)) = queue.pop_front() {
            let mut visit = |nx: u32, ny: u32, mask: &mut SelectionMask,
                             queue: &mut VecDeque<(u32, u32)>| {
                if !mask.contains(nx, ny) && opaque(nx, ny) {
                    mask.set(nx, ny, true);
                    queue.push_back((nx, ny));
                }
            };
            if cx > 0 {
                visit(cx - 1, cy, &mut mask, &mut queue);
            }
            if cx + 1 < width {
                visit(cx + 1, cy, &mut mask, &mut queue);
            }
            if cy > 0 {
                visit(cx, cy - 1, &mut mask, &mut queue);
            }
            if cy + 1 < height {
                visit(cx, cy + 1, &mut mask, &mut queue);
            }
        }

        mask
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_with(cells: &[(u32, u32)]) -> SelectionMask {
        let mut m = SelectionMask::new(4, 4);
        for &(x, y) in cells {
            m.set(x, y, true);
        }
        m
    }

    #[test]
    fn test_select_all_and_clear() {
        let mut m = SelectionMask::new(3, 3);
        assert!(m.is_empty());
        m.select_all();
        assert!(!m.is_empty());
        assert!(m.contains(2, 2));
        m.clear();
        assert!(m.is_empty());
    }

    #[test]
    fn test_union_intersect_subtract() {
        let mut a = mask_with(&[(0, 0), (1, 0)]);
        let b = mask_with(&[(1, 0), (2, 0)]);

        let mut u = a.clone();
        u.union(&b);
        assert!(u.contains(0, 0) && u.contains(1, 0) && u.contains(2, 0));

        let mut i = a.clone();
        i.intersect(&b);
        assert!(!i.contains(0, 0) && i.contains(1, 0) && !i.contains(2, 0));

        a.subtract(&b);
        assert!(a.contains(0, 0) && !a.contains(1, 0));
    }

    #[test]
    fn test_invert_involution() {
        let mut m = mask_with(&[(0, 0), (3, 3), (2, 1)]);
        let original = m.clone();
        m.invert();
        assert!(!m.contains(0, 0));
        assert!(m.contains(1, 1));
        m.invert();
        assert_eq!(m, original);
    }

    #[test]
    fn test_union_then_subtract_superset_law() {
        let a = mask_with(&[(0, 0), (1, 1)]);
        let b = mask_with(&[(1, 1), (2, 2)]);

        let mut left = a.clone();
        left.union(&b);
        left.subtract(&b);

        let mut right = a.clone();
        right.subtract(&b);

        // union(a,b) \ b contains everything in a \ b
        for y in 0..4 {
            for x in 0..4 {
                if right.contains(x, y) {
                    assert!(left.contains(x, y), "({}, {}) missing from left", x, y);
                }
            }
        }
    }

    #[test]
    fn test_grow_dilates_4_neighbors() {
        let mut m = mask_with(&[(1, 1)]);
        m.grow();
        assert!(m.contains(1, 1));
        assert!(m.contains(0, 1) && m.contains(2, 1) && m.contains(1, 0) && m.contains(1, 2));
        // Diagonals untouched
        assert!(!m.contains(0, 0) && !m.contains(2, 2));
    }

    #[test]
    fn test_shrink_erodes_edges() {
        let mut m = SelectionMask::new(4, 4);
        m.select_rect(0, 0, 3, 3);
        m.shrink();
        // Only the cell with all four neighbors selected survives
        assert!(m.contains(1, 1));
        assert!(!m.contains(0, 0) && !m.contains(2, 2) && !m.contains(0, 1));
    }

    #[test]
    fn test_shrink_canvas_edge_counts_unselected() {
        let mut m = SelectionMask::new(4, 4);
        m.select_all();
        m.shrink();
        // Border erodes, interior survives
        assert!(!m.contains(0, 0) && !m.contains(3, 3));
        assert!(m.contains(1, 1) && m.contains(2, 2));
    }

    #[test]
    fn test_bounds() {
        assert_eq!(SelectionMask::new(4, 4).bounds(), None);
        let m = mask_with(&[(1, 2), (3, 3)]);
        assert_eq!(m.bounds(), Some(Rect::new(1, 2, 3, 2)));
    }

    #[test]
    fn test_connected_region_stops_at_transparent() {
        // Two opaque blobs separated by a transparent column
        let mut buf = PixelBuffer::new(5, 3);
        for y in 0..3 {
            buf.set_pixel(0, y, [255, 0, 0, 255]);
            buf.set_pixel(1, y, [255, 0, 0, 255]);
            buf.set_pixel(3, y, [0, 255, 0, 255]);
            buf.set_pixel(4, y, [0, 255, 0, 255]);
        }

        let mask = SelectionMask::from_connected_region(&buf, 0, 0);
        assert!(mask.contains(0, 0) && mask.contains(1, 2));
        assert!(!mask.contains(2, 0));
        assert!(!mask.contains(3, 0) && !mask.contains(4, 2));
    }

    #[test]
    fn test_connected_region_from_transparent_start_is_empty() {
        let buf = PixelBuffer::new(3, 3);
        let mask = SelectionMask::from_connected_region(&buf, 1, 1);
        assert!(mask.is_empty());
    }

    #[test]
    fn test_mismatched_grids_are_noops() {
        let mut a = SelectionMask::new(4, 4);
        a.select_all();
        let b = SelectionMask::new(3, 3);
        let before = a.clone();
        a.union(&b);
        a.intersect(&b);
        a.subtract(&b);
        assert_eq!(a, before);
    }
}
