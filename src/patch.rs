//! Realtime pixel patch protocol
//!
//! Peer edits travel as a flat list of quintuples `[index, r, g, b, a, ...]`
//! where `index` is a pixel's flat position (not byte offset) in the target
//! layer. The split here is deliberate: [`validate_patch`] runs once at the
//! network boundary, while [`apply_patch`] trusts its input and stays
//! branch-light on the hot path. Patches apply as plain overwrites in
//! arrival order — last write wins, with no reconciliation against local
//! edits.

use crate::buffer::PixelBuffer;
use thiserror::Error;

/// Error validating an incoming patch at the boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatchError {
    /// Patch length is not a multiple of 5
    #[error("patch length {0} is not a multiple of 5")]
    MalformedLength(usize),
    /// Pixel index beyond the target buffer
    #[error("pixel index {index} out of bounds for {pixel_count} pixels")]
    IndexOutOfBounds { index: u32, pixel_count: usize },
    /// Channel value beyond a byte
    #[error("channel value {0} out of range 0..=255")]
    ChannelOutOfRange(u32),
}

/// Diff two equally sized buffers into a patch containing only the changed
/// pixels. Differing dimensions produce an empty patch.
pub fn diff_buffers(before: &PixelBuffer, after: &PixelBuffer) -> Vec<u32> {
    if before.width() != after.width() || before.height() != after.height() {
        return Vec::new();
    }
    let mut patch = Vec::new();
    for i in 0..before.pixel_count() {
        let b = before.pixel_at(i);
        let a = after.pixel_at(i);
        if a != b {
            patch.extend_from_slice(&[i as u32, a[0] as u32, a[1] as u32, a[2] as u32, a[3] as u32]);
        }
    }
    patch
}

/// Validate a patch against a target of `pixel_count` pixels. Run this once
/// at the boundary before [`apply_patch`].
pub fn validate_patch(patch: &[u32], pixel_count: usize) -> Result<(), PatchError> {
    if patch.len() % 5 != 0 {
        return Err(PatchError::MalformedLength(patch.len()));
    }
    for quintuple in patch.chunks_exact(5) {
        let index = quintuple[0];
        if index as usize >= pixel_count {
            return Err(PatchError::IndexOutOfBounds { index, pixel_count });
        }
        for &channel in &quintuple[1..] {
            if channel > 255 {
                return Err(PatchError::ChannelOutOfRange(channel));
            }
        }
    }
    Ok(())
}

/// Apply a patch to a buffer, overwriting the 4 channel bytes at each
/// pixel index. Performs no bounds checking; the input must have passed
/// [`validate_patch`].
pub fn apply_patch(buffer: &mut PixelBuffer, patch: &[u32]) {
    for quintuple in patch.chunks_exact(5) {
        buffer.set_pixel_at(
            quintuple[0] as usize,
            [quintuple[1] as u8, quintuple[2] as u8, quintuple[3] as u8, quintuple[4] as u8],
        );
    }
}
