//! Helper functions that don't particularly belong to any concrete module of the allocator.

use crate::config::ARENA_ALIGNMENT;

/// It aligns `to_be_aligned` up to the next multiple of `aligment`.
///
/// `aligment` must be a power of two.
#[inline]
pub const fn align(to_be_aligned: usize, aligment: usize) -> usize {
    (to_be_aligned + aligment - 1) & !(aligment - 1)
}

/// Aligns `size` to [`ARENA_ALIGNMENT`]. Every block size in a region goes
/// through here, so block boundaries always land on a multiple of it.
///
/// Returns `None` if rounding up would overflow `usize`.
#[inline]
pub const fn align_up(size: usize) -> Option<usize> {
    match size.checked_add(ARENA_ALIGNMENT - 1) {
        Some(padded) => Some(padded & !(ARENA_ALIGNMENT - 1)),
        None => None,
    }
}
