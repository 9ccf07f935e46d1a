//! Compile-time tuning of the allocator. None of these values can be changed
//! at runtime.

use crate::utils::align;

/// Largest backing buffer a single region may have (1 MiB).
pub const MAX_ARENA_SIZE: usize = 1024 * 1024;

/// Every block size is a multiple of this. Must be 8 or 16.
pub const ARENA_ALIGNMENT: usize = 16;

/// Bytes taken by the header placed in front of every data area.
/// See [`crate::block::Header`] for the encoding.
pub const HEADER_SIZE: usize = 8;

/// Largest block size the 31-bit size field can hold.
pub const MAX_BLOCK_SIZE: usize = (1 << 31) - 1;

/// Number of frees a region accepts before it runs a coalescing pass.
pub const MAX_FREE_COUNT: usize = 10;

/// A free block is only split when the leftover tail can hold at least
/// this many bytes: an aligned header plus one alignment quantum.
pub const MIN_SPLIT_REMAINDER: usize = align(HEADER_SIZE, ARENA_ALIGNMENT) + ARENA_ALIGNMENT;

const _: () = assert!(ARENA_ALIGNMENT == 8 || ARENA_ALIGNMENT == 16);
const _: () = assert!(MAX_ARENA_SIZE <= MAX_BLOCK_SIZE);
