/// Errors reported by arena operations.
///
/// None of these are retried internally and an operation that fails leaves
/// the arena exactly as it was.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ArenaError {
    #[error("invalid size: {size}")]
    InvalidSize { size: usize },

    #[error("allocation too large: requested {requested} bytes, region capacity {capacity}")]
    AllocationTooLarge { requested: usize, capacity: usize },

    #[error("block too large: {size} bytes does not fit in the 31-bit size field")]
    BlockTooLarge { size: usize },

    #[error("out of memory: could not map {size} bytes")]
    OutOfMemory { size: usize },

    #[error("invalid block pointer")]
    InvalidPointer,
}
