//! Region based ("arena") memory allocator.
//!
//! An [`Arena`] hands out variable sized blocks from a fixed size backing
//! buffer obtained from the kernel. Freed blocks are reused first-fit and
//! split when they are too big; adjacent free blocks are merged every few
//! frees. When a buffer fills up, another one of the same size is chained
//! after it.
//!
//! ```
//! use memarena::Arena;
//!
//! let mut arena = Arena::create(1024).unwrap();
//!
//! let ptr = arena.alloc(5).unwrap();
//! arena.data_mut(ptr).unwrap().copy_from_slice(b"hello");
//! assert_eq!(arena.data(ptr).unwrap(), b"hello");
//!
//! arena.free(ptr).unwrap();
//! arena.delete();
//! ```

pub mod block;
pub mod config;

mod arena;
mod dump;
mod error;
mod kernel;
mod region;
mod utils;

pub use arena::{Arena, BlockPtr};
pub use block::{BlockSize, Header};
pub use dump::{Dump, RegionStats};
pub use error::ArenaError;
pub use region::{BlockInfo, Blocks, Region};
pub use utils::align_up;
