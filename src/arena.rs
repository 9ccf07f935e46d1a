use std::ptr::NonNull;

use crate::{
    block::Header,
    config::{HEADER_SIZE, MAX_ARENA_SIZE, MAX_BLOCK_SIZE},
    dump::{Dump, RegionStats},
    error::ArenaError,
    region::Region,
    utils::align_up,
};

/// Handle to a block handed out by an [`Arena`].
///
/// It names the region the block lives in and the offset of its data area
/// inside that region. Use [`Arena::data`], [`Arena::data_mut`] or
/// [`Arena::as_ptr`] to reach the bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockPtr {
    region: usize,
    offset: usize,
}

impl BlockPtr {
    pub const fn new(region: usize, offset: usize) -> Self {
        Self { region, offset }
    }

    /// Index of the region in the chain.
    #[inline]
    pub fn region(&self) -> usize {
        self.region
    }

    /// Offset of the data area inside its region.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }
}

/// Region based allocator.
///
/// An arena starts with a single [`Region`]. When a request does not fit in
/// any region of the chain, a new region of the same size is mapped and
/// appended, so the chain only ever grows until [`Arena::reset`] empties it
/// or the arena is dropped.
///
/// ```text
/// +--------------------------------+      +--------------------------------+
/// | Region 0 | Block | Free | Block| ---> | Region 1 | Block |  untouched  |
/// +--------------------------------+      +--------------------------------+
/// ```
///
/// The arena is not thread safe. It can be moved to another thread but every
/// call needs `&mut self`, so sharing it requires external locking.
pub struct Arena {
    /// Size every region in the chain is created with.
    region_size: usize,
    /// The chain. Index 0 is the head, never empty.
    regions: Vec<Region>,
}

impl Arena {
    /// Creates an arena whose regions hold `size` bytes each.
    ///
    /// Fails with [`ArenaError::InvalidSize`] unless `0 < size <= MAX_ARENA_SIZE`
    /// and with [`ArenaError::OutOfMemory`] if the backing buffer cannot be mapped.
    pub fn create(size: usize) -> Result<Self, ArenaError> {
        if size == 0 || size > MAX_ARENA_SIZE {
            return Err(ArenaError::InvalidSize { size });
        }

        let head = Region::new(size)?;

        log::debug!("created arena with {size} byte regions");

        Ok(Self {
            region_size: size,
            regions: vec![head],
        })
    }

    /// Allocates `size` bytes, zero-filled.
    ///
    /// Each region of the chain is tried in order: first-fit over its free
    /// blocks, then bump allocation from its untouched space. If every region
    /// is exhausted a new one is chained at the end.
    pub fn alloc(&mut self, size: usize) -> Result<BlockPtr, ArenaError> {
        if size == 0 {
            return Err(ArenaError::InvalidSize { size });
        }

        let total_size = size
            .checked_add(HEADER_SIZE)
            .and_then(align_up)
            .ok_or(ArenaError::BlockTooLarge { size })?;

        if total_size > MAX_BLOCK_SIZE {
            return Err(ArenaError::BlockTooLarge { size: total_size });
        }

        if total_size > self.region_size {
            return Err(ArenaError::AllocationTooLarge {
                requested: size,
                capacity: self.region_size,
            });
        }

        for (index, region) in self.regions.iter_mut().enumerate() {
            if let Some(offset) = region.allocate(size, total_size)? {
                log::trace!("alloc({size}) -> region {index} offset {offset}");
                return Ok(BlockPtr::new(index, offset));
            }
        }

        let mut child = Region::new(self.region_size)?;
        let offset = child
            .allocate(size, total_size)?
            .ok_or(ArenaError::AllocationTooLarge {
                requested: size,
                capacity: self.region_size,
            })?;

        let index = self.regions.len();
        self.regions.push(child);

        log::debug!("arena overflow, chained region {index}");
        log::trace!("alloc({size}) -> region {index} offset {offset}");

        Ok(BlockPtr::new(index, offset))
    }

    /// Gives the block back to its region and zeroes its data.
    ///
    /// Handles that don't point at a live block (never allocated, already
    /// freed, or invalidated by [`Arena::reset`]) are rejected with
    /// [`ArenaError::InvalidPointer`] when that can be told from the header.
    /// Anything else a foreign handle does is undefined.
    pub fn free(&mut self, ptr: BlockPtr) -> Result<(), ArenaError> {
        let result = self.region_mut(ptr).and_then(|region| region.free(ptr.offset));

        match result {
            Ok(header) => {
                log::trace!(
                    "free(region {} offset {}) released {} bytes",
                    ptr.region,
                    ptr.offset,
                    header.block_size.get()
                );
                Ok(())
            }
            Err(err) => {
                log::warn!("free(region {} offset {}) rejected: {err}", ptr.region, ptr.offset);
                Err(err)
            }
        }
    }

    /// Forgets every block in every region. The regions stay mapped.
    ///
    /// Every [`BlockPtr`] handed out before the reset is dangling afterwards.
    /// The memory is **not** zeroed: a stale handle that happens to line up
    /// with a new block will read and write that block's data.
    pub fn reset(&mut self) {
        for region in &mut self.regions {
            region.reset();
        }

        log::debug!("reset {} regions", self.regions.len());
    }

    /// Releases every region of the chain. Same as dropping the arena.
    pub fn delete(self) {
        log::debug!("deleting arena with {} regions", self.regions.len());
    }

    /// Runs a coalescing pass over every region right away, regardless of
    /// how many frees happened. Returns how many blocks were absorbed.
    pub fn merge_free_blocks(&mut self) -> usize {
        self.regions.iter_mut().map(Region::merge_free_blocks).sum()
    }

    /// Size every region in the chain is created with.
    #[inline]
    pub fn region_size(&self) -> usize {
        self.region_size
    }

    #[inline]
    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    /// The chain, head first.
    #[inline]
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn header(&self, ptr: BlockPtr) -> Result<Header, ArenaError> {
        self.region(ptr)?.header(ptr.offset)
    }

    pub fn block_size(&self, ptr: BlockPtr) -> Result<usize, ArenaError> {
        self.header(ptr).map(|header| header.block_size.get())
    }

    pub fn data_size(&self, ptr: BlockPtr) -> Result<usize, ArenaError> {
        self.header(ptr).map(|header| header.data_size as usize)
    }

    pub fn is_block_free(&self, ptr: BlockPtr) -> Result<bool, ArenaError> {
        self.header(ptr).map(|header| !header.used)
    }

    /// Length of the NUL terminated string stored in the block, or its
    /// `data_size` if there is no NUL.
    pub fn strlen(&self, ptr: BlockPtr) -> Result<usize, ArenaError> {
        let data = self.data(ptr)?;

        Ok(data.iter().position(|b| *b == 0).unwrap_or(data.len()))
    }

    /// The `data_size` bytes of a used block.
    pub fn data(&self, ptr: BlockPtr) -> Result<&[u8], ArenaError> {
        self.region(ptr)?.data(ptr.offset)
    }

    pub fn data_mut(&mut self, ptr: BlockPtr) -> Result<&mut [u8], ArenaError> {
        self.region_mut(ptr)?.data_mut(ptr.offset)
    }

    /// Raw address of a used block's data area.
    ///
    /// It stays valid until the block is freed, the arena is reset or the
    /// arena is dropped. Chaining new regions never moves existing ones.
    pub fn as_ptr(&self, ptr: BlockPtr) -> Result<NonNull<u8>, ArenaError> {
        self.region(ptr)?.as_ptr(ptr.offset)
    }

    /// Per region usage numbers, head first.
    pub fn stats(&self) -> Vec<RegionStats> {
        self.regions
            .iter()
            .enumerate()
            .map(|(index, region)| RegionStats::of(index, region))
            .collect()
    }

    /// Human readable report of the chain. With `content` every block and
    /// its bytes are listed too.
    pub fn dump(&self, content: bool) -> Dump<'_> {
        Dump::new(self, content)
    }

    fn region(&self, ptr: BlockPtr) -> Result<&Region, ArenaError> {
        self.regions.get(ptr.region).ok_or(ArenaError::InvalidPointer)
    }

    fn region_mut(&mut self, ptr: BlockPtr) -> Result<&mut Region, ArenaError> {
        self.regions.get_mut(ptr.region).ok_or(ArenaError::InvalidPointer)
    }
}
