use std::ptr::NonNull;

use crate::{
    block::{self, BlockSize, Header},
    config::{ARENA_ALIGNMENT, HEADER_SIZE, MAX_FREE_COUNT, MIN_SPLIT_REMAINDER},
    error::ArenaError,
    kernel::Mapping,
};

/// One contiguous backing buffer together with the bookkeeping needed to
/// carve blocks out of it.
///
/// Blocks are laid out back to back starting at byte 0, with no padding in
/// between, up to the high-water mark `offset`:
///
/// ```text
/// 0                                                  offset          size
/// +-----------------+---------------+-----------------+---------------+
/// | Header | Data   | Header | Data | Header | Data   |   untouched   |
/// |     (used)      |    (free)     |     (used)      |               |
/// +-----------------+---------------+-----------------+---------------+
/// ```
///
/// Bytes past `offset` have never been handed out since the last reset.
pub struct Region {
    /// Backing buffer, owned exclusively by this region.
    memory: Mapping,
    /// High-water mark of bump allocation.
    offset: usize,
    /// Bytes not held by used blocks (free block headers included).
    space: usize,
    /// Frees since the last coalescing pass.
    free_count: usize,
}

/// A block as seen while walking a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
    /// Offset of the data area inside the region.
    pub offset: usize,
    pub header: Header,
}

impl BlockInfo {
    /// Offset of the first byte past this block.
    #[inline]
    pub fn end(&self) -> usize {
        self.offset - HEADER_SIZE + self.header.block_size.get()
    }
}

/// Iterator over the blocks in `[0, offset)` of a [`Region`].
pub struct Blocks<'a> {
    memory: &'a [u8],
    position: usize,
}

impl Iterator for Blocks<'_> {
    type Item = BlockInfo;

    fn next(&mut self) -> Option<Self::Item> {
        if self.position >= self.memory.len() {
            return None;
        }

        let offset = self.position + HEADER_SIZE;
        let header = block::decode(self.memory, offset).ok()?;

        // A zero sized block would make us spin forever on a corrupt region.
        if header.block_size.get() == 0 {
            self.position = self.memory.len();
            return None;
        }

        self.position += header.block_size.get();

        Some(BlockInfo { offset, header })
    }
}

impl Region {
    /// Maps a new region of `size` bytes.
    pub(crate) fn new(size: usize) -> Result<Self, ArenaError> {
        Ok(Self {
            memory: Mapping::new(size)?,
            offset: 0,
            space: size,
            free_count: 0,
        })
    }

    /// Capacity of the backing buffer.
    #[inline]
    pub fn size(&self) -> usize {
        self.memory.len()
    }

    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    pub fn space(&self) -> usize {
        self.space
    }

    #[inline]
    pub fn free_count(&self) -> usize {
        self.free_count
    }

    /// Walks every block from the start of the region up to `offset`.
    pub fn blocks(&self) -> Blocks<'_> {
        Blocks {
            memory: self.bytes(),
            position: 0,
        }
    }

    /// Bytes in `[0, offset)`.
    #[inline]
    pub(crate) fn bytes(&self) -> &[u8] {
        &self.memory.as_slice()[..self.offset]
    }

    /// Decodes the header in front of `data_offset`, rejecting anything that
    /// cannot be the start of a block inside `[0, offset)`.
    pub(crate) fn header(&self, data_offset: usize) -> Result<Header, ArenaError> {
        if data_offset < HEADER_SIZE || (data_offset - HEADER_SIZE) % ARENA_ALIGNMENT != 0 {
            return Err(ArenaError::InvalidPointer);
        }

        let header = block::decode(self.bytes(), data_offset)?;
        let block_size = header.block_size.get();

        let fits = block_size > HEADER_SIZE
            && block_size % ARENA_ALIGNMENT == 0
            && data_offset - HEADER_SIZE + block_size <= self.offset
            && header.data_size as usize <= header.capacity();

        if !fits {
            return Err(ArenaError::InvalidPointer);
        }

        Ok(header)
    }

    /// Data area of a used block, `data_size` bytes long.
    pub(crate) fn data(&self, data_offset: usize) -> Result<&[u8], ArenaError> {
        let header = self.used_header(data_offset)?;
        let end = data_offset + header.data_size as usize;

        Ok(&self.memory.as_slice()[data_offset..end])
    }

    pub(crate) fn data_mut(&mut self, data_offset: usize) -> Result<&mut [u8], ArenaError> {
        let header = self.used_header(data_offset)?;
        let end = data_offset + header.data_size as usize;

        Ok(&mut self.memory.as_mut_slice()[data_offset..end])
    }

    /// Raw address of a used block's data area.
    pub(crate) fn as_ptr(&self, data_offset: usize) -> Result<NonNull<u8>, ArenaError> {
        self.used_header(data_offset)?;

        // SAFETY: `used_header` checked that `data_offset` lies inside the mapping.
        Ok(unsafe { self.memory.as_ptr().add(data_offset) })
    }

    fn used_header(&self, data_offset: usize) -> Result<Header, ArenaError> {
        let header = self.header(data_offset)?;
        if !header.used {
            return Err(ArenaError::InvalidPointer);
        }

        Ok(header)
    }

    /// Returns the first free block (data offset and header) that can hold
    /// `total_size` bytes, header included.
    ///
    /// This implementation of the method uses the first-fit algorithm, it returns
    /// the first block in the region that is large enough.
    pub fn find_free_block(&self, total_size: usize) -> Option<BlockInfo> {
        self.blocks()
            .find(|block| !block.header.used && block.header.block_size.get() >= total_size)
    }

    /// Carves a block for `size` bytes (aligned to `total_size` with its
    /// header) out of this region.
    ///
    /// Free blocks are reused first, then untouched space is bump allocated.
    /// Returns `Ok(None)` when neither has room, leaving the region untouched.
    pub(crate) fn allocate(
        &mut self,
        size: usize,
        total_size: usize,
    ) -> Result<Option<usize>, ArenaError> {
        let data_size = u32::try_from(size).map_err(|_| ArenaError::BlockTooLarge { size })?;

        if let Some(free) = self.find_free_block(total_size) {
            return self.reuse(free, data_size, total_size).map(Some);
        }

        if self.offset + total_size > self.size() {
            return Ok(None);
        }

        let data_offset = self.offset + HEADER_SIZE;
        let header = Header {
            block_size: BlockSize::new(total_size)?,
            data_size,
            used: true,
        };

        let memory = self.memory.as_mut_slice();
        block::encode(memory, data_offset, header)?;
        memory[data_offset..data_offset - HEADER_SIZE + total_size].fill(0);

        self.offset += total_size;
        self.space -= total_size;

        Ok(Some(data_offset))
    }

    /// Hands out the free block `free`, splitting off its tail when the
    /// excess can host another block.
    fn reuse(&mut self, free: BlockInfo, data_size: u32, total_size: usize) -> Result<usize, ArenaError> {
        let available = free.header.block_size.get();
        let excess = available - total_size;

        let (used_size, tail) = if excess >= MIN_SPLIT_REMAINDER {
            (total_size, Some(Header::free(BlockSize::new(excess)?)))
        } else {
            (available, None)
        };

        let header = Header {
            block_size: BlockSize::new(used_size)?,
            data_size,
            used: true,
        };

        let memory = self.memory.as_mut_slice();

        if let Some(tail) = tail {
            block::encode(memory, free.offset + total_size, tail)?;
        }

        block::encode(memory, free.offset, header)?;
        memory[free.offset..free.offset - HEADER_SIZE + used_size].fill(0);

        self.space -= used_size;

        Ok(free.offset)
    }

    /// Marks the block at `data_offset` free and zeroes its data area.
    ///
    /// Every [`MAX_FREE_COUNT`] frees a coalescing pass runs over the whole region.
    pub(crate) fn free(&mut self, data_offset: usize) -> Result<Header, ArenaError> {
        let header = self.used_header(data_offset)?;
        let block_size = header.block_size.get();

        let memory = self.memory.as_mut_slice();
        memory[data_offset..data_offset - HEADER_SIZE + block_size].fill(0);
        block::encode(memory, data_offset, Header::free(header.block_size))?;

        self.space += block_size;
        self.free_count += 1;

        if self.free_count >= MAX_FREE_COUNT {
            self.merge_free_blocks();
        }

        Ok(header)
    }

    /// Merges every run of physically adjacent free blocks into a single
    /// block and clears the free counter. Returns how many blocks were absorbed.
    pub(crate) fn merge_free_blocks(&mut self) -> usize {
        let high_water = self.offset;
        let memory = self.memory.as_mut_slice();

        let mut merged = 0;
        let mut position = 0;

        while position < high_water {
            let Ok(current) = block::decode(memory, position + HEADER_SIZE) else {
                break;
            };

            let next = position + current.block_size.get();
            if current.block_size.get() == 0 || next >= high_water {
                break;
            }

            let Ok(neighbour) = block::decode(memory, next + HEADER_SIZE) else {
                break;
            };

            if current.used || neighbour.used {
                position = next;
                continue;
            }

            let combined = current.block_size.get() + neighbour.block_size.get();
            let Ok(combined) = BlockSize::new(combined) else {
                break;
            };

            // Stay on the same block so runs longer than two collapse too.
            if block::clear(memory, next + HEADER_SIZE).is_err()
                || block::encode(memory, position + HEADER_SIZE, Header::free(combined)).is_err()
            {
                break;
            }

            merged += 1;
        }

        self.free_count = 0;

        if merged > 0 {
            log::debug!("coalesced {merged} free blocks");
        }

        merged
    }

    /// Forgets every block. Memory is not zeroed.
    pub(crate) fn reset(&mut self) {
        self.offset = 0;
        self.space = self.size();
        self.free_count = 0;
    }
}
