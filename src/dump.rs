//! Debugging aid: usage statistics and a printable report of an arena chain.

use std::fmt;

use crate::{arena::Arena, region::Region};

/// Usage numbers of one region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionStats {
    /// Position of the region in the chain.
    pub index: usize,
    /// Capacity of the region.
    pub size: usize,
    /// High-water mark of bump allocation.
    pub offset: usize,
    /// Bytes held by used blocks, headers included.
    pub used_bytes: usize,
    /// Everything else: free blocks plus untouched space.
    pub free_bytes: usize,
    pub used_blocks: usize,
    pub free_blocks: usize,
}

impl RegionStats {
    pub(crate) fn of(index: usize, region: &Region) -> Self {
        let (used_blocks, free_blocks) = region.blocks().fold((0, 0), |(used, free), block| {
            if block.header.used {
                (used + 1, free)
            } else {
                (used, free + 1)
            }
        });

        Self {
            index,
            size: region.size(),
            offset: region.offset(),
            used_bytes: region.size() - region.space(),
            free_bytes: region.space(),
            used_blocks,
            free_blocks,
        }
    }

    pub fn free_percent(&self) -> f64 {
        self.free_bytes as f64 * 100.0 / self.size as f64
    }

    pub fn used_percent(&self) -> f64 {
        100.0 - self.free_percent()
    }
}

impl fmt::Display for RegionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "| Region {}", self.index)?;
        writeln!(f, "| Size: {} Offset: {}", self.size, self.offset)?;
        writeln!(
            f,
            "| Free: {:.4}% Used: {:.4}%",
            self.free_percent(),
            self.used_percent()
        )?;
        write!(f, "| Free: {} byte Used: {} byte", self.free_bytes, self.used_bytes)
    }
}

/// Report returned by [`Arena::dump`].
pub struct Dump<'a> {
    arena: &'a Arena,
    content: bool,
}

impl<'a> Dump<'a> {
    pub(crate) fn new(arena: &'a Arena, content: bool) -> Self {
        Self { arena, content }
    }
}

impl fmt::Display for Dump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, region) in self.arena.regions().iter().enumerate() {
            writeln!(f, "|-------------->>>")?;
            writeln!(f, "{}", RegionStats::of(index, region))?;

            if self.content {
                let bytes = region.bytes();

                for block in region.blocks() {
                    write!(
                        f,
                        "| Block at {}: size = {}, status = {}, content =",
                        block.offset,
                        block.header.block_size.get(),
                        if block.header.used { "used" } else { "free" }
                    )?;

                    for byte in &bytes[block.offset..block.end()] {
                        write!(f, " {byte:02x}")?;
                    }
                    writeln!(f)?;
                }
            }

            writeln!(f, "|--------------<<<")?;
        }

        Ok(())
    }
}
