//! Block Metadata Codec.
//!
//! Every block in a region starts with a fixed size header. The data area the
//! caller receives begins right after it:
//!
//! ```text
//! +---------------------+ <------+
//! |  data_size (u32)    |        |
//! +---------------------+        | -> Header (HEADER_SIZE bytes)
//! | used (1b) | size(31b)|       |
//! +---------------------+ <------+ <- data offset handed to the caller
//! |       Content       |        |
//! |         ...         |        | -> Data area
//! |                     |        |
//! +---------------------+ <------+ <- header of the next block
//! ```
//!
//! Blocks are addressed by the offset of their data area inside the region
//! buffer, never by raw address. The codec knows nothing about arena state; it
//! only reads and writes the header bytes in front of a data offset.

use crate::{
    config::{HEADER_SIZE, MAX_BLOCK_SIZE},
    error::ArenaError,
};

const USED_BIT: u32 = 1 << 31;

/// Total size of a block (header included). Always fits in 31 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockSize(u32);

impl BlockSize {
    /// Validates that `size` fits in the 31-bit size field.
    pub fn new(size: usize) -> Result<Self, ArenaError> {
        if size > MAX_BLOCK_SIZE {
            return Err(ArenaError::BlockTooLarge { size });
        }

        Ok(Self(size as u32))
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0 as usize
    }
}

/// Decoded block header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Header plus data area, a multiple of the arena alignment.
    pub block_size: BlockSize,
    /// Bytes requested by the caller. `0` while the block is free.
    pub data_size: u32,
    /// Whether the block is handed out.
    pub used: bool,
}

impl Header {
    /// Header of a block nobody owns.
    pub fn free(block_size: BlockSize) -> Self {
        Self {
            block_size,
            data_size: 0,
            used: false,
        }
    }

    /// Capacity of the data area.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.block_size.get() - HEADER_SIZE
    }

    fn to_bytes(self) -> [u8; HEADER_SIZE] {
        let mut packed = self.block_size.0;
        if self.used {
            packed |= USED_BIT;
        }

        let mut bytes = [0; HEADER_SIZE];
        bytes[..4].copy_from_slice(&self.data_size.to_le_bytes());
        bytes[4..].copy_from_slice(&packed.to_le_bytes());
        bytes
    }

    fn from_bytes(bytes: [u8; HEADER_SIZE]) -> Self {
        let [d0, d1, d2, d3, p0, p1, p2, p3] = bytes;
        let data_size = u32::from_le_bytes([d0, d1, d2, d3]);
        let packed = u32::from_le_bytes([p0, p1, p2, p3]);

        Self {
            block_size: BlockSize(packed & !USED_BIT),
            data_size,
            used: packed & USED_BIT != 0,
        }
    }
}

/// Width in bytes of one header.
#[inline]
pub const fn header_size() -> usize {
    HEADER_SIZE
}

/// Byte range of the header that sits in front of `data_offset`, if `buf`
/// is large enough to contain it.
fn header_range(buf_len: usize, data_offset: usize) -> Result<std::ops::Range<usize>, ArenaError> {
    if data_offset < HEADER_SIZE || data_offset > buf_len {
        return Err(ArenaError::InvalidPointer);
    }

    Ok(data_offset - HEADER_SIZE..data_offset)
}

/// Reads the header located [`header_size`] bytes before `data_offset`.
pub fn decode(buf: &[u8], data_offset: usize) -> Result<Header, ArenaError> {
    let range = header_range(buf.len(), data_offset)?;

    let mut bytes = [0; HEADER_SIZE];
    bytes.copy_from_slice(&buf[range]);

    Ok(Header::from_bytes(bytes))
}

/// Writes `header` in front of `data_offset`.
pub fn encode(buf: &mut [u8], data_offset: usize, header: Header) -> Result<(), ArenaError> {
    let range = header_range(buf.len(), data_offset)?;

    buf[range].copy_from_slice(&header.to_bytes());

    Ok(())
}

/// Convenience wrapper over [`encode`] taking the raw field values, validating
/// `block_size` against the 31-bit ceiling.
pub fn encode_fields(
    buf: &mut [u8],
    data_offset: usize,
    block_size: usize,
    data_size: u32,
    used: bool,
) -> Result<(), ArenaError> {
    let header = Header {
        block_size: BlockSize::new(block_size)?,
        data_size,
        used,
    };

    encode(buf, data_offset, header)
}

/// Zeroes the header in front of `data_offset`.
pub fn clear(buf: &mut [u8], data_offset: usize) -> Result<(), ArenaError> {
    let range = header_range(buf.len(), data_offset)?;
    buf[range].fill(0);

    Ok(())
}
