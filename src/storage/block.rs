//! Block - the fundamental 1KB unit of storage.
//!
//! A [`Block`] is a raw 1KB byte array that serves as the unit of I/O
//! between the index file and memory. The meta block and every tree node
//! are each exactly one block.

use crate::common::config::BLOCK_SIZE;

use super::block_header::BlockHeader;

/// A block of index data (1KB, 1KB-aligned).
///
/// This is the fundamental unit of I/O against the index file. Nodes are
/// encoded and decoded in place over a block's bytes; the block never
/// travels through an intermediate representation.
///
/// # Memory Layout
/// - Size: 1024 bytes (1KB)
/// - Alignment: 1024 bytes
///
/// # Clone Implementation
/// `Block` does NOT implement `Clone` in production code so that copying a
/// whole block stays explicit. A `#[cfg(test)]` Clone is provided for tests.
///
/// # Example
/// ```
/// use linedex::storage::Block;
///
/// let mut block = Block::new();
/// block.as_mut_slice()[8] = 0xFF;
/// assert_eq!(block.as_slice()[8], 0xFF);
/// ```
#[repr(align(1024))]
#[derive(Debug)]
pub struct Block {
    data: [u8; BLOCK_SIZE],
}

impl Block {
    /// Create a new zeroed block.
    #[inline]
    pub fn new() -> Self {
        Self {
            data: [0u8; BLOCK_SIZE],
        }
    }

    /// Get immutable slice of block data.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Get mutable slice of block data.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Get the size of a block.
    #[inline]
    pub const fn size() -> usize {
        BLOCK_SIZE
    }

    /// Read the block header.
    pub fn header(&self) -> BlockHeader {
        BlockHeader::from_bytes(&self.data)
    }

    /// Write a block header.
    pub fn set_header(&mut self, header: &BlockHeader) {
        header.write_to(&mut self.data);
    }

    /// Compute and store the checksum in the header.
    ///
    /// Call this after all modifications to the block are complete.
    pub fn update_checksum(&mut self) {
        let checksum = BlockHeader::compute_checksum(&self.data);
        let checksum_bytes = checksum.to_le_bytes();
        self.data[BlockHeader::OFFSET_CHECKSUM..BlockHeader::OFFSET_CHECKSUM + 4]
            .copy_from_slice(&checksum_bytes);
    }

    /// Verify the block checksum is valid.
    pub fn verify_checksum(&self) -> bool {
        self.header().verify_checksum(&self.data)
    }
}

impl Default for Block {
    fn default() -> Self {
        Self::new()
    }
}

// Clone only available in tests - forces explicit copying in production
#[cfg(test)]
impl Clone for Block {
    fn clone(&self) -> Self {
        let mut new_block = Block::new();
        new_block.data.copy_from_slice(&self.data);
        new_block
    }
}
