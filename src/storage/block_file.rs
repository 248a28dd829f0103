//! Block file - low-level I/O for the index file.
//!
//! The [`BlockFile`] handles all direct file operations against the index:
//! - Reading and writing blocks at byte offsets
//! - Appending new blocks at end-of-file
//!
//! Offsets are the tree's pointer space: every on-disk link is a byte offset
//! into this file, so the block file validates alignment and bounds on every
//! access.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::common::config::BLOCK_SIZE;
use crate::common::{BlockOffset, Error, Result};
use crate::storage::block::Block;

/// Manages disk I/O for a single index file.
///
/// # File Layout
/// The index is a single file of 1KB blocks laid out sequentially:
/// ```text
/// ┌─────────┬─────────┬─────────┬─────────┐
/// │  Meta   │ Node    │ Node    │  ...    │
/// │ (1KB)   │ (1KB)   │ (1KB)   │         │
/// └─────────┴─────────┴─────────┴─────────┘
/// Offset:  0      1024     2048    ...
/// ```
///
/// Block 0 is always the meta block; the first node, if any, sits at
/// offset 1024.
///
/// # Thread Safety
/// `BlockFile` is **single-threaded**; every operation is a blocking
/// seek/read/write against one shared handle, per the engine's contract.
///
/// # Durability
/// Writes are followed by `fsync()`. There is no write-ahead log: a crash
/// between the block writes of a structural change (a split) can leave the
/// index inconsistent with no recovery path.
pub struct BlockFile {
    file: File,
    /// Current end of file, always a multiple of `BLOCK_SIZE`.
    end: u64,
}

impl BlockFile {
    /// Create a new index file.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;

        Ok(Self { file, end: 0 })
    }

    /// Open an existing index file.
    ///
    /// # Errors
    /// Returns an error if the file doesn't exist or cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(&path)?;

        let end = file.metadata()?.len();
        if end % BLOCK_SIZE as u64 != 0 {
            return Err(Error::CorruptHeader(format!(
                "index file size {} is not a multiple of the block size",
                end
            )));
        }

        Ok(Self { file, end })
    }

    /// Read the block at `offset`.
    ///
    /// # Errors
    /// Returns `Error::InvalidBlockOffset` if the offset is misaligned or
    /// past the end of the file, and `Error::ChecksumMismatch` if the block
    /// fails integrity verification.
    pub fn read_block(&mut self, offset: BlockOffset) -> Result<Block> {
        self.check_bounds(offset)?;

        self.file.seek(SeekFrom::Start(offset.0))?;

        let mut block = Block::new();
        self.file.read_exact(block.as_mut_slice())?;

        if !block.verify_checksum() {
            return Err(Error::ChecksumMismatch(offset.0));
        }

        Ok(block)
    }

    /// Write a block in place at `offset`.
    ///
    /// The block's checksum is recomputed before the write, so the caller
    /// only has to finish its mutations first.
    ///
    /// # Errors
    /// Returns `Error::InvalidBlockOffset` if the offset is misaligned or
    /// does not refer to an existing block.
    pub fn write_block(&mut self, offset: BlockOffset, block: &mut Block) -> Result<()> {
        self.check_bounds(offset)?;

        block.update_checksum();
        self.file.seek(SeekFrom::Start(offset.0))?;
        self.file.write_all(block.as_slice())?;
        self.file.sync_all()?;

        Ok(())
    }

    /// Append a block at end-of-file, returning its offset.
    ///
    /// This is the only way a block is ever allocated; blocks are never
    /// deleted or reused.
    pub fn append_block(&mut self, block: &mut Block) -> Result<BlockOffset> {
        let offset = BlockOffset::new(self.end);

        block.update_checksum();
        self.file.seek(SeekFrom::Start(offset.0))?;
        self.file.write_all(block.as_slice())?;
        self.file.sync_all()?;

        self.end += BLOCK_SIZE as u64;
        Ok(offset)
    }

    /// Total size of the index file in bytes.
    #[inline]
    pub fn file_size(&self) -> u64 {
        self.end
    }

    /// Number of blocks in the index file.
    #[inline]
    pub fn block_count(&self) -> u64 {
        self.end / BLOCK_SIZE as u64
    }

    fn check_bounds(&self, offset: BlockOffset) -> Result<()> {
        if !offset.is_aligned() || offset.0 >= self.end {
            return Err(Error::InvalidBlockOffset(offset.0));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::block_header::{BlockHeader, BlockKind};
    use tempfile::tempdir;

    fn leaf_block() -> Block {
        let mut block = Block::new();
        block.set_header(&BlockHeader::new(BlockKind::Leaf));
        block
    }

    #[test]
    fn test_create_new_index() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.idx");

        let bf = BlockFile::create(&path).unwrap();
        assert_eq!(bf.block_count(), 0);
        assert_eq!(bf.file_size(), 0);
    }

    #[test]
    fn test_create_existing_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.idx");

        BlockFile::create(&path).unwrap();
        assert!(BlockFile::create(&path).is_err());
    }

    #[test]
    fn test_open_nonexistent_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nonexistent.idx");

        assert!(BlockFile::open(&path).is_err());
    }

    #[test]
    fn test_append_and_read_block() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.idx");

        let mut bf = BlockFile::create(&path).unwrap();

        let mut block = leaf_block();
        block.as_mut_slice()[100] = 0xAB;

        let offset = bf.append_block(&mut block).unwrap();
        assert_eq!(offset, BlockOffset::new(0));
        assert_eq!(bf.block_count(), 1);

        let read = bf.read_block(offset).unwrap();
        assert_eq!(read.as_slice()[100], 0xAB);
        assert_eq!(read.header().kind, BlockKind::Leaf);
    }

    #[test]
    fn test_write_in_place() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.idx");

        let mut bf = BlockFile::create(&path).unwrap();
        let offset = bf.append_block(&mut leaf_block()).unwrap();

        let mut block = leaf_block();
        block.as_mut_slice()[9] = 0xCD;
        bf.write_block(offset, &mut block).unwrap();

        let read = bf.read_block(offset).unwrap();
        assert_eq!(read.as_slice()[9], 0xCD);
    }

    #[test]
    fn test_persistence() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.idx");

        {
            let mut bf = BlockFile::create(&path).unwrap();
            let mut block = leaf_block();
            block.as_mut_slice()[8] = 0x42;
            bf.append_block(&mut block).unwrap();
        }

        {
            let mut bf = BlockFile::open(&path).unwrap();
            assert_eq!(bf.block_count(), 1);

            let block = bf.read_block(BlockOffset::new(0)).unwrap();
            assert_eq!(block.as_slice()[8], 0x42);
        }
    }

    #[test]
    fn test_multiple_blocks() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.idx");

        let mut bf = BlockFile::create(&path).unwrap();

        for i in 0..10u8 {
            let mut block = leaf_block();
            block.as_mut_slice()[8] = i;
            let offset = bf.append_block(&mut block).unwrap();
            assert_eq!(offset.0, i as u64 * BLOCK_SIZE as u64);
        }

        assert_eq!(bf.block_count(), 10);
        assert_eq!(bf.file_size(), 10 * BLOCK_SIZE as u64);

        for i in 0..10u8 {
            let block = bf
                .read_block(BlockOffset::new(i as u64 * BLOCK_SIZE as u64))
                .unwrap();
            assert_eq!(block.as_slice()[8], i);
        }
    }

    #[test]
    fn test_read_past_end() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.idx");

        let mut bf = BlockFile::create(&path).unwrap();
        bf.append_block(&mut leaf_block()).unwrap();

        let result = bf.read_block(BlockOffset::new(1024));
        assert!(matches!(result, Err(Error::InvalidBlockOffset(1024))));
    }

    #[test]
    fn test_read_misaligned() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.idx");

        let mut bf = BlockFile::create(&path).unwrap();
        bf.append_block(&mut leaf_block()).unwrap();

        let result = bf.read_block(BlockOffset::new(100));
        assert!(matches!(result, Err(Error::InvalidBlockOffset(100))));
    }

    #[test]
    fn test_corrupt_block_detected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.idx");

        {
            let mut bf = BlockFile::create(&path).unwrap();
            bf.append_block(&mut leaf_block()).unwrap();
        }

        // Flip a byte in the stored block behind the block file's back
        {
            let mut f = OpenOptions::new().write(true).open(&path).unwrap();
            f.seek(SeekFrom::Start(500)).unwrap();
            f.write_all(&[0xEE]).unwrap();
        }

        let mut bf = BlockFile::open(&path).unwrap();
        let result = bf.read_block(BlockOffset::new(0));
        assert!(matches!(result, Err(Error::ChecksumMismatch(0))));
    }
}
