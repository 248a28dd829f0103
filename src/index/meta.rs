//! Index meta block - the persisted header describing the index.
//!
//! Block 0 of the index file holds one [`IndexMeta`]: the record-store path,
//! the key length, the root location, the derived branching factor, and the
//! tree height. It is written once at creation and rewritten whole on every
//! root change or height increase; there is no partial-header recovery.

use std::path::{Path, PathBuf};

use crate::common::config::{BLOCK_SIZE, MAX_KEY_LEN, PATH_FIELD_SIZE, branching_factor};
use crate::common::{BlockOffset, Error, Result};
use crate::storage::{Block, BlockHeader, BlockKind};

/// Field offsets within the meta block, after the 8-byte block header.
const OFFSET_PATH: usize = 8;
const OFFSET_KEY_LEN: usize = OFFSET_PATH + PATH_FIELD_SIZE; // 264
const OFFSET_ROOT: usize = OFFSET_KEY_LEN + 8; // 272
const OFFSET_BRANCHING: usize = OFFSET_ROOT + 8; // 280
const OFFSET_HEIGHT: usize = OFFSET_BRANCHING + 8; // 288

/// The index metadata held in block 0.
///
/// # Layout (after the block header)
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 8       256   record-store path (UTF-8, zero-padded)
/// 264     8     key_len
/// 272     8     root offset (0 = empty tree)
/// 280     8     branching factor (derived; verified on load)
/// 288     8     height (0 = empty, 1 = root is a leaf)
/// ```
///
/// The branching factor is `(1024 - 8) / (key_len + 8)` — derived, never an
/// independent input. It is stored so the file is self-describing, but a
/// stored value disagreeing with the derivation is treated as corruption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexMeta {
    /// Path of the external record store this index points into.
    pub record_path: PathBuf,
    /// Bytes per key, fixed for the index's lifetime.
    pub key_len: usize,
    /// Offset of the root node; `NIL` means the tree is empty.
    pub root: BlockOffset,
    /// Number of node layers from root to leaf inclusive.
    pub height: u64,
    branching: usize,
}

impl IndexMeta {
    /// Create metadata for a new, empty index.
    ///
    /// # Errors
    /// Rejects key lengths outside `1..=MAX_KEY_LEN` and record paths that
    /// don't fit the 256-byte path field.
    pub fn new<P: AsRef<Path>>(record_path: P, key_len: usize) -> Result<Self> {
        if key_len == 0 || key_len > MAX_KEY_LEN {
            return Err(Error::InvalidKeyLength(key_len));
        }

        let record_path = record_path.as_ref().to_path_buf();
        let path_len = record_path.as_os_str().len();
        if path_len > PATH_FIELD_SIZE {
            return Err(Error::PathTooLong(path_len));
        }

        Ok(Self {
            record_path,
            key_len,
            root: BlockOffset::NIL,
            height: 0,
            branching: branching_factor(key_len),
        })
    }

    /// The derived branching factor: max entries per node.
    #[inline]
    pub fn branching(&self) -> usize {
        self.branching
    }

    /// Encode this metadata into a fresh meta block.
    pub fn encode(&self) -> Block {
        let mut block = Block::new();
        block.set_header(&BlockHeader::new(BlockKind::Meta));

        let data = block.as_mut_slice();

        let path_bytes = self.record_path.to_string_lossy();
        let path_bytes = path_bytes.as_bytes();
        data[OFFSET_PATH..OFFSET_PATH + path_bytes.len()].copy_from_slice(path_bytes);

        data[OFFSET_KEY_LEN..OFFSET_KEY_LEN + 8]
            .copy_from_slice(&(self.key_len as u64).to_le_bytes());
        data[OFFSET_ROOT..OFFSET_ROOT + 8].copy_from_slice(&self.root.0.to_le_bytes());
        data[OFFSET_BRANCHING..OFFSET_BRANCHING + 8]
            .copy_from_slice(&(self.branching as u64).to_le_bytes());
        data[OFFSET_HEIGHT..OFFSET_HEIGHT + 8].copy_from_slice(&self.height.to_le_bytes());

        block
    }

    /// Decode and validate metadata from block 0.
    ///
    /// # Errors
    /// Returns `Error::CorruptHeader` on a wrong kind tag, an out-of-range
    /// key length, a non-UTF-8 path, a misaligned root offset, or a stored
    /// branching factor that disagrees with the derived one.
    pub fn decode(block: &Block) -> Result<Self> {
        if block.header().kind != BlockKind::Meta {
            return Err(Error::CorruptHeader(
                "block 0 does not carry the meta kind tag".into(),
            ));
        }

        let data = block.as_slice();

        let read_u64 = |at: usize| {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(&data[at..at + 8]);
            u64::from_le_bytes(buf)
        };

        let key_len = read_u64(OFFSET_KEY_LEN) as usize;
        if key_len == 0 || key_len > MAX_KEY_LEN {
            return Err(Error::CorruptHeader(format!(
                "stored key length {} is out of range",
                key_len
            )));
        }

        let stored_branching = read_u64(OFFSET_BRANCHING) as usize;
        if stored_branching != branching_factor(key_len) {
            return Err(Error::CorruptHeader(format!(
                "stored branching factor {} disagrees with derived {}",
                stored_branching,
                branching_factor(key_len)
            )));
        }

        let root = BlockOffset::new(read_u64(OFFSET_ROOT));
        if root.is_valid() && (!root.is_aligned() || root.0 < BLOCK_SIZE as u64) {
            return Err(Error::CorruptHeader(format!(
                "root offset {} is not a node offset",
                root.0
            )));
        }

        let height = read_u64(OFFSET_HEIGHT);
        if root.is_valid() != (height > 0) {
            return Err(Error::CorruptHeader(
                "root offset and height disagree about emptiness".into(),
            ));
        }

        let path_field = &data[OFFSET_PATH..OFFSET_PATH + PATH_FIELD_SIZE];
        let path_end = path_field
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(PATH_FIELD_SIZE);
        let record_path = std::str::from_utf8(&path_field[..path_end])
            .map_err(|_| Error::CorruptHeader("record path is not valid UTF-8".into()))?;

        Ok(Self {
            record_path: PathBuf::from(record_path),
            key_len,
            root,
            height,
            branching: stored_branching,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_new_derives_branching() {
        let meta = IndexMeta::new("records.txt", 4).unwrap();
        assert_eq!(meta.branching(), 84);
        assert_eq!(meta.root, BlockOffset::NIL);
        assert_eq!(meta.height, 0);
    }

    #[test]
    fn test_meta_rejects_bad_key_length() {
        assert!(matches!(
            IndexMeta::new("r.txt", 0),
            Err(Error::InvalidKeyLength(0))
        ));
        assert!(matches!(
            IndexMeta::new("r.txt", 65),
            Err(Error::InvalidKeyLength(65))
        ));
    }

    #[test]
    fn test_meta_rejects_long_path() {
        let long = "x".repeat(300);
        assert!(matches!(
            IndexMeta::new(&long, 4),
            Err(Error::PathTooLong(300))
        ));
    }

    #[test]
    fn test_meta_roundtrip() {
        let mut meta = IndexMeta::new("data/records.txt", 8).unwrap();
        meta.root = BlockOffset::new(1024);
        meta.height = 2;

        let block = meta.encode();
        let decoded = IndexMeta::decode(&block).unwrap();
        assert_eq!(meta, decoded);
    }

    #[test]
    fn test_meta_decode_rejects_wrong_kind() {
        let meta = IndexMeta::new("r.txt", 4).unwrap();
        let mut block = meta.encode();
        block.set_header(&BlockHeader::new(BlockKind::Leaf));

        assert!(matches!(
            IndexMeta::decode(&block),
            Err(Error::CorruptHeader(_))
        ));
    }

    #[test]
    fn test_meta_decode_rejects_branching_mismatch() {
        let meta = IndexMeta::new("r.txt", 4).unwrap();
        let mut block = meta.encode();
        // Tamper with the stored branching factor
        block.as_mut_slice()[OFFSET_BRANCHING] = 1;
        block.as_mut_slice()[OFFSET_BRANCHING + 1] = 0;

        assert!(matches!(
            IndexMeta::decode(&block),
            Err(Error::CorruptHeader(_))
        ));
    }

    #[test]
    fn test_meta_decode_rejects_root_height_disagreement() {
        let mut meta = IndexMeta::new("r.txt", 4).unwrap();
        meta.root = BlockOffset::new(1024);
        // height left at 0 while root is set
        let block = meta.encode();

        assert!(matches!(
            IndexMeta::decode(&block),
            Err(Error::CorruptHeader(_))
        ));
    }
}
