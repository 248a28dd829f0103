//! Node codec - leaf and internal node layout over a [`Block`].
//!
//! Both node shapes are a run of fixed-width `(key, pointer)` slots
//! terminated by a sentinel entry whose key is all `0xFF` bytes:
//!
//! ```text
//! Leaf:     [hdr 8][key ptr][key ptr]...[SENT chain]
//! Internal: [hdr 8][lead 8][key ptr][key ptr]...[SENT 0]
//! ```
//!
//! A leaf entry's pointer is a record offset in the external store; an
//! internal entry's pointer is the child covering `[key_i, key_{i+1})`, with
//! the leading pointer covering everything below the first separator. The
//! leaf sentinel's pointer is the sibling chain: the next leaf in key order,
//! or 0 for the last leaf. After a split the left node's sentinel pointer
//! carries the new right sibling's offset for both node shapes.
//!
//! The codec never allocates an intermediate representation: it reads and
//! writes slots in place over the block's bytes.

use crate::common::config::{BLOCK_HEADER_SIZE, BLOCK_SIZE, POINTER_SIZE, SENTINEL_BYTE};
use crate::common::{BlockOffset, Error, Result};
use crate::storage::{Block, BlockHeader, BlockKind};

/// One decoded `(key, pointer)` entry, materialized only for splits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Entry {
    pub key: Vec<u8>,
    pub pointer: u64,
}

/// A leaf or internal node decoded over a 1KB block.
///
/// The node kind comes from the block's kind tag, never from traversal
/// depth, so any node can be inspected in isolation.
#[derive(Debug)]
pub(crate) struct Node {
    kind: BlockKind,
    key_len: usize,
    block: Block,
}

impl Node {
    /// A fresh empty leaf: sentinel in slot 0, end of chain.
    pub fn new_leaf(key_len: usize) -> Self {
        let mut node = Self {
            kind: BlockKind::Leaf,
            key_len,
            block: Block::new(),
        };
        node.block.set_header(&BlockHeader::new(BlockKind::Leaf));
        node.write_sentinel(0, 0);
        node
    }

    /// A fresh empty internal node with the given leading child.
    pub fn new_internal(key_len: usize, leading: BlockOffset) -> Self {
        let mut node = Self {
            kind: BlockKind::Internal,
            key_len,
            block: Block::new(),
        };
        node.block.set_header(&BlockHeader::new(BlockKind::Internal));
        node.set_leading_child(leading);
        node.write_sentinel(0, 0);
        node
    }

    /// Decode a node from a block read at `at`.
    ///
    /// # Errors
    /// Returns `Error::UnexpectedBlockKind` if the block's tag is not a node
    /// kind.
    pub fn from_block(block: Block, key_len: usize, at: BlockOffset) -> Result<Self> {
        let kind = block.header().kind;
        match kind {
            BlockKind::Leaf | BlockKind::Internal => Ok(Self {
                kind,
                key_len,
                block,
            }),
            other => Err(Error::UnexpectedBlockKind {
                offset: at.0,
                found: other as u8,
            }),
        }
    }

    #[inline]
    pub fn kind(&self) -> BlockKind {
        self.kind
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.kind == BlockKind::Leaf
    }

    /// Mutable access to the underlying block, for writing to disk.
    #[inline]
    pub fn block_mut(&mut self) -> &mut Block {
        &mut self.block
    }

    /// Byte offset of the first entry slot within the block.
    #[inline]
    fn entries_start(&self) -> usize {
        match self.kind {
            BlockKind::Internal => BLOCK_HEADER_SIZE + POINTER_SIZE,
            _ => BLOCK_HEADER_SIZE,
        }
    }

    #[inline]
    fn slot_size(&self) -> usize {
        self.key_len + POINTER_SIZE
    }

    #[inline]
    fn slot_offset(&self, index: usize) -> usize {
        self.entries_start() + index * self.slot_size()
    }

    /// The key bytes of the entry at `index`.
    pub fn key_at(&self, index: usize) -> &[u8] {
        let at = self.slot_offset(index);
        &self.block.as_slice()[at..at + self.key_len]
    }

    /// The pointer of the entry at `index` (for the sentinel slot this is
    /// the chain pointer).
    pub fn pointer_at(&self, index: usize) -> u64 {
        let at = self.slot_offset(index) + self.key_len;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&self.block.as_slice()[at..at + 8]);
        u64::from_le_bytes(buf)
    }

    /// Whether the slot at `index` holds the sentinel entry.
    pub fn is_sentinel_at(&self, index: usize) -> bool {
        self.key_at(index).iter().all(|&b| b == SENTINEL_BYTE)
    }

    /// The leading child pointer of an internal node.
    pub fn leading_child(&self) -> BlockOffset {
        debug_assert_eq!(self.kind, BlockKind::Internal);
        let mut buf = [0u8; 8];
        buf.copy_from_slice(
            &self.block.as_slice()[BLOCK_HEADER_SIZE..BLOCK_HEADER_SIZE + POINTER_SIZE],
        );
        BlockOffset::new(u64::from_le_bytes(buf))
    }

    pub fn set_leading_child(&mut self, child: BlockOffset) {
        debug_assert_eq!(self.kind, BlockKind::Internal);
        self.block.as_mut_slice()[BLOCK_HEADER_SIZE..BLOCK_HEADER_SIZE + POINTER_SIZE]
            .copy_from_slice(&child.0.to_le_bytes());
    }

    /// Number of slots this node can physically hold, sentinel included.
    ///
    /// A leaf holds exactly `branching` slots. An internal node gives up 8
    /// bytes to its leading child pointer, so for a few key lengths the last
    /// slot would spill past the block; its capacity is clamped to what fits
    /// and it splits that much earlier.
    pub fn capacity(&self, branching: usize) -> usize {
        let fit = (BLOCK_SIZE - self.entries_start()) / self.slot_size();
        branching.min(fit)
    }

    /// Number of real entries: the index of the sentinel slot.
    ///
    /// Linear scan bounded by the node's capacity; a node whose scan never
    /// finds a sentinel is structurally corrupt.
    ///
    /// # Errors
    /// Returns `Error::MissingSentinel` with the node's offset.
    pub fn entry_count(&self, branching: usize, at: BlockOffset) -> Result<usize> {
        for index in 0..self.capacity(branching) {
            if self.is_sentinel_at(index) {
                return Ok(index);
            }
        }
        Err(Error::MissingSentinel(at.0))
    }

    /// Write a real entry into the slot at `index`.
    pub fn write_entry(&mut self, index: usize, key: &[u8], pointer: u64) {
        debug_assert_eq!(key.len(), self.key_len);
        let at = self.slot_offset(index);
        let key_len = self.key_len;
        let data = self.block.as_mut_slice();
        data[at..at + key_len].copy_from_slice(key);
        data[at + key_len..at + key_len + 8].copy_from_slice(&pointer.to_le_bytes());
    }

    /// Write the sentinel entry into the slot at `index` with the given
    /// chain pointer.
    pub fn write_sentinel(&mut self, index: usize, chain: u64) {
        let at = self.slot_offset(index);
        let key_len = self.key_len;
        let data = self.block.as_mut_slice();
        data[at..at + key_len].fill(SENTINEL_BYTE);
        data[at + key_len..at + key_len + 8].copy_from_slice(&chain.to_le_bytes());
    }

    /// Insert an entry at `index`, shifting the slots at and after it —
    /// sentinel included, so the chain pointer rides along — one slot to
    /// the right.
    ///
    /// The caller has already established that `count + 1` entries plus the
    /// sentinel fit (`count + 1 < capacity`).
    pub fn insert_entry(&mut self, index: usize, key: &[u8], pointer: u64, count: usize) {
        debug_assert!(index <= count);
        let slot = self.slot_size();
        let from = self.slot_offset(index);
        let sentinel_end = self.slot_offset(count) + slot;
        self.block
            .as_mut_slice()
            .copy_within(from..sentinel_end, from + slot);
        self.write_entry(index, key, pointer);
    }

    /// Materialize the node's real entries, for a split.
    pub fn entries(&self, count: usize) -> Vec<Entry> {
        (0..count)
            .map(|i| Entry {
                key: self.key_at(i).to_vec(),
                pointer: self.pointer_at(i),
            })
            .collect()
    }

    /// Replace the node's entries wholesale: `entries` in order, then the
    /// sentinel carrying `chain`, then zeros to the end of the block.
    ///
    /// Used by the split engine to rebuild both halves.
    pub fn write_entries(&mut self, entries: &[Entry], chain: u64) {
        let start = self.entries_start();
        self.block.as_mut_slice()[start..].fill(0);
        for (i, entry) in entries.iter().enumerate() {
            self.write_entry(i, &entry.key, entry.pointer);
        }
        self.write_sentinel(entries.len(), chain);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::config::branching_factor;

    const KEY_LEN: usize = 4;

    fn off(n: u64) -> BlockOffset {
        BlockOffset::new(n)
    }

    #[test]
    fn test_new_leaf_is_empty() {
        let node = Node::new_leaf(KEY_LEN);
        assert!(node.is_leaf());
        assert!(node.is_sentinel_at(0));
        assert_eq!(node.pointer_at(0), 0);
        assert_eq!(
            node.entry_count(branching_factor(KEY_LEN), off(1024)).unwrap(),
            0
        );
    }

    #[test]
    fn test_new_internal_leading_child() {
        let node = Node::new_internal(KEY_LEN, off(1024));
        assert!(!node.is_leaf());
        assert_eq!(node.leading_child(), off(1024));
        assert!(node.is_sentinel_at(0));
    }

    #[test]
    fn test_write_and_read_entries() {
        let mut node = Node::new_leaf(KEY_LEN);
        node.write_entry(0, b"0001", 11);
        node.write_sentinel(1, 0);

        assert_eq!(node.key_at(0), b"0001");
        assert_eq!(node.pointer_at(0), 11);
        assert_eq!(
            node.entry_count(branching_factor(KEY_LEN), off(1024)).unwrap(),
            1
        );
    }

    #[test]
    fn test_insert_entry_shifts_right_and_keeps_chain() {
        let mut node = Node::new_leaf(KEY_LEN);
        node.write_entry(0, b"0001", 10);
        node.write_entry(1, b"0005", 50);
        node.write_sentinel(2, 4096); // chained to a sibling

        node.insert_entry(1, b"0003", 30, 2);

        assert_eq!(node.key_at(0), b"0001");
        assert_eq!(node.key_at(1), b"0003");
        assert_eq!(node.pointer_at(1), 30);
        assert_eq!(node.key_at(2), b"0005");
        assert!(node.is_sentinel_at(3));
        assert_eq!(node.pointer_at(3), 4096);
    }

    #[test]
    fn test_insert_entry_at_end() {
        let mut node = Node::new_leaf(KEY_LEN);
        node.write_entry(0, b"0001", 10);
        node.write_sentinel(1, 0);

        node.insert_entry(1, b"0009", 90, 1);

        assert_eq!(node.key_at(1), b"0009");
        assert!(node.is_sentinel_at(2));
    }

    #[test]
    fn test_internal_slots_follow_leading_pointer() {
        let mut node = Node::new_internal(KEY_LEN, off(1024));
        node.write_entry(0, b"0005", 2048);
        node.write_sentinel(1, 0);

        // First slot starts after header (8) + leading pointer (8)
        assert_eq!(node.slot_offset(0), 16);
        assert_eq!(node.key_at(0), b"0005");
        assert_eq!(node.pointer_at(0), 2048);
        assert_eq!(node.leading_child(), off(1024));
    }

    #[test]
    fn test_missing_sentinel_is_fatal() {
        let mut node = Node::new_leaf(KEY_LEN);
        let b = branching_factor(KEY_LEN);
        for i in 0..b {
            node.write_entry(i, b"zzzz", 1);
        }

        let err = node.entry_count(b, off(2048)).unwrap_err();
        assert!(matches!(err, Error::MissingSentinel(2048)));
    }

    #[test]
    fn test_write_entries_rebuild() {
        let mut node = Node::new_leaf(KEY_LEN);
        let entries = vec![
            Entry {
                key: b"0004".to_vec(),
                pointer: 40,
            },
            Entry {
                key: b"0006".to_vec(),
                pointer: 60,
            },
        ];
        node.write_entries(&entries, 3072);

        assert_eq!(node.entries(2), entries);
        assert!(node.is_sentinel_at(2));
        assert_eq!(node.pointer_at(2), 3072);
    }

    #[test]
    fn test_from_block_rejects_non_node() {
        let mut block = Block::new();
        block.set_header(&BlockHeader::new(BlockKind::Meta));

        let err = Node::from_block(block, KEY_LEN, off(1024)).unwrap_err();
        assert!(matches!(
            err,
            Error::UnexpectedBlockKind {
                offset: 1024,
                found: 1
            }
        ));
    }
}
