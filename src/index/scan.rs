//! Ordered range scans over the leaf sibling chain.
//!
//! A scan locates its starting leaf through the traversal engine, then
//! yields entries in ascending key order, hopping leaf to leaf through the
//! sentinel chain pointers until the requested count is reached or the
//! chain ends. The sequence is finite and non-restartable.

use crate::common::{BlockOffset, Error, Result};
use crate::index::key::Key;
use crate::index::node::Node;
use crate::index::tree::BPlusTree;
use crate::storage::BlockKind;

/// How a range listing's first entry relates to the requested start key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOrigin {
    /// The start key was found; the listing begins at it.
    Exact,
    /// The start key is absent; the listing begins at the nearest greater
    /// key.
    After,
}

/// One leaf entry yielded by a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    /// The entry's key bytes.
    pub key: Vec<u8>,
    /// Byte offset of the record in the external store.
    pub record_offset: u64,
}

/// Iterator over leaf entries in ascending key order.
///
/// Produced by [`BPlusTree::scan_from`]. I/O failures while following the
/// sibling chain surface as `Err` items, after which the scan is exhausted.
pub struct Scan<'a> {
    tree: &'a mut BPlusTree,
    branching: usize,
    cursor: Option<(BlockOffset, Node)>,
    index: usize,
    remaining: usize,
}

enum Step {
    Yield(IndexEntry),
    Chain(u64),
    Corrupt(u64),
}

impl Iterator for Scan<'_> {
    type Item = Result<IndexEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.remaining == 0 {
                self.cursor = None;
            }
            let step = {
                let (off, node) = self.cursor.as_ref()?;
                if self.index >= self.branching {
                    Step::Corrupt(off.0)
                } else if node.is_sentinel_at(self.index) {
                    Step::Chain(node.pointer_at(self.index))
                } else {
                    Step::Yield(IndexEntry {
                        key: node.key_at(self.index).to_vec(),
                        record_offset: node.pointer_at(self.index),
                    })
                }
            };

            match step {
                Step::Yield(entry) => {
                    self.index += 1;
                    self.remaining -= 1;
                    return Some(Ok(entry));
                }
                Step::Chain(0) => {
                    self.cursor = None;
                    return None;
                }
                Step::Chain(next) => {
                    let next_off = BlockOffset::new(next);
                    match self.tree.read_node(next_off, BlockKind::Leaf) {
                        Ok(node) => {
                            self.cursor = Some((next_off, node));
                            self.index = 0;
                        }
                        Err(e) => {
                            self.cursor = None;
                            return Some(Err(e));
                        }
                    }
                }
                Step::Corrupt(offset) => {
                    self.cursor = None;
                    return Some(Err(Error::MissingSentinel(offset)));
                }
            }
        }
    }
}

impl BPlusTree {
    /// Begin an ordered listing at `start`, yielding at most `limit`
    /// entries.
    ///
    /// If `start` matches a stored key exactly the listing begins there and
    /// reports [`ScanOrigin::Exact`]; otherwise it begins at the first key
    /// greater than `start` and reports [`ScanOrigin::After`]. An empty tree
    /// yields an immediately-exhausted scan.
    pub fn scan_from(&mut self, start: &Key, limit: usize) -> Result<(ScanOrigin, Scan<'_>)> {
        if start.len() != self.key_len() {
            return Err(Error::KeyLength {
                expected: self.key_len(),
                found: start.len(),
            });
        }

        let branching = self.branching();

        if !self.meta().root.is_valid() {
            return Ok((
                ScanOrigin::After,
                Scan {
                    tree: self,
                    branching,
                    cursor: None,
                    index: 0,
                    remaining: limit,
                },
            ));
        }

        let height = self.height();
        let leaf_off = self.locate(start.as_bytes(), height)?;
        let leaf = self.read_node(leaf_off, BlockKind::Leaf)?;
        let count = leaf.entry_count(branching, leaf_off)?;

        let mut index = count;
        let mut origin = ScanOrigin::After;
        for i in 0..count {
            match start.as_bytes().cmp(leaf.key_at(i)) {
                std::cmp::Ordering::Greater => continue,
                std::cmp::Ordering::Equal => {
                    index = i;
                    origin = ScanOrigin::Exact;
                    break;
                }
                std::cmp::Ordering::Less => {
                    index = i;
                    break;
                }
            }
        }

        Ok((
            origin,
            Scan {
                tree: self,
                branching,
                cursor: Some((leaf_off, leaf)),
                index,
                remaining: limit,
            },
        ))
    }
}
