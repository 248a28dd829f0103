//! B+Tree storage engine: traversal, insertion, and split/promotion.
//!
//! The tree lives entirely in the index file; every link between nodes is a
//! byte offset ([`BlockOffset`]). A [`BPlusTree`] owns the open file handle
//! and the in-memory copy of the meta block, which is loaded once at open
//! and persisted once at the end of each successful mutation.
//!
//! # Split and promotion
//! An insertion that would bring a node to the branching factor splits it:
//! the right half moves to a new block appended at end-of-file, the left
//! half is truncated in place with its sentinel pointing at the new sibling,
//! and the right half's first key is promoted into the parent together with
//! the new offset. Promotion is fully recursive — an overflowing parent
//! splits the same way, all the way to the root. Splitting the root (at any
//! height) creates a fresh internal root and grows the tree by one level.
//!
//! There is no write-ahead log: a crash between the block writes of a split
//! leaves the index inconsistent, with no recovery path. Single writer,
//! single thread, by contract.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::common::{BlockOffset, Error, Result};
use crate::index::key::Key;
use crate::index::meta::IndexMeta;
use crate::index::node::{Entry, Node};
use crate::storage::{BlockFile, BlockKind, RecordFile};

/// Outcome of inserting one `(key, record offset)` pair.
///
/// A duplicate is a domain outcome, not an error: the bulk build logs and
/// skips it, while the interactive insert path reports it distinctly and
/// leaves both files untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The key was inserted; exactly one node was rewritten, or a split
    /// rewrote the affected nodes and the meta block.
    Inserted,
    /// The key already exists; nothing was written.
    Duplicate,
}

/// Counters returned by a bulk build.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BuildStats {
    /// Records whose keys entered the tree.
    pub inserted: u64,
    /// Records skipped because their key was already present.
    pub duplicates: u64,
}

/// A disk-based B+Tree mapping fixed-length keys to record offsets.
///
/// # Example
/// ```no_run
/// use linedex::{BPlusTree, Key};
///
/// let mut tree = BPlusTree::open("data.idx").unwrap();
/// let key = Key::new(*b"0005", tree.key_len()).unwrap();
/// if let Some(offset) = tree.find(&key).unwrap() {
///     println!("record at byte {offset}");
/// }
/// ```
pub struct BPlusTree {
    file: BlockFile,
    meta: IndexMeta,
}

impl BPlusTree {
    /// Create a new, empty index file.
    ///
    /// # Errors
    /// Fails if the index file already exists, the key length is out of
    /// range, or the record path does not fit the meta block.
    pub fn create<P, Q>(index_path: P, record_path: Q, key_len: usize) -> Result<Self>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let meta = IndexMeta::new(record_path, key_len)?;
        let mut file = BlockFile::create(index_path)?;
        file.append_block(&mut meta.encode())?;
        Ok(Self { file, meta })
    }

    /// Open an existing index file.
    pub fn open<P: AsRef<Path>>(index_path: P) -> Result<Self> {
        let mut file = BlockFile::open(index_path)?;
        let block = file.read_block(BlockOffset::new(0))?;
        let meta = IndexMeta::decode(&block)?;
        Ok(Self { file, meta })
    }

    /// Build a new index from every record in `record_path`.
    ///
    /// Records stream through the insertion engine one at a time, in file
    /// order; duplicate keys are logged and skipped. The record file is
    /// opened before the index file is created, so a missing record file
    /// leaves nothing behind.
    pub fn build<P, Q>(record_path: P, index_path: Q, key_len: usize) -> Result<(Self, BuildStats)>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let mut records = RecordFile::open(&record_path)?;

        let mut tree = Self::create(index_path, &record_path, key_len)?;
        let mut stats = BuildStats::default();

        for item in records.records()? {
            let (offset, line) = item?;
            let key = Key::from_record_line(&line, key_len, offset)?;
            match tree.insert_inner(key.as_bytes(), offset)? {
                InsertOutcome::Inserted => stats.inserted += 1,
                InsertOutcome::Duplicate => {
                    debug!(%key, offset, "duplicate key during build, skipped");
                    stats.duplicates += 1;
                }
            }
        }

        tree.save_meta()?;
        info!(
            inserted = stats.inserted,
            duplicates = stats.duplicates,
            height = tree.meta.height,
            "index build complete"
        );
        Ok((tree, stats))
    }

    /// The index metadata (root, height, branching factor, record path).
    #[inline]
    pub fn meta(&self) -> &IndexMeta {
        &self.meta
    }

    /// Bytes per key.
    #[inline]
    pub fn key_len(&self) -> usize {
        self.meta.key_len
    }

    /// Number of node layers, root to leaf inclusive. 0 = empty.
    #[inline]
    pub fn height(&self) -> u64 {
        self.meta.height
    }

    /// Insert one `(key, record offset)` pair, keeping the tree balanced.
    ///
    /// The meta block is persisted at the end of a successful mutation; a
    /// duplicate writes nothing at all.
    pub fn insert(&mut self, key: &Key, record_offset: u64) -> Result<InsertOutcome> {
        let outcome = self.insert_inner(key.as_bytes(), record_offset)?;
        if outcome == InsertOutcome::Inserted {
            self.save_meta()?;
        }
        Ok(outcome)
    }

    /// Exact lookup: the record offset stored for `key`, if present.
    pub fn find(&mut self, key: &Key) -> Result<Option<u64>> {
        self.check_key(key)?;
        if !self.meta.root.is_valid() {
            return Ok(None);
        }

        let leaf_off = self.locate(key.as_bytes(), self.meta.height)?;
        let leaf = self.read_node(leaf_off, BlockKind::Leaf)?;
        let count = leaf.entry_count(self.meta.branching(), leaf_off)?;

        for i in 0..count {
            match key.as_bytes().cmp(leaf.key_at(i)) {
                std::cmp::Ordering::Greater => continue,
                std::cmp::Ordering::Equal => return Ok(Some(leaf.pointer_at(i))),
                std::cmp::Ordering::Less => break,
            }
        }
        Ok(None)
    }

    /// Walk the whole tree checking structural invariants: the sibling
    /// chain visits strictly ascending, unique keys; the leftmost spine is
    /// as tall as the recorded height; every node has a sentinel.
    ///
    /// Returns the number of keys in the tree.
    pub fn verify(&mut self) -> Result<u64> {
        if !self.meta.root.is_valid() {
            return Ok(0);
        }

        // Descend the leftmost spine; it must be exactly `height` deep.
        let mut off = self.meta.root;
        for _ in 1..self.meta.height {
            let node = self.read_node(off, BlockKind::Internal)?;
            node.entry_count(self.meta.branching(), off)?;
            off = node.leading_child();
        }

        // Walk the sibling chain.
        let mut total = 0u64;
        let mut prev: Option<Vec<u8>> = None;
        loop {
            let leaf = self.read_node(off, BlockKind::Leaf)?;
            let count = leaf.entry_count(self.meta.branching(), off)?;
            for i in 0..count {
                let key = leaf.key_at(i);
                if let Some(p) = &prev {
                    if p.as_slice() >= key {
                        return Err(Error::InvariantViolation(format!(
                            "keys out of order in leaf at offset {}",
                            off.0
                        )));
                    }
                }
                prev = Some(key.to_vec());
                total += 1;
            }
            let chain = leaf.pointer_at(count);
            if chain == 0 {
                break;
            }
            off = BlockOffset::new(chain);
        }
        Ok(total)
    }

    // ========================================================================
    // Traversal engine
    // ========================================================================

    /// Walk from the root to the node at `target_depth` for `key`.
    ///
    /// Depth 1 is the root; `height` is the leaf level, `height - 1` the
    /// parent-of-leaf level a promotion targets. At each internal node the
    /// scan advances while `key >= separator` — an equal key belongs to the
    /// separator's own child, `[sep_i, sep_{i+1})` — and descends through
    /// the child at the stop position. The sentinel key is all `0xFF`, so it
    /// stops every scan without a special case.
    ///
    /// The tree is assumed well-formed; a malformed tree surfaces as a
    /// block-kind or sentinel error from the reads.
    pub(crate) fn locate(&mut self, key: &[u8], target_depth: u64) -> Result<BlockOffset> {
        let mut off = self.meta.root;
        let mut depth = 1;

        while depth < target_depth {
            let node = self.read_node(off, BlockKind::Internal)?;
            let count = node.entry_count(self.meta.branching(), off)?;

            let mut child = node.leading_child();
            for i in 0..count {
                if key >= node.key_at(i) {
                    child = BlockOffset::new(node.pointer_at(i));
                } else {
                    break;
                }
            }

            off = child;
            depth += 1;
        }
        Ok(off)
    }

    pub(crate) fn read_node(&mut self, off: BlockOffset, expected: BlockKind) -> Result<Node> {
        let block = self.file.read_block(off)?;
        let node = Node::from_block(block, self.meta.key_len, off)?;
        if node.kind() != expected {
            return Err(Error::UnexpectedBlockKind {
                offset: off.0,
                found: node.kind() as u8,
            });
        }
        Ok(node)
    }

    pub(crate) fn branching(&self) -> usize {
        self.meta.branching()
    }

    // ========================================================================
    // Insertion engine
    // ========================================================================

    fn insert_inner(&mut self, key: &[u8], record_offset: u64) -> Result<InsertOutcome> {
        if key.len() != self.meta.key_len {
            return Err(Error::KeyLength {
                expected: self.meta.key_len,
                found: key.len(),
            });
        }

        if !self.meta.root.is_valid() {
            // First key: the first leaf always lands right after the meta
            // block, and the tree becomes one level tall.
            let mut leaf = Node::new_leaf(self.meta.key_len);
            leaf.write_entry(0, key, record_offset);
            leaf.write_sentinel(1, 0);
            let off = self.file.append_block(leaf.block_mut())?;

            self.meta.root = off;
            self.meta.height = 1;
            return Ok(InsertOutcome::Inserted);
        }

        let leaf_off = self.locate(key, self.meta.height)?;
        self.insert_into_node(leaf_off, self.meta.height, BlockKind::Leaf, key, record_offset)
    }

    /// Insert `(key, pointer)` into the already-located node at `off`.
    ///
    /// The first entry `>= key` is the insertion point; an equal key is a
    /// duplicate and the node is left untouched. On success exactly this one
    /// node is rewritten in place — unless the insertion would bring the
    /// node to the branching factor, in which case the split engine owns all
    /// writes.
    fn insert_into_node(
        &mut self,
        off: BlockOffset,
        depth: u64,
        kind: BlockKind,
        key: &[u8],
        pointer: u64,
    ) -> Result<InsertOutcome> {
        let mut node = self.read_node(off, kind)?;
        let count = node.entry_count(self.meta.branching(), off)?;

        let mut position = count;
        for i in 0..count {
            match key.cmp(node.key_at(i)) {
                std::cmp::Ordering::Greater => continue,
                std::cmp::Ordering::Equal => return Ok(InsertOutcome::Duplicate),
                std::cmp::Ordering::Less => {
                    position = i;
                    break;
                }
            }
        }

        if count + 1 < node.capacity(self.meta.branching()) {
            node.insert_entry(position, key, pointer, count);
            self.file.write_block(off, node.block_mut())?;
        } else {
            self.split(off, depth, &node, count, position, key, pointer)?;
        }
        Ok(InsertOutcome::Inserted)
    }

    // ========================================================================
    // Split/promotion engine
    // ========================================================================

    /// Split the node at `off`, whose `count` entries plus the pending
    /// `(key, pointer)` have reached the node's capacity.
    ///
    /// The entries are partitioned at `(total + 1) / 2`, left-biased. The
    /// right half goes to a new block at end-of-file, its sentinel carrying
    /// forward the original chain pointer; the left half is rewritten in
    /// place with its sentinel pointing at the new sibling. The right
    /// half's first key is promoted to the parent with the new offset,
    /// recursively: a root split (at any depth) creates a new internal root
    /// and grows the height by one.
    #[allow(clippy::too_many_arguments)]
    fn split(
        &mut self,
        off: BlockOffset,
        depth: u64,
        node: &Node,
        count: usize,
        position: usize,
        key: &[u8],
        pointer: u64,
    ) -> Result<()> {
        let chain = node.pointer_at(count);

        let mut entries = node.entries(count);
        entries.insert(
            position,
            Entry {
                key: key.to_vec(),
                pointer,
            },
        );

        let left_len = (entries.len() + 1) / 2;
        let separator = entries[left_len].key.clone();

        // Right half: a fresh sibling appended at end-of-file. An internal
        // sibling's leading pointer stays NIL; the parent routes everything
        // at or above the separator past it.
        let mut right = if node.is_leaf() {
            Node::new_leaf(self.meta.key_len)
        } else {
            Node::new_internal(self.meta.key_len, BlockOffset::NIL)
        };
        right.write_entries(&entries[left_len..], chain);
        let new_off = self.file.append_block(right.block_mut())?;

        // Left half: truncated in place, chained to the new sibling.
        let mut left = if node.is_leaf() {
            Node::new_leaf(self.meta.key_len)
        } else {
            Node::new_internal(self.meta.key_len, node.leading_child())
        };
        left.write_entries(&entries[..left_len], new_off.0);
        self.file.write_block(off, left.block_mut())?;

        debug!(
            kind = ?node.kind(),
            at = off.0,
            sibling = new_off.0,
            depth,
            "node split"
        );

        if depth == 1 {
            // The split node was the root: promote into a brand-new root.
            let mut root = Node::new_internal(self.meta.key_len, off);
            root.write_entries(
                &[Entry {
                    key: separator,
                    pointer: new_off.0,
                }],
                0,
            );
            let root_off = self.file.append_block(root.block_mut())?;

            self.meta.root = root_off;
            self.meta.height += 1;
            debug!(root = root_off.0, height = self.meta.height, "new root");
        } else {
            let parent_off = self.locate(&separator, depth - 1)?;
            let outcome = self.insert_into_node(
                parent_off,
                depth - 1,
                BlockKind::Internal,
                &separator,
                new_off.0,
            )?;
            if outcome == InsertOutcome::Duplicate {
                // A well-formed tree never promotes a separator twice.
                warn!(parent = parent_off.0, "promoted separator already present");
            }
        }
        Ok(())
    }

    // ========================================================================
    // Header manager
    // ========================================================================

    /// Rewrite the meta block in place, whole-block.
    fn save_meta(&mut self) -> Result<()> {
        self.file
            .write_block(BlockOffset::new(0), &mut self.meta.encode())
    }

    fn check_key(&self, key: &Key) -> Result<()> {
        if key.len() != self.meta.key_len {
            return Err(Error::KeyLength {
                expected: self.meta.key_len,
                found: key.len(),
            });
        }
        Ok(())
    }
}
