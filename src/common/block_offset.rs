//! Block offset type.

use std::fmt;

use crate::common::config::BLOCK_SIZE;

/// Identifies a block in the index file by its byte offset.
///
/// The offset *is* the node's identity: all links between nodes — root
/// pointer, child pointers, the leaf sibling chain — are stored on disk as
/// these byte offsets. The file is the arena; there is no separate node-id
/// space and no in-memory reference ever stands in for a node.
///
/// Offset 0 is the meta block, so 0 doubles as the "no node" sentinel
/// (an empty tree has root 0; a chain pointer of 0 ends the chain).
///
/// # Example
/// ```
/// use linedex::BlockOffset;
///
/// let off = BlockOffset::new(1024);
/// assert!(off.is_valid());
/// assert_eq!(off.0, 1024);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockOffset(pub u64);

impl BlockOffset {
    /// The "no node" offset. Block 0 holds the meta block, so no node can
    /// ever live there.
    pub const NIL: BlockOffset = BlockOffset(0);

    /// Create a new BlockOffset.
    #[inline]
    pub fn new(offset: u64) -> Self {
        BlockOffset(offset)
    }

    /// Check whether this offset can refer to a node (non-zero).
    #[inline]
    pub fn is_valid(&self) -> bool {
        *self != Self::NIL
    }

    /// Check whether this offset is block-aligned.
    #[inline]
    pub fn is_aligned(&self) -> bool {
        self.0 % BLOCK_SIZE as u64 == 0
    }
}

impl fmt::Display for BlockOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::NIL {
            write!(f, "Block(NIL)")
        } else {
            write!(f, "Block(@{})", self.0)
        }
    }
}
