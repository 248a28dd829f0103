//! Block header and kind definitions.
//!
//! Every block starts with a [`BlockHeader`] containing metadata:
//! - [`BlockKind`] discriminator
//! - CRC32 checksum for integrity
//!
//! The kind tag is what lets a validation tool inspect a node in isolation;
//! the traversal checks it against the kind it expects at each depth instead
//! of inferring leaf-vs-internal purely from depth arithmetic.

/// Kind of block stored on disk.
///
/// Uses `#[repr(u8)]` to guarantee a 1-byte representation for serialization.
#[repr(u8)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// Uninitialized or corrupted block.
    #[default]
    Invalid = 0,
    /// The index meta block (block 0).
    Meta = 1,
    /// B+Tree internal (non-leaf) node.
    Internal = 2,
    /// B+Tree leaf node.
    Leaf = 3,
}

impl BlockKind {
    /// Convert from u8, returning Invalid for unknown values.
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => BlockKind::Meta,
            2 => BlockKind::Internal,
            3 => BlockKind::Leaf,
            _ => BlockKind::Invalid,
        }
    }
}

/// Metadata stored at the beginning of every block.
///
/// # Layout (8 bytes)
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0       1     kind (BlockKind as u8)
/// 1       3     reserved (zero)
/// 4       4     checksum (CRC32, little-endian)
/// ```
///
/// # Checksum
/// The checksum is computed over the entire block with the checksum field
/// itself set to zero. This allows verification without special handling.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    /// Kind of this block.
    pub kind: BlockKind,
    /// CRC32 checksum of the block contents.
    pub checksum: u32,
}

impl BlockHeader {
    /// Size of the header in bytes.
    pub const SIZE: usize = 8;

    /// Offset of each field within the header.
    pub const OFFSET_KIND: usize = 0;
    pub const OFFSET_CHECKSUM: usize = 4;

    /// Create a new header with the given block kind.
    ///
    /// The checksum is initialized to zero.
    pub fn new(kind: BlockKind) -> Self {
        Self { kind, checksum: 0 }
    }

    /// Read a header from the beginning of a byte slice.
    ///
    /// # Panics
    /// Panics if `data.len() < BlockHeader::SIZE`.
    pub fn from_bytes(data: &[u8]) -> Self {
        assert!(data.len() >= Self::SIZE, "buffer too small for BlockHeader");

        let kind = BlockKind::from_u8(data[Self::OFFSET_KIND]);

        let checksum = u32::from_le_bytes([
            data[Self::OFFSET_CHECKSUM],
            data[Self::OFFSET_CHECKSUM + 1],
            data[Self::OFFSET_CHECKSUM + 2],
            data[Self::OFFSET_CHECKSUM + 3],
        ]);

        Self { kind, checksum }
    }

    /// Write this header to the beginning of a byte slice.
    ///
    /// # Panics
    /// Panics if `data.len() < BlockHeader::SIZE`.
    pub fn write_to(&self, data: &mut [u8]) {
        assert!(data.len() >= Self::SIZE, "buffer too small for BlockHeader");

        data[Self::OFFSET_KIND] = self.kind as u8;
        data[1..Self::OFFSET_CHECKSUM].fill(0);

        let checksum_bytes = self.checksum.to_le_bytes();
        data[Self::OFFSET_CHECKSUM..Self::OFFSET_CHECKSUM + 4].copy_from_slice(&checksum_bytes);
    }

    /// Compute CRC32 checksum of a block.
    ///
    /// The checksum is computed with the checksum field (bytes 4-8) zeroed
    /// out, so the checksum doesn't include itself.
    pub fn compute_checksum(block_data: &[u8]) -> u32 {
        let mut hasher = crc32fast::Hasher::new();

        // Hash bytes before the checksum field (kind + reserved)
        hasher.update(&block_data[..Self::OFFSET_CHECKSUM]);

        // Skip the checksum field by feeding zeros instead
        hasher.update(&[0u8; 4]);

        // Hash bytes after the checksum field to the end of the block
        hasher.update(&block_data[Self::OFFSET_CHECKSUM + 4..]);

        hasher.finalize()
    }

    /// Verify that the stored checksum matches the computed checksum.
    pub fn verify_checksum(&self, block_data: &[u8]) -> bool {
        self.checksum == Self::compute_checksum(block_data)
    }
}
