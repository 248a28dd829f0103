//! Configuration constants for linedex.

/// Size of an index block in bytes (1KB).
///
/// Every unit in the index file — the meta block and every tree node — is
/// exactly one block. A node's address is its byte offset in the file, so
/// all node offsets are multiples of `BLOCK_SIZE`.
pub const BLOCK_SIZE: usize = 1024;

/// Size of the per-block header: kind tag (1), reserved (3), CRC32 (4).
pub const BLOCK_HEADER_SIZE: usize = 8;

/// Width of an on-disk node pointer / record offset (u64, little-endian).
pub const POINTER_SIZE: usize = 8;

/// Width of the record-store path field in the meta block.
///
/// The path is stored zero-padded; paths longer than this are rejected at
/// index creation.
pub const PATH_FIELD_SIZE: usize = 256;

/// Byte value the sentinel key is filled with.
///
/// `0xFF` sorts after every real key under lexicographic comparison, so a
/// left-to-right scan stops at the sentinel without a special case. A real
/// key consisting entirely of `0xFF` bytes is rejected at validation time.
pub const SENTINEL_BYTE: u8 = 0xFF;

/// Maximum configurable key length.
///
/// Bounded well below the block size so that a node always holds a useful
/// number of entries (at 64 the branching factor is still 14).
pub const MAX_KEY_LEN: usize = 64;

/// Maximum entries per node for a given key length.
///
/// A node physically holds at most `branching_factor - 1` real entries plus
/// the sentinel entry; an insertion that would bring it to the full factor
/// splits the node instead. That headroom is what keeps a leaf's sentinel
/// slot inside the block for every legal key length; internal nodes also
/// carry a leading child pointer and clamp their capacity when the last
/// slot would not fit.
pub const fn branching_factor(key_len: usize) -> usize {
    (BLOCK_SIZE - BLOCK_HEADER_SIZE) / (key_len + POINTER_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_size_is_power_of_two() {
        assert!(BLOCK_SIZE.is_power_of_two());
        assert_eq!(BLOCK_SIZE, 1024);
    }

    #[test]
    fn test_branching_factor_formula() {
        // (1024 - 8) / (key_len + 8)
        assert_eq!(branching_factor(4), 84);
        assert_eq!(branching_factor(8), 63);
        assert_eq!(branching_factor(64), 14);
    }

    #[test]
    fn test_full_node_fits_in_block() {
        for key_len in 1..=MAX_KEY_LEN {
            let b = branching_factor(key_len);
            let slot = key_len + POINTER_SIZE;

            // A full leaf (branching slots, sentinel included) always fits.
            assert!(BLOCK_HEADER_SIZE + b * slot <= BLOCK_SIZE);

            // An internal node gives up 8 bytes to its leading pointer; its
            // clamped capacity still leaves room to branch.
            let internal = (BLOCK_SIZE - BLOCK_HEADER_SIZE - POINTER_SIZE) / slot;
            assert!(b.min(internal) >= 3, "key_len {key_len}");
        }
    }
}
