//! Error types for linedex.

use thiserror::Error;

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write `Result<T>`.
/// This is a common Rust pattern (see `std::io::Result`).
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors in linedex.
///
/// By having a single error type, error handling stays consistent across the
/// storage and index layers. Duplicate keys are deliberately *not* an error:
/// they are a domain outcome reported through
/// [`InsertOutcome`](crate::index::InsertOutcome).
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from disk operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A block offset is outside the file or not block-aligned.
    #[error("invalid block offset {0}")]
    InvalidBlockOffset(u64),

    /// A block's stored CRC32 does not match its contents.
    #[error("checksum mismatch in block at offset {0}")]
    ChecksumMismatch(u64),

    /// A block's kind tag disagrees with what the traversal expected.
    #[error("unexpected block kind {found} at offset {offset}")]
    UnexpectedBlockKind { offset: u64, found: u8 },

    /// A node scan never found a sentinel within capacity.
    ///
    /// This is a structural invariant violation; the tree is corrupt and the
    /// engine makes no attempt to self-heal.
    #[error("no sentinel entry in node at offset {0}")]
    MissingSentinel(u64),

    /// The meta block failed validation on load.
    #[error("corrupt index header: {0}")]
    CorruptHeader(String),

    /// A structural invariant of the tree does not hold.
    ///
    /// Reported by [`BPlusTree::verify`](crate::BPlusTree::verify); the
    /// engine never attempts to repair a tree in this state.
    #[error("tree invariant violated: {0}")]
    InvariantViolation(String),

    /// A supplied key's length disagrees with the index key length.
    ///
    /// Keys are never silently padded or truncated.
    #[error("key length {found} does not match index key length {expected}")]
    KeyLength { expected: usize, found: usize },

    /// The supplied key equals the reserved sentinel pattern.
    #[error("key consists entirely of the reserved sentinel byte")]
    ReservedKey,

    /// The key length given at index creation is out of range.
    #[error("key length {0} is out of range (1..=64)")]
    InvalidKeyLength(usize),

    /// The record-store path does not fit in the meta block's path field.
    #[error("record file path is {0} bytes, longer than the 256-byte field")]
    PathTooLong(usize),

    /// A record line is shorter than the index key length.
    #[error("record at offset {offset} is {found} bytes, shorter than the key length {expected}")]
    RecordTooShort {
        offset: u64,
        expected: usize,
        found: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidBlockOffset(42);
        assert_eq!(format!("{}", err), "invalid block offset 42");

        let err = Error::MissingSentinel(1024);
        assert_eq!(format!("{}", err), "no sentinel entry in node at offset 1024");

        let err = Error::KeyLength {
            expected: 4,
            found: 7,
        };
        assert_eq!(
            format!("{}", err),
            "key length 7 does not match index key length 4"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();

        match err {
            Error::Io(_) => {}
            _ => panic!("Expected Io error"),
        }
    }
}
