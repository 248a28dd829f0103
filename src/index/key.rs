//! Key type.

use std::fmt;

use crate::common::config::SENTINEL_BYTE;
use crate::common::{Error, Result};

/// An exact-length index key.
///
/// Keys are fixed-width byte strings; the width is set at index creation and
/// never changes. A supplied key whose length disagrees is rejected, never
/// silently padded or truncated — callers that want short keys padded must
/// pad them before construction.
///
/// The all-`0xFF` pattern is reserved for the node sentinel and is likewise
/// rejected.
///
/// Ordering is lexicographic byte comparison, the same comparison the tree
/// uses on disk.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Key(Vec<u8>);

impl Key {
    /// Create a key, validating it against the index key length.
    ///
    /// # Errors
    /// Returns `Error::KeyLength` if the length disagrees with `key_len`,
    /// and `Error::ReservedKey` if the bytes equal the sentinel pattern.
    pub fn new(bytes: impl Into<Vec<u8>>, key_len: usize) -> Result<Self> {
        let bytes = bytes.into();
        if bytes.len() != key_len {
            return Err(Error::KeyLength {
                expected: key_len,
                found: bytes.len(),
            });
        }
        if bytes.iter().all(|&b| b == SENTINEL_BYTE) {
            return Err(Error::ReservedKey);
        }
        Ok(Key(bytes))
    }

    /// Extract the key of a record line: its first `key_len` bytes.
    ///
    /// # Errors
    /// Returns `Error::RecordTooShort` if the line cannot hold a full key.
    /// `offset` is only used for error reporting.
    pub fn from_record_line(line: &str, key_len: usize, offset: u64) -> Result<Self> {
        let bytes = line.as_bytes();
        if bytes.len() < key_len {
            return Err(Error::RecordTooShort {
                offset,
                expected: key_len,
                found: bytes.len(),
            });
        }
        Key::new(&bytes[..key_len], key_len)
    }

    /// The key's bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The key's length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Keys are never empty; present for clippy's `len_without_is_empty`.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

impl AsRef<[u8]> for Key {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_new() {
        let key = Key::new(*b"0001", 4).unwrap();
        assert_eq!(key.as_bytes(), b"0001");
        assert_eq!(key.len(), 4);
    }

    #[test]
    fn test_key_wrong_length_rejected() {
        let err = Key::new(*b"001", 4).unwrap_err();
        assert!(matches!(
            err,
            Error::KeyLength {
                expected: 4,
                found: 3
            }
        ));

        assert!(Key::new(*b"00001", 4).is_err());
    }

    #[test]
    fn test_key_sentinel_pattern_rejected() {
        let err = Key::new([0xFF; 4], 4).unwrap_err();
        assert!(matches!(err, Error::ReservedKey));

        // A key merely containing 0xFF is fine
        assert!(Key::new([0xFF, 0xFF, 0xFF, 0x00], 4).is_ok());
    }

    #[test]
    fn test_key_from_record_line() {
        let key = Key::from_record_line("0001 some data", 4, 0).unwrap();
        assert_eq!(key.as_bytes(), b"0001");

        let err = Key::from_record_line("00", 4, 17).unwrap_err();
        assert!(matches!(err, Error::RecordTooShort { offset: 17, .. }));
    }

    #[test]
    fn test_key_ordering_is_byte_exact() {
        let a = Key::new(*b"AAAA", 4).unwrap();
        let b = Key::new(*b"aaaa", 4).unwrap();
        // 'A' (0x41) < 'a' (0x61): case matters, both for ordering
        // and for duplicate detection.
        assert!(a < b);
        assert_ne!(a, b);
    }
}
