//! linedex - a disk-based B+Tree index over newline-delimited record files.
//!
//! # Architecture
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          linedex                             │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌──────────────────────────────────────────────────────┐   │
//! │  │              Command Layer (bin/linedex)              │   │
//! │  │          build  |  find  |  list  |  insert           │   │
//! │  └──────────────────────────────────────────────────────┘   │
//! │                             ↓                                │
//! │  ┌──────────────────────────────────────────────────────┐   │
//! │  │               Index Layer (index/)                    │   │
//! │  │   BPlusTree: traversal → insertion → split/promote    │   │
//! │  │   Scan: ordered listings over the leaf sibling chain  │   │
//! │  │   IndexMeta + Key + node codec                        │   │
//! │  └──────────────────────────────────────────────────────┘   │
//! │                             ↓                                │
//! │  ┌──────────────────────────────────────────────────────┐   │
//! │  │              Storage Layer (storage/)                 │   │
//! │  │   BlockFile: 1KB blocks addressed by byte offset      │   │
//! │  │   Block + BlockHeader (kind tag, CRC32)               │   │
//! │  │   RecordFile: the external newline-delimited store    │   │
//! │  └──────────────────────────────────────────────────────┘   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The index file is a meta block followed by 1KB node blocks; a node's
//! identity is its byte offset, and every link in the tree — root pointer,
//! child pointers, the leaf sibling chain — is such an offset. Keys are
//! fixed-length byte strings mapping to byte offsets in an external
//! append-only record file.
//!
//! # Modules
//! - [`common`] - Shared primitives (BlockOffset, Error, config)
//! - [`storage`] - Block I/O and the record store
//! - [`index`] - The B+Tree engine itself
//!
//! # Quick Start
//! ```no_run
//! use linedex::{BPlusTree, Key};
//!
//! // Build an index over a record file, keyed on each line's first 4 bytes
//! let (mut tree, stats) = BPlusTree::build("records.txt", "records.idx", 4).unwrap();
//! println!("indexed {} records", stats.inserted);
//!
//! let key = Key::new(*b"0005", tree.key_len()).unwrap();
//! let offset = tree.find(&key).unwrap();
//! ```

pub mod common;
pub mod index;
pub mod storage;

// Re-export commonly used items at crate root for convenience
pub use common::config::BLOCK_SIZE;
pub use common::{BlockOffset, Error, Result};

pub use index::{BPlusTree, BuildStats, IndexEntry, IndexMeta, InsertOutcome, Key, Scan, ScanOrigin};
pub use storage::{BlockFile, RecordFile};
