//! The B+Tree index engine.
//!
//! - [`IndexMeta`] - the persisted header block (root, height, key length)
//! - [`Key`] - exact-length validated keys
//! - [`BPlusTree`] - traversal, insertion, split/promotion
//! - [`Scan`] - ordered range listings over the leaf sibling chain

mod key;
mod meta;
mod node;
mod scan;
mod tree;

pub use key::Key;
pub use meta::IndexMeta;
pub use scan::{IndexEntry, Scan, ScanOrigin};
pub use tree::{BPlusTree, BuildStats, InsertOutcome};
