//! Disk I/O and block formats.

mod block;
mod block_file;
pub mod block_header;
mod record_file;

pub use block::Block;
pub use block_file::BlockFile;
pub use block_header::{BlockHeader, BlockKind};
pub use record_file::{RecordFile, Records};
