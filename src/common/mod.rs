//! Common types and utilities shared across linedex.
//!
//! This module contains fundamental primitives used throughout the codebase:
//! - Configuration constants
//! - Error types
//! - The [`BlockOffset`] node identity type

pub mod config;
pub mod error;
mod block_offset;

pub use block_offset::BlockOffset;
pub use error::{Error, Result};
