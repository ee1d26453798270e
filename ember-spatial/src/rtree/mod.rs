//! Paged persistent R-tree.
//!
//! This module provides the ordered key store behind
//! [`PersistentSpatialIndex`](crate::PersistentSpatialIndex):
//! - **Lazy Loading**: only the header is read on open; nodes are loaded on access
//! - **LRU Page Cache**: bounded number of decoded pages with dirty write-back
//! - **Checksums**: every node page carries a CRC32 verified on read
//! - **Page Reuse**: pages freed by deletions are handed out again

mod cache;
pub mod constants;
mod map;
mod storage;
mod types;

pub use map::{KeyIter, PersistentRTreeMap};
pub use types::{RTreeError, RTreeResult, RTreeStats};
