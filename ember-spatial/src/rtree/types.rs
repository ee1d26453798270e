//! Core types of the persistent R-tree: errors, nodes, pages and header.

use std::io;

use ember::errors::{EmberError, ErrorKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::constants::{MAGIC, PAGE_SIZE, VERSION};
use crate::spatial_key::{KeyRect, SpatialKey};

/// Errors raised inside the page layer of the persistent R-tree.
#[derive(Debug, Error)]
pub enum RTreeError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Corrupted page file: {0}")]
    Corrupted(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("R-tree map is closed")]
    Closed,
}

impl From<RTreeError> for EmberError {
    fn from(err: RTreeError) -> Self {
        match err {
            RTreeError::Io(io_err) => EmberError::new(
                &format!("Spatial I/O error: {}", io_err),
                ErrorKind::IOError,
            ),
            RTreeError::Serialization(msg) => EmberError::new(&msg, ErrorKind::EncodingError),
            RTreeError::Corrupted(msg) => EmberError::new(&msg, ErrorKind::FileCorrupted),
            RTreeError::InvalidOperation(msg) => EmberError::new(&msg, ErrorKind::InternalError),
            RTreeError::Closed => EmberError::new("Spatial index is closed", ErrorKind::InvalidState),
        }
    }
}

pub type RTreeResult<T> = Result<T, RTreeError>;

/// Page id; page 0 holds the file header.
pub type PageId = u64;

/// Counters describing an R-tree map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RTreeStats {
    pub total_entries: u64,
    pub allocated_pages: u64,
    pub cached_pages: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub disk_reads: u64,
    pub disk_writes: u64,
    pub tree_height: u32,
}

/// A child reference in an internal node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChildRef {
    pub rect: KeyRect,
    pub page_id: PageId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Node {
    Leaf {
        keys: Vec<SpatialKey>,
    },
    Internal {
        children: Vec<ChildRef>,
        // distance from the leaves, leaves are 0
        level: u32,
    },
}

impl Node {
    /// The rectangle enclosing every key or child of this node.
    pub fn compute_rect(&self) -> KeyRect {
        let mut rect = KeyRect::empty();
        match self {
            Node::Leaf { keys } => keys.iter().for_each(|k| rect.expand(k.rect())),
            Node::Internal { children, .. } => children.iter().for_each(|c| rect.expand(&c.rect)),
        }
        rect
    }

    pub fn len(&self) -> usize {
        match self {
            Node::Leaf { keys } => keys.len(),
            Node::Internal { children, .. } => children.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A node page together with the CRC32 of its encoded form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageWithChecksum {
    pub checksum: u32,
    pub node: Node,
}

impl PageWithChecksum {
    pub fn new(node: Node) -> RTreeResult<Self> {
        let checksum = Self::calculate_checksum(&node)?;
        Ok(Self { checksum, node })
    }

    pub fn calculate_checksum(node: &Node) -> RTreeResult<u32> {
        let encoded = encode(node)?;
        Ok(crc32(&encoded))
    }

    /// Verifies the checksum and returns the node.
    pub fn into_node(self) -> RTreeResult<Node> {
        let expected = Self::calculate_checksum(&self.node)?;
        if self.checksum != expected {
            return Err(RTreeError::Corrupted(format!(
                "Page checksum mismatch (expected: {:x}, got: {:x})",
                expected, self.checksum
            )));
        }
        Ok(self.node)
    }
}

/// CRC-32/BZIP2 (MSB-first, polynomial 0x04C11DB7).
fn crc32(data: &[u8]) -> u32 {
    const POLY: u32 = 0x04C1_1DB7;
    let mut crc: u32 = 0xFFFF_FFFF;
    for &byte in data {
        crc ^= u32::from(byte) << 24;
        for _ in 0..8 {
            crc = if crc & 0x8000_0000 != 0 {
                (crc << 1) ^ POLY
            } else {
                crc << 1
            };
        }
    }
    crc ^ 0xFFFF_FFFF
}

pub(crate) fn encode<T: Serialize>(value: &T) -> RTreeResult<Vec<u8>> {
    bincode::serde::encode_to_vec(value, bincode::config::legacy())
        .map_err(|e| RTreeError::Serialization(e.to_string()))
}

pub(crate) fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> RTreeResult<T> {
    bincode::serde::decode_from_slice(bytes, bincode::config::legacy())
        .map(|(value, _)| value)
        .map_err(|e| RTreeError::Serialization(e.to_string()))
}

/// Header stored in page 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHeader {
    pub magic: u32,
    pub version: u32,
    pub page_size: u32,
    pub root_page: PageId,
    pub next_page_id: PageId,
    pub entry_count: u64,
    pub height: u32,
}

impl FileHeader {
    pub fn new() -> Self {
        Self {
            magic: MAGIC,
            version: VERSION,
            page_size: PAGE_SIZE as u32,
            root_page: 0,
            next_page_id: 1,
            entry_count: 0,
            height: 0,
        }
    }

    pub fn validate(&self) -> RTreeResult<()> {
        if self.magic != MAGIC {
            return Err(RTreeError::Corrupted("Invalid file format (bad magic)".into()));
        }
        if self.version != VERSION {
            return Err(RTreeError::Corrupted(format!(
                "Unsupported file format version {}",
                self.version
            )));
        }
        if self.page_size as usize != PAGE_SIZE {
            return Err(RTreeError::Corrupted(format!(
                "Unsupported page size {}",
                self.page_size
            )));
        }
        Ok(())
    }
}

impl Default for FileHeader {
    fn default() -> Self {
        Self::new()
    }
}
