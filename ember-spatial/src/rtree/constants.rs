//! Page file format constants of the persistent R-tree.

/// Size of every page, including the header page.
pub const PAGE_SIZE: usize = 16384;

/// Maximum number of keys per leaf node.
pub const MAX_LEAF_ENTRIES: usize = 64;

/// Maximum children per internal node.
pub const MAX_INTERNAL_CHILDREN: usize = 64;

/// Default page cache size in pages (16MB with 16KB pages).
pub const DEFAULT_CACHE_PAGES: usize = 1024;

/// File format identifier: "ESRT".
pub const MAGIC: u32 = 0x4553_5254;

/// File format version.
pub const VERSION: u32 = 1;

/// Page id of the file header; never holds a node.
pub const HEADER_PAGE: u64 = 0;
