//! # Ember Spatial - spatial indexes for the Ember database
//!
//! Two interchangeable engines answer "which rows have a geometry whose
//! bounding box overlaps this one" without scanning the table:
//!
//! - [`MemorySpatialIndex`]: an R*-tree held in memory and repacked with
//!   sort-tile-recursive bulk loading before queries
//! - [`PersistentSpatialIndex`]: a paged R-tree in a page file with an LRU
//!   page cache ([`rtree::PersistentRTreeMap`])
//!
//! Both implement [`SpatialIndex`] and return a [`SpatialCursor`] that
//! resolves row ids through the table's [`RowStore`](ember::table::RowStore).
//! The persistent engine stores envelopes as single precision
//! [`SpatialKey`]s, widened outward so that no overlapping row is ever
//! missed.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ember_spatial::{SpatialConfig, SpatialIndex, SpatialIndexer};
//!
//! let indexer = SpatialIndexer::new(SpatialConfig::builder().persistent(true).build());
//! let index = indexer.create_index(definition, table.clone(), DatabaseState::Open)?;
//! for row in rows {
//!     index.add(&row)?;
//! }
//!
//! let search = GeometryValue::from_wkt("POLYGON ((0 0, 2 0, 2 2, 0 2, 0 0))")?;
//! for row in index.find_by_geometry(Some(&search))?.rows() {
//!     println!("{:?}", row?);
//! }
//! ```

mod config;
mod cost;
mod cursor;
mod indexer;
mod memory_index;
pub mod rtree;
mod spatial_index;
mod spatial_key;
mod tree_index;
mod validation;

#[cfg(test)]
mod test_support;

pub use config::{SpatialConfig, SpatialConfigBuilder};
pub use cost::estimate_cost;
pub use cursor::{Rows, SpatialCursor, TreeItem};
pub use indexer::SpatialIndexer;
pub use memory_index::{MemorySpatialIndex, NODE_CAPACITY};
pub use spatial_index::SpatialIndex;
pub use spatial_key::{round_down, round_up, KeyRect, SpatialKey};
pub use tree_index::PersistentSpatialIndex;
pub use validation::validate_definition;
