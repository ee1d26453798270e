//! Geometry values and their text and binary codecs.
//!
//! - [`GeometryValue`]: the immutable column value stored in tables and indexes
//! - [`Envelope`]: planar bounding rectangles and their set operations
//! - [`Geometry`]: the in-memory model behind a value
//! - [`wkt`] and [`wkb`]: Well-Known Text and Binary codecs
//! - [`GeometryCache`]: interning of repeated values

mod cache;
mod envelope;
mod model;
mod value;
pub mod wkb;
pub mod wkt;

pub use cache::*;
pub use envelope::*;
pub use model::*;
pub use value::*;
