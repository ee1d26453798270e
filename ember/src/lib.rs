//! # Ember - core of an embedded relational database
//!
//! This crate holds the pieces every index engine builds on:
//!
//! - [`geometry`] - the GEOMETRY data type: [`GeometryValue`](geometry::GeometryValue),
//!   envelopes, WKT/WKB codecs and an interning cache
//! - [`common`] - values, rows, sort flags and planner constants
//! - [`index`] - index definitions and query condition masks
//! - [`table`] - column metadata and the [`RowStore`](table::RowStore) contract
//! - [`errors`] - error types and result definitions
//!
//! The spatial index engines live in the `ember_spatial` crate.
//!
//! ## Quick Start
//!
//! ```rust
//! use ember::geometry::GeometryValue;
//!
//! let value = GeometryValue::from_wkt("SRID=4326;POINT (13.4 52.5)").unwrap();
//! assert_eq!(value.srid(), 4326);
//! let copy = GeometryValue::from_wkb(value.to_wkb()).unwrap();
//! assert_eq!(value, copy);
//! ```

pub mod common;
pub mod errors;
pub mod geometry;
pub mod index;
pub mod table;
