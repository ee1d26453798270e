//! Spatial integration test module.
//!
//! These tests drive both spatial index engines through the same table and
//! check the contract they share.

mod cursor_test;
mod engine_test;
mod geometry_test;
mod indexer_test;
mod precision_test;
mod scenario_test;
