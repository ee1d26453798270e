//! Table-side contracts consumed by indexes: column metadata and row lookup.

mod column;
mod row_store;

pub use column::*;
pub use row_store::*;
