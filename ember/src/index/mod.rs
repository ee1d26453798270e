//! Index metadata shared by all index engines.
//!
//! - [`IndexDefinition`]: name, table, columns and kind of an index
//! - [`IndexColumn`]: an indexed column with its requested ordering
//! - [`ConditionMask`]: per-column query conditions passed to cost estimation

mod condition;
mod definition;

pub use condition::*;
pub use definition::*;
