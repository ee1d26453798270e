use crate::common::{Row, RowId};
use crate::errors::EmberResult;

/// The row storage a secondary index reads through.
///
/// The store owns row bytes and row identifiers; an index only keeps
/// identifiers and resolves them back to rows with [`RowStore::get_row`]
/// when a cursor advances.
pub trait RowStore: Send + Sync {
    /// Name of the table the store belongs to.
    fn table_name(&self) -> &str;

    /// Resolves a row identifier to the full row.
    ///
    /// # Errors
    /// Returns `RowNotFound` when no row has the identifier.
    fn get_row(&self, key: RowId) -> EmberResult<Row>;

    /// A cheap estimate of the number of rows, used for cost estimation.
    fn approximate_row_count(&self) -> u64;
}
