use ember::common::{Row, Value};
use ember::errors::{EmberError, EmberResult, ErrorKind};
use ember::geometry::{Envelope, GeometryValue};
use ember::index::{ConditionMask, IndexDefinition};
use ember::table::Column;

use crate::cursor::SpatialCursor;

/// The capability set both spatial index engines offer to the table and
/// planner layers.
///
/// An index stores, per row, the bounding rectangle of the row's geometry in
/// the indexed column together with the row id. It never owns row data:
/// cursors resolve ids back to rows through the table's
/// [`RowStore`](ember::table::RowStore).
///
/// Mutations (`add`, `remove`, `truncate`) are expected to be serialized by
/// the caller. Every operation except the metadata accessors fails with
/// `InvalidState` once the index is closed.
pub trait SpatialIndex: Send + Sync {
    fn name(&self) -> &str;

    fn definition(&self) -> &IndexDefinition;

    /// Indexes `row` under the envelope of its geometry.
    ///
    /// # Errors
    /// `InvalidDataType` if the indexed value is NULL or not a geometry,
    /// `DuplicateRow` if the row is already indexed under that envelope.
    fn add(&self, row: &Row) -> EmberResult<()>;

    /// Removes the entry for `row`; both the envelope and the row id must
    /// match an existing entry.
    ///
    /// # Errors
    /// `RowNotFound` if there is no such entry.
    fn remove(&self, row: &Row) -> EmberResult<()>;

    /// All rows in tree order. The bounds are accepted for interface
    /// compatibility with ordered indexes and ignored.
    fn find(&self, first: Option<&Row>, last: Option<&Row>) -> EmberResult<SpatialCursor>;

    /// Rows whose envelope overlaps the envelope of `intersection`, or all
    /// rows when it is `None`.
    fn find_by_geometry(&self, intersection: Option<&GeometryValue>) -> EmberResult<SpatialCursor>;

    /// All rows in tree order, positioned before the first row (`first`) or
    /// after the last one. This is a structural lookup, not a spatial
    /// minimum or maximum.
    fn find_first_or_last(&self, first: bool) -> EmberResult<SpatialCursor>;

    fn row_count(&self) -> u64;

    fn row_count_approximation(&self) -> u64;

    /// Planner cost for a query with the given per-column condition masks.
    fn cost(&self, masks: &[ConditionMask]) -> f64;

    /// Removes every entry.
    fn truncate(&self) -> EmberResult<()>;

    /// Releases the tree. Closing twice is a no-op.
    fn close(&self) -> EmberResult<()>;

    /// Removes every entry and releases all storage of the index.
    fn drop_index(&self) -> EmberResult<()>;

    fn is_closed(&self) -> bool;

    /// Spatial indexes are rebuilt from the table on recovery.
    fn need_rebuild(&self) -> bool {
        true
    }

    fn can_get_first_or_last(&self) -> bool {
        true
    }

    fn disk_space_used(&self) -> u64;
}

/// Envelope of the geometry `row` holds in `column`.
pub(crate) fn indexed_envelope(row: &Row, column: &Column) -> EmberResult<Envelope> {
    match row.value(column.column_id()) {
        Value::Geometry(geometry) => Ok(geometry.envelope()),
        Value::Null => Err(EmberError::new(
            &format!("Spatial index cannot store NULL in column {}", column),
            ErrorKind::InvalidDataType,
        )),
        other => Err(EmberError::new(
            &format!(
                "Spatial index expects GEOMETRY in column {}, found {}",
                column,
                other.value_type()
            ),
            ErrorKind::InvalidDataType,
        )),
    }
}

pub(crate) fn closed_error(index_name: &str) -> EmberError {
    EmberError::new(
        &format!("Spatial index {} is closed", index_name),
        ErrorKind::InvalidState,
    )
}

pub(crate) fn duplicate_row(index_name: &str, row: &Row) -> EmberError {
    EmberError::new(
        &format!("row {} is already in spatial index {}", row.key(), index_name),
        ErrorKind::DuplicateRow,
    )
}

pub(crate) fn row_not_found(index_name: &str, row: &Row) -> EmberError {
    log::error!(
        "Spatial index {} has no entry for row {}; index and table are inconsistent",
        index_name,
        row.key()
    );
    EmberError::new(
        &format!("row not found: {} in spatial index {}", row.key(), index_name),
        ErrorKind::RowNotFound,
    )
}
