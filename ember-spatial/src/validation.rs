use ember::common::{DatabaseState, NullOrdering, SortOrder, ValueType};
use ember::errors::{EmberError, EmberResult, ErrorKind};
use ember::index::IndexDefinition;
use ember::table::Column;

fn unsupported(message: &str) -> EmberError {
    EmberError::new(message, ErrorKind::UnsupportedIndexConfiguration)
}

/// Checks that `definition` describes an index a spatial engine can serve
/// and returns the indexed column.
///
/// A spatial index is non-unique, covers exactly one column, uses the
/// default ascending order without explicit null placement, and indexes a
/// `GEOMETRY` column. The column type is not checked while the database is
/// starting, since recovery rebuilds indexes before the schema is complete.
pub fn validate_definition(
    definition: &IndexDefinition,
    state: DatabaseState,
) -> EmberResult<Column> {
    if definition.index_type().is_unique() {
        return Err(unsupported("not unique"));
    }
    let [index_column] = definition.columns() else {
        return Err(unsupported("can only do one column"));
    };
    if index_column.sort_order() == SortOrder::Descending {
        return Err(unsupported("cannot do descending"));
    }
    match index_column.null_ordering() {
        NullOrdering::First => return Err(unsupported("cannot do nulls first")),
        NullOrdering::Last => return Err(unsupported("cannot do nulls last")),
        NullOrdering::Default => {}
    }

    let column = index_column.column();
    if !state.is_starting() && column.value_type() != ValueType::Geometry {
        return Err(unsupported(&format!(
            "spatial index on non-geometry column, {}",
            column.create_sql()
        )));
    }
    Ok(column.clone())
}
