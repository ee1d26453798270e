use std::sync::Arc;

use crate::common::{NullOrdering, SortOrder};
use crate::table::Column;

/// One column of an index together with the ordering requested for it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct IndexColumn {
    column: Column,
    sort_order: SortOrder,
    null_ordering: NullOrdering,
}

impl IndexColumn {
    /// An ascending column with default null placement.
    pub fn new(column: Column) -> Self {
        IndexColumn {
            column,
            sort_order: SortOrder::Ascending,
            null_ordering: NullOrdering::Default,
        }
    }

    pub fn with_sort_order(mut self, sort_order: SortOrder) -> Self {
        self.sort_order = sort_order;
        self
    }

    pub fn with_null_ordering(mut self, null_ordering: NullOrdering) -> Self {
        self.null_ordering = null_ordering;
        self
    }

    pub fn column(&self) -> &Column {
        &self.column
    }

    pub fn sort_order(&self) -> SortOrder {
        self.sort_order
    }

    pub fn null_ordering(&self) -> NullOrdering {
        self.null_ordering
    }
}

/// Kind flags of an index as requested by `CREATE [UNIQUE] [SPATIAL] INDEX`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct IndexType {
    unique: bool,
    spatial: bool,
}

impl IndexType {
    /// `CREATE SPATIAL INDEX`
    pub fn spatial() -> Self {
        IndexType {
            unique: false,
            spatial: true,
        }
    }

    /// `CREATE INDEX`
    pub fn non_unique() -> Self {
        IndexType::default()
    }

    /// `CREATE UNIQUE INDEX`
    pub fn unique() -> Self {
        IndexType {
            unique: true,
            spatial: false,
        }
    }

    pub fn with_unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    pub fn is_spatial(&self) -> bool {
        self.spatial
    }
}

/// Describes an index to be created on a table.
///
/// An index definition names the index, the table it belongs to, the
/// indexed columns and the requested index type. Index engines validate the
/// definition at construction and reject configurations they cannot serve.
///
/// # Characteristics
/// - **Immutable**: built once through [`IndexDefinition::new`]
/// - **Cheap to clone**: clones share the same definition
///
/// # Examples
///
/// ```rust
/// use ember::common::ValueType;
/// use ember::index::{IndexColumn, IndexDefinition, IndexType};
/// use ember::table::Column;
///
/// let shape = Column::new("shape", 1, ValueType::Geometry);
/// let definition = IndexDefinition::new(
///     "idx_shape",
///     "places",
///     vec![IndexColumn::new(shape)],
///     IndexType::spatial(),
/// );
/// assert_eq!(definition.columns().len(), 1);
/// assert!(!definition.index_type().is_unique());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct IndexDefinition {
    inner: Arc<IndexDefinitionInner>,
}

#[derive(Debug, PartialEq, Eq, Hash)]
struct IndexDefinitionInner {
    name: String,
    table_name: String,
    columns: Vec<IndexColumn>,
    index_type: IndexType,
}

impl IndexDefinition {
    /// Creates a new index definition.
    ///
    /// # Arguments
    /// * `name` - Index name, unique within the database
    /// * `table_name` - Name of the indexed table
    /// * `columns` - Indexed columns in key order
    /// * `index_type` - Requested index kind
    pub fn new(
        name: &str,
        table_name: &str,
        columns: Vec<IndexColumn>,
        index_type: IndexType,
    ) -> Self {
        IndexDefinition {
            inner: Arc::new(IndexDefinitionInner {
                name: name.to_string(),
                table_name: table_name.to_string(),
                columns,
                index_type,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn table_name(&self) -> &str {
        &self.inner.table_name
    }

    pub fn columns(&self) -> &[IndexColumn] {
        &self.inner.columns
    }

    pub fn index_type(&self) -> IndexType {
        self.inner.index_type
    }
}
