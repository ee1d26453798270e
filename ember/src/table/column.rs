use std::fmt::{self, Display};
use std::sync::Arc;

use crate::common::ValueType;

/// A table column definition.
///
/// Cheap to clone; clones share the same definition.
///
/// # Examples
///
/// ```rust
/// use ember::common::ValueType;
/// use ember::table::Column;
///
/// let column = Column::new("shape", 1, ValueType::Geometry);
/// assert_eq!(column.create_sql(), "\"SHAPE\" GEOMETRY");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Column {
    inner: Arc<ColumnInner>,
}

#[derive(Debug, PartialEq, Eq, Hash)]
struct ColumnInner {
    name: String,
    column_id: usize,
    value_type: ValueType,
    nullable: bool,
}

impl Column {
    /// Creates a nullable column.
    ///
    /// # Arguments
    /// * `name` - Column name; stored upper-case as unquoted SQL identifiers are
    /// * `column_id` - Position of the column in the table's rows
    /// * `value_type` - Declared column type
    pub fn new(name: &str, column_id: usize, value_type: ValueType) -> Self {
        Column::with_nullability(name, column_id, value_type, true)
    }

    /// Creates a column with explicit nullability.
    pub fn with_nullability(
        name: &str,
        column_id: usize,
        value_type: ValueType,
        nullable: bool,
    ) -> Self {
        Column {
            inner: Arc::new(ColumnInner {
                name: name.to_ascii_uppercase(),
                column_id,
                value_type,
                nullable,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn column_id(&self) -> usize {
        self.inner.column_id
    }

    pub fn value_type(&self) -> ValueType {
        self.inner.value_type
    }

    pub fn is_nullable(&self) -> bool {
        self.inner.nullable
    }

    /// The column clause of a `CREATE TABLE` statement, e.g. `"NAME" VARCHAR NOT NULL`.
    pub fn create_sql(&self) -> String {
        let mut sql = format!("\"{}\" {}", self.inner.name, self.inner.value_type.sql_name());
        if !self.inner.nullable {
            sql.push_str(" NOT NULL");
        }
        sql
    }
}

impl Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner.name)
    }
}
