use crate::common::Value;

/// Opaque identifier the row store assigns to every row.
pub type RowId = i64;

/// A materialized table row: its key plus one value per column.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    key: RowId,
    values: Vec<Value>,
}

impl Row {
    pub fn new(key: RowId, values: Vec<Value>) -> Self {
        Row { key, values }
    }

    pub fn key(&self) -> RowId {
        self.key
    }

    /// Value of the column with the given id, `Value::Null` when out of range.
    pub fn value(&self, column_id: usize) -> &Value {
        static NULL: Value = Value::Null;
        self.values.get(column_id).unwrap_or(&NULL)
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn column_count(&self) -> usize {
        self.values.len()
    }
}
