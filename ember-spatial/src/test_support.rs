use std::collections::BTreeMap;

use ember::common::{Row, RowId, Value, ValueType};
use ember::errors::{EmberError, EmberResult, ErrorKind};
use ember::geometry::GeometryValue;
use ember::index::{IndexColumn, IndexDefinition, IndexType};
use ember::table::{Column, RowStore};
use parking_lot::RwLock;

/// Rows of `places(id BIGINT, shape GEOMETRY)` kept in a map.
pub(crate) struct TestTable {
    rows: RwLock<BTreeMap<RowId, Row>>,
}

impl TestTable {
    pub(crate) fn new() -> Self {
        TestTable {
            rows: RwLock::new(BTreeMap::new()),
        }
    }

    pub(crate) fn insert(&self, key: RowId, wkt: &str) -> Row {
        let row = geometry_row(key, wkt);
        self.rows.write().insert(key, row.clone());
        row
    }

    pub(crate) fn row(&self, key: RowId) -> Row {
        self.rows.read()[&key].clone()
    }
}

impl RowStore for TestTable {
    fn table_name(&self) -> &str {
        "places"
    }

    fn get_row(&self, key: RowId) -> EmberResult<Row> {
        self.rows
            .read()
            .get(&key)
            .cloned()
            .ok_or_else(|| EmberError::new(&format!("row {} not found", key), ErrorKind::RowNotFound))
    }

    fn approximate_row_count(&self) -> u64 {
        self.rows.read().len() as u64
    }
}

pub(crate) fn geometry_row(key: RowId, wkt: &str) -> Row {
    let geometry = GeometryValue::from_wkt(wkt).unwrap();
    Row::new(key, vec![Value::Long(key), Value::Geometry(geometry)])
}

pub(crate) fn definition(name: &str, index_type: IndexType) -> IndexDefinition {
    let shape = Column::new("shape", 1, ValueType::Geometry);
    IndexDefinition::new(name, "places", vec![IndexColumn::new(shape)], index_type)
}
