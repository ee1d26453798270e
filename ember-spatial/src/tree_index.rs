use std::path::PathBuf;
use std::sync::Arc;

use ember::common::{DatabaseState, Row};
use ember::errors::EmberResult;
use ember::geometry::GeometryValue;
use ember::index::{ConditionMask, IndexDefinition};
use ember::table::{Column, RowStore};

use crate::config::SpatialConfig;
use crate::cost::estimate_cost;
use crate::cursor::{SpatialCursor, TreeItem};
use crate::rtree::{PersistentRTreeMap, RTreeError, RTreeStats};
use crate::spatial_index::{
    closed_error, duplicate_row, indexed_envelope, row_not_found, SpatialIndex,
};
use crate::spatial_key::{KeyRect, SpatialKey};
use crate::validation::validate_definition;

/// A spatial index stored in a paged R-tree file.
///
/// Each row is stored as a [`SpatialKey`]: the envelope of its geometry,
/// widened outward to single precision, together with the row id. The
/// widening makes the stored rectangle contain the exact envelope, so a
/// query may return a few extra rows but never misses one.
///
/// The index is a rebuildable structure: content left in the page file by
/// an earlier session is discarded when the index is opened, and the table
/// repopulates it.
///
/// # Examples
///
/// ```rust,ignore
/// let config = SpatialConfig::builder().base_path(dir).build();
/// let index = PersistentSpatialIndex::new(definition, table.clone(), DatabaseState::Open, &config)?;
/// index.add(&row)?;
/// let cursor = index.find_by_geometry(Some(&search))?;
/// ```
#[derive(Clone)]
pub struct PersistentSpatialIndex {
    inner: Arc<PersistentIndexInner>,
}

struct PersistentIndexInner {
    definition: IndexDefinition,
    column: Column,
    store: Arc<dyn RowStore>,
    map: PersistentRTreeMap,
}

impl PersistentSpatialIndex {
    /// Opens the index page file named after the index under the configured
    /// base path, or an in-memory page file when there is none.
    ///
    /// # Errors
    /// `UnsupportedIndexConfiguration` if the definition is rejected, or the
    /// I/O error of creating the page file.
    pub fn new(
        definition: IndexDefinition,
        store: Arc<dyn RowStore>,
        state: DatabaseState,
        config: &SpatialConfig,
    ) -> EmberResult<Self> {
        let column = validate_definition(&definition, state)?;
        let path = config.index_file(definition.name());
        let map = open_map(definition.name(), path, config.cache_pages())?;

        if !map.is_empty() {
            log::warn!(
                "Spatial index {} discarding stale entries ({}) left from a previous session",
                definition.name(),
                map.len()
            );
            map.clear()?;
        }

        log::debug!(
            "Opened persistent spatial index {} on {}.{} at {:?}",
            definition.name(),
            definition.table_name(),
            column,
            map.path()
        );
        Ok(PersistentSpatialIndex {
            inner: Arc::new(PersistentIndexInner {
                definition,
                column,
                store,
                map,
            }),
        })
    }

    pub fn column(&self) -> &Column {
        &self.inner.column
    }

    pub fn stats(&self) -> RTreeStats {
        self.inner.map.stats()
    }

    /// Writes cached pages to the page file.
    pub fn flush(&self) -> EmberResult<()> {
        self.check_open()?;
        Ok(self.inner.map.flush()?)
    }

    fn check_open(&self) -> EmberResult<()> {
        if self.inner.map.is_closed() {
            return Err(closed_error(self.name()));
        }
        Ok(())
    }

    fn scan(&self, first: bool) -> EmberResult<SpatialCursor> {
        self.check_open()?;
        let items = self
            .inner
            .map
            .key_iterator(None)?
            .map(|key| TreeItem::Leaf(key.row_id()))
            .collect();
        Ok(SpatialCursor::new(items, first, self.inner.store.clone()))
    }
}

fn open_map(name: &str, path: Option<PathBuf>, cache_pages: usize) -> EmberResult<PersistentRTreeMap> {
    match PersistentRTreeMap::open_or_create(name, path.as_deref(), cache_pages) {
        Ok(map) => Ok(map),
        Err(e @ (RTreeError::Corrupted(_) | RTreeError::Serialization(_))) => {
            log::warn!("Spatial index {} page file unreadable ({}), recreating it", name, e);
            Ok(PersistentRTreeMap::create(name, path.as_deref(), cache_pages)?)
        }
        Err(e) => Err(e.into()),
    }
}

impl SpatialIndex for PersistentSpatialIndex {
    fn name(&self) -> &str {
        self.inner.definition.name()
    }

    fn definition(&self) -> &IndexDefinition {
        &self.inner.definition
    }

    fn add(&self, row: &Row) -> EmberResult<()> {
        let envelope = indexed_envelope(row, &self.inner.column)?;
        self.check_open()?;
        let key = SpatialKey::for_envelope(&envelope, row.key());
        log::trace!("Adding {} to {}", key, self.name());
        if self.inner.map.insert(key)? {
            Ok(())
        } else {
            Err(duplicate_row(self.name(), row))
        }
    }

    fn remove(&self, row: &Row) -> EmberResult<()> {
        let envelope = indexed_envelope(row, &self.inner.column)?;
        self.check_open()?;
        let key = SpatialKey::for_envelope(&envelope, row.key());
        log::trace!("Removing {} from {}", key, self.name());
        if self.inner.map.delete(&key)? {
            Ok(())
        } else {
            Err(row_not_found(self.name(), row))
        }
    }

    fn find(&self, _first: Option<&Row>, _last: Option<&Row>) -> EmberResult<SpatialCursor> {
        self.scan(true)
    }

    fn find_by_geometry(&self, intersection: Option<&GeometryValue>) -> EmberResult<SpatialCursor> {
        let Some(geometry) = intersection else {
            return self.scan(true);
        };
        self.check_open()?;

        let search = KeyRect::widened(&geometry.envelope());
        let items: Vec<TreeItem> = self
            .inner
            .map
            .range_query(&search)?
            .into_iter()
            .map(|key| TreeItem::Leaf(key.row_id()))
            .collect();
        log::trace!("Spatial query {:?} on {} matched {} keys", search, self.name(), items.len());
        Ok(SpatialCursor::new(items, true, self.inner.store.clone()))
    }

    fn find_first_or_last(&self, first: bool) -> EmberResult<SpatialCursor> {
        self.scan(first)
    }

    fn row_count(&self) -> u64 {
        self.inner.map.len()
    }

    fn row_count_approximation(&self) -> u64 {
        self.inner.map.len()
    }

    fn cost(&self, masks: &[ConditionMask]) -> f64 {
        estimate_cost(
            masks,
            self.inner.column.column_id(),
            self.inner.store.approximate_row_count(),
        ) as f64
    }

    fn truncate(&self) -> EmberResult<()> {
        self.check_open()?;
        log::debug!("Truncating persistent spatial index {}", self.name());
        Ok(self.inner.map.clear()?)
    }

    fn close(&self) -> EmberResult<()> {
        if self.inner.map.is_closed() {
            return Ok(());
        }
        log::debug!("Closing persistent spatial index {}", self.name());
        Ok(self.inner.map.close()?)
    }

    fn drop_index(&self) -> EmberResult<()> {
        log::debug!("Dropping persistent spatial index {}", self.name());
        self.inner.map.drop_map()?;
        if let Some(path) = self.inner.map.path() {
            if path.exists() {
                std::fs::remove_file(path)?;
            }
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.inner.map.is_closed()
    }

    fn disk_space_used(&self) -> u64 {
        self.inner.map.disk_space_used()
    }
}
