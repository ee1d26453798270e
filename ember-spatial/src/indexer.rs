//! Registry of the spatial indexes of a database.
//!
//! The [`SpatialIndexer`] creates indexes with the engine selected by its
//! [`SpatialConfig`] and keeps them by name until they are dropped or the
//! indexer is closed. It also owns the [`GeometryCache`] that values read for
//! spatial indexing are interned through.

use std::collections::HashMap;
use std::sync::Arc;

use ember::common::DatabaseState;
use ember::errors::{EmberError, EmberResult, ErrorKind};
use ember::geometry::GeometryCache;
use ember::index::IndexDefinition;
use ember::table::RowStore;
use parking_lot::RwLock;

use crate::config::SpatialConfig;
use crate::memory_index::MemorySpatialIndex;
use crate::spatial_index::SpatialIndex;
use crate::tree_index::PersistentSpatialIndex;

/// Creates and tracks spatial indexes.
///
/// # Examples
///
/// ```rust,ignore
/// let indexer = SpatialIndexer::new(SpatialConfig::default());
/// let index = indexer.create_index(definition, table, DatabaseState::Open)?;
/// index.add(&row)?;
/// assert!(indexer.get("places_shape").is_some());
/// indexer.close()?;
/// ```
#[derive(Clone)]
pub struct SpatialIndexer {
    inner: Arc<SpatialIndexerInner>,
}

struct SpatialIndexerInner {
    config: SpatialConfig,
    geometry_cache: GeometryCache,
    index_registry: RwLock<HashMap<String, Arc<dyn SpatialIndex>>>,
}

impl SpatialIndexer {
    pub fn new(config: SpatialConfig) -> Self {
        let geometry_cache = GeometryCache::new(config.geometry_cache_capacity());
        Self {
            inner: Arc::new(SpatialIndexerInner {
                config,
                geometry_cache,
                index_registry: RwLock::new(HashMap::new()),
            }),
        }
    }

    pub fn config(&self) -> &SpatialConfig {
        &self.inner.config
    }

    pub fn geometry_cache(&self) -> &GeometryCache {
        &self.inner.geometry_cache
    }

    /// Creates an index for `definition` and registers it under the index
    /// name. Persistent indexes are created when the configuration asks for
    /// them, in-memory ones otherwise.
    ///
    /// # Errors
    /// Fails if an index with the same name is registered, or if the engine
    /// rejects the definition.
    pub fn create_index(
        &self,
        definition: IndexDefinition,
        store: Arc<dyn RowStore>,
        state: DatabaseState,
    ) -> EmberResult<Arc<dyn SpatialIndex>> {
        let name = definition.name().to_string();
        let mut registry = self.inner.index_registry.write();
        if registry.contains_key(&name) {
            return Err(EmberError::new(
                &format!("Spatial index {} already exists", name),
                ErrorKind::Extension("Spatial".to_string()),
            ));
        }

        let index: Arc<dyn SpatialIndex> = if self.inner.config.persistent() {
            Arc::new(PersistentSpatialIndex::new(
                definition,
                store,
                state,
                &self.inner.config,
            )?)
        } else {
            Arc::new(MemorySpatialIndex::new(definition, store, state)?)
        };

        log::debug!("Registered spatial index {}", name);
        registry.insert(name, index.clone());
        Ok(index)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn SpatialIndex>> {
        self.inner.index_registry.read().get(name).cloned()
    }

    pub fn index_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.index_registry.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Drops the index called `name` and forgets it. Returns `false` if no
    /// such index is registered.
    pub fn drop_index(&self, name: &str) -> EmberResult<bool> {
        let removed = self.inner.index_registry.write().remove(name);
        match removed {
            Some(index) => {
                index.drop_index()?;
                log::debug!("Dropped spatial index {}", name);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Closes every registered index and clears the registry. All indexes
    /// are closed even if some fail; the first failure is returned.
    pub fn close(&self) -> EmberResult<()> {
        let indexes: Vec<(String, Arc<dyn SpatialIndex>)> =
            self.inner.index_registry.write().drain().collect();

        let mut first_error = None;
        for (name, index) in indexes {
            if let Err(e) = index.close() {
                log::error!("Failed to close spatial index {}: {}", name, e);
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
        self.inner.geometry_cache.clear();

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Default for SpatialIndexer {
    fn default() -> Self {
        Self::new(SpatialConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{definition, TestTable};
    use ember::index::IndexType;
    use tempfile::tempdir;

    #[test]
    fn test_create_and_get() {
        let indexer = SpatialIndexer::default();
        let table = Arc::new(TestTable::new());
        let index = indexer
            .create_index(definition("a", IndexType::spatial()), table.clone(), DatabaseState::Open)
            .unwrap();
        index.add(&table.insert(1, "POINT (1 2)")).unwrap();

        let found = indexer.get("a").unwrap();
        assert_eq!(found.row_count(), 1);
        assert_eq!(found.disk_space_used(), 0);
        assert!(indexer.get("b").is_none());
        assert_eq!(indexer.index_names(), vec!["a".to_string()]);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let indexer = SpatialIndexer::default();
        let table = Arc::new(TestTable::new());
        indexer
            .create_index(definition("a", IndexType::spatial()), table.clone(), DatabaseState::Open)
            .unwrap();
        let result =
            indexer.create_index(definition("a", IndexType::spatial()), table, DatabaseState::Open);
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_definition_not_registered() {
        let indexer = SpatialIndexer::default();
        let table = Arc::new(TestTable::new());
        let err = indexer
            .create_index(definition("u", IndexType::unique()), table, DatabaseState::Open)
            .err()
            .unwrap();
        assert_eq!(err.kind(), &ErrorKind::UnsupportedIndexConfiguration);
        assert!(indexer.get("u").is_none());
    }

    #[test]
    fn test_persistent_engine_from_config() {
        let dir = tempdir().unwrap();
        let config = SpatialConfig::builder()
            .base_path(dir.path())
            .persistent(true)
            .build();
        let indexer = SpatialIndexer::new(config);
        let table = Arc::new(TestTable::new());
        let index = indexer
            .create_index(definition("p", IndexType::spatial()), table.clone(), DatabaseState::Open)
            .unwrap();
        index.add(&table.insert(1, "POINT (1 2)")).unwrap();
        assert!(index.disk_space_used() > 0);

        assert!(indexer.drop_index("p").unwrap());
        assert!(!indexer.drop_index("p").unwrap());
        assert!(index.is_closed());
        assert!(!dir.path().join("p.rtree").exists());
    }

    #[test]
    fn test_close_all() {
        let indexer = SpatialIndexer::default();
        let table = Arc::new(TestTable::new());
        let a = indexer
            .create_index(definition("a", IndexType::spatial()), table.clone(), DatabaseState::Open)
            .unwrap();
        let b = indexer
            .create_index(definition("b", IndexType::spatial()), table, DatabaseState::Open)
            .unwrap();
        indexer.geometry_cache().from_wkt("POINT (0 0)").unwrap();

        indexer.close().unwrap();
        assert!(a.is_closed());
        assert!(b.is_closed());
        assert!(indexer.index_names().is_empty());
        assert!(indexer.geometry_cache().is_empty());
    }
}
