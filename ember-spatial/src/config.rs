use std::path::{Path, PathBuf};
use std::sync::Arc;

use ember::common::DEFAULT_GEOMETRY_CACHE_SIZE;

use crate::rtree::constants::DEFAULT_CACHE_PAGES;

/// Settings of the spatial index engines.
///
/// Cheap to clone; clones share the same settings.
///
/// # Examples
///
/// ```rust
/// use ember_spatial::SpatialConfig;
///
/// let config = SpatialConfig::builder()
///     .base_path("/tmp/ember")
///     .cache_pages(256)
///     .persistent(true)
///     .build();
/// assert_eq!(config.cache_pages(), 256);
/// assert!(config.persistent());
/// ```
#[derive(Clone, Debug)]
pub struct SpatialConfig {
    inner: Arc<SpatialConfigInner>,
}

#[derive(Debug)]
struct SpatialConfigInner {
    base_path: Option<PathBuf>,
    cache_pages: usize,
    geometry_cache_capacity: usize,
    persistent: bool,
}

impl SpatialConfig {
    pub fn builder() -> SpatialConfigBuilder {
        SpatialConfigBuilder::default()
    }

    /// Directory of persistent index page files. Without one, persistent
    /// indexes keep their pages in memory.
    pub fn base_path(&self) -> Option<&Path> {
        self.inner.base_path.as_deref()
    }

    /// Page cache size of each persistent index, in pages.
    pub fn cache_pages(&self) -> usize {
        self.inner.cache_pages
    }

    pub fn geometry_cache_capacity(&self) -> usize {
        self.inner.geometry_cache_capacity
    }

    /// Whether [`SpatialIndexer`](crate::SpatialIndexer) creates persistent
    /// rather than in-memory indexes.
    pub fn persistent(&self) -> bool {
        self.inner.persistent
    }

    /// Page file of the index called `index_name`, if pages go to disk.
    pub fn index_file(&self, index_name: &str) -> Option<PathBuf> {
        self.base_path()
            .map(|base| base.join(format!("{}.rtree", index_name)))
    }
}

impl Default for SpatialConfig {
    fn default() -> Self {
        SpatialConfig::builder().build()
    }
}

/// Builder for [`SpatialConfig`].
#[derive(Debug)]
pub struct SpatialConfigBuilder {
    base_path: Option<PathBuf>,
    cache_pages: usize,
    geometry_cache_capacity: usize,
    persistent: bool,
}

impl Default for SpatialConfigBuilder {
    fn default() -> Self {
        Self {
            base_path: None,
            cache_pages: DEFAULT_CACHE_PAGES,
            geometry_cache_capacity: DEFAULT_GEOMETRY_CACHE_SIZE,
            persistent: false,
        }
    }
}

impl SpatialConfigBuilder {
    pub fn base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    pub fn cache_pages(mut self, pages: usize) -> Self {
        self.cache_pages = pages;
        self
    }

    pub fn geometry_cache_capacity(mut self, capacity: usize) -> Self {
        self.geometry_cache_capacity = capacity;
        self
    }

    pub fn persistent(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }

    pub fn build(self) -> SpatialConfig {
        SpatialConfig {
            inner: Arc::new(SpatialConfigInner {
                base_path: self.base_path,
                cache_pages: self.cache_pages,
                geometry_cache_capacity: self.geometry_cache_capacity,
                persistent: self.persistent,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SpatialConfig::default();
        assert!(config.base_path().is_none());
        assert_eq!(config.cache_pages(), DEFAULT_CACHE_PAGES);
        assert_eq!(config.geometry_cache_capacity(), DEFAULT_GEOMETRY_CACHE_SIZE);
        assert!(!config.persistent());
        assert!(config.index_file("idx").is_none());
    }

    #[test]
    fn test_builder() {
        let config = SpatialConfig::builder()
            .base_path("/data")
            .cache_pages(8)
            .geometry_cache_capacity(16)
            .persistent(true)
            .build();
        assert_eq!(config.base_path(), Some(Path::new("/data")));
        assert_eq!(config.geometry_cache_capacity(), 16);
        assert_eq!(config.index_file("idx"), Some(PathBuf::from("/data/idx.rtree")));

        let copy = config.clone();
        assert_eq!(copy.cache_pages(), 8);
    }
}
