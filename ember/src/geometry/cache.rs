use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;

use crate::common::DEFAULT_GEOMETRY_CACHE_SIZE;
use crate::errors::EmberResult;
use crate::geometry::GeometryValue;

/// Interns geometry values by their canonical encoding.
///
/// Repeated construction of the same geometry returns a handle to one
/// shared allocation. Least recently used entries are evicted once the
/// capacity is reached. Cloning the cache gives another handle to the same
/// entries.
#[derive(Clone)]
pub struct GeometryCache {
    inner: Arc<Mutex<LruCache<Vec<u8>, GeometryValue>>>,
}

impl GeometryCache {
    /// Creates a cache holding at most `capacity` values (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        log::debug!("Creating geometry cache with capacity {}", capacity);
        GeometryCache {
            inner: Arc::new(Mutex::new(LruCache::new(capacity))),
        }
    }

    /// Returns the cached value equal to `value`, or caches and returns `value`.
    pub fn intern(&self, value: GeometryValue) -> GeometryValue {
        let mut cache = self.inner.lock();
        if let Some(existing) = cache.get(value.to_wkb()) {
            return existing.clone();
        }
        cache.put(value.to_wkb().to_vec(), value.clone());
        value
    }

    pub fn from_wkt(&self, text: &str) -> EmberResult<GeometryValue> {
        Ok(self.intern(GeometryValue::from_wkt(text)?))
    }

    pub fn from_wkb(&self, bytes: &[u8]) -> EmberResult<GeometryValue> {
        if let Some(existing) = self.inner.lock().get(bytes) {
            return Ok(existing.clone());
        }
        Ok(self.intern(GeometryValue::from_wkb(bytes)?))
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().cap().get()
    }

    pub fn clear(&self) {
        let mut cache = self.inner.lock();
        log::debug!("Clearing {} cached geometry values", cache.len());
        cache.clear();
    }
}

impl Default for GeometryCache {
    fn default() -> Self {
        GeometryCache::new(DEFAULT_GEOMETRY_CACHE_SIZE)
    }
}
