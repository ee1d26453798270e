//! LRU cache of decoded R-tree pages.
//!
//! Pages are only loaded when first accessed. Modified pages stay dirty in
//! the cache until they are evicted or flushed; eviction hands a dirty page
//! back to the caller so it can be written out.

use std::num::NonZeroUsize;

use lru::LruCache;

use super::types::{Node, PageId};

struct CachedPage {
    node: Node,
    dirty: bool,
}

pub struct PageCache {
    pages: LruCache<PageId, CachedPage>,
}

impl PageCache {
    /// Creates a cache holding at most `max_pages` pages (at least one).
    pub fn new(max_pages: usize) -> Self {
        let capacity = NonZeroUsize::new(max_pages).unwrap_or(NonZeroUsize::MIN);
        Self {
            pages: LruCache::new(capacity),
        }
    }

    /// Returns the cached page and marks it most recently used.
    pub fn get(&mut self, page_id: PageId) -> Option<&Node> {
        self.pages.get(&page_id).map(|cached| &cached.node)
    }

    /// Caches a page.
    ///
    /// Returns the least recently used page if it had to make room and that
    /// page was dirty.
    pub fn insert(&mut self, page_id: PageId, node: Node, dirty: bool) -> Option<(PageId, Node)> {
        // a dirty page replaced by a clean copy of itself keeps its flag
        let dirty = dirty || self.pages.peek(&page_id).is_some_and(|c| c.dirty);
        match self.pages.push(page_id, CachedPage { node, dirty }) {
            Some((evicted_id, evicted)) if evicted_id != page_id && evicted.dirty => {
                Some((evicted_id, evicted.node))
            }
            _ => None,
        }
    }

    pub fn dirty_pages(&self) -> Vec<PageId> {
        self.pages
            .iter()
            .filter(|(_, cached)| cached.dirty)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Returns a dirty page's node and marks it clean.
    pub fn take_dirty(&mut self, page_id: PageId) -> Option<Node> {
        let cached = self.pages.peek_mut(&page_id)?;
        if !cached.dirty {
            return None;
        }
        cached.dirty = false;
        Some(cached.node.clone())
    }

    /// Forgets a page without writing it.
    pub fn remove(&mut self, page_id: PageId) {
        self.pages.pop(&page_id);
    }

    /// Forgets every page without writing.
    pub fn clear(&mut self) {
        self.pages.clear();
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}
