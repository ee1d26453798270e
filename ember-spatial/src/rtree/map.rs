//! A paged R-tree used as a persistent ordered set of [`SpatialKey`]s.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};

use super::cache::PageCache;
use super::constants::{MAX_INTERNAL_CHILDREN, MAX_LEAF_ENTRIES, PAGE_SIZE};
use super::storage::Storage;
use super::types::{ChildRef, FileHeader, Node, PageId, RTreeError, RTreeResult, RTreeStats};
use crate::spatial_key::{KeyRect, SpatialKey};

/// Iterator over keys returned by [`PersistentRTreeMap::key_iterator`].
pub type KeyIter = std::vec::IntoIter<SpatialKey>;

/// Persistent R-tree keyed by [`SpatialKey`], with no payload.
///
/// Nodes live in fixed-size pages of a page file and are loaded lazily
/// through an LRU page cache. Modified pages are written back when they are
/// evicted, on [`flush`](Self::flush), on [`close`](Self::close) and,
/// best effort, on drop.
///
/// The map is a set: inserting a key that is already present is a no-op.
/// Keys are iterated in tree order (depth first), which is stable between
/// mutations but carries no spatial meaning.
///
/// # Examples
///
/// ```rust
/// use ember_spatial::rtree::PersistentRTreeMap;
/// use ember_spatial::{KeyRect, SpatialKey};
///
/// let map = PersistentRTreeMap::create("places", None, 16).unwrap();
/// map.insert(SpatialKey::new(KeyRect::new(0.0, 1.0, 0.0, 1.0), 1)).unwrap();
/// map.insert(SpatialKey::new(KeyRect::new(5.0, 6.0, 5.0, 6.0), 2)).unwrap();
///
/// let hits = map.range_query(&KeyRect::new(0.5, 2.0, 0.5, 2.0)).unwrap();
/// assert_eq!(hits.len(), 1);
/// assert_eq!(hits[0].row_id(), 1);
/// ```
pub struct PersistentRTreeMap {
    name: String,
    storage: Storage,
    cache: Mutex<PageCache>,
    header: RwLock<FileHeader>,
    counters: Counters,
    closed: RwLock<bool>,
    free_pages: Mutex<Vec<PageId>>,
}

#[derive(Default)]
struct Counters {
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    disk_reads: AtomicU64,
    disk_writes: AtomicU64,
}

impl PersistentRTreeMap {
    /// Creates an empty map.
    ///
    /// With a `path` the pages go to that file, replacing any previous
    /// content; without one they are kept in an anonymous in-memory buffer.
    pub fn create(name: &str, path: Option<&Path>, cache_pages: usize) -> RTreeResult<Self> {
        let storage = match path {
            Some(path) => Storage::create(path)?,
            None => Storage::in_memory(),
        };
        let header = FileHeader::new();
        storage.write_header(&header)?;
        storage.sync()?;
        log::debug!("Created R-tree map {} at {:?}", name, storage.path());
        Ok(Self::with_storage(name, storage, header, cache_pages))
    }

    /// Opens the map stored at `path`. Only the header is read.
    pub fn open(name: &str, path: &Path, cache_pages: usize) -> RTreeResult<Self> {
        let storage = Storage::open(path)?;
        let header = storage.read_header()?;
        header.validate()?;
        log::debug!(
            "Opened R-tree map {} at {:?} with {} entries",
            name,
            path,
            header.entry_count
        );
        Ok(Self::with_storage(name, storage, header, cache_pages))
    }

    /// Opens the map at `path` if a non-empty file exists there, otherwise
    /// creates it.
    pub fn open_or_create(name: &str, path: Option<&Path>, cache_pages: usize) -> RTreeResult<Self> {
        match path {
            Some(path) if path.metadata().map(|m| m.len() > 0).unwrap_or(false) => {
                Self::open(name, path, cache_pages)
            }
            _ => Self::create(name, path, cache_pages),
        }
    }

    fn with_storage(name: &str, storage: Storage, header: FileHeader, cache_pages: usize) -> Self {
        Self {
            name: name.to_string(),
            storage,
            cache: Mutex::new(PageCache::new(cache_pages)),
            header: RwLock::new(header),
            counters: Counters::default(),
            closed: RwLock::new(false),
            free_pages: Mutex::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> Option<&Path> {
        self.storage.path()
    }

    pub fn len(&self) -> u64 {
        self.header.read().entry_count
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.read()
    }

    /// Bytes occupied by allocated pages, header page included.
    pub fn disk_space_used(&self) -> u64 {
        self.header.read().next_page_id * PAGE_SIZE as u64
    }

    pub fn stats(&self) -> RTreeStats {
        let header = self.header.read();
        RTreeStats {
            total_entries: header.entry_count,
            allocated_pages: header.next_page_id,
            cached_pages: self.cache.lock().len() as u64,
            cache_hits: self.counters.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.counters.cache_misses.load(Ordering::Relaxed),
            disk_reads: self.counters.disk_reads.load(Ordering::Relaxed),
            disk_writes: self.counters.disk_writes.load(Ordering::Relaxed),
            tree_height: header.height,
        }
    }

    /// Adds `key`. Returns `false` if it was already present.
    pub fn insert(&self, key: SpatialKey) -> RTreeResult<bool> {
        self.check_closed()?;
        if self.contains(&key)? {
            return Ok(false);
        }

        let root_page = self.header.read().root_page;
        if root_page == 0 {
            let page_id = self.allocate_page();
            self.write_node(page_id, Node::Leaf { keys: vec![key] })?;

            let mut header = self.header.write();
            header.root_page = page_id;
            header.entry_count = 1;
            header.height = 1;
            return Ok(true);
        }

        let mut path = Vec::new();
        let leaf_id = self.choose_leaf(root_page, key.rect(), &mut path)?;
        match self.insert_into_leaf(leaf_id, key)? {
            Some((new_page, new_rect)) => self.propagate_split(&path, new_page, new_rect)?,
            None => self.update_path_rects(&path)?,
        }

        self.header.write().entry_count += 1;
        Ok(true)
    }

    /// Removes `key`. Returns `false` if it was not present.
    pub fn delete(&self, key: &SpatialKey) -> RTreeResult<bool> {
        self.check_closed()?;
        let root_page = self.header.read().root_page;
        if root_page == 0 {
            return Ok(false);
        }

        if !self.remove_recursive(root_page, key)? {
            return Ok(false);
        }
        {
            let mut header = self.header.write();
            header.entry_count = header.entry_count.saturating_sub(1);
        }
        self.collapse_root()?;
        Ok(true)
    }

    pub fn contains(&self, key: &SpatialKey) -> RTreeResult<bool> {
        self.check_closed()?;
        let root_page = self.header.read().root_page;
        if root_page == 0 {
            return Ok(false);
        }
        self.contains_recursive(root_page, key)
    }

    /// Keys in tree order.
    ///
    /// With `from`, iteration starts at that key; keys ordered before it in
    /// the tree are skipped, and nothing is returned if it is absent.
    pub fn key_iterator(&self, from: Option<&SpatialKey>) -> RTreeResult<KeyIter> {
        let mut keys = self.all_keys()?;
        if let Some(from) = from {
            let start = keys.iter().position(|k| k == from).unwrap_or(keys.len());
            keys.drain(..start);
        }
        Ok(keys.into_iter())
    }

    /// Keys whose rectangle overlaps `query`; touching counts as overlap.
    pub fn range_query(&self, query: &KeyRect) -> RTreeResult<Vec<SpatialKey>> {
        self.check_closed()?;
        let root_page = self.header.read().root_page;
        let mut results = Vec::new();
        if root_page != 0 && !query.is_empty() {
            self.search_recursive(root_page, query, &mut results)?;
        }
        Ok(results)
    }

    pub fn all_keys(&self) -> RTreeResult<Vec<SpatialKey>> {
        self.check_closed()?;
        let root_page = self.header.read().root_page;
        let mut results = Vec::new();
        if root_page != 0 {
            self.collect_recursive(root_page, &mut results)?;
        }
        Ok(results)
    }

    /// Writes dirty pages and the header, then syncs the file.
    pub fn flush(&self) -> RTreeResult<()> {
        let dirty_pages = self.cache.lock().dirty_pages();
        for page_id in dirty_pages {
            let mut cache = self.cache.lock();
            if let Some(node) = cache.take_dirty(page_id) {
                self.storage.write_page(page_id, &node)?;
                self.counters.disk_writes.fetch_add(1, Ordering::Relaxed);
            }
        }

        self.storage.write_header(&self.header.read())?;
        self.storage.sync()?;
        Ok(())
    }

    pub fn close(&self) -> RTreeResult<()> {
        let mut closed = self.closed.write();
        if *closed {
            return Ok(());
        }
        self.flush()?;
        *closed = true;
        log::debug!("Closed R-tree map {}", self.name);
        Ok(())
    }

    /// Removes every key and shrinks the page file to its header.
    pub fn clear(&self) -> RTreeResult<()> {
        self.check_closed()?;
        self.cache.lock().clear();
        self.free_pages.lock().clear();

        let mut header = self.header.write();
        *header = FileHeader::new();
        self.storage.truncate(0)?;
        self.storage.write_header(&header)?;
        self.storage.sync()?;
        log::debug!("Cleared R-tree map {}", self.name);
        Ok(())
    }

    /// Discards all content, empties the page file and closes the map.
    pub fn drop_map(&self) -> RTreeResult<()> {
        let mut closed = self.closed.write();
        self.cache.lock().clear();
        self.free_pages.lock().clear();
        *self.header.write() = FileHeader::new();
        self.storage.truncate(0)?;
        *closed = true;
        log::debug!("Dropped R-tree map {}", self.name);
        Ok(())
    }

    fn check_closed(&self) -> RTreeResult<()> {
        if *self.closed.read() {
            Err(RTreeError::Closed)
        } else {
            Ok(())
        }
    }

    fn allocate_page(&self) -> PageId {
        if let Some(page_id) = self.free_pages.lock().pop() {
            return page_id;
        }
        let mut header = self.header.write();
        let page_id = header.next_page_id;
        header.next_page_id += 1;
        page_id
    }

    /// Freed pages are reused by later allocations of this session.
    fn free_page(&self, page_id: PageId) {
        self.cache.lock().remove(page_id);
        self.free_pages.lock().push(page_id);
    }

    fn read_node(&self, page_id: PageId) -> RTreeResult<Node> {
        if let Some(node) = self.cache.lock().get(page_id) {
            self.counters.cache_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(node.clone());
        }

        self.counters.cache_misses.fetch_add(1, Ordering::Relaxed);
        self.counters.disk_reads.fetch_add(1, Ordering::Relaxed);
        let node = self.storage.read_page(page_id)?;
        self.cache_node(page_id, node.clone(), false)?;
        Ok(node)
    }

    fn write_node(&self, page_id: PageId, node: Node) -> RTreeResult<()> {
        self.cache_node(page_id, node, true)
    }

    fn cache_node(&self, page_id: PageId, node: Node, dirty: bool) -> RTreeResult<()> {
        let mut cache = self.cache.lock();
        if let Some((evicted_id, evicted)) = cache.insert(page_id, node, dirty) {
            self.storage.write_page(evicted_id, &evicted)?;
            self.counters.disk_writes.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }

    /// Descends to the leaf whose rectangle needs the least enlargement,
    /// recording `(page, child index)` for every internal node passed.
    fn choose_leaf(
        &self,
        page_id: PageId,
        rect: &KeyRect,
        path: &mut Vec<(PageId, usize)>,
    ) -> RTreeResult<PageId> {
        match self.read_node(page_id)? {
            Node::Leaf { .. } => Ok(page_id),
            Node::Internal { children, .. } => {
                let mut best_idx = 0;
                let mut best_enlargement = f64::INFINITY;
                let mut best_area = f64::INFINITY;

                for (i, child) in children.iter().enumerate() {
                    let enlargement = child.rect.enlargement(rect);
                    let area = child.rect.area();
                    if enlargement < best_enlargement
                        || (enlargement == best_enlargement && area < best_area)
                    {
                        best_enlargement = enlargement;
                        best_area = area;
                        best_idx = i;
                    }
                }

                let child_page = children
                    .get(best_idx)
                    .map(|c| c.page_id)
                    .ok_or_else(|| RTreeError::Corrupted(format!("Internal page {} has no children", page_id)))?;
                path.push((page_id, best_idx));
                self.choose_leaf(child_page, rect, path)
            }
        }
    }

    /// Returns the new sibling page and its rectangle if the leaf split.
    fn insert_into_leaf(
        &self,
        page_id: PageId,
        key: SpatialKey,
    ) -> RTreeResult<Option<(PageId, KeyRect)>> {
        let Node::Leaf { mut keys } = self.read_node(page_id)? else {
            return Err(RTreeError::Corrupted(format!("Page {} is not a leaf", page_id)));
        };
        keys.push(key);

        if keys.len() <= MAX_LEAF_ENTRIES {
            self.write_node(page_id, Node::Leaf { keys })?;
            return Ok(None);
        }

        keys.sort_by(|a, b| a.rect().center_x().total_cmp(&b.rect().center_x()));
        let moved = keys.split_off(keys.len() / 2);
        let new_page = self.allocate_page();
        let new_node = Node::Leaf { keys: moved };
        let new_rect = new_node.compute_rect();

        self.write_node(page_id, Node::Leaf { keys })?;
        self.write_node(new_page, new_node)?;
        Ok(Some((new_page, new_rect)))
    }

    fn propagate_split(
        &self,
        path: &[(PageId, usize)],
        mut new_page: PageId,
        mut new_rect: KeyRect,
    ) -> RTreeResult<()> {
        for depth in (0..path.len()).rev() {
            let (parent_id, child_idx) = path[depth];
            let Node::Internal { mut children, level } = self.read_node(parent_id)? else {
                return Err(RTreeError::Corrupted(format!("Page {} is not internal", parent_id)));
            };

            if let Some(child) = children.get_mut(child_idx) {
                child.rect = self.read_node(child.page_id)?.compute_rect();
            }
            children.push(ChildRef {
                rect: new_rect,
                page_id: new_page,
            });

            if children.len() <= MAX_INTERNAL_CHILDREN {
                self.write_node(parent_id, Node::Internal { children, level })?;
                return self.update_path_rects(&path[..depth]);
            }

            children.sort_by(|a, b| a.rect.center_x().total_cmp(&b.rect.center_x()));
            let moved = children.split_off(children.len() / 2);
            new_page = self.allocate_page();
            let new_node = Node::Internal {
                children: moved,
                level,
            };
            new_rect = new_node.compute_rect();

            self.write_node(parent_id, Node::Internal { children, level })?;
            self.write_node(new_page, new_node)?;
        }

        // the root itself split: grow the tree by one level
        let (old_root, height) = {
            let header = self.header.read();
            (header.root_page, header.height)
        };
        let old_root_rect = self.read_node(old_root)?.compute_rect();
        let new_root = self.allocate_page();
        self.write_node(
            new_root,
            Node::Internal {
                children: vec![
                    ChildRef {
                        rect: old_root_rect,
                        page_id: old_root,
                    },
                    ChildRef {
                        rect: new_rect,
                        page_id: new_page,
                    },
                ],
                level: height,
            },
        )?;

        let mut header = self.header.write();
        header.root_page = new_root;
        header.height += 1;
        Ok(())
    }

    fn update_path_rects(&self, path: &[(PageId, usize)]) -> RTreeResult<()> {
        for &(parent_id, child_idx) in path.iter().rev() {
            let mut parent = self.read_node(parent_id)?;
            if let Node::Internal { children, .. } = &mut parent {
                if let Some(child) = children.get_mut(child_idx) {
                    child.rect = self.read_node(child.page_id)?.compute_rect();
                }
            }
            self.write_node(parent_id, parent)?;
        }
        Ok(())
    }

    fn search_recursive(
        &self,
        page_id: PageId,
        query: &KeyRect,
        results: &mut Vec<SpatialKey>,
    ) -> RTreeResult<()> {
        match self.read_node(page_id)? {
            Node::Leaf { keys } => {
                results.extend(keys.into_iter().filter(|k| k.rect().intersects(query)));
            }
            Node::Internal { children, .. } => {
                for child in children.iter().filter(|c| c.rect.intersects(query)) {
                    self.search_recursive(child.page_id, query, results)?;
                }
            }
        }
        Ok(())
    }

    fn collect_recursive(&self, page_id: PageId, results: &mut Vec<SpatialKey>) -> RTreeResult<()> {
        match self.read_node(page_id)? {
            Node::Leaf { keys } => results.extend(keys),
            Node::Internal { children, .. } => {
                for child in children {
                    self.collect_recursive(child.page_id, results)?;
                }
            }
        }
        Ok(())
    }

    fn contains_recursive(&self, page_id: PageId, key: &SpatialKey) -> RTreeResult<bool> {
        match self.read_node(page_id)? {
            Node::Leaf { keys } => Ok(keys.contains(key)),
            Node::Internal { children, .. } => {
                for child in children.iter().filter(|c| c.rect.contains(key.rect())) {
                    if self.contains_recursive(child.page_id, key)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }

    /// Removes `key` below `page_id`, dropping children that become empty.
    fn remove_recursive(&self, page_id: PageId, key: &SpatialKey) -> RTreeResult<bool> {
        let mut node = self.read_node(page_id)?;
        match &mut node {
            Node::Leaf { keys } => {
                let Some(position) = keys.iter().position(|k| k == key) else {
                    return Ok(false);
                };
                keys.remove(position);
                self.write_node(page_id, node)?;
                Ok(true)
            }
            Node::Internal { children, .. } => {
                for i in 0..children.len() {
                    if !children[i].rect.contains(key.rect())
                        || !self.remove_recursive(children[i].page_id, key)?
                    {
                        continue;
                    }

                    let child = self.read_node(children[i].page_id)?;
                    if child.is_empty() {
                        self.free_page(children[i].page_id);
                        children.remove(i);
                    } else {
                        children[i].rect = child.compute_rect();
                    }
                    self.write_node(page_id, node)?;
                    return Ok(true);
                }
                Ok(false)
            }
        }
    }

    /// Shortens the tree while the root is an internal node with a single
    /// child, and releases an empty root.
    fn collapse_root(&self) -> RTreeResult<()> {
        loop {
            let root_page = self.header.read().root_page;
            if root_page == 0 {
                return Ok(());
            }
            let root = self.read_node(root_page)?;
            let mut header = self.header.write();
            match root {
                Node::Internal { children, .. } if children.len() == 1 => {
                    header.root_page = children[0].page_id;
                    header.height = header.height.saturating_sub(1);
                }
                node if node.is_empty() => {
                    header.root_page = 0;
                    header.height = 0;
                }
                _ => return Ok(()),
            }
            drop(header);
            self.free_page(root_page);
        }
    }
}

impl Drop for PersistentRTreeMap {
    fn drop(&mut self) {
        if !*self.closed.read() {
            if let Err(e) = self.flush() {
                log::warn!("Failed to flush R-tree map {} on drop: {}", self.name, e);
            }
        }
    }
}
