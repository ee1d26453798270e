use std::sync::Arc;

use ember::common::{DatabaseState, Row, RowId};
use ember::errors::EmberResult;
use ember::geometry::{Envelope, GeometryValue};
use ember::index::{ConditionMask, IndexDefinition};
use ember::table::{Column, RowStore};
use parking_lot::{RwLock, RwLockReadGuard, RwLockUpgradableReadGuard, RwLockWriteGuard};
use rstar::{
    Envelope as _, ParentNode, RStarInsertionStrategy, RTree, RTreeNode, RTreeObject, RTreeParams,
    AABB,
};

use crate::cost::estimate_cost;
use crate::cursor::{SpatialCursor, TreeItem};
use crate::spatial_index::{
    closed_error, duplicate_row, indexed_envelope, row_not_found, SpatialIndex,
};
use crate::validation::validate_definition;

/// Node capacity of the packed tree.
pub const NODE_CAPACITY: usize = 12;

struct PackedParams;

impl RTreeParams for PackedParams {
    const MIN_SIZE: usize = 5;
    const MAX_SIZE: usize = NODE_CAPACITY;
    const REINSERTION_COUNT: usize = 2;
    type DefaultInsertionStrategy = RStarInsertionStrategy;
}

#[derive(Clone, Debug, PartialEq)]
struct IndexedEnvelope {
    bounds: Envelope,
    row_id: RowId,
}

impl RTreeObject for IndexedEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        to_aabb(&self.bounds)
    }
}

fn to_aabb(envelope: &Envelope) -> AABB<[f64; 2]> {
    AABB::from_corners(
        [envelope.min_x, envelope.min_y],
        [envelope.max_x, envelope.max_y],
    )
}

struct MemoryTree {
    tree: RTree<IndexedEnvelope, PackedParams>,
    // rows whose geometry is empty have no envelope to place in the tree
    empty_rows: Vec<RowId>,
    dirty: bool,
    closed: bool,
}

impl MemoryTree {
    fn new() -> Self {
        MemoryTree {
            tree: RTree::new_with_params(),
            empty_rows: Vec::new(),
            dirty: false,
            closed: false,
        }
    }

    fn len(&self) -> usize {
        self.tree.size() + self.empty_rows.len()
    }

    fn repack(&mut self) {
        let entries: Vec<IndexedEnvelope> = self.tree.iter().cloned().collect();
        log::debug!("Repacking in-memory spatial tree with {} entries", entries.len());
        self.tree = RTree::bulk_load_with_params(entries);
        self.dirty = false;
    }

    /// Structural walk of the tree. Subtrees whose bounds miss `filter` are
    /// skipped.
    fn walk(&self, filter: Option<&AABB<[f64; 2]>>) -> Vec<TreeItem> {
        let mut items = Vec::with_capacity(self.tree.size() + 1);
        walk_node(self.tree.root(), filter, &mut items);
        items
    }
}

fn walk_node(
    node: &ParentNode<IndexedEnvelope>,
    filter: Option<&AABB<[f64; 2]>>,
    items: &mut Vec<TreeItem>,
) {
    items.push(TreeItem::Internal);
    for child in node.children() {
        match child {
            RTreeNode::Leaf(entry) => {
                if filter.map_or(true, |f| entry.envelope().intersects(f)) {
                    items.push(TreeItem::Leaf(entry.row_id));
                }
            }
            RTreeNode::Parent(parent) => {
                if filter.map_or(true, |f| parent.envelope().intersects(f)) {
                    walk_node(parent, filter, items);
                }
            }
        }
    }
}

/// A spatial index held entirely in memory.
///
/// Entries are inserted dynamically into an R*-tree and the whole tree is
/// bulk loaded again (sort-tile-recursive packing) on the first query that
/// follows a mutation, so that queries always run against a packed tree.
/// Nothing survives [`close`](SpatialIndex::close); the index is rebuilt
/// from the table when the database opens.
///
/// # Examples
///
/// ```rust,ignore
/// let index = MemorySpatialIndex::new(definition, table.clone(), DatabaseState::Open)?;
/// index.add(&row)?;
///
/// let search = GeometryValue::from_wkt("POLYGON ((0 0, 2 0, 2 2, 0 2, 0 0))")?;
/// let mut cursor = index.find_by_geometry(Some(&search))?;
/// while cursor.next()? {
///     println!("{}", cursor.current_key().unwrap_or_default());
/// }
/// ```
#[derive(Clone)]
pub struct MemorySpatialIndex {
    inner: Arc<MemoryIndexInner>,
}

struct MemoryIndexInner {
    definition: IndexDefinition,
    column: Column,
    store: Arc<dyn RowStore>,
    state: RwLock<MemoryTree>,
}

impl MemorySpatialIndex {
    /// Creates an empty index after checking that `definition` describes a
    /// valid spatial index.
    ///
    /// # Errors
    /// `UnsupportedIndexConfiguration` if the definition is rejected.
    pub fn new(
        definition: IndexDefinition,
        store: Arc<dyn RowStore>,
        state: DatabaseState,
    ) -> EmberResult<Self> {
        let column = validate_definition(&definition, state)?;
        log::debug!(
            "Creating in-memory spatial index {} on {}.{}",
            definition.name(),
            definition.table_name(),
            column
        );
        Ok(MemorySpatialIndex {
            inner: Arc::new(MemoryIndexInner {
                definition,
                column,
                store,
                state: RwLock::new(MemoryTree::new()),
            }),
        })
    }

    pub fn column(&self) -> &Column {
        &self.inner.column
    }

    fn write_open(&self) -> EmberResult<RwLockWriteGuard<'_, MemoryTree>> {
        let state = self.inner.state.write();
        if state.closed {
            return Err(closed_error(self.name()));
        }
        Ok(state)
    }

    /// A read guard on a packed tree, repacking first if the tree changed
    /// since the last query.
    fn packed(&self) -> EmberResult<RwLockReadGuard<'_, MemoryTree>> {
        let state = self.inner.state.upgradable_read();
        if state.closed {
            return Err(closed_error(self.name()));
        }
        if !state.dirty {
            return Ok(RwLockUpgradableReadGuard::downgrade(state));
        }
        let mut state = RwLockUpgradableReadGuard::upgrade(state);
        state.repack();
        Ok(RwLockWriteGuard::downgrade(state))
    }

    fn cursor(&self, items: Vec<TreeItem>, first: bool) -> SpatialCursor {
        SpatialCursor::new(items, first, self.inner.store.clone())
    }

    fn scan(&self, first: bool) -> EmberResult<SpatialCursor> {
        let state = self.packed()?;
        let mut items = state.walk(None);
        items.extend(state.empty_rows.iter().copied().map(TreeItem::Leaf));
        Ok(self.cursor(items, first))
    }
}

impl SpatialIndex for MemorySpatialIndex {
    fn name(&self) -> &str {
        self.inner.definition.name()
    }

    fn definition(&self) -> &IndexDefinition {
        &self.inner.definition
    }

    fn add(&self, row: &Row) -> EmberResult<()> {
        let envelope = indexed_envelope(row, &self.inner.column)?;
        let mut state = self.write_open()?;
        log::trace!("Adding row {} with {} to {}", row.key(), envelope, self.name());
        if envelope.is_null() {
            if state.empty_rows.contains(&row.key()) {
                return Err(duplicate_row(self.name(), row));
            }
            state.empty_rows.push(row.key());
        } else {
            let entry = IndexedEnvelope {
                bounds: envelope,
                row_id: row.key(),
            };
            if state.tree.contains(&entry) {
                return Err(duplicate_row(self.name(), row));
            }
            state.tree.insert(entry);
            state.dirty = true;
        }
        Ok(())
    }

    fn remove(&self, row: &Row) -> EmberResult<()> {
        let envelope = indexed_envelope(row, &self.inner.column)?;
        let mut state = self.write_open()?;
        log::trace!("Removing row {} with {} from {}", row.key(), envelope, self.name());
        if envelope.is_null() {
            match state.empty_rows.iter().position(|id| *id == row.key()) {
                Some(position) => {
                    state.empty_rows.swap_remove(position);
                    Ok(())
                }
                None => Err(row_not_found(self.name(), row)),
            }
        } else {
            let entry = IndexedEnvelope {
                bounds: envelope,
                row_id: row.key(),
            };
            match state.tree.remove(&entry) {
                Some(_) => {
                    state.dirty = true;
                    Ok(())
                }
                None => Err(row_not_found(self.name(), row)),
            }
        }
    }

    fn find(&self, _first: Option<&Row>, _last: Option<&Row>) -> EmberResult<SpatialCursor> {
        self.scan(true)
    }

    fn find_by_geometry(&self, intersection: Option<&GeometryValue>) -> EmberResult<SpatialCursor> {
        let Some(geometry) = intersection else {
            return self.scan(true);
        };

        let search = geometry.envelope();
        let state = self.packed()?;
        let items = if search.is_null() {
            Vec::new()
        } else {
            state.walk(Some(&to_aabb(&search)))
        };
        log::trace!(
            "Spatial query {} on {} visited {} tree items",
            search,
            self.name(),
            items.len()
        );
        Ok(self.cursor(items, true))
    }

    fn find_first_or_last(&self, first: bool) -> EmberResult<SpatialCursor> {
        self.scan(first)
    }

    fn row_count(&self) -> u64 {
        self.inner.state.read().len() as u64
    }

    fn row_count_approximation(&self) -> u64 {
        self.row_count()
    }

    fn cost(&self, masks: &[ConditionMask]) -> f64 {
        estimate_cost(
            masks,
            self.inner.column.column_id(),
            self.inner.store.approximate_row_count(),
        ) as f64
    }

    fn truncate(&self) -> EmberResult<()> {
        let mut state = self.write_open()?;
        log::debug!("Truncating in-memory spatial index {}", self.name());
        *state = MemoryTree::new();
        Ok(())
    }

    fn close(&self) -> EmberResult<()> {
        let mut state = self.inner.state.write();
        if state.closed {
            return Ok(());
        }
        log::debug!("Closing in-memory spatial index {}", self.name());
        *state = MemoryTree::new();
        state.closed = true;
        Ok(())
    }

    fn drop_index(&self) -> EmberResult<()> {
        log::debug!("Dropping in-memory spatial index {}", self.name());
        self.close()
    }

    fn is_closed(&self) -> bool {
        self.inner.state.read().closed
    }

    fn disk_space_used(&self) -> u64 {
        0
    }
}
