use std::fmt::{self, Debug};
use std::sync::Arc;

use ember::common::{Row, RowId};
use ember::errors::EmberResult;
use ember::table::RowStore;

/// One element of a tree walk.
///
/// A structural walk over an R-tree yields leaf entries interleaved with
/// markers for the internal nodes it descends into; only leaf entries
/// reference rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeItem {
    Leaf(RowId),
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    BeforeFirst,
    At(usize),
    AfterLast,
}

/// Bidirectional cursor over the rows an index query produced.
///
/// The cursor holds the row ids of a finished query and resolves each one
/// through the [`RowStore`] as it moves. Internal tree markers are skipped.
/// It does no filtering of its own.
///
/// Once [`next`](Self::next) has returned `false` it keeps returning `false`
/// until the cursor is moved back with [`previous`](Self::previous) or
/// [`rewind`](Self::rewind).
///
/// # Examples
///
/// ```rust,ignore
/// let mut cursor = index.find_by_geometry(Some(&search))?;
/// while cursor.next()? {
///     let row = cursor.current().unwrap();
///     println!("{}", row.key());
/// }
/// ```
pub struct SpatialCursor {
    items: Vec<TreeItem>,
    store: Arc<dyn RowStore>,
    position: Position,
    current: Option<Row>,
}

impl SpatialCursor {
    /// Creates a cursor positioned before the first entry when `first` is
    /// true, after the last one otherwise.
    pub fn new(items: Vec<TreeItem>, first: bool, store: Arc<dyn RowStore>) -> Self {
        let mut cursor = SpatialCursor {
            items,
            store,
            position: Position::BeforeFirst,
            current: None,
        };
        cursor.rewind(first);
        cursor
    }

    /// A cursor over plain row ids.
    pub fn from_row_ids(row_ids: Vec<RowId>, first: bool, store: Arc<dyn RowStore>) -> Self {
        SpatialCursor::new(row_ids.into_iter().map(TreeItem::Leaf).collect(), first, store)
    }

    /// Advances to the next row. Returns `false` and clears the current row
    /// when there is none.
    pub fn next(&mut self) -> EmberResult<bool> {
        let start = match self.position {
            Position::BeforeFirst => 0,
            Position::At(index) => index + 1,
            Position::AfterLast => {
                self.current = None;
                return Ok(false);
            }
        };

        let found = (start..self.items.len()).find_map(|i| self.leaf_at(i));
        self.move_to(found, Position::AfterLast)
    }

    /// Moves back to the previous row. Returns `false` and clears the
    /// current row when there is none.
    pub fn previous(&mut self) -> EmberResult<bool> {
        let end = match self.position {
            Position::AfterLast => self.items.len(),
            Position::At(index) => index,
            Position::BeforeFirst => {
                self.current = None;
                return Ok(false);
            }
        };

        let found = (0..end).rev().find_map(|i| self.leaf_at(i));
        self.move_to(found, Position::BeforeFirst)
    }

    /// Re-seeks to before the first entry (`first`) or after the last one.
    pub fn rewind(&mut self, first: bool) {
        self.position = if first {
            Position::BeforeFirst
        } else {
            Position::AfterLast
        };
        self.current = None;
    }

    /// The row the cursor is on; `None` before the first move and after the
    /// cursor ran off either end.
    pub fn current(&self) -> Option<&Row> {
        self.current.as_ref()
    }

    pub fn current_key(&self) -> Option<RowId> {
        self.current.as_ref().map(Row::key)
    }

    /// Forward iterator over the remaining rows.
    pub fn rows(&mut self) -> Rows<'_> {
        Rows { cursor: self }
    }

    /// Number of row entries, independent of the position.
    pub fn row_count(&self) -> usize {
        self.items
            .iter()
            .filter(|item| matches!(item, TreeItem::Leaf(_)))
            .count()
    }

    fn leaf_at(&self, index: usize) -> Option<(usize, RowId)> {
        match self.items.get(index) {
            Some(TreeItem::Leaf(row_id)) => Some((index, *row_id)),
            _ => None,
        }
    }

    fn move_to(&mut self, found: Option<(usize, RowId)>, exhausted: Position) -> EmberResult<bool> {
        match found {
            Some((index, row_id)) => {
                // a row that fails to resolve is still stepped over
                self.position = Position::At(index);
                self.current = None;
                self.current = Some(self.store.get_row(row_id)?);
                Ok(true)
            }
            None => {
                self.position = exhausted;
                self.current = None;
                Ok(false)
            }
        }
    }
}

impl Debug for SpatialCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpatialCursor")
            .field("table", &self.store.table_name())
            .field("items", &self.items.len())
            .field("position", &self.position)
            .finish()
    }
}

/// Iterator returned by [`SpatialCursor::rows`].
pub struct Rows<'a> {
    cursor: &'a mut SpatialCursor,
}

impl Iterator for Rows<'_> {
    type Item = EmberResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.cursor.next() {
            Ok(true) => self.cursor.current().cloned().map(Ok),
            Ok(false) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember::common::Value;
    use ember::errors::{EmberError, ErrorKind};

    struct FixedStore;

    impl RowStore for FixedStore {
        fn table_name(&self) -> &str {
            "fixed"
        }

        fn get_row(&self, key: RowId) -> EmberResult<Row> {
            if key < 0 {
                return Err(EmberError::new("row not found", ErrorKind::RowNotFound));
            }
            Ok(Row::new(key, vec![Value::Long(key * 10)]))
        }

        fn approximate_row_count(&self) -> u64 {
            0
        }
    }

    fn cursor(items: Vec<TreeItem>, first: bool) -> SpatialCursor {
        SpatialCursor::new(items, first, Arc::new(FixedStore))
    }

    fn forward(cursor: &mut SpatialCursor) -> Vec<RowId> {
        let mut keys = Vec::new();
        while cursor.next().unwrap() {
            keys.push(cursor.current_key().unwrap());
        }
        keys
    }

    #[test]
    fn test_skips_internal_markers() {
        let items = vec![
            TreeItem::Internal,
            TreeItem::Leaf(1),
            TreeItem::Internal,
            TreeItem::Leaf(2),
            TreeItem::Leaf(3),
            TreeItem::Internal,
        ];
        let mut cursor = cursor(items, true);
        assert_eq!(cursor.row_count(), 3);
        assert_eq!(forward(&mut cursor), vec![1, 2, 3]);
    }

    #[test]
    fn test_exhaustion_is_sticky() {
        let mut cursor = cursor(vec![TreeItem::Leaf(1)], true);
        assert!(cursor.current().is_none());
        assert!(cursor.next().unwrap());
        assert_eq!(cursor.current().unwrap().value(0), &Value::Long(10));
        assert!(!cursor.next().unwrap());
        assert!(cursor.current().is_none());
        assert!(!cursor.next().unwrap());
        assert!(!cursor.next().unwrap());
    }

    #[test]
    fn test_previous_from_end_reverses_forward_order() {
        let items = vec![
            TreeItem::Leaf(4),
            TreeItem::Internal,
            TreeItem::Leaf(9),
            TreeItem::Leaf(2),
        ];
        let mut cursor = cursor(items, false);
        let mut backward = Vec::new();
        while cursor.previous().unwrap() {
            backward.push(cursor.current_key().unwrap());
        }
        assert_eq!(backward, vec![2, 9, 4]);
        assert!(!cursor.previous().unwrap());

        // from before the start, next walks forward again
        assert_eq!(forward(&mut cursor), vec![4, 9, 2]);
    }

    #[test]
    fn test_change_direction() {
        let items = (1..=4).map(TreeItem::Leaf).collect();
        let mut cursor = cursor(items, true);
        cursor.next().unwrap();
        cursor.next().unwrap();
        assert_eq!(cursor.current_key(), Some(2));
        assert!(cursor.previous().unwrap());
        assert_eq!(cursor.current_key(), Some(1));
        assert!(!cursor.previous().unwrap());
        assert!(cursor.next().unwrap());
        assert_eq!(cursor.current_key(), Some(1));
    }

    #[test]
    fn test_rewind() {
        let mut cursor = SpatialCursor::from_row_ids(vec![5, 6], true, Arc::new(FixedStore));
        assert_eq!(forward(&mut cursor), vec![5, 6]);
        assert!(!cursor.next().unwrap());

        cursor.rewind(true);
        assert_eq!(forward(&mut cursor), vec![5, 6]);

        cursor.rewind(false);
        assert!(cursor.previous().unwrap());
        assert_eq!(cursor.current_key(), Some(6));
    }

    #[test]
    fn test_empty_cursor() {
        let mut cursor = cursor(vec![TreeItem::Internal], true);
        assert!(!cursor.next().unwrap());
        assert!(!cursor.previous().unwrap());
        assert_eq!(cursor.rows().count(), 0);
    }

    #[test]
    fn test_rows_iterator() {
        let mut cursor = SpatialCursor::from_row_ids(vec![1, 2, 3], true, Arc::new(FixedStore));
        cursor.next().unwrap();
        let rest: Vec<_> = cursor.rows().map(|r| r.unwrap().key()).collect();
        assert_eq!(rest, vec![2, 3]);
    }

    #[test]
    fn test_row_store_error_propagates() {
        let mut cursor = SpatialCursor::from_row_ids(vec![1, -1], true, Arc::new(FixedStore));
        assert!(cursor.next().unwrap());
        let err = cursor.next().unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::RowNotFound);

        assert!(cursor.current().is_none());
        assert!(!cursor.next().unwrap());

        let mut cursor = SpatialCursor::from_row_ids(vec![-1, 3], true, Arc::new(FixedStore));
        let results: Vec<_> = cursor.rows().collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_err());
        assert_eq!(results[1].as_ref().unwrap().key(), 3);
    }
}
