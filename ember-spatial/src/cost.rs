use ember::common::COST_ROW_OFFSET;
use ember::index::ConditionMask;

/// Planner cost of answering a query through a spatial index.
///
/// `masks` holds the query conditions per column id; `column_id` is the
/// indexed column. Without a usable intersection condition the index is no
/// better than a table scan and the cost is the (offset) row count. With
/// one, the cost drops to `3 + rows / 4`.
///
/// # Examples
///
/// ```rust
/// use ember::index::ConditionMask;
/// use ember_spatial::estimate_cost;
///
/// let masks = [ConditionMask::NONE, ConditionMask::SPATIAL_INTERSECTS];
/// assert_eq!(estimate_cost(&masks, 1, 3000), 1003);
/// assert_eq!(estimate_cost(&masks, 0, 3000), 4000);
/// assert_eq!(estimate_cost(&[], 0, 3000), 4000);
/// ```
pub fn estimate_cost(masks: &[ConditionMask], column_id: usize, approximate_rows: u64) -> u64 {
    let rows = approximate_rows.saturating_add(COST_ROW_OFFSET);
    let intersects = masks
        .get(column_id)
        .is_some_and(|mask| mask.contains(ConditionMask::SPATIAL_INTERSECTS));
    if intersects {
        3 + rows / 4
    } else {
        rows
    }
}
