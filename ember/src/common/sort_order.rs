/// Direction of an index column.
///
/// Used in column definitions of an index (`CREATE INDEX ... (col DESC)`).
///
/// # Variants
/// - `Ascending`: smallest to largest value
/// - `Descending`: largest to smallest value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortOrder {
    /// Sort in ascending order (smallest to largest)
    #[default]
    Ascending,
    /// Sort in descending order (largest to smallest)
    Descending,
}

/// Placement of NULL values requested by an index column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NullOrdering {
    /// No explicit ordering was requested
    #[default]
    Default,
    /// `NULLS FIRST`
    First,
    /// `NULLS LAST`
    Last,
}
