/// Added to the row count in every index cost estimate.
pub const COST_ROW_OFFSET: u64 = 1000;

/// Default number of geometry values kept by a [`GeometryCache`](crate::geometry::GeometryCache).
pub const DEFAULT_GEOMETRY_CACHE_SIZE: usize = 1024;
