/// Lifecycle phase of the database that owns a table or index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DatabaseState {
    /// Opening and recovering: schema metadata may be incomplete, so
    /// column type checks on index creation are skipped.
    Starting,
    /// Fully open.
    #[default]
    Open,
    /// Shutting down.
    Closing,
}

impl DatabaseState {
    pub fn is_starting(&self) -> bool {
        matches!(self, DatabaseState::Starting)
    }
}
