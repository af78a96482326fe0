//! In-memory holder for the latest accepted tide snapshot.

use crate::tide_data::TideError;
use crate::TideSnapshot;
use std::sync::Arc;

/// Latest known tide data.
///
/// The snapshot lives behind an `Arc` and is swapped as a whole, so a reader
/// holding a previous [`DataStore::current_snapshot`] keeps a consistent view
/// while a newer one is applied.
#[derive(Debug, Default)]
pub struct DataStore {
    current: Arc<TideSnapshot>,
}

impl DataStore {
    /// Empty store: no station name, all series empty.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored data with `snapshot`.
    ///
    /// Snapshots whose time and value series differ in length are rejected
    /// and the previous data is kept.
    pub fn apply_snapshot(&mut self, snapshot: TideSnapshot) -> Result<(), TideError> {
        snapshot.validate()?;
        self.current = Arc::new(snapshot);
        Ok(())
    }

    pub fn current_snapshot(&self) -> Arc<TideSnapshot> {
        Arc::clone(&self.current)
    }
}
