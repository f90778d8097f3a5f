//! Snapshot views over multi-version storage
//!
//! A snapshot is just a version number plus a handle to the store. Because
//! the store retains versions, taking a snapshot is O(1) and copies nothing.

use cascade_core::error::Result;
use cascade_core::traits::{SnapshotView, Storage};
use cascade_core::types::{Key, KeySpace, Row};
use cascade_core::value::VersionedValue;
use std::sync::Arc;

/// Point-in-time view of a [`Storage`] at a fixed version
pub struct VersionedSnapshot<S: Storage> {
    store: Arc<S>,
    version: u64,
}

impl<S: Storage> VersionedSnapshot<S> {
    /// Create a snapshot of `store` at `version`
    pub fn new(store: Arc<S>, version: u64) -> Self {
        Self { store, version }
    }
}

impl<S: Storage> SnapshotView for VersionedSnapshot<S> {
    fn version(&self) -> u64 {
        self.version
    }

    fn get(&self, key: &Key) -> Result<Option<VersionedValue>> {
        self.store.get_at(key, self.version)
    }

    fn scan_row(&self, space: KeySpace, row: &Row) -> Result<Vec<(Key, VersionedValue)>> {
        self.store.scan_row_at(space, row, self.version)
    }
}

impl<S: Storage> std::fmt::Debug for VersionedSnapshot<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionedSnapshot")
            .field("version", &self.version)
            .finish()
    }
}
