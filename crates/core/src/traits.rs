//! Storage abstractions
//!
//! [`Storage`] is the multi-version backend the transaction layer validates
//! against and applies to. [`SnapshotView`] is a read-only, point-in-time view
//! handed to a single transaction.

use crate::error::Result;
use crate::types::{Key, KeySpace, Row};
use crate::value::{Value, VersionedValue};

/// Multi-version key-value storage
///
/// Every committed write is kept as a new version. Reads at version `v`
/// observe the newest version `<= v`; a deletion is a tombstone version that
/// reads as absent.
pub trait Storage: Send + Sync {
    /// Latest committed version applied to this store
    fn version(&self) -> u64;

    /// Read the newest live value visible at `version`
    fn get_at(&self, key: &Key, version: u64) -> Result<Option<VersionedValue>>;

    /// Version of the newest entry for `key`, tombstones included
    ///
    /// Returns 0 if the key has never been written.
    fn latest_version(&self, key: &Key) -> Result<u64>;

    /// List live entries of `space` visible at `version`, in key order
    ///
    /// Only keys strictly greater than `after` are returned, at most `limit`.
    fn scan_space_at(
        &self,
        space: KeySpace,
        after: Option<&Key>,
        limit: usize,
        version: u64,
    ) -> Result<Vec<(Key, VersionedValue)>>;

    /// List live entries of one row in `space` visible at `version`, in key order
    fn scan_row_at(&self, space: KeySpace, row: &Row, version: u64)
        -> Result<Vec<(Key, VersionedValue)>>;

    /// Apply writes and deletes atomically, all with `version`
    fn apply_batch(&self, writes: &[(Key, Value)], deletes: &[Key], version: u64) -> Result<()>;
}

/// Point-in-time read view used by one transaction
pub trait SnapshotView: Send + Sync {
    /// Snapshot version
    fn version(&self) -> u64;

    /// Read `key` as of the snapshot
    fn get(&self, key: &Key) -> Result<Option<VersionedValue>>;

    /// Read one row of `space` as of the snapshot
    fn scan_row(&self, space: KeySpace, row: &Row) -> Result<Vec<(Key, VersionedValue)>>;
}
