//! Sharded multi-version storage
//!
//! DashMap keyed by row, FxHashMap of version chains within.
//!
//! # Design
//!
//! - DashMap: 16-way sharded by default, lock-free reads
//! - FxHashMap: O(1) lookups, fast non-crypto hash
//! - Per-row shards: writers to different rows never contend
//! - VersionChain: every committed version kept until pruned
//!
//! The notification space is also kept in an ordered [`KeyIndex`], so the
//! scanner's batched listing reads a key range instead of every shard. Other
//! range listings (by row, or the data space) filter and sort.
//!
//! Lock order: a shard lock may be held while taking the index lock, never the
//! reverse.

use crate::chain::VersionChain;
use crate::index::KeyIndex;
use cascade_core::error::Result;
use cascade_core::traits::Storage;
use cascade_core::types::{Key, KeySpace, Row};
use cascade_core::value::{Value, VersionedValue};
use chrono::Utc;
use dashmap::DashMap;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Per-row shard containing that row's cells and notification entries
#[derive(Debug, Default)]
pub struct Shard {
    pub(crate) data: FxHashMap<Key, VersionChain>,
}

impl Shard {
    /// Create a new empty shard
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys in this shard
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if shard is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Counters returned by [`ShardedStore::prune`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneStats {
    /// Versions dropped from chains
    pub versions_removed: usize,
    /// Keys whose chains became empty and were removed
    pub keys_removed: usize,
}

/// Sharded storage - DashMap by row, version chains within
///
/// # Thread Safety
///
/// All operations are thread-safe. A batch is applied key by key; callers that
/// need atomic visibility (the transaction manager) publish the batch version
/// only after [`ShardedStore::apply_batch`] returns, so no snapshot can observe
/// a partially applied batch.
pub struct ShardedStore {
    shards: DashMap<Row, Shard>,
    notification_index: KeyIndex,
    version: AtomicU64,
}

impl ShardedStore {
    /// Create new sharded store
    pub fn new() -> Self {
        Self {
            shards: DashMap::new(),
            notification_index: KeyIndex::new(),
            version: AtomicU64::new(0),
        }
    }

    /// Create with expected number of rows
    pub fn with_capacity(num_rows: usize) -> Self {
        Self {
            shards: DashMap::with_capacity(num_rows),
            notification_index: KeyIndex::new(),
            version: AtomicU64::new(0),
        }
    }

    /// Get the newest applied version
    #[inline]
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Number of row shards
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Check if a row has any stored key
    pub fn has_row(&self, row: &Row) -> bool {
        self.shards.contains_key(row)
    }

    /// Total number of keys across all shards (tombstoned keys included)
    pub fn total_entries(&self) -> usize {
        self.shards.iter().map(|entry| entry.value().len()).sum()
    }

    /// Newest live value of `key` visible at `version`
    #[inline]
    pub fn get_at(&self, key: &Key, version: u64) -> Option<VersionedValue> {
        self.shards
            .get(&key.row)
            .and_then(|shard| shard.data.get(key).and_then(|c| c.get_at(version)))
    }

    /// Newest live value of `key`
    #[inline]
    pub fn get(&self, key: &Key) -> Option<VersionedValue> {
        self.get_at(key, u64::MAX)
    }

    /// Version of the newest entry of `key` (tombstones included), 0 if never written
    #[inline]
    pub fn latest_version(&self, key: &Key) -> u64 {
        self.shards
            .get(&key.row)
            .and_then(|shard| shard.data.get(key).map(VersionChain::latest_version))
            .unwrap_or(0)
    }

    /// Record a value for `key` at `version`
    pub fn put_version(&self, key: Key, value: Value, version: u64) {
        self.push(key, Some(value), version);
    }

    /// Record a tombstone for `key` at `version`
    pub fn delete_version(&self, key: Key, version: u64) {
        self.push(key, None, version);
    }

    fn push(&self, key: Key, value: Option<Value>, version: u64) {
        let timestamp = Utc::now().timestamp();
        let mut shard = self.shards.entry(key.row.clone()).or_insert_with(Shard::new);
        if key.space == KeySpace::Notification && !shard.data.contains_key(&key) {
            self.notification_index.insert(key.clone());
        }
        shard
            .data
            .entry(key)
            .or_default()
            .push(version, value, timestamp);
    }

    /// Apply a batch of writes and deletes, all at `version`
    ///
    /// Advances the store version to `version` once every key is applied.
    pub fn apply_batch(&self, writes: &[(Key, Value)], deletes: &[Key], version: u64) {
        for (key, value) in writes {
            self.put_version(key.clone(), value.clone(), version);
        }
        for key in deletes {
            self.delete_version(key.clone(), version);
        }
        self.version.fetch_max(version, Ordering::AcqRel);
    }

    /// List live entries of `space` visible at `version`, sorted by key
    ///
    /// Returns at most `limit` entries with keys strictly after `after`.
    pub fn list_space_at(
        &self,
        space: KeySpace,
        after: Option<&Key>,
        limit: usize,
        version: u64,
    ) -> Vec<(Key, VersionedValue)> {
        if space == KeySpace::Notification {
            return self.list_indexed(after, limit, version);
        }

        let mut results: Vec<_> = self
            .shards
            .iter()
            .flat_map(|shard| {
                shard
                    .data
                    .iter()
                    .filter(|(k, _)| k.space == space && after.map_or(true, |a| *k > a))
                    .filter_map(|(k, chain)| chain.get_at(version).map(|vv| (k.clone(), vv)))
                    .collect::<Vec<_>>()
            })
            .collect();

        results.sort_by(|(a, _), (b, _)| a.cmp(b));
        results.truncate(limit);
        results
    }

    fn list_indexed(
        &self,
        after: Option<&Key>,
        limit: usize,
        version: u64,
    ) -> Vec<(Key, VersionedValue)> {
        let mut results = Vec::new();
        let mut cursor = after.cloned();
        while results.len() < limit {
            let wanted = limit - results.len();
            let candidates = self.notification_index.range_after(cursor.as_ref(), wanted);
            let last_range = candidates.len() < wanted;
            for key in candidates {
                // Tombstoned, or written after `version`
                if let Some(vv) = self.get_at(&key, version) {
                    results.push((key.clone(), vv));
                }
                cursor = Some(key);
            }
            if last_range {
                break;
            }
        }
        results
    }

    /// List live entries of one row in `space` visible at `version`, sorted by key
    pub fn list_row_at(&self, space: KeySpace, row: &Row, version: u64) -> Vec<(Key, VersionedValue)> {
        self.shards
            .get(row)
            .map(|shard| {
                let mut results: Vec<_> = shard
                    .data
                    .iter()
                    .filter(|(k, _)| k.space == space)
                    .filter_map(|(k, chain)| chain.get_at(version).map(|vv| (k.clone(), vv)))
                    .collect();
                results.sort_by(|(a, _), (b, _)| a.cmp(b));
                results
            })
            .unwrap_or_default()
    }

    /// Count live entries of `space` at the newest version
    pub fn count_live(&self, space: KeySpace) -> usize {
        let version = self.version();
        self.shards
            .iter()
            .map(|shard| {
                shard
                    .data
                    .iter()
                    .filter(|(k, chain)| k.space == space && chain.get_at(version).is_some())
                    .count()
            })
            .sum()
    }

    /// Drop versions that no reader at or above `watermark` can observe
    pub fn prune(&self, watermark: u64) -> PruneStats {
        let mut stats = PruneStats::default();
        let index = &self.notification_index;
        for mut shard in self.shards.iter_mut() {
            shard.data.retain(|key, chain| {
                stats.versions_removed += chain.prune(watermark);
                if chain.is_empty() {
                    stats.keys_removed += 1;
                    if key.space == KeySpace::Notification {
                        index.remove(key);
                    }
                    false
                } else {
                    true
                }
            });
        }
        self.shards.retain(|_, shard| !shard.is_empty());
        if stats.versions_removed > 0 {
            tracing::debug!(
                watermark,
                versions_removed = stats.versions_removed,
                keys_removed = stats.keys_removed,
                "Pruned version chains"
            );
        }
        stats
    }

    /// All rows that have stored keys
    pub fn rows(&self) -> Vec<Row> {
        self.shards.iter().map(|entry| entry.key().clone()).collect()
    }
}

impl Default for ShardedStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ShardedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardedStore")
            .field("shard_count", &self.shard_count())
            .field("version", &self.version())
            .field("total_entries", &self.total_entries())
            .field("indexed_notifications", &self.notification_index.len())
            .finish()
    }
}

impl Storage for ShardedStore {
    fn version(&self) -> u64 {
        ShardedStore::version(self)
    }

    fn get_at(&self, key: &Key, version: u64) -> Result<Option<VersionedValue>> {
        Ok(ShardedStore::get_at(self, key, version))
    }

    fn latest_version(&self, key: &Key) -> Result<u64> {
        Ok(ShardedStore::latest_version(self, key))
    }

    fn scan_space_at(
        &self,
        space: KeySpace,
        after: Option<&Key>,
        limit: usize,
        version: u64,
    ) -> Result<Vec<(Key, VersionedValue)>> {
        Ok(self.list_space_at(space, after, limit, version))
    }

    fn scan_row_at(
        &self,
        space: KeySpace,
        row: &Row,
        version: u64,
    ) -> Result<Vec<(Key, VersionedValue)>> {
        Ok(self.list_row_at(space, row, version))
    }

    fn apply_batch(&self, writes: &[(Key, Value)], deletes: &[Key], version: u64) -> Result<()> {
        ShardedStore::apply_batch(self, writes, deletes, version);
        Ok(())
    }
}
