//! Ordered key index
//!
//! Shards are hashed by row, so they cannot answer "the next N keys after K".
//! A `KeyIndex` keeps the keys of one space in a `BTreeSet` beside the shards.
//! It holds exactly the keys that have a version chain, tombstoned or not;
//! readers still check visibility against the chain.

use cascade_core::types::Key;
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::ops::Bound;

/// Sorted set of keys with a chain in the store
#[derive(Debug, Default)]
pub struct KeyIndex {
    keys: RwLock<BTreeSet<Key>>,
}

impl KeyIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `key`; returns false if it was already present
    pub fn insert(&self, key: Key) -> bool {
        self.keys.write().insert(key)
    }

    /// Remove `key`; returns false if it was absent
    pub fn remove(&self, key: &Key) -> bool {
        self.keys.write().remove(key)
    }

    /// Number of indexed keys
    pub fn len(&self) -> usize {
        self.keys.read().len()
    }

    /// Check if nothing is indexed
    pub fn is_empty(&self) -> bool {
        self.keys.read().is_empty()
    }

    /// Up to `limit` keys strictly after `after`, in order
    ///
    /// The lock is released before returning.
    pub fn range_after(&self, after: Option<&Key>, limit: usize) -> Vec<Key> {
        let lower = match after {
            Some(key) => Bound::Excluded(key),
            None => Bound::Unbounded,
        };
        self.keys
            .read()
            .range::<Key, _>((lower, Bound::Unbounded))
            .take(limit)
            .cloned()
            .collect()
    }
}
