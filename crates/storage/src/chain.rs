//! Per-key version chains
//!
//! Each key keeps its committed versions in ascending order. Most keys hold
//! one or two live versions at a time, so the chain is inline-allocated.

use cascade_core::{Value, VersionedValue};
use smallvec::SmallVec;

/// One committed version of a key
///
/// `value == None` is a tombstone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredVersion {
    /// Commit version
    pub version: u64,
    /// Value, or `None` for a deletion
    pub value: Option<Value>,
    /// Wall-clock time (unix seconds) when applied
    pub timestamp: i64,
}

impl StoredVersion {
    /// Check whether this version is a deletion
    pub fn is_tombstone(&self) -> bool {
        self.value.is_none()
    }

    fn to_versioned(&self) -> Option<VersionedValue> {
        self.value
            .as_ref()
            .map(|v| VersionedValue::new(v.clone(), self.version, self.timestamp))
    }
}

/// Ascending list of committed versions for one key
#[derive(Debug, Clone, Default)]
pub struct VersionChain {
    versions: SmallVec<[StoredVersion; 2]>,
}

impl VersionChain {
    /// Create an empty chain
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of retained versions (tombstones included)
    pub fn len(&self) -> usize {
        self.versions.len()
    }

    /// Check if no versions are retained
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Record a version
    ///
    /// A second write at an existing version replaces it (a transaction writes
    /// each key once). Out-of-order versions are inserted in place.
    pub fn push(&mut self, version: u64, value: Option<Value>, timestamp: i64) {
        let entry = StoredVersion {
            version,
            value,
            timestamp,
        };
        match self.versions.binary_search_by_key(&version, |v| v.version) {
            Ok(idx) => self.versions[idx] = entry,
            Err(idx) => self.versions.insert(idx, entry),
        }
    }

    /// Newest version `<= version`, tombstones included
    pub fn visible_at(&self, version: u64) -> Option<&StoredVersion> {
        self.versions.iter().rev().find(|v| v.version <= version)
    }

    /// Newest live value `<= version`
    ///
    /// Returns `None` if nothing is visible or the visible version is a tombstone.
    pub fn get_at(&self, version: u64) -> Option<VersionedValue> {
        self.visible_at(version).and_then(StoredVersion::to_versioned)
    }

    /// Version of the newest entry, or 0 if the chain is empty
    pub fn latest_version(&self) -> u64 {
        self.versions.last().map(|v| v.version).unwrap_or(0)
    }

    /// Drop versions no reader at or above `watermark` can observe
    ///
    /// Keeps every version newer than `watermark` and the newest version at or
    /// below it. That retained version is dropped too when it is a tombstone.
    /// Returns the number of versions removed.
    pub fn prune(&mut self, watermark: u64) -> usize {
        let Some(pivot) = self.versions.iter().rposition(|v| v.version <= watermark) else {
            return 0;
        };
        let cut = if self.versions[pivot].is_tombstone() {
            pivot + 1
        } else {
            pivot
        };
        if cut == 0 {
            return 0;
        }
        self.versions.drain(..cut);
        cut
    }
}
