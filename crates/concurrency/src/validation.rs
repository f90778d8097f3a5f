//! Commit-time conflict detection
//!
//! First-committer-wins under snapshot isolation: a transaction that started
//! at version `S` conflicts if any key it read or wrote has a committed
//! version newer than `S`.
//!
//! Comparing against `S` rather than against the exact version read keeps
//! validation correct after version pruning, which may drop the entry a
//! reader originally saw.

use crate::transaction::TransactionContext;
use cascade_core::error::Result;
use cascade_core::traits::Storage;
use cascade_core::types::Key;
use std::collections::HashMap;

/// A single detected conflict
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictType {
    /// A key in the read set was committed by another transaction
    ReadWriteConflict {
        /// The conflicting key
        key: Key,
        /// Version observed by this transaction (0 = absent)
        read_version: u64,
        /// Newest committed version at validation time
        current_version: u64,
    },

    /// A key this transaction writes was committed by another transaction
    WriteWriteConflict {
        /// The conflicting key
        key: Key,
        /// Snapshot version of this transaction
        start_version: u64,
        /// Newest committed version at validation time
        current_version: u64,
    },
}

impl ConflictType {
    /// The key this conflict concerns
    pub fn key(&self) -> &Key {
        match self {
            ConflictType::ReadWriteConflict { key, .. } => key,
            ConflictType::WriteWriteConflict { key, .. } => key,
        }
    }
}

/// Outcome of validating one transaction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    /// All conflicts found (empty = valid)
    pub conflicts: Vec<ConflictType>,
}

impl ValidationResult {
    /// A result with no conflicts
    pub fn ok() -> Self {
        Self::default()
    }

    /// Check if validation passed
    pub fn is_valid(&self) -> bool {
        self.conflicts.is_empty()
    }

    /// Number of conflicts found
    pub fn conflict_count(&self) -> usize {
        self.conflicts.len()
    }

    /// Append another result's conflicts
    pub fn merge(&mut self, other: ValidationResult) {
        self.conflicts.extend(other.conflicts);
    }
}

impl std::fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} conflict(s)", self.conflict_count())?;
        if let Some(first) = self.conflicts.first() {
            write!(f, ", first on {}", first.key())?;
        }
        Ok(())
    }
}

/// Validate that nothing read has changed since `start_version`
pub fn validate_read_set<S: Storage + ?Sized>(
    read_set: &HashMap<Key, u64>,
    start_version: u64,
    store: &S,
) -> Result<ValidationResult> {
    let mut result = ValidationResult::ok();
    for (key, read_version) in read_set {
        let current_version = store.latest_version(key)?;
        if current_version > start_version {
            result.conflicts.push(ConflictType::ReadWriteConflict {
                key: key.clone(),
                read_version: *read_version,
                current_version,
            });
        }
    }
    Ok(result)
}

/// Validate that no written key was committed by someone else since `start_version`
pub fn validate_write_set<'a, S, I>(keys: I, start_version: u64, store: &S) -> Result<ValidationResult>
where
    S: Storage + ?Sized,
    I: IntoIterator<Item = &'a Key>,
{
    let mut result = ValidationResult::ok();
    for key in keys {
        let current_version = store.latest_version(key)?;
        if current_version > start_version {
            result.conflicts.push(ConflictType::WriteWriteConflict {
                key: key.clone(),
                start_version,
                current_version,
            });
        }
    }
    Ok(result)
}

/// Validate a whole transaction
///
/// Keys that were both read and written are reported once, as read conflicts.
/// Unvalidated writes take part only through the read set.
pub fn validate_transaction<S: Storage + ?Sized>(
    txn: &TransactionContext,
    store: &S,
) -> Result<ValidationResult> {
    let mut result = validate_read_set(&txn.read_set, txn.start_version, store)?;
    let blind_writes = txn
        .written_keys()
        .filter(|key| !txn.read_set.contains_key(*key) && !txn.unvalidated.contains(*key));
    result.merge(validate_write_set(blind_writes, txn.start_version, store)?);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cascade_core::types::{Column, Row};
    use cascade_core::value::Value;
    use cascade_storage::ShardedStore;

    fn key(q: &str) -> Key {
        Key::data(Row::from("r1"), Column::new("f", q))
    }

    #[test]
    fn test_read_set_unchanged_is_valid() {
        let store = ShardedStore::new();
        store.apply_batch(&[(key("a"), Value::from("1"))], &[], 1);

        let mut read_set = HashMap::new();
        read_set.insert(key("a"), 1);
        assert!(validate_read_set(&read_set, 1, &store).unwrap().is_valid());
    }

    #[test]
    fn test_read_set_changed_conflicts() {
        let store = ShardedStore::new();
        store.apply_batch(&[(key("a"), Value::from("1"))], &[], 1);
        store.apply_batch(&[(key("a"), Value::from("2"))], &[], 2);

        let mut read_set = HashMap::new();
        read_set.insert(key("a"), 1);
        let result = validate_read_set(&read_set, 1, &store).unwrap();
        assert_eq!(result.conflict_count(), 1);
        assert_eq!(
            result.conflicts[0],
            ConflictType::ReadWriteConflict {
                key: key("a"),
                read_version: 1,
                current_version: 2
            }
        );
    }

    #[test]
    fn test_absent_read_then_created_conflicts() {
        let store = ShardedStore::new();
        let mut read_set = HashMap::new();
        read_set.insert(key("a"), 0);
        store.apply_batch(&[(key("a"), Value::from("1"))], &[], 1);

        assert!(!validate_read_set(&read_set, 0, &store).unwrap().is_valid());
    }

    #[test]
    fn test_concurrent_delete_conflicts() {
        let store = ShardedStore::new();
        store.apply_batch(&[(key("a"), Value::from("1"))], &[], 1);
        store.apply_batch(&[], &[key("a")], 2);

        let result = validate_write_set([&key("a")], 1, &store).unwrap();
        assert!(matches!(
            result.conflicts[0],
            ConflictType::WriteWriteConflict {
                current_version: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_display_names_first_key() {
        let mut result = ValidationResult::ok();
        result.conflicts.push(ConflictType::WriteWriteConflict {
            key: key("a"),
            start_version: 1,
            current_version: 2,
        });
        assert_eq!(result.to_string(), "1 conflict(s), first on data/r1/f:a");
    }
}
