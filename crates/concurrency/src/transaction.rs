//! Transaction context for OCC
//!
//! TransactionContext tracks all reads, writes, and deletes of a transaction,
//! enabling validation at commit time. Writes are buffered and become visible
//! to others only when the manager applies them with a single commit version.

use crate::manager::SnapshotLease;
use crate::validation::{validate_transaction, ValidationResult};
use cascade_core::error::{Error, Result};
use cascade_core::traits::{SnapshotView, Storage};
use cascade_core::types::{Key, KeySpace, Row};
use cascade_core::value::{Value, VersionedValue};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Error type for commit failures
///
/// All-or-nothing: a failed commit applied nothing.
#[derive(Debug, Clone)]
pub enum CommitError {
    /// Transaction aborted due to validation conflicts
    ValidationFailed(ValidationResult),

    /// Transaction was not in correct state for commit
    InvalidState(String),

    /// Storage failed while validating or applying
    Storage(String),
}

impl CommitError {
    /// Check if this is a validation conflict
    pub fn is_conflict(&self) -> bool {
        matches!(self, CommitError::ValidationFailed(_))
    }
}

impl std::fmt::Display for CommitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommitError::ValidationFailed(result) => write!(f, "Commit failed: {}", result),
            CommitError::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
            CommitError::Storage(msg) => write!(f, "Storage error: {}", msg),
        }
    }
}

impl std::error::Error for CommitError {}

impl From<CommitError> for Error {
    fn from(e: CommitError) -> Self {
        match e {
            CommitError::ValidationFailed(result) => Error::TransactionConflict(result.to_string()),
            CommitError::InvalidState(state) => Error::TransactionNotActive { state },
            CommitError::Storage(msg) => Error::Storage(msg),
        }
    }
}

/// Result of applying transaction writes to storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyResult {
    /// Version assigned to all writes in this transaction
    pub commit_version: u64,
    /// Number of puts applied
    pub puts_applied: usize,
    /// Number of deletes applied
    pub deletes_applied: usize,
}

/// Summary of buffered operations that would be discarded on abort
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingOperations {
    /// Number of pending put operations
    pub puts: usize,
    /// Number of pending delete operations
    pub deletes: usize,
}

impl PendingOperations {
    /// Total number of pending operations
    pub fn total(&self) -> usize {
        self.puts + self.deletes
    }

    /// Check if there are no pending operations
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Status of a transaction in its lifecycle
///
/// State transitions:
/// - `Active` → `Validating` (begin commit)
/// - `Validating` → `Committed` (validation passed)
/// - `Validating` → `Aborted` (conflict detected)
/// - `Active` → `Aborted` (user abort or error)
///
/// `Committed` and `Aborted` are terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionStatus {
    /// Transaction is executing, can read/write
    Active,
    /// Transaction is being validated for conflicts
    Validating,
    /// Transaction committed successfully
    Committed,
    /// Transaction was aborted
    Aborted {
        /// Human-readable reason for abort
        reason: String,
    },
}

/// Transaction context for OCC with snapshot isolation
///
/// # Read-Your-Writes Semantics
///
/// When reading a key, the transaction checks in order:
/// 1. **write_set**: Returns uncommitted write from this transaction
/// 2. **delete_set**: Returns None for uncommitted delete
/// 3. **snapshot**: Returns value from snapshot, tracks in read_set
///
/// # Lifecycle
///
/// 1. **BEGIN**: Created by the manager with a snapshot, status `Active`
/// 2. **READ/WRITE**: `get()`, `put()`, `delete()`
/// 3. **VALIDATE/APPLY**: `TransactionManager::commit`
/// 4. **END**: `Committed` or `Aborted`; dropping an active context aborts it
pub struct TransactionContext {
    /// Unique transaction ID
    pub txn_id: u64,

    /// Version at transaction start (snapshot version)
    pub start_version: u64,

    snapshot: Option<Box<dyn SnapshotView>>,

    /// Keeps `start_version` registered with the manager while the
    /// transaction can still read
    lease: Option<SnapshotLease>,

    /// Keys read from the snapshot and the version observed (0 = absent)
    pub read_set: HashMap<Key, u64>,

    /// Keys written with their new values (buffered)
    pub write_set: HashMap<Key, Value>,

    /// Keys to delete (buffered)
    pub delete_set: HashSet<Key>,

    /// Buffered writes exempt from write-write validation
    pub unvalidated: HashSet<Key>,

    /// Current transaction status
    pub status: TransactionStatus,
}

impl TransactionContext {
    /// Create a context without a snapshot
    ///
    /// Reads fail on such a context; used for write-only batches and tests.
    pub fn new(txn_id: u64, start_version: u64) -> Self {
        Self {
            txn_id,
            start_version,
            snapshot: None,
            lease: None,
            read_set: HashMap::new(),
            write_set: HashMap::new(),
            delete_set: HashSet::new(),
            unvalidated: HashSet::new(),
            status: TransactionStatus::Active,
        }
    }

    /// Create a context reading from `snapshot`
    pub fn with_snapshot(txn_id: u64, snapshot: Box<dyn SnapshotView>) -> Self {
        let mut txn = Self::new(txn_id, snapshot.version());
        txn.snapshot = Some(snapshot);
        txn
    }

    pub(crate) fn attach_lease(&mut self, lease: SnapshotLease) {
        self.lease = Some(lease);
    }

    // === Read Operations ===

    /// Get a value, tracking the read for conflict detection
    pub fn get(&mut self, key: &Key) -> Result<Option<Value>> {
        Ok(self.get_versioned(key)?.map(|vv| vv.value))
    }

    /// Get a value with its commit version, tracking the read
    ///
    /// Values from this transaction's own buffered writes carry version 0.
    pub fn get_versioned(&mut self, key: &Key) -> Result<Option<VersionedValue>> {
        self.ensure_active()?;

        if let Some(value) = self.write_set.get(key) {
            return Ok(Some(VersionedValue::new(value.clone(), 0, 0)));
        }
        if self.delete_set.contains(key) {
            return Ok(None);
        }

        let versioned = self.snapshot()?.get(key)?;
        let version = versioned.as_ref().map(|vv| vv.version).unwrap_or(0);
        self.read_set.insert(key.clone(), version);
        Ok(versioned)
    }

    /// Read from the snapshot without adding to the read set
    ///
    /// A later commit by someone else to `key` will not conflict with this
    /// transaction. Buffered writes are still honoured.
    pub fn get_untracked(&mut self, key: &Key) -> Result<Option<VersionedValue>> {
        self.ensure_active()?;

        if let Some(value) = self.write_set.get(key) {
            return Ok(Some(VersionedValue::new(value.clone(), 0, 0)));
        }
        if self.delete_set.contains(key) {
            return Ok(None);
        }
        self.snapshot()?.get(key)
    }

    /// Add `key` to the read set as if it had been read at `version`
    pub fn record_read(&mut self, key: Key, version: u64) -> Result<()> {
        self.ensure_active()?;
        self.read_set.insert(key, version);
        Ok(())
    }

    /// Check if a key exists in the transaction's view (tracked)
    pub fn exists(&mut self, key: &Key) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Read every live key of one row in `space`
    ///
    /// Includes this transaction's buffered writes, excludes its buffered
    /// deletes, and tracks every snapshot key returned. Results are sorted.
    pub fn scan_row(&mut self, space: KeySpace, row: &Row) -> Result<Vec<(Key, Value)>> {
        self.ensure_active()?;

        let snapshot_results = self.snapshot()?.scan_row(space, row)?;
        let mut results: BTreeMap<Key, Value> = BTreeMap::new();

        for (key, vv) in snapshot_results {
            if !self.delete_set.contains(&key) {
                self.read_set.insert(key.clone(), vv.version);
                results.insert(key, vv.value);
            }
        }
        for (key, value) in &self.write_set {
            if key.in_row(space, row) {
                results.insert(key.clone(), value.clone());
            }
        }

        Ok(results.into_iter().collect())
    }

    fn snapshot(&self) -> Result<&dyn SnapshotView> {
        self.snapshot
            .as_deref()
            .ok_or_else(|| Error::invalid_input("Transaction has no snapshot for reads"))
    }

    // === Write Operations ===

    /// Buffer a write; the latest write to a key wins
    pub fn put(&mut self, key: Key, value: Value) -> Result<()> {
        self.ensure_active()?;
        self.delete_set.remove(&key);
        self.unvalidated.remove(&key);
        self.write_set.insert(key, value);
        Ok(())
    }

    /// Buffer a write that never conflicts with other writers of `key`
    ///
    /// The newest commit wins. A read of `key` by this transaction is still
    /// validated. A later `put` or `delete` of the key makes it an ordinary
    /// write again.
    pub fn put_unvalidated(&mut self, key: Key, value: Value) -> Result<()> {
        self.ensure_active()?;
        self.delete_set.remove(&key);
        self.unvalidated.insert(key.clone());
        self.write_set.insert(key, value);
        Ok(())
    }

    /// Buffer a delete; cancels any earlier buffered write to the key
    pub fn delete(&mut self, key: Key) -> Result<()> {
        self.ensure_active()?;
        self.write_set.remove(&key);
        self.unvalidated.remove(&key);
        self.delete_set.insert(key);
        Ok(())
    }

    /// All keys this transaction will modify (writes, then deletes)
    pub fn written_keys(&self) -> impl Iterator<Item = &Key> {
        self.write_set.keys().chain(self.delete_set.iter())
    }

    // === State Management ===

    /// Check if transaction is in Active state
    pub fn is_active(&self) -> bool {
        matches!(self.status, TransactionStatus::Active)
    }

    /// Check if transaction is committed
    pub fn is_committed(&self) -> bool {
        matches!(self.status, TransactionStatus::Committed)
    }

    /// Fail unless the transaction is Active
    pub fn ensure_active(&self) -> Result<()> {
        if self.is_active() {
            Ok(())
        } else {
            Err(Error::TransactionNotActive {
                state: format!("{:?}", self.status),
            })
        }
    }

    /// Transition `Validating` → `Committed`
    pub fn mark_committed(&mut self) -> Result<()> {
        match &self.status {
            TransactionStatus::Validating => {
                self.status = TransactionStatus::Committed;
                self.lease = None;
                Ok(())
            }
            _ => Err(Error::TransactionNotActive {
                state: format!("{:?}", self.status),
            }),
        }
    }

    /// Abort the transaction, discarding buffered operations
    ///
    /// Valid from `Active` (user abort) or `Validating` (conflict detected).
    pub fn mark_aborted(&mut self, reason: String) -> Result<()> {
        match &self.status {
            TransactionStatus::Committed | TransactionStatus::Aborted { .. } => {
                Err(Error::TransactionNotActive {
                    state: format!("{:?}", self.status),
                })
            }
            _ => {
                self.status = TransactionStatus::Aborted { reason };
                self.write_set.clear();
                self.delete_set.clear();
                self.unvalidated.clear();
                self.lease = None;
                // read_set is kept for diagnostics
                Ok(())
            }
        }
    }

    /// Summary of buffered operations
    pub fn pending_operations(&self) -> PendingOperations {
        PendingOperations {
            puts: self.write_set.len(),
            deletes: self.delete_set.len(),
        }
    }

    // === Commit Operation ===

    /// Validate against `store` and transition to `Committed` or `Aborted`
    ///
    /// Performs validation and state transitions only; the manager allocates
    /// the commit version and applies the writes.
    pub fn commit<S: Storage + ?Sized>(&mut self, store: &S) -> std::result::Result<(), CommitError> {
        if !self.is_active() {
            return Err(CommitError::InvalidState(format!(
                "Cannot commit transaction {} from {:?} state - must be Active",
                self.txn_id, self.status
            )));
        }
        self.status = TransactionStatus::Validating;

        let validation = match validate_transaction(self, store) {
            Ok(validation) => validation,
            Err(e) => {
                let _ = self.mark_aborted(format!("Validation failed: {}", e));
                return Err(CommitError::Storage(e.to_string()));
            }
        };

        if !validation.is_valid() {
            let _ = self.mark_aborted(format!(
                "Commit failed: {} conflict(s) detected",
                validation.conflict_count()
            ));
            return Err(CommitError::ValidationFailed(validation));
        }

        self.mark_committed()
            .map_err(|e| CommitError::InvalidState(e.to_string()))
    }

    /// Apply all buffered writes to storage with `commit_version`
    ///
    /// Requires `Committed` state.
    pub fn apply_writes<S: Storage + ?Sized>(&self, store: &S, commit_version: u64) -> Result<ApplyResult> {
        if !self.is_committed() {
            return Err(Error::TransactionNotActive {
                state: format!("{:?}", self.status),
            });
        }

        let writes: Vec<(Key, Value)> = self
            .write_set
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let deletes: Vec<Key> = self.delete_set.iter().cloned().collect();
        store.apply_batch(&writes, &deletes, commit_version)?;

        Ok(ApplyResult {
            commit_version,
            puts_applied: writes.len(),
            deletes_applied: deletes.len(),
        })
    }

    // === Introspection ===

    /// Number of keys in the read set
    pub fn read_count(&self) -> usize {
        self.read_set.len()
    }

    /// Check if the transaction has buffered writes or deletes
    pub fn has_pending_operations(&self) -> bool {
        !self.write_set.is_empty() || !self.delete_set.is_empty()
    }

    /// Check if transaction is read-only
    pub fn is_read_only(&self) -> bool {
        !self.has_pending_operations()
    }
}

impl std::fmt::Debug for TransactionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionContext")
            .field("txn_id", &self.txn_id)
            .field("start_version", &self.start_version)
            .field("status", &self.status)
            .field("reads", &self.read_set.len())
            .field("writes", &self.write_set.len())
            .field("deletes", &self.delete_set.len())
            .finish()
    }
}
