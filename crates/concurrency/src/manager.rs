//! Transaction manager for coordinating commit operations
//!
//! Provides atomic commit by orchestrating:
//! 1. Validation (first-committer-wins)
//! 2. Storage application with a single commit version
//! 3. Publication of the new version to later snapshots
//!
//! ## Commit Sequence
//!
//! ```text
//! 1. acquire commit_lock
//! 2. txn.commit(store)        Active -> Validating -> Committed | Aborted
//! 3. commit_version = current + 1
//! 4. txn.apply_writes(store, commit_version)
//! 5. publish commit_version
//! 6. release commit_lock
//! ```
//!
//! Snapshots taken before step 5 never observe the commit; snapshots taken
//! after it observe all of it.

use crate::transaction::{CommitError, TransactionContext, TransactionStatus};
use cascade_core::traits::Storage;
use cascade_storage::VersionedSnapshot;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

type ActiveSnapshots = Arc<Mutex<BTreeMap<u64, usize>>>;

/// Registration of one open snapshot version
///
/// While alive, versions visible at `version` are not pruned. Dropping the
/// lease releases the registration.
pub struct SnapshotLease {
    version: u64,
    active: ActiveSnapshots,
}

impl SnapshotLease {
    /// The leased snapshot version
    pub fn version(&self) -> u64 {
        self.version
    }
}

impl Drop for SnapshotLease {
    fn drop(&mut self) {
        let mut active = self.active.lock();
        if let Some(count) = active.get_mut(&self.version) {
            *count -= 1;
            if *count == 0 {
                active.remove(&self.version);
            }
        }
    }
}

impl std::fmt::Debug for SnapshotLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotLease")
            .field("version", &self.version)
            .finish()
    }
}

/// Manages transaction lifecycle and atomic commits
///
/// The global version is incremented once per committed write transaction;
/// all keys in a transaction get the same commit version.
///
/// # Thread Safety
///
/// Commits are serialized by an internal lock so that no other transaction
/// can modify storage between validation and apply.
pub struct TransactionManager {
    /// Latest published commit version
    version: AtomicU64,

    /// Next transaction ID
    next_txn_id: AtomicU64,

    /// Serializes validate + apply + publish
    commit_lock: Mutex<()>,

    /// Open snapshot versions with their reference counts
    active: ActiveSnapshots,
}

impl TransactionManager {
    /// Create a manager whose first snapshot sees `initial_version`
    pub fn new(initial_version: u64) -> Self {
        TransactionManager {
            version: AtomicU64::new(initial_version),
            next_txn_id: AtomicU64::new(1),
            commit_lock: Mutex::new(()),
            active: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    /// Get current published version
    pub fn current_version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    /// Allocate next transaction ID
    pub fn next_txn_id(&self) -> u64 {
        self.next_txn_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Register a snapshot at the current version
    ///
    /// Reading the version and registering it happen under the same lock that
    /// [`low_watermark`](Self::low_watermark) takes, so a concurrent prune can
    /// never pass a snapshot that is about to open.
    pub fn lease_snapshot(&self) -> SnapshotLease {
        let mut active = self.active.lock();
        let version = self.current_version();
        *active.entry(version).or_insert(0) += 1;
        SnapshotLease {
            version,
            active: Arc::clone(&self.active),
        }
    }

    /// Begin a transaction reading from `store` at the current version
    pub fn begin<S: Storage + 'static>(&self, store: &Arc<S>) -> TransactionContext {
        let lease = self.lease_snapshot();
        let snapshot = VersionedSnapshot::new(Arc::clone(store), lease.version());
        let mut txn = TransactionContext::with_snapshot(self.next_txn_id(), Box::new(snapshot));
        txn.attach_lease(lease);
        trace!(txn_id = txn.txn_id, start_version = txn.start_version, "Transaction started");
        txn
    }

    /// Commit a transaction atomically
    ///
    /// Returns the commit version. A transaction with no buffered writes
    /// still validates its reads but allocates no version; its start version
    /// is returned instead.
    pub fn commit<S: Storage + ?Sized>(
        &self,
        txn: &mut TransactionContext,
        store: &S,
    ) -> std::result::Result<u64, CommitError> {
        let _commit_guard = self.commit_lock.lock();

        txn.commit(store)?;

        if txn.is_read_only() {
            return Ok(txn.start_version);
        }

        let commit_version = self.current_version() + 1;
        let applied = match txn.apply_writes(store, commit_version) {
            Ok(applied) => applied,
            Err(e) => {
                txn.status = TransactionStatus::Aborted {
                    reason: format!("Storage application failed: {}", e),
                };
                return Err(CommitError::Storage(e.to_string()));
            }
        };
        self.version.store(commit_version, Ordering::SeqCst);

        debug!(
            txn_id = txn.txn_id,
            commit_version,
            puts = applied.puts_applied,
            deletes = applied.deletes_applied,
            "Transaction committed"
        );
        Ok(commit_version)
    }

    /// Abort a transaction, discarding its buffered operations
    pub fn abort(&self, txn: &mut TransactionContext, reason: impl Into<String>) {
        let reason = reason.into();
        if txn.mark_aborted(reason.clone()).is_ok() {
            trace!(txn_id = txn.txn_id, %reason, "Transaction aborted");
        }
    }

    /// Oldest version any open snapshot may still read
    ///
    /// The current version when no snapshot is open.
    pub fn low_watermark(&self) -> u64 {
        let active = self.active.lock();
        active
            .keys()
            .next()
            .copied()
            .unwrap_or_else(|| self.current_version())
    }

    /// Number of open snapshots
    pub fn active_count(&self) -> usize {
        self.active.lock().values().sum()
    }
}

impl std::fmt::Debug for TransactionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionManager")
            .field("version", &self.current_version())
            .field("active_snapshots", &self.active_count())
            .finish()
    }
}
