//! Concurrency layer for cascade
//!
//! This crate implements optimistic concurrency control (OCC) with:
//! - TransactionContext: read/write/delete set tracking with read-your-writes
//! - Snapshot isolation over multi-version storage
//! - Conflict detection at commit time (first-committer-wins)
//! - TransactionManager: serialized commits and snapshot leases for pruning

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod manager;
pub mod transaction;
pub mod validation;

pub use manager::{SnapshotLease, TransactionManager};
pub use transaction::{
    ApplyResult, CommitError, PendingOperations, TransactionContext, TransactionStatus,
};
pub use validation::{
    validate_read_set, validate_transaction, validate_write_set, ConflictType, ValidationResult,
};

// Re-export the SnapshotView trait from core for convenience
pub use cascade_core::traits::SnapshotView;
