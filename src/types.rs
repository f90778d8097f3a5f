//! Public types for the Cascade API.
//!
//! This module re-exports types from internal crates with a clean public interface.

// Cell addressing and values
pub use cascade_core::{Column, Row, Value, VersionedValue};

// Observer bindings
pub use cascade_core::{NotificationType, ObservedColumn};

// Engine types
pub use cascade_engine::{
    EngineConfig, MemorySink, Observer, ObserverError, ObserverRegistry, ProcessOutcome, Sink,
    StaleReason, Transaction, WorkerHandle, WorkerPool, WorkerStats,
};

// Store handle, for reopening a database over existing data
pub use cascade_storage::{PruneStats, ShardedStore};
