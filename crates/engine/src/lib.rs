//! Observer engine for cascade
//!
//! This crate layers notification-driven observers on the transactional store:
//! - Database: store + transaction manager + observer registry, with commit
//!   interception that marks notifications for observed cells
//! - Transaction: snapshot-isolated handle over data cells
//! - Observer / ObserverRegistry: column → observer dispatch
//! - NotificationStore: pending-work markers in a reserved key space
//! - NotificationScanner: partitioned, batched discovery of pending work
//! - ObserverExecutor: claim → run observer → retire, with bounded retries
//! - WorkerPool: threads driving the executor
//! - EngineConfig: TOML-loadable worker and retry settings

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod database;
pub mod error;
pub mod executor;
pub mod notification;
pub mod observer;
pub mod retry;
pub mod scanner;
pub mod sink;
pub mod transaction;
pub mod worker;

pub use config::EngineConfig;
pub use database::{Database, DatabaseBuilder};
pub use error::{EngineError, ObserverError, Result};
pub use executor::{ObserverExecutor, ProcessOutcome, StaleReason};
pub use notification::{ClaimedNotification, NotificationEntry, NotificationStore};
pub use observer::{Binding, Observer, ObserverRegistry, ObserverRegistryBuilder};
pub use retry::RetryPolicy;
pub use scanner::{partition_hash, NotificationScanner, Partition, ScanPass, WorkItem};
pub use sink::{MemorySink, Sink};
pub use transaction::Transaction;
pub use worker::{WorkerHandle, WorkerPool, WorkerStats};
