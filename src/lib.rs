//! # Cascade
//!
//! Incremental, transactional computation over a versioned cell store.
//!
//! Cells are addressed by (row, column) and written in snapshot-isolated
//! transactions. Columns can be *observed*: when a committed transaction
//! changes an observed cell, a notification is recorded atomically with the
//! write, and a worker later runs the bound [`Observer`] for that row inside
//! its own transaction. Observers may write further observed cells, including
//! the one they watch, which schedules another run.
//!
//! ## Quick Start
//!
//! ```ignore
//! use cascadedb::prelude::*;
//!
//! let db = Cascade::builder()
//!     .observer(ExportingObserver::new(sink.clone()))
//!     .build()?;
//!
//! let row = Row::from("r1");
//! db.transaction(|txn| {
//!     txn.set(&row, &stat_count, "3")?;
//!     txn.set(&row, &export_count, "3")
//! })?;
//!
//! db.run_worker()?;
//! assert_eq!(sink.drain(), vec![3]);
//! ```
//!
//! ## Notification strength
//!
//! - [`NotificationType::Strong`]: the notification is retired in the same
//!   commit as the observer's effects; concurrent re-marking forces a retry.
//! - [`NotificationType::Weak`]: best effort; writes that land before a worker
//!   gets to the cell collapse into one run with the latest value.

#![warn(missing_docs)]

mod database;
mod error;
mod types;

pub mod logging;
pub mod prelude;

// Re-export main entry points
pub use database::{Cascade, CascadeBuilder};
pub use error::{Error, Result};

// Re-export types
pub use types::*;
