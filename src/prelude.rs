//! Convenient imports for Cascade.
//!
//! ```ignore
//! use cascadedb::prelude::*;
//!
//! let db = Cascade::builder().observer(MyObserver).build()?;
//! ```

// Main entry point
pub use crate::database::{Cascade, CascadeBuilder};

// Error handling
pub use crate::error::{Error, Result};

// Core types
pub use crate::types::{Column, NotificationType, ObservedColumn, Row, Value};

// Observer authoring
pub use crate::types::{MemorySink, Observer, ObserverError, Sink, Transaction};

// Workers
pub use crate::types::{
    EngineConfig, ProcessOutcome, StaleReason, WorkerHandle, WorkerPool, WorkerStats,
};
