//! Core types and traits for cascade
//!
//! This crate defines the shared vocabulary of the workspace:
//! - Row, Column, KeySpace, Key: cell addressing
//! - Value, VersionedValue: opaque cell contents with commit versions
//! - NotificationType, ObservedColumn: observer bindings
//! - Storage, SnapshotView: traits implemented by the storage layer
//! - Error: the store error taxonomy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod observed;
pub mod traits;
pub mod types;
pub mod value;

pub use error::{Error, Result};
pub use observed::{NotificationType, ObservedColumn};
pub use traits::{SnapshotView, Storage};
pub use types::{Column, Key, KeySpace, Row};
pub use value::{Value, VersionedValue};
