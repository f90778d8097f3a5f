//! Notification store
//!
//! A notification is a marker under the reserved [`KeySpace::Notification`]
//! space, one per (row, observed column) awaiting observer execution.
//!
//! Lifecycle of one entry:
//!
//! ```text
//! ABSENT --commit writes observed cell--> PENDING
//! PENDING --worker reads it in T--> CLAIMED (only while T is in flight)
//! CLAIMED --T commits--> ABSENT, or PENDING again if T rewrote the cell
//! CLAIMED --T aborts--> PENDING (unchanged)
//! ```
//!
//! [`KeySpace::Notification`]: cascade_core::types::KeySpace::Notification

mod entry;
mod store;

pub use entry::NotificationEntry;
pub use store::{ClaimedNotification, NotificationStore};
