//! Observers and their registry
//!
//! An observer is application logic bound to one column. When a committed
//! transaction changes that column in some row, the engine eventually calls
//! [`Observer::process`] for the row inside a fresh transaction.

mod registry;

pub use registry::{Binding, ObserverRegistry, ObserverRegistryBuilder};

use crate::error::ObserverError;
use crate::transaction::Transaction;
use cascade_core::observed::ObservedColumn;
use cascade_core::types::{Column, Row};

/// Application logic triggered by changes to an observed column
///
/// `process` runs inside a transaction owned by the engine. Its reads and
/// writes commit atomically with the retirement of the notification that
/// triggered it. Returning an error aborts the transaction; the engine then
/// retries as if the commit had conflicted.
///
/// An observer that writes the column it observes notifies itself. Such
/// observers must stop writing once their state has converged, or they will
/// be re-run forever.
pub trait Observer: Send + Sync {
    /// The column this observer watches and its notification strength
    fn observed_column(&self) -> ObservedColumn;

    /// Handle one change to `column` in `row`
    fn process(
        &self,
        txn: &mut Transaction<'_>,
        row: &Row,
        column: &Column,
    ) -> Result<(), ObserverError>;

    /// Name used in logs
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}
