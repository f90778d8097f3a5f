//! Application-facing transaction handle
//!
//! Wraps a [`TransactionContext`] and restricts it to the data key space.
//! Notification entries are never visible through this API.

use crate::database::Database;
use cascade_concurrency::{PendingOperations, TransactionContext};
use cascade_core::error::Result;
use cascade_core::types::{Column, Key, KeySpace, Row};
use cascade_core::value::{Value, VersionedValue};

/// A snapshot-isolated transaction over data cells
///
/// Reads observe the database as of [`start_version`](Self::start_version)
/// plus this transaction's own buffered writes. Writes become visible to
/// others only on [`commit`](Self::commit). Dropping an uncommitted
/// transaction discards it.
pub struct Transaction<'db> {
    db: &'db Database,
    ctx: TransactionContext,
}

impl<'db> Transaction<'db> {
    pub(crate) fn new(db: &'db Database, ctx: TransactionContext) -> Self {
        Self { db, ctx }
    }

    /// Transaction ID
    pub fn id(&self) -> u64 {
        self.ctx.txn_id
    }

    /// Snapshot version this transaction reads at
    pub fn start_version(&self) -> u64 {
        self.ctx.start_version
    }

    /// Read a cell
    pub fn get(&mut self, row: &Row, column: &Column) -> Result<Option<Value>> {
        self.ctx.get(&Key::data(row.clone(), column.clone()))
    }

    /// Read a cell with the version that committed it
    ///
    /// Cells written earlier in this transaction report version 0.
    pub fn get_versioned(&mut self, row: &Row, column: &Column) -> Result<Option<VersionedValue>> {
        self.ctx.get_versioned(&Key::data(row.clone(), column.clone()))
    }

    /// Check whether a cell holds a value
    pub fn exists(&mut self, row: &Row, column: &Column) -> Result<bool> {
        self.ctx.exists(&Key::data(row.clone(), column.clone()))
    }

    /// Write a cell
    pub fn set(&mut self, row: &Row, column: &Column, value: impl Into<Value>) -> Result<()> {
        self.ctx
            .put(Key::data(row.clone(), column.clone()), value.into())
    }

    /// Delete a cell; deleting an absent cell is not an error
    pub fn delete(&mut self, row: &Row, column: &Column) -> Result<()> {
        self.ctx.delete(Key::data(row.clone(), column.clone()))
    }

    /// Read every live cell of `row`, sorted by column
    pub fn scan_row(&mut self, row: &Row) -> Result<Vec<(Column, Value)>> {
        Ok(self
            .ctx
            .scan_row(KeySpace::Data, row)?
            .into_iter()
            .map(|(key, value)| (key.column, value))
            .collect())
    }

    /// Buffered writes and deletes
    pub fn pending_operations(&self) -> PendingOperations {
        self.ctx.pending_operations()
    }

    /// Commit, returning the commit version
    ///
    /// Fails with `TransactionConflict` if another transaction committed a
    /// conflicting change since this one started; nothing is written then.
    pub fn commit(mut self) -> Result<u64> {
        self.db.commit_context(&mut self.ctx)
    }

    /// Discard all buffered operations
    pub fn abort(mut self) {
        self.db.abort_context(&mut self.ctx, "aborted by caller");
    }

    pub(crate) fn context_mut(&mut self) -> &mut TransactionContext {
        &mut self.ctx
    }
}

impl std::fmt::Debug for Transaction<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Transaction").field(&self.ctx).finish()
    }
}
