//! Notification entries inside the transactional store
//!
//! Every operation here runs inside a caller-supplied transaction, so marking,
//! claiming and retiring a notification commit atomically with whatever else
//! that transaction does.

use super::NotificationEntry;
use crate::observer::ObserverRegistry;
use cascade_concurrency::TransactionContext;
use cascade_core::error::Result;
use cascade_core::types::{Column, Key, KeySpace, Row};
use cascade_storage::ShardedStore;
use std::sync::Arc;
use tracing::trace;

/// A notification entry read by a worker transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimedNotification {
    /// Decoded entry
    pub entry: NotificationEntry,
    /// Commit version that last marked the entry
    pub version: u64,
}

/// Notification entries of one database
#[derive(Debug, Clone)]
pub struct NotificationStore {
    registry: Arc<ObserverRegistry>,
}

impl NotificationStore {
    /// Create a store that marks columns bound in `registry`
    pub fn new(registry: Arc<ObserverRegistry>) -> Self {
        Self { registry }
    }

    /// The registry consulted when marking
    pub fn registry(&self) -> &Arc<ObserverRegistry> {
        &self.registry
    }

    /// Upsert a notification for every observed data cell `txn` writes or deletes
    ///
    /// Called just before commit. Returns the number of entries marked.
    ///
    /// STRONG entries are ordinary writes, so a writer racing the worker that
    /// retires the entry conflicts. WEAK entries are unvalidated writes: the
    /// newest mark wins and never aborts the writer.
    pub fn mark_pending(&self, txn: &mut TransactionContext) -> Result<usize> {
        if self.registry.is_empty() {
            return Ok(0);
        }

        let marks: Vec<(Key, NotificationEntry)> = txn
            .written_keys()
            .filter(|key| key.is_data())
            .filter_map(|key| {
                self.registry.lookup(&key.column).map(|binding| {
                    (
                        Key::notification(key.row.clone(), key.column.clone()),
                        NotificationEntry::new(binding.strength()),
                    )
                })
            })
            .collect();

        for (key, entry) in &marks {
            trace!(txn_id = txn.txn_id, key = %key, strength = %entry.strength, "Marking notification");
            let value = entry.encode()?;
            if entry.strength.is_strong() {
                txn.put(key.clone(), value)?;
            } else {
                txn.put_unvalidated(key.clone(), value)?;
            }
        }
        Ok(marks.len())
    }

    /// Read the entry for (row, column) without tracking it
    ///
    /// Returns `None` if no notification is pending in the snapshot.
    pub fn claim(
        &self,
        txn: &mut TransactionContext,
        row: &Row,
        column: &Column,
    ) -> Result<Option<ClaimedNotification>> {
        let key = Key::notification(row.clone(), column.clone());
        Ok(txn.get_untracked(&key)?.map(|vv| ClaimedNotification {
            entry: NotificationEntry::decode_or_strong(&vv.value),
            version: vv.version,
        }))
    }

    /// Add a claimed entry to the read set so a concurrent re-mark conflicts
    pub fn track(
        &self,
        txn: &mut TransactionContext,
        row: &Row,
        column: &Column,
        claimed: &ClaimedNotification,
    ) -> Result<()> {
        txn.record_read(Key::notification(row.clone(), column.clone()), claimed.version)
    }

    /// Delete the entry for (row, column) in `txn`; a no-op if absent
    pub fn clear(&self, txn: &mut TransactionContext, row: &Row, column: &Column) -> Result<()> {
        txn.delete(Key::notification(row.clone(), column.clone()))
    }

    /// Delete the entry only if it is still the one marked at `version`
    ///
    /// The read is tracked, so a re-mark committed before `txn` makes the
    /// commit conflict. Returns whether a delete was buffered.
    pub fn clear_if_unchanged(
        &self,
        txn: &mut TransactionContext,
        row: &Row,
        column: &Column,
        version: u64,
    ) -> Result<bool> {
        let key = Key::notification(row.clone(), column.clone());
        match txn.get_versioned(&key)? {
            Some(vv) if vv.version == version => {
                txn.delete(key)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Pending entries at the store's newest version, in key order
    pub fn list_pending(&self, store: &ShardedStore) -> Vec<(Row, Column)> {
        store
            .list_space_at(KeySpace::Notification, None, usize::MAX, store.version())
            .into_iter()
            .map(|(key, _)| (key.row, key.column))
            .collect()
    }

    /// Number of pending entries at the store's newest version
    pub fn pending_count(&self, store: &ShardedStore) -> usize {
        store.count_live(KeySpace::Notification)
    }
}
