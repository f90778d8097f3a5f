//! Database: store, transaction manager and observer bindings
//!
//! Every commit goes through [`Database::commit_context`], which marks
//! notifications for observed cells inside the committing transaction before
//! handing it to the transaction manager. A write and the notification it
//! produces therefore become visible together.
//!
//! # Example
//!
//! ```ignore
//! use cascade_engine::{Database, ObserverRegistry};
//!
//! let registry = ObserverRegistry::builder().register(MyObserver).build()?;
//! let db = Database::new(registry);
//!
//! let mut txn = db.begin();
//! txn.set(&row, &column, "3")?;
//! txn.commit()?;
//! ```

use crate::notification::NotificationStore;
use crate::observer::ObserverRegistry;
use crate::transaction::Transaction;
use cascade_concurrency::{TransactionContext, TransactionManager};
use cascade_core::error::{Error, Result};
use cascade_core::types::{Column, Key, Row};
use cascade_core::value::Value;
use cascade_storage::{PruneStats, ShardedStore};
use std::sync::Arc;
use tracing::{debug, trace};

/// Transactional cell store with observer notifications
pub struct Database {
    store: Arc<ShardedStore>,
    manager: TransactionManager,
    notifications: NotificationStore,
}

impl Database {
    /// Create an empty database with `registry`'s observers
    pub fn new(registry: ObserverRegistry) -> Self {
        Self::builder().registry(registry).build()
    }

    /// Create an empty database with no observers
    pub fn ephemeral() -> Self {
        Self::builder().build()
    }

    /// Create a builder
    pub fn builder() -> DatabaseBuilder {
        DatabaseBuilder::new()
    }

    /// Begin a transaction at the current version
    pub fn begin(&self) -> Transaction<'_> {
        Transaction::new(self, self.manager.begin(&self.store))
    }

    /// Run `f` in a transaction and commit it
    ///
    /// If `f` fails the transaction is discarded and the error returned.
    pub fn transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<T>,
    {
        let mut txn = self.begin();
        let value = f(&mut txn)?;
        txn.commit()?;
        Ok(value)
    }

    /// Mark notifications for `ctx`'s observed writes and commit it
    pub(crate) fn commit_context(&self, ctx: &mut TransactionContext) -> Result<u64> {
        if ctx.is_active() {
            let marked = self.notifications.mark_pending(ctx)?;
            if marked > 0 {
                trace!(txn_id = ctx.txn_id, marked, "Notifications marked");
            }
        }
        self.manager
            .commit(ctx, &*self.store)
            .map_err(Error::from)
    }

    pub(crate) fn abort_context(&self, ctx: &mut TransactionContext, reason: &str) {
        self.manager.abort(ctx, reason);
    }

    /// Newest committed value of a cell, outside any transaction
    pub fn get(&self, row: &Row, column: &Column) -> Option<Value> {
        let key = Key::data(row.clone(), column.clone());
        self.store
            .get_at(&key, self.manager.current_version())
            .map(|vv| vv.value)
    }

    /// Observer bindings
    pub fn registry(&self) -> &Arc<ObserverRegistry> {
        self.notifications.registry()
    }

    /// Notification store
    pub fn notifications(&self) -> &NotificationStore {
        &self.notifications
    }

    /// Underlying store
    pub fn store(&self) -> &Arc<ShardedStore> {
        &self.store
    }

    /// Latest published commit version
    pub fn current_version(&self) -> u64 {
        self.manager.current_version()
    }

    /// Number of transactions holding a snapshot
    pub fn active_transactions(&self) -> usize {
        self.manager.active_count()
    }

    /// Pending (row, column) notifications, in key order
    pub fn pending_notifications(&self) -> Vec<(Row, Column)> {
        self.notifications.list_pending(&self.store)
    }

    /// Number of pending notifications
    pub fn pending_count(&self) -> usize {
        self.notifications.pending_count(&self.store)
    }

    /// Prune versions no open transaction can read
    pub fn collect_garbage(&self) -> PruneStats {
        let watermark = self.manager.low_watermark();
        let stats = self.store.prune(watermark);
        debug!(
            watermark,
            versions_removed = stats.versions_removed,
            keys_removed = stats.keys_removed,
            "Garbage collection finished"
        );
        stats
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("version", &self.current_version())
            .field("observers", &self.registry().len())
            .field("store", &self.store)
            .finish()
    }
}

/// Builder for [`Database`]
#[derive(Default)]
pub struct DatabaseBuilder {
    registry: Option<Arc<ObserverRegistry>>,
    store: Option<Arc<ShardedStore>>,
}

impl DatabaseBuilder {
    /// Create a builder with no observers over a fresh store
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `registry`'s observers
    pub fn registry(mut self, registry: ObserverRegistry) -> Self {
        self.registry = Some(Arc::new(registry));
        self
    }

    /// Use a shared registry
    pub fn shared_registry(mut self, registry: Arc<ObserverRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Open over an existing store instead of a fresh one
    ///
    /// The new database continues from the store's version. Only one
    /// database may commit to a store at a time.
    pub fn store(mut self, store: Arc<ShardedStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Build the database
    pub fn build(self) -> Database {
        let store = self.store.unwrap_or_else(|| Arc::new(ShardedStore::new()));
        let registry = self.registry.unwrap_or_default();
        let manager = TransactionManager::new(store.version());
        debug!(
            version = store.version(),
            observers = registry.len(),
            "Database opened"
        );
        Database {
            store,
            manager,
            notifications: NotificationStore::new(registry),
        }
    }
}
