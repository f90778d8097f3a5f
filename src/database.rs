//! Main entry point for Cascade.
//!
//! This module provides the `Cascade` struct: a transactional cell store whose
//! observed columns trigger observers, plus the worker pool that runs them.

use crate::error::{Error, Result};
use cascade_core::{Column, NotificationType, Row, Value};
use cascade_engine::{
    Database, EngineConfig, Observer, ObserverRegistry, ObserverRegistryBuilder, Transaction,
    WorkerHandle, WorkerPool, WorkerStats,
};
use cascade_storage::{PruneStats, ShardedStore};
use std::path::Path;
use std::sync::Arc;

/// The Cascade database.
///
/// Create one with [`Cascade::builder`], registering observers up front.
///
/// # Example
///
/// ```ignore
/// use cascadedb::prelude::*;
///
/// let db = Cascade::builder()
///     .observer(ExportingObserver::new(sink.clone()))
///     .config(EngineConfig::testing())
///     .build()?;
///
/// db.transaction(|txn| txn.set(&row, &export_count, "3"))?;
///
/// // Drain every pending notification
/// db.run_worker()?;
/// ```
pub struct Cascade {
    inner: Arc<Database>,
    workers: WorkerPool,
}

impl Cascade {
    /// Create a builder for database configuration.
    pub fn builder() -> CascadeBuilder {
        CascadeBuilder::new()
    }

    /// Create a database with no observers and default settings.
    pub fn ephemeral() -> Result<Self> {
        Self::builder().build()
    }

    /// Begin a transaction.
    pub fn begin(&self) -> Transaction<'_> {
        self.inner.begin()
    }

    /// Run `f` in a transaction and commit it.
    ///
    /// Conflicts are returned, not retried.
    pub fn transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Transaction<'_>) -> cascade_core::Result<T>,
    {
        self.inner.transaction(f).map_err(Error::from)
    }

    /// Newest committed value of a cell.
    pub fn get(&self, row: &Row, column: &Column) -> Option<Value> {
        self.inner.get(row, column)
    }

    /// Run one scan pass over every partition.
    pub fn run_once(&self) -> Result<WorkerStats> {
        self.workers.run_once().map_err(Error::from)
    }

    /// Run workers until no notification is pending.
    pub fn run_worker(&self) -> Result<WorkerStats> {
        self.workers.run_until_idle().map_err(Error::from)
    }

    /// Start background workers.
    ///
    /// Call [`WorkerHandle::shutdown`] to stop them.
    pub fn start_workers(&self) -> Result<WorkerHandle> {
        self.workers.run_continuously().map_err(Error::from)
    }

    /// Pending (row, column) notifications.
    pub fn pending_notifications(&self) -> Vec<(Row, Column)> {
        self.inner.pending_notifications()
    }

    /// Prune versions no open transaction can read.
    pub fn collect_garbage(&self) -> PruneStats {
        self.inner.collect_garbage()
    }

    /// Engine configuration in use.
    pub fn config(&self) -> &EngineConfig {
        self.workers.config()
    }

    /// The underlying engine database.
    pub fn database(&self) -> &Arc<Database> {
        &self.inner
    }

    /// The underlying store, for reopening with different observers.
    pub fn store(&self) -> &Arc<ShardedStore> {
        self.inner.store()
    }
}

impl std::fmt::Debug for Cascade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cascade")
            .field("database", &self.inner)
            .field("workers", &self.workers)
            .finish()
    }
}

/// Builder for database configuration.
///
/// # Example
///
/// ```ignore
/// let db = Cascade::builder()
///     .observer(MyObserver)
///     .config_file("cascade.toml")?
///     .build()?;
/// ```
pub struct CascadeBuilder {
    registry: ObserverRegistryBuilder,
    config: EngineConfig,
    store: Option<Arc<ShardedStore>>,
}

impl CascadeBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            registry: ObserverRegistry::builder(),
            config: EngineConfig::default(),
            store: None,
        }
    }

    /// Register an observer on the column it declares.
    pub fn observer(mut self, observer: impl Observer + 'static) -> Self {
        self.registry = self.registry.register(observer);
        self
    }

    /// Register an observer on an explicit column.
    pub fn observer_as(
        mut self,
        column: Column,
        strength: NotificationType,
        observer: impl Observer + 'static,
    ) -> Self {
        self.registry = self.registry.register_as(column, strength, observer);
        self
    }

    /// Use `config` for the worker pool.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Load the worker pool configuration from a TOML file.
    pub fn config_file(mut self, path: impl AsRef<Path>) -> Result<Self> {
        self.config = EngineConfig::from_file(path)?;
        Ok(self)
    }

    /// Open over an existing store instead of a fresh one.
    pub fn store(mut self, store: Arc<ShardedStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Build the database.
    ///
    /// Fails if two observers claim one column or the configuration is invalid.
    pub fn build(self) -> Result<Cascade> {
        let registry = self.registry.build()?;
        let mut builder = Database::builder().registry(registry);
        if let Some(store) = self.store {
            builder = builder.store(store);
        }
        let inner = Arc::new(builder.build());
        let workers = WorkerPool::new(Arc::clone(&inner), self.config)?;
        Ok(Cascade { inner, workers })
    }
}

impl Default for CascadeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
