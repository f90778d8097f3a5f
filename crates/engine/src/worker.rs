//! Worker pool
//!
//! Workers pull work items from their scan partition and hand them to the
//! [`ObserverExecutor`]. With `n` worker threads the notification space is
//! split into `n` hash partitions, one per thread.
//!
//! Three entry points:
//! - [`WorkerPool::run_once`]: one pass over every partition
//! - [`WorkerPool::run_until_idle`]: passes until one finds nothing
//! - [`WorkerPool::run_continuously`]: background threads until shutdown

use crate::config::EngineConfig;
use crate::database::Database;
use crate::error::{EngineError, Result};
use crate::executor::ObserverExecutor;
use crate::scanner::{NotificationScanner, Partition};
use parking_lot::Mutex;
use std::ops::AddAssign;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info};
use uuid::Uuid;

/// Counters for work done by one or more passes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    /// Work items surfaced by scans
    pub scanned: u64,
    /// Items whose observer transaction committed
    pub processed: u64,
    /// Items that needed nothing (already retired or unbound)
    pub stale: u64,
    /// Items that used up their retries
    pub exhausted: u64,
    /// Commit conflicts seen, retried or not
    pub conflicts: u64,
    /// Observer errors seen, retried or not
    pub observer_errors: u64,
}

impl WorkerStats {
    /// Check whether the scans found nothing
    pub fn is_idle(&self) -> bool {
        self.scanned == 0
    }
}

impl AddAssign for WorkerStats {
    fn add_assign(&mut self, other: Self) {
        self.scanned += other.scanned;
        self.processed += other.processed;
        self.stale += other.stale;
        self.exhausted += other.exhausted;
        self.conflicts += other.conflicts;
        self.observer_errors += other.observer_errors;
    }
}

/// Fixed-size pool of observer workers over one database
pub struct WorkerPool {
    id: Uuid,
    config: EngineConfig,
    executor: Arc<ObserverExecutor>,
    scanner: NotificationScanner,
}

impl WorkerPool {
    /// Create a pool; fails if `config` does not validate
    pub fn new(db: Arc<Database>, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let scanner = NotificationScanner::new(Arc::clone(db.store()), config.scan_batch_size);
        let executor = Arc::new(ObserverExecutor::new(db, config.retry_policy()));
        Ok(Self {
            id: Uuid::new_v4(),
            config,
            executor,
            scanner,
        })
    }

    /// Pool ID used in logs
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Configuration in use
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run one scan pass over every partition
    ///
    /// Partitions are processed in parallel, one thread each. Returns the
    /// combined counters, or the first fatal error once every thread is done.
    pub fn run_once(&self) -> Result<WorkerStats> {
        let partitions = Partition::split(self.config.worker_threads);

        let results: Vec<Result<WorkerStats>> = if partitions.len() == 1 {
            vec![run_pass(&self.executor, &self.scanner, partitions[0], None)]
        } else {
            thread::scope(|scope| {
                let mut handles = Vec::with_capacity(partitions.len());
                for partition in &partitions {
                    let name = worker_name(partition.index);
                    let executor = &self.executor;
                    let scanner = &self.scanner;
                    let partition = *partition;
                    let handle = thread::Builder::new()
                        .name(name.clone())
                        .spawn_scoped(scope, move || run_pass(executor, scanner, partition, None))
                        .map_err(|e| spawn_error(&name, e));
                    handles.push((name, handle));
                }
                handles
                    .into_iter()
                    .map(|(name, handle)| {
                        handle?
                            .join()
                            .unwrap_or(Err(EngineError::WorkerPanicked(name)))
                    })
                    .collect()
            })
        };

        let mut total = WorkerStats::default();
        let mut first_error = None;
        for result in results {
            match result {
                Ok(stats) => total += stats,
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }

        if !total.is_idle() {
            info!(
                pool = %self.id,
                scanned = total.scanned,
                processed = total.processed,
                stale = total.stale,
                exhausted = total.exhausted,
                "Worker pass finished"
            );
        }
        Ok(total)
    }

    /// Run passes until one finds no pending notification
    ///
    /// Fails with [`EngineError::NotQuiescent`] after `max_idle_passes`
    /// passes that all found work.
    pub fn run_until_idle(&self) -> Result<WorkerStats> {
        let mut total = WorkerStats::default();
        for pass in 1..=self.config.max_idle_passes {
            let stats = self.run_once()?;
            total += stats;
            if stats.is_idle() {
                debug!(pool = %self.id, passes = pass, "Workers idle");
                return Ok(total);
            }
        }
        Err(EngineError::NotQuiescent {
            passes: self.config.max_idle_passes,
        })
    }

    /// Start `worker_threads` background workers
    ///
    /// Each worker loops over its partition, sleeping `idle_delay` after a
    /// pass that found nothing. A worker that hits a fatal error logs it and
    /// exits; the others keep running.
    pub fn run_continuously(&self) -> Result<WorkerHandle> {
        let stop = Arc::new(AtomicBool::new(false));
        let stats = Arc::new(Mutex::new(WorkerStats::default()));
        let mut threads = Vec::with_capacity(self.config.worker_threads);

        for partition in Partition::split(self.config.worker_threads) {
            let name = worker_name(partition.index);
            let worker = ContinuousWorker {
                name: name.clone(),
                partition,
                executor: Arc::clone(&self.executor),
                scanner: self.scanner.clone(),
                stop: Arc::clone(&stop),
                stats: Arc::clone(&stats),
                idle_delay: self.config.idle_delay(),
            };
            let spawned = thread::Builder::new()
                .name(name.clone())
                .spawn(move || worker.run());
            match spawned {
                Ok(handle) => threads.push((name, handle)),
                Err(e) => {
                    let handle = WorkerHandle {
                        pool: self.id,
                        stop,
                        stats,
                        threads,
                    };
                    let _ = handle.shutdown();
                    return Err(spawn_error(&name, e));
                }
            }
        }

        info!(pool = %self.id, threads = threads.len(), "Worker pool started");
        Ok(WorkerHandle {
            pool: self.id,
            stop,
            stats,
            threads,
        })
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("id", &self.id)
            .field("config", &self.config)
            .finish()
    }
}

/// Control handle for continuously running workers
///
/// Dropping the handle without calling [`shutdown`](Self::shutdown) leaves
/// the workers running until the process exits.
pub struct WorkerHandle {
    pool: Uuid,
    stop: Arc<AtomicBool>,
    stats: Arc<Mutex<WorkerStats>>,
    threads: Vec<(String, JoinHandle<()>)>,
}

impl WorkerHandle {
    /// Counters accumulated so far
    pub fn stats(&self) -> WorkerStats {
        *self.stats.lock()
    }

    /// Number of worker threads still running
    pub fn running(&self) -> usize {
        self.threads.iter().filter(|(_, h)| !h.is_finished()).count()
    }

    /// Stop every worker, wait for them, and return the final counters
    ///
    /// A worker that panicked is reported as [`EngineError::WorkerPanicked`]
    /// after the others have been joined.
    pub fn shutdown(self) -> Result<WorkerStats> {
        self.stop.store(true, Ordering::Release);
        for (_, handle) in &self.threads {
            handle.thread().unpark();
        }

        let mut panicked = None;
        for (name, handle) in self.threads {
            if handle.join().is_err() {
                error!(worker = %name, "Worker thread panicked");
                panicked.get_or_insert(name);
            }
        }

        let stats = *self.stats.lock();
        info!(
            pool = %self.pool,
            processed = stats.processed,
            exhausted = stats.exhausted,
            "Worker pool stopped"
        );
        match panicked {
            Some(name) => Err(EngineError::WorkerPanicked(name)),
            None => Ok(stats),
        }
    }
}

impl std::fmt::Debug for WorkerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerHandle")
            .field("pool", &self.pool)
            .field("threads", &self.threads.len())
            .field("stats", &self.stats())
            .finish()
    }
}

struct ContinuousWorker {
    name: String,
    partition: Partition,
    executor: Arc<ObserverExecutor>,
    scanner: NotificationScanner,
    stop: Arc<AtomicBool>,
    stats: Arc<Mutex<WorkerStats>>,
    idle_delay: std::time::Duration,
}

impl ContinuousWorker {
    fn run(self) {
        debug!(worker = %self.name, partition = self.partition.index, "Worker started");
        while !self.stop.load(Ordering::Acquire) {
            match run_pass(&self.executor, &self.scanner, self.partition, Some(&self.stop)) {
                Ok(pass) => {
                    *self.stats.lock() += pass;
                    if pass.is_idle() {
                        thread::park_timeout(self.idle_delay);
                    }
                }
                Err(e) => {
                    error!(worker = %self.name, error = %e, "Worker stopped on fatal error");
                    return;
                }
            }
        }
        debug!(worker = %self.name, "Worker stopped");
    }
}

/// Scan one partition once, processing every item found
///
/// Stops early, between items, once `stop` is set.
fn run_pass(
    executor: &ObserverExecutor,
    scanner: &NotificationScanner,
    partition: Partition,
    stop: Option<&AtomicBool>,
) -> Result<WorkerStats> {
    let mut stats = WorkerStats::default();
    for item in scanner.pass(partition) {
        if stop.map_or(false, |s| s.load(Ordering::Acquire)) {
            break;
        }
        stats.scanned += 1;
        executor.process(&item, &mut stats)?;
    }
    Ok(stats)
}

fn worker_name(index: usize) -> String {
    format!("cascade-worker-{}", index)
}

fn spawn_error(name: &str, e: std::io::Error) -> EngineError {
    EngineError::Store(cascade_core::Error::Internal(format!(
        "failed to spawn {}: {}",
        name, e
    )))
}
