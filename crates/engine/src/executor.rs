//! Observer execution
//!
//! For one pending (row, column):
//!
//! 1. Open a transaction T
//! 2. Read the notification entry in T; if gone, another worker retired it
//! 3. Resolve the observer; if none is bound any more, drop the entry
//! 4. Run the observer with T
//! 5. STRONG: delete the entry in T, so retirement commits with the effects
//! 6. Commit T; on conflict or observer error, back off and start over
//!
//! A store error that is not a conflict, whether from T itself or propagated
//! by the observer, drops T and fails the work item with the entry pending.
//!
//! WEAK entries are not deleted in T. After T commits they are deleted by a
//! second transaction, and only if nobody re-marked them in between.

use crate::database::Database;
use crate::error::{EngineError, Result};
use crate::retry::RetryPolicy;
use crate::scanner::WorkItem;
use crate::worker::WorkerStats;
use cascade_core::types::{Column, Row};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Why a work item needed no processing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleReason {
    /// The entry was already retired
    NotificationAbsent,
    /// No observer is bound to the column; the entry was dropped
    ObserverUnregistered,
}

/// Result of handling one work item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// The observer's transaction committed
    Processed {
        /// Attempts used, including the successful one
        attempts: u32,
        /// Commit version of the observer transaction
        commit_version: u64,
    },
    /// Nothing to do
    Stale(StaleReason),
    /// Every attempt failed; the entry is still pending
    Exhausted {
        /// Attempts made
        attempts: u32,
        /// Rendered error of the last attempt
        last_error: String,
    },
}

impl ProcessOutcome {
    /// Check for [`ProcessOutcome::Processed`]
    pub fn is_processed(&self) -> bool {
        matches!(self, ProcessOutcome::Processed { .. })
    }
}

enum Attempt {
    Committed {
        commit_version: u64,
        weak_claim: Option<u64>,
    },
    Stale(StaleReason),
    Conflict(String),
    ObserverFailed(String),
}

/// Runs observers for work items with bounded retries
pub struct ObserverExecutor {
    db: Arc<Database>,
    retry: RetryPolicy,
}

impl ObserverExecutor {
    /// Create an executor over `db`
    pub fn new(db: Arc<Database>, retry: RetryPolicy) -> Self {
        Self { db, retry }
    }

    /// The retry policy in use
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Handle one work item, recording counters into `stats`
    ///
    /// Conflicts and observer errors are retried. Only store failures that
    /// are not conflicts return `Err`; the entry is left pending then.
    pub fn process(&self, item: &WorkItem, stats: &mut WorkerStats) -> Result<ProcessOutcome> {
        let mut last_error = String::new();
        let mut attempts = 0;

        while attempts < self.retry.max_attempts {
            attempts += 1;
            match self.attempt(&item.row, &item.column)? {
                Attempt::Committed {
                    commit_version,
                    weak_claim,
                } => {
                    if let Some(version) = weak_claim {
                        self.retire_weak(&item.row, &item.column, version)?;
                    }
                    stats.processed += 1;
                    debug!(
                        row = %item.row,
                        column = %item.column,
                        attempt = attempts,
                        commit_version,
                        "Notification processed"
                    );
                    return Ok(ProcessOutcome::Processed {
                        attempts,
                        commit_version,
                    });
                }
                Attempt::Stale(reason) => {
                    stats.stale += 1;
                    debug!(row = %item.row, column = %item.column, ?reason, "Stale work item");
                    return Ok(ProcessOutcome::Stale(reason));
                }
                Attempt::Conflict(message) => {
                    stats.conflicts += 1;
                    debug!(
                        row = %item.row,
                        column = %item.column,
                        attempt = attempts,
                        %message,
                        "Observer transaction conflicted"
                    );
                    last_error = message;
                }
                Attempt::ObserverFailed(message) => {
                    stats.observer_errors += 1;
                    warn!(
                        row = %item.row,
                        column = %item.column,
                        attempt = attempts,
                        error = %message,
                        "Observer failed"
                    );
                    last_error = message;
                }
            }

            if let Some(backoff) = self.retry.backoff_after(attempts) {
                if !backoff.is_zero() {
                    std::thread::sleep(backoff);
                }
            }
        }

        stats.exhausted += 1;
        error!(
            row = %item.row,
            column = %item.column,
            attempts,
            last_error = %last_error,
            "Retries exhausted, notification left pending"
        );
        Ok(ProcessOutcome::Exhausted {
            attempts,
            last_error,
        })
    }

    fn attempt(&self, row: &Row, column: &Column) -> Result<Attempt> {
        let notifications = self.db.notifications();
        let mut txn = self.db.begin();

        let Some(claimed) = notifications.claim(txn.context_mut(), row, column)? else {
            return Ok(Attempt::Stale(StaleReason::NotificationAbsent));
        };

        let Some(binding) = self.db.registry().lookup(column).cloned() else {
            notifications.track(txn.context_mut(), row, column, &claimed)?;
            notifications.clear(txn.context_mut(), row, column)?;
            match txn.commit() {
                Ok(_) => {
                    warn!(row = %row, column = %column, "No observer bound, notification dropped");
                    return Ok(Attempt::Stale(StaleReason::ObserverUnregistered));
                }
                Err(e) if e.is_conflict() => return Ok(Attempt::Conflict(e.to_string())),
                Err(e) => return Err(EngineError::Store(e)),
            }
        };

        let strong = claimed.entry.strength.is_strong();
        if strong {
            notifications.track(txn.context_mut(), row, column, &claimed)?;
        }

        if let Err(e) = binding.observer().process(&mut txn, row, column) {
            return match e.into_store_error() {
                Ok(store) if store.is_conflict() => Ok(Attempt::Conflict(store.to_string())),
                Ok(store) => Err(EngineError::Store(store)),
                Err(e) => Ok(Attempt::ObserverFailed(format!(
                    "{}: {}",
                    binding.observer().name(),
                    e
                ))),
            };
        }

        if strong {
            notifications.clear(txn.context_mut(), row, column)?;
        }

        match txn.commit() {
            Ok(commit_version) => Ok(Attempt::Committed {
                commit_version,
                weak_claim: (!strong).then_some(claimed.version),
            }),
            Err(e) if e.is_conflict() => Ok(Attempt::Conflict(e.to_string())),
            Err(e) => Err(EngineError::Store(e)),
        }
    }

    /// Delete a WEAK entry if it is still the one that was processed
    fn retire_weak(&self, row: &Row, column: &Column, version: u64) -> Result<()> {
        let mut txn = self.db.begin();
        let notifications = self.db.notifications();
        if !notifications.clear_if_unchanged(txn.context_mut(), row, column, version)? {
            debug!(row = %row, column = %column, "WEAK notification re-marked, left pending");
            return Ok(());
        }
        match txn.commit() {
            Ok(_) => Ok(()),
            Err(e) if e.is_conflict() => {
                debug!(row = %row, column = %column, "WEAK retirement conflicted, left pending");
                Ok(())
            }
            Err(e) => Err(EngineError::Store(e)),
        }
    }
}

impl std::fmt::Debug for ObserverExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverExecutor")
            .field("retry", &self.retry)
            .finish()
    }
}
