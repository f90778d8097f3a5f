//! Conflict retries, observer errors and exhausted work items

use crate::*;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

fn body() -> Column {
    Column::new("doc", "body")
}

fn copy() -> Column {
    Column::new("doc", "copy")
}

/// Copies `doc:body` into `doc:copy`
///
/// On its first call it commits a concurrent rewrite of `doc:body` through
/// `db`, so that first attempt must conflict.
struct InterferingCopier {
    db: Mutex<Option<Arc<cascade_engine::Database>>>,
    calls: AtomicU32,
}

impl Observer for InterferingCopier {
    fn observed_column(&self) -> ObservedColumn {
        ObservedColumn::strong(body())
    }

    fn process(
        &self,
        txn: &mut Transaction<'_>,
        row: &Row,
        column: &Column,
    ) -> std::result::Result<(), ObserverError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            if let Some(db) = self.db.lock().as_ref() {
                db.transaction(|other| other.set(row, &body(), "v2"))?;
            }
        }
        let value = txn.get(row, column)?.unwrap_or_default();
        txn.set(row, &copy(), value)?;
        Ok(())
    }
}

/// Fails every call
struct AlwaysFails;

impl Observer for AlwaysFails {
    fn observed_column(&self) -> ObservedColumn {
        ObservedColumn::strong(body())
    }

    fn process(
        &self,
        _txn: &mut Transaction<'_>,
        row: &Row,
        _column: &Column,
    ) -> std::result::Result<(), ObserverError> {
        Err(ObserverError::msg(format!("cannot export {}", row)))
    }
}

/// Fails the first `n` calls
struct FailsFirst {
    remaining: AtomicU32,
}

impl Observer for FailsFirst {
    fn observed_column(&self) -> ObservedColumn {
        ObservedColumn::strong(body())
    }

    fn process(
        &self,
        txn: &mut Transaction<'_>,
        row: &Row,
        column: &Column,
    ) -> std::result::Result<(), ObserverError> {
        let left = self.remaining.load(Ordering::SeqCst);
        if left > 0 {
            self.remaining.store(left - 1, Ordering::SeqCst);
            txn.set(row, &copy(), "partial")?;
            return Err(ObserverError::msg("transient"));
        }
        let value = txn.get(row, column)?.unwrap_or_default();
        txn.set(row, &copy(), value)?;
        Ok(())
    }
}

fn write_body(db: &Cascade, row: &Row, value: &str) {
    db.transaction(|txn| txn.set(row, &body(), value)).unwrap();
}

// =============================================================================
// Conflicts
// =============================================================================

#[test]
fn test_conflicting_write_is_retried_with_fresh_snapshot() {
    let observer = Arc::new(InterferingCopier {
        db: Mutex::new(None),
        calls: AtomicU32::new(0),
    });
    let registry = cascade_engine::ObserverRegistry::builder()
        .register_arc(observer.clone())
        .build()
        .unwrap();
    let db = Arc::new(cascade_engine::Database::new(registry));
    *observer.db.lock() = Some(Arc::clone(&db));

    let row = Row::from("r1");
    db.transaction(|txn| txn.set(&row, &body(), "v1")).unwrap();

    let pool = WorkerPool::new(Arc::clone(&db), EngineConfig::testing()).unwrap();
    let stats = pool.run_until_idle().unwrap();

    assert!(stats.conflicts >= 1);
    assert_eq!(stats.exhausted, 0);
    assert_eq!(db.get(&row, &copy()), Some(Value::from("v2")));
    assert_eq!(db.pending_count(), 0);

    *observer.db.lock() = None;
}

// =============================================================================
// Observer errors
// =============================================================================

#[test]
fn test_observer_error_writes_nothing_and_retries() {
    let db = Cascade::builder()
        .observer(FailsFirst {
            remaining: AtomicU32::new(2),
        })
        .config(EngineConfig::testing())
        .build()
        .unwrap();
    let row = Row::from("r1");
    write_body(&db, &row, "hello");

    let stats = db.run_once().unwrap();
    assert_eq!(stats.observer_errors, 2);
    assert_eq!(stats.processed, 1);
    assert_eq!(db.get(&row, &copy()), Some(Value::from("hello")));
}

#[test]
fn test_exhausted_item_stays_pending() {
    let db = Cascade::builder()
        .observer(AlwaysFails)
        .config(EngineConfig::testing().with_max_attempts(3))
        .build()
        .unwrap();
    let row = Row::from("r1");
    write_body(&db, &row, "hello");

    let stats = db.run_once().unwrap();
    assert_eq!(stats.exhausted, 1);
    assert_eq!(stats.observer_errors, 3);
    assert_eq!(db.pending_notifications(), vec![(row.clone(), body())]);

    // Still eligible on the next pass
    let stats = db.run_once().unwrap();
    assert_eq!(stats.scanned, 1);
    assert_eq!(stats.exhausted, 1);
}

#[test]
fn test_run_worker_reports_not_quiescent() {
    let db = Cascade::builder()
        .observer(AlwaysFails)
        .config(
            EngineConfig::testing()
                .with_max_attempts(1)
                .with_max_idle_passes(3),
        )
        .build()
        .unwrap();
    write_body(&db, &Row::from("r1"), "hello");

    let err = db.run_worker().unwrap_err();
    assert!(matches!(err, cascadedb::Error::NotQuiescent { passes: 3 }));
    assert_eq!(db.pending_notifications().len(), 1);
}

// =============================================================================
// Competing workers
// =============================================================================

#[test]
fn test_competing_pools_process_each_notification_once() {
    let sink = Arc::new(MemorySink::new());
    let db = exporting_db(ExportingObserver::new(Arc::clone(&sink)));
    for i in 0..20 {
        write_counts(&db, &Row::from(format!("row{}", i)), i, Some(i));
    }

    // Two independent pools over one database race for the same partitions
    let other = WorkerPool::new(Arc::clone(db.database()), EngineConfig::testing()).unwrap();
    std::thread::scope(|s| {
        s.spawn(|| db.run_worker().unwrap());
        s.spawn(|| other.run_until_idle().unwrap());
    });
    db.run_worker().unwrap();

    // Effects emitted by an attempt that later conflicts are repeated
    // (at-least-once), but every row is exported and every entry retired
    let mut exports = sink.drain();
    exports.sort_unstable();
    exports.dedup();
    assert_eq!(exports, (0..20).collect::<Vec<_>>());
    assert!(db.pending_notifications().is_empty());
}
