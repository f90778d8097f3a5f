//! Work items that no longer need processing

use crate::*;
use cascade_engine::{ObserverExecutor, RetryPolicy, WorkItem};

#[test]
fn test_unregistered_observer_drops_notification() {
    let sink = Arc::new(MemorySink::new());
    let db = exporting_db(ExportingObserver::new(Arc::clone(&sink)));
    let row = Row::from("r1");
    write_counts(&db, &row, 3, Some(3));
    assert_eq!(db.pending_notifications().len(), 1);

    // Reopen the same data with no observers bound
    let reopened = Cascade::builder()
        .store(Arc::clone(db.store()))
        .config(EngineConfig::testing())
        .build()
        .unwrap();

    let stats = reopened.run_worker().unwrap();
    assert_eq!(stats.stale, 1);
    assert_eq!(stats.processed, 0);
    assert!(reopened.pending_notifications().is_empty());
    assert!(sink.is_empty());
    assert_eq!(reopened.get(&row, &export_count()), Some(Value::from("3")));
}

#[test]
fn test_already_retired_item_is_noop() {
    let sink = Arc::new(MemorySink::new());
    let db = exporting_db(ExportingObserver::new(Arc::clone(&sink)));
    let row = Row::from("r1");
    write_counts(&db, &row, 3, Some(3));

    let item = WorkItem {
        row: row.clone(),
        column: export_count(),
        version: 0,
    };
    db.run_worker().unwrap();
    sink.drain();

    // A worker holding a work item from an earlier scan
    let executor = ObserverExecutor::new(Arc::clone(db.database()), RetryPolicy::immediate(3));
    let mut stats = WorkerStats::default();
    let outcome = executor.process(&item, &mut stats).unwrap();

    assert_eq!(outcome, ProcessOutcome::Stale(StaleReason::NotificationAbsent));
    assert_eq!(stats.stale, 1);
    assert!(sink.is_empty(), "observer must not run");
}
