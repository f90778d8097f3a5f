//! Observers that write the column they observe

use crate::*;

#[test]
fn test_export_runs_once_then_converges() {
    let sink = Arc::new(MemorySink::new());
    let db = exporting_db(ExportingObserver::new(Arc::clone(&sink)));
    let row = Row::from("r1");

    write_counts(&db, &row, 3, Some(3));

    db.run_worker().unwrap();
    assert_eq!(sink.drain(), vec![3]);
    assert!(db.pending_notifications().is_empty());

    db.run_worker().unwrap();
    assert!(sink.drain().is_empty());
}

#[test]
fn test_coalesced_count_is_reexported() {
    let sink = Arc::new(MemorySink::new());
    let db = exporting_db(ExportingObserver::new(Arc::clone(&sink)));
    let row = Row::from("r1");

    write_counts(&db, &row, 3, Some(3));
    db.run_worker().unwrap();
    sink.drain();

    let mut txn = db.begin();
    assert_eq!(get_int(&mut txn, &row, &export_count()).unwrap(), None);
    drop(txn);

    write_counts(&db, &row, 4, Some(4));
    write_counts(&db, &row, 5, None);

    db.run_worker().unwrap();
    assert_eq!(sink.drain(), vec![4, 5]);

    db.run_worker().unwrap();
    assert!(sink.drain().is_empty());
    assert!(db.pending_notifications().is_empty());
}

#[test]
fn test_self_write_leaves_notification_pending() {
    let sink = Arc::new(MemorySink::new());
    let db = exporting_db(ExportingObserver::new(Arc::clone(&sink)));
    let row = Row::from("r1");

    write_counts(&db, &row, 5, Some(4));

    // One pass: exports 4 and rewrites export:count to 5
    let stats = db.run_once().unwrap();
    assert_eq!(stats.processed, 1);
    assert_eq!(sink.drain(), vec![4]);
    assert_eq!(db.pending_notifications(), vec![(row.clone(), export_count())]);
    assert_eq!(db.get(&row, &export_count()), Some(Value::from("5")));
}

#[test]
fn test_rows_converge_independently() {
    let sink = Arc::new(MemorySink::new());
    let db = exporting_db(ExportingObserver::new(Arc::clone(&sink)));

    for i in 0..10 {
        write_counts(&db, &Row::from(format!("row{}", i)), i, Some(i));
    }

    db.run_worker().unwrap();
    let mut exports = sink.drain();
    exports.sort_unstable();
    assert_eq!(exports, (0..10).collect::<Vec<_>>());
    assert!(db.pending_notifications().is_empty());
}

#[test]
fn test_unobserved_write_does_not_trigger() {
    let sink = Arc::new(MemorySink::new());
    let db = exporting_db(ExportingObserver::new(Arc::clone(&sink)));
    let row = Row::from("r1");

    write_counts(&db, &row, 7, None);

    assert!(db.pending_notifications().is_empty());
    let stats = db.run_worker().unwrap();
    assert_eq!(stats.scanned, 0);
    assert!(sink.is_empty());
}
