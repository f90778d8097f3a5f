//! Version pruning alongside observers

use crate::*;

#[test]
fn test_gc_after_convergence_keeps_latest_state() {
    let sink = Arc::new(MemorySink::new());
    let db = exporting_db(ExportingObserver::new(Arc::clone(&sink)));
    let row = Row::from("r1");

    for n in 1..=5 {
        write_counts(&db, &row, n, Some(n));
        db.run_worker().unwrap();
    }
    assert_eq!(sink.drain(), vec![1, 2, 3, 4, 5]);

    let stats = db.collect_garbage();
    assert!(stats.versions_removed > 0);

    assert_eq!(db.get(&row, &stat_count()), Some(Value::from("5")));
    assert_eq!(db.get(&row, &export_count()), None);
    assert!(db.pending_notifications().is_empty());

    // Pruned history does not disturb later processing
    write_counts(&db, &row, 6, Some(6));
    db.run_worker().unwrap();
    assert_eq!(sink.drain(), vec![6]);
}

#[test]
fn test_gc_spares_open_transaction() {
    let db = exporting_db(ExportingObserver::new(Arc::new(MemorySink::new())));
    let row = Row::from("r1");

    write_counts(&db, &row, 1, None);
    let mut reader = db.begin();
    write_counts(&db, &row, 2, None);

    db.collect_garbage();
    assert_eq!(get_int(&mut reader, &row, &stat_count()).unwrap(), Some(1));
}
