//! WEAK notifications

use crate::*;

#[test]
fn test_weak_export_converges() {
    let sink = Arc::new(MemorySink::new());
    let db = exporting_db(ExportingObserver::weak(Arc::clone(&sink)));
    let row = Row::from("r1");

    write_counts(&db, &row, 3, Some(3));

    db.run_worker().unwrap();
    assert_eq!(sink.drain(), vec![3]);
    assert!(db.pending_notifications().is_empty());

    db.run_worker().unwrap();
    assert!(sink.drain().is_empty());
}

#[test]
fn test_weak_writes_collapse_to_latest() {
    let sink = Arc::new(MemorySink::new());
    let db = exporting_db(ExportingObserver::weak(Arc::clone(&sink)));
    let row = Row::from("r1");

    write_counts(&db, &row, 1, Some(1));
    write_counts(&db, &row, 2, Some(2));
    write_counts(&db, &row, 3, Some(3));
    assert_eq!(db.pending_notifications().len(), 1);

    db.run_worker().unwrap();
    assert_eq!(sink.drain(), vec![3]);
}

#[test]
fn test_weak_self_notification() {
    let sink = Arc::new(MemorySink::new());
    let db = exporting_db(ExportingObserver::weak(Arc::clone(&sink)));
    let row = Row::from("r1");

    write_counts(&db, &row, 5, Some(4));

    db.run_worker().unwrap();
    assert_eq!(sink.drain(), vec![4, 5]);
    assert!(db.pending_notifications().is_empty());
}

#[test]
fn test_weak_notification_does_not_block_writers() {
    let sink = Arc::new(MemorySink::new());
    let db = exporting_db(ExportingObserver::weak(Arc::clone(&sink)));
    let row = Row::from("r1");

    write_counts(&db, &row, 1, Some(1));

    // A writer that started before the worker still commits its data write
    let mut writer = db.begin();
    writer.set(&row, &stat_count(), "9").unwrap();

    db.run_worker().unwrap();
    writer.commit().unwrap();

    assert_eq!(db.get(&row, &stat_count()), Some(Value::from("9")));
}

/// WEAK observer on `export:count` that copies it into `stat:count`
struct CountMirror;

impl Observer for CountMirror {
    fn observed_column(&self) -> ObservedColumn {
        ObservedColumn::weak(export_count())
    }

    fn process(
        &self,
        txn: &mut Transaction<'_>,
        row: &Row,
        column: &Column,
    ) -> std::result::Result<(), ObserverError> {
        if let Some(value) = txn.get(row, column)? {
            txn.set(row, &stat_count(), value)?;
        }
        Ok(())
    }
}

#[test]
fn test_weak_retirement_does_not_abort_observed_writer() {
    let db = Cascade::builder()
        .observer(CountMirror)
        .config(EngineConfig::testing())
        .build()
        .unwrap();
    let row = Row::from("r1");

    db.transaction(|txn| txn.set(&row, &export_count(), "1")).unwrap();

    // Writes the observed column from a snapshot older than the retirement
    let mut writer = db.begin();
    writer.set(&row, &export_count(), "2").unwrap();

    db.run_worker().unwrap();
    assert_eq!(db.get(&row, &stat_count()), Some(Value::from("1")));
    assert!(db.pending_notifications().is_empty());

    writer.commit().unwrap();
    assert_eq!(db.pending_notifications(), vec![(row.clone(), export_count())]);

    db.run_worker().unwrap();
    assert_eq!(db.get(&row, &stat_count()), Some(Value::from("2")));
    assert!(db.pending_notifications().is_empty());
}
