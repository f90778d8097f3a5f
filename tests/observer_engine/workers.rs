//! Worker pool scheduling

use crate::*;
use std::time::{Duration, Instant};

fn wait_until_drained(db: &Cascade, timeout: Duration) {
    let deadline = Instant::now() + timeout;
    while !db.pending_notifications().is_empty() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(2));
    }
}

#[test]
fn test_partitions_spread_work_across_threads() {
    let sink = Arc::new(MemorySink::new());
    let db = Cascade::builder()
        .observer(ExportingObserver::new(Arc::clone(&sink)))
        .config(EngineConfig::testing().with_worker_threads(4))
        .build()
        .unwrap();

    for i in 0..64 {
        write_counts(&db, &Row::from(format!("row{:02}", i)), i, Some(i));
    }

    let first = db.run_once().unwrap();
    assert_eq!(first.scanned, 64);
    assert_eq!(first.processed, 64);

    db.run_worker().unwrap();
    let mut exports = sink.drain();
    exports.sort_unstable();
    assert_eq!(exports, (0..64).collect::<Vec<_>>());
}

#[test]
fn test_single_thread_pool() {
    let sink = Arc::new(MemorySink::new());
    let db = Cascade::builder()
        .observer(ExportingObserver::new(Arc::clone(&sink)))
        .config(EngineConfig::testing().with_worker_threads(1))
        .build()
        .unwrap();

    write_counts(&db, &Row::from("r1"), 2, Some(1));
    db.run_worker().unwrap();
    assert_eq!(sink.drain(), vec![1, 2]);
}

#[test]
fn test_continuous_workers_follow_new_writes() {
    let sink = Arc::new(MemorySink::new());
    let db = exporting_db(ExportingObserver::new(Arc::clone(&sink)));
    let handle = db.start_workers().unwrap();

    write_counts(&db, &Row::from("r1"), 3, Some(3));
    wait_until_drained(&db, Duration::from_secs(10));
    assert_eq!(sink.drain(), vec![3]);

    write_counts(&db, &Row::from("r1"), 5, Some(4));
    wait_until_drained(&db, Duration::from_secs(10));
    assert_eq!(sink.drain(), vec![4, 5]);

    let stats = handle.shutdown().unwrap();
    assert!(stats.processed >= 3);
    assert_eq!(stats.exhausted, 0);
}

#[test]
fn test_shutdown_with_no_work() {
    let db = exporting_db(ExportingObserver::new(Arc::new(MemorySink::new())));
    let handle = db.start_workers().unwrap();
    assert_eq!(handle.running(), db.config().worker_threads);

    let stats = handle.shutdown().unwrap();
    assert_eq!(stats.processed, 0);
}

#[test]
fn test_random_updates_converge_to_latest_count() {
    use rand::seq::SliceRandom;
    use rand::Rng;

    let sink = Arc::new(MemorySink::new());
    let db = Cascade::builder()
        .observer(ExportingObserver::new(Arc::clone(&sink)))
        .config(EngineConfig::testing().with_worker_threads(3))
        .build()
        .unwrap();

    let mut rng = rand::thread_rng();
    let mut rows: Vec<Row> = (0..12).map(|i| Row::from(format!("row{}", i))).collect();
    let mut latest = std::collections::HashMap::new();

    for round in 0..4 {
        rows.shuffle(&mut rng);
        for row in rows.iter().take(8) {
            let count = round * 100 + rng.gen_range(1..100);
            write_counts(&db, row, count, Some(count - 1));
            latest.insert(row.clone(), count);
        }
        db.run_worker().unwrap();
        assert!(db.pending_notifications().is_empty());
    }

    let exported = sink.drain();
    for (row, count) in &latest {
        assert_eq!(db.get(row, &stat_count()), Some(Value::from(count.to_string())));
        assert_eq!(db.get(row, &export_count()), None);
        assert!(exported.contains(count), "{} never exported {}", row, count);
    }
}
