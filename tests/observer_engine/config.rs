//! Building a database from configuration

use crate::*;
use std::io::Write;

#[test]
fn test_config_file_is_applied() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "worker_threads = 3").unwrap();
    writeln!(file, "max_attempts = 7").unwrap();

    let db = Cascade::builder()
        .config_file(file.path())
        .unwrap()
        .build()
        .unwrap();
    assert_eq!(db.config().worker_threads, 3);
    assert_eq!(db.config().max_attempts, 7);
    assert_eq!(db.config().scan_batch_size, 256);
}

#[test]
fn test_invalid_config_file_is_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "worker_threads = 0").unwrap();

    let err = Cascade::builder().config_file(file.path()).err().unwrap();
    assert!(matches!(err, cascadedb::Error::Configuration(_)));
}

#[test]
fn test_duplicate_observer_is_rejected() {
    let sink = Arc::new(MemorySink::new());
    let err = Cascade::builder()
        .observer(ExportingObserver::new(Arc::clone(&sink)))
        .observer(ExportingObserver::weak(sink))
        .build()
        .unwrap_err();
    assert!(matches!(err, cascadedb::Error::Configuration(_)));
}

#[test]
fn test_observer_as_binds_explicit_column() {
    let sink = Arc::new(MemorySink::new());
    let db = Cascade::builder()
        .observer_as(
            stat_count(),
            NotificationType::Strong,
            ExportingObserver::new(Arc::clone(&sink)),
        )
        .config(EngineConfig::testing())
        .build()
        .unwrap();
    let row = Row::from("r1");

    write_counts(&db, &row, 2, None);
    assert_eq!(db.pending_notifications(), vec![(row, stat_count())]);
}
