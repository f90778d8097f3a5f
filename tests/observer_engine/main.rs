//! Observer Engine Test Suite
//!
//! End-to-end tests for notification-driven observers: marking on commit,
//! scanning, claiming, processing, retirement and worker scheduling.
//!
//! ## Running Tests
//!
//! ```bash
//! # Run all observer engine tests
//! cargo test --test observer_engine
//!
//! # Run the self-notification scenarios only
//! cargo test --test observer_engine self_notification::
//! ```

use std::sync::Arc;

use cascadedb::prelude::*;

// Test modules
pub mod config;
pub mod conflicts;
pub mod gc;
pub mod self_notification;
pub mod stale;
pub mod weak;
pub mod workers;

// =============================================================================
// SHARED TEST UTILITIES
// =============================================================================

/// `stat:count`, the value being exported
pub fn stat_count() -> Column {
    Column::new("stat", "count")
}

/// `export:check`, touched whenever an export is requested
pub fn export_check() -> Column {
    Column::new("export", "check")
}

/// `export:count`, the value awaiting export; observed
pub fn export_count() -> Column {
    Column::new("export", "count")
}

/// Read an integer cell
pub fn get_int(txn: &mut Transaction<'_>, row: &Row, column: &Column) -> cascadedb::Result<Option<i64>> {
    let value = txn.get(row, column)?;
    Ok(value.and_then(|v| v.as_str().and_then(|s| s.parse().ok())))
}

/// Write an integer cell
pub fn set_int(
    txn: &mut Transaction<'_>,
    row: &Row,
    column: &Column,
    n: i64,
) -> std::result::Result<(), cascadedb::ObserverError> {
    txn.set(row, column, n.to_string())?;
    Ok(())
}

/// Exports `export:count` and keeps re-exporting until it matches `stat:count`
///
/// Once the exported value equals the current count, `export:count` is
/// deleted and the observer stops writing.
pub struct ExportingObserver {
    sink: Arc<MemorySink<i64>>,
    strength: NotificationType,
}

impl ExportingObserver {
    /// STRONG exporter writing to `sink`
    pub fn new(sink: Arc<MemorySink<i64>>) -> Self {
        Self {
            sink,
            strength: NotificationType::Strong,
        }
    }

    /// WEAK exporter writing to `sink`
    pub fn weak(sink: Arc<MemorySink<i64>>) -> Self {
        Self {
            sink,
            strength: NotificationType::Weak,
        }
    }
}

impl Observer for ExportingObserver {
    fn observed_column(&self) -> ObservedColumn {
        ObservedColumn::new(export_count(), self.strength)
    }

    fn process(
        &self,
        txn: &mut Transaction<'_>,
        row: &Row,
        _column: &Column,
    ) -> std::result::Result<(), ObserverError> {
        let current = get_int(txn, row, &stat_count())?;
        let exported = get_int(txn, row, &export_count())?;

        if let Some(exported) = exported {
            self.sink.emit(exported);

            match current {
                Some(current) if current != exported => {
                    set_int(txn, row, &export_count(), current)?;
                    txn.set(row, &export_check(), "")?;
                }
                _ => txn.delete(row, &export_count())?,
            }
        }
        Ok(())
    }
}

/// Database with one exporter and test-sized workers
pub fn exporting_db(observer: ExportingObserver) -> Cascade {
    cascadedb::logging::init("warn");
    Cascade::builder()
        .observer(observer)
        .config(EngineConfig::testing())
        .build()
        .expect("Failed to build database")
}

/// Commit `stat:count`, `export:check` and optionally `export:count` for `row`
pub fn write_counts(db: &Cascade, row: &Row, stat: i64, export: Option<i64>) {
    db.transaction(|txn| {
        txn.set(row, &stat_count(), stat.to_string())?;
        txn.set(row, &export_check(), "")?;
        if let Some(export) = export {
            txn.set(row, &export_count(), export.to_string())?;
        }
        Ok(())
    })
    .expect("Failed to write counts");
}
