//! Notification scanner
//!
//! Workers discover pending notifications by scanning the notification key
//! space. The space is split into hash partitions so that concurrent workers
//! mostly see disjoint work; overlapping claims are still safe because the
//! transaction primitive rejects the loser.

use cascade_core::types::{Column, Key, KeySpace, Row};
use cascade_storage::ShardedStore;
use std::collections::VecDeque;
use std::sync::Arc;
use xxhash_rust::xxh3::xxh3_64;

/// One pending (row, column) discovered by a scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    /// Row with the pending notification
    pub row: Row,
    /// Observed column
    pub column: Column,
    /// Version of the entry when scanned
    pub version: u64,
}

/// A slice of the notification key space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partition {
    /// Index of this partition, `< count`
    pub index: usize,
    /// Total number of partitions
    pub count: usize,
}

impl Partition {
    /// Create partition `index` of `count`
    ///
    /// A zero `count` is treated as one partition.
    pub fn new(index: usize, count: usize) -> Self {
        let count = count.max(1);
        Self {
            index: index % count,
            count,
        }
    }

    /// The single partition covering everything
    pub fn all() -> Self {
        Self { index: 0, count: 1 }
    }

    /// Every partition of a `count`-way split
    pub fn split(count: usize) -> Vec<Partition> {
        let count = count.max(1);
        (0..count).map(|index| Partition { index, count }).collect()
    }

    /// Check whether (row, column) falls into this partition
    pub fn contains(&self, row: &Row, column: &Column) -> bool {
        if self.count == 1 {
            return true;
        }
        (partition_hash(row, column) % self.count as u64) as usize == self.index
    }
}

/// Stable hash of a (row, column) pair used for partitioning
pub fn partition_hash(row: &Row, column: &Column) -> u64 {
    let mut buf =
        Vec::with_capacity(row.as_bytes().len() + column.family.len() + column.qualifier.len() + 2);
    buf.extend_from_slice(row.as_bytes());
    buf.push(0);
    buf.extend_from_slice(&column.family);
    buf.push(0);
    buf.extend_from_slice(&column.qualifier);
    xxh3_64(&buf)
}

/// Produces scan passes over the notification space
#[derive(Debug, Clone)]
pub struct NotificationScanner {
    store: Arc<ShardedStore>,
    batch_size: usize,
}

impl NotificationScanner {
    /// Create a scanner fetching `batch_size` entries at a time
    pub fn new(store: Arc<ShardedStore>, batch_size: usize) -> Self {
        Self {
            store,
            batch_size: batch_size.max(1),
        }
    }

    /// Start a pass over `partition` from the beginning of the space
    pub fn pass(&self, partition: Partition) -> ScanPass<'_> {
        ScanPass {
            store: &self.store,
            partition,
            batch_size: self.batch_size,
            resume_after: None,
            buffer: VecDeque::new(),
            done: false,
        }
    }
}

/// One lazy pass over a partition's pending notifications
///
/// Each batch reads the store's newest state and resumes strictly after the
/// last key fetched, so entries created behind the cursor are left for the
/// next pass and entries ahead of it may still be seen. This is not a
/// consistent cut.
pub struct ScanPass<'a> {
    store: &'a ShardedStore,
    partition: Partition,
    batch_size: usize,
    resume_after: Option<Key>,
    buffer: VecDeque<WorkItem>,
    done: bool,
}

impl ScanPass<'_> {
    fn fill(&mut self) {
        while self.buffer.is_empty() && !self.done {
            let batch = self.store.list_space_at(
                KeySpace::Notification,
                self.resume_after.as_ref(),
                self.batch_size,
                self.store.version(),
            );
            if batch.len() < self.batch_size {
                self.done = true;
            }
            if let Some((last, _)) = batch.last() {
                self.resume_after = Some(last.clone());
            }
            let partition = self.partition;
            self.buffer.extend(
                batch
                    .into_iter()
                    .filter(|(key, _)| partition.contains(&key.row, &key.column))
                    .map(|(key, vv)| WorkItem {
                        row: key.row,
                        column: key.column,
                        version: vv.version,
                    }),
            );
        }
    }
}

impl Iterator for ScanPass<'_> {
    type Item = WorkItem;

    fn next(&mut self) -> Option<WorkItem> {
        self.fill();
        self.buffer.pop_front()
    }
}
