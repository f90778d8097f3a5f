//! Storage layer for cascade
//!
//! This crate implements the multi-version backend with:
//! - ShardedStore: DashMap-by-row storage holding per-key version chains
//! - VersionChain: ascending committed versions with tombstones
//! - KeyIndex: ordered keys of the notification space for batched listing
//! - VersionedSnapshot: O(1) point-in-time views
//! - Version pruning below a reader watermark

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod chain;
pub mod index;
pub mod sharded;
pub mod snapshot;

pub use chain::{StoredVersion, VersionChain};
pub use index::KeyIndex;
pub use sharded::{PruneStats, Shard, ShardedStore};
pub use snapshot::VersionedSnapshot;
