//! Persistence
//!
//! Durable storage for player stats, game history and earned achievements.

pub mod snapshot;

pub use snapshot::{Snapshot, SnapshotStore, StorageError, SNAPSHOT_VERSION};
