//! JSON Snapshot Storage
//!
//! Whole-state snapshots of players, games and earned achievements.
//! Writes go to a sibling temp file first and are renamed into place, so a
//! crash mid-write leaves the previous snapshot intact.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::attest::store::AchievementRecord;
use crate::game::stats::{GameRecord, PlayerStats};

/// Snapshot format version.
pub const SNAPSHOT_VERSION: u8 = 1;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem failure.
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot could not be encoded or decoded.
    #[error("snapshot format error: {0}")]
    Format(#[from] serde_json::Error),

    /// Snapshot written by an unknown format version.
    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u8),
}

impl StorageError {
    /// I/O failures are transient; format problems are not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StorageError::Io(_))
    }
}

/// Persisted state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Format version.
    pub version: u8,
    /// Player totals.
    pub players: Vec<PlayerStats>,
    /// Game history.
    pub games: Vec<GameRecord>,
    /// Earned achievements.
    pub achievements: Vec<AchievementRecord>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            players: Vec::new(),
            games: Vec::new(),
            achievements: Vec::new(),
        }
    }
}

/// Snapshot file on disk.
pub struct SnapshotStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl SnapshotStore {
    /// Store backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the snapshot, or an empty one if the file does not exist yet.
    pub async fn load(&self) -> Result<Snapshot, StorageError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("no snapshot at {}, starting empty", self.path.display());
                return Ok(Snapshot::default());
            }
            Err(e) => return Err(e.into()),
        };

        let snapshot: Snapshot = serde_json::from_slice(&bytes)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(StorageError::UnsupportedVersion(snapshot.version));
        }

        info!(
            "loaded snapshot: {} players, {} games, {} achievements",
            snapshot.players.len(),
            snapshot.games.len(),
            snapshot.achievements.len()
        );
        Ok(snapshot)
    }

    /// Write a snapshot produced by `build`.
    ///
    /// `build` runs while the write lock is held, so concurrent saves are
    /// applied in the order their snapshots were taken.
    pub async fn save_with<F, Fut>(&self, build: F) -> Result<(), StorageError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Snapshot>,
    {
        let _guard = self.write_lock.lock().await;
        let snapshot = build().await;
        self.write(&snapshot).await
    }

    /// Write a snapshot.
    pub async fn save(&self, snapshot: &Snapshot) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        self.write(snapshot).await
    }

    async fn write(&self, snapshot: &Snapshot) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec_pretty(snapshot)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        debug!("snapshot written to {} ({} bytes)", self.path.display(), bytes.len());
        Ok(())
    }
}
