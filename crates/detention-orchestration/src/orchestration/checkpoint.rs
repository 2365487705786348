//! # Batch Checkpoints
//!
//! Progress snapshot written after every chunk so an interrupted run can
//! resume without reprocessing. A checkpoint is discarded (and cleared) when
//! its schema version does not match or it is older than the freshness
//! ceiling.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use detention_shared::models::ReportEntry;

/// Bumped whenever the persisted layout changes
pub const CHECKPOINT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("Checkpoint I/O failed for {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Checkpoint serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchCheckpoint {
    pub schema_version: u32,
    pub run_id: Uuid,
    pub order_ids: Vec<String>,
    pub chunk_index: usize,
    pub processed: BTreeSet<String>,
    pub failed: BTreeSet<String>,
    pub report: Vec<ReportEntry>,
    pub saved_at: DateTime<Utc>,
}

impl BatchCheckpoint {
    pub fn new(run_id: Uuid, order_ids: Vec<String>) -> Self {
        Self {
            schema_version: CHECKPOINT_SCHEMA_VERSION,
            run_id,
            order_ids,
            chunk_index: 0,
            processed: BTreeSet::new(),
            failed: BTreeSet::new(),
            report: Vec::new(),
            saved_at: Utc::now(),
        }
    }

    /// Identifiers neither processed nor failed, in original order
    pub fn remaining(&self) -> Vec<String> {
        self.order_ids
            .iter()
            .filter(|id| !self.processed.contains(*id) && !self.failed.contains(*id))
            .cloned()
            .collect()
    }

    pub fn is_fresh(&self, now: DateTime<Utc>, max_age: chrono::Duration) -> bool {
        now - self.saved_at <= max_age
    }
}

#[async_trait]
pub trait CheckpointStore: Send + Sync + std::fmt::Debug {
    async fn load(&self, key: &str) -> Result<Option<BatchCheckpoint>, CheckpointError>;
    async fn save(&self, key: &str, checkpoint: &BatchCheckpoint) -> Result<(), CheckpointError>;
    async fn clear(&self, key: &str) -> Result<(), CheckpointError>;
}

/// Load a checkpoint worth resuming; stale or mismatched ones are cleared
pub async fn load_resumable(
    store: &dyn CheckpointStore,
    key: &str,
    max_age: chrono::Duration,
) -> Result<Option<BatchCheckpoint>, CheckpointError> {
    let Some(checkpoint) = store.load(key).await? else {
        return Ok(None);
    };

    if checkpoint.schema_version != CHECKPOINT_SCHEMA_VERSION {
        warn!(
            key,
            found = checkpoint.schema_version,
            expected = CHECKPOINT_SCHEMA_VERSION,
            "Discarding checkpoint with mismatched schema version"
        );
        store.clear(key).await?;
        return Ok(None);
    }

    if !checkpoint.is_fresh(Utc::now(), max_age) {
        warn!(key, saved_at = %checkpoint.saved_at, "Discarding stale checkpoint");
        store.clear(key).await?;
        return Ok(None);
    }

    info!(
        key,
        run_id = %checkpoint.run_id,
        processed = checkpoint.processed.len(),
        failed = checkpoint.failed.len(),
        remaining = checkpoint.remaining().len(),
        "Resumable checkpoint found"
    );
    Ok(Some(checkpoint))
}

#[derive(Debug, Default)]
pub struct InMemoryCheckpointStore {
    entries: Mutex<HashMap<String, BatchCheckpoint>>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn load(&self, key: &str) -> Result<Option<BatchCheckpoint>, CheckpointError> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .get(key)
            .cloned())
    }

    async fn save(&self, key: &str, checkpoint: &BatchCheckpoint) -> Result<(), CheckpointError> {
        self.entries
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(key.to_string(), checkpoint.clone());
        Ok(())
    }

    async fn clear(&self, key: &str) -> Result<(), CheckpointError> {
        self.entries
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .remove(key);
        Ok(())
    }
}

/// JSON file per key; writes go to a temp file that is renamed into place
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    directory: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        let file: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.directory.join(format!("{file}.json"))
    }

    fn io_error(path: &Path, source: std::io::Error) -> CheckpointError {
        CheckpointError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn load(&self, key: &str) -> Result<Option<BatchCheckpoint>, CheckpointError> {
        let path = self.path_for(key);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Self::io_error(&path, e)),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    async fn save(&self, key: &str, checkpoint: &BatchCheckpoint) -> Result<(), CheckpointError> {
        tokio::fs::create_dir_all(&self.directory)
            .await
            .map_err(|e| Self::io_error(&self.directory, e))?;

        let path = self.path_for(key);
        let temp = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(checkpoint)?;

        tokio::fs::write(&temp, &bytes)
            .await
            .map_err(|e| Self::io_error(&temp, e))?;
        tokio::fs::rename(&temp, &path)
            .await
            .map_err(|e| Self::io_error(&path, e))?;

        debug!(path = %path.display(), chunk_index = checkpoint.chunk_index, "Checkpoint saved");
        Ok(())
    }

    async fn clear(&self, key: &str) -> Result<(), CheckpointError> {
        let path = self.path_for(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Self::io_error(&path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use detention_shared::models::ReportStatus;

    fn checkpoint() -> BatchCheckpoint {
        let ids = (1..=10).map(|i| format!("ORD-{i}")).collect();
        let mut checkpoint = BatchCheckpoint::new(Uuid::now_v7(), ids);
        checkpoint.chunk_index = 1;
        checkpoint.processed.extend(["ORD-1", "ORD-2", "ORD-3"].map(String::from));
        checkpoint.failed.insert("ORD-5".to_string());
        checkpoint.report.push(ReportEntry::new(
            "ORD-1",
            "ACME",
            "Charge Created",
            None,
            ReportStatus::Success,
            "",
        ));
        checkpoint
    }

    #[test]
    fn test_remaining_preserves_order_and_skips_done() {
        let remaining = checkpoint().remaining();
        assert_eq!(remaining.len(), 6);
        assert_eq!(remaining.first().map(String::as_str), Some("ORD-4"));
        assert!(!remaining.contains(&"ORD-5".to_string()));
    }

    #[tokio::test]
    async fn test_file_store_round_trip_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCheckpointStore::new(dir.path().join("checkpoints"));

        assert!(store.load("detention_batch_progress").await.unwrap().is_none());

        let saved = checkpoint();
        store.save("detention_batch_progress", &saved).await.unwrap();
        let loaded = store.load("detention_batch_progress").await.unwrap().unwrap();
        assert_eq!(loaded, saved);
        assert!(!store
            .path_for("detention_batch_progress")
            .with_extension("json.tmp")
            .exists());

        store.clear("detention_batch_progress").await.unwrap();
        assert!(store.load("detention_batch_progress").await.unwrap().is_none());
        // Clearing twice is fine
        store.clear("detention_batch_progress").await.unwrap();
    }

    #[tokio::test]
    async fn test_stale_checkpoint_is_cleared() {
        let store = InMemoryCheckpointStore::new();
        let mut stale = checkpoint();
        stale.saved_at = Utc::now() - chrono::Duration::hours(30);
        store.save("k", &stale).await.unwrap();

        let resumable = load_resumable(&store, "k", chrono::Duration::hours(24))
            .await
            .unwrap();
        assert!(resumable.is_none());
        assert!(store.load("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_version_mismatch_is_cleared() {
        let store = InMemoryCheckpointStore::new();
        let mut old = checkpoint();
        old.schema_version = CHECKPOINT_SCHEMA_VERSION + 1;
        store.save("k", &old).await.unwrap();

        assert!(load_resumable(&store, "k", chrono::Duration::hours(24))
            .await
            .unwrap()
            .is_none());
        assert!(store.load("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fresh_checkpoint_is_offered() {
        let store = InMemoryCheckpointStore::new();
        store.save("k", &checkpoint()).await.unwrap();
        let resumable = load_resumable(&store, "k", chrono::Duration::hours(24))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(resumable.remaining().len(), 6);
    }
}
