//! Snapshot persistence for the subscriber registry.
//!
//! The registry is mirrored as a single JSON object mapping composite key to
//! subscriber record. It is read once at startup and fully rewritten after
//! every mutation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;

use pushcast_common::error::AppError;
use pushcast_common::types::SubscriberRecord;

/// Full-state registry snapshot, keyed by composite key.
pub type Snapshot = HashMap<String, SubscriberRecord>;

/// Durable home of the registry snapshot.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Read the persisted snapshot. `Ok(None)` means nothing has been saved yet.
    async fn load(&self) -> Result<Option<Snapshot>, AppError>;

    /// Replace the persisted snapshot with `snapshot`.
    async fn save(&self, snapshot: &Snapshot) -> Result<(), AppError>;
}

/// Snapshot kept in a flat JSON file.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl SnapshotStore for JsonFileStore {
    async fn load(&self) -> Result<Option<Snapshot>, AppError> {
        let contents = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        // Parse entry by entry so one malformed record does not cost the rest.
        let raw: HashMap<String, serde_json::Value> = serde_json::from_slice(&contents)?;
        let mut snapshot = Snapshot::with_capacity(raw.len());
        for (key, value) in raw {
            match serde_json::from_value::<SubscriberRecord>(value) {
                Ok(record) => {
                    snapshot.insert(key, record);
                }
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Skipping malformed subscriber record");
                }
            }
        }

        Ok(Some(snapshot))
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<(), AppError> {
        let bytes = serde_json::to_vec(snapshot)?;
        let tmp = self.temp_path();

        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        tracing::debug!(
            path = %self.path.display(),
            subscribers = snapshot.len(),
            "Subscriber snapshot written"
        );
        Ok(())
    }
}

/// Snapshot held in process memory. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    snapshot: Mutex<Option<Snapshot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate the store, as if a previous process had saved `snapshot`.
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            snapshot: Mutex::new(Some(snapshot)),
        }
    }

    /// Copy of the last saved snapshot.
    pub async fn saved(&self) -> Option<Snapshot> {
        self.snapshot.lock().await.clone()
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn load(&self) -> Result<Option<Snapshot>, AppError> {
        Ok(self.snapshot.lock().await.clone())
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<(), AppError> {
        *self.snapshot.lock().await = Some(snapshot.clone());
        Ok(())
    }
}
