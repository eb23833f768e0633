//! JSON snapshots of an in-process registry.

use crate::memory::{LedgerState, MemoryLedger, StoredFile};
use dstore_types::{EntityId, LedgerEvent, StorageRef};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::Path;
use tracing::info;

#[derive(thiserror::Error, Debug)]
pub enum SnapshotError {
    #[error("snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// One registered file as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSnapshot {
    pub storage_ref: StorageRef,
    pub name: String,
    pub size: u64,
    pub flag: bool,
    pub owner: EntityId,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub writers: Vec<EntityId>,
}

impl From<&StoredFile> for FileSnapshot {
    fn from(file: &StoredFile) -> Self {
        Self {
            storage_ref: file.storage_ref.clone(),
            name: file.name.clone(),
            size: file.size,
            flag: file.flag,
            owner: file.owner.clone(),
            writers: file.writers.iter().cloned().collect(),
        }
    }
}

impl From<FileSnapshot> for StoredFile {
    fn from(file: FileSnapshot) -> Self {
        Self {
            storage_ref: file.storage_ref,
            name: file.name,
            size: file.size,
            flag: file.flag,
            owner: file.owner,
            writers: file.writers.into_iter().collect(),
        }
    }
}

/// Full registry state. `files[i]` is file id `i + 1`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub files: Vec<FileSnapshot>,
    #[serde(default)]
    pub events: Vec<LedgerEvent>,
}

impl LedgerSnapshot {
    pub(crate) fn into_state(self) -> LedgerState {
        LedgerState {
            files: self.files.into_iter().map(StoredFile::from).collect(),
            events: self.events,
        }
    }
}

impl MemoryLedger {
    /// Load a registry from `path`, or start empty when the file does not exist.
    pub async fn load_from(path: impl AsRef<Path>, caller: EntityId) -> Result<Self, SnapshotError> {
        let path = path.as_ref();
        let snapshot = match tokio::fs::read(path).await {
            Ok(bytes) => serde_json::from_slice::<LedgerSnapshot>(&bytes)?,
            Err(e) if e.kind() == ErrorKind::NotFound => LedgerSnapshot::default(),
            Err(e) => return Err(e.into()),
        };
        info!(
            path = %path.display(),
            files = snapshot.files.len(),
            "loaded ledger snapshot"
        );
        Ok(Self::from_snapshot(caller, snapshot))
    }

    /// Write the current state to `path` atomically.
    pub async fn save_to(&self, path: impl AsRef<Path>) -> Result<(), SnapshotError> {
        let path = path.as_ref();
        let json = serde_json::to_vec_pretty(&self.snapshot())?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}
