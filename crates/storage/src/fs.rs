//! Filesystem content store.
//!
//! Each blob lives at `<root>/<content address>`. Writes go to a temporary
//! file in the same directory and are renamed into place, so a reader never
//! observes a partially written blob.

use crate::{content_address, is_content_address, ContentStore, Result, StorageError};
use async_trait::async_trait;
use dstore_types::StorageRef;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

#[derive(Debug)]
pub struct FsContentStore {
    root: PathBuf,
    tmp_counter: AtomicU64,
}

impl FsContentStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&root).await.map_err(|e| {
            StorageError::Unavailable(format!("cannot create {}: {e}", root.display()))
        })?;
        Ok(Self {
            root,
            tmp_counter: AtomicU64::new(0),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn blob_path(&self, storage_ref: &StorageRef) -> PathBuf {
        self.root.join(storage_ref.as_str())
    }

    fn tmp_path(&self, storage_ref: &StorageRef) -> PathBuf {
        let n = self.tmp_counter.fetch_add(1, Ordering::Relaxed);
        self.root.join(format!(
            ".tmp-{}-{}-{n}",
            std::process::id(),
            storage_ref.as_str()
        ))
    }
}

#[async_trait]
impl ContentStore for FsContentStore {
    async fn add_file(&self, bytes: &[u8]) -> Result<StorageRef> {
        let storage_ref = content_address(bytes);
        let target = self.blob_path(&storage_ref);

        let present = tokio::fs::try_exists(&target).await.map_err(|e| {
            StorageError::Unavailable(format!("cannot check {}: {e}", target.display()))
        })?;
        if present {
            debug!(%storage_ref, "blob already present");
            return Ok(storage_ref);
        }

        let tmp = self.tmp_path(&storage_ref);
        let write = async {
            let mut file = tokio::fs::File::create(&tmp).await?;
            file.write_all(bytes).await?;
            file.sync_all().await?;
            tokio::fs::rename(&tmp, &target).await
        };

        if let Err(e) = write.await {
            if let Err(cleanup) = tokio::fs::remove_file(&tmp).await {
                if cleanup.kind() != ErrorKind::NotFound {
                    warn!(path = %tmp.display(), "failed to remove temp blob: {cleanup}");
                }
            }
            return Err(StorageError::WriteFailure(format!(
                "{}: {e}",
                target.display()
            )));
        }

        debug!(%storage_ref, size = bytes.len(), "stored blob on disk");
        Ok(storage_ref)
    }

    async fn get_file(&self, storage_ref: &StorageRef) -> Result<Vec<u8>> {
        if !is_content_address(storage_ref) {
            return Err(StorageError::NotFound(storage_ref.clone()));
        }

        let bytes = match tokio::fs::read(self.blob_path(storage_ref)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::NotFound(storage_ref.clone()))
            }
            Err(e) => return Err(StorageError::ReadFailure(e.to_string())),
        };

        if content_address(&bytes) != *storage_ref {
            return Err(StorageError::ReadFailure(format!(
                "blob {storage_ref} does not match its content address"
            )));
        }
        Ok(bytes)
    }

    fn backend(&self) -> &'static str {
        "fs"
    }
}
