//! In-memory content store (default backend, also used in tests).

use crate::{content_address, ContentStore, Result, StorageError};
use async_trait::async_trait;
use dstore_types::StorageRef;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Content-addressed blobs held in process memory. Clones share the same
/// underlying map.
#[derive(Clone, Default)]
pub struct MemoryContentStore {
    blobs: Arc<RwLock<HashMap<StorageRef, Arc<[u8]>>>>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct blobs stored.
    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }

    pub fn contains(&self, storage_ref: &StorageRef) -> bool {
        self.blobs.read().contains_key(storage_ref)
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn add_file(&self, bytes: &[u8]) -> Result<StorageRef> {
        let storage_ref = content_address(bytes);
        let mut blobs = self.blobs.write();
        blobs
            .entry(storage_ref.clone())
            .or_insert_with(|| Arc::from(bytes));
        debug!(%storage_ref, size = bytes.len(), "stored blob in memory");
        Ok(storage_ref)
    }

    async fn get_file(&self, storage_ref: &StorageRef) -> Result<Vec<u8>> {
        let blobs = self.blobs.read();
        blobs
            .get(storage_ref)
            .map(|blob| blob.to_vec())
            .ok_or_else(|| StorageError::NotFound(storage_ref.clone()))
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
