//! dstore content storage
//!
//! Defines the [`ContentStore`] capability the datastore pushes file bytes
//! through, plus two content-addressable backends. Both address content by
//! the BLAKE3 hash of the stored bytes, so writing the same bytes twice
//! yields the same [`StorageRef`] and the second write is a no-op.

use async_trait::async_trait;
use dstore_types::StorageRef;

pub mod fs;
pub mod memory;

pub use fs::FsContentStore;
pub use memory::MemoryContentStore;

/// Storage errors
#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("storage write failed: {0}")]
    WriteFailure(String),
    #[error("content not found: {0}")]
    NotFound(StorageRef),
    #[error("storage read failed: {0}")]
    ReadFailure(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Content-addressable byte store.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Store `bytes` and return the reference they can be fetched by.
    async fn add_file(&self, bytes: &[u8]) -> Result<StorageRef>;

    /// Fetch the bytes previously stored under `storage_ref`.
    async fn get_file(&self, storage_ref: &StorageRef) -> Result<Vec<u8>>;

    /// Short backend name for logs.
    fn backend(&self) -> &'static str;
}

/// Length of a hex-encoded BLAKE3 content address.
pub const CONTENT_ADDRESS_LEN: usize = 64;

/// BLAKE3 content address of `bytes`, hex encoded.
pub fn content_address(bytes: &[u8]) -> StorageRef {
    let digest = blake3::hash(bytes);
    StorageRef::new(hex::encode(digest.as_bytes()))
        .expect("hex digest is never empty")
}

/// True when `storage_ref` has the shape of a content address produced by
/// [`content_address`].
pub fn is_content_address(storage_ref: &StorageRef) -> bool {
    let value = storage_ref.as_str();
    value.len() == CONTENT_ADDRESS_LEN
        && value
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}
