//! Encryption providers for dstore
//!
//! The datastore treats encryption as a pluggable byte transform applied
//! around content storage. This crate defines that capability and ships the
//! default symmetric scheme (AES-256-GCM) plus a passthrough scheme.

use async_trait::async_trait;

pub mod encryption;

pub use encryption::{Aes256GcmEncryption, PassthroughEncryption, KEY_LEN, NONCE_LEN, TAG_LEN};

/// Encryption error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncryptionError {
    #[error("invalid encryption key: {0}")]
    InvalidKey(String),
    #[error("malformed ciphertext: {0}")]
    MalformedCiphertext(String),
    #[error("encryption failed")]
    EncryptionFailed,
    #[error("decryption failed")]
    DecryptionFailed,
}

pub type Result<T> = std::result::Result<T, EncryptionError>;

/// Reversible byte transform applied to file payloads.
#[async_trait]
pub trait Encryption: Send + Sync {
    async fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>>;

    async fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>>;

    /// Scheme name for logs.
    fn scheme(&self) -> &'static str;
}
