//! Encryption schemes
//!
//! `Aes256GcmEncryption` frames every ciphertext as `nonce || ciphertext || tag`
//! with a fresh random 96-bit nonce per call, so encrypting the same bytes
//! twice produces different output.

use crate::{Encryption, EncryptionError, Result};
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use async_trait::async_trait;
use rand_core::{OsRng, RngCore};
use std::fmt;

pub const KEY_LEN: usize = 32;
pub const NONCE_LEN: usize = 12;
pub const TAG_LEN: usize = 16;

/// AES-256-GCM encryption implementation
#[derive(Clone)]
pub struct Aes256GcmEncryption {
    key: [u8; KEY_LEN],
}

impl Aes256GcmEncryption {
    pub fn new(key: [u8; KEY_LEN]) -> Self {
        Self { key }
    }

    /// Instance keyed with fresh random bytes.
    pub fn generate() -> Self {
        Self::new(Self::generate_key())
    }

    /// Generate a new random key
    pub fn generate_key() -> [u8; KEY_LEN] {
        let mut key = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut key);
        key
    }

    /// Parse a 64-character hex key.
    pub fn from_hex(hex_key: &str) -> Result<Self> {
        let hex_key = hex_key.trim();
        if hex_key.len() != KEY_LEN * 2 {
            return Err(EncryptionError::InvalidKey(format!(
                "key hex must be {} characters, got {}",
                KEY_LEN * 2,
                hex_key.len()
            )));
        }
        let mut key = [0u8; KEY_LEN];
        hex::decode_to_slice(hex_key, &mut key)
            .map_err(|e| EncryptionError::InvalidKey(format!("invalid hex: {e}")))?;
        Ok(Self::new(key))
    }

    pub fn key_hex(&self) -> String {
        hex::encode(self.key)
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key))
    }
}

impl fmt::Debug for Aes256GcmEncryption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Aes256GcmEncryption")
            .field("key", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl Encryption for Aes256GcmEncryption {
    async fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);

        let ciphertext = self
            .cipher()
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|_| EncryptionError::EncryptionFailed)?;

        let mut framed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        framed.extend_from_slice(&nonce);
        framed.extend_from_slice(&ciphertext);
        Ok(framed)
    }

    async fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        if ciphertext.len() < NONCE_LEN + TAG_LEN {
            return Err(EncryptionError::MalformedCiphertext(format!(
                "expected at least {} bytes, got {}",
                NONCE_LEN + TAG_LEN,
                ciphertext.len()
            )));
        }

        let (nonce, body) = ciphertext.split_at(NONCE_LEN);
        self.cipher()
            .decrypt(Nonce::from_slice(nonce), body)
            .map_err(|_| EncryptionError::DecryptionFailed)
    }

    fn scheme(&self) -> &'static str {
        "aes-256-gcm"
    }
}

/// Identity transform. Stores payloads as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughEncryption;

#[async_trait]
impl Encryption for PassthroughEncryption {
    async fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        Ok(plaintext.to_vec())
    }

    async fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        Ok(ciphertext.to_vec())
    }

    fn scheme(&self) -> &'static str {
        "passthrough"
    }
}
