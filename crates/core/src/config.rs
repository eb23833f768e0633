//! Layered datastore configuration.
//!
//! Sources, lowest precedence first: built-in defaults, an optional TOML
//! file, then `DSTORE_`-prefixed environment variables with `__` between
//! path segments (`DSTORE_STORAGE__BACKEND=fs`).

use crate::error::{DatastoreError, Result};
use crate::options::{DatastoreOptions, EncryptionPolicy};
use config::{Config, Environment, File};
use dstore_crypto::Aes256GcmEncryption;
use dstore_rpc::RpcProvider;
use dstore_storage::{FsContentStore, MemoryContentStore};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

pub const ENV_PREFIX: &str = "DSTORE";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Fs,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    pub backend: StorageBackend,
    /// Root directory for the `fs` backend.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EncryptionSection {
    pub policy: EncryptionPolicy,
    /// Hex-encoded AES-256 key. A random key is generated when absent.
    pub key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DatastoreSection {
    pub list_concurrency: usize,
    pub registration_flag: bool,
}

impl Default for DatastoreSection {
    fn default() -> Self {
        Self {
            list_concurrency: 1,
            registration_flag: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogSection {
    /// Filter used when `RUST_LOG` is unset.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DatastoreConfig {
    pub storage: StorageSection,
    pub encryption: EncryptionSection,
    pub datastore: DatastoreSection,
    pub log: LogSection,
}

impl DatastoreConfig {
    /// Load from `path` (when given) and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            if !path.exists() {
                return Err(DatastoreError::Config(format!(
                    "configuration file {} not found",
                    path.display()
                )));
            }
            builder = builder.add_source(File::from(path));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        );

        let config: DatastoreConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        debug!(backend = ?config.storage.backend, policy = ?config.encryption.policy, "configuration loaded");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.datastore.list_concurrency == 0 {
            return Err(DatastoreError::Config(
                "datastore.list_concurrency must be at least 1".to_string(),
            ));
        }
        if self.storage.backend == StorageBackend::Fs && self.storage.path.is_none() {
            return Err(DatastoreError::Config(
                "storage.path is required for the fs backend".to_string(),
            ));
        }
        Ok(())
    }

    /// Build providers for this configuration around `rpc`.
    ///
    /// A random key is only generated for the memory backend. Blobs on disk
    /// outlive the process, so an encrypting `fs` backend needs
    /// `encryption.key`.
    pub async fn into_options(self, rpc: Arc<dyn RpcProvider>) -> Result<DatastoreOptions> {
        self.validate()?;
        if self.storage.backend == StorageBackend::Fs
            && self.encryption.policy == EncryptionPolicy::Encrypt
            && self.encryption.key.is_none()
        {
            return Err(DatastoreError::Config(
                "encryption.key is required when encrypting to the fs backend".to_string(),
            ));
        }

        let options = DatastoreOptions::new()
            .with_rpc(rpc)
            .with_encryption_policy(self.encryption.policy)
            .with_registration_flag(self.datastore.registration_flag)
            .with_list_concurrency(self.datastore.list_concurrency);

        let options = match (self.storage.backend, self.storage.path) {
            (StorageBackend::Fs, Some(root)) => {
                options.with_storage(Arc::new(FsContentStore::open(root).await?))
            }
            (StorageBackend::Fs, None) => {
                return Err(DatastoreError::Config(
                    "storage.path is required for the fs backend".to_string(),
                ))
            }
            (StorageBackend::Memory, _) => options.with_storage(Arc::new(MemoryContentStore::new())),
        };

        let encryption = match self.encryption.key.as_deref() {
            Some(key) => Aes256GcmEncryption::from_hex(key)?,
            None => Aes256GcmEncryption::generate(),
        };

        Ok(options.with_encryption(Arc::new(encryption)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dstore_rpc::{LocalRpcProvider, MemoryLedger};
    use dstore_types::EntityId;

    fn rpc() -> Arc<dyn RpcProvider> {
        Arc::new(LocalRpcProvider::new(MemoryLedger::new(
            EntityId::new("tester").unwrap(),
        )))
    }

    #[test]
    fn defaults() {
        let config = DatastoreConfig::default();
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.encryption.policy, EncryptionPolicy::Encrypt);
        assert_eq!(config.datastore.list_concurrency, 1);
        assert!(config.datastore.registration_flag);
        assert_eq!(config.log.level, "info");
        assert_eq!(config.log.format, LogFormat::Pretty);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_zero_concurrency_and_pathless_fs() {
        let mut config = DatastoreConfig::default();
        config.datastore.list_concurrency = 0;
        assert!(matches!(config.validate(), Err(DatastoreError::Config(_))));

        let mut config = DatastoreConfig::default();
        config.storage.backend = StorageBackend::Fs;
        assert!(matches!(config.validate(), Err(DatastoreError::Config(_))));
    }

    #[tokio::test]
    async fn bad_key_is_an_encryption_error() {
        let mut config = DatastoreConfig::default();
        config.encryption.key = Some("abcd".to_string());
        assert!(matches!(
            config.into_options(rpc()).await,
            Err(DatastoreError::Encryption(_))
        ));
    }

    #[tokio::test]
    async fn options_carry_tuning() {
        let mut config = DatastoreConfig::default();
        config.datastore.list_concurrency = 4;
        config.datastore.registration_flag = false;
        config.encryption.policy = EncryptionPolicy::Passthrough;

        let options = config.into_options(rpc()).await.unwrap();
        assert_eq!(options.list_concurrency, 4);
        assert!(!options.registration_flag);
        assert_eq!(options.encryption_policy, EncryptionPolicy::Passthrough);
        assert!(options.rpc_provider.is_some());
        assert!(options.storage_provider.is_some());
    }
}
