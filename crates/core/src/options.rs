//! Construction options for [`Datastore`](crate::Datastore).

use dstore_crypto::Encryption;
use dstore_rpc::RpcProvider;
use dstore_storage::ContentStore;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;

/// Whether payloads pass through the encryption provider on their way to
/// and from storage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncryptionPolicy {
    /// Encrypt before every storage write, decrypt after every read.
    #[default]
    Encrypt,
    /// Keep the provider configured but store plaintext.
    Passthrough,
}

/// Providers and tuning for a datastore. Only the RPC provider is
/// mandatory; storage defaults to an in-memory content store and encryption
/// to AES-256-GCM with a random key.
#[derive(Clone)]
pub struct DatastoreOptions {
    pub storage_provider: Option<Arc<dyn ContentStore>>,
    pub encryption_provider: Option<Arc<dyn Encryption>>,
    pub rpc_provider: Option<Arc<dyn RpcProvider>>,
    pub encryption_policy: EncryptionPolicy,
    /// Forwarded verbatim to the ledger when registering a file.
    pub registration_flag: bool,
    /// How many record lookups `list_files` keeps in flight.
    pub list_concurrency: usize,
}

impl Default for DatastoreOptions {
    fn default() -> Self {
        Self {
            storage_provider: None,
            encryption_provider: None,
            rpc_provider: None,
            encryption_policy: EncryptionPolicy::default(),
            registration_flag: true,
            list_concurrency: 1,
        }
    }
}

impl DatastoreOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_storage(mut self, storage: Arc<dyn ContentStore>) -> Self {
        self.storage_provider = Some(storage);
        self
    }

    pub fn with_encryption(mut self, encryption: Arc<dyn Encryption>) -> Self {
        self.encryption_provider = Some(encryption);
        self
    }

    pub fn with_rpc(mut self, rpc: Arc<dyn RpcProvider>) -> Self {
        self.rpc_provider = Some(rpc);
        self
    }

    pub fn with_encryption_policy(mut self, policy: EncryptionPolicy) -> Self {
        self.encryption_policy = policy;
        self
    }

    pub fn with_registration_flag(mut self, flag: bool) -> Self {
        self.registration_flag = flag;
        self
    }

    pub fn with_list_concurrency(mut self, concurrency: usize) -> Self {
        self.list_concurrency = concurrency;
        self
    }
}

impl fmt::Debug for DatastoreOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatastoreOptions")
            .field("storage", &self.storage_provider.as_ref().map(|s| s.backend()))
            .field(
                "encryption",
                &self.encryption_provider.as_ref().map(|e| e.scheme()),
            )
            .field("rpc", &self.rpc_provider.as_ref().map(|r| r.network().to_string()))
            .field("encryption_policy", &self.encryption_policy)
            .field("registration_flag", &self.registration_flag)
            .field("list_concurrency", &self.list_concurrency)
            .finish()
    }
}
