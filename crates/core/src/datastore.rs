//! The datastore: one uniform file API over storage, encryption, and ledger
//! providers.
//!
//! Every public operation first makes sure the ledger handle has been
//! acquired (see [`InitLatch`]), then sends payload bytes to the content
//! store and metadata to the ledger. Provider failures are returned to the
//! caller unchanged; the only local state a failure touches is the latch.

use crate::error::{DatastoreError, Result};
use crate::latch::{InitLatch, LatchState};
use crate::options::{DatastoreOptions, EncryptionPolicy};
use dstore_crypto::{Aes256GcmEncryption, Encryption};
use dstore_rpc::{EventStream, FileLedger, RpcError, RpcProvider};
use dstore_storage::{ContentStore, MemoryContentStore};
use dstore_types::{EntityId, EventFilter, FileId, FileRecord, StorageRef};
use futures::future::FutureExt;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

pub struct Datastore {
    storage: Arc<dyn ContentStore>,
    encryption: Arc<dyn Encryption>,
    rpc: Arc<dyn RpcProvider>,
    encryption_policy: EncryptionPolicy,
    registration_flag: bool,
    list_concurrency: usize,
    ledger: InitLatch<Arc<dyn FileLedger>, RpcError>,
}

impl Datastore {
    /// Build a datastore from `options`. Fails immediately when no RPC
    /// provider is supplied; the ledger itself is not contacted until the
    /// first operation.
    pub fn new(options: DatastoreOptions) -> Result<Self> {
        let rpc = options.rpc_provider.ok_or_else(|| {
            DatastoreError::Config("an rpc provider is required".to_string())
        })?;
        if options.list_concurrency == 0 {
            return Err(DatastoreError::Config(
                "list_concurrency must be at least 1".to_string(),
            ));
        }

        let storage = options
            .storage_provider
            .unwrap_or_else(|| Arc::new(MemoryContentStore::new()));
        let encryption = options
            .encryption_provider
            .unwrap_or_else(|| Arc::new(Aes256GcmEncryption::generate()));

        debug!(
            storage = storage.backend(),
            encryption = encryption.scheme(),
            network = rpc.network(),
            policy = ?options.encryption_policy,
            "datastore configured"
        );

        Ok(Self {
            storage,
            encryption,
            rpc,
            encryption_policy: options.encryption_policy,
            registration_flag: options.registration_flag,
            list_concurrency: options.list_concurrency,
            ledger: InitLatch::new(),
        })
    }

    pub fn init_state(&self) -> LatchState {
        self.ledger.state()
    }

    /// Acquire the ledger handle now instead of on first use.
    pub async fn initialize(&self) -> Result<()> {
        self.ledger().await.map(|_| ())
    }

    async fn ledger(&self) -> Result<Arc<dyn FileLedger>> {
        let rpc = Arc::clone(&self.rpc);
        self.ledger
            .get_or_try_init(move || {
                async move {
                    let handle = rpc.ledger_handle().await?;
                    info!(network = rpc.network(), "ledger handle acquired");
                    Ok::<_, RpcError>(handle)
                }
                .boxed()
            })
            .await
            .map_err(|err| {
                warn!(network = self.rpc.network(), "ledger initialization failed: {err}");
                DatastoreError::Initialization(err)
            })
    }

    async fn store(&self, bytes: &[u8]) -> Result<StorageRef> {
        let storage_ref = match self.encryption_policy {
            EncryptionPolicy::Encrypt => {
                let sealed = self.encryption.encrypt(bytes).await?;
                self.storage.add_file(&sealed).await?
            }
            EncryptionPolicy::Passthrough => self.storage.add_file(bytes).await?,
        };
        debug!(%storage_ref, size = bytes.len(), "payload stored");
        Ok(storage_ref)
    }

    async fn load(&self, storage_ref: &StorageRef) -> Result<Vec<u8>> {
        let stored = self.storage.get_file(storage_ref).await?;
        match self.encryption_policy {
            EncryptionPolicy::Encrypt => Ok(self.encryption.decrypt(&stored).await?),
            EncryptionPolicy::Passthrough => Ok(stored),
        }
    }

    /// Store `bytes` and register them under `name`. Content is written
    /// before the ledger entry so the ledger never references a missing
    /// blob. If registration fails the blob stays in storage.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn add_file(&self, name: &str, bytes: &[u8]) -> Result<FileId> {
        require_name(name)?;
        let ledger = self.ledger().await?;

        let storage_ref = self.store(bytes).await?;
        let file_id = ledger
            .add_file(
                &storage_ref,
                name,
                bytes.len() as u64,
                self.registration_flag,
            )
            .await
            .map_err(|err| {
                warn!(%storage_ref, "ledger registration failed, blob left unreferenced: {err}");
                DatastoreError::from(err)
            })?;

        info!(%file_id, %storage_ref, "file added");
        Ok(file_id)
    }

    /// Metadata plus content, re-read from storage on every call.
    #[instrument(skip(self))]
    pub async fn get_file(&self, file_id: FileId) -> Result<FileRecord> {
        let record = self.get_file_info(file_id).await?;
        let content = self.load(&record.storage_ref).await?;
        Ok(record.with_content(content))
    }

    /// Metadata only; `content` is always `None`.
    #[instrument(skip(self))]
    pub async fn get_file_info(&self, file_id: FileId) -> Result<FileRecord> {
        let ledger = self.ledger().await?;
        let tuple = ledger.get_file(file_id).await?;
        Ok(FileRecord::from_tuple(file_id, &tuple)?)
    }

    /// Every record from id 1 to the ledger's last id, ascending. The first
    /// failed lookup aborts the whole listing.
    #[instrument(skip(self))]
    pub async fn list_files(&self) -> Result<Vec<FileRecord>> {
        let ledger = self.ledger().await?;
        let last = ledger.last_file_id().await?;
        debug!(last, concurrency = self.list_concurrency, "listing files");

        stream::iter(FileId::range_through(last))
            .map(|file_id| self.get_file_info(file_id))
            .buffered(self.list_concurrency)
            .try_collect()
            .await
    }

    /// Replace the content of an existing file. The new blob is stored
    /// first; the ledger then moves the record's reference and size
    /// together.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn set_file_content(&self, file_id: FileId, bytes: &[u8]) -> Result<()> {
        let ledger = self.ledger().await?;
        let storage_ref = self.store(bytes).await?;
        ledger
            .set_file_content(file_id, &storage_ref, bytes.len() as u64)
            .await?;
        info!(%storage_ref, "file content replaced");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn set_write_permission(
        &self,
        file_id: FileId,
        entity: &EntityId,
        allowed: bool,
    ) -> Result<()> {
        let ledger = self.ledger().await?;
        ledger
            .set_write_permission(file_id, entity, allowed)
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn set_filename(&self, file_id: FileId, new_name: &str) -> Result<()> {
        require_name(new_name)?;
        let ledger = self.ledger().await?;
        ledger.set_filename(file_id, new_name).await?;
        Ok(())
    }

    /// Ledger event feed, passed through as the backend produces it.
    pub async fn subscribe_events(&self, filter: EventFilter) -> Result<EventStream> {
        let ledger = self.ledger().await?;
        Ok(ledger.subscribe(filter).await?)
    }
}

impl fmt::Debug for Datastore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Datastore")
            .field("storage", &self.storage.backend())
            .field("encryption", &self.encryption.scheme())
            .field("network", &self.rpc.network())
            .field("encryption_policy", &self.encryption_policy)
            .field("init_state", &self.ledger.state())
            .finish()
    }
}

fn require_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(DatastoreError::InvalidArgument(
            "file name must not be empty".to_string(),
        ));
    }
    Ok(())
}
