//! dstore ledger RPC
//!
//! A ledger backend is reached in two steps: an [`RpcProvider`] connects to
//! a network and hands out a [`FileLedger`] handle, and the handle performs
//! the registry calls. Permission checks, id assignment, and the event feed
//! all belong to the ledger; callers surface its errors unchanged.
//!
//! [`MemoryLedger`] is an in-process registry with the same semantics, used
//! for local deployments and tests.

use async_trait::async_trait;
use dstore_types::{EntityId, EventFilter, FileId, LedgerEvent, LedgerValue, StorageRef};
use futures::stream::BoxStream;
use std::sync::Arc;

pub mod memory;
pub mod provider;
pub mod snapshot;

pub use memory::MemoryLedger;
pub use provider::LocalRpcProvider;
pub use snapshot::{LedgerSnapshot, SnapshotError};

/// Errors reported by ledger backends.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RpcError {
    #[error("ledger connection failed: {0}")]
    Connection(String),
    #[error("file {0} not found on ledger")]
    NotFound(FileId),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("ledger network failure: {0}")]
    Network(String),
    #[error("invalid ledger call: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, RpcError>;

/// Lazy, unbounded feed of ledger events.
pub type EventStream = BoxStream<'static, Result<LedgerEvent>>;

/// Entry point to a ledger network.
#[async_trait]
pub trait RpcProvider: Send + Sync {
    /// Connect and return a handle to the file registry.
    async fn ledger_handle(&self) -> Result<Arc<dyn FileLedger>>;

    /// Network name for logs.
    fn network(&self) -> &str;
}

/// Handle to the file registry on a ledger.
#[async_trait]
pub trait FileLedger: Send + Sync {
    /// Register a file and return the id the ledger assigned. `flag` is
    /// recorded verbatim; its meaning is defined by the backend.
    async fn add_file(
        &self,
        storage_ref: &StorageRef,
        name: &str,
        size: u64,
        flag: bool,
    ) -> Result<FileId>;

    /// Raw record tuple `(storage_ref, name, size, flag, ...)`.
    async fn get_file(&self, file_id: FileId) -> Result<Vec<LedgerValue>>;

    async fn set_file_content(
        &self,
        file_id: FileId,
        storage_ref: &StorageRef,
        size: u64,
    ) -> Result<()>;

    async fn set_filename(&self, file_id: FileId, name: &str) -> Result<()>;

    async fn set_write_permission(
        &self,
        file_id: FileId,
        entity: &EntityId,
        allowed: bool,
    ) -> Result<()>;

    /// Highest id assigned so far, 0 for an empty registry.
    async fn last_file_id(&self) -> Result<u64>;

    /// Subscribe to events matching `filter`. Each call starts an
    /// independent stream.
    async fn subscribe(&self, filter: EventFilter) -> Result<EventStream>;
}
