//! dstore core
//!
//! [`Datastore`] exposes one file API over three pluggable providers: a
//! [`ContentStore`](dstore_storage::ContentStore) for payload bytes, an
//! [`Encryption`](dstore_crypto::Encryption) scheme applied around storage,
//! and an [`RpcProvider`](dstore_rpc::RpcProvider) whose ledger keeps the
//! authoritative file metadata and access control.
//!
//! The ledger handle is acquired lazily on first use through an
//! [`InitLatch`]; concurrent first callers share a single acquisition and a
//! failed acquisition is retried on the next call.

pub mod config;
pub mod datastore;
pub mod error;
pub mod latch;
pub mod options;

pub use self::config::{DatastoreConfig, LogFormat, StorageBackend};
pub use datastore::Datastore;
pub use error::{DatastoreError, Result};
pub use latch::{InitLatch, LatchState};
pub use options::{DatastoreOptions, EncryptionPolicy};
