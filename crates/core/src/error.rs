//! Error types for datastore operations

use dstore_crypto::EncryptionError;
use dstore_rpc::RpcError;
use dstore_storage::StorageError;
use dstore_types::{FileId, TupleError, TypesError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatastoreError {
    #[error("datastore configuration error: {0}")]
    Config(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("ledger initialization failed: {0}")]
    Initialization(#[source] RpcError),

    #[error("file {0} not found")]
    NotFound(FileId),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("ledger connection failed: {0}")]
    Connection(String),

    #[error("ledger network failure: {0}")]
    Network(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Encryption(#[from] EncryptionError),

    #[error("malformed ledger record: {0}")]
    MalformedRecord(#[from] TupleError),
}

pub type Result<T> = std::result::Result<T, DatastoreError>;

impl From<RpcError> for DatastoreError {
    fn from(err: RpcError) -> Self {
        match err {
            RpcError::Connection(msg) => DatastoreError::Connection(msg),
            RpcError::NotFound(id) => DatastoreError::NotFound(id),
            RpcError::PermissionDenied(msg) => DatastoreError::PermissionDenied(msg),
            RpcError::Network(msg) => DatastoreError::Network(msg),
            RpcError::InvalidArgument(msg) => DatastoreError::InvalidArgument(msg),
        }
    }
}

impl From<TypesError> for DatastoreError {
    fn from(err: TypesError) -> Self {
        DatastoreError::InvalidArgument(err.to_string())
    }
}

impl From<config::ConfigError> for DatastoreError {
    fn from(err: config::ConfigError) -> Self {
        DatastoreError::Config(err.to_string())
    }
}
