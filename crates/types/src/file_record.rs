use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors emitted when constructing identifiers from untrusted input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypesError {
    #[error("file ids start at 1, got 0")]
    ZeroFileId,
    #[error("storage reference must not be empty")]
    EmptyStorageRef,
    #[error("entity identifier must not be empty")]
    EmptyEntity,
}

/// Ledger-assigned file identifier. Ids are 1-based and contiguous.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct FileId(u64);

impl FileId {
    pub fn new(value: u64) -> Result<Self, TypesError> {
        if value == 0 {
            return Err(TypesError::ZeroFileId);
        }
        Ok(FileId(value))
    }

    pub fn get(self) -> u64 {
        self.0
    }

    /// Iterate `1..=last` in ascending order.
    pub fn range_through(last: u64) -> impl DoubleEndedIterator<Item = FileId> {
        (1..=last).map(FileId)
    }
}

impl fmt::Debug for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileId({})", self.0)
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u64> for FileId {
    type Error = TypesError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        FileId::new(value)
    }
}

impl From<FileId> for u64 {
    fn from(value: FileId) -> Self {
        value.0
    }
}

/// Opaque content address handed out by a storage backend.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StorageRef(String);

impl StorageRef {
    pub fn new(value: impl Into<String>) -> Result<Self, TypesError> {
        let value = value.into();
        if value.is_empty() {
            return Err(TypesError::EmptyStorageRef);
        }
        Ok(StorageRef(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for StorageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StorageRef({})", self.0)
    }
}

impl fmt::Display for StorageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for StorageRef {
    type Error = TypesError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        StorageRef::new(value)
    }
}

impl From<StorageRef> for String {
    fn from(value: StorageRef) -> Self {
        value.0
    }
}

/// Account or role that permissions are granted to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityId(String);

impl EntityId {
    /// Surrounding whitespace is dropped; what remains must be non-empty.
    pub fn new(value: impl AsRef<str>) -> Result<Self, TypesError> {
        let trimmed = value.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TypesError::EmptyEntity);
        }
        Ok(EntityId(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for EntityId {
    type Error = TypesError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        EntityId::new(value)
    }
}

impl From<EntityId> for String {
    fn from(value: EntityId) -> Self {
        value.0
    }
}

/// Metadata describing one registered file.
///
/// `storage_ref` and `size` are always written together: `size` is the
/// length of the logical content the caller stored under `storage_ref`.
/// `content` is only populated by an explicit fetch and is never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Ledger-assigned identifier.
    pub id: FileId,
    /// Human-readable name, mutable.
    pub name: String,
    /// Content address of the current payload.
    pub storage_ref: StorageRef,
    /// Byte length of the current payload.
    pub size: u64,
    /// Flag recorded at registration; its meaning belongs to the ledger backend.
    pub registration_flag: bool,
    /// Raw bytes, present only when explicitly fetched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<u8>>,
}

impl FileRecord {
    /// Attach fetched content to a metadata-only record.
    pub fn with_content(mut self, content: Vec<u8>) -> Self {
        self.content = Some(content);
        self
    }

    pub fn has_content(&self) -> bool {
        self.content.is_some()
    }
}
