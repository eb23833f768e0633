//! Ledger event feed types.

use crate::file_record::{EntityId, FileId, StorageRef};
use serde::{Deserialize, Serialize};

/// A mutation recorded by the ledger, in commit order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEvent {
    /// Position in the ledger's event log, starting at 0.
    pub sequence: u64,
    pub file_id: FileId,
    pub kind: LedgerEventKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LedgerEventKind {
    FileAdded {
        name: String,
        storage_ref: StorageRef,
        size: u64,
    },
    ContentUpdated {
        storage_ref: StorageRef,
        size: u64,
    },
    FileRenamed {
        name: String,
    },
    PermissionChanged {
        entity: EntityId,
        allowed: bool,
    },
}

impl LedgerEventKind {
    pub fn tag(&self) -> EventKind {
        match self {
            LedgerEventKind::FileAdded { .. } => EventKind::FileAdded,
            LedgerEventKind::ContentUpdated { .. } => EventKind::ContentUpdated,
            LedgerEventKind::FileRenamed { .. } => EventKind::FileRenamed,
            LedgerEventKind::PermissionChanged { .. } => EventKind::PermissionChanged,
        }
    }
}

/// Discriminant of [`LedgerEventKind`], used for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    FileAdded,
    ContentUpdated,
    FileRenamed,
    PermissionChanged,
}

/// Subscription filter. The default value matches every event from the
/// start of the log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_id: Option<FileId>,
    /// Empty matches every kind.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kinds: Vec<EventKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_sequence: Option<u64>,
}

impl EventFilter {
    pub fn for_file(file_id: FileId) -> Self {
        Self {
            file_id: Some(file_id),
            ..Self::default()
        }
    }

    pub fn with_kinds(mut self, kinds: impl IntoIterator<Item = EventKind>) -> Self {
        self.kinds = kinds.into_iter().collect();
        self
    }

    pub fn starting_at(mut self, sequence: u64) -> Self {
        self.from_sequence = Some(sequence);
        self
    }

    pub fn matches(&self, event: &LedgerEvent) -> bool {
        if let Some(from) = self.from_sequence {
            if event.sequence < from {
                return false;
            }
        }
        if let Some(file_id) = self.file_id {
            if event.file_id != file_id {
                return false;
            }
        }
        self.kinds.is_empty() || self.kinds.contains(&event.kind.tag())
    }
}
