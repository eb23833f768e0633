//! Raw record shape returned by ledger backends.
//!
//! A ledger hands back a file as an ordered tuple
//! `(storage_ref, name, size, flag, ...)`. Backends may append extra
//! trailing slots; only the first four are interpreted.

use crate::file_record::{FileId, FileRecord, StorageRef};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of leading tuple slots a file record is decoded from.
pub const FILE_TUPLE_ARITY: usize = 4;

/// A single decoded value from a ledger call result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum LedgerValue {
    Text(String),
    Uint(u64),
    Bool(bool),
}

impl LedgerValue {
    fn type_name(&self) -> &'static str {
        match self {
            LedgerValue::Text(_) => "text",
            LedgerValue::Uint(_) => "uint",
            LedgerValue::Bool(_) => "bool",
        }
    }
}

/// Errors raised while mapping a raw tuple into a [`FileRecord`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TupleError {
    #[error("file tuple too short: expected at least {expected} slots, got {actual}")]
    TooShort { expected: usize, actual: usize },
    #[error("file tuple slot {index} must be {expected}, got {found}")]
    UnexpectedType {
        index: usize,
        expected: &'static str,
        found: &'static str,
    },
    #[error("file tuple slot {index} holds an empty storage reference")]
    EmptyStorageRef { index: usize },
}

impl FileRecord {
    /// Decode the ledger tuple for `id`. Never truncates: a short tuple or a
    /// mistyped slot is an error.
    pub fn from_tuple(id: FileId, tuple: &[LedgerValue]) -> Result<Self, TupleError> {
        if tuple.len() < FILE_TUPLE_ARITY {
            return Err(TupleError::TooShort {
                expected: FILE_TUPLE_ARITY,
                actual: tuple.len(),
            });
        }

        let storage_ref = StorageRef::new(text_at(tuple, 0)?)
            .map_err(|_| TupleError::EmptyStorageRef { index: 0 })?;
        let name = text_at(tuple, 1)?.to_string();
        let size = uint_at(tuple, 2)?;
        let registration_flag = bool_at(tuple, 3)?;

        Ok(FileRecord {
            id,
            name,
            storage_ref,
            size,
            registration_flag,
            content: None,
        })
    }

    /// Encode the metadata part of a record in ledger tuple order.
    pub fn to_tuple(&self) -> Vec<LedgerValue> {
        vec![
            LedgerValue::Text(self.storage_ref.as_str().to_string()),
            LedgerValue::Text(self.name.clone()),
            LedgerValue::Uint(self.size),
            LedgerValue::Bool(self.registration_flag),
        ]
    }
}

fn text_at(tuple: &[LedgerValue], index: usize) -> Result<&str, TupleError> {
    match &tuple[index] {
        LedgerValue::Text(value) => Ok(value),
        other => Err(mismatch(index, "text", other)),
    }
}

fn uint_at(tuple: &[LedgerValue], index: usize) -> Result<u64, TupleError> {
    match &tuple[index] {
        LedgerValue::Uint(value) => Ok(*value),
        other => Err(mismatch(index, "uint", other)),
    }
}

fn bool_at(tuple: &[LedgerValue], index: usize) -> Result<bool, TupleError> {
    match &tuple[index] {
        LedgerValue::Bool(value) => Ok(*value),
        other => Err(mismatch(index, "bool", other)),
    }
}

fn mismatch(index: usize, expected: &'static str, found: &LedgerValue) -> TupleError {
    TupleError::UnexpectedType {
        index,
        expected,
        found: found.type_name(),
    }
}
