//! dstore shared types
//!
//! Identifiers, the file metadata record, the raw tuple shape returned by
//! ledger backends, and the ledger event feed. Every other dstore crate
//! speaks in these types.

pub mod event;
pub mod file_record;
pub mod wire;

pub use event::*;
pub use file_record::*;
pub use wire::*;

#[cfg(test)]
mod tests;
