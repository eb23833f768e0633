//! In-process file registry
//!
//! Mirrors a permissioned registry contract: ids are assigned 1, 2, 3, ...;
//! the entity that registers a file owns it; the owner and any entity
//! granted write permission may replace content or rename; only the owner
//! may grant or revoke write permission. Every mutation is appended to an
//! ordered event log and broadcast to live subscribers.

use crate::snapshot::{FileSnapshot, LedgerSnapshot};
use crate::{EventStream, FileLedger, Result, RpcError};
use async_trait::async_trait;
use dstore_types::{
    EntityId, EventFilter, FileId, FileRecord, LedgerEvent, LedgerEventKind, LedgerValue,
    StorageRef,
};
use futures::stream::{self, StreamExt};
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::debug;

/// Live events buffered per subscriber before it is reported as lagging.
const EVENT_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
pub(crate) struct StoredFile {
    pub(crate) storage_ref: StorageRef,
    pub(crate) name: String,
    pub(crate) size: u64,
    pub(crate) flag: bool,
    pub(crate) owner: EntityId,
    pub(crate) writers: BTreeSet<EntityId>,
}

impl StoredFile {
    fn can_write(&self, entity: &EntityId) -> bool {
        &self.owner == entity || self.writers.contains(entity)
    }
}

#[derive(Debug, Default)]
pub(crate) struct LedgerState {
    /// Index `i` holds file id `i + 1`.
    pub(crate) files: Vec<StoredFile>,
    pub(crate) events: Vec<LedgerEvent>,
}

struct Shared {
    state: RwLock<LedgerState>,
    events_tx: broadcast::Sender<LedgerEvent>,
}

/// Registry handle acting on behalf of one caller. Handles created with
/// [`MemoryLedger::as_caller`] share state with the original.
#[derive(Clone)]
pub struct MemoryLedger {
    caller: EntityId,
    shared: Arc<Shared>,
}

impl MemoryLedger {
    /// Empty registry; calls are made as `caller`.
    pub fn new(caller: EntityId) -> Self {
        Self::with_state(caller, LedgerState::default())
    }

    pub(crate) fn with_state(caller: EntityId, state: LedgerState) -> Self {
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            caller,
            shared: Arc::new(Shared {
                state: RwLock::new(state),
                events_tx,
            }),
        }
    }

    /// Rebuild a registry from a snapshot.
    pub fn from_snapshot(caller: EntityId, snapshot: LedgerSnapshot) -> Self {
        Self::with_state(caller, snapshot.into_state())
    }

    /// Handle on the same registry acting as `caller`.
    pub fn as_caller(&self, caller: EntityId) -> Self {
        Self {
            caller,
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn caller(&self) -> &EntityId {
        &self.caller
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        let state = self.shared.state.read();
        LedgerSnapshot {
            files: state.files.iter().map(FileSnapshot::from).collect(),
            events: state.events.clone(),
        }
    }

    /// Recorded events matching `filter`, oldest first.
    pub fn history(&self, filter: &EventFilter) -> Vec<LedgerEvent> {
        let state = self.shared.state.read();
        state
            .events
            .iter()
            .filter(|event| filter.matches(event))
            .cloned()
            .collect()
    }

    /// Owner of `file_id`.
    pub fn owner_of(&self, file_id: FileId) -> Result<EntityId> {
        let state = self.shared.state.read();
        file_at(&state, file_id).map(|file| file.owner.clone())
    }

    fn record(&self, state: &mut LedgerState, file_id: FileId, kind: LedgerEventKind) {
        let event = LedgerEvent {
            sequence: state.events.len() as u64,
            file_id,
            kind,
        };
        state.events.push(event.clone());
        // No receivers is not an error; the log keeps the event for replay.
        let _ = self.shared.events_tx.send(event);
    }

    fn writable<'a>(&self, state: &'a mut LedgerState, file_id: FileId) -> Result<&'a mut StoredFile> {
        let file = file_at_mut(state, file_id)?;
        if !file.can_write(&self.caller) {
            return Err(RpcError::PermissionDenied(format!(
                "{} may not write file {file_id}",
                self.caller
            )));
        }
        Ok(file)
    }
}

fn file_at(state: &LedgerState, file_id: FileId) -> Result<&StoredFile> {
    state
        .files
        .get((file_id.get() - 1) as usize)
        .ok_or(RpcError::NotFound(file_id))
}

fn file_at_mut(state: &mut LedgerState, file_id: FileId) -> Result<&mut StoredFile> {
    state
        .files
        .get_mut((file_id.get() - 1) as usize)
        .ok_or(RpcError::NotFound(file_id))
}

fn require_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(RpcError::InvalidArgument("file name must not be empty".into()));
    }
    Ok(())
}

#[async_trait]
impl FileLedger for MemoryLedger {
    async fn add_file(
        &self,
        storage_ref: &StorageRef,
        name: &str,
        size: u64,
        flag: bool,
    ) -> Result<FileId> {
        require_name(name)?;

        let mut state = self.shared.state.write();
        let file_id = FileId::new(state.files.len() as u64 + 1)
            .map_err(|e| RpcError::InvalidArgument(e.to_string()))?;
        state.files.push(StoredFile {
            storage_ref: storage_ref.clone(),
            name: name.to_string(),
            size,
            flag,
            owner: self.caller.clone(),
            writers: BTreeSet::new(),
        });
        self.record(
            &mut state,
            file_id,
            LedgerEventKind::FileAdded {
                name: name.to_string(),
                storage_ref: storage_ref.clone(),
                size,
            },
        );

        debug!(%file_id, owner = %self.caller, "file registered");
        Ok(file_id)
    }

    async fn get_file(&self, file_id: FileId) -> Result<Vec<LedgerValue>> {
        let state = self.shared.state.read();
        let file = file_at(&state, file_id)?;
        let record = FileRecord {
            id: file_id,
            name: file.name.clone(),
            storage_ref: file.storage_ref.clone(),
            size: file.size,
            registration_flag: file.flag,
            content: None,
        };
        let mut tuple = record.to_tuple();
        tuple.push(LedgerValue::Text(file.owner.to_string()));
        Ok(tuple)
    }

    async fn set_file_content(
        &self,
        file_id: FileId,
        storage_ref: &StorageRef,
        size: u64,
    ) -> Result<()> {
        let mut state = self.shared.state.write();
        let file = self.writable(&mut state, file_id)?;
        file.storage_ref = storage_ref.clone();
        file.size = size;
        self.record(
            &mut state,
            file_id,
            LedgerEventKind::ContentUpdated {
                storage_ref: storage_ref.clone(),
                size,
            },
        );
        Ok(())
    }

    async fn set_filename(&self, file_id: FileId, name: &str) -> Result<()> {
        require_name(name)?;

        let mut state = self.shared.state.write();
        let file = self.writable(&mut state, file_id)?;
        file.name = name.to_string();
        self.record(
            &mut state,
            file_id,
            LedgerEventKind::FileRenamed {
                name: name.to_string(),
            },
        );
        Ok(())
    }

    async fn set_write_permission(
        &self,
        file_id: FileId,
        entity: &EntityId,
        allowed: bool,
    ) -> Result<()> {
        let mut state = self.shared.state.write();
        let file = file_at_mut(&mut state, file_id)?;
        if file.owner != self.caller {
            return Err(RpcError::PermissionDenied(format!(
                "only the owner may change permissions on file {file_id}"
            )));
        }
        if allowed {
            file.writers.insert(entity.clone());
        } else {
            file.writers.remove(entity);
        }
        self.record(
            &mut state,
            file_id,
            LedgerEventKind::PermissionChanged {
                entity: entity.clone(),
                allowed,
            },
        );
        Ok(())
    }

    async fn last_file_id(&self) -> Result<u64> {
        Ok(self.shared.state.read().files.len() as u64)
    }

    async fn subscribe(&self, filter: EventFilter) -> Result<EventStream> {
        // Subscribing under the read lock splits the feed cleanly: every
        // event already logged is replayed, every later one arrives live.
        let (replay, rx) = {
            let state = self.shared.state.read();
            let replay: Vec<LedgerEvent> = state
                .events
                .iter()
                .filter(|event| filter.matches(event))
                .cloned()
                .collect();
            (replay, self.shared.events_tx.subscribe())
        };

        let live = stream::unfold((rx, filter), |(mut rx, filter)| async move {
            loop {
                match rx.recv().await {
                    Ok(event) if filter.matches(&event) => {
                        return Some((Ok(event), (rx, filter)));
                    }
                    Ok(_) => continue,
                    Err(RecvError::Lagged(skipped)) => {
                        let err = RpcError::Network(format!(
                            "subscriber lagged behind by {skipped} events"
                        ));
                        return Some((Err(err), (rx, filter)));
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        });

        Ok(stream::iter(replay.into_iter().map(Ok)).chain(live).boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(name: &str) -> EntityId {
        EntityId::new(name).unwrap()
    }

    fn sref(tag: &str) -> StorageRef {
        StorageRef::new(tag).unwrap()
    }

    #[tokio::test]
    async fn ids_are_assigned_contiguously() {
        let ledger = MemoryLedger::new(entity("alice"));
        assert_eq!(ledger.last_file_id().await.unwrap(), 0);

        let a = ledger.add_file(&sref("r1"), "a", 1, true).await.unwrap();
        let b = ledger.add_file(&sref("r2"), "b", 2, true).await.unwrap();

        assert_eq!(a.get(), 1);
        assert_eq!(b.get(), 2);
        assert_eq!(ledger.last_file_id().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn tuple_carries_owner_after_record_slots() {
        let ledger = MemoryLedger::new(entity("alice"));
        let id = ledger.add_file(&sref("r1"), "a.txt", 3, true).await.unwrap();

        let tuple = ledger.get_file(id).await.unwrap();
        let record = FileRecord::from_tuple(id, &tuple).unwrap();
        assert_eq!(record.name, "a.txt");
        assert_eq!(tuple[4], LedgerValue::Text("alice".into()));
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let ledger = MemoryLedger::new(entity("alice"));
        let missing = FileId::new(9).unwrap();
        assert_eq!(
            ledger.get_file(missing).await,
            Err(RpcError::NotFound(missing))
        );
        assert_eq!(
            ledger.set_filename(missing, "x").await,
            Err(RpcError::NotFound(missing))
        );
    }

    #[tokio::test]
    async fn empty_names_are_rejected() {
        let ledger = MemoryLedger::new(entity("alice"));
        assert!(matches!(
            ledger.add_file(&sref("r"), "", 0, true).await,
            Err(RpcError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn writers_need_a_grant_from_the_owner() {
        let alice = MemoryLedger::new(entity("alice"));
        let bob = alice.as_caller(entity("bob"));
        let id = alice.add_file(&sref("r1"), "a", 1, true).await.unwrap();

        assert!(matches!(
            bob.set_filename(id, "stolen").await,
            Err(RpcError::PermissionDenied(_))
        ));
        assert!(matches!(
            bob.set_write_permission(id, &entity("bob"), true).await,
            Err(RpcError::PermissionDenied(_))
        ));

        alice
            .set_write_permission(id, &entity("bob"), true)
            .await
            .unwrap();
        bob.set_file_content(id, &sref("r2"), 7).await.unwrap();
        bob.set_filename(id, "shared").await.unwrap();

        let record = FileRecord::from_tuple(id, &alice.get_file(id).await.unwrap()).unwrap();
        assert_eq!(record.name, "shared");
        assert_eq!(record.size, 7);
        assert_eq!(record.storage_ref, sref("r2"));
        assert_eq!(alice.owner_of(id).unwrap(), entity("alice"));

        alice
            .set_write_permission(id, &entity("bob"), false)
            .await
            .unwrap();
        assert!(bob.set_filename(id, "again").await.is_err());
    }

    #[tokio::test]
    async fn subscription_replays_then_follows() {
        let ledger = MemoryLedger::new(entity("alice"));
        let id = ledger.add_file(&sref("r1"), "a", 1, true).await.unwrap();

        let mut events = ledger.subscribe(EventFilter::default()).await.unwrap();
        ledger.set_filename(id, "b").await.unwrap();

        let first = events.next().await.unwrap().unwrap();
        assert_eq!(first.sequence, 0);
        assert!(matches!(first.kind, LedgerEventKind::FileAdded { .. }));

        let second = events.next().await.unwrap().unwrap();
        assert_eq!(second.sequence, 1);
        assert_eq!(second.kind, LedgerEventKind::FileRenamed { name: "b".into() });
    }

    #[tokio::test]
    async fn subscription_can_restart_from_a_sequence() {
        let ledger = MemoryLedger::new(entity("alice"));
        let id = ledger.add_file(&sref("r1"), "a", 1, true).await.unwrap();
        ledger.set_filename(id, "b").await.unwrap();
        ledger.set_filename(id, "c").await.unwrap();

        let mut events = ledger
            .subscribe(EventFilter::default().starting_at(2))
            .await
            .unwrap();
        let event = events.next().await.unwrap().unwrap();
        assert_eq!(event.sequence, 2);
        assert_eq!(event.kind, LedgerEventKind::FileRenamed { name: "c".into() });
    }

    #[test]
    fn history_filters_recorded_events() {
        let ledger = MemoryLedger::new(entity("alice"));
        let rt = tokio::runtime::Runtime::new().expect("tokio runtime");
        rt.block_on(async {
            let a = ledger.add_file(&sref("r1"), "a", 1, true).await.unwrap();
            ledger.add_file(&sref("r2"), "b", 1, true).await.unwrap();
            ledger.set_filename(a, "a2").await.unwrap();
        });

        let only_first = ledger.history(&EventFilter::for_file(FileId::new(1).unwrap()));
        assert_eq!(only_first.len(), 2);
        assert_eq!(ledger.history(&EventFilter::default()).len(), 3);
    }
}
