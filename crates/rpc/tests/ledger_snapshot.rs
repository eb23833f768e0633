//! Snapshot persistence for the in-process registry.

use dstore_rpc::{FileLedger, LedgerSnapshot, MemoryLedger};
use dstore_types::{EntityId, EventFilter, FileId, FileRecord, StorageRef};
use tempfile::TempDir;

fn entity(name: &str) -> EntityId {
    EntityId::new(name).unwrap()
}

#[tokio::test]
async fn save_and_reload_preserves_files_permissions_and_events() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("state").join("ledger.json");

    let alice = MemoryLedger::new(entity("alice"));
    let id = alice
        .add_file(&StorageRef::new("ref-1").unwrap(), "notes.md", 12, true)
        .await
        .unwrap();
    alice
        .set_write_permission(id, &entity("bob"), true)
        .await
        .unwrap();
    alice.save_to(&path).await.unwrap();

    let bob = MemoryLedger::load_from(&path, entity("bob")).await.unwrap();
    assert_eq!(bob.last_file_id().await.unwrap(), 1);
    assert_eq!(bob.owner_of(id).unwrap(), entity("alice"));

    // bob's grant survived the reload
    bob.set_filename(id, "renamed.md").await.unwrap();
    let record = FileRecord::from_tuple(id, &bob.get_file(id).await.unwrap()).unwrap();
    assert_eq!(record.name, "renamed.md");
    assert_eq!(record.size, 12);

    let history = bob.history(&EventFilter::default());
    assert_eq!(history.len(), 3);
    assert_eq!(history[2].sequence, 2);
}

#[tokio::test]
async fn missing_snapshot_starts_empty() {
    let dir = TempDir::new().unwrap();
    let ledger = MemoryLedger::load_from(dir.path().join("absent.json"), entity("alice"))
        .await
        .unwrap();
    assert_eq!(ledger.last_file_id().await.unwrap(), 0);
    assert_eq!(ledger.snapshot(), LedgerSnapshot::default());
}

#[tokio::test]
async fn corrupt_snapshot_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ledger.json");
    std::fs::write(&path, b"{not json").unwrap();

    assert!(MemoryLedger::load_from(&path, entity("alice")).await.is_err());
}

#[tokio::test]
async fn snapshot_ids_follow_position() {
    let alice = MemoryLedger::new(entity("alice"));
    for name in ["a", "b", "c"] {
        alice
            .add_file(&StorageRef::new(format!("ref-{name}")).unwrap(), name, 1, false)
            .await
            .unwrap();
    }

    let restored = MemoryLedger::from_snapshot(entity("carol"), alice.snapshot());
    let third = FileId::new(3).unwrap();
    let record = FileRecord::from_tuple(third, &restored.get_file(third).await.unwrap()).unwrap();
    assert_eq!(record.name, "c");
    assert!(!record.registration_flag);
}
