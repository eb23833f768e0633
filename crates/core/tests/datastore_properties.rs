use dstore_core::{Datastore, DatastoreOptions, EncryptionPolicy};
use dstore_rpc::{LocalRpcProvider, MemoryLedger};
use dstore_types::EntityId;
use proptest::prelude::*;
use proptest::test_runner::TestCaseResult;
use std::sync::Arc;
use tokio::runtime::Runtime;

// Property-based checks of the add/get/replace contract, under both
// encryption policies.

fn arbitrary_policy() -> impl Strategy<Value = EncryptionPolicy> {
    prop_oneof![
        Just(EncryptionPolicy::Encrypt),
        Just(EncryptionPolicy::Passthrough),
    ]
}

fn arbitrary_name() -> impl Strategy<Value = String> {
    "\\PC{1,40}"
}

fn arbitrary_bytes() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..2048)
}

fn datastore(policy: EncryptionPolicy) -> Datastore {
    let ledger = MemoryLedger::new(EntityId::new("alice").expect("entity"));
    Datastore::new(
        DatastoreOptions::new()
            .with_rpc(Arc::new(LocalRpcProvider::new(ledger)))
            .with_encryption_policy(policy),
    )
    .expect("datastore")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn added_files_read_back_unchanged(
        policy in arbitrary_policy(),
        name in arbitrary_name(),
        bytes in arbitrary_bytes(),
    ) {
        let rt = Runtime::new().expect("runtime");

        let outcome: TestCaseResult = rt.block_on(async move {
            let store = datastore(policy);
            let file_id = store.add_file(&name, &bytes).await.expect("add");

            let record = store.get_file(file_id).await.expect("get");
            prop_assert_eq!(&record.name, &name);
            prop_assert_eq!(record.size, bytes.len() as u64);
            prop_assert_eq!(record.content.as_deref(), Some(bytes.as_slice()));

            let info = store.get_file_info(file_id).await.expect("info");
            prop_assert!(info.content.is_none());
            prop_assert_eq!(info.storage_ref, record.storage_ref);
            Ok(())
        });
        outcome?;
    }

    #[test]
    fn replaced_content_reads_back_with_its_size(
        policy in arbitrary_policy(),
        original in arbitrary_bytes(),
        replacement in arbitrary_bytes(),
    ) {
        let rt = Runtime::new().expect("runtime");

        let outcome: TestCaseResult = rt.block_on(async move {
            let store = datastore(policy);
            let file_id = store.add_file("doc", &original).await.expect("add");
            let before = store.get_file_info(file_id).await.expect("info");

            store
                .set_file_content(file_id, &replacement)
                .await
                .expect("replace");

            let after = store.get_file(file_id).await.expect("get");
            prop_assert_eq!(after.size, replacement.len() as u64);
            prop_assert_eq!(after.content.as_deref(), Some(replacement.as_slice()));
            prop_assert_eq!(&after.name, "doc");
            // Passthrough refs are content addresses, so identical payloads share one.
            if policy == EncryptionPolicy::Encrypt || original != replacement {
                prop_assert_ne!(after.storage_ref, before.storage_ref);
            }
            Ok(())
        });
        outcome?;
    }

    #[test]
    fn listing_matches_insertion_order(
        policy in arbitrary_policy(),
        files in prop::collection::vec((arbitrary_name(), arbitrary_bytes()), 0..8),
        concurrency in 1usize..5,
    ) {
        let rt = Runtime::new().expect("runtime");

        let outcome: TestCaseResult = rt.block_on(async move {
            let ledger = MemoryLedger::new(EntityId::new("alice").expect("entity"));
            let store = Datastore::new(
                DatastoreOptions::new()
                    .with_rpc(Arc::new(LocalRpcProvider::new(ledger)))
                    .with_encryption_policy(policy)
                    .with_list_concurrency(concurrency),
            )
            .expect("datastore");

            for (name, bytes) in &files {
                store.add_file(name, bytes).await.expect("add");
            }

            let listed = store.list_files().await.expect("list");
            prop_assert_eq!(listed.len(), files.len());
            for (index, (record, (name, bytes))) in listed.iter().zip(&files).enumerate() {
                prop_assert_eq!(record.id.get(), index as u64 + 1);
                prop_assert_eq!(&record.name, name);
                prop_assert_eq!(record.size, bytes.len() as u64);
                prop_assert!(record.content.is_none());
            }
            Ok(())
        });
        outcome?;
    }
}
