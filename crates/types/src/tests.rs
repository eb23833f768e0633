use crate::{
    EntityId, EventFilter, EventKind, FileId, FileRecord, LedgerEvent, LedgerEventKind,
    LedgerValue, StorageRef, TupleError, TypesError,
};

fn sample_tuple() -> Vec<LedgerValue> {
    vec![
        LedgerValue::Text("b3f0".into()),
        LedgerValue::Text("a.txt".into()),
        LedgerValue::Uint(3),
        LedgerValue::Bool(true),
    ]
}

fn event(sequence: u64, file: u64, kind: LedgerEventKind) -> LedgerEvent {
    LedgerEvent {
        sequence,
        file_id: FileId::new(file).unwrap(),
        kind,
    }
}

#[cfg(test)]
mod type_tests {
    use super::*;

    #[test]
    fn file_id_rejects_zero() {
        assert_eq!(FileId::new(0), Err(TypesError::ZeroFileId));
        assert_eq!(FileId::new(7).unwrap().get(), 7);
    }

    #[test]
    fn file_id_range_is_one_based_and_ascending() {
        let ids: Vec<u64> = FileId::range_through(3).map(FileId::get).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(FileId::range_through(0).count(), 0);
    }

    #[test]
    fn entity_id_is_trimmed_and_non_empty() {
        assert_eq!(EntityId::new("  alice ").unwrap().as_str(), "alice");
        assert_eq!(EntityId::new("   "), Err(TypesError::EmptyEntity));
    }

    #[test]
    fn storage_ref_rejects_empty() {
        assert_eq!(StorageRef::new(""), Err(TypesError::EmptyStorageRef));
    }

    #[test]
    fn tuple_maps_into_record_without_content() {
        let id = FileId::new(1).unwrap();
        let record = FileRecord::from_tuple(id, &sample_tuple()).expect("decode tuple");
        assert_eq!(record.id, id);
        assert_eq!(record.name, "a.txt");
        assert_eq!(record.size, 3);
        assert_eq!(record.storage_ref.as_str(), "b3f0");
        assert!(record.registration_flag);
        assert!(!record.has_content());
        assert_eq!(record.to_tuple(), sample_tuple());
    }

    #[test]
    fn tuple_with_trailing_slots_is_accepted() {
        let mut tuple = sample_tuple();
        tuple.push(LedgerValue::Text("owner".into()));
        tuple.push(LedgerValue::Bool(false));
        let record = FileRecord::from_tuple(FileId::new(2).unwrap(), &tuple).unwrap();
        assert_eq!(record.name, "a.txt");
    }

    #[test]
    fn short_tuple_fails_loudly() {
        let tuple = &sample_tuple()[..3];
        let err = FileRecord::from_tuple(FileId::new(1).unwrap(), tuple).unwrap_err();
        assert_eq!(
            err,
            TupleError::TooShort {
                expected: 4,
                actual: 3
            }
        );
    }

    #[test]
    fn mistyped_slot_is_reported_by_index() {
        let mut tuple = sample_tuple();
        tuple[2] = LedgerValue::Text("three".into());
        let err = FileRecord::from_tuple(FileId::new(1).unwrap(), &tuple).unwrap_err();
        assert_eq!(
            err,
            TupleError::UnexpectedType {
                index: 2,
                expected: "uint",
                found: "text"
            }
        );
    }

    #[test]
    fn record_json_omits_missing_content() {
        let record = FileRecord::from_tuple(FileId::new(1).unwrap(), &sample_tuple()).unwrap();
        let json = serde_json::to_string(&record).expect("serialize record");
        assert!(json.contains("\"id\":1"));
        assert!(!json.contains("content"));

        let with_content = record.with_content(vec![1, 2, 3]);
        let json = serde_json::to_string(&with_content).expect("serialize record");
        assert!(json.contains("\"content\":[1,2,3]"));
    }

    #[test]
    fn file_id_deserialization_rejects_zero() {
        assert!(serde_json::from_str::<FileId>("0").is_err());
        assert_eq!(serde_json::from_str::<FileId>("5").unwrap().get(), 5);
    }

    #[test]
    fn filter_matches_on_file_kind_and_sequence() {
        let renamed = event(4, 2, LedgerEventKind::FileRenamed { name: "b".into() });

        assert!(EventFilter::default().matches(&renamed));
        assert!(EventFilter::for_file(FileId::new(2).unwrap()).matches(&renamed));
        assert!(!EventFilter::for_file(FileId::new(1).unwrap()).matches(&renamed));
        assert!(EventFilter::default()
            .with_kinds([EventKind::FileRenamed])
            .matches(&renamed));
        assert!(!EventFilter::default()
            .with_kinds([EventKind::FileAdded, EventKind::ContentUpdated])
            .matches(&renamed));
        assert!(EventFilter::default().starting_at(4).matches(&renamed));
        assert!(!EventFilter::default().starting_at(5).matches(&renamed));
    }
}
