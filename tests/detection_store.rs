use detection_timeline::{
    shared_memory_uri, BoundingBox, DetectionStore, RecordBuilder, SqliteDetectionStore,
    TimelineError,
};

fn builder() -> RecordBuilder {
    RecordBuilder::new(30.0).expect("valid fps")
}

#[test]
fn appends_are_read_back_in_insertion_order_with_ids() {
    let mut store = SqliteDetectionStore::open(&shared_memory_uri()).expect("open store");
    let b = builder();
    let bbox = BoundingBox::new(10.0, 20.0, 110.0, 220.0);

    let first = store.append(&b.build(0, "bird", bbox, 0.91)).unwrap();
    let ids = store
        .append_batch(&[b.build(45, "cat", bbox, 0.5), b.build(45, "Bird", bbox, 0.66)])
        .unwrap();
    assert!(ids.iter().all(|id| *id > first));
    assert!(ids[0] < ids[1]);

    let all = store.read_all().unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].id(), Some(first));
    assert_eq!(all[0].timestamp(), "0:00:00");
    assert_eq!(all[1].timestamp(), "0:00:01.500000");
    assert_eq!(all[2].bbox().coords(), [10.0, 20.0, 110.0, 220.0]);
    assert!((all[2].confidence() - 0.66).abs() < 1e-9);

    let birds = store.read_by_class("BIRD").unwrap();
    assert_eq!(birds.len(), 2);
    assert_eq!(store.count().unwrap(), 3);
}

#[test]
fn duplicate_records_are_kept() {
    let mut store = SqliteDetectionStore::open(&shared_memory_uri()).expect("open store");
    let record = builder().build(3, "bird", BoundingBox::new(0.0, 0.0, 1.0, 1.0), 0.5);
    store.append(&record).unwrap();
    store.append(&record).unwrap();
    assert_eq!(store.count().unwrap(), 2);
}

#[test]
fn store_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("detections.db");
    let db_path = db_path.to_str().unwrap();

    {
        let mut store = SqliteDetectionStore::open(db_path).unwrap();
        store
            .append(&builder().build(90, "bird", BoundingBox::new(1.0, 2.0, 3.0, 4.0), 0.8))
            .unwrap();
        store.close().unwrap();
    }

    let store = SqliteDetectionStore::open(db_path).unwrap();
    let all = store.read_all().unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].frame_index(), 90);
    assert_eq!(all[0].timestamp(), "0:00:03");
}

#[test]
fn unreachable_location_is_a_storage_error() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("missing").join("nested").join("detections.db");
    let err = SqliteDetectionStore::open(db_path.to_str().unwrap()).unwrap_err();
    assert!(matches!(err, TimelineError::Storage(_)));
}
