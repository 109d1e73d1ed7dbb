#[cfg(test)]
mod tests {
    use crate::{
        fakes::FakeSource,
        utils::{
            catalog, checkpoints, drain_snapshot, drain_streaming, initializer, last_checkpoint,
            order, record_ids, records, settings, stream,
        },
    };
    use engine_core::{
        connectors::source::CollectionStatistics,
        state::{
            StateStore,
            models::{SnapshotStatus, StreamSnapshotState, SyncCheckpoint},
            sled_store::SledStateStore,
        },
    };
    use engine_processing::{error::CdcError, message::SyncMessage, planner::DEFAULT_CHUNK_SIZE};
    use model::{
        core::value::{Document, ObjectId, Value, ValueKind},
        pagination::cursor::{IdType, PrimaryKey},
    };
    use std::collections::BTreeSet;
    use tempfile::tempdir;
    use tracing_test::traced_test;

    const SYNC_ID: &str = "shop-sync";

    fn object_id(n: u8) -> Value {
        let hex = format!("{:024x}", n);
        Value::ObjectId(hex.parse::<ObjectId>().expect("valid object id"))
    }

    // Test Settings: checkpoint interval = 2, empty change log.
    // Scenario: First run over three incremental streams; every emitted checkpoint is persisted.
    // Expected Outcome:
    // - Every document of every stream is emitted once.
    // - The persisted checkpoint carries a global position and every stream is complete.
    #[traced_test]
    #[tokio::test]
    async fn first_run_snapshots_every_stream_and_persists_progress() {
        let source = FakeSource::new();
        for name in ["orders", "customers", "products"] {
            source.insert_documents(
                &stream(name),
                vec![order("a", 1), order("b", 2), order("c", 3)],
            );
        }

        let dir = tempdir().unwrap();
        let store = SledStateStore::open(dir.path()).unwrap();
        let catalog = catalog(&["orders", "customers", "products"]);

        let mut iterators = initializer(&source, settings(2))
            .create_iterators_from_store(&store, SYNC_ID, &catalog)
            .await
            .unwrap();

        let mut messages = drain_snapshot(&mut iterators.snapshot).await;
        messages.extend(drain_streaming(&mut iterators.streaming).await);
        for cp in checkpoints(&messages) {
            store.save_checkpoint(SYNC_ID, cp).await.unwrap();
        }

        assert_eq!(records(&messages).len(), 9);

        let persisted = store.load_checkpoint(SYNC_ID).await.unwrap().unwrap();
        assert!(persisted.global.is_some());
        assert_eq!(persisted.schema_enforced, Some(true));
        for name in ["orders", "customers", "products"] {
            let state = persisted.stream(&stream(name)).unwrap();
            assert_eq!(state.status, SnapshotStatus::Complete);
            assert_eq!(state.key_type, Some(IdType::String));
        }
        assert!(logs_contain("Snapshot complete"));
    }

    // Test Settings: checkpoint interval = 3.
    // Scenario: `orders` was interrupted after key 42 (Long keys 1..=50).
    // Expected Outcome:
    // - Only keys 43..=50 are emitted, in order.
    // - The stream completes at key 50 and no checkpoint points back at 42.
    #[traced_test]
    #[tokio::test]
    async fn interrupted_stream_resumes_after_its_last_key() {
        let source = FakeSource::new();
        source.insert_documents(
            &stream("orders"),
            (1..=50i64).map(|id| order(id, 10)).collect(),
        );

        let saved = SyncCheckpoint::default().with_stream(
            stream("orders"),
            StreamSnapshotState::in_progress(PrimaryKey::Long(42)),
        );

        let mut iterators = initializer(&source, settings(3))
            .create_iterators(Some(saved), &catalog(&["orders"]))
            .await
            .unwrap();

        assert_eq!(
            iterators.snapshot.pending_streams()[0].resume_after,
            Some(PrimaryKey::Long(42))
        );

        let messages = drain_snapshot(&mut iterators.snapshot).await;
        let ids: Vec<f64> = record_ids(&messages)
            .iter()
            .filter_map(|id| id.as_f64())
            .collect();
        assert_eq!(ids, (43..=50).map(|id| id as f64).collect::<Vec<_>>());

        for cp in checkpoints(&messages) {
            let state = cp.stream(&stream("orders")).unwrap();
            assert_ne!(state.last_seen_key, Some(PrimaryKey::Long(42)));
        }

        let last = last_checkpoint(&messages);
        let state = last.stream(&stream("orders")).unwrap();
        assert!(state.is_complete());
        assert_eq!(state.last_seen_key, Some(PrimaryKey::Long(50)));
        assert_eq!(state.key_type, Some(IdType::Long));
    }

    async fn interrupt_and_resume(docs: Vec<Document>) -> Vec<String> {
        let source = FakeSource::new();
        source.insert_documents(&stream("orders"), docs);
        let catalog = catalog(&["orders"]);

        // First run stops right after its first checkpoint.
        let mut first = initializer(&source, settings(2))
            .create_iterators(None, &catalog)
            .await
            .unwrap();
        let mut emitted = Vec::new();
        let mut saved = None;
        while let Some(message) = first.snapshot.next().await.unwrap() {
            match message {
                SyncMessage::Checkpoint(cp) => {
                    saved = Some(cp);
                    break;
                }
                record => emitted.push(record),
            }
        }
        first.snapshot.close().await;
        assert_eq!(source.open_scans(), 0);

        let mut second = initializer(&source, settings(2))
            .create_iterators(saved, &catalog)
            .await
            .unwrap();
        emitted.extend(drain_snapshot(&mut second.snapshot).await);

        record_ids(&emitted).iter().map(|id| id.to_string()).collect()
    }

    // Test Settings: checkpoint interval = 2.
    // Scenario: For ObjectId, String and Int keys, a run is interrupted after its first checkpoint and resumed.
    // Expected Outcome: Across both runs every document is emitted exactly once.
    #[traced_test]
    #[tokio::test]
    async fn resume_is_exact_for_every_supported_key_type() {
        let cases: Vec<Vec<Document>> = vec![
            (1..=5u8).map(|n| order(object_id(n), 1)).collect(),
            ["e", "a", "d", "b", "c"]
                .into_iter()
                .map(|id| order(id, 1))
                .collect(),
            [5, 3, 1, 4, 2].into_iter().map(|id| order(id, 1)).collect(),
        ];

        for docs in cases {
            let ids = interrupt_and_resume(docs).await;
            let unique: BTreeSet<&String> = ids.iter().collect();
            assert_eq!(ids.len(), 5, "emitted: {ids:?}");
            assert_eq!(unique.len(), 5, "emitted: {ids:?}");
        }
    }

    // Test Settings: Default.
    // Scenario: `orders` holds both string and int `_id` values.
    // Expected Outcome: Composing the run fails with a fatal key type error before anything is emitted.
    #[traced_test]
    #[tokio::test]
    async fn mixed_key_types_fail_planning() {
        let source = FakeSource::new();
        source.insert_documents(&stream("orders"), vec![order("a", 1), order(7, 2)]);

        let result = initializer(&source, settings(10))
            .create_iterators(None, &catalog(&["orders"]))
            .await;

        match result {
            Err(err @ CdcError::InconsistentKeyType { .. }) => {
                assert!(err.is_fatal());
                assert!(err.to_string().contains("must be consistently typed"));
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("planning should fail on mixed key types"),
        }
        assert_eq!(source.open_scans(), 0);
    }

    // Test Settings: Default.
    // Scenario: `orders` is keyed by doubles.
    // Expected Outcome: Planning fails listing the supported key types.
    #[traced_test]
    #[tokio::test]
    async fn unsupported_key_type_fails_planning() {
        let source = FakeSource::new();
        source.insert_documents(&stream("orders"), vec![order(1.5, 1)]);

        let result = initializer(&source, settings(10))
            .create_iterators(None, &catalog(&["orders"]))
            .await;

        match result {
            Err(err @ CdcError::UnsupportedKeyType { .. }) => {
                assert!(err.to_string().contains(
                    "Only _id fields with the following types are currently supported"
                ));
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("planning should reject double keys"),
        }
    }

    // Test Settings: Default.
    // Scenario: Key discovery reports only strings but the scan meets an int key.
    // Expected Outcome:
    // - The snapshot fails with a key type error.
    // - The scan is released and the iterator yields nothing afterwards.
    #[traced_test]
    #[tokio::test]
    async fn key_type_change_during_scan_aborts_snapshot() {
        let source = FakeSource::new();
        source.insert_documents(
            &stream("orders"),
            vec![order("a", 1), order("b", 2), order(7, 3)],
        );
        source.override_id_types(&stream("orders"), vec![ValueKind::String]);

        let mut iterators = initializer(&source, settings(10))
            .create_iterators(None, &catalog(&["orders", "customers"]))
            .await
            .unwrap();

        let err = loop {
            match iterators.snapshot.next().await {
                Ok(Some(_)) => continue,
                Ok(None) => panic!("snapshot should fail on the int key"),
                Err(err) => break err,
            }
        };

        assert!(matches!(err, CdcError::InconsistentKeyType { .. }));
        assert_eq!(source.open_scans(), 0);
        assert!(iterators.snapshot.next().await.unwrap().is_none());
    }

    // Test Settings: Collection statistics are unavailable.
    // Scenario: First run over one stream.
    // Expected Outcome: The failure is logged and the snapshot runs with the default chunk size.
    #[traced_test]
    #[tokio::test]
    async fn statistics_failure_does_not_fail_the_run() {
        let source = FakeSource::new();
        source.insert_documents(&stream("orders"), vec![order("a", 1), order("b", 2)]);
        source.fail_statistics();

        let mut iterators = initializer(&source, settings(10))
            .create_iterators(None, &catalog(&["orders"]))
            .await
            .unwrap();

        assert!(iterators.snapshot.pending_streams()[0].statistics.is_none());
        let messages = drain_snapshot(&mut iterators.snapshot).await;
        assert_eq!(records(&messages).len(), 2);
        assert!(logs_contain("Unable to read collection statistics"));
        assert_eq!(
            source.scan_batch_size(&stream("orders")),
            Some(DEFAULT_CHUNK_SIZE)
        );
    }

    // Test Settings: Default target chunk size (1 GiB).
    // Scenario: `orders` reports 1000 documents taking 4 GiB; `customers` reports nothing.
    // Expected Outcome:
    // - `orders` is scanned 250 documents per round trip.
    // - `customers` falls back to the default batch size.
    #[traced_test]
    #[tokio::test]
    async fn scans_fetch_batches_sized_from_collection_statistics() {
        let source = FakeSource::new();
        source.insert_documents(&stream("orders"), vec![order("a", 1), order("b", 2)]);
        source.insert_documents(&stream("customers"), vec![order("a", 1)]);
        source.set_statistics(
            &stream("orders"),
            CollectionStatistics {
                count: 1000,
                size_bytes: 4 * 1024 * 1024 * 1024,
            },
        );

        let mut iterators = initializer(&source, settings(10))
            .create_iterators(None, &catalog(&["orders", "customers"]))
            .await
            .unwrap();
        let messages = drain_snapshot(&mut iterators.snapshot).await;

        assert_eq!(records(&messages).len(), 3);
        assert_eq!(source.scan_batch_size(&stream("orders")), Some(250));
        assert_eq!(
            source.scan_batch_size(&stream("customers")),
            Some(DEFAULT_CHUNK_SIZE)
        );
        assert!(logs_contain("batch_size=250"));
    }

    // Test Settings: The `orders` scan fails after two documents.
    // Scenario: Snapshot of `orders` followed by `customers`.
    // Expected Outcome:
    // - The source error surfaces and is not fatal.
    // - The scan is released and `customers` is never opened.
    #[traced_test]
    #[tokio::test]
    async fn scan_failure_releases_the_scan() {
        let source = FakeSource::new();
        source.insert_documents(
            &stream("orders"),
            (0..5).map(|n| order(format!("o{n}"), n)).collect(),
        );
        source.insert_documents(&stream("customers"), vec![order("c", 1)]);
        source.fail_scan_after(&stream("orders"), 2);

        let mut iterators = initializer(&source, settings(10))
            .create_iterators(None, &catalog(&["orders", "customers"]))
            .await
            .unwrap();

        let mut emitted = Vec::new();
        let err = loop {
            match iterators.snapshot.next().await {
                Ok(Some(message)) => emitted.push(message),
                Ok(None) => panic!("scan failure should surface"),
                Err(err) => break err,
            }
        };

        assert!(matches!(err, CdcError::Source(_)));
        assert!(!err.is_fatal());
        assert_eq!(records(&emitted).len(), 2);
        assert_eq!(source.open_scans(), 0);
        assert!(iterators.snapshot.next().await.unwrap().is_none());
    }

    // Test Settings: Default.
    // Scenario: The consumer stops after the first record.
    // Expected Outcome: Closing the iterator releases the open scan.
    #[traced_test]
    #[tokio::test]
    async fn closing_mid_snapshot_releases_the_scan() {
        let source = FakeSource::new();
        source.insert_documents(&stream("orders"), vec![order("a", 1), order("b", 2)]);

        let mut iterators = initializer(&source, settings(10))
            .create_iterators(None, &catalog(&["orders"]))
            .await
            .unwrap();

        let first = iterators.snapshot.next().await.unwrap();
        assert!(first.is_some_and(|m| !m.is_checkpoint()));
        assert_eq!(source.open_scans(), 1);

        iterators.snapshot.close().await;
        assert_eq!(source.open_scans(), 0);
        assert!(iterators.snapshot.next().await.unwrap().is_none());
    }

    // Test Settings: checkpoint interval = 2.
    // Scenario: Five documents in one stream.
    // Expected Outcome: A checkpoint follows every second record and names that record's key.
    #[traced_test]
    #[tokio::test]
    async fn checkpoints_follow_the_records_they_cover() {
        let source = FakeSource::new();
        source.insert_documents(
            &stream("orders"),
            ["a", "b", "c", "d", "e"]
                .into_iter()
                .map(|id| order(id, 1))
                .collect(),
        );

        let mut iterators = initializer(&source, settings(2))
            .create_iterators(None, &catalog(&["orders"]))
            .await
            .unwrap();
        let messages = drain_snapshot(&mut iterators.snapshot).await;

        let mut last_id = None;
        let mut progress = Vec::new();
        for message in &messages {
            match message {
                SyncMessage::Record(record) => last_id = record.get("_id").cloned(),
                SyncMessage::Checkpoint(cp) => {
                    let state = cp.stream(&stream("orders")).unwrap();
                    if state.status == SnapshotStatus::InProgress {
                        let key = state.last_seen_key.as_ref().unwrap().to_string();
                        assert_eq!(last_id.as_ref().and_then(|v| v.as_str()), Some(key.as_str()));
                        progress.push(key);
                    }
                }
            }
        }

        assert_eq!(progress, vec!["b".to_string(), "d".to_string()]);
        assert!(last_checkpoint(&messages).stream(&stream("orders")).unwrap().is_complete());
    }
}
