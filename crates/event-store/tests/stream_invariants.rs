//! Stream invariants for the in-memory store: append order, conflict
//! isolation, and linearizable check-and-append under concurrent writers.

use std::sync::Arc;

use event_store::{
    AppendOptions, EventEnvelope, EventStore, EventStoreError, InMemoryEventStore, RecordedEvent,
    StreamId, Version,
};
use proptest::prelude::*;
use tokio::sync::Barrier;

fn event(stream: &StreamId, event_type: &str) -> EventEnvelope {
    EventEnvelope::new(stream, event_type, serde_json::json!({ "kind": event_type }))
}

fn types(events: &[RecordedEvent]) -> Vec<String> {
    events.iter().map(|e| e.event.event_type.clone()).collect()
}

#[tokio::test]
async fn order_scenario() {
    let store = InMemoryEventStore::new();
    let stream = StreamId::new("order-1", "Order");

    let v = store
        .save_events(&stream, vec![event(&stream, "Created")], AppendOptions::expect_version(Version::new(0)))
        .await
        .unwrap();
    assert_eq!(v, Version::new(1));

    let err = store
        .save_events(&stream, vec![event(&stream, "Paid")], AppendOptions::expect_version(Version::new(0)))
        .await
        .unwrap_err();
    match err {
        EventStoreError::ConcurrencyConflict {
            stream: conflicted,
            expected,
            actual,
        } => {
            assert_eq!(conflicted, stream);
            assert_eq!(expected, Version::new(0));
            assert_eq!(actual, Version::new(1));
        }
        other => panic!("expected conflict, got {other:?}"),
    }

    let v = store
        .save_events(&stream, vec![event(&stream, "Paid")], AppendOptions::expect_version(Version::new(1)))
        .await
        .unwrap();
    assert_eq!(v, Version::new(2));

    let loaded = store.load_events(&stream, None).await.unwrap();
    assert_eq!(types(&loaded), vec!["Created", "Paid"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_appends_with_same_expected_version() {
    let store = InMemoryEventStore::new();
    let stream = StreamId::new("order-race", "Order");

    let seed = vec![
        event(&stream, "A"),
        event(&stream, "B"),
        event(&stream, "C"),
    ];
    store
        .save_events(&stream, seed, AppendOptions::new())
        .await
        .unwrap();

    let barrier = Arc::new(Barrier::new(2));
    let mut handles = Vec::new();
    for name in ["Left", "Right"] {
        let store = store.clone();
        let stream = stream.clone();
        let barrier = Arc::clone(&barrier);
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            store
                .save_events(
                    &stream,
                    vec![event(&stream, name)],
                    AppendOptions::expect_version(Version::new(3)),
                )
                .await
        }));
    }

    let mut successes = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(version) => {
                assert_eq!(version, Version::new(4));
                successes += 1;
            }
            Err(EventStoreError::ConcurrencyConflict {
                expected, actual, ..
            }) => {
                assert_eq!(expected, Version::new(3));
                assert_eq!(actual, Version::new(4));
                conflicts += 1;
            }
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(conflicts, 1);
    assert_eq!(store.stream_version(&stream).await.unwrap(), Version::new(4));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_unchecked_batches_never_interleave() {
    let store = InMemoryEventStore::new();
    let stream = StreamId::new("order-batches", "Order");

    let mut handles = Vec::new();
    for writer in 0..8 {
        let store = store.clone();
        let stream = stream.clone();
        handles.push(tokio::spawn(async move {
            let batch: Vec<EventEnvelope> = (0..5)
                .map(|i| event(&stream, &format!("w{writer}-{i}")))
                .collect();
            store
                .save_events(&stream, batch, AppendOptions::new())
                .await
                .unwrap()
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let loaded = store.load_events(&stream, None).await.unwrap();
    assert_eq!(loaded.len(), 40);

    for chunk in loaded.chunks(5) {
        let writer = chunk[0].event.event_type.split('-').next().unwrap().to_string();
        for (i, recorded) in chunk.iter().enumerate() {
            assert_eq!(recorded.event.event_type, format!("{writer}-{i}"));
        }
    }

    let versions: Vec<i64> = loaded.iter().map(|e| e.version.as_i64()).collect();
    assert_eq!(versions, (1..=40).collect::<Vec<_>>());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn writers_on_different_streams_all_succeed() {
    let store = InMemoryEventStore::new();

    let mut handles = Vec::new();
    for n in 0..16 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            let stream = StreamId::new(format!("order-{n}"), "Order");
            store
                .save_events(&stream, vec![event(&stream, "Created")], AppendOptions::expect_new())
                .await
        }));
    }

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), Version::first());
    }
    assert_eq!(store.event_count().await, 16);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn global_log_and_streams_hold_the_same_events() {
    use futures_util::StreamExt;

    let store = InMemoryEventStore::new();
    let streams: Vec<StreamId> = (0..6)
        .map(|n| StreamId::new(format!("order-{n}"), "Order"))
        .collect();

    let mut handles = Vec::new();
    for stream in streams.clone() {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            for i in 0..4 {
                store
                    .save_events(&stream, vec![event(&stream, &format!("E{i}"))], AppendOptions::new())
                    .await
                    .unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let global: Vec<RecordedEvent> = store
        .stream_all_events()
        .await
        .unwrap()
        .map(Result::unwrap)
        .collect()
        .await;
    let positions: Vec<i64> = global.iter().map(|e| e.position).collect();
    assert_eq!(positions, (1..=24).collect::<Vec<_>>());

    for stream in &streams {
        let from_stream = store.load_events(stream, None).await.unwrap();
        let from_log: Vec<RecordedEvent> = global
            .iter()
            .filter(|e| stream.owns(&e.event))
            .cloned()
            .collect();
        assert_eq!(from_stream, from_log);
        assert_eq!(store.stream_version(stream).await.unwrap(), Version::new(4));
    }
    assert_eq!(store.event_count().await, 24);
    assert_eq!(store.stream_count().await, 6);
}

fn batch_names() -> impl Strategy<Value = Vec<Vec<String>>> {
    prop::collection::vec(prop::collection::vec("[A-Z][a-z]{1,8}", 1..4), 1..6)
}

proptest! {
    #[test]
    fn successful_appends_concatenate_in_order(batches in batch_names()) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let (expected, loaded, final_version) = rt.block_on(async {
            let store = InMemoryEventStore::new();
            let stream = StreamId::new("prop-order", "Order");
            let mut expected = Vec::new();
            let mut version = Version::initial();

            for batch in &batches {
                let envelopes = batch.iter().map(|name| event(&stream, name)).collect();
                version = store
                    .save_events(&stream, envelopes, AppendOptions::expect_version(version))
                    .await
                    .unwrap();
                expected.extend(batch.iter().cloned());
            }

            let loaded = types(&store.load_events(&stream, None).await.unwrap());
            (expected, loaded, version)
        });

        prop_assert_eq!(final_version.as_i64() as usize, expected.len());
        prop_assert_eq!(loaded, expected);
    }

    #[test]
    fn stale_expected_version_conflicts_and_changes_nothing(
        seed in 0usize..6,
        offset in 1i64..5,
        below in any::<bool>(),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let (before, after, conflicted) = rt.block_on(async {
            let store = InMemoryEventStore::new();
            let stream = StreamId::new("prop-conflict", "Order");

            if seed > 0 {
                let envelopes = (0..seed).map(|i| event(&stream, &format!("E{i}"))).collect();
                store
                    .save_events(&stream, envelopes, AppendOptions::new())
                    .await
                    .unwrap();
            }

            let current = seed as i64;
            let wrong = if below { current - offset } else { current + offset };
            let before = types(&store.load_events(&stream, None).await.unwrap());

            let result = store
                .save_events(
                    &stream,
                    vec![event(&stream, "Late")],
                    AppendOptions::expect_version(Version::new(wrong)),
                )
                .await;

            let after = types(&store.load_events(&stream, None).await.unwrap());
            let conflicted = matches!(
                result,
                Err(EventStoreError::ConcurrencyConflict { expected, actual, .. })
                    if expected == Version::new(wrong) && actual == Version::new(current)
            );
            (before, after, conflicted)
        });

        prop_assert!(conflicted);
        prop_assert_eq!(before, after);
    }
}
