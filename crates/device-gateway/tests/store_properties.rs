//! Correlation store properties: counting, consume-once, eviction order,
//! and behaviour under concurrent callers.

use std::collections::HashSet;
use std::sync::Arc;

use device_gateway::{CorrelationStore, StoreOutcome};
use proptest::prelude::*;
use shared_types::{Cmd, RequestUuid, ResponseMessage};
use uuid::Uuid;

fn response(id: RequestUuid) -> ResponseMessage {
    ResponseMessage::success(Cmd::GetNetworkConfig, id)
}

fn key(raw: u128) -> RequestUuid {
    RequestUuid::from(Uuid::from_u128(raw))
}

proptest! {
    #[test]
    fn count_tracks_distinct_keys_below_capacity(raw in prop::collection::vec(any::<u128>(), 0..64)) {
        let store = CorrelationStore::new(64);
        let mut seen = HashSet::new();

        for r in raw {
            let id = key(r);
            let outcome = store.store(id, response(id));
            if seen.insert(id) {
                prop_assert_eq!(outcome, StoreOutcome::Inserted);
            } else {
                prop_assert_eq!(outcome, StoreOutcome::Replaced);
            }
            prop_assert_eq!(store.count(), seen.len());
        }
    }

    #[test]
    fn count_never_exceeds_capacity(capacity in 1usize..16, inserts in 0usize..48) {
        let store = CorrelationStore::new(capacity);
        for _ in 0..inserts {
            let id = RequestUuid::new();
            store.store(id, response(id));
            prop_assert!(store.count() <= capacity);
        }
        prop_assert_eq!(store.count(), inserts.min(capacity));
        prop_assert_eq!(store.keys_by_age().len(), store.count());
    }

    #[test]
    fn delete_oldest_drains_in_insertion_order(raw in prop::collection::hash_set(any::<u128>(), 1..32)) {
        let ids: Vec<_> = raw.into_iter().map(key).collect();
        let store = CorrelationStore::new(ids.len());
        for id in &ids {
            store.store(*id, response(*id));
        }
        // Replacing must not move a key
        store.store(ids[0], response(ids[0]));

        for id in &ids {
            prop_assert_eq!(store.delete_oldest(), Some(*id));
        }
        prop_assert_eq!(store.delete_oldest(), None);
    }
}

#[test]
fn load_consumes_exactly_once() {
    let store = CorrelationStore::new(4);
    let id = RequestUuid::new();
    store.store(id, response(id));

    assert_eq!(store.load(&id), Some(response(id)));
    assert_eq!(store.load(&id), None);
    assert_eq!(store.stats().snapshot().loaded, 1);
}

#[test]
fn rejected_key_leaves_store_unchanged() {
    let store = CorrelationStore::new(3);
    let ids: Vec<_> = (0..3).map(|_| RequestUuid::new()).collect();
    for id in &ids {
        store.store(*id, response(*id));
    }

    let extra = RequestUuid::new();
    assert_eq!(store.store(extra, response(extra)), StoreOutcome::Rejected);
    assert_eq!(store.keys_by_age(), ids);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_store_and_load_on_disjoint_keys() {
    const TASKS: usize = 16;
    const PER_TASK: usize = 200;

    let store = Arc::new(CorrelationStore::new(TASKS * PER_TASK));
    let mut handles = Vec::with_capacity(TASKS);

    for task in 0..TASKS {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            let mut loaded = 0usize;
            for i in 0..PER_TASK {
                let id = RequestUuid::new();
                store.store(id, response(id));
                // Every third key is consumed straight away
                if (task + i) % 3 == 0 {
                    assert!(store.load(&id).is_some());
                    loaded += 1;
                }
                tokio::task::yield_now().await;
            }
            loaded
        }));
    }

    let mut total_loaded = 0;
    for handle in handles {
        total_loaded += handle.await.unwrap();
    }

    assert_eq!(store.count(), TASKS * PER_TASK - total_loaded);
    let stats = store.stats().snapshot();
    assert_eq!(stats.inserted as usize, TASKS * PER_TASK);
    assert_eq!(stats.loaded as usize, total_loaded);
}
