//! CollectionCache behaviour against scripted remotes and stores.

use minter_core::{CollectionItem, PageRequest};
use minter_storage::{
    BackfillError, CacheConfig, CollectionCache, InMemoryRecordStore, RecordStore,
    RemoteCollectionClient,
};
use minter_test_utils::assertions::{assert_clean, assert_noop};
use minter_test_utils::generators::arb_collection_item;
use minter_test_utils::{fixtures, FakeRemoteCollection, FlakyRecordStore, Network};
use proptest::prelude::*;
use std::num::NonZeroU64;
use std::sync::Arc;

fn page(offset: u64, size: u64) -> PageRequest {
    PageRequest { offset, size }
}

fn cache<S: RecordStore>(
    store: Arc<S>,
    remote: Arc<FakeRemoteCollection>,
) -> CollectionCache<S, FakeRemoteCollection> {
    CollectionCache::with_defaults(store, remote)
}

#[tokio::test]
async fn test_empty_cache_fetches_everything_in_pages() {
    let store = Arc::new(InMemoryRecordStore::new());
    let remote = Arc::new(FakeRemoteCollection::with_keys(25));
    let cache = cache(store.clone(), remote.clone());
    let key = fixtures::edo_collection();

    let report = cache.ensure_cached(&key).await.unwrap();

    assert_clean(&report);
    assert_eq!(report.remote_total, 25);
    assert_eq!(report.local_before, 0);
    assert_eq!(report.missing, 25);
    assert_eq!(report.inserted, 25);
    assert_eq!(
        remote.page_calls(),
        vec![page(0, 10), page(10, 10), page(20, 5)]
    );
    assert_eq!(store.count(&key).await.unwrap(), 25);
}

#[tokio::test]
async fn test_caught_up_collection_is_noop() {
    let store = Arc::new(InMemoryRecordStore::new());
    let remote = Arc::new(FakeRemoteCollection::with_keys(12));
    let cache = cache(store.clone(), remote.clone());
    let key = fixtures::edo_collection();

    cache.ensure_cached(&key).await.unwrap();
    remote.reset_calls();

    let report = cache.ensure_cached(&key).await.unwrap();

    assert_noop(&report);
    assert_eq!(remote.metadata_calls(), 1);
    assert!(remote.page_calls().is_empty());
    assert_eq!(store.count(&key).await.unwrap(), 12);
}

#[tokio::test]
async fn test_empty_remote_issues_no_page_calls() {
    let store = Arc::new(InMemoryRecordStore::new());
    let remote = Arc::new(FakeRemoteCollection::with_keys(0));
    let cache = cache(store, remote.clone());

    let report = cache.ensure_cached(&fixtures::edo_collection()).await.unwrap();

    assert_noop(&report);
    assert!(remote.page_calls().is_empty());
}

#[tokio::test]
async fn test_local_larger_than_remote_is_noop() {
    let store = Arc::new(InMemoryRecordStore::new());
    let remote = Arc::new(FakeRemoteCollection::with_keys(5));
    let cache = cache(store.clone(), remote.clone());
    let key = fixtures::edo_collection();

    cache.ensure_cached(&key).await.unwrap();
    let shrunk = Arc::new(FakeRemoteCollection::with_keys(5).with_total(3));
    let report = CollectionCache::with_defaults(store.clone(), shrunk.clone())
        .ensure_cached(&key)
        .await
        .unwrap();

    assert_eq!(report.missing, -2);
    assert_noop(&report);
    assert!(shrunk.page_calls().is_empty());
    assert_eq!(store.count(&key).await.unwrap(), 5);
}

#[tokio::test]
async fn test_insert_failures_do_not_abort_the_batch() {
    let store = Arc::new(FlakyRecordStore::new().reject_key("key-3"));
    let mut items = fixtures::items(0..12);
    items[7] = fixtures::keyless_item();
    let remote = Arc::new(FakeRemoteCollection::new(items));
    let cache = cache(store.clone(), remote.clone());
    let key = fixtures::edo_collection();

    let report = cache.ensure_cached(&key).await.unwrap();

    assert!(report.is_complete());
    assert_eq!(report.inserted, 10);
    assert_eq!(report.failed(), 2);
    assert_eq!(report.failures[0].key_string, "key-3");
    assert_eq!(report.failures[0].item_index, 3);
    assert_eq!(report.failures[0].page, page(0, 10));
    assert_eq!(report.failures[1].key_string, "");
    assert_eq!(report.failures[1].item_index, 7);
    assert_eq!(store.insert_attempts(), 12);
    assert_eq!(store.count(&key).await.unwrap(), 10);
}

#[tokio::test]
async fn test_failed_inserts_are_retried_on_next_call() {
    let store = Arc::new(FlakyRecordStore::new().reject_key("key-1"));
    let remote = Arc::new(FakeRemoteCollection::with_keys(3));
    let cache = cache(store.clone(), remote.clone());
    let key = fixtures::edo_collection();

    let first = cache.ensure_cached(&key).await.unwrap();
    assert_eq!(first.inserted, 2);

    remote.reset_calls();
    let second = cache.ensure_cached(&key).await.unwrap();

    // one record still missing, so one item is requested again
    assert_eq!(second.missing, 1);
    assert_eq!(remote.page_calls(), vec![page(0, 1)]);
    assert_eq!(second.inserted, 1);
    assert_eq!(store.count(&key).await.unwrap(), 3);
}

#[tokio::test]
async fn test_page_failure_aborts_but_keeps_earlier_pages() {
    let store = Arc::new(InMemoryRecordStore::new());
    let remote = Arc::new(FakeRemoteCollection::with_keys(35).fail_on_page_call(2));
    let cache = cache(store.clone(), remote.clone());
    let key = fixtures::edo_collection();

    let err = cache.ensure_cached(&key).await.unwrap_err();

    match &err {
        BackfillError::Page { page: failed, partial, .. } => {
            assert_eq!(*failed, page(20, 10));
            assert_eq!(partial.fetched_pages, 2);
            assert_eq!(partial.inserted, 20);
            assert!(!partial.is_complete());
        }
        other => panic!("Expected page failure, got: {:?}", other),
    }
    assert!(err.partial_report().is_some());
    assert_eq!(remote.page_calls().len(), 3);
    assert_eq!(store.count(&key).await.unwrap(), 20);
}

#[tokio::test]
async fn test_metadata_failure_touches_nothing() {
    let store = Arc::new(InMemoryRecordStore::new());
    let remote = Arc::new(FakeRemoteCollection::with_keys(5).fail_metadata());
    let cache = cache(store.clone(), remote.clone());
    let key = fixtures::edo_collection();

    let err = cache.ensure_cached(&key).await.unwrap_err();

    assert!(matches!(err, BackfillError::Metadata { .. }));
    assert!(err.partial_report().is_none());
    assert!(remote.page_calls().is_empty());
    assert_eq!(store.count(&key).await.unwrap(), 0);
}

#[tokio::test]
async fn test_count_failure_is_persistence_error() {
    let store = Arc::new(FlakyRecordStore::new().fail_count());
    let remote = Arc::new(FakeRemoteCollection::with_keys(5));
    let cache = cache(store, remote.clone());

    let err = cache.ensure_cached(&fixtures::edo_collection()).await.unwrap_err();

    assert!(matches!(err, BackfillError::Count { .. }));
    assert!(matches!(
        minter_core::MinterError::from(err),
        minter_core::MinterError::Persistence(_)
    ));
    assert!(remote.page_calls().is_empty());
}

#[tokio::test]
async fn test_growth_fetches_delta_from_offset_zero() {
    // Offsets are relative to the missing count, so after growth the delta is
    // requested from the head of the remote ordering. With an oldest-first
    // remote this re-reads keys that are already cached.
    let store = Arc::new(InMemoryRecordStore::new());
    let remote = Arc::new(FakeRemoteCollection::with_keys(10));
    let cache = cache(store.clone(), remote.clone());
    let key = fixtures::edo_collection();

    cache.ensure_cached(&key).await.unwrap();
    remote.push_items(fixtures::items(10..13));
    remote.reset_calls();

    let report = cache.ensure_cached(&key).await.unwrap();

    assert_eq!(report.missing, 3);
    assert_eq!(remote.page_calls(), vec![page(0, 3)]);
    let keys: Vec<String> = store
        .list(&key)
        .await
        .unwrap()
        .into_iter()
        .skip(10)
        .map(|r| r.key_string)
        .collect();
    assert_eq!(keys, vec!["key-0", "key-1", "key-2"]);
    assert_eq!(store.count(&key).await.unwrap(), 13);
}

#[tokio::test]
async fn test_oversized_page_is_truncated() {
    struct Greedy(FakeRemoteCollection);

    #[async_trait::async_trait]
    impl RemoteCollectionClient for Greedy {
        async fn fetch_metadata(
            &self,
            c: &minter_core::CollectionKey,
        ) -> minter_storage::RemoteResult<minter_core::CollectionMetadata> {
            self.0.fetch_metadata(c).await
        }

        async fn fetch_page(
            &self,
            c: &minter_core::CollectionKey,
            page: PageRequest,
        ) -> minter_storage::RemoteResult<Vec<CollectionItem>> {
            self.0
                .fetch_page(c, PageRequest { offset: 0, size: page.size * 2 })
                .await
        }
    }

    let store = Arc::new(InMemoryRecordStore::new());
    let remote = Arc::new(Greedy(FakeRemoteCollection::with_keys(20).with_total(4)));
    let cache = CollectionCache::with_defaults(store.clone(), remote);
    let key = fixtures::edo_collection();

    let report = cache.ensure_cached(&key).await.unwrap();

    assert_eq!(report.fetched_items, 4);
    assert_eq!(store.count(&key).await.unwrap(), 4);
}

#[tokio::test]
async fn test_custom_page_size() {
    let store = Arc::new(InMemoryRecordStore::new());
    let remote = Arc::new(FakeRemoteCollection::with_keys(7));
    let config = CacheConfig::new().with_max_page_size(NonZeroU64::new(3).unwrap());
    let cache = CollectionCache::new(store, remote.clone(), config);

    cache.ensure_cached(&fixtures::edo_collection()).await.unwrap();

    assert_eq!(
        remote.page_calls(),
        vec![page(0, 3), page(3, 3), page(6, 1)]
    );
}

#[tokio::test]
async fn test_networks_are_cached_independently() {
    let store = Arc::new(InMemoryRecordStore::new());
    let remote = Arc::new(FakeRemoteCollection::with_keys(4));
    let cache = cache(store.clone(), remote);
    let edo = fixtures::collection(minter_core::Network::Edo2net, 1);
    let main = fixtures::collection(minter_core::Network::Mainnet, 1);

    cache.ensure_cached(&edo).await.unwrap();
    let report = cache.ensure_cached(&main).await.unwrap();

    assert_eq!(report.local_before, 0);
    assert_eq!(store.count(&edo).await.unwrap(), 4);
    assert_eq!(store.count(&main).await.unwrap(), 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_serialized_concurrent_calls_do_not_duplicate() {
    let store = Arc::new(InMemoryRecordStore::new());
    let remote = Arc::new(FakeRemoteCollection::with_keys(30));
    let config = CacheConfig::new().with_serialization(true);
    let cache = Arc::new(CollectionCache::new(store.clone(), remote, config));
    let key = fixtures::edo_collection();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.ensure_cached(&key).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(store.count(&key).await.unwrap(), 30);
    assert_eq!(cache.active_locks(), 0);
}

#[tokio::test]
async fn test_serialized_locks_are_released_per_collection() {
    let config = CacheConfig::new().with_serialization(true);
    let cache = CollectionCache::new(
        Arc::new(InMemoryRecordStore::new()),
        Arc::new(FakeRemoteCollection::with_keys(3)),
        config,
    );
    for id in 0..50 {
        let key = fixtures::collection(Network::Mainnet, id);
        cache.ensure_cached(&key).await.unwrap();
    }
    assert_eq!(cache.active_locks(), 0);

    let failing = CollectionCache::new(
        Arc::new(InMemoryRecordStore::new()),
        Arc::new(FakeRemoteCollection::with_keys(3).fail_metadata()),
        config,
    );
    let key = fixtures::collection(Network::Sandbox, 1);
    assert!(failing.ensure_cached(&key).await.is_err());
    assert_eq!(failing.active_locks(), 0);
}

#[tokio::test]
async fn test_cached_records_reads_back_store() {
    let store = Arc::new(InMemoryRecordStore::new());
    let remote = Arc::new(FakeRemoteCollection::with_keys(3));
    let cache = cache(store, remote);
    let key = fixtures::edo_collection();

    cache.ensure_cached(&key).await.unwrap();
    let records = cache.cached_records(&key).await.unwrap();

    assert_eq!(records.len(), 3);
    assert_eq!(records[0].payload["key_string"], "key-0");
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Repeated calls without growth converge on the remote total.
    #[test]
    fn prop_repeated_calls_converge(items in prop::collection::vec(arb_collection_item(), 0..60)) {
        let total = items.len() as u64;
        runtime().block_on(async move {
            let store = Arc::new(InMemoryRecordStore::new());
            let remote = Arc::new(FakeRemoteCollection::new(items));
            let cache = cache(store.clone(), remote.clone());
            let key = fixtures::edo_collection();

            let first = cache.ensure_cached(&key).await.unwrap();
            assert_eq!(first.inserted, total);

            remote.reset_calls();
            let second = cache.ensure_cached(&key).await.unwrap();
            assert!(second.is_noop());
            assert!(remote.page_calls().is_empty());
            assert_eq!(store.count(&key).await.unwrap(), total);
        });
    }

    /// The local count never regresses, even when inserts fail.
    #[test]
    fn prop_count_never_regresses(n in 0usize..40, rejected in 0usize..40) {
        runtime().block_on(async move {
            let store = Arc::new(FlakyRecordStore::new().reject_key(format!("key-{rejected}")));
            let remote = Arc::new(FakeRemoteCollection::with_keys(n));
            let cache = cache(store.clone(), remote);
            let key = fixtures::edo_collection();

            let mut last = 0;
            for _ in 0..3 {
                let _ = cache.ensure_cached(&key).await.unwrap();
                let now = store.count(&key).await.unwrap();
                assert!(now >= last);
                assert!(now <= n as u64);
                last = now;
            }
        });
    }
}
