//! PostgreSQL record store tests. Need a reachable database configured
//! through the `MINTER_DB_*` variables.
#![cfg(feature = "db-tests")]

use std::sync::Arc;

use minter_api::{ApiResult, DbConfig, PgRecordStore};
use minter_core::{NewKeyRecord, PersistenceError};
use minter_storage::{CacheConfig, CollectionCache, RecordStore};
use minter_test_utils::fixtures;
use minter_test_utils::{FakeRemoteCollection, Network};

async fn test_store() -> ApiResult<PgRecordStore> {
    let store = PgRecordStore::from_config(&DbConfig::from_env())?;
    store.ensure_schema().await?;
    Ok(store)
}

/// A bigmap id no other run has used.
fn fresh_collection() -> minter_core::CollectionKey {
    let id = (uuid::Uuid::now_v7().as_u128() % 1_000_000_000) as i64;
    fixtures::collection(Network::Sandbox, id)
}

#[tokio::test]
async fn test_insert_count_and_list_in_order() -> ApiResult<()> {
    let store = test_store().await?;
    let collection = fresh_collection();

    for item in fixtures::items(0..3) {
        store
            .insert(&NewKeyRecord::from_item(collection, item))
            .await?;
    }

    assert_eq!(store.count(&collection).await?, 3);
    let keys: Vec<String> = store
        .list(&collection)
        .await?
        .into_iter()
        .map(|r| r.key_string)
        .collect();
    assert_eq!(keys, vec!["key-0", "key-1", "key-2"]);
    Ok(())
}

#[tokio::test]
async fn test_empty_key_violates_constraint() -> ApiResult<()> {
    let store = test_store().await?;
    let collection = fresh_collection();
    let record = NewKeyRecord::from_item(collection, fixtures::keyless_item());

    let err = store.insert(&record).await.unwrap_err();
    assert!(matches!(err, PersistenceError::ConstraintViolation { .. }));
    assert_eq!(store.count(&collection).await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_collections_are_isolated() -> ApiResult<()> {
    let store = test_store().await?;
    let mainnet = fixtures::collection(Network::Mainnet, fresh_collection().collection_id.get());
    let sandbox = fixtures::collection(Network::Sandbox, mainnet.collection_id.get());

    store
        .insert(&NewKeyRecord::from_item(mainnet, fixtures::item("a", 1)))
        .await?;

    assert_eq!(store.count(&mainnet).await?, 1);
    assert_eq!(store.count(&sandbox).await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_backfill_into_postgres() -> ApiResult<()> {
    let store = Arc::new(test_store().await?);
    let remote = Arc::new(FakeRemoteCollection::with_keys(25));
    let cache = CollectionCache::new(store.clone(), remote.clone(), CacheConfig::default());
    let collection = fresh_collection();

    let report = cache.ensure_cached(&collection).await?;
    assert_eq!(report.inserted, 25);
    assert_eq!(cache.cached_records(&collection).await?.len(), 25);

    remote.reset_calls();
    assert!(cache.ensure_cached(&collection).await?.is_noop());
    assert!(remote.page_calls().is_empty());
    Ok(())
}
