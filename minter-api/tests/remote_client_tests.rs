//! Better Call Dev client against a local stub indexer.

use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use minter_api::{BetterCallDevClient, RemoteCollectionConfig};
use minter_core::{CollectionKey, PageRequest, UpstreamError};
use minter_storage::{
    CacheConfig, CollectionCache, InMemoryRecordStore, RecordStore, RemoteCollectionClient,
};
use serde::Deserialize;
use serde_json::json;

const TOTAL_KEYS: u64 = 25;
const FAILING_ID: i64 = 500;

#[derive(Debug, Deserialize)]
struct PageQuery {
    offset: u64,
    size: u64,
}

fn stub_key(i: u64) -> serde_json::Value {
    json!({
        "data": { "key_string": format!("key-{i}"), "key_hash": format!("expr{i}") },
        "count": 1,
    })
}

async fn bigmap(Path((_network, id)): Path<(String, i64)>) -> impl IntoResponse {
    if id == FAILING_ID {
        return (StatusCode::INTERNAL_SERVER_ERROR, "indexer exploded").into_response();
    }
    Json(json!({ "network": "edo2net", "ptr": id, "total_keys": TOTAL_KEYS })).into_response()
}

async fn keys(
    Path((_network, _id)): Path<(String, i64)>,
    Query(page): Query<PageQuery>,
) -> impl IntoResponse {
    let end = (page.offset + page.size).min(TOTAL_KEYS);
    let items: Vec<_> = (page.offset.min(end)..end).map(stub_key).collect();
    Json(items)
}

/// Serve the stub on an ephemeral port and return its base URI.
async fn spawn_stub() -> String {
    let app = Router::new()
        .route("/v1/bigmap/:network/:id", get(bigmap))
        .route("/v1/bigmap/:network/:id/keys", get(keys))
        .route(
            "/v1/bigmap/:network/:id/garbage",
            get(|| async { "not json" }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

async fn client() -> BetterCallDevClient {
    let config = RemoteCollectionConfig::default().with_base_uri(spawn_stub().await);
    BetterCallDevClient::new(config).unwrap()
}

fn collection(id: &str) -> CollectionKey {
    CollectionKey::parse("edo2net", id).unwrap()
}

#[tokio::test]
async fn test_fetch_metadata_reads_total_keys() {
    let client = client().await;
    let metadata = client.fetch_metadata(&collection("523")).await.unwrap();
    assert_eq!(metadata.total_item_count, TOTAL_KEYS);
}

#[tokio::test]
async fn test_fetch_page_sends_offset_and_size() {
    let client = client().await;
    let items = client
        .fetch_page(&collection("523"), PageRequest { offset: 20, size: 10 })
        .await
        .unwrap();

    assert_eq!(items.len(), 5);
    assert_eq!(items[0].key_string, "key-20");
    assert_eq!(items[0].payload["key_hash"], "expr20");
    assert_eq!(items[4].key_string, "key-24");
}

#[tokio::test]
async fn test_error_status_becomes_upstream_error() {
    let client = client().await;
    let err = client
        .fetch_metadata(&collection(&FAILING_ID.to_string()))
        .await
        .unwrap_err();

    match err {
        UpstreamError::UnexpectedStatus { status, message, .. } => {
            assert_eq!(status, 500);
            assert_eq!(message, "indexer exploded");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_undecodable_body_is_invalid_response() {
    let base = spawn_stub().await;
    let config = RemoteCollectionConfig {
        items_segment: "garbage".to_string(),
        ..RemoteCollectionConfig::default().with_base_uri(base)
    };
    let client = BetterCallDevClient::new(config).unwrap();

    let err = client
        .fetch_page(&collection("523"), PageRequest { offset: 0, size: 10 })
        .await
        .unwrap_err();
    assert!(matches!(err, UpstreamError::InvalidResponse { .. }));
}

#[tokio::test]
async fn test_unreachable_indexer_is_request_failure() {
    // Bind then drop to get a port nothing listens on.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = RemoteCollectionConfig::default().with_base_uri(format!("http://{addr}"));
    let client = BetterCallDevClient::new(config).unwrap();
    let err = client.fetch_metadata(&collection("523")).await.unwrap_err();
    assert!(matches!(err, UpstreamError::RequestFailed { .. }));
}

#[tokio::test]
async fn test_cache_backfills_through_http_client() {
    let store = Arc::new(InMemoryRecordStore::new());
    let remote = Arc::new(client().await);
    let cache = CollectionCache::new(store.clone(), remote, CacheConfig::default());
    let key = collection("523");

    let report = cache.ensure_cached(&key).await.unwrap();
    assert_eq!(report.inserted, TOTAL_KEYS);
    assert_eq!(report.fetched_pages, 3);
    assert_eq!(store.count(&key).await.unwrap(), TOTAL_KEYS);

    let again = cache.ensure_cached(&key).await.unwrap();
    assert!(again.is_noop());
}
