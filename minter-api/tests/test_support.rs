#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use minter_api::{create_api_router, ApiConfig, AppState};
use minter_ipfs::IpfsProvider;
use minter_storage::{CacheConfig, InMemoryRecordStore, RecordStore, RemoteCollectionClient};
use minter_test_utils::{FakeRemoteCollection, RecordingIpfsClient, StaticThumbnailer};
use serde_json::Value as JsonValue;

pub const TEST_GATEWAY: &str = "https://gateway.test";
pub const MULTIPART_BOUNDARY: &str = "minter-test-boundary";

/// Collaborators behind a test router, kept around for assertions.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryRecordStore>,
    pub remote: Arc<FakeRemoteCollection>,
    pub ipfs_client: Arc<RecordingIpfsClient>,
}

pub fn test_app(remote: FakeRemoteCollection) -> TestApp {
    test_app_with(remote, RecordingIpfsClient::new(), ApiConfig::default())
}

pub fn test_app_with(
    remote: FakeRemoteCollection,
    ipfs_client: RecordingIpfsClient,
    api_config: ApiConfig,
) -> TestApp {
    let store = Arc::new(InMemoryRecordStore::new());
    let remote = Arc::new(remote);
    let ipfs_client = Arc::new(ipfs_client);

    let ipfs = IpfsProvider::new(
        ipfs_client.clone(),
        Arc::new(StaticThumbnailer::new()),
        TEST_GATEWAY,
    );
    let state = AppState::new(
        store.clone() as Arc<dyn RecordStore>,
        remote.clone() as Arc<dyn RemoteCollectionClient>,
        CacheConfig::default(),
        ipfs,
    );

    TestApp {
        router: create_api_router(state, &api_config),
        store,
        remote,
        ipfs_client,
    }
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

pub fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

/// Multipart request with one field named `field`.
pub fn post_multipart(uri: &str, field: &str, file_name: &str, data: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{MULTIPART_BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("request")
}

pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, JsonValue) {
    use tower::ServiceExt;

    let response = router.clone().oneshot(request).await.expect("infallible");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    let json = if bytes.is_empty() {
        JsonValue::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            JsonValue::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, json)
}
