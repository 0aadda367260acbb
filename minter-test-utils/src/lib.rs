//! Minter Test Utilities
//!
//! Shared test infrastructure for the Minter workspace:
//! - Scriptable fakes for the remote collection, record store and upload client
//! - Proptest generators for collection identities and remote items
//! - Fixtures for common scenarios
//! - Assertions over backfill reports

pub use minter_core::{
    CollectionId, CollectionItem, CollectionKey, CollectionMetadata, KeyRecord, MinterError,
    Network, NewKeyRecord, PageRequest, PersistenceError, UploadError, UpstreamError,
};
pub use minter_ipfs::{ClientUpload, IpfsClient, Thumbnailer};
pub use minter_storage::{
    BackfillReport, InMemoryRecordStore, RecordStore, RemoteCollectionClient, StorageResult,
};

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value as JsonValue;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

// ============================================================================
// FAKE REMOTE COLLECTION
// ============================================================================

/// In-process stand-in for the remote indexer.
///
/// Serves pages out of a single ordered item list regardless of which
/// collection is asked for, and records every call it receives.
#[derive(Debug, Default)]
pub struct FakeRemoteCollection {
    items: Mutex<Vec<CollectionItem>>,
    total_override: Mutex<Option<u64>>,
    page_calls: Mutex<Vec<PageRequest>>,
    metadata_calls: AtomicUsize,
    fail_metadata: AtomicBool,
    fail_on_page_call: Mutex<Option<usize>>,
}

impl FakeRemoteCollection {
    pub fn new(items: Vec<CollectionItem>) -> Self {
        Self {
            items: Mutex::new(items),
            ..Default::default()
        }
    }

    /// Remote holding `n` well-formed items keyed `key-0 .. key-{n-1}`.
    pub fn with_keys(n: usize) -> Self {
        Self::new(fixtures::items(0..n))
    }

    /// Report this total regardless of how many items are held.
    pub fn with_total(self, total: u64) -> Self {
        *self.total_override.lock().unwrap() = Some(total);
        self
    }

    /// Fail the `n`th page request (zero-based, counted across calls).
    pub fn fail_on_page_call(self, n: usize) -> Self {
        *self.fail_on_page_call.lock().unwrap() = Some(n);
        self
    }

    pub fn fail_metadata(self) -> Self {
        self.fail_metadata.store(true, Ordering::SeqCst);
        self
    }

    /// Simulate the remote collection growing.
    pub fn push_items(&self, more: impl IntoIterator<Item = CollectionItem>) {
        self.items.lock().unwrap().extend(more);
    }

    pub fn page_calls(&self) -> Vec<PageRequest> {
        self.page_calls.lock().unwrap().clone()
    }

    pub fn metadata_calls(&self) -> usize {
        self.metadata_calls.load(Ordering::SeqCst)
    }

    pub fn reset_calls(&self) {
        self.page_calls.lock().unwrap().clear();
        self.metadata_calls.store(0, Ordering::SeqCst);
    }

    fn upstream_failure(reason: &str) -> UpstreamError {
        UpstreamError::UnexpectedStatus {
            service: "fake-remote".to_string(),
            status: 503,
            message: reason.to_string(),
        }
    }
}

#[async_trait]
impl RemoteCollectionClient for FakeRemoteCollection {
    async fn fetch_metadata(
        &self,
        _collection: &CollectionKey,
    ) -> Result<CollectionMetadata, UpstreamError> {
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_metadata.load(Ordering::SeqCst) {
            return Err(Self::upstream_failure("metadata unavailable"));
        }
        let total = match *self.total_override.lock().unwrap() {
            Some(total) => total,
            None => self.items.lock().unwrap().len() as u64,
        };
        Ok(CollectionMetadata {
            total_item_count: total,
        })
    }

    async fn fetch_page(
        &self,
        _collection: &CollectionKey,
        page: PageRequest,
    ) -> Result<Vec<CollectionItem>, UpstreamError> {
        let call_index = {
            let mut calls = self.page_calls.lock().unwrap();
            calls.push(page);
            calls.len() - 1
        };
        if *self.fail_on_page_call.lock().unwrap() == Some(call_index) {
            return Err(Self::upstream_failure("page unavailable"));
        }

        let items = self.items.lock().unwrap();
        let start = (page.offset as usize).min(items.len());
        let end = start.saturating_add(page.size as usize).min(items.len());
        Ok(items[start..end].to_vec())
    }
}

// ============================================================================
// FLAKY RECORD STORE
// ============================================================================

/// In-memory store that can be told to reject particular keys or counts.
#[derive(Debug, Default)]
pub struct FlakyRecordStore {
    inner: InMemoryRecordStore,
    rejected_keys: Mutex<HashSet<String>>,
    fail_count: AtomicBool,
    insert_attempts: AtomicUsize,
}

impl FlakyRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every insert of `key` with an insert failure.
    pub fn reject_key(self, key: impl Into<String>) -> Self {
        self.rejected_keys.lock().unwrap().insert(key.into());
        self
    }

    pub fn fail_count(self) -> Self {
        self.fail_count.store(true, Ordering::SeqCst);
        self
    }

    pub fn insert_attempts(&self) -> usize {
        self.insert_attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordStore for FlakyRecordStore {
    async fn insert(&self, record: &NewKeyRecord) -> StorageResult<KeyRecord> {
        self.insert_attempts.fetch_add(1, Ordering::SeqCst);
        if self.rejected_keys.lock().unwrap().contains(&record.key_string) {
            return Err(PersistenceError::InsertFailed {
                reason: format!("injected failure for key '{}'", record.key_string),
            });
        }
        self.inner.insert(record).await
    }

    async fn count(&self, collection: &CollectionKey) -> StorageResult<u64> {
        if self.fail_count.load(Ordering::SeqCst) {
            return Err(PersistenceError::QueryFailed {
                reason: "injected count failure".to_string(),
            });
        }
        self.inner.count(collection).await
    }

    async fn list(&self, collection: &CollectionKey) -> StorageResult<Vec<KeyRecord>> {
        self.inner.list(collection).await
    }
}

// ============================================================================
// UPLOAD FAKES
// ============================================================================

/// Upload client that remembers what it was given and hands out fake CIDs.
#[derive(Debug, Default)]
pub struct RecordingIpfsClient {
    files: Mutex<Vec<(String, Bytes)>>,
    json: Mutex<Vec<JsonValue>>,
    failing: bool,
}

impl RecordingIpfsClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Client whose every upload fails.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Default::default()
        }
    }

    pub fn uploaded_files(&self) -> Vec<(String, Bytes)> {
        self.files.lock().unwrap().clone()
    }

    pub fn uploaded_json(&self) -> Vec<JsonValue> {
        self.json.lock().unwrap().clone()
    }

    fn next_upload(&self, size: usize) -> Result<ClientUpload, UploadError> {
        if self.failing {
            return Err(UploadError::RequestFailed {
                provider: "recording".to_string(),
                status: 500,
                message: "injected upload failure".to_string(),
            });
        }
        let n = self.files.lock().unwrap().len() + self.json.lock().unwrap().len();
        let cid = format!("QmTestCid{n}");
        Ok(ClientUpload {
            url: format!("https://gateway.test/ipfs/{cid}"),
            cid,
            size: size as u64,
        })
    }
}

#[async_trait]
impl IpfsClient for RecordingIpfsClient {
    fn provider_name(&self) -> &'static str {
        "recording"
    }

    async fn upload_file(&self, data: Bytes, file_name: &str) -> Result<ClientUpload, UploadError> {
        let upload = self.next_upload(data.len())?;
        self.files
            .lock()
            .unwrap()
            .push((file_name.to_string(), data));
        Ok(upload)
    }

    async fn upload_json(&self, value: &JsonValue) -> Result<ClientUpload, UploadError> {
        let size = serde_json::to_vec(value).map(|v| v.len()).unwrap_or(0);
        let upload = self.next_upload(size)?;
        self.json.lock().unwrap().push(value.clone());
        Ok(upload)
    }
}

/// Thumbnailer that returns a fixed marker instead of resizing.
#[derive(Debug, Clone, Default)]
pub struct StaticThumbnailer {
    fail: bool,
}

impl StaticThumbnailer {
    pub const OUTPUT: &'static [u8] = b"thumbnail";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self { fail: true }
    }
}

#[async_trait]
impl Thumbnailer for StaticThumbnailer {
    async fn thumbnail(&self, _image: Bytes) -> Result<Bytes, UploadError> {
        if self.fail {
            return Err(UploadError::Thumbnail {
                reason: "injected thumbnail failure".to_string(),
            });
        }
        Ok(Bytes::from_static(Self::OUTPUT))
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for Minter domain types.

    use super::*;
    use proptest::prelude::*;

    pub fn arb_network() -> impl Strategy<Value = Network> {
        prop::sample::select(Network::ALL.to_vec())
    }

    pub fn arb_collection_id() -> impl Strategy<Value = CollectionId> {
        (0i64..1_000_000).prop_map(|id| CollectionId::new(id).unwrap())
    }

    pub fn arb_collection_key() -> impl Strategy<Value = CollectionKey> {
        (arb_network(), arb_collection_id()).prop_map(|(n, id)| CollectionKey::new(n, id))
    }

    /// A well-formed remote item with a non-empty key.
    pub fn arb_collection_item() -> impl Strategy<Value = CollectionItem> {
        ("[a-zA-Z0-9]{1,36}", 0i64..100).prop_map(|(key, count)| fixtures::item(&key, count))
    }

    /// Network names that are not supported.
    pub fn arb_unknown_network() -> impl Strategy<Value = String> {
        "[a-z]{3,12}".prop_filter("must not be a supported network", |s| {
            Network::parse(s).is_err()
        })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built values for common scenarios.

    use super::*;
    use serde_json::json;

    pub fn collection(network: Network, id: i64) -> CollectionKey {
        CollectionKey::new(network, CollectionId::new(id).unwrap())
    }

    /// `edo2net/523`, a collection used across tests.
    pub fn edo_collection() -> CollectionKey {
        collection(Network::Edo2net, 523)
    }

    pub fn item(key: &str, count: i64) -> CollectionItem {
        CollectionItem {
            key_string: key.to_string(),
            payload: json!({
                "key_string": key,
                "key_hash": format!("expr{key}"),
                "value": { "prim": "Pair" },
            }),
            count,
        }
    }

    /// Items keyed `key-{i}` for each index in `range`.
    pub fn items(range: std::ops::Range<usize>) -> Vec<CollectionItem> {
        range.map(|i| item(&format!("key-{i}"), 1)).collect()
    }

    /// An item whose payload had no `key_string`.
    pub fn keyless_item() -> CollectionItem {
        CollectionItem {
            key_string: String::new(),
            payload: json!({ "value": null }),
            count: 1,
        }
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions over backfill reports.

    use super::*;

    #[track_caller]
    pub fn assert_noop(report: &BackfillReport) {
        assert!(report.is_noop(), "Expected no-op backfill, got: {:?}", report);
        assert_eq!(report.inserted, 0);
        assert_eq!(report.fetched_pages, 0);
    }

    #[track_caller]
    pub fn assert_clean(report: &BackfillReport) {
        assert!(report.is_complete(), "Backfill incomplete: {:?}", report);
        assert!(
            report.failures.is_empty(),
            "Expected no insert failures, got: {:?}",
            report.failures
        );
    }
}
