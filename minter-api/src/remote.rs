//! Better Call Dev client.
//!
//! Reads bigmap metadata and key pages over HTTP. Paths are
//! `{base}/v1/{collection_segment}/{network}/{id}` for metadata and
//! `.../{items_segment}?offset=&size=` for pages.

use std::time::Duration;

use async_trait::async_trait;
use minter_core::{
    CollectionItem, CollectionKey, CollectionMetadata, ConfigError, PageRequest, UpstreamError,
};
use minter_storage::{RemoteCollectionClient, RemoteResult};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value as JsonValue};

/// Service name used in upstream errors and logs.
pub const SERVICE_NAME: &str = "better-call.dev";

pub const DEFAULT_BASE_URI: &str = "https://api.better-call.dev";

/// Longest upstream error body echoed into an error message.
const MAX_ERROR_BODY: usize = 512;

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Where and how to reach the remote collection service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCollectionConfig {
    pub base_uri: String,
    pub collection_segment: String,
    pub items_segment: String,
    pub timeout: Duration,
}

impl Default for RemoteCollectionConfig {
    fn default() -> Self {
        Self {
            base_uri: DEFAULT_BASE_URI.to_string(),
            collection_segment: "bigmap".to_string(),
            items_segment: "keys".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl RemoteCollectionConfig {
    /// Load from `MINTER_BCD_API_URI`, `MINTER_BCD_COLLECTION_SEGMENT`,
    /// `MINTER_BCD_ITEMS_SEGMENT` and `MINTER_BCD_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let base_uri = std::env::var("MINTER_BCD_API_URI").unwrap_or(defaults.base_uri);
        reqwest::Url::parse(&base_uri).map_err(|e| ConfigError::InvalidValue {
            field: "MINTER_BCD_API_URI".to_string(),
            value: base_uri.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            base_uri,
            collection_segment: std::env::var("MINTER_BCD_COLLECTION_SEGMENT")
                .unwrap_or(defaults.collection_segment),
            items_segment: std::env::var("MINTER_BCD_ITEMS_SEGMENT")
                .unwrap_or(defaults.items_segment),
            timeout: std::env::var("MINTER_BCD_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        })
    }

    pub fn with_base_uri(mut self, base_uri: impl Into<String>) -> Self {
        self.base_uri = base_uri.into();
        self
    }

    fn collection_url(&self, collection: &CollectionKey) -> String {
        format!(
            "{}/v1/{}/{}/{}",
            self.base_uri.trim_end_matches('/'),
            self.collection_segment,
            collection.network,
            collection.collection_id
        )
    }

    fn items_url(&self, collection: &CollectionKey) -> String {
        format!("{}/{}", self.collection_url(collection), self.items_segment)
    }
}

// ============================================================================
// WIRE TYPES
// ============================================================================

#[derive(Debug, Deserialize)]
struct BigmapMetadata {
    total_keys: u64,
}

#[derive(Debug, Deserialize)]
struct BigmapKey {
    data: Map<String, JsonValue>,
    count: i64,
}

impl From<BigmapKey> for CollectionItem {
    /// A missing `key_string` decodes as an empty key; the store rejects it.
    fn from(key: BigmapKey) -> Self {
        let key_string = key
            .data
            .get("key_string")
            .and_then(JsonValue::as_str)
            .unwrap_or_default()
            .to_string();
        CollectionItem {
            key_string,
            payload: JsonValue::Object(key.data),
            count: key.count,
        }
    }
}

fn invalid_response(reason: impl Into<String>) -> UpstreamError {
    UpstreamError::InvalidResponse {
        service: SERVICE_NAME.to_string(),
        reason: reason.into(),
    }
}

pub(crate) fn decode_metadata(body: &[u8]) -> RemoteResult<CollectionMetadata> {
    let metadata: BigmapMetadata = serde_json::from_slice(body)
        .map_err(|e| invalid_response(format!("bigmap metadata: {}", e)))?;
    Ok(CollectionMetadata {
        total_item_count: metadata.total_keys,
    })
}

pub(crate) fn decode_page(body: &[u8]) -> RemoteResult<Vec<CollectionItem>> {
    let keys: Vec<BigmapKey> = serde_json::from_slice(body)
        .map_err(|e| invalid_response(format!("bigmap keys: {}", e)))?;
    Ok(keys.into_iter().map(CollectionItem::from).collect())
}

// ============================================================================
// CLIENT
// ============================================================================

/// HTTP client for the Better Call Dev indexer.
#[derive(Debug, Clone)]
pub struct BetterCallDevClient {
    client: Client,
    config: RemoteCollectionConfig,
}

impl BetterCallDevClient {
    pub fn new(config: RemoteCollectionConfig) -> RemoteResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("minter-api/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| UpstreamError::RequestFailed {
                service: SERVICE_NAME.to_string(),
                reason: format!("failed to build HTTP client: {}", e),
            })?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &RemoteCollectionConfig {
        &self.config
    }

    async fn get(&self, request: reqwest::RequestBuilder) -> RemoteResult<bytes::Bytes> {
        let response = request.send().await.map_err(|e| UpstreamError::RequestFailed {
            service: SERVICE_NAME.to_string(),
            reason: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            let mut message = response.text().await.unwrap_or_default();
            if message.len() > MAX_ERROR_BODY {
                let mut end = MAX_ERROR_BODY;
                while !message.is_char_boundary(end) {
                    end -= 1;
                }
                message.truncate(end);
            }
            return Err(UpstreamError::UnexpectedStatus {
                service: SERVICE_NAME.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        response.bytes().await.map_err(|e| UpstreamError::RequestFailed {
            service: SERVICE_NAME.to_string(),
            reason: format!("failed to read body: {}", e),
        })
    }
}

#[async_trait]
impl RemoteCollectionClient for BetterCallDevClient {
    async fn fetch_metadata(&self, collection: &CollectionKey) -> RemoteResult<CollectionMetadata> {
        let url = self.config.collection_url(collection);
        tracing::debug!(%url, "Fetching bigmap metadata");
        let body = self.get(self.client.get(&url)).await?;
        decode_metadata(&body)
    }

    async fn fetch_page(
        &self,
        collection: &CollectionKey,
        page: PageRequest,
    ) -> RemoteResult<Vec<CollectionItem>> {
        let url = self.config.items_url(collection);
        tracing::debug!(%url, offset = page.offset, size = page.size, "Fetching bigmap keys");
        let request = self
            .client
            .get(&url)
            .query(&[("offset", page.offset), ("size", page.size)]);
        let body = self.get(request).await?;
        decode_page(&body)
    }
}
