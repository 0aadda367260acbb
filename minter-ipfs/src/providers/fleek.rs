//! Fleek storage client.
//!
//! Fleek exposes an S3-compatible API. Objects are stored under
//! `key_prefix + hex(sha1(data))` and the IPFS hash is returned in the
//! `x-fleek-ipfs-hash` response header.

use super::{gateway_url, invalid_response, request_failed};
use crate::client::{ClientUpload, IpfsClient, UploadResult};
use async_trait::async_trait;
use bytes::Bytes;
use s3::bucket::Bucket;
use s3::creds::Credentials;
use s3::region::Region;
use serde_json::Value as JsonValue;
use sha1::{Digest, Sha1};

const PROVIDER: &str = "fleek";
const IPFS_HASH_HEADER: &str = "x-fleek-ipfs-hash";

pub const DEFAULT_ENDPOINT: &str = "https://storageapi.fleek.co";
pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_GATEWAY_URI: &str = "https://ipfs.fleek.co";

#[derive(Clone, PartialEq, Eq)]
pub struct FleekConfig {
    pub api_key: String,
    pub api_secret: String,
    /// Defaults to `<api_key>-bucket`.
    pub bucket: Option<String>,
    pub key_prefix: String,
    pub endpoint: String,
    pub gateway_uri: String,
}

impl FleekConfig {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            bucket: None,
            key_prefix: String::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            gateway_uri: DEFAULT_GATEWAY_URI.to_string(),
        }
    }

    pub fn bucket_name(&self) -> String {
        self.bucket
            .clone()
            .unwrap_or_else(|| format!("{}-bucket", self.api_key))
    }

    /// Storage key for `data`. Buckets shared with earlier deployments
    /// already hold objects under SHA-1 keys.
    pub fn object_key(&self, data: &[u8]) -> String {
        format!("{}{}", self.key_prefix, hex::encode(Sha1::digest(data)))
    }
}

impl std::fmt::Debug for FleekConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FleekConfig")
            .field("api_key", &"[REDACTED]")
            .field("api_secret", &"[REDACTED]")
            .field("bucket", &self.bucket)
            .field("key_prefix", &self.key_prefix)
            .field("endpoint", &self.endpoint)
            .field("gateway_uri", &self.gateway_uri)
            .finish()
    }
}

pub struct FleekIpfsClient {
    bucket: Box<Bucket>,
    config: FleekConfig,
}

impl FleekIpfsClient {
    pub fn new(config: FleekConfig) -> UploadResult<Self> {
        let region = Region::Custom {
            region: DEFAULT_REGION.to_string(),
            endpoint: config.endpoint.clone(),
        };
        let creds = Credentials::new(
            Some(config.api_key.as_str()),
            Some(config.api_secret.as_str()),
            None,
            None,
            None,
        )
        .map_err(|e| invalid_response(PROVIDER, format!("Invalid credentials: {}", e)))?;
        let bucket = Bucket::new(&config.bucket_name(), region, creds)
            .map_err(|e| invalid_response(PROVIDER, format!("Invalid bucket: {}", e)))?
            .with_path_style();

        Ok(Self { bucket, config })
    }
}

#[async_trait]
impl IpfsClient for FleekIpfsClient {
    fn provider_name(&self) -> &'static str {
        PROVIDER
    }

    async fn upload_file(&self, data: Bytes, _file_name: &str) -> UploadResult<ClientUpload> {
        let key = self.config.object_key(&data);
        let response = self
            .bucket
            .put_object(&key, &data)
            .await
            .map_err(|e| request_failed(PROVIDER, 0, format!("Upload failed: {}", e)))?;

        let status = response.status_code();
        if !(200..300).contains(&status) {
            let message = String::from_utf8_lossy(response.as_slice()).into_owned();
            return Err(request_failed(PROVIDER, status, message));
        }

        let cid = response
            .headers()
            .into_iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(IPFS_HASH_HEADER))
            .map(|(_, value)| value)
            .ok_or_else(|| invalid_response(PROVIDER, format!("Missing {} header", IPFS_HASH_HEADER)))?;

        tracing::debug!(key = %key, cid = %cid, "Stored object on Fleek");

        Ok(ClientUpload {
            url: gateway_url(&self.config.gateway_uri, &cid)?,
            cid,
            size: data.len() as u64,
        })
    }

    async fn upload_json(&self, value: &JsonValue) -> UploadResult<ClientUpload> {
        let body = serde_json::to_vec(value)
            .map_err(|e| invalid_response(PROVIDER, format!("Failed to serialize JSON: {}", e)))?;
        self.upload_file(Bytes::from(body), "data.json").await
    }
}

impl std::fmt::Debug for FleekIpfsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FleekIpfsClient")
            .field("config", &self.config)
            .finish()
    }
}
