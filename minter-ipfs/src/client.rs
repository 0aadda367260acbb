//! Upload client capability shared by every backend.

use async_trait::async_trait;
use bytes::Bytes;
use minter_core::UploadError;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;

/// Result type for upload operations.
pub type UploadResult<T> = Result<T, UploadError>;

/// What a backend reports for a stored object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientUpload {
    pub cid: String,
    pub size: u64,
    /// Object URL on the backend's own gateway.
    pub url: String,
}

/// Content-addressed upload backend.
#[async_trait]
pub trait IpfsClient: Send + Sync {
    /// Short backend name for logs and metrics.
    fn provider_name(&self) -> &'static str;

    async fn upload_file(&self, data: Bytes, file_name: &str) -> UploadResult<ClientUpload>;

    async fn upload_json(&self, value: &JsonValue) -> UploadResult<ClientUpload>;
}

#[async_trait]
impl<T: IpfsClient + ?Sized> IpfsClient for Arc<T> {
    fn provider_name(&self) -> &'static str {
        (**self).provider_name()
    }

    async fn upload_file(&self, data: Bytes, file_name: &str) -> UploadResult<ClientUpload> {
        (**self).upload_file(data, file_name).await
    }

    async fn upload_json(&self, value: &JsonValue) -> UploadResult<ClientUpload> {
        (**self).upload_json(value).await
    }
}
