//! Client for a local IPFS node's HTTP API.

use super::{gateway_url, invalid_response, request_failed};
use crate::client::{ClientUpload, IpfsClient, UploadResult};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value as JsonValue;

const PROVIDER: &str = "sandbox";

pub const DEFAULT_API_URI: &str = "http://ipfs:5001";
pub const DEFAULT_GATEWAY_URI: &str = "http://127.0.0.1:8080";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxConfig {
    pub api_base_uri: String,
    pub gateway_uri: String,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            api_base_uri: DEFAULT_API_URI.to_string(),
            gateway_uri: DEFAULT_GATEWAY_URI.to_string(),
        }
    }
}

/// `/api/v0/add` response. The node reports `Size` as a decimal string.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AddResponse {
    hash: String,
    size: String,
}

#[derive(Debug)]
pub struct SandboxIpfsClient {
    client: Client,
    config: SandboxConfig,
}

impl SandboxIpfsClient {
    pub fn new(config: SandboxConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }
}

#[async_trait]
impl IpfsClient for SandboxIpfsClient {
    fn provider_name(&self) -> &'static str {
        PROVIDER
    }

    async fn upload_file(&self, data: Bytes, file_name: &str) -> UploadResult<ClientUpload> {
        let part = Part::bytes(data.to_vec()).file_name(file_name.to_string());
        let form = Form::new().part("file", part);
        let url = format!("{}/api/v0/add", self.config.api_base_uri.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| request_failed(PROVIDER, 0, format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(request_failed(PROVIDER, status.as_u16(), error_text));
        }

        let added: AddResponse = response
            .json()
            .await
            .map_err(|e| invalid_response(PROVIDER, format!("Failed to parse response: {}", e)))?;
        let size = added
            .size
            .parse::<u64>()
            .map_err(|e| invalid_response(PROVIDER, format!("Invalid size '{}': {}", added.size, e)))?;

        Ok(ClientUpload {
            url: gateway_url(&self.config.gateway_uri, &added.hash)?,
            cid: added.hash,
            size,
        })
    }

    async fn upload_json(&self, value: &JsonValue) -> UploadResult<ClientUpload> {
        let body = serde_json::to_vec(value)
            .map_err(|e| invalid_response(PROVIDER, format!("Failed to serialize JSON: {}", e)))?;
        self.upload_file(Bytes::from(body), "data.json").await
    }
}
