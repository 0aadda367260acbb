//! Pinata pinning service client

use super::{gateway_url, invalid_response, request_failed};
use crate::client::{ClientUpload, IpfsClient, UploadResult};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::Value as JsonValue;

const PROVIDER: &str = "pinata";

pub const DEFAULT_API_URI: &str = "https://api.pinata.cloud";
pub const DEFAULT_GATEWAY_URI: &str = "https://gateway.pinata.cloud";

#[derive(Clone, PartialEq, Eq)]
pub struct PinataConfig {
    pub api_key: String,
    pub api_secret: String,
    pub api_uri: String,
    pub gateway_uri: String,
}

impl PinataConfig {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            api_uri: DEFAULT_API_URI.to_string(),
            gateway_uri: DEFAULT_GATEWAY_URI.to_string(),
        }
    }

    pub fn with_gateway(mut self, gateway_uri: impl Into<String>) -> Self {
        self.gateway_uri = gateway_uri.into();
        self
    }

    pub fn with_api_uri(mut self, api_uri: impl Into<String>) -> Self {
        self.api_uri = api_uri.into();
        self
    }
}

impl std::fmt::Debug for PinataConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PinataConfig")
            .field("api_key", &"[REDACTED]")
            .field("api_secret", &"[REDACTED]")
            .field("api_uri", &self.api_uri)
            .field("gateway_uri", &self.gateway_uri)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PinResponse {
    ipfs_hash: String,
    pin_size: u64,
}

pub struct PinataIpfsClient {
    client: Client,
    config: PinataConfig,
}

impl PinataIpfsClient {
    pub fn new(config: PinataConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("pinata_api_key", &self.config.api_key)
            .header("pinata_secret_api_key", &self.config.api_secret)
    }

    async fn pin(&self, builder: RequestBuilder) -> UploadResult<ClientUpload> {
        let response = self
            .authorized(builder)
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

        let pinned: PinResponse = response
            .json()
            .await
            .map_err(|e| invalid_response(PROVIDER, format!("Failed to parse response: {}", e)))?;

        Ok(ClientUpload {
            url: gateway_url(&self.config.gateway_uri, &pinned.ipfs_hash)?,
            cid: pinned.ipfs_hash,
            size: pinned.pin_size,
        })
    }
}

#[async_trait]
impl IpfsClient for PinataIpfsClient {
    fn provider_name(&self) -> &'static str {
        PROVIDER
    }

    async fn upload_file(&self, data: Bytes, file_name: &str) -> UploadResult<ClientUpload> {
        let part = Part::bytes(data.to_vec()).file_name(file_name.to_string());
        let form = Form::new().part("file", part);
        let url = format!("{}/pinning/pinFileToIPFS", self.config.api_uri);
        self.pin(self.client.post(&url).multipart(form)).await
    }

    async fn upload_json(&self, value: &JsonValue) -> UploadResult<ClientUpload> {
        let url = format!("{}/pinning/pinJSONToIPFS", self.config.api_uri);
        self.pin(self.client.post(&url).json(value)).await
    }
}

impl std::fmt::Debug for PinataIpfsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PinataIpfsClient")
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pin_response_uses_pascal_case() {
        let parsed: PinResponse =
            serde_json::from_str(r#"{"IpfsHash":"QmXyz","PinSize":1234,"Timestamp":"2021-01-01"}"#)
                .unwrap();
        assert_eq!(parsed.ipfs_hash, "QmXyz");
        assert_eq!(parsed.pin_size, 1234);
    }

    #[test]
    fn test_debug_redacts_credentials() {
        let config = PinataConfig::new("key-123", "secret-456");
        let rendered = format!("{:?}", PinataIpfsClient::new(config));
        assert!(!rendered.contains("key-123"));
        assert!(!rendered.contains("secret-456"));
        assert!(rendered.contains("gateway.pinata.cloud"));
    }
}
