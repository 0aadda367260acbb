//! Upload facade used by the HTTP layer.

use crate::backend::{IpfsBackend, IpfsConfig};
use crate::client::{ClientUpload, IpfsClient, UploadResult};
use crate::providers::gateway_url;
use crate::thumbnail::{ImageThumbnailer, Thumbnailer};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;

/// Upload result as returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct IpfsUploadResult {
    pub cid: String,
    pub size: u64,
    pub ipfs_uri: String,
    pub url: String,
    pub public_gateway_uri: String,
}

/// Image upload result with the thumbnail's own upload result attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct IpfsUploadThumbResult {
    #[serde(flatten)]
    pub original: IpfsUploadResult,
    pub thumbnail: IpfsUploadResult,
}

/// Uploads through one backend and decorates results with IPFS URIs.
#[derive(Clone)]
pub struct IpfsProvider {
    client: Arc<dyn IpfsClient>,
    thumbnailer: Arc<dyn Thumbnailer>,
    public_gateway_uri: String,
}

impl IpfsProvider {
    pub fn new(
        client: Arc<dyn IpfsClient>,
        thumbnailer: Arc<dyn Thumbnailer>,
        public_gateway_uri: impl Into<String>,
    ) -> Self {
        Self {
            client,
            thumbnailer,
            public_gateway_uri: public_gateway_uri.into(),
        }
    }

    /// Select a backend from `config` and use the image thumbnailer.
    pub fn from_config(config: &IpfsConfig) -> UploadResult<Self> {
        let backend = IpfsBackend::from_config(config)?;
        let public_gateway_uri = config
            .public_gateway_uri
            .clone()
            .unwrap_or_else(|| backend.default_public_gateway().to_string());

        Ok(Self::new(
            Arc::new(backend),
            Arc::new(ImageThumbnailer::default()),
            public_gateway_uri,
        ))
    }

    pub fn provider_name(&self) -> &'static str {
        self.client.provider_name()
    }

    pub fn public_gateway_uri(&self) -> &str {
        &self.public_gateway_uri
    }

    pub async fn upload_file(&self, data: Bytes, file_name: &str) -> UploadResult<IpfsUploadResult> {
        let upload = self.client.upload_file(data, file_name).await?;
        self.format(upload)
    }

    /// Upload the image, then a thumbnail of it.
    pub async fn upload_image_with_thumbnail(
        &self,
        data: Bytes,
        file_name: &str,
    ) -> UploadResult<IpfsUploadThumbResult> {
        let original = self.upload_file(data.clone(), file_name).await?;
        let thumb = self.thumbnailer.thumbnail(data).await?;
        let thumbnail = self
            .upload_file(thumb, &format!("{file_name}-thumbnail"))
            .await?;

        Ok(IpfsUploadThumbResult {
            original,
            thumbnail,
        })
    }

    pub async fn upload_json(&self, value: &JsonValue) -> UploadResult<IpfsUploadResult> {
        let upload = self.client.upload_json(value).await?;
        self.format(upload)
    }

    fn format(&self, upload: ClientUpload) -> UploadResult<IpfsUploadResult> {
        Ok(IpfsUploadResult {
            ipfs_uri: format!("ipfs://{}", upload.cid),
            public_gateway_uri: gateway_url(&self.public_gateway_uri, &upload.cid)?,
            cid: upload.cid,
            size: upload.size,
            url: upload.url,
        })
    }
}

impl std::fmt::Debug for IpfsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IpfsProvider")
            .field("provider", &self.client.provider_name())
            .field("public_gateway_uri", &self.public_gateway_uri)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ProviderKind;

    #[test]
    fn test_sandbox_defaults_to_local_public_gateway() {
        let provider = IpfsProvider::from_config(&IpfsConfig::default()).unwrap();
        assert_eq!(provider.provider_name(), "sandbox");
        assert_eq!(provider.public_gateway_uri(), "http://127.0.0.1:8080");
    }

    #[test]
    fn test_remote_backends_default_to_cloudflare() {
        let config = IpfsConfig {
            provider: ProviderKind::Pinata,
            pinata: Some(crate::PinataConfig::new("k", "s")),
            ..IpfsConfig::default()
        };
        let provider = IpfsProvider::from_config(&config).unwrap();
        assert_eq!(provider.public_gateway_uri(), "https://cloudflare-ipfs.com");
    }

    #[test]
    fn test_configured_public_gateway_wins() {
        let config = IpfsConfig {
            public_gateway_uri: Some("https://ipfs.example.org".to_string()),
            ..IpfsConfig::default()
        };
        let provider = IpfsProvider::from_config(&config).unwrap();
        assert_eq!(provider.public_gateway_uri(), "https://ipfs.example.org");
    }

    #[test]
    fn test_thumb_result_flattens_original() {
        let result = |cid: &str| IpfsUploadResult {
            cid: cid.to_string(),
            size: 3,
            ipfs_uri: format!("ipfs://{cid}"),
            url: format!("https://gw/ipfs/{cid}"),
            public_gateway_uri: format!("https://pub/ipfs/{cid}"),
        };
        let json = serde_json::to_value(IpfsUploadThumbResult {
            original: result("QmA"),
            thumbnail: result("QmB"),
        })
        .unwrap();
        assert_eq!(json["cid"], "QmA");
        assert_eq!(json["ipfsUri"], "ipfs://QmA");
        assert_eq!(json["publicGatewayUri"], "https://pub/ipfs/QmA");
        assert_eq!(json["thumbnail"]["cid"], "QmB");
    }
}
