//! Backend selection.
//!
//! The backend is chosen once, from an immutable [`IpfsConfig`], and never
//! changes for the life of the process.

use crate::client::{ClientUpload, IpfsClient, UploadResult};
use crate::providers::{
    fleek, sandbox, FleekConfig, FleekIpfsClient, PinataConfig, PinataIpfsClient,
    SandboxConfig, SandboxIpfsClient,
};
use async_trait::async_trait;
use bytes::Bytes;
use minter_core::UploadError;
use serde_json::Value as JsonValue;

/// Gateway used for `publicGatewayUri` when none is configured and the
/// backend is not the sandbox node.
pub const DEFAULT_PUBLIC_GATEWAY_URI: &str = "https://cloudflare-ipfs.com";

/// Which backend the operator asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Pinata,
    Fleek,
    Sandbox,
}

impl ProviderKind {
    /// Anything unrecognised selects the sandbox node.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "pinata" => ProviderKind::Pinata,
            "fleek" => ProviderKind::Fleek,
            _ => ProviderKind::Sandbox,
        }
    }
}

/// Upload configuration resolved at startup.
#[derive(Debug, Clone)]
pub struct IpfsConfig {
    pub provider: ProviderKind,
    pub pinata: Option<PinataConfig>,
    pub fleek: Option<FleekConfig>,
    pub sandbox: SandboxConfig,
    pub public_gateway_uri: Option<String>,
}

impl Default for IpfsConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Sandbox,
            pinata: None,
            fleek: None,
            sandbox: SandboxConfig::default(),
            public_gateway_uri: None,
        }
    }
}

impl IpfsConfig {
    /// Load from `MINTER_IPFS_*`, `MINTER_PINATA_*`, `MINTER_FLEEK_*` and
    /// `MINTER_SANDBOX_*`. A provider section only exists when both its key
    /// and secret are set.
    pub fn from_env() -> Self {
        let provider = env_opt("MINTER_IPFS_PROVIDER")
            .map(|p| ProviderKind::parse(&p))
            .unwrap_or(ProviderKind::Sandbox);

        let pinata = match (env_opt("MINTER_PINATA_API_KEY"), env_opt("MINTER_PINATA_API_SECRET")) {
            (Some(key), Some(secret)) => {
                let mut config = PinataConfig::new(key, secret);
                if let Some(gateway) = env_opt("MINTER_PINATA_GATEWAY_URI") {
                    config = config.with_gateway(gateway);
                }
                Some(config)
            }
            _ => None,
        };

        let fleek = match (env_opt("MINTER_FLEEK_API_KEY"), env_opt("MINTER_FLEEK_API_SECRET")) {
            (Some(key), Some(secret)) => Some(FleekConfig {
                bucket: env_opt("MINTER_FLEEK_BUCKET"),
                key_prefix: env_opt("MINTER_FLEEK_KEY_PREFIX").unwrap_or_default(),
                gateway_uri: env_opt("MINTER_FLEEK_GATEWAY_URI")
                    .unwrap_or_else(|| fleek::DEFAULT_GATEWAY_URI.to_string()),
                ..FleekConfig::new(key, secret)
            }),
            _ => None,
        };

        let sandbox = SandboxConfig {
            api_base_uri: env_opt("MINTER_SANDBOX_API_URI")
                .unwrap_or_else(|| sandbox::DEFAULT_API_URI.to_string()),
            gateway_uri: env_opt("MINTER_SANDBOX_GATEWAY_URI")
                .unwrap_or_else(|| sandbox::DEFAULT_GATEWAY_URI.to_string()),
        };

        Self {
            provider,
            pinata,
            fleek,
            sandbox,
            public_gateway_uri: env_opt("MINTER_IPFS_PUBLIC_GATEWAY_URI"),
        }
    }
}

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// The selected upload backend.
#[derive(Debug)]
pub enum IpfsBackend {
    Pinata(PinataIpfsClient),
    Fleek(FleekIpfsClient),
    Sandbox(SandboxIpfsClient),
}

impl IpfsBackend {
    /// Pinata if selected and configured, else Fleek if selected and
    /// configured, else the sandbox node.
    pub fn from_config(config: &IpfsConfig) -> Result<Self, UploadError> {
        let backend = match (config.provider, &config.pinata, &config.fleek) {
            (ProviderKind::Pinata, Some(pinata), _) => {
                IpfsBackend::Pinata(PinataIpfsClient::new(pinata.clone()))
            }
            (ProviderKind::Fleek, _, Some(fleek)) => {
                IpfsBackend::Fleek(FleekIpfsClient::new(fleek.clone())?)
            }
            (requested, _, _) => {
                if requested != ProviderKind::Sandbox {
                    tracing::warn!(
                        ?requested,
                        "Requested IPFS provider is not configured, falling back to sandbox"
                    );
                }
                IpfsBackend::Sandbox(SandboxIpfsClient::new(config.sandbox.clone()))
            }
        };

        tracing::info!(provider = backend.provider_name(), "IPFS backend selected");
        Ok(backend)
    }

    pub fn kind(&self) -> ProviderKind {
        match self {
            IpfsBackend::Pinata(_) => ProviderKind::Pinata,
            IpfsBackend::Fleek(_) => ProviderKind::Fleek,
            IpfsBackend::Sandbox(_) => ProviderKind::Sandbox,
        }
    }

    /// Gateway used for `publicGatewayUri`.
    pub fn default_public_gateway(&self) -> &'static str {
        match self {
            IpfsBackend::Sandbox(_) => sandbox::DEFAULT_GATEWAY_URI,
            _ => DEFAULT_PUBLIC_GATEWAY_URI,
        }
    }

    fn client(&self) -> &dyn IpfsClient {
        match self {
            IpfsBackend::Pinata(c) => c,
            IpfsBackend::Fleek(c) => c,
            IpfsBackend::Sandbox(c) => c,
        }
    }
}

#[async_trait]
impl IpfsClient for IpfsBackend {
    fn provider_name(&self) -> &'static str {
        self.client().provider_name()
    }

    async fn upload_file(&self, data: Bytes, file_name: &str) -> UploadResult<ClientUpload> {
        self.client().upload_file(data, file_name).await
    }

    async fn upload_json(&self, value: &JsonValue) -> UploadResult<ClientUpload> {
        self.client().upload_json(value).await
    }
}
