//! Upload backend implementations
//!
//! Concrete [`IpfsClient`](crate::IpfsClient) implementations for Pinata,
//! Fleek storage and a plain IPFS node.

pub mod fleek;
pub mod pinata;
pub mod sandbox;

pub use fleek::{FleekConfig, FleekIpfsClient};
pub use pinata::{PinataConfig, PinataIpfsClient};
pub use sandbox::{SandboxConfig, SandboxIpfsClient};

use minter_core::UploadError;
use reqwest::Url;

pub(crate) fn request_failed(provider: &str, status: u16, message: impl Into<String>) -> UploadError {
    UploadError::RequestFailed {
        provider: provider.to_string(),
        status,
        message: message.into(),
    }
}

pub(crate) fn invalid_response(provider: &str, reason: impl Into<String>) -> UploadError {
    UploadError::InvalidResponse {
        provider: provider.to_string(),
        reason: reason.into(),
    }
}

/// `{gateway}/ipfs/{cid}`, replacing any path already on the gateway.
pub fn gateway_url(gateway: &str, cid: &str) -> Result<String, UploadError> {
    let base = Url::parse(gateway)
        .map_err(|e| invalid_response("gateway", format!("Invalid gateway URI '{gateway}': {e}")))?;
    base.join(&format!("/ipfs/{cid}"))
        .map(String::from)
        .map_err(|e| invalid_response("gateway", format!("Cannot build gateway URL: {e}")))
}
