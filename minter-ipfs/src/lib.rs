//! Minter IPFS - Content-Addressed Uploads
//!
//! An [`IpfsClient`] capability with three backends (Pinata, Fleek storage,
//! a plain IPFS node), the construction-time [`IpfsBackend`] selection, and
//! the [`IpfsProvider`] facade that formats results and produces thumbnails.

pub mod backend;
pub mod client;
pub mod provider;
pub mod providers;
pub mod thumbnail;

pub use backend::{IpfsBackend, IpfsConfig, ProviderKind, DEFAULT_PUBLIC_GATEWAY_URI};
pub use client::{ClientUpload, IpfsClient, UploadResult};
pub use provider::{IpfsProvider, IpfsUploadResult, IpfsUploadThumbResult};
pub use providers::{
    gateway_url, FleekConfig, FleekIpfsClient, PinataConfig, PinataIpfsClient, SandboxConfig,
    SandboxIpfsClient,
};
pub use thumbnail::{ImageThumbnailer, Thumbnailer};
