//! API Configuration Module
//!
//! Configuration is resolved once at startup from `MINTER_*` environment
//! variables and passed by reference into constructors. Nothing here is
//! mutated afterwards.

use std::net::SocketAddr;

use minter_core::ConfigError;
use minter_ipfs::IpfsConfig;
use minter_storage::CacheConfig;

use crate::db::DbConfig;
use crate::remote::RemoteCollectionConfig;
use crate::telemetry::TelemetryConfig;

/// Default listening port.
pub const DEFAULT_PORT: u16 = 3300;

/// Default multipart upload limit (30 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 30 * 1024 * 1024;

// ============================================================================
// API CONFIGURATION
// ============================================================================

/// HTTP surface configuration: bind address, CORS and body limits.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Interface to bind.
    pub bind: String,

    /// Port to listen on.
    pub port: u16,

    /// Allowed CORS origins, matched exactly (comma-separated in env var).
    /// Empty means allow all origins (dev mode).
    pub cors_origins: Vec<String>,

    /// Whether to allow credentials in CORS requests.
    pub cors_allow_credentials: bool,

    /// Max age for CORS preflight cache in seconds.
    pub cors_max_age_secs: u64,

    /// Request body limit for the upload endpoints.
    pub max_upload_bytes: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            cors_origins: Vec::new(), // Empty = allow all
            cors_allow_credentials: false,
            cors_max_age_secs: 86400, // 24 hours
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `MINTER_API_BIND`: Interface to bind (default: 0.0.0.0)
    /// - `MINTER_API_PORT`: Port (default: 3300)
    /// - `MINTER_CORS_ORIGINS`: Comma-separated allowed origins (empty = allow all)
    /// - `MINTER_CORS_ALLOW_CREDENTIALS`: "true" or "false" (default: false)
    /// - `MINTER_CORS_MAX_AGE_SECS`: Preflight cache duration (default: 86400)
    /// - `MINTER_MAX_UPLOAD_BYTES`: Upload body limit (default: 30 MiB)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let bind = std::env::var("MINTER_API_BIND").unwrap_or(defaults.bind);

        let port = match std::env::var("MINTER_API_PORT") {
            Ok(raw) => raw.trim().parse::<u16>().map_err(|_| ConfigError::InvalidValue {
                field: "MINTER_API_PORT".to_string(),
                value: raw.clone(),
                reason: "expected a port number".to_string(),
            })?,
            Err(_) => defaults.port,
        };

        let cors_origins = std::env::var("MINTER_CORS_ORIGINS")
            .ok()
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let cors_allow_credentials = std::env::var("MINTER_CORS_ALLOW_CREDENTIALS")
            .ok()
            .map(|s| s.to_lowercase() == "true")
            .unwrap_or(false);

        let cors_max_age_secs = std::env::var("MINTER_CORS_MAX_AGE_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.cors_max_age_secs);

        let max_upload_bytes = std::env::var("MINTER_MAX_UPLOAD_BYTES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.max_upload_bytes);

        Ok(Self {
            bind,
            port,
            cors_origins,
            cors_allow_credentials,
            cors_max_age_secs,
            max_upload_bytes,
        })
    }

    /// Socket address to listen on.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.bind, self.port);
        addr.parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue {
                field: "MINTER_API_BIND".to_string(),
                value: addr.clone(),
                reason: e.to_string(),
            })
    }
}

// ============================================================================
// RECORD STORE SELECTION
// ============================================================================

/// Which record store backs the cache.
#[derive(Debug, Clone)]
pub enum StoreConfig {
    /// Process-local store; contents are lost on restart.
    InMemory,
    /// PostgreSQL store.
    Postgres(DbConfig),
}

impl StoreConfig {
    /// `MINTER_STORE=postgres` (or `pg`) selects PostgreSQL; unset or
    /// `memory` keeps the in-memory store. Other values are rejected.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var("MINTER_STORE").ok().as_deref().map(str::trim) {
            Some("postgres") | Some("pg") => Ok(StoreConfig::Postgres(DbConfig::from_env())),
            Some("memory") | Some("") | None => Ok(StoreConfig::InMemory),
            Some(other) => Err(ConfigError::InvalidValue {
                field: "MINTER_STORE".to_string(),
                value: other.to_string(),
                reason: "expected 'memory' or 'postgres'".to_string(),
            }),
        }
    }
}

// ============================================================================
// AGGREGATE
// ============================================================================

/// Every configuration section the server needs.
#[derive(Debug, Clone)]
pub struct MinterConfig {
    pub api: ApiConfig,
    pub store: StoreConfig,
    pub remote: RemoteCollectionConfig,
    pub cache: CacheConfig,
    pub ipfs: IpfsConfig,
    pub telemetry: TelemetryConfig,
}

impl MinterConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api: ApiConfig::from_env()?,
            store: StoreConfig::from_env()?,
            remote: RemoteCollectionConfig::from_env()?,
            cache: CacheConfig::from_env(),
            ipfs: IpfsConfig::from_env(),
            telemetry: TelemetryConfig::from_env(),
        })
    }
}
