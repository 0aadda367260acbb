//! Minter API - HTTP Layer
//!
//! Axum routes for IPFS uploads and the incremental bigmap cache, plus the
//! pieces that only make sense at the edge: the PostgreSQL record store, the
//! Better Call Dev client, configuration from the environment and telemetry.

pub mod config;
pub mod db;
pub mod error;
pub mod macros;
pub mod openapi;
pub mod remote;
pub mod routes;
pub mod state;
pub mod telemetry;
pub mod types;

// Re-export commonly used types
pub use config::{ApiConfig, MinterConfig, StoreConfig};
pub use db::{DbConfig, PgRecordStore};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use openapi::ApiDoc;
pub use remote::{BetterCallDevClient, RemoteCollectionConfig};
pub use routes::create_api_router;
pub use state::{ApiCache, AppState};
pub use types::*;
