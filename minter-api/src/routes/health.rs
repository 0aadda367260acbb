//! Status and readiness endpoints.
//!
//! `/` answers `{"status":"OK"}` for the legacy client. Under `/health`,
//! `ping` and `live` never touch a dependency; `ready` pings the record store.

use std::sync::Arc;
use std::time::Instant;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use minter_storage::RecordStore;
use serde::{Deserialize, Serialize};

use crate::types::StatusResponse;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

/// Body of `/health/live`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Liveness {
    pub status: HealthStatus,
    pub uptime_seconds: u64,
}

/// Body of `/health/ready`. `status` mirrors the record store check.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Readiness {
    pub status: HealthStatus,
    pub details: ReadinessDetails,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ReadinessDetails {
    pub record_store: StoreCheck,
    /// Name of the configured IPFS backend; uploads are not exercised here.
    pub ipfs_provider: String,
    pub version: String,
}

/// Outcome of one `RecordStore::health_check` round trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct StoreCheck {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StoreCheck {
    async fn run(store: &dyn RecordStore) -> Self {
        let start = Instant::now();
        match store.health_check().await {
            Ok(()) => Self {
                status: HealthStatus::Healthy,
                latency_ms: Some(start.elapsed().as_millis() as u64),
                error: None,
            },
            Err(e) => {
                tracing::warn!(error = %e, "Record store unreachable");
                Self {
                    status: HealthStatus::Unhealthy,
                    latency_ms: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }
}

#[derive(Clone)]
pub struct HealthState {
    pub store: Arc<dyn RecordStore>,
    pub ipfs_provider: &'static str,
    pub start_time: Instant,
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Health",
    responses((status = 200, description = "Service is up", body = StatusResponse)),
)]
pub async fn status() -> Json<StatusResponse> {
    Json(StatusResponse::ok())
}

#[utoipa::path(
    get,
    path = "/health/ping",
    tag = "Health",
    responses((status = 200, description = "Always `pong`", body = String)),
)]
pub async fn ping() -> &'static str {
    "pong"
}

#[utoipa::path(
    get,
    path = "/health/live",
    tag = "Health",
    responses((status = 200, description = "Process is alive", body = Liveness)),
)]
pub async fn liveness(State(state): State<Arc<HealthState>>) -> Json<Liveness> {
    Json(Liveness {
        status: HealthStatus::Healthy,
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}

#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Record store reachable", body = Readiness),
        (status = 503, description = "Record store unreachable", body = Readiness),
    ),
)]
pub async fn readiness(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    let record_store = StoreCheck::run(state.store.as_ref()).await;
    let code = match record_store.status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    let body = Readiness {
        status: record_store.status,
        details: ReadinessDetails {
            record_store,
            ipfs_provider: state.ipfs_provider.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
    };
    (code, Json(body))
}

/// Create the `/health` router.
pub fn create_router(state: HealthState) -> Router {
    Router::new()
        .route("/ping", get(ping))
        .route("/live", get(liveness))
        .route("/ready", get(readiness))
        .with_state(Arc::new(state))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_store_check_reports_error_without_latency() {
        let check = StoreCheck {
            status: HealthStatus::Unhealthy,
            latency_ms: None,
            error: Some("connection refused".to_string()),
        };
        let json = serde_json::to_value(&check).unwrap();
        assert_eq!(json["status"], "unhealthy");
        assert_eq!(json["error"], "connection refused");
        assert!(json.get("latency_ms").is_none());
    }

    #[test]
    fn test_readiness_nests_store_under_details() {
        let body = Readiness {
            status: HealthStatus::Healthy,
            details: ReadinessDetails {
                record_store: StoreCheck {
                    status: HealthStatus::Healthy,
                    latency_ms: Some(2),
                    error: None,
                },
                ipfs_provider: "pinata".to_string(),
                version: "0.1.0".to_string(),
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["details"]["record_store"]["latency_ms"], 2);
        assert_eq!(json["details"]["ipfs_provider"], "pinata");
    }
}
