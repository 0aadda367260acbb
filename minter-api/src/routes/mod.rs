//! REST API Route Handlers
//!
//! - `GET /` and `/health/*` - status, liveness and readiness
//! - `GET /cached-bigmap/{network}/{id}` (alias `/cached-collection/...`)
//! - `POST /ipfs-*-upload` - content-addressed uploads
//! - `GET /metrics`, `GET /openapi.json` and, with `swagger-ui`, `/swagger-ui`

pub mod bigmap;
pub mod health;
pub mod ipfs;

use std::any::Any;
use std::time::Duration;

use axum::{
    http::{header, HeaderValue, Method},
    middleware::from_fn,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use utoipa::OpenApi;

use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::openapi::ApiDoc;
use crate::state::AppState;
use crate::telemetry::{metrics_handler, observability_middleware};

/// Handler for /openapi.json endpoint.
async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

/// Panics inside a handler become a 500 envelope; the server keeps going.
fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic payload");
    tracing::error!(panic = %detail, "Handler panicked");
    ApiError::internal_error("Internal server error").into_response()
}

/// Build the CORS layer from configuration.
fn build_cors_layer(config: &ApiConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .max_age(Duration::from_secs(config.cors_max_age_secs));

    if config.cors_origins.is_empty() {
        // Development mode: allow all origins
        tracing::info!("CORS: Development mode - allowing all origins");
        cors.allow_origin(AnyOrigin).allow_headers(AnyOrigin)
    } else {
        tracing::info!(
            "CORS: Production mode - allowing origins: {:?}",
            config.cors_origins
        );
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();

        if config.cors_allow_credentials {
            cors.allow_origin(origins).allow_credentials(true)
        } else {
            cors.allow_origin(origins)
        }
    }
}

/// Create the complete API router.
pub fn create_api_router(state: AppState, api_config: &ApiConfig) -> Router {
    let health_state = health::HealthState {
        store: state.store.clone(),
        ipfs_provider: state.ipfs.provider_name(),
        start_time: state.start_time,
    };

    #[allow(unused_mut)]
    let mut router = Router::new()
        .route("/", get(health::status))
        .nest("/health", health::create_router(health_state))
        .nest("/cached-bigmap", bigmap::create_router(state.cache.clone()))
        .nest("/cached-collection", bigmap::create_router(state.cache.clone()))
        .merge(ipfs::create_router(
            state.ipfs.clone(),
            api_config.max_upload_bytes,
        ))
        .route("/metrics", get(metrics_handler))
        .route("/openapi.json", get(openapi_json));

    #[cfg(feature = "swagger-ui")]
    {
        use utoipa_swagger_ui::SwaggerUi;
        router = router.merge(
            SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()),
        );
    }

    router
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(from_fn(observability_middleware))
        .layer(build_cors_layer(api_config))
}
