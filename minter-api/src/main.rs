//! Minter API Server Entry Point
//!
//! Resolves configuration from the environment, wires the record store,
//! remote client and IPFS backend, and starts the Axum HTTP server.

use axum::Router;
use minter_api::telemetry::{init_tracer, shutdown_tracer};
use minter_api::{create_api_router, ApiError, ApiResult, AppState, MinterConfig};
use minter_core::MinterError;

#[tokio::main]
async fn main() -> ApiResult<()> {
    let config = MinterConfig::from_env().map_err(|e| ApiError::from(MinterError::from(e)))?;
    let provider = init_tracer(&config.telemetry)?;

    let state = AppState::from_config(&config).await?;
    let app: Router = create_api_router(state, &config.api);

    let addr = config
        .api
        .bind_addr()
        .map_err(|e| ApiError::from(MinterError::from(e)))?;
    tracing::info!(%addr, "Starting Minter API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    shutdown_tracer(provider);
    Ok(())
}
