//! Cached Collection Query
//!
//! `GET /cached-bigmap/{network}/{id}` (and the `/cached-collection` alias)
//! backfills whatever the local store is missing, then returns every cached
//! key for the collection.

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use minter_core::CollectionKey;
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};
use crate::state::ApiCache;
use crate::telemetry::metrics;
use crate::types::CachedKeyResponse;

/// GET /cached-bigmap/{network}/{id}
#[utoipa::path(
    get,
    path = "/cached-bigmap/{network}/{id}",
    tag = "Collections",
    params(
        ("network" = String, Path, description = "Tezos network (mainnet, delphinet, edo2net, florencenet, sandbox)"),
        ("id" = i64, Path, description = "Bigmap id"),
    ),
    responses(
        (status = 200, description = "Every cached key of the collection", body = Vec<CachedKeyResponse>),
        (status = 400, description = "Unknown network or unparsable id", body = ApiError),
        (status = 500, description = "Remote indexer or record store failure", body = ApiError),
    ),
)]
pub async fn get_cached_collection(
    State(cache): State<Arc<ApiCache>>,
    Path((network, id)): Path<(String, String)>,
) -> ApiResult<Json<Vec<CachedKeyResponse>>> {
    let collection = CollectionKey::parse(&network, &id)?;

    match cache.ensure_cached(&collection).await {
        Ok(report) => {
            if let Some(metrics) = metrics::get() {
                metrics.record_backfill(&report, false);
            }
            if !report.is_noop() {
                tracing::info!(
                    %collection,
                    missing = report.missing,
                    inserted = report.inserted,
                    failed = report.failed(),
                    "Collection backfilled"
                );
            }
        }
        Err(err) => {
            if let Some(metrics) = metrics::get() {
                match err.partial_report() {
                    Some(partial) => metrics.record_backfill(partial, true),
                    None => metrics.record_backfill_failure(collection.network.as_str()),
                }
            }
            tracing::error!(%collection, error = %err, "Backfill failed");
            return Err(ApiError::from(err));
        }
    }

    let records = cache.cached_records(&collection).await?;
    Ok(Json(records.into_iter().map(CachedKeyResponse::from).collect()))
}

/// Routes mounted under both `/cached-bigmap` and `/cached-collection`.
pub fn create_router(cache: Arc<ApiCache>) -> Router {
    Router::new()
        .route("/:network/:id", get(get_cached_collection))
        .with_state(cache)
}
