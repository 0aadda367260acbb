//! OpenAPI Specification for the Minter API
//!
//! Generated by utoipa from the route annotations and response types.

use utoipa::OpenApi;

use crate::error::{ApiError, ErrorCode};
use crate::routes::health::{HealthStatus, Liveness, Readiness, ReadinessDetails, StoreCheck};
use crate::routes::{bigmap, health, ipfs};
use crate::types::{CachedKeyResponse, StatusResponse};

use minter_core::{CollectionId, CollectionKey, Network};
use minter_ipfs::{IpfsUploadResult, IpfsUploadThumbResult};

/// OpenAPI document for the Minter API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Minter API",
        description = "IPFS uploads and an incremental cache of Tezos bigmap keys",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:3300", description = "Local Development")
    ),
    tags(
        (name = "Health", description = "Service status and readiness"),
        (name = "Collections", description = "Bigmap keys cached from the remote indexer"),
        (name = "IPFS", description = "Content-addressed uploads"),
        (name = "Observability", description = "Prometheus metrics")
    ),
    paths(
        health::status,
        health::ping,
        health::liveness,
        health::readiness,
        bigmap::get_cached_collection,
        ipfs::upload_file,
        ipfs::upload_image_with_thumbnail,
        ipfs::upload_json,
        crate::telemetry::metrics::metrics_handler,
    ),
    components(
        schemas(
            ApiError,
            ErrorCode,
            StatusResponse,
            CachedKeyResponse,
            HealthStatus,
            Liveness,
            Readiness,
            ReadinessDetails,
            StoreCheck,
            IpfsUploadResult,
            IpfsUploadThumbResult,
            Network,
            CollectionId,
            CollectionKey,
        )
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_every_route() {
        let doc = ApiDoc::openapi();
        let paths = &doc.paths.paths;
        for path in [
            "/",
            "/health/ping",
            "/health/ready",
            "/cached-bigmap/{network}/{id}",
            "/ipfs-file-upload",
            "/ipfs-image-with-thumbnail-upload",
            "/ipfs-json-upload",
            "/metrics",
        ] {
            assert!(paths.contains_key(path), "missing path {path}");
        }
    }

    #[test]
    fn test_openapi_json_serializes() {
        let json = ApiDoc::openapi().to_json().unwrap();
        assert!(json.contains("Minter API"));
        assert!(json.contains("IpfsUploadThumbResult"));
    }
}
