//! IPFS Upload Endpoints
//!
//! - `POST /ipfs-file-upload` - multipart field `file`
//! - `POST /ipfs-image-with-thumbnail-upload` - multipart field `file`
//! - `POST /ipfs-json-upload` - JSON body
//!
//! Failures use the fixed messages clients already match on.

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
        DefaultBodyLimit, Multipart, State,
    },
    http::StatusCode,
    routing::post,
    Json, Router,
};
use bytes::Bytes;
use minter_ipfs::{IpfsProvider, IpfsUploadResult, IpfsUploadThumbResult};
use serde_json::Value as JsonValue;
use std::sync::Arc;

use crate::error::{ApiError, ApiResult, FILE_UPLOAD_FAILED, JSON_UPLOAD_FAILED};
use crate::telemetry::metrics;

/// Multipart field carrying the upload.
pub const FILE_FIELD: &str = "file";

/// Name used when the client sent no file name.
const DEFAULT_FILE_NAME: &str = "file";

/// The uploaded file pulled out of a multipart body.
#[derive(Debug)]
struct UploadedFile {
    name: String,
    data: Bytes,
}

/// Find the `file` field. Other fields are ignored.
async fn read_file_field(
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<UploadedFile> {
    let mut multipart = multipart.map_err(|rejection| {
        tracing::debug!(error = %rejection, "Upload is not a multipart body");
        ApiError::no_file_data()
    })?;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return Err(ApiError::no_file_data()),
            Err(e) => return Err(multipart_error(e)),
        };

        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let name = field
            .file_name()
            .filter(|n| !n.is_empty())
            .unwrap_or(DEFAULT_FILE_NAME)
            .to_string();
        let data = field.bytes().await.map_err(multipart_error)?;
        return Ok(UploadedFile { name, data });
    }
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        tracing::warn!(error = %err.body_text(), "Upload exceeds the body limit");
        return ApiError::payload_too_large();
    }
    tracing::error!(error = %err.body_text(), "Failed to read multipart body");
    ApiError::upload_failed(FILE_UPLOAD_FAILED)
}

fn record_upload(provider: &IpfsProvider, kind: &str, success: bool) {
    if let Some(metrics) = metrics::get() {
        metrics.record_ipfs_upload(provider.provider_name(), kind, success);
    }
}

/// POST /ipfs-file-upload - multipart body with a `file` field
#[utoipa::path(
    post,
    path = "/ipfs-file-upload",
    tag = "IPFS",
    responses(
        (status = 200, description = "File pinned", body = IpfsUploadResult),
        (status = 413, description = "Upload too large", body = ApiError),
        (status = 500, description = "No file data found, or the upload failed", body = ApiError),
    ),
)]
pub async fn upload_file(
    State(ipfs): State<Arc<IpfsProvider>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<IpfsUploadResult>> {
    let file = read_file_field(multipart).await?;
    let size = file.data.len();

    match ipfs.upload_file(file.data, &file.name).await {
        Ok(result) => {
            record_upload(&ipfs, "file", true);
            tracing::info!(cid = %result.cid, size, file_name = %file.name, "File uploaded");
            Ok(Json(result))
        }
        Err(e) => {
            record_upload(&ipfs, "file", false);
            Err(ApiError::from(e))
        }
    }
}

/// POST /ipfs-image-with-thumbnail-upload - multipart body with an image in `file`
#[utoipa::path(
    post,
    path = "/ipfs-image-with-thumbnail-upload",
    tag = "IPFS",
    responses(
        (status = 200, description = "Image and thumbnail pinned", body = IpfsUploadThumbResult),
        (status = 413, description = "Upload too large", body = ApiError),
        (status = 500, description = "No file data found, or the upload failed", body = ApiError),
    ),
)]
pub async fn upload_image_with_thumbnail(
    State(ipfs): State<Arc<IpfsProvider>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<IpfsUploadThumbResult>> {
    let file = read_file_field(multipart).await?;

    match ipfs.upload_image_with_thumbnail(file.data, &file.name).await {
        Ok(result) => {
            record_upload(&ipfs, "image", true);
            tracing::info!(
                cid = %result.original.cid,
                thumbnail_cid = %result.thumbnail.cid,
                file_name = %file.name,
                "Image uploaded with thumbnail"
            );
            Ok(Json(result))
        }
        Err(e) => {
            record_upload(&ipfs, "image", false);
            Err(ApiError::from(e))
        }
    }
}

/// POST /ipfs-json-upload - any JSON document as the body
#[utoipa::path(
    post,
    path = "/ipfs-json-upload",
    tag = "IPFS",
    responses(
        (status = 200, description = "JSON pinned", body = IpfsUploadResult),
        (status = 500, description = "Missing body, or the upload failed", body = ApiError),
    ),
)]
pub async fn upload_json(
    State(ipfs): State<Arc<IpfsProvider>>,
    body: Result<Json<JsonValue>, JsonRejection>,
) -> ApiResult<Json<IpfsUploadResult>> {
    let Json(value) = body.map_err(|rejection| {
        tracing::debug!(error = %rejection.body_text(), "JSON upload without a usable body");
        ApiError::no_json_body()
    })?;

    match ipfs.upload_json(&value).await {
        Ok(result) => {
            record_upload(&ipfs, "json", true);
            tracing::info!(cid = %result.cid, "JSON uploaded");
            Ok(Json(result))
        }
        Err(e) => {
            record_upload(&ipfs, "json", false);
            tracing::error!(error = %e, "JSON upload failed");
            Err(ApiError::upload_failed(JSON_UPLOAD_FAILED))
        }
    }
}

/// Create the upload router with a body limit of `max_upload_bytes`.
pub fn create_router(ipfs: Arc<IpfsProvider>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/ipfs-file-upload", post(upload_file))
        .route(
            "/ipfs-image-with-thumbnail-upload",
            post(upload_image_with_thumbnail),
        )
        .route("/ipfs-json-upload", post(upload_json))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(ipfs)
}
