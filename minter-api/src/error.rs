//! Error Types for the Minter API
//!
//! This module defines error handling for the HTTP layer, including:
//! - ApiError struct for structured error responses
//! - ErrorCode enum for categorizing errors
//! - IntoResponse implementation for Axum HTTP responses
//!
//! Every failure is serialized as `{"error": <message>, "code": <CODE>}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use minter_core::{MinterError, PersistenceError, UploadError, UpstreamError, ValidationError};
use minter_storage::BackfillError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Message returned when a multipart request carries no `file` field.
pub const NO_FILE_DATA: &str = "No file data found";
/// Message returned when a file or image upload fails at the provider.
pub const FILE_UPLOAD_FAILED: &str = "File upload failed";
/// Message returned when a JSON upload fails at the provider.
pub const JSON_UPLOAD_FAILED: &str = "JSON upload failed";
/// Message returned when the JSON upload body is missing or not JSON.
pub const NO_JSON_BODY: &str = "Could not retrieve JSON request body";

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Error codes for API responses.
///
/// Each error code maps to a specific HTTP status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================================================
    // Validation Errors (400)
    // ========================================================================
    /// Request validation failed
    ValidationFailed,

    /// Path segment could not be parsed
    InvalidFormat,

    // ========================================================================
    // Payload Errors (413)
    // ========================================================================
    /// Upload body exceeds the configured limit
    PayloadTooLarge,

    // ========================================================================
    // Server Errors (500, 503)
    // ========================================================================
    /// The remote collection indexer failed or answered nonsense
    UpstreamError,

    /// Internal server error
    InternalError,

    /// Record store operation failed
    DatabaseError,

    /// Content-addressed upload failed
    UploadFailed,

    /// Service is temporarily unavailable
    ServiceUnavailable,

    /// Database connection pool exhausted
    ConnectionPoolExhausted,
}

impl ErrorCode {
    /// Get the HTTP status code for this error code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::ValidationFailed | ErrorCode::InvalidFormat => StatusCode::BAD_REQUEST,

            ErrorCode::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,

            ErrorCode::ServiceUnavailable | ErrorCode::ConnectionPoolExhausted => {
                StatusCode::SERVICE_UNAVAILABLE
            }

            ErrorCode::UpstreamError
            | ErrorCode::InternalError
            | ErrorCode::DatabaseError
            | ErrorCode::UploadFailed => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get a default message for this error code.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::ValidationFailed => "Request validation failed",
            ErrorCode::InvalidFormat => "Invalid format",
            ErrorCode::PayloadTooLarge => "Upload exceeds the size limit",
            ErrorCode::UpstreamError => "Upstream service failed",
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database operation failed",
            ErrorCode::UploadFailed => FILE_UPLOAD_FAILED,
            ErrorCode::ServiceUnavailable => "Service temporarily unavailable",
            ErrorCode::ConnectionPoolExhausted => "Connection pool exhausted",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ============================================================================
// API ERROR STRUCT
// ============================================================================

/// Structured error response for API operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ApiError {
    /// Error code categorizing the error
    pub code: ErrorCode,

    /// Human-readable error message
    #[serde(rename = "error")]
    pub message: String,

    /// Optional additional details (partial backfill report, etc.)
    #[serde(skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Create a new API error with the given code, using the default message.
    pub fn from_code(code: ErrorCode) -> Self {
        Self {
            code,
            message: code.default_message().to_string(),
            details: None,
        }
    }

    /// Add additional details to the error.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    // ========================================================================
    // Convenience constructors for common errors
    // ========================================================================

    pub fn validation_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationFailed, message)
    }

    pub fn upstream_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::UpstreamError, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    pub fn database_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }

    pub fn upload_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::UploadFailed, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }

    pub fn payload_too_large() -> Self {
        Self::from_code(ErrorCode::PayloadTooLarge)
    }

    pub fn connection_pool_exhausted() -> Self {
        Self::from_code(ErrorCode::ConnectionPoolExhausted)
    }

    /// The multipart body had no `file` field.
    pub fn no_file_data() -> Self {
        Self::upload_failed(NO_FILE_DATA)
    }

    /// The JSON upload body was missing or unparseable.
    pub fn no_json_body() -> Self {
        Self::upload_failed(NO_JSON_BODY)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// ============================================================================
// AXUM INTEGRATION
// ============================================================================

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(self);
        (status, body).into_response()
    }
}

// ============================================================================
// CONVERSIONS FROM DOMAIN ERRORS
// ============================================================================

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::InvalidCollectionId { .. } => {
                ApiError::new(ErrorCode::InvalidFormat, err.to_string())
            }
            _ => ApiError::validation_failed(err.to_string()),
        }
    }
}

impl From<UpstreamError> for ApiError {
    fn from(err: UpstreamError) -> Self {
        tracing::error!(error = %err, "Upstream error");
        ApiError::upstream_error(err.to_string())
    }
}

impl From<PersistenceError> for ApiError {
    fn from(err: PersistenceError) -> Self {
        tracing::error!(error = %err, "Record store error");
        ApiError::database_error(err.to_string())
    }
}

/// Provider failures collapse to the generic file upload message; the
/// JSON endpoint maps its own failures explicitly.
impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        tracing::error!(error = %err, "Upload error");
        ApiError::upload_failed(FILE_UPLOAD_FAILED)
    }
}

impl From<BackfillError> for ApiError {
    fn from(err: BackfillError) -> Self {
        let details = err
            .partial_report()
            .and_then(|report| serde_json::to_value(report).ok());

        let api_error = match err {
            BackfillError::Metadata { source, .. } | BackfillError::Page { source, .. } => {
                ApiError::from(source)
            }
            BackfillError::Count { source, .. } => ApiError::from(source),
        };

        match details {
            Some(details) => api_error.with_details(serde_json::json!({ "partial": details })),
            None => api_error,
        }
    }
}

impl From<MinterError> for ApiError {
    fn from(err: MinterError) -> Self {
        match err {
            MinterError::Validation(e) => e.into(),
            MinterError::Upstream(e) => e.into(),
            MinterError::Persistence(e) => e.into(),
            MinterError::Upload(e) => e.into(),
            MinterError::Config(e) => ApiError::internal_error(e.to_string()),
        }
    }
}

// ============================================================================
// CONVERSIONS FROM STANDARD ERRORS
// ============================================================================

/// Convert from tokio_postgres::Error to ApiError.
impl From<tokio_postgres::Error> for ApiError {
    fn from(err: tokio_postgres::Error) -> Self {
        tracing::error!("Database error: {:?}", err);
        // Generic message so internal details don't leak
        ApiError::database_error("Database operation failed")
    }
}

/// Convert from deadpool_postgres::PoolError to ApiError.
impl From<deadpool_postgres::PoolError> for ApiError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        tracing::error!("Connection pool error: {:?}", err);
        match err {
            deadpool_postgres::PoolError::Timeout(_) => ApiError::connection_pool_exhausted(),
            deadpool_postgres::PoolError::Closed => {
                ApiError::service_unavailable("Database connection pool is closed")
            }
            _ => ApiError::database_error("Failed to acquire database connection"),
        }
    }
}

// ============================================================================
// RESULT TYPE ALIAS
// ============================================================================

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;
