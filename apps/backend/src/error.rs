//! Error handling for the scheduler service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use review_core::ValidationError;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Service error types
///
/// Every variant is returned to the caller unchanged; nothing here is
/// retried or swallowed.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Missing metadata: {0}")]
    MissingMetadata(String),

    #[error("Item not found: {0}")]
    ItemNotFound(Uuid),

    #[error("Concurrent update conflict on item {0}")]
    ConcurrentUpdateConflict(Uuid),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Machine-readable kind used in response bodies and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation_error",
            ApiError::MissingMetadata(_) => "missing_metadata",
            ApiError::ItemNotFound(_) => "item_not_found",
            ApiError::ConcurrentUpdateConflict(_) => "concurrent_update_conflict",
            ApiError::StorageUnavailable(_) | ApiError::Database(_) => "storage_unavailable",
            ApiError::Migration(_) => "migration_error",
            ApiError::Internal(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::MissingMetadata(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::ItemNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::ConcurrentUpdateConflict(_) => StatusCode::CONFLICT,
            ApiError::StorageUnavailable(_) | ApiError::Database(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ApiError::Migration(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(kind = self.kind(), error = %self, "request failed");
        }

        let body = Json(ErrorResponse {
            error: self.kind().to_string(),
            message: self.to_string(),
        });

        (status, body).into_response()
    }
}

/// Result type alias for service operations
pub type Result<T> = std::result::Result<T, ApiError>;
