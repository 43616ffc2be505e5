//! Domain error types for the test conversion server.
//!
//! Uses thiserror for ergonomic error handling with automatic Display implementations.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use utoipa::ToSchema;

use crate::db::StoreError;
use crate::services::github::RepositoryError;

/// Application-level errors.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Resource not found
    #[error("{0} not found")]
    NotFound(String),

    /// Invalid input data
    #[error("{0}")]
    InvalidInput(String),

    /// Request body failed schema validation
    #[error("Invalid request data")]
    Validation(Vec<FieldError>),

    /// Repository validation failed
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Output archive could not be built
    #[error("Archive error: {0}")]
    Archive(String),

    /// Publishing to the repository host failed
    #[error("Publish error: {0}")]
    Publish(String),

    /// Unexpected failure
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidInput(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Repository(err) if err.is_client_error() => StatusCode::BAD_REQUEST,
            AppError::Repository(_)
            | AppError::Archive(_)
            | AppError::Publish(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let (code, message, details) = match self {
            AppError::NotFound(_) => ("NOT_FOUND", self.to_string(), None),
            AppError::InvalidInput(_) => ("INVALID_INPUT", self.to_string(), None),
            AppError::Validation(fields) => {
                ("VALIDATION_ERROR", self.to_string(), Some(fields.clone()))
            }
            AppError::Repository(err) if err.is_client_error() => {
                (err.code(), err.to_string(), None)
            }
            AppError::Repository(err) => {
                tracing::error!("Repository validation error: {}", err);
                (
                    err.code(),
                    "Failed to validate repository".to_string(),
                    None,
                )
            }
            AppError::Archive(err) => {
                tracing::error!("Archive error: {}", err);
                ("ARCHIVE_ERROR", "Failed to download files".to_string(), None)
            }
            AppError::Publish(err) => {
                tracing::error!("Publish error: {}", err);
                (
                    "PUBLISH_ERROR",
                    "Failed to publish converted files".to_string(),
                    None,
                )
            }
            AppError::Internal(err) => {
                tracing::error!("Internal error: {}", err);
                (
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: message,
            code: code.to_string(),
            details,
        })
    }
}

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Error response body.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Human-readable message.
    pub error: String,
    /// Machine-readable error code.
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

// Conversion implementations for common error types

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::JobNotFound(id) => AppError::NotFound(format!("Conversion {}", id)),
            other => AppError::Internal(other.to_string()),
        }
    }
}
