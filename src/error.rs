//! Error types for the item service
//!
//! Provides the application error kinds shared by repositories, the access
//! layer and the HTTP transport.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::error;

use crate::models::ErrorResponse;

/// Message returned to callers for any internal failure.
pub const INTERNAL_ERROR_MESSAGE: &str = "Something went wrong";

// == App Error Enum ==
/// Unified error type for item operations.
///
/// Repositories translate store-specific conditions (missing rows, unique
/// constraint violations) into `NotFound` and `Duplicate`; anything else a
/// store reports surfaces as `Internal`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Item (or other resource) does not exist for the tenant
    #[error("{0}")]
    NotFound(String),

    /// Unique constraint violated
    #[error("{0}")]
    Duplicate(String),

    /// Input failed validation rules
    #[error("{0}")]
    Validation(String),

    /// Caller could not be authenticated
    #[error("{0}")]
    Unauthorized(String),

    /// Request could not be decoded
    #[error("{0}")]
    BadRequest(String),

    /// Connectivity, serialization or any other unexpected failure
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Wraps any displayable failure as an internal error.
    pub fn internal(err: impl std::fmt::Display) -> Self {
        AppError::Internal(err.to_string())
    }

    /// Returns the HTTP status this error maps to.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Duplicate(_) => StatusCode::CONFLICT,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            AppError::Internal(detail) => {
                error!(error = %detail, "Server error");
                INTERNAL_ERROR_MESSAGE.to_string()
            }
            AppError::NotFound(msg)
            | AppError::Duplicate(msg)
            | AppError::Validation(msg)
            | AppError::Unauthorized(msg)
            | AppError::BadRequest(msg) => msg.clone(),
        };

        (status, Json(ErrorResponse::new(message))).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for item operations.
pub type Result<T> = std::result::Result<T, AppError>;
