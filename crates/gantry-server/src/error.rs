//! API error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// API error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Unauthenticated or non-PUT request. The endpoint answers a bare 404
    /// and reveals nothing about itself.
    #[error("not found")]
    PassThrough,

    #[error("{0}")]
    Metadata(#[from] gantry_core::Error),

    #[error("chunk {sequence} of package {package} is already staged")]
    Conflict { package: String, sequence: u32 },

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Get the error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::PassThrough => "not_found",
            Self::Metadata(_) => "bad_request",
            Self::Conflict { .. } => "locked",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::PassThrough => StatusCode::NOT_FOUND,
            Self::Metadata(_) => StatusCode::BAD_REQUEST,
            Self::Conflict { .. } => StatusCode::LOCKED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<gantry_staging::StagingError> for ApiError {
    fn from(e: gantry_staging::StagingError) -> Self {
        match e {
            gantry_staging::StagingError::Conflict { package, sequence } => Self::Conflict {
                package: package.as_str().to_string(),
                sequence,
            },
            gantry_staging::StagingError::Io(e) => Self::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            // No body: indistinguishable from a route that does not exist.
            Self::PassThrough => StatusCode::NOT_FOUND.into_response(),
            other => {
                let status = other.status_code();
                let body = ErrorResponse {
                    code: other.code().to_string(),
                    message: other.to_string(),
                };
                (status, Json(body)).into_response()
            }
        }
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
