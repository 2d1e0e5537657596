//--------------------------------------------------------------------------------------------------
// ENUMS
//--------------------------------------------------------------------------------------------------
// | Name            | Description                                      | Key Methods         |
// |-----------------|--------------------------------------------------|---------------------|
// | ApiError        | Error types for the API                          | from                |
//--------------------------------------------------------------------------------------------------

use axum::{
    response::{Response, IntoResponse},
    http::StatusCode,
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::auth::AuthError;
use crate::domain::services::placement::PlacementError;

/// Type alias for Result with ApiError
pub type ApiResult<T> = Result<T, ApiError>;

/// API-specific error types
#[derive(Error, Debug, Clone)]
pub enum ApiError {
    /// The requested resource was not found
    #[error("{0}")]
    NotFound(String),

    /// The request was invalid
    #[error("{0}")]
    BadRequest(String),

    /// The caller is not authenticated
    #[error("{0}")]
    Unauthorized(String),

    /// The caller is authenticated but not allowed
    #[error("{0}")]
    Forbidden(String),

    /// Internal server error
    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(json!({ "error": error_message }));

        (status, body).into_response()
    }
}

impl From<PlacementError> for ApiError {
    fn from(err: PlacementError) -> Self {
        match err {
            PlacementError::InvalidRequest => Self::BadRequest(err.to_string()),
            PlacementError::ProductUnavailable { .. } => Self::BadRequest(err.to_string()),
            PlacementError::InsufficientStock { .. } => Self::BadRequest(err.to_string()),
            PlacementError::StorageFailure(_) => Self::Internal(err.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingToken => Self::Unauthorized(err.to_string()),
            AuthError::InvalidToken => Self::Unauthorized(err.to_string()),
            AuthError::AdminRequired => Self::Forbidden(err.to_string()),
        }
    }
}
