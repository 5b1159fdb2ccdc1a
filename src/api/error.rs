use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::analytics::AggregationError;
use crate::storage::StorageError;

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Errors returned by API handlers, rendered as `{"error": "..."}`
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("Access denied. Admin privileges required.")]
    Forbidden,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    InvalidRange(#[from] AggregationError),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Conflict => ApiError::Conflict("Email already in use".to_string()),
            StorageError::NotFound => ApiError::NotFound("Not found".to_string()),
            StorageError::Other(e) => ApiError::Internal(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) | ApiError::InvalidRange(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let error = match self {
            ApiError::Internal(e) => {
                tracing::error!("Internal error: {e:#}");
                "Internal server error.".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(ErrorResponse { error })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_errors_map_to_statuses() {
        let conflict = ApiError::from(StorageError::Conflict).into_response();
        assert_eq!(conflict.status(), StatusCode::CONFLICT);

        let internal = ApiError::from(StorageError::Other(anyhow::anyhow!("disk full"))).into_response();
        assert_eq!(internal.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn invalid_range_is_a_bad_request() {
        let err = ApiError::from(AggregationError::InvalidRange("soon".to_string()));
        assert_eq!(err.to_string(), "invalid date range: 'soon' is not a date");
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
