use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use portkey_core::StorageError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

pub type Result<T> = std::result::Result<T, AppError>;

/// HTTP-facing errors with bit-exact status mappings.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("short id is unknown: {0}")]
    UnknownShort(String),
    #[error("link deleted")]
    Gone,
    #[error("storage unreachable")]
    StorageUnavailable,
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Wraps a storage failure that has no endpoint-specific mapping.
    pub fn from_storage(err: StorageError) -> Self {
        error!(error = %err, "storage operation failed");
        AppError::Internal(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(json!({"error": "Unauthorized"})),
            )
                .into_response(),
            AppError::BadRequest(message) => (StatusCode::BAD_REQUEST, message).into_response(),
            // An unknown short id answers 400, a tombstoned one 410.
            AppError::UnknownShort(_) => {
                (StatusCode::BAD_REQUEST, "unknown short id").into_response()
            }
            AppError::Gone => StatusCode::GONE.into_response(),
            AppError::StorageUnavailable => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "Internal Server Error"})),
            )
                .into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mappings() {
        assert_eq!(
            AppError::Unauthorized.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::BadRequest("x".into()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::UnknownShort("x".into()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::Gone.into_response().status(), StatusCode::GONE);
        assert_eq!(
            AppError::Internal("x".into()).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
