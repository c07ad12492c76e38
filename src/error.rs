//! Error taxonomy shared by the store, the service and the HTTP layer.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Failures raised by a [`StatusStore`](crate::store::StatusStore) backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("store connection lock poisoned")]
    Poisoned,

    #[error("invalid persisted data: {0}")]
    InvalidData(String),
}

/// Errors surfaced by the status service operations.
#[derive(Debug, Error)]
pub enum StatusError {
    /// Malformed or missing request fields.
    #[error("{0}")]
    Validation(String),

    /// Missing or wrong driver token.
    #[error("invalid or missing driver token")]
    Unauthorized,

    /// No record for the referenced id.
    #[error("no status record for id `{0}`")]
    NotFound(String),

    /// The backing store failed the query.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl StatusError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// HTTP status for this error class.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for StatusError {
    fn into_response(self) -> Response {
        let code = self.status_code();
        if let Self::Store(ref e) = self {
            tracing::error!(?e, "Status store request failed");
        }
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (code, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_per_class() {
        assert_eq!(
            StatusError::validation("Missing ID").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            StatusError::Unauthorized.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            StatusError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            StatusError::from(StoreError::Poisoned).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_into_response_uses_error_class_status() {
        let response = StatusError::NotFound("abc".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
