//! HTTP error mapping for data-layer failures

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use vocab_core::VocabError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Vocab(#[from] VocabError),

    /// Request rejected by the HTTP layer before reaching the data layer.
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Vocab(err) => match err {
                VocabError::InvalidInput(_) | VocabError::BadRequest(_) => StatusCode::BAD_REQUEST,
                VocabError::UnprocessableInput { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                VocabError::NotFound(_) => StatusCode::NOT_FOUND,
                VocabError::Config(_) | VocabError::Encoding(_) | VocabError::StorageFailure { .. } => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::debug!("Request rejected ({}): {}", status, self);
        }

        let body = match &self {
            ApiError::Vocab(VocabError::UnprocessableInput { skipped }) => {
                json!({ "error": self.to_string(), "skipped": skipped })
            }
            _ => json!({ "error": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
