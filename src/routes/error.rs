//! HTTP mapping of ingestion and export failures.
//!
//! Client-caused failures carry the core error's message verbatim; database
//! failures are logged and reported without detail.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::error::{DecodeError, OutlierConfigError};

// ---

#[derive(Debug, Error)]
pub enum ApiError {
    // ---
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Outliers(#[from] OutlierConfigError),

    #[error("{0}")]
    InvalidQuery(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        // ---
        match self {
            ApiError::Decode(DecodeError::UnsupportedFormat(_)) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::Decode(DecodeError::MalformedPayload(_)) => StatusCode::BAD_REQUEST,
            ApiError::Decode(DecodeError::Validation(_) | DecodeError::NoApplicableData) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ApiError::Outliers(_) | ApiError::InvalidQuery(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // ---
        let status = self.status();
        let message = match &self {
            ApiError::Database(e) => {
                tracing::error!("Request failed on database access: {}", e);
                "Internal server error".to_string()
            }
            other => {
                tracing::info!("Rejected request ({}): {}", status, other);
                other.to_string()
            }
        };

        let code = match status {
            StatusCode::UNSUPPORTED_MEDIA_TYPE => "UnsupportedMediaType",
            StatusCode::BAD_REQUEST => "BadRequest",
            StatusCode::UNPROCESSABLE_ENTITY => "UnprocessableEntity",
            StatusCode::NOT_FOUND => "NotFound",
            _ => "InternalServerError",
        };

        (status, Json(ErrorBody { code, message })).into_response()
    }
}
