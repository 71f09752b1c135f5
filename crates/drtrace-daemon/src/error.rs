//! API error surface.
//!
//! Every error body has the shape `{"detail": {"code": ..., "message": ...}}`.
//! Validation failures are 4xx with a stable code and are never logged as
//! server errors; storage failures are 500 and are.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use lib_log_types::ErrorBody;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad or conflicting query parameters.
    #[error("{0}")]
    InvalidParams(String),

    /// `start_ts > end_ts`.
    #[error("{0}")]
    InvalidTimeRange(String),

    /// A level token outside the enumerated set.
    #[error("{0}")]
    InvalidLevel(String),

    /// A timestamp that is neither float seconds nor ISO 8601.
    #[error("{0}")]
    InvalidTimeFormat(String),

    /// An ingest body that violates the record schema.
    #[error("{0}")]
    Validation(String),

    /// Store failure.
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidParams(_) | ApiError::Validation(_) => "INVALID_PARAMS",
            ApiError::InvalidTimeRange(_) => "INVALID_TIME_RANGE",
            ApiError::InvalidLevel(_) => "INVALID_LEVEL",
            ApiError::InvalidTimeFormat(_) => "INVALID_TIME_FORMAT",
            ApiError::Storage(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidParams(_)
            | ApiError::InvalidTimeRange(_)
            | ApiError::InvalidLevel(_)
            | ApiError::InvalidTimeFormat(_) => StatusCode::BAD_REQUEST,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Storage(e) = &self {
            tracing::error!("request failed on storage: {}", e);
        }
        let body = ErrorBody::new(self.code(), self.to_string());
        (self.status(), Json(body)).into_response()
    }
}
