//! Error types for the battle API: startup failures and request failures.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tabletop_core::error::DomainError;
use thiserror::Error;

/// Failures that stop the server from starting or serving.
#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or unparsable environment variable.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Subscriber or OTLP exporter could not be installed.
    #[error("telemetry error: {0}")]
    Telemetry(String),

    /// Listener bind or serve loop failure.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

/// Body of every non-2xx battle response: `{ "error", "message" }`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

/// A `DomainError` surfaced over HTTP.
#[derive(Debug)]
pub struct ApiError(pub DomainError);

impl ApiError {
    /// Status code and machine-readable code for the wrapped error.
    #[must_use]
    pub fn classify(&self) -> (StatusCode, &'static str) {
        match &self.0 {
            DomainError::AggregateNotFound(_) => (StatusCode::NOT_FOUND, "aggregate_not_found"),
            DomainError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            DomainError::Infrastructure(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "infrastructure_error")
            }
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = self.classify();
        let body = ErrorBody {
            error,
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
