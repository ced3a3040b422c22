//! Error types for spkiosk-sync
//!
//! `Error` covers service setup and the command relay. The sync core itself
//! never surfaces errors to observers: transport failures are retried and
//! bad frames are dropped. `ApiError` maps failures onto HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Main error type for spkiosk-sync
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors bubbled up from spkiosk-common (config file, I/O)
    #[error(transparent)]
    Common(#[from] spkiosk_common::Error),

    /// Daemon rejected a relayed command (non-2xx)
    #[error("Daemon command {command} failed with status {status}: {body}")]
    Relay {
        command: String,
        status: u16,
        body: String,
    },

    /// Daemon command API unreachable
    #[error("Daemon request error: {0}")]
    RelayTransport(#[from] reqwest::Error),

    /// Invalid state for operation (e.g. starting a running service)
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

/// Convenience Result type using spkiosk-sync Error
pub type Result<T> = std::result::Result<T, Error>;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Daemon unreachable or rejected the command (502)
    #[error("Upstream daemon error: {0}")]
    BadGateway(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::Relay { .. } | Error::RelayTransport(_) => ApiError::BadGateway(err.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, "DAEMON_ERROR", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = std::result::Result<T, ApiError>;
