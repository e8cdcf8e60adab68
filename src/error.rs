//! Error types for the cache layer
//!
//! Provides unified error handling using thiserror. Drivers surface these
//! errors; the cache service, rate limiter and session store absorb them.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Failure reported by a backend driver.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Backend could not be reached or the client could not be built
    #[error("Connection error: {0}")]
    Connection(String),

    /// Request was sent but the transport failed underneath it
    #[error("Transport error: {0}")]
    Transport(String),

    /// Operation exceeded its deadline
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Backend answered with something we could not interpret, or an error reply
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Active backend does not offer this operation
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Value could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Key pattern could not be compiled
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_timeout() {
            CacheError::Timeout(err.to_string())
        } else if err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() {
            CacheError::Transport(err.to_string())
        } else {
            CacheError::Protocol(err.to_string())
        }
    }
}

impl From<reqwest::Error> for CacheError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            CacheError::Timeout(err.to_string())
        } else if err.is_decode() {
            CacheError::Protocol(err.to_string())
        } else {
            CacheError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serialization(err.to_string())
    }
}

// == Result Type Alias ==
/// Convenience Result type for driver operations.
pub type Result<T> = std::result::Result<T, CacheError>;

// == API Error ==
/// Errors returned by the HTTP surface.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Key not present in the cache
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}
