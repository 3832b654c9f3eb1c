//! Error types for `api-mcp-http-tools`.

use std::time::Duration;
use thiserror::Error;

/// Main error type for outbound HTTP calls.
#[derive(Error, Debug)]
pub enum HttpToolsError {
    /// The method is not one of GET/POST/PUT/DELETE/PATCH.
    #[error("Unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    /// The base URL of a remote API could not be parsed.
    #[error("Invalid base URL '{url}': {message}")]
    InvalidBaseUrl { url: String, message: String },

    /// The outbound request could not be built (bad URI, bad header name/value).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Transport-level failures (connection refused, body read errors).
    #[error("Request error: {0}")]
    Request(String),

    /// The call did not finish within its time budget.
    #[error("Request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// JSON serialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for outbound HTTP operations.
pub type Result<T> = std::result::Result<T, HttpToolsError>;
