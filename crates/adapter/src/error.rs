//! Error types for the MCP adapter.

use api_mcp_openapi_tools::OpenApiToolsError;
use thiserror::Error;

/// Main error type for the adapter.
#[derive(Error, Debug)]
pub enum AdapterError {
    /// Configuration errors (invalid JSON/YAML, conflicting filters, bad mount path)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Startup errors (listener or document loading failed)
    #[error("Startup error: {0}")]
    Startup(String),

    /// `OpenAPI` errors (document loading, conversion, filtering, tool execution)
    #[error(transparent)]
    OpenApi(#[from] OpenApiToolsError),

    /// HTTP client errors (invalid target URL)
    #[error(transparent)]
    Http(#[from] api_mcp_http_tools::HttpToolsError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for adapter operations.
pub type Result<T> = std::result::Result<T, AdapterError>;
