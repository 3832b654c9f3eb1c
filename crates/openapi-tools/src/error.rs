//! Error types for `api-mcp-openapi-tools`.

use api_mcp_http_tools::HttpToolsError;
use thiserror::Error;

/// Main error type for `OpenAPI` tooling.
#[derive(Error, Debug)]
pub enum OpenApiToolsError {
    /// Configuration errors (conflicting filters, invalid options).
    #[error("Configuration error: {0}")]
    Config(String),

    /// `OpenAPI` document errors (not an object, missing `paths`).
    #[error("OpenAPI error: {0}")]
    OpenApi(String),

    #[error("OpenAPI error: failed to fetch document from '{url}': {message}")]
    OpenApiFetch { url: String, message: String },

    #[error("OpenAPI error: failed to read document file '{path}': {source}")]
    OpenApiReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("OpenAPI error: failed to parse document from '{location}': {source}")]
    OpenApiParse {
        location: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// The tool name is not in the operation map.
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// A declared path parameter was not supplied by the caller.
    #[error("Missing path parameter '{parameter}' for tool '{tool}'")]
    MissingPathParameter { tool: String, parameter: String },

    /// The API answered with a 4xx/5xx status.
    #[error("Error calling {tool}. Status code: {status}. Response: {body}")]
    ToolExecution {
        tool: String,
        status: u16,
        body: String,
    },

    /// Outbound call failures (transport, timeout, request construction).
    #[error(transparent)]
    Http(#[from] HttpToolsError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for `OpenAPI` tooling operations.
pub type Result<T> = std::result::Result<T, OpenApiToolsError>;
