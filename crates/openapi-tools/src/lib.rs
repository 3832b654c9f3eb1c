//! OpenAPI->MCP tooling.
//!
//! Turns an `OpenAPI` 3.x document into an ordered MCP tool catalog plus an operation map, filters
//! that catalog, and executes tool calls against the source API through an
//! [`ApiClient`](api_mcp_http_tools::ApiClient).
//!
//! It intentionally contains **no** transport or session logic; see `api-mcp-adapter` for that.

pub mod config;
pub mod convert;
pub mod document;
pub mod error;
pub mod filter;
pub mod runtime;
pub mod schema;
pub mod shorten;

pub use config::{ConvertOptions, ExecutionOptions, FilterConfig};
pub use convert::{ConvertedTools, OperationEntry, OperationMap, OperationParameter, ParamLocation, convert};
pub use document::{OpenApiDocument, fetch_from_target, load_document};
pub use error::{OpenApiToolsError, Result};
pub use filter::filter_tools;
pub use runtime::ToolExecutor;
pub use shorten::shorten_operation_id;
