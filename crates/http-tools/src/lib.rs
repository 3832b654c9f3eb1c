//! HTTP plumbing shared by the api-mcp crates.
//!
//! This crate is used by:
//! - `api-mcp-openapi-tools` (tool execution against the source API)
//! - `api-mcp-adapter` (request snapshots captured at the MCP transport boundary)
//!
//! It knows nothing about `OpenAPI` documents or MCP sessions.

pub mod client;
pub mod error;
pub mod method;
pub mod request_info;
pub mod semantics;

pub use client::{ApiClient, ApiRequest, ApiResponse, RemoteClient, RouterClient};
pub use error::{HttpToolsError, Result};
pub use method::HttpMethod;
pub use request_info::HttpRequestInfo;
