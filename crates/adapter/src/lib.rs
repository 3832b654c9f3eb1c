//! Expose an HTTP API's `OpenAPI` operations as MCP tools.
//!
//! [`ApiMcpBridge`] converts the document into a tool catalog, serves it through one
//! [`ToolServer`] and mounts that server on `axum` routes over any of three transports:
//! - legacy SSE ([`transport::sse`])
//! - streamable HTTP ([`transport::streamable_http`])
//! - WebSocket ([`transport::websocket`])

pub mod bridge;
pub mod config;
pub mod error;
pub mod handler;
pub mod session_manager;
pub mod transport;

pub use bridge::{ApiMcpBridge, DEFAULT_MOUNT_PATH, DEFAULT_SERVER_NAME, TransportKind};
pub use config::BridgeConfig;
pub use error::{AdapterError, Result};
pub use handler::{ToolCatalog, ToolServer};
