//! Wire transports.
//!
//! Each transport turns its wire protocol into a pair of in-memory channels (client -> server
//! `ClientJsonRpcMessage`s, server -> client `OutboundFrame`s) that rmcp's server loop
//! consumes through `ServiceExt::serve_with_ct`. The streamable HTTP transport delegates that
//! plumbing to rmcp's own tower service.

pub mod sse;
pub mod streamable_http;
pub mod websocket;

use api_mcp_http_tools::HttpRequestInfo;
use futures::channel::mpsc;
use futures::{Sink, SinkExt as _, future};
use rmcp::model::{ClientJsonRpcMessage, ErrorCode, GetExtensions as _, ServerJsonRpcMessage};
use serde_json::json;

/// Bounded capacity of every per-session channel.
pub(crate) const CHANNEL_CAPACITY: usize = 64;

/// One server -> client frame queued on a session's outbound channel.
#[derive(Debug)]
pub(crate) enum OutboundFrame {
    /// Produced by the rmcp server loop.
    Message(ServerJsonRpcMessage),
    /// Already-encoded JSON the transport writes itself (e.g. a parse error with a null id).
    Encoded(String),
}

impl OutboundFrame {
    pub(crate) fn encode(self) -> serde_json::Result<String> {
        match self {
            Self::Message(message) => serde_json::to_string(&message),
            Self::Encoded(json) => Ok(json),
        }
    }
}

/// The sink handed to rmcp: wraps every server message into an [`OutboundFrame`].
pub(crate) fn service_sink(
    outbound: mpsc::Sender<OutboundFrame>,
) -> impl Sink<ServerJsonRpcMessage, Error = mpsc::SendError> + Send + Unpin + 'static {
    outbound.with(|message: ServerJsonRpcMessage| {
        future::ready(Ok::<_, mpsc::SendError>(OutboundFrame::Message(message)))
    })
}

/// Attach the request snapshot so `call_tool` can forward allowlisted headers.
pub(crate) fn attach_request_info(message: &mut ClientJsonRpcMessage, info: HttpRequestInfo) {
    if let ClientJsonRpcMessage::Request(request) = message {
        request.request.extensions_mut().insert(info);
    }
}

/// JSON-RPC parse error (-32700) sent back on the session when an inbound frame does not decode.
///
/// The request id of an undecodable frame is unknown, so the error carries `"id": null`.
pub(crate) fn parse_error(err: &serde_json::Error) -> OutboundFrame {
    let error = json!({
        "jsonrpc": "2.0",
        "id": null,
        "error": {
            "code": ErrorCode::PARSE_ERROR.0,
            "message": format!("Parse error: {err}"),
        }
    });
    OutboundFrame::Encoded(error.to_string())
}

/// Normalize a mount path: leading `/` added, trailing `/` removed.
///
/// # Errors
///
/// Returns [`AdapterError::Config`](crate::AdapterError::Config) for an empty path or one with
/// characters outside printable ASCII.
pub fn normalize_mount_path(path: &str) -> crate::Result<String> {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return Err(crate::AdapterError::Config(
            "mount path must not be empty".to_string(),
        ));
    }
    if !trimmed.chars().all(|c| c.is_ascii_graphic()) {
        return Err(crate::AdapterError::Config(format!(
            "mount path '{trimmed}' must be printable ASCII without spaces"
        )));
    }
    let body = trimmed.trim_matches('/');
    Ok(format!("/{body}"))
}

/// `base` + `suffix` without doubling the separator at the root mount.
pub(crate) fn join_path(base: &str, suffix: &str) -> String {
    if base == "/" {
        suffix.to_string()
    } else {
        format!("{base}{suffix}")
    }
}
