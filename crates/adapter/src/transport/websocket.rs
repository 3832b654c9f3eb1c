//! MCP over a single WebSocket (`mcp` subprotocol).
//!
//! Every text frame is one JSON-RPC message in either direction. Frames that do not decode are
//! answered with a JSON-RPC parse error instead of closing the socket.

use super::{CHANNEL_CAPACITY, OutboundFrame, attach_request_info, parse_error, service_sink};
use crate::handler::ToolServer;
use api_mcp_http_tools::HttpRequestInfo;
use axum::Router;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocketUpgrade};
use axum::http::{HeaderMap, Uri};
use axum::response::Response;
use axum::routing::get;
use futures::channel::mpsc;
use futures::{Sink, SinkExt as _, Stream, StreamExt as _};
use rmcp::ServiceExt as _;
use rmcp::model::ClientJsonRpcMessage;
use std::fmt::Display;
use tokio_util::sync::CancellationToken;

pub const SUBPROTOCOL: &str = "mcp";

#[derive(Clone)]
struct WsState {
    server: ToolServer,
    ct: CancellationToken,
}

/// Router serving WebSocket upgrades on `path` (already normalized).
pub fn router(server: ToolServer, path: &str, ct: CancellationToken) -> Router {
    Router::new()
        .route(path, get(upgrade))
        .with_state(WsState { server, ct })
}

async fn upgrade(
    State(state): State<WsState>,
    uri: Uri,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    // A socket has no per-message request, so the upgrade request stands in for all of them.
    let http_info = HttpRequestInfo::for_websocket(&uri, &headers);
    ws.protocols([SUBPROTOCOL])
        .on_upgrade(move |socket| async move {
            tracing::info!(path = %http_info.path, "WebSocket session opened");
            let (sink, stream) = socket.split();
            run_session(sink, stream, state.server, http_info, state.ct.child_token()).await;
            tracing::info!("WebSocket session closed");
        })
}

/// Drive one MCP session over a frame sink/stream pair.
///
/// Returns when the client closes the socket, the server loop ends, or `ct` is cancelled; in
/// every case the remaining loops are dropped and `ct` is cancelled on the way out.
pub async fn run_session<Si, St, E>(
    sink: Si,
    stream: St,
    server: ToolServer,
    http_info: HttpRequestInfo,
    ct: CancellationToken,
) where
    Si: Sink<Message> + Unpin + Send,
    Si::Error: Display,
    St: Stream<Item = Result<Message, E>> + Unpin + Send,
    E: Display,
{
    let (inbound_tx, inbound_rx) = mpsc::channel::<ClientJsonRpcMessage>(CHANNEL_CAPACITY);
    let (outbound_tx, outbound_rx) = mpsc::channel::<OutboundFrame>(CHANNEL_CAPACITY);

    let reader = read_frames(stream, inbound_tx, outbound_tx.clone(), http_info);
    let writer = write_frames(sink, outbound_rx);
    let service_ct = ct.clone();
    let service = async move {
        match server.serve_with_ct((service_sink(outbound_tx), inbound_rx), service_ct).await {
            Ok(running) => {
                if let Err(e) = running.waiting().await {
                    tracing::error!(error = %e, "MCP session task failed");
                }
            }
            Err(e) => tracing::warn!(error = %e, "MCP session ended before initialization"),
        }
    };

    tokio::select! {
        () = reader => tracing::debug!("WebSocket client closed"),
        () = writer => tracing::debug!("WebSocket writer finished"),
        () = service => tracing::debug!("MCP server loop finished"),
        () = ct.cancelled() => tracing::debug!("WebSocket session cancelled"),
    }
    ct.cancel();
}

async fn read_frames<St, E>(
    mut stream: St,
    mut inbound: mpsc::Sender<ClientJsonRpcMessage>,
    mut outbound: mpsc::Sender<OutboundFrame>,
    http_info: HttpRequestInfo,
) where
    St: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    while let Some(frame) = stream.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(Message::Binary(_)) => {
                tracing::debug!("Ignoring binary WebSocket frame");
                continue;
            }
            Ok(_) => continue,
            Err(e) => {
                tracing::debug!(error = %e, "WebSocket read failed");
                break;
            }
        };

        match serde_json::from_str::<ClientJsonRpcMessage>(text.as_str()) {
            Ok(mut message) => {
                attach_request_info(&mut message, http_info.clone());
                if inbound.send(message).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to parse WebSocket message");
                if outbound.send(parse_error(&e)).await.is_err() {
                    break;
                }
            }
        }
    }
}

async fn write_frames<Si>(mut sink: Si, mut outbound: mpsc::Receiver<OutboundFrame>)
where
    Si: Sink<Message> + Unpin,
    Si::Error: Display,
{
    while let Some(frame) = outbound.next().await {
        let json = match frame.encode() {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode outbound message");
                continue;
            }
        };
        if let Err(e) = sink.send(Message::Text(json.into())).await {
            tracing::debug!(error = %e, "WebSocket write failed");
            break;
        }
    }
    if let Err(e) = sink.close().await {
        tracing::debug!(error = %e, "WebSocket close failed");
    }
}
