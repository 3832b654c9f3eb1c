//! Legacy MCP SSE transport.
//!
//! `GET {mount}` opens a session: the first event (`endpoint`) tells the client where to POST,
//! every later event (`message`) is one server -> client JSON-RPC message.
//! `POST {mount}/messages/?session_id=<uuid>` delivers one client -> server message.

use super::{
    CHANNEL_CAPACITY, OutboundFrame, attach_request_info, join_path, parse_error, service_sink,
};
use crate::handler::ToolServer;
use api_mcp_http_tools::HttpRequestInfo;
use axum::Router;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use futures::channel::mpsc;
use futures::{SinkExt as _, Stream, StreamExt as _, stream};
use parking_lot::RwLock;
use rmcp::ServiceExt as _;
use rmcp::model::ClientJsonRpcMessage;
use serde::Deserialize;
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Clone)]
struct SessionChannels {
    /// Client -> server messages, consumed by the rmcp service.
    inbound: mpsc::Sender<ClientJsonRpcMessage>,
    /// Server -> client frames, drained by the event stream. Used here only for parse errors.
    outbound: mpsc::Sender<OutboundFrame>,
}

/// One SSE mount. Owns its session registry; two mounts never share sessions.
pub struct SseTransport {
    server: ToolServer,
    mount_path: String,
    messages_path: String,
    sessions: RwLock<HashMap<Uuid, SessionChannels>>,
    ct: CancellationToken,
}

impl SseTransport {
    /// `mount_path` must already be normalized.
    #[must_use]
    pub fn new(server: ToolServer, mount_path: &str, ct: CancellationToken) -> Arc<Self> {
        Arc::new(Self {
            server,
            mount_path: mount_path.to_string(),
            messages_path: join_path(mount_path, "/messages/"),
            sessions: RwLock::new(HashMap::new()),
            ct,
        })
    }

    #[must_use]
    pub fn mount_path(&self) -> &str {
        &self.mount_path
    }

    #[must_use]
    pub fn messages_path(&self) -> &str {
        &self.messages_path
    }

    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn router(self: &Arc<Self>) -> Router {
        Router::new()
            .route(&self.mount_path, get(connect))
            .route(&self.messages_path, post(post_message))
            .with_state(Arc::clone(self))
    }

    fn remove_session(&self, session_id: &Uuid) -> bool {
        self.sessions.write().remove(session_id).is_some()
    }
}

/// Removes the session when the event stream is dropped (client disconnected).
struct SessionGuard {
    transport: Arc<SseTransport>,
    session_id: Uuid,
    ct: CancellationToken,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.ct.cancel();
        if self.transport.remove_session(&self.session_id) {
            tracing::debug!(session_id = %self.session_id.simple(), "SSE client disconnected");
        }
    }
}

async fn connect(
    State(transport): State<Arc<SseTransport>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let session_id = Uuid::new_v4();
    let (inbound_tx, inbound_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (outbound_tx, outbound_rx) = mpsc::channel(CHANNEL_CAPACITY);

    transport.sessions.write().insert(
        session_id,
        SessionChannels {
            inbound: inbound_tx,
            outbound: outbound_tx.clone(),
        },
    );

    let ct = transport.ct.child_token();
    tokio::spawn(serve_session(
        Arc::clone(&transport),
        session_id,
        outbound_tx,
        inbound_rx,
        ct.clone(),
    ));

    let endpoint = format!(
        "{}?session_id={}",
        transport.messages_path,
        session_id.simple()
    );
    tracing::info!(session_id = %session_id.simple(), "SSE session opened");

    let guard = SessionGuard {
        transport,
        session_id,
        ct,
    };
    let endpoint_event = stream::once(async move {
        Ok::<_, Infallible>(Event::default().event("endpoint").data(endpoint))
    });
    let message_events = outbound_rx.filter_map(|frame: OutboundFrame| async move {
        match frame.encode() {
            Ok(json) => Some(Ok(Event::default().event("message").data(json))),
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode outbound message");
                None
            }
        }
    });
    let events = endpoint_event.chain(message_events).map(move |event| {
        let _guard = &guard;
        event
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}

/// Run the MCP server over one session's channels until it ends or is cancelled.
async fn serve_session(
    transport: Arc<SseTransport>,
    session_id: Uuid,
    outbound: mpsc::Sender<OutboundFrame>,
    inbound: mpsc::Receiver<ClientJsonRpcMessage>,
    ct: CancellationToken,
) {
    match transport
        .server
        .clone()
        .serve_with_ct((service_sink(outbound), inbound), ct)
        .await
    {
        Ok(running) => {
            if let Err(e) = running.waiting().await {
                tracing::error!(session_id = %session_id.simple(), error = %e, "MCP session task failed");
            }
        }
        Err(e) => {
            tracing::warn!(session_id = %session_id.simple(), error = %e, "MCP session ended before initialization");
        }
    }
    // Drops the registry's sender so the event stream ends.
    transport.remove_session(&session_id);
    tracing::debug!(session_id = %session_id.simple(), "SSE session closed");
}

#[derive(Debug, Deserialize)]
struct MessageQuery {
    session_id: Option<String>,
}

async fn post_message(
    State(transport): State<Arc<SseTransport>>,
    Query(query): Query<MessageQuery>,
    parts: Parts,
    body: Bytes,
) -> Response {
    let Some(raw_session_id) = query.session_id else {
        tracing::warn!("Received request without session_id");
        return (StatusCode::BAD_REQUEST, "session_id is required").into_response();
    };
    let Ok(session_id) = Uuid::parse_str(&raw_session_id) else {
        tracing::warn!(session_id = %raw_session_id, "Received invalid session ID");
        return (StatusCode::BAD_REQUEST, "Invalid session ID").into_response();
    };

    let session = transport.sessions.read().get(&session_id).cloned();
    let Some(mut session) = session else {
        tracing::warn!(session_id = %session_id.simple(), "Could not find session");
        return (StatusCode::NOT_FOUND, "Could not find session").into_response();
    };

    let mut message = match serde_json::from_slice::<ClientJsonRpcMessage>(&body) {
        Ok(message) => message,
        Err(e) => {
            tracing::warn!(session_id = %session_id.simple(), error = %e, "Failed to parse message");
            // Queued before the 400 is returned, so the client sees both.
            if session.outbound.send(parse_error(&e)).await.is_err() {
                tracing::debug!(session_id = %session_id.simple(), "Session closed before parse error was delivered");
            }
            return (StatusCode::BAD_REQUEST, "Could not parse message").into_response();
        }
    };

    attach_request_info(&mut message, HttpRequestInfo::from_parts(&parts, Some(&body)));
    tracing::debug!(session_id = %session_id.simple(), "Forwarding client message");

    if session.inbound.send(message).await.is_err() {
        tracing::warn!(session_id = %session_id.simple(), "Session closed while forwarding message");
        transport.remove_session(&session_id);
        return (StatusCode::NOT_FOUND, "Could not find session").into_response();
    }

    (StatusCode::ACCEPTED, "Accepted").into_response()
}
