//! Session manager wrapper for rmcp's streamable HTTP transport.
//!
//! We delegate session behavior to rmcp's `LocalSessionManager`, but track live session ids so
//! the transport can terminate every session on shutdown.

use futures::Stream;
use parking_lot::Mutex;
use rmcp::model::{ClientJsonRpcMessage, ServerJsonRpcMessage};
use rmcp::transport::common::server_side_http::ServerSseMessage;
use rmcp::transport::streamable_http_server::session::SessionId;
use rmcp::transport::streamable_http_server::session::SessionManager;
use rmcp::transport::streamable_http_server::session::local::LocalSessionManager;
use std::collections::HashSet;
use std::future::Future;

#[derive(Default)]
pub struct ApiSessionManager {
    inner: LocalSessionManager,
    live: Mutex<HashSet<SessionId>>,
}

impl ApiSessionManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions created and not yet closed.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.live.lock().len()
    }

    /// Close every live session.
    pub async fn close_all(&self) {
        let ids: Vec<SessionId> = self.live.lock().drain().collect();
        for id in ids {
            if let Err(e) = self.inner.close_session(&id).await {
                tracing::debug!(session_id = %id, error = %e, "Failed to close session");
            }
        }
    }

    async fn create_session_impl(
        &self,
    ) -> Result<
        (SessionId, <LocalSessionManager as SessionManager>::Transport),
        <LocalSessionManager as SessionManager>::Error,
    > {
        let (id, transport) = self.inner.create_session().await?;
        self.live.lock().insert(id.clone());
        tracing::debug!(session_id = %id, "Streamable HTTP session created");
        Ok((id, transport))
    }

    async fn close_session_impl(
        &self,
        id: &SessionId,
    ) -> Result<(), <LocalSessionManager as SessionManager>::Error> {
        let result = self.inner.close_session(id).await;
        if self.live.lock().remove(id) {
            tracing::debug!(session_id = %id, "Streamable HTTP session closed");
        }
        result
    }
}

impl SessionManager for ApiSessionManager {
    type Error = <LocalSessionManager as SessionManager>::Error;
    type Transport = <LocalSessionManager as SessionManager>::Transport;

    fn create_session(
        &self,
    ) -> impl Future<Output = Result<(SessionId, Self::Transport), Self::Error>> + Send {
        self.create_session_impl()
    }

    fn initialize_session(
        &self,
        id: &SessionId,
        message: ClientJsonRpcMessage,
    ) -> impl Future<Output = Result<ServerJsonRpcMessage, Self::Error>> + Send {
        self.inner.initialize_session(id, message)
    }

    fn has_session(
        &self,
        id: &SessionId,
    ) -> impl Future<Output = Result<bool, Self::Error>> + Send {
        self.inner.has_session(id)
    }

    fn close_session(
        &self,
        id: &SessionId,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send {
        self.close_session_impl(id)
    }

    fn create_stream(
        &self,
        id: &SessionId,
        message: ClientJsonRpcMessage,
    ) -> impl Future<
        Output = Result<impl Stream<Item = ServerSseMessage> + Send + Sync + 'static, Self::Error>,
    > + Send {
        self.inner.create_stream(id, message)
    }

    fn accept_message(
        &self,
        id: &SessionId,
        message: ClientJsonRpcMessage,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send {
        self.inner.accept_message(id, message)
    }

    fn create_standalone_stream(
        &self,
        id: &SessionId,
    ) -> impl Future<
        Output = Result<impl Stream<Item = ServerSseMessage> + Send + Sync + 'static, Self::Error>,
    > + Send {
        self.inner.create_standalone_stream(id)
    }

    fn resume(
        &self,
        id: &SessionId,
        last_event_id: String,
    ) -> impl Future<
        Output = Result<impl Stream<Item = ServerSseMessage> + Send + Sync + 'static, Self::Error>,
    > + Send {
        self.inner.resume(id, last_event_id)
    }
}
