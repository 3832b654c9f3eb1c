//! Streamable HTTP transport (one path accepting GET/POST/DELETE).
//!
//! Backed by rmcp's `StreamableHttpService`. Stateful mode issues an `Mcp-Session-Id` and keeps
//! sessions until the client deletes them or [`HttpTransport::shutdown`] runs; stateless mode
//! serves every request with a fresh server and issues no session id.

use crate::handler::ToolServer;
use crate::session_manager::ApiSessionManager;
use axum::Router;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::response::Response;
use axum::routing::any;
use rmcp::transport::streamable_http_server::{StreamableHttpServerConfig, StreamableHttpService};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tower::ServiceExt as _;

type Service = StreamableHttpService<ToolServer, ApiSessionManager>;

pub struct HttpTransport {
    server: ToolServer,
    stateless: bool,
    sessions: Arc<ApiSessionManager>,
    // Built on the first request; concurrent first requests share one initialization.
    service: OnceCell<Service>,
}

impl HttpTransport {
    #[must_use]
    pub fn new(server: ToolServer, stateless: bool) -> Arc<Self> {
        Arc::new(Self {
            server,
            stateless,
            sessions: Arc::new(ApiSessionManager::new()),
            service: OnceCell::new(),
        })
    }

    #[must_use]
    pub fn is_stateless(&self) -> bool {
        self.stateless
    }

    /// Whether a request has started the underlying service yet.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.service.initialized()
    }

    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.session_count()
    }

    pub fn router(self: &Arc<Self>, path: &str) -> Router {
        Router::new()
            .route(path, any(handle))
            .with_state(Arc::clone(self))
    }

    async fn service(&self) -> &Service {
        self.service
            .get_or_init(|| async {
                tracing::info!(
                    stateless = self.stateless,
                    "Starting streamable HTTP session manager"
                );
                let server = self.server.clone();
                StreamableHttpService::new(
                    move || Ok(server.clone()),
                    Arc::clone(&self.sessions),
                    StreamableHttpServerConfig {
                        stateful_mode: !self.stateless,
                        ..Default::default()
                    },
                )
            })
            .await
    }

    /// Serve one HTTP request.
    pub async fn handle(&self, request: Request) -> Response {
        let service = self.service().await.clone();
        let Ok(response) = service.oneshot(request).await;
        response.map(Body::new)
    }

    /// Terminate every live session.
    pub async fn shutdown(&self) {
        let count = self.sessions.session_count();
        self.sessions.close_all().await;
        if count > 0 {
            tracing::info!(sessions = count, "Closed streamable HTTP sessions");
        }
    }
}

async fn handle(State(transport): State<Arc<HttpTransport>>, request: Request) -> Response {
    transport.handle(request).await
}
