//! Outbound API clients used by tool execution.
//!
//! Two backends implement [`ApiClient`]:
//! - [`RouterClient`] calls an `axum::Router` in process (no network hop).
//! - [`RemoteClient`] calls an API over HTTP through `reqwest`, relative to a base URL.

use crate::error::{HttpToolsError, Result};
use crate::method::HttpMethod;
use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, Bytes};
use axum::http::{Request, header};
use serde_json::Value;
use std::time::Duration;
use tower::ServiceExt as _;
use url::Url;

/// Default cap on buffered response bodies (16 MiB).
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 16 * 1024 * 1024;

/// One outbound API call, fully resolved (path parameters already substituted).
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: HttpMethod,
    /// Path relative to the API root, starting with `/`.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    /// JSON payload; only ever set for POST/PUT/PATCH.
    pub body: Option<Value>,
}

impl ApiRequest {
    #[must_use]
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Path plus the url-encoded query string (if any).
    #[must_use]
    pub fn path_and_query(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let query = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.query.iter())
            .finish();
        format!("{}?{query}", self.path)
    }
}

/// Buffered API response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Bytes,
}

impl ApiResponse {
    /// `true` for 4xx and 5xx statuses.
    #[must_use]
    pub fn is_error(&self) -> bool {
        (400..600).contains(&self.status)
    }

    /// Body decoded as JSON, if it is JSON.
    #[must_use]
    pub fn json(&self) -> Option<Value> {
        serde_json::from_slice(&self.body).ok()
    }

    /// Body as text (lossy for non-UTF-8 payloads).
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Seam between tool execution and the API that backs the tools.
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// Perform exactly one call, bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failures or when the timeout elapses. HTTP error statuses
    /// are *not* errors here; they come back as an [`ApiResponse`].
    async fn send(&self, request: ApiRequest, timeout: Duration) -> Result<ApiResponse>;
}

// ============================================================================
// In-process client
// ============================================================================

/// Calls an `axum::Router` directly through its `tower::Service` implementation.
#[derive(Clone)]
pub struct RouterClient {
    router: Router,
    max_response_bytes: usize,
}

impl RouterClient {
    #[must_use]
    pub fn new(router: Router) -> Self {
        Self {
            router,
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
        }
    }

    #[must_use]
    pub fn with_max_response_bytes(mut self, max_response_bytes: usize) -> Self {
        self.max_response_bytes = max_response_bytes;
        self
    }

    fn build_request(request: &ApiRequest) -> Result<Request<Body>> {
        let mut builder = Request::builder()
            .method(request.method.to_method())
            .uri(request.path_and_query());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let body = match &request.body {
            Some(payload) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(serde_json::to_vec(payload)?)
            }
            None => Body::empty(),
        };
        builder
            .body(body)
            .map_err(|e| HttpToolsError::InvalidRequest(e.to_string()))
    }
}

#[async_trait]
impl ApiClient for RouterClient {
    async fn send(&self, request: ApiRequest, timeout: Duration) -> Result<ApiResponse> {
        let http_request = Self::build_request(&request)?;
        let router = self.router.clone();
        let limit = self.max_response_bytes;

        let call = async move {
            let response = match router.oneshot(http_request).await {
                Ok(response) => response,
                Err(never) => match never {},
            };
            let status = response.status().as_u16();
            let body = axum::body::to_bytes(response.into_body(), limit)
                .await
                .map_err(|e| HttpToolsError::Request(format!("failed to read body: {e}")))?;
            Ok(ApiResponse { status, body })
        };

        tokio::time::timeout(timeout, call).await.map_err(|_| {
            tracing::debug!(
                method = %request.method,
                path = %request.path,
                timeout_ms = timeout.as_millis(),
                "In-process API call timed out"
            );
            HttpToolsError::Timeout(timeout)
        })?
    }
}

// ============================================================================
// Remote client
// ============================================================================

/// Calls an API over the network, resolving request paths against a base URL.
#[derive(Clone)]
pub struct RemoteClient {
    client: reqwest::Client,
    base_url: String,
}

impl RemoteClient {
    /// Create a client for `base_url` with a default `reqwest::Client`.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not an absolute http(s) URL.
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Create a client for `base_url` reusing an existing `reqwest::Client`.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not an absolute http(s) URL.
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Result<Self> {
        let parsed = Url::parse(base_url).map_err(|e| HttpToolsError::InvalidBaseUrl {
            url: base_url.to_string(),
            message: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(HttpToolsError::InvalidBaseUrl {
                url: base_url.to_string(),
                message: "scheme must be http or https".to_string(),
            });
        }
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl ApiClient for RemoteClient {
    async fn send(&self, request: ApiRequest, timeout: Duration) -> Result<ApiResponse> {
        let url = format!("{}{}", self.base_url, request.path);
        let url = Url::parse(&url).map_err(|e| HttpToolsError::InvalidRequest(e.to_string()))?;

        let mut builder = self
            .client
            .request(request.method.to_method(), url)
            .query(&request.query)
            .timeout(timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(payload) = &request.body {
            builder = builder.json(payload);
        }

        let response = builder.send().await.map_err(|e| map_reqwest_error(&e, timeout))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| map_reqwest_error(&e, timeout))?;
        Ok(ApiResponse { status, body })
    }
}

fn map_reqwest_error(e: &reqwest::Error, timeout: Duration) -> HttpToolsError {
    if e.is_timeout() {
        tracing::debug!(
            url = ?e.url().map(|u| u.as_str()),
            timeout_ms = timeout.as_millis(),
            "API call timed out"
        );
        HttpToolsError::Timeout(timeout)
    } else {
        tracing::debug!(url = ?e.url().map(|u| u.as_str()), error = %e, "API call failed");
        HttpToolsError::Request(e.to_string())
    }
}
