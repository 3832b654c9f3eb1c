//! Snapshot of the inbound MCP transport request.
//!
//! Transports capture one [`HttpRequestInfo`] per incoming JSON-RPC message and thread it down to
//! tool execution, so selected caller headers (bearer tokens) can reach the source API.

use axum::http::request::Parts;
use axum::http::{HeaderMap, Uri, header};
use serde::Serialize;
use std::collections::BTreeMap;

/// Method marker used for messages that arrived over a WebSocket rather than a real HTTP call.
pub const WEBSOCKET_METHOD: &str = "WEBSOCKET";

/// Immutable view of the request that carried an MCP message.
///
/// Header names are stored lowercased; lookups are case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HttpRequestInfo {
    pub method: String,
    pub path: String,
    pub headers: BTreeMap<String, String>,
    pub cookies: BTreeMap<String, String>,
    pub query_params: BTreeMap<String, String>,
    pub body: Option<String>,
}

impl HttpRequestInfo {
    /// Capture a plain HTTP request (SSE message POSTs, streamable HTTP requests).
    #[must_use]
    pub fn from_parts(parts: &Parts, body: Option<&[u8]>) -> Self {
        Self {
            method: parts.method.as_str().to_string(),
            path: parts.uri.path().to_string(),
            headers: collect_headers(&parts.headers),
            cookies: parse_cookies(&parts.headers),
            query_params: parse_query(&parts.uri),
            body: body.map(|b| String::from_utf8_lossy(b).into_owned()),
        }
    }

    /// Capture the upgrade request of a WebSocket connection.
    ///
    /// A socket has no per-message cookies or body, so those stay empty and the method is the
    /// synthetic [`WEBSOCKET_METHOD`] marker.
    #[must_use]
    pub fn for_websocket(uri: &Uri, headers: &HeaderMap) -> Self {
        Self {
            method: WEBSOCKET_METHOD.to_string(),
            path: uri.path().to_string(),
            headers: collect_headers(headers),
            cookies: BTreeMap::new(),
            query_params: parse_query(uri),
            body: None,
        }
    }

    /// Case-insensitive header lookup.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Headers whose (lowercased) name appears in `allowlist`.
    pub fn forwarded_headers<'a>(
        &'a self,
        allowlist: &'a [String],
    ) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.headers
            .iter()
            .filter(|(name, _)| allowlist.iter().any(|a| a.eq_ignore_ascii_case(name)))
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

fn collect_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut out: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let Ok(value) = value.to_str() else {
            continue;
        };
        out.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }
    out
}

fn parse_cookies(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            Some((name.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

fn parse_query(uri: &Uri) -> BTreeMap<String, String> {
    uri.query()
        .map(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect()
        })
        .unwrap_or_default()
}
