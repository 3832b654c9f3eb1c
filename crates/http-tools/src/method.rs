//! The closed set of HTTP methods a tool can be backed by.

use crate::error::{HttpToolsError, Result};
use axum::http::Method;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// HTTP method of an API operation.
///
/// Anything outside this set is rejected when an operation is converted, so the execution path
/// never has to deal with an unknown method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl HttpMethod {
    /// All supported methods, in the order operations are visited within a path item.
    pub const ALL: [HttpMethod; 5] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Delete,
        HttpMethod::Patch,
    ];

    /// Parse a method name (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`HttpToolsError::UnsupportedMethod`] for anything but GET/POST/PUT/DELETE/PATCH.
    pub fn parse(method: &str) -> Result<Self> {
        match method.to_ascii_lowercase().as_str() {
            "get" => Ok(HttpMethod::Get),
            "post" => Ok(HttpMethod::Post),
            "put" => Ok(HttpMethod::Put),
            "delete" => Ok(HttpMethod::Delete),
            "patch" => Ok(HttpMethod::Patch),
            _ => Err(HttpToolsError::UnsupportedMethod(method.to_string())),
        }
    }

    /// Lowercase name, as used for `OpenAPI` path item keys.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Post => "post",
            HttpMethod::Put => "put",
            HttpMethod::Delete => "delete",
            HttpMethod::Patch => "patch",
        }
    }

    #[must_use]
    pub fn to_method(self) -> Method {
        match self {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Delete => Method::DELETE,
            HttpMethod::Patch => Method::PATCH,
        }
    }

    /// Whether leftover tool arguments travel as a JSON body for this method.
    #[must_use]
    pub fn sends_body(self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_method().as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = HttpToolsError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
