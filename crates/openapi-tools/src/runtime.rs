//! Tool execution: one tool call becomes exactly one HTTP call against the source API.

use crate::config::ExecutionOptions;
use crate::convert::{OperationEntry, OperationMap, ParamLocation};
use crate::error::{OpenApiToolsError, Result};
use api_mcp_http_tools::{ApiClient, ApiRequest, ApiResponse, HttpRequestInfo};
use regex::{Captures, Regex};
use rmcp::model::{Content, JsonObject};
use serde_json::Value;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

static PATH_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([^{}]+)\}").expect("valid path placeholder regex"));

/// Executes tool calls through an [`ApiClient`].
#[derive(Clone)]
pub struct ToolExecutor {
    client: Arc<dyn ApiClient>,
    headers_to_forward: Vec<String>,
    timeout: Duration,
}

impl ToolExecutor {
    #[must_use]
    pub fn new(client: Arc<dyn ApiClient>, options: &ExecutionOptions) -> Self {
        Self {
            client,
            headers_to_forward: options
                .headers_to_forward
                .iter()
                .map(|h| h.to_ascii_lowercase())
                .collect(),
            timeout: Duration::from_secs(options.timeout_secs),
        }
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    #[must_use]
    pub fn client(&self) -> &Arc<dyn ApiClient> {
        &self.client
    }

    /// Run `tool_name` with `arguments` and render the API response as MCP content.
    ///
    /// JSON responses are pretty-printed (2-space indent, non-ASCII kept verbatim); anything else
    /// is returned as text.
    ///
    /// # Errors
    ///
    /// - [`OpenApiToolsError::UnknownTool`] if `tool_name` is not in `operation_map`
    /// - [`OpenApiToolsError::MissingPathParameter`] if a path placeholder has no argument
    /// - [`OpenApiToolsError::ToolExecution`] if the API answers 4xx/5xx
    /// - [`OpenApiToolsError::Http`] on transport failures and timeouts
    pub async fn execute(
        &self,
        tool_name: &str,
        arguments: Option<&JsonObject>,
        operation_map: &OperationMap,
        http_info: Option<&HttpRequestInfo>,
    ) -> Result<Vec<Content>> {
        let entry = operation_map
            .get(tool_name)
            .ok_or_else(|| OpenApiToolsError::UnknownTool(tool_name.to_string()))?;

        let request = self
            .build_request(tool_name, arguments, entry, http_info)
            .inspect_err(|e| tracing::error!(tool = %tool_name, error = %e, "Invalid tool call"))?;

        tracing::debug!(
            tool = %tool_name,
            method = %entry.method,
            path = %request.path,
            "Calling API"
        );

        let response = self
            .client
            .send(request, self.timeout)
            .await
            .inspect_err(|e| tracing::error!(tool = %tool_name, error = %e, "Error calling tool"))?;

        let text = render_response(&response);
        if response.is_error() {
            let err = OpenApiToolsError::ToolExecution {
                tool: tool_name.to_string(),
                status: response.status,
                body: response.text(),
            };
            tracing::error!(tool = %tool_name, status = response.status, "Error calling tool");
            return Err(err);
        }

        Ok(vec![Content::text(text)])
    }

    /// Map tool arguments onto the operation's path, query, headers, cookies and body.
    ///
    /// `arguments` is never mutated. Forwarded inbound headers are added for names on the
    /// allowlist unless the call already sets that header.
    ///
    /// # Errors
    ///
    /// Returns [`OpenApiToolsError::MissingPathParameter`] if a `{placeholder}` in the path has no
    /// (non-null) argument. Substituted values are percent-encoded as single path segments.
    pub fn build_request(
        &self,
        tool_name: &str,
        arguments: Option<&JsonObject>,
        entry: &OperationEntry,
        http_info: Option<&HttpRequestInfo>,
    ) -> Result<ApiRequest> {
        let mut args = arguments.cloned().unwrap_or_default();

        let mut missing: Option<String> = None;
        let path = PATH_PLACEHOLDER.replace_all(&entry.path, |caps: &Captures<'_>| {
            let name = &caps[1];
            match args.remove(name) {
                Some(value) if !value.is_null() => {
                    urlencoding::encode(&value_to_string(&value)).into_owned()
                }
                _ => {
                    missing.get_or_insert_with(|| name.to_string());
                    String::new()
                }
            }
        });
        if let Some(parameter) = missing {
            return Err(OpenApiToolsError::MissingPathParameter {
                tool: tool_name.to_string(),
                parameter,
            });
        }

        let mut request = ApiRequest::new(entry.method, path.into_owned());
        let mut cookies: Vec<String> = Vec::new();

        for param in &entry.parameters {
            if param.location == ParamLocation::Path {
                continue;
            }
            let Some(value) = args.remove(&param.name) else {
                continue;
            };
            match param.location {
                ParamLocation::Query => push_query(&mut request.query, &param.name, &value),
                ParamLocation::Header if !value.is_null() => request
                    .headers
                    .push((param.name.clone(), value_to_string(&value))),
                ParamLocation::Cookie if !value.is_null() => {
                    cookies.push(format!("{}={}", param.name, value_to_string(&value)));
                }
                _ => {}
            }
        }
        if !cookies.is_empty() {
            request
                .headers
                .push(("cookie".to_string(), cookies.join("; ")));
        }

        if let Some(info) = http_info {
            for (name, value) in info.forwarded_headers(&self.headers_to_forward) {
                let already_set = request
                    .headers
                    .iter()
                    .any(|(n, _)| n.eq_ignore_ascii_case(name));
                if !already_set {
                    request.headers.push((name.to_string(), value.to_string()));
                }
            }
        }

        if entry.method.sends_body() {
            if entry.raw_body {
                request.body = args.remove("body").filter(|b| !b.is_null());
            } else if !args.is_empty() {
                request.body = Some(Value::Object(args));
            }
        } else if !args.is_empty() {
            tracing::debug!(
                tool = %tool_name,
                ignored = ?args.keys().collect::<Vec<_>>(),
                "Ignoring arguments that map to no parameter"
            );
        }

        Ok(request)
    }
}

fn render_response(response: &ApiResponse) -> String {
    match response.json() {
        Some(value) => serde_json::to_string_pretty(&value).unwrap_or_else(|_| response.text()),
        None => response.text(),
    }
}

/// Arrays become repeated pairs; nulls are omitted.
fn push_query(query: &mut Vec<(String, String)>, name: &str, value: &Value) {
    match value {
        Value::Null => {}
        Value::Array(items) => {
            for item in items.iter().filter(|v| !v.is_null()) {
                query.push((name.to_string(), value_to_string(item)));
            }
        }
        other => query.push((name.to_string(), value_to_string(other))),
    }
}

/// Convert a JSON value to a string for path/query/header parameters.
fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => value.to_string(),
    }
}
