#![allow(dead_code)]

use anyhow::Context as _;
use futures::StreamExt as _;
use futures::stream::BoxStream;
use serde_json::{Value, json};
use std::time::Duration;
use tokio::io::AsyncBufReadExt as _;
use tokio_util::io::StreamReader;

pub fn initialize_request(id: u64) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "initialize",
        "params": {
            "protocolVersion": "2024-11-05",
            "capabilities": {},
            "clientInfo": { "name": "api-mcp-adapter-integration-tests", "version": "0" }
        }
    })
}

pub fn initialized_notification() -> Value {
    json!({"jsonrpc": "2.0", "method": "notifications/initialized"})
}

pub fn request(id: u64, method: &str, params: Value) -> Value {
    json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params})
}

/// Minimal MCP client for the streamable HTTP endpoint.
///
/// Exists only for integration tests; it speaks just enough of the protocol to list and call
/// tools.
pub struct McpStreamableHttpSession {
    client: reqwest::Client,
    url: String,
    session_id: String,
}

impl McpStreamableHttpSession {
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::new();
        let url = url.trim_end_matches('/').to_string();

        // initialize → creates session id header and returns first response over event-stream
        let init_resp = post_mcp(&client, &url, None, &[], initialize_request(0)).await?;

        let session_id = init_resp
            .headers()
            .get("Mcp-Session-Id")
            .and_then(|h| h.to_str().ok())
            .context("missing Mcp-Session-Id header")?
            .to_string();

        let init_msg = read_first_event_stream_json_message(init_resp).await?;
        anyhow::ensure!(init_msg.get("id") == Some(&json!(0)), "unexpected init id");

        let initialized_resp =
            post_mcp(&client, &url, Some(&session_id), &[], initialized_notification()).await?;

        anyhow::ensure!(
            initialized_resp.status().as_u16() == 202,
            "POST notifications/initialized returned {}",
            initialized_resp.status()
        );

        Ok(Self {
            client,
            url,
            session_id,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub async fn request(
        &self,
        id: u64,
        method: &str,
        params: Value,
        timeout_dur: Duration,
    ) -> anyhow::Result<Value> {
        self.request_with_headers(id, method, params, &[], timeout_dur)
            .await
    }

    pub async fn request_with_headers(
        &self,
        id: u64,
        method: &str,
        params: Value,
        headers: &[(&str, &str)],
        timeout_dur: Duration,
    ) -> anyhow::Result<Value> {
        let resp = post_mcp(
            &self.client,
            &self.url,
            Some(&self.session_id),
            headers,
            request(id, method, params),
        )
        .await?;

        let msg = tokio::time::timeout(timeout_dur, read_first_event_stream_json_message(resp))
            .await
            .context("timeout waiting for event-stream response")??;

        Ok(msg)
    }

    pub async fn delete(&self) -> anyhow::Result<reqwest::StatusCode> {
        let resp = self
            .client
            .delete(&self.url)
            .header("Mcp-Session-Id", &self.session_id)
            .send()
            .await
            .context("DELETE session")?;
        Ok(resp.status())
    }
}

/// Minimal client for the legacy SSE transport.
pub struct McpSseSession {
    client: reqwest::Client,
    base_url: String,
    messages_url: String,
    events: BoxStream<'static, Result<sse_stream::Sse, sse_stream::Error>>,
}

impl McpSseSession {
    /// Open `GET {base_url}{path}` and wait for the `endpoint` event.
    pub async fn open(base_url: &str, path: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::new();
        let resp = client
            .get(format!("{base_url}{path}"))
            .header("Accept", "text/event-stream")
            .send()
            .await
            .context("GET sse")?
            .error_for_status()
            .context("GET sse status")?;

        let mut session = Self {
            client,
            base_url: base_url.to_string(),
            messages_url: String::new(),
            events: sse_stream::SseStream::from_byte_stream(resp.bytes_stream()).boxed(),
        };

        let endpoint = session.next_event(Duration::from_secs(5)).await?;
        anyhow::ensure!(
            endpoint.event.as_deref() == Some("endpoint"),
            "first event was {:?}",
            endpoint.event
        );
        let data = endpoint.data.context("endpoint event without data")?;
        session.messages_url = format!("{base_url}{data}");
        Ok(session)
    }

    pub fn messages_url(&self) -> &str {
        &self.messages_url
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Next event carrying data (keep-alive comments are skipped).
    pub async fn next_event(&mut self, timeout_dur: Duration) -> anyhow::Result<sse_stream::Sse> {
        tokio::time::timeout(timeout_dur, async {
            while let Some(event) = self.events.next().await {
                let event = event.context("read sse event")?;
                if event.data.as_deref().is_some_and(|d| !d.is_empty()) {
                    return Ok(event);
                }
            }
            anyhow::bail!("event stream ended")
        })
        .await
        .context("timeout waiting for sse event")?
    }

    /// Next `message` event parsed as JSON.
    pub async fn next_message(&mut self, timeout_dur: Duration) -> anyhow::Result<Value> {
        let event = self.next_event(timeout_dur).await?;
        anyhow::ensure!(
            event.event.as_deref() == Some("message"),
            "expected message event, got {:?}",
            event.event
        );
        let data = event.data.context("message event without data")?;
        serde_json::from_str(&data).context("parse message data")
    }

    pub async fn post(
        &self,
        body: String,
        headers: &[(&str, &str)],
    ) -> anyhow::Result<reqwest::Response> {
        let mut req = self
            .client
            .post(&self.messages_url)
            .header("Content-Type", "application/json")
            .body(body);
        for (name, value) in headers {
            req = req.header(*name, *value);
        }
        req.send().await.context("POST message")
    }

    /// POST one message and expect 202.
    pub async fn send(&self, message: Value) -> anyhow::Result<()> {
        let resp = self.post(message.to_string(), &[]).await?;
        anyhow::ensure!(resp.status().as_u16() == 202, "POST returned {}", resp.status());
        Ok(())
    }

    pub async fn initialize(&mut self) -> anyhow::Result<Value> {
        self.send(initialize_request(0)).await?;
        let init = self.next_message(Duration::from_secs(5)).await?;
        anyhow::ensure!(init.get("id") == Some(&json!(0)), "unexpected init id");
        self.send(initialized_notification()).await?;
        Ok(init)
    }
}

/// Text of the first content block of a `tools/call` response.
pub fn tool_call_text(msg: &Value) -> anyhow::Result<String> {
    let result = msg.get("result").context("tools/call missing result")?;
    result
        .get("content")
        .and_then(Value::as_array)
        .and_then(|c| c.first())
        .and_then(|c| c.get("text"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .context("tools/call missing result.content[0].text")
}

/// Whether a `tools/call` response is flagged as a tool error.
pub fn tool_call_is_error(msg: &Value) -> bool {
    msg.get("result")
        .and_then(|r| r.get("isError"))
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

pub fn tool_names(msg: &Value) -> anyhow::Result<Vec<String>> {
    let tools = msg
        .get("result")
        .and_then(|r| r.get("tools"))
        .and_then(Value::as_array)
        .context("tools/list missing result.tools")?;
    Ok(tools
        .iter()
        .filter_map(|t| t.get("name").and_then(Value::as_str))
        .map(str::to_string)
        .collect())
}

pub async fn post_mcp(
    client: &reqwest::Client,
    url: &str,
    session_id: Option<&str>,
    headers: &[(&str, &str)],
    body: Value,
) -> anyhow::Result<reqwest::Response> {
    let mut req = client
        .post(url)
        .header("Accept", "application/json, text/event-stream")
        .header("Content-Type", "application/json")
        .json(&body);

    if let Some(session_id) = session_id {
        req = req.header("Mcp-Session-Id", session_id);
    }
    for (name, value) in headers {
        req = req.header(*name, *value);
    }

    req.send()
        .await
        .context("POST mcp")?
        .error_for_status()
        .context("POST mcp status")
}

pub async fn read_first_event_stream_json_message(resp: reqwest::Response) -> anyhow::Result<Value> {
    let mut stream = resp.bytes_stream();
    let byte_stream = futures::stream::poll_fn(move |cx| stream.poll_next_unpin(cx))
        .map(|r| r.map_err(std::io::Error::other));
    let reader = StreamReader::new(byte_stream);
    let mut lines = tokio::io::BufReader::new(reader).lines();

    let mut data_lines: Vec<String> = Vec::new();
    while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim_end().to_string();

        if line.is_empty() {
            let data = data_lines.join("\n");
            data_lines.clear();
            // Priming events carry an id but no payload.
            if data.trim().is_empty() {
                continue;
            }
            return serde_json::from_str(&data).context("parse event-stream data as JSON");
        }

        if let Some(v) = line.strip_prefix("data:") {
            data_lines.push(v.trim().to_string());
        }
    }

    anyhow::bail!("event-stream ended without a JSON message")
}
