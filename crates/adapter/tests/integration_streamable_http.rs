mod common;
mod common_mcp;

use anyhow::Context as _;
use api_mcp_adapter::{BridgeConfig, TransportKind};
use api_mcp_test_support::KillOnDrop;
use common::{items_bridge, pick_unused_port, serve, spawn_adapter, wait_http_ok};
use common_mcp::{
    McpStreamableHttpSession, post_mcp, read_first_event_stream_json_message, request,
    tool_call_is_error, tool_call_text, tool_names,
};
use serde_json::{Value, json};
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(10);

async fn start_adapter(extra_args: &[&str]) -> anyhow::Result<(String, KillOnDrop)> {
    let api = api_mcp_test_support::spawn_items_api().await?;
    let port = pick_unused_port()?;
    let child = KillOnDrop(spawn_adapter(&format!("http://{api}"), port, extra_args)?);

    let base_url = format!("http://127.0.0.1:{port}");
    wait_http_ok(&format!("{base_url}/health"), Duration::from_secs(30)).await?;
    Ok((base_url, child))
}

#[tokio::test]
async fn binary_discovers_document_and_serves_tools() -> anyhow::Result<()> {
    let (base_url, _adapter) = start_adapter(&[]).await?;
    let session = McpStreamableHttpSession::connect(&format!("{base_url}/mcp")).await?;

    let listed = session
        .request(1, "tools/list", json!({}), WAIT)
        .await?;
    let names = tool_names(&listed)?;
    assert_eq!(
        names,
        vec![
            "list_items",
            "create_item",
            "get_item",
            "update_item",
            "delete_item",
            "echo_headers",
            "get_greeting",
            "raise_error"
        ]
    );

    let created = session
        .request(
            2,
            "tools/call",
            json!({"name": "create_item", "arguments": {"name": "foo", "price": 1.5}}),
            WAIT,
        )
        .await?;
    let item: Value = serde_json::from_str(&tool_call_text(&created)?)?;
    assert_eq!(item["id"], 4);
    assert_eq!(item["name"], "foo");

    let greeting = session
        .request(
            3,
            "tools/call",
            json!({"name": "get_greeting", "arguments": {"name": "Ana"}}),
            WAIT,
        )
        .await?;
    let text = tool_call_text(&greeting)?;
    assert!(text.contains("¡Hola, Ana! 你好 👋"), "{text}");

    let missing = session
        .request(
            4,
            "tools/call",
            json!({"name": "get_item", "arguments": {"item_id": 42}}),
            WAIT,
        )
        .await?;
    assert!(tool_call_is_error(&missing));
    assert!(tool_call_text(&missing)?.contains("Status code: 404"));
    Ok(())
}

#[tokio::test]
async fn binary_forwards_authorization_to_remote_api() -> anyhow::Result<()> {
    let (base_url, _adapter) = start_adapter(&["--transport", "http"]).await?;
    let session = McpStreamableHttpSession::connect(&format!("{base_url}/mcp")).await?;

    let called = session
        .request_with_headers(
            1,
            "tools/call",
            json!({"name": "echo_headers"}),
            &[("Authorization", "Bearer X"), ("X-Custom", "Y")],
            WAIT,
        )
        .await?;
    let headers: Value = serde_json::from_str(&tool_call_text(&called)?)?;
    assert_eq!(headers["authorization"], "Bearer X");
    assert!(headers.get("x-custom").is_none());
    Ok(())
}

#[tokio::test]
async fn binary_applies_config_file_filters() -> anyhow::Result<()> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let cfg_path = dir.path().join("bridge.yaml");
    std::fs::write(&cfg_path, "includeTags: [debug]\n")
        .context("write config")?;
    let cfg_arg = cfg_path.to_string_lossy().to_string();

    let (base_url, _adapter) = start_adapter(&["--config", &cfg_arg]).await?;
    let session = McpStreamableHttpSession::connect(&format!("{base_url}/mcp")).await?;

    let listed = session
        .request(1, "tools/list", json!({}), WAIT)
        .await?;
    assert_eq!(
        tool_names(&listed)?,
        vec!["echo_headers", "get_greeting", "raise_error"]
    );
    Ok(())
}

#[tokio::test]
async fn stateful_session_can_be_deleted() -> anyhow::Result<()> {
    let bridge = items_bridge(BridgeConfig::default())?;
    let addr = serve(bridge.router_for("/mcp", TransportKind::Http, false)?).await?;
    let session = McpStreamableHttpSession::connect(&format!("http://{addr}/mcp")).await?;
    assert!(!session.session_id().is_empty());

    let listed = session
        .request(1, "tools/list", json!({}), WAIT)
        .await?;
    assert!(!tool_names(&listed)?.is_empty());

    let status = session.delete().await?;
    assert!(status.is_success(), "DELETE returned {status}");
    Ok(())
}

#[tokio::test]
async fn stateless_mode_issues_no_session() -> anyhow::Result<()> {
    let bridge = items_bridge(BridgeConfig::default())?;
    let addr = serve(bridge.router_for("/mcp", TransportKind::Http, true)?).await?;
    let client = reqwest::Client::new();
    let url = format!("http://{addr}/mcp");

    let resp = post_mcp(
        &client,
        &url,
        None,
        &[],
        request(1, "tools/call", json!({"name": "get_item", "arguments": {"item_id": 2}})),
    )
    .await?;
    assert!(resp.headers().get("Mcp-Session-Id").is_none());

    let called = tokio::time::timeout(WAIT, read_first_event_stream_json_message(resp))
        .await
        .context("timeout waiting for response")??;
    let item: Value = serde_json::from_str(&tool_call_text(&called)?)?;
    assert_eq!(item["name"], "Screwdriver");
    Ok(())
}
