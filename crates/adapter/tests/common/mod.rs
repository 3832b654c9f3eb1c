#![allow(dead_code)]

use anyhow::Context as _;
use api_mcp_adapter::{ApiMcpBridge, BridgeConfig};
use api_mcp_openapi_tools::OpenApiDocument;
use std::net::SocketAddr;
use std::process::{Child, Command};
use std::time::Duration;

pub fn pick_unused_port() -> anyhow::Result<u16> {
    api_mcp_test_support::pick_unused_port()
}

pub async fn wait_http_ok(url: &str, timeout_dur: Duration) -> anyhow::Result<()> {
    api_mcp_test_support::wait_http_ok(url, timeout_dur).await
}

/// Run the adapter binary against `target_url`.
pub fn spawn_adapter(target_url: &str, port: u16, extra_args: &[&str]) -> anyhow::Result<Child> {
    let bin = env!("CARGO_BIN_EXE_api-mcp-adapter");
    Command::new(bin)
        .arg("--target-url")
        .arg(target_url)
        .arg("--bind")
        .arg(format!("127.0.0.1:{port}"))
        .arg("--log-level")
        .arg("info")
        .args(extra_args)
        .spawn()
        .context("spawn adapter")
}

/// Bridge over the in-process items API with all transports mounted under `/mcp`.
pub fn items_bridge(config: BridgeConfig) -> anyhow::Result<ApiMcpBridge> {
    let document = OpenApiDocument::from_value(api_mcp_test_support::items_openapi_document())?;
    Ok(ApiMcpBridge::for_router(
        document,
        api_mcp_test_support::items_api_router(),
        config,
    )?)
}

/// Serve `router` on an ephemeral localhost port.
pub async fn serve(router: axum::Router) -> anyhow::Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .context("bind test server")?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    Ok(addr)
}
