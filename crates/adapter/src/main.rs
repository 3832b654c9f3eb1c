use anyhow::Context as _;
use api_mcp_adapter::{ApiMcpBridge, BridgeConfig, DEFAULT_MOUNT_PATH, TransportKind};
use api_mcp_http_tools::RemoteClient;
use api_mcp_openapi_tools::load_document;
use axum::routing::get;
use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

/// Serve an HTTP API's `OpenAPI` operations as MCP tools.
#[derive(Debug, Parser)]
#[command(name = "api-mcp-adapter", version, about)]
struct Args {
    /// Base URL of the API tool calls are sent to.
    #[arg(long, env = "API_MCP_TARGET_URL")]
    target_url: String,

    /// `OpenAPI` document (file path or URL). Defaults to `{target-url}/openapi.json`.
    #[arg(long, env = "API_MCP_OPENAPI")]
    openapi: Option<String>,

    /// Bridge configuration file (YAML or JSON).
    #[arg(long, env = "API_MCP_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long, env = "API_MCP_BIND", default_value = "127.0.0.1:8000")]
    bind: SocketAddr,

    #[arg(long, env = "API_MCP_MOUNT_PATH", default_value = DEFAULT_MOUNT_PATH)]
    mount_path: String,

    #[arg(long, env = "API_MCP_TRANSPORT", value_enum, default_value_t = TransportKind::All)]
    transport: TransportKind,

    /// Streamable HTTP without sessions.
    #[arg(long, env = "API_MCP_STATELESS")]
    stateless: bool,

    #[arg(long, env = "API_MCP_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[arg(long, env = "API_MCP_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

fn init_tracing(log_level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level, args.log_format);

    let config = match &args.config {
        Some(path) => BridgeConfig::from_file(path)
            .with_context(|| format!("load config {}", path.display()))?,
        None => BridgeConfig::default(),
    };

    let client = Arc::new(RemoteClient::new(&args.target_url).context("target url")?);
    let bridge = match &args.openapi {
        Some(location) => {
            let document = load_document(location)
                .await
                .with_context(|| format!("load OpenAPI document {location}"))?;
            ApiMcpBridge::new(document, client, config)?
        }
        None => ApiMcpBridge::discover(client, "/openapi.json", config)
            .await
            .context("fetch OpenAPI document from target")?,
    };
    let bridge = Arc::new(bridge);

    let app = bridge
        .router_for(&args.mount_path, args.transport, args.stateless)?
        .route("/health", get(|| async { "ok" }));

    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("bind {}", args.bind))?;
    tracing::info!(
        addr = %listener.local_addr()?,
        server = %bridge.name(),
        tools = bridge.tools().len(),
        "Listening"
    );

    let shutdown_bridge = Arc::clone(&bridge);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            tracing::info!("Shutting down");
            shutdown_bridge.shutdown().await;
        })
        .await
        .context("serve")?;

    Ok(())
}
