//! The bridge facade: document + configuration in, mounted MCP routes out.

use crate::config::BridgeConfig;
use crate::error::Result;
use crate::handler::{ToolCatalog, ToolServer};
use crate::transport::sse::SseTransport;
use crate::transport::streamable_http::HttpTransport;
use crate::transport::{join_path, normalize_mount_path, websocket};
use api_mcp_http_tools::{ApiClient, HttpMethod, RouterClient};
use api_mcp_openapi_tools::{
    ConvertedTools, OpenApiDocument, ToolExecutor, convert, fetch_from_target, filter_tools,
};
use axum::Router;
use parking_lot::{Mutex, RwLock};
use rmcp::model::Tool;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Server name used when neither the configuration nor the document provides one.
pub const DEFAULT_SERVER_NAME: &str = "API MCP";

/// Default mount path for the streamable HTTP transport.
pub const DEFAULT_MOUNT_PATH: &str = "/mcp";

const TOOL_COUNT_WARNING_THRESHOLD: usize = 10;

const DISABLE_HINT: &str = "To disable this warning, set disable_warnings.";

/// Which transports [`ApiMcpBridge::router_for`] mounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum TransportKind {
    /// Legacy SSE (`GET {mount}`, `POST {mount}/messages/`).
    Sse,
    /// Streamable HTTP on `{mount}`.
    Http,
    /// WebSocket upgrades on `{mount}`.
    Websocket,
    /// Streamable HTTP on `{mount}`, SSE on `{mount}/sse`, WebSocket on `{mount}/ws`.
    All,
}

/// Exposes an HTTP API's operations as MCP tools.
///
/// Owns the `OpenAPI` document, the configuration, the [`ToolServer`] shared by every mounted
/// transport, and a cancellation token that ends all SSE and WebSocket sessions on
/// [`shutdown`](Self::shutdown).
pub struct ApiMcpBridge {
    config: BridgeConfig,
    document: RwLock<Arc<OpenApiDocument>>,
    server: ToolServer,
    http_transports: Mutex<Vec<Arc<HttpTransport>>>,
    ct: CancellationToken,
}

impl ApiMcpBridge {
    /// Build the bridge and set up the tool catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is contradictory or the document cannot be
    /// converted.
    pub fn new(
        document: OpenApiDocument,
        client: Arc<dyn ApiClient>,
        config: BridgeConfig,
    ) -> Result<Self> {
        config.validate()?;

        let name = config
            .name
            .clone()
            .or_else(|| document.title().map(str::to_string))
            .unwrap_or_else(|| DEFAULT_SERVER_NAME.to_string());
        let instructions = config
            .description
            .clone()
            .or_else(|| document.description().map(str::to_string));
        let executor = ToolExecutor::new(client, &config.execution);

        let bridge = Self {
            server: ToolServer::new(name, instructions, executor),
            config,
            document: RwLock::new(Arc::new(document)),
            http_transports: Mutex::new(Vec::new()),
            ct: CancellationToken::new(),
        };
        bridge.setup_server()?;
        Ok(bridge)
    }

    /// Bridge an in-process `axum` application.
    ///
    /// # Errors
    ///
    /// See [`ApiMcpBridge::new`].
    pub fn for_router(
        document: OpenApiDocument,
        app: Router,
        config: BridgeConfig,
    ) -> Result<Self> {
        Self::new(document, Arc::new(RouterClient::new(app)), config)
    }

    /// Fetch the document the API serves about itself (e.g. `/openapi.json`) and bridge it.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be fetched or converted.
    pub async fn discover(
        client: Arc<dyn ApiClient>,
        openapi_path: &str,
        config: BridgeConfig,
    ) -> Result<Self> {
        let timeout = Duration::from_secs(config.execution.timeout_secs);
        let document = fetch_from_target(client.as_ref(), openapi_path, timeout).await?;
        Self::new(document, client, config)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.server.name()
    }

    #[must_use]
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// The MCP handler; clone it to serve over a custom transport.
    #[must_use]
    pub fn server(&self) -> ToolServer {
        self.server.clone()
    }

    #[must_use]
    pub fn tools(&self) -> Vec<Tool> {
        self.server.tools()
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<ToolCatalog> {
        self.server.catalog()
    }

    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.ct.clone()
    }

    /// Rebuild tools and the operation map from the current document.
    ///
    /// Live sessions see the new catalog on their next request.
    ///
    /// # Errors
    ///
    /// Returns an error if conversion or filtering fails; the previous catalog stays in place.
    pub fn setup_server(&self) -> Result<()> {
        let document = self.document.read().clone();
        let converted = convert(&document, &self.config.convert)?;
        let filtered = filter_tools(
            converted,
            &document,
            &self.config.filter,
            self.server.name(),
        )?;

        if !self.config.disable_warnings {
            for warning in setup_warnings(&filtered) {
                tracing::warn!("{warning}");
            }
        }

        tracing::info!(
            server = %self.server.name(),
            tools = filtered.tools.len(),
            "MCP server set up"
        );
        self.server.set_catalog(filtered.into());
        Ok(())
    }

    /// Replace the document and rebuild the catalog.
    ///
    /// # Errors
    ///
    /// See [`ApiMcpBridge::setup_server`]. On error the new document is kept but the old catalog
    /// remains served.
    pub fn set_document(&self, document: OpenApiDocument) -> Result<()> {
        *self.document.write() = Arc::new(document);
        self.setup_server()
    }

    /// Mount the SSE transport: `GET {path}` and `POST {path}/messages/`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an invalid mount path.
    pub fn mount_sse(&self, router: Router, path: &str) -> Result<Router> {
        let path = normalize_mount_path(path)?;
        let transport = SseTransport::new(self.server.clone(), &path, self.ct.child_token());
        tracing::info!(
            path = %path,
            messages = %transport.messages_path(),
            "Mounted MCP SSE transport"
        );
        Ok(router.merge(transport.router()))
    }

    /// Mount the streamable HTTP transport on `path`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an invalid mount path.
    pub fn mount_http(&self, router: Router, path: &str, stateless: bool) -> Result<Router> {
        let path = normalize_mount_path(path)?;
        let transport = HttpTransport::new(self.server.clone(), stateless);
        self.http_transports.lock().push(Arc::clone(&transport));
        tracing::info!(path = %path, stateless, "Mounted MCP streamable HTTP transport");
        Ok(router.merge(transport.router(&path)))
    }

    /// Mount the WebSocket transport on `path`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an invalid mount path.
    pub fn mount_ws(&self, router: Router, path: &str) -> Result<Router> {
        let path = normalize_mount_path(path)?;
        tracing::info!(path = %path, "Mounted MCP WebSocket transport");
        Ok(router.merge(websocket::router(
            self.server.clone(),
            &path,
            self.ct.child_token(),
        )))
    }

    /// Router with the selected transports under `mount_path`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an invalid mount path.
    pub fn router_for(
        &self,
        mount_path: &str,
        transport: TransportKind,
        stateless: bool,
    ) -> Result<Router> {
        let base = normalize_mount_path(mount_path)?;
        let router = Router::new();
        match transport {
            TransportKind::Sse => self.mount_sse(router, &base),
            TransportKind::Http => self.mount_http(router, &base, stateless),
            TransportKind::Websocket => self.mount_ws(router, &base),
            TransportKind::All => {
                let router = self.mount_http(router, &base, stateless)?;
                let router = self.mount_sse(router, &join_path(&base, "/sse"))?;
                self.mount_ws(router, &join_path(&base, "/ws"))
            }
        }
    }

    /// All transports under [`DEFAULT_MOUNT_PATH`], stateful HTTP.
    ///
    /// # Errors
    ///
    /// Never fails for the default path; kept fallible for symmetry with the mount methods.
    pub fn router(&self) -> Result<Router> {
        self.router_for(DEFAULT_MOUNT_PATH, TransportKind::All, false)
    }

    /// End every SSE/WebSocket session and close every streamable HTTP session.
    pub async fn shutdown(&self) {
        self.ct.cancel();
        let transports: Vec<Arc<HttpTransport>> = self.http_transports.lock().clone();
        for transport in transports {
            transport.shutdown().await;
        }
    }
}

/// Setup diagnostics for the exposed catalog.
#[must_use]
pub fn setup_warnings(tools: &ConvertedTools) -> Vec<String> {
    let mut warnings = Vec::new();

    if tools.tools.len() > TOOL_COUNT_WARNING_THRESHOLD {
        warnings.push(format!(
            "More than {TOOL_COUNT_WARNING_THRESHOLD} tools exposed ({}), which may impact user \
             experience. Consider filtering tools with include_operations, exclude_operations, \
             include_tags or exclude_tags. {DISABLE_HINT}",
            tools.tools.len()
        ));
    }

    let non_get: Vec<String> = tools
        .tool_names()
        .filter_map(|name| {
            let entry = tools.entry(name)?;
            (entry.method != HttpMethod::Get).then(|| format!("{name} ({})", entry.method))
        })
        .collect();
    if !non_get.is_empty() {
        warnings.push(format!(
            "Non-GET endpoints exposed as tools: {}. Make sure exposing operations that modify \
             data is intended. {DISABLE_HINT}",
            non_get.join(", ")
        ));
    }

    for name in tools.tool_names() {
        let Some(entry) = tools.entry(name) else {
            continue;
        };
        if looks_auto_generated(&entry.original_operation_id) {
            warnings.push(format!(
                "Tool '{name}' appears to have an auto-generated operation_id '{}'. Set an \
                 explicit operation_id on the route for a readable tool name. {DISABLE_HINT}",
                entry.original_operation_id
            ));
        }
    }

    warnings
}

fn looks_auto_generated(operation_id: &str) -> bool {
    operation_id.contains("__")
        || HttpMethod::ALL
            .iter()
            .any(|m| operation_id.ends_with(&format!("_{}", m.as_str())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AdapterError;
    use api_mcp_openapi_tools::ConvertOptions;
    use serde_json::json;

    fn items_document() -> OpenApiDocument {
        OpenApiDocument::from_value(api_mcp_test_support::items_openapi_document()).unwrap()
    }

    fn bridge(config: BridgeConfig) -> Result<ApiMcpBridge> {
        ApiMcpBridge::for_router(
            items_document(),
            api_mcp_test_support::items_api_router(),
            config,
        )
    }

    fn tool_names(bridge: &ApiMcpBridge) -> Vec<String> {
        bridge.tools().iter().map(|t| t.name.to_string()).collect()
    }

    #[test]
    fn test_name_and_description_default_to_document_info() {
        let bridge = bridge(BridgeConfig::default()).unwrap();
        assert_eq!(bridge.name(), "Items API");
        assert_eq!(
            bridge.server().instructions(),
            Some("A sample API for managing items")
        );
    }

    #[test]
    fn test_name_falls_back_to_default() {
        let doc = OpenApiDocument::from_value(json!({"paths": {}})).unwrap();
        let bridge = ApiMcpBridge::for_router(doc, Router::new(), BridgeConfig::default()).unwrap();
        assert_eq!(bridge.name(), DEFAULT_SERVER_NAME);
        assert!(bridge.tools().is_empty());
    }

    #[test]
    fn test_configured_name_wins() {
        let bridge = bridge(BridgeConfig {
            name: Some("Inventory".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(bridge.name(), "Inventory");
    }

    #[test]
    fn test_tools_follow_document_order_and_filters() {
        let all = bridge(BridgeConfig::default()).unwrap();
        assert_eq!(
            tool_names(&all),
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

        let gets = bridge(BridgeConfig {
            filter: api_mcp_openapi_tools::FilterConfig {
                include_tags: Some(vec!["items".to_string()]),
                only_get_endpoints: true,
                ..Default::default()
            },
            ..Default::default()
        })
        .unwrap();
        assert_eq!(tool_names(&gets), vec!["list_items", "get_item"]);
        assert_eq!(gets.catalog().operation_map.len(), 2);
    }

    #[test]
    fn test_conflicting_filters_fail_at_construction() {
        let err = bridge(BridgeConfig {
            filter: api_mcp_openapi_tools::FilterConfig {
                include_operations: Some(vec![]),
                exclude_operations: Some(vec![]),
                ..Default::default()
            },
            ..Default::default()
        })
        .err()
        .unwrap();
        assert!(matches!(err, AdapterError::Config(_)));
    }

    #[test]
    fn test_set_document_rebuilds_catalog() {
        let bridge = bridge(BridgeConfig::default()).unwrap();
        let server = bridge.server();

        bridge
            .set_document(
                OpenApiDocument::from_value(json!({
                    "paths": {"/ping": {"get": {"operationId": "ping", "responses": {}}}}
                }))
                .unwrap(),
            )
            .unwrap();

        let names: Vec<String> = server.tools().iter().map(|t| t.name.to_string()).collect();
        assert_eq!(names, vec!["ping"]);
    }

    #[test]
    fn test_setup_warnings() {
        let doc = items_document();
        let converted = convert(&doc, &ConvertOptions::default()).unwrap();
        let warnings = setup_warnings(&converted);

        assert!(!warnings.iter().any(|w| w.starts_with("More than 10 tools")));
        let non_get = warnings
            .iter()
            .find(|w| w.starts_with("Non-GET endpoints exposed as tools"))
            .unwrap();
        assert!(non_get.contains("create_item (POST)"));
        assert!(non_get.contains("update_item (PUT)"));
        assert!(non_get.contains("delete_item (DELETE)"));
        assert!(!non_get.contains("list_items"));
        assert!(warnings.iter().all(|w| w.contains("disable_warnings")));
    }

    #[test]
    fn test_setup_warnings_for_many_auto_generated_tools() {
        let paths: serde_json::Map<String, serde_json::Value> = (0..11)
            .map(|i| {
                (
                    format!("/things/{i}"),
                    json!({"get": {"operationId": format!("read_thing_{i}_things__{i}_get"), "responses": {}}}),
                )
            })
            .collect();
        let doc = OpenApiDocument::from_value(json!({ "paths": paths })).unwrap();
        let converted = convert(&doc, &ConvertOptions::default()).unwrap();
        let warnings = setup_warnings(&converted);

        assert!(warnings[0].starts_with("More than 10 tools exposed (11)"));
        let auto = warnings
            .iter()
            .filter(|w| w.contains("auto-generated operation_id"))
            .count();
        assert_eq!(auto, 11);
    }

    #[test]
    fn test_looks_auto_generated() {
        assert!(looks_auto_generated("read_item_items__item_id__get"));
        assert!(looks_auto_generated("create_item_items_post"));
        assert!(!looks_auto_generated("get_item"));
        assert!(!looks_auto_generated("list_items"));
    }

    #[test]
    fn test_mount_rejects_bad_paths() {
        let bridge = bridge(BridgeConfig::default()).unwrap();
        assert!(matches!(
            bridge.mount_sse(Router::new(), ""),
            Err(AdapterError::Config(_))
        ));
        assert!(matches!(
            bridge.mount_ws(Router::new(), "/m cp"),
            Err(AdapterError::Config(_))
        ));
    }
}
