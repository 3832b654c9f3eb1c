//! The MCP server handler shared by every transport.

use api_mcp_http_tools::HttpRequestInfo;
use api_mcp_openapi_tools::{ConvertedTools, OpenApiToolsError, OperationMap, ToolExecutor};
use axum::http::request::Parts;
use parking_lot::RwLock;
use rmcp::model::{
    CallToolRequestParams, CallToolResult, Content, ErrorData, Implementation, ListToolsResult,
    PaginatedRequestParams, ServerCapabilities, ServerInfo, Tool,
};
use rmcp::service::RequestContext;
use rmcp::{RoleServer, ServerHandler};
use std::collections::BTreeMap;
use std::sync::Arc;

/// The tool catalog currently served. Replaced wholesale on every setup.
#[derive(Debug, Default)]
pub struct ToolCatalog {
    pub tools: Vec<Tool>,
    pub operation_map: OperationMap,
    /// Shortened tool name -> original operation id.
    pub operation_id_mappings: BTreeMap<String, String>,
}

impl From<ConvertedTools> for ToolCatalog {
    fn from(converted: ConvertedTools) -> Self {
        Self {
            tools: converted.tools,
            operation_map: converted.operation_map,
            operation_id_mappings: converted.operation_id_mappings,
        }
    }
}

struct Inner {
    name: String,
    instructions: Option<String>,
    executor: ToolExecutor,
    catalog: RwLock<Arc<ToolCatalog>>,
}

/// rmcp `ServerHandler` exposing the converted API operations as tools.
///
/// Cheap to clone; every transport session gets its own clone over the same catalog, so a
/// refresh is visible to live sessions on their next request.
#[derive(Clone)]
pub struct ToolServer {
    inner: Arc<Inner>,
}

impl ToolServer {
    #[must_use]
    pub fn new(name: String, instructions: Option<String>, executor: ToolExecutor) -> Self {
        Self {
            inner: Arc::new(Inner {
                name,
                instructions,
                executor,
                catalog: RwLock::new(Arc::new(ToolCatalog::default())),
            }),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    #[must_use]
    pub fn instructions(&self) -> Option<&str> {
        self.inner.instructions.as_deref()
    }

    #[must_use]
    pub fn executor(&self) -> &ToolExecutor {
        &self.inner.executor
    }

    /// Snapshot of the current catalog.
    #[must_use]
    pub fn catalog(&self) -> Arc<ToolCatalog> {
        self.inner.catalog.read().clone()
    }

    pub fn set_catalog(&self, catalog: ToolCatalog) {
        *self.inner.catalog.write() = Arc::new(catalog);
    }

    #[must_use]
    pub fn tools(&self) -> Vec<Tool> {
        self.catalog().tools.clone()
    }
}

/// Prefer the snapshot a custom transport attached to the message; fall back to the request
/// parts rmcp's streamable HTTP service injects.
fn request_info(context: &RequestContext<RoleServer>) -> Option<HttpRequestInfo> {
    context
        .extensions
        .get::<HttpRequestInfo>()
        .cloned()
        .or_else(|| {
            context
                .extensions
                .get::<Parts>()
                .map(|parts| HttpRequestInfo::from_parts(parts, None))
        })
}

impl ServerHandler for ToolServer {
    fn get_info(&self) -> ServerInfo {
        let mut server_info = Implementation::from_build_env();
        server_info.name.clone_from(&self.inner.name);
        server_info.version = env!("CARGO_PKG_VERSION").to_string();

        let mut info = ServerInfo::default();
        info.capabilities = ServerCapabilities::builder().enable_tools().build();
        info.server_info = server_info;
        info.instructions.clone_from(&self.inner.instructions);
        info
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        Ok(ListToolsResult::with_all_items(self.tools()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        let catalog = self.catalog();
        let http_info = request_info(&context);

        let result = self
            .inner
            .executor
            .execute(
                &request.name,
                request.arguments.as_ref(),
                &catalog.operation_map,
                http_info.as_ref(),
            )
            .await;

        match result {
            Ok(content) => Ok(CallToolResult::success(content)),
            Err(e @ OpenApiToolsError::UnknownTool(_)) => {
                Err(ErrorData::invalid_params(e.to_string(), None))
            }
            Err(e) => Ok(CallToolResult::error(vec![Content::text(e.to_string())])),
        }
    }
}
