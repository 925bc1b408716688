//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use crate::tools::{
    PageCompactParams, PayloadBuildParams, SnapshotCaptureParams, SnapshotGetParams, ToolState, page_compact,
    payload_build, snapshot_capture, snapshot_get,
};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The main MCP server handler for mcp-pagectx.
#[derive(Clone)]
pub struct PagectxServer {
    tool_router: ToolRouter<Self>,
    state: ToolState,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl PagectxServer {
    /// Create a new server handler around shared tool state.
    pub fn new(state: ToolState) -> Self {
        Self { tool_router: Self::tool_router(), state }
    }

    /// Compact raw HTML without caching it.
    #[tool(
        description = "Compact raw page HTML: strips scripts, styles, overlays and comments, keeps locator attributes, truncates long text. Returns compacted markup and stats."
    )]
    async fn page_compact(&self, params: Parameters<PageCompactParams>) -> Result<CallToolResult, McpError> {
        page_compact::compact_impl(self.state.compactor.clone(), params.0).await
    }

    /// Compact a captured page and store it in the snapshot cache.
    #[tool(
        description = "Compact a captured page (RAW_HTML) or normalize an ARIA capture (ARIA_SNAPSHOT) and store it keyed by URL, entry action and capture mode."
    )]
    async fn snapshot_capture(&self, params: Parameters<SnapshotCaptureParams>) -> Result<CallToolResult, McpError> {
        snapshot_capture::capture_impl(self.state.clone(), params.0).await
    }

    /// Retrieve a cached snapshot.
    #[tool(description = "Retrieve a cached page snapshot by URL, entry action and capture mode. Falls back to legacy keys.")]
    async fn snapshot_get(&self, params: Parameters<SnapshotGetParams>) -> Result<CallToolResult, McpError> {
        snapshot_get::get_impl(self.state.clone(), params.0).await
    }

    /// Assemble a prompt payload.
    #[tool(
        description = "Build the prompt payload for PLAN_ONLY, PLAN_ENTRY, PLAN_REFINE, CODEGEN or REFINE_CODE from cached step snapshots, plan text and user hints."
    )]
    async fn payload_build(&self, params: Parameters<PayloadBuildParams>) -> Result<CallToolResult, McpError> {
        payload_build::build_impl(self.state.clone(), params.0).await
    }
}

impl ServerHandler for PagectxServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "mcp-pagectx".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::state;

    #[test]
    fn test_lists_all_tools() {
        let server = PagectxServer::new(state());
        let mut names: Vec<String> = server
            .tool_router
            .list_all()
            .into_iter()
            .map(|tool| tool.name.to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec!["page_compact", "payload_build", "snapshot_capture", "snapshot_get"]);
    }

    #[test]
    fn test_server_info() {
        let info = PagectxServer::new(state()).get_info();
        assert_eq!(info.server_info.name, "mcp-pagectx");
    }
}
