//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use constellation_client::{CacheRouter, GithubClient};

use crate::tools::cache::{CachePurgeParams, purge_impl, status_impl};
use crate::tools::control::{ControlMessageParams, control_impl};
use crate::tools::notify::{PushNotificationParams, push_impl};
use crate::tools::repos::{RepositoryDetailsParams, details_impl, list_impl};
use crate::tools::route::{RouteRequestParams, route_impl};
use crate::tools::sync::{BackgroundSyncParams, sync_impl};

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

/// The main MCP server handler for the constellation cache router.
#[derive(Clone)]
pub struct ConstellationServer {
    router: CacheRouter,
    github: GithubClient,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl ConstellationServer {
    /// Create a new server handler over a started router.
    pub fn new(router: CacheRouter, github: GithubClient) -> Self {
        Self { router, github, tool_router: Self::tool_router() }
    }

    #[tool(description = "Send a request through the offline cache router. Returns status, headers, body, \
                          and whether it was served from a partition.")]
    async fn route_request(&self, params: Parameters<RouteRequestParams>) -> Result<CallToolResult, McpError> {
        route_impl(&self.router, params.0).await
    }

    #[tool(description = "Entry count and stored bytes for every cache partition.")]
    async fn cache_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.router).await
    }

    #[tool(description = "Purge expired API entries (scope=expired) or every partition (scope=all).")]
    async fn cache_purge(&self, params: Parameters<CachePurgeParams>) -> Result<CallToolResult, McpError> {
        purge_impl(&self.router, params.0).await
    }

    #[tool(description = "Deliver a {type, data} control message: SKIP_WAITING, REGISTER_SYNC, CLEAR_CACHE, \
                          or CACHE_STATUS.")]
    async fn control_message(&self, params: Parameters<ControlMessageParams>) -> Result<CallToolResult, McpError> {
        control_impl(&self.router, params.0).await
    }

    #[tool(description = "List the constellation's GitHub repositories with category, colour, and position. \
                          Falls back to built-in data when the API is unreachable.")]
    async fn list_repositories(&self) -> Result<CallToolResult, McpError> {
        list_impl(&self.github).await
    }

    #[tool(description = "Repository metadata with languages, latest commit, and a 0-100 activity score.")]
    async fn repository_details(
        &self, params: Parameters<RepositoryDetailsParams>,
    ) -> Result<CallToolResult, McpError> {
        details_impl(&self.github, params.0).await
    }

    #[tool(description = "Translate a push payload into a notification, optionally clicking it.")]
    async fn push_notification(&self, params: Parameters<PushNotificationParams>) -> Result<CallToolResult, McpError> {
        push_impl(&self.router, params.0).await
    }

    #[tool(description = "Run a background sync tag now, or drain every pending registration.")]
    async fn background_sync(&self, params: Parameters<BackgroundSyncParams>) -> Result<CallToolResult, McpError> {
        sync_impl(&self.router, params.0).await
    }
}

impl ServerHandler for ConstellationServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "constellation-mcp".into(),
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
