//! MCP server for quay.
//!
//! Exposes the protocol surface of the tool catalog as rmcp tools. Calls run
//! the shared executor directly; no language model is involved.

mod helpers;
mod tools;
pub mod server;

use std::sync::Arc;

use quay_core::catalog::{self, CatalogError, Surface};
use quay_core::store::TerminalStore;
use quay_core::tools::ToolExecutor;
use rmcp::{
    ErrorData,
    RoleServer,
    ServerHandler,
    handler::server::tool::{ToolCallContext, ToolRouter},
    service::RequestContext,
    tool,
    tool_router,
};
use rmcp::model::{
    CallToolRequestParams,
    CallToolResult,
    Content,
    ListToolsResult,
    PaginatedRequestParams,
    ServerCapabilities,
    ServerInfo,
    Tool,
};

/// Name of the liveness tool, which sits outside the catalog.
pub const HEALTH_TOOL: &str = "health";

const SERVER_INSTRUCTIONS: &str = r"quay answers questions about vessel operations at a container terminal.

Tools:
- `get_vessel_visits`: the 100 most recent visits with phase and planned/executed moves.
- `get_inbound_vessels_current_year`: inbound visits this year with ETA, ETD, port hours and estimated moves.
- `get_vessel_details`: one visit by `visitId` (e.g. `TNG001`).
- `get_visits_today`: visits whose ETA falls on today.
- `get_vessel_productivity`: CMPH per visit for vessels whose name contains `vesselName`.

Notes:
- Results are JSON rows. An unmatched visit or vessel returns a short text instead.
- Failures are returned as `Error executing <tool>: <message>` with `isError` set.
- `health` returns `ok`.";

/// MCP server wrapper around a shared tool executor.
///
/// Lookup tools are listed and dispatched from the catalog; bad input comes
/// back as an `isError` result. The router only carries tools outside the
/// catalog.
pub struct QuayMcp<S: TerminalStore + 'static> {
    tool_router: ToolRouter<Self>,
    executor: Arc<ToolExecutor<S>>,
}

impl<S: TerminalStore + 'static> Clone for QuayMcp<S> {
    fn clone(&self) -> Self {
        Self {
            tool_router: self.tool_router.clone(),
            executor: Arc::clone(&self.executor),
        }
    }
}

impl<S: TerminalStore + 'static> QuayMcp<S> {
    /// Builds the server and checks its tools match the catalog's protocol surface.
    ///
    /// # Errors
    /// Returns `CatalogError::DuplicateTool` if a router tool shadows a catalog
    /// tool, or `CatalogError::SurfaceMismatch` if the listed lookups drift
    /// from the catalog.
    pub fn try_new(executor: Arc<ToolExecutor<S>>) -> Result<Self, CatalogError> {
        let tool_router = Self::tool_router_core();
        if let Some(shadowed) = catalog::CATALOG
            .iter()
            .find(|descriptor| tool_router.has_route(descriptor.name))
        {
            return Err(CatalogError::DuplicateTool(shadowed.name));
        }

        let server = Self {
            tool_router,
            executor,
        };
        let listed: Vec<String> = server
            .lookup_tools()
            .into_iter()
            .map(|tool| tool.name.into_owned())
            .collect();
        catalog::verify_surface(Surface::Protocol, listed.iter().map(String::as_str))?;
        Ok(server)
    }

    pub(crate) fn executor(&self) -> &ToolExecutor<S> {
        &self.executor
    }

    /// Tools this server lists: the protocol lookups, then `health`.
    #[must_use]
    pub fn tools(&self) -> Vec<Tool> {
        let mut tools = self.lookup_tools();
        tools.extend(self.tool_router.list_all());
        tools
    }
}

#[tool_router(router = tool_router_core, vis = "pub")]
impl<S: TerminalStore + 'static> QuayMcp<S> {
    #[tool(description = "Health check. Returns 'ok'.")]
    async fn health(&self) -> Result<CallToolResult, ErrorData> {
        Ok(CallToolResult::success(vec![Content::text("ok")]))
    }
}

impl<S: TerminalStore + 'static> ServerHandler for QuayMcp<S> {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(SERVER_INSTRUCTIONS.to_string()),
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        if self.tool_router.has_route(&request.name) {
            let tcc = ToolCallContext::new(self, request, context);
            return self.tool_router.call(tcc).await;
        }
        Ok(self
            .call_lookup(&request.name, request.arguments.unwrap_or_default())
            .await)
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        Ok(ListToolsResult::with_all_items(self.tools()))
    }
}
