//! MCP server runner.

use std::sync::Arc;

use quay_core::store::TerminalStore;
use quay_core::tools::ToolExecutor;
use rmcp::serve_server;
use rmcp::transport::io::stdio;
use tracing::info;

use crate::QuayMcp;

/// Serves the MCP server over stdio until the client disconnects.
///
/// Stdout carries protocol frames only; logging must go elsewhere.
///
/// # Errors
/// Returns a catalog mismatch or any transport or server error.
pub async fn serve_stdio<S>(
    executor: Arc<ToolExecutor<S>>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
where
    S: TerminalStore + 'static,
{
    let service = QuayMcp::try_new(executor)?;
    let (stdin, stdout) = stdio();
    let running = serve_server(service, (stdin, stdout)).await?;
    info!("MCP server running on stdio");
    let reason = running.waiting().await?;
    info!(?reason, "MCP stdio session ended");
    Ok(())
}
