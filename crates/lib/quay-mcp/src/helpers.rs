use quay_core::tools::ToolOutcome;
use rmcp::model::{CallToolResult, Content};
use tracing::warn;

/// Renders an executor outcome as a tool result.
///
/// Failures become an `isError` result rather than a protocol error so the
/// caller sees the message alongside other tool output.
pub(crate) fn tool_result(tool: &str, outcome: ToolOutcome) -> CallToolResult {
    match outcome {
        Ok(output) => CallToolResult::success(vec![Content::text(output.to_text())]),
        Err(err) => {
            warn!(tool, error = %err, "tool call failed");
            CallToolResult::error(vec![Content::text(format!("Error executing {tool}: {err}"))])
        }
    }
}
