use std::sync::Arc;

use quay_core::catalog::{self, Surface, ToolDescriptor};
use quay_core::store::TerminalStore;
use quay_core::tools::ToolError;
use rmcp::model::{CallToolResult, JsonObject, Tool};
use serde_json::Value;

use crate::{QuayMcp, helpers};

fn lookup_tool(descriptor: &ToolDescriptor) -> Tool {
    let schema = match descriptor.parameters_schema() {
        Value::Object(schema) => schema,
        _ => JsonObject::new(),
    };
    Tool::new(descriptor.name, descriptor.description, Arc::new(schema))
}

impl<S: TerminalStore + 'static> QuayMcp<S> {
    pub(crate) fn lookup_tools(&self) -> Vec<Tool> {
        catalog::for_surface(Surface::Protocol).map(lookup_tool).collect()
    }

    /// Runs a protocol lookup by name. Names outside the protocol surface
    /// are reported as unknown, the same as names outside the catalog.
    pub(crate) async fn call_lookup(&self, name: &str, arguments: JsonObject) -> CallToolResult {
        let exposed = catalog::descriptor(name)
            .is_some_and(|descriptor| descriptor.exposed_on(Surface::Protocol));
        let outcome = if exposed {
            self.executor().execute(name, &arguments).await
        } else {
            Err(ToolError::UnknownTool(name.to_string()))
        };
        helpers::tool_result(name, outcome)
    }
}
