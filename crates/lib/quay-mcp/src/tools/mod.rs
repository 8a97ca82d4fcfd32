//! MCP tool modules.

pub mod lookups;
