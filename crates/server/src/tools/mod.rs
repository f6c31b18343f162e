//! MCP tool implementations.
//!
//! This module contains all tools exposed by the constellation server. Each
//! tool returns its output as pretty-printed JSON text content.

pub mod cache;
pub mod control;
pub mod notify;
pub mod repos;
pub mod route;
pub mod sync;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

use crate::error::ToolError;

pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output).map_err(ToolError::from)?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
