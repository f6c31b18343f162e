//! cache_status tool implementation.
//!
//! Reports entry counts and sizes per partition.

use constellation_client::CacheRouter;
use rmcp::{ErrorData as McpError, model::CallToolResult};

use crate::tools::json_result;

/// Implementation of the cache_status tool.
pub async fn status_impl(router: &CacheRouter) -> Result<CallToolResult, McpError> {
    let status = router.status().await?;
    json_result(&status)
}
