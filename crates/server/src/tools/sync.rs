//! background_sync tool implementation.

use constellation_client::{CacheRouter, SyncOutcome};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

/// Parameters for the background_sync tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct BackgroundSyncParams {
    /// Run this tag now. Without a tag, every pending registration is drained
    /// as if connectivity had just returned.
    #[serde(default)]
    pub tag: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SyncReport {
    pub tag: String,
    #[serde(flatten)]
    pub outcome: SyncOutcome,
}

/// Output from the background_sync tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BackgroundSyncOutput {
    pub syncs: Vec<SyncReport>,
}

/// Implementation of the background_sync tool.
pub async fn sync_impl(router: &CacheRouter, params: BackgroundSyncParams) -> Result<CallToolResult, McpError> {
    let syncs = match params.tag.filter(|t| !t.trim().is_empty()) {
        Some(tag) => {
            let outcome = router.handle_sync(&tag).await;
            vec![SyncReport { tag, outcome }]
        }
        None => router
            .connectivity_restored()
            .await
            .into_iter()
            .map(|(tag, outcome)| SyncReport { tag, outcome })
            .collect(),
    };

    json_result(&BackgroundSyncOutput { syncs })
}
