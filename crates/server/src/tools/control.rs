//! control_message tool implementation.
//!
//! Accepts the app's `{type, data}` control messages.

use constellation_client::{CacheRouter, ControlMessage, ControlReply, WorkerState};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

/// Parameters for the control_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ControlMessageParams {
    /// The message, e.g. `{"type":"REGISTER_SYNC","data":{"tag":"github-data-sync"}}`.
    pub message: serde_json::Value,
}

/// Output from the control_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ControlMessageOutput {
    /// Reply for `CLEAR_CACHE` and `CACHE_STATUS`, absent otherwise.
    pub reply: Option<ControlReply>,
    /// Worker state after the message was applied.
    pub state: WorkerState,
    pub pending_syncs: Vec<String>,
}

/// Implementation of the control_message tool.
pub async fn control_impl(router: &CacheRouter, params: ControlMessageParams) -> Result<CallToolResult, McpError> {
    let message = ControlMessage::from_json(params.message)?;
    let reply = router.handle_control_message(message).await?;

    json_result(&ControlMessageOutput { reply, state: router.state(), pending_syncs: router.pending_syncs() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{output, router_for};

    #[tokio::test]
    async fn test_unknown_message_rejected() {
        let (router, _) = router_for("http://127.0.0.1:9").await;
        let params = ControlMessageParams { message: serde_json::json!({"type": "REBOOT"}) };
        let err = control_impl(&router, params).await.unwrap_err();
        assert_eq!(err.code.0, -32602);
    }

    #[tokio::test]
    async fn test_register_sync_and_status() {
        let (router, _) = router_for("http://127.0.0.1:9").await;

        let params = ControlMessageParams {
            message: serde_json::json!({"type": "REGISTER_SYNC", "data": {"tag": "github-data-sync"}}),
        };
        let json = output(&control_impl(&router, params).await.unwrap());
        assert!(json["reply"].is_null());
        assert_eq!(json["pending_syncs"][0], "github-data-sync");

        let params = ControlMessageParams { message: serde_json::json!({"type": "CACHE_STATUS"}) };
        let json = output(&control_impl(&router, params).await.unwrap());
        assert_eq!(json["reply"]["totalPartitions"], 0);
        assert_eq!(json["state"], "parsed");
    }
}
