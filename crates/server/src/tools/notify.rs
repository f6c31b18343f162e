//! push_notification tool implementation.
//!
//! Translates a push payload into a notification and, optionally, simulates
//! the user clicking it.

use constellation_client::router::Notification;
use constellation_client::{CacheRouter, ClickOutcome};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

/// Parameters for the push_notification tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PushNotificationParams {
    /// Raw push payload (JSON text). Empty shows nothing.
    #[serde(default)]
    pub payload: String,

    /// Click the notification with this action (`open`, `focus`, `research`, ...).
    #[serde(default)]
    pub click: Option<String>,
}

/// Output from the push_notification tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PushNotificationOutput {
    pub notification: Option<Notification>,
    pub click: Option<ClickOutcome>,
}

/// Implementation of the push_notification tool.
pub async fn push_impl(router: &CacheRouter, params: PushNotificationParams) -> Result<CallToolResult, McpError> {
    let notification = router.handle_push(params.payload.as_bytes())?;

    let click = match (&notification, params.click.as_deref()) {
        (Some(shown), Some(action)) => Some(router.handle_notification_click(Some(action), &shown.data)),
        _ => None,
    };

    json_result(&PushNotificationOutput { notification, click })
}
