//! Control messages sent from the app to the router.

use serde::{Deserialize, Serialize};

use constellation_core::Error;

use super::lifecycle::{CacheStatus, WorkerState};
use super::CacheRouter;

/// `{type, data}` messages, e.g. `{"type":"REGISTER_SYNC","data":{"tag":"github-data-sync"}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(tag = "type", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    SkipWaiting,
    RegisterSync { tag: String },
    ClearCache,
    CacheStatus,
}

impl ControlMessage {
    pub fn from_json(value: serde_json::Value) -> Result<Self, Error> {
        serde_json::from_value(value).map_err(|e| Error::InvalidInput(format!("invalid control message: {e}")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(untagged)]
pub enum ControlReply {
    Cleared { success: bool },
    Status(CacheStatus),
}

impl CacheRouter {
    /// Apply a control message. Only `CLEAR_CACHE` and `CACHE_STATUS` reply.
    pub async fn handle_control_message(&self, message: ControlMessage) -> Result<Option<ControlReply>, Error> {
        tracing::debug!(message = ?message, "control message");
        match message {
            ControlMessage::SkipWaiting => {
                if self.state() == WorkerState::Installed {
                    self.activate().await?;
                }
                Ok(None)
            }
            ControlMessage::RegisterSync { tag } => {
                self.register_sync(tag);
                Ok(None)
            }
            ControlMessage::ClearCache => {
                self.clear_all().await?;
                Ok(Some(ControlReply::Cleared { success: true }))
            }
            ControlMessage::CacheStatus => Ok(Some(ControlReply::Status(self.status().await?))),
        }
    }
}
