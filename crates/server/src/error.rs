//! Structured errors for the constellation MCP server.
//!
//! Router and store failures already convert from `constellation_core::Error`;
//! these cover what the tool layer itself rejects.

use constellation_client::GithubError;
use rmcp::model::{ErrorCode, ErrorData as McpError};

/// Errors raised by the tool layer.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Invalid input parameters (e.g., unknown purge scope).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// The GitHub API rejected or failed a request.
    #[error("GITHUB_ERROR: {0}")]
    Github(#[from] GithubError),

    /// Tool output could not be encoded.
    #[error("SERIALIZE_FAILED: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl From<ToolError> for McpError {
    fn from(err: ToolError) -> Self {
        let (code, message) = match &err {
            ToolError::InvalidInput(msg) => (-32602, msg.clone()),
            ToolError::Github(GithubError::InvalidName(_)) => (-32602, err.to_string()),
            ToolError::Github(_) => (-32010, err.to_string()),
            ToolError::Serialize(e) => (-32603, e.to_string()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}
