//! list_repositories and repository_details tool implementations.
//!
//! Both go through the GitHub client, which itself fetches through the router.

use constellation_client::{GithubClient, RateLimitStatus, Repository, RepositoryDetails};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ToolError;
use crate::tools::json_result;

/// Output from the list_repositories tool.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRepositoriesOutput {
    pub username: String,
    pub count: usize,
    pub repositories: Vec<Repository>,
    pub rate_limit: RateLimitStatus,
}

/// Implementation of the list_repositories tool.
pub async fn list_impl(github: &GithubClient) -> Result<CallToolResult, McpError> {
    let repositories = github.fetch_repositories().await;
    json_result(&ListRepositoriesOutput {
        username: github.config().username.clone(),
        count: repositories.len(),
        repositories,
        rate_limit: github.rate_limit_status(),
    })
}

/// Parameters for the repository_details tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RepositoryDetailsParams {
    /// Repository name, without the owner.
    pub name: String,
}

/// Output from the repository_details tool.
#[derive(Debug, Clone, Serialize)]
pub struct RepositoryDetailsOutput {
    pub name: String,
    /// Null when any lookup failed.
    pub details: Option<RepositoryDetails>,
}

/// Implementation of the repository_details tool.
///
/// Malformed names are rejected; lookups that fail upstream yield `details: null`.
pub async fn details_impl(github: &GithubClient, params: RepositoryDetailsParams) -> Result<CallToolResult, McpError> {
    let name = params.name.trim().to_string();
    let details = match github.try_repository_details(&name).await {
        Ok(details) => Some(details),
        Err(e @ constellation_client::GithubError::InvalidName(_)) => return Err(ToolError::from(e).into()),
        Err(e) => {
            tracing::warn!(repository = %name, error = %e, "repository details unavailable");
            None
        }
    };

    json_result(&RepositoryDetailsOutput { name, details })
}
