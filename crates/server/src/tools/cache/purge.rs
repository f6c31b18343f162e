//! cache_purge tool implementation.
//!
//! Purges expired api entries, or every partition.

use constellation_client::CacheRouter;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

/// What to purge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PurgeScope {
    /// Api entries past their expiry.
    #[default]
    Expired,
    /// Every partition, including the precached shell.
    All,
}

/// Parameters for the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeParams {
    /// Purge scope (default: expired).
    #[serde(default)]
    pub scope: PurgeScope,
}

/// Output from the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeOutput {
    pub scope: PurgeScope,
    /// Entries (for `expired`) or partitions (for `all`) deleted.
    pub deleted: usize,
}

/// Implementation of the cache_purge tool.
pub async fn purge_impl(router: &CacheRouter, params: CachePurgeParams) -> Result<CallToolResult, McpError> {
    let deleted = match params.scope {
        PurgeScope::Expired => router.cleanup_expired().await?,
        PurgeScope::All => router.clear_all().await?,
    };

    json_result(&CachePurgeOutput { scope: params.scope, deleted })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{output, router_for};

    #[test]
    fn test_scope_defaults_to_expired() {
        let params: CachePurgeParams = serde_json::from_str("{}").unwrap();
        assert_eq!(params.scope, PurgeScope::Expired);
        assert!(serde_json::from_str::<CachePurgeParams>(r#"{"scope":"older"}"#).is_err());
    }

    #[tokio::test]
    async fn test_purge_all() {
        let (router, _) = router_for("http://127.0.0.1:9").await;
        router.install().await.unwrap();

        let result = purge_impl(&router, CachePurgeParams { scope: PurgeScope::All }).await.unwrap();
        let json = output(&result);
        assert_eq!(json["scope"], "all");
        assert_eq!(json["deleted"], 1);
        assert_eq!(router.status().await.unwrap().total_partitions, 0);
    }

    #[tokio::test]
    async fn test_purge_expired_keeps_fresh_entries() {
        let mut server = mockito::Server::new_async().await;
        server.mock("GET", "/rate_limit").with_status(200).with_body("{}").create_async().await;
        let (router, _) = router_for(&server.url()).await;
        let url = url::Url::parse(&format!("{}/rate_limit", server.url())).unwrap();
        router.handle_fetch(&constellation_core::Request::get(url)).await.unwrap();

        let result = purge_impl(&router, CachePurgeParams { scope: PurgeScope::Expired }).await.unwrap();
        assert_eq!(output(&result)["deleted"], 0);
        assert_eq!(router.status().await.unwrap().partitions["api-v1"].count, 1);
    }
}
