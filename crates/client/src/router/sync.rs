//! Background sync.
//!
//! Tags are queued with [`CacheRouter::register_sync`] and drained when the
//! host reports connectivity. Sync failures are logged and never propagated.

use serde::{Deserialize, Serialize};

use constellation_core::Error;

use super::clients::ClientMessage;
use super::{CacheRouter, PartitionKind, lock};

/// Empties the api partition so the next request goes to the network.
pub const GITHUB_DATA_SYNC: &str = "github-data-sync";

/// Placeholder for queued analytics; currently a no-op.
pub const ANALYTICS_SYNC: &str = "analytics-sync";

const RESYNCED_MESSAGE: &str = "GitHub data refreshed from network";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SyncOutcome {
    Resynced { cleared: usize, notified: usize },
    Noop,
    UnknownTag,
    Failed { reason: String },
}

impl CacheRouter {
    /// Queue a sync tag. Registering a tag that is already pending is a no-op.
    pub fn register_sync(&self, tag: impl Into<String>) {
        let tag = tag.into();
        let mut pending = lock(&self.inner.pending_sync);
        if !pending.contains(&tag) {
            tracing::debug!(tag = %tag, "sync registered");
            pending.push(tag);
        }
    }

    pub fn pending_syncs(&self) -> Vec<String> {
        lock(&self.inner.pending_sync).clone()
    }

    /// Run every pending sync in registration order.
    pub async fn connectivity_restored(&self) -> Vec<(String, SyncOutcome)> {
        let tags = std::mem::take(&mut *lock(&self.inner.pending_sync));
        let mut outcomes = Vec::with_capacity(tags.len());
        for tag in tags {
            let outcome = self.handle_sync(&tag).await;
            outcomes.push((tag, outcome));
        }
        outcomes
    }

    pub async fn handle_sync(&self, tag: &str) -> SyncOutcome {
        tracing::info!(tag, "background sync triggered");
        match tag {
            GITHUB_DATA_SYNC => match self.resync_github_data().await {
                Ok((cleared, notified)) => {
                    tracing::info!(cleared, notified, "github data sync completed");
                    SyncOutcome::Resynced { cleared, notified }
                }
                Err(e) => {
                    tracing::error!(error = %e, "github data sync failed");
                    SyncOutcome::Failed { reason: e.to_string() }
                }
            },
            ANALYTICS_SYNC => {
                tracing::info!("analytics sync completed");
                SyncOutcome::Noop
            }
            other => {
                tracing::warn!(tag = other, "ignoring unknown sync tag");
                SyncOutcome::UnknownTag
            }
        }
    }

    async fn resync_github_data(&self) -> Result<(usize, usize), Error> {
        let partition = self.partition_name(PartitionKind::Api);
        let mut cleared = 0;
        for key in self.inner.store.keys(&partition).await? {
            if self.inner.store.delete(&partition, &key).await? {
                cleared += 1;
            }
        }
        let notified = self.clients().broadcast(&ClientMessage::DataResynced { message: RESYNCED_MESSAGE.into() });
        Ok((cleared, notified))
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use constellation_core::{EntryKey, PartitionStore, Response};

    #[tokio::test]
    async fn test_github_sync_empties_api_partition_and_notifies() {
        let h = harness().await;
        let mut page = h.connect_page("/ULTIMATE-HYPERFOCUS-CONSTELLATION/", true);
        for path in ["a", "b"] {
            let key = EntryKey::new("GET", format!("https://api.github.com/{path}"));
            h.store.put("api-v1", &key, &Response::new(200, "OK", "x")).await.unwrap();
        }
        let asset = EntryKey::new("GET", "https://welshdog.github.io/ULTIMATE-HYPERFOCUS-CONSTELLATION/app.js");
        h.store.put("static-v1", &asset, &Response::new(200, "OK", "js")).await.unwrap();

        let outcome = h.router.handle_sync(GITHUB_DATA_SYNC).await;

        assert_eq!(outcome, SyncOutcome::Resynced { cleared: 2, notified: 1 });
        assert!(h.store.keys("api-v1").await.unwrap().is_empty());
        assert!(h.store.get("static-v1", &asset).await.unwrap().is_some());
        assert_eq!(
            page.messages.try_recv().unwrap(),
            ClientMessage::DataResynced { message: RESYNCED_MESSAGE.into() }
        );
    }

    #[tokio::test]
    async fn test_analytics_and_unknown_tags() {
        let h = harness().await;
        assert_eq!(h.router.handle_sync(ANALYTICS_SYNC).await, SyncOutcome::Noop);
        assert_eq!(h.router.handle_sync("mystery").await, SyncOutcome::UnknownTag);
    }

    #[tokio::test]
    async fn test_pending_tags_drain_on_connectivity() {
        let h = harness().await;
        h.router.register_sync(ANALYTICS_SYNC);
        h.router.register_sync(GITHUB_DATA_SYNC);
        h.router.register_sync(ANALYTICS_SYNC);
        assert_eq!(h.router.pending_syncs(), vec![ANALYTICS_SYNC, GITHUB_DATA_SYNC]);

        let outcomes = h.router.connectivity_restored().await;
        let tags: Vec<_> = outcomes.iter().map(|(tag, _)| tag.as_str()).collect();
        assert_eq!(tags, vec![ANALYTICS_SYNC, GITHUB_DATA_SYNC]);
        assert!(h.router.pending_syncs().is_empty());
        assert!(h.router.connectivity_restored().await.is_empty());
    }
}
