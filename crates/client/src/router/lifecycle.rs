//! Partition lifecycle: install, activate, cleanup, clear, status.
//!
//! Worker states move `parsed → installing → installed → activating → activated`.
//! A failed install leaves the worker `redundant` and writes nothing.

use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use constellation_core::{EntryKey, Error, PartitionStats, Request};

use super::clients::ClientMessage;
use super::{CacheRouter, PartitionKind, lock};
use crate::fetch::resolve;

const ACTIVATED_MESSAGE: &str = "Cache router activated - offline functionality ready!";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    Redundant,
}

/// Outcome of [`CacheRouter::activate`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ActivationReport {
    /// Partitions from other versions that were deleted.
    pub deleted: Vec<String>,
    /// Pages taken under control.
    pub claimed: usize,
    /// Pages that received the activation message.
    pub notified: usize,
}

/// Per-partition entry counts and sizes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatus {
    pub partitions: BTreeMap<String, PartitionStats>,
    pub total_partitions: usize,
}

impl CacheRouter {
    pub fn state(&self) -> WorkerState {
        *lock(&self.inner.state)
    }

    fn set_state(&self, state: WorkerState) {
        let mut current = lock(&self.inner.state);
        tracing::info!(from = ?*current, to = ?state, "worker state change");
        *current = state;
    }

    /// Move from one of `allowed` into `next`, or fail without changing anything.
    fn transition(&self, allowed: &[WorkerState], next: WorkerState, op: &str) -> Result<(), Error> {
        let mut current = lock(&self.inner.state);
        if !allowed.contains(&current) {
            return Err(Error::InvalidState(format!("cannot {op} while {:?}", *current)));
        }
        tracing::info!(from = ?*current, to = ?next, "worker state change");
        *current = next;
        Ok(())
    }

    /// Pre-populate the static partition with every precache asset.
    ///
    /// All assets are fetched concurrently; the first network error or
    /// non-success status aborts the install and nothing is written. Returns
    /// the number of cached assets.
    pub async fn install(&self) -> Result<usize, Error> {
        self.transition(
            &[WorkerState::Parsed, WorkerState::Redundant, WorkerState::Installed],
            WorkerState::Installing,
            "install",
        )?;

        match self.precache_all().await {
            Ok(count) => {
                self.set_state(WorkerState::Installed);
                let partition = self.partition_name(PartitionKind::Static);
                tracing::info!(assets = count, partition = %partition, "install complete");
                Ok(count)
            }
            Err(e) => {
                self.set_state(WorkerState::Redundant);
                tracing::warn!(error = %e, "install failed");
                Err(e)
            }
        }
    }

    async fn precache_all(&self) -> Result<usize, Error> {
        let settings = self.settings();

        let mut seen = HashSet::new();
        let mut requests = Vec::new();
        for asset in &settings.precache {
            let url = resolve(&settings.origin, asset)
                .map_err(|e| Error::InstallFailed { asset: asset.clone(), reason: e.to_string() })?;
            if seen.insert(url.clone()) {
                requests.push(Request::get(url));
            }
        }

        let fetches = requests.iter().map(|request| async move {
            let asset = request.url.to_string();
            let response = self
                .inner
                .fetcher
                .fetch(request)
                .await
                .map_err(|e| Error::InstallFailed { asset: asset.clone(), reason: e.to_string() })?;
            if !response.is_success() {
                return Err(Error::InstallFailed { asset, reason: format!("HTTP {}", response.status) });
            }
            Ok((EntryKey::for_request(request), response))
        });
        let fetched = try_join_all(fetches).await?;

        let now = self.inner.clock.now();
        let entries: Vec<_> = fetched.into_iter().map(|(key, response)| (key, response.stamped(now, None))).collect();

        let partition = self.partition_name(PartitionKind::Static);
        self.inner.store.open(&partition).await?;
        self.inner.store.put_all(&partition, &entries).await?;

        Ok(entries.len())
    }

    /// Drop partitions from other versions, claim pages, and announce readiness.
    pub async fn activate(&self) -> Result<ActivationReport, Error> {
        self.transition(&[WorkerState::Installed], WorkerState::Activating, "activate")?;

        let deleted = match self.delete_stale_partitions().await {
            Ok(deleted) => deleted,
            Err(e) => {
                self.set_state(WorkerState::Installed);
                return Err(e);
            }
        };

        let claimed = self.clients().claim_all();
        let notified = self.clients().broadcast(&ClientMessage::Activated { message: ACTIVATED_MESSAGE.into() });
        self.set_state(WorkerState::Activated);

        tracing::info!(deleted = deleted.len(), claimed, notified, "activated");
        Ok(ActivationReport { deleted, claimed, notified })
    }

    async fn delete_stale_partitions(&self) -> Result<Vec<String>, Error> {
        let current = self.settings().current_partitions();
        let mut deleted = Vec::new();
        for name in self.inner.store.partitions().await? {
            if current.contains(&name) {
                continue;
            }
            if self.inner.store.delete_partition(&name).await? {
                tracing::info!(partition = %name, "deleted old partition");
                deleted.push(name);
            }
        }
        Ok(deleted)
    }

    /// Delete api entries whose expiry has passed or cannot be read.
    pub async fn cleanup_expired(&self) -> Result<usize, Error> {
        let partition = self.partition_name(PartitionKind::Api);
        let now = self.inner.clock.now();
        let mut removed = 0;

        for key in self.inner.store.keys(&partition).await? {
            let Some(entry) = self.inner.store.get(&partition, &key).await? else {
                continue;
            };
            if !entry.is_fresh_at(now) && self.inner.store.delete(&partition, &key).await? {
                tracing::debug!(url = %key.url, "removed expired api entry");
                removed += 1;
            }
        }

        tracing::info!(removed, "cache cleanup complete");
        Ok(removed)
    }

    /// Run [`cleanup_expired`](Self::cleanup_expired) every `interval`. The
    /// first sweep happens one interval after the call.
    pub fn spawn_cleanup(&self, interval: Duration) -> JoinHandle<()> {
        let router = self.clone();
        tokio::spawn(async move {
            let mut timer = tokio::time::interval(interval);
            timer.tick().await;
            loop {
                timer.tick().await;
                if let Err(e) = router.cleanup_expired().await {
                    tracing::warn!(error = %e, "scheduled cache cleanup failed");
                }
            }
        })
    }

    /// Delete every partition. Returns how many were deleted.
    pub async fn clear_all(&self) -> Result<usize, Error> {
        let mut deleted = 0;
        for name in self.inner.store.partitions().await? {
            if self.inner.store.delete_partition(&name).await? {
                deleted += 1;
            }
        }
        tracing::info!(deleted, "all partitions cleared");
        Ok(deleted)
    }

    pub async fn status(&self) -> Result<CacheStatus, Error> {
        let mut partitions = BTreeMap::new();
        for name in self.inner.store.partitions().await? {
            let stats = self.inner.store.stats(&name).await?;
            partitions.insert(name, stats);
        }
        Ok(CacheStatus { total_partitions: partitions.len(), partitions })
    }
}
