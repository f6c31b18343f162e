//! The five request strategies.
//!
//! Store failures never surface to the caller: a failed read is a miss and a
//! failed write is skipped, both logged at `warn`.

use constellation_core::{EntryKey, Request, Response};

use super::{CacheRouter, PartitionKind, offline};

impl CacheRouter {
    pub(super) async fn lookup(&self, kind: PartitionKind, key: &EntryKey) -> Option<Response> {
        let partition = self.partition_name(kind);
        match self.inner.store.get(&partition, key).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(partition = %partition, url = %key.url, error = %e, "cache read failed");
                None
            }
        }
    }

    pub(super) async fn remember(&self, kind: PartitionKind, key: &EntryKey, response: &Response) {
        let partition = self.partition_name(kind);
        if let Err(e) = self.inner.store.put(&partition, key, response).await {
            tracing::warn!(partition = %partition, url = %key.url, error = %e, "cache write failed, skipping");
        }
    }

    /// Network-first with a timed fallback. Live 2xx responses are returned
    /// as-is while a stamped copy with an expiry goes into the api partition.
    ///
    /// Time is read after the fetch settles: expiry counts from completion,
    /// and an entry that lapsed while the fetch was pending is not served.
    pub(super) async fn api_network_first(&self, request: &Request) -> Response {
        let key = EntryKey::for_request(request);

        let failure = match self.inner.fetcher.fetch(request).await {
            Ok(response) if response.is_success() => {
                let now = self.inner.clock.now();
                let expires = now + self.inner.settings.api_ttl;
                let stored = response.clone().stamped(now, Some(expires));
                self.remember(PartitionKind::Api, &key, &stored).await;
                return response;
            }
            Ok(response) => format!("HTTP {}", response.status),
            Err(e) => e.to_string(),
        };

        tracing::debug!(url = %request.url, reason = %failure, "api request failed, trying cache");

        match self.lookup(PartitionKind::Api, &key).await {
            Some(cached) if cached.is_fresh_at(self.inner.clock.now()) => {
                tracing::debug!(url = %request.url, "serving cached api response");
                cached
            }
            Some(_) => {
                tracing::debug!(url = %request.url, "cached api response expired");
                offline::api_offline()
            }
            None => offline::api_offline(),
        }
    }

    /// Cache-first into the static partition.
    pub(super) async fn cache_first(&self, request: &Request, miss_message: &str) -> Response {
        let key = EntryKey::for_request(request);

        if let Some(cached) = self.lookup(PartitionKind::Static, &key).await {
            tracing::debug!(url = %request.url, "serving cached static asset");
            return cached;
        }

        self.fetch_into_static(request, &key, miss_message).await
    }

    /// Serve the stored copy at once and refresh it in the background.
    pub(super) async fn stale_while_revalidate(&self, request: &Request) -> Response {
        let key = EntryKey::for_request(request);

        let Some(cached) = self.lookup(PartitionKind::Static, &key).await else {
            return self.fetch_into_static(request, &key, offline::CDN_UNAVAILABLE).await;
        };

        tracing::debug!(url = %request.url, "serving cached cdn asset, revalidating");

        let router = self.clone();
        let request = request.clone();
        self.spawn_refresh(async move {
            match router.inner.fetcher.fetch(&request).await {
                Ok(fresh) if fresh.is_success() => {
                    let stored = fresh.stamped(router.inner.clock.now(), None);
                    router.remember(PartitionKind::Static, &key, &stored).await;
                }
                Ok(fresh) => {
                    tracing::debug!(url = %request.url, status = fresh.status, "revalidation returned non-success");
                }
                Err(e) => {
                    tracing::debug!(url = %request.url, error = %e, "revalidation failed");
                }
            }
        });

        cached
    }

    /// Serve the cached shell document for any navigation inside the app.
    pub(super) async fn app_shell(&self) -> Response {
        let shell_url = match self.inner.settings.shell_url() {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(error = %e, "cannot resolve app shell url");
                return offline::offline_page();
            }
        };
        let shell = Request::get(shell_url);
        let key = EntryKey::for_request(&shell);

        if let Some(cached) = self.lookup(PartitionKind::Static, &key).await {
            tracing::debug!("serving app shell from cache");
            return cached;
        }

        match self.inner.fetcher.fetch(&shell).await {
            Ok(response) if response.is_success() => {
                let stored = response.stamped(self.inner.clock.now(), None);
                self.remember(PartitionKind::Static, &key, &stored).await;
                stored
            }
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(error = %e, "app shell unavailable, serving offline page");
                offline::offline_page()
            }
        }
    }

    /// Network-first into the dynamic partition.
    pub(super) async fn network_first(&self, request: &Request) -> Response {
        let key = EntryKey::for_request(request);

        match self.inner.fetcher.fetch(request).await {
            Ok(response) => {
                if response.is_success() {
                    let stored = response.clone().stamped(self.inner.clock.now(), None);
                    self.remember(PartitionKind::Dynamic, &key, &stored).await;
                }
                response
            }
            Err(e) => {
                tracing::debug!(url = %request.url, error = %e, "network failed, trying dynamic cache");
                match self.lookup(PartitionKind::Dynamic, &key).await {
                    Some(cached) => cached,
                    None => offline::not_found(offline::RESOURCE_UNAVAILABLE),
                }
            }
        }
    }

    async fn fetch_into_static(&self, request: &Request, key: &EntryKey, miss_message: &str) -> Response {
        match self.inner.fetcher.fetch(request).await {
            Ok(response) if response.is_success() => {
                let stored = response.stamped(self.inner.clock.now(), None);
                self.remember(PartitionKind::Static, key, &stored).await;
                stored
            }
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(url = %request.url, error = %e, "static fetch failed");
                offline::not_found(miss_message)
            }
        }
    }
}
