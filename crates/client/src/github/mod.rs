//! GitHub repository client.
//!
//! Supplies the repository records the constellation draws, fetched through
//! any [`Fetcher`] (normally the [`CacheRouter`](crate::CacheRouter), so API
//! responses land in the api partition and survive short outages).
//!
//! ### Behaviour
//!
//! - **Endpoints**: `/users/{user}/repos?per_page=100&sort=updated`,
//!   `/repos/{user}/{name}`, `/repos/{user}/{name}/languages`,
//!   `/repos/{user}/{name}/commits?per_page=1`.
//! - **Headers**: `Accept: application/vnd.github.v3+json`, the configured
//!   User-Agent, and `Authorization: Bearer` when a token is set.
//! - **Rate limiting**: requests run one at a time in arrival order, at least
//!   100 ms apart. When `X-RateLimit-Remaining` drops to 1 or below, the next
//!   request waits until `X-RateLimit-Reset`.
//! - **Memoization**: listings and details are kept in memory for the cache
//!   TTL (5 minutes by default).
//! - **Fallback**: a failed listing returns the built-in repository list; a
//!   failed detail lookup returns `None`.

pub mod error;
pub mod response;

pub use error::GithubError;
pub use response::{
    ApiRepository, Category, Position, Repository, RepositoryDetails, activity_score, fallback_repositories,
    transform_repositories,
};

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::time::Instant;
use url::Url;

use constellation_core::{AppConfig, Clock, Request, Response, SystemClock};

use crate::fetch::Fetcher;

/// Default base URL for the GitHub REST API.
const DEFAULT_BASE_URL: &str = "https://api.github.com";

/// Minimum interval between requests.
const MIN_REQUEST_INTERVAL: Duration = Duration::from_millis(100);

/// Unauthenticated hourly allowance, assumed until the first response says otherwise.
const DEFAULT_RATE_LIMIT: u32 = 60;

const ACCEPT: &str = "application/vnd.github.v3+json";

/// GitHub client configuration.
#[derive(Debug, Clone)]
pub struct GithubConfig {
    /// Base URL (default: https://api.github.com).
    pub base_url: String,
    /// Account whose repositories are listed.
    pub username: String,
    /// User-agent string.
    pub user_agent: String,
    /// Optional bearer token.
    pub token: Option<String>,
    /// How long listings and details are memoized.
    pub cache_ttl: chrono::Duration,
    /// Minimum spacing between requests.
    pub min_interval: Duration,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            username: "welshDog".to_string(),
            user_agent: "constellation/0.1".to_string(),
            token: None,
            cache_ttl: chrono::Duration::minutes(5),
            min_interval: MIN_REQUEST_INTERVAL,
        }
    }
}

impl GithubConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            base_url: config.github_base_url.clone(),
            username: config.github_username.clone(),
            user_agent: config.user_agent.clone(),
            token: config.github_token.clone().filter(|t| !t.is_empty()),
            cache_ttl: config.api_ttl(),
            ..Default::default()
        }
    }
}

/// Snapshot of the rate limit as last reported by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitStatus {
    pub remaining: u32,
    pub reset: DateTime<Utc>,
    /// Milliseconds until the reset instant, 0 if it has passed.
    pub wait_time: u64,
}

#[derive(Debug, Clone, Copy)]
struct Budget {
    remaining: u32,
    reset: DateTime<Utc>,
}

/// FIFO request gate. `tokio::sync::Mutex` queues waiters in arrival order,
/// and the guard is held for the whole request.
#[derive(Debug)]
struct RateLimiter {
    last_request: tokio::sync::Mutex<Option<Instant>>,
    budget: Mutex<Budget>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval: Duration, now: DateTime<Utc>) -> Self {
        Self {
            last_request: tokio::sync::Mutex::new(None),
            budget: Mutex::new(Budget { remaining: DEFAULT_RATE_LIMIT, reset: now }),
            min_interval,
        }
    }

    fn budget(&self) -> Budget {
        *self.budget.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Time to hold off because the allowance is exhausted.
    fn exhausted_wait(&self, now: DateTime<Utc>) -> Option<Duration> {
        let budget = self.budget();
        if budget.remaining <= 1 && now < budget.reset {
            (budget.reset - now).to_std().ok()
        } else {
            None
        }
    }

    /// Record the rate limit headers of a response, when present.
    fn observe(&self, response: &Response) {
        let remaining = response.header("x-ratelimit-remaining").and_then(|v| v.trim().parse::<u32>().ok());
        let reset = response
            .header("x-ratelimit-reset")
            .and_then(|v| v.trim().parse::<i64>().ok())
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single());

        let mut budget = self.budget.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(remaining) = remaining {
            budget.remaining = remaining;
        }
        if let Some(reset) = reset {
            budget.reset = reset;
        }
    }
}

#[derive(Debug)]
struct Memo<T> {
    entries: Mutex<HashMap<String, (DateTime<Utc>, T)>>,
    ttl: chrono::Duration,
}

impl<T: Clone> Memo<T> {
    fn new(ttl: chrono::Duration) -> Self {
        Self { entries: Mutex::new(HashMap::new()), ttl }
    }

    fn get(&self, key: &str, now: DateTime<Utc>) -> Option<T> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(key).filter(|(at, _)| now - *at < self.ttl).map(|(_, value)| value.clone())
    }

    fn put(&self, key: String, now: DateTime<Utc>, value: T) {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).insert(key, (now, value));
    }
}

/// GitHub repository client.
#[derive(Clone)]
pub struct GithubClient {
    fetcher: Arc<dyn Fetcher>,
    config: GithubConfig,
    clock: Arc<dyn Clock>,
    limiter: Arc<RateLimiter>,
    repositories: Arc<Memo<Vec<Repository>>>,
    details: Arc<Memo<RepositoryDetails>>,
}

impl fmt::Debug for GithubClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GithubClient")
            .field("base_url", &self.config.base_url)
            .field("username", &self.config.username)
            .finish_non_exhaustive()
    }
}

impl GithubClient {
    pub fn new(fetcher: Arc<dyn Fetcher>, config: GithubConfig) -> Self {
        Self::with_clock(fetcher, config, Arc::new(SystemClock))
    }

    pub fn with_clock(fetcher: Arc<dyn Fetcher>, config: GithubConfig, clock: Arc<dyn Clock>) -> Self {
        let limiter = Arc::new(RateLimiter::new(config.min_interval, clock.now()));
        Self {
            repositories: Arc::new(Memo::new(config.cache_ttl)),
            details: Arc::new(Memo::new(config.cache_ttl)),
            fetcher,
            config,
            clock,
            limiter,
        }
    }

    pub fn config(&self) -> &GithubConfig {
        &self.config
    }

    /// The user's repositories, or the built-in fallback list if they cannot be fetched.
    pub async fn fetch_repositories(&self) -> Vec<Repository> {
        let key = format!("user_repos_{}", self.config.username);
        if let Some(cached) = self.repositories.get(&key, self.clock.now()) {
            tracing::debug!(count = cached.len(), "using memoized repository list");
            return cached;
        }

        match self.try_fetch_repositories().await {
            Ok(repos) => {
                tracing::info!(count = repos.len(), "fetched repositories");
                self.repositories.put(key, self.clock.now(), repos.clone());
                repos
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to fetch repositories, using fallback");
                fallback_repositories(self.clock.now())
            }
        }
    }

    /// Like [`fetch_repositories`](Self::fetch_repositories) but without memo or fallback.
    pub async fn try_fetch_repositories(&self) -> Result<Vec<Repository>, GithubError> {
        let path = format!("/users/{}/repos?per_page=100&sort=updated", self.config.username);
        let raw: Vec<ApiRepository> = self.get_json(&path).await?;
        Ok(transform_repositories(raw, &self.config.username, self.clock.now()))
    }

    /// Repository enriched with languages, latest commit, and activity score.
    /// `None` when any of the three lookups fails.
    pub async fn repository_details(&self, name: &str) -> Option<RepositoryDetails> {
        let key = format!("repo_details_{name}");
        if let Some(cached) = self.details.get(&key, self.clock.now()) {
            return Some(cached);
        }

        match self.try_repository_details(name).await {
            Ok(details) => {
                self.details.put(key, self.clock.now(), details.clone());
                Some(details)
            }
            Err(e) => {
                tracing::warn!(repository = name, error = %e, "could not fetch repository details");
                None
            }
        }
    }

    pub async fn try_repository_details(&self, name: &str) -> Result<RepositoryDetails, GithubError> {
        validate_name(name)?;
        let base = format!("/repos/{}/{name}", self.config.username);
        let languages_path = format!("{base}/languages");
        let commits_path = format!("{base}/commits?per_page=1");

        let (repository, languages, commits) = tokio::try_join!(
            self.get_json::<serde_json::Map<String, serde_json::Value>>(&base),
            self.get_json::<BTreeMap<String, u64>>(&languages_path),
            self.get_json::<Vec<serde_json::Value>>(&commits_path),
        )?;

        let parsed: ApiRepository = serde_json::from_value(serde_json::Value::Object(repository.clone()))?;
        let activity = activity_score(&parsed, self.clock.now());

        Ok(RepositoryDetails { repository, languages, last_commit: commits.into_iter().next(), activity })
    }

    pub fn rate_limit_status(&self) -> RateLimitStatus {
        let budget = self.limiter.budget();
        let now = self.clock.now();
        let wait_time = (budget.reset - now).num_milliseconds().max(0) as u64;
        RateLimitStatus { remaining: budget.remaining, reset: budget.reset, wait_time }
    }

    fn request_for(&self, path: &str) -> Result<Request, GithubError> {
        let raw = format!("{}{path}", self.config.base_url.trim_end_matches('/'));
        let url = Url::parse(&raw).map_err(|e| GithubError::InvalidUrl(format!("{raw}: {e}")))?;

        let mut request =
            Request::get(url).with_header("accept", ACCEPT).with_header("user-agent", &self.config.user_agent);
        if let Some(token) = &self.config.token {
            request = request.with_header("authorization", format!("Bearer {token}"));
        }
        Ok(request)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, GithubError> {
        let request = self.request_for(path)?;

        let response = {
            let mut last = self.limiter.last_request.lock().await;

            if let Some(wait) = self.limiter.exhausted_wait(self.clock.now()) {
                tracing::info!(wait_ms = wait.as_millis() as u64, "rate limit reached, waiting for reset");
                tokio::time::sleep(wait).await;
            }
            if let Some(previous) = *last {
                let elapsed = previous.elapsed();
                if elapsed < self.limiter.min_interval {
                    tokio::time::sleep(self.limiter.min_interval - elapsed).await;
                }
            }

            tracing::debug!(url = %request.url, "github request");
            let result = self.fetcher.fetch(&request).await;
            *last = Some(Instant::now());
            result?
        };

        self.limiter.observe(&response);

        if !response.is_success() {
            let message = response
                .json::<serde_json::Value>()
                .ok()
                .and_then(|body| body.get("message").and_then(|m| m.as_str()).map(str::to_string))
                .unwrap_or_else(|| "No error body.".to_string());
            return Err(GithubError::Http { status: response.status, status_text: response.status_text, message });
        }

        Ok(response.json()?)
    }
}

fn validate_name(name: &str) -> Result<(), GithubError> {
    let valid = !name.is_empty()
        && name != "."
        && name != ".."
        && name.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid { Ok(()) } else { Err(GithubError::InvalidName(name.to_string())) }
}
