//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (CONSTELLATION_*)
//! 2. TOML config file (if CONSTELLATION_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (CONSTELLATION_*)
/// 2. TOML config file (if CONSTELLATION_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Build version embedded in partition names (`static-v<version>`).
    ///
    /// Set via CONSTELLATION_VERSION environment variable.
    #[serde(default = "default_version")]
    pub version: String,

    /// Path to SQLite partition store.
    ///
    /// Set via CONSTELLATION_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Origin the app is served from; relative precache paths resolve against it.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Path prefix of the app, with leading and trailing slash.
    #[serde(default = "default_app_root")]
    pub app_root: String,

    /// Host whose requests are classified as API traffic.
    #[serde(default = "default_api_host")]
    pub api_host: String,

    /// CDN prefixes (`https://host/...`) or bare hosts served stale-while-revalidate.
    ///
    /// Set via CONSTELLATION_CDN_ALLOWLIST environment variable.
    #[serde(default = "default_cdn_allowlist")]
    pub cdn_allowlist: Vec<String>,

    /// Assets fetched into the static partition at install time.
    #[serde(default = "default_precache")]
    pub precache: Vec<String>,

    /// Lifetime of API entries in seconds.
    #[serde(default = "default_api_ttl_secs")]
    pub api_ttl_secs: u64,

    /// Interval of the expired-entry sweep in seconds; 0 disables the timer.
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via CONSTELLATION_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum bytes to fetch per request.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Base URL of the GitHub REST API.
    #[serde(default = "default_github_base_url")]
    pub github_base_url: String,

    /// Account whose repositories make up the constellation.
    ///
    /// Set via CONSTELLATION_GITHUB_USERNAME environment variable.
    #[serde(default = "default_github_username")]
    pub github_username: String,

    /// Optional token sent as a bearer credential to raise the rate limit.
    ///
    /// Set via CONSTELLATION_GITHUB_TOKEN environment variable.
    #[serde(default)]
    pub github_token: Option<String>,
}

fn default_version() -> String {
    env!("CARGO_PKG_VERSION").into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./constellation-cache.sqlite")
}

fn default_origin() -> String {
    "https://welshdog.github.io".into()
}

fn default_app_root() -> String {
    "/ULTIMATE-HYPERFOCUS-CONSTELLATION/".into()
}

fn default_api_host() -> String {
    "api.github.com".into()
}

fn default_cdn_allowlist() -> Vec<String> {
    vec!["https://cdnjs.cloudflare.com".into()]
}

fn default_precache() -> Vec<String> {
    [
        "/ULTIMATE-HYPERFOCUS-CONSTELLATION/",
        "/ULTIMATE-HYPERFOCUS-CONSTELLATION/index.html",
        "/ULTIMATE-HYPERFOCUS-CONSTELLATION/ultimate_hyperfocus_constellation.js",
        "/ULTIMATE-HYPERFOCUS-CONSTELLATION/github-api-manager.js",
        "/ULTIMATE-HYPERFOCUS-CONSTELLATION/research-mode-manager.js",
        "/ULTIMATE-HYPERFOCUS-CONSTELLATION/onboarding-manager.js",
        "/ULTIMATE-HYPERFOCUS-CONSTELLATION/manifest.json",
        "https://cdnjs.cloudflare.com/ajax/libs/three.js/r128/three.min.js",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_api_ttl_secs() -> u64 {
    300
}

fn default_cleanup_interval_secs() -> u64 {
    3600
}

fn default_user_agent() -> String {
    "constellation/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_github_base_url() -> String {
    "https://api.github.com".into()
}

fn default_github_username() -> String {
    "welshDog".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            db_path: default_db_path(),
            origin: default_origin(),
            app_root: default_app_root(),
            api_host: default_api_host(),
            cdn_allowlist: default_cdn_allowlist(),
            precache: default_precache(),
            api_ttl_secs: default_api_ttl_secs(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            github_base_url: default_github_base_url(),
            github_username: default_github_username(),
            github_token: None,
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// API entry lifetime.
    pub fn api_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.api_ttl_secs as i64)
    }

    /// Sweep interval, or `None` when the timer is disabled.
    pub fn cleanup_interval(&self) -> Option<Duration> {
        (self.cleanup_interval_secs > 0).then(|| Duration::from_secs(self.cleanup_interval_secs))
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `CONSTELLATION_`
    /// 2. TOML file from `CONSTELLATION_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("CONSTELLATION_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("CONSTELLATION_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
