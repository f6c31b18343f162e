//! constellation-mcp server entry point.
//!
//! Boots the cache router (install, then activate) and serves it over the MCP
//! stdio transport. Logging goes to stderr to avoid interfering with the
//! JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use constellation_client::{CacheRouter, FetchConfig, GithubClient, GithubConfig, HttpFetcher, RouterSettings};
use constellation_core::{AppConfig, CacheDb};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(
        version = %config.version,
        db = %config.db_path.display(),
        "Starting constellation-mcp on stdio transport"
    );

    let store = Arc::new(CacheDb::open(&config.db_path).await?);
    let fetcher = Arc::new(HttpFetcher::new(FetchConfig::from_app_config(&config))?);
    let router = CacheRouter::new(RouterSettings::from_config(&config)?, store, fetcher);

    match router.install().await {
        Ok(assets) => {
            let report = router.activate().await?;
            tracing::info!(assets, deleted = ?report.deleted, "router activated");
        }
        Err(e) => tracing::error!(error = %e, "install failed, serving without activation"),
    }

    let cleanup = config.cleanup_interval().map(|interval| router.spawn_cleanup(interval));

    let github = GithubClient::new(Arc::new(router.clone()), GithubConfig::from_app_config(&config));
    let handler = handler::ConstellationServer::new(router, github);
    let server = serve_server(handler, stdio()).await?;

    server.waiting().await?;

    if let Some(cleanup) = cleanup {
        cleanup.abort();
    }

    Ok(())
}
