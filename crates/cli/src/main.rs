//! `constellation` command-line host.
//!
//! Drives the cache router against the configured SQLite store and prints
//! JSON on stdout. Logs go to stderr.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use constellation_client::fetch::resolve;
use constellation_client::{CacheRouter, FetchConfig, Fetcher, GithubClient, GithubConfig, HttpFetcher, RouterSettings};
use constellation_core::{AppConfig, CacheDb, Method, Request};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "constellation", about = "Offline cache router for the repository constellation", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch every precache asset into the static partition
    Install,
    /// Install, then drop partitions left by other versions
    Activate,
    /// Entry counts and sizes per partition
    Status,
    /// Delete every partition
    Clear,
    /// Delete expired api entries
    Cleanup,
    /// Send one request through the router
    Fetch(FetchArgs),
    /// List repositories for the configured account
    Repos,
    /// Details for one repository
    Details(DetailsArgs),
    /// Run a background sync tag
    Sync(SyncArgs),
}

#[derive(Args)]
struct FetchArgs {
    /// Absolute URL, or a path on the app origin
    url: String,
    /// HTTP method
    #[arg(short, long, default_value = "GET")]
    method: String,
}

#[derive(Args)]
struct DetailsArgs {
    /// Repository name
    name: String,
}

#[derive(Args)]
struct SyncArgs {
    /// Sync tag, e.g. github-data-sync
    tag: String,
}

#[derive(Serialize)]
struct FetchOutput {
    url: String,
    intercepted: bool,
    status: u16,
    status_text: String,
    headers: BTreeMap<String, String>,
    body: String,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn open_router(config: &AppConfig) -> Result<CacheRouter> {
    let store = CacheDb::open(&config.db_path)
        .await
        .with_context(|| format!("opening cache store at {}", config.db_path.display()))?;
    let fetcher = HttpFetcher::new(FetchConfig::from_app_config(config))?;
    Ok(CacheRouter::new(RouterSettings::from_config(config)?, Arc::new(store), Arc::new(fetcher)))
}

async fn run(cli: Cli, config: AppConfig) -> Result<()> {
    let router = open_router(&config).await?;

    match cli.command {
        Commands::Install => {
            let assets = router.install().await?;
            print_json(&serde_json::json!({ "assets": assets, "state": router.state() }))?;
        }
        Commands::Activate => {
            router.install().await?;
            let report = router.activate().await?;
            print_json(&report)?;
        }
        Commands::Status => print_json(&router.status().await?)?,
        Commands::Clear => {
            let deleted = router.clear_all().await?;
            print_json(&serde_json::json!({ "success": true, "deleted": deleted }))?;
        }
        Commands::Cleanup => {
            let removed = router.cleanup_expired().await?;
            print_json(&serde_json::json!({ "removed": removed }))?;
        }
        Commands::Fetch(FetchArgs { url, method }) => {
            let method: Method = method.parse()?;
            let url = resolve(&router.settings().origin, &url).with_context(|| format!("bad url {url}"))?;
            let request = Request::new(method, url);

            let (intercepted, response) = match router.handle_fetch(&request).await {
                Some(response) => (true, response),
                None => (false, router.fetch(&request).await?),
            };
            router.settle().await;

            print_json(&FetchOutput {
                url: request.url.to_string(),
                intercepted,
                body: response.text().into_owned(),
                status: response.status,
                status_text: response.status_text,
                headers: response.headers,
            })?;
        }
        Commands::Repos => {
            let github = GithubClient::new(Arc::new(router.clone()), GithubConfig::from_app_config(&config));
            print_json(&github.fetch_repositories().await)?;
        }
        Commands::Details(DetailsArgs { name }) => {
            let github = GithubClient::new(Arc::new(router.clone()), GithubConfig::from_app_config(&config));
            print_json(&github.try_repository_details(&name).await?)?;
        }
        Commands::Sync(SyncArgs { tag }) => {
            let outcome = router.handle_sync(&tag).await;
            print_json(&serde_json::json!({ "tag": tag, "outcome": outcome }))?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load()?;
    run(cli, config).await
}
