//! Client code for the constellation cache router.
//!
//! This crate provides the network fetch pipeline, the offline cache router,
//! and the GitHub repository client shared by the server and CLI.

pub mod fetch;
pub mod github;
pub mod router;

pub use fetch::{FetchConfig, Fetcher, HttpFetcher};
pub use github::{Category, GithubClient, GithubConfig, GithubError, RateLimitStatus, Repository, RepositoryDetails};
pub use router::{
    CacheRouter, CacheStatus, ClickOutcome, ControlMessage, ControlReply, RequestClass, RouterSettings, SyncOutcome,
    WorkerState,
};
