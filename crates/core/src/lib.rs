//! Core types and shared functionality for the constellation cache router.
//!
//! This crate provides:
//! - Partition store trait with a SQLite backend
//! - Request/response model shared by the router and its hosts
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod http;

pub use cache::{CacheDb, EntryKey, PartitionStats, PartitionStore};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use http::{Method, Request, Response};
