//! Versioned cache partitions backed by SQLite.
//!
//! This module provides the partition store the router writes through,
//! with async access via tokio-rusqlite. It supports:
//!
//! - Named partitions (`static-v1`, `api-v1`, ...) created on demand
//! - Entries keyed by a SHA-256 digest of method and URL
//! - Automatic schema migrations
//! - WAL mode for concurrent access

pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;
pub mod partitions;
pub mod store;

pub use crate::Error;

pub use connection::CacheDb;
pub use store::{EntryKey, PartitionStats, PartitionStore};
