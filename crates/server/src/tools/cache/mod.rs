//! Cache-related MCP tools.
//!
//! This module provides tools for inspecting and pruning the partitions.

pub mod purge;
pub mod status;

pub use purge::{CachePurgeParams, PurgeScope, purge_impl};
pub use status::status_impl;
