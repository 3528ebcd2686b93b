//! RPC-style proxy for FABRIC testbed operations.
//!
//! The core subsystem is [`fabric::cache::ResourceCache`]: a self-refreshing,
//! snapshot-based read cache that serves topology queries (sites, hosts,
//! facility ports, links) without blocking on the orchestrator. Tool modules
//! under [`tools`] consume snapshots and fall back to live fetches on cache
//! miss; the tool-call transport itself lives outside this crate.

pub mod auth;
pub mod config;
pub mod error;
pub mod fabric;
pub mod query;
pub mod tools;
