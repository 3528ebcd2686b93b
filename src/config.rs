//! Server configuration loaded from the environment.
//!
//! Centralizes every environment variable the proxy reads so deployments can be
//! reconfigured without touching code. Cache floors are applied later by
//! [`crate::fabric::cache::CacheSettings`], not here.

use std::env;

/// Default orchestrator endpoint for the production testbed.
pub const DEFAULT_ORCHESTRATOR_HOST: &str = "orchestrator.fabric-testbed.net";
/// Default credential manager endpoint.
pub const DEFAULT_CREDMGR_HOST: &str = "cm.fabric-testbed.net";
/// Default core API endpoint (project and user info).
pub const DEFAULT_CORE_API_HOST: &str = "uis.fabric-testbed.net";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub orchestrator_host: String,
    pub credmgr_host: String,
    pub core_api_host: String,

    pub host: String,
    pub port: u16,
    pub http_debug: bool,

    /// Seconds between background cache refreshes.
    pub refresh_interval_seconds: u64,
    /// Per-page cap for background refresh fetches.
    pub cache_max_fetch: usize,
    /// Live-path fetch ceiling when a caller requests an explicit sort.
    pub max_fetch_for_sort: usize,
}

impl ServerConfig {
    /// Load configuration from environment variables with sensible defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            orchestrator_host: env_or("FABRIC_ORCHESTRATOR_HOST", DEFAULT_ORCHESTRATOR_HOST),
            credmgr_host: env_or("FABRIC_CREDMGR_HOST", DEFAULT_CREDMGR_HOST),
            core_api_host: env_or("FABRIC_CORE_API_HOST", DEFAULT_CORE_API_HOST),
            host: env_or("HOST", "0.0.0.0"),
            port: env_parsed("PORT", 8000),
            http_debug: env_parsed::<u8>("HTTP_DEBUG", 0) != 0,
            refresh_interval_seconds: env_parsed("REFRESH_INTERVAL_SECONDS", 300),
            cache_max_fetch: env_parsed("CACHE_MAX_FETCH", 5000),
            max_fetch_for_sort: env_parsed("MAX_FETCH_FOR_SORT", 5000),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
