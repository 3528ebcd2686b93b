use clap::Parser;
use fabric_proxy::config::ServerConfig;
use fabric_proxy::error::Result;
use fabric_proxy::fabric::cache::{CacheSettings, ResourceCache};
use fabric_proxy::fabric::fetch::TopologyFetch;
use fabric_proxy::fabric::FabricApiClient;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Seconds between background cache refreshes (floor 30)
    #[arg(long)]
    refresh_interval: Option<u64>,

    /// Per-page cap for background refresh fetches (floor 100)
    #[arg(long)]
    max_fetch: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut config = ServerConfig::from_env();
    if let Some(interval) = args.refresh_interval {
        config.refresh_interval_seconds = interval;
    }
    if let Some(max) = args.max_fetch {
        config.cache_max_fetch = max;
    }

    info!(
        orchestrator = %config.orchestrator_host,
        core_api = %config.core_api_host,
        refresh_interval = config.refresh_interval_seconds,
        "starting fabric-proxy"
    );

    // Fail fast if the HTTP stack cannot be constructed at all.
    FabricApiClient::new(&config)?;

    let settings = CacheSettings::new(config.refresh_interval_seconds, config.cache_max_fetch);
    let cache = Arc::new(ResourceCache::new(settings));

    let factory_config = config.clone();
    cache
        .wire_fetch_factory(move || {
            let client = FabricApiClient::new(&factory_config)?;
            Ok(Arc::new(client) as Arc<dyn TopologyFetch>)
        })
        .await;
    cache.start().await;

    // The tool-call transport mounts TopologyTools/SliceTools/ActionTools on
    // top of this cache; the binary only manages the cache lifecycle.
    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    cache.stop().await;

    Ok(())
}
