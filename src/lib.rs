pub mod config;
pub mod core;
pub mod log;
pub mod monitor;
pub mod providers;
pub mod server;
pub mod store;

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::{AppConfig, DEFAULT_COINGECKO_URL};
use crate::core::cache::PriceCache;
use crate::core::price::PriceProvider;
use crate::core::store::RuleStore;
use crate::monitor::{Monitor, MonitorConfig};
use crate::providers::CoinGeckoProvider;
use crate::server::{Broadcaster, ServerState};
use crate::store::{DiskRuleStore, MemoryPriceCache};

/// Run the alert service until a shutdown signal arrives.
pub async fn run(config_path: Option<&str>) -> Result<()> {
    info!("pricewatch starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let cache: Arc<dyn PriceCache> = Arc::new(MemoryPriceCache::new());

    let base_url = config
        .providers
        .coingecko
        .as_ref()
        .map_or(DEFAULT_COINGECKO_URL, |p| &p.base_url);
    let provider: Arc<dyn PriceProvider> = Arc::new(CoinGeckoProvider::new(
        base_url,
        &config.currency,
        config.fetch_timeout(),
    ));

    let data_path = match &config.data_path {
        Some(path) => PathBuf::from(path),
        None => AppConfig::default_data_path()?,
    };
    let store: Arc<dyn RuleStore> = Arc::new(DiskRuleStore::open(&data_path.join("rules"))?);

    let broadcaster = Arc::new(Broadcaster::default());

    let monitor = Monitor::new(
        store.clone(),
        provider,
        cache.clone(),
        broadcaster.clone(),
        MonitorConfig {
            poll_interval: config.poll_interval(),
            cache_ttl: config.cache_ttl(),
        },
    );
    tokio::spawn(async move { monitor.run().await });

    let state = ServerState {
        store,
        cache,
        broadcaster,
    };
    let app = server::router(state);
    let listener = tokio::net::TcpListener::bind(&config.server.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.listen_addr))?;
    info!(addr = %config.server.listen_addr, "listening for subscribers");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c().await.ok();
    info!("Shutdown signal received");
}
