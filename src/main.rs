//! KEVIN Community Feed — Binary Entrypoint
//! Boots the Axum proxy, the background polling feed, and the metrics
//! exporter.

use std::sync::Arc;

use tokio::sync::watch;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use kevin_community_feed::api::{create_router, AppState};
use kevin_community_feed::cache::FileStore;
use kevin_community_feed::config::FeedConfig;
use kevin_community_feed::feed::{spawn_feed, FeedOptions};
use kevin_community_feed::fetch::CommunityClient;
use kevin_community_feed::metrics::Metrics;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("kevin_community_feed=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = FeedConfig::load()?;
    let metrics = Metrics::init(cfg.cache_ttl_secs);

    // The proxy serves browsers that already waited once; give it the
    // longer timeout budget.
    let proxy_cfg = FeedConfig {
        request_timeout_secs: cfg.proxy_timeout_secs,
        ..cfg.clone()
    };
    let proxy_client = Arc::new(CommunityClient::new(
        proxy_cfg,
        Box::new(FileStore::new(cfg.cache_dir.clone())),
    )?);

    // Background feed keeps the cache warm between proxy requests.
    let feed_client = Arc::new(CommunityClient::new(
        cfg.clone(),
        Box::new(FileStore::new(cfg.cache_dir.clone())),
    )?);
    // Server-side we are always "online"; the sender is kept alive for
    // the lifetime of the process.
    let (_network_tx, network_rx) = watch::channel(true);
    let feed = spawn_feed(
        feed_client,
        FeedOptions {
            refetch_interval: std::time::Duration::from_secs(cfg.refetch_interval_secs),
            retry_count: cfg.retry_count,
            ..FeedOptions::default()
        },
        network_rx,
    );

    let router = create_router(AppState {
        client: proxy_client,
    })
    .merge(metrics.router());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8080);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!(port, depot = %cfg.depot_url, "community feed listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    feed.stop();
    Ok(())
}
