// src/fetch.rs
//! The fetch client: one logical "get community data" operation that
//! always resolves to a [`FetchResult`], never an `Err` and never a panic.
//!
//! Recovery order on any failure: non-expired cache entry, then the
//! bundled static dataset, then a bare error result. Retry policy does not
//! live here; the polling feed owns it.

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::{counter, describe_counter, describe_gauge, gauge};
use once_cell::sync::OnceCell;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE};

use crate::cache::{CacheStore, StorageBackend};
use crate::config::FeedConfig;
use crate::extract;
use crate::fallback;
use crate::types::{CommunityData, FetchError, FetchResult};

const USER_AGENT: &str = "KevinCommunityFeed/0.1 (+https://kevindepot.org)";

/// Anything the polling feed can drive. Split out so tests substitute
/// scripted fetchers for the real client.
#[async_trait]
pub trait CommunityFetcher: Send + Sync {
    async fn fetch(&self) -> FetchResult<CommunityData>;
    async fn clear_cache(&self) {}
}

pub struct CommunityClient {
    http: reqwest::Client,
    cache: CacheStore,
    cfg: FeedConfig,
}

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("feed_fetch_total", "Live depot fetch attempts.");
        describe_counter!("feed_fetch_errors_total", "Live depot fetch failures.");
        describe_counter!("feed_cache_hits_total", "Failures recovered from the cache.");
        describe_counter!("feed_fallback_total", "Failures served from the bundled dataset.");
        describe_gauge!("feed_last_success_ts", "Unix ts of the last successful live fetch.");
    });
}

impl CommunityClient {
    pub fn new(cfg: FeedConfig, backend: Box<dyn StorageBackend>) -> Result<Self> {
        ensure_metrics_described();
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.request_timeout_secs))
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .context("building http client")?;
        let cache = CacheStore::new(backend, cfg.cache_ttl_secs);
        Ok(Self { http, cache, cfg })
    }

    pub fn config(&self) -> &FeedConfig {
        &self.cfg
    }

    async fn fetch_live(&self, now_ms: u64) -> Result<CommunityData, FetchError> {
        let response = self
            .http
            .get(&self.cfg.depot_url)
            .header(ACCEPT, "text/html,application/xhtml+xml")
            .header(ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::http(status.as_u16()));
        }

        let body = response.text().await.map_err(classify)?;
        Ok(extract::extract_community_data(&body, &self.cfg, now_ms))
    }

    async fn recover(&self, error: FetchError, started: Instant) -> FetchResult<CommunityData> {
        let now = now_ms();
        if let Some(entry) = self.cache.get(now).await {
            tracing::info!(code = %error.code, "live fetch failed, serving cached payload");
            counter!("feed_cache_hits_total").increment(1);
            return FetchResult::cached(
                entry.data,
                error,
                now,
                elapsed_ms(started),
                entry.timestamp,
            );
        }
        if self.cfg.fallback_enabled {
            tracing::info!(code = %error.code, "cache empty, serving bundled fallback");
            counter!("feed_fallback_total").increment(1);
            let data = fallback::community_fallback(&self.cfg, rfc3339_now());
            return FetchResult::fallback(data, error, now, elapsed_ms(started));
        }
        FetchResult::failure(error, now, elapsed_ms(started))
    }
}

#[async_trait]
impl CommunityFetcher for CommunityClient {
    async fn fetch(&self) -> FetchResult<CommunityData> {
        let started = Instant::now();
        let now = now_ms();
        counter!("feed_fetch_total").increment(1);

        match self.fetch_live(now).await {
            Ok(data) => {
                // Fire-and-forget: a cache-write failure is logged inside
                // and must not affect the result.
                self.cache.put(&data, now).await;
                gauge!("feed_last_success_ts").set((now / 1000) as f64);
                FetchResult::live(data, now, elapsed_ms(started))
            }
            Err(error) => {
                tracing::warn!(code = %error.code, message = %error.message, "live fetch failed");
                counter!("feed_fetch_errors_total").increment(1);
                self.recover(error, started).await
            }
        }
    }

    async fn clear_cache(&self) {
        self.cache.clear().await;
    }
}

/// Deterministic mapping from a transport error to the taxonomy.
fn classify(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::timeout(format!("request timed out: {err}"));
    }
    if let Some(status) = err.status() {
        return FetchError::http(status.as_u16());
    }
    if err.is_connect() || err.is_request() || err.is_body() {
        return FetchError::network(format!("network failure: {err}"));
    }
    FetchError::unknown(err.to_string())
}

pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

fn rfc3339_now() -> String {
    chrono::Utc::now().to_rfc3339()
}
