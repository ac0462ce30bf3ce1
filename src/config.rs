// src/config.rs
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

use crate::types::CommunityStats;

const ENV_PATH: &str = "COMMUNITY_CONFIG_PATH";
const DEFAULT_PATH: &str = "config/community.toml";

/// Pipeline configuration with reference defaults.
///
/// The placeholder stats are best-effort values observed on the depot at
/// one point in time; they are configuration, not logic, and are only used
/// when every extraction strategy comes up empty.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Upstream community gallery page.
    pub depot_url: String,
    /// Hard timeout for the programmatic client, seconds.
    pub request_timeout_secs: u64,
    /// Hard timeout for the server-side proxy client, seconds.
    pub proxy_timeout_secs: u64,
    /// Cache entry time-to-live, seconds.
    pub cache_ttl_secs: u64,
    /// Recurring refresh interval, seconds.
    pub refetch_interval_secs: u64,
    /// Additional attempts after the first failure.
    pub retry_count: u32,
    pub max_images: usize,
    pub max_videos: usize,
    pub max_gifs: usize,
    /// Directory the file-backed cache store writes under.
    pub cache_dir: PathBuf,
    /// Serve the bundled static dataset when both the live fetch and the
    /// cache come up empty.
    pub fallback_enabled: bool,
    pub default_stats: CommunityStats,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            depot_url: "https://memedepot.com/d/kevin-depot".to_string(),
            request_timeout_secs: 10,
            proxy_timeout_secs: 15,
            cache_ttl_secs: 300,
            refetch_interval_secs: 300,
            retry_count: 2,
            max_images: 10,
            max_videos: 5,
            max_gifs: 3,
            cache_dir: PathBuf::from("cache"),
            fallback_enabled: true,
            default_stats: CommunityStats {
                total_memes: 133,
                total_videos: 23,
                total_gifs: 12,
                total_images: 98,
                total_views: 904,
                total_artists: 12,
            },
        }
    }
}

/// On-disk shape: every field optional, merged over the defaults.
#[derive(Debug, Default, Deserialize)]
struct FileOverrides {
    depot_url: Option<String>,
    request_timeout_secs: Option<u64>,
    proxy_timeout_secs: Option<u64>,
    cache_ttl_secs: Option<u64>,
    refetch_interval_secs: Option<u64>,
    retry_count: Option<u32>,
    max_images: Option<usize>,
    max_videos: Option<usize>,
    max_gifs: Option<usize>,
    cache_dir: Option<PathBuf>,
    fallback_enabled: Option<bool>,
}

impl FeedConfig {
    /// Load configuration using env var + fallbacks:
    /// 1) $COMMUNITY_CONFIG_PATH
    /// 2) config/community.toml
    /// 3) built-in defaults
    ///
    /// Environment variables override whatever the file provided.
    pub fn load() -> Result<Self> {
        let mut cfg = if let Ok(p) = env::var(ENV_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("COMMUNITY_CONFIG_PATH points to non-existent path"));
            }
            Self::from_file(&pb)?
        } else {
            let default_p = PathBuf::from(DEFAULT_PATH);
            if default_p.exists() {
                Self::from_file(&default_p)?
            } else {
                Self::default()
            }
        };
        cfg.apply_env();
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let overrides: FileOverrides = toml::from_str(&content)
            .with_context(|| format!("parsing config from {}", path.display()))?;
        let mut cfg = Self::default();
        cfg.merge(overrides);
        Ok(cfg)
    }

    fn merge(&mut self, o: FileOverrides) {
        macro_rules! take {
            ($field:ident) => {
                if let Some(v) = o.$field {
                    self.$field = v;
                }
            };
        }
        take!(depot_url);
        take!(request_timeout_secs);
        take!(proxy_timeout_secs);
        take!(cache_ttl_secs);
        take!(refetch_interval_secs);
        take!(retry_count);
        take!(max_images);
        take!(max_videos);
        take!(max_gifs);
        take!(cache_dir);
        take!(fallback_enabled);
    }

    fn apply_env(&mut self) {
        if let Ok(url) = env::var("COMMUNITY_DEPOT_URL") {
            if !url.trim().is_empty() {
                self.depot_url = url;
            }
        }
        if let Some(v) = env_u64("COMMUNITY_REQUEST_TIMEOUT_SECS") {
            self.request_timeout_secs = v;
        }
        if let Some(v) = env_u64("COMMUNITY_CACHE_TTL_SECS") {
            self.cache_ttl_secs = v;
        }
        if let Some(v) = env_u64("COMMUNITY_REFETCH_INTERVAL_SECS") {
            self.refetch_interval_secs = v;
        }
        if let Some(v) = env_u64("COMMUNITY_RETRY_COUNT") {
            self.retry_count = v as u32;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.depot_url.trim().is_empty() {
            return Err(anyhow!("depot_url must not be empty"));
        }
        if self.request_timeout_secs == 0 || self.proxy_timeout_secs == 0 {
            return Err(anyhow!("timeouts must be at least 1 second"));
        }
        if self.max_images == 0 && self.max_videos == 0 && self.max_gifs == 0 {
            return Err(anyhow!("at least one content cap must be non-zero"));
        }
        Ok(())
    }
}

fn env_u64(key: &str) -> Option<u64> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}
