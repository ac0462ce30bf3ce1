// src/cache.rs
//! Durable single-entry cache of the most recent successful payload.
//!
//! The storage backend sits behind a trait so tests run on an in-memory
//! map and an asynchronous remote store can drop in later. `put` and
//! `clear` swallow storage failures (log-and-continue); a cache problem
//! must never fail the fetch that triggered it.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::CommunityData;

/// Well-known key the single community entry lives under.
pub const CACHE_KEY: &str = "kevin_community_data";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub data: CommunityData,
    /// Unix epoch millis at write time.
    pub timestamp: u64,
}

#[async_trait]
pub trait StorageBackend: Send + Sync {
    async fn read(&self, key: &str) -> Result<Option<String>>;
    async fn write(&self, key: &str, value: &str) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
}

/// File-per-key JSON store under a directory.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

#[async_trait]
impl StorageBackend for FileStore {
    async fn read(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("reading cache entry {}", path.display()))?;
        Ok(Some(content))
    }

    async fn write(&self, key: &str, value: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating cache dir {}", self.dir.display()))?;
        let path = self.path_for(key);
        std::fs::write(&path, value)
            .with_context(|| format!("writing cache entry {}", path.display()))
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("removing cache entry {}", path.display())),
        }
    }
}

/// In-memory backend for tests and embedded use.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl StorageBackend for MemoryStore {
    async fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.inner.lock().expect("store mutex poisoned").get(key).cloned())
    }

    async fn write(&self, key: &str, value: &str) -> Result<()> {
        self.inner
            .lock()
            .expect("store mutex poisoned")
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.inner.lock().expect("store mutex poisoned").remove(key);
        Ok(())
    }
}

pub struct CacheStore {
    backend: Box<dyn StorageBackend>,
    ttl_ms: u64,
}

impl CacheStore {
    pub fn new(backend: Box<dyn StorageBackend>, ttl_secs: u64) -> Self {
        Self {
            backend,
            ttl_ms: ttl_secs * 1000,
        }
    }

    /// Store `data` with the given write time. Storage failure is a no-op.
    pub async fn put(&self, data: &CommunityData, now_ms: u64) {
        let entry = CacheEntry {
            data: data.clone(),
            timestamp: now_ms,
        };
        let serialized = match serde_json::to_string(&entry) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(error = ?e, "cache entry serialization failed");
                return;
            }
        };
        if let Err(e) = self.backend.write(CACHE_KEY, &serialized).await {
            tracing::warn!(error = ?e, "cache write failed");
        }
    }

    /// Read the entry; expired or unreadable entries are deleted and
    /// reported as absent.
    pub async fn get(&self, now_ms: u64) -> Option<CacheEntry> {
        let raw = match self.backend.read(CACHE_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(error = ?e, "cache read failed");
                return None;
            }
        };
        let entry: CacheEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = ?e, "cache entry corrupt, discarding");
                self.clear().await;
                return None;
            }
        };
        if now_ms.saturating_sub(entry.timestamp) > self.ttl_ms {
            tracing::debug!("cache entry expired, discarding");
            self.clear().await;
            return None;
        }
        Some(entry)
    }

    pub async fn clear(&self) {
        if let Err(e) = self.backend.remove(CACHE_KEY).await {
            tracing::warn!(error = ?e, "cache clear failed");
        }
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_ms / 1000
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FeedConfig;
    use crate::types::CommunityData;

    fn sample() -> CommunityData {
        CommunityData {
            stats: FeedConfig::default().default_stats,
            featured: Vec::new(),
            depot_url: "https://memedepot.com/d/kevin-depot".into(),
            last_updated: "2025-01-01T00:00:00+00:00".into(),
            data_source: "test".into(),
        }
    }

    fn store() -> CacheStore {
        CacheStore::new(Box::new(MemoryStore::default()), 300)
    }

    #[tokio::test]
    async fn round_trips_within_ttl() {
        let cache = store();
        cache.put(&sample(), 1_000).await;
        let entry = cache.get(2_000).await.expect("entry present");
        assert_eq!(entry.data, sample());
        assert_eq!(entry.timestamp, 1_000);
    }

    #[tokio::test]
    async fn expires_past_ttl_and_deletes() {
        let cache = store();
        cache.put(&sample(), 1_000).await;
        // 300s TTL: one millisecond past the boundary is gone.
        assert!(cache.get(1_000 + 300_000 + 1).await.is_none());
        // The expired entry was deleted, not merely hidden.
        assert!(cache.get(1_000).await.is_none());
    }

    #[tokio::test]
    async fn boundary_is_inclusive() {
        let cache = store();
        cache.put(&sample(), 1_000).await;
        assert!(cache.get(1_000 + 300_000).await.is_some());
    }

    #[tokio::test]
    async fn clear_removes_unconditionally() {
        let cache = store();
        cache.put(&sample(), 1_000).await;
        cache.clear().await;
        assert!(cache.get(1_001).await.is_none());
    }

    #[tokio::test]
    async fn corrupt_entry_is_discarded() {
        let backend = MemoryStore::default();
        backend.write(CACHE_KEY, "{not json").await.unwrap();
        let cache = CacheStore::new(Box::new(backend), 300);
        assert!(cache.get(0).await.is_none());
    }
}
