// tests/cache_store.rs
//! Cache round-trip and expiry against the file-backed store.

use kevin_community_feed::cache::{CacheStore, FileStore, MemoryStore, StorageBackend};
use kevin_community_feed::config::FeedConfig;
use kevin_community_feed::fallback;

const TTL_SECS: u64 = 300;

fn sample() -> kevin_community_feed::CommunityData {
    fallback::community_fallback(&FeedConfig::default(), "2025-06-01T00:00:00+00:00".into())
}

#[tokio::test]
async fn file_store_round_trips_across_instances() {
    let dir = tempfile::tempdir().unwrap();

    let cache = CacheStore::new(Box::new(FileStore::new(dir.path())), TTL_SECS);
    cache.put(&sample(), 10_000).await;

    // A second store over the same directory sees the entry: the cache is
    // shared process-wide, not per-instance.
    let other = CacheStore::new(Box::new(FileStore::new(dir.path())), TTL_SECS);
    let entry = other.get(20_000).await.expect("entry visible to second store");
    assert_eq!(entry.data, sample());
    assert_eq!(entry.timestamp, 10_000);
}

#[tokio::test]
async fn file_store_expiry_deletes_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let cache = CacheStore::new(Box::new(FileStore::new(dir.path())), TTL_SECS);
    cache.put(&sample(), 0).await;

    let past_ttl = TTL_SECS * 1000 + 1;
    assert!(cache.get(past_ttl).await.is_none());

    // Deleted on expiry: even a reader with an earlier clock finds nothing.
    assert!(cache.get(0).await.is_none());
    let backend = FileStore::new(dir.path());
    assert!(backend
        .read(kevin_community_feed::cache::CACHE_KEY)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn put_overwrites_prior_entry() {
    let cache = CacheStore::new(Box::new(MemoryStore::default()), TTL_SECS);
    let mut first = sample();
    first.data_source = "first".into();
    cache.put(&first, 1_000).await;
    cache.put(&sample(), 2_000).await;

    let entry = cache.get(2_500).await.unwrap();
    assert_eq!(entry.timestamp, 2_000);
    assert_eq!(entry.data.data_source, sample().data_source);
}

#[tokio::test]
async fn missing_directory_reads_as_absent() {
    let cache = CacheStore::new(
        Box::new(FileStore::new("/nonexistent/kevin-cache-test")),
        TTL_SECS,
    );
    assert!(cache.get(0).await.is_none());
}
