// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod api;
pub mod cache;
pub mod config;
pub mod extract;
pub mod fallback;
pub mod feed;
pub mod fetch;
pub mod metrics;
pub mod types;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::cache::{CacheStore, FileStore, MemoryStore, StorageBackend};
pub use crate::config::FeedConfig;
pub use crate::feed::{spawn_feed, FeedHandle, FeedOptions, FeedState};
pub use crate::fetch::{CommunityClient, CommunityFetcher};
pub use crate::types::{
    CommunityData, CommunityStats, ContentItem, ContentKind, DataSource, ErrorCode, FetchError,
    FetchResult,
};
