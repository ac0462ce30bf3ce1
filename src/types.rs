// src/types.rs
use std::fmt;

use serde::{Deserialize, Serialize};

/// One piece of community content pulled out of the depot page.
///
/// `id` is derived deterministically from the source URL where possible;
/// when derivation fails it is a hash of the URL, unique within a fetch
/// cycle but not guaranteed stable across markup changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub image_url: String,
    #[serde(flatten)]
    pub kind: ContentKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentKind {
    Image,
    Gif,
    Video {
        /// Opaque identifier used to construct an embed, not a playable URL.
        #[serde(rename = "videoUrl")]
        video_url: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityStats {
    pub total_memes: u64,
    pub total_videos: u64,
    pub total_gifs: u64,
    pub total_images: u64,
    pub total_views: u64,
    pub total_artists: u64,
}

/// Top-level community payload served to the gallery UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityData {
    #[serde(flatten)]
    pub stats: CommunityStats,
    /// Curated subset for display, videos first.
    pub featured: Vec<ContentItem>,
    pub depot_url: String,
    /// RFC 3339 timestamp of when this payload was assembled.
    pub last_updated: String,
    /// Human-readable provenance label (e.g. "Live from KEVIN Depot").
    pub data_source: String,
}

/// Where a payload ultimately came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Live,
    Cached,
    Fallback,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Live => write!(f, "live"),
            Self::Cached => write!(f, "cached"),
            Self::Fallback => write!(f, "fallback"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Timeout,
    Network,
    Http(u16),
    Unknown,
}

impl ErrorCode {
    /// Retryable per taxonomy: timeouts and transport errors always,
    /// HTTP statuses only when server-side (>= 500).
    pub fn retryable(&self) -> bool {
        match self {
            Self::Timeout | Self::Network | Self::Unknown => true,
            Self::Http(status) => *status >= 500,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "TIMEOUT"),
            Self::Network => write!(f, "NETWORK_ERROR"),
            Self::Http(status) => write!(f, "HTTP_{status}"),
            Self::Unknown => write!(f, "UNKNOWN_ERROR"),
        }
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Classified fetch failure. Carried inside [`FetchResult`]; never thrown.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub retryable: bool,
    #[serde(skip_serializing_if = "serde_json::Value::is_null")]
    pub details: serde_json::Value,
}

impl FetchError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            status: match code {
                ErrorCode::Http(s) => Some(s),
                _ => None,
            },
            retryable: code.retryable(),
            details: serde_json::Value::Null,
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Timeout, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Network, message)
    }

    pub fn http(status: u16) -> Self {
        Self::new(ErrorCode::Http(status), format!("upstream returned HTTP {status}"))
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unknown, message)
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for FetchError {}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchMetadata {
    /// Unix epoch millis when the operation settled.
    pub timestamp: u64,
    pub duration_ms: u64,
    pub source: DataSource,
    /// Set when `source` is `cached`: when the entry was originally stored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached_at: Option<u64>,
}

/// Envelope for one logical "get community data" operation.
///
/// `data` and `error` are mutually exclusive on a live success; a recovered
/// result (cached or fallback) carries both, so consumers can show data with
/// a degraded-status indicator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchResult<T> {
    pub data: Option<T>,
    pub error: Option<FetchError>,
    pub metadata: FetchMetadata,
}

impl<T> FetchResult<T> {
    pub fn live(data: T, timestamp: u64, duration_ms: u64) -> Self {
        Self {
            data: Some(data),
            error: None,
            metadata: FetchMetadata {
                timestamp,
                duration_ms,
                source: DataSource::Live,
                cached_at: None,
            },
        }
    }

    pub fn cached(
        data: T,
        error: FetchError,
        timestamp: u64,
        duration_ms: u64,
        cached_at: u64,
    ) -> Self {
        Self {
            data: Some(data),
            error: Some(error),
            metadata: FetchMetadata {
                timestamp,
                duration_ms,
                source: DataSource::Cached,
                cached_at: Some(cached_at),
            },
        }
    }

    pub fn fallback(data: T, error: FetchError, timestamp: u64, duration_ms: u64) -> Self {
        Self {
            data: Some(data),
            error: Some(error),
            metadata: FetchMetadata {
                timestamp,
                duration_ms,
                source: DataSource::Fallback,
                cached_at: None,
            },
        }
    }

    pub fn failure(error: FetchError, timestamp: u64, duration_ms: u64) -> Self {
        Self {
            data: None,
            error: Some(error),
            metadata: FetchMetadata {
                timestamp,
                duration_ms,
                source: DataSource::Fallback,
                cached_at: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_render_and_classify() {
        assert_eq!(ErrorCode::Timeout.to_string(), "TIMEOUT");
        assert_eq!(ErrorCode::Http(503).to_string(), "HTTP_503");
        assert!(ErrorCode::Http(503).retryable());
        assert!(!ErrorCode::Http(404).retryable());
        assert!(ErrorCode::Network.retryable());
        assert!(ErrorCode::Unknown.retryable());
    }

    #[test]
    fn content_item_serializes_with_type_tag() {
        let item = ContentItem {
            id: "abc123".into(),
            title: "t".into(),
            description: "d".into(),
            category: "Video".into(),
            image_url: "https://example.com/thumb.jpg".into(),
            kind: ContentKind::Video {
                video_url: "vid42".into(),
            },
        };
        let v = serde_json::to_value(&item).unwrap();
        assert_eq!(v["type"], "video");
        assert_eq!(v["videoUrl"], "vid42");
        assert_eq!(v["imageUrl"], "https://example.com/thumb.jpg");
    }

    #[test]
    fn stats_serialize_camel_case() {
        let stats = CommunityStats {
            total_memes: 3,
            total_videos: 1,
            total_gifs: 1,
            total_images: 1,
            total_views: 10,
            total_artists: 2,
        };
        let v = serde_json::to_value(stats).unwrap();
        assert_eq!(v["totalMemes"], 3);
        assert_eq!(v["totalArtists"], 2);
    }
}
