//! Cache of uploaded media handles
//!
//! Uses a moka async cache. Each entry lives for the `ttl` the platform
//! returned with the upload, minus a small margin.

use moka::future::Cache;
use moka::Expiry;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::time::{Duration, Instant};

use crate::core::{MediaKind, UploadedMedia};

/// Seconds shaved off the platform ttl so a handle is never used right at expiry
const TTL_MARGIN_SECS: u64 = 30;

/// Cache key: group, media kind and payload hash
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaKey {
    group_openid: String,
    kind: MediaKind,
    payload_hash: u64,
}

impl MediaKey {
    /// Key for `payload` uploaded to `group_openid`
    pub fn new(group_openid: &str, kind: MediaKind, payload: &str) -> Self {
        let mut hasher = DefaultHasher::new();
        payload.hash(&mut hasher);
        MediaKey {
            group_openid: group_openid.to_string(),
            kind,
            payload_hash: hasher.finish(),
        }
    }
}

struct TtlExpiry;

impl Expiry<MediaKey, UploadedMedia> for TtlExpiry {
    fn expire_after_create(
        &self,
        _key: &MediaKey,
        value: &UploadedMedia,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(Duration::from_secs(
            value.ttl.saturating_sub(TTL_MARGIN_SECS),
        ))
    }
}

/// Uploaded media handles, keyed by group and payload
#[derive(Clone)]
pub struct MediaCache {
    entries: Cache<MediaKey, UploadedMedia>,
}

impl MediaCache {
    /// Create a cache holding at most `capacity` handles
    pub fn new(capacity: u64) -> Self {
        MediaCache {
            entries: Cache::builder()
                .max_capacity(capacity)
                .expire_after(TtlExpiry)
                .build(),
        }
    }

    /// Cached handle, if still valid
    pub async fn get(&self, key: &MediaKey) -> Option<UploadedMedia> {
        self.entries.get(key).await
    }

    /// Remember a handle
    pub async fn insert(&self, key: MediaKey, media: UploadedMedia) {
        if media.ttl > TTL_MARGIN_SECS {
            self.entries.insert(key, media).await;
        }
    }
}

impl Default for MediaCache {
    fn default() -> Self {
        Self::new(512)
    }
}
