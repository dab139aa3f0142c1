//! TTL-bounded in-memory cache of transcoded RGB565 image buffers.
//!
//! Entries are keyed by a digest of the source URL plus the target
//! dimensions, so differently sized renditions of the same image never
//! collide. The cache has no entry-count bound; buffers are small and a
//! periodic sweep drops anything older than the retention window.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::info;

/// A transcoded image held in the cache.
///
/// `buffer` is the packed RGB565 data, always `width * height * 2` bytes.
/// Entries are never mutated after insertion; a re-insert under the same key
/// simply replaces the previous entry.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub buffer: Bytes,
    pub width: u32,
    pub height: u32,
    pub created_at: DateTime<Utc>,
    /// Where the buffer came from; kept for log lines only.
    pub source_url: String,
}

impl CacheEntry {
    pub fn new(buffer: Bytes, width: u32, height: u32, source_url: String) -> Self {
        Self {
            buffer,
            width,
            height,
            created_at: Utc::now(),
            source_url,
        }
    }
}

/// Derive the cache key for a (source URL, dimensions) pair.
///
/// The first eight hex characters of the URL digest keep keys short; the
/// dimension suffix guarantees a 40x40 and an 80x80 rendition of the same
/// URL occupy separate slots.
pub fn cache_key(source_url: &str, width: u32, height: u32) -> String {
    let digest = format!("{:x}", md5::compute(source_url.as_bytes()));
    format!("{}_{}x{}", &digest[..8], width, height)
}

/// Process-wide image cache. Clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct ImageCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

impl ImageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an entry. Pure TTL semantics: a hit does not refresh the
    /// entry's age.
    pub async fn get(&self, key: &str) -> Option<CacheEntry> {
        self.entries.read().await.get(key).cloned()
    }

    /// Insert or overwrite the entry for `key`.
    pub async fn put(&self, key: String, entry: CacheEntry) {
        self.entries.write().await.insert(key, entry);
    }

    /// Remove every entry whose age exceeds `max_age` as of `now`; returns
    /// how many were dropped.
    pub async fn sweep(&self, now: DateTime<Utc>, max_age: Duration) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| now - entry.created_at <= max_age);
        before - entries.len()
    }

    /// Drop all entries.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

/// Spawn the periodic sweep task.
///
/// Runs for the life of the process independent of request traffic, so
/// entries may outlive their nominal TTL by at most one period. The returned
/// handle is abortable for shutdown and tests.
pub fn spawn_sweeper(
    cache: ImageCache,
    period: std::time::Duration,
    max_age: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // The first tick completes immediately; skip it so sweeps start one
        // full period after startup.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = cache.sweep(Utc::now(), max_age).await;
            if removed > 0 {
                info!("Swept {} expired images from cache", removed);
            }
        }
    })
}
