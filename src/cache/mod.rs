//! Ephemeral, content-addressed artifact cache
//!
//! Rendered rasters only need to live long enough for the device to come back
//! and fetch them. Each entry owns a timer task that removes it once its expiry
//! passes; reinserting a key can only push that expiry later.

use bytes::Bytes;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

struct CacheEntry {
    bytes: Bytes,
    expires_at: Instant,
    timer: JoinHandle<()>,
}

type EntryMap = HashMap<String, CacheEntry>;

/// Snapshot of cache occupancy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub bytes: usize,
}

/// TTL-expiring store of immutable byte buffers.
///
/// Cloning is cheap and clones share the same store. Requires a tokio runtime.
#[derive(Clone, Default)]
pub struct ArtifactCache {
    entries: Arc<RwLock<EntryMap>>,
}

impl ArtifactCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `bytes` under `key` for `ttl`.
    ///
    /// Returns false without touching the store when `ttl` is zero, or when the
    /// key is already present with an expiry at or beyond `now + ttl`. A
    /// present key keeps its original bytes; only its expiry moves.
    pub async fn put(&self, key: &str, bytes: Bytes, ttl: Duration) -> bool {
        if ttl.is_zero() {
            return false;
        }

        // Sampled before taking the lock so racing puts are ordered by the
        // expiry they computed, not by lock acquisition.
        let expires_at = Instant::now() + ttl;

        let mut entries = self.entries.write().await;
        match entries.get_mut(key) {
            Some(entry) if expires_at <= entry.expires_at => false,
            Some(entry) => {
                entry.timer.abort();
                entry.expires_at = expires_at;
                entry.timer = self.schedule_expiry(key, expires_at);
                debug!(key, ttl_ms = ttl.as_millis() as u64, "Extended cached artifact");
                true
            }
            None => {
                let size = bytes.len();
                let timer = self.schedule_expiry(key, expires_at);
                entries.insert(
                    key.to_string(),
                    CacheEntry {
                        bytes,
                        expires_at,
                        timer,
                    },
                );
                debug!(key, size, ttl_ms = ttl.as_millis() as u64, "Cached artifact");
                true
            }
        }
    }

    /// Fetch the bytes stored under `key`, `None` if absent or expired
    pub async fn get(&self, key: &str) -> Option<Bytes> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.bytes.clone())
    }

    pub async fn stats(&self) -> CacheStats {
        let entries = self.entries.read().await;
        CacheStats {
            entries: entries.len(),
            bytes: entries.values().map(|e| e.bytes.len()).sum(),
        }
    }

    fn schedule_expiry(&self, key: &str, expires_at: Instant) -> JoinHandle<()> {
        let store: Weak<RwLock<EntryMap>> = Arc::downgrade(&self.entries);
        let key = key.to_string();
        tokio::spawn(async move {
            tokio::time::sleep_until(expires_at).await;
            let Some(store) = store.upgrade() else {
                return;
            };
            let mut entries = store.write().await;
            // A later put may have moved the expiry after this timer was armed
            if entries
                .get(&key)
                .is_some_and(|entry| entry.expires_at == expires_at)
            {
                entries.remove(&key);
                debug!(key = %key, "Expired cached artifact");
            }
        })
    }
}

impl std::fmt::Debug for ArtifactCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactCache").finish_non_exhaustive()
    }
}
