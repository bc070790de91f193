//! In-process cache backend on a concurrent map.
//!
//! Entries expire lazily: an expired entry is dropped by the read that finds
//! it, or by [`InMemoryCache::purge_expired`], which `set` runs every
//! `purge_every` inserts so keys that are never read again do not pile up.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use super::CacheBackend;

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Vec<u8>,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Inserts between two sweeps of expired entries.
pub const DEFAULT_PURGE_EVERY: usize = 1024;

/// Default cache backend.
#[derive(Debug)]
pub struct InMemoryCache {
    entries: DashMap<String, CacheEntry>,
    inserts: AtomicUsize,
    purge_every: usize,
}

impl Default for InMemoryCache {
    fn default() -> Self {
        InMemoryCache::with_purge_every(DEFAULT_PURGE_EVERY)
    }
}

impl InMemoryCache {
    pub fn new() -> Self {
        InMemoryCache::default()
    }

    /// A cache that sweeps expired entries every `purge_every` inserts.
    pub fn with_purge_every(purge_every: usize) -> Self {
        InMemoryCache {
            entries: DashMap::new(),
            inserts: AtomicUsize::new(0),
            purge_every: purge_every.max(1),
        }
    }

    /// Drops every expired entry, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        let purged = before.saturating_sub(self.entries.len());
        if purged > 0 {
            debug!(purged, "Purged expired cache entries");
        }
        purged
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

#[async_trait]
impl CacheBackend for InMemoryCache {
    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        let now = Instant::now();
        // The map guard must be released before removing the same key.
        let (value, expired) = {
            let entry = self.entries.get(key)?;
            (entry.value.clone(), entry.is_expired(now))
        };
        if expired {
            self.entries.remove_if(key, |_, entry| entry.is_expired(now));
            return None;
        }
        Some(value)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) {
        let expires_at = Instant::now() + ttl;
        self.entries.insert(key.to_string(), CacheEntry { value, expires_at });

        let inserts = self.inserts.fetch_add(1, Ordering::Relaxed) + 1;
        if inserts % self.purge_every == 0 {
            self.purge_expired();
        }
    }

    async fn delete(&self, key: &str) {
        self.entries.remove(key);
    }
}
