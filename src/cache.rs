//! In-memory key/value cache with per-entry expiry.
//!
//! Entries are evicted lazily when read after their deadline, and in bulk by
//! [`TtlCache::clean`]. There is no size bound: the working set of a
//! summarizer is small and every entry ages out on its own.

use std::time::{Duration, Instant};

use dashmap::DashMap;

#[derive(Clone, Debug)]
struct CacheEntry<T> {
    value: T,
    expires_at: Instant,
}

impl<T> CacheEntry<T> {
    fn is_expired(&self, now: Instant) -> bool {
        now > self.expires_at
    }
}

/// Concurrent TTL cache keyed by string.
///
/// Backed by a sharded map, so `clean` only ever holds one shard lock at a
/// time and concurrent `get`/`set` on other shards proceed.
#[derive(Debug)]
pub struct TtlCache<T> {
    entries: DashMap<String, CacheEntry<T>>,
    default_ttl: Duration,
}

impl<T: Clone> TtlCache<T> {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            default_ttl,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Insert or replace `key`, expiring after the default TTL.
    pub fn set(&self, key: impl Into<String>, value: T) {
        self.set_with_ttl(key, value, None);
    }

    /// Insert or replace `key`. Both value and expiry are overwritten.
    pub fn set_with_ttl(&self, key: impl Into<String>, value: T, ttl: Option<Duration>) {
        let expires_at = Instant::now() + ttl.unwrap_or(self.default_ttl);
        self.entries.insert(key.into(), CacheEntry { value, expires_at });
    }

    /// Returns the live value for `key`, removing it if it has expired.
    /// Reading never extends the entry's lifetime.
    pub fn get(&self, key: &str) -> Option<T> {
        let now = Instant::now();
        {
            let entry = self.entries.get(key)?;
            if !entry.is_expired(now) {
                return Some(entry.value.clone());
            }
        }
        // Re-check under the write lock: a concurrent `set` may have refreshed it.
        self.entries.remove_if(key, |_, entry| entry.is_expired(now));
        None
    }

    pub fn delete(&self, key: &str) {
        self.entries.remove(key);
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Drop every expired entry and return how many were removed.
    pub fn clean(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before.saturating_sub(self.entries.len())
    }

    /// Number of stored entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
