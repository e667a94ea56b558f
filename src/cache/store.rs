//! Result Cache
//!
//! Maps cache keys to handles of executions that already SUCCEEDED.
//! Shared between executors through an `Arc`; the map is sharded so
//! concurrent insertions never block each other for long.

use crate::cache::key::CacheKey;
use crate::execution::service::ExecutionHandle;
use dashmap::DashMap;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone)]
struct CacheEntry {
    handle: ExecutionHandle,
    inserted_at: Instant,
}

/// Process-local cache of completed execution handles
#[derive(Debug, Default)]
pub struct ResultCache {
    entries: DashMap<CacheKey, CacheEntry>,
    ttl: Option<Duration>,
    max_entries: Option<usize>,
}

impl ResultCache {
    /// Unbounded cache without expiry
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries older than `ttl` are treated as absent
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Holds at most `max_entries`; the oldest insertion is evicted first.
    /// Racing inserts of new keys may overshoot the bound briefly.
    pub fn with_capacity_limit(mut self, max_entries: usize) -> Self {
        self.max_entries = Some(max_entries.max(1));
        self
    }

    pub fn get(&self, key: &CacheKey) -> Option<ExecutionHandle> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if !self.is_expired(&entry, now) {
                return Some(entry.handle.clone());
            }
        }
        // The read guard is gone by now; drop the stale entry if still stale
        self.entries
            .remove_if(key, |_, entry| self.is_expired(entry, now));
        None
    }

    /// Insert or replace; the last write for a key wins
    pub fn put(&self, key: CacheKey, handle: ExecutionHandle) {
        if let Some(max) = self.max_entries {
            if !self.entries.contains_key(&key) && self.entries.len() >= max {
                self.evict_oldest();
            }
        }
        debug!("Caching execution {} under {}", handle, key);
        self.entries.insert(
            key,
            CacheEntry {
                handle,
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn remove(&self, key: &CacheKey) -> Option<ExecutionHandle> {
        self.entries.remove(key).map(|(_, entry)| entry.handle)
    }

    /// Drop every expired entry, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        if self.ttl.is_none() {
            return 0;
        }
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !self.is_expired(entry, now));
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    fn is_expired(&self, entry: &CacheEntry, now: Instant) -> bool {
        match self.ttl {
            Some(ttl) => now.saturating_duration_since(entry.inserted_at) >= ttl,
            None => false,
        }
    }

    fn evict_oldest(&self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|entry| entry.value().inserted_at)
            .map(|entry| *entry.key());
        if let Some(key) = oldest {
            debug!("Evicting cache entry {}", key);
            self.entries.remove(&key);
        }
    }
}
