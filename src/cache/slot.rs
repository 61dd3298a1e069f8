//! Single-slot result cache.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub stores: u64,
}

impl CacheStats {
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

struct AtomicStats {
    hits: AtomicU64,
    misses: AtomicU64,
    stores: AtomicU64,
}

impl AtomicStats {
    fn new() -> Self {
        Self {
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            stores: AtomicU64::new(0),
        }
    }

    fn to_stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            stores: self.stores.load(Ordering::Relaxed),
        }
    }
}

struct CacheEntry<T> {
    payload: T,
    stored_at: Instant,
}

/// Holds at most one payload plus the instant it was stored.
///
/// The TTL is not part of the entry: each lookup supplies its own, so the same
/// entry can be fresh under one load level and stale under another.
pub struct ResultCache<T> {
    slot: Mutex<Option<CacheEntry<T>>>,
    stats: AtomicStats,
}

impl<T: Clone> ResultCache<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            stats: AtomicStats::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<CacheEntry<T>>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The stored payload if it is at most `ttl` old. A zero `ttl` always misses.
    pub fn lookup(&self, ttl: Duration) -> Option<T> {
        if ttl.is_zero() {
            self.stats.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        }
        let hit = self
            .lock()
            .as_ref()
            .filter(|entry| entry.stored_at.elapsed() <= ttl)
            .map(|entry| entry.payload.clone());
        let counter = if hit.is_some() {
            &self.stats.hits
        } else {
            &self.stats.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        hit
    }

    /// Overwrite the slot and reset its timestamp.
    pub fn store(&self, payload: T) {
        *self.lock() = Some(CacheEntry {
            payload,
            stored_at: Instant::now(),
        });
        self.stats.stores.fetch_add(1, Ordering::Relaxed);
    }

    /// Age of the stored entry, if any.
    pub fn age(&self) -> Option<Duration> {
        self.lock().as_ref().map(|entry| entry.stored_at.elapsed())
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.to_stats()
    }
}

impl<T: Clone> Default for ResultCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_ttl_never_hits() {
        let cache = ResultCache::new();
        cache.store("fresh");
        assert_eq!(cache.lookup(Duration::ZERO), None);
        assert_eq!(cache.lookup(Duration::ZERO), None);
        assert_eq!(cache.stats().misses, 2);
    }

    #[test]
    fn test_store_then_lookup_returns_payload() {
        let cache = ResultCache::new();
        cache.store(vec![1, 2, 3]);
        assert_eq!(cache.lookup(Duration::from_secs(3600)), Some(vec![1, 2, 3]));
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn test_empty_cache_misses() {
        let cache: ResultCache<u32> = ResultCache::new();
        assert_eq!(cache.lookup(Duration::from_secs(10)), None);
        assert!(cache.age().is_none());
    }

    #[test]
    fn test_store_overwrites_single_slot() {
        let cache = ResultCache::new();
        cache.store("old");
        cache.store("new");
        assert_eq!(cache.lookup(Duration::from_secs(1)), Some("new"));
        assert_eq!(cache.stats().stores, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_validity_judged_by_lookup_ttl() {
        let cache = ResultCache::new();
        cache.store("quotes");
        tokio::time::advance(Duration::from_millis(1500)).await;

        assert_eq!(cache.lookup(Duration::from_secs(1)), None);
        assert_eq!(cache.lookup(Duration::from_secs(2)), Some("quotes"));

        tokio::time::advance(Duration::from_millis(500)).await;
        // exactly at the boundary still counts as fresh
        assert_eq!(cache.lookup(Duration::from_secs(2)), Some("quotes"));
        tokio::time::advance(Duration::from_millis(1)).await;
        assert_eq!(cache.lookup(Duration::from_secs(2)), None);
    }

    #[test]
    fn test_hit_ratio() {
        let stats = CacheStats {
            hits: 3,
            misses: 1,
            stores: 1,
        };
        assert_eq!(stats.hit_ratio(), 0.75);
        assert_eq!(CacheStats::default().hit_ratio(), 0.0);
    }
}
