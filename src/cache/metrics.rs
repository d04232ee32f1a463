//! Metrics for the result cache.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for monitoring cache effectiveness
#[derive(Debug, Default)]
pub struct CacheMetrics {
    /// Lookup hits
    pub hits: AtomicU64,
    /// Lookup misses (including expired entries found on lookup)
    pub misses: AtomicU64,
    /// Successful stores
    pub stores: AtomicU64,
    /// Entries evicted to make room (LRU)
    pub evictions: AtomicU64,
    /// Entries removed because their TTL elapsed
    pub expirations: AtomicU64,
}

impl CacheMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_store(&self) {
        self.stores.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_expiration(&self) {
        self.expirations.fetch_add(1, Ordering::Relaxed);
    }

    /// Hit rate over all lookups so far
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 {
            return 0.0;
        }
        hits as f64 / total as f64
    }

    /// Snapshot the counters together with live state supplied by the cache
    pub fn snapshot(&self, entries: usize, enabled: bool) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            stores: self.stores.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
            hit_rate: self.hit_rate(),
            entries,
            enabled,
        }
    }

    /// Reset all counters
    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.stores.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
        self.expirations.store(0, Ordering::Relaxed);
    }
}

/// Point-in-time view of cache statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub stores: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub hit_rate: f64,
    pub entries: usize,
    pub enabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate() {
        let metrics = CacheMetrics::new();
        for _ in 0..3 {
            metrics.record_hit();
        }
        metrics.record_miss();

        let stats = metrics.snapshot(3, true);
        assert_eq!(stats.hits, 3);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate - 0.75).abs() < 0.001);
    }

    #[test]
    fn test_hit_rate_with_no_lookups() {
        let metrics = CacheMetrics::new();
        assert_eq!(metrics.hit_rate(), 0.0);
    }

    #[test]
    fn test_reset() {
        let metrics = CacheMetrics::new();
        metrics.record_hit();
        metrics.record_store();
        metrics.record_eviction();

        metrics.reset();

        let stats = metrics.snapshot(0, true);
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.stores, 0);
        assert_eq!(stats.evictions, 0);
    }
}
