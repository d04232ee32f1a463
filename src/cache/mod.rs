//! TTL + LRU result cache for querygate.
//!
//! A capacity- and time-bounded store keyed by normalized query shape.
//! The caller consults it before routing a query through the batcher and
//! stores the result back after a successful read-only execution; the two
//! components never call each other.
//!
//! # Behavior
//!
//! - A hit moves the entry to most-recently-used position.
//! - Stores are refused, silently, for disabled caches, non-cacheable
//!   statements, and results whose estimated size exceeds the ceiling. A
//!   refused store never surfaces to the caller.
//! - At capacity the single least-recently-used entry is evicted first.
//! - A background sweep fires every `ttl / 2` and removes expired entries
//!   even for keys nobody re-reads.
//!
//! # Pressure levers
//!
//! An external memory-pressure controller shrinks the cache live through
//! [`ResultCache::reconfigure`] plus [`ResultCache::sweep_now`], or stops it
//! entirely with [`ResultCache::set_enabled`] and
//! [`ResultCache::invalidate_all`]. The cache performs no polling of its
//! own.

mod classify;
mod config;
mod metrics;
mod size;

pub use classify::is_non_cacheable;
pub use config::CacheConfig;
pub use metrics::{CacheMetrics, CacheStats};
pub use size::estimate_size;

use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, Instant};

use lru::LruCache;
use once_cell::sync::Lazy;
use regex::Regex;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use xxhash_rust::xxh3::xxh3_64;

use crate::executor::QueryValue;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Option flags that are part of the cache key, so differently paginated
/// requests for the same text never collide.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheOptions {
    /// Result is consumed as a stream.
    pub streaming: bool,
    /// Row limit applied by the caller.
    pub limit: Option<u64>,
    /// Row offset applied by the caller.
    pub offset: Option<u64>,
}

/// Compute the cache key: case-folded, whitespace-collapsed SQL plus each
/// option flag that is present, hashed with xxh3.
fn cache_key(sql: &str, options: &CacheOptions) -> u64 {
    let mut canonical = WHITESPACE
        .replace_all(sql.trim(), " ")
        .to_lowercase();
    if options.streaming {
        canonical.push_str("|stream");
    }
    if let Some(limit) = options.limit {
        canonical.push_str(&format!("|limit:{limit}"));
    }
    if let Some(offset) = options.offset {
        canonical.push_str(&format!("|offset:{offset}"));
    }
    xxh3_64(canonical.as_bytes())
}

/// One cached result.
struct CacheEntry {
    value: QueryValue,
    expires_at: Instant,
    size_bytes: usize,
    inserted_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

struct CacheState {
    /// Recency-ordered entries; capacity is enforced manually at store
    /// time so a live shrink can leave eviction to the next store.
    entries: LruCache<u64, CacheEntry>,
    max_entries: usize,
    ttl: Duration,
    max_result_bytes: usize,
    enabled: bool,
    sweeper: Option<JoinHandle<()>>,
}

struct CacheShared {
    metrics: CacheMetrics,
    state: Mutex<CacheState>,
}

impl CacheShared {
    /// Remove every expired entry. Iteration does not touch recency order.
    fn sweep(&self) -> usize {
        let mut state = self.state.lock().unwrap();
        let expired: Vec<u64> = state
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| *key)
            .collect();
        for key in &expired {
            if let Some(entry) = state.entries.pop(key) {
                self.metrics.record_expiration();
                debug!(
                    age_ms = entry.inserted_at.elapsed().as_millis() as u64,
                    size_bytes = entry.size_bytes,
                    "swept expired cache entry"
                );
            }
        }
        expired.len()
    }
}

/// The result cache. Cheap to clone; all clones share one store.
#[derive(Clone)]
pub struct ResultCache {
    shared: Arc<CacheShared>,
}

impl ResultCache {
    /// Create a cache and start its background expiry sweep.
    ///
    /// Must be called inside a tokio runtime. The sweep task holds only a
    /// weak reference, so dropping the last cache handle stops it.
    pub fn new(config: CacheConfig) -> Self {
        let shared = Arc::new(CacheShared {
            metrics: CacheMetrics::new(),
            state: Mutex::new(CacheState {
                entries: LruCache::unbounded(),
                max_entries: config.max_entries,
                ttl: config.ttl,
                max_result_bytes: config.max_result_bytes,
                enabled: config.enabled,
                sweeper: None,
            }),
        });
        let sweeper = spawn_sweeper(&shared, config.ttl);
        shared.state.lock().unwrap().sweeper = Some(sweeper);
        Self { shared }
    }

    /// Look up a result. A hit refreshes the entry's recency; an expired
    /// entry is removed and counts as a miss.
    pub fn lookup(&self, sql: &str, options: &CacheOptions) -> Option<QueryValue> {
        let key = cache_key(sql, options);
        let mut state = self.shared.state.lock().unwrap();
        if !state.enabled {
            self.shared.metrics.record_miss();
            return None;
        }
        let expired = match state.entries.get(&key) {
            Some(entry) if entry.is_expired() => true,
            Some(entry) => {
                self.shared.metrics.record_hit();
                // Rows clone deeply, columnar handles share the Arc.
                return Some(entry.value.clone());
            }
            None => {
                self.shared.metrics.record_miss();
                return None;
            }
        };
        if expired {
            state.entries.pop(&key);
            self.shared.metrics.record_expiration();
        }
        self.shared.metrics.record_miss();
        None
    }

    /// Store a result. Refusals (disabled cache, non-cacheable statement,
    /// oversized result) are silent; a failed store only means the result
    /// is not cached.
    pub fn store(&self, sql: &str, value: &QueryValue, options: &CacheOptions) {
        let mut state = self.shared.state.lock().unwrap();
        if !state.enabled {
            return;
        }
        if is_non_cacheable(sql) {
            debug!("refusing to cache non-cacheable statement");
            return;
        }
        // Reachable via `reconfigure`: zero capacity means store nothing.
        if state.max_entries == 0 {
            return;
        }
        let size_bytes = estimate_size(value);
        if size_bytes > state.max_result_bytes {
            debug!(size_bytes, ceiling = state.max_result_bytes, "result too large to cache");
            return;
        }

        let key = cache_key(sql, options);
        if !state.entries.contains(&key) {
            while state.entries.len() >= state.max_entries {
                if state.entries.pop_lru().is_none() {
                    break;
                }
                self.shared.metrics.record_eviction();
            }
        }

        let now = Instant::now();
        let ttl = state.ttl;
        state.entries.put(
            key,
            CacheEntry {
                value: value.clone(),
                expires_at: now + ttl,
                size_bytes,
                inserted_at: now,
            },
        );
        self.shared.metrics.record_store();
    }

    /// Drop every entry and reset statistics.
    pub fn invalidate_all(&self) {
        let mut state = self.shared.state.lock().unwrap();
        state.entries.clear();
        self.shared.metrics.reset();
        info!("result cache invalidated");
    }

    /// Enable or disable the cache. Disabling clears the store.
    pub fn set_enabled(&self, enabled: bool) {
        let mut state = self.shared.state.lock().unwrap();
        state.enabled = enabled;
        if !enabled {
            state.entries.clear();
        }
        info!(enabled, "result caching toggled");
    }

    /// Live-shrink (or grow) capacity and lifetime. Shrinking below the
    /// current entry count does not evict; the next `store` that would
    /// exceed the new bound does. The sweep interval follows the new TTL.
    pub fn reconfigure(&self, max_entries: usize, ttl: Duration) {
        {
            let mut state = self.shared.state.lock().unwrap();
            state.max_entries = max_entries;
            state.ttl = ttl;
            if let Some(old) = state.sweeper.take() {
                old.abort();
            }
        }
        let sweeper = spawn_sweeper(&self.shared, ttl);
        self.shared.state.lock().unwrap().sweeper = Some(sweeper);
        info!(max_entries, ttl_ms = ttl.as_millis() as u64, "result cache reconfigured");
    }

    /// Forced expiry sweep; returns how many entries were removed.
    pub fn sweep_now(&self) -> usize {
        self.shared.sweep()
    }

    /// Current statistics snapshot.
    pub fn stats(&self) -> CacheStats {
        let (entries, enabled) = {
            let state = self.shared.state.lock().unwrap();
            (state.entries.len(), state.enabled)
        };
        self.shared.metrics.snapshot(entries, enabled)
    }
}

/// Recurring expiry sweep at half the TTL, so staleness exposure is bounded
/// independent of access pattern.
fn spawn_sweeper(shared: &Arc<CacheShared>, ttl: Duration) -> JoinHandle<()> {
    let weak: Weak<CacheShared> = Arc::downgrade(shared);
    let period = (ttl / 2).max(Duration::from_millis(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        // The first tick completes immediately; skip it.
        interval.tick().await;
        loop {
            interval.tick().await;
            match weak.upgrade() {
                Some(shared) => {
                    let removed = shared.sweep();
                    if removed > 0 {
                        debug!(removed, "expiry sweep");
                    }
                }
                None => break,
            }
        }
    })
}
