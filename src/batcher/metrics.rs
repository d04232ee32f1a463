//! Metrics for the query batcher.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Monotonic counters for monitoring batcher behavior
#[derive(Debug, Default)]
pub struct BatcherMetrics {
    /// Total requests accepted by `submit`
    pub requests_total: AtomicU64,

    /// Requests routed straight to the executor
    pub requests_bypassed: AtomicU64,

    /// Batches dispatched
    pub batches_executed: AtomicU64,

    /// Total requests carried by dispatched batches (for size averaging)
    pub total_batch_requests: AtomicU64,

    /// Cumulative batch wall time in milliseconds
    pub total_batch_time_ms: AtomicU64,
}

impl BatcherMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a request entering `submit`
    pub fn record_request(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a request bypassing the queue
    pub fn record_bypass(&self) {
        self.requests_bypassed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a dispatched batch
    pub fn record_batch(&self, batch_size: usize, elapsed: Duration) {
        self.batches_executed.fetch_add(1, Ordering::Relaxed);
        self.total_batch_requests
            .fetch_add(batch_size as u64, Ordering::Relaxed);
        self.total_batch_time_ms
            .fetch_add(elapsed.as_millis() as u64, Ordering::Relaxed);
    }

    /// Average number of requests per dispatched batch
    pub fn avg_batch_size(&self) -> f64 {
        let batches = self.batches_executed.load(Ordering::Relaxed);
        if batches == 0 {
            return 0.0;
        }
        self.total_batch_requests.load(Ordering::Relaxed) as f64 / batches as f64
    }

    /// Average batch wall time in milliseconds
    pub fn avg_batch_time_ms(&self) -> f64 {
        let batches = self.batches_executed.load(Ordering::Relaxed);
        if batches == 0 {
            return 0.0;
        }
        self.total_batch_time_ms.load(Ordering::Relaxed) as f64 / batches as f64
    }

    /// Snapshot the counters together with live state supplied by the batcher
    pub fn snapshot(&self, queue_depth: usize, enabled: bool) -> BatcherStats {
        BatcherStats {
            requests_total: self.requests_total.load(Ordering::Relaxed),
            requests_bypassed: self.requests_bypassed.load(Ordering::Relaxed),
            batches_executed: self.batches_executed.load(Ordering::Relaxed),
            total_batch_time_ms: self.total_batch_time_ms.load(Ordering::Relaxed),
            avg_batch_size: self.avg_batch_size(),
            avg_batch_time_ms: self.avg_batch_time_ms(),
            queue_depth,
            enabled,
        }
    }
}

/// Point-in-time view of batcher statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct BatcherStats {
    pub requests_total: u64,
    pub requests_bypassed: u64,
    pub batches_executed: u64,
    pub total_batch_time_ms: u64,
    pub avg_batch_size: f64,
    pub avg_batch_time_ms: f64,
    pub queue_depth: usize,
    pub enabled: bool,
}
