//! Configuration for the query batcher.

use std::time::Duration;

/// Configuration for the query batcher
#[derive(Debug, Clone)]
pub struct BatcherConfig {
    /// Whether batching starts enabled. When disabled every request goes
    /// straight to the executor.
    pub enabled: bool,

    /// How long the first queued request waits for companions before the
    /// batch dispatches. Bounds the added latency of any single request.
    pub batch_window: Duration,

    /// Queue length that triggers immediate dispatch instead of waiting
    /// for the window to elapse.
    pub max_batch_size: usize,

    /// SQL length above which a request bypasses the queue. Large
    /// statements are assumed expensive enough that batching overhead is
    /// not worthwhile.
    pub max_sql_len: usize,
}

impl Default for BatcherConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            batch_window: Duration::from_millis(10),
            max_batch_size: 10,
            max_sql_len: 1000,
        }
    }
}

impl BatcherConfig {
    /// Config optimized for low latency (interactive, single caller)
    pub fn low_latency() -> Self {
        Self {
            enabled: true,
            batch_window: Duration::from_millis(2),
            max_batch_size: 4,
            max_sql_len: 1000,
        }
    }

    /// Config optimized for throughput under heavy fan-in
    pub fn high_throughput() -> Self {
        Self {
            enabled: true,
            batch_window: Duration::from_millis(25),
            max_batch_size: 32,
            max_sql_len: 1000,
        }
    }

    /// Create config from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("QUERYGATE_BATCHING") {
            config.enabled = val == "1" || val.to_lowercase() == "true";
        }

        if let Ok(val) = std::env::var("QUERYGATE_BATCH_WINDOW_MS") {
            if let Ok(n) = val.parse() {
                config.batch_window = Duration::from_millis(n);
            }
        }

        if let Ok(val) = std::env::var("QUERYGATE_MAX_BATCH_SIZE") {
            if let Ok(n) = val.parse() {
                config.max_batch_size = n;
            }
        }

        if let Ok(val) = std::env::var("QUERYGATE_MAX_SQL_LEN") {
            if let Ok(n) = val.parse() {
                config.max_sql_len = n;
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BatcherConfig::default();
        assert!(config.enabled);
        assert_eq!(config.batch_window, Duration::from_millis(10));
        assert_eq!(config.max_batch_size, 10);
        assert_eq!(config.max_sql_len, 1000);
    }

    #[test]
    fn test_low_latency_config() {
        let config = BatcherConfig::low_latency();
        assert!(config.batch_window < BatcherConfig::default().batch_window);
    }

    #[test]
    fn test_high_throughput_config() {
        let config = BatcherConfig::high_throughput();
        assert_eq!(config.max_batch_size, 32);
    }
}
