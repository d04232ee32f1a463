//! Configuration for the result cache.

use std::time::Duration;

/// Configuration for the result cache
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Whether the cache starts enabled
    pub enabled: bool,

    /// Maximum number of entries before LRU eviction
    pub max_entries: usize,

    /// Uniform time-to-live applied at insertion
    pub ttl: Duration,

    /// Estimated-size ceiling above which a result is never stored
    pub max_result_bytes: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 100,
            ttl: Duration::from_secs(30),
            max_result_bytes: 10 * 1024 * 1024, // 10MB
        }
    }
}

impl CacheConfig {
    /// Config optimized for low memory. Matches the floors the external
    /// pressure controller shrinks towards.
    pub fn low_memory() -> Self {
        Self {
            enabled: true,
            max_entries: 20,
            ttl: Duration::from_secs(15),
            max_result_bytes: 1024 * 1024,
        }
    }

    /// Create config from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("QUERYGATE_CACHING") {
            config.enabled = val == "1" || val.to_lowercase() == "true";
        }

        if let Ok(val) = std::env::var("QUERYGATE_CACHE_SIZE") {
            if let Ok(n) = val.parse() {
                config.max_entries = n;
            }
        }

        if let Ok(val) = std::env::var("QUERYGATE_CACHE_TTL_SECS") {
            if let Ok(n) = val.parse() {
                config.ttl = Duration::from_secs(n);
            }
        }

        if let Ok(val) = std::env::var("QUERYGATE_CACHE_MAX_RESULT_BYTES") {
            if let Ok(n) = val.parse() {
                config.max_result_bytes = n;
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
        let config = CacheConfig::default();
        assert!(config.enabled);
        assert_eq!(config.max_entries, 100);
        assert_eq!(config.max_result_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn test_low_memory_config() {
        let config = CacheConfig::low_memory();
        assert_eq!(config.max_entries, 20);
        assert_eq!(config.ttl, Duration::from_secs(15));
    }
}
