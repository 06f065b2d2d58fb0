//! Cache configuration.
//!
//! Timing knobs for the query cache, built from the `[cache]` settings section.

use std::time::Duration;

const DEFAULT_STALE_SECS: u64 = 300;
const DEFAULT_RETRY_COUNT: u32 = 1;
const DEFAULT_RETRY_DELAY_MS: u64 = 1000;
const DEFAULT_GC_SECS: u64 = 300;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Age after which a fresh entry is refetched on the next read.
    pub stale_time: Duration,
    /// Extra attempts after a failed fetch.
    pub retry_count: u32,
    /// Pause before each retry.
    pub retry_delay: Duration,
    /// Idle time before an unobserved entry may be collected.
    pub gc_time: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            stale_time: Duration::from_secs(DEFAULT_STALE_SECS),
            retry_count: DEFAULT_RETRY_COUNT,
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
            gc_time: Duration::from_secs(DEFAULT_GC_SECS),
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            stale_time: settings.stale_time,
            retry_count: settings.retry_count,
            retry_delay: settings.retry_delay,
            gc_time: settings.gc_time,
        }
    }
}

impl CacheConfig {
    /// Total attempts a single fetch may make.
    pub fn max_attempts(&self) -> u32 {
        self.retry_count.saturating_add(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = CacheConfig::default();
        assert_eq!(config.stale_time, Duration::from_secs(300));
        assert_eq!(config.retry_count, 1);
        assert_eq!(config.retry_delay, Duration::from_secs(1));
        assert_eq!(config.gc_time, Duration::from_secs(300));
        assert_eq!(config.max_attempts(), 2);
    }
}
