//! Coordinator configuration.

use std::time::Duration;

/// Tunables for the five trigger strategies and the retry loop.
///
/// Defaults match the production policy: hourly periodic sync, a
/// 50-record batch threshold, and three end-of-shift attempts backed off
/// exponentially from two seconds.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Master switch; when false only explicit end-of-shift pushes run.
    pub sync_enabled: bool,
    /// Interval of the recurring periodic trigger.
    pub periodic_interval: Duration,
    /// Pending-count threshold that triggers an immediate sync after a
    /// capture is persisted.
    pub batch_threshold: u64,
    /// Whether reaching a wifi-class connection triggers an immediate sync.
    pub sync_on_wifi: bool,
    /// Maximum attempts for the forced end-of-shift push.
    pub max_retry_attempts: u32,
    /// First retry delay; subsequent delays multiply by `retry_multiplier`.
    pub retry_base_delay: Duration,
    pub retry_multiplier: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            sync_enabled: true,
            periodic_interval: Duration::from_secs(60 * 60),
            batch_threshold: 50,
            sync_on_wifi: true,
            max_retry_attempts: 3,
            retry_base_delay: Duration::from_millis(2000),
            retry_multiplier: 2,
        }
    }
}

impl SyncConfig {
    /// Delay before retry `attempt` (1-based): `base * multiplier^(n-1)`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = self.retry_multiplier.saturating_pow(attempt.saturating_sub(1));
        self.retry_base_delay.saturating_mul(factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_exponentially() {
        let config = SyncConfig::default();

        assert_eq!(config.backoff_delay(1), Duration::from_millis(2000));
        assert_eq!(config.backoff_delay(2), Duration::from_millis(4000));
        assert_eq!(config.backoff_delay(3), Duration::from_millis(8000));
    }

    #[test]
    fn backoff_honors_custom_base_and_multiplier() {
        let config = SyncConfig {
            retry_base_delay: Duration::from_millis(100),
            retry_multiplier: 3,
            ..SyncConfig::default()
        };

        assert_eq!(config.backoff_delay(1), Duration::from_millis(100));
        assert_eq!(config.backoff_delay(2), Duration::from_millis(300));
        assert_eq!(config.backoff_delay(3), Duration::from_millis(900));
    }
}
