//! # Global engine configuration.
//!
//! [`EngineConfig`] defines the engine's behavior: worker pool size, default
//! task options inherited by submissions, the retry backoff policy, event bus
//! capacity, and the shutdown grace period.
//!
//! # Example
//! ```
//! use std::time::Duration;
//! use taskforge::{BackoffPolicy, EngineConfig};
//!
//! let mut cfg = EngineConfig::default();
//! cfg.max_workers = 2;
//! cfg.retry_count = 3;
//! cfg.timeout = Duration::from_secs(5);
//! cfg.retry_backoff = BackoffPolicy::fixed(Duration::from_millis(100));
//! cfg.grace = Duration::from_secs(10);
//!
//! assert_eq!(cfg.max_workers, 2);
//! assert_eq!(cfg.default_timeout(), Some(Duration::from_secs(5)));
//! ```

use std::time::Duration;

use crate::policies::BackoffPolicy;

/// Global configuration for the engine.
///
/// Controls worker concurrency, submission defaults, retry delay, event bus
/// capacity, and shutdown grace.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Maximum number of tasks running concurrently (0 = unlimited).
    pub max_workers: usize,
    /// Default priority for submissions that don't override it.
    pub priority: i32,
    /// Default maximum attempts per task (clamped to >= 1).
    pub retry_count: u32,
    /// Default per-attempt timeout (0 = no timeout).
    pub timeout: Duration,
    /// Delay policy between retry attempts; immediate by default.
    pub retry_backoff: BackoffPolicy,
    /// Capacity of the event bus channel.
    pub bus_capacity: usize,
    /// Maximum time `stop()` waits for in-flight tasks before abandoning them.
    pub grace: Duration,
}

impl Default for EngineConfig {
    /// Provides a default configuration:
    /// - `max_workers = 4`
    /// - `priority = 0`
    /// - `retry_count = 1` (no retries)
    /// - `timeout = 0s` (no timeout)
    /// - `retry_backoff = BackoffPolicy::immediate()`
    /// - `bus_capacity = 1024`
    /// - `grace = 30s`
    fn default() -> Self {
        Self {
            max_workers: 4,
            priority: 0,
            retry_count: 1,
            timeout: Duration::ZERO,
            retry_backoff: BackoffPolicy::immediate(),
            bus_capacity: 1024,
            grace: Duration::from_secs(30),
        }
    }
}

impl EngineConfig {
    /// Returns the default timeout as an `Option`, treating zero as "none".
    pub fn default_timeout(&self) -> Option<Duration> {
        if self.timeout.is_zero() {
            None
        } else {
            Some(self.timeout)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_timeout_is_none() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.default_timeout(), None);

        let mut cfg = EngineConfig::default();
        cfg.timeout = Duration::from_secs(3);
        assert_eq!(cfg.default_timeout(), Some(Duration::from_secs(3)));
    }
}
