//! # Per-task execution options.
//!
//! [`TaskOptions`] bundles the knobs a submission can override: priority,
//! retry budget, and per-attempt timeout. Options can be created:
//! - **From config** with [`TaskOptions::with_defaults`] (inherit engine defaults)
//! - **Explicitly** via the builder-style `with_*` methods

use std::time::Duration;

use crate::config::EngineConfig;

/// Execution options for one task submission.
///
/// ## Example
/// ```rust
/// use std::time::Duration;
/// use taskforge::{EngineConfig, TaskOptions};
///
/// let cfg = EngineConfig::default();
/// let opts = TaskOptions::with_defaults(&cfg)
///     .with_priority(5)
///     .with_retry_count(3)
///     .with_timeout(Some(Duration::from_secs(10)));
///
/// assert_eq!(opts.priority, 5);
/// assert_eq!(opts.retry_count, 3);
/// ```
#[derive(Clone, Copy, Debug)]
pub struct TaskOptions {
    /// Higher dispatches first among simultaneously ready tasks.
    pub priority: i32,
    /// Maximum number of execution attempts (clamped to >= 1 at submission).
    pub retry_count: u32,
    /// Per-attempt wall-clock budget (`None` = unlimited).
    pub timeout: Option<Duration>,
}

impl Default for TaskOptions {
    fn default() -> Self {
        Self {
            priority: 0,
            retry_count: 1,
            timeout: None,
        }
    }
}

impl TaskOptions {
    /// Creates options inheriting defaults from the engine config.
    ///
    /// Uses [`EngineConfig::default_timeout`] so that a zero timeout in the
    /// config is treated as "no timeout".
    pub fn with_defaults(cfg: &EngineConfig) -> Self {
        Self {
            priority: cfg.priority,
            retry_count: cfg.retry_count.max(1),
            timeout: cfg.default_timeout(),
        }
    }

    /// Returns options with an updated priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Returns options with an updated retry budget.
    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    /// Returns options with an updated per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}
