//! Error types used by the engine and by task handlers.
//!
//! This module defines two main error enums:
//!
//! - [`EngineError`] — errors surfaced synchronously to callers of the engine
//!   (unknown task type, invalid schedule instant, submissions after stop,
//!   shutdown grace exceeded).
//! - [`TaskError`] — errors produced by individual execution attempts; these
//!   never propagate out of the dispatch loop, they are captured into the
//!   task's [`TaskResult`](crate::TaskResult).
//!
//! Both types provide helper methods (`as_label`, `as_message`) for
//! logging/metrics and additional utilities such as [`TaskError::is_retryable`].

use std::time::Duration;

use thiserror::Error;

use crate::tasks::TaskId;

/// # Errors surfaced synchronously to engine callers.
///
/// These represent caller-input problems or engine lifecycle failures.
/// Handler failures are never reported through this type — they end up in
/// the task's result record instead.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum EngineError {
    /// `create_task`/`schedule_task` referenced a name never registered.
    #[error("no handler registered for task type \"{name}\"")]
    UnknownTaskType {
        /// The unresolved task type name.
        name: String,
    },

    /// The requested schedule instant is already in the past.
    #[error("scheduled instant lies {past_by:?} in the past")]
    ScheduleInPast {
        /// How far in the past the requested instant was at submission time.
        past_by: Duration,
    },

    /// The engine has been stopped; new submissions are rejected.
    #[error("engine is stopped; task submissions are rejected")]
    Stopped,

    /// Shutdown grace period was exceeded; some tasks were still running and
    /// have been marked failed (abandoned).
    #[error("shutdown grace {grace:?} exceeded; abandoned tasks: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Ids of tasks that were still running when grace expired.
        stuck: Vec<TaskId>,
    },
}

impl EngineError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use taskforge::EngineError;
    ///
    /// let err = EngineError::Stopped;
    /// assert_eq!(err.as_label(), "engine_stopped");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            EngineError::UnknownTaskType { .. } => "unknown_task_type",
            EngineError::ScheduleInPast { .. } => "schedule_in_past",
            EngineError::Stopped => "engine_stopped",
            EngineError::GraceExceeded { .. } => "engine_grace_exceeded",
        }
    }
}

/// # Errors produced by task execution attempts.
///
/// Some errors are retryable (`Timeout`, `Fail`), others terminate the task
/// immediately (`Fatal`, `Canceled`) regardless of remaining attempts.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum TaskError {
    /// The attempt exceeded its configured timeout.
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    /// Non-recoverable error; the task fails without consuming its
    /// remaining attempts.
    #[error("fatal error (no retry): {error}")]
    Fatal {
        /// The underlying error message.
        error: String,
    },

    /// The attempt failed but may succeed if retried.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// The attempt observed shutdown cancellation and stopped early.
    #[error("cancelled at shutdown")]
    Canceled,
}

impl TaskError {
    /// Shorthand for a retryable failure.
    pub fn fail(error: impl Into<String>) -> Self {
        TaskError::Fail {
            error: error.into(),
        }
    }

    /// Shorthand for a non-retryable failure.
    pub fn fatal(error: impl Into<String>) -> Self {
        TaskError::Fatal {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use std::time::Duration;
    /// use taskforge::TaskError;
    ///
    /// let err = TaskError::Timeout { timeout: Duration::from_secs(1) };
    /// assert_eq!(err.as_label(), "task_timeout");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Timeout { .. } => "task_timeout",
            TaskError::Fatal { .. } => "task_fatal",
            TaskError::Fail { .. } => "task_failed",
            TaskError::Canceled => "task_canceled",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            TaskError::Timeout { timeout } => format!("timeout: {timeout:?}"),
            TaskError::Fatal { error } => format!("fatal: {error}"),
            TaskError::Fail { error } => format!("error: {error}"),
            TaskError::Canceled => "cancelled at shutdown".to_string(),
        }
    }

    /// Indicates whether another attempt may be made after this error.
    ///
    /// Returns `true` for [`TaskError::Fail`] and [`TaskError::Timeout`],
    /// `false` otherwise. Retries remain bounded by the task's
    /// `retry_count` either way.
    ///
    /// # Example
    /// ```
    /// use taskforge::TaskError;
    ///
    /// assert!(TaskError::fail("boom").is_retryable());
    /// assert!(!TaskError::fatal("nope").is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(self, TaskError::Fail { .. } | TaskError::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(TaskError::fail("x").is_retryable());
        assert!(TaskError::Timeout {
            timeout: Duration::from_secs(1)
        }
        .is_retryable());
        assert!(!TaskError::fatal("x").is_retryable());
        assert!(!TaskError::Canceled.is_retryable());
    }

    #[test]
    fn labels_are_stable() {
        assert_eq!(TaskError::fail("x").as_label(), "task_failed");
        assert_eq!(TaskError::fatal("x").as_label(), "task_fatal");
        assert_eq!(TaskError::Canceled.as_label(), "task_canceled");
        assert_eq!(
            EngineError::UnknownTaskType { name: "nope".into() }.as_label(),
            "unknown_task_type"
        );
    }
}
