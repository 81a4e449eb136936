//! # Lifecycle events emitted by the engine.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Submission events**: tasks entering the engine (submitted, scheduled, promoted)
//! - **Execution events**: attempt flow (starting, completed, failed, timeout, retry)
//! - **Control events**: cancellation and handler replacement
//! - **Shutdown events**: stop sequence progress
//!
//! The [`Event`] struct carries additional metadata such as timestamps, the
//! task id and type, attempt numbers, and retry delays.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Use `seq` to restore the exact order when events are
//! delivered out of order.
//!
//! ## Example
//! ```rust
//! use taskforge::events::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::TaskFailed)
//!     .with_task_type("demo-task")
//!     .with_reason("boom")
//!     .with_attempt(3);
//!
//! assert_eq!(ev.kind, EventKind::TaskFailed);
//! assert_eq!(ev.task_type.as_deref(), Some("demo-task"));
//! assert_eq!(ev.reason.as_deref(), Some("boom"));
//! ```

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use crate::tasks::TaskId;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of engine events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Submission events ===
    /// An immediate task entered the ready queue.
    ///
    /// Sets: `task`, `task_type`, `at`, `seq`.
    TaskSubmitted,

    /// A future-dated task entered the deferred queue.
    ///
    /// Sets: `task`, `task_type`, `delay_ms` (time until due), `at`, `seq`.
    TaskScheduled,

    /// A deferred task came due and moved to the ready queue.
    ///
    /// Sets: `task`, `task_type`, `at`, `seq`.
    TaskPromoted,

    // === Execution events ===
    /// A worker claimed the task and is starting an attempt.
    ///
    /// Sets: `task`, `task_type`, `attempt` (1-based), `at`, `seq`.
    TaskStarting,

    /// The task completed successfully; its result is available.
    ///
    /// Sets: `task`, `task_type`, `attempt`, `at`, `seq`.
    TaskCompleted,

    /// An attempt failed. Emitted for every failed attempt; when the failure
    /// is retryable and attempts remain, a `RetryScheduled` event follows.
    ///
    /// Sets: `task`, `task_type`, `attempt`, `reason`, `at`, `seq`.
    TaskFailed,

    /// An attempt exceeded its configured timeout. Always followed by
    /// `TaskFailed` for the same attempt.
    ///
    /// Sets: `task`, `task_type`, `attempt`, `timeout_ms`, `at`, `seq`.
    TimeoutHit,

    /// A failed task was re-enqueued for another attempt.
    ///
    /// Sets: `task`, `task_type`, `attempt` (the attempt that failed),
    /// `delay_ms` (0 for immediate re-enqueue), `at`, `seq`.
    RetryScheduled,

    // === Control events ===
    /// A pending or scheduled task was cancelled before dispatch.
    ///
    /// Sets: `task`, `task_type`, `at`, `seq`.
    TaskCancelled,

    /// A handler registration replaced an existing one (last write wins).
    ///
    /// Sets: `task_type`, `at`, `seq`.
    HandlerReplaced,

    // === Shutdown events ===
    /// Engine stop requested; no further tasks will be dispatched.
    ///
    /// Sets: `at`, `seq`.
    ShutdownRequested,

    /// All in-flight workers finished within the configured grace period.
    ///
    /// Sets: `at`, `seq`.
    AllStoppedWithin,

    /// Grace period expired with workers still running; their tasks were
    /// marked failed (abandoned).
    ///
    /// Sets: `at`, `seq`.
    GraceExceeded,

    // === Subscriber events ===
    /// A subscriber panicked while processing an event.
    ///
    /// Sets: `reason`, `at`, `seq`.
    SubscriberPanicked,

    /// A subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `reason`, `at`, `seq`.
    SubscriberOverflow,
}

/// Engine event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Id of the task, if applicable.
    pub task: Option<TaskId>,
    /// Task type name, if applicable.
    pub task_type: Option<Arc<str>>,
    /// Attempt count (starting from 1).
    pub attempt: Option<u32>,
    /// Attempt timeout in milliseconds (compact).
    pub timeout_ms: Option<u32>,
    /// Delay until due / until retry, in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with the current timestamp and
    /// next global sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            task: None,
            task_type: None,
            attempt: None,
            timeout_ms: None,
            delay_ms: None,
            reason: None,
        }
    }

    /// Attaches a task id.
    #[inline]
    pub fn with_task(mut self, id: TaskId) -> Self {
        self.task = Some(id);
        self
    }

    /// Attaches a task type name.
    #[inline]
    pub fn with_task_type(mut self, name: impl Into<Arc<str>>) -> Self {
        self.task_type = Some(name.into());
        self
    }

    /// Attaches an attempt count.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a timeout duration (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        self.timeout_ms = Some(compact_ms(d));
        self
    }

    /// Attaches a delay duration (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        self.delay_ms = Some(compact_ms(d));
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// True for events that mark a task terminal (completed/failed/cancelled).
    ///
    /// `TaskFailed` is terminal only when not followed by `RetryScheduled`;
    /// this predicate is therefore a necessary, not sufficient, signal and is
    /// mainly useful for log filtering.
    #[inline]
    pub fn is_outcome(&self) -> bool {
        matches!(
            self.kind,
            EventKind::TaskCompleted | EventKind::TaskFailed | EventKind::TaskCancelled
        )
    }
}

/// Saturating duration → u32 milliseconds.
fn compact_ms(d: Duration) -> u32 {
    d.as_millis().min(u128::from(u32::MAX)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seq_is_monotonic() {
        let a = Event::new(EventKind::TaskSubmitted);
        let b = Event::new(EventKind::TaskSubmitted);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn builders_set_fields() {
        let id = TaskId::new();
        let ev = Event::new(EventKind::RetryScheduled)
            .with_task(id)
            .with_task_type("metrics")
            .with_attempt(2)
            .with_delay(Duration::from_millis(250))
            .with_reason("flaky upstream");

        assert_eq!(ev.task, Some(id));
        assert_eq!(ev.task_type.as_deref(), Some("metrics"));
        assert_eq!(ev.attempt, Some(2));
        assert_eq!(ev.delay_ms, Some(250));
        assert_eq!(ev.reason.as_deref(), Some("flaky upstream"));
    }

    #[test]
    fn compact_ms_saturates() {
        let huge = Duration::from_secs(u64::MAX / 2);
        let ev = Event::new(EventKind::TimeoutHit).with_timeout(huge);
        assert_eq!(ev.timeout_ms, Some(u32::MAX));
    }
}
