//! # Task entity and lifecycle state machine.
//!
//! A [`Task`] is one unit of deferred work: a handler reference plus the
//! parameters, priority, retry budget, and timeout it runs under. Its
//! [`TaskStatus`] moves through a strict state machine:
//!
//! ```text
//!                    ┌────────────┐  now >= scheduled_at   ┌─────────┐
//! schedule_task ───► │ Scheduled  │ ─────────────────────► │ Pending │ ◄─── add_task
//!                    └─────┬──────┘       (promotion)      └──┬───┬──┘
//!                          │ cancel                   cancel │   │ worker claim
//!                          ▼                                 ▼   │ (attempts += 1)
//!                    ┌────────────┐                 ┌───────────┐│
//!                    │ Cancelled  │ ◄──────────────►│ Cancelled ││
//!                    └────────────┘                 └───────────┘▼
//!                                                         ┌─────────┐
//!                            retryable failure,           │ Running │
//!                    ┌───── attempts < retry_count ◄──────┴────┬────┘
//!                    │         (back to Pending)               │
//!                    ▼                                 Ok      │   failure exhausted / fatal
//!                ┌─────────┐                       ┌───────────▼─┐  ┌────────┐
//!                │ Pending │                       │  Completed  │  │ Failed │
//!                └─────────┘                       └─────────────┘  └────────┘
//! ```
//!
//! Terminal states (`Completed`, `Failed`, `Cancelled`) are final; no
//! transition resurrects a terminal task. All transition methods are called
//! with the engine state lock held, so per-task mutation is serialized.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

// Virtual-clock-aware monotonic time; agrees with the dispatch loop's timers
// under tokio's paused test clock.
use tokio::time::Instant;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::tasks::handler::HandlerRef;
use crate::tasks::params::TaskParams;

/// Opaque unique task identifier, generated at creation, immutable.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Generates a fresh random id.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Debug for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TaskId({})", self.0)
    }
}

/// Current lifecycle stage of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Eligible to run now, waiting in the ready queue.
    Pending,
    /// Future-dated, waiting in the deferred queue.
    Scheduled,
    /// Currently executing on a worker.
    Running,
    /// Terminal: handler returned successfully.
    Completed,
    /// Terminal: retries exhausted, non-retryable error, or abandoned at shutdown.
    Failed,
    /// Terminal: cancelled before any worker claimed it.
    Cancelled,
}

impl TaskStatus {
    /// True for `Completed`, `Failed`, and `Cancelled`.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Scheduled => "scheduled",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
        }
    }
}

/// One unit of deferred work owned by the engine.
///
/// Crate-private: collaborators only ever hold the [`TaskId`] returned at
/// submission and query through the facade.
pub(crate) struct Task {
    pub id: TaskId,
    pub task_type: Arc<str>,
    pub handler: HandlerRef,
    pub params: TaskParams,
    /// Higher dispatches first among simultaneously ready tasks.
    pub priority: i32,
    /// Maximum number of execution attempts permitted (>= 1).
    pub retry_count: u32,
    /// Attempts already made; incremented on each worker claim.
    pub attempts: u32,
    /// Per-attempt wall-clock budget (`None` = unlimited).
    pub timeout: Option<Duration>,
    pub status: TaskStatus,
    /// Submission sequence number; FIFO tie-break within equal priority.
    pub seq: u64,
    pub created_at: SystemTime,
    /// Instant before which the task must not become ready; `None` for
    /// immediate tasks.
    pub scheduled_at: Option<Instant>,
    /// Set on the first worker claim.
    pub started_at: Option<Instant>,
    /// Set on the terminal transition.
    pub completed_at: Option<Instant>,
}

impl Task {
    /// Builds a new task; `Scheduled` when `scheduled_at` is set, `Pending`
    /// otherwise.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        task_type: Arc<str>,
        handler: HandlerRef,
        params: TaskParams,
        priority: i32,
        retry_count: u32,
        timeout: Option<Duration>,
        seq: u64,
        scheduled_at: Option<Instant>,
    ) -> Self {
        let status = if scheduled_at.is_some() {
            TaskStatus::Scheduled
        } else {
            TaskStatus::Pending
        };
        Self {
            id: TaskId::new(),
            task_type,
            handler,
            params,
            priority,
            retry_count: retry_count.max(1),
            attempts: 0,
            timeout,
            status,
            seq,
            created_at: SystemTime::now(),
            scheduled_at,
            started_at: None,
            completed_at: None,
        }
    }

    /// `Scheduled` → `Pending`: the scheduled instant has passed.
    pub fn promote(&mut self) {
        debug_assert_eq!(self.status, TaskStatus::Scheduled);
        self.status = TaskStatus::Pending;
    }

    /// `Pending` → `Running`: a worker claims the task.
    ///
    /// Increments `attempts` and stamps `started_at` on the first claim.
    pub fn claim(&mut self, now: Instant) {
        debug_assert_eq!(self.status, TaskStatus::Pending);
        self.status = TaskStatus::Running;
        self.attempts += 1;
        self.started_at.get_or_insert(now);
    }

    /// `Running` → `Completed`.
    pub fn complete(&mut self, now: Instant) {
        debug_assert_eq!(self.status, TaskStatus::Running);
        self.status = TaskStatus::Completed;
        self.completed_at = Some(now);
    }

    /// `Running` → `Pending`: attempt failed but the retry budget allows
    /// another run. The task keeps its original priority and seq.
    pub fn retry(&mut self) {
        debug_assert_eq!(self.status, TaskStatus::Running);
        debug_assert!(self.attempts < self.retry_count);
        self.status = TaskStatus::Pending;
    }

    /// `Running` → `Failed`: retries exhausted, fatal error, or abandoned.
    pub fn fail(&mut self, now: Instant) {
        debug_assert_eq!(self.status, TaskStatus::Running);
        self.status = TaskStatus::Failed;
        self.completed_at = Some(now);
    }

    /// `Pending`/`Scheduled` → `Cancelled`; returns `false` (and does
    /// nothing) in any other state. A task claimed just before the
    /// cancellation request loses the race and runs to completion.
    pub fn cancel(&mut self, now: Instant) -> bool {
        match self.status {
            TaskStatus::Pending | TaskStatus::Scheduled => {
                self.status = TaskStatus::Cancelled;
                self.completed_at = Some(now);
                true
            }
            _ => false,
        }
    }

    /// True while `attempts < retry_count`.
    pub fn has_attempts_left(&self) -> bool {
        self.attempts < self.retry_count
    }

    /// Wall-clock time from first claim to the terminal transition;
    /// zero for tasks cancelled before any claim.
    pub fn duration(&self) -> Duration {
        match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => end.duration_since(start),
            _ => Duration::ZERO,
        }
    }
}
