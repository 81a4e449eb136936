//! # Terminal outcome record for a task.
//!
//! Exactly one [`TaskResult`] exists per task once it reaches a terminal
//! state; it is immutable once written. Collaborators fetch it through the
//! facade by task id.

use std::time::Duration;

use crate::error::TaskError;
use crate::tasks::task::{TaskId, TaskStatus};
use crate::tasks::params::TaskValue;

/// Immutable outcome of a finished task.
#[derive(Clone, Debug)]
pub struct TaskResult {
    /// Id of the task this result belongs to.
    pub task_id: TaskId,
    /// Terminal status: `Completed`, `Failed`, or `Cancelled`.
    pub status: TaskStatus,
    /// Handler return value, for completed tasks.
    pub value: Option<TaskValue>,
    /// Captured failure, for failed tasks. Timeouts are recorded as
    /// [`TaskError::Timeout`], distinguishable from handler errors.
    pub error: Option<TaskError>,
    /// Execution attempts consumed.
    pub attempts: u32,
    /// Wall-clock time from first claim to terminal transition; zero for
    /// tasks cancelled before any claim.
    pub duration: Duration,
}

impl TaskResult {
    /// True when the task completed successfully.
    pub fn is_success(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    /// Stable error label (snake_case) for logs/metrics, if the task failed.
    pub fn error_label(&self) -> Option<&'static str> {
        self.error.as_ref().map(TaskError::as_label)
    }
}
