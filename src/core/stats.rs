//! # Aggregate task statistics.
//!
//! [`TaskStatistics`] is a point-in-time snapshot counted from the engine's
//! task table. The per-status counts always sum to `total`.

use serde::Serialize;

use crate::tasks::TaskStatus;

/// Snapshot of task counts by lifecycle state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TaskStatistics {
    /// All tasks currently known to the engine.
    pub total: usize,
    pub pending: usize,
    pub scheduled: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl TaskStatistics {
    /// Counts a snapshot from an iterator of task statuses.
    pub(crate) fn tally(statuses: impl Iterator<Item = TaskStatus>) -> Self {
        let mut stats = Self::default();
        for status in statuses {
            stats.total += 1;
            match status {
                TaskStatus::Pending => stats.pending += 1,
                TaskStatus::Scheduled => stats.scheduled += 1,
                TaskStatus::Running => stats.running += 1,
                TaskStatus::Completed => stats.completed += 1,
                TaskStatus::Failed => stats.failed += 1,
                TaskStatus::Cancelled => stats.cancelled += 1,
            }
        }
        stats
    }

    /// Tasks in a terminal state.
    pub fn finished(&self) -> usize {
        self.completed + self.failed + self.cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_tally_is_all_zero() {
        let stats = TaskStatistics::tally(std::iter::empty());
        assert_eq!(stats, TaskStatistics::default());
        assert_eq!(stats.total, 0);
    }

    #[test]
    fn counts_sum_to_total() {
        let statuses = vec![
            TaskStatus::Pending,
            TaskStatus::Pending,
            TaskStatus::Scheduled,
            TaskStatus::Running,
            TaskStatus::Completed,
            TaskStatus::Failed,
            TaskStatus::Cancelled,
        ];
        let stats = TaskStatistics::tally(statuses.into_iter());
        assert_eq!(stats.total, 7);
        assert_eq!(
            stats.pending
                + stats.scheduled
                + stats.running
                + stats.completed
                + stats.failed
                + stats.cancelled,
            stats.total
        );
        assert_eq!(stats.pending, 2);
        assert_eq!(stats.finished(), 3);
    }
}
