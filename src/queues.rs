//! # Ready and deferred queues.
//!
//! Two heap-backed queues order the engine's claimable work:
//!
//! - [`ReadyQueue`] — tasks eligible to run now, ordered by
//!   `(priority desc, submission seq asc)`: higher priority dispatches first,
//!   FIFO within equal priority.
//! - [`DeferredQueue`] — future-dated tasks ordered by due instant
//!   (earliest first); the dispatch loop promotes due entries into the ready
//!   queue.
//!
//! ## Stale entries
//! Both queues store lightweight entries (`id` + ordering keys), not tasks.
//! Cancellation does not remove a task's entry; the dispatch loop validates
//! the task's status against the task table when it pops an entry and skips
//! entries whose task is no longer in the expected state. Every push
//! corresponds to exactly one status transition into `Pending`/`Scheduled`,
//! so a task never has two live entries at once.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use tokio::time::Instant;

use crate::tasks::TaskId;

/// Entry in the ready queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ReadyEntry {
    pub id: TaskId,
    pub priority: i32,
    /// Submission sequence; lower = submitted earlier.
    pub seq: u64,
}

impl Ord for ReadyEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-heap: higher priority first, then earlier submission.
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for ReadyEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Priority-ordered queue of tasks eligible to run now.
#[derive(Default)]
pub(crate) struct ReadyQueue {
    heap: BinaryHeap<ReadyEntry>,
}

impl ReadyQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: ReadyEntry) {
        self.heap.push(entry);
    }

    /// Pops the highest-priority entry (FIFO within equal priority).
    pub fn pop(&mut self) -> Option<ReadyEntry> {
        self.heap.pop()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

/// Entry in the deferred queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DueEntry {
    pub id: TaskId,
    pub due: Instant,
    pub seq: u64,
}

impl Ord for DueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap, we want the earliest due first.
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for DueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Time-ordered queue of future-dated tasks awaiting promotion.
#[derive(Default)]
pub(crate) struct DeferredQueue {
    heap: BinaryHeap<DueEntry>,
}

impl DeferredQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: DueEntry) {
        self.heap.push(entry);
    }

    /// Pops the earliest entry if its due instant has passed.
    pub fn pop_due(&mut self, now: Instant) -> Option<DueEntry> {
        if self.heap.peek().is_some_and(|e| e.due <= now) {
            self.heap.pop()
        } else {
            None
        }
    }

    /// Earliest due instant across all entries, if any.
    pub fn next_due(&self) -> Option<Instant> {
        self.heap.peek().map(|e| e.due)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn ready(priority: i32, seq: u64) -> ReadyEntry {
        ReadyEntry {
            id: TaskId::new(),
            priority,
            seq,
        }
    }

    #[test]
    fn ready_orders_by_priority_desc() {
        let mut q = ReadyQueue::new();
        assert!(q.is_empty());
        q.push(ready(1, 0));
        q.push(ready(5, 1));
        q.push(ready(3, 2));
        assert_eq!(q.len(), 3);

        assert_eq!(q.pop().unwrap().priority, 5);
        assert_eq!(q.pop().unwrap().priority, 3);
        assert_eq!(q.pop().unwrap().priority, 1);
        assert!(q.pop().is_none());
    }

    #[test]
    fn ready_fifo_within_equal_priority() {
        let mut q = ReadyQueue::new();
        let first = ready(2, 10);
        let second = ready(2, 11);
        let third = ready(2, 12);
        q.push(second);
        q.push(third);
        q.push(first);

        assert_eq!(q.pop().unwrap().id, first.id);
        assert_eq!(q.pop().unwrap().id, second.id);
        assert_eq!(q.pop().unwrap().id, third.id);
    }

    #[test]
    fn ready_negative_priority_sorts_last() {
        let mut q = ReadyQueue::new();
        q.push(ready(-5, 0));
        q.push(ready(0, 1));
        assert_eq!(q.pop().unwrap().priority, 0);
        assert_eq!(q.pop().unwrap().priority, -5);
    }

    #[tokio::test]
    async fn deferred_pops_earliest_first() {
        let now = Instant::now();
        let mut q = DeferredQueue::new();
        let late = DueEntry {
            id: TaskId::new(),
            due: now + Duration::from_secs(20),
            seq: 0,
        };
        let soon = DueEntry {
            id: TaskId::new(),
            due: now + Duration::from_secs(5),
            seq: 1,
        };
        q.push(late);
        q.push(soon);

        assert_eq!(q.next_due(), Some(soon.due));
        // Nothing due yet.
        assert!(q.pop_due(now).is_none());
        assert_eq!(q.len(), 2);

        // Both due: earliest comes out first.
        let far_future = now + Duration::from_secs(60);
        assert_eq!(q.pop_due(far_future).unwrap().id, soon.id);
        assert_eq!(q.pop_due(far_future).unwrap().id, late.id);
        assert!(q.pop_due(far_future).is_none());
        assert!(q.is_empty());
    }

    #[tokio::test]
    async fn deferred_boundary_is_inclusive() {
        let now = Instant::now();
        let mut q = DeferredQueue::new();
        q.push(DueEntry {
            id: TaskId::new(),
            due: now,
            seq: 0,
        });
        assert!(q.pop_due(now).is_some(), "due == now counts as due");
    }
}
