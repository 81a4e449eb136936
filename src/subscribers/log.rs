//! # Simple logging subscriber for debugging and demos.
//!
//! [`LogWriter`] prints events to stdout in a human-readable format.
//!
//! ## Output format
//! ```text
//! [submitted] task=9f2c… type=double
//! [starting] task=9f2c… type=double attempt=1
//! [failed] task=9f2c… type=double err="execution failed: boom" attempt=1
//! [retry] task=9f2c… type=double delay=0ms after_attempt=1
//! [timeout] task=9f2c… type=slow timeout=5000ms
//! [completed] task=9f2c… type=double attempt=2
//! [shutdown-requested]
//! [all-stopped-within-grace]
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Simple stdout logging subscriber.
///
/// Enabled via the `logging` feature. Prints human-readable event
/// descriptions to stdout for debugging and demonstration purposes.
///
/// Not intended for production use - implement a custom [`Subscribe`] for
/// structured logging or metrics collection.
pub struct LogWriter;

fn opt<T: std::fmt::Display>(v: &Option<T>) -> String {
    v.as_ref().map_or_else(|| "-".to_string(), T::to_string)
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let task = e.task.map(|id| id.to_string());
        match e.kind {
            EventKind::TaskSubmitted => {
                println!("[submitted] task={} type={}", opt(&task), opt(&e.task_type));
            }
            EventKind::TaskScheduled => {
                println!(
                    "[scheduled] task={} type={} due_in={}ms",
                    opt(&task),
                    opt(&e.task_type),
                    opt(&e.delay_ms)
                );
            }
            EventKind::TaskPromoted => {
                println!("[promoted] task={} type={}", opt(&task), opt(&e.task_type));
            }
            EventKind::TaskStarting => {
                println!(
                    "[starting] task={} type={} attempt={}",
                    opt(&task),
                    opt(&e.task_type),
                    opt(&e.attempt)
                );
            }
            EventKind::TaskCompleted => {
                println!(
                    "[completed] task={} type={} attempt={}",
                    opt(&task),
                    opt(&e.task_type),
                    opt(&e.attempt)
                );
            }
            EventKind::TaskFailed => {
                println!(
                    "[failed] task={} type={} err={:?} attempt={}",
                    opt(&task),
                    opt(&e.task_type),
                    e.reason.as_deref().unwrap_or("-"),
                    opt(&e.attempt)
                );
            }
            EventKind::TimeoutHit => {
                println!(
                    "[timeout] task={} type={} timeout={}ms",
                    opt(&task),
                    opt(&e.task_type),
                    opt(&e.timeout_ms)
                );
            }
            EventKind::RetryScheduled => {
                println!(
                    "[retry] task={} type={} delay={}ms after_attempt={}",
                    opt(&task),
                    opt(&e.task_type),
                    opt(&e.delay_ms),
                    opt(&e.attempt)
                );
            }
            EventKind::TaskCancelled => {
                println!("[cancelled] task={} type={}", opt(&task), opt(&e.task_type));
            }
            EventKind::HandlerReplaced => {
                println!("[handler-replaced] type={}", opt(&e.task_type));
            }
            EventKind::ShutdownRequested => {
                println!("[shutdown-requested]");
            }
            EventKind::AllStoppedWithin => {
                println!("[all-stopped-within-grace]");
            }
            EventKind::GraceExceeded => {
                println!("[grace-exceeded]");
            }
            EventKind::SubscriberPanicked | EventKind::SubscriberOverflow => {
                println!(
                    "[subscriber-issue] reason={:?}",
                    e.reason.as_deref().unwrap_or("-")
                );
            }
        }
    }

    fn name(&self) -> &'static str {
        "log_writer"
    }
}
