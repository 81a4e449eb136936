//! # Run a single execution attempt.
//!
//! Executes one attempt of a task's handler with optional timeout
//! supervision. The attempt gets a **child** cancellation token derived from
//! the engine's runtime token:
//!
//! - engine shutdown cancels the parent, which propagates to the child;
//! - a timeout cancels only the child, so one slow attempt never affects the
//!   rest of the engine.
//!
//! ## Rules
//! - Timeout elapsing is reported as [`TaskError::Timeout`]; the handler's
//!   own result is discarded once the budget is spent.
//! - A panicking handler is caught (`catch_unwind`) and converted to a
//!   retryable [`TaskError::Fail`]; a single task can never take down the
//!   dispatch loop.
//! - The function itself never publishes events or touches engine state;
//!   outcome accounting belongs to the manager's settle step.

use std::time::Duration;

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::tasks::{HandlerRef, TaskParams, TaskValue};

/// Executes one attempt of `handler`, supervised by `timeout` if configured.
pub(crate) async fn run_attempt(
    handler: HandlerRef,
    params: TaskParams,
    parent: &CancellationToken,
    timeout: Option<Duration>,
) -> Result<TaskValue, TaskError> {
    let child = parent.child_token();
    let attempt = AssertUnwindSafe(handler.run(child.clone(), params)).catch_unwind();

    let res = match timeout.filter(|d| !d.is_zero()) {
        Some(dur) => match time::timeout(dur, attempt).await {
            Ok(r) => r,
            Err(_elapsed) => {
                child.cancel();
                return Err(TaskError::Timeout { timeout: dur });
            }
        },
        None => attempt.await,
    };

    match res {
        Ok(handler_result) => handler_result,
        Err(panic) => Err(TaskError::Fail {
            error: panic_message(panic.as_ref()),
        }),
    }
}

/// Best-effort extraction of a panic payload message.
fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("handler panicked: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("handler panicked: {s}")
    } else {
        "handler panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::HandlerFn;
    use serde_json::json;

    #[tokio::test]
    async fn success_returns_value() {
        let h: HandlerRef = HandlerFn::arc(|_ctx, _p| async move { Ok(json!("done")) });
        let out = run_attempt(h, TaskParams::new(), &CancellationToken::new(), None)
            .await
            .unwrap();
        assert_eq!(out, json!("done"));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_cancels_child_and_reports_distinct_error() {
        let h: HandlerRef = HandlerFn::arc(|ctx: CancellationToken, _p| async move {
            // Never finishes on its own; exits only via cancellation.
            ctx.cancelled().await;
            Err(TaskError::Canceled)
        });
        let err = run_attempt(
            h,
            TaskParams::new(),
            &CancellationToken::new(),
            Some(Duration::from_millis(50)),
        )
        .await
        .unwrap_err();
        assert_eq!(err.as_label(), "task_timeout");
    }

    #[tokio::test]
    async fn panic_is_captured_as_failure() {
        let h: HandlerRef = HandlerFn::arc(|_ctx, _p| async move {
            panic!("boom");
            #[allow(unreachable_code)]
            Ok(json!(null))
        });
        let err = run_attempt(h, TaskParams::new(), &CancellationToken::new(), None)
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert!(err.to_string().contains("boom"));
    }

    #[tokio::test]
    async fn zero_timeout_means_unlimited() {
        let h: HandlerRef = HandlerFn::arc(|_ctx, _p| async move { Ok(json!(1)) });
        let out = run_attempt(
            h,
            TaskParams::new(),
            &CancellationToken::new(),
            Some(Duration::ZERO),
        )
        .await
        .unwrap();
        assert_eq!(out, json!(1));
    }
}
