//! # Handler abstraction and function-backed handler implementation.
//!
//! This module defines the [`Handler`] trait (async, cancelable, parameterized)
//! and a convenient function-backed implementation [`HandlerFn`]. The common
//! handle type is [`HandlerRef`], an `Arc<dyn Handler>` suitable for sharing
//! between the registry and the tasks that reference it.
//!
//! A handler receives a [`CancellationToken`] and should periodically check it
//! to stop cooperatively during shutdown or timeout supervision.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::tasks::params::{TaskParams, TaskValue};

/// Shared handle to a handler (`Arc<dyn Handler>`).
pub type HandlerRef = Arc<dyn Handler>;

impl std::fmt::Debug for dyn Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Handler")
    }
}

/// # Asynchronous, cancelable unit of work.
///
/// A `Handler` executes one attempt of a task: it receives the task's
/// [`TaskParams`] and a [`CancellationToken`], and returns a [`TaskValue`]
/// on success. Implementors should regularly check cancellation and exit
/// promptly during shutdown; the engine cancels the token when an attempt
/// times out or the engine stops.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use tokio_util::sync::CancellationToken;
/// use taskforge::{Handler, TaskError, TaskParams, TaskValue};
///
/// struct Doubler;
///
/// #[async_trait]
/// impl Handler for Doubler {
///     async fn run(&self, ctx: CancellationToken, params: TaskParams) -> Result<TaskValue, TaskError> {
///         if ctx.is_cancelled() {
///             return Err(TaskError::Canceled);
///         }
///         let x = params.get("x").and_then(|v| v.as_i64())
///             .ok_or_else(|| TaskError::fatal("missing kwarg \"x\""))?;
///         Ok(serde_json::json!(x * 2))
///     }
/// }
/// ```
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    /// Executes one attempt with the given parameters.
    ///
    /// Implementations should check `ctx.is_cancelled()` at suspension points
    /// and return [`TaskError::Canceled`] quickly to honor graceful shutdown.
    async fn run(&self, ctx: CancellationToken, params: TaskParams) -> Result<TaskValue, TaskError>;
}

/// Function-backed handler implementation.
///
/// Wraps a closure that *creates* a new future per attempt, so no state is
/// shared between attempts unless the closure captures an `Arc<...>`
/// explicitly.
///
/// ## Example
/// ```rust
/// use tokio_util::sync::CancellationToken;
/// use taskforge::{HandlerFn, HandlerRef, TaskError, TaskParams};
///
/// let h: HandlerRef = HandlerFn::arc(|_ctx: CancellationToken, params: TaskParams| async move {
///     let n = params.arg(0).and_then(|v| v.as_i64()).unwrap_or(0);
///     Ok(serde_json::json!(n + 1))
/// });
/// ```
pub struct HandlerFn<F> {
    f: F,
}

impl<F> HandlerFn<F> {
    /// Creates a new function-backed handler.
    ///
    /// Prefer [`HandlerFn::arc`] when you immediately need a [`HandlerRef`].
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Creates the handler and returns it as a shared handle.
    ///
    /// Bounded like the [`Handler`] impl so closure parameter and error
    /// types infer at the call site.
    pub fn arc<Fut>(f: F) -> Arc<Self>
    where
        F: Fn(CancellationToken, TaskParams) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<TaskValue, TaskError>> + Send + 'static,
    {
        Arc::new(Self::new(f))
    }
}

#[async_trait]
impl<F, Fut> Handler for HandlerFn<F>
where
    F: Fn(CancellationToken, TaskParams) -> Fut + Send + Sync + 'static, // Fn, not FnMut
    Fut: Future<Output = Result<TaskValue, TaskError>> + Send + 'static,
{
    async fn run(&self, ctx: CancellationToken, params: TaskParams) -> Result<TaskValue, TaskError> {
        (self.f)(ctx, params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn handler_fn_executes_closure() {
        let h: HandlerRef = HandlerFn::arc(|_ctx, params: TaskParams| async move {
            let n = params.arg(0).and_then(|v| v.as_i64()).unwrap_or(0);
            Ok(json!(n * 2))
        });

        let out = h
            .run(
                CancellationToken::new(),
                TaskParams::new().with_arg(json!(21)),
            )
            .await
            .unwrap();
        assert_eq!(out, json!(42));
    }

    #[tokio::test]
    async fn handler_fn_propagates_errors() {
        let h: HandlerRef =
            HandlerFn::arc(|_ctx, _params| async move { Err(TaskError::fail("nope")) });

        let err = h
            .run(CancellationToken::new(), TaskParams::new())
            .await
            .unwrap_err();
        assert_eq!(err.as_label(), "task_failed");
    }
}
