//! # Scheduler facade: the public surface collaborators call.
//!
//! [`Scheduler`] bundles a [`HandlerRegistry`] with a [`TaskManager`]:
//! collaborators register handlers under stable names once at startup, then
//! submit work by name and poll for results by id. The facade is a thin
//! pass-through — every queueing, retry, and timeout decision lives in the
//! manager.
//!
//! ```text
//! register_fn("double", …)     create_task("double", params)
//!        │                            │
//!        ▼                            ▼
//!  HandlerRegistry ──resolve──► TaskManager ──► queues ──► workers ──► results
//! ```
//!
//! ## Example
//! ```rust
//! use taskforge::{Scheduler, EngineConfig, TaskParams};
//! use serde_json::json;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let scheduler = Scheduler::new(EngineConfig::default());
//!     scheduler.register_fn("double", |_ctx, params: TaskParams| async move {
//!         let x = params.get("x").and_then(|v| v.as_i64()).unwrap_or(0);
//!         Ok(json!(x * 2))
//!     });
//!     scheduler.start()?;
//!
//!     let id = scheduler
//!         .create_task("double", TaskParams::new().with_kwarg("x", json!(21)))
//!         .await?;
//!     let result = scheduler.wait_result(id).await.expect("terminal result");
//!     assert_eq!(result.value, Some(json!(42)));
//!
//!     scheduler.stop().await?;
//!     Ok(())
//! }
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::EngineConfig;
use crate::core::{TaskManager, TaskStatistics};
use crate::error::{EngineError, TaskError};
use crate::events::{Bus, Event, EventKind};
use crate::registry::HandlerRegistry;
use crate::subscribers::Subscribe;
use crate::tasks::{
    HandlerFn, HandlerRef, TaskId, TaskOptions, TaskParams, TaskResult, TaskStatus, TaskValue,
};

/// Public surface of the engine: registry lookups plus manager pass-through.
pub struct Scheduler {
    registry: HandlerRegistry,
    manager: TaskManager,
}

impl Scheduler {
    /// Creates a scheduler with no subscribers.
    pub fn new(cfg: EngineConfig) -> Self {
        Self::builder(cfg).build()
    }

    /// Starts building a scheduler; attach subscribers before `build()`.
    pub fn builder(cfg: EngineConfig) -> SchedulerBuilder {
        SchedulerBuilder {
            cfg,
            subscribers: Vec::new(),
        }
    }

    /// Registers `handler` under `name`.
    ///
    /// Re-registering an existing name replaces the handler (last write wins)
    /// and publishes [`EventKind::HandlerReplaced`] so the swap is visible,
    /// not silent. Registration is expected to happen before the first
    /// submission referencing the name.
    pub fn register_task_function(&self, name: impl Into<String>, handler: HandlerRef) {
        let name = name.into();
        if self.registry.register(name.clone(), handler).is_some() {
            self.manager
                .bus()
                .publish(Event::new(EventKind::HandlerReplaced).with_task_type(name));
        }
    }

    /// Convenience: registers a closure as a handler.
    pub fn register_fn<F, Fut>(&self, name: impl Into<String>, f: F)
    where
        F: Fn(CancellationToken, TaskParams) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<TaskValue, TaskError>> + Send + 'static,
    {
        self.register_task_function(name, HandlerFn::arc(f));
    }

    /// Submits an immediately-ready task under default options.
    ///
    /// Non-blocking: returns the task id without waiting for execution.
    /// Fails with [`EngineError::UnknownTaskType`] for unregistered names.
    pub async fn create_task(
        &self,
        task_type: &str,
        params: TaskParams,
    ) -> Result<TaskId, EngineError> {
        self.create_task_with(task_type, params, self.default_options())
            .await
    }

    /// Submits an immediately-ready task with explicit options.
    pub async fn create_task_with(
        &self,
        task_type: &str,
        params: TaskParams,
        opts: TaskOptions,
    ) -> Result<TaskId, EngineError> {
        let handler = self.registry.resolve(task_type)?;
        self.manager
            .add_task(task_type, handler, params, opts)
            .await
    }

    /// Submits a task that must not run before `at` (must be ≥ now).
    pub async fn schedule_task(
        &self,
        task_type: &str,
        params: TaskParams,
        at: Instant,
    ) -> Result<TaskId, EngineError> {
        self.schedule_task_with(task_type, params, self.default_options(), at)
            .await
    }

    /// Submits a future-dated task with explicit options.
    pub async fn schedule_task_with(
        &self,
        task_type: &str,
        params: TaskParams,
        opts: TaskOptions,
        at: Instant,
    ) -> Result<TaskId, EngineError> {
        let handler = self.registry.resolve(task_type)?;
        self.manager
            .schedule_task(task_type, handler, params, opts, at)
            .await
    }

    /// Convenience: schedules a task `delay` from now.
    pub async fn schedule_task_in(
        &self,
        task_type: &str,
        params: TaskParams,
        delay: Duration,
    ) -> Result<TaskId, EngineError> {
        self.schedule_task(task_type, params, Instant::now() + delay)
            .await
    }

    /// Best-effort cancellation; `true` only for tasks not yet claimed.
    pub async fn cancel_task(&self, id: TaskId) -> bool {
        self.manager.cancel_task(id).await
    }

    /// Non-blocking read of a task's terminal result ("poll" variant).
    pub async fn get_task_result(&self, id: TaskId) -> Option<TaskResult> {
        self.manager.task_result(id).await
    }

    /// Blocks until the task is terminal ("await" variant); `None` for
    /// unknown ids.
    pub async fn wait_result(&self, id: TaskId) -> Option<TaskResult> {
        self.manager.wait_result(id).await
    }

    /// Current lifecycle state of a task, if known.
    pub async fn get_task_status(&self, id: TaskId) -> Option<TaskStatus> {
        self.manager.task_status(id).await
    }

    /// Point-in-time snapshot of task counts.
    pub async fn get_task_statistics(&self) -> TaskStatistics {
        self.manager.statistics().await
    }

    /// Drops terminal tasks and their results; returns the evicted count.
    pub async fn clear_finished(&self) -> usize {
        self.manager.clear_finished().await
    }

    /// Begins dispatch. Idempotent while running.
    pub fn start(&self) -> Result<(), EngineError> {
        self.manager.start()
    }

    /// Winds the engine down; see [`TaskManager::stop`] for the exact
    /// in-flight semantics.
    pub async fn stop(&self) -> Result<(), EngineError> {
        self.manager.stop().await
    }

    /// Direct access to the engine core (direct-handler submissions,
    /// configuration).
    pub fn manager(&self) -> &TaskManager {
        &self.manager
    }

    /// Event bus handle; subscribe for observability or test assertions.
    pub fn bus(&self) -> &Bus {
        self.manager.bus()
    }

    fn default_options(&self) -> TaskOptions {
        TaskOptions::with_defaults(self.manager.config())
    }
}

/// Builder for [`Scheduler`]; attaches subscribers before construction.
pub struct SchedulerBuilder {
    cfg: EngineConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl SchedulerBuilder {
    /// Adds one subscriber.
    pub fn with_subscriber(mut self, sub: Arc<dyn Subscribe>) -> Self {
        self.subscribers.push(sub);
        self
    }

    /// Adds a batch of subscribers.
    pub fn with_subscribers(mut self, subs: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers.extend(subs);
        self
    }

    /// Builds the scheduler.
    pub fn build(self) -> Scheduler {
        Scheduler {
            registry: HandlerRegistry::new(),
            manager: TaskManager::with_subscribers(self.cfg, self.subscribers),
        }
    }
}
