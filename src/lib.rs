//! # taskforge
//!
//! **Taskforge** is an embeddable task scheduling and execution engine for
//! Rust services that need background work (analytics runs, metrics
//! collection, scheduled checks) without blocking request handling.
//!
//! It provides a typed task entity with a lifecycle state machine, a
//! priority-ordered ready queue, a time-ordered deferred queue for
//! future-dated work, bounded-concurrency dispatch to a worker pool,
//! per-attempt timeout enforcement, bounded retry with attempt accounting,
//! and aggregate statistics. Everything is single-process and in-memory:
//! no durability, no cross-process coordination.
//!
//! ## Architecture
//! ```text
//!  collaborators                 Scheduler (facade)
//!  ─────────────   register_fn ──► HandlerRegistry (name → handler)
//!                  create_task ──► resolve + TaskManager::add_task
//!                                        │
//! ┌──────────────────────────────────────▼──────────────────────────────────┐
//! │  TaskManager (engine core)                                              │
//! │   Mutex<EngineState>:                                                   │
//! │     tasks: HashMap<TaskId, Task>       results: HashMap<TaskId, Result> │
//! │     ready: priority desc, FIFO         deferred: earliest due first     │
//! └───────┬─────────────────────────────────────────────────────────────────┘
//!         │ dispatch loop (one per engine)
//!         ├─► promote due deferred tasks → ready
//!         ├─► claim highest-priority pending task (permit first)
//!         ▼
//!     ┌──────────┐  ┌──────────┐      ┌──────────┐
//!     │ worker 1 │  │ worker 2 │  ... │ worker K │   K = max_workers
//!     └────┬─────┘  └────┬─────┘      └────┬─────┘
//!          │ run_attempt: child token + timeout + panic capture
//!          ▼
//!     settle: Ok → Completed + result
//!             Err retryable & attempts left → back to queue (backoff delay)
//!             Err otherwise → Failed + result
//!
//!  every transition ──► Bus (broadcast) ──► SubscriberSet ──► subscribers
//! ```
//!
//! ## Lifecycle
//! ```text
//! add_task      → Pending ──claim──► Running ──Ok──► Completed
//! schedule_task → Scheduled ──due──► Pending         (result stored)
//!                     │                  │  Err, attempts < retry_count
//!                     │ cancel           │ ──────────► Pending (again)
//!                     ▼                  │  Err, exhausted or fatal
//!                 Cancelled              └──────────► Failed (result stored)
//! ```
//!
//! ## Features
//! | Area            | Description                                             | Key types / traits                      |
//! |-----------------|---------------------------------------------------------|-----------------------------------------|
//! | **Facade**      | Name-addressed submission, polling, statistics.         | [`Scheduler`]                           |
//! | **Engine core** | Queues, worker pool, retries, timeouts, lifecycle.      | [`TaskManager`], [`EngineConfig`]       |
//! | **Handlers**    | Async cancelable work units, closures or trait impls.   | [`Handler`], [`HandlerFn`], [`HandlerRef`] |
//! | **Tasks**       | Identity, status, options, payloads, results.           | [`TaskId`], [`TaskStatus`], [`TaskOptions`], [`TaskParams`], [`TaskResult`] |
//! | **Policies**    | Delay between retry attempts (immediate by default).    | [`BackoffPolicy`], [`JitterPolicy`]     |
//! | **Errors**      | Caller-facing vs attempt-facing taxonomy.               | [`EngineError`], [`TaskError`]          |
//! | **Observability** | Broadcast lifecycle events, pluggable subscribers.    | [`events::Event`], [`Subscribe`]        |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use taskforge::{EngineConfig, Scheduler, TaskParams};
//! use serde_json::json;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut cfg = EngineConfig::default();
//!     cfg.max_workers = 2;
//!
//!     let scheduler = Scheduler::new(cfg);
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

mod config;
mod core;
mod error;
mod policies;
mod queues;
mod registry;
mod scheduler;
mod tasks;

pub mod events;
pub mod subscribers;

// ---- Public re-exports ----

pub use config::EngineConfig;
pub use crate::core::{TaskManager, TaskStatistics};
pub use error::{EngineError, TaskError};
pub use policies::{BackoffPolicy, JitterPolicy};
pub use registry::HandlerRegistry;
pub use scheduler::{Scheduler, SchedulerBuilder};
pub use subscribers::Subscribe;
pub use tasks::{
    Handler, HandlerFn, HandlerRef, TaskId, TaskOptions, TaskParams, TaskResult, TaskStatus,
    TaskValue,
};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
