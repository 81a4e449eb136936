//! Task abstractions: handlers, parameters, the task entity, and results.
//!
//! This module provides the core task-related types:
//! - [`Handler`] - trait for implementing async cancelable task handlers
//! - [`HandlerFn`] - function-based handler implementation
//! - [`HandlerRef`] - shared reference to a handler (`Arc<dyn Handler>`)
//! - [`TaskParams`] / [`TaskValue`] - opaque payloads in and out of handlers
//! - [`TaskId`] / [`TaskStatus`] - identity and lifecycle state
//! - [`TaskOptions`] - per-submission priority/retry/timeout overrides
//! - [`TaskResult`] - immutable terminal outcome record

mod handler;
mod options;
mod params;
mod result;
mod task;

pub use handler::{Handler, HandlerFn, HandlerRef};
pub use options::TaskOptions;
pub use params::{TaskParams, TaskValue};
pub use result::TaskResult;
pub use task::{TaskId, TaskStatus};

pub(crate) use task::Task;
