//! # Opaque parameter payloads passed to handlers.
//!
//! [`TaskParams`] bundles the positional (`args`) and named (`kwargs`)
//! parameters a collaborator submits alongside a task type name. The engine
//! never inspects the payload; it is handed to the handler verbatim at each
//! execution attempt.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// What a handler returns on success. Opaque to the engine.
pub type TaskValue = Value;

/// Positional and named parameters for one task.
///
/// ## Example
/// ```rust
/// use taskforge::TaskParams;
/// use serde_json::json;
///
/// let params = TaskParams::new()
///     .with_arg(json!(21))
///     .with_kwarg("mode", json!("fast"));
///
/// assert_eq!(params.arg(0), Some(&json!(21)));
/// assert_eq!(params.get("mode"), Some(&json!("fast")));
/// assert_eq!(params.arg(1), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskParams {
    /// Positional parameters, in submission order.
    pub args: Vec<Value>,
    /// Named parameters.
    pub kwargs: Map<String, Value>,
}

impl TaskParams {
    /// Creates an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a positional parameter.
    pub fn with_arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    /// Sets a named parameter (replacing any previous value for the key).
    pub fn with_kwarg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.kwargs.insert(key.into(), value.into());
        self
    }

    /// Returns the positional parameter at `index`, if present.
    pub fn arg(&self, index: usize) -> Option<&Value> {
        self.args.get(index)
    }

    /// Returns the named parameter under `key`, if present.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.kwargs.get(key)
    }

    /// True when neither positional nor named parameters are present.
    pub fn is_empty(&self) -> bool {
        self.args.is_empty() && self.kwargs.is_empty()
    }
}

impl From<Vec<Value>> for TaskParams {
    fn from(args: Vec<Value>) -> Self {
        Self {
            args,
            kwargs: Map::new(),
        }
    }
}
