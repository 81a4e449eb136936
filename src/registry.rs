//! # Handler registry: string-addressed task creation.
//!
//! [`HandlerRegistry`] maps stable task-type names to executable handlers so
//! collaborators can request work by name instead of holding function
//! references. Registration is expected to happen once at startup, before any
//! submission that references the name; resolution is the hot path.
//!
//! ## Rules
//! - Re-registering a name replaces the previous handler (**last write
//!   wins**); the replaced handler is returned so the caller can log the
//!   replacement explicitly rather than leaving it silently ambiguous.
//! - Resolving an unknown name fails with
//!   [`EngineError::UnknownTaskType`].

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::EngineError;
use crate::tasks::HandlerRef;

/// Name → handler mapping.
///
/// Internally a `std::sync::RwLock<HashMap>`: registration is rare and
/// startup-time, resolution is a cheap read that never crosses an await
/// point.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<String, HandlerRef>>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Associates `name` with `handler`.
    ///
    /// Returns the previously registered handler when the name was already
    /// taken (last write wins), `None` otherwise.
    pub fn register(&self, name: impl Into<String>, handler: HandlerRef) -> Option<HandlerRef> {
        self.handlers
            .write()
            .expect("registry lock poisoned")
            .insert(name.into(), handler)
    }

    /// Resolves `name` to its handler.
    pub fn resolve(&self, name: &str) -> Result<HandlerRef, EngineError> {
        self.handlers
            .read()
            .expect("registry lock poisoned")
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::UnknownTaskType {
                name: name.to_string(),
            })
    }

    /// True if a handler is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.handlers
            .read()
            .expect("registry lock poisoned")
            .contains_key(name)
    }

    /// Returns the sorted list of registered names.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .handlers
            .read()
            .expect("registry lock poisoned")
            .keys()
            .cloned()
            .collect();
        names.sort_unstable();
        names
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.read().expect("registry lock poisoned").len()
    }

    /// True when no handlers are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::HandlerFn;
    use serde_json::json;
    use tokio_util::sync::CancellationToken;

    fn constant(value: i64) -> HandlerRef {
        HandlerFn::arc(move |_ctx, _params| async move { Ok(json!(value)) })
    }

    #[test]
    fn resolve_unknown_fails() {
        let reg = HandlerRegistry::new();
        let err = reg.resolve("nope").unwrap_err();
        assert_eq!(err.as_label(), "unknown_task_type");
    }

    #[tokio::test]
    async fn register_and_resolve() {
        let reg = HandlerRegistry::new();
        assert!(reg.register("answer", constant(42)).is_none());
        assert!(reg.contains("answer"));

        let h = reg.resolve("answer").unwrap();
        let out = h
            .run(CancellationToken::new(), Default::default())
            .await
            .unwrap();
        assert_eq!(out, json!(42));
    }

    #[tokio::test]
    async fn reregister_last_write_wins() {
        let reg = HandlerRegistry::new();
        assert!(reg.register("job", constant(1)).is_none());
        let replaced = reg.register("job", constant(2));
        assert!(replaced.is_some(), "previous handler returned on replace");

        let h = reg.resolve("job").unwrap();
        let out = h
            .run(CancellationToken::new(), Default::default())
            .await
            .unwrap();
        assert_eq!(out, json!(2));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn names_are_sorted() {
        let reg = HandlerRegistry::new();
        reg.register("b", constant(0));
        reg.register("a", constant(0));
        reg.register("c", constant(0));
        assert_eq!(reg.names(), vec!["a", "b", "c"]);
    }
}
