//! Engine observability: lifecycle events and the broadcast bus.
//!
//! Every state transition a task goes through is published as an [`Event`]
//! on the [`Bus`]. Subscribers (see [`crate::subscribers`]) consume the
//! stream for logging, metrics, or test assertions.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
