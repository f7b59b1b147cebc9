//! Domain events
//!
//! Two kinds of events flow through the runtime:
//!
//! - [`ServiceEvent`]: registry churn, delivered synchronously to registry
//!   subscribers in the order the changes happened.
//! - [`Event`]: topic-addressed messages handed to the event bus
//!   collaborator and delivered to handler services.

mod bus;
mod service_events;

pub use bus::{Event, EventHandler, EventPublisher, topic_matches};
pub use service_events::{ServiceEvent, ServiceEventKind};
