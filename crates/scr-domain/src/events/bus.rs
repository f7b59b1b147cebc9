//! Event bus port
//!
//! Defines the contract for topic-addressed publish/subscribe without
//! coupling publishers to a delivery mechanism.

use crate::constants::TOPIC_WILDCARD;
use crate::error::Result;
use crate::value_objects::Properties;

/// A topic-addressed message
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Slash-separated topic, e.g. `org/fipro/mafia/Boss/CONVINCE`
    pub topic: String,
    /// Event properties
    pub properties: Properties,
}

impl Event {
    /// Create an event
    pub fn new<S: Into<String>>(topic: S, properties: Properties) -> Self {
        Self {
            topic: topic.into(),
            properties,
        }
    }

    /// Look up an event property
    pub fn property(&self, key: &str) -> Option<&crate::value_objects::PropertyValue> {
        self.properties.get(key)
    }
}

/// Receives events for the topics it subscribed to
pub trait EventHandler: Send + Sync {
    /// Handle one event; runs on the delivering thread
    fn handle_event(&self, event: &Event);
}

/// Domain port for publishing events
///
/// # Example
///
/// ```
/// use scr_domain::events::{Event, EventPublisher};
/// use scr_domain::value_objects::Properties;
///
/// fn convince(bus: &dyn EventPublisher, target: &str) -> scr_domain::error::Result<()> {
///     let props = Properties::new().with("target", target);
///     bus.post(Event::new("org/fipro/mafia/Boss/CONVINCE", props))
/// }
/// ```
pub trait EventPublisher: Send + Sync {
    /// Fire-and-forget delivery
    fn post(&self, event: Event) -> Result<()>;

    /// Synchronous delivery; returns once every handler ran
    fn send(&self, event: Event) -> Result<()>;
}

/// Whether a subscription pattern covers a topic
///
/// Patterns are either exact topics, `*`, or `prefix/*` which matches every
/// topic strictly below `prefix`.
pub fn topic_matches(pattern: &str, topic: &str) -> bool {
    if pattern == TOPIC_WILDCARD {
        return true;
    }
    match pattern.strip_suffix("/*") {
        Some(prefix) => topic
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/') && rest.len() > 1),
        None => pattern == topic,
    }
}
