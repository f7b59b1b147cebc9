//! Event admin
//!
//! Topic-addressed event delivery to handler services. A handler is any
//! registry service under the `scr.event.handler` capability whose object is
//! an `Arc<dyn EventHandler>` (see [`handler_object`]). Its `event.topics`
//! property lists the topics it receives, and an optional `event.filter` is
//! matched against the event properties plus `event.topic`.
//!
//! Handlers are called in registration order. A panicking handler is logged
//! and skipped; later handlers still receive the event.

use crate::config::{DeliveryMode, EventAdminConfig};
use crate::constants::EVENT_ADMIN_CONSUMER;
use parking_lot::Mutex;
use scr_application::registry::{Consumer, ServiceRegistry};
use scr_domain::constants::{EVENT_FILTER, EVENT_HANDLER_CAPABILITY, EVENT_TOPIC, EVENT_TOPICS};
use scr_domain::error::{Error, Result};
use scr_domain::events::{Event, EventHandler, EventPublisher, topic_matches};
use scr_domain::filter::Filter;
use scr_domain::value_objects::{Capability, Properties, ServiceObject, ServiceRecord};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, trace, warn};

/// Wrap a handler so it can be registered as a service object
pub fn handler_object(handler: Arc<dyn EventHandler>) -> ServiceObject {
    Arc::new(handler)
}

/// Finds the subscribed handlers of an event and calls them
struct Dispatcher {
    registry: ServiceRegistry,
}

impl Dispatcher {
    /// Deliver to every matching handler; returns how many ran to completion
    fn deliver(&self, event: &Event) -> usize {
        let mut handlers = self
            .registry
            .lookup(&Capability::from(EVENT_HANDLER_CAPABILITY), None);
        handlers.sort_by_key(ServiceRecord::id);

        let mut scope = event.properties.clone();
        scope.insert(EVENT_TOPIC, event.topic.as_str());

        let consumer = Consumer::external(EVENT_ADMIN_CONSUMER);
        let mut delivered = 0;
        for record in handlers.iter().filter(|r| subscribes(r, &event.topic, &scope)) {
            let lease = match self.registry.get_service(record.id(), &consumer) {
                Ok(lease) => lease,
                Err(err) => {
                    // unregistered since the lookup, or its factory failed
                    debug!(service_id = %record.id(), error = %err, "Event handler unavailable");
                    continue;
                }
            };
            let Some(handler) = lease.downcast::<Arc<dyn EventHandler>>() else {
                warn!(
                    service_id = %record.id(),
                    "Event handler service does not carry an EventHandler object"
                );
                continue;
            };
            match panic::catch_unwind(AssertUnwindSafe(|| handler.handle_event(event))) {
                Ok(()) => delivered += 1,
                Err(_) => error!(
                    service_id = %record.id(),
                    topic = %event.topic,
                    "Event handler panicked"
                ),
            }
        }
        trace!(topic = %event.topic, delivered, "Event delivered");
        delivered
    }
}

fn subscribes(record: &ServiceRecord, topic: &str, scope: &Properties) -> bool {
    let properties = record.properties();
    let topics = properties
        .get(EVENT_TOPICS)
        .map(|value| value.strings())
        .unwrap_or_default();
    if !topics.iter().any(|pattern| topic_matches(pattern, topic)) {
        return false;
    }
    match properties.get_str(EVENT_FILTER).map(Filter::parse) {
        None => true,
        Some(Ok(filter)) => filter.matches(scope),
        Some(Err(err)) => {
            warn!(service_id = %record.id(), error = %err, "Ignoring event handler with malformed filter");
            false
        }
    }
}

/// Event bus delivering to handler services of a registry
///
/// # Example
///
/// ```
/// use scr_application::ServiceRegistry;
/// use scr_domain::events::{Event, EventHandler, EventPublisher};
/// use scr_domain::value_objects::Properties;
/// use scr_infrastructure::config::EventAdminConfig;
/// use scr_infrastructure::infrastructure::EventAdmin;
/// use std::sync::Arc;
///
/// struct Printer;
/// impl EventHandler for Printer {
///     fn handle_event(&self, event: &Event) {
///         println!("{}", event.topic);
///     }
/// }
///
/// let registry = ServiceRegistry::new();
/// let admin = EventAdmin::new(registry, &EventAdminConfig::default());
/// admin
///     .register_handler(&["org/fipro/mafia/Boss/*"], None, Arc::new(Printer))
///     .unwrap();
/// admin
///     .send(Event::new("org/fipro/mafia/Boss/CONVINCE", Properties::new()))
///     .unwrap();
/// ```
pub struct EventAdmin {
    dispatcher: Arc<Dispatcher>,
    delivery: DeliveryMode,
    capacity: usize,
    queue: Mutex<Option<mpsc::Sender<Event>>>,
}

impl EventAdmin {
    /// Create an event admin over a registry
    pub fn new(registry: ServiceRegistry, config: &EventAdminConfig) -> Self {
        Self {
            dispatcher: Arc::new(Dispatcher { registry }),
            delivery: config.delivery,
            capacity: config.capacity.max(1),
            queue: Mutex::new(None),
        }
    }

    /// Create as Arc for sharing
    pub fn new_shared(registry: ServiceRegistry, config: &EventAdminConfig) -> Arc<Self> {
        Arc::new(Self::new(registry, config))
    }

    /// Delivery mode of `post`
    pub fn delivery(&self) -> DeliveryMode {
        self.delivery
    }

    /// Register a handler service for the given topic patterns
    ///
    /// # Errors
    ///
    /// [`Error::FilterSyntax`] for a malformed filter,
    /// [`Error::InvalidProperties`] when no topic is given.
    pub fn register_handler(
        &self,
        topics: &[&str],
        filter: Option<&str>,
        handler: Arc<dyn EventHandler>,
    ) -> Result<ServiceRecord> {
        if topics.is_empty() {
            return Err(Error::invalid_properties(format!(
                "{EVENT_TOPICS} must name at least one topic"
            )));
        }
        let mut properties = Properties::new().with(EVENT_TOPICS, topics.to_vec());
        if let Some(filter) = filter {
            Filter::parse(filter)?;
            properties.insert(EVENT_FILTER, filter);
        }
        self.dispatcher.registry.register_object(
            EVENT_HANDLER_CAPABILITY,
            properties,
            handler_object(handler),
        )
    }

    /// Queue sender, starting the delivery task on first use
    fn sender(&self, handle: &Handle) -> mpsc::Sender<Event> {
        let mut queue = self.queue.lock();
        if let Some(sender) = queue.as_ref().filter(|s| !s.is_closed()) {
            return sender.clone();
        }
        let (sender, mut receiver) = mpsc::channel::<Event>(self.capacity);
        let dispatcher = Arc::clone(&self.dispatcher);
        handle.spawn(async move {
            while let Some(event) = receiver.recv().await {
                dispatcher.deliver(&event);
            }
        });
        debug!(capacity = self.capacity, "Event delivery task started");
        *queue = Some(sender.clone());
        sender
    }
}

impl EventPublisher for EventAdmin {
    fn post(&self, event: Event) -> Result<()> {
        if self.delivery == DeliveryMode::Sync {
            self.dispatcher.deliver(&event);
            return Ok(());
        }
        let Ok(handle) = Handle::try_current() else {
            trace!(topic = %event.topic, "No async runtime, delivering on the caller");
            self.dispatcher.deliver(&event);
            return Ok(());
        };
        match self.sender(&handle).try_send(event) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(event)) => Err(Error::internal(format!(
                "event queue is full (capacity {}), dropped '{}'",
                self.capacity, event.topic
            ))),
            Err(TrySendError::Closed(event)) => {
                self.dispatcher.deliver(&event);
                Ok(())
            }
        }
    }

    fn send(&self, event: Event) -> Result<()> {
        self.dispatcher.deliver(&event);
        Ok(())
    }
}
