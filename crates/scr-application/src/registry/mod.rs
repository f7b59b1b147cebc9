//! Service Registry
//!
//! Thread-safe store of service registrations with capability-indexed lookup
//! and ordered change notification.
//!
//! ## Locking
//!
//! | Lock | Guards |
//! |------|--------|
//! | `state` (RwLock) | registrations and the capability index; lookups share it |
//! | `dispatch` (Mutex) | event order; held from mutation through fan-out |
//! | `listeners` (RwLock) | subscriber list |
//!
//! Subscribers see every event in the order the changes happened. The state
//! lock is never held while a listener runs, so listeners may call
//! [`ServiceRegistry::lookup`] freely. They must not mutate the registry from
//! [`ServiceListener::service_changed`]; follow-up work belongs in
//! [`ServiceListener::events_delivered`], which runs after the ordering lock
//! is released.

mod lease;
mod usage;

pub use lease::ServiceLease;
pub use usage::{Consumer, ServiceFactory, ServiceProvider};

use parking_lot::{Mutex, RwLock};
use scr_domain::constants::{
    COMPONENT_FACTORY, COMPONENT_ID, COMPONENT_NAME, CONDITION_ID, EVENT_FILTER, EVENT_TOPICS,
    OBJECT_CLASS, SERVICE_FACTORY_PID, SERVICE_ID, SERVICE_PID, SERVICE_RANKING, SERVICE_SCOPE,
};
use scr_domain::error::{Error, Result};
use scr_domain::events::{ServiceEvent, ServiceEventKind};
use scr_domain::filter::Filter;
use scr_domain::value_objects::{
    Capability, Properties, PropertyValue, ServiceId, ServiceObject, ServiceRecord, ServiceScope,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace};
use usage::ServiceUsage;

/// Receives registry changes
pub trait ServiceListener: Send + Sync {
    /// Called for every change, in order, while the ordering lock is held
    fn service_changed(&self, event: &ServiceEvent);

    /// Called once per change after every subscriber saw it
    fn events_delivered(&self) {}
}

/// Handle returned by subscribe calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Subscription {
    id: ListenerId,
    capability: Option<Capability>,
    listener: Arc<dyn ServiceListener>,
}

struct Entry {
    record: ServiceRecord,
    usage: Arc<ServiceUsage>,
}

#[derive(Default)]
struct RegistryState {
    services: BTreeMap<ServiceId, Entry>,
    by_capability: HashMap<Capability, BTreeSet<ServiceId>>,
}

struct RegistryInner {
    state: RwLock<RegistryState>,
    dispatch: Mutex<()>,
    listeners: RwLock<Vec<Subscription>>,
    next_service_id: AtomicU64,
    next_listener_id: AtomicU64,
}

/// The shared service registry
///
/// Cheap to clone; clones share the same store.
#[derive(Clone)]
pub struct ServiceRegistry {
    inner: Arc<RegistryInner>,
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Reserved keys whose values must have a fixed shape
const INTEGER_KEYS: &[&str] = &[SERVICE_RANKING, SERVICE_ID, COMPONENT_ID];
const STRING_KEYS: &[&str] = &[
    SERVICE_SCOPE,
    SERVICE_PID,
    SERVICE_FACTORY_PID,
    COMPONENT_NAME,
    COMPONENT_FACTORY,
    CONDITION_ID,
    EVENT_FILTER,
];
const TEXTUAL_KEYS: &[&str] = &[OBJECT_CLASS, EVENT_TOPICS];

fn validate_reserved(properties: &Properties) -> Result<()> {
    for (key, value) in properties.iter() {
        let key = key.as_str();
        let valid = if INTEGER_KEYS.contains(&key) {
            matches!(value, PropertyValue::Integer(_))
        } else if STRING_KEYS.contains(&key) {
            matches!(value, PropertyValue::String(_))
        } else if TEXTUAL_KEYS.contains(&key) {
            value.is_textual()
        } else {
            true
        };
        if !valid {
            return Err(Error::invalid_properties(format!(
                "property '{key}' has type {} which is not allowed for this reserved key",
                value.type_name()
            )));
        }
    }
    Ok(())
}

impl ServiceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                state: RwLock::new(RegistryState::default()),
                dispatch: Mutex::new(()),
                listeners: RwLock::new(Vec::new()),
                next_service_id: AtomicU64::new(1),
                next_listener_id: AtomicU64::new(1),
            }),
        }
    }

    /// Register a service that only matters by presence and properties
    ///
    /// Every acquisition returns the same marker object, so only the
    /// singleton scope is accepted; per-consumer objects need
    /// [`ServiceRegistry::register_factory`].
    ///
    /// # Errors
    ///
    /// [`Error::InvalidProperties`] when a reserved key has the wrong type or
    /// the scope is not singleton.
    pub fn register<C: Into<Capability>>(
        &self,
        capability: C,
        properties: Properties,
        scope: ServiceScope,
    ) -> Result<ServiceRecord> {
        self.register_with(capability, properties, scope, ServiceProvider::marker())
    }

    /// Register a ready-made singleton object
    ///
    /// # Errors
    ///
    /// [`Error::InvalidProperties`] when a reserved key has the wrong type.
    pub fn register_object<C: Into<Capability>>(
        &self,
        capability: C,
        properties: Properties,
        object: ServiceObject,
    ) -> Result<ServiceRecord> {
        self.register_with(
            capability,
            properties,
            ServiceScope::Singleton,
            ServiceProvider::Object(object),
        )
    }

    /// Register a service whose objects come from a factory
    ///
    /// # Errors
    ///
    /// [`Error::InvalidProperties`] when a reserved key has the wrong type.
    pub fn register_factory<C: Into<Capability>>(
        &self,
        capability: C,
        properties: Properties,
        scope: ServiceScope,
        factory: Arc<dyn ServiceFactory>,
    ) -> Result<ServiceRecord> {
        self.register_with(capability, properties, scope, ServiceProvider::Factory(factory))
    }

    /// Register a service with an explicit provider
    ///
    /// The registry adds `service.id`, `objectClass` and `service.scope`.
    /// Ranking comes from `service.ranking` (default 0). Subscribers for the
    /// capability receive a `Registered` event before this returns.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidProperties`] when a reserved key has the wrong type, or
    /// when a shared object is offered for a bundle or prototype scope.
    pub fn register_with<C: Into<Capability>>(
        &self,
        capability: C,
        properties: Properties,
        scope: ServiceScope,
        provider: ServiceProvider,
    ) -> Result<ServiceRecord> {
        let capability = capability.into();
        validate_reserved(&properties)?;
        if scope != ServiceScope::Singleton && matches!(provider, ServiceProvider::Object(_)) {
            return Err(Error::invalid_properties(format!(
                "{SERVICE_SCOPE} '{}' of '{capability}' needs a service factory",
                scope.as_str()
            )));
        }
        let ranking = properties.get_integer(SERVICE_RANKING).unwrap_or(0);

        self.commit(|state| {
            let id = ServiceId::new(self.inner.next_service_id.fetch_add(1, Ordering::SeqCst));
            let mut properties = properties;
            properties.insert(SERVICE_ID, id.value());
            properties.insert(OBJECT_CLASS, capability.as_str());
            properties.insert(SERVICE_SCOPE, scope.as_str());

            let record = ServiceRecord::new(id, capability.clone(), properties, ranking, scope, 0);
            state
                .by_capability
                .entry(capability.clone())
                .or_default()
                .insert(id);
            state.services.insert(
                id,
                Entry {
                    record: record.clone(),
                    usage: Arc::new(ServiceUsage::new(scope, provider)),
                },
            );
            debug!(service_id = %id, capability = %capability, ranking, "Service registered");
            Ok(ServiceEvent::new(ServiceEventKind::Registered, record))
        })
    }

    /// Remove a registration
    ///
    /// Subscribers receive `Unregistering` after the service has left the
    /// store. Outstanding leases stay valid until dropped.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] when the id is unknown.
    pub fn unregister(&self, id: ServiceId) -> Result<ServiceRecord> {
        self.commit(|state| {
            let entry = state
                .services
                .remove(&id)
                .ok_or_else(|| Error::not_found(format!("service {id}")))?;
            let capability = entry.record.capability();
            if let Some(ids) = state.by_capability.get_mut(capability) {
                ids.remove(&id);
                if ids.is_empty() {
                    state.by_capability.remove(capability);
                }
            }
            debug!(service_id = %id, capability = %capability, "Service unregistered");
            Ok(ServiceEvent::new(ServiceEventKind::Unregistering, entry.record))
        })
    }

    /// Replace a registration's properties
    ///
    /// Identity keys are preserved and the revision is bumped. A `Modified`
    /// event fires even when nothing changed; consumers compare revisions.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] for an unknown id, [`Error::InvalidProperties`]
    /// when a reserved key has the wrong type.
    pub fn modify(&self, id: ServiceId, properties: Properties) -> Result<ServiceRecord> {
        validate_reserved(&properties)?;
        self.commit(|state| {
            let entry = state
                .services
                .get_mut(&id)
                .ok_or_else(|| Error::not_found(format!("service {id}")))?;
            let current = &entry.record;
            let mut properties = properties;
            properties.insert(SERVICE_ID, id.value());
            properties.insert(OBJECT_CLASS, current.capability().as_str());
            properties.insert(SERVICE_SCOPE, current.scope().as_str());
            let ranking = properties.get_integer(SERVICE_RANKING).unwrap_or(0);

            let record = ServiceRecord::new(
                id,
                current.capability().clone(),
                properties,
                ranking,
                current.scope(),
                current.revision() + 1,
            );
            entry.record = record.clone();
            trace!(service_id = %id, revision = record.revision(), "Service modified");
            Ok(ServiceEvent::new(ServiceEventKind::Modified, record))
        })
    }

    /// All services for a capability matching the filter, best first
    pub fn lookup(&self, capability: &Capability, filter: Option<&Filter>) -> Vec<ServiceRecord> {
        let state = self.inner.state.read();
        let Some(ids) = state.by_capability.get(capability) else {
            return Vec::new();
        };
        let mut records: Vec<ServiceRecord> = ids
            .iter()
            .filter_map(|id| state.services.get(id))
            .map(|entry| &entry.record)
            .filter(|record| filter.is_none_or(|f| f.matches(record.properties())))
            .cloned()
            .collect();
        drop(state);
        records.sort_by(ServiceRecord::ranking_order);
        records
    }

    /// Current snapshot of one registration
    pub fn get(&self, id: ServiceId) -> Option<ServiceRecord> {
        self.inner
            .state
            .read()
            .services
            .get(&id)
            .map(|entry| entry.record.clone())
    }

    /// Number of live registrations
    pub fn len(&self) -> usize {
        self.inner.state.read().services.len()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Acquire a service object for a consumer
    ///
    /// The object is released when the returned lease drops. Factory calls
    /// run without any registry lock held.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] when the service is gone, or whatever the service
    /// factory reports.
    pub fn get_service(&self, id: ServiceId, consumer: &Consumer) -> Result<ServiceLease> {
        let (record, usage) = {
            let state = self.inner.state.read();
            let entry = state
                .services
                .get(&id)
                .ok_or_else(|| Error::not_found(format!("service {id}")))?;
            (entry.record.clone(), Arc::clone(&entry.usage))
        };
        let object = usage.acquire(consumer, &record)?;
        trace!(service_id = %id, consumer = %consumer, "Service acquired");
        Ok(ServiceLease::new(usage, consumer.clone(), record, object))
    }

    /// Outstanding acquisitions of a live service
    pub fn usage_count(&self, id: ServiceId) -> usize {
        self.inner
            .state
            .read()
            .services
            .get(&id)
            .map_or(0, |entry| entry.usage.usage_count())
    }

    /// Subscribe to changes of one capability
    pub fn subscribe<C: Into<Capability>>(
        &self,
        capability: C,
        listener: Arc<dyn ServiceListener>,
    ) -> ListenerId {
        self.add_subscription(Some(capability.into()), listener)
    }

    /// Subscribe to every change
    pub fn subscribe_all(&self, listener: Arc<dyn ServiceListener>) -> ListenerId {
        self.add_subscription(None, listener)
    }

    /// Remove a subscription; returns whether it existed
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.inner.listeners.write();
        let before = listeners.len();
        listeners.retain(|s| s.id != id);
        listeners.len() != before
    }

    fn add_subscription(
        &self,
        capability: Option<Capability>,
        listener: Arc<dyn ServiceListener>,
    ) -> ListenerId {
        let id = ListenerId(self.inner.next_listener_id.fetch_add(1, Ordering::SeqCst));
        self.inner.listeners.write().push(Subscription {
            id,
            capability,
            listener,
        });
        id
    }

    fn subscribers_for(&self, capability: &Capability) -> Vec<Arc<dyn ServiceListener>> {
        self.inner
            .listeners
            .read()
            .iter()
            .filter(|s| s.capability.as_ref().is_none_or(|c| c == capability))
            .map(|s| Arc::clone(&s.listener))
            .collect()
    }

    /// Apply one mutation and deliver its event in commit order
    fn commit<F>(&self, mutate: F) -> Result<ServiceRecord>
    where
        F: FnOnce(&mut RegistryState) -> Result<ServiceEvent>,
    {
        let ordering = self.inner.dispatch.lock();
        let event = {
            let mut state = self.inner.state.write();
            mutate(&mut state)?
        };
        let subscribers = self.subscribers_for(event.capability());
        for subscriber in &subscribers {
            subscriber.service_changed(&event);
        }
        drop(ordering);
        for subscriber in &subscribers {
            subscriber.events_delivered();
        }
        Ok(event.record)
    }
}
