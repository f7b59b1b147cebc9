//! Service objects, factories and per-consumer usage tracking

use parking_lot::Mutex;
use scr_domain::error::Result;
use scr_domain::value_objects::{InstanceId, ServiceObject, ServiceRecord, ServiceScope};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Identity of whoever acquires a service
///
/// Bundle-scoped services are cached per consumer name, so every instance
/// of one component type shares the same object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Consumer {
    name: String,
    instance: Option<InstanceId>,
}

impl Consumer {
    /// A component instance acquiring a service for one of its references
    pub fn component<S: Into<String>>(name: S, instance: InstanceId) -> Self {
        Self {
            name: name.into(),
            instance: Some(instance),
        }
    }

    /// Code outside the component model (collaborators, tests, tools)
    pub fn external<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            instance: None,
        }
    }

    /// Consumer name (component name for component consumers)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Consuming instance, if any
    pub fn instance(&self) -> Option<InstanceId> {
        self.instance
    }
}

impl fmt::Display for Consumer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.instance {
            Some(id) => write!(f, "{}#{}", self.name, id),
            None => f.write_str(&self.name),
        }
    }
}

/// Produces service objects on demand
///
/// Singleton-scoped factories are asked once, bundle-scoped ones once per
/// consumer name, prototype-scoped ones once per acquisition. Every object
/// handed out is returned through [`ServiceFactory::unget_service`] exactly
/// once.
pub trait ServiceFactory: Send + Sync {
    /// Create (or look up) the object for a consumer
    fn get_service(&self, consumer: &Consumer, record: &ServiceRecord) -> Result<ServiceObject>;

    /// Release an object previously returned by `get_service`
    fn unget_service(&self, consumer: &Consumer, record: &ServiceRecord, service: &ServiceObject);
}

/// Where a registration's objects come from
#[derive(Clone)]
pub enum ServiceProvider {
    /// A ready-made object shared by everyone
    Object(ServiceObject),
    /// A factory consulted according to the service scope
    Factory(Arc<dyn ServiceFactory>),
}

impl ServiceProvider {
    /// Marker object for services that only matter by presence
    pub fn marker() -> Self {
        Self::Object(Arc::new(()))
    }
}

impl fmt::Debug for ServiceProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Object(_) => f.write_str("ServiceProvider::Object"),
            Self::Factory(_) => f.write_str("ServiceProvider::Factory"),
        }
    }
}

struct CachedObject {
    object: ServiceObject,
    count: usize,
}

/// Usage bookkeeping for one registration
///
/// Shared between the registry entry and outstanding leases so a lease can
/// still release its object after the service was unregistered.
pub(crate) struct ServiceUsage {
    scope: ServiceScope,
    provider: ServiceProvider,
    cached: Mutex<HashMap<String, CachedObject>>,
    consumers: Mutex<HashMap<Consumer, usize>>,
}

impl ServiceUsage {
    pub(crate) fn new(scope: ServiceScope, provider: ServiceProvider) -> Self {
        Self {
            scope,
            provider,
            cached: Mutex::new(HashMap::new()),
            consumers: Mutex::new(HashMap::new()),
        }
    }

    fn cache_key(&self, consumer: &Consumer) -> String {
        match self.scope {
            ServiceScope::Bundle => consumer.name().to_string(),
            _ => String::new(),
        }
    }

    /// Obtain an object; factory calls happen outside every lock
    pub(crate) fn acquire(&self, consumer: &Consumer, record: &ServiceRecord) -> Result<ServiceObject> {
        let object = match &self.provider {
            ServiceProvider::Object(object) => Arc::clone(object),
            ServiceProvider::Factory(factory) if self.scope == ServiceScope::Prototype => {
                factory.get_service(consumer, record)?
            }
            ServiceProvider::Factory(factory) => {
                let key = self.cache_key(consumer);
                let cached = {
                    let mut cache = self.cached.lock();
                    cache.get_mut(&key).map(|entry| {
                        entry.count += 1;
                        Arc::clone(&entry.object)
                    })
                };
                match cached {
                    Some(object) => object,
                    None => {
                        let created = factory.get_service(consumer, record)?;
                        let raced = {
                            let mut cache = self.cached.lock();
                            match cache.get_mut(&key) {
                                Some(entry) => {
                                    entry.count += 1;
                                    Some(Arc::clone(&entry.object))
                                }
                                None => {
                                    cache.insert(
                                        key,
                                        CachedObject {
                                            object: Arc::clone(&created),
                                            count: 1,
                                        },
                                    );
                                    None
                                }
                            }
                        };
                        match raced {
                            Some(existing) => {
                                factory.unget_service(consumer, record, &created);
                                existing
                            }
                            None => created,
                        }
                    }
                }
            }
        };
        *self.consumers.lock().entry(consumer.clone()).or_insert(0) += 1;
        Ok(object)
    }

    /// Give back an object obtained through `acquire`
    pub(crate) fn release(&self, consumer: &Consumer, record: &ServiceRecord, object: &ServiceObject) {
        {
            let mut consumers = self.consumers.lock();
            if let Some(count) = consumers.get_mut(consumer) {
                *count -= 1;
                if *count == 0 {
                    consumers.remove(consumer);
                }
            }
        }

        let ServiceProvider::Factory(factory) = &self.provider else {
            return;
        };
        if self.scope == ServiceScope::Prototype {
            factory.unget_service(consumer, record, object);
            return;
        }

        let key = self.cache_key(consumer);
        let evicted = {
            let mut cache = self.cached.lock();
            let exhausted = cache.get_mut(&key).is_some_and(|entry| {
                entry.count = entry.count.saturating_sub(1);
                entry.count == 0
            });
            if exhausted { cache.remove(&key) } else { None }
        };
        if let Some(entry) = evicted {
            factory.unget_service(consumer, record, &entry.object);
        }
    }

    /// Outstanding acquisitions across all consumers
    pub(crate) fn usage_count(&self) -> usize {
        self.consumers.lock().values().sum()
    }
}
