//! Component Factory Manager
//!
//! Creates additional component instances on demand:
//!
//! - factory components, through [`ComponentFactoryManager::new_instance`]
//! - prototype and bundle scoped component services, through
//!   [`ComponentServiceFactory`], one instance per acquisition
//!
//! Every produced instance runs the full lifecycle and is disposed
//! individually. Nothing is cached or shared.

use crate::lifecycle::{ComponentLifecycleManager, LifecycleInner};
use crate::registry::{Consumer, ServiceFactory};
use dashmap::DashMap;
use parking_lot::Mutex;
use scr_domain::error::{Error, Result};
use scr_domain::value_objects::{
    InstanceId, Properties, ServiceObject, ServiceRecord, downcast_service,
};
use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::{debug, trace, warn};

/// A factory-produced instance
///
/// Must be handed back through [`ComponentFactoryManager::dispose`]; a
/// second dispose fails with [`Error::AlreadyDisposed`].
#[derive(Clone)]
pub struct ComponentInstanceHandle {
    id: InstanceId,
    component: String,
    factory: String,
    service: Option<ServiceObject>,
}

impl ComponentInstanceHandle {
    /// Instance id
    pub fn id(&self) -> InstanceId {
        self.id
    }

    /// Component name
    pub fn component(&self) -> &str {
        &self.component
    }

    /// Factory id the instance came from
    pub fn factory_id(&self) -> &str {
        &self.factory
    }

    /// The instance's service object, if its implementation exposes one
    pub fn service(&self) -> Option<&ServiceObject> {
        self.service.as_ref()
    }

    /// The service object, downcast
    pub fn service_as<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.service.as_ref().and_then(downcast_service::<T>)
    }
}

impl fmt::Debug for ComponentInstanceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentInstanceHandle")
            .field("id", &self.id)
            .field("component", &self.component)
            .field("factory", &self.factory)
            .finish()
    }
}

/// Creates and disposes factory component instances
#[derive(Clone)]
pub struct ComponentFactoryManager {
    lifecycle: ComponentLifecycleManager,
    created: Arc<DashMap<String, u64>>,
}

impl ComponentFactoryManager {
    /// Manager over a lifecycle manager's state table
    pub fn new(lifecycle: ComponentLifecycleManager) -> Self {
        Self {
            lifecycle,
            created: Arc::new(DashMap::new()),
        }
    }

    /// Create and activate a new instance of a factory component
    ///
    /// `extra` overlays the component's static and configured properties.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] for an unknown factory id
    /// - [`Error::UnsatisfiedDependency`] while the factory's dependencies are
    ///   not met
    /// - [`Error::ActivationFailed`] when a callback failed
    pub fn new_instance(&self, factory_id: &str, extra: Properties) -> Result<ComponentInstanceHandle> {
        let (id, component, service) = self
            .lifecycle
            .inner()
            .create_factory_instance(factory_id, extra)?;
        *self.created.entry(factory_id.to_string()).or_insert(0) += 1;
        debug!(factory = %factory_id, component = %component, instance = %id, "Factory instance created");
        Ok(ComponentInstanceHandle {
            id,
            component,
            factory: factory_id.to_string(),
            service,
        })
    }

    /// Deactivate and release a factory instance
    ///
    /// # Errors
    ///
    /// [`Error::AlreadyDisposed`] when the instance is already gone.
    pub fn dispose(&self, handle: &ComponentInstanceHandle) -> Result<()> {
        self.lifecycle.inner().dispose_instance(handle.id)?;
        debug!(factory = %handle.factory, instance = %handle.id, "Factory instance disposed");
        Ok(())
    }

    /// Run `f` with a fresh instance that is disposed on every exit path
    ///
    /// # Errors
    ///
    /// Creation errors, then the closure's error, then a disposal error.
    pub fn scoped<T, F>(&self, factory_id: &str, extra: Properties, f: F) -> Result<T>
    where
        F: FnOnce(&ComponentInstanceHandle) -> Result<T>,
    {
        let scope = ScopedInstance {
            manager: self,
            handle: self.new_instance(factory_id, extra)?,
            disposed: false,
        };
        let result = f(&scope.handle);
        let disposed = scope.dispose();
        let value = result?;
        disposed?;
        Ok(value)
    }

    /// Instances successfully created through this manager for a factory
    pub fn created_count(&self, factory_id: &str) -> u64 {
        self.created.get(factory_id).map_or(0, |count| *count)
    }
}

struct ScopedInstance<'a> {
    manager: &'a ComponentFactoryManager,
    handle: ComponentInstanceHandle,
    disposed: bool,
}

impl ScopedInstance<'_> {
    fn dispose(mut self) -> Result<()> {
        self.disposed = true;
        self.manager.dispose(&self.handle)
    }
}

impl Drop for ScopedInstance<'_> {
    fn drop(&mut self) {
        if !self.disposed
            && let Err(err) = self.manager.dispose(&self.handle)
        {
            warn!(instance = %self.handle.id, error = %err, "Scoped instance disposal failed");
        }
    }
}

/// Service factory behind prototype and bundle scoped component services
pub(crate) struct ComponentServiceFactory {
    lifecycle: Weak<LifecycleInner>,
    component: String,
    issued: Mutex<Vec<(InstanceId, ServiceObject)>>,
}

impl ComponentServiceFactory {
    pub(crate) fn new(lifecycle: Weak<LifecycleInner>, component: &str) -> Self {
        Self {
            lifecycle,
            component: component.to_string(),
            issued: Mutex::new(Vec::new()),
        }
    }
}

impl ServiceFactory for ComponentServiceFactory {
    fn get_service(&self, consumer: &Consumer, _record: &ServiceRecord) -> Result<ServiceObject> {
        let lifecycle = self
            .lifecycle
            .upgrade()
            .ok_or_else(|| Error::internal("component runtime has shut down"))?;
        let (id, object) = lifecycle.create_service_instance(&self.component)?;
        trace!(component = %self.component, instance = %id, consumer = %consumer, "Service object created");
        self.issued.lock().push((id, Arc::clone(&object)));
        Ok(object)
    }

    fn unget_service(&self, consumer: &Consumer, _record: &ServiceRecord, service: &ServiceObject) {
        let released = {
            let mut issued = self.issued.lock();
            issued
                .iter()
                .position(|(_, object)| Arc::ptr_eq(object, service))
                .map(|position| issued.remove(position).0)
        };
        let Some(id) = released else {
            return;
        };
        trace!(component = %self.component, instance = %id, consumer = %consumer, "Service object released");
        if let Some(lifecycle) = self.lifecycle.upgrade() {
            lifecycle.schedule_dispose(id);
        }
    }
}
