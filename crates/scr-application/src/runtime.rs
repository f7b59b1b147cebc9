//! Runtime facade wiring the engine parts together

use crate::component::ComponentType;
use crate::condition::ConditionGate;
use crate::factory::{ComponentFactoryManager, ComponentInstanceHandle};
use crate::lifecycle::{ComponentDescription, ComponentLifecycleManager, LifecycleOptions};
use crate::registry::ServiceRegistry;
use scr_domain::error::Result;
use scr_domain::events::EventPublisher;
use scr_domain::ports::ConfigurationProvider;
use scr_domain::value_objects::{Properties, ServiceRecord};
use std::sync::Arc;

/// A declarative service component runtime
///
/// # Example
///
/// ```
/// use scr_application::{ComponentType, ServiceComponentRuntime};
/// use scr_domain::value_objects::{
///     ComponentDescriptor, ComponentState, Properties, ReferenceDescriptor, ServiceScope,
/// };
///
/// let runtime = ServiceComponentRuntime::new();
/// let descriptor = ComponentDescriptor::new("consumer")
///     .reference(ReferenceDescriptor::new("data", "org.fipro.inverter.Data"));
/// runtime.load(ComponentType::declarative(descriptor)).unwrap();
///
/// let id = runtime.lifecycle().instances("consumer")[0];
/// assert_eq!(runtime.lifecycle().state(id), Some(ComponentState::Unsatisfied));
///
/// runtime
///     .registry()
///     .register("org.fipro.inverter.Data", Properties::new(), ServiceScope::Singleton)
///     .unwrap();
/// assert_eq!(runtime.lifecycle().state(id), Some(ComponentState::Active));
/// ```
#[derive(Clone)]
pub struct ServiceComponentRuntime {
    registry: ServiceRegistry,
    lifecycle: ComponentLifecycleManager,
    factories: ComponentFactoryManager,
    conditions: ConditionGate,
}

impl Default for ServiceComponentRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceComponentRuntime {
    /// Runtime with a fresh registry and no collaborators
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Start configuring a runtime
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::default()
    }

    /// The service registry
    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    /// The lifecycle manager
    pub fn lifecycle(&self) -> &ComponentLifecycleManager {
        &self.lifecycle
    }

    /// The factory manager
    pub fn factories(&self) -> &ComponentFactoryManager {
        &self.factories
    }

    /// The condition gate
    pub fn conditions(&self) -> &ConditionGate {
        &self.conditions
    }

    /// Load a component type; see [`ComponentLifecycleManager::load`]
    ///
    /// # Errors
    ///
    /// Filter syntax errors, duplicate names and initial activation failures.
    pub fn load(&self, component_type: ComponentType) -> Result<()> {
        self.lifecycle.load(component_type)
    }

    /// Create a factory instance; see [`ComponentFactoryManager::new_instance`]
    ///
    /// # Errors
    ///
    /// Unknown factory, unsatisfied factory or activation failure.
    pub fn new_instance(&self, factory_id: &str, extra: Properties) -> Result<ComponentInstanceHandle> {
        self.factories.new_instance(factory_id, extra)
    }

    /// Dispose a factory instance
    ///
    /// # Errors
    ///
    /// [`scr_domain::Error::AlreadyDisposed`] on a second call.
    pub fn dispose(&self, handle: &ComponentInstanceHandle) -> Result<()> {
        self.factories.dispose(handle)
    }

    /// Register a condition service with the given id
    ///
    /// # Errors
    ///
    /// Registry validation errors.
    pub fn register_condition(&self, id: &str) -> Result<ServiceRecord> {
        self.conditions.register_condition(id)
    }

    /// Snapshot of every component
    pub fn describe(&self) -> Vec<ComponentDescription> {
        self.lifecycle.describe()
    }
}

/// Builder for [`ServiceComponentRuntime`]
#[derive(Default)]
pub struct RuntimeBuilder {
    registry: Option<ServiceRegistry>,
    options: LifecycleOptions,
}

impl RuntimeBuilder {
    /// Share an existing registry
    pub fn with_registry(mut self, registry: ServiceRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Consult a configuration store
    pub fn with_configuration(mut self, configuration: Arc<dyn ConfigurationProvider>) -> Self {
        self.options.configuration = Some(configuration);
        self
    }

    /// Post component events on a bus
    pub fn with_events(mut self, events: Arc<dyn EventPublisher>) -> Self {
        self.options.events = Some(events);
        self
    }

    /// Toggle component state events
    pub fn publish_component_events(mut self, enabled: bool) -> Self {
        self.options.publish_component_events = enabled;
        self
    }

    /// Assemble the runtime
    pub fn build(self) -> ServiceComponentRuntime {
        let registry = self.registry.unwrap_or_default();
        let lifecycle = ComponentLifecycleManager::with_options(registry.clone(), self.options);
        ServiceComponentRuntime {
            factories: ComponentFactoryManager::new(lifecycle.clone()),
            conditions: ConditionGate::new(registry.clone()),
            lifecycle,
            registry,
        }
    }
}
