//! Component Lifecycle Manager
//!
//! Owns the component state table and drives every instance through
//!
//! ```text
//! UNSATISFIED -> SATISFIED -> ACTIVE -> DEACTIVATING -> UNSATISFIED
//!                                                    \-> DISPOSED
//! ```
//!
//! ## Execution model
//!
//! Every public entry point runs inside a drain scope. Registry and
//! configuration notifications only enqueue [`Work`]; the thread that owns
//! the outermost scope processes the queue once its own operation is done.
//! Instance transitions therefore never nest: a transition that registers or
//! unregisters a service sees the resulting work processed after it
//! finished.
//!
//! Each instance has its own transition lock. Work is applied
//! instance-by-instance and reconciliation is level-triggered: an instance is
//! compared against the current registry and configuration, so it does not
//! matter which notification caused the visit.

mod instance;
mod introspection;
mod queue;
mod transitions;

pub use introspection::{ComponentDescription, InstanceDescription, ReferenceDescription};

use crate::component::ComponentType;
use crate::condition::ConditionGate;
use crate::registry::{ServiceListener, ServiceRegistry};
use dashmap::DashMap;
use instance::{ComponentEntry, InstanceCell, InstanceOrigin};
use parking_lot::Mutex;
use queue::{DrainScope, Work, WorkQueue};
use scr_domain::constants::CONDITION_CAPABILITY;
use scr_domain::error::{Error, Result};
use scr_domain::events::{EventPublisher, ServiceEvent};
use scr_domain::filter::Filter;
use scr_domain::ports::{ConfigurationEvent, ConfigurationListener, ConfigurationProvider};
use scr_domain::value_objects::{
    Capability, ComponentState, InstanceId, Properties, ServiceId, ServiceObject,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

/// Collaborators of the lifecycle manager
#[derive(Clone, Default)]
pub struct LifecycleOptions {
    /// Configuration store consulted for component properties
    pub configuration: Option<Arc<dyn ConfigurationProvider>>,
    /// Event bus receiving component state events
    pub events: Option<Arc<dyn EventPublisher>>,
    /// Whether state changes are posted on the event bus
    pub publish_component_events: bool,
}

pub(crate) struct LifecycleInner {
    registry: ServiceRegistry,
    gate: ConditionGate,
    configuration: Option<Arc<dyn ConfigurationProvider>>,
    events: Option<Arc<dyn EventPublisher>>,
    publish_events: bool,
    components: DashMap<String, Arc<ComponentEntry>>,
    instances: DashMap<InstanceId, Arc<InstanceCell>>,
    next_instance: AtomicU64,
    queue: WorkQueue,
    watched: Mutex<HashSet<Capability>>,
    self_ref: Weak<LifecycleInner>,
}

/// Turns registry changes into deferred work
struct RegistryWatcher {
    lifecycle: Weak<LifecycleInner>,
}

impl ServiceListener for RegistryWatcher {
    fn service_changed(&self, event: &ServiceEvent) {
        if let Some(lifecycle) = self.lifecycle.upgrade() {
            lifecycle
                .queue
                .push(Work::ServiceChanged(event.capability().clone()));
        }
    }

    fn events_delivered(&self) {
        if let Some(lifecycle) = self.lifecycle.upgrade() {
            lifecycle.flush();
        }
    }
}

/// Turns configuration changes into deferred work
struct ConfigurationWatcher {
    lifecycle: Weak<LifecycleInner>,
}

impl ConfigurationListener for ConfigurationWatcher {
    fn configuration_changed(&self, event: &ConfigurationEvent) {
        if let Some(lifecycle) = self.lifecycle.upgrade() {
            lifecycle.queue.push(Work::ConfigurationChanged {
                pid: event.pid().to_string(),
                factory_pid: event.factory_pid().map(str::to_string),
            });
            lifecycle.flush();
        }
    }
}

impl LifecycleInner {
    /// Run an entry point, then drain the work it caused
    pub(crate) fn run<T>(&self, operation: impl FnOnce() -> Result<T>) -> Result<T> {
        if !self.queue.enter() {
            return operation();
        }
        let _scope = DrainScope::new(&self.queue);
        let result = operation();
        self.drain();
        result
    }

    /// Drain pending work unless this thread is already draining
    pub(crate) fn flush(&self) {
        if self.queue.enter() {
            let _scope = DrainScope::new(&self.queue);
            self.drain();
        }
    }

    fn drain(&self) {
        while let Some(work) = self.queue.pop() {
            if let Err(err) = self.process(&work) {
                warn!(?work, error = %err, "Deferred lifecycle work failed");
            }
        }
    }

    fn process(&self, work: &Work) -> Result<()> {
        match work {
            Work::ServiceChanged(capability) => {
                let affected = self.entries_where(|entry| entry.watches(capability));
                self.sync_all(&affected)
            }
            Work::ConfigurationChanged { pid, factory_pid } => {
                let affected = self.entries_where(|entry| {
                    let own = entry.component_type.descriptor().pid();
                    own == pid.as_str() || factory_pid.as_deref() == Some(own)
                });
                self.sync_all(&affected)
            }
            Work::Dispose(id) => match self.instances.get(id).map(|c| Arc::clone(c.value())) {
                Some(cell) => self.dispose_cell(&cell),
                None => Ok(()),
            },
        }
    }

    fn sync_all(&self, entries: &[Arc<ComponentEntry>]) -> Result<()> {
        let mut first_error = None;
        for entry in entries {
            if let Err(err) = self.sync_component(entry) {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn entry(&self, name: &str) -> Option<Arc<ComponentEntry>> {
        self.components.get(name).map(|e| Arc::clone(e.value()))
    }

    fn entries_where(&self, predicate: impl Fn(&ComponentEntry) -> bool) -> Vec<Arc<ComponentEntry>> {
        let mut entries: Vec<Arc<ComponentEntry>> = self
            .components
            .iter()
            .filter(|e| predicate(e.value()))
            .map(|e| Arc::clone(e.value()))
            .collect();
        entries.sort_by(|a, b| a.name().cmp(b.name()));
        entries
    }

    /// Snapshot of a component's instances; no map guard is held afterwards
    fn instances_of(&self, name: &str) -> Vec<Arc<InstanceCell>> {
        let mut cells: Vec<Arc<InstanceCell>> = self
            .instances
            .iter()
            .filter(|c| c.value().entry.name() == name)
            .map(|c| Arc::clone(c.value()))
            .collect();
        cells.sort_by_key(|c| c.id);
        cells
    }

    fn cell(&self, id: InstanceId) -> Option<Arc<InstanceCell>> {
        self.instances.get(&id).map(|c| Arc::clone(c.value()))
    }

    fn allocate_id(&self) -> InstanceId {
        InstanceId::new(self.next_instance.fetch_add(1, Ordering::SeqCst))
    }

    fn watch(&self, capability: Capability) {
        let newly_watched = self.watched.lock().insert(capability.clone());
        if newly_watched {
            self.registry.subscribe(
                capability,
                Arc::new(RegistryWatcher {
                    lifecycle: self.self_ref.clone(),
                }),
            );
        }
    }

    fn factory_entry(&self, factory_id: &str) -> Result<Arc<ComponentEntry>> {
        self.components
            .iter()
            .find(|e| e.value().component_type.descriptor().factory.as_deref() == Some(factory_id))
            .map(|e| Arc::clone(e.value()))
            .ok_or_else(|| Error::not_found(format!("component factory '{factory_id}'")))
    }

    /// Create and activate a factory-produced instance
    pub(crate) fn create_factory_instance(
        &self,
        factory_id: &str,
        extra: Properties,
    ) -> Result<(InstanceId, String, Option<ServiceObject>)> {
        self.run(|| {
            let entry = self.factory_entry(factory_id)?;
            let origin = InstanceOrigin::Factory { extra };
            let (id, object) = self.spawn_active(&entry, origin)?;
            Ok((id, entry.name().to_string(), object))
        })
    }

    /// Create and activate an instance backing one acquisition of a
    /// prototype or bundle-scoped component service
    pub(crate) fn create_service_instance(&self, component: &str) -> Result<(InstanceId, ServiceObject)> {
        self.run(|| {
            let entry = self
                .entry(component)
                .ok_or_else(|| Error::not_found(format!("component '{component}'")))?;
            let (id, object) = self.spawn_active(&entry, InstanceOrigin::ServiceObject)?;
            let object = object.unwrap_or_else(|| Arc::new(()) as ServiceObject);
            Ok((id, object))
        })
    }

    /// Dispose an instance now
    pub(crate) fn dispose_instance(&self, id: InstanceId) -> Result<()> {
        self.run(|| {
            let cell = self
                .cell(id)
                .ok_or_else(|| Error::already_disposed(id.value()))?;
            self.dispose_cell(&cell)
        })
    }

    /// Dispose an instance once the current transition is over
    pub(crate) fn schedule_dispose(&self, id: InstanceId) {
        self.queue.push(Work::Dispose(id));
        self.flush();
    }
}

/// Drives component instances for one registry
///
/// Cheap to clone; clones share the same state table.
#[derive(Clone)]
pub struct ComponentLifecycleManager {
    inner: Arc<LifecycleInner>,
}

impl ComponentLifecycleManager {
    /// Manager without configuration or event collaborators
    pub fn new(registry: ServiceRegistry) -> Self {
        Self::with_options(registry, LifecycleOptions::default())
    }

    /// Manager wired to its collaborators
    pub fn with_options(registry: ServiceRegistry, options: LifecycleOptions) -> Self {
        let inner = Arc::new_cyclic(|weak| LifecycleInner {
            gate: ConditionGate::new(registry.clone()),
            registry,
            configuration: options.configuration.clone(),
            events: options.events,
            publish_events: options.publish_component_events,
            components: DashMap::new(),
            instances: DashMap::new(),
            next_instance: AtomicU64::new(1),
            queue: WorkQueue::default(),
            watched: Mutex::new(HashSet::new()),
            self_ref: weak.clone(),
        });
        if let Some(provider) = options.configuration {
            provider.add_listener(Arc::new(ConfigurationWatcher {
                lifecycle: Arc::downgrade(&inner),
            }));
        }
        Self { inner }
    }

    pub(crate) fn inner(&self) -> &Arc<LifecycleInner> {
        &self.inner
    }

    /// The registry this manager watches
    pub fn registry(&self) -> &ServiceRegistry {
        &self.inner.registry
    }

    /// Load a component type and try to activate it
    ///
    /// # Errors
    ///
    /// - [`Error::FilterSyntax`] when a declared target or condition does not
    ///   parse; the type is not loaded.
    /// - [`Error::Configuration`] when a component with the same name is
    ///   already loaded.
    /// - [`Error::ActivationFailed`] when the initial activation failed; the
    ///   type stays loaded and is retried on later changes.
    pub fn load(&self, component_type: ComponentType) -> Result<()> {
        let inner = &self.inner;
        inner.run(|| {
            let descriptor = component_type.descriptor();
            let name = descriptor.name.clone();
            if inner.components.contains_key(&name) {
                return Err(Error::configuration(format!(
                    "component '{name}' is already loaded"
                )));
            }
            for reference in &descriptor.references {
                if let Some(target) = &reference.target {
                    Filter::parse(target)?;
                }
            }
            let conditions = descriptor
                .conditions
                .iter()
                .map(|target| ConditionGate::parse_target(target))
                .collect::<Result<Vec<_>>>()?;

            let capabilities: Vec<Capability> = descriptor
                .references
                .iter()
                .map(|r| r.capability.clone())
                .collect();
            let entry = Arc::new(ComponentEntry::new(component_type, conditions));
            let conditional = !entry.conditions.is_empty();
            inner.components.insert(name.clone(), Arc::clone(&entry));
            for capability in capabilities {
                inner.watch(capability);
            }
            if conditional {
                inner.watch(Capability::from(CONDITION_CAPABILITY));
            }
            info!(component = %name, enabled = entry.is_enabled(), "Component loaded");
            inner.sync_component(&entry)
        })
    }

    /// Dispose every instance and forget the component type
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] when no such component is loaded.
    pub fn unload(&self, name: &str) -> Result<()> {
        let inner = &self.inner;
        inner.run(|| {
            let (_, entry) = inner
                .components
                .remove(name)
                .ok_or_else(|| Error::not_found(format!("component '{name}'")))?;
            entry.set_enabled(false);
            inner.retire_component(&entry);
            info!(component = %name, "Component unloaded");
            Ok(())
        })
    }

    /// Enable a component and try to activate it
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] for an unknown component, or the activation
    /// failure of one of its instances.
    pub fn enable(&self, name: &str) -> Result<()> {
        let inner = &self.inner;
        inner.run(|| {
            let entry = inner
                .entry(name)
                .ok_or_else(|| Error::not_found(format!("component '{name}'")))?;
            entry.set_enabled(true);
            debug!(component = %name, "Component enabled");
            inner.sync_component(&entry)
        })
    }

    /// Disable a component, disposing every instance
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] for an unknown component.
    pub fn disable(&self, name: &str) -> Result<()> {
        let inner = &self.inner;
        inner.run(|| {
            let entry = inner
                .entry(name)
                .ok_or_else(|| Error::not_found(format!("component '{name}'")))?;
            entry.set_enabled(false);
            debug!(component = %name, "Component disabled");
            inner.sync_component(&entry)
        })
    }

    /// Re-evaluate one component against the current registry
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] for an unknown component, or an activation
    /// failure.
    pub fn refresh(&self, name: &str) -> Result<()> {
        let inner = &self.inner;
        inner.run(|| {
            let entry = inner
                .entry(name)
                .ok_or_else(|| Error::not_found(format!("component '{name}'")))?;
            inner.sync_component(&entry)
        })
    }

    /// Names of loaded components, sorted
    pub fn component_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.components.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Live instances of a component, oldest first
    pub fn instances(&self, name: &str) -> Vec<InstanceId> {
        self.inner.instances_of(name).iter().map(|c| c.id).collect()
    }

    /// State of an instance; `None` once it is disposed
    pub fn state(&self, id: InstanceId) -> Option<ComponentState> {
        self.inner.cell(id).map(|c| c.observed_state())
    }

    /// Ids bound to one reference of an instance, in bound order
    ///
    /// Takes the instance's transition lock; do not call from that
    /// instance's own callbacks.
    pub fn bound_services(&self, id: InstanceId, reference: &str) -> Vec<ServiceId> {
        let Some(cell) = self.inner.cell(id) else {
            return Vec::new();
        };
        let Some(index) = cell.entry.reference_names.iter().position(|n| n == reference) else {
            return Vec::new();
        };
        let state = cell.state.lock();
        state
            .bound
            .get(index)
            .map(|services| services.iter().map(|s| s.record.id()).collect())
            .unwrap_or_default()
    }

    /// Activation properties of an active instance
    pub fn properties(&self, id: InstanceId) -> Option<Properties> {
        let cell = self.inner.cell(id)?;
        let state = cell.state.lock();
        (state.state == ComponentState::Active).then(|| state.properties.clone())
    }

    /// Services registered by an instance
    pub fn owned_services(&self, id: InstanceId) -> Vec<ServiceId> {
        self.inner
            .cell(id)
            .map(|cell| cell.state.lock().owned_services.clone())
            .unwrap_or_default()
    }

    /// Last failure or unsatisfied diagnostic of an instance
    pub fn last_error(&self, id: InstanceId) -> Option<String> {
        self.inner
            .cell(id)
            .and_then(|cell| cell.state.lock().last_error.clone())
    }

    /// Service id of a factory component's marker service while satisfied
    pub fn factory_service(&self, name: &str) -> Option<ServiceId> {
        self.inner
            .entry(name)
            .and_then(|entry| *entry.factory_service.lock())
    }

    /// Snapshot of every component and instance
    pub fn describe(&self) -> Vec<ComponentDescription> {
        self.inner
            .entries_where(|_| true)
            .iter()
            .map(|entry| self.inner.describe_entry(entry))
            .collect()
    }

    /// Snapshot of one component
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] for an unknown component.
    pub fn describe_component(&self, name: &str) -> Result<ComponentDescription> {
        self.inner
            .entry(name)
            .map(|entry| self.inner.describe_entry(&entry))
            .ok_or_else(|| Error::not_found(format!("component '{name}'")))
    }
}
