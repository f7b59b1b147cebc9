//! Component state table entries

use crate::component::{BoundService, Component, ComponentType};
use parking_lot::{Mutex, ReentrantMutex, ReentrantMutexGuard, RwLock};
use scr_domain::constants::CONDITION_CAPABILITY;
use scr_domain::filter::Filter;
use scr_domain::value_objects::{
    Capability, ComponentState, InstanceId, Properties, ServiceId, ServiceRecord,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A loaded component type and its shared bookkeeping
pub(crate) struct ComponentEntry {
    pub(crate) component_type: ComponentType,
    pub(crate) conditions: Vec<Filter>,
    pub(crate) reference_names: Vec<String>,
    enabled: AtomicBool,
    pub(crate) factory_service: Mutex<Option<ServiceId>>,
    /// Serializes changes to the instance set and the factory service
    membership: ReentrantMutex<()>,
}

impl ComponentEntry {
    pub(crate) fn new(component_type: ComponentType, conditions: Vec<Filter>) -> Self {
        let descriptor = component_type.descriptor();
        let reference_names = descriptor.references.iter().map(|r| r.name.clone()).collect();
        let enabled = AtomicBool::new(descriptor.enabled);
        Self {
            component_type,
            conditions,
            reference_names,
            enabled,
            factory_service: Mutex::new(None),
            membership: ReentrantMutex::new(()),
        }
    }

    pub(crate) fn name(&self) -> &str {
        self.component_type.name()
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub(crate) fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    /// Held while instances of this component are created or retired
    ///
    /// Reentrant so a callback running on the holding thread may trigger
    /// another sync of the same component.
    pub(crate) fn lock_membership(&self) -> ReentrantMutexGuard<'_, ()> {
        self.membership.lock()
    }

    /// Whether changes of this capability can affect the component
    pub(crate) fn watches(&self, capability: &Capability) -> bool {
        let descriptor = self.component_type.descriptor();
        descriptor.references.iter().any(|r| &r.capability == capability)
            || (!self.conditions.is_empty() && capability.as_str() == CONDITION_CAPABILITY)
    }
}

/// Why an instance exists
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum InstanceOrigin {
    /// The component's own instance, configured by its PID
    Primary,
    /// One per factory configuration
    FactoryConfiguration(String),
    /// Created through the component factory
    Factory { extra: Properties },
    /// Created for one acquisition of a prototype or bundle service
    ServiceObject,
}

impl InstanceOrigin {
    pub(crate) fn label(&self) -> String {
        match self {
            Self::Primary => "primary".to_string(),
            Self::FactoryConfiguration(pid) => format!("configuration:{pid}"),
            Self::Factory { .. } => "factory".to_string(),
            Self::ServiceObject => "service-object".to_string(),
        }
    }
}

/// Mutable part of an instance, guarded by its transition lock
#[derive(Default)]
pub(crate) struct InstanceState {
    pub(crate) state: ComponentState,
    pub(crate) properties: Properties,
    /// Parallel to the descriptor's references
    pub(crate) bound: Vec<Vec<BoundService>>,
    pub(crate) implementation: Option<Box<dyn Component>>,
    pub(crate) owned_services: Vec<ServiceId>,
    pub(crate) last_error: Option<String>,
}

impl InstanceState {
    pub(crate) fn bound_records(&self, index: usize) -> Vec<ServiceRecord> {
        self.bound
            .get(index)
            .map(|services| services.iter().map(|s| s.record.clone()).collect())
            .unwrap_or_default()
    }
}

/// One component instance
pub(crate) struct InstanceCell {
    pub(crate) id: InstanceId,
    pub(crate) entry: Arc<ComponentEntry>,
    pub(crate) origin: InstanceOrigin,
    pub(crate) state: Mutex<InstanceState>,
    published: RwLock<ComponentState>,
}

impl InstanceCell {
    pub(crate) fn new(id: InstanceId, entry: Arc<ComponentEntry>, origin: InstanceOrigin) -> Self {
        Self {
            id,
            entry,
            origin,
            state: Mutex::new(InstanceState::default()),
            published: RwLock::new(ComponentState::Unsatisfied),
        }
    }

    /// Last state set by a transition; readable without the transition lock
    pub(crate) fn observed_state(&self) -> ComponentState {
        *self.published.read()
    }

    pub(crate) fn publish(&self, state: ComponentState) {
        *self.published.write() = state;
    }
}
