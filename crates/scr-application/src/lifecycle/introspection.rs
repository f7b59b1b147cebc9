//! Serializable snapshots of the component state table

use super::LifecycleInner;
use super::instance::ComponentEntry;
use scr_domain::value_objects::{
    Capability, Cardinality, ComponentState, ConfigurationPolicy, InstanceId, PolicyOption,
    Properties, ReferencePolicy, ServiceId, ServiceScope,
};
use serde::Serialize;
use std::collections::BTreeMap;

/// A declared reference as loaded
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceDescription {
    /// Reference name
    pub name: String,
    /// Capability
    pub capability: Capability,
    /// Cardinality
    pub cardinality: Cardinality,
    /// Policy
    pub policy: ReferencePolicy,
    /// Policy option
    pub policy_option: PolicyOption,
    /// Declared target filter
    pub target: Option<String>,
}

/// One instance at the time of the snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstanceDescription {
    /// Instance id
    pub id: InstanceId,
    /// Why the instance exists
    pub origin: String,
    /// Lifecycle state
    pub state: ComponentState,
    /// Activation properties (empty unless active)
    pub properties: Properties,
    /// Bound service ids per reference
    pub bound: BTreeMap<String, Vec<ServiceId>>,
    /// Services registered by the instance
    pub services: Vec<ServiceId>,
    /// Outstanding acquisitions of those services
    pub usage: usize,
    /// Last failure or unsatisfied diagnostic
    pub last_error: Option<String>,
    /// The instance was mid-transition; only `state` is reliable
    pub busy: bool,
}

/// A loaded component type and its instances
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentDescription {
    /// Component name
    pub name: String,
    /// Whether the component is enabled
    pub enabled: bool,
    /// Provided capabilities
    pub provides: Vec<Capability>,
    /// Scope of the provided service
    pub scope: ServiceScope,
    /// Configuration PID
    pub configuration_pid: String,
    /// Configuration policy
    pub configuration_policy: ConfigurationPolicy,
    /// Factory id for factory components
    pub factory: Option<String>,
    /// Marker service of a satisfied factory component
    pub factory_service: Option<ServiceId>,
    /// Declared references
    pub references: Vec<ReferenceDescription>,
    /// Declared condition targets
    pub conditions: Vec<String>,
    /// Live instances, oldest first
    pub instances: Vec<InstanceDescription>,
}

impl LifecycleInner {
    pub(super) fn describe_entry(&self, entry: &ComponentEntry) -> ComponentDescription {
        let descriptor = entry.component_type.descriptor();
        let references = descriptor
            .references
            .iter()
            .map(|r| ReferenceDescription {
                name: r.name.clone(),
                capability: r.capability.clone(),
                cardinality: r.cardinality,
                policy: r.policy,
                policy_option: r.policy_option,
                target: r.target.clone(),
            })
            .collect();

        let instances = self
            .instances_of(entry.name())
            .iter()
            .map(|cell| {
                let Some(st) = cell.state.try_lock() else {
                    return InstanceDescription {
                        id: cell.id,
                        origin: cell.origin.label(),
                        state: cell.observed_state(),
                        properties: Properties::new(),
                        bound: BTreeMap::new(),
                        services: Vec::new(),
                        usage: 0,
                        last_error: None,
                        busy: true,
                    };
                };
                let bound = entry
                    .reference_names
                    .iter()
                    .enumerate()
                    .map(|(index, name)| {
                        let ids = st
                            .bound
                            .get(index)
                            .map(|services| services.iter().map(|s| s.record.id()).collect())
                            .unwrap_or_default();
                        (name.clone(), ids)
                    })
                    .collect();
                let usage = st
                    .owned_services
                    .iter()
                    .map(|id| self.registry.usage_count(*id))
                    .sum();
                InstanceDescription {
                    id: cell.id,
                    origin: cell.origin.label(),
                    state: st.state,
                    properties: if st.state == ComponentState::Active {
                        st.properties.clone()
                    } else {
                        Properties::new()
                    },
                    bound,
                    services: st.owned_services.clone(),
                    usage,
                    last_error: st.last_error.clone(),
                    busy: false,
                }
            })
            .collect();

        ComponentDescription {
            name: descriptor.name.clone(),
            enabled: entry.is_enabled(),
            provides: descriptor.provides.clone(),
            scope: descriptor.scope,
            configuration_pid: descriptor.pid().to_string(),
            configuration_policy: descriptor.configuration_policy,
            factory: descriptor.factory.clone(),
            factory_service: *entry.factory_service.lock(),
            references,
            conditions: descriptor.conditions.clone(),
            instances,
        }
    }
}
