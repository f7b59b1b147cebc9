//! Instance transitions
//!
//! Everything here runs inside a drain scope. Functions taking an
//! `&mut InstanceState` expect the caller to hold that instance's transition
//! lock and never take a second instance lock themselves.

use super::LifecycleInner;
use super::instance::{ComponentEntry, InstanceCell, InstanceOrigin, InstanceState};
use crate::binding::{BindingPolicyEngine, RebindDecision, RebindPlan};
use crate::component::{Binding, BoundService, Component, ComponentContext};
use crate::factory::ComponentServiceFactory;
use crate::matching::{EffectiveReference, ReferenceMatcher, Resolution};
use crate::registry::Consumer;
use scr_domain::constants::{
    COMPONENT_EVENT_TOPIC_PREFIX, COMPONENT_FACTORY, COMPONENT_FACTORY_CAPABILITY, COMPONENT_ID,
    COMPONENT_NAME, SERVICE_FACTORY_PID, SERVICE_PID,
};
use scr_domain::error::{Error, Result};
use scr_domain::events::Event;
use scr_domain::filter::Filter;
use scr_domain::value_objects::{
    ComponentState, ConfigurationPolicy, InstanceId, Properties, ReferenceDescriptor,
    ServiceObject, ServiceScope,
};
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// An instance (or factory) compared against the current registry
pub(super) struct Evaluation {
    properties: Option<Properties>,
    references: Vec<EffectiveReference>,
    resolutions: Vec<Resolution>,
    unsatisfied: Option<String>,
}

fn empty_bindings(entry: &ComponentEntry) -> Vec<Vec<BoundService>> {
    entry.reference_names.iter().map(|_| Vec::new()).collect()
}

fn unbind_in_reverse(
    component: &mut dyn Component,
    descriptors: &[ReferenceDescriptor],
    bound: &[Vec<BoundService>],
    done: &[(usize, usize)],
) {
    for &(index, position) in done.iter().rev() {
        let service = bound.get(index).and_then(|services| services.get(position));
        if let (Some(descriptor), Some(service)) = (descriptors.get(index), service) {
            component.unbind(&Binding {
                reference: &descriptor.name,
                method: descriptor.unbind.as_deref(),
                record: &service.record,
                service: service.lease.service(),
            });
        }
    }
}

impl LifecycleInner {
    // Properties and evaluation

    fn configuration(&self, pid: &str) -> Result<Option<Properties>> {
        match &self.configuration {
            Some(provider) => provider.get_configuration(pid),
            None => Ok(None),
        }
    }

    fn factory_configuration_pids(&self, factory_pid: &str) -> Result<Vec<String>> {
        let Some(provider) = &self.configuration else {
            return Ok(Vec::new());
        };
        let filter = Filter::equals(SERVICE_FACTORY_PID, factory_pid);
        let mut pids: Vec<String> = provider
            .list_configurations(Some(&filter))?
            .iter()
            .filter_map(|config| config.get_str(SERVICE_PID).map(str::to_string))
            .collect();
        pids.sort();
        Ok(pids)
    }

    /// Static properties merged with configuration and factory input
    ///
    /// `None` when the configuration the instance depends on is missing.
    fn base_properties(
        &self,
        entry: &ComponentEntry,
        origin: &InstanceOrigin,
    ) -> Result<Option<Properties>> {
        let descriptor = entry.component_type.descriptor();
        let policy = descriptor.configuration_policy;
        let mut properties = descriptor.properties.clone();

        if let InstanceOrigin::FactoryConfiguration(pid) = origin {
            match self.configuration(pid)? {
                Some(config) => properties.merge(&config),
                None => return Ok(None),
            }
        } else if policy != ConfigurationPolicy::Ignore {
            match self.configuration(descriptor.pid())? {
                Some(config) => properties.merge(&config),
                None if policy == ConfigurationPolicy::Require => return Ok(None),
                None => {}
            }
        }
        if let InstanceOrigin::Factory { extra } = origin {
            properties.merge(extra);
        }
        properties.insert(COMPONENT_NAME, descriptor.name.as_str());
        Ok(Some(properties))
    }

    fn instance_properties(&self, cell: &InstanceCell) -> Result<Option<Properties>> {
        Ok(self
            .base_properties(&cell.entry, &cell.origin)?
            .map(|properties| properties.with(COMPONENT_ID, cell.id.value())))
    }

    fn evaluate(&self, entry: &ComponentEntry, properties: Option<Properties>) -> Result<Evaluation> {
        let descriptor = entry.component_type.descriptor();
        let Some(props) = properties else {
            return Ok(Evaluation {
                properties: None,
                references: Vec::new(),
                resolutions: Vec::new(),
                unsatisfied: Some(format!("configuration '{}' is required", descriptor.pid())),
            });
        };

        let references = descriptor
            .references
            .iter()
            .map(|reference| EffectiveReference::new(reference, &props))
            .collect::<Result<Vec<_>>>()?;
        let resolutions: Vec<Resolution> = references
            .iter()
            .map(|reference| ReferenceMatcher::resolve(reference, &self.registry))
            .collect();

        let unsatisfied = if !entry.is_enabled() {
            Some("component is disabled".to_string())
        } else if !self.gate.all_satisfied(&entry.conditions) {
            Some("a declared condition is not present".to_string())
        } else {
            references
                .iter()
                .zip(&resolutions)
                .find(|(_, resolution)| !resolution.is_satisfied())
                .map(|(reference, resolution)| {
                    format!(
                        "reference '{}' has {} of {} required services",
                        reference.descriptor().name,
                        resolution.matching.len(),
                        resolution.minimum
                    )
                })
        };

        Ok(Evaluation {
            properties: Some(props),
            references,
            resolutions,
            unsatisfied,
        })
    }

    /// Primary and factory-configuration instances of prototype or bundle
    /// scoped components only publish a service factory
    fn serves_through_factory(cell: &InstanceCell) -> bool {
        let descriptor = cell.entry.component_type.descriptor();
        !descriptor.provides.is_empty()
            && descriptor.scope != ServiceScope::Singleton
            && matches!(
                cell.origin,
                InstanceOrigin::Primary | InstanceOrigin::FactoryConfiguration(_)
            )
    }

    // Component-level reconciliation

    /// Bring a component's instance set and every instance up to date
    ///
    /// The instance set is settled under the component's membership lock, so
    /// concurrent syncs of one component never create the same instance
    /// twice. Instances are then reconciled one at a time without it.
    pub(super) fn sync_component(&self, entry: &Arc<ComponentEntry>) -> Result<()> {
        {
            let _membership = entry.lock_membership();
            if !entry.is_enabled() {
                self.retire_component(entry);
                return Ok(());
            }
            if entry.component_type.descriptor().is_factory() {
                self.reconcile_factory(entry)?;
            } else {
                self.sync_managed_instances(entry)?;
            }
        }

        let mut first_error = None;
        for cell in self.instances_of(entry.name()) {
            if let Err(err) = self.reconcile(&cell) {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Dispose every instance and withdraw the factory service
    pub(super) fn retire_component(&self, entry: &ComponentEntry) {
        let _membership = entry.lock_membership();
        for cell in self.instances_of(entry.name()) {
            if let Err(err) = self.dispose_cell(&cell) {
                debug!(component = entry.name(), instance = %cell.id, error = %err, "Instance already gone");
            }
        }
        let marker = entry.factory_service.lock().take();
        if let Some(id) = marker
            && let Err(err) = self.registry.unregister(id)
        {
            debug!(component = entry.name(), service_id = %id, error = %err, "Factory service already gone");
        }
    }

    /// Create or dispose configuration-driven instances
    ///
    /// Caller holds the component's membership lock.
    fn sync_managed_instances(&self, entry: &Arc<ComponentEntry>) -> Result<()> {
        let descriptor = entry.component_type.descriptor();
        let mut desired = Vec::new();
        if descriptor.configuration_policy == ConfigurationPolicy::Ignore {
            desired.push(InstanceOrigin::Primary);
        } else {
            let factory_pids = self.factory_configuration_pids(descriptor.pid())?;
            let configured = self.configuration(descriptor.pid())?.is_some();
            if configured || factory_pids.is_empty() {
                desired.push(InstanceOrigin::Primary);
            }
            desired.extend(factory_pids.into_iter().map(InstanceOrigin::FactoryConfiguration));
        }

        let existing: Vec<Arc<InstanceCell>> = self
            .instances_of(entry.name())
            .into_iter()
            .filter(|cell| {
                matches!(
                    cell.origin,
                    InstanceOrigin::Primary | InstanceOrigin::FactoryConfiguration(_)
                )
            })
            .collect();

        for cell in &existing {
            if !desired.contains(&cell.origin) {
                self.dispose_cell(cell)?;
            }
        }
        for origin in desired {
            if !existing.iter().any(|cell| cell.origin == origin) {
                let id = self.allocate_id();
                let cell = Arc::new(InstanceCell::new(id, Arc::clone(entry), origin));
                debug!(component = entry.name(), instance = %id, origin = %cell.origin.label(), "Instance created");
                self.instances.insert(id, cell);
            }
        }
        Ok(())
    }

    /// Publish or withdraw a factory component's marker service
    ///
    /// Caller holds the component's membership lock.
    fn reconcile_factory(&self, entry: &ComponentEntry) -> Result<()> {
        let descriptor = entry.component_type.descriptor();
        let Some(factory_id) = &descriptor.factory else {
            return Ok(());
        };
        let properties = self.base_properties(entry, &InstanceOrigin::Primary)?;
        let satisfied = self.evaluate(entry, properties)?.unsatisfied.is_none();

        let mut marker = entry.factory_service.lock();
        match (satisfied, *marker) {
            (true, None) => {
                let properties = descriptor
                    .factory_properties
                    .clone()
                    .with(COMPONENT_FACTORY, factory_id.as_str())
                    .with(COMPONENT_NAME, descriptor.name.as_str());
                let record = self.registry.register(
                    COMPONENT_FACTORY_CAPABILITY,
                    properties,
                    ServiceScope::Singleton,
                )?;
                *marker = Some(record.id());
                debug!(component = entry.name(), factory = %factory_id, service_id = %record.id(), "Component factory available");
            }
            (false, Some(id)) => {
                *marker = None;
                if let Err(err) = self.registry.unregister(id) {
                    debug!(component = entry.name(), service_id = %id, error = %err, "Factory service already gone");
                }
                debug!(component = entry.name(), factory = %factory_id, "Component factory withdrawn");
            }
            _ => {}
        }
        Ok(())
    }

    // Instance-level reconciliation

    pub(super) fn reconcile(&self, cell: &InstanceCell) -> Result<()> {
        let mut state = cell.state.lock();
        self.reconcile_locked(cell, &mut state)
    }

    pub(super) fn reconcile_locked(&self, cell: &InstanceCell, st: &mut InstanceState) -> Result<()> {
        if st.state == ComponentState::Disposed {
            return Ok(());
        }
        let evaluation = match self
            .instance_properties(cell)
            .and_then(|properties| self.evaluate(&cell.entry, properties))
        {
            Ok(evaluation) => evaluation,
            Err(err) => {
                warn!(component = cell.entry.name(), instance = %cell.id, error = %err, "Instance evaluation failed");
                self.deactivate(cell, st);
                st.last_error = Some(err.to_string());
                return Err(err);
            }
        };

        if st.state == ComponentState::Active {
            return self.reconcile_active(cell, st, evaluation);
        }
        if let Some(reason) = evaluation.unsatisfied {
            trace!(component = cell.entry.name(), instance = %cell.id, %reason, "Instance unsatisfied");
            st.last_error = Some(reason);
            return Ok(());
        }
        self.activate(cell, st, evaluation)
    }

    fn reconcile_active(
        &self,
        cell: &InstanceCell,
        st: &mut InstanceState,
        evaluation: Evaluation,
    ) -> Result<()> {
        let name = cell.entry.name();
        if let Some(reason) = evaluation.unsatisfied {
            debug!(component = name, instance = %cell.id, %reason, "Dependencies lost");
            self.deactivate(cell, st);
            st.last_error = Some(reason);
            return Ok(());
        }
        let Some(properties) = evaluation.properties else {
            return Ok(());
        };

        if Self::serves_through_factory(cell) {
            if properties != st.properties {
                st.properties = properties;
                self.update_owned_services(cell, st);
            }
            return Ok(());
        }

        if properties != st.properties {
            if !cell.entry.component_type.descriptor().modified {
                debug!(component = name, instance = %cell.id, "Properties changed, reactivating");
                self.deactivate(cell, st);
                return self.reconcile_locked(cell, st);
            }
            let context = ComponentContext::new(
                cell.id,
                name,
                &properties,
                &cell.entry.reference_names,
                &st.bound,
            );
            let outcome = st
                .implementation
                .as_mut()
                .map_or(Ok(()), |component| component.modified(&context));
            if let Err(err) = outcome {
                warn!(component = name, instance = %cell.id, error = %err, "Modified callback failed, reactivating");
                self.deactivate(cell, st);
                st.last_error = Some(err.to_string());
                return self.reconcile_locked(cell, st);
            }
            st.properties = properties;
            self.update_owned_services(cell, st);
            debug!(component = name, instance = %cell.id, "Component modified");
        }

        let plans = evaluation
            .references
            .iter()
            .zip(&evaluation.resolutions)
            .enumerate();
        for (index, (reference, resolution)) in plans {
            let old = st.bound_records(index);
            match BindingPolicyEngine::decide_rebind(reference, &old, resolution) {
                RebindDecision::NoChange => {}
                RebindDecision::Defer => {
                    debug!(component = name, instance = %cell.id, reference = %reference.descriptor().name, "Reference change requires reactivation");
                    self.deactivate(cell, st);
                    return self.reconcile_locked(cell, st);
                }
                RebindDecision::Rebind(plan) => {
                    if let Err(err) = self.apply_plan(cell, st, index, reference, &plan) {
                        warn!(component = name, instance = %cell.id, reference = %reference.descriptor().name, error = %err, "Rebind failed, reactivating");
                        self.deactivate(cell, st);
                        st.last_error = Some(err.to_string());
                        return self.reconcile_locked(cell, st);
                    }
                }
            }
        }
        Ok(())
    }

    /// Apply a dynamic rebind: unbind, then update, then bind
    fn apply_plan(
        &self,
        cell: &InstanceCell,
        st: &mut InstanceState,
        index: usize,
        reference: &EffectiveReference,
        plan: &RebindPlan,
    ) -> Result<()> {
        let descriptor = reference.descriptor();
        let consumer = Consumer::component(cell.entry.name(), cell.id);
        if st.bound.len() <= index {
            st.bound.resize_with(index + 1, Vec::new);
        }
        let InstanceState {
            bound,
            implementation,
            ..
        } = st;
        let services = &mut bound[index];

        for record in &plan.unbind {
            if let Some(position) = services.iter().position(|s| s.record.id() == record.id()) {
                let service = services.remove(position);
                if let Some(component) = implementation.as_mut() {
                    component.unbind(&Binding {
                        reference: &descriptor.name,
                        method: descriptor.unbind.as_deref(),
                        record: &service.record,
                        service: service.lease.service(),
                    });
                }
                trace!(component = cell.entry.name(), reference = %descriptor.name, service_id = %record.id(), "Unbound");
            }
        }

        for record in &plan.update {
            if let Some(service) = services.iter_mut().find(|s| s.record.id() == record.id()) {
                service.record = record.clone();
                service.lease.refresh(record.clone());
                if descriptor.updated.is_some()
                    && let Some(component) = implementation.as_mut()
                {
                    component.updated(&Binding {
                        reference: &descriptor.name,
                        method: descriptor.updated.as_deref(),
                        record: &service.record,
                        service: service.lease.service(),
                    });
                }
            }
        }

        for record in &plan.bind {
            let lease = self.registry.get_service(record.id(), &consumer)?;
            if let Some(component) = implementation.as_mut() {
                component.bind(&Binding {
                    reference: &descriptor.name,
                    method: descriptor.bind.as_deref(),
                    record,
                    service: lease.service(),
                })?;
            }
            trace!(component = cell.entry.name(), reference = %descriptor.name, service_id = %record.id(), "Bound");
            services.push(BoundService {
                record: record.clone(),
                lease,
            });
        }

        services.sort_by_key(|service| {
            plan.target
                .iter()
                .position(|t| t.id() == service.record.id())
                .unwrap_or(usize::MAX)
        });
        Ok(())
    }

    // Transitions

    fn set_state(&self, cell: &InstanceCell, st: &mut InstanceState, state: ComponentState) {
        if st.state == state {
            return;
        }
        st.state = state;
        cell.publish(state);
        trace!(component = cell.entry.name(), instance = %cell.id, %state, "State changed");
        self.emit(cell, state);
    }

    fn emit(&self, cell: &InstanceCell, state: ComponentState) {
        if !self.publish_events {
            return;
        }
        let Some(events) = &self.events else {
            return;
        };
        let properties = Properties::new()
            .with(COMPONENT_NAME, cell.entry.name())
            .with(COMPONENT_ID, cell.id.value());
        let topic = format!("{COMPONENT_EVENT_TOPIC_PREFIX}/{state}");
        if let Err(err) = events.post(Event::new(topic, properties)) {
            warn!(component = cell.entry.name(), error = %err, "Failed to post component event");
        }
    }

    fn activate(&self, cell: &InstanceCell, st: &mut InstanceState, evaluation: Evaluation) -> Result<()> {
        let entry = &cell.entry;
        let name = entry.name();
        let Some(properties) = evaluation.properties else {
            return Ok(());
        };
        self.set_state(cell, st, ComponentState::Satisfied);

        if Self::serves_through_factory(cell) {
            st.properties = properties;
            st.bound = empty_bindings(entry);
            self.set_state(cell, st, ComponentState::Active);
            if let Err(err) = self.register_owned_services(cell, st) {
                return self.fail_activation(cell, st, err);
            }
            st.last_error = None;
            debug!(component = name, instance = %cell.id, "Service factory published");
            return Ok(());
        }

        let consumer = Consumer::component(name, cell.id);
        let mut bound = Vec::with_capacity(evaluation.references.len());
        for (reference, resolution) in evaluation.references.iter().zip(&evaluation.resolutions) {
            let wanted = if reference.descriptor().cardinality.is_multiple() {
                usize::MAX
            } else {
                1
            };
            let mut services = Vec::new();
            for record in &resolution.matching {
                if services.len() >= wanted {
                    break;
                }
                match self.registry.get_service(record.id(), &consumer) {
                    Ok(lease) => services.push(BoundService {
                        record: lease.record().clone(),
                        lease,
                    }),
                    Err(err) => {
                        debug!(component = name, reference = %reference.descriptor().name, service_id = %record.id(), error = %err, "Candidate could not be acquired");
                    }
                }
            }
            if services.len() < reference.minimum() {
                st.last_error = Some(format!(
                    "reference '{}' acquired {} of {} required services",
                    reference.descriptor().name,
                    services.len(),
                    reference.minimum()
                ));
                self.set_state(cell, st, ComponentState::Unsatisfied);
                return Ok(());
            }
            bound.push(services);
        }

        let mut component = match entry.component_type.instantiate(&properties) {
            Ok(component) => component,
            Err(err) => return self.fail_activation(cell, st, err),
        };

        let descriptors = &entry.component_type.descriptor().references;
        let mut done = Vec::new();
        for ((index, services), descriptor) in bound.iter().enumerate().zip(descriptors) {
            for (position, service) in services.iter().enumerate() {
                let binding = Binding {
                    reference: &descriptor.name,
                    method: descriptor.bind.as_deref(),
                    record: &service.record,
                    service: service.lease.service(),
                };
                if let Err(err) = component.bind(&binding) {
                    unbind_in_reverse(component.as_mut(), descriptors, &bound, &done);
                    return self.fail_activation(cell, st, err);
                }
                done.push((index, position));
            }
        }

        let context =
            ComponentContext::new(cell.id, name, &properties, &entry.reference_names, &bound);
        if let Err(err) = component.activate(&context) {
            unbind_in_reverse(component.as_mut(), descriptors, &bound, &done);
            return self.fail_activation(cell, st, err);
        }

        st.properties = properties;
        st.bound = bound;
        st.implementation = Some(component);
        st.last_error = None;
        self.set_state(cell, st, ComponentState::Active);
        if let Err(err) = self.register_owned_services(cell, st) {
            return self.fail_activation(cell, st, err);
        }
        info!(component = name, instance = %cell.id, "Component activated");
        Ok(())
    }

    /// Revert to UNSATISFIED and surface the error to the triggering caller
    fn fail_activation(&self, cell: &InstanceCell, st: &mut InstanceState, err: Error) -> Result<()> {
        let name = cell.entry.name();
        let error = if err.is_activation_failure() {
            err
        } else {
            let message = err.to_string();
            Error::activation_failed_with_source(name, message, err)
        };
        warn!(component = name, instance = %cell.id, error = %error, "Component activation failed");
        self.deactivate(cell, st);
        self.set_state(cell, st, ComponentState::Unsatisfied);
        st.last_error = Some(error.to_string());
        Err(error)
    }

    /// Unregister owned services, run deactivate and unbind, release leases
    pub(super) fn deactivate(&self, cell: &InstanceCell, st: &mut InstanceState) {
        let active = st.state == ComponentState::Active;
        if active {
            self.set_state(cell, st, ComponentState::Deactivating);
        }
        self.unregister_owned_services(cell, st);

        if let Some(mut component) = st.implementation.take() {
            let entry = &cell.entry;
            let context = ComponentContext::new(
                cell.id,
                entry.name(),
                &st.properties,
                &entry.reference_names,
                &st.bound,
            );
            component.deactivate(&context);
            let descriptors = &entry.component_type.descriptor().references;
            for (services, descriptor) in st.bound.iter().zip(descriptors).rev() {
                for service in services.iter().rev() {
                    component.unbind(&Binding {
                        reference: &descriptor.name,
                        method: descriptor.unbind.as_deref(),
                        record: &service.record,
                        service: service.lease.service(),
                    });
                }
            }
        }
        st.bound.clear();

        if active {
            self.set_state(cell, st, ComponentState::Unsatisfied);
            info!(component = cell.entry.name(), instance = %cell.id, "Component deactivated");
        }
    }

    /// Remove an instance from the table and tear it down for good
    pub(super) fn dispose_cell(&self, cell: &InstanceCell) -> Result<()> {
        self.instances.remove(&cell.id);
        let mut st = cell.state.lock();
        if st.state == ComponentState::Disposed {
            return Err(Error::already_disposed(cell.id.value()));
        }
        self.deactivate(cell, &mut st);
        self.set_state(cell, &mut st, ComponentState::Disposed);
        debug!(component = cell.entry.name(), instance = %cell.id, "Instance disposed");
        Ok(())
    }

    /// Create an instance outside the table, activate it, then publish it
    ///
    /// The fresh instance's lock may be taken while the caller holds another
    /// instance's lock: nobody else can reach it before it is published.
    pub(super) fn spawn_active(
        &self,
        entry: &Arc<ComponentEntry>,
        origin: InstanceOrigin,
    ) -> Result<(InstanceId, Option<ServiceObject>)> {
        let cell = Arc::new(InstanceCell::new(self.allocate_id(), Arc::clone(entry), origin));
        let object = {
            let mut st = cell.state.lock();
            self.reconcile_locked(&cell, &mut st)?;
            if st.state != ComponentState::Active {
                let reason = st
                    .last_error
                    .clone()
                    .unwrap_or_else(|| "dependencies are not met".to_string());
                return Err(Error::unsatisfied(entry.name(), reason));
            }
            st.implementation.as_ref().and_then(|c| c.service_object())
        };
        debug!(component = entry.name(), instance = %cell.id, origin = %cell.origin.label(), "Instance created");
        self.instances.insert(cell.id, Arc::clone(&cell));
        Ok((cell.id, object))
    }

    // Owned services

    fn register_owned_services(&self, cell: &InstanceCell, st: &mut InstanceState) -> Result<()> {
        let descriptor = cell.entry.component_type.descriptor();
        if descriptor.provides.is_empty() || cell.origin == InstanceOrigin::ServiceObject {
            return Ok(());
        }
        let properties = st.properties.public();

        if Self::serves_through_factory(cell) {
            for capability in &descriptor.provides {
                let factory = Arc::new(ComponentServiceFactory::new(
                    self.self_ref.clone(),
                    cell.entry.name(),
                ));
                let record = self.registry.register_factory(
                    capability,
                    properties.clone(),
                    descriptor.scope,
                    factory,
                )?;
                st.owned_services.push(record.id());
            }
        } else {
            let object = st
                .implementation
                .as_ref()
                .and_then(|component| component.service_object())
                .unwrap_or_else(|| Arc::new(()) as ServiceObject);
            for capability in &descriptor.provides {
                let record =
                    self.registry
                        .register_object(capability, properties.clone(), Arc::clone(&object))?;
                st.owned_services.push(record.id());
            }
        }
        debug!(component = cell.entry.name(), instance = %cell.id, services = ?st.owned_services, "Services registered");
        Ok(())
    }

    fn update_owned_services(&self, cell: &InstanceCell, st: &InstanceState) {
        let properties = st.properties.public();
        for id in &st.owned_services {
            if let Err(err) = self.registry.modify(*id, properties.clone()) {
                warn!(component = cell.entry.name(), service_id = %id, error = %err, "Failed to update service properties");
            }
        }
    }

    fn unregister_owned_services(&self, cell: &InstanceCell, st: &mut InstanceState) {
        for id in st.owned_services.drain(..) {
            if let Err(err) = self.registry.unregister(id) {
                debug!(component = cell.entry.name(), service_id = %id, error = %err, "Service already unregistered");
            }
        }
    }
}
