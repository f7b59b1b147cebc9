//! Component implementations and their callback slots
//!
//! A [`ComponentType`] pairs a descriptor with a constructor. The lifecycle
//! manager calls the constructor once per activation and drives the
//! resulting [`Component`] through its callbacks. Every slot defaults to a
//! no-op, so purely declarative components need no code at all.

use crate::registry::ServiceLease;
use scr_domain::error::Result;
use scr_domain::value_objects::{
    ComponentDescriptor, InstanceId, Properties, ServiceObject, ServiceRecord, downcast_service,
};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// One bound service passed to bind, updated and unbind callbacks
#[derive(Clone, Copy)]
pub struct Binding<'a> {
    /// Reference name
    pub reference: &'a str,
    /// Callback name declared for this event, if any
    pub method: Option<&'a str>,
    /// Record snapshot
    pub record: &'a ServiceRecord,
    /// The service object
    pub service: &'a ServiceObject,
}

impl Binding<'_> {
    /// Downcast the bound object
    pub fn service_as<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        downcast_service::<T>(self.service)
    }
}

impl fmt::Debug for Binding<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("reference", &self.reference)
            .field("method", &self.method)
            .field("service_id", &self.record.id())
            .finish()
    }
}

/// User code behind a component
///
/// Callbacks run under the instance's transition lock. They may block and
/// may use the registry or the runtime, but must not wait on another thread
/// that drives the same instance.
pub trait Component: Send {
    /// Called once all references are bound
    fn activate(&mut self, _context: &ComponentContext) -> Result<()> {
        Ok(())
    }

    /// Called before references are released
    fn deactivate(&mut self, _context: &ComponentContext) {}

    /// Called in place when properties change and the descriptor declares it
    fn modified(&mut self, _context: &ComponentContext) -> Result<()> {
        Ok(())
    }

    /// A service was bound to a reference
    fn bind(&mut self, _binding: &Binding<'_>) -> Result<()> {
        Ok(())
    }

    /// Properties of a bound service changed
    fn updated(&mut self, _binding: &Binding<'_>) {}

    /// A service is about to be released
    fn unbind(&mut self, _binding: &Binding<'_>) {}

    /// Object registered for the capabilities the component provides
    fn service_object(&self) -> Option<ServiceObject> {
        None
    }
}

struct Declarative;

impl Component for Declarative {}

/// Constructor invoked with the activation properties
pub type Constructor = Arc<dyn Fn(&Properties) -> Result<Box<dyn Component>> + Send + Sync>;

/// A loadable component type
#[derive(Clone)]
pub struct ComponentType {
    descriptor: Arc<ComponentDescriptor>,
    constructor: Constructor,
}

impl ComponentType {
    /// Pair a descriptor with a constructor
    pub fn new<F>(descriptor: ComponentDescriptor, constructor: F) -> Self
    where
        F: Fn(&Properties) -> Result<Box<dyn Component>> + Send + Sync + 'static,
    {
        Self {
            descriptor: Arc::new(descriptor),
            constructor: Arc::new(constructor),
        }
    }

    /// Component built through `Default` for every activation
    pub fn from_default<T>(descriptor: ComponentDescriptor) -> Self
    where
        T: Component + Default + 'static,
    {
        Self::new(descriptor, |_| Ok(Box::new(T::default())))
    }

    /// Descriptor-only component with no-op callbacks
    pub fn declarative(descriptor: ComponentDescriptor) -> Self {
        Self::new(descriptor, |_| Ok(Box::new(Declarative)))
    }

    /// The descriptor
    pub fn descriptor(&self) -> &ComponentDescriptor {
        &self.descriptor
    }

    /// Component name
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub(crate) fn instantiate(&self, properties: &Properties) -> Result<Box<dyn Component>> {
        (self.constructor)(properties)
    }
}

impl fmt::Debug for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentType")
            .field("name", &self.descriptor.name)
            .finish()
    }
}

/// A service held by an instance for one of its references
pub(crate) struct BoundService {
    pub(crate) record: ServiceRecord,
    pub(crate) lease: ServiceLease,
}

/// What a component sees during activate, modified and deactivate
pub struct ComponentContext {
    instance: InstanceId,
    name: String,
    properties: Properties,
    references: Vec<(String, Vec<(ServiceRecord, ServiceObject)>)>,
}

impl ComponentContext {
    pub(crate) fn new(
        instance: InstanceId,
        name: &str,
        properties: &Properties,
        reference_names: &[String],
        bound: &[Vec<BoundService>],
    ) -> Self {
        let references = reference_names
            .iter()
            .zip(bound.iter())
            .map(|(name, services)| {
                let services = services
                    .iter()
                    .map(|s| (s.record.clone(), Arc::clone(s.lease.service())))
                    .collect();
                (name.clone(), services)
            })
            .collect();
        Self {
            instance,
            name: name.to_string(),
            properties: properties.clone(),
            references,
        }
    }

    /// The instance being driven
    pub fn instance_id(&self) -> InstanceId {
        self.instance
    }

    /// Component name
    pub fn component_name(&self) -> &str {
        &self.name
    }

    /// Activation properties
    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    fn bound(&self, reference: &str) -> &[(ServiceRecord, ServiceObject)] {
        self.references
            .iter()
            .find(|(name, _)| name == reference)
            .map_or(&[], |(_, services)| services.as_slice())
    }

    /// First bound object of a reference
    pub fn service(&self, reference: &str) -> Option<&ServiceObject> {
        self.bound(reference).first().map(|(_, object)| object)
    }

    /// Every bound object of a reference, in rank order
    pub fn services(&self, reference: &str) -> Vec<&ServiceObject> {
        self.bound(reference).iter().map(|(_, object)| object).collect()
    }

    /// Records bound to a reference, in rank order
    pub fn records(&self, reference: &str) -> Vec<&ServiceRecord> {
        self.bound(reference).iter().map(|(record, _)| record).collect()
    }

    /// First bound object of a reference, downcast
    pub fn service_as<T: Any + Send + Sync>(&self, reference: &str) -> Option<Arc<T>> {
        self.service(reference).and_then(downcast_service::<T>)
    }
}

impl fmt::Debug for ComponentContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentContext")
            .field("instance", &self.instance)
            .field("name", &self.name)
            .field("properties", &self.properties)
            .finish()
    }
}
