//! Value objects shared by every layer

mod component;
mod properties;
mod reference;
mod service;

pub use component::{
    ComponentDescriptor, ComponentState, ConfigurationPolicy, InstanceId,
};
pub use properties::{Properties, PropertyValue};
pub use reference::{Cardinality, PolicyOption, ReferenceDescriptor, ReferencePolicy};
pub use service::{
    Capability, ServiceId, ServiceObject, ServiceRecord, ServiceScope, downcast_service,
};
