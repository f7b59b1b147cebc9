//! # Service Component Runtime
//!
//! Declarative components whose dependencies on other services are
//! resolved, bound and re-bound automatically as services come and go in a
//! shared registry.
//!
//! ## Example
//!
//! ```
//! use scr::application::ServiceComponentRuntime;
//! use scr::application::component::ComponentType;
//! use scr::domain::value_objects::{
//!     ComponentDescriptor, ComponentState, Properties, ReferenceDescriptor, ServiceScope,
//! };
//!
//! let runtime = ServiceComponentRuntime::new();
//! runtime
//!     .load(ComponentType::declarative(
//!         ComponentDescriptor::new("consumer")
//!             .reference(ReferenceDescriptor::new("inverter", "org.fipro.inverter.StringInverter")),
//!     ))
//!     .unwrap();
//! let id = runtime.lifecycle().instances("consumer")[0];
//! assert_eq!(runtime.lifecycle().state(id), Some(ComponentState::Unsatisfied));
//!
//! runtime
//!     .registry()
//!     .register("org.fipro.inverter.StringInverter", Properties::new(), ServiceScope::Singleton)
//!     .unwrap();
//! assert_eq!(runtime.lifecycle().state(id), Some(ComponentState::Active));
//! ```
//!
//! ## Architecture
//!
//! - `domain` - properties, service records, descriptors, filters, ports
//! - `application` - registry, matching, binding, lifecycle, factories, conditions
//! - `infrastructure` - configuration, logging, configuration admin, event admin
//! - `cli` - descriptor validation and dry runs behind the `scr` binary

/// Domain layer - records, descriptors, filters and ports
///
/// Re-exports from the domain crate for convenience
pub mod domain {
    pub use scr_domain::*;
}

/// Application layer - the component runtime engine
///
/// Re-exports from the application crate for convenience
pub mod application {
    pub use scr_application::*;
}

/// Infrastructure layer - configuration, logging and collaborators
///
/// Re-exports from the infrastructure crate for convenience
pub mod infrastructure {
    pub use scr_infrastructure::*;
}

pub mod cli;

// Re-export commonly used types at the crate root
pub use scr_application::{
    Component, ComponentContext, ComponentType, ServiceComponentRuntime, ServiceRegistry,
};
pub use scr_domain::{Error, Filter, Result};
pub use scr_infrastructure::RuntimeContext;
