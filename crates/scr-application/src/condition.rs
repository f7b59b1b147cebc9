//! Condition Gate
//!
//! Conditions are marker services of the reserved condition capability. A
//! component declaring condition targets is satisfied only while every
//! target matches at least one registered condition.

use crate::registry::ServiceRegistry;
use scr_domain::constants::{CONDITION_CAPABILITY, CONDITION_ID};
use scr_domain::error::Result;
use scr_domain::filter::Filter;
use scr_domain::value_objects::{Capability, Properties, ServiceRecord, ServiceScope};

/// Evaluates condition targets against the registry
#[derive(Clone)]
pub struct ConditionGate {
    registry: ServiceRegistry,
}

impl ConditionGate {
    /// Gate over a registry
    pub fn new(registry: ServiceRegistry) -> Self {
        Self { registry }
    }

    /// The reserved capability condition services are registered under
    pub fn capability() -> Capability {
        Capability::from(CONDITION_CAPABILITY)
    }

    /// Compile a condition target
    ///
    /// A bare identifier such as `onoff` means `(condition.id=onoff)`;
    /// anything starting with `(` is a filter.
    ///
    /// # Errors
    ///
    /// [`scr_domain::Error::FilterSyntax`] for a malformed filter.
    pub fn parse_target(target: &str) -> Result<Filter> {
        let trimmed = target.trim();
        if trimmed.starts_with('(') {
            Filter::parse(trimmed)
        } else {
            Ok(Filter::equals(CONDITION_ID, trimmed))
        }
    }

    /// Whether a matching condition is registered
    pub fn is_satisfied(&self, target: &Filter) -> bool {
        !self
            .registry
            .lookup(&Self::capability(), Some(target))
            .is_empty()
    }

    /// Logical AND over all targets; vacuously true
    pub fn all_satisfied(&self, targets: &[Filter]) -> bool {
        targets.iter().all(|target| self.is_satisfied(target))
    }

    /// Register a condition with the given id
    ///
    /// # Errors
    ///
    /// Propagates registry validation errors.
    pub fn register_condition(&self, id: &str) -> Result<ServiceRecord> {
        self.registry.register(
            Self::capability(),
            Properties::new().with(CONDITION_ID, id),
            ServiceScope::Singleton,
        )
    }
}
