//! Reference Matcher
//!
//! Computes the candidate set for one declared reference: registry lookup by
//! capability, target filter, scope compatibility, ranking order and
//! cardinality truncation.

use crate::registry::ServiceRegistry;
use scr_domain::constants::{CARDINALITY_MINIMUM_SUFFIX, TARGET_SUFFIX};
use scr_domain::error::Result;
use scr_domain::filter::Filter;
use scr_domain::value_objects::{Properties, ReferenceDescriptor, ServiceRecord, ServiceScope};

/// A reference with the administrative overrides of one instance applied
#[derive(Debug, Clone)]
pub struct EffectiveReference {
    descriptor: ReferenceDescriptor,
    target: Option<Filter>,
    minimum: usize,
}

impl EffectiveReference {
    /// Apply `<name>.target` and `<name>.cardinality.minimum` from the
    /// instance properties
    ///
    /// The minimum override only raises. Single references clamp it to one.
    ///
    /// # Errors
    ///
    /// [`scr_domain::Error::FilterSyntax`] when the effective target does
    /// not parse.
    pub fn new(descriptor: &ReferenceDescriptor, properties: &Properties) -> Result<Self> {
        let target_key = format!("{}{TARGET_SUFFIX}", descriptor.name);
        let target = match properties
            .get_str(&target_key)
            .or(descriptor.target.as_deref())
        {
            Some(source) => Some(Filter::parse(source)?),
            None => None,
        };

        let declared = descriptor.cardinality.minimum();
        let minimum_key = format!("{}{CARDINALITY_MINIMUM_SUFFIX}", descriptor.name);
        let minimum = match properties.get_integer(&minimum_key) {
            Some(raw) => {
                let requested = usize::try_from(raw).unwrap_or(0);
                let ceiling = if descriptor.cardinality.is_multiple() {
                    usize::MAX
                } else {
                    1
                };
                requested.min(ceiling).max(declared)
            }
            None => declared,
        };

        Ok(Self {
            descriptor: descriptor.clone(),
            target,
            minimum,
        })
    }

    /// The declared descriptor
    pub fn descriptor(&self) -> &ReferenceDescriptor {
        &self.descriptor
    }

    /// Effective target filter
    pub fn target(&self) -> Option<&Filter> {
        self.target.as_ref()
    }

    /// Effective minimum cardinality
    pub fn minimum(&self) -> usize {
        self.minimum
    }

    /// Whether a record is an acceptable candidate right now
    pub fn accepts(&self, record: &ServiceRecord) -> bool {
        if record.capability() != &self.descriptor.capability {
            return false;
        }
        if self.descriptor.scope == ServiceScope::Prototype
            && record.scope() != ServiceScope::Prototype
        {
            return false;
        }
        self.target
            .as_ref()
            .is_none_or(|filter| filter.matches(record.properties()))
    }
}

/// Outcome of resolving one reference
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// Every acceptable candidate, best first
    pub matching: Vec<ServiceRecord>,
    /// Candidates a fresh binding would take (truncated for single references)
    pub selected: Vec<ServiceRecord>,
    /// Effective minimum
    pub minimum: usize,
}

impl Resolution {
    /// Whether enough candidates exist to satisfy the minimum
    pub fn is_satisfied(&self) -> bool {
        self.matching.len() >= self.minimum
    }
}

/// Stateless resolver
pub struct ReferenceMatcher;

impl ReferenceMatcher {
    /// Filter and order an arbitrary candidate list
    pub fn select(reference: &EffectiveReference, candidates: &[ServiceRecord]) -> Resolution {
        let mut matching: Vec<ServiceRecord> = candidates
            .iter()
            .filter(|record| reference.accepts(record))
            .cloned()
            .collect();
        matching.sort_by(ServiceRecord::ranking_order);

        let selected = if reference.descriptor.cardinality.is_multiple() {
            matching.clone()
        } else {
            matching.iter().take(1).cloned().collect()
        };

        Resolution {
            matching,
            selected,
            minimum: reference.minimum,
        }
    }

    /// Resolve against the current registry contents
    pub fn resolve(reference: &EffectiveReference, registry: &ServiceRegistry) -> Resolution {
        let candidates = registry.lookup(&reference.descriptor.capability, None);
        Self::select(reference, &candidates)
    }
}
