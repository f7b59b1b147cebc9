//! Reference descriptors
//!
//! One [`ReferenceDescriptor`] per declared dependency of a component type.
//! Descriptors are immutable once the component type is loaded.

use super::service::{Capability, ServiceScope};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How many services a reference may or must bind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Cardinality {
    /// Zero or one
    #[serde(rename = "0..1", alias = "optional")]
    OptionalSingle,
    /// Exactly one
    #[default]
    #[serde(rename = "1..1", alias = "mandatory")]
    MandatorySingle,
    /// Zero or more
    #[serde(rename = "0..n", alias = "multiple")]
    OptionalMultiple,
    /// One or more
    #[serde(rename = "1..n", alias = "at_least_one")]
    MandatoryMultiple,
}

impl Cardinality {
    /// Declared minimum number of bound services
    pub fn minimum(self) -> usize {
        match self {
            Self::OptionalSingle | Self::OptionalMultiple => 0,
            Self::MandatorySingle | Self::MandatoryMultiple => 1,
        }
    }

    /// Whether more than one service may be bound
    pub fn is_multiple(self) -> bool {
        matches!(self, Self::OptionalMultiple | Self::MandatoryMultiple)
    }

    /// Whether at least one service is required
    pub fn is_mandatory(self) -> bool {
        self.minimum() > 0
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::OptionalSingle => "0..1",
            Self::MandatorySingle => "1..1",
            Self::OptionalMultiple => "0..n",
            Self::MandatoryMultiple => "1..n",
        })
    }
}

/// Binding policy: whether the bound set may change while active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferencePolicy {
    /// Bind once at activation; changes force reactivation
    #[default]
    Static,
    /// Rebind in place while active
    Dynamic,
}

/// Policy option: minimize churn or always prefer the best match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyOption {
    /// Keep bound services while they stay valid
    #[default]
    Reluctant,
    /// Always move to the highest-ranked matching set
    Greedy,
}

/// A declared dependency of a component type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceDescriptor {
    /// Reference name, unique within its component
    pub name: String,
    /// Capability the reference binds to
    #[serde(alias = "interface")]
    pub capability: Capability,
    /// Cardinality
    #[serde(default)]
    pub cardinality: Cardinality,
    /// Binding policy
    #[serde(default)]
    pub policy: ReferencePolicy,
    /// Policy option
    #[serde(default)]
    pub policy_option: PolicyOption,
    /// Target filter narrowing the candidate set
    #[serde(default)]
    pub target: Option<String>,
    /// Requested scope; `prototype` only matches prototype-scoped services
    #[serde(default = "default_reference_scope")]
    pub scope: ServiceScope,
    /// Bind callback slot
    #[serde(default)]
    pub bind: Option<String>,
    /// Updated callback slot
    #[serde(default)]
    pub updated: Option<String>,
    /// Unbind callback slot
    #[serde(default)]
    pub unbind: Option<String>,
}

fn default_reference_scope() -> ServiceScope {
    ServiceScope::Bundle
}

impl ReferenceDescriptor {
    /// Mandatory, static, reluctant single reference with no callbacks
    pub fn new<N: Into<String>, C: Into<Capability>>(name: N, capability: C) -> Self {
        Self {
            name: name.into(),
            capability: capability.into(),
            cardinality: Cardinality::default(),
            policy: ReferencePolicy::default(),
            policy_option: PolicyOption::default(),
            target: None,
            scope: default_reference_scope(),
            bind: None,
            updated: None,
            unbind: None,
        }
    }

    /// Set the cardinality
    pub fn cardinality(mut self, cardinality: Cardinality) -> Self {
        self.cardinality = cardinality;
        self
    }

    /// Use the dynamic policy
    pub fn dynamic(mut self) -> Self {
        self.policy = ReferencePolicy::Dynamic;
        self
    }

    /// Use the greedy policy option
    pub fn greedy(mut self) -> Self {
        self.policy_option = PolicyOption::Greedy;
        self
    }

    /// Set the target filter
    pub fn target<S: Into<String>>(mut self, filter: S) -> Self {
        self.target = Some(filter.into());
        self
    }

    /// Set the requested scope
    pub fn scope(mut self, scope: ServiceScope) -> Self {
        self.scope = scope;
        self
    }

    /// Name the bind callback
    pub fn bind<S: Into<String>>(mut self, method: S) -> Self {
        self.bind = Some(method.into());
        self
    }

    /// Name the updated callback
    pub fn updated<S: Into<String>>(mut self, method: S) -> Self {
        self.updated = Some(method.into());
        self
    }

    /// Name the unbind callback
    pub fn unbind<S: Into<String>>(mut self, method: S) -> Self {
        self.unbind = Some(method.into());
        self
    }

    /// Whether the reference uses the dynamic policy
    pub fn is_dynamic(&self) -> bool {
        self.policy == ReferencePolicy::Dynamic
    }

    /// Whether the reference uses the greedy policy option
    pub fn is_greedy(&self) -> bool {
        self.policy_option == PolicyOption::Greedy
    }
}
