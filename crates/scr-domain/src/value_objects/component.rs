//! Component descriptors, instance identifiers and lifecycle states

use super::properties::Properties;
use super::reference::ReferenceDescriptor;
use super::service::{Capability, ServiceScope};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a component instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(u64);

impl InstanceId {
    /// Wrap a raw identifier
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw identifier
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a component instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComponentState {
    /// Mandatory references, conditions or configuration are missing
    #[default]
    Unsatisfied,
    /// Dependencies met; activation in progress
    Satisfied,
    /// Activated and bound
    Active,
    /// Deactivation in progress
    Deactivating,
    /// Torn down for good
    Disposed,
}

impl ComponentState {
    /// Uppercase name, also used as the event topic segment
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unsatisfied => "UNSATISFIED",
            Self::Satisfied => "SATISFIED",
            Self::Active => "ACTIVE",
            Self::Deactivating => "DEACTIVATING",
            Self::Disposed => "DISPOSED",
        }
    }
}

impl fmt::Display for ComponentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether and how a component consumes configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigurationPolicy {
    /// Merge configuration when present
    #[default]
    Optional,
    /// Stay unsatisfied until a configuration exists
    Require,
    /// Never consult the configuration collaborator
    Ignore,
}

/// Static declaration of a component type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentDescriptor {
    /// Component name, unique within a runtime
    pub name: String,
    /// Whether the component starts enabled
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Capabilities the component registers while active
    #[serde(default)]
    pub provides: Vec<Capability>,
    /// Scope of the provided service
    #[serde(default)]
    pub scope: ServiceScope,
    /// Static properties
    #[serde(default)]
    pub properties: Properties,
    /// Declared references in declaration order
    #[serde(default, rename = "reference")]
    pub references: Vec<ReferenceDescriptor>,
    /// Condition targets; all must be present (bare ids or filters)
    #[serde(default)]
    pub conditions: Vec<String>,
    /// Configuration PID; defaults to the component name
    #[serde(default)]
    pub configuration_pid: Option<String>,
    /// Configuration policy
    #[serde(default)]
    pub configuration_policy: ConfigurationPolicy,
    /// Factory identifier; makes this a factory component
    #[serde(default)]
    pub factory: Option<String>,
    /// Properties published on the component factory service
    #[serde(default)]
    pub factory_properties: Properties,
    /// Whether the component declares a `modified` callback
    #[serde(default)]
    pub modified: bool,
}

fn default_enabled() -> bool {
    true
}

impl ComponentDescriptor {
    /// Enabled component with no references, services or configuration
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            provides: Vec::new(),
            scope: ServiceScope::default(),
            properties: Properties::new(),
            references: Vec::new(),
            conditions: Vec::new(),
            configuration_pid: None,
            configuration_policy: ConfigurationPolicy::default(),
            factory: None,
            factory_properties: Properties::new(),
            modified: false,
        }
    }

    /// Declare a provided capability
    pub fn provides<C: Into<Capability>>(mut self, capability: C) -> Self {
        self.provides.push(capability.into());
        self
    }

    /// Set the provided service's scope
    pub fn scope(mut self, scope: ServiceScope) -> Self {
        self.scope = scope;
        self
    }

    /// Add a static property
    pub fn property<K: Into<String>, V: Into<super::PropertyValue>>(
        mut self,
        key: K,
        value: V,
    ) -> Self {
        self.properties.insert(key, value);
        self
    }

    /// Declare a reference
    pub fn reference(mut self, reference: ReferenceDescriptor) -> Self {
        self.references.push(reference);
        self
    }

    /// Declare a condition target
    pub fn condition<S: Into<String>>(mut self, target: S) -> Self {
        self.conditions.push(target.into());
        self
    }

    /// Set the configuration PID
    pub fn configuration_pid<S: Into<String>>(mut self, pid: S) -> Self {
        self.configuration_pid = Some(pid.into());
        self
    }

    /// Set the configuration policy
    pub fn configuration_policy(mut self, policy: ConfigurationPolicy) -> Self {
        self.configuration_policy = policy;
        self
    }

    /// Make this a factory component
    pub fn factory<S: Into<String>>(mut self, factory_id: S) -> Self {
        self.factory = Some(factory_id.into());
        self
    }

    /// Add a property published on the component factory service
    pub fn factory_property<K: Into<String>, V: Into<super::PropertyValue>>(
        mut self,
        key: K,
        value: V,
    ) -> Self {
        self.factory_properties.insert(key, value);
        self
    }

    /// Declare the `modified` callback
    pub fn with_modified(mut self) -> Self {
        self.modified = true;
        self
    }

    /// Start disabled
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Effective configuration PID
    pub fn pid(&self) -> &str {
        self.configuration_pid.as_deref().unwrap_or(&self.name)
    }

    /// Whether this is a factory component
    pub fn is_factory(&self) -> bool {
        self.factory.is_some()
    }

    /// Look up a reference by name
    pub fn find_reference(&self, name: &str) -> Option<&ReferenceDescriptor> {
        self.references.iter().find(|r| r.name == name)
    }
}
