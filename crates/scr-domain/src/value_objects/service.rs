//! Service records
//!
//! A [`ServiceRecord`] is the immutable snapshot the registry hands out for
//! one registration. Modifying a service produces a new snapshot with the
//! same id and a higher revision.

use super::properties::Properties;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// The object behind a registered service
pub type ServiceObject = Arc<dyn Any + Send + Sync>;

/// Downcast a service object to a concrete type
///
/// # Example
///
/// ```
/// use scr_domain::value_objects::{downcast_service, ServiceObject};
/// use std::sync::Arc;
///
/// let object: ServiceObject = Arc::new(String::from("offline data"));
/// let text = downcast_service::<String>(&object).expect("a string");
/// assert_eq!(text.as_str(), "offline data");
/// ```
pub fn downcast_service<T: Any + Send + Sync>(object: &ServiceObject) -> Option<Arc<T>> {
    Arc::clone(object).downcast::<T>().ok()
}

/// Unique, monotonic service identifier; never reused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceId(u64);

impl ServiceId {
    /// Wrap a raw identifier
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw identifier
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The abstract contract a service implements; the registry's lookup key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Capability(String);

impl Capability {
    /// Create a capability name
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self(name.into())
    }

    /// Borrow the name
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Capability {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Capability {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&Capability> for Capability {
    fn from(value: &Capability) -> Self {
        value.clone()
    }
}

/// Scope of a service (and of a reference's request)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceScope {
    /// One object shared by every consumer
    #[default]
    Singleton,
    /// One object per consuming component type
    Bundle,
    /// One object per acquisition
    Prototype,
}

impl ServiceScope {
    /// Lowercase name as stored in `service.scope`
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Singleton => "singleton",
            Self::Bundle => "bundle",
            Self::Prototype => "prototype",
        }
    }
}

impl fmt::Display for ServiceScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceScope {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "singleton" => Ok(Self::Singleton),
            "bundle" => Ok(Self::Bundle),
            "prototype" => Ok(Self::Prototype),
            other => Err(Error::invalid_properties(format!(
                "unknown service scope '{other}'"
            ))),
        }
    }
}

/// Immutable snapshot of one service registration
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceRecord {
    id: ServiceId,
    capability: Capability,
    properties: Arc<Properties>,
    ranking: i64,
    scope: ServiceScope,
    revision: u64,
}

impl ServiceRecord {
    /// Assemble a record; only the registry should mint these
    pub fn new(
        id: ServiceId,
        capability: Capability,
        properties: Properties,
        ranking: i64,
        scope: ServiceScope,
        revision: u64,
    ) -> Self {
        Self {
            id,
            capability,
            properties: Arc::new(properties),
            ranking,
            scope,
            revision,
        }
    }

    /// Service identifier
    pub fn id(&self) -> ServiceId {
        self.id
    }

    /// Capability the service was registered under
    pub fn capability(&self) -> &Capability {
        &self.capability
    }

    /// Property snapshot
    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    /// Ranking (default 0)
    pub fn ranking(&self) -> i64 {
        self.ranking
    }

    /// Service scope
    pub fn scope(&self) -> ServiceScope {
        self.scope
    }

    /// Modification counter, bumped by every `modify`
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Candidate order: descending ranking, then ascending id (oldest wins)
    ///
    /// Every consumer that needs "best" or "all matching" services sorts
    /// with this comparator.
    pub fn ranking_order(a: &ServiceRecord, b: &ServiceRecord) -> Ordering {
        b.ranking.cmp(&a.ranking).then_with(|| a.id.cmp(&b.id))
    }
}
