//! Configuration collaborator port
//!
//! Property dictionaries persisted by PID. The lifecycle manager reads the
//! dictionary for a component's PID at activation and treats every update
//! as a property change of the affected instances.

use crate::error::Result;
use crate::filter::Filter;
use crate::value_objects::Properties;
use std::sync::Arc;

/// A configuration change notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationEvent {
    /// A configuration was created or replaced
    Updated {
        /// PID of the configuration
        pid: String,
        /// Factory PID when this is a factory configuration
        factory_pid: Option<String>,
    },
    /// A configuration was deleted
    Deleted {
        /// PID of the configuration
        pid: String,
        /// Factory PID when this was a factory configuration
        factory_pid: Option<String>,
    },
}

impl ConfigurationEvent {
    /// PID of the affected configuration
    pub fn pid(&self) -> &str {
        match self {
            Self::Updated { pid, .. } | Self::Deleted { pid, .. } => pid,
        }
    }

    /// Factory PID of the affected configuration
    pub fn factory_pid(&self) -> Option<&str> {
        match self {
            Self::Updated { factory_pid, .. } | Self::Deleted { factory_pid, .. } => {
                factory_pid.as_deref()
            }
        }
    }
}

/// Receives configuration change notifications
pub trait ConfigurationListener: Send + Sync {
    /// Called after the change is committed, outside any store lock
    fn configuration_changed(&self, event: &ConfigurationEvent);
}

/// Configuration storage keyed by PID
pub trait ConfigurationProvider: Send + Sync {
    /// Current dictionary for a PID, if one exists
    fn get_configuration(&self, pid: &str) -> Result<Option<Properties>>;

    /// Create or replace the dictionary for a PID
    fn update(&self, pid: &str, properties: Properties) -> Result<()>;

    /// Remove the dictionary for a PID
    fn delete(&self, pid: &str) -> Result<()>;

    /// Every stored dictionary matching the filter (all when `None`)
    fn list_configurations(&self, filter: Option<&Filter>) -> Result<Vec<Properties>>;

    /// Subscribe to changes
    fn add_listener(&self, listener: Arc<dyn ConfigurationListener>);
}
