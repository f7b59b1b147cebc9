//! In-memory configuration admin
//!
//! Stores configuration dictionaries by PID. Every stored dictionary carries
//! `service.pid`, and factory configurations also carry `service.factoryPid`.
//! Listeners run synchronously once the store lock has been released, so a
//! listener may read the store back.

use crate::constants::FACTORY_PID_SEPARATOR;
use parking_lot::RwLock;
use scr_domain::constants::{SERVICE_FACTORY_PID, SERVICE_PID};
use scr_domain::error::{Error, Result};
use scr_domain::filter::Filter;
use scr_domain::ports::{ConfigurationEvent, ConfigurationListener, ConfigurationProvider};
use scr_domain::value_objects::Properties;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

/// Configuration store backed by a map
#[derive(Default)]
pub struct InMemoryConfigurationAdmin {
    store: RwLock<BTreeMap<String, Properties>>,
    listeners: RwLock<Vec<Arc<dyn ConfigurationListener>>>,
    next_factory_instance: AtomicU64,
}

impl InMemoryConfigurationAdmin {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create as Arc for sharing
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Store every dictionary of a seed map
    ///
    /// Entries carrying `service.factoryPid` become factory configurations.
    ///
    /// # Errors
    ///
    /// Fails on the first entry [`ConfigurationProvider::update`] rejects.
    pub fn seed(&self, configurations: &BTreeMap<String, Properties>) -> Result<()> {
        for (pid, properties) in configurations {
            self.update(pid, properties.clone())?;
        }
        info!(count = configurations.len(), "Configuration admin seeded");
        Ok(())
    }

    /// Create a factory configuration with a generated `<factoryPid>~<n>` PID
    ///
    /// # Errors
    ///
    /// [`Error::Configuration`] when the factory PID is empty.
    pub fn create_factory_configuration(
        &self,
        factory_pid: &str,
        properties: Properties,
    ) -> Result<String> {
        if factory_pid.is_empty() {
            return Err(Error::configuration("Factory PID cannot be empty"));
        }
        let pid = loop {
            let n = self.next_factory_instance.fetch_add(1, Ordering::SeqCst) + 1;
            let candidate = format!("{factory_pid}{FACTORY_PID_SEPARATOR}{n}");
            if !self.store.read().contains_key(&candidate) {
                break candidate;
            }
        };
        self.update(&pid, properties.with(SERVICE_FACTORY_PID, factory_pid))?;
        Ok(pid)
    }

    /// Number of stored configurations
    pub fn len(&self) -> usize {
        self.store.read().len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.store.read().is_empty()
    }

    fn notify(&self, event: &ConfigurationEvent) {
        let listeners = self.listeners.read().clone();
        for listener in listeners {
            listener.configuration_changed(event);
        }
    }
}

impl ConfigurationProvider for InMemoryConfigurationAdmin {
    fn get_configuration(&self, pid: &str) -> Result<Option<Properties>> {
        Ok(self.store.read().get(pid).cloned())
    }

    fn update(&self, pid: &str, properties: Properties) -> Result<()> {
        if pid.is_empty() {
            return Err(Error::configuration("Configuration PID cannot be empty"));
        }
        let mut properties = properties;
        properties.insert(SERVICE_PID, pid);

        let factory_pid = {
            let mut store = self.store.write();
            // a factory configuration stays one across updates
            if !properties.contains_key(SERVICE_FACTORY_PID)
                && let Some(previous) = store
                    .get(pid)
                    .and_then(|p| p.get_str(SERVICE_FACTORY_PID))
                    .map(str::to_string)
            {
                properties.insert(SERVICE_FACTORY_PID, previous);
            }
            let factory_pid = properties.get_str(SERVICE_FACTORY_PID).map(str::to_string);
            store.insert(pid.to_string(), properties);
            factory_pid
        };

        debug!(pid, factory_pid = ?factory_pid, "Configuration updated");
        self.notify(&ConfigurationEvent::Updated {
            pid: pid.to_string(),
            factory_pid,
        });
        Ok(())
    }

    fn delete(&self, pid: &str) -> Result<()> {
        let removed = self.store.write().remove(pid);
        let Some(properties) = removed else {
            return Err(Error::not_found(format!("configuration '{pid}'")));
        };
        debug!(pid, "Configuration deleted");
        self.notify(&ConfigurationEvent::Deleted {
            pid: pid.to_string(),
            factory_pid: properties.get_str(SERVICE_FACTORY_PID).map(str::to_string),
        });
        Ok(())
    }

    fn list_configurations(&self, filter: Option<&Filter>) -> Result<Vec<Properties>> {
        Ok(self
            .store
            .read()
            .values()
            .filter(|properties| filter.is_none_or(|f| f.matches(properties)))
            .cloned()
            .collect())
    }

    fn add_listener(&self, listener: Arc<dyn ConfigurationListener>) {
        self.listeners.write().push(listener);
    }
}
