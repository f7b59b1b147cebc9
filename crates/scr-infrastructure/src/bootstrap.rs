//! Runtime bootstrap
//!
//! Wires a [`ServiceComponentRuntime`] to the in-memory collaborators
//! according to an [`AppConfig`]:
//!
//! 1. one registry shared by the runtime and the event admin
//! 2. the configuration admin, seeded with `[configurations]`
//! 3. the runtime itself, publishing component events when configured
//! 4. the configured condition services
//! 5. the configured descriptor files, loaded as declarative components

use crate::config::AppConfig;
use crate::descriptors::{load_descriptor_file, validate_descriptors};
use crate::infrastructure::{EventAdmin, InMemoryConfigurationAdmin};
use scr_application::component::ComponentType;
use scr_application::{ServiceComponentRuntime, ServiceRegistry};
use scr_domain::error::{Error, Result};
use scr_domain::ports::ConfigurationProvider;
use scr_domain::value_objects::{ComponentDescriptor, ServiceRecord};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A runtime together with the collaborators it was built with
pub struct RuntimeContext {
    config: AppConfig,
    runtime: ServiceComponentRuntime,
    configuration: Arc<InMemoryConfigurationAdmin>,
    events: Arc<EventAdmin>,
    conditions: Vec<ServiceRecord>,
}

impl RuntimeContext {
    /// Build and start a runtime from configuration
    ///
    /// # Errors
    ///
    /// Fails when seeding, condition registration or loading a configured
    /// descriptor file fails.
    pub fn bootstrap(config: AppConfig) -> Result<Self> {
        let registry = ServiceRegistry::new();
        let events = EventAdmin::new_shared(registry.clone(), &config.event_admin);
        let configuration = InMemoryConfigurationAdmin::new_shared();
        configuration.seed(&config.configurations)?;

        let runtime = ServiceComponentRuntime::builder()
            .with_registry(registry)
            .with_configuration(Arc::clone(&configuration) as Arc<dyn ConfigurationProvider>)
            .with_events(events.clone())
            .publish_component_events(config.runtime.publish_component_events)
            .build();

        let conditions = config
            .runtime
            .conditions
            .iter()
            .map(|id| runtime.register_condition(id))
            .collect::<Result<Vec<_>>>()?;

        let context = Self {
            config,
            runtime,
            configuration,
            events,
            conditions,
        };
        for path in &context.config.runtime.descriptors {
            let descriptors = load_descriptor_file(path)?;
            context.load_declarative(descriptors)?;
        }
        info!(
            conditions = context.conditions.len(),
            components = context.runtime.lifecycle().component_names().len(),
            "Runtime bootstrapped"
        );
        Ok(context)
    }

    /// Load descriptors with no-op component implementations
    ///
    /// Every descriptor is validated before the first one is loaded.
    ///
    /// # Errors
    ///
    /// [`Error::Configuration`] listing every validation issue, or the
    /// first error `load` reports.
    pub fn load_declarative(&self, descriptors: Vec<ComponentDescriptor>) -> Result<usize> {
        let issues = validate_descriptors(&descriptors);
        if !issues.is_empty() {
            let report: Vec<String> = issues.iter().map(ToString::to_string).collect();
            return Err(Error::configuration(format!(
                "Invalid component descriptors: {}",
                report.join("; ")
            )));
        }
        let count = descriptors.len();
        for descriptor in descriptors {
            self.runtime.load(ComponentType::declarative(descriptor))?;
        }
        Ok(count)
    }

    /// Unload every component and withdraw the configured conditions
    pub fn shutdown(&self) {
        let lifecycle = self.runtime.lifecycle();
        for name in lifecycle.component_names().into_iter().rev() {
            if let Err(err) = lifecycle.unload(&name) {
                warn!(component = %name, error = %err, "Failed to unload component");
            }
        }
        for condition in &self.conditions {
            if let Err(err) = self.runtime.registry().unregister(condition.id()) {
                debug!(service_id = %condition.id(), error = %err, "Condition already withdrawn");
            }
        }
        info!("Runtime shut down");
    }

    /// The runtime
    pub fn runtime(&self) -> &ServiceComponentRuntime {
        &self.runtime
    }

    /// The configuration admin
    pub fn configuration(&self) -> &Arc<InMemoryConfigurationAdmin> {
        &self.configuration
    }

    /// The event admin
    pub fn events(&self) -> &Arc<EventAdmin> {
        &self.events
    }

    /// The configuration the runtime was built from
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}
