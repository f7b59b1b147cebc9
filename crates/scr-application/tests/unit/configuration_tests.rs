//! Configuration-driven properties, policies and factory configurations

use crate::support::{Journal, MemoryConfiguration, tracking};
use scr_application::ServiceComponentRuntime;
use scr_domain::ports::ConfigurationProvider;
use scr_domain::value_objects::{
    Capability, ComponentDescriptor, ComponentState, ConfigurationPolicy, InstanceId, Properties,
    ReferenceDescriptor, ServiceScope,
};
use std::sync::Arc;

fn runtime_with(store: &Arc<MemoryConfiguration>) -> ServiceComponentRuntime {
    ServiceComponentRuntime::builder()
        .with_configuration(store.clone())
        .build()
}

fn language(runtime: &ServiceComponentRuntime, instance: InstanceId) -> Option<String> {
    runtime
        .lifecycle()
        .properties(instance)
        .and_then(|p| p.get_str("fipro.language").map(str::to_string))
}

#[test]
fn test_required_configuration_gates_activation() {
    let store = Arc::new(MemoryConfiguration::default());
    let runtime = runtime_with(&store);
    let journal = Journal::default();
    let descriptor = ComponentDescriptor::new("translator")
        .configuration_policy(ConfigurationPolicy::Require);
    runtime.load(tracking(descriptor, &journal)).unwrap();

    let id = runtime.lifecycle().instances("translator")[0];
    assert_eq!(runtime.lifecycle().state(id), Some(ComponentState::Unsatisfied));
    assert!(
        runtime
            .lifecycle()
            .last_error(id)
            .is_some_and(|e| e.contains("configuration 'translator' is required"))
    );

    store
        .update("translator", Properties::new().with("fipro.language", "de"))
        .unwrap();
    assert_eq!(runtime.lifecycle().state(id), Some(ComponentState::Active));
    assert_eq!(language(&runtime, id), Some("de".to_string()));

    store.delete("translator").unwrap();
    assert_eq!(runtime.lifecycle().state(id), Some(ComponentState::Unsatisfied));
}

#[test]
fn test_configuration_update_calls_modified_when_declared() {
    let store = Arc::new(MemoryConfiguration::default());
    store
        .update("translator", Properties::new().with("fipro.language", "de"))
        .unwrap();
    let runtime = runtime_with(&store);
    let journal = Journal::default();
    let descriptor = ComponentDescriptor::new("translator")
        .provides("org.fipro.Translator")
        .with_modified();
    runtime.load(tracking(descriptor, &journal)).unwrap();
    let id = runtime.lifecycle().instances("translator")[0];
    journal.take();

    store
        .update("translator", Properties::new().with("fipro.language", "en"))
        .unwrap();
    assert_eq!(journal.take(), vec!["modified".to_string()]);
    assert_eq!(language(&runtime, id), Some("en".to_string()));

    let published = runtime
        .registry()
        .lookup(&Capability::from("org.fipro.Translator"), None);
    assert_eq!(published[0].properties().get_str("fipro.language"), Some("en"));
    assert_eq!(published[0].revision(), 1);
}

#[test]
fn test_configuration_update_reactivates_without_modified() {
    let store = Arc::new(MemoryConfiguration::default());
    let runtime = runtime_with(&store);
    let journal = Journal::default();
    runtime
        .load(tracking(ComponentDescriptor::new("translator"), &journal))
        .unwrap();
    let id = runtime.lifecycle().instances("translator")[0];
    assert_eq!(language(&runtime, id), None);
    journal.take();

    store
        .update("translator", Properties::new().with("fipro.language", "fr"))
        .unwrap();
    assert_eq!(journal.take(), vec!["deactivate".to_string(), "activate".to_string()]);
    assert_eq!(language(&runtime, id), Some("fr".to_string()));
}

#[test]
fn test_ignore_policy_never_reads_configuration() {
    let store = Arc::new(MemoryConfiguration::default());
    store
        .update("translator", Properties::new().with("fipro.language", "de"))
        .unwrap();
    let runtime = runtime_with(&store);
    let journal = Journal::default();
    runtime
        .load(tracking(
            ComponentDescriptor::new("translator").configuration_policy(ConfigurationPolicy::Ignore),
            &journal,
        ))
        .unwrap();
    let id = runtime.lifecycle().instances("translator")[0];
    assert_eq!(language(&runtime, id), None);
    journal.take();

    store
        .update("translator", Properties::new().with("fipro.language", "en"))
        .unwrap();
    assert!(journal.take().is_empty());
}

#[test]
fn test_configured_target_rebinds_reference() {
    let store = Arc::new(MemoryConfiguration::default());
    let runtime = runtime_with(&store);
    let journal = Journal::default();
    let registry = runtime.registry();
    let de = registry
        .register("data", Properties::new().with("fipro.language", "de"), ServiceScope::Singleton)
        .unwrap();
    let en = registry
        .register("data", Properties::new().with("fipro.language", "en"), ServiceScope::Singleton)
        .unwrap();

    runtime
        .load(tracking(
            ComponentDescriptor::new("consumer")
                .with_modified()
                .reference(ReferenceDescriptor::new("data", "data").dynamic()),
            &journal,
        ))
        .unwrap();
    let id = runtime.lifecycle().instances("consumer")[0];
    assert_eq!(runtime.lifecycle().bound_services(id, "data"), vec![de.id()]);
    journal.take();

    store
        .update("consumer", Properties::new().with("data.target", "(fipro.language=en)"))
        .unwrap();
    assert_eq!(runtime.lifecycle().bound_services(id, "data"), vec![en.id()]);
    assert_eq!(
        journal.take(),
        vec![
            "modified".to_string(),
            format!("unbind data {}", de.id()),
            format!("bind data {}", en.id()),
        ]
    );
}

#[test]
fn test_factory_configurations_create_one_instance_each() {
    let store = Arc::new(MemoryConfiguration::default());
    let runtime = runtime_with(&store);
    let journal = Journal::default();
    runtime
        .load(tracking(
            ComponentDescriptor::new("worker")
                .configuration_pid("org.fipro.worker")
                .configuration_policy(ConfigurationPolicy::Require),
            &journal,
        ))
        .unwrap();
    let primary = runtime.lifecycle().instances("worker");
    assert_eq!(primary.len(), 1);
    assert_eq!(runtime.lifecycle().state(primary[0]), Some(ComponentState::Unsatisfied));

    store.update_factory(
        "org.fipro.worker",
        "org.fipro.worker~1",
        Properties::new().with("queue", "fast"),
    );
    store.update_factory(
        "org.fipro.worker",
        "org.fipro.worker~2",
        Properties::new().with("queue", "slow"),
    );

    let instances = runtime.lifecycle().instances("worker");
    assert_eq!(instances.len(), 2);
    assert_eq!(runtime.lifecycle().state(primary[0]), None);
    let queues: Vec<Option<String>> = instances
        .iter()
        .map(|id| {
            runtime
                .lifecycle()
                .properties(*id)
                .and_then(|p| p.get_str("queue").map(str::to_string))
        })
        .collect();
    assert_eq!(queues, vec![Some("fast".to_string()), Some("slow".to_string())]);

    store.delete("org.fipro.worker~1").unwrap();
    let remaining = runtime.lifecycle().instances("worker");
    assert_eq!(remaining, vec![instances[1]]);
}
