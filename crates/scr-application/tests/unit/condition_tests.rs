//! Condition gating of component activation

use crate::support::{Journal, tracking};
use scr_application::ServiceComponentRuntime;
use scr_domain::constants::CONDITION_ID;
use scr_domain::error::Error;
use scr_domain::value_objects::{ComponentDescriptor, ComponentState, Properties, ServiceScope};

#[test]
fn test_condition_toggles_activation() {
    let runtime = ServiceComponentRuntime::new();
    let journal = Journal::default();
    runtime
        .load(tracking(ComponentDescriptor::new("gated").condition("onoff"), &journal))
        .unwrap();
    let id = runtime.lifecycle().instances("gated")[0];
    assert_eq!(runtime.lifecycle().state(id), Some(ComponentState::Unsatisfied));

    let condition = runtime.register_condition("onoff").unwrap();
    assert_eq!(runtime.lifecycle().state(id), Some(ComponentState::Active));

    runtime.registry().unregister(condition.id()).unwrap();
    assert_eq!(runtime.lifecycle().state(id), Some(ComponentState::Unsatisfied));
    assert_eq!(journal.take(), vec!["activate".to_string(), "deactivate".to_string()]);
}

#[test]
fn test_other_conditions_do_not_satisfy() {
    let runtime = ServiceComponentRuntime::new();
    runtime
        .load(tracking(ComponentDescriptor::new("gated").condition("onoff"), &Journal::default()))
        .unwrap();
    runtime.register_condition("something-else").unwrap();

    let id = runtime.lifecycle().instances("gated")[0];
    assert_eq!(runtime.lifecycle().state(id), Some(ComponentState::Unsatisfied));
}

#[test]
fn test_every_condition_must_hold() {
    let runtime = ServiceComponentRuntime::new();
    let descriptor = ComponentDescriptor::new("gated")
        .condition("network")
        .condition("(&(condition.id=storage)(region=eu))");
    runtime.load(tracking(descriptor, &Journal::default())).unwrap();
    let id = runtime.lifecycle().instances("gated")[0];

    runtime.register_condition("network").unwrap();
    runtime.register_condition("storage").unwrap();
    assert_eq!(runtime.lifecycle().state(id), Some(ComponentState::Unsatisfied));

    runtime
        .registry()
        .register(
            scr_application::ConditionGate::capability(),
            Properties::new()
                .with(CONDITION_ID, "storage")
                .with("region", "eu"),
            ServiceScope::Singleton,
        )
        .unwrap();
    assert_eq!(runtime.lifecycle().state(id), Some(ComponentState::Active));
}

#[test]
fn test_malformed_condition_is_rejected_at_load() {
    let runtime = ServiceComponentRuntime::new();
    let err = runtime
        .load(tracking(
            ComponentDescriptor::new("gated").condition("(condition.id=onoff"),
            &Journal::default(),
        ))
        .unwrap_err();
    assert!(matches!(err, Error::FilterSyntax { .. }));
    assert!(runtime.lifecycle().component_names().is_empty());
}
