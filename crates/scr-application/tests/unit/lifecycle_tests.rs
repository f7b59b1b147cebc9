//! Tests for the component lifecycle manager

use crate::support::{Journal, failing_activate, failing_bind, tracking};
use parking_lot::Mutex;
use scr_application::ServiceComponentRuntime;
use scr_application::component::{Component, ComponentContext, ComponentType};
use scr_application::registry::ServiceRegistry;
use scr_domain::constants::{COMPONENT_NAME, SERVICE_RANKING};
use scr_domain::error::{Error, Result};
use scr_domain::events::{Event, EventPublisher};
use scr_domain::value_objects::{
    Capability, Cardinality, ComponentDescriptor, ComponentState, Properties,
    ReferenceDescriptor, ServiceId, ServiceObject, ServiceScope,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

const DATA: &str = "org.fipro.inverter.Data";
const INVERTER: &str = "org.fipro.inverter.StringInverter";

#[test]
fn test_mandatory_reference_gates_activation() {
    let runtime = ServiceComponentRuntime::new();
    let journal = Journal::default();
    let descriptor =
        ComponentDescriptor::new("consumer").reference(ReferenceDescriptor::new("data", DATA));
    runtime.load(tracking(descriptor, &journal)).unwrap();

    let id = runtime.lifecycle().instances("consumer")[0];
    assert_eq!(runtime.lifecycle().state(id), Some(ComponentState::Unsatisfied));
    assert!(journal.take().is_empty());

    let data = runtime
        .registry()
        .register(DATA, Properties::new(), ServiceScope::Singleton)
        .unwrap();
    assert_eq!(runtime.lifecycle().state(id), Some(ComponentState::Active));
    assert_eq!(
        journal.take(),
        vec![format!("bind data {}", data.id()), "activate".to_string()]
    );

    runtime.registry().unregister(data.id()).unwrap();
    assert_eq!(runtime.lifecycle().state(id), Some(ComponentState::Unsatisfied));
    assert_eq!(
        journal.take(),
        vec!["deactivate".to_string(), format!("unbind data {}", data.id())]
    );
}

#[test]
fn test_optional_reference_activates_immediately() {
    let runtime = ServiceComponentRuntime::new();
    let journal = Journal::default();
    let descriptor = ComponentDescriptor::new("consumer").reference(
        ReferenceDescriptor::new("data", DATA).cardinality(Cardinality::OptionalSingle),
    );
    runtime.load(tracking(descriptor, &journal)).unwrap();

    let id = runtime.lifecycle().instances("consumer")[0];
    assert_eq!(runtime.lifecycle().state(id), Some(ComponentState::Active));
    assert!(runtime.lifecycle().bound_services(id, "data").is_empty());
}

#[test]
fn test_provided_service_follows_activation() {
    let runtime = ServiceComponentRuntime::new();
    let journal = Journal::default();
    let descriptor = ComponentDescriptor::new("inverter")
        .provides(INVERTER)
        .property("fipro.language", "en")
        .property(".secret", "hidden")
        .reference(ReferenceDescriptor::new("data", DATA));
    runtime.load(tracking(descriptor, &journal)).unwrap();

    let inverter = Capability::from(INVERTER);
    assert!(runtime.registry().lookup(&inverter, None).is_empty());

    let data = runtime
        .registry()
        .register(DATA, Properties::new(), ServiceScope::Singleton)
        .unwrap();
    let published = runtime.registry().lookup(&inverter, None);
    assert_eq!(published.len(), 1);
    let props = published[0].properties();
    assert_eq!(props.get_str(COMPONENT_NAME), Some("inverter"));
    assert_eq!(props.get_str("fipro.language"), Some("en"));
    assert!(props.get(".secret").is_none());

    let id = runtime.lifecycle().instances("inverter")[0];
    assert_eq!(runtime.lifecycle().owned_services(id), vec![published[0].id()]);
    assert_eq!(
        runtime.lifecycle().properties(id).and_then(|p| p.get_str(".secret").map(str::to_string)),
        Some("hidden".to_string())
    );

    runtime.registry().unregister(data.id()).unwrap();
    assert!(runtime.registry().lookup(&inverter, None).is_empty());
    assert!(runtime.lifecycle().owned_services(id).is_empty());
}

#[test]
fn test_dependency_chain_resolves_in_any_load_order() {
    let runtime = ServiceComponentRuntime::new();
    let journal = Journal::default();
    let top = ComponentDescriptor::new("top")
        .reference(ReferenceDescriptor::new("inverter", INVERTER));
    let middle = ComponentDescriptor::new("middle")
        .provides(INVERTER)
        .reference(ReferenceDescriptor::new("data", DATA));
    let bottom = ComponentDescriptor::new("bottom").provides(DATA);

    runtime.load(tracking(top, &journal)).unwrap();
    runtime.load(tracking(middle, &journal)).unwrap();
    let top_id = runtime.lifecycle().instances("top")[0];
    assert_eq!(runtime.lifecycle().state(top_id), Some(ComponentState::Unsatisfied));

    runtime.load(tracking(bottom, &journal)).unwrap();
    assert_eq!(runtime.lifecycle().state(top_id), Some(ComponentState::Active));

    runtime.lifecycle().disable("bottom").unwrap();
    assert_eq!(runtime.lifecycle().state(top_id), Some(ComponentState::Unsatisfied));
    let middle_id = runtime.lifecycle().instances("middle")[0];
    assert_eq!(runtime.lifecycle().state(middle_id), Some(ComponentState::Unsatisfied));

    runtime.lifecycle().enable("bottom").unwrap();
    assert_eq!(runtime.lifecycle().state(top_id), Some(ComponentState::Active));
}

#[test]
fn test_disabled_component_has_no_instances_until_enabled() {
    let runtime = ServiceComponentRuntime::new();
    let journal = Journal::default();
    runtime
        .load(tracking(ComponentDescriptor::new("lazy").disabled(), &journal))
        .unwrap();
    assert!(runtime.lifecycle().instances("lazy").is_empty());

    runtime.lifecycle().enable("lazy").unwrap();
    let id = runtime.lifecycle().instances("lazy")[0];
    assert_eq!(runtime.lifecycle().state(id), Some(ComponentState::Active));

    runtime.lifecycle().disable("lazy").unwrap();
    assert_eq!(runtime.lifecycle().state(id), None);
    assert_eq!(journal.take(), vec!["activate".to_string(), "deactivate".to_string()]);
}

#[test]
fn test_unload_disposes_instances() {
    let runtime = ServiceComponentRuntime::new();
    let journal = Journal::default();
    runtime
        .load(tracking(ComponentDescriptor::new("service").provides(DATA), &journal))
        .unwrap();
    let id = runtime.lifecycle().instances("service")[0];
    assert_eq!(runtime.registry().len(), 1);

    runtime.lifecycle().unload("service").unwrap();
    assert_eq!(runtime.lifecycle().state(id), None);
    assert!(runtime.registry().is_empty());
    assert!(runtime.lifecycle().component_names().is_empty());
    assert!(matches!(
        runtime.lifecycle().unload("service"),
        Err(Error::NotFound { .. })
    ));
}

#[test]
fn test_duplicate_and_malformed_loads_are_rejected() {
    let runtime = ServiceComponentRuntime::new();
    let journal = Journal::default();
    runtime
        .load(tracking(ComponentDescriptor::new("one"), &journal))
        .unwrap();
    assert!(matches!(
        runtime.load(tracking(ComponentDescriptor::new("one"), &journal)),
        Err(Error::Configuration { .. })
    ));

    let broken = ComponentDescriptor::new("broken")
        .reference(ReferenceDescriptor::new("data", DATA).target("(fipro.language=en"));
    assert!(matches!(
        runtime.load(tracking(broken, &journal)),
        Err(Error::FilterSyntax { .. })
    ));
    assert_eq!(runtime.lifecycle().component_names(), vec!["one".to_string()]);
}

#[test]
fn test_activation_failure_is_contained() {
    let runtime = ServiceComponentRuntime::new();
    let journal = Journal::default();
    let healthy = Journal::default();

    runtime
        .load(tracking(ComponentDescriptor::new("healthy").provides(DATA), &healthy))
        .unwrap();
    let err = runtime
        .load(failing_activate(
            ComponentDescriptor::new("broken")
                .provides(INVERTER)
                .reference(ReferenceDescriptor::new("data", DATA)),
            &journal,
        ))
        .unwrap_err();
    assert!(err.is_activation_failure());

    let broken = runtime.lifecycle().instances("broken")[0];
    assert_eq!(runtime.lifecycle().state(broken), Some(ComponentState::Unsatisfied));
    assert!(
        runtime
            .lifecycle()
            .last_error(broken)
            .is_some_and(|e| e.contains("refuses to start"))
    );
    assert!(runtime.registry().lookup(&Capability::from(INVERTER), None).is_empty());
    assert_eq!(
        journal.take(),
        vec![
            format!("bind data {}", runtime.registry().lookup(&Capability::from(DATA), None)[0].id()),
            "activate".to_string(),
            format!("unbind data {}", runtime.registry().lookup(&Capability::from(DATA), None)[0].id()),
        ]
    );

    let healthy_id = runtime.lifecycle().instances("healthy")[0];
    assert_eq!(runtime.lifecycle().state(healthy_id), Some(ComponentState::Active));

    // churn elsewhere does not surface the failure to the registrant
    runtime
        .registry()
        .register(DATA, Properties::new(), ServiceScope::Singleton)
        .unwrap();
    assert_eq!(runtime.lifecycle().state(broken), Some(ComponentState::Unsatisfied));
}

#[test]
fn test_bind_failure_rolls_back_earlier_bindings() {
    let runtime = ServiceComponentRuntime::new();
    let journal = Journal::default();
    let first = runtime
        .registry()
        .register("first", Properties::new(), ServiceScope::Singleton)
        .unwrap();
    runtime
        .registry()
        .register("second", Properties::new(), ServiceScope::Singleton)
        .unwrap();

    let descriptor = ComponentDescriptor::new("picky")
        .reference(ReferenceDescriptor::new("first", "first"))
        .reference(ReferenceDescriptor::new("second", "second"));
    let err = runtime
        .load(failing_bind(descriptor, &journal, "second"))
        .unwrap_err();
    assert!(matches!(err, Error::ActivationFailed { .. }));

    let id = runtime.lifecycle().instances("picky")[0];
    assert_eq!(runtime.lifecycle().state(id), Some(ComponentState::Unsatisfied));
    assert_eq!(
        journal.take(),
        vec![format!("bind first {}", first.id()), format!("unbind first {}", first.id())]
    );
    assert_eq!(runtime.registry().usage_count(first.id()), 0);
}

#[test]
fn test_refresh_retries_failed_activation() {
    struct Flaky {
        attempts: Arc<Mutex<u32>>,
    }

    impl Component for Flaky {
        fn activate(&mut self, _context: &ComponentContext) -> Result<()> {
            let mut attempts = self.attempts.lock();
            *attempts += 1;
            if *attempts == 1 {
                return Err(Error::internal("first attempt fails"));
            }
            Ok(())
        }
    }

    let runtime = ServiceComponentRuntime::new();
    let attempts = Arc::new(Mutex::new(0));
    let shared = Arc::clone(&attempts);
    let component_type = ComponentType::new(ComponentDescriptor::new("flaky"), move |_| {
        Ok(Box::new(Flaky {
            attempts: Arc::clone(&shared),
        }))
    });

    assert!(runtime.load(component_type).is_err());
    let id = runtime.lifecycle().instances("flaky")[0];
    assert_eq!(runtime.lifecycle().state(id), Some(ComponentState::Unsatisfied));

    runtime.lifecycle().refresh("flaky").unwrap();
    assert_eq!(runtime.lifecycle().state(id), Some(ComponentState::Active));
    assert_eq!(*attempts.lock(), 2);
    assert!(runtime.lifecycle().last_error(id).is_none());
}

#[test]
fn test_service_object_is_registered_and_bound() {
    struct Upper;

    impl Upper {
        fn invert(&self, input: &str) -> String {
            input.chars().rev().collect()
        }
    }

    #[derive(Default)]
    struct Provider;

    impl Component for Provider {
        fn service_object(&self) -> Option<ServiceObject> {
            Some(Arc::new(Upper))
        }
    }

    struct Client {
        seen: Arc<Mutex<Option<String>>>,
    }

    impl Component for Client {
        fn activate(&mut self, context: &ComponentContext) -> Result<()> {
            let inverter = context
                .service_as::<Upper>("inverter")
                .ok_or_else(|| Error::internal("inverter missing"))?;
            *self.seen.lock() = Some(inverter.invert("fipro"));
            Ok(())
        }
    }

    let runtime = ServiceComponentRuntime::new();
    runtime
        .load(ComponentType::from_default::<Provider>(
            ComponentDescriptor::new("provider").provides(INVERTER),
        ))
        .unwrap();

    let seen = Arc::new(Mutex::new(None));
    let shared = Arc::clone(&seen);
    runtime
        .load(ComponentType::new(
            ComponentDescriptor::new("client")
                .reference(ReferenceDescriptor::new("inverter", INVERTER)),
            move |_| {
                Ok(Box::new(Client {
                    seen: Arc::clone(&shared),
                }))
            },
        ))
        .unwrap();

    assert_eq!(seen.lock().as_deref(), Some("orpif"));
}

#[derive(Default)]
struct CapturingBus {
    topics: Mutex<Vec<String>>,
}

impl EventPublisher for CapturingBus {
    fn post(&self, event: Event) -> Result<()> {
        self.topics.lock().push(event.topic);
        Ok(())
    }

    fn send(&self, event: Event) -> Result<()> {
        self.post(event)
    }
}

#[test]
fn test_component_events_are_published_when_enabled() {
    let bus = Arc::new(CapturingBus::default());
    let runtime = ServiceComponentRuntime::builder()
        .with_events(bus.clone())
        .publish_component_events(true)
        .build();
    let journal = Journal::default();
    runtime
        .load(tracking(ComponentDescriptor::new("noisy"), &journal))
        .unwrap();
    runtime.lifecycle().disable("noisy").unwrap();

    assert_eq!(
        *bus.topics.lock(),
        vec![
            "scr/component/SATISFIED".to_string(),
            "scr/component/ACTIVE".to_string(),
            "scr/component/DEACTIVATING".to_string(),
            "scr/component/UNSATISFIED".to_string(),
            "scr/component/DISPOSED".to_string(),
        ]
    );
}

#[test]
fn test_component_events_are_silent_by_default() {
    let bus = Arc::new(CapturingBus::default());
    let runtime = ServiceComponentRuntime::builder()
        .with_events(bus.clone())
        .build();
    runtime
        .load(tracking(ComponentDescriptor::new("quiet"), &Journal::default()))
        .unwrap();
    assert!(bus.topics.lock().is_empty());
}

#[test]
fn test_service_registered_during_activation_waits_for_the_transition() {
    struct Publisher {
        registry: ServiceRegistry,
        journal: Journal,
    }

    impl Component for Publisher {
        fn activate(&mut self, _context: &ComponentContext) -> Result<()> {
            self.registry
                .register(DATA, Properties::new(), ServiceScope::Singleton)?;
            self.journal.push("activate-end".to_string());
            Ok(())
        }
    }

    let runtime = ServiceComponentRuntime::new();
    let journal = Journal::default();
    runtime
        .load(tracking(
            ComponentDescriptor::new("consumer").reference(ReferenceDescriptor::new("data", DATA)),
            &journal,
        ))
        .unwrap();

    let registry = runtime.registry().clone();
    let log = journal.clone();
    runtime
        .load(ComponentType::new(
            ComponentDescriptor::new("publisher"),
            move |_| {
                Ok(Box::new(Publisher {
                    registry: registry.clone(),
                    journal: log.clone(),
                }))
            },
        ))
        .unwrap();

    let data = runtime.registry().lookup(&Capability::from(DATA), None)[0].id();
    assert_eq!(
        journal.take(),
        vec![
            "activate-end".to_string(),
            format!("bind data {data}"),
            "activate".to_string(),
        ]
    );
}

#[test]
fn test_concurrent_churn_loads_each_component_once() {
    const CHURNED: &str = "org.fipro.churn.Data";
    let runtime = ServiceComponentRuntime::new();
    let churning = AtomicBool::new(true);

    let counts: Vec<usize> = thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                let registry = runtime.registry();
                while churning.load(Ordering::SeqCst) {
                    let record = registry
                        .register(CHURNED, Properties::new(), ServiceScope::Singleton)
                        .unwrap();
                    registry.unregister(record.id()).unwrap();
                }
            });
        }
        let counts: Vec<usize> = (0..50)
            .map(|round| {
                let name = format!("optional-{round}");
                let descriptor = ComponentDescriptor::new(name.as_str()).reference(
                    ReferenceDescriptor::new("data", CHURNED)
                        .cardinality(Cardinality::OptionalSingle),
                );
                let loaded = runtime.load(tracking(descriptor, &Journal::default()));
                if loaded.is_err() {
                    return usize::MAX;
                }
                runtime.lifecycle().instances(&name).len()
            })
            .collect();
        churning.store(false, Ordering::SeqCst);
        counts
    });

    assert!(counts.iter().all(|count| *count == 1), "instance counts: {counts:?}");
    for round in 0..50 {
        let instances = runtime.lifecycle().instances(&format!("optional-{round}"));
        assert_eq!(instances.len(), 1);
        assert_eq!(runtime.lifecycle().state(instances[0]), Some(ComponentState::Active));
        assert!(runtime.lifecycle().bound_services(instances[0], "data").is_empty());
    }
}

#[test]
fn test_bindings_settle_after_concurrent_churn() {
    let runtime = ServiceComponentRuntime::new();
    let journal = Journal::default();
    let consumers = [
        ("greedy", ReferenceDescriptor::new("data", DATA).dynamic().greedy()),
        ("reluctant", ReferenceDescriptor::new("data", DATA).dynamic()),
        ("static", ReferenceDescriptor::new("data", DATA)),
        (
            "all",
            ReferenceDescriptor::new("data", DATA)
                .dynamic()
                .cardinality(Cardinality::MandatoryMultiple),
        ),
    ];
    for (name, reference) in consumers {
        runtime
            .load(tracking(ComponentDescriptor::new(name).reference(reference), &journal))
            .unwrap();
    }

    let issued = Mutex::new(Vec::new());
    thread::scope(|scope| {
        for producer in 0..4_i64 {
            let registry = runtime.registry();
            let issued = &issued;
            scope.spawn(move || {
                for round in 0..100_i64 {
                    let record = registry
                        .register(
                            DATA,
                            Properties::new().with(SERVICE_RANKING, round % 5),
                            ServiceScope::Singleton,
                        )
                        .unwrap();
                    issued.lock().push(record.id());
                    registry.unregister(record.id()).unwrap();
                }
                let stable = registry
                    .register(
                        DATA,
                        Properties::new().with(SERVICE_RANKING, producer),
                        ServiceScope::Singleton,
                    )
                    .unwrap();
                issued.lock().push(stable.id());
            });
        }
    });

    // ids are never reused
    let mut ids = issued.into_inner();
    let total = ids.len();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), total);

    let ranked: Vec<ServiceId> = runtime
        .registry()
        .lookup(&Capability::from(DATA), None)
        .iter()
        .map(|record| record.id())
        .collect();
    assert_eq!(ranked.len(), 4);

    let lifecycle = runtime.lifecycle();
    let bound = |name: &str| {
        let id = lifecycle.instances(name)[0];
        assert_eq!(lifecycle.state(id), Some(ComponentState::Active), "{name}");
        lifecycle.bound_services(id, "data")
    };
    assert_eq!(bound("greedy"), vec![ranked[0]]);
    assert_eq!(bound("all"), ranked);
    for name in ["reluctant", "static"] {
        let held = bound(name);
        assert_eq!(held.len(), 1, "{name}");
        assert!(ranked.contains(&held[0]), "{name}");
    }
}
