//! Topic-addressed delivery to handler services

use parking_lot::Mutex;
use scr_application::ServiceComponentRuntime;
use scr_application::ServiceRegistry;
use scr_application::component::{Component, ComponentType};
use scr_domain::constants::{COMPONENT_NAME, EVENT_HANDLER_CAPABILITY, EVENT_TOPIC, EVENT_TOPICS};
use scr_domain::error::Error;
use scr_domain::events::{Event, EventHandler, EventPublisher};
use scr_domain::value_objects::{ComponentDescriptor, Properties, ServiceObject};
use scr_infrastructure::config::{DeliveryMode, EventAdminConfig};
use scr_infrastructure::infrastructure::{EventAdmin, handler_object};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

const CONVINCE: &str = "org/fipro/mafia/Boss/CONVINCE";
const SOLVE: &str = "org/fipro/mafia/Boss/SOLVE";

/// Records `<label> <topic>` for every event it receives
struct Soldier {
    label: &'static str,
    log: Arc<Mutex<Vec<String>>>,
}

impl EventHandler for Soldier {
    fn handle_event(&self, event: &Event) {
        self.log.lock().push(format!("{} {}", self.label, event.topic));
    }
}

struct Traitor;

impl EventHandler for Traitor {
    fn handle_event(&self, _event: &Event) {
        panic!("refuses the order");
    }
}

struct Forwarder(mpsc::UnboundedSender<Event>);

impl EventHandler for Forwarder {
    fn handle_event(&self, event: &Event) {
        let _ = self.0.send(event.clone());
    }
}

fn soldier(label: &'static str, log: &Arc<Mutex<Vec<String>>>) -> Arc<dyn EventHandler> {
    Arc::new(Soldier {
        label,
        log: Arc::clone(log),
    })
}

fn admin(registry: &ServiceRegistry, delivery: DeliveryMode) -> EventAdmin {
    EventAdmin::new(
        registry.clone(),
        &EventAdminConfig {
            delivery,
            capacity: 8,
        },
    )
}

fn order(topic: &str, target: &str) -> Event {
    Event::new(topic, Properties::new().with("target", target))
}

#[test]
fn test_send_reaches_matching_topics_in_registration_order() {
    let registry = ServiceRegistry::new();
    let admin = admin(&registry, DeliveryMode::Sync);
    let log = Arc::new(Mutex::new(Vec::new()));
    admin.register_handler(&[CONVINCE], None, soldier("luigi", &log)).unwrap();
    admin
        .register_handler(&["org/fipro/mafia/Boss/*"], None, soldier("mario", &log))
        .unwrap();
    admin.register_handler(&["*"], None, soldier("hugo", &log)).unwrap();

    admin.send(order(CONVINCE, "Angelo")).unwrap();
    admin.send(order(SOLVE, "Angelo")).unwrap();
    admin.send(order("org/fipro/other", "Angelo")).unwrap();

    assert_eq!(
        *log.lock(),
        vec![
            format!("luigi {CONVINCE}"),
            format!("mario {CONVINCE}"),
            format!("hugo {CONVINCE}"),
            format!("mario {SOLVE}"),
            format!("hugo {SOLVE}"),
            "hugo org/fipro/other".to_string(),
        ]
    );
}

#[test]
fn test_filter_applies_to_event_properties_and_topic() {
    let registry = ServiceRegistry::new();
    let admin = admin(&registry, DeliveryMode::Sync);
    let log = Arc::new(Mutex::new(Vec::new()));
    admin
        .register_handler(&["org/fipro/mafia/*"], Some("(target=Angelo)"), soldier("luigi", &log))
        .unwrap();
    admin
        .register_handler(
            &["org/fipro/mafia/*"],
            Some(format!("({EVENT_TOPIC}=*/SOLVE)").as_str()),
            soldier("mario", &log),
        )
        .unwrap();

    admin.post(order(CONVINCE, "Angelo")).unwrap();
    admin.post(order(SOLVE, "Paolo")).unwrap();

    assert_eq!(
        *log.lock(),
        vec![format!("luigi {CONVINCE}"), format!("mario {SOLVE}")]
    );
}

#[test]
fn test_panicking_handler_does_not_stop_delivery() {
    let registry = ServiceRegistry::new();
    let admin = admin(&registry, DeliveryMode::Sync);
    let log = Arc::new(Mutex::new(Vec::new()));
    admin.register_handler(&[CONVINCE], None, Arc::new(Traitor)).unwrap();
    admin.register_handler(&[CONVINCE], None, soldier("luigi", &log)).unwrap();

    admin.send(order(CONVINCE, "Angelo")).unwrap();
    assert_eq!(*log.lock(), vec![format!("luigi {CONVINCE}")]);
}

#[test]
fn test_unregistered_and_foreign_handlers_are_skipped() {
    let registry = ServiceRegistry::new();
    let admin = admin(&registry, DeliveryMode::Sync);
    let log = Arc::new(Mutex::new(Vec::new()));
    let gone = admin.register_handler(&[CONVINCE], None, soldier("gone", &log)).unwrap();
    registry.unregister(gone.id()).unwrap();

    // right capability, wrong object type
    let foreign: ServiceObject = Arc::new(String::from("not a handler"));
    registry
        .register_object(
            EVENT_HANDLER_CAPABILITY,
            Properties::new().with(EVENT_TOPICS, CONVINCE),
            foreign,
        )
        .unwrap();
    admin.register_handler(&[CONVINCE], None, soldier("luigi", &log)).unwrap();

    admin.send(order(CONVINCE, "Angelo")).unwrap();
    assert_eq!(*log.lock(), vec![format!("luigi {CONVINCE}")]);
}

#[test]
fn test_register_handler_validates_input() {
    let registry = ServiceRegistry::new();
    let admin = admin(&registry, DeliveryMode::Sync);
    let log = Arc::new(Mutex::new(Vec::new()));
    assert!(matches!(
        admin.register_handler(&[], None, soldier("luigi", &log)),
        Err(Error::InvalidProperties { .. })
    ));
    assert!(matches!(
        admin.register_handler(&[CONVINCE], Some("(target=Angelo"), soldier("luigi", &log)),
        Err(Error::FilterSyntax { .. })
    ));
    assert!(registry.is_empty());
}

#[test]
fn test_async_post_outside_runtime_delivers_on_caller() {
    let registry = ServiceRegistry::new();
    let admin = admin(&registry, DeliveryMode::Async);
    let log = Arc::new(Mutex::new(Vec::new()));
    admin.register_handler(&[CONVINCE], None, soldier("luigi", &log)).unwrap();

    admin.post(order(CONVINCE, "Angelo")).unwrap();
    assert_eq!(log.lock().len(), 1);
}

#[tokio::test]
async fn test_async_post_delivers_from_task_in_order() {
    let registry = ServiceRegistry::new();
    let admin = admin(&registry, DeliveryMode::Async);
    let (tx, mut rx) = mpsc::unbounded_channel();
    admin.register_handler(&["org/fipro/mafia/Boss/*"], None, Arc::new(Forwarder(tx))).unwrap();

    admin.post(order(CONVINCE, "Angelo")).unwrap();
    admin.post(order(SOLVE, "Angelo")).unwrap();

    let first = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    let second = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.topic, CONVINCE);
    assert_eq!(second.topic, SOLVE);
    assert_eq!(first.properties.get_str("target"), Some("Angelo"));
}

struct Listener {
    log: Arc<Mutex<Vec<String>>>,
}

impl Component for Listener {
    fn service_object(&self) -> Option<ServiceObject> {
        Some(handler_object(Arc::new(Soldier {
            label: "component",
            log: Arc::clone(&self.log),
        })))
    }
}

#[test]
fn test_component_events_reach_component_handlers() {
    let registry = ServiceRegistry::new();
    let events = Arc::new(admin(&registry, DeliveryMode::Sync));
    let runtime = ServiceComponentRuntime::builder()
        .with_registry(registry)
        .with_events(events.clone())
        .publish_component_events(true)
        .build();

    let log = Arc::new(Mutex::new(Vec::new()));
    let handler_log = Arc::clone(&log);
    runtime
        .load(ComponentType::new(
            ComponentDescriptor::new("listener")
                .provides(EVENT_HANDLER_CAPABILITY)
                .property(EVENT_TOPICS, "scr/component/*"),
            move |_| {
                Ok(Box::new(Listener {
                    log: Arc::clone(&handler_log),
                }))
            },
        ))
        .unwrap();
    runtime
        .load(ComponentType::declarative(ComponentDescriptor::new("plain")))
        .unwrap();

    let seen = log.lock().clone();
    assert!(seen.contains(&"component scr/component/ACTIVE".to_string()));
    events
        .send(Event::new(
            "scr/component/ACTIVE",
            Properties::new().with(COMPONENT_NAME, "manual"),
        ))
        .unwrap();
    assert_eq!(log.lock().len(), seen.len() + 1);
}
