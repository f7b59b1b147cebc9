//! Tests for the service registry
//!
//! Registration round-trips, ordering, change notification and scoped
//! acquisition through leases.

use parking_lot::Mutex;
use scr_application::registry::{Consumer, ServiceFactory, ServiceListener, ServiceRegistry};
use scr_domain::constants::SERVICE_RANKING;
use scr_domain::error::{Error, Result};
use scr_domain::events::{ServiceEvent, ServiceEventKind};
use scr_domain::filter::Filter;
use scr_domain::value_objects::{Capability, Properties, ServiceObject, ServiceRecord, ServiceScope};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<(ServiceEventKind, u64)>>,
}

impl Recorder {
    fn kinds(&self) -> Vec<ServiceEventKind> {
        self.events.lock().iter().map(|(kind, _)| *kind).collect()
    }
}

impl ServiceListener for Recorder {
    fn service_changed(&self, event: &ServiceEvent) {
        self.events
            .lock()
            .push((event.kind, event.record.id().value()));
    }
}

#[derive(Default)]
struct CountingFactory {
    created: AtomicUsize,
    released: AtomicUsize,
}

impl ServiceFactory for CountingFactory {
    fn get_service(&self, _consumer: &Consumer, _record: &ServiceRecord) -> Result<ServiceObject> {
        let n = self.created.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(n))
    }

    fn unget_service(&self, _consumer: &Consumer, _record: &ServiceRecord, _service: &ServiceObject) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

fn ranked(ranking: i64) -> Properties {
    Properties::new().with(SERVICE_RANKING, ranking)
}

#[test]
fn test_register_unregister_round_trip() {
    let registry = ServiceRegistry::new();
    let data = Capability::from("org.fipro.inverter.Data");
    let before = registry.lookup(&data, None);

    let record = registry
        .register(data.clone(), Properties::new(), ServiceScope::Singleton)
        .unwrap();
    assert_eq!(registry.lookup(&data, None), vec![record.clone()]);

    registry.unregister(record.id()).unwrap();
    assert_eq!(registry.lookup(&data, None), before);
    assert!(registry.is_empty());
}

#[test]
fn test_unregister_unknown_id_is_not_found() {
    let registry = ServiceRegistry::new();
    let record = registry
        .register("data", Properties::new(), ServiceScope::Singleton)
        .unwrap();
    registry.unregister(record.id()).unwrap();
    let err = registry.unregister(record.id()).unwrap_err();
    assert!(matches!(err, Error::NotFound { .. }));
}

#[test]
fn test_lookup_orders_by_ranking_then_age() {
    let registry = ServiceRegistry::new();
    let low = registry.register("data", ranked(1), ServiceScope::Singleton).unwrap();
    let high = registry.register("data", ranked(7), ServiceScope::Singleton).unwrap();
    let also_high = registry.register("data", ranked(7), ServiceScope::Singleton).unwrap();

    let ids: Vec<_> = registry
        .lookup(&Capability::from("data"), None)
        .iter()
        .map(ServiceRecord::id)
        .collect();
    assert_eq!(ids, vec![high.id(), also_high.id(), low.id()]);
}

#[test]
fn test_lookup_applies_filter() {
    let registry = ServiceRegistry::new();
    registry
        .register("data", Properties::new().with("fipro.language", "de"), ServiceScope::Singleton)
        .unwrap();
    let en = registry
        .register("data", Properties::new().with("fipro.language", "en"), ServiceScope::Singleton)
        .unwrap();

    let filter = Filter::parse("(fipro.language=en)").unwrap();
    let found = registry.lookup(&Capability::from("data"), Some(&filter));
    assert_eq!(found, vec![en]);
}

#[test]
fn test_modify_fires_event_even_without_change() {
    let registry = ServiceRegistry::new();
    let recorder = Arc::new(Recorder::default());
    registry.subscribe("data", recorder.clone());

    let record = registry.register("data", ranked(3), ServiceScope::Singleton).unwrap();
    let first = registry.modify(record.id(), ranked(3)).unwrap();
    let second = registry.modify(record.id(), ranked(3)).unwrap();

    assert_eq!(first.properties(), second.properties());
    assert_eq!(second.revision(), first.revision() + 1);
    assert_eq!(
        recorder.kinds(),
        vec![
            ServiceEventKind::Registered,
            ServiceEventKind::Modified,
            ServiceEventKind::Modified
        ]
    );
}

#[test]
fn test_modify_keeps_identity_and_updates_ranking() {
    let registry = ServiceRegistry::new();
    let factory = Arc::new(CountingFactory::default());
    let record = registry
        .register_factory("data", ranked(1), ServiceScope::Bundle, factory)
        .unwrap();
    let modified = registry.modify(record.id(), ranked(9)).unwrap();

    assert_eq!(modified.id(), record.id());
    assert_eq!(modified.scope(), ServiceScope::Bundle);
    assert_eq!(modified.ranking(), 9);
    assert_eq!(modified.properties().get_str("objectClass"), Some("data"));
}

#[test]
fn test_subscribers_only_see_their_capability() {
    let registry = ServiceRegistry::new();
    let data = Arc::new(Recorder::default());
    let everything = Arc::new(Recorder::default());
    registry.subscribe("data", data.clone());
    registry.subscribe_all(everything.clone());

    registry.register("data", Properties::new(), ServiceScope::Singleton).unwrap();
    registry.register("other", Properties::new(), ServiceScope::Singleton).unwrap();

    assert_eq!(data.events.lock().len(), 1);
    assert_eq!(everything.events.lock().len(), 2);
}

#[test]
fn test_unsubscribe_stops_delivery() {
    let registry = ServiceRegistry::new();
    let recorder = Arc::new(Recorder::default());
    let id = registry.subscribe("data", recorder.clone());
    assert!(registry.unsubscribe(id));
    assert!(!registry.unsubscribe(id));

    registry.register("data", Properties::new(), ServiceScope::Singleton).unwrap();
    assert!(recorder.events.lock().is_empty());
}

#[test]
fn test_singleton_object_is_shared() {
    let registry = ServiceRegistry::new();
    let record = registry
        .register_object("greeter", Properties::new(), Arc::new("hello".to_string()))
        .unwrap();

    let a = registry.get_service(record.id(), &Consumer::external("a")).unwrap();
    let b = registry.get_service(record.id(), &Consumer::external("b")).unwrap();
    assert!(Arc::ptr_eq(a.service(), b.service()));
    assert_eq!(a.downcast::<String>().as_deref().map(String::as_str), Some("hello"));
    assert_eq!(registry.usage_count(record.id()), 2);

    drop(a);
    drop(b);
    assert_eq!(registry.usage_count(record.id()), 0);
}

#[test]
fn test_prototype_factory_creates_per_acquisition() {
    let registry = ServiceRegistry::new();
    let factory = Arc::new(CountingFactory::default());
    let record = registry
        .register_factory("counter", Properties::new(), ServiceScope::Prototype, factory.clone())
        .unwrap();

    let consumer = Consumer::external("client");
    let a = registry.get_service(record.id(), &consumer).unwrap();
    let b = registry.get_service(record.id(), &consumer).unwrap();
    assert!(!Arc::ptr_eq(a.service(), b.service()));
    assert_eq!(factory.created.load(Ordering::SeqCst), 2);

    drop(a);
    assert_eq!(factory.released.load(Ordering::SeqCst), 1);
    drop(b);
    assert_eq!(factory.released.load(Ordering::SeqCst), 2);
}

#[test]
fn test_bundle_factory_caches_per_consumer() {
    let registry = ServiceRegistry::new();
    let factory = Arc::new(CountingFactory::default());
    let record = registry
        .register_factory("counter", Properties::new(), ServiceScope::Bundle, factory.clone())
        .unwrap();

    let first = registry.get_service(record.id(), &Consumer::external("one")).unwrap();
    let again = registry.get_service(record.id(), &Consumer::external("one")).unwrap();
    let other = registry.get_service(record.id(), &Consumer::external("two")).unwrap();
    assert!(Arc::ptr_eq(first.service(), again.service()));
    assert!(!Arc::ptr_eq(first.service(), other.service()));
    assert_eq!(factory.created.load(Ordering::SeqCst), 2);

    drop(first);
    assert_eq!(factory.released.load(Ordering::SeqCst), 0);
    drop(again);
    assert_eq!(factory.released.load(Ordering::SeqCst), 1);
    drop(other);
    assert_eq!(factory.released.load(Ordering::SeqCst), 2);
}

#[test]
fn test_lease_outlives_unregistration() {
    let registry = ServiceRegistry::new();
    let factory = Arc::new(CountingFactory::default());
    let record = registry
        .register_factory("counter", Properties::new(), ServiceScope::Prototype, factory.clone())
        .unwrap();
    let lease = registry.get_service(record.id(), &Consumer::external("client")).unwrap();

    registry.unregister(record.id()).unwrap();
    assert!(matches!(
        registry.get_service(record.id(), &Consumer::external("late")),
        Err(Error::NotFound { .. })
    ));
    assert_eq!(lease.record().id(), record.id());

    drop(lease);
    assert_eq!(factory.released.load(Ordering::SeqCst), 1);
}
