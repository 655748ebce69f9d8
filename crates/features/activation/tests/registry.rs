use anvil_activation::{
    ActivationError, Activator, ActivatorRef, ActivatorRegistry, LifecycleSink, RecordingSink,
};
use anvil_domain::{ActivationState, LifecycleEvent, LifecyclePhase};
use anvil_event_bus::{EventBus, EventReceiverExt};
use anvil_kernel::prelude::*;
use std::cell::RefCell;

thread_local! {
    static LOG: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

fn record(entry: String) {
    LOG.with(|log| log.borrow_mut().push(entry));
}

fn take_log() -> Vec<String> {
    LOG.with(|log| log.borrow_mut().drain(..).collect())
}

macro_rules! activator {
    ($name:ident $(=> [$($dependency:ident),*])?) => {
        #[derive(Default)]
        struct $name;

        impl Loadable for $name {
            fn describe() -> ModuleDescriptor {
                ModuleDescriptor::builder::<Self>().with_default().build()
            }
        }

        impl Activator for $name {
            fn dependencies() -> Vec<ActivatorRef> {
                vec![$($(ActivatorRef::of::<$dependency>()),*)?]
            }

            fn init(&mut self) -> Result<(), BoxError> {
                record(format!("init {}", stringify!($name)));
                Ok(())
            }

            fn stop(&mut self) -> Result<(), BoxError> {
                record(format!("stop {}", stringify!($name)));
                Ok(())
            }
        }
    };
}

activator!(Alpha => [Beta]);
activator!(Beta => [Gamma]);
activator!(Gamma);
activator!(Ping => [Pong]);
activator!(Pong => [Ping]);
activator!(Upstream);
activator!(Downstream => [Broken]);
activator!(Independent);
activator!(Solo);
activator!(Helper);

#[derive(Default)]
struct Broken;

impl Loadable for Broken {
    fn describe() -> ModuleDescriptor {
        ModuleDescriptor::builder::<Self>().with_default().build()
    }
}

impl Activator for Broken {
    fn dependencies() -> Vec<ActivatorRef> {
        vec![ActivatorRef::of::<Upstream>()]
    }

    fn init(&mut self) -> Result<(), BoxError> {
        record("init Broken".to_owned());
        Err("socket already bound".into())
    }
}

#[derive(Default)]
struct Stubborn;

impl Loadable for Stubborn {
    fn describe() -> ModuleDescriptor {
        ModuleDescriptor::builder::<Self>().with_default().build()
    }
}

impl Activator for Stubborn {
    fn init(&mut self) -> Result<(), BoxError> {
        record("init Stubborn".to_owned());
        Ok(())
    }

    fn stop(&mut self) -> Result<(), BoxError> {
        record("stop Stubborn".to_owned());
        Err("still busy".into())
    }
}

struct Listener {
    port: u16,
}

impl Loadable for Listener {
    fn describe() -> ModuleDescriptor {
        ModuleDescriptor::builder::<Self>()
            .loader(
                LoaderDescriptor::constructor("Listener::bind", |args| Ok(Listener { port: args.next()? }))
                    .param(PropertyDescriptor::new::<u16>("port").domain("net")),
            )
            .build()
    }
}

impl Activator for Listener {
    fn init(&mut self) -> Result<(), BoxError> {
        record(format!("listen {}", self.port));
        Ok(())
    }
}

struct Harness {
    store: PropertyStore,
    catalog: ModuleCatalog,
}

impl Harness {
    fn new() -> Self {
        take_log();
        Self { store: PropertyStore::builder().in_memory().build().unwrap(), catalog: ModuleCatalog::new() }
    }

    fn start(&self, registry: &mut ActivatorRegistry, overrides: &Overrides) -> anvil_activation::ActivationReport {
        registry.register_modules(&self.catalog);
        let loader = ModuleLoader::new(&self.store, &self.catalog);
        registry.start(&loader, overrides).unwrap()
    }
}

fn names(activators: &[ActivatorRef]) -> Vec<&'static str> {
    activators.iter().map(ActivatorRef::short_name).collect()
}

#[test]
fn test_dependencies_initialize_first_and_stop_last() {
    let harness = Harness::new();
    let sink = RecordingSink::new();
    let mut registry = ActivatorRegistry::new().with_sink(sink.clone());

    assert_eq!(registry.register::<Alpha>(), 3);
    let registered: Vec<_> = registry.activators().collect();
    assert_eq!(names(&registered), ["Alpha", "Beta", "Gamma"]);
    assert_eq!(names(&registry.plan().unwrap()), ["Gamma", "Beta", "Alpha"]);

    let report = harness.start(&mut registry, &Overrides::new());
    assert!(report.is_success());
    assert_eq!(names(&report.initialized), ["Gamma", "Beta", "Alpha"]);
    assert_eq!(take_log(), ["init Gamma", "init Beta", "init Alpha"]);
    assert_eq!(registry.state_of::<Alpha>(), Some(ActivationState::Initialized));

    let shutdown = registry.shutdown();
    assert!(shutdown.is_clean());
    assert_eq!(names(&shutdown.stopped), ["Alpha", "Beta", "Gamma"]);
    assert_eq!(take_log(), ["stop Alpha", "stop Beta", "stop Gamma"]);
    assert_eq!(registry.state_of::<Gamma>(), Some(ActivationState::Stopped));

    let events = sink.events();
    assert_eq!(events.len(), 6);
    assert_eq!(events[0], LifecycleEvent::succeeded(ActivatorRef::of::<Gamma>().name(), LifecyclePhase::Init));
    assert!(events[3..].iter().all(|event| event.phase == LifecyclePhase::Stop));
}

#[test]
fn test_cycle_aborts_before_anything_runs() {
    let harness = Harness::new();
    let mut registry = ActivatorRegistry::new();
    registry.register::<Ping>();

    registry.register_modules(&harness.catalog);
    let loader = ModuleLoader::new(&harness.store, &harness.catalog);
    let err = registry.start(&loader, &Overrides::new()).unwrap_err();

    match err {
        ActivationError::DependencyCycle { path, .. } => {
            assert_eq!(path.len(), 3);
            assert!(path[0].ends_with("Ping"));
            assert!(path[1].ends_with("Pong"));
            assert!(path[2].ends_with("Ping"));
        },
        other => panic!("unexpected error: {other}"),
    }
    assert!(take_log().is_empty());
    assert!(registry.records().iter().all(|record| record.state == ActivationState::Pending));
}

#[test]
fn test_failure_halts_the_run_and_keeps_initialized_activators() {
    let harness = Harness::new();
    let sink = RecordingSink::new();
    let mut registry = ActivatorRegistry::new().with_sink(sink.clone());
    registry.register::<Downstream>();
    registry.register::<Independent>();

    let report = harness.start(&mut registry, &Overrides::new());
    assert!(!report.is_success());
    assert_eq!(names(&report.initialized), ["Upstream"]);
    assert!(report.failed_activator().unwrap().ends_with("Broken"));
    assert_eq!(names(&report.not_attempted), ["Downstream", "Independent"]);
    assert_eq!(take_log(), ["init Upstream", "init Broken"]);

    assert_eq!(registry.state_of::<Upstream>(), Some(ActivationState::Initialized));
    assert_eq!(registry.state_of::<Broken>(), Some(ActivationState::Failed));
    assert_eq!(registry.state_of::<Downstream>(), Some(ActivationState::Pending));

    let failure = sink.events().into_iter().find(LifecycleEvent::is_failure).unwrap();
    assert_eq!(failure.phase, LifecyclePhase::Init);
    assert!(failure.error.unwrap().contains("socket already bound"));

    let shutdown = registry.shutdown();
    assert_eq!(names(&shutdown.stopped), ["Upstream"]);
    assert_eq!(take_log(), ["stop Upstream"]);
}

#[test]
fn test_failed_stop_does_not_block_remaining_stops() {
    let harness = Harness::new();
    let mut registry = ActivatorRegistry::new();
    registry.register::<Solo>();
    registry.register::<Stubborn>();
    registry.register::<Helper>();

    assert!(harness.start(&mut registry, &Overrides::new()).is_success());
    take_log();

    let shutdown = registry.shutdown();
    assert_eq!(take_log(), ["stop Helper", "stop Stubborn", "stop Solo"]);
    assert_eq!(names(&shutdown.stopped), ["Helper", "Solo"]);
    assert_eq!(shutdown.failed.len(), 1);
    assert_eq!(shutdown.failed[0].0, ActivatorRef::of::<Stubborn>());
    assert_eq!(shutdown.failed[0].1.to_string(), "still busy");
    assert_eq!(registry.state_of::<Stubborn>(), Some(ActivationState::Failed));

    assert!(registry.shutdown().stopped.is_empty());
}

#[test]
fn test_registry_runs_once() {
    let harness = Harness::new();
    let mut registry = ActivatorRegistry::new();
    registry.register::<Gamma>();
    harness.start(&mut registry, &Overrides::new());

    let loader = ModuleLoader::new(&harness.store, &harness.catalog);
    let err = registry.start(&loader, &Overrides::new()).unwrap_err();
    assert!(matches!(err, ActivationError::InvalidState { state: ActivationState::Initialized, .. }));
    let _ = registry.shutdown();
}

#[test]
fn test_activator_configuration_is_resolved_through_the_loader() {
    let harness = Harness::new();
    let mut registry = ActivatorRegistry::new();
    registry.register::<Listener>();

    let report = harness.start(&mut registry, &Overrides::new());
    match report.failed.as_ref().unwrap() {
        ActivationError::ActivationFailed { source, .. } => {
            let load = source.downcast_ref::<LoadError>().unwrap();
            assert_eq!(load.key(), Some(&PropertyKey::new("net", "port")));
        },
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(registry.state_of::<Listener>(), Some(ActivationState::Failed));

    let mut registry = ActivatorRegistry::new();
    registry.register::<Listener>();
    harness.store.set_property("net", "port", "8080").unwrap();
    let overrides = Overrides::new().with(PropertyKey::new("net", "port"), "9090");

    assert!(harness.start(&mut registry, &overrides).is_success());
    assert_eq!(take_log(), ["listen 9090"]);
    let _ = registry.shutdown();
}

#[test]
fn test_configured_dependencies_reorder_the_plan() {
    let store = PropertyStore::builder().in_memory().build().unwrap();
    let mut registry = ActivatorRegistry::new();
    registry.register::<Solo>();
    registry.register::<Helper>();
    assert_eq!(names(&registry.plan().unwrap()), ["Solo", "Helper"]);

    store.set_property("activation", "Solo.dependencies", "Helper, ").unwrap();
    assert_eq!(registry.configure_dependencies(&store, "activation").unwrap(), 1);
    assert_eq!(registry.configure_dependencies(&store, "activation").unwrap(), 0);
    assert_eq!(names(&registry.plan().unwrap()), ["Helper", "Solo"]);

    let full_key = format!("{}.dependencies", ActivatorRef::of::<Helper>().name());
    store.set_property("activation", &full_key, "Solo").unwrap();
    assert_eq!(registry.configure_dependencies(&store, "activation").unwrap(), 1);
    assert!(matches!(registry.plan().unwrap_err(), ActivationError::DependencyCycle { .. }));
}

#[test]
fn test_unknown_configured_dependency_changes_nothing() {
    let store = PropertyStore::builder().in_memory().build().unwrap();
    let mut registry = ActivatorRegistry::new();
    registry.register::<Solo>();
    registry.register::<Helper>();

    store.set_property("activation", "Helper.dependencies", "Solo").unwrap();
    store.set_property("activation", "Solo.dependencies", "Ghost").unwrap();

    let err = registry.configure_dependencies(&store, "activation").unwrap_err();
    match err {
        ActivationError::UnknownDependency { activator, dependency, .. } => {
            assert!(activator.ends_with("Solo"));
            assert_eq!(dependency, "Ghost");
        },
        other => panic!("unexpected error: {other}"),
    }
    assert!(registry.records().iter().all(|record| record.dependencies.is_empty()));
}

#[test]
fn test_lifecycle_events_reach_the_event_bus() {
    let harness = Harness::new();
    let bus = EventBus::new();
    let mut rx = bus.subscribe::<LifecycleEvent>().unwrap();

    let mut registry = ActivatorRegistry::new().with_sink(bus.clone());
    registry.register::<Beta>();
    harness.start(&mut registry, &Overrides::new());
    let _ = registry.shutdown();

    let events: Vec<_> = rx.drain().iter().map(|event| (event.phase, event.state)).collect();
    assert_eq!(
        events,
        [
            (LifecyclePhase::Init, ActivationState::Initialized),
            (LifecyclePhase::Init, ActivationState::Initialized),
            (LifecyclePhase::Stop, ActivationState::Stopped),
            (LifecyclePhase::Stop, ActivationState::Stopped),
        ]
    );
}

#[test]
fn test_sinks_are_interchangeable() {
    fn notify_all(sinks: &[&dyn LifecycleSink]) {
        for sink in sinks {
            sink.notify(LifecycleEvent::succeeded("sink-check", LifecyclePhase::Init));
        }
    }

    let recording = RecordingSink::new();
    notify_all(&[&(), &EventBus::new(), &recording]);
    assert_eq!(recording.len(), 1);
}
