use anvil::prelude::*;
use tempfile::TempDir;

#[derive(Debug, Default)]
struct Pool {
    size: u32,
    host: String,
}

impl Loadable for Pool {
    fn describe() -> ModuleDescriptor {
        ModuleDescriptor::builder::<Self>()
            .with_default()
            .field(PropertyDescriptor::new::<u32>("size").domain("db").default_value("8"), |pool, size| {
                pool.size = size;
            })
            .field(PropertyDescriptor::new::<String>("host").domain("db").default_value("localhost"), |pool, host| {
                pool.host = host;
            })
            .build()
    }
}

#[derive(Default)]
struct Migrations;

impl Loadable for Migrations {
    fn describe() -> ModuleDescriptor {
        ModuleDescriptor::builder::<Self>().with_default().build()
    }
}

impl Activator for Migrations {
    fn init(&mut self) -> Result<(), BoxError> {
        Ok(())
    }
}

#[derive(Default)]
struct Server;

impl Loadable for Server {
    fn describe() -> ModuleDescriptor {
        ModuleDescriptor::builder::<Self>().with_default().build()
    }
}

impl Activator for Server {
    fn init(&mut self) -> Result<(), BoxError> {
        Ok(())
    }
}

fn persistent(temp: &TempDir) -> Anvil {
    let store = PropertyStore::builder().folder(temp.path()).build().unwrap();
    Anvil::builder().store(store).build()
}

#[test]
fn test_registered_module_defaults_are_seeded_and_saved() {
    let temp = TempDir::new().unwrap();
    let anvil = persistent(&temp);

    assert_eq!(anvil.register_module::<Pool>().unwrap(), 1);
    assert_eq!(anvil.store().get_property("db", "size").unwrap(), "8");
    assert_eq!(anvil.save().unwrap(), ["db"]);
    assert!(temp.path().join("db.config").exists());

    let reopened = persistent(&temp);
    reopened.store().set_property("db", "size", "32").unwrap();
    reopened.store().load_domain("db").unwrap();
    assert_eq!(reopened.load::<Pool>().unwrap().size, 8);
}

#[test]
fn test_load_with_layers_overrides() {
    let store = PropertyStore::builder().in_memory().build().unwrap();
    store.set_property("db", "host", "db.internal").unwrap();
    let anvil = Anvil::builder()
        .store(store)
        .overrides(Overrides::new().with(PropertyKey::new("db", "size"), "16"))
        .build();

    let pool = anvil.load::<Pool>().unwrap();
    assert_eq!((pool.size, pool.host.as_str()), (16, "db.internal"));

    let call = Overrides::new().with(PropertyKey::new("db", "size"), "64");
    assert_eq!(anvil.load_with::<Pool>(&call).unwrap().size, 64);
}

#[test]
fn test_load_errors_keep_their_origin() {
    let store = PropertyStore::builder().in_memory().build().unwrap();
    store.set_property("db", "size", "many").unwrap();
    let anvil = Anvil::builder().store(store).build();

    match anvil.load::<Pool>().unwrap_err() {
        AnvilError::Load { source: LoadError::PropertyConversion { raw, .. }, .. } => assert_eq!(raw, "many"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_start_applies_configured_dependencies_and_publishes_events() {
    let store = PropertyStore::builder().in_memory().build().unwrap();
    store.set_property("default", "Migrations.dependencies", "Server").unwrap();

    let bus = EventBus::new();
    let mut rx = bus.subscribe::<LifecycleEvent>().unwrap();
    let mut anvil = Anvil::builder().store(store).events(bus).build();

    anvil.register_activator::<Migrations>().unwrap();
    anvil.register_activator::<Server>().unwrap();

    let report = anvil.start().unwrap();
    let order: Vec<_> = report.initialized.iter().map(ActivatorRef::short_name).collect();
    assert_eq!(order, ["Server", "Migrations"]);

    assert!(anvil.shutdown().is_clean());
    let events = rx.drain();
    assert_eq!(events.len(), 4);
    assert!(events[0].activator.ends_with("Server"));

    assert!(matches!(
        anvil.start().unwrap_err(),
        AnvilError::Activation { source: ActivationError::InvalidState { .. }, .. }
    ));
}

#[test]
fn test_custom_dependency_domain() {
    let store = PropertyStore::builder().in_memory().build().unwrap();
    store.set_property("boot", "Server.dependencies", "Nobody").unwrap();
    let mut anvil = Anvil::builder().store(store).dependency_domain("boot").build();
    anvil.register_activator::<Server>().unwrap();

    assert!(matches!(
        anvil.start().unwrap_err(),
        AnvilError::Activation { source: ActivationError::UnknownDependency { .. }, .. }
    ));
    assert_eq!(anvil.registry().state_of::<Server>(), Some(ActivationState::Pending));
}

#[test]
fn test_plan_orders_without_running() {
    let store = PropertyStore::builder().in_memory().build().unwrap();
    store.set_property("default", "Migrations.dependencies", "Server").unwrap();
    let mut anvil = Anvil::builder().store(store).build();
    anvil.register_activator::<Migrations>().unwrap();
    anvil.register_activator::<Server>().unwrap();

    let plan: Vec<_> = anvil.plan().unwrap().iter().map(ActivatorRef::short_name).collect();
    assert_eq!(plan, ["Server", "Migrations"]);
    assert_eq!(anvil.registry().state_of::<Server>(), Some(ActivationState::Pending));
    assert_eq!(anvil.start().unwrap().initialized.len(), 2);
}

#[derive(Default)]
struct PoolWarmer;

impl Loadable for PoolWarmer {
    fn describe() -> ModuleDescriptor {
        ModuleDescriptor::builder::<Self>()
            .with_default()
            .property(PropertyDescriptor::new::<u32>("size").domain("db").default_value("8"))
            .build()
    }
}

impl Activator for PoolWarmer {
    fn init(&mut self) -> Result<(), BoxError> {
        Ok(())
    }
}

#[test]
fn test_later_registrations_keep_unsaved_writes() {
    let temp = TempDir::new().unwrap();
    let mut anvil = persistent(&temp);

    anvil.register_activator::<PoolWarmer>().unwrap();
    assert_eq!(anvil.save().unwrap(), ["db"]);
    anvil.store().set_property("db", "size", "64").unwrap();

    anvil.register_activator::<Server>().unwrap();
    anvil.register_module::<Pool>().unwrap();
    assert_eq!(anvil.store().get_property("db", "size").unwrap(), "64");
    assert_eq!(anvil.store().get_property("db", "host").unwrap(), "localhost");
    assert!(anvil.store().is_dirty("db"));
}
