use anvil_kernel::prelude::*;
use anvil_kernel::{ConstructionStrategy, Visibility};
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

fn store() -> PropertyStore {
    let store = PropertyStore::builder().in_memory().build().unwrap();
    store.set_property("default", "intProp", "20").unwrap();
    store.set_property("default", "dblProp", "23.02").unwrap();
    store
}

fn load<T: Loadable>(store: &PropertyStore, overrides: &Overrides) -> Result<T, LoadError> {
    let catalog = ModuleCatalog::new();
    catalog.register::<T>();
    ModuleLoader::new(store, &catalog).load::<T>(overrides)
}

#[derive(Debug)]
struct Numbers {
    int_prop: i64,
    dbl_prop: f64,
}

impl Loadable for Numbers {
    fn describe() -> ModuleDescriptor {
        ModuleDescriptor::builder::<Self>()
            .loader(
                LoaderDescriptor::constructor("Numbers::new", |args| {
                    Ok(Numbers { int_prop: args.next()?, dbl_prop: args.next()? })
                })
                .param(PropertyDescriptor::new::<i64>("intProp"))
                .param(PropertyDescriptor::new::<f64>("dblProp")),
            )
            .build()
    }
}

#[test]
fn test_marked_constructor_receives_stored_values() {
    let numbers = load::<Numbers>(&store(), &Overrides::new()).unwrap();
    assert_eq!(numbers.int_prop, 20);
    assert!((numbers.dbl_prop - 23.02).abs() < f64::EPSILON);
}

#[test]
fn test_default_domain_keys_follow_a_renamed_default_domain() {
    let store = PropertyStore::builder().config_domain("main").in_memory().build().unwrap();
    store.set_property("main", "intProp", "7").unwrap();
    store.set_property("main", "dblProp", "1.5").unwrap();

    let numbers = load::<Numbers>(&store, &Overrides::new()).unwrap();
    assert_eq!(numbers.int_prop, 7);

    let overrides = Overrides::new().with(PropertyKey::new("main", "intProp"), "8");
    assert_eq!(load::<Numbers>(&store, &overrides).unwrap().int_prop, 8);
    assert!(!store.contains_domain("default"));
}

#[derive(Debug)]
struct NeedsMissing;

impl Loadable for NeedsMissing {
    fn describe() -> ModuleDescriptor {
        ModuleDescriptor::builder::<Self>()
            .loader(
                LoaderDescriptor::constructor("NeedsMissing::new", |args| {
                    let _: String = args.next()?;
                    Ok(NeedsMissing)
                })
                .param(PropertyDescriptor::new::<String>("missingProp").default_value("$NULL$")),
            )
            .build()
    }
}

#[test]
fn test_unset_property_without_default_is_unresolved() {
    let err = load::<NeedsMissing>(&store(), &Overrides::new()).unwrap_err();
    match err {
        LoadError::PropertyUnresolved { key, .. } => {
            assert_eq!(key, PropertyKey::in_default("missingProp"));
        },
        other => panic!("unexpected error: {other}"),
    }
}

static AMBIGUOUS_BUILT: AtomicUsize = AtomicUsize::new(0);

#[derive(Debug)]
struct Ambiguous;

impl Loadable for Ambiguous {
    fn describe() -> ModuleDescriptor {
        let build = |_: &mut anvil_kernel::Arguments| -> Result<Ambiguous, BoxError> {
            AMBIGUOUS_BUILT.fetch_add(1, Ordering::SeqCst);
            Ok(Ambiguous)
        };
        ModuleDescriptor::builder::<Self>()
            .loader(LoaderDescriptor::constructor("Ambiguous::first", build))
            .loader(LoaderDescriptor::constructor("Ambiguous::second", build))
            .build()
    }
}

#[test]
fn test_two_eligible_constructors_are_ambiguous() {
    let err = load::<Ambiguous>(&store(), &Overrides::new()).unwrap_err();
    match err {
        LoadError::AmbiguousLoader { candidates, .. } => {
            assert_eq!(candidates, vec!["Ambiguous::first", "Ambiguous::second"]);
        },
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(AMBIGUOUS_BUILT.load(Ordering::SeqCst), 0, "no instance may be built");
}

#[derive(Debug, PartialEq)]
struct OnlyPublic(&'static str);

impl Loadable for OnlyPublic {
    fn describe() -> ModuleDescriptor {
        ModuleDescriptor::builder::<Self>()
            .loader(LoaderDescriptor::constructor("OnlyPublic::public", |_| Ok(OnlyPublic("public"))))
            .loader(
                LoaderDescriptor::constructor("OnlyPublic::hidden", |_| Ok(OnlyPublic("hidden")))
                    .private(),
            )
            .build()
    }
}

#[test]
fn test_private_loaders_are_not_candidates() {
    assert_eq!(load::<OnlyPublic>(&store(), &Overrides::new()).unwrap(), OnlyPublic("public"));
    let descriptor = OnlyPublic::describe();
    let hidden = &descriptor.loaders()[1];
    assert_eq!(hidden.visibility(), Visibility::Private);
}

#[derive(Debug, Default, PartialEq)]
struct Plain {
    label: String,
}

impl Loadable for Plain {
    fn describe() -> ModuleDescriptor {
        ModuleDescriptor::builder::<Self>()
            .with_default()
            .field(PropertyDescriptor::new::<String>("label").default_value("plain"), |p, label| {
                p.label = label;
            })
            .build()
    }
}

#[test]
fn test_default_constructor_fallback_with_field_injection() {
    let store = store();
    let catalog = ModuleCatalog::new();
    catalog.register::<Plain>();
    let loader = ModuleLoader::new(&store, &catalog);

    assert_eq!(loader.strategy::<Plain>().unwrap(), ConstructionStrategy::DefaultConstructor);
    assert_eq!(loader.load::<Plain>(&Overrides::new()).unwrap().label, "plain");

    let overrides = Overrides::new().with_default("label", "overridden");
    assert_eq!(loader.load::<Plain>(&overrides).unwrap().label, "overridden");
}

#[derive(Debug)]
struct NoWayToBuild;

impl Loadable for NoWayToBuild {
    fn describe() -> ModuleDescriptor {
        ModuleDescriptor::builder::<Self>().build()
    }
}

#[test]
fn test_no_loader_and_no_default_constructor() {
    let err = load::<NoWayToBuild>(&store(), &Overrides::new()).unwrap_err();
    assert!(matches!(err, LoadError::NoLoaderFound { .. }), "{err}");
}

#[test]
fn test_unregistered_module_is_unknown() {
    let store = store();
    let catalog = ModuleCatalog::new();
    let err = ModuleLoader::new(&store, &catalog).load::<Numbers>(&Overrides::new()).unwrap_err();
    assert!(matches!(err, LoadError::UnknownModule { .. }), "{err}");
}

#[derive(Debug)]
struct Connection {
    url: String,
}

struct ConnectionFactory;

impl Loadable for Connection {
    fn describe() -> ModuleDescriptor {
        ModuleDescriptor::builder::<Self>().provided_by::<ConnectionFactory>().build()
    }
}

impl Loadable for ConnectionFactory {
    fn describe() -> ModuleDescriptor {
        ModuleDescriptor::builder::<Self>()
            .loader(
                LoaderDescriptor::factory("ConnectionFactory::open", |args| {
                    let host: String = args.next()?;
                    let port: u16 = args.next()?;
                    Ok(Connection { url: format!("tcp://{host}:{port}") })
                })
                .param(PropertyDescriptor::new::<String>("host").domain("db").default_value("localhost"))
                .param(PropertyDescriptor::new::<u16>("port").domain("db").default_value("5432")),
            )
            .build()
    }
}

#[test]
fn test_provider_factory_builds_the_module() {
    let store = store();
    let catalog = ModuleCatalog::new();
    catalog.register::<Connection>();
    let loader = ModuleLoader::new(&store, &catalog);

    match loader.strategy::<Connection>().unwrap() {
        ConstructionStrategy::MarkedFactory { loader, params, .. } => {
            assert_eq!(loader, "ConnectionFactory::open");
            assert_eq!(params, vec![PropertyKey::new("db", "host"), PropertyKey::new("db", "port")]);
        },
        other => panic!("unexpected strategy: {other:?}"),
    }

    store.set_property("db", "host", "db.internal").unwrap();
    let conn = loader.load::<Connection>(&Overrides::new()).unwrap();
    assert_eq!(conn.url, "tcp://db.internal:5432");
}

#[derive(Debug)]
struct Service {
    conn: Connection,
    retries: u8,
}

impl Loadable for Service {
    fn describe() -> ModuleDescriptor {
        ModuleDescriptor::builder::<Self>()
            .loader(
                LoaderDescriptor::constructor("Service::new", |args| {
                    Ok(Service { conn: args.next()?, retries: args.next()? })
                })
                .param(PropertyDescriptor::module::<Connection>("connection"))
                .param(PropertyDescriptor::new::<u8>("retries").default_value("3")),
            )
            .build()
    }
}

#[test]
fn test_load_sentinel_builds_nested_modules_with_overrides() {
    let store = store();
    let overrides = Overrides::new().with(PropertyKey::new("db", "port"), "6543");

    let service = load::<Service>(&store, &overrides).unwrap();
    assert_eq!(service.conn.url, "tcp://localhost:6543");
    assert_eq!(service.retries, 3);
}

#[test]
fn test_module_properties_cannot_be_parsed_from_strings() {
    let store = store();
    store.set_property("default", "connection", "tcp://elsewhere").unwrap();

    let err = load::<Service>(&store, &Overrides::new()).unwrap_err();
    assert!(matches!(err, LoadError::PropertyConversion { .. }), "{err}");
}

#[derive(Debug)]
struct Chicken(#[allow(dead_code)] Box<Egg>);
#[derive(Debug)]
struct Egg(#[allow(dead_code)] Box<Chicken>);

impl Loadable for Chicken {
    fn describe() -> ModuleDescriptor {
        ModuleDescriptor::builder::<Self>()
            .loader(
                LoaderDescriptor::constructor("Chicken::hatch", |args| Ok(Chicken(Box::new(args.next()?))))
                    .param(PropertyDescriptor::module::<Egg>("egg")),
            )
            .build()
    }
}

impl Loadable for Egg {
    fn describe() -> ModuleDescriptor {
        ModuleDescriptor::builder::<Self>()
            .loader(
                LoaderDescriptor::constructor("Egg::lay", |args| Ok(Egg(Box::new(args.next()?))))
                    .param(PropertyDescriptor::module::<Chicken>("chicken")),
            )
            .build()
    }
}

#[test]
fn test_recursive_load_cycle_reports_the_path() {
    let err = load::<Chicken>(&store(), &Overrides::new()).unwrap_err();
    match err {
        LoadError::LoadCycle { path, .. } => {
            assert_eq!(path.len(), 3);
            assert!(path[0].ends_with("Chicken"));
            assert!(path[1].ends_with("Egg"));
            assert!(path[2].ends_with("Chicken"));
        },
        other => panic!("unexpected error: {other}"),
    }
}

#[derive(Debug)]
struct Flaky;

impl Loadable for Flaky {
    fn describe() -> ModuleDescriptor {
        ModuleDescriptor::builder::<Self>()
            .loader(LoaderDescriptor::constructor("Flaky::new", |_| -> Result<Flaky, BoxError> {
                Err("disk on fire".into())
            }))
            .build()
    }
}

#[test]
fn test_construction_failure_is_wrapped_with_the_type() {
    let err = load::<Flaky>(&store(), &Overrides::new()).unwrap_err();
    match &err {
        LoadError::ModuleConstruction { type_name, source, .. } => {
            assert!(type_name.ends_with("Flaky"));
            assert_eq!(source.to_string(), "disk on fire");
        },
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("Flaky::new"));
}

#[test]
fn test_module_domains_are_loaded_and_seeded() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("db.config"), "host=db.example\n").unwrap();
    let store = PropertyStore::builder().folder(temp.path()).build().unwrap();

    let seeded = store.load_domains_of::<ConnectionFactory>().unwrap();
    assert_eq!(seeded, 1);
    assert_eq!(store.get_property("db", "host").unwrap(), "db.example");
    assert_eq!(store.get_property("db", "port").unwrap(), "5432");
    assert!(store.is_dirty("db"));
}

#[test]
fn test_default_domain_defaults_seed_the_configured_default_domain() {
    let store = PropertyStore::builder().config_domain("main").in_memory().build().unwrap();

    assert_eq!(store.load_domains_of::<Service>().unwrap(), 1);
    assert_eq!(store.get_property("main", "retries").unwrap(), "3");
    assert!(!store.contains_domain("default"));
}

#[test]
fn test_shared_catalog_loads_each_registered_module() {
    let store = store();
    let catalog = ModuleCatalog::new();
    assert_eq!(catalog.register::<Numbers>(), 1);
    assert_eq!(catalog.register::<Service>(), 3);

    let loader = ModuleLoader::new(&store, &catalog);
    assert_eq!(loader.load::<Numbers>(&Overrides::new()).unwrap().int_prop, 20);
    let service = loader.load::<Service>(&Overrides::new()).unwrap();
    assert_eq!((service.conn.url.as_str(), service.retries), ("tcp://localhost:5432", 3));
}
