//! Facade crate for Anvil.
//! Composes the property store, the module catalog, the activator registry and the
//! event bus behind one handle. Keep this crate thin: it wires other crates together
//! and owns no loading or ordering logic of its own.
//!
//! ## Usage
//! ```rust
//! use anvil::prelude::*;
//!
//! #[derive(Default)]
//! struct Cache {
//!     size: u32,
//! }
//!
//! impl Loadable for Cache {
//!     fn describe() -> ModuleDescriptor {
//!         ModuleDescriptor::builder::<Self>()
//!             .with_default()
//!             .field(PropertyDescriptor::new::<u32>("size").domain("cache").default_value("64"), |c, size| {
//!                 c.size = size;
//!             })
//!             .build()
//!     }
//! }
//!
//! impl Activator for Cache {
//!     fn init(&mut self) -> Result<(), BoxError> {
//!         Ok(())
//!     }
//! }
//!
//! fn main() -> Result<(), AnvilError> {
//!     let store = PropertyStore::builder().in_memory().build()?;
//!     let mut anvil = Anvil::builder().store(store).build();
//!
//!     anvil.register_activator::<Cache>()?;
//!     assert!(anvil.start()?.is_success());
//!     assert_eq!(anvil.load::<Cache>()?.size, 64);
//!     assert!(anvil.shutdown().is_clean());
//!     Ok(())
//! }
//! ```

mod error;
pub mod prelude;

pub use anvil_activation as activation;
pub use anvil_domain as domain;
pub use anvil_event_bus as events;
pub use anvil_kernel as kernel;
pub use anvil_store as store;

pub use crate::error::{AnvilError, AnvilErrorExt};

use anvil_activation::{Activator, ActivationReport, ActivatorRef, ActivatorRegistry, ShutdownReport};
use anvil_event_bus::EventBus;
use anvil_kernel::{DescriptorProvider, Loadable, ModuleCatalog, ModuleDomains, ModuleLoader, Overrides};
use anvil_store::PropertyStore;
use std::any::TypeId;
use tracing::{debug, info};

/// Builder state before a store is supplied.
#[derive(Debug)]
pub struct NoStore;

/// Builder state holding the store.
#[derive(Debug)]
pub struct WithStore(PropertyStore);

#[derive(Debug)]
pub struct AnvilBuilder<S> {
    store: S,
    events: Option<EventBus>,
    overrides: Overrides,
    dependency_domain: Option<String>,
}

impl AnvilBuilder<NoStore> {
    #[must_use]
    pub fn new() -> Self {
        Self { store: NoStore, events: None, overrides: Overrides::new(), dependency_domain: None }
    }

    #[must_use = "Sets the property store"]
    pub fn store(self, store: PropertyStore) -> AnvilBuilder<WithStore> {
        AnvilBuilder {
            store: WithStore(store),
            events: self.events,
            overrides: self.overrides,
            dependency_domain: self.dependency_domain,
        }
    }
}

impl Default for AnvilBuilder<NoStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> AnvilBuilder<S> {
    /// Shares an existing bus; lifecycle events are published on it.
    #[must_use = "Sets the event bus"]
    pub fn events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// Overrides applied to every load, activators included.
    #[must_use = "Sets the load overrides"]
    pub fn overrides(mut self, overrides: Overrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Domain holding `<activator>.dependencies` entries; the store's default domain
    /// when unset.
    #[must_use = "Sets the dependency domain"]
    pub fn dependency_domain(mut self, domain: impl Into<String>) -> Self {
        self.dependency_domain = Some(domain.into());
        self
    }
}

impl AnvilBuilder<WithStore> {
    #[must_use]
    pub fn build(self) -> Anvil {
        let WithStore(store) = self.store;
        let events = self.events.unwrap_or_default();
        let dependency_domain = self.dependency_domain.unwrap_or_else(|| store.default_domain().to_owned());

        debug!(persistent = store.is_persistent(), dependency_domain = %dependency_domain, "Anvil assembled");
        Anvil {
            catalog: ModuleCatalog::new(),
            registry: ActivatorRegistry::new().with_sink(events.clone()),
            store,
            events,
            overrides: self.overrides,
            dependency_domain,
        }
    }
}

/// Store, catalog, registry and bus wired together.
#[derive(Debug)]
pub struct Anvil {
    store: PropertyStore,
    catalog: ModuleCatalog,
    registry: ActivatorRegistry,
    events: EventBus,
    overrides: Overrides,
    dependency_domain: String,
}

impl Anvil {
    #[must_use]
    pub fn builder() -> AnvilBuilder<NoStore> {
        AnvilBuilder::new()
    }

    #[must_use]
    pub const fn store(&self) -> &PropertyStore {
        &self.store
    }

    #[must_use]
    pub const fn catalog(&self) -> &ModuleCatalog {
        &self.catalog
    }

    #[must_use]
    pub const fn registry(&self) -> &ActivatorRegistry {
        &self.registry
    }

    #[must_use]
    pub const fn events(&self) -> &EventBus {
        &self.events
    }

    #[must_use]
    pub const fn overrides(&self) -> &Overrides {
        &self.overrides
    }

    /// Registers `T` in the catalog, then seeds the declared defaults of the domains it
    /// reads. Domains not yet in memory are loaded first; loaded ones keep their entries.
    /// Returns how many descriptors were added.
    ///
    /// # Errors
    /// [`AnvilError::Store`] if a domain cannot be loaded.
    pub fn register_module<T: Loadable>(&self) -> Result<usize, AnvilError> {
        let added = self.catalog.register::<T>();
        self.seed_domains(TypeId::of::<T>())?;
        Ok(added)
    }

    /// Registers `A` (and the activators it depends on) in the registry and their
    /// modules in the catalog. Returns how many activators were added.
    ///
    /// # Errors
    /// [`AnvilError::Store`] if a domain cannot be loaded.
    pub fn register_activator<A: Activator>(&mut self) -> Result<usize, AnvilError> {
        let known = self.registry.len();
        let added = self.registry.register::<A>();
        self.registry.register_modules(&self.catalog);
        for activator in self.registry.activators().skip(known) {
            self.seed_domains(activator.module_id())?;
        }
        Ok(added)
    }

    /// Loads `T` with the configured overrides.
    ///
    /// # Errors
    /// [`AnvilError::Load`] with the originating loader error.
    pub fn load<T: Loadable>(&self) -> Result<T, AnvilError> {
        self.load_with::<T>(&Overrides::new())
    }

    /// Loads `T` with `overrides` layered over the configured ones.
    ///
    /// # Errors
    /// [`AnvilError::Load`] with the originating loader error.
    pub fn load_with<T: Loadable>(&self, overrides: &Overrides) -> Result<T, AnvilError> {
        self.catalog.register::<T>();
        let mut merged = self.overrides.clone();
        merged.merge(overrides);

        let loader = ModuleLoader::new(&self.store, &self.catalog);
        Ok(loader.load::<T>(&merged)?)
    }

    /// Applies configured dependencies and returns the activation order without running
    /// anything.
    ///
    /// # Errors
    /// [`AnvilError::Activation`] for dependency cycles or unknown configured dependencies.
    pub fn plan(&mut self) -> Result<Vec<ActivatorRef>, AnvilError> {
        self.configure_dependencies()?;
        Ok(self.registry.plan()?)
    }

    /// Applies configured dependencies and runs every registered activator.
    ///
    /// # Errors
    /// [`AnvilError::Activation`] for dependency cycles, unknown configured
    /// dependencies or a second start. Individual activation failures are reported in
    /// the returned [`ActivationReport`].
    pub fn start(&mut self) -> Result<ActivationReport, AnvilError> {
        self.configure_dependencies()?;

        let loader = ModuleLoader::new(&self.store, &self.catalog);
        let report = self.registry.start(&loader, &self.overrides)?;
        info!(%report, "Activation finished");
        Ok(report)
    }

    /// Stops the initialized activators in reverse order.
    pub fn shutdown(&mut self) -> ShutdownReport {
        let report = self.registry.shutdown();
        info!(%report, "Shutdown finished");
        report
    }

    /// Saves every dirty domain; returns the saved domain names.
    ///
    /// # Errors
    /// [`AnvilError::Store`] on the first failed write.
    pub fn save(&self) -> Result<Vec<String>, AnvilError> {
        Ok(self.store.save_all()?)
    }

    fn configure_dependencies(&mut self) -> Result<(), AnvilError> {
        let configured = self.registry.configure_dependencies(&self.store, &self.dependency_domain)?;
        if configured > 0 {
            debug!(configured, domain = %self.dependency_domain, "Configured dependencies applied");
        }
        Ok(())
    }

    fn seed_domains(&self, type_id: TypeId) -> Result<(), AnvilError> {
        let Some(descriptor) = self.catalog.descriptor(type_id) else {
            return Ok(());
        };
        self.store.seed_domains_for(&descriptor)?;

        if let Some(provider) = descriptor.provider().and_then(|id| self.catalog.descriptor(id)) {
            self.store.seed_domains_for(&provider)?;
        }
        Ok(())
    }
}
