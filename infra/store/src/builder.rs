use crate::error::{StoreError, StoreErrorExt};
use crate::name::DomainName;
use crate::persist;
use crate::settings::StoreSettings;
use crate::store::{PropertyStore, StoreInner};
use anvil_domain::constants::CONFIG_DOMAIN_KEY;
use fxhash::FxHashMap;
use parking_lot::RwLock;
use private::Sealed;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use tracing::{debug, info};

/// Backing not chosen yet: defaults to the folder from the settings.
#[derive(Debug, Default)]
pub struct NoBacking;
/// Domain files live in an explicit folder.
#[derive(Debug)]
pub struct WithFolder(PathBuf);
/// No domain is ever backed by a file.
#[derive(Debug, Default)]
pub struct InMemory;

mod private {
    pub(super) trait Sealed {}
}
impl Sealed for NoBacking {}
impl Sealed for WithFolder {}
impl Sealed for InMemory {}

#[allow(private_bounds)]
#[derive(Debug, Default)]
pub struct PropertyStoreBuilder<S: Sealed = NoBacking> {
    state: S,
    settings: StoreSettings,
}

#[allow(private_bounds)]
impl<S: Sealed> PropertyStoreBuilder<S> {
    #[must_use = "Replaces the bootstrap settings"]
    pub fn settings(mut self, settings: StoreSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Reads the bootstrap settings from `ANVIL__*` environment variables.
    ///
    /// # Errors
    /// Returns [`StoreError::Settings`] on malformed variables.
    pub fn from_env(mut self) -> Result<Self, StoreError> {
        self.settings = StoreSettings::from_env()?;
        Ok(self)
    }

    #[must_use = "Sets the name of the default domain"]
    pub fn config_domain(mut self, name: impl Into<String>) -> Self {
        self.settings.config_domain = name.into();
        self
    }

    #[must_use = "Sets the file name of the default domain"]
    pub fn config_file_name(mut self, name: impl Into<String>) -> Self {
        self.settings.config_file_name = name.into();
        self
    }

    fn transition<N: Sealed>(self, state: N) -> PropertyStoreBuilder<N> {
        PropertyStoreBuilder { state, settings: self.settings }
    }

    fn assemble(self, persistent: bool) -> Result<PropertyStore, StoreError> {
        let default_domain = DomainName::try_from(self.settings.config_domain.as_str())
            .context("Invalid default domain name")?;

        let store = PropertyStore {
            inner: Arc::new(StoreInner {
                settings: self.settings,
                persistent,
                domains: RwLock::new(FxHashMap::default()),
                tmp_counter: AtomicU64::new(1),
            }),
        };

        store.ensure_domain(&default_domain);
        Ok(store)
    }
}

impl PropertyStoreBuilder<NoBacking> {
    #[must_use = "Creates a new store builder with default settings"]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the folder holding domain files.
    #[must_use = "Sets the folder holding domain files"]
    pub fn folder(self, path: impl Into<PathBuf>) -> PropertyStoreBuilder<WithFolder> {
        self.transition(WithFolder(path.into()))
    }

    #[must_use = "Keeps every domain in memory"]
    pub fn in_memory(self) -> PropertyStoreBuilder<InMemory> {
        self.transition(InMemory)
    }

    /// Builds a file-backed store rooted at the folder from the settings.
    ///
    /// # Errors
    /// See [`PropertyStoreBuilder::<WithFolder>::build`].
    pub fn build(self) -> Result<PropertyStore, StoreError> {
        let folder = self.settings.config_folder.clone();
        self.folder(folder).build()
    }
}

impl PropertyStoreBuilder<WithFolder> {
    /// Boots a file-backed store.
    ///
    /// 1. Removes temp files left by interrupted saves.
    /// 2. Reads `<folder>/<config file name>` if it exists. A `configDomain` entry in it
    ///    renames the default domain; the file stays its backing file.
    /// 3. Creates the default domain holding the file's entries. The folder itself is
    ///    only created on the first save.
    ///
    /// # Errors
    /// Returns [`StoreError::InvalidDomain`] for an invalid default domain name and
    /// [`StoreError::Malformed`] or [`StoreError::Io`] if the default file cannot be read.
    pub fn build(mut self) -> Result<PropertyStore, StoreError> {
        let folder = std::mem::take(&mut self.state.0);
        self.settings.config_folder.clone_from(&folder);
        persist::purge_tmp(&folder);

        let boot_file = folder.join(&self.settings.config_file_name);
        let boot_entries = persist::read_entries(&boot_file)?;
        if let Some(name) = boot_entries.as_ref().and_then(|entries| entries.get(CONFIG_DOMAIN_KEY)) {
            let name = name.trim();
            if name != self.settings.config_domain {
                debug!(from = %self.settings.config_domain, to = name, "Default domain renamed by boot file");
                self.settings.config_domain = name.to_owned();
            }
        }

        let store = self.assemble(true)?;
        let default_domain = store.default_domain().to_owned();
        let loaded = match (boot_entries, store.shared(&default_domain)) {
            (Some(entries), Some(shared)) => {
                PropertyStore::replace_entries(&shared, entries);
                true
            },
            _ => false,
        };

        info!(
            folder = %folder.display(),
            domain = %default_domain,
            loaded,
            "Property store bootstrapped"
        );
        Ok(store)
    }
}

impl PropertyStoreBuilder<InMemory> {
    /// Boots a store whose domains are never persisted.
    ///
    /// # Errors
    /// Returns [`StoreError::InvalidDomain`] for an invalid default domain name.
    pub fn build(self) -> Result<PropertyStore, StoreError> {
        let store = self.assemble(false)?;
        info!(domain = %store.default_domain(), "In-memory property store bootstrapped");
        Ok(store)
    }
}
