//! The shared property store.
//!
//! [`PropertyStore`] maps domain names to string-valued entries. Every domain sits
//! behind its own lock, so readers of one domain never wait on writers of another;
//! the domain table itself is only write-locked when a domain is created.

use crate::builder::{NoBacking, PropertyStoreBuilder};
use crate::domain::Domain;
use crate::error::StoreError;
use crate::name::{DomainName, validate_key};
use crate::persist;
use crate::settings::StoreSettings;
use crate::value::FromProperty;
use anvil_domain::PropertyKey;
use anvil_domain::constants::{CONFIG_FILE_NAME_KEY, CONFIG_FOLDER_KEY, DEFAULT_CONFIG_DOMAIN};
use fxhash::FxHashMap;
use parking_lot::RwLock;
use std::ops::Deref;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use tracing::{debug, trace};

#[derive(Debug, Default)]
pub(crate) struct DomainState {
    pub(crate) entries: FxHashMap<String, String>,
    pub(crate) dirty: bool,
    pub(crate) backing_path: Option<PathBuf>,
}

pub(crate) type SharedDomain = Arc<RwLock<DomainState>>;

/// The internal shared state of a [`PropertyStore`].
#[derive(Debug)]
pub struct StoreInner {
    /// Bootstrap settings the store was built with.
    pub(crate) settings: StoreSettings,
    /// `false` for purely in-memory stores; no domain gets a backing file then.
    pub(crate) persistent: bool,
    pub(crate) domains: RwLock<FxHashMap<DomainName, SharedDomain>>,
    pub(crate) tmp_counter: AtomicU64,
}

/// A thread-safe handle to the property store.
///
/// The handle is reference-counted and cheap to clone; all clones see the same domains.
///
/// ```rust
/// use anvil_store::{PropertyStore, StoreError};
///
/// fn main() -> Result<(), StoreError> {
///     let store = PropertyStore::builder().in_memory().build()?;
///
///     store.set_property("default", "intProp", "20")?;
///     let port: i32 = store.get_as("default", "intProp")?;
///     assert_eq!(port, 20);
///
///     let net = store.create_domain("net")?;
///     net.set("timeout", 30)?;
///     assert!(net.is_dirty());
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct PropertyStore {
    pub(crate) inner: Arc<StoreInner>,
}

impl Deref for PropertyStore {
    type Target = StoreInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl StoreInner {
    /// Bootstrap settings the store was built with.
    #[must_use]
    pub const fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    /// Whether domains of this store are backed by files.
    #[must_use]
    pub const fn is_persistent(&self) -> bool {
        self.persistent
    }
}

impl PropertyStore {
    #[must_use = "The store is not initialized until you call .build()"]
    pub fn builder() -> PropertyStoreBuilder<NoBacking> {
        PropertyStoreBuilder::new()
    }

    /// Name of the default domain, the one holding the well-known keys.
    #[must_use]
    pub fn default_domain(&self) -> &str {
        &self.settings.config_domain
    }

    /// Maps the `"default"` alias used by property keys onto [`Self::default_domain`];
    /// other names are returned unchanged.
    #[must_use]
    pub fn resolve_domain<'a>(&'a self, domain: &'a str) -> &'a str {
        if domain == DEFAULT_CONFIG_DOMAIN { self.default_domain() } else { domain }
    }

    /// Creates `name` if it does not exist yet and returns a view of it.
    ///
    /// Calling this for an existing domain keeps its entries untouched.
    ///
    /// # Errors
    /// Returns [`StoreError::InvalidDomain`] if the name is not a valid domain name.
    pub fn create_domain<N>(&self, name: N) -> Result<Domain, StoreError>
    where
        N: TryInto<DomainName, Error = StoreError>,
    {
        let name = name.try_into()?;
        self.ensure_domain(&name);
        Ok(Domain::new(self.clone(), name))
    }

    /// A view of an existing domain.
    #[must_use]
    pub fn domain(&self, name: &str) -> Option<Domain> {
        let name = self.domains.read().get_key_value(name).map(|(key, _)| key.clone())?;
        Some(Domain::new(self.clone(), name))
    }

    /// Sorted names of all domains.
    #[must_use]
    pub fn domain_names(&self) -> Vec<String> {
        let mut names: Vec<String> =
            self.domains.read().keys().map(|name| name.as_str().to_owned()).collect();
        names.sort_unstable();
        names
    }

    #[must_use]
    pub fn contains_domain(&self, name: &str) -> bool {
        self.domains.read().contains_key(name)
    }

    /// The raw value at `domain:key`, if any.
    #[must_use]
    pub fn find_property(&self, domain: &str, key: &str) -> Option<String> {
        self.shared(domain)?.read().entries.get(key).cloned()
    }

    /// The raw value at `domain:key`.
    ///
    /// # Errors
    /// Returns [`StoreError::PropertyNotFound`] if the domain or the key is absent.
    pub fn get_property(&self, domain: &str, key: &str) -> Result<String, StoreError> {
        self.find_property(domain, key).ok_or_else(|| StoreError::PropertyNotFound {
            key: PropertyKey::new(domain.to_owned(), key.to_owned()),
            context: None,
        })
    }

    /// The value at `domain:key` coerced into `T`.
    ///
    /// # Errors
    /// Returns [`StoreError::PropertyNotFound`] if absent, or [`StoreError::Conversion`]
    /// if the stored string is not a valid `T`.
    pub fn get_as<T: FromProperty>(&self, domain: &str, key: &str) -> Result<T, StoreError> {
        let raw = self.get_property(domain, key)?;
        T::from_property(&raw).map_err(|source| StoreError::Conversion {
            key: PropertyKey::new(domain.to_owned(), key.to_owned()),
            raw,
            source,
            context: None,
        })
    }

    /// Stores `value` at `domain:key`, creating the domain if needed, and marks it dirty.
    ///
    /// Returns the previous value.
    ///
    /// # Errors
    /// Returns [`StoreError::InvalidDomain`] or [`StoreError::InvalidKey`] on invalid names.
    pub fn set_property(
        &self,
        domain: &str,
        key: &str,
        value: impl Into<String>,
    ) -> Result<Option<String>, StoreError> {
        let name = DomainName::try_from(domain)?;
        validate_key(key)?;

        let shared = self.ensure_domain(&name);
        let mut state = shared.write();
        let previous = state.entries.insert(key.to_owned(), value.into());
        state.dirty = true;

        trace!(domain = %name, key, "Property set");
        Ok(previous)
    }

    /// Removes `domain:key`, marking the domain dirty if something was removed.
    #[must_use = "Returns the removed value"]
    pub fn remove_property(&self, domain: &str, key: &str) -> Option<String> {
        let shared = self.shared(domain)?;
        let mut state = shared.write();
        let removed = state.entries.remove(key);
        if removed.is_some() {
            state.dirty = true;
        }
        removed
    }

    /// Whether `domain` has unsaved changes. Unknown domains are never dirty.
    #[must_use]
    pub fn is_dirty(&self, domain: &str) -> bool {
        self.shared(domain).is_some_and(|shared| shared.read().dirty)
    }

    /// The file backing `domain`, if the store is persistent and the domain exists.
    #[must_use]
    pub fn backing_path(&self, domain: &str) -> Option<PathBuf> {
        self.shared(domain)?.read().backing_path.clone()
    }

    /// Points `domain` at another file. The next save writes there.
    ///
    /// # Errors
    /// Returns [`StoreError::DomainNotFound`] if the domain does not exist.
    pub fn set_backing_path(&self, domain: &str, path: impl Into<PathBuf>) -> Result<(), StoreError> {
        let shared = self.require(domain)?;
        let path = path.into();
        debug!(domain, path = %path.display(), "Backing path changed");
        shared.write().backing_path = Some(path);
        Ok(())
    }

    /// Replaces the entries of `name` with the contents of its backing file.
    ///
    /// The domain is created if absent. Returns `Ok(false)` without touching the
    /// entries when there is no backing file (in-memory store or file not yet written).
    ///
    /// # Errors
    /// Returns [`StoreError::Malformed`] or [`StoreError::Io`] if the file cannot be read.
    pub fn load_domain(&self, name: &str) -> Result<bool, StoreError> {
        let name = DomainName::try_from(name)?;
        let shared = self.ensure_domain(&name);

        let Some(path) = shared.read().backing_path.clone() else {
            return Ok(false);
        };

        let Some(entries) = persist::read_entries(&path)? else {
            debug!(domain = %name, path = %path.display(), "No domain file, keeping entries");
            return Ok(false);
        };

        debug!(domain = %name, path = %path.display(), count = entries.len(), "Domain loaded");
        Self::replace_entries(&shared, entries);
        Ok(true)
    }

    /// Loads `name` and seeds every key that is still absent from `defaults`.
    ///
    /// Returns the number of seeded keys; seeding marks the domain dirty.
    ///
    /// # Errors
    /// Propagates [`PropertyStore::load_domain`] failures and invalid keys.
    pub fn load_domain_with_defaults<I, K, V>(&self, name: &str, defaults: I) -> Result<usize, StoreError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let defaults = collect_defaults(defaults)?;
        self.load_domain(name)?;
        self.seed_absent(name, defaults)
    }

    /// Like [`PropertyStore::load_domain_with_defaults`], but a domain already held in
    /// memory is not reloaded: its entries, unsaved writes included, are kept and only
    /// absent keys are seeded.
    ///
    /// # Errors
    /// Propagates [`PropertyStore::load_domain`] failures and invalid keys.
    pub fn seed_domain<I, K, V>(&self, name: &str, defaults: I) -> Result<usize, StoreError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let defaults = collect_defaults(defaults)?;
        if self.shared(name).is_none() {
            self.load_domain(name)?;
        }
        self.seed_absent(name, defaults)
    }

    fn seed_absent(&self, name: &str, defaults: Vec<(String, String)>) -> Result<usize, StoreError> {
        let shared = self.require(name)?;
        let mut state = shared.write();

        let mut seeded = 0;
        for (key, value) in defaults {
            if !state.entries.contains_key(&key) {
                state.entries.insert(key, value);
                seeded += 1;
            }
        }
        if seeded > 0 {
            state.dirty = true;
        }

        debug!(domain = name, seeded, "Domain defaults seeded");
        Ok(seeded)
    }

    /// Writes `name` to its backing file if it is dirty.
    ///
    /// Returns `Ok(false)` when nothing was written: the domain was clean or the store
    /// is in-memory (the domain then stays dirty).
    ///
    /// # Errors
    /// Returns [`StoreError::DomainNotFound`] for unknown domains and [`StoreError::Io`]
    /// if the file cannot be written.
    pub fn save_domain(&self, name: &str) -> Result<bool, StoreError> {
        let shared = self.require(name)?;

        // Exclusive for the whole write so concurrent sets cannot be lost between
        // rendering and clearing the flag.
        let mut state = shared.write();
        if !state.dirty {
            return Ok(false);
        }
        let Some(path) = state.backing_path.clone() else {
            trace!(domain = name, "In-memory domain, nothing to save");
            return Ok(false);
        };

        let rendered = persist::render(name, &state.entries);
        persist::write_atomic(&path, rendered.as_bytes(), &self.tmp_counter)?;
        state.dirty = false;

        debug!(domain = name, path = %path.display(), count = state.entries.len(), "Domain saved");
        Ok(true)
    }

    /// Saves every dirty domain; returns the names that were written.
    ///
    /// # Errors
    /// Stops at the first domain that fails to save.
    pub fn save_all(&self) -> Result<Vec<String>, StoreError> {
        let mut saved = Vec::new();
        for name in self.domain_names() {
            if self.save_domain(&name)? {
                saved.push(name);
            }
        }
        Ok(saved)
    }

    pub(crate) fn shared(&self, domain: &str) -> Option<SharedDomain> {
        self.domains.read().get(domain).cloned()
    }

    pub(crate) fn require(&self, domain: &str) -> Result<SharedDomain, StoreError> {
        self.shared(domain)
            .ok_or_else(|| StoreError::DomainNotFound { domain: domain.to_owned(), context: None })
    }

    pub(crate) fn replace_entries(shared: &SharedDomain, entries: FxHashMap<String, String>) {
        let mut state = shared.write();
        state.entries = entries;
        state.dirty = false;
    }

    pub(crate) fn ensure_domain(&self, name: &DomainName) -> SharedDomain {
        if let Some(shared) = self.shared(name.as_str()) {
            return shared;
        }

        // Computed before taking the table lock: it reads the default domain.
        let backing_path = self.derive_backing_path(name.as_str());

        let mut domains = self.domains.write();
        Arc::clone(domains.entry(name.clone()).or_insert_with(|| {
            debug!(domain = %name, path = ?backing_path, "Domain created");
            Arc::new(RwLock::new(DomainState { backing_path, ..DomainState::default() }))
        }))
    }

    /// `<configFolder>/<configFileName>` for the default domain and
    /// `<configFolder>/<name>.config` for all others. Entries stored in the default
    /// domain take precedence over the bootstrap settings.
    fn derive_backing_path(&self, name: &str) -> Option<PathBuf> {
        if !self.persistent {
            return None;
        }

        let defaults = self.default_domain();
        let folder = self
            .find_property(defaults, CONFIG_FOLDER_KEY)
            .map_or_else(|| self.settings.config_folder.clone(), PathBuf::from);
        let file_name = self
            .find_property(defaults, CONFIG_FILE_NAME_KEY)
            .unwrap_or_else(|| self.settings.config_file_name.clone());

        Some(self.settings.domain_file(&folder, name, &file_name))
    }
}

fn collect_defaults<I, K, V>(defaults: I) -> Result<Vec<(String, String)>, StoreError>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let defaults: Vec<(String, String)> =
        defaults.into_iter().map(|(key, value)| (key.into(), value.into())).collect();
    for (key, _) in &defaults {
        validate_key(key)?;
    }
    Ok(defaults)
}
