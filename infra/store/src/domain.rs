use crate::error::StoreError;
use crate::name::DomainName;
use crate::store::PropertyStore;
use crate::value::FromProperty;
use std::collections::BTreeMap;
use std::fmt::Display;
use std::path::PathBuf;

/// A named view over one domain of a [`PropertyStore`].
///
/// The view holds no entries of its own; every call goes through the store, so views
/// obtained from different clones of the store stay consistent.
#[derive(Debug, Clone)]
pub struct Domain {
    store: PropertyStore,
    name: DomainName,
}

impl Domain {
    pub(crate) const fn new(store: PropertyStore, name: DomainName) -> Self {
        Self { store, name }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    #[must_use]
    pub const fn store(&self) -> &PropertyStore {
        &self.store
    }

    /// The raw stored string.
    #[must_use]
    pub fn get_raw(&self, key: &str) -> Option<String> {
        self.store.find_property(self.name(), key)
    }

    /// The stored value coerced into `T`.
    ///
    /// # Errors
    /// [`StoreError::PropertyNotFound`] if absent, [`StoreError::Conversion`] if malformed.
    pub fn get<T: FromProperty>(&self, key: &str) -> Result<T, StoreError> {
        self.store.get_as(self.name(), key)
    }

    /// Like [`Domain::get`], falling back to `default` when the key is absent.
    /// A present but malformed value is still an error.
    ///
    /// # Errors
    /// [`StoreError::Conversion`] if the stored string is not a valid `T`.
    pub fn get_or<T: FromProperty>(&self, key: &str, default: T) -> Result<T, StoreError> {
        match self.get(key) {
            Err(StoreError::PropertyNotFound { .. }) => Ok(default),
            other => other,
        }
    }

    /// Stores the `Display` form of `value`.
    ///
    /// # Errors
    /// [`StoreError::InvalidKey`] for blank or padded keys.
    pub fn set(&self, key: &str, value: impl Display) -> Result<Option<String>, StoreError> {
        self.store.set_property(self.name(), key, value.to_string())
    }

    #[must_use = "Returns the removed value"]
    pub fn remove(&self, key: &str) -> Option<String> {
        self.store.remove_property(self.name(), key)
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.get_raw(key).is_some()
    }

    /// Sorted keys of the domain.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.snapshot().into_keys().collect()
    }

    /// A sorted copy of all entries.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.store.shared(self.name()).map_or_else(BTreeMap::new, |shared| {
            shared.read().entries.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
        })
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.store.is_dirty(self.name())
    }

    #[must_use]
    pub fn backing_path(&self) -> Option<PathBuf> {
        self.store.backing_path(self.name())
    }

    /// See [`PropertyStore::save_domain`].
    ///
    /// # Errors
    /// Propagates write failures.
    pub fn save(&self) -> Result<bool, StoreError> {
        self.store.save_domain(self.name())
    }

    /// See [`PropertyStore::load_domain`].
    ///
    /// # Errors
    /// Propagates read and parse failures.
    pub fn load(&self) -> Result<bool, StoreError> {
        self.store.load_domain(self.name())
    }
}
