//! Property resolution.
//!
//! A property resolves from, in order: a caller override, the store, the loader
//! (`$LOAD$`), the declared string default. Nothing else is consulted.

use crate::descriptor::{ModuleValue, PropertyDescriptor};
use crate::error::LoadError;
use anvil_domain::{DefaultValue, PropertyKey};
use anvil_store::PropertyStore;
use fxhash::FxHashMap;
use std::borrow::Cow;
use tracing::trace;

/// Raw values that win over everything else during a load, nested loads included.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    values: FxHashMap<PropertyKey, String>,
}

impl Overrides {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use = "Adds an override"]
    pub fn with(mut self, key: PropertyKey, raw: impl Into<String>) -> Self {
        self.insert(key, raw);
        self
    }

    /// Shorthand for an override in the default domain.
    #[must_use = "Adds an override"]
    pub fn with_default(self, name: impl Into<Cow<'static, str>>, raw: impl Into<String>) -> Self {
        self.with(PropertyKey::in_default(name), raw)
    }

    pub fn insert(&mut self, key: PropertyKey, raw: impl Into<String>) -> Option<String> {
        self.values.insert(key, raw.into())
    }

    #[must_use]
    pub fn get(&self, key: &PropertyKey) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PropertyKey, &str)> {
        self.values.iter().map(|(key, raw)| (key, raw.as_str()))
    }

    /// Copies every override of `other` into `self`; `other` wins on conflicts.
    pub fn merge(&mut self, other: &Self) {
        self.extend(other.iter().map(|(key, raw)| (key.clone(), raw.to_owned())));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(PropertyKey, String)> for Overrides {
    fn from_iter<I: IntoIterator<Item = (PropertyKey, String)>>(iter: I) -> Self {
        Self { values: iter.into_iter().collect() }
    }
}

impl Extend<(PropertyKey, String)> for Overrides {
    fn extend<I: IntoIterator<Item = (PropertyKey, String)>>(&mut self, iter: I) {
        self.values.extend(iter);
    }
}

/// Where a raw value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Override(String),
    Stored(String),
    /// The value must be constructed by the loader.
    Load,
    Default(String),
}

/// Resolves property descriptors against a store and a set of overrides.
#[derive(Debug, Clone, Copy)]
pub struct PropertyResolver<'a> {
    store: &'a PropertyStore,
    overrides: &'a Overrides,
}

impl<'a> PropertyResolver<'a> {
    #[must_use]
    pub const fn new(store: &'a PropertyStore, overrides: &'a Overrides) -> Self {
        Self { store, overrides }
    }

    /// Picks the source of `property` without coercing anything.
    ///
    /// # Errors
    /// [`LoadError::PropertyUnresolved`] when no source applies.
    pub fn locate(&self, property: &PropertyDescriptor) -> Result<Resolution, LoadError> {
        let key = property.key();
        let domain = self.store.resolve_domain(&key.domain);

        let overridden = self.overrides.get(key).or_else(|| {
            (domain != key.domain)
                .then(|| self.overrides.get(&PropertyKey::new(domain.to_owned(), key.name.clone())))
                .flatten()
        });
        if let Some(raw) = overridden {
            trace!(%key, "Resolved from override");
            return Ok(Resolution::Override(raw.to_owned()));
        }

        if let Some(raw) = self.store.find_property(domain, &key.name) {
            trace!(%key, "Resolved from store");
            return Ok(Resolution::Stored(raw));
        }

        match property.default() {
            DefaultValue::Load => {
                trace!(%key, target = property.target_name(), "Resolved through loader");
                Ok(Resolution::Load)
            },
            DefaultValue::Value(raw) => {
                trace!(%key, "Resolved from declared default");
                Ok(Resolution::Default(raw.to_string()))
            },
            DefaultValue::Null => Err(LoadError::PropertyUnresolved {
                key: key.clone(),
                target: property.target_name(),
                context: None,
            }),
        }
    }

    /// Resolves `property` into a typed value, calling `load` for `$LOAD$` properties.
    ///
    /// # Errors
    /// [`LoadError::PropertyUnresolved`], [`LoadError::PropertyConversion`] or whatever
    /// `load` returns.
    pub fn resolve<F>(&self, property: &PropertyDescriptor, load: F) -> Result<ModuleValue, LoadError>
    where
        F: FnOnce(&PropertyDescriptor) -> Result<ModuleValue, LoadError>,
    {
        match self.locate(property)? {
            Resolution::Override(raw) | Resolution::Stored(raw) | Resolution::Default(raw) => {
                property.coerce(&raw)
            },
            Resolution::Load => load(property),
        }
    }

    /// Resolves a parsable property without the loader; `$LOAD$` is unresolved here.
    ///
    /// # Errors
    /// See [`PropertyResolver::resolve`].
    pub fn resolve_value<T: 'static>(&self, property: &PropertyDescriptor) -> Result<T, LoadError> {
        let value = self.resolve(property, |property| {
            Err(LoadError::PropertyUnresolved {
                key: property.key().clone(),
                target: property.target_name(),
                context: Some("Loading modules requires a ModuleLoader".into()),
            })
        })?;

        value.downcast::<T>().map(|value| *value).map_err(|_| LoadError::Internal {
            message: format!(
                "{} resolves to {}, not {}",
                property.key(),
                property.target_name(),
                std::any::type_name::<T>()
            )
            .into(),
            context: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> PropertyStore {
        let store = PropertyStore::builder().in_memory().build().unwrap();
        store.set_property("default", "intProp", "20").unwrap();
        store.set_property("default", "dblProp", "23.02").unwrap();
        store
    }

    #[test]
    fn stored_values_are_coerced() {
        let store = store();
        let overrides = Overrides::new();
        let resolver = PropertyResolver::new(&store, &overrides);

        let int_prop = PropertyDescriptor::new::<i32>("intProp");
        assert_eq!(resolver.resolve_value::<i32>(&int_prop).unwrap(), 20);

        let dbl_prop = PropertyDescriptor::new::<f64>("dblProp");
        let value = resolver.resolve_value::<f64>(&dbl_prop).unwrap();
        assert!((value - 23.02).abs() < f64::EPSILON);
    }

    #[test]
    fn missing_without_default_is_unresolved() {
        let store = store();
        let overrides = Overrides::new();
        let resolver = PropertyResolver::new(&store, &overrides);

        let missing = PropertyDescriptor::new::<String>("missingProp").default_value("$NULL$");
        match resolver.resolve_value::<String>(&missing).unwrap_err() {
            LoadError::PropertyUnresolved { key, target, .. } => {
                assert_eq!(key, PropertyKey::in_default("missingProp"));
                assert_eq!(target, std::any::type_name::<String>());
            },
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn precedence_is_override_store_default() {
        let store = store();
        let property = PropertyDescriptor::new::<i32>("intProp").default_value("1");

        let overrides = Overrides::new().with_default("intProp", "99");
        let resolver = PropertyResolver::new(&store, &overrides);
        assert_eq!(resolver.locate(&property).unwrap(), Resolution::Override("99".into()));

        let none = Overrides::new();
        let resolver = PropertyResolver::new(&store, &none);
        assert_eq!(resolver.locate(&property).unwrap(), Resolution::Stored("20".into()));

        let fresh = PropertyDescriptor::new::<i32>("fresh").default_value("1");
        assert_eq!(resolver.locate(&fresh).unwrap(), Resolution::Default("1".into()));
        assert_eq!(resolver.resolve_value::<i32>(&fresh).unwrap(), 1);
    }

    #[test]
    fn merged_overrides_prefer_the_newer_value() {
        let mut base = Overrides::new().with_default("a", "1").with_default("b", "2");
        base.merge(&Overrides::new().with_default("b", "3"));

        assert_eq!(base.len(), 2);
        assert_eq!(base.get(&PropertyKey::in_default("a")), Some("1"));
        assert_eq!(base.get(&PropertyKey::in_default("b")), Some("3"));
    }

    #[test]
    fn conversion_failure_names_the_source_value() {
        let store = store();
        let overrides = Overrides::new();
        let resolver = PropertyResolver::new(&store, &overrides);

        let wrong = PropertyDescriptor::new::<i32>("dblProp");
        let err = resolver.resolve_value::<i32>(&wrong).unwrap_err();
        assert!(matches!(err, LoadError::PropertyConversion { ref raw, .. } if raw == "23.02"));
        assert_eq!(err.key(), Some(&PropertyKey::in_default("dblProp")));
    }
}
