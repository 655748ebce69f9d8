use crate::constants::{DEFAULT_CONFIG_DOMAIN, LOAD_SENTINEL, NULL_SENTINEL};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Fully-qualified coordinates of a property: the domain it lives in and its name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PropertyKey {
    pub domain: Cow<'static, str>,
    pub name: Cow<'static, str>,
}

impl PropertyKey {
    /// A key in an explicit domain.
    pub fn new(domain: impl Into<Cow<'static, str>>, name: impl Into<Cow<'static, str>>) -> Self {
        Self { domain: domain.into(), name: name.into() }
    }

    /// A key in the `"default"` domain. The store resolves that name to its configured
    /// default domain when the two differ.
    pub fn in_default(name: impl Into<Cow<'static, str>>) -> Self {
        Self::new(DEFAULT_CONFIG_DOMAIN, name)
    }

    /// Property names must not be empty (or whitespace only).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.name.trim().is_empty()
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.domain, self.name)
    }
}

/// The declared default of a property, with the two reserved sentinels decoded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DefaultValue {
    /// `$NULL$` (or no default at all): resolution must come from the store.
    #[default]
    Null,
    /// `$LOAD$`: construct the value through the module loader.
    Load,
    /// A raw string parsed into the target type at resolution time.
    Value(Cow<'static, str>),
}

impl DefaultValue {
    /// Decodes a raw declared default, recognising the sentinels.
    pub fn parse(raw: impl Into<Cow<'static, str>>) -> Self {
        let raw = raw.into();
        match raw.as_ref() {
            NULL_SENTINEL => Self::Null,
            LOAD_SENTINEL => Self::Load,
            _ => Self::Value(raw),
        }
    }

    /// The concrete default string, if any.
    #[must_use]
    pub fn as_value(&self) -> Option<&str> {
        match self {
            Self::Value(raw) => Some(raw),
            Self::Null | Self::Load => None,
        }
    }

    /// Encodes the default back into its declared string form.
    #[must_use]
    pub fn as_raw(&self) -> &str {
        match self {
            Self::Null => NULL_SENTINEL,
            Self::Load => LOAD_SENTINEL,
            Self::Value(raw) => raw,
        }
    }
}

impl From<Option<&'static str>> for DefaultValue {
    fn from(raw: Option<&'static str>) -> Self {
        raw.map_or(Self::Null, Self::parse)
    }
}
