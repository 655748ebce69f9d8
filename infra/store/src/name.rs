use crate::error::StoreError;
use std::borrow::Borrow;
use std::fmt;

/// A validated domain name.
///
/// Domain names double as file stems (`<folder>/<name>.config`), so they are limited to
/// ASCII alphanumerics, `_`, `-` and `.`, and may not start with a dot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DomainName(String);

impl DomainName {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for DomainName {
    type Error = StoreError;

    fn try_from(value: String) -> Result<Self, StoreError> {
        if value.is_empty() {
            return Err(StoreError::InvalidDomain {
                message: "EMPTY".into(),
                context: Some("Domain name cannot be empty".into()),
            });
        }

        if value.starts_with('.') {
            return Err(StoreError::InvalidDomain {
                message: value.into(),
                context: Some("Domain name cannot start with a dot".into()),
            });
        }

        if !value.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')) {
            return Err(StoreError::InvalidDomain {
                message: value.into(),
                context: Some("Domain name contains illegal characters".into()),
            });
        }

        Ok(Self(value))
    }
}

impl TryFrom<&str> for DomainName {
    type Error = StoreError;

    fn try_from(value: &str) -> Result<Self, StoreError> {
        Self::try_from(value.to_owned())
    }
}

impl AsRef<str> for DomainName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for DomainName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub(crate) fn validate_key(key: &str) -> Result<(), StoreError> {
    if key.trim().is_empty() {
        return Err(StoreError::InvalidKey {
            message: "EMPTY".into(),
            context: Some("Property name cannot be empty".into()),
        });
    }
    if key.trim() != key {
        return Err(StoreError::InvalidKey {
            message: key.to_owned().into(),
            context: Some("Property name cannot have surrounding whitespace".into()),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_file_safe_names() {
        for name in ["default", "net_io", "app-server", "v1.2"] {
            assert!(DomainName::try_from(name).is_ok(), "{name}");
        }
    }

    #[test]
    fn rejects_empty_hidden_and_traversal_names() {
        for name in ["", ".hidden", "..", "a/b", "a b", "x\\y"] {
            assert!(
                matches!(DomainName::try_from(name), Err(StoreError::InvalidDomain { .. })),
                "{name}"
            );
        }
    }

    #[test]
    fn blank_or_padded_keys_are_invalid() {
        assert!(validate_key("port").is_ok());
        assert!(matches!(validate_key("   "), Err(StoreError::InvalidKey { .. })));
        assert!(matches!(validate_key(" port"), Err(StoreError::InvalidKey { .. })));
    }
}
