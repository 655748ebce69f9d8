use crate::value::ConversionError;
use anvil_domain::PropertyKey;
use std::borrow::Cow;

/// A specialized [`StoreError`] enum of this crate.
#[anvil_derive::anvil_error]
pub enum StoreError {
    #[error("Invalid domain name{}: {message}", format_context(.context))]
    InvalidDomain { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Invalid property key{}: {message}", format_context(.context))]
    InvalidKey { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Domain `{domain}` not found{}", format_context(.context))]
    DomainNotFound { domain: String, context: Option<Cow<'static, str>> },

    #[error("Property `{key}` not found{}", format_context(.context))]
    PropertyNotFound { key: PropertyKey, context: Option<Cow<'static, str>> },

    #[error("Property `{key}` = {raw:?} cannot be converted{}: {source}", format_context(.context))]
    Conversion {
        key: PropertyKey,
        raw: String,
        source: ConversionError,
        context: Option<Cow<'static, str>>,
    },

    #[error("Malformed domain file {path} at line {line}{}: {message}", format_context(.context))]
    Malformed {
        path: String,
        line: usize,
        message: Cow<'static, str>,
        context: Option<Cow<'static, str>>,
    },

    #[error("Hardware I/O failure{}: {source}", format_context(.context))]
    Io { source: std::io::Error, context: Option<Cow<'static, str>> },

    #[error("Settings failure{}: {source}", format_context(.context))]
    Settings { source: config::ConfigError, context: Option<Cow<'static, str>> },

    #[error("Internal store error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
