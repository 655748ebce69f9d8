use anvil_domain::PropertyKey;
use anvil_store::{ConversionError, StoreError};
use std::borrow::Cow;

/// Boxed error returned by user-supplied loader routines.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failures of a single module load. None of them leave a partial instance behind.
#[anvil_derive::anvil_error]
pub enum LoadError {
    #[error("Property `{key}` for {target} is unresolved{}", format_context(.context))]
    PropertyUnresolved {
        key: PropertyKey,
        target: &'static str,
        context: Option<Cow<'static, str>>,
    },

    #[error("Property `{key}` = {raw:?} is not a valid {target}{}: {source}", format_context(.context))]
    PropertyConversion {
        key: PropertyKey,
        raw: String,
        target: &'static str,
        source: ConversionError,
        context: Option<Cow<'static, str>>,
    },

    #[error("No loader found for {type_name}{}", format_context(.context))]
    NoLoaderFound { type_name: &'static str, context: Option<Cow<'static, str>> },

    #[error("Ambiguous loaders for {type_name}{}: {}", format_context(.context), .candidates.join(", "))]
    AmbiguousLoader {
        type_name: &'static str,
        candidates: Vec<&'static str>,
        context: Option<Cow<'static, str>>,
    },

    #[error("Construction of {type_name} failed{}: {source}", format_context(.context))]
    ModuleConstruction {
        type_name: &'static str,
        source: BoxError,
        context: Option<Cow<'static, str>>,
    },

    #[error("Load cycle{}: {}", format_context(.context), .path.join(" -> "))]
    LoadCycle { path: Vec<&'static str>, context: Option<Cow<'static, str>> },

    #[error("No descriptor registered for {type_name}{}", format_context(.context))]
    UnknownModule { type_name: &'static str, context: Option<Cow<'static, str>> },

    #[error("Property store failure{}: {source}", format_context(.context))]
    Store { source: StoreError, context: Option<Cow<'static, str>> },

    #[error("Internal loader error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl LoadError {
    /// The property coordinates involved, for property-level failures.
    #[must_use]
    pub const fn key(&self) -> Option<&PropertyKey> {
        match self {
            Self::PropertyUnresolved { key, .. } | Self::PropertyConversion { key, .. } => Some(key),
            _ => None,
        }
    }
}
