#![allow(unreachable_pub)]
#![allow(clippy::needless_pass_by_value)]

//! # Macros
//!
//! Procedural macros shared by the Anvil crates.
//!
//! The only macro today is [`macro@anvil_error`], which turns a plain enum into the
//! error type every crate in the workspace exposes.
//!
//! ## Usage
//! ```toml
//! [dependencies]
//! anvil-derive = { path = "../infra/derive" }
//! thiserror = "2"
//! ```

mod error;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

/// A high-level attribute macro for defining domain-specific error enums.
///
/// # Features
///
/// * **Automatic Derives**: Injects `#[derive(Debug, thiserror::Error)]` when missing.
/// * **Context Support**: Generates a companion `...Ext` trait that adds `.context()`
///   to any `Result` carrying this error (or a convertible upstream error).
/// * **Standard Conversions**: Implements `From<T>` for variants whose only fields are a
///   `source` and a `context`, enabling the `?` operator for upstream errors.
/// * **Identity Fields**: Variants may carry extra named fields (a type name, a property key,
///   a cycle path). Such variants keep their `source` for error chaining but get no
///   blanket `From` impl, since the identity cannot be invented by a conversion.
/// * **Internal Fallback**: Provides `From<&'static str>` and `From<String>` if an
///   `Internal { message, context }` variant is present.
///
/// # Requirements
///
/// 1. The macro must be applied to an **enum** with **named-field** variants only.
/// 2. A `context` field, when present, must be `Option<Cow<'static, str>>`.
/// 3. Variants wrapping external errors (a `source` field or a field marked `#[source]`/`#[from]`)
///    must include a `context` field.
///
/// # Example
///
/// ```rust,ignore
/// use anvil_derive::anvil_error;
/// use std::borrow::Cow;
///
/// #[anvil_error]
/// pub enum StoreError {
///     #[error("I/O failure{}: {source}", format_context(.context))]
///     Io { source: std::io::Error, context: Option<Cow<'static, str>> },
///
///     #[error("Property `{key}` not found{}", format_context(.context))]
///     PropertyNotFound { key: String, context: Option<Cow<'static, str>> },
///
///     #[error("Internal fault{}: {message}", format_context(.context))]
///     Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
/// }
///
/// fn read(path: &std::path::Path) -> Result<String, StoreError> {
///     std::fs::read_to_string(path).context("Reading domain file")
/// }
/// ```
#[proc_macro_attribute]
pub fn anvil_error(_args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    error::expand_derive(input).into()
}
