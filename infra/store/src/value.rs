//! Typed coercion of stored strings.
//!
//! Domain files are string-valued; conversion into a concrete type happens when a
//! value is read, never when it is stored.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::borrow::Cow;
use std::path::PathBuf;

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATE_TIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// A raw string could not be coerced into the requested type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("expected {target}: {reason}")]
pub struct ConversionError {
    pub target: &'static str,
    pub reason: Cow<'static, str>,
}

impl ConversionError {
    pub fn new<T: ?Sized>(reason: impl Into<Cow<'static, str>>) -> Self {
        Self { target: std::any::type_name::<T>(), reason: reason.into() }
    }
}

/// Types that can be parsed from a stored property string.
pub trait FromProperty: Sized {
    /// Parses the raw stored representation.
    ///
    /// # Errors
    /// Returns [`ConversionError`] naming the target type when `raw` is not a valid value.
    fn from_property(raw: &str) -> Result<Self, ConversionError>;
}

macro_rules! parse_trimmed {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FromProperty for $ty {
                fn from_property(raw: &str) -> Result<Self, ConversionError> {
                    raw.trim()
                        .parse::<$ty>()
                        .map_err(|e| ConversionError::new::<$ty>(e.to_string()))
                }
            }
        )*
    };
}

parse_trimmed!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64);

impl FromProperty for bool {
    fn from_property(raw: &str) -> Result<Self, ConversionError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(true),
            "false" | "no" | "off" | "0" => Ok(false),
            other => Err(ConversionError::new::<Self>(format!("`{other}` is not a boolean"))),
        }
    }
}

impl FromProperty for char {
    fn from_property(raw: &str) -> Result<Self, ConversionError> {
        let mut chars = raw.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(ConversionError::new::<Self>("exactly one character is required")),
        }
    }
}

impl FromProperty for String {
    fn from_property(raw: &str) -> Result<Self, ConversionError> {
        Ok(raw.to_owned())
    }
}

impl FromProperty for PathBuf {
    fn from_property(raw: &str) -> Result<Self, ConversionError> {
        if raw.trim().is_empty() {
            return Err(ConversionError::new::<Self>("path cannot be empty"));
        }
        Ok(Self::from(raw.trim()))
    }
}

impl FromProperty for NaiveDate {
    fn from_property(raw: &str) -> Result<Self, ConversionError> {
        Self::parse_from_str(raw.trim(), DATE_FORMAT)
            .map_err(|e| ConversionError::new::<Self>(e.to_string()))
    }
}

impl FromProperty for NaiveDateTime {
    fn from_property(raw: &str) -> Result<Self, ConversionError> {
        let raw = raw.trim();
        DATE_TIME_FORMATS
            .iter()
            .find_map(|format| Self::parse_from_str(raw, format).ok())
            .ok_or_else(|| {
                ConversionError::new::<Self>(format!("`{raw}` does not match {DATE_TIME_FORMATS:?}"))
            })
    }
}

impl FromProperty for DateTime<Utc> {
    fn from_property(raw: &str) -> Result<Self, ConversionError> {
        DateTime::parse_from_rfc3339(raw.trim())
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| ConversionError::new::<Self>(e.to_string()))
    }
}

/// Comma-separated lists; an empty (or blank) string is an empty list.
impl<T: FromProperty> FromProperty for Vec<T> {
    fn from_property(raw: &str) -> Result<Self, ConversionError> {
        if raw.trim().is_empty() {
            return Ok(Self::new());
        }
        raw.split(',').map(|item| T::from_property(item.trim())).collect()
    }
}
