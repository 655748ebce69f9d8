//! A thread-safe hierarchical property store.
//!
//! Properties are string values addressed by `(domain, key)`. Each domain can be backed
//! by a flat `key=value` file and is persisted only on an explicit save.
//!
//! # Core Features
//!
//! - **Domains**: Named groups of properties, created on first write or explicitly.
//! - **Dirty Tracking**: Every mutation marks the domain dirty until it is saved or reloaded.
//! - **Atomic Writes**: Unique temp write + `fsync` + `rename`; leftovers are purged at boot.
//! - **Typed Reads**: [`FromProperty`] coerces stored strings into numbers, booleans,
//!   paths, dates and lists when they are read.
//! - **Self-Locating**: The default domain's `configFolder` / `configFileName` entries
//!   decide where domains created afterwards are stored.
//!
//! # Examples
//!
//! ```rust
//! use anvil_store::{PropertyStore, StoreError};
//!
//! fn main() -> Result<(), StoreError> {
//!     # let tmp = tempfile::tempdir().unwrap();
//!     let store = PropertyStore::builder().folder(tmp.path()).build()?;
//!
//!     let db = store.create_domain("database")?;
//!     db.set("poolSize", 16)?;
//!     assert!(db.save()?);
//!
//!     let reopened = PropertyStore::builder().folder(tmp.path()).build()?;
//!     reopened.load_domain("database")?;
//!     assert_eq!(reopened.get_as::<u32>("database", "poolSize")?, 16);
//!     Ok(())
//! }
//! ```

mod builder;
mod domain;
mod error;
mod name;
mod persist;
mod settings;
mod store;
mod value;

pub use builder::{InMemory, NoBacking, PropertyStoreBuilder, WithFolder};
pub use domain::Domain;
pub use error::{StoreError, StoreErrorExt};
pub use name::DomainName;
pub use settings::{ENV_PREFIX, StoreSettings};
pub use store::{PropertyStore, StoreInner};
pub use value::{ConversionError, FromProperty};
