//! Kernel of the module system.
//! Keep this crate synchronous and free of I/O of its own; everything persistent goes
//! through [`anvil_store::PropertyStore`].
//!
//! ## Describing a module
//! ```rust
//! use anvil_kernel::prelude::*;
//!
//! struct Pool {
//!     size: u32,
//! }
//!
//! impl Loadable for Pool {
//!     fn describe() -> ModuleDescriptor {
//!         ModuleDescriptor::builder::<Self>()
//!             .loader(
//!                 LoaderDescriptor::constructor("Pool::new", |args| Ok(Pool { size: args.next()? }))
//!                     .param(PropertyDescriptor::new::<u32>("size").domain("db").default_value("8")),
//!             )
//!             .build()
//!     }
//! }
//!
//! let store = PropertyStore::builder().in_memory().build().unwrap();
//! let catalog = ModuleCatalog::new();
//! catalog.register::<Pool>();
//!
//! let loader = ModuleLoader::new(&store, &catalog);
//! assert_eq!(loader.load::<Pool>(&Overrides::new()).unwrap().size, 8);
//!
//! store.set_property("db", "size", "32").unwrap();
//! assert_eq!(loader.load::<Pool>(&Overrides::new()).unwrap().size, 32);
//! ```

pub mod catalog;
pub mod descriptor;
pub mod domains;
pub mod error;
pub mod loader;
pub mod prelude;
pub mod resolver;

pub use anvil_domain as domain;

pub use catalog::{DescriptorProvider, Loadable, ModuleCatalog};
pub use descriptor::{
    Arguments, FieldDescriptor, LoaderDescriptor, LoaderKind, ModuleDescriptor,
    ModuleDescriptorBuilder, ModuleValue, PropertyDescriptor, TypeRef, Visibility,
};
pub use domains::ModuleDomains;
pub use error::{BoxError, LoadError, LoadErrorExt};
pub use loader::{ConstructionStrategy, ModuleLoader};
pub use resolver::{Overrides, PropertyResolver, Resolution};
