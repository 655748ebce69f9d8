pub use crate::{
    BoxError, DescriptorProvider, LoadError, Loadable, LoaderDescriptor, ModuleCatalog,
    ModuleDescriptor, ModuleDomains, ModuleLoader, Overrides, PropertyDescriptor,
};
pub use anvil_domain::PropertyKey;
pub use anvil_store::{Domain, PropertyStore, StoreError};
