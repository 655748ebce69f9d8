use crate::catalog::Loadable;
use crate::descriptor::ModuleDescriptor;
use anvil_store::{PropertyStore, StoreError};
use tracing::debug;

/// Loads the domains a module reads from, seeded with its declared defaults.
pub trait ModuleDomains {
    /// Loads every domain referenced by `descriptor` and seeds keys that are still
    /// absent from the declared string defaults. Keys in `"default"` land in the store's
    /// default domain. Returns the number of seeded keys.
    ///
    /// # Errors
    /// Propagates store load failures.
    fn load_domains_for(&self, descriptor: &ModuleDescriptor) -> Result<usize, StoreError>;

    /// [`ModuleDomains::load_domains_for`] with `T`'s own descriptor.
    ///
    /// # Errors
    /// Propagates store load failures.
    fn load_domains_of<T: Loadable>(&self) -> Result<usize, StoreError> {
        self.load_domains_for(&T::describe())
    }

    /// Seeds the declared defaults of `descriptor` without reloading domains that are
    /// already in memory, so their unsaved writes survive. Absent domains are loaded
    /// first. Returns the number of seeded keys.
    ///
    /// # Errors
    /// Propagates store load failures.
    fn seed_domains_for(&self, descriptor: &ModuleDescriptor) -> Result<usize, StoreError>;
}

impl ModuleDomains for PropertyStore {
    fn load_domains_for(&self, descriptor: &ModuleDescriptor) -> Result<usize, StoreError> {
        let mut seeded = 0;
        for (domain, defaults) in descriptor.domain_defaults() {
            seeded += self.load_domain_with_defaults(self.resolve_domain(&domain), defaults)?;
        }
        debug!(module = descriptor.type_name(), seeded, "Module domains loaded");
        Ok(seeded)
    }

    fn seed_domains_for(&self, descriptor: &ModuleDescriptor) -> Result<usize, StoreError> {
        let mut seeded = 0;
        for (domain, defaults) in descriptor.domain_defaults() {
            seeded += self.seed_domain(self.resolve_domain(&domain), defaults)?;
        }
        debug!(module = descriptor.type_name(), seeded, "Module domains seeded");
        Ok(seeded)
    }
}
