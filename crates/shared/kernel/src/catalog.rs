use crate::descriptor::ModuleDescriptor;
use fxhash::{FxHashMap, FxHashSet};
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::sync::Arc;
use tracing::debug;

/// A type that declares how it is loaded.
pub trait Loadable: Any + Send + Sync + Sized {
    fn describe() -> ModuleDescriptor;
}

/// Source of module descriptors consulted by the loader.
pub trait DescriptorProvider: Send + Sync {
    fn descriptor(&self, type_id: TypeId) -> Option<Arc<ModuleDescriptor>>;
}

/// The default, thread-safe [`DescriptorProvider`].
///
/// Registering a [`Loadable`] also registers every loadable type its descriptor refers
/// to (its provider and `$LOAD$` properties), so loading never depends on the order in
/// which modules were registered.
#[derive(Debug, Clone, Default)]
pub struct ModuleCatalog {
    descriptors: Arc<RwLock<FxHashMap<TypeId, Arc<ModuleDescriptor>>>>,
}

impl ModuleCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `T` and the loadable types it refers to. Returns how many descriptors
    /// were added; already registered types are left untouched.
    pub fn register<T: Loadable>(&self) -> usize {
        let mut added = 0;
        let mut visited = FxHashSet::default();
        let mut pending = vec![(TypeId::of::<T>(), T::describe as fn() -> ModuleDescriptor)];

        while let Some((type_id, describe)) = pending.pop() {
            if !visited.insert(type_id) {
                continue;
            }

            let descriptor = match self.descriptor(type_id) {
                Some(existing) => existing,
                None => {
                    let descriptor = Arc::new(describe());
                    if self.insert_if_absent(Arc::clone(&descriptor)) {
                        added += 1;
                    }
                    descriptor
                },
            };

            pending.extend(
                descriptor
                    .dependencies()
                    .filter_map(|type_ref| type_ref.describe.map(|describe| (type_ref.id, describe))),
            );
        }

        added
    }

    /// Registers (or replaces) an explicit descriptor.
    pub fn register_descriptor(&self, descriptor: ModuleDescriptor) {
        debug!(module = descriptor.type_name(), "Module descriptor registered");
        self.descriptors.write().insert(descriptor.module_id(), Arc::new(descriptor));
    }

    #[must_use]
    pub fn contains(&self, type_id: TypeId) -> bool {
        self.descriptors.read().contains_key(&type_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.read().is_empty()
    }

    /// Sorted names of the registered modules.
    #[must_use]
    pub fn module_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.descriptors.read().values().map(|d| d.type_name()).collect();
        names.sort_unstable();
        names
    }

    fn insert_if_absent(&self, descriptor: Arc<ModuleDescriptor>) -> bool {
        let mut descriptors = self.descriptors.write();
        if descriptors.contains_key(&descriptor.module_id()) {
            return false;
        }
        debug!(module = descriptor.type_name(), "Module descriptor registered");
        descriptors.insert(descriptor.module_id(), descriptor);
        true
    }
}

impl DescriptorProvider for ModuleCatalog {
    fn descriptor(&self, type_id: TypeId) -> Option<Arc<ModuleDescriptor>> {
        self.descriptors.read().get(&type_id).cloned()
    }
}
