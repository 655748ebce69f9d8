use anvil_kernel::{BoxError, LoadError, Loadable, ModuleCatalog, ModuleLoader, Overrides};
use std::any::{TypeId, type_name};
use std::fmt;
use std::hash::{Hash, Hasher};

/// A module with lifecycle routines, run by the [`ActivatorRegistry`](crate::ActivatorRegistry).
///
/// Activators are built through the module loader like any other [`Loadable`], so
/// their configuration is resolved before `init` runs.
///
/// ```rust
/// use anvil_activation::{Activator, ActivatorRef};
/// use anvil_kernel::prelude::*;
///
/// #[derive(Default)]
/// struct Database;
///
/// #[derive(Default)]
/// struct Http;
///
/// impl Loadable for Database {
///     fn describe() -> ModuleDescriptor {
///         ModuleDescriptor::builder::<Self>().with_default().build()
///     }
/// }
///
/// impl Loadable for Http {
///     fn describe() -> ModuleDescriptor {
///         ModuleDescriptor::builder::<Self>().with_default().build()
///     }
/// }
///
/// impl Activator for Database {
///     fn init(&mut self) -> Result<(), BoxError> {
///         Ok(())
///     }
/// }
///
/// impl Activator for Http {
///     fn dependencies() -> Vec<ActivatorRef> {
///         vec![ActivatorRef::of::<Database>()]
///     }
///
///     fn init(&mut self) -> Result<(), BoxError> {
///         Ok(())
///     }
/// }
///
/// assert_eq!(Http::dependencies()[0].short_name(), "Database");
/// ```
pub trait Activator: Loadable {
    /// Activators whose `init` must succeed before this one runs.
    fn dependencies() -> Vec<ActivatorRef> {
        Vec::new()
    }

    /// # Errors
    /// Any error halts the activation run.
    fn init(&mut self) -> Result<(), BoxError>;

    /// # Errors
    /// Errors are recorded; the remaining activators are still stopped.
    fn stop(&mut self) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Object-safe view of a loaded activator.
pub(crate) trait Running: Send + Sync {
    fn init(&mut self) -> Result<(), BoxError>;
    fn stop(&mut self) -> Result<(), BoxError>;
}

impl<T: Activator> Running for T {
    fn init(&mut self) -> Result<(), BoxError> {
        Activator::init(self)
    }

    fn stop(&mut self) -> Result<(), BoxError> {
        Activator::stop(self)
    }
}

type LoadFn = fn(&ModuleLoader<'_>, &Overrides) -> Result<Box<dyn Running>, LoadError>;

fn load_activator<T: Activator>(
    loader: &ModuleLoader<'_>,
    overrides: &Overrides,
) -> Result<Box<dyn Running>, LoadError> {
    loader.load::<T>(overrides).map(|activator| Box::new(activator) as Box<dyn Running>)
}

/// A type-erased handle to an [`Activator`] type.
#[derive(Clone, Copy)]
pub struct ActivatorRef {
    id: TypeId,
    name: &'static str,
    dependencies: fn() -> Vec<ActivatorRef>,
    register: fn(&ModuleCatalog) -> usize,
    load: LoadFn,
}

impl ActivatorRef {
    #[must_use]
    pub fn of<T: Activator>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
            dependencies: T::dependencies,
            register: ModuleCatalog::register::<T>,
            load: load_activator::<T>,
        }
    }

    #[must_use]
    pub const fn module_id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified type name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Type name without its module path (`app::db::Database` is `Database`).
    #[must_use]
    pub fn short_name(&self) -> &'static str {
        let base = self.name.split('<').next().unwrap_or(self.name);
        base.rsplit("::").next().unwrap_or(base)
    }

    /// Whether `name` designates this activator, by full or short name.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        self.name == name || self.short_name() == name
    }

    /// Dependencies declared by the type itself.
    #[must_use]
    pub fn declared_dependencies(&self) -> Vec<Self> {
        (self.dependencies)()
    }

    /// Registers the activator's module descriptor (and what it refers to) in `catalog`.
    pub fn register_module(&self, catalog: &ModuleCatalog) -> usize {
        (self.register)(catalog)
    }

    pub(crate) fn load(
        &self,
        loader: &ModuleLoader<'_>,
        overrides: &Overrides,
    ) -> Result<Box<dyn Running>, LoadError> {
        (self.load)(loader, overrides)
    }
}

impl PartialEq for ActivatorRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ActivatorRef {}

impl Hash for ActivatorRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ActivatorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for ActivatorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}
