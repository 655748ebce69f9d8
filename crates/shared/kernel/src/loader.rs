//! The module loader.
//!
//! Loading `T` looks up `T`'s descriptor, follows it to the provider, selects exactly one
//! public loader producing `T` (or the default constructor when there is none), resolves
//! every parameter and field, and only then constructs the instance.

use crate::catalog::DescriptorProvider;
use crate::descriptor::{
    Arguments, LoaderDescriptor, LoaderKind, ModuleDescriptor, ModuleValue, PropertyDescriptor,
    Visibility,
};
use crate::error::LoadError;
use crate::resolver::{Overrides, PropertyResolver};
use anvil_domain::PropertyKey;
use anvil_store::PropertyStore;
use std::any::{TypeId, type_name};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// How an instance gets built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstructionStrategy {
    MarkedConstructor { loader: &'static str, params: Vec<PropertyKey> },
    MarkedFactory { provider: &'static str, loader: &'static str, params: Vec<PropertyKey> },
    DefaultConstructor,
}

enum Selected<'d> {
    Loader(&'d LoaderDescriptor),
    Default,
}

/// Per-load bookkeeping shared by nested `$LOAD$` loads.
struct LoadContext<'o> {
    overrides: &'o Overrides,
    stack: Vec<(TypeId, &'static str)>,
}

impl LoadContext<'_> {
    fn enter(&mut self, type_id: TypeId, name: &'static str) -> Result<(), LoadError> {
        if let Some(start) = self.stack.iter().position(|(id, _)| *id == type_id) {
            let mut path: Vec<&'static str> = self.stack[start..].iter().map(|(_, n)| *n).collect();
            path.push(name);
            return Err(LoadError::LoadCycle { path, context: None });
        }
        self.stack.push((type_id, name));
        Ok(())
    }

    fn leave(&mut self) {
        self.stack.pop();
    }
}

/// Builds module instances from descriptors. Holds no state between calls.
#[derive(Clone, Copy)]
pub struct ModuleLoader<'a> {
    store: &'a PropertyStore,
    provider: &'a dyn DescriptorProvider,
}

impl fmt::Debug for ModuleLoader<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleLoader").field("store", self.store).finish_non_exhaustive()
    }
}

impl<'a> ModuleLoader<'a> {
    #[must_use]
    pub const fn new(store: &'a PropertyStore, provider: &'a dyn DescriptorProvider) -> Self {
        Self { store, provider }
    }

    /// Loads an instance of `T`.
    ///
    /// # Errors
    /// Any [`LoadError`]; the load is aborted at the first failure.
    pub fn load<T: 'static>(&self, overrides: &Overrides) -> Result<T, LoadError> {
        let value = self.load_value(TypeId::of::<T>(), type_name::<T>(), overrides)?;
        value.downcast::<T>().map(|value| *value).map_err(|_| LoadError::Internal {
            message: format!("descriptor of {} builds another type", type_name::<T>()).into(),
            context: None,
        })
    }

    /// Loads an instance of the type identified by `type_id`.
    ///
    /// # Errors
    /// Any [`LoadError`]; the load is aborted at the first failure.
    pub fn load_value(
        &self,
        type_id: TypeId,
        name: &'static str,
        overrides: &Overrides,
    ) -> Result<ModuleValue, LoadError> {
        let mut ctx = LoadContext { overrides, stack: Vec::new() };
        self.load_in(type_id, name, &mut ctx)
    }

    /// The strategy a load of `T` would use, without resolving or constructing anything.
    ///
    /// # Errors
    /// [`LoadError::UnknownModule`], [`LoadError::NoLoaderFound`] or
    /// [`LoadError::AmbiguousLoader`].
    pub fn strategy<T: 'static>(&self) -> Result<ConstructionStrategy, LoadError> {
        let target = self.describe(TypeId::of::<T>(), type_name::<T>())?;
        let provider = self.provider_of(&target)?;

        Ok(match select_strategy(&target, &provider)? {
            Selected::Default => ConstructionStrategy::DefaultConstructor,
            Selected::Loader(loader) => {
                let params = loader.params().iter().map(|p| p.key().clone()).collect();
                match loader.kind() {
                    LoaderKind::Constructor => {
                        ConstructionStrategy::MarkedConstructor { loader: loader.name(), params }
                    },
                    LoaderKind::Factory => ConstructionStrategy::MarkedFactory {
                        provider: provider.type_name(),
                        loader: loader.name(),
                        params,
                    },
                }
            },
        })
    }

    fn load_in(
        &self,
        type_id: TypeId,
        name: &'static str,
        ctx: &mut LoadContext<'_>,
    ) -> Result<ModuleValue, LoadError> {
        ctx.enter(type_id, name)?;
        let result = self.construct(type_id, name, ctx);
        ctx.leave();
        result
    }

    fn construct(
        &self,
        type_id: TypeId,
        name: &'static str,
        ctx: &mut LoadContext<'_>,
    ) -> Result<ModuleValue, LoadError> {
        let target = self.describe(type_id, name)?;
        let provider = self.provider_of(&target)?;
        let selected = select_strategy(&target, &provider)?;

        let mut args = VecDeque::new();
        if let Selected::Loader(loader) = selected {
            for param in loader.params() {
                args.push_back((param.target_name(), self.resolve(param, ctx)?));
            }
        }

        let mut fields = Vec::with_capacity(target.fields().len());
        for field in target.fields() {
            fields.push((field, self.resolve(field.property(), ctx)?));
        }

        let mut instance = match selected {
            Selected::Loader(loader) => {
                debug!(module = name, loader = loader.name(), "Invoking loader");
                loader.invoke(&mut Arguments::new(loader.name(), args)).map_err(|source| {
                    LoadError::ModuleConstruction {
                        type_name: name,
                        source,
                        context: Some(format!("Loader `{}`", loader.name()).into()),
                    }
                })?
            },
            Selected::Default => {
                debug!(module = name, "Invoking default constructor");
                target.construct_default().ok_or_else(|| LoadError::NoLoaderFound {
                    type_name: name,
                    context: None,
                })?
            },
        };

        for (field, value) in fields {
            field.apply(&mut instance, value)?;
        }

        debug!(module = name, "Module loaded");
        Ok(instance)
    }

    fn resolve(
        &self,
        property: &PropertyDescriptor,
        ctx: &mut LoadContext<'_>,
    ) -> Result<ModuleValue, LoadError> {
        let overrides = ctx.overrides;
        PropertyResolver::new(self.store, overrides).resolve(property, |property| {
            self.load_in(property.target_id(), property.target_name(), ctx)
        })
    }

    fn describe(&self, type_id: TypeId, name: &'static str) -> Result<Arc<ModuleDescriptor>, LoadError> {
        self.provider
            .descriptor(type_id)
            .ok_or(LoadError::UnknownModule { type_name: name, context: None })
    }

    fn provider_of(&self, target: &Arc<ModuleDescriptor>) -> Result<Arc<ModuleDescriptor>, LoadError> {
        match target.provider() {
            Some(provider) if provider != target.module_id() => {
                self.provider.descriptor(provider).ok_or_else(|| LoadError::UnknownModule {
                    type_name: target.type_name(),
                    context: Some("Provider is not registered".into()),
                })
            },
            _ => Ok(Arc::clone(target)),
        }
    }
}

fn select_strategy<'d>(
    target: &ModuleDescriptor,
    provider: &'d ModuleDescriptor,
) -> Result<Selected<'d>, LoadError> {
    let candidates: Vec<&LoaderDescriptor> = provider
        .loaders()
        .iter()
        .filter(|loader| loader.produces() == target.module_id())
        .filter(|loader| loader.visibility() == Visibility::Public)
        .collect();

    match candidates.as_slice() {
        [] if target.has_default_constructor() => Ok(Selected::Default),
        [] => Err(LoadError::NoLoaderFound { type_name: target.type_name(), context: None }),
        [loader] => Ok(Selected::Loader(loader)),
        many => Err(LoadError::AmbiguousLoader {
            type_name: target.type_name(),
            candidates: many.iter().map(|loader| loader.name()).collect(),
            context: None,
        }),
    }
}
