//! Declarative module metadata.
//!
//! A [`ModuleDescriptor`] tells the loader everything it needs about a type: which type
//! provides it, the loaders (constructors and factories) declared on it, the fields
//! injected after construction and the properties all of them consume.

use crate::catalog::Loadable;
use crate::error::{BoxError, LoadError};
use anvil_domain::{DefaultValue, PropertyKey};
use anvil_store::{ConversionError, FromProperty};
use std::any::{Any, TypeId, type_name};
use std::borrow::Cow;
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// A constructed value whose concrete type is only known to its descriptor.
pub type ModuleValue = Box<dyn Any + Send + Sync>;

type Coerce = fn(&str) -> Result<ModuleValue, ConversionError>;
type Invoke = Arc<dyn Fn(&mut Arguments) -> Result<ModuleValue, BoxError> + Send + Sync>;
type Setter = Arc<dyn Fn(&mut ModuleValue, ModuleValue) -> Result<(), LoadError> + Send + Sync>;

fn coerce_into<T>(raw: &str) -> Result<ModuleValue, ConversionError>
where
    T: FromProperty + Send + Sync + 'static,
{
    T::from_property(raw).map(|value| Box::new(value) as ModuleValue)
}

/// A type reference that can also describe the referenced type on demand.
#[derive(Clone, Copy)]
pub struct TypeRef {
    pub id: TypeId,
    pub name: &'static str,
    pub(crate) describe: Option<fn() -> ModuleDescriptor>,
}

impl TypeRef {
    #[must_use]
    pub fn of<T: Loadable>() -> Self {
        Self { id: TypeId::of::<T>(), name: type_name::<T>(), describe: Some(T::describe) }
    }

    fn plain<T: 'static>() -> Self {
        Self { id: TypeId::of::<T>(), name: type_name::<T>(), describe: None }
    }
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// A property consumed by a loader parameter, an injected field or declared on a module.
#[derive(Clone)]
pub struct PropertyDescriptor {
    key: PropertyKey,
    default: DefaultValue,
    target: TypeRef,
    coerce: Option<Coerce>,
}

impl PropertyDescriptor {
    /// A property of a string-parsable type in the default domain, without default.
    pub fn new<T>(name: impl Into<Cow<'static, str>>) -> Self
    where
        T: FromProperty + Send + Sync + 'static,
    {
        Self {
            key: PropertyKey::in_default(name),
            default: DefaultValue::Null,
            target: TypeRef::plain::<T>(),
            coerce: Some(coerce_into::<T>),
        }
    }

    /// A property whose value is another module, built through the loader (`$LOAD$`).
    ///
    /// Modules cannot be parsed, so a stored value or an override for this key fails
    /// with a conversion error.
    pub fn module<T: Loadable>(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            key: PropertyKey::in_default(name),
            default: DefaultValue::Load,
            target: TypeRef::of::<T>(),
            coerce: None,
        }
    }

    /// Like [`PropertyDescriptor::new`] for a loadable type that can also be parsed, so
    /// a stored string takes precedence over loading it.
    pub fn loadable<T>(name: impl Into<Cow<'static, str>>) -> Self
    where
        T: Loadable + FromProperty,
    {
        Self {
            key: PropertyKey::in_default(name),
            default: DefaultValue::Load,
            target: TypeRef::of::<T>(),
            coerce: Some(coerce_into::<T>),
        }
    }

    #[must_use = "Sets the domain of the property"]
    pub fn domain(mut self, domain: impl Into<Cow<'static, str>>) -> Self {
        self.key.domain = domain.into();
        self
    }

    /// Declares the raw default; `$NULL$` and `$LOAD$` are recognised.
    #[must_use = "Sets the declared default"]
    pub fn default_value(mut self, raw: impl Into<Cow<'static, str>>) -> Self {
        self.default = DefaultValue::parse(raw);
        self
    }

    #[must_use]
    pub const fn key(&self) -> &PropertyKey {
        &self.key
    }

    #[must_use]
    pub const fn default(&self) -> &DefaultValue {
        &self.default
    }

    #[must_use]
    pub const fn target_name(&self) -> &'static str {
        self.target.name
    }

    #[must_use]
    pub const fn target_id(&self) -> TypeId {
        self.target.id
    }

    pub(crate) const fn target(&self) -> &TypeRef {
        &self.target
    }

    /// Parses `raw` into the target type.
    ///
    /// # Errors
    /// [`LoadError::PropertyConversion`] when the string is invalid or the target cannot
    /// be built from a string at all.
    pub(crate) fn coerce(&self, raw: &str) -> Result<ModuleValue, LoadError> {
        let conversion = |source| LoadError::PropertyConversion {
            key: self.key.clone(),
            raw: raw.to_owned(),
            target: self.target.name,
            source,
            context: None,
        };

        let coerce = self.coerce.ok_or_else(|| {
            conversion(ConversionError {
                target: self.target.name,
                reason: "type is only constructed through the loader".into(),
            })
        })?;
        coerce(raw).map_err(conversion)
    }
}

impl fmt::Debug for PropertyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyDescriptor")
            .field("key", &self.key)
            .field("default", &self.default)
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderKind {
    /// Builds the type it is declared on.
    Constructor,
    /// Declared on a provider, builds another type.
    Factory,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Visibility {
    #[default]
    Public,
    /// Never selected by the loader; kept for introspection.
    Private,
}

/// A marked constructor or factory routine.
#[derive(Clone)]
pub struct LoaderDescriptor {
    name: &'static str,
    kind: LoaderKind,
    visibility: Visibility,
    produces: TypeRef,
    params: Vec<PropertyDescriptor>,
    invoke: Invoke,
}

impl LoaderDescriptor {
    /// A constructor of `T`, meant for `T`'s own descriptor.
    pub fn constructor<T, F>(name: &'static str, build: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&mut Arguments) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        Self::with_kind(name, LoaderKind::Constructor, build)
    }

    /// A factory producing `T`, meant for the descriptor of `T`'s provider.
    pub fn factory<T, F>(name: &'static str, build: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&mut Arguments) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        Self::with_kind(name, LoaderKind::Factory, build)
    }

    fn with_kind<T, F>(name: &'static str, kind: LoaderKind, build: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&mut Arguments) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        Self {
            name,
            kind,
            visibility: Visibility::Public,
            produces: TypeRef::plain::<T>(),
            params: Vec::new(),
            invoke: Arc::new(move |args: &mut Arguments| {
                build(args).map(|value| Box::new(value) as ModuleValue)
            }),
        }
    }

    /// Appends a parameter; parameters are resolved in declaration order.
    #[must_use = "Adds a parameter to the loader"]
    pub fn param(mut self, property: PropertyDescriptor) -> Self {
        self.params.push(property);
        self
    }

    #[must_use = "Hides the loader from selection"]
    pub const fn private(mut self) -> Self {
        self.visibility = Visibility::Private;
        self
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub const fn kind(&self) -> LoaderKind {
        self.kind
    }

    #[must_use]
    pub const fn visibility(&self) -> Visibility {
        self.visibility
    }

    #[must_use]
    pub const fn produces(&self) -> TypeId {
        self.produces.id
    }

    #[must_use]
    pub fn params(&self) -> &[PropertyDescriptor] {
        &self.params
    }

    pub(crate) fn invoke(&self, args: &mut Arguments) -> Result<ModuleValue, BoxError> {
        (self.invoke)(args)
    }
}

impl fmt::Debug for LoaderDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoaderDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("visibility", &self.visibility)
            .field("produces", &self.produces)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// A field set on a freshly constructed instance.
#[derive(Clone)]
pub struct FieldDescriptor {
    property: PropertyDescriptor,
    set: Setter,
}

impl FieldDescriptor {
    #[must_use]
    pub const fn property(&self) -> &PropertyDescriptor {
        &self.property
    }

    pub(crate) fn apply(&self, instance: &mut ModuleValue, value: ModuleValue) -> Result<(), LoadError> {
        (self.set)(instance, value)
    }
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FieldDescriptor").field(&self.property).finish()
    }
}

/// Resolved loader arguments, handed out in declaration order.
#[derive(Debug)]
pub struct Arguments {
    owner: &'static str,
    values: VecDeque<(&'static str, ModuleValue)>,
}

impl Arguments {
    pub(crate) const fn new(owner: &'static str, values: VecDeque<(&'static str, ModuleValue)>) -> Self {
        Self { owner, values }
    }

    /// Takes the next argument.
    ///
    /// # Errors
    /// [`LoadError::Internal`] if arguments are exhausted or `T` is not the declared type.
    pub fn next<T: 'static>(&mut self) -> Result<T, LoadError> {
        let (declared, value) = self.values.pop_front().ok_or_else(|| LoadError::Internal {
            message: format!("{} takes more arguments than it declares", self.owner).into(),
            context: None,
        })?;

        value.downcast::<T>().map(|value| *value).map_err(|_| LoadError::Internal {
            message: format!("{} declared {declared} but asked for {}", self.owner, type_name::<T>())
                .into(),
            context: None,
        })
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.values.len()
    }
}

type DefaultConstructor = Arc<dyn Fn() -> ModuleValue + Send + Sync>;

/// Everything the loader knows about one type.
#[derive(Clone)]
pub struct ModuleDescriptor {
    module: TypeRef,
    provider: Option<TypeRef>,
    loaders: Vec<LoaderDescriptor>,
    default_constructor: Option<DefaultConstructor>,
    fields: Vec<FieldDescriptor>,
    properties: Vec<PropertyDescriptor>,
}

impl ModuleDescriptor {
    pub fn builder<T: Send + Sync + 'static>() -> ModuleDescriptorBuilder<T> {
        ModuleDescriptorBuilder {
            descriptor: Self {
                module: TypeRef::plain::<T>(),
                provider: None,
                loaders: Vec::new(),
                default_constructor: None,
                fields: Vec::new(),
                properties: Vec::new(),
            },
            _module: PhantomData,
        }
    }

    #[must_use]
    pub const fn module_id(&self) -> TypeId {
        self.module.id
    }

    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.module.name
    }

    /// The type whose loaders build this one; the type itself when `None`.
    #[must_use]
    pub fn provider(&self) -> Option<TypeId> {
        self.provider.map(|provider| provider.id)
    }

    #[must_use]
    pub fn loaders(&self) -> &[LoaderDescriptor] {
        &self.loaders
    }

    #[must_use]
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    #[must_use]
    pub fn properties(&self) -> &[PropertyDescriptor] {
        &self.properties
    }

    #[must_use]
    pub fn has_default_constructor(&self) -> bool {
        self.default_constructor.is_some()
    }

    pub(crate) fn construct_default(&self) -> Option<ModuleValue> {
        self.default_constructor.as_ref().map(|build| build())
    }

    /// Every property the type consumes: declared properties, loader parameters and fields.
    pub fn all_properties(&self) -> impl Iterator<Item = &PropertyDescriptor> {
        self.properties
            .iter()
            .chain(self.loaders.iter().flat_map(|loader| loader.params.iter()))
            .chain(self.fields.iter().map(|field| &field.property))
    }

    /// Concrete string defaults grouped by domain. Domains with no concrete default are
    /// still listed so they can be loaded.
    #[must_use]
    pub fn domain_defaults(&self) -> BTreeMap<String, Vec<(String, String)>> {
        let mut domains: BTreeMap<String, Vec<(String, String)>> = BTreeMap::new();
        for property in self.all_properties() {
            let key = property.key();
            let entry = domains.entry(key.domain.to_string()).or_default();
            if let Some(raw) = property.default().as_value() {
                entry.push((key.name.to_string(), raw.to_owned()));
            }
        }
        domains
    }

    /// Types this descriptor refers to that can describe themselves.
    pub(crate) fn dependencies(&self) -> impl Iterator<Item = &TypeRef> {
        self.provider
            .iter()
            .chain(self.all_properties().map(PropertyDescriptor::target))
            .filter(|type_ref| type_ref.describe.is_some())
    }
}

impl fmt::Debug for ModuleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleDescriptor")
            .field("module", &self.module)
            .field("provider", &self.provider)
            .field("loaders", &self.loaders)
            .field("default_constructor", &self.default_constructor.is_some())
            .field("fields", &self.fields)
            .field("properties", &self.properties)
            .finish()
    }
}

/// Typed construction of a [`ModuleDescriptor`] for `T`.
///
/// ```rust
/// use anvil_kernel::{LoaderDescriptor, ModuleDescriptor, PropertyDescriptor};
///
/// struct Cache {
///     size: u32,
///     ttl: u64,
/// }
///
/// let descriptor = ModuleDescriptor::builder::<Cache>()
///     .loader(
///         LoaderDescriptor::constructor("Cache::new", |args| {
///             Ok(Cache { size: args.next()?, ttl: 0 })
///         })
///         .param(PropertyDescriptor::new::<u32>("size").domain("cache").default_value("64")),
///     )
///     .field(PropertyDescriptor::new::<u64>("ttl").domain("cache"), |cache, ttl| cache.ttl = ttl)
///     .build();
///
/// assert_eq!(descriptor.loaders().len(), 1);
/// assert_eq!(descriptor.domain_defaults()["cache"], vec![("size".to_owned(), "64".to_owned())]);
/// ```
pub struct ModuleDescriptorBuilder<T> {
    descriptor: ModuleDescriptor,
    _module: PhantomData<fn() -> T>,
}

impl<T> fmt::Debug for ModuleDescriptorBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ModuleDescriptorBuilder").field(&self.descriptor).finish()
    }
}

impl<T: Send + Sync + 'static> ModuleDescriptorBuilder<T> {
    /// Delegates construction to the loaders declared on `P`.
    #[must_use = "Sets the provider of the module"]
    pub fn provided_by<P: Loadable>(mut self) -> Self {
        self.descriptor.provider = Some(TypeRef::of::<P>());
        self
    }

    #[must_use = "Declares a loader"]
    pub fn loader(mut self, loader: LoaderDescriptor) -> Self {
        self.descriptor.loaders.push(loader);
        self
    }

    /// Fallback used when no public loader produces `T`.
    #[must_use = "Declares the no-argument constructor"]
    pub fn default_constructor(mut self, build: fn() -> T) -> Self {
        self.descriptor.default_constructor = Some(Arc::new(move || Box::new(build()) as ModuleValue));
        self
    }

    /// Injects `property` into the constructed instance through `set`.
    #[must_use = "Declares an injected field"]
    pub fn field<F: Send + Sync + 'static>(
        mut self,
        property: PropertyDescriptor,
        set: fn(&mut T, F),
    ) -> Self {
        let owner = type_name::<T>();
        let field = property.key().clone();
        let mismatch = move || LoadError::Internal {
            message: format!("field `{field}` of {owner} does not accept {}", type_name::<F>()).into(),
            context: None,
        };

        let setter: Setter = Arc::new(move |instance: &mut ModuleValue, value: ModuleValue| {
            let target = instance.downcast_mut::<T>().ok_or_else(&mismatch)?;
            let value = value.downcast::<F>().map_err(|_| mismatch())?;
            set(target, *value);
            Ok(())
        });
        self.descriptor.fields.push(FieldDescriptor { property, set: setter });
        self
    }

    /// Declares a property owned by the module without binding it to a loader or field.
    #[must_use = "Declares a module property"]
    pub fn property(mut self, property: PropertyDescriptor) -> Self {
        self.descriptor.properties.push(property);
        self
    }

    #[must_use]
    pub fn build(self) -> ModuleDescriptor {
        self.descriptor
    }
}

impl<T: Default + Send + Sync + 'static> ModuleDescriptorBuilder<T> {
    /// Uses `T::default` as the no-argument constructor.
    #[must_use = "Declares the no-argument constructor"]
    pub fn with_default(self) -> Self {
        self.default_constructor(T::default)
    }
}
