//! Registrable type catalog.
//!
//! Implementations are described up front by the embedding application
//! instead of being discovered by scanning loaded code. A descriptor carries
//! the type's markers, its initializers and the contracts it can be viewed as.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use dashmap::DashMap;

use crate::container::descriptor::{ContractId, Instance};
use crate::container::markers::{TypeKind, TypeMarkers};
use crate::container::scope::ServiceScope;
use crate::errors::CoreError;

/// Erased initializer body
pub type InitializeFn =
    Arc<dyn Fn(&InitializerArgs<'_>) -> Result<Instance, CoreError> + Send + Sync>;

/// Erased conversion from a concrete instance to one of its contracts
pub type UpcastFn = Arc<dyn Fn(&Instance) -> Result<Instance, CoreError> + Send + Sync>;

/// A single initializer parameter
#[derive(Debug, Clone)]
pub struct ParameterInfo {
    pub name: String,
    pub contract: ContractId,
    /// Explicit last-mapping marker on the parameter
    pub last_mapping: bool,
    /// Ignore marker: do not inherit last-mapping from the parameter's type
    pub ignore_type_marker: bool,
}

/// Resolved argument values handed to an initializer body
pub struct InitializerArgs<'a> {
    owner: &'static str,
    values: &'a [Instance],
}

impl<'a> InitializerArgs<'a> {
    pub(crate) fn new(owner: &'static str, values: &'a [Instance]) -> Self {
        Self { owner, values }
    }

    /// Number of arguments
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Shared handle to argument `index`
    pub fn get<T: ?Sized + Send + Sync + 'static>(
        &self,
        index: usize,
    ) -> Result<Arc<T>, CoreError> {
        self.values
            .get(index)
            .ok_or_else(|| CoreError::missing_argument(format!("{}#{}", self.owner, index)))?
            .try_downcast::<T>()
    }

    /// Owned copy of argument `index`, for simple values
    pub fn value<T: Clone + Send + Sync + 'static>(&self, index: usize) -> Result<T, CoreError> {
        self.get::<T>(index).map(|value| (*value).clone())
    }
}

/// A named construction entry point of a concrete type
#[derive(Clone)]
pub struct Initializer {
    pub name: String,
    pub priority: i32,
    pub parameters: Vec<ParameterInfo>,
    owner: &'static str,
    invoke: InitializeFn,
}

impl Initializer {
    /// Start describing an initializer of `T`
    pub fn of<T: Send + Sync + 'static>(name: impl Into<String>) -> InitializerBuilder<T> {
        InitializerBuilder {
            name: name.into(),
            priority: 0,
            parameters: Vec::new(),
            _phantom: PhantomData,
        }
    }

    /// Run the initializer with already resolved arguments
    pub fn invoke(&self, values: &[Instance]) -> Result<Instance, CoreError> {
        (self.invoke)(&InitializerArgs::new(self.owner, values))
    }

    /// Human readable signature used in diagnostics
    pub fn signature(&self) -> String {
        let params = self
            .parameters
            .iter()
            .map(|p| format!("{}: {}", p.name, p.contract.type_name()))
            .collect::<Vec<_>>()
            .join(", ");
        format!("{}({})", self.name, params)
    }
}

impl std::fmt::Debug for Initializer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Initializer")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("parameters", &self.parameters)
            .finish()
    }
}

/// An initializer known to construct a `T`
pub struct TypedInitializer<T> {
    initializer: Initializer,
    _phantom: PhantomData<fn() -> T>,
}

/// Builder for initializers
pub struct InitializerBuilder<T> {
    name: String,
    priority: i32,
    parameters: Vec<ParameterInfo>,
    _phantom: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> InitializerBuilder<T> {
    /// Priority marker; lower values are tried first
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Add a parameter resolved from the container
    pub fn param<P: ?Sized + 'static>(self, name: impl Into<String>) -> Self {
        self.push::<P>(name, false, false)
    }

    /// Add a parameter carrying the last-mapping marker
    pub fn last_mapping<P: ?Sized + 'static>(self, name: impl Into<String>) -> Self {
        self.push::<P>(name, true, false)
    }

    /// Add a parameter carrying the ignore marker
    pub fn ignore_type_marker<P: ?Sized + 'static>(self, name: impl Into<String>) -> Self {
        self.push::<P>(name, false, true)
    }

    fn push<P: ?Sized + 'static>(
        mut self,
        name: impl Into<String>,
        last_mapping: bool,
        ignore: bool,
    ) -> Self {
        self.parameters.push(ParameterInfo {
            name: name.into(),
            contract: ContractId::of::<P>(),
            last_mapping,
            ignore_type_marker: ignore,
        });
        self
    }

    /// Finish with the body that builds a `T` from the resolved arguments
    pub fn build<F>(self, body: F) -> TypedInitializer<T>
    where
        F: Fn(&InitializerArgs<'_>) -> Result<T, CoreError> + Send + Sync + 'static,
    {
        TypedInitializer {
            initializer: Initializer {
                name: self.name,
                priority: self.priority,
                parameters: self.parameters,
                owner: std::any::type_name::<T>(),
                invoke: Arc::new(move |args| body(args).map(Instance::new)),
            },
            _phantom: PhantomData,
        }
    }
}

/// Catalog entry describing one type
pub struct TypeDescriptor {
    pub id: ContractId,
    pub kind: TypeKind,
    /// Lifetime marker
    pub lifetime: Option<ServiceScope>,
    /// Default-implementation marker
    pub default_implementation: Option<ContractId>,
    /// Last-mapping marker on the type
    pub last_mapping: bool,
    initializers: Vec<Initializer>,
    upcasts: HashMap<ContractId, UpcastFn>,
}

impl TypeDescriptor {
    /// Describe an instantiable implementation
    pub fn concrete<T: Send + Sync + 'static>() -> TypeDescriptorBuilder<T> {
        TypeDescriptorBuilder::new(TypeKind::Concrete)
    }

    /// Describe an interface contract, usually a `dyn Trait`
    pub fn interface<T: ?Sized + 'static>() -> TypeDescriptorBuilder<T> {
        TypeDescriptorBuilder::new(TypeKind::Interface)
    }

    /// Describe a type that exists as a contract but cannot be constructed
    pub fn abstract_type<T: ?Sized + 'static>() -> TypeDescriptorBuilder<T> {
        TypeDescriptorBuilder::new(TypeKind::Abstract)
    }

    /// Describe a user value type (an enum, a newtype around a number...)
    pub fn value<T: ?Sized + 'static>() -> TypeDescriptorBuilder<T> {
        TypeDescriptorBuilder::new(TypeKind::Value)
    }

    pub fn simple_name(&self) -> &'static str {
        self.id.simple_name()
    }

    pub fn module_path(&self) -> &'static str {
        self.id.module_path()
    }

    /// Initializers ordered by ascending priority, declaration order on ties
    pub fn initializers(&self) -> &[Initializer] {
        &self.initializers
    }

    /// Whether instances of this type can be handed out as `contract`
    pub fn is_assignable_to(&self, contract: &ContractId) -> bool {
        self.id == *contract || self.upcasts.contains_key(contract)
    }

    /// Contracts this type declares itself assignable to
    pub fn contracts(&self) -> impl Iterator<Item = &ContractId> {
        self.upcasts.keys()
    }

    /// View a concrete instance as `contract`
    pub fn upcast(
        &self,
        instance: &Instance,
        contract: &ContractId,
    ) -> Result<Instance, CoreError> {
        if self.id == *contract {
            return Ok(instance.clone());
        }

        let upcast = self.upcasts.get(contract).ok_or_else(|| CoreError::TypeMismatch {
            expected: contract.type_name().to_string(),
            found: self.id.type_name().to_string(),
        })?;
        upcast(instance)
    }
}

impl std::fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("lifetime", &self.lifetime)
            .field("default_implementation", &self.default_implementation)
            .field("last_mapping", &self.last_mapping)
            .field("initializers", &self.initializers)
            .field("contracts", &self.upcasts.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Builder for type descriptors
pub struct TypeDescriptorBuilder<T: ?Sized> {
    kind: TypeKind,
    lifetime: Option<ServiceScope>,
    default_implementation: Option<ContractId>,
    last_mapping: bool,
    initializers: Vec<Initializer>,
    upcasts: HashMap<ContractId, UpcastFn>,
    _phantom: PhantomData<fn() -> Box<T>>,
}

impl<T: ?Sized + 'static> TypeDescriptorBuilder<T> {
    fn new(kind: TypeKind) -> Self {
        Self {
            kind,
            lifetime: None,
            default_implementation: None,
            last_mapping: false,
            initializers: Vec::new(),
            upcasts: HashMap::new(),
            _phantom: PhantomData,
        }
    }

    /// Lifetime marker
    pub fn lifetime(mut self, lifetime: ServiceScope) -> Self {
        self.lifetime = Some(lifetime);
        self
    }

    /// Default-implementation marker: resolve this contract to `I` without naming heuristics
    pub fn default_implementation<I: 'static>(mut self) -> Self {
        self.default_implementation = Some(ContractId::of::<I>());
        self
    }

    /// Last-mapping marker: parameters of this type are taken from late-bound arguments
    pub fn last_mapping(mut self) -> Self {
        self.last_mapping = true;
        self
    }

    pub fn build(mut self) -> TypeDescriptor {
        // stable sort keeps declaration order for equal priorities
        self.initializers.sort_by_key(|init| init.priority);

        TypeDescriptor {
            id: ContractId::of::<T>(),
            kind: self.kind,
            lifetime: self.lifetime,
            default_implementation: self.default_implementation,
            last_mapping: self.last_mapping,
            initializers: self.initializers,
            upcasts: self.upcasts,
        }
    }
}

impl<T: Send + Sync + 'static> TypeDescriptorBuilder<T> {
    /// Add an initializer
    pub fn initializer(mut self, initializer: TypedInitializer<T>) -> Self {
        self.initializers.push(initializer.initializer);
        self
    }

    /// Add a zero-parameter initializer backed by `Default`
    pub fn default_initializer(self) -> Self
    where
        T: Default,
    {
        self.initializer(Initializer::of::<T>("default").build(|_| Ok(T::default())))
    }

    /// Declare that `T` can be handed out as contract `C`
    pub fn implements<C>(mut self, upcast: fn(Arc<T>) -> Arc<C>) -> Self
    where
        C: ?Sized + Send + Sync + 'static,
    {
        let erased: UpcastFn = Arc::new(move |instance: &Instance| {
            let concrete = instance.try_downcast::<T>()?;
            Ok(Instance::from_arc(upcast(concrete)))
        });
        self.upcasts.insert(ContractId::of::<C>(), erased);
        self
    }
}

/// Catalog of every type the resolver may construct or discover
#[derive(Debug, Default)]
pub struct TypeCatalog {
    types: DashMap<ContractId, Arc<TypeDescriptor>>,
    by_path: DashMap<&'static str, ContractId>,
}

impl TypeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a descriptor
    pub fn register(&self, descriptor: TypeDescriptor) -> &Self {
        tracing::trace!(
            type_name = descriptor.id.type_name(),
            kind = %descriptor.kind,
            "registering type descriptor"
        );
        self.by_path.insert(descriptor.id.path(), descriptor.id);
        self.types.insert(descriptor.id, Arc::new(descriptor));
        self
    }

    pub fn get(&self, id: &ContractId) -> Option<Arc<TypeDescriptor>> {
        self.types.get(id).map(|entry| entry.value().clone())
    }

    /// Look a type up by fully qualified path (without `dyn ` or generics)
    pub fn find_by_path(&self, path: &str) -> Option<Arc<TypeDescriptor>> {
        let id = *self.by_path.get(path)?.value();
        self.get(&id)
    }

    /// Every concrete type whose simple name is `simple_name`, ordered by path
    pub fn concrete_named(&self, simple_name: &str) -> Vec<Arc<TypeDescriptor>> {
        let mut found: Vec<Arc<TypeDescriptor>> = self
            .types
            .iter()
            .filter(|entry| {
                entry.value().kind.is_constructible() && entry.value().simple_name() == simple_name
            })
            .map(|entry| entry.value().clone())
            .collect();
        found.sort_by_key(|descriptor| descriptor.id.path());
        found
    }

    pub fn contains(&self, id: &ContractId) -> bool {
        self.types.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl TypeMarkers for TypeCatalog {
    fn kind_of(&self, id: &ContractId) -> Option<TypeKind> {
        self.types.get(id).map(|entry| entry.value().kind)
    }

    fn lifetime_of(&self, id: &ContractId) -> Option<ServiceScope> {
        self.types.get(id).and_then(|entry| entry.value().lifetime)
    }

    fn default_implementation_of(&self, id: &ContractId) -> Option<ContractId> {
        self.types.get(id).and_then(|entry| entry.value().default_implementation)
    }

    fn is_last_mapping_type(&self, id: &ContractId) -> bool {
        self.types.get(id).map(|entry| entry.value().last_mapping).unwrap_or(false)
    }
}
