use std::sync::{Arc, Weak};

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use uuid::Uuid;

use crate::config::ContainerConfig;
use crate::container::autowiring::InitializerSelector;
use crate::container::binding::BindingConfig;
use crate::container::call_site::{CallSite, FactoryFn, Invocation};
use crate::container::catalog::{TypeCatalog, TypeDescriptor};
use crate::container::conventions::ServiceConventions;
use crate::container::descriptor::{ContractId, Instance, LateArgs};
use crate::container::hooks::ServiceResolveHook;
use crate::container::markers::{is_builtin_simple, TypeKind, TypeMarkers};
use crate::container::registry::{BindingRegistry, ValueKey};
use crate::container::resolver::{ResolutionPath, TypeResolver};
use crate::container::scope::{ScopeCache, ScopeId, ServiceScope};
use crate::errors::CoreError;

/// How far a lookup may go once the registry chain misses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Lookup {
    /// Explicit bindings only
    Fixed,
    /// Explicit bindings, then hooks, then discovery through the type catalog
    Auto,
}

pub(crate) struct ContainerInner {
    id: Uuid,
    registry: BindingRegistry,
    parent: Option<Container>,
    catalog: Arc<TypeCatalog>,
    conventions: Arc<ServiceConventions>,
    config: Arc<ContainerConfig>,
    resolve_locks: DashMap<ContractId, Arc<Mutex<()>>>,
    hooks: RwLock<Vec<Arc<dyn ServiceResolveHook>>>,
    root_scope: ScopeCache,
}

/// Service container.
///
/// A container owns a binding registry and optionally a parent. Lookups check
/// the local registry first and then every ancestor; contracts that are bound
/// nowhere are discovered through the shared [`TypeCatalog`] and cached
/// locally. Cloning a container yields another handle to the same registry.
#[derive(Clone)]
pub struct Container {
    inner: Arc<ContainerInner>,
}

impl Container {
    /// Create a root container with an empty type catalog and default configuration
    pub fn new() -> Self {
        Self::from_parts(
            Arc::new(TypeCatalog::new()),
            Arc::new(ServiceConventions::default()),
            Arc::new(ContainerConfig::default()),
            Vec::new(),
        )
    }

    /// Create a root container discovering implementations in `catalog`
    pub fn with_catalog(catalog: Arc<TypeCatalog>) -> Self {
        Self::from_parts(
            catalog,
            Arc::new(ServiceConventions::default()),
            Arc::new(ContainerConfig::default()),
            Vec::new(),
        )
    }

    pub(crate) fn from_parts(
        catalog: Arc<TypeCatalog>,
        conventions: Arc<ServiceConventions>,
        config: Arc<ContainerConfig>,
        hooks: Vec<Arc<dyn ServiceResolveHook>>,
    ) -> Self {
        Self::create(None, catalog, conventions, config, hooks)
    }

    fn create(
        parent: Option<Container>,
        catalog: Arc<TypeCatalog>,
        conventions: Arc<ServiceConventions>,
        config: Arc<ContainerConfig>,
        hooks: Vec<Arc<dyn ServiceResolveHook>>,
    ) -> Self {
        let inner = ContainerInner {
            id: Uuid::new_v4(),
            registry: BindingRegistry::new(),
            parent,
            catalog,
            conventions,
            config,
            resolve_locks: DashMap::new(),
            hooks: RwLock::new(hooks),
            root_scope: ScopeCache::new(),
        };
        tracing::debug!(
            container = %inner.id,
            has_parent = inner.parent.is_some(),
            "container created"
        );
        Self { inner: Arc::new(inner) }
    }

    /// Unique id of this container
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn parent(&self) -> Option<&Container> {
        self.inner.parent.as_ref()
    }

    pub fn catalog(&self) -> &Arc<TypeCatalog> {
        &self.inner.catalog
    }

    pub fn config(&self) -> &ContainerConfig {
        &self.inner.config
    }

    pub fn conventions(&self) -> &ServiceConventions {
        &self.inner.conventions
    }

    pub(crate) fn registry(&self) -> &BindingRegistry {
        &self.inner.registry
    }

    /// This container followed by each ancestor up to the root
    pub(crate) fn ancestry(&self) -> impl Iterator<Item = Container> {
        std::iter::successors(Some(self.clone()), |container| container.inner.parent.clone())
    }

    fn root(&self) -> Container {
        self.ancestry().last().unwrap_or_else(|| self.clone())
    }

    /// Create a child container whose lookups fall back to this one
    pub fn create_child_container(&self) -> Container {
        Self::create(
            Some(self.clone()),
            self.inner.catalog.clone(),
            self.inner.conventions.clone(),
            self.inner.config.clone(),
            Vec::new(),
        )
    }

    /// Open a logical scope; scoped services resolved through it are cached per scope
    pub fn create_scope(&self) -> ContainerScope {
        let scope = ContainerScope {
            container: self.clone(),
            cache: ScopeCache::new(),
        };
        tracing::debug!(container = %self.id(), scope = %scope.id(), "scope created");
        scope
    }

    /// Register a hook consulted for contracts without a binding
    pub fn add_resolve_hook<H: ServiceResolveHook + 'static>(&self, hook: H) -> &Self {
        self.inner.hooks.write().push(Arc::new(hook));
        self
    }

    // Registration

    /// Bind contract `C` to the catalogued concrete type `T`.
    ///
    /// `T` is validated immediately; its initializer is selected on first use.
    pub fn add<C, T>(&self, config: BindingConfig) -> Result<&Self, CoreError>
    where
        C: ?Sized + Send + Sync + 'static,
        T: ?Sized + 'static,
    {
        let contract = ContractId::of::<C>();
        let descriptor = self.concrete_descriptor(&contract, &ContractId::of::<T>())?;
        let lifetime = self.lifetime_for(&contract, Some(&descriptor), config.lifetime);
        let owner = if config.promote { self.root() } else { self.clone() };

        let factory = deferred_type_factory(&owner, contract, descriptor);
        self.register(contract, Arc::new(CallSite::new(contract, lifetime, factory)), config);
        Ok(self)
    }

    /// Bind the catalogued concrete type `T` to itself
    pub fn add_self<T>(&self, config: BindingConfig) -> Result<&Self, CoreError>
    where
        T: Send + Sync + 'static,
    {
        self.add::<T, T>(config)
    }

    /// Bind contract `C` to an existing instance
    pub fn add_instance<C>(
        &self,
        instance: Arc<C>,
        config: BindingConfig,
    ) -> Result<&Self, CoreError>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        let contract = ContractId::of::<C>();
        ensure_instance_lifetime(&contract, config)?;
        self.register(
            contract,
            Arc::new(CallSite::instance(contract, Instance::from_arc(instance))),
            config,
        );
        Ok(self)
    }

    /// Bind contract `C` to a factory callback
    pub fn add_factory<C, F>(&self, factory: F, config: BindingConfig) -> Result<&Self, CoreError>
    where
        C: ?Sized + Send + Sync + 'static,
        F: Fn(&Invocation<'_>) -> Result<Arc<C>, CoreError> + Send + Sync + 'static,
    {
        let contract = ContractId::of::<C>();
        let lifetime = self.lifetime_for(&contract, None, config.lifetime);
        let factory: FactoryFn =
            Arc::new(move |invocation| factory(invocation).map(Instance::from_arc));
        self.register(contract, Arc::new(CallSite::new(contract, lifetime, factory)), config);
        Ok(self)
    }

    /// Bind an untyped named value
    pub fn add_value<T>(
        &self,
        name: &str,
        value: T,
        config: BindingConfig,
    ) -> Result<&Self, CoreError>
    where
        T: Send + Sync + 'static,
    {
        let key = value_key(None, name)?;
        let contract = ContractId::of::<T>();
        ensure_instance_lifetime(&contract, config)?;
        let call_site = CallSite::instance(contract, Instance::new(value));
        self.register_value(key, Arc::new(call_site), config);
        Ok(self)
    }

    /// Bind an untyped named value produced by a factory
    pub fn add_value_factory<T, F>(
        &self,
        name: &str,
        factory: F,
        config: BindingConfig,
    ) -> Result<&Self, CoreError>
    where
        T: Send + Sync + 'static,
        F: Fn(&Invocation<'_>) -> Result<T, CoreError> + Send + Sync + 'static,
    {
        let key = value_key(None, name)?;
        let call_site = value_factory_site::<T, F>(self, factory, config);
        self.register_value(key, Arc::new(call_site), config);
        Ok(self)
    }

    /// Bind a value under `name`, visible only to lookups made for contract `C`
    pub fn add_named<C, T>(
        &self,
        name: &str,
        value: T,
        config: BindingConfig,
    ) -> Result<&Self, CoreError>
    where
        C: ?Sized + 'static,
        T: Send + Sync + 'static,
    {
        let key = value_key(Some(ContractId::of::<C>()), name)?;
        let contract = ContractId::of::<T>();
        ensure_instance_lifetime(&contract, config)?;
        let call_site = CallSite::instance(contract, Instance::new(value));
        self.register_value(key, Arc::new(call_site), config);
        Ok(self)
    }

    /// Bind a factory-produced value under `name` for contract `C`
    pub fn add_named_factory<C, T, F>(
        &self,
        name: &str,
        factory: F,
        config: BindingConfig,
    ) -> Result<&Self, CoreError>
    where
        C: ?Sized + 'static,
        T: Send + Sync + 'static,
        F: Fn(&Invocation<'_>) -> Result<T, CoreError> + Send + Sync + 'static,
    {
        let key = value_key(Some(ContractId::of::<C>()), name)?;
        let call_site = value_factory_site::<T, F>(self, factory, config);
        self.register_value(key, Arc::new(call_site), config);
        Ok(self)
    }

    fn register(&self, contract: ContractId, call_site: Arc<CallSite>, config: BindingConfig) {
        for container in self.targets(config.promote) {
            container.inner.registry.add(contract, call_site.clone(), config.overwrite);
        }
        tracing::debug!(
            container = %self.id(),
            contract = contract.type_name(),
            kind = ?call_site.kind(),
            promote = config.promote,
            overwrite = config.overwrite,
            "service registered"
        );
    }

    fn register_value(&self, key: ValueKey, call_site: Arc<CallSite>, config: BindingConfig) {
        for container in self.targets(config.promote) {
            container.inner.registry.add_value(key.clone(), call_site.clone());
        }
        tracing::debug!(
            container = %self.id(),
            name = key.name(),
            promote = config.promote,
            "value registered"
        );
    }

    fn targets(&self, promote: bool) -> Vec<Container> {
        if promote {
            self.ancestry().collect()
        } else {
            vec![self.clone()]
        }
    }

    fn concrete_descriptor(
        &self,
        contract: &ContractId,
        concrete: &ContractId,
    ) -> Result<Arc<TypeDescriptor>, CoreError> {
        let reject = |message: String| {
            tracing::warn!(
                contract = contract.type_name(),
                concrete = concrete.type_name(),
                %message,
                "registration rejected"
            );
            CoreError::invalid_registration(contract.type_name(), concrete.type_name(), message)
        };

        if is_builtin_simple(concrete) {
            return Err(reject(format!("{} is a value type", concrete.type_name())));
        }

        let descriptor = self
            .inner
            .catalog
            .get(concrete)
            .ok_or_else(|| reject(format!("{} is not in the type catalog", concrete.type_name())))?;

        if descriptor.kind != TypeKind::Concrete {
            return Err(reject(format!(
                "{} is {} and cannot be constructed",
                concrete.type_name(),
                descriptor.kind
            )));
        }

        if !descriptor.is_assignable_to(contract) {
            return Err(reject(format!(
                "{} does not declare an implementation of {}",
                concrete.type_name(),
                contract.type_name()
            )));
        }

        Ok(descriptor)
    }

    /// Explicit lifetime, then the implementation marker, then the contract
    /// marker, then convention rules, then the configured default
    fn lifetime_for(
        &self,
        contract: &ContractId,
        descriptor: Option<&TypeDescriptor>,
        explicit: Option<ServiceScope>,
    ) -> ServiceScope {
        explicit
            .or_else(|| descriptor.and_then(|descriptor| descriptor.lifetime))
            .or_else(|| self.inner.catalog.lifetime_of(contract))
            .or_else(|| {
                descriptor.and_then(|descriptor| {
                    self.inner.conventions.lifetime_for(descriptor.id.type_name())
                })
            })
            .unwrap_or(self.inner.config.default_lifetime)
    }

    // Lookup

    /// Resolve `C`, discovering an implementation if nothing is bound
    pub fn get<C: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<C>, CoreError> {
        self.get_with::<C>(&[])
    }

    /// Resolve `C`, handing `late_args` to last-mapping parameters
    pub fn get_with<C>(&self, late_args: &LateArgs) -> Result<Arc<C>, CoreError>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        self.produce::<C>(&self.inner.root_scope, late_args, Lookup::Auto)?
            .ok_or_else(|| self.unresolvable(&ContractId::of::<C>()))
    }

    /// Like [`Container::get`] but `Ok(None)` when no implementation can be found
    pub fn try_get<C: ?Sized + Send + Sync + 'static>(&self) -> Result<Option<Arc<C>>, CoreError> {
        self.produce::<C>(&self.inner.root_scope, &[], Lookup::Auto)
    }

    /// Resolve `C` from explicit bindings only
    pub fn get_fixed<C>(&self) -> Result<Option<Arc<C>>, CoreError>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        self.get_fixed_with::<C>(&[])
    }

    pub fn get_fixed_with<C: ?Sized + Send + Sync + 'static>(
        &self,
        late_args: &LateArgs,
    ) -> Result<Option<Arc<C>>, CoreError> {
        self.produce::<C>(&self.inner.root_scope, late_args, Lookup::Fixed)
    }

    /// One instance per explicit binding of `C`, local bindings first, newest first
    pub fn get_all<C: ?Sized + Send + Sync + 'static>(&self) -> Result<Vec<Arc<C>>, CoreError> {
        self.get_all_with::<C>(&[])
    }

    pub fn get_all_with<C>(&self, late_args: &LateArgs) -> Result<Vec<Arc<C>>, CoreError>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        self.produce_all::<C>(&self.inner.root_scope, late_args)
    }

    /// Untyped named value, `None` when unbound or of another type
    pub fn get_value<T: Send + Sync + 'static>(&self, name: &str) -> Option<Arc<T>> {
        self.lookup_value::<T>(&ValueKey::untyped(name))
    }

    /// Value named `name` for contract `C`
    pub fn get_named<C, T>(&self, name: &str) -> Option<Arc<T>>
    where
        C: ?Sized + 'static,
        T: Send + Sync + 'static,
    {
        self.lookup_value::<T>(&ValueKey::typed(ContractId::of::<C>(), name))
    }

    fn produce<C: ?Sized + Send + Sync + 'static>(
        &self,
        scope: &ScopeCache,
        late_args: &[Instance],
        lookup: Lookup,
    ) -> Result<Option<Arc<C>>, CoreError> {
        let contract = ContractId::of::<C>();
        let mut path = ResolutionPath::new();
        let Some(call_site) = self.resolve_call_site(&contract, &mut path, lookup)? else {
            tracing::debug!(
                container = %self.id(),
                contract = contract.type_name(),
                ?lookup,
                "no call site found"
            );
            return Ok(None);
        };

        let instance = call_site.invoke(&Invocation::new(self, late_args, scope))?;
        instance.try_downcast::<C>().map(Some)
    }

    fn produce_all<C: ?Sized + Send + Sync + 'static>(
        &self,
        scope: &ScopeCache,
        late_args: &[Instance],
    ) -> Result<Vec<Arc<C>>, CoreError> {
        let contract = ContractId::of::<C>();
        let mut seen = Vec::new();
        let mut instances = Vec::new();

        for container in self.ancestry() {
            for call_site in container.inner.registry.find_all(&contract) {
                // Promoted bindings are shared by several levels of the chain
                if seen.contains(&call_site.id()) {
                    continue;
                }
                seen.push(call_site.id());
                let instance = call_site.invoke(&Invocation::new(self, late_args, scope))?;
                instances.push(instance.try_downcast::<C>()?);
            }
        }

        Ok(instances)
    }

    fn lookup_value<T: Send + Sync + 'static>(&self, key: &ValueKey) -> Option<Arc<T>> {
        let call_site = self
            .ancestry()
            .find_map(|container| container.inner.registry.find_value(key))?;

        match call_site.invoke(&Invocation::new(self, &[], &self.inner.root_scope)) {
            Ok(instance) => {
                let value = instance.downcast::<T>();
                if value.is_none() {
                    tracing::warn!(
                        name = key.name(),
                        expected = std::any::type_name::<T>(),
                        found = instance.type_name(),
                        "named value has a different type"
                    );
                }
                value
            }
            Err(error) => {
                tracing::warn!(name = key.name(), %error, "named value could not be produced");
                None
            }
        }
    }

    fn unresolvable(&self, contract: &ContractId) -> CoreError {
        tracing::warn!(
            container = %self.id(),
            contract = contract.type_name(),
            "contract cannot be resolved"
        );
        CoreError::unresolvable(contract.type_name())
    }

    /// Find or build the call site for `contract`.
    ///
    /// Registry hits return immediately. Misses take the contract's resolve
    /// lock in this container, then try hooks and catalog discovery, and cache
    /// the result here so each contract is built once per container.
    pub(crate) fn resolve_call_site(
        &self,
        contract: &ContractId,
        path: &mut ResolutionPath,
        lookup: Lookup,
    ) -> Result<Option<Arc<CallSite>>, CoreError> {
        if let Some(call_site) = self.find_in_chain(contract) {
            tracing::trace!(
                container = %self.id(),
                contract = contract.type_name(),
                "call site cache hit"
            );
            return Ok(Some(call_site));
        }

        if lookup == Lookup::Fixed {
            return Ok(None);
        }

        path.enter(*contract)?;
        let resolved = self.resolve_unbound(contract, path);
        path.leave();
        resolved
    }

    fn resolve_unbound(
        &self,
        contract: &ContractId,
        path: &mut ResolutionPath,
    ) -> Result<Option<Arc<CallSite>>, CoreError> {
        let lock = self.inner.resolve_locks.entry(*contract).or_default().value().clone();
        let _guard = lock
            .try_lock_for(self.inner.config.resolve_lock_timeout())
            .ok_or_else(|| CoreError::LockError {
                resource: format!("{}:{}", self.id(), contract.type_name()),
            })?;

        // Another thread may have finished while we waited
        if let Some(call_site) = self.find_in_chain(contract) {
            return Ok(Some(call_site));
        }

        if let Some(call_site) = self.resolve_from_hooks(contract) {
            return Ok(Some(self.inner.registry.add_if_absent(*contract, call_site)));
        }

        if !self.inner.config.auto_resolution {
            tracing::trace!(
                container = %self.id(),
                contract = contract.type_name(),
                "auto resolution disabled"
            );
            return Ok(None);
        }

        let resolver = TypeResolver::new(&self.inner.catalog, &self.inner.conventions);
        let Some(descriptor) = resolver.discover(contract)? else {
            return Ok(None);
        };

        let factory = InitializerSelector::new(self, *contract, &descriptor).build_factory(path)?;
        let lifetime = self.lifetime_for(contract, Some(&descriptor), None);
        let call_site = Arc::new(CallSite::new(*contract, lifetime, factory));

        tracing::debug!(
            container = %self.id(),
            contract = contract.type_name(),
            implementation = descriptor.id.type_name(),
            %lifetime,
            "call site built"
        );
        Ok(Some(self.inner.registry.add_if_absent(*contract, call_site)))
    }

    fn resolve_from_hooks(&self, contract: &ContractId) -> Option<Arc<CallSite>> {
        let resolution = self.ancestry().find_map(|container| {
            let hooks = container.inner.hooks.read();
            hooks.iter().find_map(|hook| hook.resolve(contract))
        })?;

        tracing::debug!(
            container = %self.id(),
            contract = contract.type_name(),
            lifetime = %resolution.lifetime,
            "contract supplied by resolve hook"
        );
        Some(Arc::new(CallSite::new(*contract, resolution.lifetime, resolution.factory)))
    }

    fn find_in_chain(&self, contract: &ContractId) -> Option<Arc<CallSite>> {
        self.ancestry().find_map(|container| container.inner.registry.find(contract))
    }

    // Inspection

    /// Whether `C` has a type binding locally, or anywhere in the chain with `promote`
    pub fn contains<C: ?Sized + 'static>(&self, promote: bool) -> bool {
        let contract = ContractId::of::<C>();
        self.targets(promote)
            .iter()
            .any(|container| container.inner.registry.contains(&contract))
    }

    pub fn contains_value(&self, name: &str, promote: bool) -> bool {
        let key = ValueKey::untyped(name);
        self.targets(promote)
            .iter()
            .any(|container| container.inner.registry.contains_value(&key))
    }

    pub fn contains_named<C: ?Sized + 'static>(&self, name: &str, promote: bool) -> bool {
        let key = ValueKey::typed(ContractId::of::<C>(), name);
        self.targets(promote)
            .iter()
            .any(|container| container.inner.registry.contains_value(&key))
    }

    /// Drop every type binding of `C` locally, and in every ancestor with `promote`
    pub fn remove<C: ?Sized + 'static>(&self, promote: bool) -> bool {
        let contract = ContractId::of::<C>();
        let removed = self
            .targets(promote)
            .iter()
            .fold(false, |removed, container| {
                container.inner.registry.remove(&contract) | removed
            });
        tracing::debug!(
            container = %self.id(),
            contract = contract.type_name(),
            removed,
            "service removed"
        );
        removed
    }

    pub fn remove_value(&self, name: &str, promote: bool) -> bool {
        let key = ValueKey::untyped(name);
        self.targets(promote)
            .iter()
            .fold(false, |removed, container| container.inner.registry.remove_value(&key) | removed)
    }

    pub fn remove_named<C: ?Sized + 'static>(&self, name: &str, promote: bool) -> bool {
        let key = ValueKey::typed(ContractId::of::<C>(), name);
        self.targets(promote)
            .iter()
            .fold(false, |removed, container| container.inner.registry.remove_value(&key) | removed)
    }

    /// Forget every binding and cached instance of this container; ancestors are untouched
    pub fn destroy_all(&self) {
        let services = self.inner.registry.len();
        self.inner.registry.clear();
        self.inner.resolve_locks.clear();
        self.inner.root_scope.clear();
        tracing::debug!(container = %self.id(), services, "container destroyed");
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("id", &self.inner.id)
            .field("parent", &self.inner.parent.as_ref().map(|parent| parent.id()))
            .field("services", &self.inner.registry.len())
            .field("auto_resolution", &self.inner.config.auto_resolution)
            .finish()
    }
}

/// A logical unit of work over a container.
///
/// Scoped services are created once per `ContainerScope`; singletons and
/// transients behave as they do on the container. Dropping the scope drops
/// its scoped instances.
pub struct ContainerScope {
    container: Container,
    cache: ScopeCache,
}

impl ContainerScope {
    pub fn id(&self) -> ScopeId {
        self.cache.scope_id()
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn get<C: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<C>, CoreError> {
        self.get_with::<C>(&[])
    }

    pub fn get_with<C>(&self, late_args: &LateArgs) -> Result<Arc<C>, CoreError>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        self.container
            .produce::<C>(&self.cache, late_args, Lookup::Auto)?
            .ok_or_else(|| self.container.unresolvable(&ContractId::of::<C>()))
    }

    pub fn try_get<C: ?Sized + Send + Sync + 'static>(&self) -> Result<Option<Arc<C>>, CoreError> {
        self.container.produce::<C>(&self.cache, &[], Lookup::Auto)
    }

    pub fn get_all<C: ?Sized + Send + Sync + 'static>(&self) -> Result<Vec<Arc<C>>, CoreError> {
        self.container.produce_all::<C>(&self.cache, &[])
    }

    /// Number of scoped instances created so far
    pub fn service_count(&self) -> usize {
        self.cache.service_count()
    }
}

impl std::fmt::Debug for ContainerScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerScope")
            .field("id", &self.id())
            .field("container", &self.container.id())
            .field("services", &self.service_count())
            .finish()
    }
}

fn value_key(contract: Option<ContractId>, name: &str) -> Result<ValueKey, CoreError> {
    if name.trim().is_empty() {
        return Err(CoreError::missing_argument("name"));
    }
    Ok(match contract {
        Some(contract) => ValueKey::typed(contract, name),
        None => ValueKey::untyped(name),
    })
}

fn ensure_instance_lifetime(contract: &ContractId, config: BindingConfig) -> Result<(), CoreError> {
    match config.lifetime {
        Some(lifetime) if lifetime != ServiceScope::Singleton => {
            Err(CoreError::invalid_registration(
                contract.type_name(),
                contract.type_name(),
                format!("an existing instance cannot be registered as {}", lifetime),
            ))
        }
        _ => Ok(()),
    }
}

fn value_factory_site<T, F>(container: &Container, factory: F, config: BindingConfig) -> CallSite
where
    T: Send + Sync + 'static,
    F: Fn(&Invocation<'_>) -> Result<T, CoreError> + Send + Sync + 'static,
{
    let lifetime = config.lifetime.unwrap_or(container.inner.config.default_lifetime);
    CallSite::new(
        ContractId::of::<T>(),
        lifetime,
        Arc::new(move |invocation| factory(invocation).map(Instance::new)),
    )
}

/// Factory for an explicit type binding.
///
/// The initializer is selected against the owning container on first
/// invocation and reused afterwards. Failed selections are not cached.
fn deferred_type_factory(
    owner: &Container,
    contract: ContractId,
    descriptor: Arc<TypeDescriptor>,
) -> FactoryFn {
    let owner: Weak<ContainerInner> = Arc::downgrade(&owner.inner);
    let selected: Mutex<Option<FactoryFn>> = Mutex::new(None);

    Arc::new(move |invocation| {
        let factory = {
            let mut selected = selected.lock();
            match selected.as_ref() {
                Some(factory) => factory.clone(),
                None => {
                    let container = owner
                        .upgrade()
                        .map(|inner| Container { inner })
                        .unwrap_or_else(|| invocation.container().clone());
                    let factory = InitializerSelector::new(&container, contract, &descriptor)
                        .build_factory(&mut ResolutionPath::new())?;
                    *selected = Some(factory.clone());
                    factory
                }
            }
        };
        factory(invocation)
    })
}
