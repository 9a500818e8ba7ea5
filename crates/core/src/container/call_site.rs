use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::container::container::Container;
use crate::container::descriptor::{ContractId, Instance};
use crate::container::scope::{ScopeCache, ServiceScope};
use crate::errors::CoreError;

static NEXT_CALL_SITE_ID: AtomicU64 = AtomicU64::new(1);

/// Erased factory closure owned by a call site
pub type FactoryFn = Arc<dyn Fn(&Invocation<'_>) -> Result<Instance, CoreError> + Send + Sync>;

/// Everything a call site needs at invocation time
pub struct Invocation<'a> {
    container: &'a Container,
    late_args: &'a [Instance],
    scope: &'a ScopeCache,
    /// Call sites currently constructing on this request, outermost first
    active: RefCell<Vec<(u64, ContractId)>>,
}

impl<'a> Invocation<'a> {
    pub(crate) fn new(
        container: &'a Container,
        late_args: &'a [Instance],
        scope: &'a ScopeCache,
    ) -> Self {
        Self {
            container,
            late_args,
            scope,
            active: RefCell::new(Vec::new()),
        }
    }

    fn enter(&self, call_site: &CallSite) -> Result<(), CoreError> {
        let mut active = self.active.borrow_mut();
        if active.iter().any(|(id, _)| *id == call_site.id) {
            let mut path: Vec<&str> = active
                .iter()
                .map(|(_, contract)| contract.type_name())
                .collect();
            path.push(call_site.contract.type_name());
            return Err(CoreError::CircularDependency {
                path: path.join(" -> "),
                cycle_service: call_site.contract.type_name().to_string(),
            });
        }
        active.push((call_site.id, call_site.contract));
        Ok(())
    }

    fn leave(&self) {
        self.active.borrow_mut().pop();
    }

    /// Container the request was made against
    pub fn container(&self) -> &'a Container {
        self.container
    }

    /// Late-bound positional arguments of the current request
    pub fn late_args(&self) -> &'a [Instance] {
        self.late_args
    }

    /// Typed access to late-bound argument `index`
    pub fn late_arg<T: ?Sized + Send + Sync + 'static>(&self, index: usize) -> Option<Arc<T>> {
        self.late_args.get(index).and_then(|arg| arg.downcast::<T>())
    }

    /// Scope the request is served from
    pub fn scope(&self) -> &'a ScopeCache {
        self.scope
    }
}

/// Lifetime strategy of a call site
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallSiteKind {
    /// Re-invoke the factory on every request
    Transient,
    /// One instance per scope
    Scoped,
    /// One instance for the lifetime of the call site
    Singleton,
    /// Take late-bound argument N; never cached
    LastMapping(usize),
}

impl CallSiteKind {
    pub fn from_lifetime(lifetime: ServiceScope) -> Self {
        match lifetime {
            ServiceScope::Transient => CallSiteKind::Transient,
            ServiceScope::Scoped => CallSiteKind::Scoped,
            ServiceScope::Singleton => CallSiteKind::Singleton,
        }
    }

    /// Lifetime equivalent, `None` for last-mapping call sites
    pub fn lifetime(&self) -> Option<ServiceScope> {
        match self {
            CallSiteKind::Transient => Some(ServiceScope::Transient),
            CallSiteKind::Scoped => Some(ServiceScope::Scoped),
            CallSiteKind::Singleton => Some(ServiceScope::Singleton),
            CallSiteKind::LastMapping(_) => None,
        }
    }
}

/// A resolved, reusable construction strategy for one contract
pub struct CallSite {
    id: u64,
    contract: ContractId,
    kind: CallSiteKind,
    factory: Option<FactoryFn>,
    singleton: Mutex<Option<Instance>>,
}

impl CallSite {
    /// Call site invoking `factory` under the given lifetime
    pub fn new(contract: ContractId, lifetime: ServiceScope, factory: FactoryFn) -> Self {
        Self::build(contract, CallSiteKind::from_lifetime(lifetime), Some(factory), None)
    }

    /// Singleton call site around an existing instance
    pub fn instance(contract: ContractId, instance: Instance) -> Self {
        Self::build(contract, CallSiteKind::Singleton, None, Some(instance))
    }

    /// Call site reading late-bound argument `index`
    pub fn last_mapping(contract: ContractId, index: usize) -> Self {
        Self::build(contract, CallSiteKind::LastMapping(index), None, None)
    }

    fn build(
        contract: ContractId,
        kind: CallSiteKind,
        factory: Option<FactoryFn>,
        instance: Option<Instance>,
    ) -> Self {
        Self {
            id: NEXT_CALL_SITE_ID.fetch_add(1, Ordering::Relaxed),
            contract,
            kind,
            factory,
            singleton: Mutex::new(instance),
        }
    }

    /// Process-unique id, used as scope cache key
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn contract(&self) -> &ContractId {
        &self.contract
    }

    pub fn kind(&self) -> CallSiteKind {
        self.kind
    }

    /// Produce an instance according to this call site's lifetime
    pub fn invoke(&self, invocation: &Invocation<'_>) -> Result<Instance, CoreError> {
        match self.kind {
            CallSiteKind::Transient => self.create(invocation),
            CallSiteKind::Scoped => {
                // A cycle back into this call site would otherwise wait on its own slot
                invocation.enter(self)?;
                invocation.leave();

                let timeout = invocation.container.config().resolve_lock_timeout();
                invocation
                    .scope
                    .get_or_try_insert(self.id, timeout, || self.create(invocation))
            }
            CallSiteKind::Singleton => {
                invocation.enter(self)?;
                invocation.leave();

                let timeout = invocation.container.config().resolve_lock_timeout();
                let mut cached = self
                    .singleton
                    .try_lock_for(timeout)
                    .ok_or_else(|| CoreError::LockError {
                        resource: format!("singleton {}", self.contract.type_name()),
                    })?;
                if let Some(instance) = cached.as_ref() {
                    return Ok(instance.clone());
                }
                let instance = self.create(invocation)?;
                tracing::debug!(contract = self.contract.type_name(), "singleton instance created");
                *cached = Some(instance.clone());
                Ok(instance)
            }
            CallSiteKind::LastMapping(index) => invocation
                .late_args
                .get(index)
                .cloned()
                .ok_or_else(|| CoreError::MissingLateArgument {
                    service_type: self.contract.type_name().to_string(),
                    index,
                }),
        }
    }

    fn create(&self, invocation: &Invocation<'_>) -> Result<Instance, CoreError> {
        match &self.factory {
            Some(factory) => {
                invocation.enter(self)?;
                let result = factory(invocation);
                invocation.leave();
                result
            }
            None => Err(CoreError::UnsupportedLifetime {
                contract: self.contract.type_name().to_string(),
                lifetime: format!("{:?} without factory", self.kind),
            }),
        }
    }

    /// Whether a singleton instance has already been produced
    pub fn is_materialized(&self) -> bool {
        self.singleton.try_lock().is_some_and(|cached| cached.is_some())
    }
}

impl std::fmt::Debug for CallSite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallSite")
            .field("id", &self.id)
            .field("contract", &self.contract.type_name())
            .field("kind", &self.kind)
            .finish()
    }
}
