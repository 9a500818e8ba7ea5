use std::sync::Arc;

use crate::container::call_site::{FactoryFn, Invocation};
use crate::container::descriptor::{ContractId, Instance};
use crate::container::scope::ServiceScope;
use crate::errors::CoreError;

/// Factory and lifetime supplied by a hook for an otherwise unbound contract
pub struct HookResolution {
    pub factory: FactoryFn,
    pub lifetime: ServiceScope,
}

impl HookResolution {
    /// Resolution producing `Arc<C>` values
    pub fn new<C, F>(lifetime: ServiceScope, factory: F) -> Self
    where
        C: ?Sized + Send + Sync + 'static,
        F: Fn(&Invocation<'_>) -> Result<Arc<C>, CoreError> + Send + Sync + 'static,
    {
        Self {
            factory: Arc::new(move |invocation| factory(invocation).map(Instance::from_arc)),
            lifetime,
        }
    }
}

impl std::fmt::Debug for HookResolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookResolution")
            .field("lifetime", &self.lifetime)
            .finish()
    }
}

/// Intercepts resolution of contracts that have no registration.
///
/// Hooks run before catalog discovery; returning `None` passes the contract on.
pub trait ServiceResolveHook: Send + Sync {
    fn resolve(&self, contract: &ContractId) -> Option<HookResolution>;
}

impl<F> ServiceResolveHook for F
where
    F: Fn(&ContractId) -> Option<HookResolution> + Send + Sync,
{
    fn resolve(&self, contract: &ContractId) -> Option<HookResolution> {
        self(contract)
    }
}
