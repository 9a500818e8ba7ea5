use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::container::descriptor::Instance;
use crate::errors::CoreError;

/// Service lifetime enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceScope {
    /// Single instance shared for the lifetime of the owning container
    Singleton,
    /// New instance created for each request
    Transient,
    /// One instance per logical scope
    Scoped,
}

impl ServiceScope {
    /// Check if the scope is singleton
    pub fn is_singleton(&self) -> bool {
        matches!(self, ServiceScope::Singleton)
    }

    /// Check if the scope is transient
    pub fn is_transient(&self) -> bool {
        matches!(self, ServiceScope::Transient)
    }

    /// Check if the scope is scoped
    pub fn is_scoped(&self) -> bool {
        matches!(self, ServiceScope::Scoped)
    }

    /// Get the scope name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceScope::Singleton => "singleton",
            ServiceScope::Transient => "transient",
            ServiceScope::Scoped => "scoped",
        }
    }
}

impl Default for ServiceScope {
    fn default() -> Self {
        ServiceScope::Transient
    }
}

impl std::fmt::Display for ServiceScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ServiceScope {
    type Err = crate::errors::CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "singleton" => Ok(ServiceScope::Singleton),
            "transient" => Ok(ServiceScope::Transient),
            "scoped" => Ok(ServiceScope::Scoped),
            _ => Err(crate::errors::CoreError::InvalidServiceScope {
                scope: s.to_string(),
            }),
        }
    }
}

/// Scope identifier
pub type ScopeId = Uuid;

/// A cache slot written at most once
pub(crate) type InstanceSlot = Arc<Mutex<Option<Instance>>>;

/// Per-scope instance cache for scoped call sites, keyed by call site id
#[derive(Debug)]
pub struct ScopeCache {
    scope_id: ScopeId,
    slots: DashMap<u64, InstanceSlot>,
}

impl ScopeCache {
    /// Create an empty cache with a fresh scope id
    pub fn new() -> Self {
        Self {
            scope_id: Uuid::new_v4(),
            slots: DashMap::new(),
        }
    }

    /// Get the scope ID
    pub fn scope_id(&self) -> ScopeId {
        self.scope_id
    }

    /// Get the instance cached for a call site
    pub fn get(&self, call_site_id: u64) -> Option<Instance> {
        let slot = self.slots.get(&call_site_id)?.value().clone();
        let cached = slot.lock().clone();
        cached
    }

    /// Return the cached instance or create, store and return a new one.
    ///
    /// Only the slot of `call_site_id` stays locked while `create` runs, so
    /// creating one scoped service may resolve other scoped services. Waiting
    /// on a slot another thread is filling fails with `LockError` after
    /// `timeout`.
    pub fn get_or_try_insert<F>(
        &self,
        call_site_id: u64,
        timeout: Duration,
        create: F,
    ) -> Result<Instance, CoreError>
    where
        F: FnOnce() -> Result<Instance, CoreError>,
    {
        let slot = self
            .slots
            .entry(call_site_id)
            .or_insert_with(|| Arc::new(Mutex::new(None)))
            .value()
            .clone();

        let mut guard = slot.try_lock_for(timeout).ok_or_else(|| CoreError::LockError {
            resource: format!("scope slot {}", call_site_id),
        })?;
        if let Some(existing) = guard.as_ref() {
            return Ok(existing.clone());
        }

        let instance = create()?;
        *guard = Some(instance.clone());
        Ok(instance)
    }

    /// Drop every cached instance
    pub fn clear(&self) {
        self.slots.clear();
    }

    /// Get the number of instances in this scope
    pub fn service_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|entry| entry.value().lock().is_some())
            .count()
    }
}

impl Default for ScopeCache {
    fn default() -> Self {
        Self::new()
    }
}
