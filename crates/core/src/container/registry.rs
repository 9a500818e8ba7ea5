use std::sync::Arc;

use dashmap::DashMap;

use crate::container::call_site::CallSite;
use crate::container::descriptor::ContractId;

/// Key of a value binding: an optional owning contract plus a case-insensitive name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValueKey {
    pub contract: Option<ContractId>,
    name: String,
}

impl ValueKey {
    /// Name-only key
    pub fn untyped(name: &str) -> Self {
        Self {
            contract: None,
            name: name.to_lowercase(),
        }
    }

    /// Key scoped to a contract
    pub fn typed(contract: ContractId, name: &str) -> Self {
        Self {
            contract: Some(contract),
            name: name.to_lowercase(),
        }
    }

    /// Normalized (lower-cased) name
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Per-container binding storage
#[derive(Debug, Default)]
pub struct BindingRegistry {
    /// Newest registration first
    types: DashMap<ContractId, Vec<Arc<CallSite>>>,
    values: DashMap<ValueKey, Arc<CallSite>>,
}

impl BindingRegistry {
    /// Create a new, empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a call site at the head of the contract's list
    pub fn add(&self, contract: ContractId, call_site: Arc<CallSite>, overwrite: bool) {
        let mut entry = self.types.entry(contract).or_default();
        if overwrite {
            entry.clear();
        }
        entry.insert(0, call_site);
    }

    /// Most recent registration for the contract
    pub fn find(&self, contract: &ContractId) -> Option<Arc<CallSite>> {
        self.types
            .get(contract)
            .and_then(|entry| entry.value().first().cloned())
    }

    /// Every registration for the contract, newest first
    pub fn find_all(&self, contract: &ContractId) -> Vec<Arc<CallSite>> {
        self.types
            .get(contract)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// Insert the call site unless another thread got there first; returns the winner
    pub fn add_if_absent(&self, contract: ContractId, call_site: Arc<CallSite>) -> Arc<CallSite> {
        let mut entry = self.types.entry(contract).or_default();
        match entry.first() {
            Some(existing) => existing.clone(),
            None => {
                entry.push(call_site.clone());
                call_site
            }
        }
    }

    pub fn contains(&self, contract: &ContractId) -> bool {
        self.types
            .get(contract)
            .map(|entry| !entry.value().is_empty())
            .unwrap_or(false)
    }

    /// Clear the contract's list; returns whether anything was removed
    pub fn remove(&self, contract: &ContractId) -> bool {
        self.types
            .remove(contract)
            .map(|(_, sites)| !sites.is_empty())
            .unwrap_or(false)
    }

    /// Register a value binding; last writer wins
    pub fn add_value(&self, key: ValueKey, call_site: Arc<CallSite>) {
        self.values.insert(key, call_site);
    }

    pub fn find_value(&self, key: &ValueKey) -> Option<Arc<CallSite>> {
        self.values.get(key).map(|entry| entry.value().clone())
    }

    pub fn contains_value(&self, key: &ValueKey) -> bool {
        self.values.contains_key(key)
    }

    pub fn remove_value(&self, key: &ValueKey) -> bool {
        self.values.remove(key).is_some()
    }

    /// Contracts that currently have at least one type binding
    pub fn contracts(&self) -> Vec<ContractId> {
        self.types
            .iter()
            .filter(|entry| !entry.value().is_empty())
            .map(|entry| *entry.key())
            .collect()
    }

    /// Drop every binding
    pub fn clear(&self) {
        self.types.clear();
        self.values.clear();
    }

    /// Number of contracts with type bindings plus number of value bindings
    pub fn len(&self) -> usize {
        self.contracts().len() + self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
