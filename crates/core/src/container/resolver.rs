use std::sync::Arc;

use crate::container::catalog::{TypeCatalog, TypeDescriptor};
use crate::container::conventions::ServiceConventions;
use crate::container::descriptor::ContractId;
use crate::container::markers::{is_builtin_simple, TypeKind, TypeMarkers};
use crate::errors::CoreError;

/// Contracts currently under construction, for cycle detection and error reporting
#[derive(Debug, Clone, Default)]
pub struct ResolutionPath {
    pub contracts: Vec<ContractId>,
}

impl ResolutionPath {
    /// Create a new resolution path
    pub fn new() -> Self {
        Self {
            contracts: Vec::new(),
        }
    }

    /// Enter `contract`, failing if it is already being resolved further up
    pub fn enter(&mut self, contract: ContractId) -> Result<(), CoreError> {
        if self.contains(&contract) {
            let mut cycle = self.clone();
            cycle.contracts.push(contract);
            return Err(CoreError::CircularDependency {
                path: cycle.path_string(),
                cycle_service: contract.type_name().to_string(),
            });
        }
        self.contracts.push(contract);
        Ok(())
    }

    /// Remove the last contract from the resolution path
    pub fn leave(&mut self) -> Option<ContractId> {
        self.contracts.pop()
    }

    /// Check if the path contains a contract
    pub fn contains(&self, contract: &ContractId) -> bool {
        self.contracts.contains(contract)
    }

    pub fn depth(&self) -> usize {
        self.contracts.len()
    }

    /// Get the path as a string for error messages
    pub fn path_string(&self) -> String {
        self.contracts
            .iter()
            .map(|id| id.type_name())
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}

/// Finds the concrete type behind a contract that has no binding
pub struct TypeResolver<'a> {
    catalog: &'a TypeCatalog,
    conventions: &'a ServiceConventions,
}

impl<'a> TypeResolver<'a> {
    pub fn new(catalog: &'a TypeCatalog, conventions: &'a ServiceConventions) -> Self {
        Self {
            catalog,
            conventions,
        }
    }

    /// Discover an implementation for `contract`; `Ok(None)` when there is no candidate
    pub fn discover(
        &self,
        contract: &ContractId,
    ) -> Result<Option<Arc<TypeDescriptor>>, CoreError> {
        if let Some(target) = self.catalog.default_implementation_of(contract) {
            return self.default_implementation(contract, &target).map(Some);
        }

        let kind = match self.catalog.kind_of(contract) {
            Some(kind) => kind,
            None if is_builtin_simple(contract) => TypeKind::Value,
            None => {
                tracing::trace!(
                    contract = contract.type_name(),
                    "contract is not in the type catalog"
                );
                return Ok(None);
            }
        };

        match kind {
            TypeKind::Concrete => Ok(self.catalog.get(contract)),
            TypeKind::Value | TypeKind::Abstract => {
                tracing::trace!(
                    contract = contract.type_name(),
                    kind = %kind,
                    "kind cannot be discovered"
                );
                Ok(None)
            }
            TypeKind::Interface => Ok(self
                .search_own_module(contract)
                .or_else(|| self.search_everywhere(contract))),
        }
    }

    fn default_implementation(
        &self,
        contract: &ContractId,
        target: &ContractId,
    ) -> Result<Arc<TypeDescriptor>, CoreError> {
        let descriptor = self.catalog.get(target).ok_or_else(|| {
            CoreError::invalid_registration(
                contract.type_name(),
                target.type_name(),
                "default implementation is missing from the type catalog",
            )
        })?;

        if !descriptor.kind.is_constructible() {
            return Err(CoreError::invalid_registration(
                contract.type_name(),
                target.type_name(),
                format!("default implementation is {} and cannot be constructed", descriptor.kind),
            ));
        }

        tracing::debug!(
            contract = contract.type_name(),
            implementation = target.type_name(),
            "using default implementation marker"
        );
        Ok(descriptor)
    }

    fn search_own_module(&self, contract: &ContractId) -> Option<Arc<TypeDescriptor>> {
        self.conventions
            .candidate_paths(contract)
            .iter()
            .filter_map(|path| self.catalog.find_by_path(path))
            .find(|descriptor| {
                descriptor.kind.is_constructible() && descriptor.is_assignable_to(contract)
            })
            .map(|descriptor| {
                tracing::debug!(
                    contract = contract.type_name(),
                    implementation = descriptor.id.type_name(),
                    "discovered implementation in contract module"
                );
                descriptor
            })
    }

    fn search_everywhere(&self, contract: &ContractId) -> Option<Arc<TypeDescriptor>> {
        for name in self.conventions.candidate_names(contract.simple_name()) {
            let matches: Vec<_> = self
                .catalog
                .concrete_named(&name)
                .into_iter()
                .filter(|descriptor| descriptor.is_assignable_to(contract))
                .collect();

            if matches.len() > 1 {
                tracing::debug!(
                    contract = contract.type_name(),
                    candidates = matches.len(),
                    name = %name,
                    "several implementations match; taking the first by path"
                );
            }

            if let Some(descriptor) = matches.into_iter().next() {
                tracing::debug!(
                    contract = contract.type_name(),
                    implementation = descriptor.id.type_name(),
                    "discovered implementation by catalog-wide search"
                );
                return Some(descriptor);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::catalog::TypeDescriptor;

    trait IClock: Send + Sync {}
    trait IMailer: Send + Sync {}
    trait IOrphan: Send + Sync {}
    trait IPinned: Send + Sync {}

    #[derive(Default)]
    struct Clock;
    impl IClock for Clock {}

    #[derive(Default)]
    struct Pinned;
    impl IPinned for Pinned {}

    mod elsewhere {
        use super::IMailer;

        #[derive(Default)]
        pub struct MailerImpl;
        impl IMailer for MailerImpl {}

        #[derive(Default)]
        pub struct DefaultMailer;
    }

    #[allow(dead_code)]
    struct Money;

    fn catalog() -> TypeCatalog {
        let catalog = TypeCatalog::new();
        catalog
            .register(TypeDescriptor::interface::<dyn IClock>().build())
            .register(TypeDescriptor::interface::<dyn IMailer>().build())
            .register(TypeDescriptor::interface::<dyn IOrphan>().build())
            .register(
                TypeDescriptor::interface::<dyn IPinned>()
                    .default_implementation::<Pinned>()
                    .build(),
            )
            .register(
                TypeDescriptor::concrete::<Clock>()
                    .default_initializer()
                    .implements::<dyn IClock>(|c| c as Arc<dyn IClock>)
                    .build(),
            )
            .register(
                TypeDescriptor::concrete::<Pinned>()
                    .default_initializer()
                    .implements::<dyn IPinned>(|c| c as Arc<dyn IPinned>)
                    .build(),
            )
            .register(
                TypeDescriptor::concrete::<elsewhere::MailerImpl>()
                    .default_initializer()
                    .implements::<dyn IMailer>(|c| c as Arc<dyn IMailer>)
                    .build(),
            )
            // right name, wrong contract: must be skipped
            .register(
                TypeDescriptor::concrete::<elsewhere::DefaultMailer>()
                    .default_initializer()
                    .build(),
            )
            .register(TypeDescriptor::value::<Money>().build());
        catalog
    }

    #[test]
    fn test_discovery_order() {
        let catalog = catalog();
        let conventions = ServiceConventions::default();
        let resolver = TypeResolver::new(&catalog, &conventions);

        let clock = resolver.discover(&ContractId::of::<dyn IClock>()).unwrap().unwrap();
        assert_eq!(clock.id, ContractId::of::<Clock>());

        let mailer = resolver.discover(&ContractId::of::<dyn IMailer>()).unwrap().unwrap();
        assert_eq!(mailer.id, ContractId::of::<elsewhere::MailerImpl>());

        let pinned = resolver.discover(&ContractId::of::<dyn IPinned>()).unwrap().unwrap();
        assert_eq!(pinned.id, ContractId::of::<Pinned>());

        let concrete = resolver.discover(&ContractId::of::<Clock>()).unwrap().unwrap();
        assert_eq!(concrete.id, ContractId::of::<Clock>());
    }

    #[test]
    fn test_no_candidate() {
        let catalog = catalog();
        let conventions = ServiceConventions::default();
        let resolver = TypeResolver::new(&catalog, &conventions);

        assert!(resolver.discover(&ContractId::of::<dyn IOrphan>()).unwrap().is_none());
        assert!(resolver.discover(&ContractId::of::<Money>()).unwrap().is_none());
        assert!(resolver.discover(&ContractId::of::<i64>()).unwrap().is_none());
        assert!(resolver.discover(&ContractId::of::<Vec<u8>>()).unwrap().is_none());
    }

    #[test]
    fn test_default_implementation_must_be_concrete() {
        let catalog = TypeCatalog::new();
        catalog.register(
            TypeDescriptor::interface::<dyn IOrphan>()
                .default_implementation::<Money>()
                .build(),
        );
        catalog.register(TypeDescriptor::value::<Money>().build());
        let conventions = ServiceConventions::default();
        let resolver = TypeResolver::new(&catalog, &conventions);

        let result = resolver.discover(&ContractId::of::<dyn IOrphan>());
        assert!(matches!(result, Err(CoreError::InvalidRegistration { .. })));
    }

    #[test]
    fn test_resolution_path_detects_cycles() {
        let mut path = ResolutionPath::new();
        path.enter(ContractId::of::<Clock>()).unwrap();
        path.enter(ContractId::of::<Pinned>()).unwrap();

        match path.enter(ContractId::of::<Clock>()) {
            Err(CoreError::CircularDependency { path, cycle_service }) => {
                assert_eq!(path.matches(" -> ").count(), 2);
                assert!(cycle_service.ends_with("Clock"));
            }
            other => panic!("expected cycle, got {:?}", other),
        }

        assert_eq!(path.leave(), Some(ContractId::of::<Pinned>()));
        assert_eq!(path.depth(), 1);
    }
}
