//! Initializer selection and parameter binding.
//!
//! For a concrete type, initializers are tried in priority order and the
//! first one whose parameters all bind to call sites wins. Parameters bind
//! through a fixed chain walked from the requesting container up through
//! its ancestors:
//!
//! 1. value bound to `(concrete type, parameter name)`
//! 2. value bound to `(contract, parameter name)` when contract and concrete type differ
//! 3. value bound to the bare parameter name, for simple parameter types
//! 4. type binding of the parameter type, for non-simple parameter types
//!
//! A non-simple parameter that misses all four is resolved as a contract in
//! its own right and cached in the requesting container.

use std::sync::Arc;

use crate::container::call_site::{CallSite, FactoryFn};
use crate::container::catalog::{Initializer, ParameterInfo, TypeDescriptor};
use crate::container::container::{Container, Lookup};
use crate::container::descriptor::ContractId;
use crate::container::markers::TypeMarkers;
use crate::container::registry::ValueKey;
use crate::container::resolver::ResolutionPath;
use crate::errors::{CoreError, InitializerRejection};

/// The winning initializer together with one call site per parameter
#[derive(Debug)]
pub struct SelectedInitializer {
    pub initializer: Initializer,
    pub arguments: Vec<Arc<CallSite>>,
}

enum ParameterBinding {
    Bound(Arc<CallSite>),
    Rejected(String),
}

/// Picks the initializer used to build `descriptor` for `contract`
pub struct InitializerSelector<'a> {
    container: &'a Container,
    contract: ContractId,
    descriptor: &'a Arc<TypeDescriptor>,
}

impl<'a> InitializerSelector<'a> {
    pub fn new(
        container: &'a Container,
        contract: ContractId,
        descriptor: &'a Arc<TypeDescriptor>,
    ) -> Self {
        Self {
            container,
            contract,
            descriptor,
        }
    }

    /// Choose the first initializer, in priority order, whose parameters all bind
    pub fn select(&self, path: &mut ResolutionPath) -> Result<SelectedInitializer, CoreError> {
        let concrete = self.descriptor.id;
        let mut rejections = Vec::new();

        for initializer in self.descriptor.initializers() {
            if initializer.parameters.is_empty() {
                return Ok(SelectedInitializer {
                    initializer: initializer.clone(),
                    arguments: Vec::new(),
                });
            }

            let mut arguments = Vec::with_capacity(initializer.parameters.len());
            let mut last_mapping_index = 0;
            let mut rejected = None;

            for parameter in &initializer.parameters {
                match self.bind_parameter(parameter, &mut last_mapping_index, path)? {
                    ParameterBinding::Bound(call_site) => arguments.push(call_site),
                    ParameterBinding::Rejected(reason) => {
                        rejected = Some(InitializerRejection {
                            concrete_type: concrete.type_name().to_string(),
                            initializer: initializer.name.clone(),
                            parameter: parameter.name.clone(),
                            parameter_type: parameter.contract.type_name().to_string(),
                            reason,
                        });
                        break;
                    }
                }
            }

            match rejected {
                None => {
                    tracing::debug!(
                        contract = self.contract.type_name(),
                        implementation = concrete.type_name(),
                        initializer = %initializer.signature(),
                        "initializer selected"
                    );
                    return Ok(SelectedInitializer {
                        initializer: initializer.clone(),
                        arguments,
                    });
                }
                Some(rejection) => {
                    tracing::warn!(
                        contract = self.contract.type_name(),
                        rejection = %rejection,
                        "initializer rejected"
                    );
                    rejections.push(rejection);
                }
            }
        }

        if rejections.is_empty() {
            rejections.push(InitializerRejection {
                concrete_type: concrete.type_name().to_string(),
                initializer: "<none>".to_string(),
                parameter: "-".to_string(),
                parameter_type: "-".to_string(),
                reason: "no initializers are declared in the type catalog".to_string(),
            });
        }

        Err(CoreError::NoSuitableInitializer {
            concrete_type: concrete.type_name().to_string(),
            rejections,
        })
    }

    /// Select an initializer and wrap it into a factory producing the contract
    pub fn build_factory(&self, path: &mut ResolutionPath) -> Result<FactoryFn, CoreError> {
        let SelectedInitializer {
            initializer,
            arguments,
        } = self.select(path)?;
        let descriptor = self.descriptor.clone();
        let contract = self.contract;

        Ok(Arc::new(move |invocation| {
            let values = arguments
                .iter()
                .map(|call_site| call_site.invoke(invocation))
                .collect::<Result<Vec<_>, _>>()?;
            let instance = initializer.invoke(&values)?;
            descriptor.upcast(&instance, &contract)
        }))
    }

    fn bind_parameter(
        &self,
        parameter: &ParameterInfo,
        last_mapping_index: &mut usize,
        path: &mut ResolutionPath,
    ) -> Result<ParameterBinding, CoreError> {
        let catalog = self.container.catalog();
        let declared = parameter.contract;

        let deferred = parameter.last_mapping
            || (!parameter.ignore_type_marker && catalog.is_last_mapping_type(&declared));
        if deferred {
            let index = *last_mapping_index;
            *last_mapping_index += 1;
            tracing::trace!(parameter = %parameter.name, index, "bound to late argument");
            return Ok(ParameterBinding::Bound(Arc::new(CallSite::last_mapping(declared, index))));
        }

        let simple = catalog.is_simple(&declared);
        let concrete = self.descriptor.id;

        for container in self.container.ancestry() {
            let registry = container.registry();

            if let Some(site) = registry.find_value(&ValueKey::typed(concrete, &parameter.name)) {
                tracing::trace!(parameter = %parameter.name, "bound to implementation-named value");
                return Ok(ParameterBinding::Bound(site));
            }

            if self.contract != concrete {
                let key = ValueKey::typed(self.contract, &parameter.name);
                if let Some(site) = registry.find_value(&key) {
                    tracing::trace!(parameter = %parameter.name, "bound to contract-named value");
                    return Ok(ParameterBinding::Bound(site));
                }
            }

            if simple {
                if let Some(site) = registry.find_value(&ValueKey::untyped(&parameter.name)) {
                    tracing::trace!(parameter = %parameter.name, "bound to named value");
                    return Ok(ParameterBinding::Bound(site));
                }
            } else if let Some(site) = registry.find(&declared) {
                tracing::trace!(parameter = %parameter.name, "bound to type binding");
                return Ok(ParameterBinding::Bound(site));
            }
        }

        if simple {
            return Ok(ParameterBinding::Rejected(format!(
                "has no value named '{}'",
                parameter.name
            )));
        }

        match self.container.resolve_call_site(&declared, path, Lookup::Auto) {
            Ok(Some(site)) => Ok(ParameterBinding::Bound(site)),
            Ok(None) => Ok(ParameterBinding::Rejected(
                "has no binding and could not be resolved".to_string(),
            )),
            Err(
                error @ (CoreError::CircularDependency { .. }
                | CoreError::LockError { .. }
                | CoreError::InvalidRegistration { .. }),
            ) => {
                Err(error)
            }
            Err(error) => Ok(ParameterBinding::Rejected(format!("failed to resolve: {}", error))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::binding::BindingConfig;
    use crate::container::catalog::TypeCatalog;
    use crate::container::descriptor::Instance;

    trait Greet: Send + Sync {
        fn greeting(&self) -> String;
    }

    struct Greeter {
        greeting: String,
    }

    impl Greet for Greeter {
        fn greeting(&self) -> String {
            self.greeting.clone()
        }
    }

    #[derive(Default)]
    struct Clock;

    struct Report {
        title: String,
        page: u32,
        _clock: Arc<Clock>,
    }

    fn container() -> Container {
        let catalog = TypeCatalog::new();
        catalog
            .register(
                TypeDescriptor::concrete::<Greeter>()
                    .initializer(
                        Initializer::of::<Greeter>("new")
                            .param::<String>("greeting")
                            .build(|args| Ok(Greeter { greeting: args.value(0)? })),
                    )
                    .implements::<dyn Greet>(|greeter| greeter as Arc<dyn Greet>)
                    .build(),
            )
            .register(TypeDescriptor::concrete::<Clock>().default_initializer().build())
            .register(
                TypeDescriptor::concrete::<Report>()
                    .initializer(
                        Initializer::of::<Report>("new")
                            .last_mapping::<String>("title")
                            .param::<Clock>("clock")
                            .last_mapping::<u32>("page")
                            .build(|args| {
                                Ok(Report {
                                    title: args.value(0)?,
                                    _clock: args.get(1)?,
                                    page: args.value(2)?,
                                })
                            }),
                    )
                    .build(),
            );
        Container::with_catalog(Arc::new(catalog))
    }

    #[test]
    fn test_implementation_named_value_wins() {
        let container = container();
        container
            .add::<dyn Greet, Greeter>(BindingConfig::new())
            .unwrap()
            .add_value("greeting", "untyped".to_string(), BindingConfig::new())
            .unwrap()
            .add_named::<dyn Greet, _>("greeting", "contract".to_string(), BindingConfig::new())
            .unwrap()
            .add_named::<Greeter, _>("Greeting", "implementation".to_string(), BindingConfig::new())
            .unwrap();

        assert_eq!(container.get::<dyn Greet>().unwrap().greeting(), "implementation");
    }

    #[test]
    fn test_contract_named_value_wins_over_untyped() {
        let container = container();
        container
            .add::<dyn Greet, Greeter>(BindingConfig::new())
            .unwrap()
            .add_value("greeting", "untyped".to_string(), BindingConfig::new())
            .unwrap()
            .add_named::<dyn Greet, _>("greeting", "contract".to_string(), BindingConfig::new())
            .unwrap();

        assert_eq!(container.get::<dyn Greet>().unwrap().greeting(), "contract");
    }

    #[test]
    fn test_untyped_value_from_parent() {
        let parent = container();
        parent
            .add_value("greeting", "from parent".to_string(), BindingConfig::new())
            .unwrap();
        let child = parent.create_child_container();
        child.add::<dyn Greet, Greeter>(BindingConfig::new()).unwrap();

        assert_eq!(child.get::<dyn Greet>().unwrap().greeting(), "from parent");
    }

    #[test]
    fn test_missing_simple_value_rejects_initializer() {
        let container = container();
        container.add::<dyn Greet, Greeter>(BindingConfig::new()).unwrap();

        match container.get::<dyn Greet>() {
            Err(CoreError::NoSuitableInitializer { rejections, .. }) => {
                assert_eq!(rejections.len(), 1);
                assert_eq!(rejections[0].initializer, "new");
                assert_eq!(rejections[0].parameter, "greeting");
            }
            other => panic!("expected NoSuitableInitializer, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_last_mapping_indices_skip_resolved_parameters() {
        let container = container();
        let args = vec![Instance::new("Quarterly".to_string()), Instance::new(7u32)];

        let report = container.get_with::<Report>(&args).unwrap();
        assert_eq!(report.title, "Quarterly");
        assert_eq!(report.page, 7);
        assert!(container.contains::<Clock>(false));
    }

    #[test]
    fn test_selector_reports_initializer_without_parameters() {
        let container = container();
        let descriptor = container.catalog().get(&ContractId::of::<Clock>()).unwrap();
        let selector = InitializerSelector::new(&container, descriptor.id, &descriptor);

        let selected = selector.select(&mut ResolutionPath::new()).unwrap();
        assert_eq!(selected.initializer.name, "default");
        assert!(selected.arguments.is_empty());
    }
}
