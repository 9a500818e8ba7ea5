//! Integration tests for contract resolution
//!
//! Covers explicit bindings, implementation discovery through the type
//! catalog, initializer selection and the error surface of `Container`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use weft_core::container::PatternLifetimeRule;
use weft_core::{
    BindingConfig, Container, ContainerBuilder, ContainerConfig, ContractId, CoreError, ErrorReport,
    HookResolution, Initializer, Instance, ServiceScope, TypeCatalog, TypeDescriptor,
};

mod logging {
    use std::sync::Arc;

    pub trait ILogger: Send + Sync {
        fn log(&self, message: &str) -> String;
    }

    pub struct ConsoleLogger {
        pub id: usize,
    }

    impl ILogger for ConsoleLogger {
        fn log(&self, message: &str) -> String {
            format!("[console {}] {}", self.id, message)
        }
    }

    pub fn as_logger(logger: Arc<ConsoleLogger>) -> Arc<dyn ILogger> {
        logger
    }

    pub mod impls {
        use super::ILogger;

        #[derive(Default)]
        pub struct Logger;

        impl ILogger for Logger {
            fn log(&self, message: &str) -> String {
                format!("[default] {}", message)
            }
        }
    }
}

mod storage {
    pub trait IStore: Send + Sync {
        fn name(&self) -> &'static str;
    }

    pub trait Abstract: Send + Sync {}
}

mod backends {
    use super::storage::IStore;

    #[derive(Default)]
    pub struct StoreImpl;

    impl IStore for StoreImpl {
        fn name(&self) -> &'static str {
            "store-impl"
        }
    }
}

use backends::StoreImpl;
use logging::{ConsoleLogger, ILogger};
use storage::IStore;

fn logging_catalog(constructed: Arc<AtomicUsize>) -> TypeCatalog {
    let catalog = TypeCatalog::new();
    catalog
        .register(TypeDescriptor::interface::<dyn ILogger>().build())
        .register(
            TypeDescriptor::concrete::<ConsoleLogger>()
                .initializer(Initializer::of::<ConsoleLogger>("new").build(move |_| {
                    let id = constructed.fetch_add(1, Ordering::SeqCst) + 1;
                    Ok(ConsoleLogger { id })
                }))
                .implements::<dyn ILogger>(logging::as_logger)
                .build(),
        )
        .register(
            TypeDescriptor::concrete::<logging::impls::Logger>()
                .default_initializer()
                .implements::<dyn ILogger>(|logger| logger as Arc<dyn ILogger>)
                .build(),
        );
    catalog
}

#[test]
fn test_singleton_logger_constructed_once() {
    let constructed = Arc::new(AtomicUsize::new(0));
    let container = Container::with_catalog(Arc::new(logging_catalog(constructed.clone())));

    container
        .add::<dyn ILogger, ConsoleLogger>(BindingConfig::singleton())
        .unwrap();

    let first = container.get::<dyn ILogger>().unwrap();
    let second = container.get::<dyn ILogger>().unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(constructed.load(Ordering::SeqCst), 1);
    assert_eq!(first.log("ready"), "[console 1] ready");
}

#[test]
fn test_transient_binding_yields_distinct_instances() {
    let constructed = Arc::new(AtomicUsize::new(0));
    let container = Container::with_catalog(Arc::new(logging_catalog(constructed.clone())));

    container
        .add::<dyn ILogger, ConsoleLogger>(BindingConfig::transient())
        .unwrap();

    let loggers: Vec<_> = (0..5).map(|_| container.get::<dyn ILogger>().unwrap()).collect();
    for (i, a) in loggers.iter().enumerate() {
        for b in loggers.iter().skip(i + 1) {
            assert!(!Arc::ptr_eq(a, b));
        }
    }
    assert_eq!(constructed.load(Ordering::SeqCst), 5);
}

#[test]
fn test_interface_discovered_in_own_module() {
    let catalog = logging_catalog(Arc::new(AtomicUsize::new(0)));
    let container = Container::with_catalog(Arc::new(catalog));

    // `logging::impls::Logger` matches `ILogger` with the prefix stripped
    let logger = container.get::<dyn ILogger>().unwrap();
    assert_eq!(logger.log("hi"), "[default] hi");
    assert!(container.contains::<dyn ILogger>(false));
}

#[test]
fn test_interface_discovered_across_modules() {
    let catalog = TypeCatalog::new();
    catalog
        .register(TypeDescriptor::interface::<dyn IStore>().build())
        .register(
            TypeDescriptor::concrete::<StoreImpl>()
                .default_initializer()
                .implements::<dyn IStore>(|store| store as Arc<dyn IStore>)
                .build(),
        );
    let container = Container::with_catalog(Arc::new(catalog));

    assert_eq!(container.get::<dyn IStore>().unwrap().name(), "store-impl");
}

#[test]
fn test_get_fixed_skips_discovery() {
    let catalog = logging_catalog(Arc::new(AtomicUsize::new(0)));
    let container = Container::with_catalog(Arc::new(catalog));

    assert!(container.get_fixed::<dyn ILogger>().unwrap().is_none());
    assert!(!container.contains::<dyn ILogger>(false));

    assert!(container.get::<dyn ILogger>().is_ok());
    assert!(container.get_fixed::<dyn ILogger>().unwrap().is_some());
}

#[test]
fn test_default_implementation_marker_bypasses_conventions() {
    let catalog = logging_catalog(Arc::new(AtomicUsize::new(0)));
    catalog.register(
        TypeDescriptor::interface::<dyn ILogger>()
            .default_implementation::<ConsoleLogger>()
            .build(),
    );
    let container = Container::with_catalog(Arc::new(catalog));

    assert_eq!(container.get::<dyn ILogger>().unwrap().log("x"), "[console 1] x");
}

#[test]
fn test_unknown_contract_is_unresolvable() {
    let container = Container::new();

    let error = container.get::<dyn IStore>().err().unwrap();
    assert!(matches!(error, CoreError::UnresolvableContract { .. }));
    assert!(container.try_get::<dyn IStore>().unwrap().is_none());

    let report = ErrorReport::from(&error);
    assert_eq!(report.code, "UNRESOLVABLE_CONTRACT");
    assert!(report.hint.is_some());
}

#[test]
fn test_value_and_abstract_contracts_are_never_discovered() {
    let catalog = TypeCatalog::new();
    catalog.register(TypeDescriptor::abstract_type::<dyn storage::Abstract>().build());
    let container = Container::with_catalog(Arc::new(catalog));

    assert!(container.try_get::<dyn storage::Abstract>().unwrap().is_none());
    assert!(container.try_get::<u64>().unwrap().is_none());
}

#[test]
fn test_invalid_concrete_types_rejected() {
    let catalog = TypeCatalog::new();
    catalog
        .register(TypeDescriptor::interface::<dyn IStore>().build())
        .register(TypeDescriptor::abstract_type::<dyn storage::Abstract>().build())
        .register(TypeDescriptor::concrete::<ConsoleLogger>().build());
    let container = Container::with_catalog(Arc::new(catalog));

    let interface = container.add::<dyn IStore, dyn IStore>(BindingConfig::new());
    let abstract_type = container.add::<dyn IStore, dyn storage::Abstract>(BindingConfig::new());
    let value = container.add::<dyn IStore, String>(BindingConfig::new());
    let unrelated = container.add::<dyn IStore, ConsoleLogger>(BindingConfig::new());
    let unknown = container.add::<dyn IStore, StoreImpl>(BindingConfig::new());

    for result in [interface, abstract_type, value, unrelated, unknown] {
        let error = result.err().unwrap();
        assert!(error.is_registration(), "unexpected error: {}", error);
    }
    assert!(!container.contains::<dyn IStore>(false));
}

#[test]
fn test_named_values_are_isolated() {
    let container = Container::new();
    container
        .add_value("x", 1i32, BindingConfig::new())
        .unwrap()
        .add_named::<dyn IStore, _>("x", 2i32, BindingConfig::new())
        .unwrap();

    assert_eq!(*container.get_value::<i32>("x").unwrap(), 1);
    assert_eq!(*container.get_value::<i32>("X").unwrap(), 1);
    assert_eq!(*container.get_named::<dyn IStore, i32>("x").unwrap(), 2);
    assert!(container.get_value::<String>("x").is_none());
    assert!(container.get_value::<i32>("y").is_none());

    assert!(container.remove_value("x", false));
    assert!(container.get_value::<i32>("x").is_none());
    assert!(container.contains_named::<dyn IStore>("x", false));
}

#[test]
fn test_blank_value_name_rejected() {
    let container = Container::new();
    let result = container.add_value("  ", 1u8, BindingConfig::new());
    assert!(matches!(result, Err(CoreError::MissingArgument { .. })));
}

#[test]
fn test_instance_cannot_be_transient() {
    let container = Container::new();
    let logger: Arc<dyn ILogger> = Arc::new(ConsoleLogger { id: 9 });

    let result = container.add_instance(logger.clone(), BindingConfig::transient());
    assert!(matches!(result, Err(CoreError::InvalidRegistration { .. })));

    container.add_instance(logger.clone(), BindingConfig::new()).unwrap();
    assert!(Arc::ptr_eq(&container.get::<dyn ILogger>().unwrap(), &logger));
}

struct Formatter {
    width: usize,
    style: &'static str,
}

fn formatter_catalog() -> TypeCatalog {
    let catalog = TypeCatalog::new();
    catalog.register(
        TypeDescriptor::concrete::<Formatter>()
            .initializer(
                Initializer::of::<Formatter>("with_width")
                    .priority(10)
                    .param::<usize>("width")
                    .param::<dyn ILogger>("logger")
                    .build(|args| {
                        Ok(Formatter {
                            width: args.value(0)?,
                            style: "wide",
                        })
                    }),
            )
            .initializer(Initializer::of::<Formatter>("plain").priority(-1).build(|_| {
                Ok(Formatter {
                    width: 0,
                    style: "plain",
                })
            }))
            .build(),
    );
    catalog
}

#[test]
fn test_initializer_priority_beats_arity() {
    let container = Container::with_catalog(Arc::new(formatter_catalog()));
    container
        .add_value("width", 80usize, BindingConfig::new())
        .unwrap()
        .add_instance::<dyn ILogger>(Arc::new(ConsoleLogger { id: 1 }), BindingConfig::new())
        .unwrap();

    let formatter = container.get::<Formatter>().unwrap();
    assert_eq!(formatter.style, "plain");
    assert_eq!(formatter.width, 0);
}

#[test]
fn test_rejected_initializers_are_listed() {
    let catalog = TypeCatalog::new();
    catalog.register(
        TypeDescriptor::concrete::<Formatter>()
            .initializer(
                Initializer::of::<Formatter>("with_width")
                    .param::<usize>("width")
                    .build(|args| {
                        Ok(Formatter {
                            width: args.value(0)?,
                            style: "wide",
                        })
                    }),
            )
            .initializer(
                Initializer::of::<Formatter>("with_store")
                    .priority(1)
                    .param::<dyn IStore>("store")
                    .build(|_| Ok(Formatter { width: 1, style: "store" })),
            )
            .build(),
    );
    let container = Container::with_catalog(Arc::new(catalog));

    match container.get::<Formatter>() {
        Err(CoreError::NoSuitableInitializer { rejections, .. }) => {
            let parameters: Vec<_> = rejections.iter().map(|r| r.parameter.as_str()).collect();
            assert_eq!(parameters, vec!["width", "store"]);
        }
        other => panic!("expected NoSuitableInitializer, got {:?}", other.map(|f| f.style)),
    }

    // failures are not cached; the contract resolves once the value exists
    container.add_value("width", 120usize, BindingConfig::new()).unwrap();
    assert_eq!(container.get::<Formatter>().unwrap().width, 120);
}

struct Ping {
    _pong: Arc<Pong>,
}

struct Pong {
    _ping: Arc<Ping>,
}

fn ping_pong_catalog() -> TypeCatalog {
    let catalog = TypeCatalog::new();
    catalog
        .register(
            TypeDescriptor::concrete::<Ping>()
                .initializer(
                    Initializer::of::<Ping>("new")
                        .param::<Pong>("pong")
                        .build(|args| Ok(Ping { _pong: args.get(0)? })),
                )
                .build(),
        )
        .register(
            TypeDescriptor::concrete::<Pong>()
                .initializer(
                    Initializer::of::<Pong>("new")
                        .param::<Ping>("ping")
                        .build(|args| Ok(Pong { _ping: args.get(0)? })),
                )
                .build(),
        );
    catalog
}

#[test]
fn test_discovered_cycle_is_reported() {
    let container = Container::with_catalog(Arc::new(ping_pong_catalog()));

    match container.get::<Ping>() {
        Err(CoreError::CircularDependency { path, cycle_service }) => {
            assert!(cycle_service.ends_with("Ping"));
            assert_eq!(path.matches("Ping").count(), 2);
        }
        other => panic!("expected CircularDependency, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_bound_cycle_is_reported_at_invocation() {
    let container = Container::with_catalog(Arc::new(ping_pong_catalog()));
    container
        .add_self::<Ping>(BindingConfig::singleton())
        .unwrap()
        .add_self::<Pong>(BindingConfig::singleton())
        .unwrap();

    let result = container.get::<Ping>();
    assert!(matches!(result, Err(CoreError::CircularDependency { .. })));
}

#[test]
fn test_scoped_cycle_is_reported_at_invocation() {
    let container = Container::with_catalog(Arc::new(ping_pong_catalog()));
    container
        .add_self::<Ping>(BindingConfig::scoped())
        .unwrap()
        .add_self::<Pong>(BindingConfig::scoped())
        .unwrap();

    match container.get::<Ping>() {
        Err(CoreError::CircularDependency { cycle_service, .. }) => {
            assert!(cycle_service.ends_with("Ping"))
        }
        other => panic!("expected CircularDependency, got {:?}", other.map(|_| ())),
    }

    let scope = container.create_scope();
    assert!(matches!(scope.get::<Pong>(), Err(CoreError::CircularDependency { .. })));
    assert_eq!(scope.service_count(), 0);
}

struct Token(&'static str);

struct Session {
    late: Arc<Token>,
    bound: Arc<Token>,
}

#[test]
fn test_last_mapping_type_marker_and_ignore() {
    let catalog = TypeCatalog::new();
    catalog
        .register(TypeDescriptor::concrete::<Token>().last_mapping().build())
        .register(
            TypeDescriptor::concrete::<Session>()
                .initializer(
                    Initializer::of::<Session>("new")
                        .param::<Token>("late")
                        .ignore_type_marker::<Token>("bound")
                        .build(|args| {
                            Ok(Session {
                                late: args.get(0)?,
                                bound: args.get(1)?,
                            })
                        }),
                )
                .build(),
        );
    let container = Container::with_catalog(Arc::new(catalog));
    container
        .add_instance(Arc::new(Token("bound")), BindingConfig::new())
        .unwrap();

    let session = container
        .get_with::<Session>(&[Instance::new(Token("late"))])
        .unwrap();
    assert_eq!(session.late.0, "late");
    assert_eq!(session.bound.0, "bound");

    // the marked parameter has no registry fallback
    assert!(matches!(
        container.get::<Session>(),
        Err(CoreError::MissingLateArgument { index: 0, .. })
    ));
}

#[test]
fn test_lifetime_markers_and_rules() {
    let catalog = TypeCatalog::new();
    catalog
        .register(
            TypeDescriptor::concrete::<StoreImpl>()
                .lifetime(ServiceScope::Singleton)
                .default_initializer()
                .build(),
        )
        .register(
            TypeDescriptor::concrete::<logging::impls::Logger>()
                .default_initializer()
                .build(),
        );

    let container = ContainerBuilder::new()
        .catalog(Arc::new(catalog))
        .convention_rule(PatternLifetimeRule::new("Log*", ServiceScope::Singleton))
        .build()
        .unwrap();

    let a = container.get::<StoreImpl>().unwrap();
    let b = container.get::<StoreImpl>().unwrap();
    assert!(Arc::ptr_eq(&a, &b));

    let c = container.get::<logging::impls::Logger>().unwrap();
    let d = container.get::<logging::impls::Logger>().unwrap();
    assert!(Arc::ptr_eq(&c, &d));

    // an explicit lifetime overrides the marker
    container.add_self::<StoreImpl>(BindingConfig::transient()).unwrap();
    let e = container.get::<StoreImpl>().unwrap();
    let f = container.get::<StoreImpl>().unwrap();
    assert!(!Arc::ptr_eq(&e, &f));
}

#[test]
fn test_explicit_only_container_ignores_catalog() {
    let catalog = logging_catalog(Arc::new(AtomicUsize::new(0)));
    let container = ContainerBuilder::new()
        .catalog(Arc::new(catalog))
        .config(ContainerConfig::explicit_only())
        .build()
        .unwrap();

    assert!(container.try_get::<dyn ILogger>().unwrap().is_none());

    container
        .add::<dyn ILogger, logging::impls::Logger>(BindingConfig::new())
        .unwrap();
    assert_eq!(container.get::<dyn ILogger>().unwrap().log("x"), "[default] x");
}

#[test]
fn test_resolve_hook_supplies_unbound_contract() {
    let calls = Arc::new(AtomicUsize::new(0));
    let hook_calls = calls.clone();

    let container = Container::new();
    container.add_resolve_hook(move |contract: &ContractId| {
        if *contract != ContractId::of::<dyn IStore>() {
            return None;
        }
        hook_calls.fetch_add(1, Ordering::SeqCst);
        Some(HookResolution::new::<dyn IStore, _>(ServiceScope::Singleton, |_| {
            Ok(Arc::new(StoreImpl) as Arc<dyn IStore>)
        }))
    });

    assert!(container.get_fixed::<dyn IStore>().unwrap().is_none());
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let a = container.get::<dyn IStore>().unwrap();
    let b = container.get::<dyn IStore>().unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(container.contains::<dyn IStore>(false));

    // hooks registered on a parent also serve its children
    let child = container.create_child_container();
    child.remove::<dyn IStore>(true);
    assert_eq!(child.get::<dyn IStore>().unwrap().name(), "store-impl");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(container.try_get::<dyn ILogger>().unwrap().is_none());
}

#[test]
fn test_factory_binding_reads_late_arguments() {
    let container = Container::new();
    container
        .add_factory::<String, _>(
            |invocation| {
                let name = invocation
                    .late_arg::<&'static str>(0)
                    .ok_or_else(|| CoreError::missing_argument("name"))?;
                Ok(Arc::new(format!("hello {}", name)))
            },
            BindingConfig::new(),
        )
        .unwrap();

    let greeting = container.get_with::<String>(&[Instance::new("world")]).unwrap();
    assert_eq!(greeting.as_str(), "hello world");
    assert!(container.get::<String>().is_err());
}
