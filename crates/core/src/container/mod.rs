#[allow(clippy::module_inception)]
pub mod container;
pub mod builder;
pub mod registry;
pub mod scope;
pub mod descriptor;
pub mod markers;
pub mod catalog;
pub mod call_site;
pub mod conventions;
pub mod resolver;
pub mod autowiring;
pub mod binding;
pub mod hooks;

pub use container::{Container, ContainerScope};
pub use builder::ContainerBuilder;
pub use registry::{BindingRegistry, ValueKey};
pub use scope::{ScopeCache, ScopeId, ServiceScope};
pub use descriptor::{ContractId, Instance, LateArgs};
pub use markers::{TypeKind, TypeMarkers};
pub use catalog::{
    Initializer, InitializerArgs, InitializerBuilder, ParameterInfo, TypeCatalog, TypeDescriptor,
    TypeDescriptorBuilder, TypedInitializer,
};
pub use call_site::{CallSite, CallSiteKind, FactoryFn, Invocation};
pub use conventions::{ConventionRule, PatternLifetimeRule, ServiceConventions};
pub use resolver::{ResolutionPath, TypeResolver};
pub use autowiring::{InitializerSelector, SelectedInitializer};
pub use binding::BindingConfig;
pub use hooks::{HookResolution, ServiceResolveHook};
