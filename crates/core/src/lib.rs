//! Service resolution and object composition.
//!
//! A [`Container`] turns a requested contract into a constructed instance,
//! wiring the instance's own dependencies from explicit bindings, named
//! values and implementations discovered in a [`TypeCatalog`].

pub mod errors;
pub mod config;
pub mod container;

pub use errors::{CoreError, ErrorReport, InitializerRejection};
pub use config::{ConfigError, ContainerConfig, ConventionConfig, LoadableConfig};
pub use container::{
    BindingConfig, Container, ContainerBuilder, ContainerScope, ContractId, HookResolution,
    Initializer, Instance, Invocation, ServiceResolveHook, ServiceScope, TypeCatalog,
    TypeDescriptor, TypeKind,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get crate version
pub fn version() -> &'static str {
    VERSION
}
