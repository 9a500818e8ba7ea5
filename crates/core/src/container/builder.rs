use std::sync::Arc;

use crate::config::{ContainerConfig, LoadableConfig};
use crate::container::catalog::TypeCatalog;
use crate::container::container::Container;
use crate::container::conventions::{ConventionRule, ServiceConventions};
use crate::container::hooks::ServiceResolveHook;
use crate::errors::CoreError;

/// Builder for a root container
pub struct ContainerBuilder {
    catalog: Arc<TypeCatalog>,
    config: ContainerConfig,
    rules: Vec<Box<dyn ConventionRule>>,
    hooks: Vec<Arc<dyn ServiceResolveHook>>,
}

impl ContainerBuilder {
    pub fn new() -> Self {
        Self {
            catalog: Arc::new(TypeCatalog::new()),
            config: ContainerConfig::default(),
            rules: Vec::new(),
            hooks: Vec::new(),
        }
    }

    /// Use a shared type catalog for implementation discovery
    pub fn catalog(mut self, catalog: Arc<TypeCatalog>) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn config(mut self, config: ContainerConfig) -> Self {
        self.config = config;
        self
    }

    /// Load the configuration from `WEFT_*` environment variables
    pub fn config_from_env(mut self) -> Result<Self, CoreError> {
        self.config = ContainerConfig::from_env()?;
        Ok(self)
    }

    /// Add a custom convention rule; rules are consulted in insertion order
    pub fn convention_rule<R: ConventionRule + 'static>(mut self, rule: R) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn resolve_hook<H: ServiceResolveHook + 'static>(mut self, hook: H) -> Self {
        self.hooks.push(Arc::new(hook));
        self
    }

    /// Validate the configuration and build the container
    pub fn build(self) -> Result<Container, CoreError> {
        self.config.validate()?;

        let mut conventions = ServiceConventions::new(self.config.conventions.clone());
        for rule in self.rules {
            conventions.add_boxed_rule(rule);
        }

        tracing::debug!(
            types = self.catalog.len(),
            auto_resolution = self.config.auto_resolution,
            default_lifetime = %self.config.default_lifetime,
            "building container"
        );

        Ok(Container::from_parts(
            self.catalog,
            Arc::new(conventions),
            Arc::new(self.config),
            self.hooks,
        ))
    }
}

impl Default for ContainerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ContainerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerBuilder")
            .field("types", &self.catalog.len())
            .field("config", &self.config)
            .field("rules", &self.rules.len())
            .field("hooks", &self.hooks.len())
            .finish()
    }
}
