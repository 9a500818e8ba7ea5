use crate::container::scope::ServiceScope;

/// Options accepted by every registration call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BindingConfig {
    /// Explicit lifetime; falls back to markers, then the container default
    pub lifetime: Option<ServiceScope>,
    /// Register in every ancestor as well as the local container
    pub promote: bool,
    /// Clear earlier registrations of the contract first
    pub overwrite: bool,
}

impl BindingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for the singleton mode flag
    pub fn singleton() -> Self {
        Self::new().with_lifetime(ServiceScope::Singleton)
    }

    /// Shorthand for a transient registration
    pub fn transient() -> Self {
        Self::new().with_lifetime(ServiceScope::Transient)
    }

    /// Shorthand for a scoped registration
    pub fn scoped() -> Self {
        Self::new().with_lifetime(ServiceScope::Scoped)
    }

    /// Set service lifetime
    pub fn with_lifetime(mut self, lifetime: ServiceScope) -> Self {
        self.lifetime = Some(lifetime);
        self
    }

    /// Also register in every ancestor container
    pub fn promoted(mut self) -> Self {
        self.promote = true;
        self
    }

    /// Replace existing registrations instead of stacking on top of them
    pub fn overwriting(mut self) -> Self {
        self.overwrite = true;
        self
    }
}
