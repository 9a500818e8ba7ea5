use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ConfigError;

/// Why a single initializer was rejected during initializer selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitializerRejection {
    /// Concrete type owning the initializer
    pub concrete_type: String,
    /// Initializer name as declared in the type catalog
    pub initializer: String,
    /// First parameter that could not be bound
    pub parameter: String,
    /// Declared type of that parameter
    pub parameter_type: String,
    /// Human readable reason
    pub reason: String,
}

impl std::fmt::Display for InitializerRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}::{}: parameter '{}: {}' {}",
            self.concrete_type, self.initializer, self.parameter, self.parameter_type, self.reason
        )
    }
}

fn join_rejections(rejections: &[InitializerRejection]) -> String {
    rejections
        .iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Core error type for the resolution engine
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid registration of '{concrete_type}' for '{contract}': {message}")]
    InvalidRegistration {
        contract: String,
        concrete_type: String,
        message: String,
    },

    #[error(
        "No initializer of '{concrete_type}' could be satisfied: {}",
        join_rejections(.rejections)
    )]
    NoSuitableInitializer {
        concrete_type: String,
        rejections: Vec<InitializerRejection>,
    },

    #[error("Unable to resolve contract '{contract}'. {hint}")]
    UnresolvableContract { contract: String, hint: String },

    #[error("Unsupported lifetime '{lifetime}' for call site of '{contract}'")]
    UnsupportedLifetime { contract: String, lifetime: String },

    #[error("Missing required argument: {argument}")]
    MissingArgument { argument: String },

    #[error("Missing late-bound argument #{index} while constructing '{service_type}'")]
    MissingLateArgument { service_type: String, index: usize },

    #[error("Type mismatch: expected '{expected}', found '{found}'")]
    TypeMismatch { expected: String, found: String },

    #[error("Circular dependency detected: {path} (cycle at: {cycle_service})")]
    CircularDependency { path: String, cycle_service: String },

    #[error("Factory for '{service_type}' failed: {source}")]
    FactoryFailed {
        service_type: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Invalid service scope: {scope}")]
    InvalidServiceScope { scope: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Lock error on resource: {resource}")]
    LockError { resource: String },
}

impl CoreError {
    /// Create a new registration error
    pub fn invalid_registration(
        contract: impl Into<String>,
        concrete_type: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidRegistration {
            contract: contract.into(),
            concrete_type: concrete_type.into(),
            message: message.into(),
        }
    }

    /// Create an unresolvable contract error carrying the standard remediation hints
    pub fn unresolvable(contract: impl Into<String>) -> Self {
        Self::UnresolvableContract {
            contract: contract.into(),
            hint: "Make sure the contract is not a value or abstract type, that it has an explicit \
                   registration, or that an implementation following the naming conventions is \
                   present in the type catalog."
                .to_string(),
        }
    }

    /// Create a missing argument error
    pub fn missing_argument(argument: impl Into<String>) -> Self {
        Self::MissingArgument {
            argument: argument.into(),
        }
    }

    /// Wrap an error produced by a user supplied factory
    pub fn factory_failed<E>(service_type: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::FactoryFailed {
            service_type: service_type.into(),
            source: Box::new(source),
        }
    }

    /// Check if the error was raised at registration time
    pub fn is_registration(&self) -> bool {
        matches!(self, Self::InvalidRegistration { .. } | Self::MissingArgument { .. })
    }

    /// Check if the error means "nothing could be found" rather than "something broke"
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::UnresolvableContract { .. })
    }

    /// Stable machine readable code for this error
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRegistration { .. } => "INVALID_REGISTRATION",
            Self::NoSuitableInitializer { .. } => "NO_SUITABLE_INITIALIZER",
            Self::UnresolvableContract { .. } => "UNRESOLVABLE_CONTRACT",
            Self::UnsupportedLifetime { .. } => "UNSUPPORTED_LIFETIME",
            Self::MissingArgument { .. } => "MISSING_ARGUMENT",
            Self::MissingLateArgument { .. } => "MISSING_LATE_ARGUMENT",
            Self::TypeMismatch { .. } => "TYPE_MISMATCH",
            Self::CircularDependency { .. } => "CIRCULAR_DEPENDENCY",
            Self::FactoryFailed { .. } => "FACTORY_FAILED",
            Self::InvalidServiceScope { .. } => "INVALID_SERVICE_SCOPE",
            Self::Configuration { .. } => "CONFIG_ERROR",
            Self::LockError { .. } => "LOCK_ERROR",
        }
    }
}

impl From<ConfigError> for CoreError {
    fn from(error: ConfigError) -> Self {
        Self::Configuration {
            message: error.to_string(),
        }
    }
}

/// Serializable summary of a resolution failure, suitable for diagnostics output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorReport {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rejections: Vec<InitializerRejection>,
}

impl From<&CoreError> for ErrorReport {
    fn from(error: &CoreError) -> Self {
        let (hint, rejections) = match error {
            CoreError::UnresolvableContract { hint, .. } => (Some(hint.clone()), Vec::new()),
            CoreError::NoSuitableInitializer { rejections, .. } => (None, rejections.clone()),
            _ => (None, Vec::new()),
        };

        Self {
            code: error.code().to_string(),
            message: error.to_string(),
            hint,
            rejections,
        }
    }
}
