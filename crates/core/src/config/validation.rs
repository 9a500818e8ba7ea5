use thiserror::Error;

/// Configuration error type
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for field '{field}': '{value}'. Expected: {expected}")]
    InvalidValue {
        field: String,
        value: String,
        expected: String,
    },

    #[error("Environment variable error: {message}")]
    EnvironmentError { message: String },

    #[error("Unsupported configuration format: {format}")]
    UnsupportedFormat { format: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ConfigError {
    /// Create an invalid value error
    pub fn invalid_value(
        field: impl Into<String>,
        value: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
            expected: expected.into(),
        }
    }

    /// Create an environment error
    pub fn environment_error(message: impl Into<String>) -> Self {
        Self::EnvironmentError {
            message: message.into(),
        }
    }
}

/// Trait for validating configuration values
pub trait ConfigValidator<T: ?Sized> {
    /// Validate a configuration value
    fn validate(&self, value: &T) -> Result<(), ConfigError>;
}

/// Validates naming convention fragments such as `I`, `Impl` or `impls`.
///
/// Fragments are spliced into type paths, so they must be non-empty
/// identifier characters only.
pub struct NameFragmentValidator {
    pub field: &'static str,
}

impl ConfigValidator<str> for NameFragmentValidator {
    fn validate(&self, value: &str) -> Result<(), ConfigError> {
        if value.is_empty() {
            return Err(ConfigError::invalid_value(
                self.field,
                value,
                "non-empty identifier fragment",
            ));
        }

        if !value.chars().all(|c| c.is_alphanumeric() || c == '_') {
            return Err(ConfigError::invalid_value(
                self.field,
                value,
                "identifier characters only (no '::', spaces or generics)",
            ));
        }

        Ok(())
    }
}

impl ConfigValidator<[String]> for NameFragmentValidator {
    fn validate(&self, values: &[String]) -> Result<(), ConfigError> {
        values.iter().try_for_each(|value| self.validate(value.as_str()))
    }
}
