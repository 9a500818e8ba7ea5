use std::collections::HashMap;
use std::env;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, ConfigSource, ConfigValidator, NameFragmentValidator};
use crate::container::scope::ServiceScope;

/// Environment variable toggling automatic resolution
pub const ENV_AUTO_RESOLUTION: &str = "WEFT_AUTO_RESOLUTION";
/// Environment variable holding the default lifetime
pub const ENV_DEFAULT_LIFETIME: &str = "WEFT_DEFAULT_LIFETIME";

/// Configuration trait shared by loadable configuration structs
pub trait LoadableConfig: Sized {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self, ConfigError>;

    /// Validate the configuration
    fn validate(&self) -> Result<(), ConfigError>;

    /// Get configuration source information for debugging
    fn config_sources(&self) -> HashMap<String, ConfigSource>;
}

/// Naming conventions used to discover implementations of interface contracts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConventionConfig {
    /// Marker prefixes stripped from interface names (`ILogger` -> `Logger`)
    pub interface_prefixes: Vec<String>,
    /// Marker suffixes stripped from interface names (`LoggerTrait` -> `Logger`)
    pub interface_suffixes: Vec<String>,
    /// Prefixes tried on implementation names (`DefaultLogger`)
    pub implementation_prefixes: Vec<String>,
    /// Suffixes tried on implementation names (`LoggerImpl`)
    pub implementation_suffixes: Vec<String>,
    /// Sibling modules searched for implementations (`app::impls::Logger`)
    pub implementation_modules: Vec<String>,
}

impl Default for ConventionConfig {
    fn default() -> Self {
        Self {
            interface_prefixes: vec!["I".to_string()],
            interface_suffixes: vec!["Trait".to_string()],
            implementation_prefixes: vec!["Default".to_string()],
            implementation_suffixes: vec!["Impl".to_string(), "Service".to_string()],
            implementation_modules: vec!["impls".to_string(), "implementation".to_string()],
        }
    }
}

impl ConventionConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        NameFragmentValidator { field: "interface_prefixes" }
            .validate(self.interface_prefixes.as_slice())?;
        NameFragmentValidator { field: "interface_suffixes" }
            .validate(self.interface_suffixes.as_slice())?;
        NameFragmentValidator { field: "implementation_prefixes" }
            .validate(self.implementation_prefixes.as_slice())?;
        NameFragmentValidator { field: "implementation_suffixes" }
            .validate(self.implementation_suffixes.as_slice())?;
        NameFragmentValidator { field: "implementation_modules" }
            .validate(self.implementation_modules.as_slice())?;
        Ok(())
    }
}

/// Container configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    /// Whether unbound contracts are discovered through the type catalog
    pub auto_resolution: bool,
    /// Lifetime used when neither the registration nor any marker declares one
    pub default_lifetime: ServiceScope,
    /// Longest wait, in milliseconds, for another thread building the same contract
    pub resolve_lock_timeout_ms: u64,
    /// Naming conventions for implementation discovery
    pub conventions: ConventionConfig,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            auto_resolution: true,
            default_lifetime: ServiceScope::Transient,
            resolve_lock_timeout_ms: 5_000,
            conventions: ConventionConfig::default(),
        }
    }
}

impl ContainerConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration with automatic resolution turned off
    pub fn explicit_only() -> Self {
        Self {
            auto_resolution: false,
            ..Self::default()
        }
    }

    /// Parse configuration from a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a JSON document
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Lock wait as a `Duration`
    pub fn resolve_lock_timeout(&self) -> Duration {
        Duration::from_millis(self.resolve_lock_timeout_ms)
    }

    /// Load configuration from a `.yaml`/`.yml` or `.json` file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml_str(&contents),
            Some("json") => Self::from_json_str(&contents),
            other => Err(ConfigError::UnsupportedFormat {
                format: other.unwrap_or("<none>").to_string(),
            }),
        }
    }
}

fn read_env(name: &str) -> Result<Option<String>, ConfigError> {
    match env::var(name) {
        Ok(value) => Ok(Some(value)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => Err(ConfigError::environment_error(format!(
            "{} is not valid unicode",
            name
        ))),
    }
}

impl LoadableConfig for ContainerConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::new();

        if let Some(value) = read_env(ENV_AUTO_RESOLUTION)? {
            config.auto_resolution = match value.to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => {
                    return Err(ConfigError::invalid_value(
                        "auto_resolution",
                        value,
                        "true or false",
                    ))
                }
            };
        }

        if let Some(value) = read_env(ENV_DEFAULT_LIFETIME)? {
            config.default_lifetime = value.parse().map_err(|_| {
                ConfigError::invalid_value(
                    "default_lifetime",
                    value.clone(),
                    "singleton, transient or scoped",
                )
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.resolve_lock_timeout_ms == 0 {
            return Err(ConfigError::invalid_value(
                "resolve_lock_timeout_ms",
                "0",
                "a positive number of milliseconds",
            ));
        }
        self.conventions.validate()
    }

    fn config_sources(&self) -> HashMap<String, ConfigSource> {
        let mut sources = HashMap::new();

        sources.insert(
            "auto_resolution".to_string(),
            if env::var(ENV_AUTO_RESOLUTION).is_ok() {
                ConfigSource::EnvVar(ENV_AUTO_RESOLUTION.to_string())
            } else {
                ConfigSource::Default("true".to_string())
            },
        );

        sources.insert(
            "default_lifetime".to_string(),
            if env::var(ENV_DEFAULT_LIFETIME).is_ok() {
                ConfigSource::EnvVar(ENV_DEFAULT_LIFETIME.to_string())
            } else {
                ConfigSource::Default("transient".to_string())
            },
        );

        sources.insert("conventions".to_string(), ConfigSource::Programmatic);

        sources
    }
}
