use crate::config::ConventionConfig;
use crate::container::descriptor::ContractId;
use crate::container::scope::ServiceScope;

/// Custom convention rule
pub trait ConventionRule: Send + Sync {
    /// Lifetime for an implementation type name, `None` if the rule doesn't apply
    fn get_lifetime(&self, _type_name: &str) -> Option<ServiceScope> {
        None
    }

    /// Extra implementation simple names to try for an interface, tried first
    fn find_implementation(&self, _interface_name: &str) -> Vec<String> {
        Vec::new()
    }
}

/// Assigns a lifetime to every implementation whose simple name matches a `*` pattern
pub struct PatternLifetimeRule {
    pattern: String,
    lifetime: ServiceScope,
}

impl PatternLifetimeRule {
    pub fn new(pattern: impl Into<String>, lifetime: ServiceScope) -> Self {
        Self {
            pattern: pattern.into(),
            lifetime,
        }
    }
}

impl ConventionRule for PatternLifetimeRule {
    fn get_lifetime(&self, type_name: &str) -> Option<ServiceScope> {
        let simple = type_name.rsplit("::").next().unwrap_or(type_name);
        matches_pattern(simple, &self.pattern).then_some(self.lifetime)
    }
}

/// Match a string against a pattern (* wildcard supported)
pub fn matches_pattern(text: &str, pattern: &str) -> bool {
    if pattern == "*" {
        return true;
    }

    if pattern.len() > 1 && pattern.starts_with('*') && pattern.ends_with('*') {
        let middle = &pattern[1..pattern.len() - 1];
        return text.contains(middle);
    }

    if let Some(suffix) = pattern.strip_prefix('*') {
        return text.ends_with(suffix);
    }

    if let Some(prefix) = pattern.strip_suffix('*') {
        return text.starts_with(prefix);
    }

    text == pattern
}

/// Naming conventions mapping interface contracts to implementation names
pub struct ServiceConventions {
    config: ConventionConfig,
    custom_rules: Vec<Box<dyn ConventionRule>>,
}

impl ServiceConventions {
    pub fn new(config: ConventionConfig) -> Self {
        Self {
            config,
            custom_rules: Vec::new(),
        }
    }

    /// Add a custom convention rule
    pub fn add_custom_rule<R: ConventionRule + 'static>(&mut self, rule: R) -> &mut Self {
        self.custom_rules.push(Box::new(rule));
        self
    }

    pub(crate) fn add_boxed_rule(&mut self, rule: Box<dyn ConventionRule>) -> &mut Self {
        self.custom_rules.push(rule);
        self
    }

    pub fn config(&self) -> &ConventionConfig {
        &self.config
    }

    /// Lifetime suggested by custom rules for an implementation type
    pub fn lifetime_for(&self, type_name: &str) -> Option<ServiceScope> {
        self.custom_rules
            .iter()
            .find_map(|rule| rule.get_lifetime(type_name))
    }

    /// Interface name with marker prefixes/suffixes removed.
    ///
    /// A prefix only counts as a marker when followed by an uppercase
    /// letter, so `Index` keeps its `I` while `IIndex` loses one.
    pub fn base_names(&self, interface_name: &str) -> Vec<String> {
        let mut bases = Vec::new();

        for prefix in &self.config.interface_prefixes {
            if let Some(rest) = interface_name.strip_prefix(prefix.as_str()) {
                if rest.chars().next().map(char::is_uppercase).unwrap_or(false) {
                    push_unique(&mut bases, rest.to_string());
                }
            }
        }

        for suffix in &self.config.interface_suffixes {
            if let Some(rest) = interface_name.strip_suffix(suffix.as_str()) {
                if !rest.is_empty() {
                    push_unique(&mut bases, rest.to_string());
                }
            }
        }

        push_unique(&mut bases, interface_name.to_string());
        bases
    }

    /// Implementation simple names to look for, most plausible first
    pub fn candidate_names(&self, interface_name: &str) -> Vec<String> {
        let mut names = Vec::new();

        for rule in &self.custom_rules {
            for name in rule.find_implementation(interface_name) {
                push_unique(&mut names, name);
            }
        }

        for base in self.base_names(interface_name) {
            if base != interface_name {
                push_unique(&mut names, base.clone());
            }
            for suffix in &self.config.implementation_suffixes {
                push_unique(&mut names, format!("{}{}", base, suffix));
            }
            for prefix in &self.config.implementation_prefixes {
                push_unique(&mut names, format!("{}{}", prefix, base));
            }
        }

        // same name in another module, e.g. trait `app::Store` and struct `app::impls::Store`
        push_unique(&mut names, interface_name.to_string());
        names
    }

    /// Fully qualified candidates inside the contract's own module tree
    pub fn candidate_paths(&self, contract: &ContractId) -> Vec<String> {
        let module = contract.module_path();
        let parent = match module.rfind("::") {
            Some(idx) => Some(&module[..idx]),
            None => None,
        };

        let names = self.candidate_names(contract.simple_name());
        let mut paths = Vec::new();

        for name in &names {
            if module.is_empty() {
                push_unique(&mut paths, name.clone());
            } else {
                push_unique(&mut paths, format!("{}::{}", module, name));
            }
        }

        for impl_module in &self.config.implementation_modules {
            for name in &names {
                if module.is_empty() {
                    push_unique(&mut paths, format!("{}::{}", impl_module, name));
                } else {
                    push_unique(&mut paths, format!("{}::{}::{}", module, impl_module, name));
                }
                if let Some(parent) = parent {
                    push_unique(&mut paths, format!("{}::{}::{}", parent, impl_module, name));
                }
            }
        }

        paths.retain(|path| path != contract.path());
        paths
    }
}

impl Default for ServiceConventions {
    fn default() -> Self {
        Self::new(ConventionConfig::default())
    }
}

impl std::fmt::Debug for ServiceConventions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceConventions")
            .field("config", &self.config)
            .field("custom_rules", &self.custom_rules.len())
            .finish()
    }
}

fn push_unique(items: &mut Vec<String>, item: String) {
    if !items.contains(&item) {
        items.push(item);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    trait ILogger {}

    struct LoggerRule;

    impl ConventionRule for LoggerRule {
        fn find_implementation(&self, interface_name: &str) -> Vec<String> {
            if interface_name == "ILogger" {
                vec!["ConsoleLogger".to_string()]
            } else {
                Vec::new()
            }
        }
    }

    #[test]
    fn test_base_names() {
        let conventions = ServiceConventions::default();

        assert_eq!(conventions.base_names("ILogger"), vec!["Logger", "ILogger"]);
        assert_eq!(conventions.base_names("Index"), vec!["Index"]);
        assert_eq!(conventions.base_names("CacheTrait"), vec!["Cache", "CacheTrait"]);
    }

    #[test]
    fn test_candidate_names_order() {
        let mut conventions = ServiceConventions::default();
        let names = conventions.candidate_names("ILogger");
        assert_eq!(&names[..4], &["Logger", "LoggerImpl", "LoggerService", "DefaultLogger"]);
        assert_eq!(names.last().map(String::as_str), Some("ILogger"));

        conventions.add_custom_rule(LoggerRule);
        assert_eq!(conventions.candidate_names("ILogger")[0], "ConsoleLogger");
    }

    #[test]
    fn test_candidate_paths() {
        let conventions = ServiceConventions::default();
        let contract = ContractId::of::<dyn ILogger>();
        let module = contract.module_path();
        let paths = conventions.candidate_paths(&contract);

        assert_eq!(paths[0], format!("{}::Logger", module));
        assert!(paths.contains(&format!("{}::impls::LoggerImpl", module)));
        assert!(paths.iter().any(|p| p.ends_with("container::conventions::impls::Logger")));
        assert!(!paths.contains(&contract.path().to_string()));
    }

    #[test]
    fn test_pattern_lifetime_rule() {
        let mut conventions = ServiceConventions::default();
        conventions.add_custom_rule(PatternLifetimeRule::new("*Repository", ServiceScope::Scoped));

        assert_eq!(conventions.lifetime_for("app::UserRepository"), Some(ServiceScope::Scoped));
        assert_eq!(conventions.lifetime_for("app::UserService"), None);
    }

    #[test]
    fn test_matches_pattern() {
        assert!(matches_pattern("UserService", "*Service"));
        assert!(matches_pattern("UserService", "User*"));
        assert!(matches_pattern("UserService", "*erSe*"));
        assert!(!matches_pattern("UserService", "*Repository"));
        assert!(matches_pattern("anything", "*"));
    }
}
