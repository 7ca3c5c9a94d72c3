//! Deferred default values.
//!
//! A [`DefaultSource`] other than a literal is resolved at parse time:
//! environment variables and properties through an [`Environment`], named
//! providers through [`DefaultProviders`]. An unresolvable source with no
//! fallback yields no value, leaving a required argument missing.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use argbind_core::{ArgSpec, DefaultSource};
use tracing::{debug, warn};

/// Source of environment variables and properties.
pub trait Environment: Send + Sync {
    fn var(&self, name: &str) -> Option<String>;
    fn property(&self, name: &str) -> Option<String>;
}

/// Reads variables from the process environment; properties come from a
/// caller-supplied map.
#[derive(Debug, Clone, Default)]
pub struct SystemEnvironment {
    properties: HashMap<String, String>,
}

impl SystemEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_property(mut self, name: &str, value: &str) -> Self {
        self.properties.insert(name.to_string(), value.to_string());
        self
    }
}

impl Environment for SystemEnvironment {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }

    fn property(&self, name: &str) -> Option<String> {
        self.properties.get(name).cloned()
    }
}

/// A fixed set of variables and properties.
///
/// ```
/// use argbind_parser::{Environment, MapEnvironment};
///
/// let env = MapEnvironment::new().with_var("HOME", "/home/me");
/// assert_eq!(env.var("HOME").as_deref(), Some("/home/me"));
/// assert_eq!(env.property("HOME"), None);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MapEnvironment {
    vars: HashMap<String, String>,
    properties: HashMap<String, String>,
}

impl MapEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_var(mut self, name: &str, value: &str) -> Self {
        self.vars.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_property(mut self, name: &str, value: &str) -> Self {
        self.properties.insert(name.to_string(), value.to_string());
        self
    }
}

impl Environment for MapEnvironment {
    fn var(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned()
    }

    fn property(&self, name: &str) -> Option<String> {
        self.properties.get(name).cloned()
    }
}

type ProviderFn = Arc<dyn Fn(&ArgSpec) -> Option<String> + Send + Sync>;

/// Named default-value providers.
#[derive(Clone, Default)]
pub struct DefaultProviders {
    providers: HashMap<String, ProviderFn>,
}

impl fmt::Debug for DefaultProviders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.providers.keys()).finish()
    }
}

impl DefaultProviders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a provider, replacing any previous one of the same name.
    pub fn register<F>(&mut self, name: &str, provider: F)
    where
        F: Fn(&ArgSpec) -> Option<String> + Send + Sync + 'static,
    {
        self.providers.insert(name.to_string(), Arc::new(provider));
    }

    fn get(&self, name: &str) -> Option<&ProviderFn> {
        self.providers.get(name)
    }
}

/// Resolves `source` for `arg` to a raw string.
pub(crate) fn resolve(
    source: &DefaultSource,
    arg: &ArgSpec,
    env: &dyn Environment,
    providers: &DefaultProviders,
) -> Option<String> {
    let resolved = match source {
        DefaultSource::Literal(value) => Some(value.clone()),
        DefaultSource::Env { name, fallback } => env.var(name).or_else(|| fallback.clone()),
        DefaultSource::Property { name, fallback } => {
            env.property(name).or_else(|| fallback.clone())
        }
        DefaultSource::Provider(name) => match providers.get(name) {
            Some(provider) => provider(arg),
            None => {
                warn!(provider = %name, arg = %arg.display_name(), "Default provider is not registered");
                None
            }
        },
    };
    debug!(arg = %arg.display_name(), source = %source, found = resolved.is_some(), "Resolved default");
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use argbind_core::{CommandDef, CommandGraph, OptionDef, TypeDescriptor};

    fn graph() -> CommandGraph {
        CommandDef::new("tool")
            .with_option(OptionDef::with_value(&["--out"], TypeDescriptor::default()))
            .build()
            .unwrap()
    }

    #[test]
    fn test_env_with_fallback() {
        let graph = graph();
        let arg = graph.find_option(graph.root(), "--out").unwrap();
        let env = MapEnvironment::new().with_var("OUT", "x.txt");
        let providers = DefaultProviders::new();

        let present = DefaultSource::from("${env:OUT:-y.txt}");
        assert_eq!(resolve(&present, arg, &env, &providers).as_deref(), Some("x.txt"));

        let absent = DefaultSource::from("${env:MISSING:-y.txt}");
        assert_eq!(resolve(&absent, arg, &env, &providers).as_deref(), Some("y.txt"));

        let unresolvable = DefaultSource::from("${env:MISSING}");
        assert_eq!(resolve(&unresolvable, arg, &env, &providers), None);
    }

    #[test]
    fn test_property_and_provider() {
        let graph = graph();
        let arg = graph.find_option(graph.root(), "--out").unwrap();
        let env = MapEnvironment::new().with_property("out.dir", "/tmp");
        let mut providers = DefaultProviders::new();
        providers.register("name", |arg: &ArgSpec| Some(arg.display_name().to_string()));

        assert_eq!(
            resolve(&DefaultSource::from("${sys:out.dir}"), arg, &env, &providers).as_deref(),
            Some("/tmp")
        );
        assert_eq!(
            resolve(&DefaultSource::from("${provider:name}"), arg, &env, &providers).as_deref(),
            Some("--out")
        );
        assert_eq!(
            resolve(&DefaultSource::from("${provider:other}"), arg, &env, &providers),
            None
        );
    }
}
