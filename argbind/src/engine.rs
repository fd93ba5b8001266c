//! The binding engine: settings and shared services, and the only entry
//! point that turns declarations into registered commands.

use crate::coerce::{Coercer, CoercionMode};
use crate::command::{Command, CommandDecl};
use crate::error::ConfigError;
use crate::middleware::MiddlewareRegistry;
use crate::molding::{Molder, MoldingRegistry};
use crate::prompt::{Prompter, TerminalPrompter};
use crate::registry::{Group, Registry};
use serde::Deserialize;
use std::sync::Arc;

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Parameter names that capture the remaining positionals.
    pub variadic_names: Vec<String>,
    pub coercion: CoercionMode,
    /// Append option defaults to help text.
    pub show_defaults: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            variadic_names: vec!["args".to_string(), "argv".to_string()],
            coercion: CoercionMode::Lenient,
            show_defaults: true,
        }
    }
}

impl EngineSettings {
    /// Defaults overlaid with `ARGBIND_STRICT_COERCION` and `ARGBIND_SHOW_DEFAULTS`.
    pub fn from_env() -> Self {
        Self::default().overlay(|key| std::env::var(key).ok())
    }

    /// Parse settings from a JSON document; missing fields keep their defaults.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    fn overlay(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let flag = |name: &str| lookup(name).and_then(|v| crate::coerce::parse_bool(&v));
        if let Some(strict) = flag("ARGBIND_STRICT_COERCION") {
            self.coercion = if strict {
                CoercionMode::Strict
            } else {
                CoercionMode::Lenient
            };
        }
        if let Some(show) = flag("ARGBIND_SHOW_DEFAULTS") {
            self.show_defaults = show;
        }
        self
    }
}

/// Services shared by every command an engine builds.
pub(crate) struct Services {
    pub(crate) settings: EngineSettings,
    pub(crate) molding: MoldingRegistry,
    pub(crate) middleware: MiddlewareRegistry,
    pub(crate) prompter: Arc<dyn Prompter>,
}

impl Services {
    pub(crate) fn coercer(&self) -> Coercer {
        Coercer::new(self.settings.coercion)
    }
}

/// Builds commands from declarations and registers them.
#[derive(Clone)]
pub struct Engine {
    services: Arc<Services>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Engine with default settings, no molders and a terminal prompter.
    pub fn new() -> Self {
        EngineBuilder::new().build()
    }

    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.services.settings
    }

    /// Middleware registry; named sets and global hooks may be added at any time.
    pub fn middleware(&self) -> &MiddlewareRegistry {
        &self.services.middleware
    }

    pub fn molding(&self) -> &MoldingRegistry {
        &self.services.molding
    }

    /// Classify a declaration into a command without registering it.
    pub fn build(&self, decl: CommandDecl) -> Result<Command, ConfigError> {
        Command::build(decl, self.services.clone())
    }

    /// Classify a declaration and add it to the registry's top level.
    pub fn register(&self, registry: &mut Registry, decl: CommandDecl) -> Result<(), ConfigError> {
        registry.insert(self.build(decl)?)
    }

    /// Classify a declaration and attach it to a group.
    pub fn attach(&self, group: &mut Group, decl: CommandDecl) -> Result<(), ConfigError> {
        group.insert(self.build(decl)?)
    }
}

/// Builder for [`Engine`].
pub struct EngineBuilder {
    settings: EngineSettings,
    molding: MoldingRegistry,
    middleware: MiddlewareRegistry,
    prompter: Arc<dyn Prompter>,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            settings: EngineSettings::default(),
            molding: MoldingRegistry::new(),
            middleware: MiddlewareRegistry::new(),
            prompter: Arc::new(TerminalPrompter),
        }
    }

    pub fn settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn molder(mut self, molder: impl Molder + 'static) -> Self {
        self.molding.register(molder);
        self
    }

    pub fn middleware(mut self, middleware: MiddlewareRegistry) -> Self {
        self.middleware = middleware;
        self
    }

    pub fn prompter(mut self, prompter: impl Prompter + 'static) -> Self {
        self.prompter = Arc::new(prompter);
        self
    }

    pub fn build(self) -> Engine {
        Engine {
            services: Arc::new(Services {
                settings: self.settings,
                molding: self.molding,
                middleware: self.middleware,
                prompter: self.prompter,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = EngineSettings::default();
        assert_eq!(settings.variadic_names, vec!["args", "argv"]);
        assert_eq!(settings.coercion, CoercionMode::Lenient);
        assert!(settings.show_defaults);
    }

    #[test]
    fn test_overlay_reads_variables() {
        let settings = EngineSettings::default().overlay(|key| match key {
            "ARGBIND_STRICT_COERCION" => Some("yes".to_string()),
            "ARGBIND_SHOW_DEFAULTS" => Some("0".to_string()),
            _ => None,
        });
        assert_eq!(settings.coercion, CoercionMode::Strict);
        assert!(!settings.show_defaults);
    }

    #[test]
    fn test_overlay_ignores_unrecognized_values() {
        let settings = EngineSettings::default().overlay(|_| Some("perhaps".to_string()));
        assert_eq!(settings, EngineSettings::default());
    }

    #[test]
    fn test_settings_from_json_keeps_missing_defaults() {
        let settings = EngineSettings::from_json(r#"{"coercion": "strict"}"#).unwrap();
        assert_eq!(settings.coercion, CoercionMode::Strict);
        assert_eq!(settings.variadic_names, vec!["args", "argv"]);
    }

    #[test]
    fn test_register_inserts_built_command() {
        let engine = Engine::new();
        let mut registry = Registry::new();
        engine
            .register(&mut registry, CommandDecl::new("hello_world", |_| "hi"))
            .unwrap();
        assert!(registry.get("hello-world").is_some());
    }
}
