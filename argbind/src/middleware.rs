//! Before/after hooks around command handlers.
//!
//! Hooks are attached to a command directly or by naming a middleware set
//! registered in the [`MiddlewareRegistry`]. Global hooks registered there
//! run after the command's own hooks and are read at call time.

use crate::error::ConfigError;
use crate::value::{BoundArgs, Value};
use crate::CliResult;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Runs before the handler; may rewrite the bound arguments.
pub type BeforeHook = Arc<dyn Fn(&str, &mut BoundArgs) -> CliResult<()> + Send + Sync>;

/// Runs after the handler with its result.
pub type AfterHook = Arc<dyn Fn(&str, &BoundArgs, &Value) -> CliResult<()> + Send + Sync>;

/// A hook reference on a command declaration.
#[derive(Clone)]
pub enum Middleware {
    /// A set registered under this name.
    Named(String),
    Before(BeforeHook),
    After(AfterHook),
}

impl Middleware {
    pub fn named(name: impl Into<String>) -> Self {
        Middleware::Named(name.into())
    }

    pub fn before<F>(hook: F) -> Self
    where
        F: Fn(&str, &mut BoundArgs) -> CliResult<()> + Send + Sync + 'static,
    {
        Middleware::Before(Arc::new(hook))
    }

    pub fn after<F>(hook: F) -> Self
    where
        F: Fn(&str, &BoundArgs, &Value) -> CliResult<()> + Send + Sync + 'static,
    {
        Middleware::After(Arc::new(hook))
    }
}

impl fmt::Debug for Middleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Middleware::Named(name) => f.debug_tuple("Named").field(name).finish(),
            Middleware::Before(_) => f.write_str("Before(..)"),
            Middleware::After(_) => f.write_str("After(..)"),
        }
    }
}

/// Resolved hook lists, in execution order.
#[derive(Clone, Default)]
pub struct Hooks {
    pub before: Vec<BeforeHook>,
    pub after: Vec<AfterHook>,
}

impl Hooks {
    pub fn is_empty(&self) -> bool {
        self.before.is_empty() && self.after.is_empty()
    }

    /// Append another list after these.
    pub fn extend(&mut self, other: Hooks) {
        self.before.extend(other.before);
        self.after.extend(other.after);
    }

    pub fn run_before(&self, command: &str, args: &mut BoundArgs) -> CliResult<()> {
        for hook in &self.before {
            hook(command, args)?;
        }
        Ok(())
    }

    pub fn run_after(&self, command: &str, args: &BoundArgs, result: &Value) -> CliResult<()> {
        for hook in &self.after {
            hook(command, args, result)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("before", &self.before.len())
            .field("after", &self.after.len())
            .finish()
    }
}

#[derive(Default)]
struct Inner {
    named: HashMap<String, Hooks>,
    global: Hooks,
}

/// Named middleware sets and global hooks, shared by every command of an engine.
#[derive(Clone, Default)]
pub struct MiddlewareRegistry {
    inner: Arc<RwLock<Inner>>,
}

impl MiddlewareRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a named set; re-registering a name replaces its hooks.
    pub fn register(
        &self,
        name: impl Into<String>,
        before: Vec<BeforeHook>,
        after: Vec<AfterHook>,
    ) {
        self.inner.write().named.insert(name.into(), Hooks { before, after });
    }

    pub fn add_before_global<F>(&self, hook: F)
    where
        F: Fn(&str, &mut BoundArgs) -> CliResult<()> + Send + Sync + 'static,
    {
        self.inner.write().global.before.push(Arc::new(hook));
    }

    pub fn add_after_global<F>(&self, hook: F)
    where
        F: Fn(&str, &BoundArgs, &Value) -> CliResult<()> + Send + Sync + 'static,
    {
        self.inner.write().global.after.push(Arc::new(hook));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.read().named.contains_key(name)
    }

    /// Resolve a command's middleware list, keeping its order.
    pub fn resolve(&self, middleware: &[Middleware]) -> Result<Hooks, ConfigError> {
        let inner = self.inner.read();
        let mut hooks = Hooks::default();
        for item in middleware {
            match item {
                Middleware::Named(name) => match inner.named.get(name) {
                    Some(set) => hooks.extend(set.clone()),
                    None => return Err(ConfigError::UnknownMiddleware(name.clone())),
                },
                Middleware::Before(hook) => hooks.before.push(hook.clone()),
                Middleware::After(hook) => hooks.after.push(hook.clone()),
            }
        }
        Ok(hooks)
    }

    /// Snapshot of the global hooks.
    pub fn global(&self) -> Hooks {
        self.inner.read().global.clone()
    }
}

impl fmt::Debug for MiddlewareRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read();
        let mut names: Vec<&String> = inner.named.keys().collect();
        names.sort();
        f.debug_struct("MiddlewareRegistry")
            .field("named", &names)
            .field("global", &inner.global)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn recorder(log: &Arc<Mutex<Vec<String>>>, label: &'static str) -> BeforeHook {
        let log = log.clone();
        Arc::new(move |_: &str, _: &mut BoundArgs| {
            log.lock().push(label.to_string());
            Ok(())
        })
    }

    #[test]
    fn test_resolve_keeps_declaration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = MiddlewareRegistry::new();
        registry.register("auth", vec![recorder(&log, "auth")], Vec::new());

        let hooks = registry
            .resolve(&[
                Middleware::Before(recorder(&log, "first")),
                Middleware::named("auth"),
                Middleware::Before(recorder(&log, "last")),
            ])
            .unwrap();
        hooks.run_before("cmd", &mut BoundArgs::new()).unwrap();
        assert_eq!(*log.lock(), vec!["first", "auth", "last"]);
    }

    #[test]
    fn test_unknown_name_is_config_error() {
        let err = MiddlewareRegistry::new()
            .resolve(&[Middleware::named("missing")])
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownMiddleware(name) if name == "missing"));
    }

    #[test]
    fn test_global_hooks_visible_through_clones() {
        let registry = MiddlewareRegistry::new();
        let shared = registry.clone();
        shared.add_after_global(|_, _, _| Ok(()));
        assert_eq!(registry.global().after.len(), 1);
    }

    #[test]
    fn test_before_hook_error_stops_chain() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let deny: BeforeHook = Arc::new(|_: &str, _: &mut BoundArgs| -> CliResult<()> {
            Err(crate::CliError::user("denied"))
        });
        let hooks = Hooks {
            before: vec![deny, recorder(&log, "never")],
            after: Vec::new(),
        };
        assert!(hooks.run_before("cmd", &mut BoundArgs::new()).is_err());
        assert!(log.lock().is_empty());
    }
}
