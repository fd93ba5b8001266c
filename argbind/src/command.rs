//! Command declarations, assembly and the invocation wrapper.
//!
//! A [`CommandDecl`] is the explicit, ahead-of-time description of a handler
//! and its parameters. The engine turns it into a [`Command`] by running
//! every parameter through normalization, metadata resolution, default
//! resolution and classification. [`Command::invoke`] is the call-time
//! wrapper: it sources and coerces values, injects context and shared state,
//! runs hooks and unifies ready and pending handler results.

use crate::annotation::{Annotation, SharedType};
use crate::classify::{Arity, CliParam, Classifier, ParamContext, ParamKind};
use crate::coerce::is_instance;
use crate::engine::Services;
use crate::error::ConfigError;
use crate::metadata::{resolve_metadata, Metadata};
use crate::middleware::{Hooks, Middleware};
use crate::normalize::{normalize, BaseType, Normalized};
use crate::prompt;
use crate::resolve::resolve;
use crate::state::StateCache;
use crate::value::{BoundArgs, Value};
use crate::{CliError, CliResult, UserError};
use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, instrument};

// ============================================================================
// Declarations
// ============================================================================

/// The default written in a parameter's declaration.
#[derive(Clone, Debug, Default)]
pub enum SignatureDefault {
    /// No default.
    #[default]
    Absent,
    /// A plain default value.
    Value(Value),
    /// A metadata wrapper given in place of a default.
    Meta(Metadata),
}

/// Declaration of one handler parameter.
#[derive(Clone, Debug)]
pub struct ParamDecl {
    pub name: String,
    pub annotation: Annotation,
    pub default: SignatureDefault,
}

impl ParamDecl {
    pub fn new(name: impl Into<String>, annotation: Annotation) -> Self {
        Self {
            name: name.into(),
            annotation,
            default: SignatureDefault::Absent,
        }
    }

    /// Plain default value.
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = SignatureDefault::Value(value.into());
        self
    }

    /// Metadata wrapper used as the default value.
    pub fn default_meta(mut self, meta: impl Into<Metadata>) -> Self {
        self.default = SignatureDefault::Meta(meta.into());
        self
    }
}

type Handler = Arc<dyn Fn(BoundArgs) -> Completion + Send + Sync>;

/// What a handler returns: a value now, or a computation to await.
pub enum Completion {
    Ready(CliResult<Value>),
    Pending(BoxFuture<'static, CliResult<Value>>),
}

impl Completion {
    /// Wrap a future.
    pub fn pending<F>(future: F) -> Self
    where
        F: Future<Output = CliResult<Value>> + Send + 'static,
    {
        Completion::Pending(Box::pin(future))
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Completion::Ready(result) => f.debug_tuple("Ready").field(result).finish(),
            Completion::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}

/// Conversion of handler return values.
pub trait IntoCompletion {
    fn into_completion(self) -> Completion;
}

impl IntoCompletion for Completion {
    fn into_completion(self) -> Completion {
        self
    }
}

impl IntoCompletion for () {
    fn into_completion(self) -> Completion {
        Completion::Ready(Ok(Value::None))
    }
}

impl IntoCompletion for CliResult<()> {
    fn into_completion(self) -> Completion {
        Completion::Ready(self.map(|_| Value::None))
    }
}

macro_rules! ready_completion {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoCompletion for $ty {
                fn into_completion(self) -> Completion {
                    Completion::Ready(Ok(self.into()))
                }
            }

            impl IntoCompletion for CliResult<$ty> {
                fn into_completion(self) -> Completion {
                    Completion::Ready(self.map(Into::into))
                }
            }
        )*
    };
}

ready_completion!(Value, String, &'static str, i64, f64, bool, Vec<String>, Vec<Value>);

/// Declaration of a command: handler, parameters, help and middleware.
pub struct CommandDecl {
    pub name: String,
    pub help: Option<String>,
    pub params: Vec<ParamDecl>,
    pub middleware: Vec<Middleware>,
    handler: Handler,
}

impl CommandDecl {
    /// Declare a command with a handler returning a value or a [`Completion`].
    pub fn new<F, R>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(BoundArgs) -> R + Send + Sync + 'static,
        R: IntoCompletion,
    {
        Self {
            name: name.into(),
            help: None,
            params: Vec::new(),
            middleware: Vec::new(),
            handler: Arc::new(move |args| handler(args).into_completion()),
        }
    }

    /// Declare a command whose handler is asynchronous.
    pub fn new_async<F, Fut>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(BoundArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CliResult<Value>> + Send + 'static,
    {
        Self::new(name, move |args| Completion::pending(handler(args)))
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn param(mut self, param: ParamDecl) -> Self {
        self.params.push(param);
        self
    }

    pub fn middleware(mut self, middleware: Middleware) -> Self {
        self.middleware.push(middleware);
        self
    }
}

impl fmt::Debug for CommandDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDecl")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("middleware", &self.middleware)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Parameter specs
// ============================================================================

/// How a parameter receives its value.
#[derive(Clone, Debug)]
pub enum Binding {
    /// Parsed from the command line.
    Cli(CliParam),
    /// Receives the invocation context.
    Context,
    /// Receives the cached shared state instance.
    Shared(SharedType),
}

/// Fully resolved description of one parameter.
#[derive(Clone, Debug)]
pub struct ParameterSpec {
    pub name: String,
    pub annotation: Annotation,
    pub normalized: Normalized,
    pub metadata: Option<Metadata>,
    pub help: Option<String>,
    pub has_default: bool,
    pub default: Option<Value>,
    pub resolved_default: Option<Value>,
    pub required: bool,
    pub hidden: bool,
    pub expose: bool,
    pub binding: Binding,
}

impl ParameterSpec {
    /// The command-line descriptor, unless the parameter is injected.
    pub fn cli(&self) -> Option<&CliParam> {
        match &self.binding {
            Binding::Cli(param) => Some(param),
            _ => None,
        }
    }
}

/// Read-only view of a parameter for help rendering.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParamSummary {
    pub label: String,
    pub type_label: String,
    pub required: bool,
    pub default: Option<String>,
    pub help: Option<String>,
}

/// Raw per-parameter values supplied by the argument parser.
#[derive(Clone, Debug, Default)]
pub struct RawArgs {
    values: Vec<(String, Value)>,
}

impl RawArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value, builder style.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.values.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.values.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// ============================================================================
// Invocation
// ============================================================================

/// Whether the caller can block on a pending handler.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CallMode {
    /// Drive pending handlers to completion on the calling thread.
    #[default]
    Blocking,
    /// The caller is already asynchronous; pending handlers are handed back.
    Suspended,
}

/// Handed to parameters declared with [`Annotation::Context`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvocationContext {
    pub command: String,
    pub mode: CallMode,
}

/// Result of [`Command::invoke`].
pub enum Invocation {
    Ready(Value),
    /// A pending handler plus its after hooks, still to be awaited.
    Deferred(BoxFuture<'static, CliResult<Value>>),
}

impl Invocation {
    /// Await the value, whichever way it was produced.
    pub async fn wait(self) -> CliResult<Value> {
        match self {
            Invocation::Ready(value) => Ok(value),
            Invocation::Deferred(future) => future.await,
        }
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, Invocation::Deferred(_))
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Invocation::Ready(value) => f.debug_tuple("Ready").field(value).finish(),
            Invocation::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

// ============================================================================
// Command
// ============================================================================

/// A classified command with its invocation wrapper.
pub struct Command {
    name: String,
    help: Option<String>,
    params: Vec<ParameterSpec>,
    handler: Handler,
    hooks: Hooks,
    services: Arc<Services>,
}

impl Command {
    /// Run every parameter through the classification pipeline.
    pub(crate) fn build(decl: CommandDecl, services: Arc<Services>) -> Result<Self, ConfigError> {
        let name = decl.name.replace('_', "-");
        let context_injected = decl
            .params
            .iter()
            .any(|p| matches!(p.annotation.strip(), Annotation::Context));
        let classifier = Classifier {
            variadic_names: &services.settings.variadic_names,
            molding: &services.molding,
        };

        let mut params: Vec<ParameterSpec> = Vec::with_capacity(decl.params.len());
        for param in decl.params {
            if params.iter().any(|p| p.name == param.name) {
                return Err(ConfigError::DuplicateParameter {
                    command: name.clone(),
                    param: param.name,
                });
            }
            let normalized = normalize(&param.annotation);
            let found = resolve_metadata(&param.annotation, &param.default);
            let resolution = resolve(&name, &param.name, found.metadata.as_ref(), &param.default)?;
            let help = found
                .metadata
                .as_ref()
                .and_then(Metadata::help)
                .map(str::to_string)
                .or(found.help);

            let binding = match &normalized.base {
                BaseType::Context => Binding::Context,
                BaseType::Shared(ty) => Binding::Shared(ty.clone()),
                _ => {
                    let mut cli = classifier.classify(&ParamContext {
                        command: &name,
                        name: &param.name,
                        normalized: &normalized,
                        metadata: found.metadata.as_ref(),
                        help: help.as_deref(),
                        resolution: &resolution,
                        context_injected,
                    })?;
                    if explicit_show_default(found.metadata.as_ref()).is_none() {
                        cli.show_default = services.settings.show_defaults;
                    }
                    Binding::Cli(cli)
                }
            };

            params.push(ParameterSpec {
                name: param.name,
                annotation: param.annotation,
                normalized,
                metadata: found.metadata,
                help,
                has_default: resolution.has_default,
                default: resolution.default,
                resolved_default: resolution.resolved_default,
                required: resolution.required,
                hidden: resolution.hidden,
                expose: resolution.expose,
                binding,
            });
        }

        validate_params(&name, &params)?;

        let help = decl.help.or_else(|| {
            params
                .iter()
                .find_map(|p| p.metadata.as_ref().and_then(Metadata::help))
                .map(str::to_string)
        });
        let hooks = services.middleware.resolve(&decl.middleware)?;

        info!(
            command = %name,
            params = params.len(),
            hooks = hooks.before.len() + hooks.after.len(),
            "Registered command"
        );

        Ok(Self {
            name,
            help,
            params,
            handler: decl.handler,
            hooks,
            services,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    pub fn params(&self) -> &[ParameterSpec] {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&ParameterSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Whether any parameter receives the invocation context.
    pub fn is_context_injected(&self) -> bool {
        self.params.iter().any(|p| matches!(p.binding, Binding::Context))
    }

    /// Visible command-line parameters, for help rendering.
    pub fn summaries(&self) -> Vec<ParamSummary> {
        self.params
            .iter()
            .filter_map(|spec| spec.cli().filter(|p| !p.hidden).map(|p| (spec, p)))
            .map(|(spec, param)| ParamSummary {
                label: param.label(),
                type_label: param.type_label(),
                required: param.required,
                default: param
                    .default
                    .as_ref()
                    .filter(|v| !v.is_none() && param.show_default)
                    .map(|v| v.to_string()),
                help: param.help.clone().or_else(|| spec.help.clone()),
            })
            .collect()
    }

    /// Invoke synchronously, blocking on a pending handler.
    pub fn call(&self, raw: &RawArgs) -> CliResult<Value> {
        match self.invoke(raw, CallMode::Blocking)? {
            Invocation::Ready(value) => Ok(value),
            Invocation::Deferred(future) => block_on(future),
        }
    }

    /// Invoke from asynchronous code.
    pub async fn call_async(&self, raw: &RawArgs) -> CliResult<Value> {
        self.invoke(raw, CallMode::Suspended)?.wait().await
    }

    /// The invocation wrapper.
    ///
    /// Binds every parameter, runs the before hooks, the handler and the
    /// after hooks. A pending handler is driven to completion in
    /// [`CallMode::Blocking`] and handed back as [`Invocation::Deferred`] in
    /// [`CallMode::Suspended`].
    #[instrument(skip_all, fields(command = %self.name, mode = ?mode))]
    pub fn invoke(&self, raw: &RawArgs, mode: CallMode) -> CliResult<Invocation> {
        let context = InvocationContext {
            command: self.name.clone(),
            mode,
        };
        let mut state = StateCache::new();
        let mut args = BoundArgs::new();

        for spec in &self.params {
            let value = match &spec.binding {
                Binding::Context => Value::Context(context.clone()),
                Binding::Shared(ty) => Value::State(state.get_or_construct(ty)?),
                Binding::Cli(param) => self.bind_cli(spec, param, raw)?,
            };
            if spec.expose {
                args.insert(spec.name.clone(), value);
            }
        }

        let mut hooks = self.hooks.clone();
        hooks.extend(self.services.middleware.global());
        hooks.run_before(&self.name, &mut args)?;
        debug!(before = hooks.before.len(), "Before hooks completed");

        match (self.handler)(args.clone()) {
            Completion::Ready(result) => {
                let value = result?;
                hooks.run_after(&self.name, &args, &value)?;
                Ok(Invocation::Ready(value))
            }
            Completion::Pending(future) => {
                let name = self.name.clone();
                let deferred: BoxFuture<'static, CliResult<Value>> = Box::pin(async move {
                    let value = future.await?;
                    hooks.run_after(&name, &args, &value)?;
                    Ok(value)
                });
                match mode {
                    CallMode::Suspended => Ok(Invocation::Deferred(deferred)),
                    CallMode::Blocking => block_on(deferred).map(Invocation::Ready),
                }
            }
        }
    }

    /// Source, decode, validate, coerce and post-process one command-line value.
    fn bind_cli(&self, spec: &ParameterSpec, param: &CliParam, raw: &RawArgs) -> CliResult<Value> {
        let label = param.label();
        let supplied = raw.get(&spec.name).filter(|v| !is_missing(v)).cloned();
        let value = match supplied {
            Some(value) => value,
            None => self.fallback_value(spec, param)?,
        };

        if param.required && (is_missing(&value) || is_empty_container(&value)) {
            return Err(CliError::missing_parameter(&label));
        }

        let value = if param.json { self.decode_json(spec, &label, value)? } else { value };

        if let Some(choices) = &param.choices {
            check_choice(&value, &label, choices)?;
        }

        let value = if param.json && matches!(value, Value::Object(_)) {
            value
        } else {
            self.coerce(spec, param, &label, value)?
        };

        match spec.metadata.as_ref().and_then(Metadata::callback) {
            Some(callback) => callback(&spec.name, value),
            None => Ok(value),
        }
    }

    /// Environment, prompt, default, then default factory.
    fn fallback_value(&self, spec: &ParameterSpec, param: &CliParam) -> CliResult<Value> {
        if let Some(var) = &param.envvar {
            if let Ok(value) = std::env::var(var) {
                if !value.is_empty() {
                    debug!(param = %spec.name, envvar = %var, "Value from environment");
                    return Ok(Value::Str(value));
                }
            }
        }
        if let Some(prompt_spec) = &param.prompt {
            let default = param.default.as_ref().filter(|v| !v.is_none()).map(|v| v.to_string());
            let answer = prompt::ask(self.services.prompter.as_ref(), prompt_spec, default)?;
            return Ok(Value::Str(answer));
        }
        if let Some(default) = &param.default {
            return Ok(default.clone());
        }
        if let Some(factory) = spec.metadata.as_ref().and_then(Metadata::default_factory) {
            debug!(param = %spec.name, "Value from default factory");
            return Ok(factory());
        }
        Ok(Value::None)
    }

    fn decode_json(&self, spec: &ParameterSpec, label: &str, value: Value) -> CliResult<Value> {
        let Value::Str(text) = value else {
            return Ok(value);
        };
        let invalid = |reason: String| {
            CliError::User(UserError::InvalidJson {
                param: label.to_string(),
                reason,
            })
        };
        let json: serde_json::Value =
            serde_json::from_str(&text).map_err(|e| invalid(e.to_string()))?;
        match &spec.normalized.base {
            BaseType::Structured(ty) if self.services.molding.claims(ty) => self
                .services
                .molding
                .encode(ty, json)
                .map(Value::Object)
                .map_err(|e| invalid(e.to_string())),
            _ => Ok(Value::from_json(json)),
        }
    }

    fn coerce(
        &self,
        spec: &ParameterSpec,
        param: &CliParam,
        label: &str,
        value: Value,
    ) -> CliResult<Value> {
        let coercer = self.services.coercer();
        let invalid = |e: crate::CoerceError| {
            CliError::User(UserError::InvalidValue {
                param: label.to_string(),
                reason: e.to_string(),
            })
        };
        // Multi-value parameters of a scalar type collect a list of that type.
        if param.arity.is_multiple() && !spec.normalized.base.is_container() {
            let items = match value {
                Value::None => Vec::new(),
                Value::List(items) | Value::Tuple(items) => items,
                other => vec![other],
            };
            return items
                .into_iter()
                .map(|item| coercer.coerce(item, &spec.annotation).map_err(invalid))
                .collect::<CliResult<Vec<_>>>()
                .map(Value::List);
        }
        if param.kind == ParamKind::Flag && is_instance(&value, &Annotation::Bool) {
            return Ok(value);
        }
        coercer.coerce(value, &spec.annotation).map_err(invalid)
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("help", &self.help)
            .field("params", &self.params)
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

/// `show_default` set on the parameter's own metadata, which beats the engine setting.
fn explicit_show_default(metadata: Option<&Metadata>) -> Option<bool> {
    match metadata? {
        Metadata::Param(meta) => meta.show_default,
        Metadata::Option(meta) => meta.param.show_default,
        _ => None,
    }
}

fn is_missing(value: &Value) -> bool {
    value.is_none()
}

fn is_empty_container(value: &Value) -> bool {
    match value {
        Value::Map(entries) => entries.is_empty(),
        other => other.items().is_some_and(<[Value]>::is_empty),
    }
}

fn check_choice(value: &Value, label: &str, choices: &[String]) -> CliResult<()> {
    let text = match value {
        Value::None => return Ok(()),
        Value::Member(member) => member.value.to_string(),
        other => other.to_string(),
    };
    if choices.iter().any(|c| *c == text) {
        Ok(())
    } else {
        Err(CliError::invalid_choice(&text, label, choices))
    }
}

fn block_on(future: BoxFuture<'static, CliResult<Value>>) -> CliResult<Value> {
    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    runtime.block_on(future)
}

/// Positional ordering and flag spelling checks.
fn validate_params(command: &str, params: &[ParameterSpec]) -> Result<(), ConfigError> {
    let positionals: Vec<&CliParam> = params
        .iter()
        .filter_map(ParameterSpec::cli)
        .filter(|p| p.kind == ParamKind::Positional)
        .collect();

    let mut optional: Option<&str> = None;
    for (i, param) in positionals.iter().enumerate() {
        if param.arity == Arity::Many && i + 1 != positionals.len() {
            return Err(ConfigError::VariadicNotLast {
                command: command.to_string(),
                param: param.name.clone(),
            });
        }
        match optional {
            Some(after) if param.required => {
                return Err(ConfigError::PositionalOrder {
                    command: command.to_string(),
                    param: param.name.clone(),
                    after: after.to_string(),
                });
            }
            None if !param.required => optional = Some(&param.name),
            _ => {}
        }
    }

    let mut spellings: Vec<String> = Vec::new();
    for param in params.iter().filter_map(ParameterSpec::cli) {
        let longs = param.long.iter().chain(param.aliases.iter()).map(|l| format!("--{l}"));
        let shorts = param.shorts.iter().map(|s| format!("-{s}"));
        for spelling in longs.chain(shorts) {
            if spellings.contains(&spelling) {
                return Err(ConfigError::DuplicateParameter {
                    command: command.to_string(),
                    param: spelling,
                });
            }
            spellings.push(spelling);
        }
    }
    Ok(())
}
