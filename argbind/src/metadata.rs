//! Parameter metadata wrappers and the metadata resolver.
//!
//! A metadata wrapper describes how a parameter should appear on the command
//! line. It reaches a parameter either attached to its annotation
//! ([`Annotation::with`]) or as the parameter's declared default value
//! ([`ParamDecl::default_meta`](crate::command::ParamDecl::default_meta)).

use crate::annotation::{Annotation, Extra};
use crate::command::SignatureDefault;
use crate::value::Value;
use crate::CliResult;
use std::fmt;
use std::sync::Arc;

/// Computes a default value at call time.
pub type DefaultFactory = Arc<dyn Fn() -> Value + Send + Sync>;

/// Post-processes a coerced value; receives the parameter name.
pub type Callback = Arc<dyn Fn(&str, Value) -> CliResult<Value> + Send + Sync>;

/// How many positional tokens an argument consumes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Nargs {
    One,
    Exactly(usize),
    /// Zero or more trailing tokens.
    Many,
}

/// Generic parameter metadata; promoted to an option when it asks for
/// option-only behaviour.
#[derive(Clone)]
pub struct ParamMeta {
    /// `None` means "no default".
    pub default: Option<Value>,
    pub help: Option<String>,
    pub envvar: Option<String>,
    /// Prompt text; an empty string prompts with the parameter name.
    pub prompt: Option<String>,
    pub confirmation_prompt: bool,
    pub hide_input: bool,
    pub callback: Option<Callback>,
    pub required: Option<bool>,
    pub default_factory: Option<DefaultFactory>,
    /// Parse the value but do not hand it to the handler.
    pub expose_value: bool,
    pub show_default: Option<bool>,
}

impl Default for ParamMeta {
    fn default() -> Self {
        Self {
            default: None,
            help: None,
            envvar: None,
            prompt: None,
            confirmation_prompt: false,
            hide_input: false,
            callback: None,
            required: None,
            default_factory: None,
            expose_value: true,
            show_default: None,
        }
    }
}

impl ParamMeta {
    pub fn new() -> Self {
        <Self as Default>::default()
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn envvar(mut self, name: impl Into<String>) -> Self {
        self.envvar = Some(name.into());
        self
    }

    pub fn prompt(mut self, text: impl Into<String>) -> Self {
        self.prompt = Some(text.into());
        self
    }

    pub fn confirmation_prompt(mut self) -> Self {
        self.confirmation_prompt = true;
        self
    }

    pub fn hide_input(mut self) -> Self {
        self.hide_input = true;
        self
    }

    pub fn callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str, Value) -> CliResult<Value> + Send + Sync + 'static,
    {
        self.callback = Some(Arc::new(callback));
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    pub fn default_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.default_factory = Some(Arc::new(factory));
        self
    }

    pub fn expose_value(mut self, expose: bool) -> Self {
        self.expose_value = expose;
        self
    }

    pub fn show_default(mut self, show: bool) -> Self {
        self.show_default = Some(show);
        self
    }

    /// Whether this metadata asks for behaviour only an option can provide.
    pub fn wants_option_style(&self) -> bool {
        self.envvar.is_some()
            || self.prompt.is_some()
            || self.confirmation_prompt
            || self.hide_input
            || self.callback.is_some()
            || matches!(&self.default, Some(v) if !v.is_none())
    }

    /// Promote to option metadata.
    pub fn into_option(self) -> OptionMeta {
        OptionMeta {
            param: self,
            decls: Vec::new(),
            is_flag: None,
        }
    }
}

/// Explicit option metadata.
#[derive(Clone, Default)]
pub struct OptionMeta {
    pub param: ParamMeta,
    /// Extra spellings such as `-m` or `--message`.
    pub decls: Vec<String>,
    /// Force (or refuse) boolean flag semantics.
    pub is_flag: Option<bool>,
}

impl OptionMeta {
    pub fn new() -> Self {
        <Self as Default>::default()
    }

    pub fn decl(mut self, decl: impl Into<String>) -> Self {
        self.decls.push(decl.into());
        self
    }

    pub fn is_flag(mut self, is_flag: bool) -> Self {
        self.is_flag = Some(is_flag);
        self
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.param = self.param.default(value);
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.param = self.param.help(help);
        self
    }

    pub fn envvar(mut self, name: impl Into<String>) -> Self {
        self.param = self.param.envvar(name);
        self
    }

    pub fn prompt(mut self, text: impl Into<String>) -> Self {
        self.param = self.param.prompt(text);
        self
    }

    pub fn confirmation_prompt(mut self) -> Self {
        self.param = self.param.confirmation_prompt();
        self
    }

    pub fn hide_input(mut self) -> Self {
        self.param = self.param.hide_input();
        self
    }

    pub fn callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str, Value) -> CliResult<Value> + Send + Sync + 'static,
    {
        self.param = self.param.callback(callback);
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.param = self.param.required(required);
        self
    }

    pub fn default_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.param = self.param.default_factory(factory);
        self
    }

    pub fn expose_value(mut self, expose: bool) -> Self {
        self.param = self.param.expose_value(expose);
        self
    }

    pub fn show_default(mut self, show: bool) -> Self {
        self.param = self.param.show_default(show);
        self
    }
}

/// Explicit positional argument metadata.
#[derive(Clone)]
pub struct ArgumentMeta {
    pub default: Option<Value>,
    pub help: Option<String>,
    pub required: Option<bool>,
    pub callback: Option<Callback>,
    pub default_factory: Option<DefaultFactory>,
    /// Unset means one token, or many for container types.
    pub nargs: Option<Nargs>,
    pub expose_value: bool,
}

impl Default for ArgumentMeta {
    fn default() -> Self {
        Self {
            default: None,
            help: None,
            required: None,
            callback: None,
            default_factory: None,
            nargs: None,
            expose_value: true,
        }
    }
}

impl ArgumentMeta {
    pub fn new() -> Self {
        <Self as Default>::default()
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    pub fn callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str, Value) -> CliResult<Value> + Send + Sync + 'static,
    {
        self.callback = Some(Arc::new(callback));
        self
    }

    pub fn default_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.default_factory = Some(Arc::new(factory));
        self
    }

    pub fn nargs(mut self, nargs: Nargs) -> Self {
        self.nargs = Some(nargs);
        self
    }

    pub fn expose_value(mut self, expose: bool) -> Self {
        self.expose_value = expose;
        self
    }
}

/// Environment-sourced option metadata.
///
/// Resolution order: explicit value, environment variable, default, default factory.
#[derive(Clone)]
pub struct EnvMeta {
    pub envvar: String,
    pub default: Option<Value>,
    pub help: Option<String>,
    pub required: Option<bool>,
    pub default_factory: Option<DefaultFactory>,
}

impl EnvMeta {
    pub fn new(envvar: impl Into<String>) -> Self {
        Self {
            envvar: envvar.into(),
            default: None,
            help: None,
            required: None,
            default_factory: None,
        }
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    pub fn default_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.default_factory = Some(Arc::new(factory));
        self
    }
}

/// Marks a parameter as a JSON-encoded string option.
#[derive(Clone, Debug, Default)]
pub struct JsonMeta {
    pub default: Option<Value>,
    pub help: Option<String>,
    /// JSON options are optional unless this is set.
    pub required: bool,
}

impl JsonMeta {
    pub fn new() -> Self {
        <Self as Default>::default()
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }
}

/// The metadata wrapper attached to one parameter.
#[derive(Clone)]
pub enum Metadata {
    Param(ParamMeta),
    Option(OptionMeta),
    Argument(ArgumentMeta),
    Env(EnvMeta),
    Json(JsonMeta),
}

impl Metadata {
    /// Declared default; `None` means "no default".
    pub fn default_value(&self) -> Option<&Value> {
        match self {
            Metadata::Param(m) => m.default.as_ref(),
            Metadata::Option(m) => m.param.default.as_ref(),
            Metadata::Argument(m) => m.default.as_ref(),
            Metadata::Env(m) => m.default.as_ref(),
            Metadata::Json(m) => m.default.as_ref(),
        }
    }

    /// Explicit requiredness, if stated.
    pub fn required(&self) -> Option<bool> {
        match self {
            Metadata::Param(m) => m.required,
            Metadata::Option(m) => m.param.required,
            Metadata::Argument(m) => m.required,
            Metadata::Env(m) => m.required,
            Metadata::Json(m) => Some(m.required),
        }
    }

    pub fn default_factory(&self) -> Option<&DefaultFactory> {
        match self {
            Metadata::Param(m) => m.default_factory.as_ref(),
            Metadata::Option(m) => m.param.default_factory.as_ref(),
            Metadata::Argument(m) => m.default_factory.as_ref(),
            Metadata::Env(m) => m.default_factory.as_ref(),
            Metadata::Json(_) => None,
        }
    }

    pub fn help(&self) -> Option<&str> {
        match self {
            Metadata::Param(m) => m.help.as_deref(),
            Metadata::Option(m) => m.param.help.as_deref(),
            Metadata::Argument(m) => m.help.as_deref(),
            Metadata::Env(m) => m.help.as_deref(),
            Metadata::Json(m) => m.help.as_deref(),
        }
    }

    pub fn callback(&self) -> Option<&Callback> {
        match self {
            Metadata::Param(m) => m.callback.as_ref(),
            Metadata::Option(m) => m.param.callback.as_ref(),
            Metadata::Argument(m) => m.callback.as_ref(),
            Metadata::Env(_) | Metadata::Json(_) => None,
        }
    }

    pub fn expose_value(&self) -> bool {
        match self {
            Metadata::Param(m) => m.expose_value,
            Metadata::Option(m) => m.param.expose_value,
            Metadata::Argument(m) => m.expose_value,
            Metadata::Env(_) | Metadata::Json(_) => true,
        }
    }

    /// Short variant name, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Metadata::Param(_) => "param",
            Metadata::Option(_) => "option",
            Metadata::Argument(_) => "argument",
            Metadata::Env(_) => "env",
            Metadata::Json(_) => "json",
        }
    }
}

impl fmt::Debug for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metadata")
            .field("kind", &self.kind())
            .field("default", &self.default_value())
            .field("required", &self.required())
            .field("help", &self.help())
            .finish_non_exhaustive()
    }
}

impl From<ParamMeta> for Metadata {
    fn from(m: ParamMeta) -> Self {
        Metadata::Param(m)
    }
}

impl From<OptionMeta> for Metadata {
    fn from(m: OptionMeta) -> Self {
        Metadata::Option(m)
    }
}

impl From<ArgumentMeta> for Metadata {
    fn from(m: ArgumentMeta) -> Self {
        Metadata::Argument(m)
    }
}

impl From<EnvMeta> for Metadata {
    fn from(m: EnvMeta) -> Self {
        Metadata::Env(m)
    }
}

impl From<JsonMeta> for Metadata {
    fn from(m: JsonMeta) -> Self {
        Metadata::Json(m)
    }
}

// ============================================================================
// Metadata Resolver
// ============================================================================

/// Metadata and help text found for one parameter.
#[derive(Clone, Debug, Default)]
pub struct ResolvedMetadata {
    pub metadata: Option<Metadata>,
    /// Help string attached to the annotation.
    pub help: Option<String>,
    /// Whether a generic wrapper was promoted to an option.
    pub promoted: bool,
}

/// Find the metadata wrapper of a parameter.
///
/// Metadata attached to the annotation wins over metadata given as the
/// default value; among several attached wrappers the last one applies. A
/// generic wrapper attached to the annotation that asks for option-only
/// behaviour is promoted to an option; no other promotion exists.
pub fn resolve_metadata(annotation: &Annotation, default: &SignatureDefault) -> ResolvedMetadata {
    let mut attached = None;
    let mut help = None;
    collect_extras(annotation, &mut attached, &mut help);

    match attached {
        Some(Metadata::Param(meta)) if meta.wants_option_style() => ResolvedMetadata {
            metadata: Some(Metadata::Option(meta.into_option())),
            help,
            promoted: true,
        },
        Some(meta) => ResolvedMetadata {
            metadata: Some(meta),
            help,
            promoted: false,
        },
        None => ResolvedMetadata {
            metadata: match default {
                SignatureDefault::Meta(meta) => Some(meta.clone()),
                _ => None,
            },
            help,
            promoted: false,
        },
    }
}

fn collect_extras(annotation: &Annotation, meta: &mut Option<Metadata>, help: &mut Option<String>) {
    if let Annotation::Annotated(inner, extras) = annotation {
        collect_extras(inner, meta, help);
        for extra in extras {
            match extra {
                Extra::Meta(m) => *meta = Some(m.clone()),
                Extra::Help(h) => *help = Some(h.clone()),
            }
        }
    }
}
