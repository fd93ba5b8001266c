//! # argbind: declarative parameter binding for CLI commands
//!
//! Turns an ordinary handler plus an explicit parameter declaration list into
//! a fully specified command-line command. Each parameter is normalized,
//! its metadata resolved, its default and requiredness computed, and then it
//! is classified into a positional, option, flag, multi-value or JSON
//! parameter. At call time the invocation wrapper coerces raw values back
//! into the declared types, injects shared state, runs middleware hooks and
//! unifies synchronous and deferred handlers.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use argbind::{Annotation, App, CommandDecl, Engine, ParamDecl, Registry, Value};
//!
//! let engine = Engine::new();
//! let mut registry = Registry::new();
//!
//! engine.register(
//!     &mut registry,
//!     CommandDecl::new("greet_user", |args| {
//!         let name = args.str("name").unwrap_or_default();
//!         let times = args.int("times").unwrap_or(1);
//!         (0..times).map(|_| format!("Hello {name}")).collect::<Vec<_>>().join("\n")
//!     })
//!     .help("Greet somebody")
//!     .param(ParamDecl::new("name", Annotation::Str))
//!     .param(ParamDecl::new("times", Annotation::Int).default(Value::Int(1))),
//! )?;
//!
//! let response = App::new("hello", registry).run();
//! if !response.output.is_empty() {
//!     println!("{}", response.output);
//! }
//! std::process::exit(response.exit_code);
//! ```

// Lets `#[derive(Choice)]` expand to `::argbind::...` inside this crate's own tests.
extern crate self as argbind;

pub use argbind_macros::Choice;

pub mod annotation;
pub mod build_info;
pub mod classify;
pub mod coerce;
pub mod command;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod metadata;
pub mod middleware;
pub mod molding;
pub mod normalize;
pub mod prompt;
pub mod registry;
pub mod resolve;
pub mod state;
pub mod tracing_support;
pub mod value;

pub use annotation::{Annotation, Choice, EnumMember, EnumType, Extra, SharedType, StructType};
pub use classify::{Arity, CliParam, ParamKind, Rule};
pub use coerce::{coerce, CoercionMode, Coercer};
pub use command::{
    Binding, CallMode, Command, CommandDecl, Completion, Invocation, InvocationContext,
    IntoCompletion, ParamDecl, ParamSummary, ParameterSpec, RawArgs, SignatureDefault,
};
pub use dispatch::App;
pub use engine::{Engine, EngineBuilder, EngineSettings};
pub use error::{CoerceError, ConfigError};
pub use metadata::{ArgumentMeta, EnvMeta, JsonMeta, Metadata, Nargs, OptionMeta, ParamMeta};
pub use middleware::{AfterHook, BeforeHook, Hooks, Middleware, MiddlewareRegistry};
pub use molding::{MoldError, Molder, MoldingRegistry, SerdeMolder};
pub use normalize::{BaseType, ContainerKind, Normalized, ParamType};
pub use prompt::{PromptRequest, Prompter, ScriptedPrompter, TerminalPrompter};
pub use registry::{Group, Registry};
pub use value::{BoundArgs, InputFile, Instance, Value};

#[cfg(feature = "tracing")]
pub use tracing_support::{
    init_subscriber, init_subscriber_with_config, try_init_subscriber_with_config, TracingConfig,
    TracingFormat,
};

#[cfg(feature = "build-info")]
pub use build_info::{version_info, version_short};

use clap::error::ErrorKind;

/// CLI result type.
///
/// Handlers, hooks, callbacks and state constructors all report failures
/// through `CliResult`.
pub type CliResult<T> = Result<T, CliError>;

// ============================================================================
// Error Types
// ============================================================================

/// Top-level error type for CLI operations.
///
/// Distinguishes between user-fixable errors (exit code 1, or 2 for usage
/// errors) and system failures (exit code 101).
#[derive(Debug)]
pub enum CliError {
    /// User-fixable errors.
    User(UserError),

    /// System-level failures (exit code 101).
    System(SystemError),
}

impl CliError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::User(UserError::Usage { kind, .. }) if is_informational(*kind) => 0,
            CliError::User(UserError::Usage { .. }) => 2,
            CliError::User(_) => 1,
            CliError::System(_) => 101,
        }
    }

    /// Convenience constructor for user errors.
    pub fn user(message: impl Into<String>) -> Self {
        CliError::User(UserError::Generic(message.into()))
    }

    /// Convenience constructor for system errors.
    pub fn system(message: impl Into<String>) -> Self {
        CliError::System(SystemError::Internal(message.into()))
    }

    /// A required parameter was not supplied.
    ///
    /// Shaped exactly like the error the argument parser raises itself, so a
    /// missing option reads the same whichever path detected it.
    pub fn missing_parameter(label: &str) -> Self {
        clap::Error::raw(
            ErrorKind::MissingRequiredArgument,
            format!("the following required arguments were not provided:\n  {label}\n"),
        )
        .into()
    }

    /// A value outside the declared choices was supplied.
    pub fn invalid_choice(value: &str, label: &str, choices: &[String]) -> Self {
        clap::Error::raw(
            ErrorKind::InvalidValue,
            format!(
                "invalid value '{value}' for '{label}'\n  [possible values: {}]\n",
                choices.join(", ")
            ),
        )
        .into()
    }

    /// The parser kind behind a usage error, if any.
    pub fn usage_kind(&self) -> Option<ErrorKind> {
        match self {
            CliError::User(UserError::Usage { kind, .. }) => Some(*kind),
            _ => None,
        }
    }

    /// Help and version requests surface as errors from the parser but are
    /// not failures.
    pub fn is_informational(&self) -> bool {
        self.usage_kind().map(is_informational).unwrap_or(false)
    }
}

fn is_informational(kind: ErrorKind) -> bool {
    matches!(kind, ErrorKind::DisplayHelp | ErrorKind::DisplayVersion)
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::User(e) => write!(f, "{}", e),
            CliError::System(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for CliError {}

/// User-fixable errors.
#[derive(Debug)]
pub enum UserError {
    /// Generic user error with a message.
    Generic(String),

    /// Error raised by the argument parser, or shaped like one.
    Usage { kind: ErrorKind, message: String },

    /// A value could not be converted for a parameter.
    InvalidValue { param: String, reason: String },

    /// A JSON-bound parameter received a malformed payload.
    InvalidJson { param: String, reason: String },
}

impl std::fmt::Display for UserError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserError::Generic(msg) => write!(f, "Error: {}", msg),
            UserError::Usage { message, .. } => write!(f, "{}", message.trim_end()),
            UserError::InvalidValue { param, reason } => {
                write!(f, "Error: Invalid value for '{}'\n\n{}", param, reason)
            }
            UserError::InvalidJson { param, reason } => {
                write!(f, "Error: Invalid JSON for '{}'\n\n{}", param, reason)
            }
        }
    }
}

/// System-level failures (exit code 101).
#[derive(Debug)]
pub enum SystemError {
    /// Generic internal error.
    Internal(String),

    /// I/O error.
    Io(std::io::Error),

    /// Command configuration rejected at registration time.
    Config(ConfigError),
}

impl std::fmt::Display for SystemError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SystemError::Internal(msg) => {
                write!(f, "Internal Error: {}\n\nThis is likely a bug.", msg)
            }
            SystemError::Io(e) => {
                write!(
                    f,
                    "Internal Error: I/O operation failed\n\n{:?}\n\nThis is likely a bug.",
                    e
                )
            }
            SystemError::Config(e) => {
                write!(f, "Internal Error: Invalid command configuration\n\n{}", e)
            }
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::System(SystemError::Io(e))
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::System(SystemError::Config(e))
    }
}

impl From<clap::Error> for CliError {
    fn from(e: clap::Error) -> Self {
        CliError::User(UserError::Usage {
            kind: e.kind(),
            message: e.render().to_string(),
        })
    }
}

// ============================================================================
// Response Types
// ============================================================================

/// Response produced after dispatching a command line.
///
/// Contains exit code and output to be displayed to the user.
pub struct Response {
    /// Exit code (0 = success, 1 = user error, 2 = usage error, 101 = system error).
    pub exit_code: i32,

    /// Output to display (text, JSON, or silent).
    pub output: Output,
}

impl Response {
    /// Create a successful response with text output.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            output: Output::Text(content.into()),
        }
    }

    /// Create a successful response with JSON output.
    pub fn json(content: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            output: Output::Json(content.into()),
        }
    }

    /// Create a successful silent response.
    pub fn silent() -> Self {
        Self {
            exit_code: 0,
            output: Output::Silent,
        }
    }

    /// Create an error response.
    pub fn error(exit_code: i32, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            output: Output::Text(message.into()),
        }
    }
}

/// Output type for responses.
#[derive(Debug)]
pub enum Output {
    /// No output.
    Silent,

    /// Text output (printed to stdout).
    Text(String),

    /// JSON output (for machine-readable responses).
    Json(String),
}

impl Output {
    /// Check if output is empty.
    pub fn is_empty(&self) -> bool {
        matches!(self, Output::Silent)
    }
}

impl std::fmt::Display for Output {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Output::Silent => Ok(()),
            Output::Text(s) | Output::Json(s) => write!(f, "{}", s),
        }
    }
}

// ============================================================================
// Response Conversion Trait
// ============================================================================

/// Trait for converting command results into responses.
pub trait IntoResponse {
    /// Convert into a response.
    fn into_response(self) -> Response;
}

impl IntoResponse for String {
    fn into_response(self) -> Response {
        Response::text(self)
    }
}

impl IntoResponse for () {
    fn into_response(self) -> Response {
        Response::silent()
    }
}

impl IntoResponse for Value {
    fn into_response(self) -> Response {
        match self {
            Value::None => Response::silent(),
            Value::Map(_) | Value::Object(_) => match self.to_json() {
                Some(json) => Response::json(json.to_string()),
                None => Response::text(self.to_string()),
            },
            other => Response::text(other.to_string()),
        }
    }
}

impl<T: IntoResponse> IntoResponse for CliResult<T> {
    fn into_response(self) -> Response {
        match self {
            Ok(value) => value.into_response(),
            Err(e) if e.is_informational() => Response::text(e.to_string()),
            Err(e) => Response::error(e.exit_code(), e.to_string()),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
