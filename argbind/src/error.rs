//! Registration-time and coercion error types

use thiserror::Error;

/// Errors raised while turning a command declaration into a command.
///
/// These are configuration mistakes in the embedding program and are fatal
/// at startup; they are never deferred to call time.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No classification rule accepted the parameter.
    #[error("Unsupported parameter configuration for '{param}' in command '{command}'")]
    Unsupported { command: String, param: String },

    /// A variadic positional was declared with a default value.
    #[error("Variadic argument '{param}' in command '{command}' cannot have a default value")]
    VariadicDefault { command: String, param: String },

    /// A required positional follows an optional one.
    #[error("Required argument '{param}' in command '{command}' follows optional argument '{after}'")]
    PositionalOrder {
        command: String,
        param: String,
        after: String,
    },

    /// Only the last positional may capture a variable number of values.
    #[error("Variadic argument '{param}' in command '{command}' must be the last positional")]
    VariadicNotLast { command: String, param: String },

    /// Two parameters claim the same name or flag spelling.
    #[error("Duplicate parameter '{param}' in command '{command}'")]
    DuplicateParameter { command: String, param: String },

    /// A flag spelling could not be parsed.
    #[error("Invalid declaration '{decl}' for parameter '{param}'")]
    InvalidDeclaration { param: String, decl: String },

    /// A command name is already taken in the target registry or group.
    #[error("Command '{0}' is already registered")]
    DuplicateCommand(String),

    /// A named middleware set was referenced but never registered.
    #[error("Unknown middleware '{0}'")]
    UnknownMiddleware(String),

    /// A command was attached to a group path that does not exist.
    #[error("Unknown group '{0}'")]
    UnknownGroup(String),
}

/// Errors raised by the value coercion subsystem.
#[derive(Debug, Error, PartialEq)]
pub enum CoerceError {
    /// A map entry was not of the `key=value` form.
    #[error("Cannot parse map item '{item}': expected key=value")]
    MalformedMapItem { item: String },

    /// A value could not be converted and strict coercion is enabled.
    #[error("Cannot convert '{value}' to {target}")]
    Conversion { value: String, target: String },
}

impl CoerceError {
    /// Create a conversion error
    pub fn conversion(value: impl Into<String>, target: impl Into<String>) -> Self {
        Self::Conversion {
            value: value.into(),
            target: target.into(),
        }
    }
}
