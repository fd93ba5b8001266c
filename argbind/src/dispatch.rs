//! Bridge to the `clap` argument parser.
//!
//! Builds a `clap::Command` tree from a [`Registry`], lets clap tokenize the
//! argument vector, extracts the raw per-parameter values and routes them to
//! the selected command's invocation wrapper.

use crate::classify::{Arity, CliParam, ParamKind};
use crate::coerce::parse_token;
use crate::command::{Command, RawArgs};
use crate::registry::{Group, Registry};
use crate::value::Value;
use crate::{CliError, CliResult, IntoResponse, Response};
use anstyle::{AnsiColor, Effects, Style};
use clap::builder::{PossibleValuesParser, Styles, TypedValueParser};
use clap::parser::ValueSource;
use clap::{Arg, ArgAction, ArgMatches};
use std::ffi::OsString;
use tracing::debug;

/// A command-line application over a registry.
#[derive(Debug)]
pub struct App {
    name: String,
    about: Option<String>,
    version: Option<String>,
    show_defaults: bool,
    registry: Registry,
}

impl App {
    pub fn new(name: impl Into<String>, registry: Registry) -> Self {
        Self {
            name: name.into(),
            about: None,
            version: Some(crate::build_info::version_short().to_string()),
            show_defaults: true,
            registry,
        }
    }

    pub fn about(mut self, about: impl Into<String>) -> Self {
        self.about = Some(about.into());
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Whether option defaults are appended to help text.
    pub fn show_defaults(mut self, show: bool) -> Self {
        self.show_defaults = show;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The clap command tree.
    pub fn clap(&self) -> clap::Command {
        let mut root = clap::Command::new(self.name.clone())
            .styles(styles())
            .subcommand_required(true)
            .arg_required_else_help(true);
        if let Some(about) = &self.about {
            root = root.about(about.clone());
        }
        if let Some(version) = &self.version {
            root = root.version(version.clone());
        }
        self.add_children(root, self.registry.root())
    }

    fn add_children(&self, mut parent: clap::Command, group: &Group) -> clap::Command {
        for command in group.commands() {
            parent = parent.subcommand(self.build_command(command));
        }
        for child in group.groups() {
            let mut sub = clap::Command::new(child.name().to_string())
                .subcommand_required(true)
                .arg_required_else_help(true);
            if let Some(help) = child.help() {
                sub = sub.about(help.to_string());
            }
            parent = parent.subcommand(self.add_children(sub, child));
        }
        parent
    }

    fn build_command(&self, command: &Command) -> clap::Command {
        let mut cmd = clap::Command::new(command.name().to_string());
        if let Some(help) = command.help() {
            cmd = cmd.about(help.to_string());
        }
        let mut index = 0;
        for param in command.params().iter().filter_map(|spec| spec.cli()) {
            let position = match param.kind {
                ParamKind::Positional => {
                    index += 1;
                    Some(index)
                }
                _ => None,
            };
            cmd = cmd.arg(self.build_arg(param, position));
        }
        cmd
    }

    fn build_arg(&self, param: &CliParam, position: Option<usize>) -> Arg {
        let mut arg = Arg::new(param.name.clone()).hide(param.hidden);
        if let Some(help) = self.help_text(param) {
            arg = arg.help(help);
        }

        if param.kind == ParamKind::Flag {
            arg = arg.action(ArgAction::SetTrue);
            return with_spellings(arg, param);
        }

        arg = arg.value_name(param.name.to_uppercase());
        arg = match &param.choices {
            Some(choices) => {
                arg.value_parser(PossibleValuesParser::new(choices.clone()).map(Value::Str))
            }
            None => {
                let ty = param.value_type;
                arg.value_parser(move |token: &str| parse_token(ty, token))
            }
        };

        // Env, prompt and factory values are filled in at call time.
        let parser_required = param.required
            && param.envvar.is_none()
            && param.prompt.is_none()
            && !param.deferred_default
            && param.default.is_none();

        match position {
            Some(index) => {
                arg = arg.index(index).required(parser_required);
                arg = match param.arity {
                    Arity::One => arg,
                    Arity::Exactly(n) => arg.num_args(n),
                    Arity::Many | Arity::Repeated => arg.num_args(0..).action(ArgAction::Append),
                };
                arg
            }
            None => {
                arg = with_spellings(arg, param).required(parser_required);
                match param.arity {
                    Arity::One => arg.action(ArgAction::Set),
                    Arity::Exactly(n) => arg.num_args(n).action(ArgAction::Set),
                    Arity::Many | Arity::Repeated => arg.action(ArgAction::Append),
                }
            }
        }
    }

    fn help_text(&self, param: &CliParam) -> Option<String> {
        let default = param
            .default
            .as_ref()
            .filter(|_| self.show_defaults && param.show_default && param.kind != ParamKind::Flag)
            .filter(|v| !v.is_none() && v.items().map_or(true, |items| !items.is_empty()))
            .map(|v| format!("[default: {v}]"));
        match (param.help.clone(), default) {
            (Some(help), Some(default)) => Some(format!("{help} {default}")),
            (help, default) => help.or(default),
        }
    }

    /// Parse `argv` and invoke the selected command.
    pub fn try_run_from<I, T>(&self, argv: I) -> CliResult<Value>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = self.clap().try_get_matches_from(argv)?;
        let (command, matches) = self.route(self.registry.root(), &matches)?;
        let raw = extract(command, matches);
        debug!(command = command.name(), values = raw.len(), "Dispatching");
        command.call(&raw)
    }

    /// Parse `argv`, invoke the selected command and turn the outcome into a response.
    pub fn run_from<I, T>(&self, argv: I) -> Response
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        self.try_run_from(argv).into_response()
    }

    /// Run with the process arguments.
    pub fn run(&self) -> Response {
        self.run_from(std::env::args_os())
    }

    fn route<'a>(
        &'a self,
        group: &'a Group,
        matches: &'a ArgMatches,
    ) -> CliResult<(&'a Command, &'a ArgMatches)> {
        let Some((name, sub)) = matches.subcommand() else {
            return Err(CliError::system("No subcommand selected"));
        };
        if let Some(command) = group.get(name) {
            return Ok((command, sub));
        }
        match group.subgroup(name) {
            Some(child) => self.route(child, sub),
            None => Err(CliError::system(format!("Unknown subcommand '{name}'"))),
        }
    }
}

fn with_spellings(mut arg: Arg, param: &CliParam) -> Arg {
    if let Some(long) = &param.long {
        arg = arg.long(long.clone());
    }
    for alias in &param.aliases {
        arg = arg.visible_alias(alias.clone());
    }
    let mut shorts = param.shorts.iter();
    if let Some(short) = shorts.next() {
        arg = arg.short(*short);
    }
    for short in shorts {
        arg = arg.visible_short_alias(*short);
    }
    arg
}

/// Raw values of every command-line parameter that was given.
fn extract(command: &Command, matches: &ArgMatches) -> RawArgs {
    let mut raw = RawArgs::new();
    for param in command.params().iter().filter_map(|spec| spec.cli()) {
        let id = param.name.as_str();
        if param.kind == ParamKind::Flag {
            if matches.value_source(id) == Some(ValueSource::CommandLine) {
                raw.insert(id, Value::Bool(param.flag_value));
            }
            continue;
        }
        let value = match param.arity {
            Arity::One => matches.get_one::<Value>(id).cloned(),
            _ => matches
                .get_many::<Value>(id)
                .map(|values| Value::List(values.cloned().collect())),
        };
        if let Some(value) = value {
            raw.insert(id, value);
        }
    }
    raw
}

fn styles() -> Styles {
    Styles::styled()
        .header(Style::new().fg_color(Some(AnsiColor::Green.into())).effects(Effects::BOLD))
        .usage(Style::new().fg_color(Some(AnsiColor::Green.into())).effects(Effects::BOLD))
        .literal(Style::new().fg_color(Some(AnsiColor::Cyan.into())).effects(Effects::BOLD))
        .placeholder(Style::new().fg_color(Some(AnsiColor::Cyan.into())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::Annotation;
    use crate::command::{CommandDecl, ParamDecl};
    use crate::engine::Engine;
    use crate::value::BoundArgs;
    use crate::Output;

    fn app() -> App {
        let engine = Engine::new();
        let mut registry = Registry::new();
        engine
            .register(
                &mut registry,
                CommandDecl::new("greet", |args: BoundArgs| {
                    let name = args.str("name").unwrap_or_default();
                    let times = args.int("times").unwrap_or(1);
                    vec![format!("Hello {name}"); times as usize].join("\n")
                })
                .param(ParamDecl::new("name", Annotation::Str))
                .param(ParamDecl::new("times", Annotation::Int).default(1i64)),
            )
            .unwrap();
        engine
            .register(
                &mut registry,
                CommandDecl::new("sum", |args: BoundArgs| {
                    args.list("values")
                        .map(|items| items.iter().filter_map(|v| match v {
                            Value::Int(i) => Some(*i),
                            _ => None,
                        }).sum::<i64>())
                        .unwrap_or(0)
                })
                .param(ParamDecl::new("values", Annotation::list(Annotation::Int))),
            )
            .unwrap();
        App::new("demo", registry)
    }

    #[test]
    fn test_positionals_with_default() {
        let app = app();
        assert_eq!(app.try_run_from(["demo", "greet", "Ann"]).unwrap(), Value::from("Hello Ann"));
        assert_eq!(
            app.try_run_from(["demo", "greet", "Ann", "2"]).unwrap(),
            Value::from("Hello Ann\nHello Ann")
        );
    }

    #[test]
    fn test_missing_positional_is_usage_error() {
        let response = app().run_from(["demo", "greet"]);
        assert_eq!(response.exit_code, 2);
    }

    #[test]
    fn test_repeatable_option_accumulates() {
        let value = app()
            .try_run_from(["demo", "sum", "--values", "1", "--values", "2", "--values", "39"])
            .unwrap();
        assert_eq!(value, Value::Int(42));
    }

    #[test]
    fn test_typed_parser_rejects_bad_token() {
        let response = app().run_from(["demo", "sum", "--values", "x"]);
        assert_eq!(response.exit_code, 2);
    }

    #[test]
    fn test_help_is_informational() {
        let response = app().run_from(["demo", "--help"]);
        assert_eq!(response.exit_code, 0);
        assert!(matches!(response.output, Output::Text(ref text) if text.contains("greet")));
    }

    #[test]
    fn test_clap_tree_is_consistent() {
        app().clap().debug_assert();
    }
}
