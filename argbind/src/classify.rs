//! Parameter classification.
//!
//! An ordered chain of rules turns a normalized type, its metadata and its
//! resolved default into a command-line parameter descriptor. The first rule
//! that returns a descriptor wins; the order of [`CHAIN`] is significant for
//! overlapping cases.

use crate::error::ConfigError;
use crate::metadata::{Metadata, Nargs, OptionMeta};
use crate::molding::MoldingRegistry;
use crate::normalize::{BaseType, ContainerKind, Normalized, ParamType};
use crate::resolve::Resolution;
use crate::value::Value;
use std::fmt;
use tracing::debug;

/// Shape of a parameter on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamKind {
    Positional,
    /// Takes a value.
    Option,
    /// Boolean switch without a value.
    Flag,
}

/// How many values a parameter accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arity {
    One,
    Exactly(usize),
    /// Zero or more trailing positionals.
    Many,
    /// One value per occurrence, accumulated.
    Repeated,
}

impl Arity {
    pub fn is_multiple(&self) -> bool {
        !matches!(self, Arity::One)
    }
}

/// Classification rules, in chain order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rule {
    ImplicitVariadic,
    Sequence,
    Enumeration,
    Json,
    Argument,
    Env,
    Option,
    BooleanFlag,
    Fallback,
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Rule::ImplicitVariadic => "implicit-variadic",
            Rule::Sequence => "sequence",
            Rule::Enumeration => "enumeration",
            Rule::Json => "json",
            Rule::Argument => "argument",
            Rule::Env => "env",
            Rule::Option => "option",
            Rule::BooleanFlag => "boolean-flag",
            Rule::Fallback => "fallback",
        };
        f.write_str(name)
    }
}

/// Prompt settings of an option.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PromptSpec {
    pub text: String,
    pub confirmation: bool,
    pub hide_input: bool,
}

/// A classified command-line parameter.
#[derive(Clone, Debug)]
pub struct CliParam {
    /// Parameter name; also the argument id in the parser.
    pub name: String,
    pub kind: ParamKind,
    /// Primary long spelling, without leading dashes.
    pub long: Option<String>,
    pub aliases: Vec<String>,
    pub shorts: Vec<char>,
    pub value_type: ParamType,
    pub arity: Arity,
    pub required: bool,
    pub default: Option<Value>,
    /// The default comes from a factory at call time.
    pub deferred_default: bool,
    pub help: Option<String>,
    pub hidden: bool,
    pub choices: Option<Vec<String>>,
    pub envvar: Option<String>,
    pub prompt: Option<PromptSpec>,
    /// The raw value is a JSON document.
    pub json: bool,
    /// Value a flag takes when present.
    pub flag_value: bool,
    pub show_default: bool,
    pub rule: Rule,
}

impl CliParam {
    fn new(ctx: &ParamContext<'_>, kind: ParamKind, rule: Rule) -> Self {
        let long = match kind {
            ParamKind::Positional => None,
            _ => Some(ctx.name.replace('_', "-")),
        };
        Self {
            name: ctx.name.to_string(),
            kind,
            long,
            aliases: Vec::new(),
            shorts: Vec::new(),
            value_type: ctx.normalized.param_type,
            arity: Arity::One,
            required: ctx.resolution.required,
            default: ctx.resolution.resolved_default.clone(),
            deferred_default: ctx.resolution.deferred,
            help: ctx.help.map(str::to_string),
            hidden: ctx.resolution.hidden,
            choices: None,
            envvar: None,
            prompt: None,
            json: false,
            flag_value: true,
            show_default: true,
            rule,
        }
    }

    /// Usage label, as the parser prints it in errors.
    pub fn label(&self) -> String {
        let metavar = self.name.to_uppercase();
        match (self.kind, &self.long) {
            (ParamKind::Positional, _) => match self.arity {
                Arity::Many | Arity::Repeated => format!("[{metavar}]..."),
                _ => format!("<{metavar}>"),
            },
            (ParamKind::Flag, Some(long)) => format!("--{long}"),
            (ParamKind::Option, Some(long)) => format!("--{long} <{metavar}>"),
            (_, None) => metavar,
        }
    }

    /// Type label shown in help.
    pub fn type_label(&self) -> String {
        match (&self.choices, self.kind) {
            (Some(choices), _) => format!("[{}]", choices.join("|")),
            (None, ParamKind::Flag) => "BOOLEAN".to_string(),
            (None, _) => self.value_type.label().to_string(),
        }
    }

    fn apply_option_meta(
        &mut self,
        ctx: &ParamContext<'_>,
        meta: &OptionMeta,
    ) -> Result<(), ConfigError> {
        let mut longs = Vec::new();
        for decl in &meta.decls {
            if let Some(long) = decl.strip_prefix("--") {
                if long.is_empty() || long.starts_with('-') {
                    return Err(invalid_decl(ctx, decl));
                }
                longs.push(long.to_string());
            } else if let Some(short) = decl.strip_prefix('-') {
                let mut chars = short.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) if c.is_ascii_alphanumeric() => self.shorts.push(c),
                    _ => return Err(invalid_decl(ctx, decl)),
                }
            } else {
                return Err(invalid_decl(ctx, decl));
            }
        }
        let mut longs = longs.into_iter();
        if let Some(primary) = longs.next() {
            self.long = Some(primary);
        }
        self.aliases.extend(longs);

        let param = &meta.param;
        self.envvar = param.envvar.clone();
        if let Some(text) = &param.prompt {
            let text = if text.is_empty() {
                capitalize(&ctx.name.replace('_', " "))
            } else {
                text.clone()
            };
            self.prompt = Some(PromptSpec {
                text,
                confirmation: param.confirmation_prompt,
                hide_input: param.hide_input,
            });
        }
        if let Some(show) = param.show_default {
            self.show_default = show;
        }
        Ok(())
    }
}

fn invalid_decl(ctx: &ParamContext<'_>, decl: &str) -> ConfigError {
    ConfigError::InvalidDeclaration {
        param: ctx.name.to_string(),
        decl: decl.to_string(),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Everything the rules know about one parameter.
pub struct ParamContext<'a> {
    pub command: &'a str,
    pub name: &'a str,
    pub normalized: &'a Normalized,
    pub metadata: Option<&'a Metadata>,
    pub help: Option<&'a str>,
    pub resolution: &'a Resolution,
    /// The command receives the invocation context.
    pub context_injected: bool,
}

/// Engine-wide inputs of classification.
pub struct Classifier<'a> {
    pub variadic_names: &'a [String],
    pub molding: &'a MoldingRegistry,
}

/// What a rule returns; `None` passes the parameter to the next rule.
type Classified = Result<Option<CliParam>, ConfigError>;

type RuleFn = fn(&ParamContext<'_>, &Classifier<'_>) -> Classified;

/// The classification chain, in order.
pub const CHAIN: [(Rule, RuleFn); 9] = [
    (Rule::ImplicitVariadic, implicit_variadic),
    (Rule::Sequence, sequence),
    (Rule::Enumeration, enumeration),
    (Rule::Json, json),
    (Rule::Argument, argument),
    (Rule::Env, env),
    (Rule::Option, option),
    (Rule::BooleanFlag, boolean_flag),
    (Rule::Fallback, fallback),
];

impl Classifier<'_> {
    /// Run the chain; a parameter no rule accepts is a configuration error.
    pub fn classify(&self, ctx: &ParamContext<'_>) -> Result<CliParam, ConfigError> {
        for (rule, apply) in CHAIN {
            if let Some(param) = apply(ctx, self)? {
                debug!(
                    command = ctx.command,
                    param = ctx.name,
                    rule = %rule,
                    kind = ?param.kind,
                    required = param.required,
                    "Classified parameter"
                );
                return Ok(param);
            }
        }
        Err(ConfigError::Unsupported {
            command: ctx.command.to_string(),
            param: ctx.name.to_string(),
        })
    }
}

fn is_plain(metadata: Option<&Metadata>) -> bool {
    matches!(metadata, None | Some(Metadata::Param(_)))
}

fn implicit_variadic(ctx: &ParamContext<'_>, c: &Classifier<'_>) -> Classified {
    let is_sequence = matches!(
        ctx.normalized.base,
        BaseType::Container(ContainerKind::List | ContainerKind::VariadicTuple)
    );
    if ctx.metadata.is_some() || !is_sequence || !c.variadic_names.iter().any(|n| n == ctx.name) {
        return Ok(None);
    }
    let mut param = CliParam::new(ctx, ParamKind::Positional, Rule::ImplicitVariadic);
    param.arity = Arity::Many;
    param.required = false;
    param.default = None;
    Ok(Some(param))
}

fn sequence(ctx: &ParamContext<'_>, _: &Classifier<'_>) -> Classified {
    let BaseType::Container(kind) = ctx.normalized.base else {
        return Ok(None);
    };

    if let Some(Metadata::Argument(arg)) = ctx.metadata {
        let mut param = CliParam::new(ctx, ParamKind::Positional, Rule::Sequence);
        param.arity = match arg.nargs.unwrap_or(Nargs::Many) {
            Nargs::One => Arity::One,
            Nargs::Exactly(n) => Arity::Exactly(n),
            Nargs::Many => Arity::Many,
        };
        if param.arity == Arity::Many {
            if ctx.resolution.default.is_some() {
                return Err(ConfigError::VariadicDefault {
                    command: ctx.command.to_string(),
                    param: ctx.name.to_string(),
                });
            }
            param.required = arg.required.unwrap_or(false);
        }
        return Ok(Some(param));
    }

    let mut param = CliParam::new(ctx, ParamKind::Option, Rule::Sequence);
    param.arity = match kind {
        ContainerKind::Tuple(n) => Arity::Exactly(n),
        _ => Arity::Repeated,
    };
    if param.default.is_none() && !param.deferred_default {
        param.default = Some(empty_container(kind));
    }
    match ctx.metadata {
        Some(Metadata::Option(meta)) => param.apply_option_meta(ctx, meta)?,
        Some(Metadata::Param(meta)) => param.envvar = meta.envvar.clone(),
        Some(Metadata::Env(meta)) => param.envvar = Some(meta.envvar.clone()),
        _ => {}
    }
    Ok(Some(param))
}

fn empty_container(kind: ContainerKind) -> Value {
    match kind {
        ContainerKind::List => Value::List(Vec::new()),
        ContainerKind::VariadicTuple | ContainerKind::Tuple(_) => Value::Tuple(Vec::new()),
        ContainerKind::Set => Value::Set(Vec::new()),
        ContainerKind::FrozenSet => Value::FrozenSet(Vec::new()),
        ContainerKind::Map => Value::Map(Vec::new()),
    }
}

fn enumeration(ctx: &ParamContext<'_>, _: &Classifier<'_>) -> Classified {
    let BaseType::Enumeration(ty) = &ctx.normalized.base else {
        return Ok(None);
    };
    let mut param = CliParam::new(ctx, ParamKind::Option, Rule::Enumeration);
    param.choices = Some(ty.values());
    if let Some(Value::Member(member)) = &param.default {
        param.default = Some(Value::Str(member.value.to_string()));
    }
    match ctx.metadata {
        Some(Metadata::Option(meta)) => param.apply_option_meta(ctx, meta)?,
        Some(Metadata::Param(meta)) => param.envvar = meta.envvar.clone(),
        Some(Metadata::Env(meta)) => param.envvar = Some(meta.envvar.clone()),
        _ => {}
    }
    Ok(Some(param))
}

fn json(ctx: &ParamContext<'_>, c: &Classifier<'_>) -> Classified {
    let explicit = matches!(ctx.metadata, Some(Metadata::Json(_)));
    let implicit = ctx.metadata.is_none()
        && matches!(&ctx.normalized.base, BaseType::Structured(ty) if c.molding.claims(ty));
    if !explicit && !implicit {
        return Ok(None);
    }
    let mut param = CliParam::new(ctx, ParamKind::Option, Rule::Json);
    param.value_type = ParamType::Json;
    param.json = true;
    param.help = Some(match param.help.take() {
        Some(help) => format!("{help} (JSON)"),
        None => "(JSON)".to_string(),
    });
    Ok(Some(param))
}

fn argument(ctx: &ParamContext<'_>, _: &Classifier<'_>) -> Classified {
    let Some(Metadata::Argument(arg)) = ctx.metadata else {
        return Ok(None);
    };
    let mut param = CliParam::new(ctx, ParamKind::Positional, Rule::Argument);
    param.arity = match arg.nargs {
        None | Some(Nargs::One) => Arity::One,
        Some(Nargs::Exactly(n)) => Arity::Exactly(n),
        Some(Nargs::Many) => Arity::Many,
    };
    // Help on positionals is attached after construction.
    param.help = arg.help.clone().or_else(|| ctx.help.map(str::to_string));
    Ok(Some(param))
}

fn env(ctx: &ParamContext<'_>, _: &Classifier<'_>) -> Classified {
    let Some(Metadata::Env(meta)) = ctx.metadata else {
        return Ok(None);
    };
    let mut param = CliParam::new(ctx, ParamKind::Option, Rule::Env);
    param.envvar = Some(meta.envvar.clone());
    param.help = Some(match param.help.take() {
        Some(help) => format!("[env:{}] {help}", meta.envvar),
        None => format!("[env:{}]", meta.envvar),
    });
    Ok(Some(param))
}

fn option(ctx: &ParamContext<'_>, _: &Classifier<'_>) -> Classified {
    let Some(Metadata::Option(meta)) = ctx.metadata else {
        return Ok(None);
    };
    let is_flag = match meta.is_flag {
        Some(explicit) => explicit,
        None => ctx.normalized.base.is_bool(),
    };
    let mut param = if is_flag {
        flag_param(ctx, Rule::Option)
    } else {
        CliParam::new(ctx, ParamKind::Option, Rule::Option)
    };
    param.apply_option_meta(ctx, meta)?;
    Ok(Some(param))
}

fn boolean_flag(ctx: &ParamContext<'_>, _: &Classifier<'_>) -> Classified {
    if !is_plain(ctx.metadata) || !ctx.normalized.base.is_bool() {
        return Ok(None);
    }
    let mut param = flag_param(ctx, Rule::BooleanFlag);
    param.required = false;
    Ok(Some(param))
}

/// A flag defaulting to false unless declared otherwise; presence inverts the default.
/// A flag with a default factory sets true and leaves the absent value to the factory.
fn flag_param(ctx: &ParamContext<'_>, rule: Rule) -> CliParam {
    let mut param = CliParam::new(ctx, ParamKind::Flag, rule);
    param.value_type = ParamType::Boolean;
    if param.deferred_default {
        param.default = None;
        return param;
    }
    let default = matches!(param.default, Some(Value::Bool(true)));
    param.default = Some(Value::Bool(default));
    param.flag_value = !default;
    param
}

fn fallback(ctx: &ParamContext<'_>, _: &Classifier<'_>) -> Classified {
    if !is_plain(ctx.metadata) {
        return Ok(None);
    }
    if matches!(
        ctx.normalized.base,
        BaseType::Structured(_) | BaseType::Context | BaseType::Shared(_)
    ) {
        return Ok(None);
    }

    let resolution = ctx.resolution;
    if resolution.resolved_default.is_none() && !resolution.deferred {
        let kind = if resolution.required {
            ParamKind::Positional
        } else {
            ParamKind::Option
        };
        return Ok(Some(CliParam::new(ctx, kind, Rule::Fallback)));
    }
    if ctx.context_injected && !ctx.normalized.base.is_bool() {
        return Ok(Some(CliParam::new(ctx, ParamKind::Option, Rule::Fallback)));
    }
    if matches!(resolution.resolved_default, Some(Value::None)) && !resolution.required {
        return Ok(Some(CliParam::new(ctx, ParamKind::Option, Rule::Fallback)));
    }
    let mut param = CliParam::new(ctx, ParamKind::Positional, Rule::Fallback);
    // A positional with a default is optional regardless of the parser's own inference.
    param.required = false;
    Ok(Some(param))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{Annotation, Choice};
    use crate::command::SignatureDefault;
    use crate::metadata::{resolve_metadata, ArgumentMeta, EnvMeta, JsonMeta, ParamMeta};
    use crate::molding::SerdeMolder;
    use crate::normalize::normalize;
    use crate::resolve::resolve;

    #[allow(dead_code)]
    #[derive(crate::Choice)]
    enum Color {
        Red,
        Blue,
    }

    #[derive(serde::Deserialize)]
    struct Point {
        #[allow(dead_code)]
        x: i64,
    }

    fn classify_with(
        name: &str,
        annotation: Annotation,
        default: SignatureDefault,
        molding: &MoldingRegistry,
        context_injected: bool,
    ) -> Result<CliParam, ConfigError> {
        let normalized = normalize(&annotation);
        let meta = resolve_metadata(&annotation, &default);
        let resolution = resolve("cmd", name, meta.metadata.as_ref(), &default)?;
        let names = vec!["args".to_string(), "argv".to_string()];
        let classifier = Classifier {
            variadic_names: &names,
            molding,
        };
        classifier.classify(&ParamContext {
            command: "cmd",
            name,
            normalized: &normalized,
            metadata: meta.metadata.as_ref(),
            help: meta.help.as_deref(),
            resolution: &resolution,
            context_injected,
        })
    }

    fn classify(name: &str, annotation: Annotation, default: SignatureDefault) -> CliParam {
        classify_with(name, annotation, default, &MoldingRegistry::new(), false).unwrap()
    }

    #[test]
    fn test_reserved_name_becomes_variadic() {
        let p = classify("args", Annotation::list(Annotation::Str), SignatureDefault::Absent);
        assert_eq!(p.rule, Rule::ImplicitVariadic);
        assert_eq!(p.kind, ParamKind::Positional);
        assert_eq!(p.arity, Arity::Many);
        assert!(!p.required);
    }

    #[test]
    fn test_list_becomes_repeatable_option_with_empty_default() {
        let p = classify("tags", Annotation::list(Annotation::Str), SignatureDefault::Absent);
        assert_eq!(p.rule, Rule::Sequence);
        assert_eq!(p.kind, ParamKind::Option);
        assert_eq!(p.arity, Arity::Repeated);
        assert_eq!(p.default, Some(Value::List(Vec::new())));
    }

    #[test]
    fn test_fixed_tuple_takes_exact_count() {
        let p = classify(
            "point",
            Annotation::tuple([Annotation::Int, Annotation::Int]),
            SignatureDefault::Absent,
        );
        assert_eq!(p.arity, Arity::Exactly(2));
    }

    #[test]
    fn test_argument_list_is_variadic_positional() {
        let ann = Annotation::list(Annotation::Path).with(ArgumentMeta::new());
        let p = classify("files", ann, SignatureDefault::Absent);
        assert_eq!(p.kind, ParamKind::Positional);
        assert_eq!(p.arity, Arity::Many);
        assert!(!p.required);
    }

    #[test]
    fn test_enum_becomes_choice_option() {
        let p = classify(
            "color",
            Annotation::enumeration::<Color>(),
            SignatureDefault::Value(Color::Blue.member()),
        );
        assert_eq!(p.rule, Rule::Enumeration);
        assert_eq!(p.choices, Some(vec!["red".to_string(), "blue".to_string()]));
        assert_eq!(p.default, Some(Value::from("blue")));
        assert!(!p.required);
        assert_eq!(p.type_label(), "[red|blue]");
    }

    #[test]
    fn test_structured_with_molder_is_implicit_json() {
        let molding = MoldingRegistry::new().with(SerdeMolder::new().with::<Point>());
        let ann = Annotation::structured::<Point>().with_help("Target point");
        let p = classify_with("point", ann, SignatureDefault::Absent, &molding, false).unwrap();
        assert!(p.json);
        assert_eq!(p.help.as_deref(), Some("Target point (JSON)"));
    }

    #[test]
    fn test_structured_without_molder_is_unsupported() {
        let err = classify_with(
            "point",
            Annotation::structured::<Point>(),
            SignatureDefault::Absent,
            &MoldingRegistry::new(),
            false,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Unsupported { .. }));
    }

    #[test]
    fn test_explicit_json_is_optional() {
        let ann = Annotation::Any.with(JsonMeta::new());
        let p = classify("payload", ann, SignatureDefault::Absent);
        assert!(p.json);
        assert!(!p.required);
    }

    #[test]
    fn test_env_option_prefixes_help() {
        let ann = Annotation::Str.with(EnvMeta::new("API_TOKEN").help("Token"));
        let p = classify("token", ann, SignatureDefault::Absent);
        assert_eq!(p.rule, Rule::Env);
        assert_eq!(p.help.as_deref(), Some("[env:API_TOKEN] Token"));
        assert_eq!(p.envvar.as_deref(), Some("API_TOKEN"));
    }

    #[test]
    fn test_option_decls_add_spellings() {
        let ann = Annotation::Str.with(OptionMeta::new().decl("-m").decl("--msg").decl("--text"));
        let p = classify("message", ann, SignatureDefault::Absent);
        assert_eq!(p.long.as_deref(), Some("msg"));
        assert_eq!(p.aliases, vec!["text".to_string()]);
        assert_eq!(p.shorts, vec!['m']);
    }

    #[test]
    fn test_bad_decl_is_config_error() {
        let ann = Annotation::Str.with(OptionMeta::new().decl("-mx"));
        let err = classify_with("m", ann, SignatureDefault::Absent, &MoldingRegistry::new(), false)
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDeclaration { .. }));
    }

    #[test]
    fn test_promoted_param_prompts() {
        let ann = Annotation::Str.with(ParamMeta::new().prompt("").hide_input());
        let p = classify("api_key", ann, SignatureDefault::Absent);
        assert_eq!(p.rule, Rule::Option);
        let prompt = p.prompt.unwrap();
        assert_eq!(prompt.text, "Api key");
        assert!(prompt.hide_input);
    }

    #[test]
    fn test_bool_becomes_flag() {
        let p = classify("verbose", Annotation::Bool, SignatureDefault::Absent);
        assert_eq!(p.kind, ParamKind::Flag);
        assert_eq!(p.default, Some(Value::Bool(false)));
        assert!(p.flag_value);
        assert!(!p.required);
    }

    #[test]
    fn test_true_flag_flips_to_false() {
        let p = classify("color", Annotation::Bool, SignatureDefault::Value(Value::Bool(true)));
        assert!(!p.flag_value);
    }

    #[test]
    fn test_fallback_without_default_is_required_positional() {
        let p = classify("name", Annotation::Str, SignatureDefault::Absent);
        assert_eq!(p.kind, ParamKind::Positional);
        assert!(p.required);
        assert_eq!(p.label(), "<NAME>");
    }

    #[test]
    fn test_fallback_with_default_is_optional_positional() {
        let p = classify("times", Annotation::Int, SignatureDefault::Value(Value::Int(1)));
        assert_eq!(p.kind, ParamKind::Positional);
        assert!(!p.required);
        assert_eq!(p.default, Some(Value::Int(1)));
    }

    #[test]
    fn test_fallback_none_default_is_optional_option() {
        let p = classify(
            "limit",
            Annotation::optional(Annotation::Int),
            SignatureDefault::Value(Value::None),
        );
        assert_eq!(p.kind, ParamKind::Option);
        assert!(!p.required);
        assert_eq!(p.label(), "--limit <LIMIT>");
    }

    #[test]
    fn test_context_injected_command_uses_options() {
        let p = classify_with(
            "dry_run_count",
            Annotation::Int,
            SignatureDefault::Value(Value::Int(2)),
            &MoldingRegistry::new(),
            true,
        )
        .unwrap();
        assert_eq!(p.kind, ParamKind::Option);
        assert_eq!(p.long.as_deref(), Some("dry-run-count"));
    }

    #[test]
    fn test_required_false_without_default_is_optional_option() {
        let ann = Annotation::Str.with(ParamMeta::new().required(false));
        let p = classify("nickname", ann, SignatureDefault::Absent);
        assert_eq!(p.kind, ParamKind::Option);
        assert!(!p.required);
        assert_eq!(p.default, None);
        assert_eq!(p.label(), "--nickname <NICKNAME>");
    }

    #[test]
    fn test_argument_list_without_nargs_rejects_default() {
        let ann = Annotation::list(Annotation::Str)
            .with(ArgumentMeta::new().default(vec!["a.txt"]));
        let molding = MoldingRegistry::new();
        let err =
            classify_with("files", ann, SignatureDefault::Absent, &molding, false).unwrap_err();
        assert!(matches!(err, ConfigError::VariadicDefault { ref param, .. } if param == "files"));
    }

    #[test]
    fn test_flag_with_factory_has_no_static_default() {
        let ann = Annotation::Bool.with(OptionMeta::new().default_factory(|| Value::Bool(true)));
        let p = classify("cache", ann, SignatureDefault::Absent);
        assert_eq!(p.kind, ParamKind::Flag);
        assert!(p.deferred_default);
        assert_eq!(p.default, None);
        assert!(p.flag_value);
    }
}
