//! Default and requiredness resolution.

use crate::command::SignatureDefault;
use crate::error::ConfigError;
use crate::metadata::{Metadata, Nargs};
use crate::value::Value;

/// Default, requiredness and visibility computed for one parameter.
#[derive(Clone, Debug, PartialEq)]
pub struct Resolution {
    /// A default value or default factory was declared.
    pub has_default: bool,
    /// Declared default as written.
    pub default: Option<Value>,
    /// Default used for classification; absent when a factory defers it.
    pub resolved_default: Option<Value>,
    /// The default is computed by a factory at call time.
    pub deferred: bool,
    pub required: bool,
    pub hidden: bool,
    pub expose: bool,
}

/// Resolve the default and requiredness of a parameter.
///
/// Default precedence: default factory (deferred), metadata default,
/// signature default. An explicit `required` flag on the metadata always
/// wins; otherwise a parameter is required when it has neither a default nor
/// a default factory.
pub fn resolve(
    command: &str,
    param: &str,
    metadata: Option<&Metadata>,
    signature: &SignatureDefault,
) -> Result<Resolution, ConfigError> {
    let deferred = metadata.and_then(Metadata::default_factory).is_some();
    let meta_default = metadata.and_then(Metadata::default_value).cloned();
    let signature_default = match signature {
        SignatureDefault::Value(v) => Some(v.clone()),
        SignatureDefault::Absent | SignatureDefault::Meta(_) => None,
    };

    if let Some(Metadata::Argument(arg)) = metadata {
        let has_default = meta_default.is_some() || signature_default.is_some();
        if arg.nargs == Some(Nargs::Many) && has_default {
            return Err(ConfigError::VariadicDefault {
                command: command.to_string(),
                param: param.to_string(),
            });
        }
    }

    let default = meta_default.clone().or_else(|| signature_default.clone());
    let resolved_default = if deferred {
        None
    } else {
        meta_default.map(normalize_default).or(signature_default)
    };

    let has_default = deferred || resolved_default.is_some();
    let required = metadata
        .and_then(Metadata::required)
        .unwrap_or(!has_default);
    let expose = metadata.map(Metadata::expose_value).unwrap_or(true);

    Ok(Resolution {
        has_default,
        default,
        resolved_default,
        deferred,
        required,
        hidden: !expose,
        expose,
    })
}

/// Enumeration members become their value; dates become their textual form.
fn normalize_default(value: Value) -> Value {
    match value {
        Value::Member(member) => Value::Str(member.value.to_string()),
        Value::Date(_) | Value::DateTime(_) => Value::Str(value.to_string()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::EnumMember;
    use crate::metadata::{ArgumentMeta, JsonMeta, OptionMeta, ParamMeta};

    fn run(metadata: Option<Metadata>, signature: SignatureDefault) -> Resolution {
        resolve("cmd", "p", metadata.as_ref(), &signature).unwrap()
    }

    #[test]
    fn test_metadata_default_beats_signature_default() {
        let r = run(
            Some(OptionMeta::new().default(3i64).into()),
            SignatureDefault::Value(Value::Int(5)),
        );
        assert_eq!(r.resolved_default, Some(Value::Int(3)));
        assert!(!r.required);
    }

    #[test]
    fn test_signature_default_used_without_metadata_default() {
        let r = run(None, SignatureDefault::Value(Value::Int(5)));
        assert_eq!(r.resolved_default, Some(Value::Int(5)));
        assert!(r.has_default);
    }

    #[test]
    fn test_no_default_means_required() {
        let r = run(None, SignatureDefault::Absent);
        assert!(r.required);
        assert!(!r.has_default);
    }

    #[test]
    fn test_explicit_required_false_without_default() {
        let r = run(Some(ParamMeta::new().required(false).into()), SignatureDefault::Absent);
        assert!(!r.required);
        assert_eq!(r.resolved_default, None);
    }

    #[test]
    fn test_explicit_required_true_overrides_default() {
        let r = run(
            Some(OptionMeta::new().default("x").required(true).into()),
            SignatureDefault::Absent,
        );
        assert!(r.required);
    }

    #[test]
    fn test_factory_defers_default() {
        let r = run(
            Some(OptionMeta::new().default("x").default_factory(|| Value::from("y")).into()),
            SignatureDefault::Absent,
        );
        assert!(r.deferred);
        assert_eq!(r.resolved_default, None);
        assert!(!r.required);
    }

    #[test]
    fn test_enum_and_date_defaults_are_normalized() {
        let member = Value::Member(EnumMember::new("Red", "red"));
        let r = run(Some(OptionMeta::new().default(member).into()), SignatureDefault::Absent);
        assert_eq!(r.resolved_default, Some(Value::from("red")));

        let date = chrono::NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let r = run(
            Some(OptionMeta::new().default(Value::Date(date)).into()),
            SignatureDefault::Absent,
        );
        assert_eq!(r.resolved_default, Some(Value::from("2024-01-31")));
    }

    #[test]
    fn test_variadic_argument_with_default_is_rejected() {
        let meta: Metadata = ArgumentMeta::new().nargs(Nargs::Many).default("x").into();
        let err = resolve("cmd", "files", Some(&meta), &SignatureDefault::Absent).unwrap_err();
        assert!(matches!(err, ConfigError::VariadicDefault { .. }));
    }

    #[test]
    fn test_json_is_optional_unless_required() {
        let r = run(Some(JsonMeta::new().into()), SignatureDefault::Absent);
        assert!(!r.required);
    }

    #[test]
    fn test_hidden_follows_expose() {
        let r = run(Some(ParamMeta::new().expose_value(false).into()), SignatureDefault::Absent);
        assert!(r.hidden);
        assert!(!r.expose);
    }
}
