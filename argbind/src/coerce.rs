//! Value coercion.
//!
//! Converts raw command-line values back into the declared parameter type.
//! Conversion failures of the final constructor step are tolerated in
//! [`CoercionMode::Lenient`] (the input passes through unchanged) and become
//! errors in [`CoercionMode::Strict`]. Malformed map items are always errors.

use crate::annotation::Annotation;
use crate::error::CoerceError;
use crate::normalize::{literal_annotation, ParamType};
use crate::value::{InputFile, Value, DATE_FORMAT};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use std::path::PathBuf;
use tracing::debug;
use uuid::Uuid;

const TRUE_TOKENS: [&str; 4] = ["true", "1", "yes", "on"];
const FALSE_TOKENS: [&str; 4] = ["false", "0", "no", "off"];

const DATETIME_FORMATS: [&str; 3] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// What to do when a value cannot be converted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoercionMode {
    /// Pass the original value through unchanged.
    #[default]
    Lenient,
    /// Report a conversion error.
    Strict,
}

/// Coerces values in a fixed mode.
#[derive(Clone, Copy, Debug, Default)]
pub struct Coercer {
    pub mode: CoercionMode,
}

impl Coercer {
    pub fn new(mode: CoercionMode) -> Self {
        Self { mode }
    }

    /// Coerce `value` into the type declared by `annotation`.
    pub fn coerce(&self, value: Value, annotation: &Annotation) -> Result<Value, CoerceError> {
        coerce_with(value, annotation, self.mode)
    }
}

/// Coerce leniently.
pub fn coerce(value: Value, annotation: &Annotation) -> Result<Value, CoerceError> {
    coerce_with(value, annotation, CoercionMode::Lenient)
}

fn coerce_with(
    value: Value,
    annotation: &Annotation,
    mode: CoercionMode,
) -> Result<Value, CoerceError> {
    match annotation {
        Annotation::Annotated(inner, _) => coerce_with(value, inner, mode),
        Annotation::Optional(inner) => {
            coerce_union(value, std::slice::from_ref(&**inner), true, annotation, mode)
        }
        Annotation::Union(arms) => {
            let concrete: Vec<Annotation> =
                arms.iter().filter(|a| !a.is_none_type()).cloned().collect();
            let allows_none = concrete.len() < arms.len();
            coerce_union(value, &concrete, allows_none, annotation, mode)
        }
        Annotation::List(inner) => Ok(Value::List(coerce_items(value, inner, mode)?)),
        Annotation::VariadicTuple(inner) => Ok(Value::Tuple(coerce_items(value, inner, mode)?)),
        Annotation::Set(inner) => Ok(Value::set(coerce_items(value, inner, mode)?)),
        Annotation::FrozenSet(inner) => Ok(Value::frozen_set(coerce_items(value, inner, mode)?)),
        Annotation::Tuple(types) => coerce_fixed_tuple(value, types, annotation, mode),
        Annotation::Map(key, val) => coerce_map(value, key, val, mode),
        // Validity was enforced by the choice constraint.
        Annotation::Enumeration(_) => Ok(value),
        Annotation::Literal(values) => match values.first() {
            Some(first) => coerce_with(value, &literal_annotation(first), mode),
            None => Ok(value),
        },
        Annotation::Any | Annotation::Context | Annotation::Shared(_) => Ok(value),
        Annotation::None => Ok(Value::None),
        _ => coerce_scalar(value, annotation, mode),
    }
}

/// Try each arm in declared order.
///
/// An arm is accepted when its result is an instance of the arm or when the
/// textual form changed under conversion.
fn coerce_union(
    value: Value,
    arms: &[Annotation],
    allows_none: bool,
    annotation: &Annotation,
    mode: CoercionMode,
) -> Result<Value, CoerceError> {
    if value.is_none() {
        return Ok(Value::None);
    }
    let original = value.to_string();
    for arm in arms {
        match coerce_with(value.clone(), arm, CoercionMode::Lenient) {
            Ok(result) if is_instance(&result, arm) || result.to_string() != original => {
                return Ok(result);
            }
            Ok(_) => continue,
            Err(e) => {
                debug!(arm = %arm, error = %e, "Union arm rejected value");
                continue;
            }
        }
    }
    match mode {
        CoercionMode::Strict => Err(CoerceError::conversion(original, annotation.to_string())),
        CoercionMode::Lenient if allows_none => Ok(Value::None),
        CoercionMode::Lenient => Ok(value),
    }
}

/// Whether `value` already has the runtime shape of `annotation`.
pub(crate) fn is_instance(value: &Value, annotation: &Annotation) -> bool {
    match (annotation.strip(), value) {
        (Annotation::Any, _) => true,
        (Annotation::None, Value::None) => true,
        (Annotation::Str, Value::Str(_)) => true,
        (Annotation::Int, Value::Int(_)) => true,
        (Annotation::Float, Value::Float(_)) => true,
        (Annotation::Bool, Value::Bool(_)) => true,
        (Annotation::Path, Value::Path(_)) => true,
        (Annotation::Uuid, Value::Uuid(_)) => true,
        (Annotation::Date, Value::Date(_)) => true,
        (Annotation::DateTime, Value::DateTime(_)) => true,
        (Annotation::File, Value::File(_)) => true,
        (Annotation::List(_), Value::List(_)) => true,
        (Annotation::VariadicTuple(_) | Annotation::Tuple(_), Value::Tuple(_)) => true,
        (Annotation::Set(_), Value::Set(_)) => true,
        (Annotation::FrozenSet(_), Value::FrozenSet(_)) => true,
        (Annotation::Map(_, _), Value::Map(_)) => true,
        (Annotation::Enumeration(ty), Value::Member(m)) => ty.member(m.value).is_some(),
        (Annotation::Enumeration(ty), Value::Str(s)) => ty.member(s).is_some(),
        (Annotation::Literal(values), v) => values.contains(v),
        (Annotation::Structured(_), Value::Object(_)) => true,
        (Annotation::Optional(inner), v) => v.is_none() || is_instance(v, inner),
        (Annotation::Union(arms), v) => arms.iter().any(|a| is_instance(v, a)),
        _ => false,
    }
}

/// Elements of a sequence value; strings are split on commas.
fn split_items(value: Value) -> Vec<Value> {
    match value {
        Value::None => Vec::new(),
        Value::List(items)
        | Value::Tuple(items)
        | Value::Set(items)
        | Value::FrozenSet(items) => items,
        Value::Str(s) if s.contains(',') => s
            .split(',')
            .map(|part| Value::Str(part.trim().to_string()))
            .collect(),
        other => vec![other],
    }
}

fn coerce_items(
    value: Value,
    inner: &Annotation,
    mode: CoercionMode,
) -> Result<Vec<Value>, CoerceError> {
    split_items(value)
        .into_iter()
        .map(|item| coerce_with(item, inner, mode))
        .collect()
}

fn coerce_fixed_tuple(
    value: Value,
    types: &[Annotation],
    annotation: &Annotation,
    mode: CoercionMode,
) -> Result<Value, CoerceError> {
    let items = split_items(value);
    if items.len() != types.len() && mode == CoercionMode::Strict {
        let original = items.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(",");
        return Err(CoerceError::conversion(original, annotation.to_string()));
    }
    let mut out = Vec::with_capacity(items.len());
    let mut types = types.iter();
    for item in items {
        match types.next() {
            Some(ty) => out.push(coerce_with(item, ty, mode)?),
            None => out.push(item),
        }
    }
    Ok(Value::Tuple(out))
}

fn coerce_map(
    value: Value,
    key: &Annotation,
    val: &Annotation,
    mode: CoercionMode,
) -> Result<Value, CoerceError> {
    let entries = match value {
        Value::None => Vec::new(),
        Value::Map(entries) => entries,
        Value::List(items) | Value::Tuple(items) => items
            .into_iter()
            .map(split_map_item)
            .collect::<Result<Vec<_>, _>>()?,
        other => vec![split_map_item(other)?],
    };
    let mut coerced = Vec::with_capacity(entries.len());
    for (k, v) in entries {
        coerced.push((coerce_with(k, key, mode)?, coerce_with(v, val, mode)?));
    }
    Ok(Value::map(coerced))
}

fn split_map_item(item: Value) -> Result<(Value, Value), CoerceError> {
    let text = item.to_string();
    match text.split_once('=') {
        Some((k, v)) => Ok((Value::Str(k.to_string()), Value::Str(v.to_string()))),
        None => Err(CoerceError::MalformedMapItem { item: text }),
    }
}

fn coerce_scalar(
    value: Value,
    annotation: &Annotation,
    mode: CoercionMode,
) -> Result<Value, CoerceError> {
    if value.is_none() || is_instance(&value, annotation) {
        return Ok(value);
    }
    match convert(&value, annotation) {
        Some(converted) => Ok(converted),
        None => match mode {
            CoercionMode::Strict => Err(CoerceError::conversion(
                value.to_string(),
                annotation.to_string(),
            )),
            CoercionMode::Lenient => {
                debug!(value = %value, target = %annotation, "Leaving value unconverted");
                Ok(value)
            }
        },
    }
}

/// Construct the target type from a value of another type.
fn convert(value: &Value, annotation: &Annotation) -> Option<Value> {
    match (annotation, value) {
        (Annotation::Date, Value::DateTime(dt)) => Some(Value::Date(dt.date())),
        (Annotation::DateTime, Value::Date(d)) => d.and_hms_opt(0, 0, 0).map(Value::DateTime),
        (Annotation::Int, Value::Float(f)) if f.is_finite() => Some(Value::Int(f.trunc() as i64)),
        (Annotation::Int, Value::Bool(b)) => Some(Value::Int(i64::from(*b))),
        (Annotation::Float, Value::Int(i)) => Some(Value::Float(*i as f64)),
        (Annotation::Bool, Value::Int(i)) => match i {
            0 => Some(Value::Bool(false)),
            1 => Some(Value::Bool(true)),
            _ => None,
        },
        (Annotation::File, Value::Path(p)) => Some(Value::File(InputFile::new(p.clone()))),
        (Annotation::Str, Value::Object(_) | Value::State(_) | Value::Context(_)) => None,
        (Annotation::Str, other) => Some(Value::Str(other.to_string())),
        (_, Value::Str(s)) => param_type(annotation).and_then(|ty| parse_token(ty, s).ok()),
        _ => None,
    }
}

fn param_type(annotation: &Annotation) -> Option<ParamType> {
    Some(match annotation {
        Annotation::Int => ParamType::Integer,
        Annotation::Float => ParamType::Float,
        Annotation::Bool => ParamType::Boolean,
        Annotation::Path => ParamType::Path,
        Annotation::Uuid => ParamType::Uuid,
        Annotation::Date => ParamType::Date,
        Annotation::DateTime => ParamType::DateTime,
        Annotation::File => ParamType::File,
        _ => return None,
    })
}

/// Parse one command-line token as `ty`.
pub fn parse_token(ty: ParamType, token: &str) -> Result<Value, CoerceError> {
    let fail = || CoerceError::conversion(token, ty.label());
    match ty {
        ParamType::Text | ParamType::Json => Ok(Value::Str(token.to_string())),
        ParamType::Integer => token.trim().parse::<i64>().map(Value::Int).map_err(|_| fail()),
        ParamType::Float => token.trim().parse::<f64>().map(Value::Float).map_err(|_| fail()),
        ParamType::Boolean => parse_bool(token).map(Value::Bool).ok_or_else(fail),
        ParamType::Path => Ok(Value::Path(PathBuf::from(token))),
        ParamType::Uuid => Uuid::parse_str(token.trim()).map(Value::Uuid).map_err(|_| fail()),
        ParamType::Date => NaiveDate::parse_from_str(token.trim(), DATE_FORMAT)
            .map(Value::Date)
            .map_err(|_| fail()),
        ParamType::DateTime => parse_datetime(token.trim()).map(Value::DateTime).ok_or_else(fail),
        ParamType::File => Ok(Value::File(InputFile::new(token))),
    }
}

/// Case-insensitive boolean vocabulary.
pub fn parse_bool(token: &str) -> Option<bool> {
    let token = token.trim().to_ascii_lowercase();
    if TRUE_TOKENS.contains(&token.as_str()) {
        Some(true)
    } else if FALSE_TOKENS.contains(&token.as_str()) {
        Some(false)
    } else {
        None
    }
}

fn parse_datetime(token: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(token, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(token, DATE_FORMAT)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strs(items: &[&str]) -> Value {
        Value::List(items.iter().map(|s| Value::from(*s)).collect())
    }

    #[test]
    fn test_map_from_key_value_tokens() {
        let ann = Annotation::map(Annotation::Str, Annotation::Int);
        let value = coerce(strs(&["key1=1", "key2=2", "foo=42"]), &ann).unwrap();
        assert_eq!(
            value,
            Value::map(vec![
                (Value::from("key1"), Value::Int(1)),
                (Value::from("key2"), Value::Int(2)),
                (Value::from("foo"), Value::Int(42)),
            ])
        );
    }

    #[test]
    fn test_malformed_map_item_is_named() {
        let ann = Annotation::map(Annotation::Str, Annotation::Int);
        let err = coerce(strs(&["a=1", "oops", "b=2"]), &ann).unwrap_err();
        assert_eq!(err, CoerceError::MalformedMapItem { item: "oops".into() });
        assert!(err.to_string().contains("'oops'"));
    }

    #[test]
    fn test_bool_vocabulary() {
        assert_eq!(coerce(Value::from("yes"), &Annotation::Bool).unwrap(), Value::Bool(true));
        assert_eq!(coerce(Value::from("OFF"), &Annotation::Bool).unwrap(), Value::Bool(false));
        assert_eq!(coerce(Value::from("maybe"), &Annotation::Bool).unwrap(), Value::from("maybe"));
    }

    #[test]
    fn test_optional_none_stays_none() {
        let ann = Annotation::optional(Annotation::Int);
        assert_eq!(coerce(Value::None, &ann).unwrap(), Value::None);
        assert_eq!(coerce(Value::from("7"), &ann).unwrap(), Value::Int(7));
    }

    #[test]
    fn test_union_tries_arms_in_order() {
        let ann = Annotation::union([Annotation::Int, Annotation::Str]);
        assert_eq!(coerce(Value::from("42"), &ann).unwrap(), Value::Int(42));
        assert_eq!(coerce(Value::from("abc"), &ann).unwrap(), Value::from("abc"));
    }

    #[test]
    fn test_optional_unparseable_becomes_none() {
        let ann = Annotation::optional(Annotation::Int);
        assert_eq!(coerce(Value::from("abc"), &ann).unwrap(), Value::None);
    }

    #[test]
    fn test_containers_round_trip() {
        let tokens = ["1", "2", "3"];
        let cases = [
            Annotation::list(Annotation::Int),
            Annotation::variadic_tuple(Annotation::Int),
            Annotation::tuple([Annotation::Int, Annotation::Int, Annotation::Int]),
            Annotation::set(Annotation::Int),
            Annotation::frozen_set(Annotation::Int),
        ];
        for ann in cases {
            let value = coerce(strs(&tokens), &ann).unwrap();
            let mut back = value.tokens();
            back.sort();
            assert_eq!(back, vec!["1", "2", "3"], "{ann}");
        }
    }

    #[test]
    fn test_comma_separated_string_is_split() {
        let value = coerce(Value::from("a, b,c"), &Annotation::list(Annotation::Str)).unwrap();
        assert_eq!(value, strs(&["a", "b", "c"]));
    }

    #[test]
    fn test_fixed_tuple_uses_per_position_types() {
        let ann = Annotation::tuple([Annotation::Str, Annotation::Int]);
        let value = coerce(strs(&["x", "5"]), &ann).unwrap();
        assert_eq!(value, Value::Tuple(vec![Value::from("x"), Value::Int(5)]));
    }

    #[test]
    fn test_datetime_narrows_to_date() {
        let dt = parse_datetime("2024-03-01T10:20:30").unwrap();
        let value = coerce(Value::DateTime(dt), &Annotation::Date).unwrap();
        assert_eq!(value, Value::Date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()));
    }

    #[test]
    fn test_enum_value_left_as_text() {
        #[allow(dead_code)]
        #[derive(crate::Choice)]
        enum Mode {
            Fast,
            Slow,
        }
        let ann = Annotation::enumeration::<Mode>();
        assert_eq!(coerce(Value::from("fast"), &ann).unwrap(), Value::from("fast"));
    }

    #[test]
    fn test_lenient_leaves_bad_input_unchanged() {
        assert_eq!(coerce(Value::from("abc"), &Annotation::Int).unwrap(), Value::from("abc"));
    }

    #[test]
    fn test_strict_reports_conversion_error() {
        let coercer = Coercer::new(CoercionMode::Strict);
        let err = coercer.coerce(Value::from("abc"), &Annotation::Int).unwrap_err();
        assert_eq!(err, CoerceError::conversion("abc", "int"));
    }

    #[test]
    fn test_domain_types() {
        let id = "67e55044-10b1-426f-9247-bb680e5fe0c8";
        assert!(matches!(coerce(Value::from(id), &Annotation::Uuid).unwrap(), Value::Uuid(_)));
        assert_eq!(
            coerce(Value::from("out.txt"), &Annotation::Path).unwrap(),
            Value::Path(PathBuf::from("out.txt"))
        );
        assert_eq!(coerce(Value::Int(3), &Annotation::Float).unwrap(), Value::Float(3.0));
    }

    #[test]
    fn test_parse_token_rejects_bad_integer() {
        assert!(parse_token(ParamType::Integer, "x1").is_err());
        assert_eq!(parse_token(ParamType::Integer, "12").unwrap(), Value::Int(12));
    }
}
