//! Type normalization.
//!
//! Reduces a declared [`Annotation`] to the canonical base type the
//! classifier works with, plus the parser-side value type used when
//! extracting raw tokens.

use crate::annotation::{Annotation, EnumType, SharedType, StructType};
use crate::value::Value;
use std::fmt;

/// Container families.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContainerKind {
    List,
    /// Homogeneous tuple of any length.
    VariadicTuple,
    /// Fixed-arity tuple.
    Tuple(usize),
    Set,
    FrozenSet,
    Map,
}

/// Canonical runtime type of a parameter.
#[derive(Clone, Debug)]
pub enum BaseType {
    Any,
    None,
    Str,
    Int,
    Float,
    Bool,
    Path,
    Uuid,
    Date,
    DateTime,
    File,
    Container(ContainerKind),
    Enumeration(EnumType),
    Structured(StructType),
    Context,
    Shared(SharedType),
}

impl BaseType {
    pub fn is_container(&self) -> bool {
        matches!(self, BaseType::Container(_))
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, BaseType::Bool)
    }
}

/// Value type the argument parser uses for raw tokens.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamType {
    Text,
    Integer,
    Float,
    Boolean,
    Path,
    Uuid,
    Date,
    DateTime,
    File,
    /// A JSON document, kept as text until call time.
    Json,
}

impl ParamType {
    /// Upper-case label shown in help and usage.
    pub fn label(&self) -> &'static str {
        match self {
            ParamType::Text => "TEXT",
            ParamType::Integer => "INTEGER",
            ParamType::Float => "FLOAT",
            ParamType::Boolean => "BOOLEAN",
            ParamType::Path => "PATH",
            ParamType::Uuid => "UUID",
            ParamType::Date => "DATE",
            ParamType::DateTime => "DATETIME",
            ParamType::File => "FILENAME",
            ParamType::Json => "JSON",
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Result of normalizing one annotation.
#[derive(Clone, Debug)]
pub struct Normalized {
    pub base: BaseType,
    /// The annotation admits the none value.
    pub is_optional: bool,
    pub param_type: ParamType,
}

/// Normalize a declared annotation.
pub fn normalize(annotation: &Annotation) -> Normalized {
    match annotation {
        Annotation::Annotated(inner, _) => normalize(inner),
        Annotation::Optional(inner) => Normalized {
            is_optional: true,
            ..normalize(inner)
        },
        Annotation::Union(arms) => {
            let is_optional = arms.iter().any(Annotation::is_none_type);
            let mut concrete = arms.iter().filter(|a| !a.is_none_type());
            // Multi-arm unions keep the first arm here; coercion tries every arm.
            match concrete.next() {
                Some(first) => Normalized {
                    is_optional,
                    ..normalize(first)
                },
                None => scalar(BaseType::None, ParamType::Text),
            }
        }
        Annotation::Literal(values) => match values.first() {
            Some(first) => normalize(&literal_annotation(first)),
            None => scalar(BaseType::Str, ParamType::Text),
        },
        Annotation::List(inner) => homogeneous(ContainerKind::List, inner),
        Annotation::VariadicTuple(inner) => homogeneous(ContainerKind::VariadicTuple, inner),
        Annotation::Set(inner) => homogeneous(ContainerKind::Set, inner),
        Annotation::FrozenSet(inner) => homogeneous(ContainerKind::FrozenSet, inner),
        Annotation::Tuple(items) => {
            let mut types = items.iter().map(|a| normalize(a).param_type);
            let param_type = match types.next() {
                Some(first) if types.all(|t| t == first) => first,
                _ => ParamType::Text,
            };
            Normalized {
                base: BaseType::Container(ContainerKind::Tuple(items.len())),
                is_optional: false,
                param_type,
            }
        }
        Annotation::Map(..) => scalar(BaseType::Container(ContainerKind::Map), ParamType::Text),
        Annotation::Any => scalar(BaseType::Any, ParamType::Text),
        Annotation::None => Normalized {
            is_optional: true,
            ..scalar(BaseType::None, ParamType::Text)
        },
        Annotation::Str => scalar(BaseType::Str, ParamType::Text),
        Annotation::Int => scalar(BaseType::Int, ParamType::Integer),
        Annotation::Float => scalar(BaseType::Float, ParamType::Float),
        Annotation::Bool => scalar(BaseType::Bool, ParamType::Boolean),
        Annotation::Path => scalar(BaseType::Path, ParamType::Path),
        Annotation::Uuid => scalar(BaseType::Uuid, ParamType::Uuid),
        Annotation::Date => scalar(BaseType::Date, ParamType::Date),
        Annotation::DateTime => scalar(BaseType::DateTime, ParamType::DateTime),
        Annotation::File => scalar(BaseType::File, ParamType::File),
        Annotation::Enumeration(ty) => scalar(BaseType::Enumeration(ty.clone()), ParamType::Text),
        Annotation::Structured(ty) => scalar(BaseType::Structured(*ty), ParamType::Text),
        Annotation::Context => scalar(BaseType::Context, ParamType::Text),
        Annotation::Shared(ty) => scalar(BaseType::Shared(ty.clone()), ParamType::Text),
    }
}

/// Scalar annotation matching the type of a literal value.
pub(crate) fn literal_annotation(value: &Value) -> Annotation {
    match value {
        Value::Bool(_) => Annotation::Bool,
        Value::Int(_) => Annotation::Int,
        Value::Float(_) => Annotation::Float,
        Value::Path(_) => Annotation::Path,
        Value::Uuid(_) => Annotation::Uuid,
        Value::Date(_) => Annotation::Date,
        Value::DateTime(_) => Annotation::DateTime,
        _ => Annotation::Str,
    }
}

fn scalar(base: BaseType, param_type: ParamType) -> Normalized {
    Normalized {
        base,
        is_optional: false,
        param_type,
    }
}

fn homogeneous(kind: ContainerKind, inner: &Annotation) -> Normalized {
    Normalized {
        base: BaseType::Container(kind),
        is_optional: false,
        param_type: normalize(inner).param_type,
    }
}
