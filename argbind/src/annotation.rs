//! Explicit type annotations for command parameters.
//!
//! Commands declare the shape of every parameter up front instead of having
//! it discovered by reflection. An [`Annotation`] is the declared type; it can
//! carry metadata wrappers and help text through [`Annotation::Annotated`].

use crate::metadata::Metadata;
use crate::value::{Instance, Value};
use crate::{CliError, CliResult};
use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

/// Declared type of a command parameter.
#[derive(Clone, Debug)]
pub enum Annotation {
    /// Unconstrained; values pass through as text.
    Any,
    /// The none type.
    None,
    Str,
    Int,
    Float,
    Bool,
    Path,
    Uuid,
    Date,
    DateTime,
    /// A readable file handle.
    File,
    /// One of a fixed set of literal values.
    Literal(Vec<Value>),
    /// `T` or none.
    Optional(Box<Annotation>),
    /// One of several types, tried in declared order.
    Union(Vec<Annotation>),
    List(Box<Annotation>),
    /// Homogeneous tuple of any length (`T, ...`).
    VariadicTuple(Box<Annotation>),
    /// Fixed-arity tuple.
    Tuple(Vec<Annotation>),
    Set(Box<Annotation>),
    FrozenSet(Box<Annotation>),
    Map(Box<Annotation>, Box<Annotation>),
    Enumeration(EnumType),
    /// A structured Rust type materialized from JSON.
    Structured(StructType),
    /// Receives the invocation context.
    Context,
    /// Receives a shared state instance.
    Shared(SharedType),
    /// A type decorated with metadata wrappers and/or help text.
    Annotated(Box<Annotation>, Vec<Extra>),
}

/// Decoration attached to an [`Annotation::Annotated`] type.
#[derive(Clone, Debug)]
pub enum Extra {
    Meta(Metadata),
    Help(String),
}

impl Annotation {
    pub fn optional(inner: Annotation) -> Self {
        Annotation::Optional(Box::new(inner))
    }

    pub fn union(arms: impl IntoIterator<Item = Annotation>) -> Self {
        Annotation::Union(arms.into_iter().collect())
    }

    pub fn list(inner: Annotation) -> Self {
        Annotation::List(Box::new(inner))
    }

    pub fn variadic_tuple(inner: Annotation) -> Self {
        Annotation::VariadicTuple(Box::new(inner))
    }

    pub fn tuple(items: impl IntoIterator<Item = Annotation>) -> Self {
        Annotation::Tuple(items.into_iter().collect())
    }

    pub fn set(inner: Annotation) -> Self {
        Annotation::Set(Box::new(inner))
    }

    pub fn frozen_set(inner: Annotation) -> Self {
        Annotation::FrozenSet(Box::new(inner))
    }

    pub fn map(key: Annotation, value: Annotation) -> Self {
        Annotation::Map(Box::new(key), Box::new(value))
    }

    pub fn literal(values: impl IntoIterator<Item = Value>) -> Self {
        Annotation::Literal(values.into_iter().collect())
    }

    /// Enumeration annotation for a [`Choice`] type.
    pub fn enumeration<E: Choice>() -> Self {
        Annotation::Enumeration(E::enum_type())
    }

    /// Structured annotation for `T`.
    pub fn structured<T: 'static>() -> Self {
        Annotation::Structured(StructType::of::<T>())
    }

    /// Shared state constructed with `T::default()`.
    pub fn shared<T: Default + Send + Sync + 'static>() -> Self {
        Annotation::Shared(SharedType::of::<T>())
    }

    /// Attach a metadata wrapper.
    pub fn with(self, meta: impl Into<Metadata>) -> Self {
        self.extend(Extra::Meta(meta.into()))
    }

    /// Attach help text.
    pub fn with_help(self, help: impl Into<String>) -> Self {
        self.extend(Extra::Help(help.into()))
    }

    fn extend(self, extra: Extra) -> Self {
        match self {
            Annotation::Annotated(inner, mut extras) => {
                extras.push(extra);
                Annotation::Annotated(inner, extras)
            }
            other => Annotation::Annotated(Box::new(other), vec![extra]),
        }
    }

    /// The annotation without any metadata decoration.
    pub fn strip(&self) -> &Annotation {
        match self {
            Annotation::Annotated(inner, _) => inner.strip(),
            other => other,
        }
    }

    /// Whether this annotation is the none type.
    pub fn is_none_type(&self) -> bool {
        matches!(self.strip(), Annotation::None)
    }
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Annotation::Any => write!(f, "any"),
            Annotation::None => write!(f, "none"),
            Annotation::Str => write!(f, "str"),
            Annotation::Int => write!(f, "int"),
            Annotation::Float => write!(f, "float"),
            Annotation::Bool => write!(f, "bool"),
            Annotation::Path => write!(f, "path"),
            Annotation::Uuid => write!(f, "uuid"),
            Annotation::Date => write!(f, "date"),
            Annotation::DateTime => write!(f, "datetime"),
            Annotation::File => write!(f, "file"),
            Annotation::Literal(values) => {
                let values: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                write!(f, "literal[{}]", values.join(", "))
            }
            Annotation::Optional(inner) => write!(f, "optional[{inner}]"),
            Annotation::Union(arms) => {
                let arms: Vec<String> = arms.iter().map(|a| a.to_string()).collect();
                write!(f, "{}", arms.join(" | "))
            }
            Annotation::List(inner) => write!(f, "list[{inner}]"),
            Annotation::VariadicTuple(inner) => write!(f, "tuple[{inner}, ...]"),
            Annotation::Tuple(items) => {
                let items: Vec<String> = items.iter().map(|a| a.to_string()).collect();
                write!(f, "tuple[{}]", items.join(", "))
            }
            Annotation::Set(inner) => write!(f, "set[{inner}]"),
            Annotation::FrozenSet(inner) => write!(f, "frozenset[{inner}]"),
            Annotation::Map(k, v) => write!(f, "map[{k}, {v}]"),
            Annotation::Enumeration(e) => write!(f, "{}", e.name),
            Annotation::Structured(s) => write!(f, "{}", s.name),
            Annotation::Context => write!(f, "context"),
            Annotation::Shared(s) => write!(f, "{}", s.name),
            Annotation::Annotated(inner, _) => write!(f, "{inner}"),
        }
    }
}

// ============================================================================
// Enumerations
// ============================================================================

/// One member of an enumeration: its name and its command-line value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EnumMember {
    pub name: &'static str,
    pub value: &'static str,
}

impl EnumMember {
    pub const fn new(name: &'static str, value: &'static str) -> Self {
        Self { name, value }
    }
}

/// Declared members of an enumeration type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnumType {
    pub name: &'static str,
    pub members: Vec<EnumMember>,
}

impl EnumType {
    pub fn new(name: &'static str, members: Vec<EnumMember>) -> Self {
        Self { name, members }
    }

    /// Command-line values, in declaration order.
    pub fn values(&self) -> Vec<String> {
        self.members.iter().map(|m| m.value.to_string()).collect()
    }

    /// Member whose value is `value`.
    pub fn member(&self, value: &str) -> Option<EnumMember> {
        self.members.iter().copied().find(|m| m.value == value)
    }
}

/// A Rust enum usable as an enumeration parameter.
///
/// Usually derived with `#[derive(Choice)]`.
pub trait Choice: Sized + 'static {
    /// Declared members of this enum.
    fn enum_type() -> EnumType;

    /// Variant name.
    fn name(&self) -> &'static str;

    /// Command-line value of this variant.
    fn value(&self) -> &'static str;

    /// Variant whose command-line value is `value`.
    fn from_value(value: &str) -> Option<Self>;

    /// This variant as a [`Value`].
    fn member(&self) -> Value {
        Value::Member(EnumMember::new(self.name(), self.value()))
    }
}

// ============================================================================
// Structured and shared types
// ============================================================================

/// Identity of a structured Rust type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StructType {
    pub name: &'static str,
    pub id: TypeId,
}

impl StructType {
    pub fn of<T: 'static>() -> Self {
        Self {
            name: std::any::type_name::<T>(),
            id: TypeId::of::<T>(),
        }
    }
}

type Constructor = Arc<dyn Fn() -> CliResult<Instance> + Send + Sync>;

/// A shared application state type, constructed at most once per invocation.
#[derive(Clone)]
pub struct SharedType {
    pub name: &'static str,
    pub id: TypeId,
    construct: Constructor,
}

impl SharedType {
    /// State built with `T::default()`.
    pub fn of<T: Default + Send + Sync + 'static>() -> Self {
        Self {
            name: std::any::type_name::<T>(),
            id: TypeId::of::<T>(),
            construct: Arc::new(|| Ok(Instance::new(T::default()))),
        }
    }

    /// State built by a fallible constructor.
    pub fn try_with<T, E, F>(construct: F) -> Self
    where
        T: Send + Sync + 'static,
        E: fmt::Display,
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
    {
        let name = std::any::type_name::<T>();
        Self {
            name,
            id: TypeId::of::<T>(),
            construct: Arc::new(move || {
                construct().map(Instance::new).map_err(|e| {
                    CliError::user(format!("Failed to initialise state '{name}': {e}"))
                })
            }),
        }
    }

    pub(crate) fn construct(&self) -> CliResult<Instance> {
        (self.construct)()
    }
}

impl fmt::Debug for SharedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedType").field("name", &self.name).finish()
    }
}

impl Annotation {
    /// Shared state built by a fallible constructor.
    pub fn shared_with<T, E, F>(construct: F) -> Self
    where
        T: Send + Sync + 'static,
        E: fmt::Display,
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
    {
        Annotation::Shared(SharedType::try_with(construct))
    }
}
