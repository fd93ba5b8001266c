//! Runtime values flowing between the parser, the coercion subsystem and handlers.

use crate::annotation::EnumMember;
use crate::command::InvocationContext;
use chrono::{NaiveDate, NaiveDateTime};
use std::any::Any;
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

/// Textual format used for date values.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Textual format used when rendering datetime values.
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// A dynamically typed parameter value.
#[derive(Clone, Debug)]
pub enum Value {
    /// Absent value.
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Path(PathBuf),
    Uuid(Uuid),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    /// A readable file handle (`-` is stdin).
    File(InputFile),
    /// A member of an enumeration.
    Member(EnumMember),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    /// Unordered collection without duplicates.
    Set(Vec<Value>),
    /// Unordered, immutable collection without duplicates.
    FrozenSet(Vec<Value>),
    /// Insertion ordered map; inserting an existing key replaces its value.
    Map(Vec<(Value, Value)>),
    /// An instance materialized by a molder from a JSON payload.
    Object(Instance),
    /// A shared state instance.
    State(Instance),
    /// The invocation context.
    Context(InvocationContext),
}

impl Value {
    /// Whether this is the absent value.
    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    /// String slice, if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Items of any sequence-like value.
    pub fn items(&self) -> Option<&[Value]> {
        match self {
            Value::List(items)
            | Value::Tuple(items)
            | Value::Set(items)
            | Value::FrozenSet(items) => Some(items),
            _ => None,
        }
    }

    /// Build a set, dropping duplicates while keeping first-seen order.
    pub fn set(items: impl IntoIterator<Item = Value>) -> Self {
        Value::Set(dedup(items))
    }

    /// Build a frozen set, dropping duplicates while keeping first-seen order.
    pub fn frozen_set(items: impl IntoIterator<Item = Value>) -> Self {
        Value::FrozenSet(dedup(items))
    }

    /// Build a map; later entries replace earlier ones with an equal key.
    pub fn map(entries: impl IntoIterator<Item = (Value, Value)>) -> Self {
        let mut out: Vec<(Value, Value)> = Vec::new();
        for (key, value) in entries {
            match out.iter_mut().find(|(k, _)| *k == key) {
                Some(slot) => slot.1 = value,
                None => out.push((key, value)),
            }
        }
        Value::Map(out)
    }

    /// Look up a key in a map value.
    pub fn get(&self, key: &Value) -> Option<&Value> {
        match self {
            Value::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Every element rendered back to its textual form.
    pub fn tokens(&self) -> Vec<String> {
        match self {
            Value::None => Vec::new(),
            Value::Map(entries) => entries.iter().map(|(k, v)| format!("{k}={v}")).collect(),
            other => match other.items() {
                Some(items) => items.iter().map(|v| v.to_string()).collect(),
                None => vec![other.to_string()],
            },
        }
    }

    /// Convert a decoded JSON document into a value.
    pub fn from_json(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::None,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => Value::map(
                map.into_iter()
                    .map(|(k, v)| (Value::Str(k), Value::from_json(v))),
            ),
        }
    }

    /// JSON rendering, for machine readable output.
    ///
    /// Returns `None` for opaque values (objects, state, context).
    pub fn to_json(&self) -> Option<serde_json::Value> {
        use serde_json::Value as Json;
        Some(match self {
            Value::None => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(i) => Json::from(*i),
            Value::Float(f) => Json::from(*f),
            Value::Map(entries) => {
                let mut map = serde_json::Map::new();
                for (k, v) in entries {
                    map.insert(k.to_string(), v.to_json()?);
                }
                Json::Object(map)
            }
            Value::Object(_) | Value::State(_) | Value::Context(_) => return None,
            other => match other.items() {
                Some(items) => Json::Array(
                    items
                        .iter()
                        .map(Value::to_json)
                        .collect::<Option<Vec<_>>>()?,
                ),
                None => Json::String(other.to_string()),
            },
        })
    }
}

fn dedup(items: impl IntoIterator<Item = Value>) -> Vec<Value> {
    let mut out: Vec<Value> = Vec::new();
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

fn same_members(a: &[Value], b: &[Value]) -> bool {
    a.len() == b.len() && a.iter().all(|item| b.contains(item))
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Path(a), Value::Path(b)) => a == b,
            (Value::Uuid(a), Value::Uuid(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::DateTime(a), Value::DateTime(b)) => a == b,
            (Value::File(a), Value::File(b)) => a == b,
            (Value::Member(a), Value::Member(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Tuple(a), Value::Tuple(b)) => a == b,
            (Value::Set(a), Value::Set(b)) => same_members(a, b),
            (Value::FrozenSet(a), Value::FrozenSet(b)) => same_members(a, b),
            (Value::Map(a), Value::Map(b)) => {
                a.len() == b.len() && a.iter().all(|(k, v)| other.get(k) == Some(v))
            }
            (Value::Object(a), Value::Object(b)) | (Value::State(a), Value::State(b)) => {
                a.ptr_eq(b)
            }
            (Value::Context(a), Value::Context(b)) => a == b,
            _ => false,
        }
    }
}

fn join(f: &mut fmt::Formatter<'_>, items: &[Value]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ",")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::Path(p) => write!(f, "{}", p.display()),
            Value::Uuid(u) => write!(f, "{u}"),
            Value::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
            Value::DateTime(dt) => write!(f, "{}", dt.format(DATETIME_FORMAT)),
            Value::File(file) => write!(f, "{}", file.path().display()),
            Value::Member(member) => write!(f, "{}", member.value),
            Value::List(items)
            | Value::Tuple(items)
            | Value::Set(items)
            | Value::FrozenSet(items) => join(f, items),
            Value::Map(entries) => {
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{k}={v}")?;
                }
                Ok(())
            }
            Value::Object(instance) | Value::State(instance) => {
                write!(f, "<{}>", instance.type_name())
            }
            Value::Context(ctx) => write!(f, "<context {}>", ctx.command),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<PathBuf> for Value {
    fn from(p: PathBuf) -> Self {
        Value::Path(p)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::None)
    }
}

// ============================================================================
// Opaque instances
// ============================================================================

/// A shared handle to an arbitrary Rust value (molded object or shared state).
///
/// Equality between two instances is identity.
#[derive(Clone)]
pub struct Instance {
    type_name: &'static str,
    inner: Arc<dyn Any + Send + Sync>,
}

impl Instance {
    /// Wrap a value.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            inner: Arc::new(value),
        }
    }

    /// Name of the wrapped type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Borrow the wrapped value as `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Share the wrapped value as `Arc<T>`.
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.inner.clone().downcast::<T>().ok()
    }

    /// Whether both handles point at the same instance.
    pub fn ptr_eq(&self, other: &Instance) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// A file given on the command line, opened for reading on demand.
#[derive(Clone, Debug, PartialEq)]
pub struct InputFile {
    path: PathBuf,
}

impl InputFile {
    /// Reference a file path; `-` denotes standard input.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path as given on the command line.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether this handle reads standard input.
    pub fn is_stdin(&self) -> bool {
        self.path == Path::new("-")
    }

    /// Open a reader over the file or stdin.
    pub fn open(&self) -> std::io::Result<Box<dyn Read>> {
        if self.is_stdin() {
            Ok(Box::new(std::io::stdin()))
        } else {
            Ok(Box::new(std::fs::File::open(&self.path)?))
        }
    }

    /// Read the whole content as UTF-8.
    pub fn read_to_string(&self) -> std::io::Result<String> {
        let mut content = String::new();
        self.open()?.read_to_string(&mut content)?;
        Ok(content)
    }
}

// ============================================================================
// Bound arguments
// ============================================================================

/// Final per-parameter values handed to hooks and the handler, in declaration order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BoundArgs {
    entries: Vec<(String, Value)>,
}

impl BoundArgs {
    /// Create an empty set of bound arguments.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a value, replacing any previous binding of the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Value bound to `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Whether `name` is bound.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Bound parameter names, in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    /// Iterate over `(name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Number of bound parameters.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn str(&self, name: &str) -> Option<String> {
        match self.get(name)? {
            Value::None => None,
            Value::Str(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        match self.get(name)? {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn float(&self, name: &str) -> Option<f64> {
        match self.get(name)? {
            Value::Float(x) => Some(*x),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Boolean value; anything else reads as `false`.
    pub fn flag(&self, name: &str) -> bool {
        matches!(self.get(name), Some(Value::Bool(true)))
    }

    pub fn list(&self, name: &str) -> Option<&[Value]> {
        self.get(name)?.items()
    }

    /// Borrow a molded object.
    pub fn object<T: Any>(&self, name: &str) -> Option<&T> {
        match self.get(name)? {
            Value::Object(instance) => instance.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Share a state instance.
    pub fn state<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        match self.get(name)? {
            Value::State(instance) => instance.downcast::<T>(),
            _ => None,
        }
    }

    pub fn context(&self, name: &str) -> Option<&InvocationContext> {
        match self.get(name)? {
            Value::Context(ctx) => Some(ctx),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_ignores_order_and_duplicates() {
        let a = Value::set(vec![Value::Int(1), Value::Int(2), Value::Int(1)]);
        let b = Value::set(vec![Value::Int(2), Value::Int(1)]);
        assert_eq!(a, b);
        assert_eq!(a.items().map(|i| i.len()), Some(2));
    }

    #[test]
    fn test_map_last_key_wins() {
        let map = Value::map(vec![
            (Value::from("a"), Value::Int(1)),
            (Value::from("a"), Value::Int(2)),
        ]);
        assert_eq!(map.get(&Value::from("a")), Some(&Value::Int(2)));
        assert_eq!(map.tokens(), vec!["a=2".to_string()]);
    }

    #[test]
    fn test_instance_equality_is_identity() {
        let a = Instance::new(5u8);
        let b = Instance::new(5u8);
        assert_eq!(Value::Object(a.clone()), Value::Object(a.clone()));
        assert_ne!(Value::Object(a), Value::Object(b));
    }

    #[test]
    fn test_json_round_trip_for_plain_data() {
        let json = serde_json::json!({"x": 1, "tags": ["a", "b"], "on": true});
        let value = Value::from_json(json.clone());
        assert_eq!(value.to_json(), Some(json));
    }

    #[test]
    fn test_bound_args_accessors() {
        let mut args = BoundArgs::new();
        args.insert("name", Value::from("Alice"));
        args.insert("count", Value::Int(3));
        args.insert("verbose", Value::Bool(true));
        args.insert("name", Value::from("Bob"));

        assert_eq!(args.len(), 3);
        assert_eq!(args.str("name").as_deref(), Some("Bob"));
        assert_eq!(args.int("count"), Some(3));
        assert_eq!(args.float("count"), Some(3.0));
        assert!(args.flag("verbose"));
        assert!(!args.flag("missing"));
    }

    #[test]
    fn test_input_file_reads_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.txt");
        std::fs::write(&path, "payload").unwrap();

        let file = InputFile::new(&path);
        assert!(!file.is_stdin());
        assert_eq!(file.read_to_string().unwrap(), "payload");
        assert!(InputFile::new("-").is_stdin());
    }
}
