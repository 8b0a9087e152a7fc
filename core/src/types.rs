//! Type tags and dynamically typed configuration values.
//!
//! Variables declare their semantic type with a [`TypeTag`]. Resolution
//! produces a [`Value`], and [`TypeTag::matches`] is the single place where a
//! value is checked against a declared type (defaults, parser results and
//! derivation results all go through it).

use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use std::fmt;

/// Semantic type of a declared variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeTag {
    /// Accepts any value; raw strings are kept as they are.
    Any,
    /// Boolean, parsed against the schema's truthy set.
    Bool,
    /// Signed integer.
    Int,
    /// Floating point number.
    Float,
    /// String.
    Str,
    /// The absent value, only useful inside a union.
    None,
    /// Ordered list of items.
    List,
    /// Ordered fixed tuple of items.
    Tuple,
    /// Set of distinct items.
    Set,
    /// Mapping from string keys to values.
    Dict,
    /// One of several alternatives, tried in declared order.
    Union(Vec<TypeTag>),
}

impl TypeTag {
    /// Build a union, flattening nested unions.
    #[must_use]
    pub fn union(alternatives: impl IntoIterator<Item = TypeTag>) -> Self {
        let mut flat = Vec::new();
        for tag in alternatives {
            match tag {
                Self::Union(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        Self::Union(flat)
    }

    /// Build `Union[tag, None]`.
    #[must_use]
    pub fn optional(tag: TypeTag) -> Self {
        Self::union([tag, Self::None])
    }

    /// Whether `value` is an instance of this type.
    #[must_use]
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::Any, _)
            | (Self::Bool, Value::Bool(_))
            | (Self::Int, Value::Int(_))
            | (Self::Float, Value::Float(_))
            | (Self::Str, Value::Str(_))
            | (Self::None, Value::None)
            | (Self::List, Value::List(_))
            | (Self::Tuple, Value::Tuple(_))
            | (Self::Set, Value::Set(_))
            | (Self::Dict, Value::Dict(_)) => true,
            (Self::Union(alternatives), value) => alternatives.iter().any(|t| t.matches(value)),
            _ => false,
        }
    }

    /// Whether this type, or one of its union alternatives, is a sequence kind.
    #[must_use]
    pub fn accepts_items(&self) -> bool {
        match self {
            Self::List | Self::Tuple | Self::Set => true,
            Self::Union(alternatives) => alternatives.iter().any(Self::accepts_items),
            _ => false,
        }
    }

    /// Whether this type, or one of its union alternatives, is a mapping.
    #[must_use]
    pub fn accepts_pairs(&self) -> bool {
        match self {
            Self::Dict => true,
            Self::Union(alternatives) => alternatives.iter().any(Self::accepts_pairs),
            _ => false,
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "any"),
            Self::Bool => write!(f, "bool"),
            Self::Int => write!(f, "int"),
            Self::Float => write!(f, "float"),
            Self::Str => write!(f, "str"),
            Self::None => write!(f, "None"),
            Self::List => write!(f, "list"),
            Self::Tuple => write!(f, "tuple"),
            Self::Set => write!(f, "set"),
            Self::Dict => write!(f, "dict"),
            Self::Union(alternatives) => {
                let names: Vec<String> = alternatives.iter().map(ToString::to_string).collect();
                write!(f, "{}", names.join(" | "))
            },
        }
    }
}

/// A resolved configuration value.
#[derive(Debug, Clone)]
pub enum Value {
    /// The absent value.
    None,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Floating point value.
    Float(f64),
    /// String value.
    Str(String),
    /// List of values.
    List(Vec<Value>),
    /// Tuple of values.
    Tuple(Vec<Value>),
    /// Set of distinct values in first-seen order.
    Set(Vec<Value>),
    /// Mapping in insertion order.
    Dict(IndexMap<String, Value>),
}

impl Value {
    /// Build a set, dropping repeated items.
    #[must_use]
    pub fn set(items: impl IntoIterator<Item = Value>) -> Self {
        let mut distinct: Vec<Value> = Vec::new();
        for item in items {
            if !distinct.contains(&item) {
                distinct.push(item);
            }
        }
        Self::Set(distinct)
    }

    /// Name of the runtime kind of this value, used in error messages.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
            Self::List(_) => "list",
            Self::Tuple(_) => "tuple",
            Self::Set(_) => "set",
            Self::Dict(_) => "dict",
        }
    }

    /// Borrow the string content, if this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Items of a list, tuple or set.
    #[must_use]
    pub fn as_items(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) | Self::Tuple(items) | Self::Set(items) => Some(items),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::None, Self::None) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::List(a), Self::List(b)) | (Self::Tuple(a), Self::Tuple(b)) => a == b,
            (Self::Set(a), Self::Set(b)) => a.len() == b.len() && a.iter().all(|v| b.contains(v)),
            (Self::Dict(a), Self::Dict(b)) => a == b,
            _ => false,
        }
    }
}

/// Join displayed items with `", "`.
fn join_items(items: &[Value]) -> String {
    items.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Str(s) => write!(f, "{s}"),
            Self::List(items) => write!(f, "[{}]", join_items(items)),
            Self::Tuple(items) => write!(f, "({})", join_items(items)),
            Self::Set(items) => write!(f, "{{{}}}", join_items(items)),
            Self::Dict(map) => {
                let pairs: Vec<String> = map.iter().map(|(k, v)| format!("{k}: {v}")).collect();
                write!(f, "{{{}}}", pairs.join(", "))
            },
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::None => serializer.serialize_none(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::Float(x) => serializer.serialize_f64(*x),
            Self::Str(s) => serializer.serialize_str(s),
            Self::List(items) | Self::Tuple(items) | Self::Set(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            },
            Self::Dict(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            },
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u16> for Value {
    fn from(value: u16) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::None, Into::into)
    }
}

/// Extraction of native Rust values from a resolved [`Value`].
pub trait FromValue: Sized {
    /// Convert, or return `None` when the value has another shape.
    fn from_value(value: &Value) -> Option<Self>;
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Float(x) => Some(*x),
            _ => None,
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

/// Implement [`FromValue`] for integer types through a checked conversion.
macro_rules! from_int_value {
    ($($ty:ty),*) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: &Value) -> Option<Self> {
                    match value {
                        Value::Int(i) => <$ty>::try_from(*i).ok(),
                        _ => None,
                    }
                }
            }
        )*
    };
}

from_int_value!(i64, i32, u16, u32, u64, usize);

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_items()?.iter().map(T::from_value).collect()
    }
}

impl<T: FromValue> FromValue for IndexMap<String, T> {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Dict(entries) => entries
                .iter()
                .map(|(k, v)| T::from_value(v).map(|v| (k.clone(), v)))
                .collect(),
            _ => None,
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::None => Some(None),
            other => T::from_value(other).map(Some),
        }
    }
}
