//! Universal value type carried by States, Projections and parameters.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Value held by a State, produced by a Projection, or passed as a parameter.
///
/// Covers everything a loosely-typed specification can carry:
/// - Scalars: Bool, Int, Float, String
/// - Enum members (compared by enum type name)
/// - Containers: List (vectors and nested arrays), Map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Enum { type_name: String, variant: String },
    List(Vec<Value>),
    Map(IndexMap<String, Value>),
}

/// Structural class of a value, used by the compatibility checker.
///
/// `Int` and `Float` collapse into `Numeric`; enum members carry their
/// enum type so members of different enums never match.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeClass {
    Null,
    Bool,
    Numeric,
    String,
    Enum(String),
    Sequence,
    Map,
}

// ============================================================================
// Type checking
// ============================================================================

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Bool(_) => "BOOLEAN",
            Value::Int(_) => "INTEGER",
            Value::Float(_) => "FLOAT",
            Value::String(_) => "STRING",
            Value::Enum { .. } => "ENUM",
            Value::List(_) => "LIST",
            Value::Map(_) => "MAP",
        }
    }

    pub fn type_class(&self) -> TypeClass {
        match self {
            Value::Null => TypeClass::Null,
            Value::Bool(_) => TypeClass::Bool,
            Value::Int(_) | Value::Float(_) => TypeClass::Numeric,
            Value::String(_) => TypeClass::String,
            Value::Enum { type_name, .. } => TypeClass::Enum(type_name.clone()),
            Value::List(_) => TypeClass::Sequence,
            Value::Map(_) => TypeClass::Map,
        }
    }

    pub fn is_null(&self) -> bool { matches!(self, Value::Null) }
    pub fn is_numeric(&self) -> bool { matches!(self, Value::Int(_) | Value::Float(_)) }
    pub fn is_enum(&self) -> bool { matches!(self, Value::Enum { .. }) }
    pub fn is_sized(&self) -> bool { matches!(self, Value::List(_) | Value::Map(_)) }

    /// Number of elements for sized values (lists and maps).
    pub fn len(&self) -> Option<usize> {
        match self {
            Value::List(items) => Some(items.len()),
            Value::Map(entries) => Some(entries.len()),
            _ => None,
        }
    }

    /// Attempt to extract as f64
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Attempt to extract as &str
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// True when every numeric leaf is exactly zero. Non-numeric values are never zero.
    pub fn is_all_zero(&self) -> bool {
        match self {
            Value::Int(i) => *i == 0,
            Value::Float(f) => *f == 0.0,
            Value::List(items) => items.iter().all(Value::is_all_zero),
            _ => false,
        }
    }

    /// Numeric equality that ignores the Int/Float distinction.
    pub fn numeric_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.numeric_eq(y))
            }
            (a, b) if a.is_numeric() && b.is_numeric() => a.as_float() == b.as_float(),
            (a, b) => a == b,
        }
    }
}

// ============================================================================
// Elementwise numeric arithmetic
// ============================================================================

impl Value {
    /// Apply `f` to every numeric leaf. Non-numeric leaves are a type error.
    pub fn map_numeric(&self, f: &impl Fn(f64) -> f64) -> Result<Value> {
        match self {
            Value::Int(i) => Ok(Value::Float(f(*i as f64))),
            Value::Float(x) => Ok(Value::Float(f(*x))),
            Value::List(items) => items
                .iter()
                .map(|item| item.map_numeric(f))
                .collect::<Result<Vec<_>>>()
                .map(Value::List),
            other => Err(Error::TypeError {
                expected: "numeric".into(),
                got: other.type_name().into(),
            }),
        }
    }

    /// Combine two numeric values elementwise. A scalar broadcasts across a list;
    /// two lists must have the same length.
    pub fn zip_numeric(&self, other: &Value, f: &impl Fn(f64, f64) -> f64) -> Result<Value> {
        match (self, other) {
            (Value::List(a), Value::List(b)) => {
                if a.len() != b.len() {
                    return Err(Error::TypeError {
                        expected: format!("list of length {}", a.len()),
                        got: format!("list of length {}", b.len()),
                    });
                }
                a.iter()
                    .zip(b)
                    .map(|(x, y)| x.zip_numeric(y, f))
                    .collect::<Result<Vec<_>>>()
                    .map(Value::List)
            }
            (Value::List(a), scalar) if scalar.is_numeric() => a
                .iter()
                .map(|x| x.zip_numeric(scalar, f))
                .collect::<Result<Vec<_>>>()
                .map(Value::List),
            (scalar, Value::List(b)) if scalar.is_numeric() => b
                .iter()
                .map(|y| scalar.zip_numeric(y, f))
                .collect::<Result<Vec<_>>>()
                .map(Value::List),
            (a, b) => match (a.as_float(), b.as_float()) {
                (Some(x), Some(y)) => Ok(Value::Float(f(x, y))),
                _ => Err(Error::TypeError {
                    expected: "numeric".into(),
                    got: format!("{} and {}", a.type_name(), b.type_name()),
                }),
            },
        }
    }
}

// ============================================================================
// Conversions (From impls)
// ============================================================================

impl From<bool> for Value { fn from(v: bool) -> Self { Value::Bool(v) } }
impl From<i32> for Value { fn from(v: i32) -> Self { Value::Int(v as i64) } }
impl From<i64> for Value { fn from(v: i64) -> Self { Value::Int(v) } }
impl From<f64> for Value { fn from(v: f64) -> Self { Value::Float(v) } }
impl From<String> for Value { fn from(v: String) -> Self { Value::String(v) } }
impl From<&str> for Value { fn from(v: &str) -> Self { Value::String(v.to_owned()) } }
impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self { Value::List(v.into_iter().map(Into::into).collect()) }
}
impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self { v.map(Into::into).unwrap_or(Value::Null) }
}

impl From<&serde_json::Value> for Value {
    fn from(json: &serde_json::Value) -> Self {
        use serde_json::Value as Json;
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => Value::String(s.clone()),
            Json::Array(items) => Value::List(items.iter().map(Value::from).collect()),
            Json::Object(entries) => Value::Map(
                entries.iter().map(|(k, v)| (k.clone(), Value::from(v))).collect(),
            ),
        }
    }
}

// ============================================================================
// Display
// ============================================================================

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::String(s) => write!(f, "\"{}\"", s.replace('"', "\\\"")),
            Value::Enum { type_name, variant } => write!(f, "{type_name}.{variant}"),
            Value::List(l) => {
                write!(f, "[")?;
                for (i, v) in l.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
            Value::Map(m) => {
                write!(f, "{{")?;
                for (i, (k, v)) in m.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
        }
    }
}
