//! Dynamic value tree handed to the structured serializer.

use std::collections::BTreeMap;
use std::fmt;

use crate::option::Optional;
use crate::result::Fallible;

/// Arbitrary serializable data, including nested unions.
///
/// The `Optional` and `Fallible` variants mark union payloads explicitly, so a
/// `Map` that merely looks like a union is still a plain map.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// Milliseconds since the Unix epoch.
    Date(i64),
    Seq(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Optional(Box<Optional<Value>>),
    Fallible(Box<Fallible<Value, Value>>),
}

impl Value {
    /// Short name of the variant, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "i64",
            Value::Float(_) => "f64",
            Value::Text(_) => "text",
            Value::Date(_) => "date",
            Value::Seq(_) => "seq",
            Value::Map(_) => "map",
            Value::Optional(_) => "optional",
            Value::Fallible(_) => "fallible",
        }
    }

    /// Structural equality that also treats two NaN floats as equal.
    ///
    /// `PartialEq` follows IEEE semantics, so a tree holding a NaN never
    /// equals itself; round-trip checks compare with this instead.
    pub fn same_as(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Float(a), Value::Float(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::Seq(a), Value::Seq(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same_as(y))
            }
            (Value::Map(a), Value::Map(b)) => {
                a.len() == b.len()
                    && a.iter().zip(b).all(|((ka, va), (kb, vb))| ka == kb && va.same_as(vb))
            }
            (Value::Optional(a), Value::Optional(b)) => match (&**a, &**b) {
                (Optional::Present(x), Optional::Present(y)) => x.same_as(y),
                (Optional::Absent, Optional::Absent) => true,
                _ => false,
            },
            (Value::Fallible(a), Value::Fallible(b)) => match (&**a, &**b) {
                (Fallible::Success(x), Fallible::Success(y)) => x.same_as(y),
                (Fallible::Failure(x), Fallible::Failure(y)) => x.same_as(y),
                _ => false,
            },
            _ => self == other,
        }
    }

    pub fn into_optional(self) -> Option<Optional<Value>> {
        match self {
            Value::Optional(inner) => Some(*inner),
            _ => None,
        }
    }

    pub fn into_fallible(self) -> Option<Fallible<Value, Value>> {
        match self {
            Value::Fallible(inner) => Some(*inner),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Seq(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Optional<T>> for Value {
    fn from(optional: Optional<T>) -> Self {
        let inner = match optional {
            Optional::Present(value) => Optional::Present(value.into()),
            Optional::Absent => Optional::Absent,
        };
        Value::Optional(Box::new(inner))
    }
}

impl<S: Into<Value>, F: Into<Value>> From<Fallible<S, F>> for Value {
    fn from(fallible: Fallible<S, F>) -> Self {
        let inner = match fallible {
            Fallible::Success(value) => Fallible::Success(value.into()),
            Fallible::Failure(error) => Fallible::Failure(error.into()),
        };
        Value::Fallible(Box::new(inner))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x:?}"),
            Value::Text(s) => write!(f, "{s:?}"),
            Value::Date(ms) => write!(f, "date({ms})"),
            Value::Seq(items) => {
                f.write_str("[")?;
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Map(entries) => {
                f.write_str("{")?;
                for (idx, (key, item)) in entries.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key:?}: {item}")?;
                }
                f.write_str("}")
            }
            Value::Optional(inner) => write!(f, "{inner}"),
            Value::Fallible(inner) => write!(f, "{inner}"),
        }
    }
}
