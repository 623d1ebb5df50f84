//! Fallible results: a computation that either succeeded with a value or
//! failed with an error.
//!
//! Failures are plain data here; nothing in this module raises.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::adapter::{UnionAdapter, union_adapter};
use crate::value::Value;

/// Wire tag of the success variant.
pub const SUCCESS: &str = "Success";
/// Wire tag of the failure variant.
pub const FAILURE: &str = "Failure";
/// Name the fallible adapter registers under.
pub const ADAPTER_NAME: &str = "yarut/Result";

/// Outcome of a computation that may have failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Fallible<S, F> {
    Success(S),
    Failure(F),
}

impl<S, F> Fallible<S, F> {
    /// True iff this is `Success`.
    pub fn is_ok(&self) -> bool {
        matches!(self, Fallible::Success(_))
    }

    /// True iff this is `Failure`.
    pub fn is_error(&self) -> bool {
        matches!(self, Fallible::Failure(_))
    }

    pub fn as_ref(&self) -> Fallible<&S, &F> {
        match self {
            Fallible::Success(value) => Fallible::Success(value),
            Fallible::Failure(error) => Fallible::Failure(error),
        }
    }

    /// Collect every success value, or return the first failure.
    ///
    /// Stops pulling from `items` as soon as a failure is seen; later
    /// failures are never inspected.
    pub fn all<I>(items: I) -> Fallible<Vec<S>, F>
    where
        I: IntoIterator<Item = Fallible<S, F>>,
    {
        let mut values = Vec::new();
        for item in items {
            match item {
                Fallible::Success(value) => values.push(value),
                Fallible::Failure(error) => return Fallible::Failure(error),
            }
        }
        Fallible::Success(values)
    }

    /// Collect every success value, dropping failures. Never fails.
    pub fn any<I>(items: I) -> Fallible<Vec<S>, F>
    where
        I: IntoIterator<Item = Fallible<S, F>>,
    {
        let values = items
            .into_iter()
            .filter_map(|item| match item {
                Fallible::Success(value) => Some(value),
                Fallible::Failure(_) => None,
            })
            .collect();
        Fallible::Success(values)
    }
}

impl<S, F> From<std::result::Result<S, F>> for Fallible<S, F> {
    fn from(result: std::result::Result<S, F>) -> Self {
        match result {
            Ok(value) => Fallible::Success(value),
            Err(error) => Fallible::Failure(error),
        }
    }
}

impl<S, F> From<Fallible<S, F>> for std::result::Result<S, F> {
    fn from(fallible: Fallible<S, F>) -> Self {
        match fallible {
            Fallible::Success(value) => Ok(value),
            Fallible::Failure(error) => Err(error),
        }
    }
}

impl<S, F> FromIterator<Fallible<S, F>> for Fallible<Vec<S>, F> {
    fn from_iter<I: IntoIterator<Item = Fallible<S, F>>>(iter: I) -> Self {
        Fallible::all(iter)
    }
}

impl<S: fmt::Display, F: fmt::Display> fmt::Display for Fallible<S, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fallible::Success(value) => write!(f, "{SUCCESS}({value})"),
            Fallible::Failure(error) => write!(f, "{FAILURE}({error})"),
        }
    }
}

#[derive(Serialize)]
#[serde(tag = "tag")]
enum FallibleRef<'a, S, F> {
    Success { value: &'a S },
    Failure { error: &'a F },
}

#[derive(Deserialize)]
#[serde(tag = "tag")]
enum FallibleRecord<S, F> {
    Success { value: S },
    Failure { error: F },
}

impl<S: Serialize, F: Serialize> Serialize for Fallible<S, F> {
    fn serialize<W: Serializer>(&self, serializer: W) -> std::result::Result<W::Ok, W::Error> {
        let record = match self {
            Fallible::Success(value) => FallibleRef::Success { value },
            Fallible::Failure(error) => FallibleRef::Failure { error },
        };
        record.serialize(serializer)
    }
}

impl<'de, S: Deserialize<'de>, F: Deserialize<'de>> Deserialize<'de> for Fallible<S, F> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Ok(match FallibleRecord::deserialize(deserializer)? {
            FallibleRecord::Success { value } => Fallible::Success(value),
            FallibleRecord::Failure { error } => Fallible::Failure(error),
        })
    }
}

/// True iff `value` was built from a `Fallible`.
///
/// Plain maps are never classified as results, whatever fields they carry.
pub fn is_fallible(value: &Value) -> bool {
    matches!(value, Value::Fallible(_))
}

/// Adapter teaching a [`crate::serializer::Serializer`] about fallible values.
pub fn adapter() -> UnionAdapter {
    union_adapter(ADAPTER_NAME, [SUCCESS, FAILURE], None, split, join)
}

fn split(value: &Value) -> Option<(&'static str, Option<&Value>)> {
    let Value::Fallible(fallible) = value else {
        return None;
    };
    Some(match fallible.as_ref() {
        Fallible::Success(inner) => (SUCCESS, Some(inner)),
        Fallible::Failure(inner) => (FAILURE, Some(inner)),
    })
}

fn join(tag: &str, payload: Option<Value>) -> Option<Value> {
    let fallible = match (tag, payload?) {
        (SUCCESS, inner) => Fallible::Success(inner),
        (FAILURE, inner) => Fallible::Failure(inner),
        _ => return None,
    };
    Some(Value::Fallible(Box::new(fallible)))
}
