//! Optional values: a payload that is either present or absent.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::adapter::{UnionAdapter, union_adapter};
use crate::value::Value;

/// Wire tag of the present variant.
pub const PRESENT: &str = "Present";
/// Wire tag of the absent variant.
pub const ABSENT: &str = "Absent";
/// Name the optional adapter registers under.
pub const ADAPTER_NAME: &str = "yarut/Option";

/// A value that may be absent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Optional<T> {
    Present(T),
    Absent,
}

impl<T> Optional<T> {
    /// True iff this is `Present`.
    pub fn is_present(&self) -> bool {
        matches!(self, Optional::Present(_))
    }

    /// True iff this is `Absent`.
    pub fn is_absent(&self) -> bool {
        matches!(self, Optional::Absent)
    }

    pub fn as_ref(&self) -> Optional<&T> {
        match self {
            Optional::Present(value) => Optional::Present(value),
            Optional::Absent => Optional::Absent,
        }
    }

    /// Collect every present payload; `Absent` if any item was absent.
    ///
    /// The whole input is always consumed, even after an absent item has been
    /// seen.
    pub fn all<I>(items: I) -> Optional<Vec<T>>
    where
        I: IntoIterator<Item = Optional<T>>,
    {
        let mut values = Vec::new();
        let mut saw_absent = false;
        for item in items {
            match item {
                Optional::Present(value) => values.push(value),
                Optional::Absent => saw_absent = true,
            }
        }
        if saw_absent {
            Optional::Absent
        } else {
            Optional::Present(values)
        }
    }

    /// Collect every present payload, skipping absent items.
    ///
    /// Always returns `Present`, possibly wrapping an empty vector.
    pub fn any<I>(items: I) -> Optional<Vec<T>>
    where
        I: IntoIterator<Item = Optional<T>>,
    {
        let values = items
            .into_iter()
            .filter_map(|item| match item {
                Optional::Present(value) => Some(value),
                Optional::Absent => None,
            })
            .collect();
        Optional::Present(values)
    }
}

impl<T> Default for Optional<T> {
    fn default() -> Self {
        Optional::Absent
    }
}

impl<T> From<Option<T>> for Optional<T> {
    fn from(option: Option<T>) -> Self {
        match option {
            Some(value) => Optional::Present(value),
            None => Optional::Absent,
        }
    }
}

impl<T> From<Optional<T>> for Option<T> {
    fn from(optional: Optional<T>) -> Self {
        match optional {
            Optional::Present(value) => Some(value),
            Optional::Absent => None,
        }
    }
}

impl<T> FromIterator<Optional<T>> for Optional<Vec<T>> {
    fn from_iter<I: IntoIterator<Item = Optional<T>>>(iter: I) -> Self {
        Optional::all(iter)
    }
}

impl<T: fmt::Display> fmt::Display for Optional<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Optional::Present(value) => write!(f, "{PRESENT}({value})"),
            Optional::Absent => f.write_str(ABSENT),
        }
    }
}

#[derive(Serialize)]
#[serde(tag = "tag")]
enum OptionalRef<'a, T> {
    Present { value: &'a T },
    Absent,
}

#[derive(Deserialize)]
#[serde(tag = "tag")]
enum OptionalRecord<T> {
    Present { value: T },
    Absent,
}

impl<T: Serialize> Serialize for Optional<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let record = match self {
            Optional::Present(value) => OptionalRef::Present { value },
            Optional::Absent => OptionalRef::Absent,
        };
        record.serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Optional<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Ok(match OptionalRecord::deserialize(deserializer)? {
            OptionalRecord::Present { value } => Optional::Present(value),
            OptionalRecord::Absent => Optional::Absent,
        })
    }
}

/// True iff `value` was built from an `Optional`.
pub fn is_optional(value: &Value) -> bool {
    matches!(value, Value::Optional(_))
}

/// Adapter teaching a [`crate::serializer::Serializer`] about optional values.
pub fn adapter() -> UnionAdapter {
    union_adapter(ADAPTER_NAME, [PRESENT, ABSENT], Some(ABSENT), split, join)
}

fn split(value: &Value) -> Option<(&'static str, Option<&Value>)> {
    let Value::Optional(optional) = value else {
        return None;
    };
    Some(match optional.as_ref() {
        Optional::Present(inner) => (PRESENT, Some(inner)),
        Optional::Absent => (ABSENT, None),
    })
}

fn join(tag: &str, payload: Option<Value>) -> Option<Value> {
    let optional = match (tag, payload) {
        (PRESENT, Some(inner)) => Optional::Present(inner),
        (ABSENT, _) => Optional::Absent,
        _ => return None,
    };
    Some(Value::Optional(Box::new(optional)))
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    #[test]
    fn present_exposes_value() {
        let opt = Optional::Present("Hi");
        assert!(opt.is_present());
        assert!(!opt.is_absent());
        match opt {
            Optional::Present(value) => assert_eq!(value, "Hi"),
            Optional::Absent => panic!("expected present"),
        }
    }

    #[test]
    fn absent_predicates() {
        let opt: Optional<String> = Optional::Absent;
        assert!(opt.is_absent());
        assert!(!opt.is_present());
    }

    #[test]
    fn all_of_empty_is_present_empty() {
        let out = Optional::<i64>::all(Vec::new());
        assert_eq!(out, Optional::Present(Vec::new()));
    }

    #[test]
    fn all_with_one_absent_is_absent() {
        let items = vec![Optional::Present(1), Optional::Absent, Optional::Present(2)];
        assert_eq!(Optional::all(items), Optional::Absent);
    }

    #[test]
    fn all_keeps_order() {
        let items = vec![Optional::Present("a"), Optional::Present("b")];
        assert_eq!(Optional::all(items), Optional::Present(vec!["a", "b"]));
    }

    #[test]
    fn all_scans_every_item_after_absent() {
        let seen = Cell::new(0);
        let items = vec![Optional::Absent, Optional::Present(1), Optional::Present(2)];
        let out = Optional::all(items.into_iter().inspect(|_| seen.set(seen.get() + 1)));
        assert!(out.is_absent());
        assert_eq!(seen.get(), 3);
    }

    #[test]
    fn any_skips_absent() {
        let items = vec![Optional::Absent, Optional::Present("x"), Optional::Present("y")];
        assert_eq!(Optional::any(items), Optional::Present(vec!["x", "y"]));
    }

    #[test]
    fn any_of_only_absent_is_present_empty() {
        let items: Vec<Optional<u8>> = vec![Optional::Absent, Optional::Absent];
        assert_eq!(Optional::any(items), Optional::Present(Vec::new()));
    }

    #[test]
    fn collect_matches_all() {
        let out: Optional<Vec<i32>> = vec![Optional::Present(1), Optional::Absent]
            .into_iter()
            .collect();
        assert!(out.is_absent());
    }

    #[test]
    fn std_option_conversions() {
        assert_eq!(Optional::from(Some(3)), Optional::Present(3));
        assert_eq!(Optional::<u8>::from(None), Optional::Absent);
        assert_eq!(Option::from(Optional::Present(3)), Some(3));
    }

    #[test]
    fn display_shows_variant() {
        assert_eq!(Optional::Present(7).to_string(), "Present(7)");
        assert_eq!(Optional::<u8>::Absent.to_string(), "Absent");
    }

    #[test]
    fn serde_json_shape() -> anyhow::Result<()> {
        let present = serde_json::to_value(Optional::Present(5))?;
        assert_eq!(present, serde_json::json!({"tag": "Present", "value": 5}));
        let absent = serde_json::to_value(Optional::<u8>::Absent)?;
        assert_eq!(absent, serde_json::json!({"tag": "Absent"}));
        Ok(())
    }

    #[test]
    fn serde_nested_through_cbor() -> anyhow::Result<()> {
        let nested = Optional::Present(Optional::Present("hello".to_string()));
        let bytes = serde_cbor::to_vec(&nested)?;
        let back: Optional<Optional<String>> = serde_cbor::from_slice(&bytes)?;
        assert_eq!(back, nested);
        Ok(())
    }

    #[test]
    fn is_optional_rejects_lookalike_maps() {
        let mut map = std::collections::BTreeMap::new();
        map.insert("tag".to_string(), Value::Text(PRESENT.to_string()));
        assert!(!is_optional(&Value::Map(map)));
        assert!(is_optional(&Value::from(Optional::Present(1i64))));
        assert!(!is_optional(&Value::Int(1)));
    }
}
