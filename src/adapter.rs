//! Custom-type adapters plugged into a structured serializer.
//!
//! An adapter owns no serializer state. The serializer that calls it passes
//! itself in as a [`Codec`], which is how nested unions recurse back through
//! the same registry.

use std::fmt;

use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Recursive stringify/parse capability offered by a structured serializer.
pub trait Codec {
    fn stringify(&self, value: &Value) -> Result<String>;
    fn parse(&self, text: &str) -> Result<Value>;
}

/// Serialized form of a union value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireShape {
    pub tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
}

/// Splits a value into its variant tag and optional payload, or returns
/// `None` when the value is not of the adapter's type.
pub type Split = fn(&Value) -> Option<(&'static str, Option<&Value>)>;

/// Rebuilds a value from a known tag and decoded payload; `None` when the
/// payload does not fit the variant.
pub type Join = fn(&str, Option<Value>) -> Option<Value>;

/// Adapter for a two-variant union type.
#[derive(Clone, Copy)]
pub struct UnionAdapter {
    name: &'static str,
    tags: [&'static str; 2],
    payloadless: Option<&'static str>,
    split: Split,
    join: Join,
}

/// Build an adapter from the union's tag set, payload extractor and
/// reconstructor.
///
/// `payloadless` names the variant that never carries a payload; any payload
/// found on it is dropped without being parsed.
pub fn union_adapter(
    name: &'static str,
    tags: [&'static str; 2],
    payloadless: Option<&'static str>,
    split: Split,
    join: Join,
) -> UnionAdapter {
    UnionAdapter {
        name,
        tags,
        payloadless,
        split,
        join,
    }
}

impl UnionAdapter {
    /// Identifier the adapter is registered under.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_applicable(&self, value: &Value) -> bool {
        (self.split)(value).is_some()
    }

    /// Encode `value` into its wire shape, stringifying the payload through
    /// `codec`.
    pub fn serialize(&self, value: &Value, codec: &dyn Codec) -> Result<WireShape> {
        let (tag, payload) = (self.split)(value).ok_or_else(|| {
            anyhow!("{} adapter cannot encode a {} value", self.name, value.kind())
        })?;
        let payload = payload
            .map(|inner| codec.stringify(inner))
            .transpose()
            .with_context(|| format!("failed to encode {} payload of `{tag}`", self.name))?;
        Ok(WireShape {
            tag: tag.to_string(),
            payload,
        })
    }

    /// Rebuild a value from `wire`, parsing the payload through `codec`.
    pub fn deserialize(&self, wire: &WireShape, codec: &dyn Codec) -> Result<Value> {
        if !self.tags.contains(&wire.tag.as_str()) {
            bail!(
                "unrecognized {} tag `{}`, expected `{}` or `{}`",
                self.name,
                wire.tag,
                self.tags[0],
                self.tags[1]
            );
        }
        let payload = wire
            .payload
            .as_deref()
            .filter(|_| self.payloadless != Some(wire.tag.as_str()))
            .map(|text| codec.parse(text))
            .transpose()
            .with_context(|| format!("failed to decode {} payload of `{}`", self.name, wire.tag))?;
        (self.join)(&wire.tag, payload)
            .ok_or_else(|| anyhow!("{} tag `{}` requires a payload", self.name, wire.tag))
    }
}

impl fmt::Debug for UnionAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnionAdapter")
            .field("name", &self.name)
            .field("tags", &self.tags)
            .field("payloadless", &self.payloadless)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::option::{self, Optional};
    use crate::result::{self, Fallible};

    /// Codec rendering values with their `Display` form; enough to observe
    /// what an adapter hands to its serializer.
    struct DisplayCodec;

    impl Codec for DisplayCodec {
        fn stringify(&self, value: &Value) -> Result<String> {
            Ok(value.to_string())
        }

        fn parse(&self, text: &str) -> Result<Value> {
            Ok(Value::Text(text.to_string()))
        }
    }

    #[test]
    fn present_carries_payload() -> Result<()> {
        let adapter = option::adapter();
        let value = Value::from(Optional::Present(1i64));
        assert!(adapter.is_applicable(&value));
        let wire = adapter.serialize(&value, &DisplayCodec)?;
        assert_eq!(
            wire,
            WireShape {
                tag: "Present".into(),
                payload: Some("1".into()),
            }
        );
        Ok(())
    }

    #[test]
    fn absent_has_no_payload_field() -> Result<()> {
        let value = Value::from(Optional::<i64>::Absent);
        let wire = option::adapter().serialize(&value, &DisplayCodec)?;
        assert_eq!(serde_json::to_value(&wire)?, serde_json::json!({"tag": "Absent"}));
        Ok(())
    }

    #[test]
    fn failure_carries_error_payload() -> Result<()> {
        let value = Value::from(Fallible::<i64, &str>::Failure("bad"));
        let wire = result::adapter().serialize(&value, &DisplayCodec)?;
        assert_eq!(wire.tag, "Failure");
        assert_eq!(wire.payload.as_deref(), Some("\"bad\""));
        Ok(())
    }

    #[test]
    fn adapters_do_not_cross_apply() {
        let opt = Value::from(Optional::Present(1i64));
        let res = Value::from(Fallible::<i64, i64>::Success(1));
        assert!(!result::adapter().is_applicable(&opt));
        assert!(!option::adapter().is_applicable(&res));
        assert!(result::adapter().serialize(&opt, &DisplayCodec).is_err());
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let wire = WireShape {
            tag: "Some".into(),
            payload: Some("1".into()),
        };
        let err = option::adapter().deserialize(&wire, &DisplayCodec).unwrap_err();
        assert!(err.to_string().contains("unrecognized"));
    }

    #[test]
    fn missing_payload_is_rejected() {
        let wire = WireShape {
            tag: "Success".into(),
            payload: None,
        };
        assert!(result::adapter().deserialize(&wire, &DisplayCodec).is_err());
    }

    /// Codec that rejects every payload it is asked to parse.
    struct RejectingCodec;

    impl Codec for RejectingCodec {
        fn stringify(&self, value: &Value) -> Result<String> {
            Ok(value.to_string())
        }

        fn parse(&self, text: &str) -> Result<Value> {
            bail!("cannot parse `{text}`")
        }
    }

    #[test]
    fn absent_payload_is_never_parsed() -> Result<()> {
        let wire = WireShape {
            tag: "Absent".into(),
            payload: Some("not a document".into()),
        };
        let value = option::adapter().deserialize(&wire, &RejectingCodec)?;
        assert_eq!(value, Value::from(Optional::<i64>::Absent));
        Ok(())
    }

    #[test]
    fn unknown_tag_error_lists_expected_tags() {
        let wire = WireShape {
            tag: "Ok".into(),
            payload: Some("1".into()),
        };
        let err = result::adapter().deserialize(&wire, &DisplayCodec).unwrap_err();
        assert!(err.to_string().contains("expected `Success` or `Failure`"));
    }

    #[test]
    fn absent_ignores_stray_payload() -> Result<()> {
        let wire = WireShape {
            tag: "Absent".into(),
            payload: Some("ignored".into()),
        };
        let value = option::adapter().deserialize(&wire, &DisplayCodec)?;
        assert_eq!(value, Value::from(Optional::<i64>::Absent));
        Ok(())
    }
}
