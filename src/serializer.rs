//! Reference structured serializer with a custom-type registry.
//!
//! A [`Value`] is encoded as a [`Document`]: a plain JSON tree plus a side
//! table of annotations keyed by node path. Annotated nodes are decoded by
//! the matching rule instead of as plain JSON, so user data never has to be
//! guessed at.

use std::collections::BTreeMap;

use anyhow::{Context, Result, anyhow, bail};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Number, Value as Json};
use tracing::{debug, trace};

use crate::adapter::{Codec, UnionAdapter, WireShape};
use crate::value::Value;
use crate::{option, result};

/// Encoded form of a value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub json: Json,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

/// Annotations for nodes that need more than plain JSON to decode.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    pub values: BTreeMap<String, Annotation>,
}

/// How an annotated node was encoded.
///
/// On the wire this is a short string array: `["custom", name]`, `["Date"]`
/// or `["number"]`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub enum Annotation {
    Custom(String),
    Date,
    Number,
}

impl TryFrom<Vec<String>> for Annotation {
    type Error = String;

    fn try_from(parts: Vec<String>) -> std::result::Result<Self, Self::Error> {
        match parts.as_slice() {
            [kind, name] if kind == "custom" => Ok(Annotation::Custom(name.clone())),
            [kind] if kind == "Date" => Ok(Annotation::Date),
            [kind] if kind == "number" => Ok(Annotation::Number),
            other => Err(format!("unknown annotation {other:?}")),
        }
    }
}

impl From<Annotation> for Vec<String> {
    fn from(annotation: Annotation) -> Self {
        match annotation {
            Annotation::Custom(name) => vec!["custom".to_string(), name],
            Annotation::Date => vec!["Date".to_string()],
            Annotation::Number => vec!["number".to_string()],
        }
    }
}

/// Structured serializer holding an ordered list of custom adapters.
#[derive(Clone, Debug, Default)]
pub struct Serializer {
    adapters: Vec<UnionAdapter>,
}

static DEFAULT: Lazy<Serializer> = Lazy::new(Serializer::with_defaults);

/// Shared serializer with the optional and fallible adapters registered.
pub fn default_serializer() -> &'static Serializer {
    &DEFAULT
}

impl Serializer {
    /// Serializer with no custom adapters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serializer with the optional and fallible adapters registered.
    pub fn with_defaults() -> Self {
        let mut serializer = Self::new();
        serializer.register(option::adapter());
        serializer.register(result::adapter());
        serializer
    }

    /// Register an adapter, replacing any adapter with the same name.
    pub fn register(&mut self, adapter: UnionAdapter) -> &mut Self {
        if let Some(slot) = self.adapters.iter_mut().find(|a| a.name() == adapter.name()) {
            debug!(adapter = adapter.name(), "replacing custom adapter");
            *slot = adapter;
        } else {
            debug!(adapter = adapter.name(), "registered custom adapter");
            self.adapters.push(adapter);
        }
        self
    }

    pub fn adapter(&self, name: &str) -> Option<&UnionAdapter> {
        self.adapters.iter().find(|a| a.name() == name)
    }

    pub fn adapters(&self) -> &[UnionAdapter] {
        &self.adapters
    }

    /// Encode a value into a document.
    pub fn serialize(&self, value: &Value) -> Result<Document> {
        let mut meta = Meta::default();
        let json = self.encode_node(value, "", &mut meta)?;
        trace!(annotations = meta.values.len(), "encoded document");
        Ok(Document {
            json,
            meta: (!meta.values.is_empty()).then_some(meta),
        })
    }

    /// Decode a document produced by [`Serializer::serialize`].
    pub fn deserialize(&self, document: &Document) -> Result<Value> {
        let empty = BTreeMap::new();
        let annotations = document.meta.as_ref().map_or(&empty, |meta| &meta.values);
        self.decode_node(&document.json, "", annotations)
    }

    pub fn to_json_pretty(&self, value: &Value) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.serialize(value)?)?)
    }

    /// Encode a value as a CBOR document.
    pub fn to_cbor(&self, value: &Value) -> Result<Vec<u8>> {
        let document = self.serialize(value)?;
        serde_cbor::to_vec(&document).context("failed to encode CBOR document")
    }

    pub fn from_cbor(&self, bytes: &[u8]) -> Result<Value> {
        let document: Document =
            serde_cbor::from_slice(bytes).context("failed to decode CBOR document")?;
        self.deserialize(&document)
    }

    fn encode_node(&self, value: &Value, path: &str, meta: &mut Meta) -> Result<Json> {
        if let Some(adapter) = self.adapters.iter().find(|a| a.is_applicable(value)) {
            trace!(adapter = adapter.name(), path, "delegating to custom adapter");
            let wire = adapter.serialize(value, self)?;
            let annotation = Annotation::Custom(adapter.name().to_string());
            meta.values.insert(path.to_string(), annotation);
            return Ok(serde_json::to_value(wire)?);
        }

        let json = match value {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(n) => Json::from(*n),
            Value::Float(x) => match Number::from_f64(*x) {
                Some(number) => Json::Number(number),
                None => {
                    meta.values.insert(path.to_string(), Annotation::Number);
                    Json::String(non_finite_name(*x).to_string())
                }
            },
            Value::Text(s) => Json::String(s.clone()),
            Value::Date(ms) => {
                meta.values.insert(path.to_string(), Annotation::Date);
                Json::from(*ms)
            }
            Value::Seq(items) => {
                let mut out = Vec::with_capacity(items.len());
                for (idx, item) in items.iter().enumerate() {
                    let child = child_path(path, &idx.to_string());
                    out.push(self.encode_node(item, &child, meta)?);
                }
                Json::Array(out)
            }
            Value::Map(entries) => {
                let mut out = JsonMap::new();
                for (key, item) in entries {
                    let child = child_path(path, key);
                    out.insert(key.clone(), self.encode_node(item, &child, meta)?);
                }
                Json::Object(out)
            }
            Value::Optional(_) | Value::Fallible(_) => {
                bail!("no adapter registered for {} value at `{path}`", value.kind())
            }
        };
        Ok(json)
    }

    fn decode_node(
        &self,
        json: &Json,
        path: &str,
        annotations: &BTreeMap<String, Annotation>,
    ) -> Result<Value> {
        match annotations.get(path) {
            Some(Annotation::Custom(name)) => {
                let adapter = self
                    .adapter(name)
                    .ok_or_else(|| anyhow!("no adapter registered under `{name}`"))?;
                let wire: WireShape = serde_json::from_value(json.clone())
                    .with_context(|| format!("malformed `{name}` wire shape at `{path}`"))?;
                trace!(adapter = name.as_str(), path, "delegating to custom adapter");
                adapter.deserialize(&wire, self)
            }
            Some(Annotation::Date) => json
                .as_i64()
                .map(Value::Date)
                .ok_or_else(|| anyhow!("date at `{path}` must be an integer, found {json}")),
            Some(Annotation::Number) => match json.as_str() {
                Some("NaN") => Ok(Value::Float(f64::NAN)),
                Some("Infinity") => Ok(Value::Float(f64::INFINITY)),
                Some("-Infinity") => Ok(Value::Float(f64::NEG_INFINITY)),
                _ => bail!("unsupported number encoding at `{path}`: {json}"),
            },
            None => self.decode_plain(json, path, annotations),
        }
    }

    fn decode_plain(
        &self,
        json: &Json,
        path: &str,
        annotations: &BTreeMap<String, Annotation>,
    ) -> Result<Value> {
        let value = match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(number) => match number.as_i64() {
                Some(n) => Value::Int(n),
                None => Value::Float(
                    number
                        .as_f64()
                        .ok_or_else(|| anyhow!("number at `{path}` out of range"))?,
                ),
            },
            Json::String(s) => Value::Text(s.clone()),
            Json::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for (idx, item) in items.iter().enumerate() {
                    let child = child_path(path, &idx.to_string());
                    out.push(self.decode_node(item, &child, annotations)?);
                }
                Value::Seq(out)
            }
            Json::Object(entries) => {
                let mut out = BTreeMap::new();
                for (key, item) in entries {
                    let child = child_path(path, key);
                    out.insert(key.clone(), self.decode_node(item, &child, annotations)?);
                }
                Value::Map(out)
            }
        };
        Ok(value)
    }
}

impl Codec for Serializer {
    fn stringify(&self, value: &Value) -> Result<String> {
        Ok(serde_json::to_string(&self.serialize(value)?)?)
    }

    fn parse(&self, text: &str) -> Result<Value> {
        let document: Document = serde_json::from_str(text).context("malformed document")?;
        self.deserialize(&document)
    }
}

fn child_path(parent: &str, segment: &str) -> String {
    let mut path = String::with_capacity(parent.len() + segment.len() + 1);
    path.push_str(parent);
    path.push('.');
    for ch in segment.chars() {
        if ch == '.' || ch == '\\' {
            path.push('\\');
        }
        path.push(ch);
    }
    path
}

fn non_finite_name(x: f64) -> &'static str {
    if x.is_nan() {
        "NaN"
    } else if x.is_sign_positive() {
        "Infinity"
    } else {
        "-Infinity"
    }
}

/// Stringify through the shared default serializer.
pub fn stringify(value: &Value) -> Result<String> {
    default_serializer().stringify(value)
}

/// Parse through the shared default serializer.
pub fn parse(text: &str) -> Result<Value> {
    default_serializer().parse(text)
}
