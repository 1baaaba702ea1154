//! The closed value model for stored documents.
//!
//! Every record is a mapping from attribute names to [`Value`]s. Leaves are
//! text, numbers, dates and binary blobs; internal nodes are sequences and
//! mappings. There is no null and no boolean; JSON input carrying either is
//! rejected at conversion time.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::document::path::{parse_index, split_path};
use crate::error::ValueError;

/// A stored document: attribute name to value.
pub type Record = BTreeMap<String, Value>;

/// A numeric value, keeping integers and floats apart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Number {
    /// A signed 64-bit integer.
    Integer(i64),
    /// A 64-bit float.
    Float(f64),
}

impl Number {
    /// Returns the value as a float.
    pub fn as_f64(&self) -> f64 {
        match self {
            Number::Integer(i) => *i as f64,
            Number::Float(f) => *f,
        }
    }

    /// Returns false for NaN and infinities.
    pub fn is_finite(&self) -> bool {
        match self {
            Number::Integer(_) => true,
            Number::Float(f) => f.is_finite(),
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Integer(i) => write!(f, "{}", i),
            // Debug always prints a fractional part or exponent
            Number::Float(v) => write!(f, "{:?}", v),
        }
    }
}

/// A value inside a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Value {
    /// UTF-8 text.
    Text(String),
    /// An integer or float.
    Number(Number),
    /// A point in time.
    Date(DateTime<Utc>),
    /// Opaque binary data.
    Blob(#[serde(with = "blob_base64")] Vec<u8>),
    /// An ordered sequence of values.
    Sequence(Vec<Value>),
    /// A keyed mapping of values.
    Mapping(BTreeMap<String, Value>),
}

impl Value {
    /// Creates a blob value.
    pub fn blob(bytes: impl Into<Vec<u8>>) -> Self {
        Value::Blob(bytes.into())
    }

    /// Creates an empty mapping.
    pub fn empty_mapping() -> Self {
        Value::Mapping(BTreeMap::new())
    }

    /// Returns the lowercase name of this value's kind.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Text(_) => "text",
            Value::Number(_) => "number",
            Value::Date(_) => "date",
            Value::Blob(_) => "blob",
            Value::Sequence(_) => "sequence",
            Value::Mapping(_) => "mapping",
        }
    }

    /// Returns true for sequences and mappings.
    pub fn is_collection(&self) -> bool {
        matches!(self, Value::Sequence(_) | Value::Mapping(_))
    }

    /// Returns the text if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the number if this is a numeric value.
    pub fn as_number(&self) -> Option<Number> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the date if this is a date value.
    pub fn as_date(&self) -> Option<&DateTime<Utc>> {
        match self {
            Value::Date(d) => Some(d),
            _ => None,
        }
    }

    /// Returns the bytes if this is a blob.
    pub fn as_blob(&self) -> Option<&[u8]> {
        match self {
            Value::Blob(b) => Some(b),
            _ => None,
        }
    }

    /// Returns the elements if this is a sequence.
    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the entries if this is a mapping.
    pub fn as_mapping(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Mapping(map) => Some(map),
            _ => None,
        }
    }

    /// Looks up an escaped, dotted key path below this value.
    ///
    /// Segments follow the attribute path rules, so `a\.b` names the key
    /// `a.b`. Numeric segments index into sequences.
    pub fn lookup(&self, key_path: &str) -> Option<&Value> {
        self.lookup_segments(&split_path(key_path))
    }

    /// Looks up unescaped path segments below this value. No segments
    /// returns the value itself.
    pub fn lookup_segments<S: AsRef<str>>(&self, segments: &[S]) -> Option<&Value> {
        segments
            .iter()
            .try_fold(self, |current, segment| match current {
                Value::Mapping(map) => map.get(segment.as_ref()),
                Value::Sequence(items) => parse_index(segment.as_ref()).and_then(|i| items.get(i)),
                _ => None,
            })
    }

    /// Orders two values for sorting.
    ///
    /// Values of the same kind compare naturally (numbers numerically, dates
    /// chronologically, text and blobs lexically); different kinds order by
    /// kind so that the ordering is total.
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Number(Number::Integer(a)), Value::Number(Number::Integer(b))) => a.cmp(b),
            (Value::Number(a), Value::Number(b)) => a
                .as_f64()
                .partial_cmp(&b.as_f64())
                .unwrap_or(Ordering::Equal),
            (Value::Date(a), Value::Date(b)) => a.cmp(b),
            (Value::Blob(a), Value::Blob(b)) => a.cmp(b),
            (Value::Sequence(a), Value::Sequence(b)) => a.len().cmp(&b.len()),
            (Value::Mapping(a), Value::Mapping(b)) => a.len().cmp(&b.len()),
            _ => self.kind_rank().cmp(&other.kind_rank()),
        }
    }

    fn kind_rank(&self) -> u8 {
        match self {
            Value::Number(_) => 0,
            Value::Date(_) => 1,
            Value::Text(_) => 2,
            Value::Blob(_) => 3,
            Value::Sequence(_) => 4,
            Value::Mapping(_) => 5,
        }
    }

    /// Converts a JSON value into a document value.
    ///
    /// JSON `null` and booleans have no storable counterpart and fail with
    /// [`ValueError::UnsupportedValueType`].
    pub fn from_json(json: serde_json::Value) -> Result<Value, ValueError> {
        convert_json(json, &mut Vec::new())
    }

    /// Renders this value as plain JSON.
    ///
    /// Dates become RFC 3339 strings and blobs become base64 strings, so the
    /// result is meant for display rather than for a lossless round trip.
    pub fn to_json(&self) -> serde_json::Value {
        use base64::Engine;

        match self {
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::Number(Number::Integer(i)) => serde_json::Value::from(*i),
            Value::Number(Number::Float(f)) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Date(d) => serde_json::Value::String(d.to_rfc3339()),
            Value::Blob(b) => serde_json::Value::String(
                base64::engine::general_purpose::STANDARD.encode(b),
            ),
            Value::Sequence(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Mapping(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

/// Converts a JSON object into a record.
pub fn record_from_json(json: serde_json::Value) -> Result<Record, ValueError> {
    match Value::from_json(json)? {
        Value::Mapping(map) => Ok(map),
        other => Err(ValueError::UnsupportedValueType {
            path: String::new(),
            found: format!("{} at record root", other.type_name()),
        }),
    }
}

/// Renders a record as plain JSON.
pub fn record_to_json(record: &Record) -> serde_json::Value {
    serde_json::Value::Object(
        record
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect(),
    )
}

fn convert_json(json: serde_json::Value, path: &mut Vec<String>) -> Result<Value, ValueError> {
    let unsupported = |found: &str, path: &[String]| ValueError::UnsupportedValueType {
        path: path.join("."),
        found: found.to_string(),
    };

    match json {
        serde_json::Value::Null => Err(unsupported("null", path)),
        serde_json::Value::Bool(_) => Err(unsupported("boolean", path)),
        serde_json::Value::String(s) => Ok(Value::Text(s)),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Number(Number::Integer(i)))
            } else if let Some(f) = n.as_f64() {
                Ok(Value::Number(Number::Float(f)))
            } else {
                Err(unsupported("number", path))
            }
        }
        serde_json::Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.into_iter().enumerate() {
                path.push(i.to_string());
                out.push(convert_json(item, path)?);
                path.pop();
            }
            Ok(Value::Sequence(out))
        }
        serde_json::Value::Object(map) => {
            let mut out = BTreeMap::new();
            for (k, v) in map {
                path.push(k.clone());
                let converted = convert_json(v, path)?;
                path.pop();
                out.insert(k, converted);
            }
            Ok(Value::Mapping(out))
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{}", s),
            Value::Number(n) => write!(f, "{}", n),
            Value::Date(d) => write!(f, "{}", d.to_rfc3339()),
            Value::Blob(b) => write!(f, "<{} bytes>", b.len()),
            Value::Sequence(_) | Value::Mapping(_) => write!(f, "{}", self.to_json()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Number(Number::Integer(i))
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Number(Number::Integer(i as i64))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Number(Number::Float(f))
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        Value::Number(n)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(d: DateTime<Utc>) -> Self {
        Value::Date(d)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Sequence(items)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Value::Mapping(map)
    }
}

/// Serde module for blobs as base64 strings.
mod blob_base64 {
    use base64::{Engine, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(s).map_err(serde::de::Error::custom)
    }
}
