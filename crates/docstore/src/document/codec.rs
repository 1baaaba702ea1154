//! Value codec.
//!
//! Maps atomic values to the representation stored in the `value` column of
//! `doc_values` together with a [`Datatype`] tag, and whole records to the
//! canonical snapshot kept in `doc_keys`.
//!
//! Changing any tag or text format here changes the persisted layout and
//! requires bumping [`FORMAT_VERSION`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

use crate::error::ValueError;
use crate::types::{Number, Record, Value};

/// Version of the path encoding and datatype tags written by this crate.
pub const FORMAT_VERSION: i32 = 1;

/// Fixed-width UTC layout used for stored dates. Lexical order is
/// chronological order.
pub const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.9fZ";

const DATE_PARSE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

/// The datatype tag stored next to every row of `doc_values`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Datatype {
    /// SQLite row identifier. Internal only, never produced for user values.
    RowId,
    /// UTF-8 text.
    Text,
    /// Number stored as text.
    Number,
    /// Date stored as fixed-width text.
    Date,
    /// Binary data.
    Blob,
    /// Marker row for a mapping; the value is the JSON array of child keys.
    Mapping,
    /// Marker row for a sequence; the value is the element count.
    Sequence,
}

impl Datatype {
    /// All tags, in declaration order.
    pub const ALL: [Datatype; 7] = [
        Datatype::RowId,
        Datatype::Text,
        Datatype::Number,
        Datatype::Date,
        Datatype::Blob,
        Datatype::Mapping,
        Datatype::Sequence,
    ];

    /// Returns the persisted tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Datatype::RowId => "ROWID",
            Datatype::Text => "TEXT",
            Datatype::Number => "NUMBER",
            Datatype::Date => "DATE",
            Datatype::Blob => "BLOB",
            Datatype::Mapping => "MAPPING",
            Datatype::Sequence => "SEQUENCE",
        }
    }

    /// Returns true for collection marker tags.
    pub fn is_marker(&self) -> bool {
        matches!(self, Datatype::Mapping | Datatype::Sequence)
    }
}

impl fmt::Display for Datatype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Datatype {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Datatype::ALL
            .iter()
            .copied()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| ValueError::Undecodable {
                datatype: "datatype tag".to_string(),
                raw: s.to_string(),
            })
    }
}

/// The physical content of the `value` column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredValue {
    /// Stored with TEXT storage class.
    Text(String),
    /// Stored with BLOB storage class.
    Blob(Vec<u8>),
}

impl StoredValue {
    /// Returns the text content, if any.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            StoredValue::Text(s) => Some(s),
            StoredValue::Blob(_) => None,
        }
    }
}

/// Encodes an atomic value.
///
/// `path` is only used for error reporting. Collections are not atomic and
/// are rejected, as are non-finite floats.
pub fn encode_scalar(value: &Value, path: &str) -> Result<(StoredValue, Datatype), ValueError> {
    match value {
        Value::Text(s) => Ok((StoredValue::Text(s.clone()), Datatype::Text)),
        Value::Number(n) => {
            if !n.is_finite() {
                return Err(ValueError::UnsupportedValueType {
                    path: path.to_string(),
                    found: format!("non-finite number {}", n),
                });
            }
            Ok((StoredValue::Text(n.to_string()), Datatype::Number))
        }
        Value::Date(d) => Ok((StoredValue::Text(format_date(d)), Datatype::Date)),
        Value::Blob(b) => Ok((StoredValue::Blob(b.clone()), Datatype::Blob)),
        Value::Sequence(_) | Value::Mapping(_) => Err(ValueError::UnsupportedValueType {
            path: path.to_string(),
            found: format!("{} where an atomic value was expected", value.type_name()),
        }),
    }
}

/// Decodes an atomic value previously produced by [`encode_scalar`].
pub fn decode_scalar(stored: StoredValue, datatype: Datatype) -> Result<Value, ValueError> {
    match (datatype, stored) {
        (Datatype::Text, StoredValue::Text(s)) => Ok(Value::Text(s)),
        (Datatype::Number, StoredValue::Text(s)) => parse_number(&s)
            .map(Value::Number)
            .ok_or(ValueError::Undecodable {
                datatype: datatype.to_string(),
                raw: s,
            }),
        (Datatype::Date, StoredValue::Text(s)) => parse_date(&s)
            .map(Value::Date)
            .ok_or(ValueError::Undecodable {
                datatype: datatype.to_string(),
                raw: s,
            }),
        (Datatype::Blob, StoredValue::Blob(b)) => Ok(Value::Blob(b)),
        // Empty blobs can come back from SQLite as empty text.
        (Datatype::Blob, StoredValue::Text(s)) if s.is_empty() => Ok(Value::Blob(Vec::new())),
        (datatype, stored) => Err(ValueError::Undecodable {
            datatype: datatype.to_string(),
            raw: match stored {
                StoredValue::Text(s) => s,
                StoredValue::Blob(b) => format!("<{} bytes>", b.len()),
            },
        }),
    }
}

/// Formats a date in the stored fixed-width layout.
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parses a stored date, also accepting RFC 3339 input.
pub fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, DATE_PARSE_FORMAT)
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|d| d.with_timezone(&Utc))
        })
}

/// Parses the textual form of a [`Number`].
///
/// Text with a fractional part or exponent is a float; anything else that
/// fits an `i64` is an integer.
pub fn parse_number(s: &str) -> Option<Number> {
    let s = s.trim();
    let looks_float = s.contains(['.', 'e', 'E']);
    if !looks_float {
        if let Ok(i) = s.parse::<i64>() {
            return Some(Number::Integer(i));
        }
    }
    s.parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .map(Number::Float)
}

/// Serializes a record into the canonical snapshot format.
pub fn to_canonical(record: &Record) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(record)
}

/// Deserializes a canonical snapshot.
pub fn from_canonical(bytes: &[u8]) -> Result<Record, serde_json::Error> {
    serde_json::from_slice(bytes)
}
