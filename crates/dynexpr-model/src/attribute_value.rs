//! Literal operand values and their JSON wire form.
//!
//! An `AttributeValue` is a tagged union where exactly one variant is present.
//! On the wire it is a single-key object such as `{"N": "42"}`; binary payloads
//! are base64-encoded.

use std::collections::BTreeMap;
use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Type keys accepted on the wire, in declaration order.
const TYPE_KEYS: &[&str] = &["S", "N", "B", "SS", "NS", "BS", "BOOL", "NULL", "L", "M"];

/// A literal value bound to a value placeholder.
///
/// Numbers are kept string-encoded so no precision is lost between the
/// caller and the store. Maps are ordered so that two equal maps always
/// serialize to the same bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AttributeValue {
    /// String value.
    S(String),
    /// Number value (string-encoded).
    N(String),
    /// Binary value.
    B(Bytes),
    /// String set.
    Ss(Vec<String>),
    /// Number set (string-encoded).
    Ns(Vec<String>),
    /// Binary set.
    Bs(Vec<Bytes>),
    /// Boolean value.
    Bool(bool),
    /// Null marker.
    Null(bool),
    /// Ordered list.
    L(Vec<AttributeValue>),
    /// Nested document.
    M(BTreeMap<String, AttributeValue>),
}

impl AttributeValue {
    /// Build a number value from anything that prints as a number.
    #[must_use]
    pub fn number(n: impl fmt::Display) -> Self {
        Self::N(n.to_string())
    }

    /// Build a string set.
    #[must_use]
    pub fn string_set<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Ss(items.into_iter().map(Into::into).collect())
    }

    /// Build a number set.
    #[must_use]
    pub fn number_set<I, N>(items: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: fmt::Display,
    {
        Self::Ns(items.into_iter().map(|n| n.to_string()).collect())
    }

    /// Returns `true` for the set variants, the only valid DELETE operands.
    #[must_use]
    pub fn is_set(&self) -> bool {
        matches!(self, Self::Ss(_) | Self::Ns(_) | Self::Bs(_))
    }

    /// Returns the wire type key (e.g. `"S"`, `"NS"`, `"BOOL"`).
    #[must_use]
    pub fn type_descriptor(&self) -> &'static str {
        match self {
            Self::S(_) => "S",
            Self::N(_) => "N",
            Self::B(_) => "B",
            Self::Ss(_) => "SS",
            Self::Ns(_) => "NS",
            Self::Bs(_) => "BS",
            Self::Bool(_) => "BOOL",
            Self::Null(_) => "NULL",
            Self::L(_) => "L",
            Self::M(_) => "M",
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        Self::S(s.to_owned())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        Self::S(s)
    }
}

impl From<bool> for AttributeValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for AttributeValue {
    fn from(n: i64) -> Self {
        Self::number(n)
    }
}

impl From<f64> for AttributeValue {
    fn from(n: f64) -> Self {
        Self::number(n)
    }
}

impl From<Vec<AttributeValue>> for AttributeValue {
    fn from(items: Vec<AttributeValue>) -> Self {
        Self::L(items)
    }
}

impl From<Bytes> for AttributeValue {
    fn from(b: Bytes) -> Self {
        Self::B(b)
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::S(s) => write!(f, "{{S: {s}}}"),
            Self::N(n) => write!(f, "{{N: {n}}}"),
            Self::B(b) => write!(f, "{{B: {} bytes}}", b.len()),
            Self::Ss(v) => write!(f, "{{SS: {v:?}}}"),
            Self::Ns(v) => write!(f, "{{NS: {v:?}}}"),
            Self::Bs(v) => write!(f, "{{BS: {} items}}", v.len()),
            Self::Bool(b) => write!(f, "{{BOOL: {b}}}"),
            Self::Null(b) => write!(f, "{{NULL: {b}}}"),
            Self::L(v) => write!(f, "{{L: {} items}}", v.len()),
            Self::M(m) => write!(f, "{{M: {} keys}}", m.len()),
        }
    }
}

impl Serialize for AttributeValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        let key = self.type_descriptor();
        match self {
            Self::S(s) | Self::N(s) => map.serialize_entry(key, s)?,
            Self::B(b) => map.serialize_entry(key, &STANDARD.encode(b))?,
            Self::Ss(v) | Self::Ns(v) => map.serialize_entry(key, v)?,
            Self::Bs(v) => {
                let encoded: Vec<String> = v.iter().map(|b| STANDARD.encode(b)).collect();
                map.serialize_entry(key, &encoded)?;
            }
            Self::Bool(b) | Self::Null(b) => map.serialize_entry(key, b)?,
            Self::L(list) => map.serialize_entry(key, list)?,
            Self::M(m) => map.serialize_entry(key, m)?,
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for AttributeValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(AttributeValueVisitor)
    }
}

fn decode_binary<E: de::Error>(encoded: &str) -> Result<Bytes, E> {
    STANDARD
        .decode(encoded)
        .map(Bytes::from)
        .map_err(de::Error::custom)
}

struct AttributeValueVisitor;

impl<'de> Visitor<'de> for AttributeValueVisitor {
    type Value = AttributeValue;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("an attribute value object with exactly one type key")
    }

    fn visit_map<M: MapAccess<'de>>(self, mut map: M) -> Result<Self::Value, M::Error> {
        let Some(key) = map.next_key::<String>()? else {
            return Err(de::Error::custom("attribute value must have exactly one key"));
        };

        let value = match key.as_str() {
            "S" => AttributeValue::S(map.next_value()?),
            "N" => AttributeValue::N(map.next_value()?),
            "B" => AttributeValue::B(decode_binary::<M::Error>(&map.next_value::<String>()?)?),
            "SS" => AttributeValue::Ss(map.next_value()?),
            "NS" => AttributeValue::Ns(map.next_value()?),
            "BS" => {
                let encoded: Vec<String> = map.next_value()?;
                AttributeValue::Bs(
                    encoded
                        .iter()
                        .map(String::as_str)
                        .map(decode_binary::<M::Error>)
                        .collect::<Result<_, _>>()?,
                )
            }
            "BOOL" => AttributeValue::Bool(map.next_value()?),
            "NULL" => AttributeValue::Null(map.next_value()?),
            "L" => AttributeValue::L(map.next_value()?),
            "M" => AttributeValue::M(map.next_value()?),
            other => return Err(de::Error::unknown_field(other, TYPE_KEYS)),
        };

        if map.next_key::<String>()?.is_some() {
            return Err(de::Error::custom("attribute value must have exactly one key"));
        }

        Ok(value)
    }
}
