//! In-memory record model consumed by the encoder and produced by the decoder.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::ParseDecimalError;

static DECIMAL_LITERAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^-?(0|[1-9][0-9]*)(\.[0-9]+)?([eE][+-]?[0-9]+)?$").expect("valid regex")
});

/// Longest run of trailing zeros an exponent may add when converting a
/// decimal to an integer. Anything longer overflows every integer type.
const MAX_INTEGRAL_PADDING: i64 = 40;

/// Arbitrary-precision decimal, stored as its JSON number literal.
///
/// The literal is kept verbatim so that values survive encode/decode without
/// passing through a floating-point representation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Decimal(String);

impl Decimal {
    /// The literal text, e.g. `"100000000000"` or `"1.25e-3"`.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Exact integer value, if the literal denotes one that fits in `i64`.
    ///
    /// Fractions and exponents are honored: `"1.5e1"` is 15, `"1.50"` is not
    /// an integer.
    pub fn to_i64(&self) -> Option<i64> {
        self.integral_text()?.parse().ok()
    }

    /// True if the literal denotes zero, whatever its sign or exponent.
    pub fn is_zero(&self) -> bool {
        self.0
            .split(|c: char| c == 'e' || c == 'E')
            .next()
            .unwrap_or("")
            .bytes()
            .all(|b| matches!(b, b'0' | b'.' | b'-'))
    }

    fn integral_text(&self) -> Option<String> {
        let (negative, unsigned) = match self.0.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, self.0.as_str()),
        };
        let (mantissa, exponent) = match unsigned.find(|c| c == 'e' || c == 'E') {
            Some(idx) => (&unsigned[..idx], unsigned[idx + 1..].parse::<i64>().ok()?),
            None => (unsigned, 0),
        };
        let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
        let digits = format!("{}{}", int_part, frac_part);
        let len = digits.len() as i64;
        let point = (int_part.len() as i64).checked_add(exponent)?;

        let (whole, fraction) = if point <= 0 {
            ("", digits.as_str())
        } else if point >= len {
            (digits.as_str(), "")
        } else {
            digits.split_at(point as usize)
        };
        if fraction.bytes().any(|b| b != b'0') {
            return None;
        }

        let whole = whole.trim_start_matches('0');
        if whole.is_empty() {
            return Some("0".to_string());
        }
        let padding = (point - len).max(0);
        if padding > MAX_INTEGRAL_PADDING {
            return None;
        }

        let mut text = String::with_capacity(whole.len() + padding as usize + 1);
        if negative {
            text.push('-');
        }
        text.push_str(whole);
        text.extend(std::iter::repeat('0').take(padding as usize));
        Some(text)
    }
}

impl FromStr for Decimal {
    type Err = ParseDecimalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if DECIMAL_LITERAL.is_match(s) {
            Ok(Decimal(s.to_string()))
        } else {
            Err(ParseDecimalError {
                literal: s.to_string(),
            })
        }
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<i32> for Decimal {
    fn from(v: i32) -> Self {
        Decimal(v.to_string())
    }
}

impl From<i64> for Decimal {
    fn from(v: i64) -> Self {
        Decimal(v.to_string())
    }
}

impl Serialize for Decimal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Decimal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let literal = match Value::deserialize(deserializer)? {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            other => {
                return Err(serde::de::Error::custom(format!(
                    "expected decimal string or number, got {}",
                    other
                )))
            }
        };
        literal.parse().map_err(serde::de::Error::custom)
    }
}

/// A structured value tree.
///
/// Serialized in externally tagged form: `{"int64": 5}`, `{"record": {...}}`,
/// `"null"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StructuredValue {
    Null,
    Str(String),
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    Decimal(Decimal),
    List(Vec<StructuredValue>),
    Record(IndexMap<String, StructuredValue>),
}

impl StructuredValue {
    /// Build a record from name/value pairs, keeping their order.
    pub fn record<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, StructuredValue)>,
        K: Into<String>,
    {
        StructuredValue::Record(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn list<I>(items: I) -> Self
    where
        I: IntoIterator<Item = StructuredValue>,
    {
        StructuredValue::List(items.into_iter().collect())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, StructuredValue::Null)
    }

    pub fn as_record(&self) -> Option<&IndexMap<String, StructuredValue>> {
        match self {
            StructuredValue::Record(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[StructuredValue]> {
        match self {
            StructuredValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            StructuredValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Field of a record, `None` for other variants.
    pub fn field(&self, name: &str) -> Option<&StructuredValue> {
        self.as_record()?.get(name)
    }

    /// Variant name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            StructuredValue::Null => "null",
            StructuredValue::Str(_) => "string",
            StructuredValue::Bool(_) => "boolean",
            StructuredValue::Int32(_) => "int32",
            StructuredValue::Int64(_) => "int64",
            StructuredValue::Float32(_) => "float32",
            StructuredValue::Float64(_) => "float64",
            StructuredValue::Decimal(_) => "decimal",
            StructuredValue::List(_) => "list",
            StructuredValue::Record(_) => "record",
        }
    }
}

impl From<&str> for StructuredValue {
    fn from(v: &str) -> Self {
        StructuredValue::Str(v.to_string())
    }
}

impl From<String> for StructuredValue {
    fn from(v: String) -> Self {
        StructuredValue::Str(v)
    }
}

impl From<bool> for StructuredValue {
    fn from(v: bool) -> Self {
        StructuredValue::Bool(v)
    }
}

impl From<i32> for StructuredValue {
    fn from(v: i32) -> Self {
        StructuredValue::Int32(v)
    }
}

impl From<i64> for StructuredValue {
    fn from(v: i64) -> Self {
        StructuredValue::Int64(v)
    }
}

impl From<f32> for StructuredValue {
    fn from(v: f32) -> Self {
        StructuredValue::Float32(v)
    }
}

impl From<f64> for StructuredValue {
    fn from(v: f64) -> Self {
        StructuredValue::Float64(v)
    }
}

impl From<Decimal> for StructuredValue {
    fn from(v: Decimal) -> Self {
        StructuredValue::Decimal(v)
    }
}

impl From<Vec<StructuredValue>> for StructuredValue {
    fn from(v: Vec<StructuredValue>) -> Self {
        StructuredValue::List(v)
    }
}
