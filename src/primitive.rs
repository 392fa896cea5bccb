//! Scalar conversion between structured values and JSON.
//!
//! Numbers always travel as literal text: a value is rendered to its decimal
//! literal, parsed into the representation selected by the schema format, and
//! emitted as a JSON number carrying that exact literal. Nothing passes
//! through `f64` unless the format asks for a floating type.
//!
//! | Kind | Format | Representation |
//! |------|--------|----------------|
//! | `integer` | unset, `""`, `int32` | `Int32` |
//! | `integer`, `number` | `int64` | `Int64` |
//! | `number` | `int32` | `Int32` |
//! | `integer`, `number` | `float` | `Float32` |
//! | `integer`, `number` | `double` | `Float64` |
//! | `number` | unset, `""` | `Decimal` |

use std::str::FromStr;

use serde_json::{Number, Value};

use crate::error::TranscodeError;
use crate::schema::{PrimitiveKind, PrimitiveSchema};
use crate::types::{json_type_name, Slot};
use crate::value::{Decimal, StructuredValue};

/// Numeric representation selected by a schema format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericFormat {
    Int32,
    Int64,
    Float,
    Double,
    Decimal,
}

impl NumericFormat {
    /// Format for a numeric kind.
    ///
    /// Returns `None` for formats the kind does not support.
    pub fn select(kind: PrimitiveKind, format: Option<&str>) -> Option<Self> {
        let format = format.filter(|f| !f.is_empty());
        match (kind, format) {
            (PrimitiveKind::Integer, None | Some("int32")) => Some(NumericFormat::Int32),
            (PrimitiveKind::Integer | PrimitiveKind::Number, Some("int64")) => {
                Some(NumericFormat::Int64)
            }
            (PrimitiveKind::Number, Some("int32")) => Some(NumericFormat::Int32),
            (PrimitiveKind::Integer | PrimitiveKind::Number, Some("float")) => {
                Some(NumericFormat::Float)
            }
            (PrimitiveKind::Integer | PrimitiveKind::Number, Some("double")) => {
                Some(NumericFormat::Double)
            }
            (PrimitiveKind::Number, None) => Some(NumericFormat::Decimal),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            NumericFormat::Int32 => "int32",
            NumericFormat::Int64 => "int64",
            NumericFormat::Float => "float",
            NumericFormat::Double => "double",
            NumericFormat::Decimal => "decimal",
        }
    }

    /// Parse a JSON number literal into this representation, losslessly.
    ///
    /// Integer formats accept any literal denoting an in-range integer, so
    /// `1.0` and `15e1` pass while `1.5` does not. Floating formats round to
    /// the nearest representable value but reject literals that overflow to
    /// infinity or underflow to zero.
    pub fn parse(&self, literal: &str) -> Option<StructuredValue> {
        let decimal: Decimal = literal.parse().ok()?;
        match self {
            NumericFormat::Int32 => decimal
                .to_i64()
                .and_then(|v| i32::try_from(v).ok())
                .map(StructuredValue::Int32),
            NumericFormat::Int64 => decimal.to_i64().map(StructuredValue::Int64),
            NumericFormat::Float => literal
                .parse::<f32>()
                .ok()
                .filter(|f| f.is_finite() && (*f != 0.0 || decimal.is_zero()))
                .map(StructuredValue::Float32),
            NumericFormat::Double => literal
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite() && (*f != 0.0 || decimal.is_zero()))
                .map(StructuredValue::Float64),
            NumericFormat::Decimal => Some(StructuredValue::Decimal(decimal)),
        }
    }
}

/// Render a structured scalar as JSON according to `schema`.
pub(crate) fn to_json(
    schema: &PrimitiveSchema,
    value: &StructuredValue,
    slot: &Slot<'_>,
) -> Result<Value, TranscodeError> {
    match (schema.kind, value) {
        (PrimitiveKind::String, StructuredValue::Str(s)) => Ok(Value::String(s.clone())),
        (PrimitiveKind::Boolean, StructuredValue::Bool(b)) => Ok(Value::Bool(*b)),
        (PrimitiveKind::Integer | PrimitiveKind::Number, _) => {
            let format = numeric_format(schema, slot)?;
            let literal = numeric_literal(value).ok_or_else(|| TranscodeError::TypeMismatch {
                path: slot.path.clone(),
                expected: schema.kind.as_str().to_string(),
                actual: value.type_name().to_string(),
            })?;
            let typed = parse_literal(format, &literal, slot)?;
            json_number(&typed, format, slot)
        }
        (kind, other) => Err(TranscodeError::TypeMismatch {
            path: slot.path.clone(),
            expected: kind.as_str().to_string(),
            actual: other.type_name().to_string(),
        }),
    }
}

/// Read a JSON scalar into the representation `schema` selects.
pub(crate) fn from_json(
    schema: &PrimitiveSchema,
    json: &Value,
    slot: &Slot<'_>,
) -> Result<StructuredValue, TranscodeError> {
    match (schema.kind, json) {
        (PrimitiveKind::String, Value::String(s)) => Ok(StructuredValue::Str(s.clone())),
        (PrimitiveKind::Boolean, Value::Bool(b)) => Ok(StructuredValue::Bool(*b)),
        (PrimitiveKind::Integer | PrimitiveKind::Number, Value::Number(n)) => {
            let format = numeric_format(schema, slot)?;
            parse_literal(format, &n.to_string(), slot)
        }
        (kind, other) => Err(TranscodeError::TypeMismatch {
            path: slot.path.clone(),
            expected: kind.as_str().to_string(),
            actual: json_type_name(other).to_string(),
        }),
    }
}

/// Reject `canonical` unless it is one of the schema's enum values.
///
/// Numeric enum literals are canonicalized with the field's format before
/// comparison, so `1` and `1.0` are the same member of an integer enum.
pub(crate) fn check_enum(
    schema: &PrimitiveSchema,
    canonical: &Value,
    slot: &Slot<'_>,
) -> Result<(), TranscodeError> {
    if schema.enum_values.is_empty() {
        return Ok(());
    }

    let allowed = schema
        .enum_values
        .iter()
        .any(|candidate| canonical_enum_value(schema, candidate, slot).as_ref() == Some(canonical));

    if allowed {
        Ok(())
    } else {
        Err(TranscodeError::EnumViolation {
            field: slot.name.to_string(),
            value: canonical.to_string(),
        })
    }
}

// --- Internal implementation ---

fn numeric_format(schema: &PrimitiveSchema, slot: &Slot<'_>) -> Result<NumericFormat, TranscodeError> {
    NumericFormat::select(schema.kind, schema.format.as_deref()).ok_or_else(|| {
        TranscodeError::UnsupportedFormat {
            field: slot.name.to_string(),
            format: schema.format.clone().unwrap_or_default(),
        }
    })
}

/// Decimal literal of a numeric structured value.
fn numeric_literal(value: &StructuredValue) -> Option<String> {
    match value {
        StructuredValue::Int32(v) => Some(v.to_string()),
        StructuredValue::Int64(v) => Some(v.to_string()),
        StructuredValue::Float32(v) => Some(v.to_string()),
        StructuredValue::Float64(v) => Some(v.to_string()),
        StructuredValue::Decimal(d) => Some(d.as_str().to_string()),
        _ => None,
    }
}

fn parse_literal(
    format: NumericFormat,
    literal: &str,
    slot: &Slot<'_>,
) -> Result<StructuredValue, TranscodeError> {
    format
        .parse(literal)
        .ok_or_else(|| TranscodeError::InvalidNumber {
            path: slot.path.clone(),
            literal: literal.to_string(),
            format: format.name().to_string(),
        })
}

fn json_number(
    typed: &StructuredValue,
    format: NumericFormat,
    slot: &Slot<'_>,
) -> Result<Value, TranscodeError> {
    let literal = numeric_literal(typed).unwrap_or_default();
    Number::from_str(&literal)
        .map(Value::Number)
        .map_err(|_| TranscodeError::InvalidNumber {
            path: slot.path.clone(),
            literal,
            format: format.name().to_string(),
        })
}

fn canonical_enum_value(schema: &PrimitiveSchema, candidate: &Value, slot: &Slot<'_>) -> Option<Value> {
    match candidate {
        Value::Number(_) => {
            let typed = from_json(schema, candidate, slot).ok()?;
            to_json(schema, &typed, slot).ok()
        }
        other => Some(other.clone()),
    }
}
