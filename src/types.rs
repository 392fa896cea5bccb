//! Core types shared by the encoder and decoder.

use serde_json::Value;

use crate::error::TranscodeError;

/// Prefix of `$ref` values that point into the schema component table.
pub const SCHEMA_REF_PREFIX: &str = "#/components/schemas/";

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Append a segment to a JSON Pointer (RFC 6901), escaping `~` and `/`.
pub(crate) fn child_path(path: &str, segment: &str) -> String {
    format!(
        "{}/{}",
        path,
        segment.replace('~', "~0").replace('/', "~1")
    )
}

/// Position of a value inside the tree being transcoded.
#[derive(Debug, Clone)]
pub(crate) struct Slot<'a> {
    /// Name of the enclosing property.
    pub name: &'a str,
    /// JSON Pointer to the value.
    pub path: String,
    pub required: bool,
}

impl<'a> Slot<'a> {
    /// The document root. Always required.
    pub fn root() -> Self {
        Slot {
            name: "$",
            path: String::new(),
            required: true,
        }
    }

    pub fn property(&self, name: &'a str, required: bool) -> Slot<'a> {
        Slot {
            name,
            path: child_path(&self.path, name),
            required,
        }
    }

    /// Array element. Elements keep the property name of their array.
    pub fn item(&self, index: usize) -> Slot<'a> {
        Slot {
            name: self.name,
            path: child_path(&self.path, &index.to_string()),
            required: true,
        }
    }

    pub fn missing(&self) -> TranscodeError {
        TranscodeError::MissingRequiredField {
            field: self.name.to_string(),
            path: self.path.clone(),
        }
    }

    pub fn mismatch(&self, expected: &str, actual: &str) -> TranscodeError {
        TranscodeError::TypeMismatch {
            path: self.path.clone(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Outcome for an absent object or array value: required fails, a
    /// declared default is unsupported, otherwise the field is omitted.
    pub fn absent_composite<T>(&self, has_default: bool) -> Result<Option<T>, TranscodeError> {
        if self.required {
            Err(self.missing())
        } else if has_default {
            Err(TranscodeError::UnsupportedDefault {
                field: self.name.to_string(),
                path: self.path.clone(),
            })
        } else {
            Ok(None)
        }
    }
}

/// Options for encoding and decoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TranscodeOptions {
    /// When true, fields not declared by the schema are rejected with
    /// `UndefinedFields`. When false they are dropped silently.
    pub strict: bool,
}

impl TranscodeOptions {
    /// Create options with strict mode disabled (default).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set strict mode (reject undeclared fields).
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}
