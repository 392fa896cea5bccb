//! Error types for schema loading, transcoding and URI templates.

use std::path::PathBuf;
use thiserror::Error;

/// Errors while loading JSON documents.
#[derive(Debug, Error)]
pub enum LoadError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    #[error("fragment not found: {fragment}")]
    FragmentNotFound { fragment: String },
}

/// Errors while building a schema tree from a parsed document.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("invalid schema at {path}: {message}")]
    InvalidSchema { path: String, message: String },

    #[error("unsupported schema type at {path}: {actual}")]
    UnknownType { path: String, actual: String },
}

/// Errors resolving `$ref` indirections.
#[derive(Debug, Error)]
pub enum ReferenceError {
    #[error("unresolved reference: {key}")]
    Unresolved { key: String },

    #[error("unsupported reference kind: {raw}")]
    UnsupportedKind { raw: String },

    /// The referenced schema is itself a reference. Only one level is followed.
    #[error("reference {key} resolves to another reference")]
    Chained { key: String },
}

/// Errors selecting variants of a `oneOf`/`anyOf`/`allOf` schema.
#[derive(Debug, Error)]
pub enum UnionError {
    #[error("oneOf expects exactly one matching variant, found {matches}")]
    Ambiguous { matches: usize },

    #[error("anyOf found no matching variant")]
    NoMatchingVariant,

    #[error("allOf matched {matched} of {total} variants")]
    Incomplete { matched: usize, total: usize },
}

/// Errors during encode or decode.
#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error(transparent)]
    Reference(#[from] ReferenceError),

    #[error(transparent)]
    Union(#[from] UnionError),

    #[error("missing required field '{field}' at {path}")]
    MissingRequiredField { field: String, path: String },

    #[error("undefined fields at {path}: {}", fields.join(", "))]
    UndefinedFields { path: String, fields: Vec<String> },

    #[error("default values are not supported for object or array field '{field}' at {path}")]
    UnsupportedDefault { field: String, path: String },

    #[error("nested arrays are not supported at {path}")]
    NestedArrayUnsupported { path: String },

    #[error("unsupported format \"{format}\" for field '{field}'")]
    UnsupportedFormat { field: String, format: String },

    #[error("value {value} of field '{field}' is not one of the allowed enum values")]
    EnumViolation { field: String, value: String },

    #[error("type mismatch at {path}: expected {expected}, got {actual}")]
    TypeMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    #[error("number {literal} at {path} is not representable as {format}")]
    InvalidNumber {
        path: String,
        literal: String,
        format: String,
    },

    #[error("variant {index} of composed schema at {path} must be an object, got {actual}")]
    UnsupportedVariant {
        path: String,
        index: usize,
        actual: String,
    },

    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },
}

/// A string that is not a JSON number literal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid decimal literal: {literal}")]
pub struct ParseDecimalError {
    pub literal: String,
}

/// Errors compiling or resolving URI templates.
#[derive(Debug, Error)]
pub enum UriTemplateError {
    #[error("missing required parameter: {name}")]
    MissingRequiredParameter { name: String },

    #[error("invalid URI template {pattern}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. } | LoadError::ReadError { .. } => 3,
            _ => 2,
        }
    }
}

impl SchemaError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        2
    }
}

impl TranscodeError {
    /// Returns the exit code for this error type.
    ///
    /// Broken references and unparseable input point at the schema or the
    /// document rather than at the value being transcoded.
    pub fn exit_code(&self) -> i32 {
        match self {
            TranscodeError::Reference(_)
            | TranscodeError::UnsupportedVariant { .. }
            | TranscodeError::UnsupportedFormat { .. }
            | TranscodeError::InvalidJson { .. } => 2,
            _ => 1,
        }
    }
}

impl UriTemplateError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            UriTemplateError::MissingRequiredParameter { .. } => 1,
            UriTemplateError::InvalidPattern { .. } => 2,
        }
    }
}
