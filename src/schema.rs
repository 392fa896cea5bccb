//! Schema tree: the OpenAPI subset understood by the encoder and decoder.
//!
//! A [`SchemaNode`] is built once from an already-parsed (and validated)
//! OpenAPI schema object and is read-only afterwards.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::error::{ReferenceError, SchemaError};
use crate::types::{child_path, json_type_name, SCHEMA_REF_PREFIX};

/// One node of the schema tree.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaNode {
    Object(ObjectSchema),
    Array(ArraySchema),
    Primitive(PrimitiveSchema),
    Composed(ComposedSchema),
    Ref(SchemaRef),
}

/// `type: object` with declared properties.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectSchema {
    /// Properties in declaration order.
    pub properties: IndexMap<String, SchemaNode>,
    pub required: BTreeSet<String>,
    /// Declared default. Never applied; an absent optional object with a
    /// default is rejected.
    pub default: Option<Value>,
}

/// `type: array`.
#[derive(Debug, Clone, PartialEq)]
pub struct ArraySchema {
    pub items: Box<SchemaNode>,
    pub default: Option<Value>,
}

/// Scalar kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    String,
    Boolean,
    Integer,
    Number,
}

/// `string`, `boolean`, `integer` or `number`.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveSchema {
    pub kind: PrimitiveKind,
    pub format: Option<String>,
    /// Allowed values. Empty means unrestricted.
    pub enum_values: Vec<Value>,
    pub default: Option<Value>,
}

/// Composition keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComposedKind {
    OneOf,
    AnyOf,
    AllOf,
}

/// `oneOf`, `anyOf` or `allOf` over object variants.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedSchema {
    pub kind: ComposedKind,
    pub variants: Vec<SchemaNode>,
}

/// Unresolved `$ref`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchemaRef {
    /// The raw `$ref` string, e.g. `#/components/schemas/Pet`.
    pub raw: String,
}

impl PrimitiveKind {
    /// Parse an OpenAPI `type` keyword.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "string" => Some(PrimitiveKind::String),
            "boolean" => Some(PrimitiveKind::Boolean),
            "integer" => Some(PrimitiveKind::Integer),
            "number" => Some(PrimitiveKind::Number),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PrimitiveKind::String => "string",
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Integer => "integer",
            PrimitiveKind::Number => "number",
        }
    }
}

impl ComposedKind {
    /// Schema keyword for this composition.
    pub fn keyword(&self) -> &'static str {
        match self {
            ComposedKind::OneOf => "oneOf",
            ComposedKind::AnyOf => "anyOf",
            ComposedKind::AllOf => "allOf",
        }
    }
}

impl SchemaRef {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    /// Registry key of the referenced schema.
    ///
    /// # Errors
    ///
    /// Returns `ReferenceError::UnsupportedKind` if the reference does not
    /// point into `#/components/schemas/`.
    pub fn key(&self) -> Result<&str, ReferenceError> {
        self.raw
            .strip_prefix(SCHEMA_REF_PREFIX)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| ReferenceError::UnsupportedKind {
                raw: self.raw.clone(),
            })
    }
}

impl SchemaNode {
    /// Build a schema tree from a parsed OpenAPI schema object.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError` if the value is not a schema object of the
    /// supported subset.
    pub fn from_value(value: &Value) -> Result<Self, SchemaError> {
        parse_node(value, "")
    }

    /// Short name of the node kind for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            SchemaNode::Object(_) => "object",
            SchemaNode::Array(_) => "array",
            SchemaNode::Primitive(p) => p.kind.as_str(),
            SchemaNode::Composed(c) => c.kind.keyword(),
            SchemaNode::Ref(_) => "$ref",
        }
    }
}

// --- Internal implementation ---

fn parse_node(value: &Value, path: &str) -> Result<SchemaNode, SchemaError> {
    let Some(map) = value.as_object() else {
        return Err(SchemaError::InvalidSchema {
            path: path.to_string(),
            message: format!("expected object, got {}", json_type_name(value)),
        });
    };

    if let Some(reference) = map.get("$ref") {
        let raw = reference.as_str().ok_or_else(|| SchemaError::InvalidSchema {
            path: child_path(path, "$ref"),
            message: "expected string".to_string(),
        })?;
        return Ok(SchemaNode::Ref(SchemaRef::new(raw)));
    }

    for kind in [ComposedKind::OneOf, ComposedKind::AnyOf, ComposedKind::AllOf] {
        if let Some(variants) = map.get(kind.keyword()) {
            return parse_composed(kind, variants, &child_path(path, kind.keyword()));
        }
    }

    match map.get("type") {
        Some(Value::String(t)) if t == "object" => parse_object(map, path),
        Some(Value::String(t)) if t == "array" => parse_array(map, path),
        Some(Value::String(t)) => match PrimitiveKind::parse(t) {
            Some(kind) => parse_primitive(kind, map, path),
            None => Err(SchemaError::UnknownType {
                path: path.to_string(),
                actual: t.clone(),
            }),
        },
        // Untyped schema with properties is an object
        None if map.contains_key("properties") => parse_object(map, path),
        None => Err(SchemaError::UnknownType {
            path: path.to_string(),
            actual: "none".to_string(),
        }),
        Some(other) => Err(SchemaError::UnknownType {
            path: child_path(path, "type"),
            actual: json_type_name(other).to_string(),
        }),
    }
}

fn parse_object(map: &Map<String, Value>, path: &str) -> Result<SchemaNode, SchemaError> {
    let mut properties = IndexMap::new();
    if let Some(props) = map.get("properties") {
        let props_path = child_path(path, "properties");
        let props = props.as_object().ok_or_else(|| SchemaError::InvalidSchema {
            path: props_path.clone(),
            message: "expected object".to_string(),
        })?;
        for (name, prop) in props {
            let node = parse_node(prop, &child_path(&props_path, name))?;
            properties.insert(name.clone(), node);
        }
    }

    let required = match map.get("required") {
        None => BTreeSet::new(),
        Some(Value::Array(arr)) => arr
            .iter()
            .map(|v| {
                v.as_str()
                    .map(String::from)
                    .ok_or_else(|| SchemaError::InvalidSchema {
                        path: child_path(path, "required"),
                        message: "required array must contain strings".to_string(),
                    })
            })
            .collect::<Result<_, _>>()?,
        Some(other) => {
            return Err(SchemaError::InvalidSchema {
                path: child_path(path, "required"),
                message: format!("expected array, got {}", json_type_name(other)),
            })
        }
    };

    Ok(SchemaNode::Object(ObjectSchema {
        properties,
        required,
        default: map.get("default").cloned(),
    }))
}

fn parse_array(map: &Map<String, Value>, path: &str) -> Result<SchemaNode, SchemaError> {
    let items = map.get("items").ok_or_else(|| SchemaError::InvalidSchema {
        path: path.to_string(),
        message: "array schema without items".to_string(),
    })?;
    let items = parse_node(items, &child_path(path, "items"))?;

    Ok(SchemaNode::Array(ArraySchema {
        items: Box::new(items),
        default: map.get("default").cloned(),
    }))
}

fn parse_primitive(
    kind: PrimitiveKind,
    map: &Map<String, Value>,
    path: &str,
) -> Result<SchemaNode, SchemaError> {
    let format = match map.get("format") {
        None => None,
        Some(Value::String(f)) => Some(f.clone()),
        Some(other) => {
            return Err(SchemaError::InvalidSchema {
                path: child_path(path, "format"),
                message: format!("expected string, got {}", json_type_name(other)),
            })
        }
    };

    let enum_values = match map.get("enum") {
        None => Vec::new(),
        Some(Value::Array(values)) => values.clone(),
        Some(other) => {
            return Err(SchemaError::InvalidSchema {
                path: child_path(path, "enum"),
                message: format!("expected array, got {}", json_type_name(other)),
            })
        }
    };

    Ok(SchemaNode::Primitive(PrimitiveSchema {
        kind,
        format,
        enum_values,
        default: map.get("default").cloned(),
    }))
}

fn parse_composed(
    kind: ComposedKind,
    variants: &Value,
    path: &str,
) -> Result<SchemaNode, SchemaError> {
    let arr = variants.as_array().ok_or_else(|| SchemaError::InvalidSchema {
        path: path.to_string(),
        message: format!("expected array, got {}", json_type_name(variants)),
    })?;

    let variants = arr
        .iter()
        .enumerate()
        .map(|(i, v)| parse_node(v, &child_path(path, &i.to_string())))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(SchemaNode::Composed(ComposedSchema { kind, variants }))
}
