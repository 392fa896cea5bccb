//! Named schema table and `$ref` resolution.

use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

use crate::error::{ReferenceError, SchemaError};
use crate::schema::{SchemaNode, SchemaRef};
use crate::types::json_type_name;

/// Schemas of an OpenAPI document keyed by their component name.
///
/// Built once and read-only afterwards, so a registry can be shared across
/// threads without locking.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: IndexMap<String, SchemaNode>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from the `components.schemas` table of a parsed
    /// OpenAPI document. A document without that table yields an empty registry.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError` if the table or one of its schemas is malformed.
    pub fn from_document(document: &Value) -> Result<Self, SchemaError> {
        let Some(table) = document
            .get("components")
            .and_then(|c| c.get("schemas"))
        else {
            return Ok(Self::new());
        };

        let table = table.as_object().ok_or_else(|| SchemaError::InvalidSchema {
            path: "/components/schemas".to_string(),
            message: format!("expected object, got {}", json_type_name(table)),
        })?;

        let mut registry = Self::new();
        for (name, schema) in table {
            let node = SchemaNode::from_value(schema).map_err(|e| prefix_error(e, name))?;
            registry.insert(name.clone(), node);
        }

        debug!(schemas = registry.len(), "schema registry built");
        Ok(registry)
    }

    /// Register a schema under `name`, replacing any previous entry.
    pub fn insert(&mut self, name: impl Into<String>, schema: SchemaNode) {
        self.schemas.insert(name.into(), schema);
    }

    pub fn get(&self, name: &str) -> Option<&SchemaNode> {
        self.schemas.get(name)
    }

    /// Look up a schema by component name.
    ///
    /// # Errors
    ///
    /// Returns `ReferenceError::Unresolved` if no schema has that name.
    pub fn lookup(&self, name: &str) -> Result<&SchemaNode, ReferenceError> {
        self.get(name).ok_or_else(|| ReferenceError::Unresolved {
            key: name.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Component names in document order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    /// Resolve a reference to the schema it names.
    ///
    /// # Errors
    ///
    /// Returns `ReferenceError::UnsupportedKind` for references outside
    /// `#/components/schemas/`, or `ReferenceError::Unresolved` if the key
    /// is not registered.
    pub fn resolve(&self, reference: &SchemaRef) -> Result<&SchemaNode, ReferenceError> {
        self.lookup(reference.key()?)
    }

    /// Follow at most one level of `$ref`.
    ///
    /// Non-reference nodes are returned unchanged. If the referenced schema
    /// is itself a `Ref` it is returned as-is, not resolved again.
    pub fn endpoint<'a>(&'a self, node: &'a SchemaNode) -> Result<&'a SchemaNode, ReferenceError> {
        match node {
            SchemaNode::Ref(reference) => self.resolve(reference),
            other => Ok(other),
        }
    }
}

fn prefix_error(err: SchemaError, name: &str) -> SchemaError {
    let base = format!("/components/schemas/{}", name.replace('~', "~0").replace('/', "~1"));
    match err {
        SchemaError::InvalidSchema { path, message } => SchemaError::InvalidSchema {
            path: format!("{}{}", base, path),
            message,
        },
        SchemaError::UnknownType { path, actual } => SchemaError::UnknownType {
            path: format!("{}{}", base, path),
            actual,
        },
    }
}
