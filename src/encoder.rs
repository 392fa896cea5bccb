//! Encoding: structured value + schema → JSON.
//!
//! The schema drives the walk. Output objects list their keys in schema
//! declaration order; fields the schema does not declare are dropped, or
//! rejected in strict mode.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{ReferenceError, TranscodeError};
use crate::primitive;
use crate::registry::SchemaRegistry;
use crate::schema::{PrimitiveSchema, SchemaNode};
use crate::types::{Slot, TranscodeOptions};
use crate::union::{resolve_composed, EffectiveObject};
use crate::value::StructuredValue;

/// Encode a structured value as JSON.
///
/// # Errors
///
/// Returns `TranscodeError` on the first value that does not fit the schema.
/// No partial document is produced.
pub fn encode(
    registry: &SchemaRegistry,
    schema: &SchemaNode,
    value: &StructuredValue,
    options: &TranscodeOptions,
) -> Result<Value, TranscodeError> {
    debug!(
        schema = schema.kind_name(),
        strict = options.strict,
        "encoding value"
    );

    let encoder = Encoder {
        registry,
        options: *options,
    };
    let root = Slot::root();
    encoder
        .encode_node(schema, Some(value), &root)?
        .ok_or_else(|| root.missing())
}

/// Encode a structured value as JSON text.
pub fn encode_to_string(
    registry: &SchemaRegistry,
    schema: &SchemaNode,
    value: &StructuredValue,
    options: &TranscodeOptions,
    pretty: bool,
) -> Result<String, TranscodeError> {
    let json = encode(registry, schema, value, options)?;
    if pretty {
        serde_json::to_string_pretty(&json)
    } else {
        serde_json::to_string(&json)
    }
    .map_err(|source| TranscodeError::InvalidJson { source })
}

// --- Internal implementation ---

struct Encoder<'r> {
    registry: &'r SchemaRegistry,
    options: TranscodeOptions,
}

impl<'r> Encoder<'r> {
    /// Encode `value` (absent when `None`) against `node`, following one `$ref`.
    ///
    /// Returns `Ok(None)` when the field is omitted from the output.
    fn encode_node(
        &self,
        node: &'r SchemaNode,
        value: Option<&StructuredValue>,
        slot: &Slot<'r>,
    ) -> Result<Option<Value>, TranscodeError> {
        let resolved = self.registry.endpoint(node)?;
        self.encode_resolved(resolved, value, slot)
    }

    fn encode_resolved(
        &self,
        node: &'r SchemaNode,
        value: Option<&StructuredValue>,
        slot: &Slot<'r>,
    ) -> Result<Option<Value>, TranscodeError> {
        let value = value.filter(|v| !v.is_null());

        match node {
            SchemaNode::Ref(reference) => Err(ReferenceError::Chained {
                key: reference.raw.clone(),
            }
            .into()),
            SchemaNode::Object(object) => {
                let Some(value) = value else {
                    return slot.absent_composite(object.default.is_some());
                };
                let record = expect_record(value, slot)?;
                let effective = EffectiveObject::from_object(object);
                self.encode_object(&effective, record, slot).map(Some)
            }
            SchemaNode::Composed(composed) => {
                let Some(value) = value else {
                    return slot.absent_composite(false);
                };
                let record = expect_record(value, slot)?;
                // Null fields count as absent when selecting a variant
                let present: HashSet<&str> = record
                    .iter()
                    .filter(|(_, v)| !v.is_null())
                    .map(|(k, _)| k.as_str())
                    .collect();
                let effective = resolve_composed(self.registry, composed, &present, &slot.path)?;
                self.encode_object(&effective, record, slot).map(Some)
            }
            SchemaNode::Array(array) => {
                let Some(value) = value else {
                    return slot.absent_composite(array.default.is_some());
                };
                let items = value
                    .as_list()
                    .ok_or_else(|| slot.mismatch("list", value.type_name()))?;

                let item_schema = self.registry.endpoint(&array.items)?;
                if matches!(item_schema, SchemaNode::Array(_)) {
                    return Err(TranscodeError::NestedArrayUnsupported {
                        path: slot.path.clone(),
                    });
                }

                let mut out = Vec::with_capacity(items.len());
                for (index, item) in items.iter().enumerate() {
                    if let Some(json) = self.encode_resolved(item_schema, Some(item), &slot.item(index))? {
                        out.push(json);
                    }
                }
                Ok(Some(Value::Array(out)))
            }
            SchemaNode::Primitive(schema) => self.encode_primitive(schema, value, slot),
        }
    }

    fn encode_object(
        &self,
        effective: &EffectiveObject<'r>,
        record: &IndexMap<String, StructuredValue>,
        slot: &Slot<'r>,
    ) -> Result<Value, TranscodeError> {
        if self.options.strict {
            let undefined = effective.undefined_fields(record.keys());
            if !undefined.is_empty() {
                return Err(TranscodeError::UndefinedFields {
                    path: slot.path.clone(),
                    fields: undefined,
                });
            }
        }

        let mut out = Map::new();
        for (&name, &schema) in &effective.properties {
            let child = slot.property(name, effective.is_required(name));
            if let Some(json) = self.encode_node(schema, record.get(name), &child)? {
                out.insert(name.to_string(), json);
            }
        }
        Ok(Value::Object(out))
    }

    fn encode_primitive(
        &self,
        schema: &PrimitiveSchema,
        value: Option<&StructuredValue>,
        slot: &Slot<'r>,
    ) -> Result<Option<Value>, TranscodeError> {
        let json = match (value, &schema.default) {
            (Some(value), _) => primitive::to_json(schema, value, slot)?,
            (None, _) if slot.required => return Err(slot.missing()),
            (None, Some(default)) => {
                let typed = primitive::from_json(schema, default, slot)?;
                primitive::to_json(schema, &typed, slot)?
            }
            (None, None) => return Ok(None),
        };

        primitive::check_enum(schema, &json, slot)?;
        Ok(Some(json))
    }
}

fn expect_record<'v>(
    value: &'v StructuredValue,
    slot: &Slot<'_>,
) -> Result<&'v IndexMap<String, StructuredValue>, TranscodeError> {
    value
        .as_record()
        .ok_or_else(|| slot.mismatch("record", value.type_name()))
}
