//! Decoding: JSON + schema → structured value.
//!
//! Mirrors the encoder with source and target swapped. Records list their
//! fields in schema declaration order regardless of the JSON key order.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{ReferenceError, TranscodeError};
use crate::primitive;
use crate::registry::SchemaRegistry;
use crate::schema::{PrimitiveSchema, SchemaNode};
use crate::types::{json_type_name, Slot, TranscodeOptions};
use crate::union::{resolve_composed, EffectiveObject};
use crate::value::StructuredValue;

/// Decode a JSON document into a structured value.
///
/// # Errors
///
/// Returns `TranscodeError` on the first JSON value that does not fit the
/// schema. No partial record is produced.
pub fn decode(
    registry: &SchemaRegistry,
    schema: &SchemaNode,
    json: &Value,
    options: &TranscodeOptions,
) -> Result<StructuredValue, TranscodeError> {
    debug!(
        schema = schema.kind_name(),
        strict = options.strict,
        "decoding document"
    );

    let decoder = Decoder {
        registry,
        options: *options,
    };
    let root = Slot::root();
    decoder
        .decode_node(schema, Some(json), &root)?
        .ok_or_else(|| root.missing())
}

/// Decode JSON text into a structured value.
///
/// Number literals are kept verbatim while parsing, so large integers and
/// long decimals reach the schema formats without rounding.
pub fn decode_str(
    registry: &SchemaRegistry,
    schema: &SchemaNode,
    text: &str,
    options: &TranscodeOptions,
) -> Result<StructuredValue, TranscodeError> {
    let json: Value =
        serde_json::from_str(text).map_err(|source| TranscodeError::InvalidJson { source })?;
    decode(registry, schema, &json, options)
}

// --- Internal implementation ---

struct Decoder<'r> {
    registry: &'r SchemaRegistry,
    options: TranscodeOptions,
}

impl<'r> Decoder<'r> {
    fn decode_node(
        &self,
        node: &'r SchemaNode,
        json: Option<&Value>,
        slot: &Slot<'r>,
    ) -> Result<Option<StructuredValue>, TranscodeError> {
        let resolved = self.registry.endpoint(node)?;
        self.decode_resolved(resolved, json, slot)
    }

    fn decode_resolved(
        &self,
        node: &'r SchemaNode,
        json: Option<&Value>,
        slot: &Slot<'r>,
    ) -> Result<Option<StructuredValue>, TranscodeError> {
        let json = json.filter(|v| !v.is_null());

        match node {
            SchemaNode::Ref(reference) => Err(ReferenceError::Chained {
                key: reference.raw.clone(),
            }
            .into()),
            SchemaNode::Object(object) => {
                let Some(json) = json else {
                    return slot.absent_composite(object.default.is_some());
                };
                let map = expect_object(json, slot)?;
                let effective = EffectiveObject::from_object(object);
                self.decode_object(&effective, map, slot).map(Some)
            }
            SchemaNode::Composed(composed) => {
                let Some(json) = json else {
                    return slot.absent_composite(false);
                };
                let map = expect_object(json, slot)?;
                // Null fields count as absent when selecting a variant
                let present: HashSet<&str> = map
                    .iter()
                    .filter(|(_, v)| !v.is_null())
                    .map(|(k, _)| k.as_str())
                    .collect();
                let effective = resolve_composed(self.registry, composed, &present, &slot.path)?;
                self.decode_object(&effective, map, slot).map(Some)
            }
            SchemaNode::Array(array) => {
                let Some(json) = json else {
                    return slot.absent_composite(array.default.is_some());
                };
                let items = json
                    .as_array()
                    .ok_or_else(|| slot.mismatch("array", json_type_name(json)))?;

                let item_schema = self.registry.endpoint(&array.items)?;
                if matches!(item_schema, SchemaNode::Array(_)) {
                    return Err(TranscodeError::NestedArrayUnsupported {
                        path: slot.path.clone(),
                    });
                }

                let mut out = Vec::with_capacity(items.len());
                for (index, item) in items.iter().enumerate() {
                    if let Some(value) = self.decode_resolved(item_schema, Some(item), &slot.item(index))? {
                        out.push(value);
                    }
                }
                Ok(Some(StructuredValue::List(out)))
            }
            SchemaNode::Primitive(schema) => self.decode_primitive(schema, json, slot),
        }
    }

    fn decode_object(
        &self,
        effective: &EffectiveObject<'r>,
        map: &Map<String, Value>,
        slot: &Slot<'r>,
    ) -> Result<StructuredValue, TranscodeError> {
        if self.options.strict {
            let undefined = effective.undefined_fields(map.keys());
            if !undefined.is_empty() {
                return Err(TranscodeError::UndefinedFields {
                    path: slot.path.clone(),
                    fields: undefined,
                });
            }
        }

        let mut record = IndexMap::with_capacity(effective.properties.len());
        for (&name, &schema) in &effective.properties {
            let child = slot.property(name, effective.is_required(name));
            if let Some(value) = self.decode_node(schema, map.get(name), &child)? {
                record.insert(name.to_string(), value);
            }
        }
        Ok(StructuredValue::Record(record))
    }

    fn decode_primitive(
        &self,
        schema: &PrimitiveSchema,
        json: Option<&Value>,
        slot: &Slot<'r>,
    ) -> Result<Option<StructuredValue>, TranscodeError> {
        let source = match (json, &schema.default) {
            (Some(json), _) => json,
            (None, _) if slot.required => return Err(slot.missing()),
            (None, Some(default)) => default,
            (None, None) => return Ok(None),
        };

        let value = primitive::from_json(schema, source, slot)?;
        primitive::check_enum(schema, &primitive::to_json(schema, &value, slot)?, slot)?;
        Ok(Some(value))
    }
}

fn expect_object<'v>(
    json: &'v Value,
    slot: &Slot<'_>,
) -> Result<&'v Map<String, Value>, TranscodeError> {
    json.as_object()
        .ok_or_else(|| slot.mismatch("object", json_type_name(json)))
}
