//! Variant selection for `oneOf`, `anyOf` and `allOf` schemas.
//!
//! Selection is structural: a variant matches when every field it lists in
//! `required` is present in the value. Field value types are never inspected.
//!
//! | Keyword | Matches needed | Effective properties |
//! |---------|----------------|----------------------|
//! | `oneOf` | exactly one | the matching variant |
//! | `anyOf` | at least one | the first matching variant |
//! | `allOf` | all | union of all variants, first declaration wins |

use std::collections::{BTreeSet, HashSet};

use indexmap::IndexMap;
use tracing::debug;

use crate::error::{ReferenceError, TranscodeError, UnionError};
use crate::registry::SchemaRegistry;
use crate::schema::{ComposedKind, ComposedSchema, ObjectSchema, SchemaNode};

/// Property set an object value is checked against after composition.
#[derive(Debug, Clone, Default)]
pub struct EffectiveObject<'a> {
    pub properties: IndexMap<&'a str, &'a SchemaNode>,
    pub required: BTreeSet<&'a str>,
}

impl<'a> EffectiveObject<'a> {
    pub fn from_object(object: &'a ObjectSchema) -> Self {
        let mut effective = Self::default();
        effective.merge(object);
        effective
    }

    /// Add the properties of `object`. Names already present keep their
    /// earlier schema.
    fn merge(&mut self, object: &'a ObjectSchema) {
        for (name, schema) in &object.properties {
            self.properties.entry(name.as_str()).or_insert(schema);
        }
        self.required
            .extend(object.required.iter().map(String::as_str));
    }

    pub fn is_required(&self, name: &str) -> bool {
        self.required.contains(name)
    }

    /// Keys not declared as properties, in input order.
    pub fn undefined_fields<'k, I>(&self, keys: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'k String>,
    {
        keys.into_iter()
            .filter(|key| !self.properties.contains_key(key.as_str()))
            .cloned()
            .collect()
    }
}

/// True iff every required field of `variant` is present.
pub fn matches(variant: &ObjectSchema, present: &HashSet<&str>) -> bool {
    variant
        .required
        .iter()
        .all(|name| present.contains(name.as_str()))
}

/// Exactly one variant must match.
///
/// # Errors
///
/// Returns `UnionError::Ambiguous` with the match count when zero or more
/// than one variant matches.
pub fn one_of<'a>(
    variants: &[&'a ObjectSchema],
    present: &HashSet<&str>,
) -> Result<&'a ObjectSchema, UnionError> {
    let matched: Vec<&ObjectSchema> = variants
        .iter()
        .copied()
        .filter(|v| matches(v, present))
        .collect();

    match matched.as_slice() {
        [single] => Ok(*single),
        _ => Err(UnionError::Ambiguous {
            matches: matched.len(),
        }),
    }
}

/// At least one variant must match. Returns all matches in declaration order.
///
/// # Errors
///
/// Returns `UnionError::NoMatchingVariant` when nothing matches.
pub fn any_of<'a>(
    variants: &[&'a ObjectSchema],
    present: &HashSet<&str>,
) -> Result<Vec<&'a ObjectSchema>, UnionError> {
    let matched: Vec<&ObjectSchema> = variants
        .iter()
        .copied()
        .filter(|v| matches(v, present))
        .collect();

    if matched.is_empty() {
        Err(UnionError::NoMatchingVariant)
    } else {
        Ok(matched)
    }
}

/// Every variant must match.
///
/// # Errors
///
/// Returns `UnionError::Incomplete` when any variant does not match.
pub fn all_of<'a>(
    variants: &[&'a ObjectSchema],
    present: &HashSet<&str>,
) -> Result<Vec<&'a ObjectSchema>, UnionError> {
    let matched = variants.iter().filter(|v| matches(v, present)).count();
    if matched == variants.len() {
        Ok(variants.to_vec())
    } else {
        Err(UnionError::Incomplete {
            matched,
            total: variants.len(),
        })
    }
}

/// Resolve a composed schema against the fields present in a value.
///
/// Variants are resolved one `$ref` level deep and must be object schemas.
pub(crate) fn resolve_composed<'a>(
    registry: &'a SchemaRegistry,
    composed: &'a ComposedSchema,
    present: &HashSet<&str>,
    path: &str,
) -> Result<EffectiveObject<'a>, TranscodeError> {
    let variants = object_variants(registry, composed, path)?;

    let effective = match composed.kind {
        ComposedKind::OneOf => EffectiveObject::from_object(one_of(&variants, present)?),
        ComposedKind::AnyOf => EffectiveObject::from_object(any_of(&variants, present)?[0]),
        ComposedKind::AllOf => {
            let mut effective = EffectiveObject::default();
            for variant in all_of(&variants, present)? {
                effective.merge(variant);
            }
            effective
        }
    };

    debug!(
        keyword = composed.kind.keyword(),
        path,
        variants = variants.len(),
        properties = effective.properties.len(),
        "composed schema resolved"
    );
    Ok(effective)
}

fn object_variants<'a>(
    registry: &'a SchemaRegistry,
    composed: &'a ComposedSchema,
    path: &str,
) -> Result<Vec<&'a ObjectSchema>, TranscodeError> {
    composed
        .variants
        .iter()
        .enumerate()
        .map(|(index, variant)| -> Result<&'a ObjectSchema, TranscodeError> {
            match registry.endpoint(variant)? {
                SchemaNode::Object(object) => Ok(object),
                SchemaNode::Ref(reference) => Err(ReferenceError::Chained {
                    key: reference.raw.clone(),
                }
                .into()),
                other => Err(TranscodeError::UnsupportedVariant {
                    path: path.to_string(),
                    index,
                    actual: other.kind_name().to_string(),
                }),
            }
        })
        .collect()
}
