//! OpenAPI Schema Transcoder
//!
//! Schema-driven conversion between JSON payloads and typed structured values,
//! plus URI template matching and expansion.
//!
//! Schemas come from the `components.schemas` table of an OpenAPI document.
//! The schema, not the value, drives both directions: objects come out in
//! declaration order, required fields are enforced, primitive defaults are
//! filled in and numeric formats decide how numbers are typed.
//!
//! # Example
//!
//! ```
//! use oas_transcode::{decode, encode, SchemaRegistry, StructuredValue, TranscodeOptions};
//! use serde_json::json;
//!
//! let document = json!({
//!     "components": {
//!         "schemas": {
//!             "Pet": {
//!                 "type": "object",
//!                 "required": ["name"],
//!                 "properties": {
//!                     "id": { "type": "integer", "format": "int64" },
//!                     "name": { "type": "string" },
//!                     "status": { "type": "string", "default": "available" }
//!                 }
//!             }
//!         }
//!     }
//! });
//!
//! let registry = SchemaRegistry::from_document(&document).unwrap();
//! let pet = registry.lookup("Pet").unwrap();
//! let options = TranscodeOptions::new();
//!
//! let value = decode(&registry, pet, &json!({ "name": "Rex", "id": 7 }), &options).unwrap();
//! assert_eq!(value.field("id"), Some(&StructuredValue::Int64(7)));
//! assert_eq!(value.field("status"), Some(&StructuredValue::from("available")));
//!
//! let json = encode(&registry, pet, &value, &options).unwrap();
//! assert_eq!(json, json!({ "id": 7, "name": "Rex", "status": "available" }));
//! ```
//!
//! # Composed Schemas
//!
//! | Keyword | Variants that must match | Fields used |
//! |---------|--------------------------|-------------|
//! | `oneOf` | exactly one | the matching variant |
//! | `anyOf` | at least one | the first matching variant |
//! | `allOf` | all | union of all variants |
//!
//! A variant matches when every field in its `required` list is present.
//!
//! # Numeric Formats
//!
//! | Type | Format | Value variant |
//! |------|--------|---------------|
//! | `integer` | (none), `int32` | `Int32` |
//! | `integer`, `number` | `int64` | `Int64` |
//! | `integer`, `number` | `float` | `Float32` |
//! | `integer`, `number` | `double` | `Float64` |
//! | `number` | (none) | `Decimal` |

mod decoder;
mod encoder;
mod error;
mod loader;
mod primitive;
mod registry;
mod schema;
mod types;
mod union;
mod uri_template;
mod value;

pub use decoder::{decode, decode_str};
pub use encoder::{encode, encode_to_string};
pub use error::{
    LoadError, ParseDecimalError, ReferenceError, SchemaError, TranscodeError, UnionError,
    UriTemplateError,
};
pub use loader::{load_json, load_json_str, navigate_fragment};
pub use primitive::NumericFormat;
pub use registry::SchemaRegistry;
pub use schema::{
    ArraySchema, ComposedKind, ComposedSchema, ObjectSchema, PrimitiveKind, PrimitiveSchema,
    SchemaNode, SchemaRef,
};
pub use types::{json_type_name, TranscodeOptions, SCHEMA_REF_PREFIX};
pub use union::{all_of, any_of, matches as variant_matches, one_of, EffectiveObject};
pub use uri_template::{ParamDefinition, UriTemplate};
pub use value::{Decimal, StructuredValue};
