//! Integration tests for schema-driven encoding and decoding.

use oas_transcode::{
    decode, decode_str, encode, encode_to_string, Decimal, ReferenceError, SchemaNode,
    SchemaRegistry, StructuredValue, TranscodeError, TranscodeOptions, UnionError,
};
use serde_json::{json, Value};

fn schema(value: Value) -> SchemaNode {
    SchemaNode::from_value(&value).unwrap()
}

fn registry(document: Value) -> SchemaRegistry {
    SchemaRegistry::from_document(&document).unwrap()
}

fn lenient() -> TranscodeOptions {
    TranscodeOptions::new()
}

fn strict() -> TranscodeOptions {
    TranscodeOptions::new().strict(true)
}

fn petstore() -> SchemaRegistry {
    registry(json!({
        "openapi": "3.0.3",
        "components": {
            "schemas": {
                "Category": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "integer", "format": "int64" },
                        "name": { "type": "string" }
                    }
                },
                "Pet": {
                    "type": "object",
                    "required": ["name", "photoUrls"],
                    "properties": {
                        "id": { "type": "integer", "format": "int64" },
                        "name": { "type": "string" },
                        "category": { "$ref": "#/components/schemas/Category" },
                        "photoUrls": { "type": "array", "items": { "type": "string" } },
                        "status": {
                            "type": "string",
                            "enum": ["available", "pending", "sold"]
                        },
                        "weight": { "type": "number", "format": "double" },
                        "vaccinated": { "type": "boolean" }
                    }
                }
            }
        }
    }))
}

// === Round Trip Tests ===

mod round_trip {
    use super::*;

    #[test]
    fn pet_survives_encode_then_decode() {
        let registry = petstore();
        let pet = registry.lookup("Pet").unwrap();

        let value = StructuredValue::record([
            ("id", StructuredValue::Int64(10)),
            ("name", StructuredValue::from("doggie")),
            (
                "category",
                StructuredValue::record([
                    ("id", StructuredValue::Int64(1)),
                    ("name", StructuredValue::from("Dogs")),
                ]),
            ),
            ("photoUrls", StructuredValue::list([StructuredValue::from("a.png")])),
            ("status", StructuredValue::from("available")),
            ("weight", StructuredValue::Float64(12.5)),
            ("vaccinated", StructuredValue::Bool(true)),
        ]);

        let json = encode(&registry, pet, &value, &lenient()).unwrap();
        let back = decode(&registry, pet, &json, &lenient()).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn optional_absent_fields_stay_absent() {
        let registry = petstore();
        let pet = registry.lookup("Pet").unwrap();

        let value = StructuredValue::record([
            ("name", StructuredValue::from("doggie")),
            ("photoUrls", StructuredValue::list(Vec::<StructuredValue>::new())),
        ]);

        let json = encode(&registry, pet, &value, &lenient()).unwrap();
        assert_eq!(json, json!({ "name": "doggie", "photoUrls": [] }));

        let back = decode(&registry, pet, &json, &lenient()).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn output_follows_declaration_order() {
        let registry = petstore();
        let pet = registry.lookup("Pet").unwrap();

        let value = StructuredValue::record([
            ("vaccinated", StructuredValue::Bool(false)),
            ("photoUrls", StructuredValue::list(Vec::<StructuredValue>::new())),
            ("name", StructuredValue::from("doggie")),
            ("id", StructuredValue::Int64(3)),
        ]);

        let text = encode_to_string(&registry, pet, &value, &lenient(), false).unwrap();
        assert_eq!(
            text,
            r#"{"id":3,"name":"doggie","photoUrls":[],"vaccinated":false}"#
        );
    }

    #[test]
    fn pretty_output_is_indented() {
        let registry = petstore();
        let category = registry.lookup("Category").unwrap();
        let value = StructuredValue::record([("name", StructuredValue::from("Cats"))]);

        let text = encode_to_string(&registry, category, &value, &lenient(), true).unwrap();
        assert!(text.contains("{\n"));
    }
}

// === Precision Tests ===

mod precision {
    use super::*;

    #[test]
    fn int64_literal_is_exact() {
        let schema = schema(json!({ "type": "integer", "format": "int64" }));
        let registry = SchemaRegistry::new();

        let decoded = decode_str(&registry, &schema, "100000000000", &lenient()).unwrap();
        assert_eq!(decoded, StructuredValue::Int64(100_000_000_000));

        let text = encode_to_string(&registry, &schema, &decoded, &lenient(), false).unwrap();
        assert_eq!(text, "100000000000");
    }

    #[test]
    fn unformatted_number_keeps_long_decimal() {
        let schema = schema(json!({ "type": "number" }));
        let registry = SchemaRegistry::new();
        let literal = "12345678901234567890.000000000000000001";

        let decoded = decode_str(&registry, &schema, literal, &lenient()).unwrap();
        assert_eq!(decoded, StructuredValue::Decimal(literal.parse().unwrap()));

        let text = encode_to_string(&registry, &schema, &decoded, &lenient(), false).unwrap();
        assert_eq!(text, literal);
    }

    #[test]
    fn int32_overflow_is_rejected() {
        let schema = schema(json!({ "type": "integer" }));
        let result = decode_str(&SchemaRegistry::new(), &schema, "2147483648", &lenient());
        assert!(matches!(
            result,
            Err(TranscodeError::InvalidNumber { literal, format, .. })
                if literal == "2147483648" && format == "int32"
        ));
    }

    #[test]
    fn fractional_value_for_integer_is_rejected() {
        let schema = schema(json!({ "type": "integer", "format": "int64" }));
        let result = decode_str(&SchemaRegistry::new(), &schema, "1.5", &lenient());
        assert!(matches!(result, Err(TranscodeError::InvalidNumber { .. })));
    }

    #[test]
    fn integral_float_literal_fits_integer() {
        let schema = schema(json!({ "type": "integer", "format": "int64" }));
        let decoded = decode_str(&SchemaRegistry::new(), &schema, "15e1", &lenient()).unwrap();
        assert_eq!(decoded, StructuredValue::Int64(150));
    }

    #[test]
    fn decimal_value_encodes_into_int64() {
        let schema = schema(json!({ "type": "integer", "format": "int64" }));
        let value = StructuredValue::Decimal("9007199254740993".parse().unwrap());
        let json = encode(&SchemaRegistry::new(), &schema, &value, &lenient()).unwrap();
        assert_eq!(json.to_string(), "9007199254740993");
    }

    #[test]
    fn float_format_reads_single_precision() {
        let schema = schema(json!({ "type": "number", "format": "float" }));
        let decoded = decode_str(&SchemaRegistry::new(), &schema, "0.5", &lenient()).unwrap();
        assert_eq!(decoded, StructuredValue::Float32(0.5));
    }

    #[test]
    fn float_format_rejects_underflow() {
        let schema = schema(json!({ "type": "number", "format": "float" }));
        let result = decode_str(&SchemaRegistry::new(), &schema, "1e-50", &lenient());
        assert!(matches!(
            result,
            Err(TranscodeError::InvalidNumber { format, .. }) if format == "float"
        ));
    }

    #[test]
    fn integer_with_double_format_reads_double() {
        let schema = schema(json!({ "type": "integer", "format": "double" }));
        let decoded = decode_str(&SchemaRegistry::new(), &schema, "2.5", &lenient()).unwrap();
        assert_eq!(decoded, StructuredValue::Float64(2.5));
    }

    #[test]
    fn unknown_numeric_format_is_unsupported() {
        let schema = schema(json!({
            "type": "object",
            "properties": { "amount": { "type": "number", "format": "money" } }
        }));
        let result = decode(
            &SchemaRegistry::new(),
            &schema,
            &json!({ "amount": 1 }),
            &lenient(),
        );
        assert!(matches!(
            result,
            Err(TranscodeError::UnsupportedFormat { field, format })
                if field == "amount" && format == "money"
        ));
    }

    #[test]
    fn decimal_conversion_from_integers() {
        assert_eq!(Decimal::from(42i64).as_str(), "42");
        assert_eq!(Decimal::from(-7i32).to_i64(), Some(-7));
    }
}

// === Strict Mode Tests ===

mod strict_mode {
    use super::*;

    fn named() -> SchemaNode {
        schema(json!({
            "type": "object",
            "properties": { "name": { "type": "string" } }
        }))
    }

    #[test]
    fn strict_rejects_undeclared_field() {
        let value = StructuredValue::record([
            ("name", StructuredValue::from("Rex")),
            ("x", StructuredValue::from("extra")),
        ]);
        let result = encode(&SchemaRegistry::new(), &named(), &value, &strict());
        assert!(matches!(
            result,
            Err(TranscodeError::UndefinedFields { fields, .. }) if fields == ["x"]
        ));
    }

    #[test]
    fn lenient_drops_undeclared_field() {
        let value = StructuredValue::record([
            ("name", StructuredValue::from("Rex")),
            ("x", StructuredValue::from("extra")),
        ]);
        let json = encode(&SchemaRegistry::new(), &named(), &value, &lenient()).unwrap();
        assert_eq!(json, json!({ "name": "Rex" }));
    }

    #[test]
    fn strict_applies_to_nested_objects() {
        let registry = petstore();
        let pet = registry.lookup("Pet").unwrap();
        let payload = json!({
            "name": "doggie",
            "photoUrls": [],
            "category": { "id": 1, "slug": "dogs" }
        });

        let result = decode(&registry, pet, &payload, &strict());
        assert!(matches!(
            result,
            Err(TranscodeError::UndefinedFields { path, fields })
                if path == "/category" && fields == ["slug"]
        ));
    }

    #[test]
    fn default_options_are_lenient() {
        assert!(!TranscodeOptions::default().strict);
    }
}

// === Required Field Tests ===

mod required_fields {
    use super::*;

    #[test]
    fn missing_required_field_fails_encode() {
        let registry = petstore();
        let pet = registry.lookup("Pet").unwrap();
        let value = StructuredValue::record([("name", StructuredValue::from("doggie"))]);

        let result = encode(&registry, pet, &value, &lenient());
        assert!(matches!(
            result,
            Err(TranscodeError::MissingRequiredField { field, .. }) if field == "photoUrls"
        ));
    }

    #[test]
    fn same_field_optional_is_omitted() {
        let schema = schema(json!({
            "type": "object",
            "properties": {
                "name": { "type": "string" },
                "tag": { "type": "string" }
            }
        }));
        let value = StructuredValue::record([("name", StructuredValue::from("doggie"))]);

        let json = encode(&SchemaRegistry::new(), &schema, &value, &lenient()).unwrap();
        assert_eq!(json, json!({ "name": "doggie" }));
    }

    #[test]
    fn required_field_ignores_default() {
        let schema = schema(json!({
            "type": "object",
            "required": ["status"],
            "properties": { "status": { "type": "string", "default": "new" } }
        }));
        let result = decode(&SchemaRegistry::new(), &schema, &json!({}), &lenient());
        assert!(matches!(
            result,
            Err(TranscodeError::MissingRequiredField { field, .. }) if field == "status"
        ));
    }

    #[test]
    fn missing_nested_field_reports_path() {
        let schema = schema(json!({
            "type": "object",
            "properties": {
                "owner": {
                    "type": "object",
                    "required": ["email"],
                    "properties": { "email": { "type": "string" } }
                }
            }
        }));
        let result = decode(
            &SchemaRegistry::new(),
            &schema,
            &json!({ "owner": {} }),
            &lenient(),
        );
        assert!(matches!(
            result,
            Err(TranscodeError::MissingRequiredField { field, path })
                if field == "email" && path == "/owner/email"
        ));
    }

    #[test]
    fn null_array_element_is_missing() {
        let schema = schema(json!({
            "type": "object",
            "properties": { "tags": { "type": "array", "items": { "type": "string" } } }
        }));
        let result = decode(
            &SchemaRegistry::new(),
            &schema,
            &json!({ "tags": ["a", null] }),
            &lenient(),
        );
        assert!(matches!(
            result,
            Err(TranscodeError::MissingRequiredField { path, .. }) if path == "/tags/1"
        ));
    }

    #[test]
    fn enum_default_is_checked() {
        let schema = schema(json!({
            "type": "object",
            "properties": {
                "size": { "type": "string", "enum": ["S", "M"], "default": "XL" }
            }
        }));
        let result = encode(
            &SchemaRegistry::new(),
            &schema,
            &StructuredValue::record(Vec::<(&str, StructuredValue)>::new()),
            &lenient(),
        );
        assert!(matches!(
            result,
            Err(TranscodeError::EnumViolation { field, .. }) if field == "size"
        ));
    }

    #[test]
    fn integer_enum_accepts_equivalent_literal() {
        let schema = schema(json!({ "type": "integer", "enum": [1, 2, 3] }));
        let decoded = decode_str(&SchemaRegistry::new(), &schema, "2.0", &lenient()).unwrap();
        assert_eq!(decoded, StructuredValue::Int32(2));
    }
}

// === Composed Schema Tests ===

mod composed {
    use super::*;

    fn shapes() -> SchemaRegistry {
        registry(json!({
            "components": {
                "schemas": {
                    "Circle": {
                        "type": "object",
                        "required": ["radius"],
                        "properties": {
                            "radius": { "type": "number", "format": "double" },
                            "label": { "type": "string" }
                        }
                    },
                    "Square": {
                        "type": "object",
                        "required": ["side"],
                        "properties": {
                            "side": { "type": "number", "format": "double" },
                            "label": { "type": "string" }
                        }
                    },
                    "Shape": {
                        "oneOf": [
                            { "$ref": "#/components/schemas/Circle" },
                            { "$ref": "#/components/schemas/Square" }
                        ]
                    }
                }
            }
        }))
    }

    #[test]
    fn one_of_selects_variant_by_required_fields() {
        let registry = shapes();
        let shape = registry.lookup("Shape").unwrap();

        let value = decode(&registry, shape, &json!({ "side": 2, "label": "sq" }), &lenient())
            .unwrap();
        assert_eq!(
            value,
            StructuredValue::record([
                ("side", StructuredValue::Float64(2.0)),
                ("label", StructuredValue::from("sq")),
            ])
        );
    }

    #[test]
    fn one_of_with_both_discriminators_is_ambiguous() {
        let registry = shapes();
        let shape = registry.lookup("Shape").unwrap();
        let value = StructuredValue::record([
            ("radius", StructuredValue::Float64(1.5)),
            ("side", StructuredValue::Float64(2.0)),
        ]);

        let result = encode(&registry, shape, &value, &lenient());
        assert!(matches!(
            result,
            Err(TranscodeError::Union(UnionError::Ambiguous { matches: 2 }))
        ));
    }

    #[test]
    fn one_of_superset_variant_is_ambiguous() {
        let schema = schema(json!({
            "oneOf": [
                { "type": "object", "required": ["a"], "properties": { "a": { "type": "string" } } },
                { "type": "object", "required": ["b"], "properties": { "b": { "type": "string" } } },
                {
                    "type": "object",
                    "required": ["a", "b"],
                    "properties": { "a": { "type": "string" }, "b": { "type": "string" } }
                }
            ]
        }));
        let registry = SchemaRegistry::new();

        let single = decode(&registry, &schema, &json!({ "a": "x" }), &lenient()).unwrap();
        assert_eq!(single, StructuredValue::record([("a", StructuredValue::from("x"))]));

        let both = decode(&registry, &schema, &json!({ "a": "x", "b": "y" }), &lenient());
        assert!(matches!(
            both,
            Err(TranscodeError::Union(UnionError::Ambiguous { matches: 3 }))
        ));
    }

    #[test]
    fn any_of_uses_first_match() {
        let schema = schema(json!({
            "anyOf": [
                { "type": "object", "required": ["code"], "properties": { "code": { "type": "integer" } } },
                {
                    "type": "object",
                    "properties": { "code": { "type": "integer" }, "message": { "type": "string" } }
                }
            ]
        }));
        let json = json!({ "code": 404, "message": "not found" });

        let value = decode(&SchemaRegistry::new(), &schema, &json, &lenient()).unwrap();
        assert_eq!(value, StructuredValue::record([("code", StructuredValue::Int32(404))]));
    }

    #[test]
    fn any_of_without_match_fails() {
        let registry = shapes();
        let schema = schema(json!({
            "anyOf": [
                { "$ref": "#/components/schemas/Circle" },
                { "$ref": "#/components/schemas/Square" }
            ]
        }));
        let result = decode(&registry, &schema, &json!({ "label": "?" }), &lenient());
        assert!(matches!(
            result,
            Err(TranscodeError::Union(UnionError::NoMatchingVariant))
        ));
    }

    #[test]
    fn all_of_merges_properties() {
        let schema = schema(json!({
            "allOf": [
                {
                    "type": "object",
                    "required": ["id"],
                    "properties": { "id": { "type": "integer", "format": "int64" } }
                },
                {
                    "type": "object",
                    "required": ["name"],
                    "properties": { "name": { "type": "string" }, "id": { "type": "string" } }
                }
            ]
        }));
        let value = StructuredValue::record([
            ("name", StructuredValue::from("Rex")),
            ("id", StructuredValue::Int64(9)),
        ]);

        let json = encode(&SchemaRegistry::new(), &schema, &value, &strict()).unwrap();
        assert_eq!(json, json!({ "id": 9, "name": "Rex" }));
    }

    #[test]
    fn all_of_requires_every_variant() {
        let schema = schema(json!({
            "allOf": [
                { "type": "object", "required": ["id"], "properties": { "id": { "type": "string" } } },
                { "type": "object", "required": ["name"], "properties": { "name": { "type": "string" } } }
            ]
        }));
        let result = decode(&SchemaRegistry::new(), &schema, &json!({ "id": "1" }), &lenient());
        assert!(matches!(
            result,
            Err(TranscodeError::Union(UnionError::Incomplete {
                matched: 1,
                total: 2
            }))
        ));
    }

    #[test]
    fn strict_one_of_rejects_fields_outside_selected_variant() {
        let registry = shapes();
        let shape = registry.lookup("Shape").unwrap();
        let value = StructuredValue::record([
            ("radius", StructuredValue::Float64(1.5)),
            ("z", StructuredValue::from("extra")),
        ]);

        let result = encode(&registry, shape, &value, &strict());
        assert!(matches!(
            result,
            Err(TranscodeError::UndefinedFields { fields, .. }) if fields == ["z"]
        ));
    }

    #[test]
    fn strict_any_of_checks_first_match_only() {
        let schema = schema(json!({
            "anyOf": [
                { "type": "object", "required": ["code"], "properties": { "code": { "type": "integer" } } },
                {
                    "type": "object",
                    "properties": { "code": { "type": "integer" }, "message": { "type": "string" } }
                }
            ]
        }));
        let json = json!({ "code": 404, "message": "not found" });

        let result = decode(&SchemaRegistry::new(), &schema, &json, &strict());
        assert!(matches!(
            result,
            Err(TranscodeError::UndefinedFields { fields, .. }) if fields == ["message"]
        ));
    }

    #[test]
    fn strict_all_of_rejects_field_no_variant_declares() {
        let schema = schema(json!({
            "allOf": [
                { "type": "object", "required": ["id"], "properties": { "id": { "type": "string" } } },
                { "type": "object", "required": ["name"], "properties": { "name": { "type": "string" } } }
            ]
        }));
        let json = json!({ "id": "1", "name": "Rex", "owner": "Ann" });

        let result = decode(&SchemaRegistry::new(), &schema, &json, &strict());
        assert!(matches!(
            result,
            Err(TranscodeError::UndefinedFields { path, fields })
                if path.is_empty() && fields == ["owner"]
        ));
    }

    #[test]
    fn null_field_does_not_select_variant() {
        let registry = shapes();
        let shape = registry.lookup("Shape").unwrap();

        let value = decode(
            &registry,
            shape,
            &json!({ "radius": null, "side": 3 }),
            &lenient(),
        )
        .unwrap();
        assert_eq!(value, StructuredValue::record([("side", StructuredValue::Float64(3.0))]));
    }
}

// === Array Tests ===

mod arrays {
    use super::*;

    fn grid() -> SchemaNode {
        schema(json!({
            "type": "object",
            "properties": {
                "rows": {
                    "type": "array",
                    "items": { "type": "array", "items": { "type": "integer" } }
                }
            }
        }))
    }

    #[test]
    fn nested_array_unsupported_on_decode() {
        let result = decode(
            &SchemaRegistry::new(),
            &grid(),
            &json!({ "rows": [[1, 2], [3]] }),
            &lenient(),
        );
        assert!(matches!(
            result,
            Err(TranscodeError::NestedArrayUnsupported { path }) if path == "/rows"
        ));
    }

    #[test]
    fn nested_array_unsupported_on_encode() {
        let value = StructuredValue::record([(
            "rows",
            StructuredValue::list([StructuredValue::list([StructuredValue::Int32(1)])]),
        )]);
        let result = encode(&SchemaRegistry::new(), &grid(), &value, &lenient());
        assert!(matches!(
            result,
            Err(TranscodeError::NestedArrayUnsupported { path }) if path == "/rows"
        ));
    }

    #[test]
    fn nested_array_through_ref_unsupported() {
        let registry = registry(json!({
            "components": {
                "schemas": {
                    "Row": { "type": "array", "items": { "type": "integer" } }
                }
            }
        }));
        let schema = schema(json!({
            "type": "array",
            "items": { "$ref": "#/components/schemas/Row" }
        }));

        let result = decode(&registry, &schema, &json!([[1]]), &lenient());
        assert!(matches!(
            result,
            Err(TranscodeError::NestedArrayUnsupported { path }) if path.is_empty()
        ));
    }
}

// === Concurrency Tests ===

mod concurrency {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn registry_is_shared_across_threads() {
        let registry = Arc::new(petstore());

        let handles: Vec<_> = (0..8i64)
            .map(|i| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    let pet = registry.lookup("Pet").unwrap();
                    let value = StructuredValue::record([
                        ("id", StructuredValue::Int64(i)),
                        ("name", StructuredValue::from(format!("pet-{}", i))),
                        ("photoUrls", StructuredValue::list(Vec::<StructuredValue>::new())),
                    ]);

                    let json = encode(&registry, pet, &value, &strict()).unwrap();
                    let back = decode(&registry, pet, &json, &strict()).unwrap();
                    assert_eq!(back, value);
                    json
                })
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            let json = handle.join().unwrap();
            assert_eq!(json["id"], json!(i));
        }
    }

    #[test]
    fn registry_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SchemaRegistry>();
        assert_send_sync::<SchemaNode>();
    }
}

// === Reference Tests ===

mod references {
    use super::*;

    #[test]
    fn unresolved_reference_fails() {
        let schema = schema(json!({
            "type": "object",
            "properties": { "owner": { "$ref": "#/components/schemas/Owner" } }
        }));
        let value = StructuredValue::record([(
            "owner",
            StructuredValue::record([("name", StructuredValue::from("Ann"))]),
        )]);

        let result = encode(&SchemaRegistry::new(), &schema, &value, &lenient());
        assert!(matches!(
            result,
            Err(TranscodeError::Reference(ReferenceError::Unresolved { key })) if key == "Owner"
        ));
    }

    #[test]
    fn external_reference_is_unsupported() {
        let schema = schema(json!({
            "type": "object",
            "properties": { "owner": { "$ref": "owner.json#/Owner" } }
        }));
        let result = decode(
            &SchemaRegistry::new(),
            &schema,
            &json!({ "owner": {} }),
            &lenient(),
        );
        assert!(matches!(
            result,
            Err(TranscodeError::Reference(ReferenceError::UnsupportedKind { raw }))
                if raw == "owner.json#/Owner"
        ));
    }

    #[test]
    fn chained_reference_is_not_followed() {
        let registry = registry(json!({
            "components": {
                "schemas": {
                    "Id": { "type": "string" },
                    "PetId": { "$ref": "#/components/schemas/Id" }
                }
            }
        }));
        let schema = schema(json!({ "$ref": "#/components/schemas/PetId" }));

        let result = decode(&registry, &schema, &json!("abc"), &lenient());
        assert!(matches!(
            result,
            Err(TranscodeError::Reference(ReferenceError::Chained { .. }))
        ));
    }

    #[test]
    fn absent_optional_reference_is_omitted() {
        let registry = petstore();
        let pet = registry.lookup("Pet").unwrap();
        let json = json!({ "name": "doggie", "photoUrls": ["p"] });

        let value = decode(&registry, pet, &json, &lenient()).unwrap();
        assert!(value.field("category").is_none());
    }
}
