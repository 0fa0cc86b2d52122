//! Tests for $ref resolution within and across documents

use jschema::{BuildError, Validator};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn build(schema: Value) -> Validator {
    let mut validator = Validator::new();
    validator
        .set_root_schema(&schema)
        .expect("schema compiles");
    validator
}

fn first_code(validator: &Validator, instance: Value) -> Option<&'static str> {
    validator
        .validate(&instance)
        .err()
        .map(|issue| issue.error.code())
}

#[test]
fn test_ref_into_definitions() {
    let validator = build(json!({
        "properties": {"p": {"$ref": "#/definitions/x"}},
        "definitions": {"x": {"type": "boolean"}}
    }));

    assert_eq!(first_code(&validator, json!({"p": true})), None);
    assert_eq!(
        first_code(&validator, json!({"p": 1})),
        Some("UNEXPECTED_TYPE")
    );
}

#[test]
fn test_forward_reference_between_definitions() {
    // "a" is compiled before "b", so its reference is satisfied by a later
    // insertion.
    let validator = build(json!({
        "properties": {"p": {"$ref": "#/definitions/a"}},
        "definitions": {
            "a": {"$ref": "#/definitions/b"},
            "b": {"type": "integer", "minimum": 3}
        }
    }));

    assert_eq!(first_code(&validator, json!({"p": 4})), None);
    assert_eq!(first_code(&validator, json!({"p": 1})), Some("BELOW_MINIMUM"));
    assert_eq!(
        first_code(&validator, json!({"p": "x"})),
        Some("UNEXPECTED_TYPE")
    );
}

#[test]
fn test_reordering_definitions_is_equivalent() {
    let forward = build(json!({
        "definitions": {
            "a": {"$ref": "#/definitions/b"},
            "b": {"type": "string"}
        },
        "$ref": "#/definitions/a"
    }));
    let backward = build(json!({
        "definitions": {
            "b": {"type": "string"},
            "a": {"$ref": "#/definitions/b"}
        },
        "$ref": "#/definitions/a"
    }));

    for instance in [json!("x"), json!(1), json!(null)] {
        assert_eq!(
            first_code(&forward, instance.clone()),
            first_code(&backward, instance)
        );
    }
}

#[test]
fn test_recursive_schema_terminates_on_finite_instance() {
    let validator = build(json!({
        "type": "object",
        "properties": {"child": {"$ref": "#"}}
    }));

    assert_eq!(
        first_code(&validator, json!({"child": {"child": {"child": {}}}})),
        None
    );
    assert_eq!(
        first_code(&validator, json!({"child": {"child": 3}})),
        Some("UNEXPECTED_TYPE")
    );
}

#[test]
fn test_unknown_keyword_promoted_by_ref() {
    // "customKeyword" is not a draft-07 keyword; it is retained and becomes
    // a schema the moment the reference targets it.
    let validator = build(json!({
        "properties": {"p": {"$ref": "#/customKeyword"}},
        "customKeyword": {"type": "integer"}
    }));

    assert_eq!(first_code(&validator, json!({"p": 5})), None);
    assert_eq!(
        first_code(&validator, json!({"p": "x"})),
        Some("UNEXPECTED_TYPE")
    );
}

#[test]
fn test_unknown_keyword_promoted_from_stash() {
    // The fragment under "custom" is stashed while "a" compiles, then
    // promoted when "b"'s reference asks for it.
    let validator = build(json!({
        "properties": {
            "a": {"custom": {"type": "boolean"}},
            "b": {"$ref": "#/properties/a/custom"}
        }
    }));

    assert_eq!(first_code(&validator, json!({"b": true})), None);
    assert_eq!(
        first_code(&validator, json!({"b": 1})),
        Some("UNEXPECTED_TYPE")
    );
}

#[test]
fn test_ref_siblings_are_ignored() {
    // Draft-07: $ref replaces sibling keywords entirely.
    let validator = build(json!({
        "$ref": "#/definitions/any",
        "minimum": 100,
        "definitions": {"any": {}}
    }));

    assert_eq!(first_code(&validator, json!(1)), None);
}

#[test]
fn test_id_aliases_subschema() {
    let validator = build(json!({
        "properties": {
            "q": {"$ref": "http://example.com/nested.json#/properties/x"}
        },
        "definitions": {
            "n": {
                "$id": "http://example.com/nested.json",
                "type": "object",
                "properties": {"x": {"type": "integer"}}
            }
        }
    }));

    assert_eq!(first_code(&validator, json!({"q": 3})), None);
    assert_eq!(
        first_code(&validator, json!({"q": "x"})),
        Some("UNEXPECTED_TYPE")
    );
}

#[test]
fn test_duplicate_id_fails_build() {
    let mut validator = Validator::new();
    let err = validator
        .set_root_schema(&json!({
            "definitions": {
                "a": {"$id": "http://example.com/dup.json", "type": "null"},
                "b": {"$id": "http://example.com/dup.json", "type": "null"}
            }
        }))
        .expect_err("two schemas claim the same $id");
    assert!(matches!(err, BuildError::DuplicateSchema { .. }));
}

#[test]
fn test_external_ref_without_loader_fails_build() {
    let mut validator = Validator::new();
    let err = validator
        .set_root_schema(&json!({"$ref": "http://example.com/s.json"}))
        .expect_err("no loader");
    match err {
        BuildError::ExternalRefWithoutLoader { location } => {
            assert_eq!(location, "http://example.com/s.json");
        }
        other => panic!("expected ExternalRefWithoutLoader, got {other:?}"),
    }
}

#[test]
fn test_external_document_is_loaded() {
    let mut validator = Validator::new().with_loader(|uri| {
        assert_eq!(uri.location(), "http://example.com/s.json");
        Ok(json!({
            "definitions": {
                "positive": {"type": "integer", "exclusiveMinimum": 0}
            }
        }))
    });
    validator
        .set_root_schema(&json!({
            "$ref": "http://example.com/s.json#/definitions/positive"
        }))
        .expect("external document loads");

    assert_eq!(first_code(&validator, json!(5)), None);
    assert_eq!(first_code(&validator, json!(0)), Some("BELOW_MINIMUM"));
}

#[test]
fn test_loader_runs_to_fixpoint() {
    // a.json references b.json, which is only discovered while a.json
    // compiles; the resolver keeps looping until nothing new loads.
    let mut validator = Validator::new().with_loader(|uri| match uri.location() {
        "http://example.com/a.json" => Ok(json!({"$ref": "http://example.com/b.json"})),
        "http://example.com/b.json" => Ok(json!({"type": "string"})),
        other => Err(format!("unexpected location {other}").into()),
    });
    validator
        .set_root_schema(&json!({"$ref": "http://example.com/a.json"}))
        .expect("both documents load");

    assert_eq!(first_code(&validator, json!("x")), None);
    assert_eq!(first_code(&validator, json!(1)), Some("UNEXPECTED_TYPE"));
}

#[test]
fn test_relative_ref_resolved_against_id() {
    let mut validator = Validator::new().with_loader(|uri| {
        assert_eq!(uri.location(), "http://example.com/schemas/other.json");
        Ok(json!({"type": "null"}))
    });
    validator
        .set_root_schema(&json!({
            "$id": "http://example.com/schemas/root.json",
            "properties": {"p": {"$ref": "other.json"}}
        }))
        .expect("relative reference loads");

    assert_eq!(first_code(&validator, json!({"p": null})), None);
    assert_eq!(
        first_code(&validator, json!({"p": 0})),
        Some("UNEXPECTED_TYPE")
    );
}

#[test]
fn test_loader_failure_propagates() {
    let mut validator =
        Validator::new().with_loader(|_uri| Err("connection refused".into()));
    let err = validator
        .set_root_schema(&json!({"$ref": "http://example.com/s.json"}))
        .expect_err("loader failed");
    match err {
        BuildError::Loader { location, source } => {
            assert_eq!(location, "http://example.com/s.json");
            assert!(source.to_string().contains("connection refused"));
        }
        other => panic!("expected Loader, got {other:?}"),
    }
}

#[test]
fn test_dangling_reference_reported_at_validation_time() {
    // The loaded document never defines the referenced pointer; the build
    // succeeds and the placeholder reports when invoked.
    let mut validator =
        Validator::new().with_loader(|_uri| Ok(json!({"definitions": {}})));
    validator
        .set_root_schema(&json!({
            "properties": {
                "p": {"$ref": "http://example.com/s.json#/definitions/missing"}
            }
        }))
        .expect("build succeeds despite the dangling reference");

    // Untouched paths validate fine.
    assert_eq!(first_code(&validator, json!({})), None);
    let issue = validator
        .validate(&json!({"p": 1}))
        .expect_err("dangling reference invoked");
    assert_eq!(issue.error.code(), "UNRESOLVED_REF");
    assert!(issue
        .error
        .to_string()
        .contains("http://example.com/s.json#/definitions/missing"));
}

#[test]
fn test_escaped_pointer_tokens_in_ref() {
    let validator = build(json!({
        "$ref": "#/definitions/a~1b",
        "definitions": {"a/b": {"type": "boolean"}}
    }));

    assert_eq!(first_code(&validator, json!(true)), None);
    assert_eq!(first_code(&validator, json!(0)), Some("UNEXPECTED_TYPE"));
}
