//! Tests for logical combinators, conditionals, and handler isolation

use jschema::{
    Cancelled, ErrorCollector, ErrorHandler, ValidationError, ValidationIssue, Validator,
};
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
fn test_all_of_requires_every_subschema() {
    let validator = build(json!({
        "allOf": [
            {"type": "integer"},
            {"minimum": 0},
            {"maximum": 10}
        ]
    }));

    assert_eq!(first_code(&validator, json!(5)), None);
    assert_eq!(first_code(&validator, json!(-1)), Some("ALL_OF_FAILURE"));
    assert_eq!(first_code(&validator, json!(11)), Some("ALL_OF_FAILURE"));
    assert_eq!(first_code(&validator, json!(5.5)), Some("ALL_OF_FAILURE"));
}

#[test]
fn test_any_of_requires_one_subschema() {
    let validator = build(json!({
        "anyOf": [
            {"type": "string"},
            {"type": "integer", "minimum": 0}
        ]
    }));

    assert_eq!(first_code(&validator, json!("x")), None);
    assert_eq!(first_code(&validator, json!(3)), None);
    assert_eq!(first_code(&validator, json!(-3)), Some("ANY_OF_FAILURE"));
    assert_eq!(first_code(&validator, json!(null)), Some("ANY_OF_FAILURE"));
}

#[test]
fn test_one_of_requires_exactly_one() {
    let validator = build(json!({
        "oneOf": [
            {"type": "integer", "minimum": 0},
            {"type": "integer", "maximum": 10}
        ]
    }));

    // 20 only matches the first, -5 only the second.
    assert_eq!(first_code(&validator, json!(20)), None);
    assert_eq!(first_code(&validator, json!(-5)), None);
    assert_eq!(first_code(&validator, json!(5)), Some("ONE_OF_MULTIPLE"));
    assert_eq!(first_code(&validator, json!("x")), Some("ONE_OF_NONE"));
}

#[test]
fn test_one_of_integer_subsumed_by_number() {
    let validator = build(json!({
        "oneOf": [{"type": "integer"}, {"type": "number"}]
    }));

    // An integer instance satisfies both branches.
    assert_eq!(first_code(&validator, json!(1)), Some("ONE_OF_MULTIPLE"));
    assert_eq!(first_code(&validator, json!(1.5)), None);
}

#[test]
fn test_not_inverts() {
    let validator = build(json!({"not": {"type": "integer"}}));

    assert_eq!(first_code(&validator, json!("x")), None);
    assert_eq!(first_code(&validator, json!(1.5)), None);
    assert_eq!(first_code(&validator, json!(3)), Some("NOT_FAILURE"));
}

#[test]
fn test_double_negation_is_identity() {
    let plain = build(json!({"type": "integer", "minimum": 0}));
    let doubled = build(json!({
        "not": {"not": {"type": "integer", "minimum": 0}}
    }));

    for instance in [json!(5), json!(-5), json!("x"), json!(null), json!(2.5)] {
        assert_eq!(
            plain.validate(&instance).is_ok(),
            doubled.validate(&instance).is_ok(),
            "diverged on {instance}"
        );
    }
}

#[test]
fn test_if_then_else() {
    let validator = build(json!({
        "if": {"type": "integer"},
        "then": {"minimum": 0},
        "else": {"type": "string"}
    }));

    assert_eq!(first_code(&validator, json!(5)), None);
    assert_eq!(first_code(&validator, json!(-3)), Some("BELOW_MINIMUM"));
    assert_eq!(first_code(&validator, json!("x")), None);
    assert_eq!(first_code(&validator, json!(2.5)), Some("UNEXPECTED_TYPE"));
}

#[test]
fn test_if_without_branches_is_inert() {
    let validator = build(json!({"if": {"type": "integer"}}));

    assert_eq!(first_code(&validator, json!(5)), None);
    assert_eq!(first_code(&validator, json!("x")), None);
}

#[test]
fn test_then_without_if_is_inert() {
    let validator = build(json!({"then": {"type": "integer"}}));

    assert_eq!(first_code(&validator, json!("anything")), None);
}

#[test]
fn test_combined_type_and_logic() {
    // Keyword order inside one schema: type check, then enum, then logic.
    let validator = build(json!({
        "type": "integer",
        "enum": [1, 2, 3, 4],
        "allOf": [{"minimum": 2}]
    }));

    assert_eq!(first_code(&validator, json!(2)), None);
    assert_eq!(first_code(&validator, json!(5)), Some("ENUM_MISMATCH"));
    assert_eq!(first_code(&validator, json!(1)), Some("ALL_OF_FAILURE"));
}

#[test]
fn test_trial_validations_stay_private() {
    // anyOf's failing first branch and not's inner failure must not leak
    // into the caller's handler when validation succeeds overall.
    let validator = build(json!({
        "anyOf": [{"type": "integer"}, {"type": "string"}],
        "not": {"type": "null"}
    }));

    let mut collector = ErrorCollector::new();
    validator.validate_with(&json!("x"), &mut collector);
    assert!(collector.issues.is_empty());
}

#[test]
fn test_contains_trials_stay_private() {
    let validator = build(json!({
        "type": "array",
        "contains": {"type": "string"}
    }));

    let mut collector = ErrorCollector::new();
    validator.validate_with(&json!([1, 2, "x"]), &mut collector);
    assert!(collector.issues.is_empty());
}

/// Cancels after recording a fixed number of errors.
struct CancelAfter {
    limit: usize,
    issues: Vec<ValidationIssue>,
}

impl ErrorHandler for CancelAfter {
    fn error(
        &mut self,
        path: &str,
        _instance: &Value,
        error: ValidationError,
    ) -> Result<(), Cancelled> {
        self.issues.push(ValidationIssue::new(path, error));
        if self.issues.len() >= self.limit {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }
}

#[test]
fn test_handler_cancellation_stops_traversal() {
    let validator = build(json!({
        "type": "object",
        "required": ["a", "b", "c", "d"]
    }));

    let mut handler = CancelAfter {
        limit: 2,
        issues: Vec::new(),
    };
    validator.validate_with(&json!({}), &mut handler);
    assert_eq!(handler.issues.len(), 2);

    // The same instance produces all four errors without cancellation.
    let mut collector = ErrorCollector::new();
    validator.validate_with(&json!({}), &mut collector);
    assert_eq!(collector.issues.len(), 4);
}

#[test]
fn test_nested_combinators() {
    let validator = build(json!({
        "oneOf": [
            {"allOf": [{"type": "integer"}, {"minimum": 0}]},
            {"not": {"type": "integer"}}
        ]
    }));

    // Non-negative integer: first branch only.
    assert_eq!(first_code(&validator, json!(5)), None);
    // String: second branch only.
    assert_eq!(first_code(&validator, json!("x")), None);
    // Negative integer: neither branch.
    assert_eq!(first_code(&validator, json!(-1)), Some("ONE_OF_NONE"));
}
