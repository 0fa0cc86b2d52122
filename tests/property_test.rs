//! Property tests for the universal validation laws

use jschema::{ErrorCollector, Validator};
use proptest::prelude::*;
use serde_json::{json, Value};

fn build(schema: Value) -> Validator {
    let mut validator = Validator::new();
    validator
        .set_root_schema(&schema)
        .expect("schema compiles");
    validator
}

fn instance_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        (-50i64..50).prop_map(Value::from),
        (-50.0f64..50.0).prop_map(Value::from),
        "[a-z]{0,8}".prop_map(Value::from),
    ];
    prop_oneof![
        leaf.clone(),
        proptest::collection::vec(leaf.clone(), 0..4).prop_map(Value::from),
        proptest::collection::btree_map("[a-z]{1,4}", leaf, 0..4)
            .prop_map(|members| json!(members)),
    ]
}

proptest! {
    #[test]
    fn prop_double_negation_is_identity(instance in instance_strategy()) {
        let plain = build(json!({"type": "integer", "minimum": 0}));
        let doubled = build(json!({
            "not": {"not": {"type": "integer", "minimum": 0}}
        }));

        prop_assert_eq!(
            plain.validate(&instance).is_ok(),
            doubled.validate(&instance).is_ok()
        );
    }

    #[test]
    fn prop_validation_is_idempotent(instance in instance_strategy()) {
        let validator = build(json!({
            "type": ["integer", "string", "object"],
            "minimum": 0,
            "minLength": 2,
            "required": ["a"]
        }));

        let mut first = ErrorCollector::new();
        let mut second = ErrorCollector::new();
        validator.validate_with(&instance, &mut first);
        validator.validate_with(&instance, &mut second);
        prop_assert_eq!(first.issues, second.issues);
    }

    #[test]
    fn prop_all_of_is_conjunction(instance in instance_strategy()) {
        let left = build(json!({"minimum": 0}));
        let right = build(json!({"maximum": 10}));
        let both = build(json!({"allOf": [{"minimum": 0}, {"maximum": 10}]}));

        prop_assert_eq!(
            both.validate(&instance).is_ok(),
            left.validate(&instance).is_ok() && right.validate(&instance).is_ok()
        );
    }

    #[test]
    fn prop_one_of_passes_iff_exactly_one(instance in instance_strategy()) {
        let branches = [
            json!({"type": "string"}),
            json!({"type": "integer"}),
            json!({"minimum": 0}),
        ];
        let combined = build(json!({"oneOf": branches}));

        let passing = branches
            .iter()
            .filter(|branch| build((*branch).clone()).validate(&instance).is_ok())
            .count();
        prop_assert_eq!(combined.validate(&instance).is_ok(), passing == 1);
    }
}
