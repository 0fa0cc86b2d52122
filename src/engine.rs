//! Validation engine
//!
//! Dispatches compiled validator nodes against instances, delivering errors
//! to the caller's handler in traversal order. Trial validations inside
//! combinators run against scratch handlers so they never surface.

use serde_json::Value;

use crate::nodes::{
    ArraySchema, Combinator, InstanceType, NodeId, NumericSchema, NumericValue, ObjectSchema,
    SchemaNode, StringSchema, TypeSchema,
};
use crate::registry::SchemaRegistry;
use crate::report::{Cancelled, ErrorHandler, Scratch, ValidationError};
use crate::FormatChecker;

pub(crate) struct Engine<'a> {
    registry: &'a SchemaRegistry,
    format_checker: Option<&'a FormatChecker>,
}

impl<'a> Engine<'a> {
    pub(crate) fn new(
        registry: &'a SchemaRegistry,
        format_checker: Option<&'a FormatChecker>,
    ) -> Self {
        Self {
            registry,
            format_checker,
        }
    }

    /// Validate `instance` against the node at `id`.
    pub(crate) fn validate(
        &self,
        id: NodeId,
        instance: &Value,
        path: &str,
        handler: &mut dyn ErrorHandler,
    ) -> Result<(), Cancelled> {
        match self.registry.node(id) {
            SchemaNode::Boolean(true) => Ok(()),
            SchemaNode::Boolean(false) => {
                handler.error(path, instance, ValidationError::FalseSchema)
            }
            SchemaNode::Type(node) => self.validate_type_schema(node, instance, path, handler),
            SchemaNode::Null => {
                if instance.is_null() {
                    Ok(())
                } else {
                    handler.error(
                        path,
                        instance,
                        ValidationError::UnexpectedType {
                            found: InstanceType::of(instance).name(),
                        },
                    )
                }
            }
            SchemaNode::BooleanType => Ok(()),
            SchemaNode::String(node) => self.validate_string(node, instance, path, handler),
            SchemaNode::Integer(node) => self.validate_numeric(node, instance, path, handler),
            SchemaNode::Unsigned(node) => self.validate_numeric(node, instance, path, handler),
            SchemaNode::Float(node) => self.validate_numeric(node, instance, path, handler),
            SchemaNode::Object(node) => self.validate_object(node, instance, path, handler),
            SchemaNode::Array(node) => self.validate_array(node, instance, path, handler),
            SchemaNode::Combination { mode, subschemas } => {
                self.validate_combination(*mode, subschemas, instance, path, handler)
            }
            SchemaNode::Not(sub) => {
                let mut trial = Scratch::default();
                self.validate(*sub, instance, path, &mut trial)?;
                if trial.passed() {
                    handler.error(path, instance, ValidationError::NotFailure)
                } else {
                    Ok(())
                }
            }
            SchemaNode::Required(names) => {
                let members = instance.as_object();
                for name in names {
                    let present = members.is_some_and(|m| m.contains_key(name));
                    if !present {
                        handler.error(
                            path,
                            instance,
                            ValidationError::MissingRequired {
                                property: name.clone(),
                            },
                        )?;
                    }
                }
                Ok(())
            }
            SchemaNode::Ref(reference) => match reference.target {
                Some(target) => self.validate(target, instance, path, handler),
                None => handler.error(
                    path,
                    instance,
                    ValidationError::UnresolvedRef {
                        id: reference.id.clone(),
                    },
                ),
            },
        }
    }

    fn validate_type_schema(
        &self,
        node: &TypeSchema,
        instance: &Value,
        path: &str,
        handler: &mut dyn ErrorHandler,
    ) -> Result<(), Cancelled> {
        let tag = InstanceType::of(instance);
        match node.types[tag.index()] {
            Some(sub) => self.validate(sub, instance, path, handler)?,
            None => handler.error(
                path,
                instance,
                ValidationError::UnexpectedType { found: tag.name() },
            )?,
        }

        if let Some(members) = &node.enumeration {
            if !members.iter().any(|member| json_eq(member, instance)) {
                handler.error(path, instance, ValidationError::EnumMismatch)?;
            }
        }

        if let Some(constant) = &node.constant {
            if !json_eq(constant, instance) {
                handler.error(path, instance, ValidationError::ConstMismatch)?;
            }
        }

        for &combinator in &node.logic {
            self.validate(combinator, instance, path, handler)?;
        }

        if let Some(conditional) = &node.conditional {
            let mut trial = Scratch::default();
            self.validate(conditional.condition, instance, path, &mut trial)?;
            if trial.passed() {
                if let Some(then_branch) = conditional.then_branch {
                    self.validate(then_branch, instance, path, handler)?;
                }
            } else if let Some(else_branch) = conditional.else_branch {
                self.validate(else_branch, instance, path, handler)?;
            }
        }

        Ok(())
    }

    fn validate_combination(
        &self,
        mode: Combinator,
        subschemas: &[NodeId],
        instance: &Value,
        path: &str,
        handler: &mut dyn ErrorHandler,
    ) -> Result<(), Cancelled> {
        let mut passed = 0usize;

        for &sub in subschemas {
            let mut trial = Scratch::default();
            self.validate(sub, instance, path, &mut trial)?;

            if trial.failed() {
                if mode == Combinator::AllOf {
                    return handler.error(path, instance, ValidationError::AllOfFailure);
                }
            } else {
                passed += 1;
            }

            if mode == Combinator::OneOf && passed > 1 {
                return handler.error(path, instance, ValidationError::OneOfMultiple);
            }
            if mode == Combinator::AnyOf && passed == 1 {
                return Ok(());
            }
        }

        if passed == 0 {
            match mode {
                Combinator::AnyOf => {
                    handler.error(path, instance, ValidationError::AnyOfFailure)?;
                }
                Combinator::OneOf => {
                    handler.error(path, instance, ValidationError::OneOfNone)?;
                }
                Combinator::AllOf => {}
            }
        }
        Ok(())
    }

    fn validate_string(
        &self,
        node: &StringSchema,
        instance: &Value,
        path: &str,
        handler: &mut dyn ErrorHandler,
    ) -> Result<(), Cancelled> {
        let Some(text) = instance.as_str() else {
            return Ok(());
        };
        let length = code_points(text);

        if let Some(min_length) = node.min_length {
            if length < min_length {
                handler.error(
                    path,
                    instance,
                    ValidationError::StringTooShort { length, min_length },
                )?;
            }
        }
        if let Some(max_length) = node.max_length {
            if length > max_length {
                handler.error(
                    path,
                    instance,
                    ValidationError::StringTooLong { length, max_length },
                )?;
            }
        }
        if let Some(pattern) = &node.pattern {
            if !pattern.matches(text) {
                handler.error(
                    path,
                    instance,
                    ValidationError::PatternMismatch {
                        pattern: pattern.source.clone(),
                    },
                )?;
            }
        }
        if let Some(format) = &node.format {
            match self.format_checker {
                Some(checker) => {
                    if let Err(message) = checker(format, text) {
                        handler.error(
                            path,
                            instance,
                            ValidationError::FormatViolation {
                                format: format.clone(),
                                message,
                            },
                        )?;
                    }
                }
                None => {
                    handler.error(
                        path,
                        instance,
                        ValidationError::FormatWithoutChecker {
                            format: format.clone(),
                        },
                    )?;
                }
            }
        }
        Ok(())
    }

    fn validate_numeric<T: NumericValue>(
        &self,
        node: &NumericSchema<T>,
        instance: &Value,
        path: &str,
        handler: &mut dyn ErrorHandler,
    ) -> Result<(), Cancelled> {
        let Some(value) = instance.as_number().and_then(T::from_instance) else {
            return Ok(());
        };

        // Zero is a multiple of everything.
        if let Some(multiple_of) = node.multiple_of {
            if !value.is_zero() && violates_multiple_of(value.as_f64(), multiple_of) {
                handler.error(
                    path,
                    instance,
                    ValidationError::NotMultipleOf { multiple_of },
                )?;
            }
        }
        if let Some(maximum) = node.maximum {
            if (node.exclusive_maximum && value >= maximum) || value > maximum {
                handler.error(
                    path,
                    instance,
                    ValidationError::AboveMaximum {
                        limit: maximum.as_f64(),
                        exclusive: node.exclusive_maximum,
                    },
                )?;
            }
        }
        if let Some(minimum) = node.minimum {
            if (node.exclusive_minimum && value <= minimum) || value < minimum {
                handler.error(
                    path,
                    instance,
                    ValidationError::BelowMinimum {
                        limit: minimum.as_f64(),
                        exclusive: node.exclusive_minimum,
                    },
                )?;
            }
        }
        Ok(())
    }

    fn validate_object(
        &self,
        node: &ObjectSchema,
        instance: &Value,
        path: &str,
        handler: &mut dyn ErrorHandler,
    ) -> Result<(), Cancelled> {
        let Some(members) = instance.as_object() else {
            return Ok(());
        };

        if let Some(max_properties) = node.max_properties {
            if members.len() > max_properties {
                handler.error(
                    path,
                    instance,
                    ValidationError::TooManyProperties {
                        count: members.len(),
                        max_properties,
                    },
                )?;
            }
        }
        if let Some(min_properties) = node.min_properties {
            if members.len() < min_properties {
                handler.error(
                    path,
                    instance,
                    ValidationError::TooFewProperties {
                        count: members.len(),
                        min_properties,
                    },
                )?;
            }
        }
        for name in &node.required {
            if !members.contains_key(name) {
                handler.error(
                    path,
                    instance,
                    ValidationError::MissingRequired {
                        property: name.clone(),
                    },
                )?;
            }
        }

        for (key, value) in members {
            if let Some(property_names) = node.property_names {
                let name = Value::String(key.clone());
                let mut trial = Scratch::default();
                self.validate(property_names, &name, path, &mut trial)?;
                if trial.failed() {
                    handler.error(
                        path,
                        instance,
                        ValidationError::PropertyNameInvalid { name: key.clone() },
                    )?;
                }
            }

            let member_path = format!("{path}/{key}");
            let mut matched = false;
            if let Some(&sub) = node.properties.get(key) {
                matched = true;
                self.validate(sub, value, &member_path, handler)?;
            }
            for (pattern, sub) in &node.pattern_properties {
                if pattern.matches(key) {
                    matched = true;
                    self.validate(*sub, value, &member_path, handler)?;
                }
            }
            // additionalProperties is the fallback when neither properties
            // nor any pattern matched.
            if !matched {
                if let Some(additional) = node.additional_properties {
                    self.validate(additional, value, &member_path, handler)?;
                }
            }
        }

        for (trigger, dependent) in &node.dependencies {
            if members.contains_key(trigger) {
                // Dependent schemas see the whole object.
                self.validate(*dependent, instance, path, handler)?;
            }
        }
        Ok(())
    }

    fn validate_array(
        &self,
        node: &ArraySchema,
        instance: &Value,
        path: &str,
        handler: &mut dyn ErrorHandler,
    ) -> Result<(), Cancelled> {
        let Some(elements) = instance.as_array() else {
            return Ok(());
        };

        if let Some(max_items) = node.max_items {
            if elements.len() > max_items {
                handler.error(
                    path,
                    instance,
                    ValidationError::TooManyItems {
                        count: elements.len(),
                        max_items,
                    },
                )?;
            }
        }
        if let Some(min_items) = node.min_items {
            if elements.len() < min_items {
                handler.error(
                    path,
                    instance,
                    ValidationError::TooFewItems {
                        count: elements.len(),
                        min_items,
                    },
                )?;
            }
        }
        if node.unique_items {
            for (index, element) in elements.iter().enumerate() {
                if elements[index + 1..].iter().any(|other| json_eq(element, other)) {
                    handler.error(path, instance, ValidationError::NotUnique)?;
                }
            }
        }

        if let Some(single) = node.items_schema {
            for (index, element) in elements.iter().enumerate() {
                self.validate(single, element, &format!("{path}/{index}"), handler)?;
            }
        } else {
            let mut positional = node.items.iter();
            for (index, element) in elements.iter().enumerate() {
                let sub = match positional.next() {
                    Some(&sub) => Some(sub),
                    None => node.additional_items,
                };
                let Some(sub) = sub else {
                    break;
                };
                self.validate(sub, element, &format!("{path}/{index}"), handler)?;
            }
        }

        if let Some(contains) = node.contains {
            let mut contained = false;
            for element in elements {
                let mut trial = Scratch::default();
                self.validate(contains, element, path, &mut trial)?;
                if trial.passed() {
                    contained = true;
                    break;
                }
            }
            if !contained {
                handler.error(path, instance, ValidationError::ContainsNothing)?;
            }
        }
        Ok(())
    }
}

/// Count Unicode code points without decoding: every byte that is not a
/// UTF-8 continuation byte starts a code point.
fn code_points(text: &str) -> usize {
    text.bytes().filter(|b| b & 0xc0 != 0x80).count()
}

/// `|x − trunc(x/m)·m|` against the floating-point epsilon, unscaled.
fn violates_multiple_of(value: f64, multiple_of: f64) -> bool {
    let quotient = (value / multiple_of).trunc();
    (value - quotient * multiple_of).abs() > f64::EPSILON
}

/// Structural equality with numeric unification across the JSON number
/// representations (`1 == 1.0`).
pub(crate) fn json_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            if let (Some(i), Some(j)) = (x.as_i64(), y.as_i64()) {
                i == j
            } else if let (Some(i), Some(j)) = (x.as_u64(), y.as_u64()) {
                i == j
            } else {
                x.as_f64() == y.as_f64()
            }
        }
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(v, w)| json_eq(v, w))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(k, v)| y.get(k).is_some_and(|w| json_eq(v, w)))
        }
        _ => a == b,
    }
}
