//! Schema compiler
//!
//! Walks a raw schema fragment and produces validator nodes, registering
//! every node under all URIs it is known by (document position plus any
//! `$id` in scope) and stashing unrecognized keys as unknown-keyword
//! fragments for later `$ref` promotion.

use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::error::{BuildError, Result};
use crate::nodes::{
    ArraySchema, Combinator, CompiledPattern, Conditional, InstanceType, NodeId, NumericSchema,
    NumericValue, ObjectSchema, SchemaNode, StringSchema, TypeSchema,
};
use crate::registry::SchemaRegistry;
use crate::uri::SchemaUri;

/// Compile a schema fragment at the given URI stack, after extending every
/// URI by the additional pointer tokens in `keys`.
pub(crate) fn compile(
    raw: &Value,
    keys: &[&str],
    mut uris: Vec<SchemaUri>,
    registry: &mut SchemaRegistry,
) -> Result<NodeId> {
    for key in keys {
        for uri in &mut uris {
            *uri = uri.append(key);
        }
    }

    match raw {
        Value::Bool(accept) => {
            let id = registry.alloc(SchemaNode::Boolean(*accept));
            for uri in &uris {
                registry.insert(uri, id)?;
            }
            Ok(id)
        }
        Value::Object(schema) => compile_object(schema, uris, registry),
        _ => Err(BuildError::invalid_schema(
            position(&uris),
            "schema must be an object or a boolean",
        )),
    }
}

fn compile_object(
    schema: &Map<String, Value>,
    mut uris: Vec<SchemaUri>,
    registry: &mut SchemaRegistry,
) -> Result<NodeId> {
    // Annotation-only keywords carry no constraints and are dropped.
    let mut consumed: HashSet<&'static str> =
        HashSet::from(["$schema", "default", "title", "description"]);

    // $id makes this schema addressable under an additional URI.
    if let Some(value) = schema.get("$id") {
        consumed.insert("$id");
        let id = value
            .as_str()
            .ok_or_else(|| keyword_error("$id", &uris, "expected a string"))?;
        let derived = base(&uris).derive(id);
        if !uris.contains(&derived) {
            uris.push(derived);
        }
    }

    // Definitions are compiled for reference resolution only; nothing in
    // the parent node links to them.
    if let Some(value) = schema.get("definitions") {
        consumed.insert("definitions");
        let definitions = value
            .as_object()
            .ok_or_else(|| keyword_error("definitions", &uris, "expected an object"))?;
        for (name, definition) in definitions {
            compile(definition, &["definitions", name.as_str()], uris.clone(), registry)?;
        }
    }

    let id = if let Some(value) = schema.get("$ref") {
        // The reference replaces any sibling keywords; they stay behind as
        // unknown-keyword fragments. It is resolved against the last URI on
        // the stack, i.e. the innermost $id in scope.
        consumed.insert("$ref");
        let reference = value
            .as_str()
            .ok_or_else(|| keyword_error("$ref", &uris, "expected a string"))?;
        let target = base(&uris).derive(reference);
        registry.get_or_create_ref(&target)?
    } else {
        let node = build_type_schema(schema, &uris, registry, &mut consumed)?;
        registry.alloc(SchemaNode::Type(Box::new(node)))
    };

    for uri in &uris {
        registry.insert(uri, id)?;
        for (key, value) in schema {
            if !consumed.contains(key.as_str()) {
                registry.insert_unknown_keyword(uri, key, value)?;
            }
        }
    }
    Ok(id)
}

fn build_type_schema(
    schema: &Map<String, Value>,
    uris: &[SchemaUri],
    registry: &mut SchemaRegistry,
    consumed: &mut HashSet<&'static str>,
) -> Result<TypeSchema> {
    let mut node = TypeSchema::default();

    match schema.get("type") {
        // No type keyword: every instance type is possible.
        None => {
            for ty in InstanceType::ALL {
                node.types[ty.index()] = Some(build_for_type(schema, ty, uris, registry, consumed)?);
            }
        }
        Some(Value::String(name)) => {
            consumed.insert("type");
            for ty in types_for_name(name) {
                node.types[ty.index()] =
                    Some(build_for_type(schema, *ty, uris, registry, consumed)?);
            }
        }
        Some(Value::Array(names)) => {
            consumed.insert("type");
            for name in names {
                if let Some(name) = name.as_str() {
                    for ty in types_for_name(name) {
                        node.types[ty.index()] =
                            Some(build_for_type(schema, *ty, uris, registry, consumed)?);
                    }
                }
            }
        }
        Some(_) => {
            consumed.insert("type");
        }
    }

    // Integers are numbers too: if only a number validator exists, it also
    // covers integer and unsigned instances.
    if node.types[InstanceType::Float.index()].is_some()
        && node.types[InstanceType::Integer.index()].is_none()
    {
        node.types[InstanceType::Integer.index()] = node.types[InstanceType::Float.index()];
        node.types[InstanceType::Unsigned.index()] = node.types[InstanceType::Float.index()];
    }

    if let Some(value) = schema.get("enum") {
        consumed.insert("enum");
        let members = value
            .as_array()
            .ok_or_else(|| keyword_error("enum", uris, "expected an array"))?;
        node.enumeration = Some(members.clone());
    }

    if let Some(value) = schema.get("const") {
        consumed.insert("const");
        node.constant = Some(value.clone());
    }

    if let Some(value) = schema.get("not") {
        consumed.insert("not");
        let sub = compile(value, &["not"], uris.to_vec(), registry)?;
        node.logic.push(registry.alloc(SchemaNode::Not(sub)));
    }

    for (keyword, mode) in [
        ("allOf", Combinator::AllOf),
        ("anyOf", Combinator::AnyOf),
        ("oneOf", Combinator::OneOf),
    ] {
        if let Some(value) = schema.get(keyword) {
            consumed.insert(keyword);
            let members = value
                .as_array()
                .ok_or_else(|| keyword_error(keyword, uris, "expected an array"))?;
            let mut subschemas = Vec::with_capacity(members.len());
            for (index, sub) in members.iter().enumerate() {
                let index = index.to_string();
                subschemas.push(compile(
                    sub,
                    &[keyword, index.as_str()],
                    uris.to_vec(),
                    registry,
                )?);
            }
            node.logic
                .push(registry.alloc(SchemaNode::Combination { mode, subschemas }));
        }
    }

    if let Some(condition) = schema.get("if") {
        consumed.insert("if");
        // The condition only takes effect with a branch to pick; a bare
        // `if` is still compiled so it stays addressable.
        if schema.contains_key("then") || schema.contains_key("else") {
            let condition = compile(condition, &["if"], uris.to_vec(), registry)?;
            let then_branch = match schema.get("then") {
                Some(branch) => {
                    consumed.insert("then");
                    Some(compile(branch, &["then"], uris.to_vec(), registry)?)
                }
                None => None,
            };
            let else_branch = match schema.get("else") {
                Some(branch) => {
                    consumed.insert("else");
                    Some(compile(branch, &["else"], uris.to_vec(), registry)?)
                }
                None => None,
            };
            node.conditional = Some(Conditional {
                condition,
                then_branch,
                else_branch,
            });
        } else {
            compile(condition, &["if"], uris.to_vec(), registry)?;
        }
    }

    Ok(node)
}

fn build_for_type(
    schema: &Map<String, Value>,
    ty: InstanceType,
    uris: &[SchemaUri],
    registry: &mut SchemaRegistry,
    consumed: &mut HashSet<&'static str>,
) -> Result<NodeId> {
    let node = match ty {
        InstanceType::Null => SchemaNode::Null,
        InstanceType::Boolean => SchemaNode::BooleanType,
        InstanceType::Integer => SchemaNode::Integer(numeric_schema(schema, uris, consumed)?),
        InstanceType::Unsigned => SchemaNode::Unsigned(numeric_schema(schema, uris, consumed)?),
        InstanceType::Float => SchemaNode::Float(numeric_schema(schema, uris, consumed)?),
        InstanceType::String => SchemaNode::String(string_schema(schema, uris, consumed)?),
        InstanceType::Array => SchemaNode::Array(array_schema(schema, uris, registry, consumed)?),
        InstanceType::Object => {
            SchemaNode::Object(Box::new(object_schema(schema, uris, registry, consumed)?))
        }
    };
    Ok(registry.alloc(node))
}

fn numeric_schema<T: NumericValue>(
    schema: &Map<String, Value>,
    uris: &[SchemaUri],
    consumed: &mut HashSet<&'static str>,
) -> Result<NumericSchema<T>> {
    let mut node = NumericSchema::default();

    if let Some(value) = schema.get("maximum") {
        consumed.insert("maximum");
        node.maximum = Some(bound("maximum", value, uris)?);
    }
    if let Some(value) = schema.get("minimum") {
        consumed.insert("minimum");
        node.minimum = Some(bound("minimum", value, uris)?);
    }
    // Draft-07 exclusive bounds are numbers and take precedence over the
    // inclusive form.
    if let Some(value) = schema.get("exclusiveMaximum") {
        consumed.insert("exclusiveMaximum");
        node.maximum = Some(bound("exclusiveMaximum", value, uris)?);
        node.exclusive_maximum = true;
    }
    if let Some(value) = schema.get("exclusiveMinimum") {
        consumed.insert("exclusiveMinimum");
        node.minimum = Some(bound("exclusiveMinimum", value, uris)?);
        node.exclusive_minimum = true;
    }
    if let Some(value) = schema.get("multipleOf") {
        consumed.insert("multipleOf");
        node.multiple_of = Some(
            value
                .as_f64()
                .ok_or_else(|| keyword_error("multipleOf", uris, "expected a number"))?,
        );
    }
    Ok(node)
}

fn string_schema(
    schema: &Map<String, Value>,
    uris: &[SchemaUri],
    consumed: &mut HashSet<&'static str>,
) -> Result<StringSchema> {
    let mut node = StringSchema::default();

    if let Some(value) = schema.get("maxLength") {
        consumed.insert("maxLength");
        node.max_length = Some(count_bound("maxLength", value, uris)?);
    }
    if let Some(value) = schema.get("minLength") {
        consumed.insert("minLength");
        node.min_length = Some(count_bound("minLength", value, uris)?);
    }
    if let Some(value) = schema.get("pattern") {
        consumed.insert("pattern");
        let source = value
            .as_str()
            .ok_or_else(|| keyword_error("pattern", uris, "expected a string"))?;
        node.pattern = Some(CompiledPattern::new(source)?);
    }
    if let Some(value) = schema.get("format") {
        consumed.insert("format");
        let format = value
            .as_str()
            .ok_or_else(|| keyword_error("format", uris, "expected a string"))?;
        node.format = Some(format.to_string());
    }
    Ok(node)
}

fn object_schema(
    schema: &Map<String, Value>,
    uris: &[SchemaUri],
    registry: &mut SchemaRegistry,
    consumed: &mut HashSet<&'static str>,
) -> Result<ObjectSchema> {
    let mut node = ObjectSchema::default();

    if let Some(value) = schema.get("maxProperties") {
        consumed.insert("maxProperties");
        node.max_properties = Some(count_bound("maxProperties", value, uris)?);
    }
    if let Some(value) = schema.get("minProperties") {
        consumed.insert("minProperties");
        node.min_properties = Some(count_bound("minProperties", value, uris)?);
    }
    if let Some(value) = schema.get("required") {
        consumed.insert("required");
        node.required = name_list("required", value, uris)?;
    }
    if let Some(value) = schema.get("properties") {
        consumed.insert("properties");
        let properties = value
            .as_object()
            .ok_or_else(|| keyword_error("properties", uris, "expected an object"))?;
        for (name, sub) in properties {
            let id = compile(sub, &["properties", name.as_str()], uris.to_vec(), registry)?;
            node.properties.insert(name.clone(), id);
        }
    }
    if let Some(value) = schema.get("patternProperties") {
        consumed.insert("patternProperties");
        let properties = value
            .as_object()
            .ok_or_else(|| keyword_error("patternProperties", uris, "expected an object"))?;
        for (pattern, sub) in properties {
            let compiled = CompiledPattern::new(pattern)?;
            let id = compile(sub, &[pattern.as_str()], uris.to_vec(), registry)?;
            node.pattern_properties.push((compiled, id));
        }
    }
    if let Some(value) = schema.get("additionalProperties") {
        consumed.insert("additionalProperties");
        node.additional_properties =
            Some(compile(value, &["additionalProperties"], uris.to_vec(), registry)?);
    }
    if let Some(value) = schema.get("dependencies") {
        consumed.insert("dependencies");
        let dependencies = value
            .as_object()
            .ok_or_else(|| keyword_error("dependencies", uris, "expected an object"))?;
        for (trigger, dependent) in dependencies {
            // An array of names is a required-validator over the whole
            // instance; anything else is a sub-schema.
            let id = match dependent {
                Value::Array(_) => {
                    registry.alloc(SchemaNode::Required(name_list("dependencies", dependent, uris)?))
                }
                _ => compile(
                    dependent,
                    &["dependencies", trigger.as_str()],
                    uris.to_vec(),
                    registry,
                )?,
            };
            node.dependencies.insert(trigger.clone(), id);
        }
    }
    if let Some(value) = schema.get("propertyNames") {
        consumed.insert("propertyNames");
        node.property_names = Some(compile(value, &["propertyNames"], uris.to_vec(), registry)?);
    }
    Ok(node)
}

fn array_schema(
    schema: &Map<String, Value>,
    uris: &[SchemaUri],
    registry: &mut SchemaRegistry,
    consumed: &mut HashSet<&'static str>,
) -> Result<ArraySchema> {
    let mut node = ArraySchema::default();

    if let Some(value) = schema.get("maxItems") {
        consumed.insert("maxItems");
        node.max_items = Some(count_bound("maxItems", value, uris)?);
    }
    if let Some(value) = schema.get("minItems") {
        consumed.insert("minItems");
        node.min_items = Some(count_bound("minItems", value, uris)?);
    }
    if let Some(value) = schema.get("uniqueItems") {
        consumed.insert("uniqueItems");
        node.unique_items = value
            .as_bool()
            .ok_or_else(|| keyword_error("uniqueItems", uris, "expected a boolean"))?;
    }
    match schema.get("items") {
        Some(Value::Array(positional)) => {
            consumed.insert("items");
            for (index, sub) in positional.iter().enumerate() {
                let index = index.to_string();
                node.items.push(compile(
                    sub,
                    &["items", index.as_str()],
                    uris.to_vec(),
                    registry,
                )?);
            }
            // additionalItems only applies alongside the positional form.
            if let Some(additional) = schema.get("additionalItems") {
                consumed.insert("additionalItems");
                node.additional_items =
                    Some(compile(additional, &["additionalItems"], uris.to_vec(), registry)?);
            }
        }
        Some(single) => {
            consumed.insert("items");
            node.items_schema = Some(compile(single, &["items"], uris.to_vec(), registry)?);
        }
        None => {}
    }
    if let Some(value) = schema.get("contains") {
        consumed.insert("contains");
        node.contains = Some(compile(value, &["contains"], uris.to_vec(), registry)?);
    }
    Ok(node)
}

fn types_for_name(name: &str) -> &'static [InstanceType] {
    match name {
        "null" => &[InstanceType::Null],
        "boolean" => &[InstanceType::Boolean],
        "integer" => &[InstanceType::Integer, InstanceType::Unsigned],
        "number" => &[InstanceType::Float],
        "string" => &[InstanceType::String],
        "array" => &[InstanceType::Array],
        "object" => &[InstanceType::Object],
        _ => &[],
    }
}

/// The URI the reference machinery resolves against: the innermost `$id`.
fn base(uris: &[SchemaUri]) -> SchemaUri {
    uris.last().cloned().unwrap_or_else(|| SchemaUri::parse("#"))
}

/// The document-position URI, used in diagnostics.
fn position(uris: &[SchemaUri]) -> String {
    uris.first().map(SchemaUri::to_string).unwrap_or_default()
}

fn keyword_error(keyword: &'static str, uris: &[SchemaUri], reason: &str) -> BuildError {
    BuildError::invalid_keyword(keyword, position(uris), reason)
}

fn bound<T: NumericValue>(keyword: &'static str, value: &Value, uris: &[SchemaUri]) -> Result<T> {
    T::from_bound(value).ok_or_else(|| keyword_error(keyword, uris, "expected a number"))
}

fn name_list(keyword: &'static str, value: &Value, uris: &[SchemaUri]) -> Result<Vec<String>> {
    let members = value
        .as_array()
        .ok_or_else(|| keyword_error(keyword, uris, "expected an array of strings"))?;
    members
        .iter()
        .map(|member| {
            member
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| keyword_error(keyword, uris, "expected an array of strings"))
        })
        .collect()
}

fn count_bound(keyword: &'static str, value: &Value, uris: &[SchemaUri]) -> Result<usize> {
    value
        .as_u64()
        .map(|n| n as usize)
        .or_else(|| {
            value
                .as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= 0.0)
                .map(|f| f as usize)
        })
        .ok_or_else(|| keyword_error(keyword, uris, "expected an unsigned integer"))
}
