//! Validator-node model
//!
//! Compiled schemas are a tree of tagged nodes stored in an arena owned by
//! the registry; sub-schema links are arena indices. Nodes are immutable
//! after compilation except for [`RefSchema`], whose target is assigned
//! exactly once when the referenced schema is inserted.

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::BuildError;

/// Index of a node in the registry arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct NodeId(pub(crate) usize);

/// Instance type tags, matching the JSON data model with the
/// integer/unsigned/float split of the number type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InstanceType {
    Null,
    Boolean,
    Integer,
    Unsigned,
    Float,
    String,
    Array,
    Object,
}

impl InstanceType {
    pub(crate) const COUNT: usize = 8;

    pub(crate) const ALL: [InstanceType; Self::COUNT] = [
        InstanceType::Null,
        InstanceType::Boolean,
        InstanceType::Integer,
        InstanceType::Unsigned,
        InstanceType::Float,
        InstanceType::String,
        InstanceType::Array,
        InstanceType::Object,
    ];

    /// Classify an instance value.
    pub(crate) fn of(value: &Value) -> Self {
        match value {
            Value::Null => InstanceType::Null,
            Value::Bool(_) => InstanceType::Boolean,
            Value::Number(n) => {
                if n.is_u64() {
                    InstanceType::Unsigned
                } else if n.is_i64() {
                    InstanceType::Integer
                } else {
                    InstanceType::Float
                }
            }
            Value::String(_) => InstanceType::String,
            Value::Array(_) => InstanceType::Array,
            Value::Object(_) => InstanceType::Object,
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }

    pub(crate) fn name(self) -> &'static str {
        match self {
            InstanceType::Null => "null",
            InstanceType::Boolean => "boolean",
            InstanceType::Integer | InstanceType::Unsigned => "integer",
            InstanceType::Float => "number",
            InstanceType::String => "string",
            InstanceType::Array => "array",
            InstanceType::Object => "object",
        }
    }
}

/// A regex compiled once at schema-compile time.
///
/// Patterns use ECMA-262 semantics with search-anywhere matching.
#[derive(Debug)]
pub(crate) struct CompiledPattern {
    pub(crate) source: String,
    regex: fancy_regex::Regex,
}

impl CompiledPattern {
    pub(crate) fn new(pattern: &str) -> Result<Self, BuildError> {
        let regex = fancy_regex::Regex::new(pattern).map_err(|e| BuildError::InvalidPattern {
            pattern: pattern.to_string(),
            source: Box::new(e),
        })?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    pub(crate) fn matches(&self, text: &str) -> bool {
        // A runtime engine error (e.g. backtracking limit) counts as a
        // non-match.
        self.regex.is_match(text).unwrap_or(false)
    }
}

/// Logical combination modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Combinator {
    AllOf,
    AnyOf,
    OneOf,
}

/// A reference placeholder: bound to its target at most once.
#[derive(Debug)]
pub(crate) struct RefSchema {
    /// The reference URI, kept for error reporting.
    pub(crate) id: String,
    pub(crate) target: Option<NodeId>,
}

/// `if`/`then`/`else` conditional.
#[derive(Debug)]
pub(crate) struct Conditional {
    pub(crate) condition: NodeId,
    pub(crate) then_branch: Option<NodeId>,
    pub(crate) else_branch: Option<NodeId>,
}

/// The root of a keyword-bearing schema: one optional per-type validator per
/// instance type, plus the type-independent keywords.
#[derive(Debug, Default)]
pub(crate) struct TypeSchema {
    /// Indexed by [`InstanceType::index`].
    pub(crate) types: [Option<NodeId>; InstanceType::COUNT],
    pub(crate) enumeration: Option<Vec<Value>>,
    pub(crate) constant: Option<Value>,
    /// `not`/`allOf`/`anyOf`/`oneOf`, in keyword order.
    pub(crate) logic: Vec<NodeId>,
    pub(crate) conditional: Option<Conditional>,
}

/// String constraints.
#[derive(Debug, Default)]
pub(crate) struct StringSchema {
    pub(crate) min_length: Option<usize>,
    pub(crate) max_length: Option<usize>,
    pub(crate) pattern: Option<CompiledPattern>,
    pub(crate) format: Option<String>,
}

/// Numeric constraints, parametric over the instance's numeric domain.
#[derive(Debug, Default)]
pub(crate) struct NumericSchema<T> {
    pub(crate) minimum: Option<T>,
    pub(crate) maximum: Option<T>,
    pub(crate) exclusive_minimum: bool,
    pub(crate) exclusive_maximum: bool,
    pub(crate) multiple_of: Option<f64>,
}

/// Conversion between JSON numbers and a concrete numeric domain.
pub(crate) trait NumericValue: Copy + PartialOrd + Default {
    /// Extract an instance value of this domain.
    fn from_instance(n: &serde_json::Number) -> Option<Self>;
    /// Convert a schema bound into this domain (truncating, as the JSON
    /// data model's number conversions do).
    fn from_bound(v: &Value) -> Option<Self>;
    fn as_f64(self) -> f64;
    fn is_zero(self) -> bool;
}

impl NumericValue for i64 {
    fn from_instance(n: &serde_json::Number) -> Option<Self> {
        n.as_i64()
    }

    fn from_bound(v: &Value) -> Option<Self> {
        v.as_i64().or_else(|| v.as_f64().map(|f| f as i64))
    }

    fn as_f64(self) -> f64 {
        self as f64
    }

    fn is_zero(self) -> bool {
        self == 0
    }
}

impl NumericValue for u64 {
    fn from_instance(n: &serde_json::Number) -> Option<Self> {
        n.as_u64()
    }

    fn from_bound(v: &Value) -> Option<Self> {
        v.as_u64().or_else(|| v.as_f64().map(|f| f as u64))
    }

    fn as_f64(self) -> f64 {
        self as f64
    }

    fn is_zero(self) -> bool {
        self == 0
    }
}

impl NumericValue for f64 {
    fn from_instance(n: &serde_json::Number) -> Option<Self> {
        n.as_f64()
    }

    fn from_bound(v: &Value) -> Option<Self> {
        v.as_f64()
    }

    fn as_f64(self) -> f64 {
        self
    }

    fn is_zero(self) -> bool {
        self == 0.0
    }
}

/// Object constraints.
#[derive(Debug, Default)]
pub(crate) struct ObjectSchema {
    pub(crate) min_properties: Option<usize>,
    pub(crate) max_properties: Option<usize>,
    pub(crate) required: Vec<String>,
    pub(crate) properties: IndexMap<String, NodeId>,
    pub(crate) pattern_properties: Vec<(CompiledPattern, NodeId)>,
    pub(crate) additional_properties: Option<NodeId>,
    /// Per trigger key: either a `Required` node (array form) or a compiled
    /// sub-schema, validated against the whole object.
    pub(crate) dependencies: IndexMap<String, NodeId>,
    pub(crate) property_names: Option<NodeId>,
}

/// Array constraints.
#[derive(Debug, Default)]
pub(crate) struct ArraySchema {
    pub(crate) min_items: Option<usize>,
    pub(crate) max_items: Option<usize>,
    pub(crate) unique_items: bool,
    /// `items` as a single sub-schema applied to every element.
    pub(crate) items_schema: Option<NodeId>,
    /// `items` as a positional sequence.
    pub(crate) items: Vec<NodeId>,
    pub(crate) additional_items: Option<NodeId>,
    pub(crate) contains: Option<NodeId>,
}

/// A compiled validator node.
#[derive(Debug)]
pub(crate) enum SchemaNode {
    /// `true` accepts everything, `false` rejects everything.
    Boolean(bool),
    Type(Box<TypeSchema>),
    Null,
    BooleanType,
    String(StringSchema),
    Integer(NumericSchema<i64>),
    Unsigned(NumericSchema<u64>),
    Float(NumericSchema<f64>),
    Object(Box<ObjectSchema>),
    Array(ArraySchema),
    Combination {
        mode: Combinator,
        subschemas: Vec<NodeId>,
    },
    Not(NodeId),
    /// A list of property names that must be present; used for the array
    /// form of `dependencies`.
    Required(Vec<String>),
    Ref(RefSchema),
}
