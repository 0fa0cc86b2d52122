//! Error handler interface and validation error kinds
//!
//! Validation-time errors are delivered to an [`ErrorHandler`] in traversal
//! order. A handler may cancel the traversal by returning [`Cancelled`];
//! the engine stops immediately and returns without further work. Trial
//! validations inside combinators run against a private scratch handler so
//! they never reach the user's handler.

use std::fmt;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Returned by a handler to cancel the traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

/// A single validation-time error kind.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
pub enum ValidationError {
    /// The instance type has no validator in the schema's `type` set.
    #[error("unexpected instance type {found}")]
    UnexpectedType {
        /// Type of the instance that was rejected
        found: &'static str,
    },

    /// The instance equals no member of the `enum` array.
    #[error("instance not found in required enum")]
    EnumMismatch,

    /// The instance differs from the `const` value.
    #[error("instance differs from required constant")]
    ConstMismatch,

    /// The schema is `false` and rejects every instance.
    #[error("instance invalid as per false-schema")]
    FalseSchema,

    /// A reference placeholder was invoked before being bound.
    #[error("unresolved schema reference {id}")]
    UnresolvedRef {
        /// The reference URI
        id: String,
    },

    /// A `format` keyword is present but no format checker was provided.
    #[error("format '{format}' cannot be checked, no format checker was provided")]
    FormatWithoutChecker {
        /// The format name
        format: String,
    },

    /// The format checker rejected the instance.
    #[error("instance does not conform to format '{format}': {message}")]
    FormatViolation {
        /// The format name
        format: String,
        /// Message returned by the checker
        message: String,
    },

    /// The instance matched a negated schema.
    #[error("instance is valid, whereas it should not be as required by schema")]
    NotFailure,

    /// At least one `allOf` sub-schema failed.
    #[error("at least one subschema has failed, but all of them are required to validate")]
    AllOfFailure,

    /// No `anyOf` sub-schema passed.
    #[error("no subschema has succeeded, but any of them is required to validate")]
    AnyOfFailure,

    /// No `oneOf` sub-schema passed.
    #[error("no subschema has succeeded, but exactly one of them is required to validate")]
    OneOfNone,

    /// More than one `oneOf` sub-schema passed.
    #[error("more than one subschema has succeeded, but exactly one of them is required to validate")]
    OneOfMultiple,

    /// The string is shorter than `minLength` code points.
    #[error("string of {length} code points is too short as per minLength ({min_length})")]
    StringTooShort {
        /// Length of the instance, in code points
        length: usize,
        /// The `minLength` bound
        min_length: usize,
    },

    /// The string is longer than `maxLength` code points.
    #[error("string of {length} code points is too long as per maxLength ({max_length})")]
    StringTooLong {
        /// Length of the instance, in code points
        length: usize,
        /// The `maxLength` bound
        max_length: usize,
    },

    /// The string does not match `pattern`.
    #[error("string does not match regex pattern: {pattern}")]
    PatternMismatch {
        /// The pattern source
        pattern: String,
    },

    /// The number is below `minimum` (or `exclusiveMinimum`).
    #[error("instance is below minimum of {limit}")]
    BelowMinimum {
        /// The bound, in the validator's numeric domain
        limit: f64,
        /// Whether the bound itself is excluded
        exclusive: bool,
    },

    /// The number exceeds `maximum` (or `exclusiveMaximum`).
    #[error("instance exceeds maximum of {limit}")]
    AboveMaximum {
        /// The bound, in the validator's numeric domain
        limit: f64,
        /// Whether the bound itself is excluded
        exclusive: bool,
    },

    /// The number is not a multiple of `multipleOf`.
    #[error("instance is not a multiple of {multiple_of}")]
    NotMultipleOf {
        /// The `multipleOf` divisor
        multiple_of: f64,
    },

    /// The array has fewer than `minItems` elements.
    #[error("array of {count} items has too few items as per minItems ({min_items})")]
    TooFewItems {
        /// Number of elements in the instance
        count: usize,
        /// The `minItems` bound
        min_items: usize,
    },

    /// The array has more than `maxItems` elements.
    #[error("array of {count} items has too many items as per maxItems ({max_items})")]
    TooManyItems {
        /// Number of elements in the instance
        count: usize,
        /// The `maxItems` bound
        max_items: usize,
    },

    /// `uniqueItems` is set and two elements are equal.
    #[error("items have to be unique for this array")]
    NotUnique,

    /// No element validated against `contains`.
    #[error("array does not contain required element as per 'contains'")]
    ContainsNothing,

    /// The object has fewer than `minProperties` members.
    #[error("object of {count} properties has too few properties as per minProperties ({min_properties})")]
    TooFewProperties {
        /// Number of members in the instance
        count: usize,
        /// The `minProperties` bound
        min_properties: usize,
    },

    /// The object has more than `maxProperties` members.
    #[error("object of {count} properties has too many properties as per maxProperties ({max_properties})")]
    TooManyProperties {
        /// Number of members in the instance
        count: usize,
        /// The `maxProperties` bound
        max_properties: usize,
    },

    /// A required property is absent.
    #[error("required property '{property}' not found in object")]
    MissingRequired {
        /// The missing property name
        property: String,
    },

    /// A property key failed the `propertyNames` schema.
    #[error("property name '{name}' is invalid as per propertyNames")]
    PropertyNameInvalid {
        /// The offending key
        name: String,
    },

    /// `validate` was called before `set_root_schema`.
    #[error("no root schema has been set for validating an instance")]
    NoRootSchema,
}

impl ValidationError {
    /// Stable machine-readable code for this error kind.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::UnexpectedType { .. } => "UNEXPECTED_TYPE",
            ValidationError::EnumMismatch => "ENUM_MISMATCH",
            ValidationError::ConstMismatch => "CONST_MISMATCH",
            ValidationError::FalseSchema => "FALSE_SCHEMA",
            ValidationError::UnresolvedRef { .. } => "UNRESOLVED_REF",
            ValidationError::FormatWithoutChecker { .. } => "FORMAT_WITHOUT_CHECKER",
            ValidationError::FormatViolation { .. } => "FORMAT_VIOLATION",
            ValidationError::NotFailure => "NOT_FAILURE",
            ValidationError::AllOfFailure => "ALL_OF_FAILURE",
            ValidationError::AnyOfFailure => "ANY_OF_FAILURE",
            ValidationError::OneOfNone => "ONE_OF_NONE",
            ValidationError::OneOfMultiple => "ONE_OF_MULTIPLE",
            ValidationError::StringTooShort { .. } => "STRING_TOO_SHORT",
            ValidationError::StringTooLong { .. } => "STRING_TOO_LONG",
            ValidationError::PatternMismatch { .. } => "PATTERN_MISMATCH",
            ValidationError::BelowMinimum { .. } => "BELOW_MINIMUM",
            ValidationError::AboveMaximum { .. } => "ABOVE_MAXIMUM",
            ValidationError::NotMultipleOf { .. } => "NOT_MULTIPLE_OF",
            ValidationError::TooFewItems { .. } => "TOO_FEW_ITEMS",
            ValidationError::TooManyItems { .. } => "TOO_MANY_ITEMS",
            ValidationError::NotUnique => "NOT_UNIQUE",
            ValidationError::ContainsNothing => "CONTAINS_NOTHING",
            ValidationError::TooFewProperties { .. } => "TOO_FEW_PROPERTIES",
            ValidationError::TooManyProperties { .. } => "TOO_MANY_PROPERTIES",
            ValidationError::MissingRequired { .. } => "MISSING_REQUIRED",
            ValidationError::PropertyNameInvalid { .. } => "PROPERTY_NAME_INVALID",
            ValidationError::NoRootSchema => "NO_ROOT_SCHEMA",
        }
    }
}

/// A validation error together with the instance path it occurred at.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    /// Slash-separated path from the instance root (empty at the root)
    pub path: String,
    /// The error kind
    pub error: ValidationError,
}

impl ValidationIssue {
    /// Create a new issue.
    #[must_use]
    pub fn new(path: impl Into<String>, error: ValidationError) -> Self {
        Self {
            path: path.into(),
            error,
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "at '{}': {}", self.path, self.error)
    }
}

impl std::error::Error for ValidationIssue {}

/// Sink for validation errors, invoked in traversal order.
pub trait ErrorHandler {
    /// Record an error at `path` for `instance`.
    ///
    /// Returning `Err(Cancelled)` stops the traversal immediately.
    ///
    /// # Errors
    ///
    /// `Cancelled` when the handler wants the engine to stop.
    fn error(
        &mut self,
        path: &str,
        instance: &Value,
        error: ValidationError,
    ) -> Result<(), Cancelled>;
}

/// Collects every error; never cancels.
#[derive(Debug, Default)]
pub struct ErrorCollector {
    /// Issues in traversal order
    pub issues: Vec<ValidationIssue>,
}

impl ErrorCollector {
    /// Create an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether no error was collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }
}

impl ErrorHandler for ErrorCollector {
    fn error(
        &mut self,
        path: &str,
        _instance: &Value,
        error: ValidationError,
    ) -> Result<(), Cancelled> {
        self.issues.push(ValidationIssue::new(path, error));
        Ok(())
    }
}

/// Captures the first error and cancels the traversal, the way a throwing
/// handler aborts on first failure.
#[derive(Debug, Default)]
pub struct FailFast {
    /// The first error seen, if any
    pub first: Option<ValidationIssue>,
}

impl FailFast {
    /// Create a fresh fail-fast handler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ErrorHandler for FailFast {
    fn error(
        &mut self,
        path: &str,
        _instance: &Value,
        error: ValidationError,
    ) -> Result<(), Cancelled> {
        if self.first.is_none() {
            self.first = Some(ValidationIssue::new(path, error));
        }
        Err(Cancelled)
    }
}

/// Private trial handler for combinator pre-checks: counts failures and
/// never cancels, so transient errors stay out of the user's stream.
#[derive(Debug, Default)]
pub(crate) struct Scratch {
    errors: usize,
}

impl Scratch {
    pub(crate) fn passed(&self) -> bool {
        self.errors == 0
    }

    pub(crate) fn failed(&self) -> bool {
        self.errors != 0
    }
}

impl ErrorHandler for Scratch {
    fn error(
        &mut self,
        _path: &str,
        _instance: &Value,
        _error: ValidationError,
    ) -> Result<(), Cancelled> {
        self.errors += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_collector_keeps_order() {
        let mut collector = ErrorCollector::new();
        collector
            .error("/a", &json!(1), ValidationError::EnumMismatch)
            .expect("collector never cancels");
        collector
            .error("/b", &json!(2), ValidationError::ConstMismatch)
            .expect("collector never cancels");
        assert_eq!(collector.issues.len(), 2);
        assert_eq!(collector.issues[0].path, "/a");
        assert_eq!(collector.issues[1].error.code(), "CONST_MISMATCH");
    }

    #[test]
    fn test_fail_fast_cancels_and_keeps_first() {
        let mut handler = FailFast::new();
        let result = handler.error("/x", &json!(null), ValidationError::FalseSchema);
        assert_eq!(result, Err(Cancelled));
        let first = handler.first.expect("first error captured");
        assert_eq!(first.error, ValidationError::FalseSchema);
    }

    #[test]
    fn test_issue_display() {
        let issue = ValidationIssue::new(
            "/name",
            ValidationError::StringTooShort {
                length: 1,
                min_length: 2,
            },
        );
        let display = issue.to_string();
        assert!(display.contains("/name"));
        assert!(display.contains("minLength"));
    }

    #[test]
    fn test_scratch_counts_without_cancelling() {
        let mut scratch = Scratch::default();
        assert!(scratch.passed());
        scratch
            .error("", &json!(0), ValidationError::NotUnique)
            .expect("scratch never cancels");
        assert!(scratch.failed());
    }
}
