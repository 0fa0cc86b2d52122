//! JSON Schema draft-07 validation engine
//!
//! This crate compiles a schema document into a tree of validator nodes,
//! resolving `$ref` references within and across documents, and applies the
//! compiled tree to instances. It supports the draft-07 keyword set:
//! `type`, `enum`, `const`, `properties`, `patternProperties`,
//! `additionalProperties`, `items`/`additionalItems`, `contains`,
//! `allOf`/`anyOf`/`oneOf`/`not`, `if`/`then`/`else`, `$ref`, `$id`,
//! `definitions`, numeric bounds, string constraints, and
//! `required`/`dependencies`.
//!
//! External documents are fetched through an injected loader callback;
//! `format` keywords are dispatched to an injected format checker. Both are
//! optional.
//!
//! ```
//! use serde_json::json;
//!
//! let mut validator = jschema::Validator::new();
//! validator
//!     .set_root_schema(&json!({"type": "integer", "minimum": 0}))
//!     .expect("schema compiles");
//!
//! assert!(validator.validate(&json!(5)).is_ok());
//! assert!(validator.validate(&json!(-1)).is_err());
//! ```

mod compiler;
mod engine;
pub mod error;
mod nodes;
mod registry;
pub mod report;
mod resolver;
pub mod uri;

use serde_json::Value;
use tracing::debug;

pub use error::{BuildError, Result};
pub use report::{
    Cancelled, ErrorCollector, ErrorHandler, FailFast, ValidationError, ValidationIssue,
};
pub use uri::{JsonPointer, SchemaUri};

use engine::Engine;
use nodes::NodeId;
use registry::SchemaRegistry;

/// Loader callback: fetch the raw schema document at a location.
pub type SchemaLoader =
    dyn Fn(&SchemaUri) -> std::result::Result<Value, Box<dyn std::error::Error + Send + Sync>>
        + Send
        + Sync;

/// Format checker callback: `(format_name, string_value)` → ok or message.
pub type FormatChecker =
    dyn Fn(&str, &str) -> std::result::Result<(), String> + Send + Sync;

/// A draft-07 schema validator.
///
/// Build once with [`set_root_schema`](Validator::set_root_schema), then
/// validate any number of instances. After a successful build the validator
/// is immutable; concurrent validations against disjoint handlers are safe.
#[derive(Default)]
pub struct Validator {
    registry: SchemaRegistry,
    root: Option<NodeId>,
    loader: Option<Box<SchemaLoader>>,
    format_checker: Option<Box<FormatChecker>>,
}

impl Validator {
    /// Create a validator with no loader and no format checker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a loader for external `$ref` targets.
    #[must_use]
    pub fn with_loader<F>(mut self, loader: F) -> Self
    where
        F: Fn(&SchemaUri) -> std::result::Result<Value, Box<dyn std::error::Error + Send + Sync>>
            + Send
            + Sync
            + 'static,
    {
        self.loader = Some(Box::new(loader));
        self
    }

    /// Attach a checker for `format` keywords.
    #[must_use]
    pub fn with_format_checker<F>(mut self, checker: F) -> Self
    where
        F: Fn(&str, &str) -> std::result::Result<(), String> + Send + Sync + 'static,
    {
        self.format_checker = Some(Box::new(checker));
        self
    }

    /// Compile `schema` as the root schema and resolve references to
    /// fixpoint, loading external documents through the loader.
    ///
    /// # Errors
    ///
    /// Any [`BuildError`]: duplicate registrations, invalid keywords or
    /// patterns, an external reference without a loader, or a loader
    /// failure. Build errors are fatal; the validator should be discarded.
    pub fn set_root_schema(&mut self, schema: &Value) -> Result<()> {
        let root = compiler::compile(schema, &[], vec![SchemaUri::parse("#")], &mut self.registry)?;
        resolver::resolve_external(&mut self.registry, self.loader.as_deref())?;
        debug!("root schema compiled");
        self.root = Some(root);
        Ok(())
    }

    /// Validate an instance, stopping at the first error.
    ///
    /// # Errors
    ///
    /// The first [`ValidationIssue`] encountered in traversal order.
    pub fn validate(&self, instance: &Value) -> std::result::Result<(), ValidationIssue> {
        let mut handler = FailFast::new();
        self.validate_with(instance, &mut handler);
        match handler.first {
            Some(issue) => Err(issue),
            None => Ok(()),
        }
    }

    /// Validate an instance, delivering every error to `handler` in
    /// traversal order. The handler may cancel by returning
    /// [`Cancelled`]; the engine then stops without further traversal.
    pub fn validate_with(&self, instance: &Value, handler: &mut dyn ErrorHandler) {
        let engine = Engine::new(&self.registry, self.format_checker.as_deref());
        // Cancellation is the handler's own request; it is not an error of
        // the engine.
        let _ = match self.root {
            Some(root) => engine.validate(root, instance, "", handler),
            None => handler.error("", instance, ValidationError::NoRootSchema),
        };
    }
}
