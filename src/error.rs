//! Build-phase error types
//!
//! Errors raised while compiling a schema or resolving references are fatal
//! and terminate the build. Validation-time errors never appear here; they
//! are delivered to an [`ErrorHandler`](crate::report::ErrorHandler).

use thiserror::Error;

/// Fatal errors raised during `set_root_schema`.
#[derive(Error, Debug)]
pub enum BuildError {
    /// A schema was inserted twice at the same location and pointer.
    #[error("schema already inserted at {uri}")]
    DuplicateSchema {
        /// Full URI of the conflicting insertion
        uri: String,
    },

    /// A `$ref` points into a document that was never seen, and no loader
    /// callback was given.
    #[error("external schema reference '{location}' needs loading, but no loader callback given")]
    ExternalRefWithoutLoader {
        /// Location of the unloaded document
        location: String,
    },

    /// The loader callback failed to produce a document.
    #[error("failed to load schema document '{location}': {source}")]
    Loader {
        /// Location that was being loaded
        location: String,
        /// Error reported by the loader
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A `pattern` or `patternProperties` regex did not compile.
    #[error("invalid regex pattern '{pattern}': {source}")]
    InvalidPattern {
        /// The offending pattern source
        pattern: String,
        /// Error reported by the regex engine
        #[source]
        source: Box<fancy_regex::Error>,
    },

    /// A schema value was neither an object nor a boolean.
    #[error("invalid schema at {uri}: {reason}")]
    InvalidSchema {
        /// URI of the offending fragment
        uri: String,
        /// What was wrong with it
        reason: String,
    },

    /// A recognized keyword carried a value of the wrong shape.
    #[error("invalid value for keyword '{keyword}' at {uri}: {reason}")]
    InvalidKeyword {
        /// The keyword whose value was rejected
        keyword: String,
        /// URI of the schema holding the keyword
        uri: String,
        /// What was wrong with the value
        reason: String,
    },
}

/// Result type alias for build-phase operations.
pub type Result<T> = std::result::Result<T, BuildError>;

impl BuildError {
    /// Create a duplicate-schema error.
    #[must_use]
    pub fn duplicate_schema(uri: impl Into<String>) -> Self {
        Self::DuplicateSchema { uri: uri.into() }
    }

    /// Create an invalid-schema error.
    #[must_use]
    pub fn invalid_schema(uri: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSchema {
            uri: uri.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid-keyword error.
    #[must_use]
    pub fn invalid_keyword(
        keyword: impl Into<String>,
        uri: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidKeyword {
            keyword: keyword.into(),
            uri: uri.into(),
            reason: reason.into(),
        }
    }

    /// Create a loader error from whatever the loader callback returned.
    #[must_use]
    pub fn loader(
        location: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Loader {
            location: location.into(),
            source,
        }
    }
}
