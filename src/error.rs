//! Error types for relschema
//!
//! This module defines all error types used throughout the library.
//! Structural ambiguities with a safe degraded interpretation are handled
//! locally and surfaced as diagnostics on the compiled model; the variants
//! here are the conditions with no safe fallback.

use std::fmt;
use thiserror::Error;

/// Result type alias using relschema Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for relschema operations
#[derive(Error, Debug)]
pub enum Error {
    /// Schema compilation error with declaration context
    #[error("compile error: {0}")]
    Compile(#[from] CompileError),

    /// No non-abstract root element declaration was found in the schema set
    #[error("no root element declaration found in '{0}'")]
    MissingRootDeclaration(String),

    /// A group was referenced but never defined anywhere in the closed
    /// inclusion set
    #[error("unresolved group reference '{name}' (referenced from table '{referencing_table}')")]
    UnresolvedGroupReference {
        /// Declared name of the missing group
        name: String,
        /// Canonical name of the table that referenced it
        referencing_table: String,
    },

    /// A keyref-style foreign key whose target key declaration cannot be
    /// found
    #[error("unresolved key reference '{refer}' for keyref '{name}'")]
    UnresolvedKeyReference {
        /// Name of the keyref declaration
        name: String,
        /// Name of the key it refers to
        refer: String,
    },

    /// No table survived extraction
    #[error("empty model: no table survived extraction from '{0}'")]
    EmptyModel(String),

    /// Name error (invalid XML name)
    #[error("name error: {0}")]
    Name(String),

    /// Namespace error
    #[error("namespace error: {0}")]
    Namespace(String),

    /// Schema source could not be read or parsed
    #[error("resource error: {0}")]
    Resource(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// XML parsing error from the bundled reader
    #[error("XML error: {0}")]
    Xml(String),

    /// URL parsing error
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

/// Schema compilation error with declaration and source context
#[derive(Debug, Clone)]
pub struct CompileError {
    /// Error message
    pub message: String,
    /// Name of the offending declaration
    pub declaration: Option<String>,
    /// Source location of the schema document
    pub location: Option<String>,
}

impl CompileError {
    /// Create a new compile error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            declaration: None,
            location: None,
        }
    }

    /// Set the offending declaration name
    pub fn with_declaration(mut self, declaration: impl Into<String>) -> Self {
        self.declaration = Some(declaration.into());
        self
    }

    /// Set the schema source location
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(ref decl) = self.declaration {
            write!(f, "\n\nDeclaration: {}", decl)?;
        }

        if let Some(ref loc) = self.location {
            write!(f, "\n\nLocation: {}", loc)?;
        }

        Ok(())
    }
}

impl std::error::Error for CompileError {}

/// Non-fatal condition recorded during compilation.
///
/// Every conservative fallback the compiler takes is recorded here so that
/// callers can inspect (or reject) degraded output.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub enum Diagnostic {
    /// A cyclic include/import was skipped
    CyclicInclude {
        /// Location of the repeated schema document
        location: String,
    },
    /// Two incompatible declarations collapsed to the same table name;
    /// conflicting required fields were downgraded to optional
    AmbiguousTableCollision {
        /// Canonical name of the colliding table
        table: String,
    },
    /// A nested-key field pointed at a table that was discarded or never
    /// registered; the field was dropped
    DroppedNestedKey {
        /// Canonical name of the owning table
        table: String,
        /// Name of the dropped field
        field: String,
    },
    /// A table was discarded for having fewer content fields than the
    /// configured minimum
    DiscardedSmallTable {
        /// Canonical name of the discarded table
        table: String,
        /// Number of content fields it had
        fields: usize,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::CyclicInclude { location } => {
                write!(f, "cyclic include skipped: {}", location)
            }
            Diagnostic::AmbiguousTableCollision { table } => {
                write!(
                    f,
                    "ambiguous collision on table '{}': required fields downgraded",
                    table
                )
            }
            Diagnostic::DroppedNestedKey { table, field } => {
                write!(f, "dropped unresolved nested key '{}.{}'", table, field)
            }
            Diagnostic::DiscardedSmallTable { table, fields } => {
                write!(f, "discarded table '{}' with {} content field(s)", table, fields)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_error_display() {
        let err = CompileError::new("group 'attrs' resolved into an unresolved group")
            .with_declaration("attrs")
            .with_location("schema.xsd");

        let msg = format!("{}", err);
        assert!(msg.contains("unresolved group"));
        assert!(msg.contains("Declaration: attrs"));
        assert!(msg.contains("Location: schema.xsd"));
    }

    #[test]
    fn test_error_conversion() {
        let compile_err = CompileError::new("test");
        let err: Error = compile_err.into();
        assert!(matches!(err, Error::Compile(_)));
    }

    #[test]
    fn test_unresolved_group_message() {
        let err = Error::UnresolvedGroupReference {
            name: "headerAttrs".to_string(),
            referencing_table: "Order".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("headerAttrs"));
        assert!(msg.contains("Order"));
    }

    #[test]
    fn test_diagnostic_display() {
        let diag = Diagnostic::DroppedNestedKey {
            table: "Order".to_string(),
            field: "item".to_string(),
        };
        assert_eq!(
            format!("{}", diag),
            "dropped unresolved nested key 'Order.item'"
        );
    }
}
