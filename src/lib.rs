//! # relschema
//!
//! Compiles an XML Schema (XSD) into a normalized relational table/field
//! model: tables with primary/foreign/nested keys, content classification,
//! and the structural metadata needed to later reconstruct the original
//! hierarchical document from relational rows.
//!
//! ## Features
//!
//! - Recursive extraction of tables and fields from type declarations
//! - Deferred resolution of forward-referenced attribute/model groups
//! - Deduplication and merge of structurally equivalent tables
//! - Primary/foreign/nested key derivation with parent/ancestor constraints
//! - Content-addressable hash keys (explicit digest configuration)
//! - Virtual/bridge/list-holder classification and virtual-duplication pruning
//!
//! ## Example
//!
//! ```rust,ignore
//! use relschema::{Compiler, CompilerOptions, HashAlgorithm, HashWidth};
//!
//! let options = CompilerOptions::new(HashAlgorithm::Sha256, HashWidth::Unsigned64);
//! let model = Compiler::new(options).compile_file("path/to/schema.xsd")?;
//!
//! for table in model.tables_by_dependency() {
//!     println!("{} ({} fields)", table.storage_name, table.fields.len());
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Foundation
pub mod error;
pub mod options;

// Utilities
pub mod locations;
pub mod names;
pub mod namespaces;

// Schema input
pub mod documents;
pub mod reader;

// The persisted model and the compiler passes
pub mod compiler;
pub mod model;

// Re-exports for convenience
pub use compiler::Compiler;
pub use error::{Diagnostic, Error, Result};
pub use model::{CompiledModel, Field, FieldKind, Table, TableKind};
pub use options::{CompilerOptions, HashAlgorithm, HashWidth};

/// Version of the relschema library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// XSD namespace
pub const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

/// XML namespace
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// XML Schema Instance namespace
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";
