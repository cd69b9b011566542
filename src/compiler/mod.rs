//! The schema-to-relational compiler
//!
//! Control flow: the model builder walks the parsed document set
//! (single-threaded and depth-first, so insertion order encodes nesting
//! and dependency order), the group registry replays its pending queue,
//! the key deriver resolves table references, and the classifier assigns
//! final structural flags. The scratch context is then torn down, leaving
//! the frozen `CompiledModel`.

pub mod builder;
pub mod classify;
pub mod context;
pub mod groups;
pub mod keys;
pub mod registry;

pub use builder::ModelBuilder;
pub use context::{SchemaContext, DEFAULT_SCHEMA_GROUP};
pub use groups::{GroupKind, GroupRegistry, PendingGroup};
pub use registry::TableRegistry;

use crate::documents::SchemaDocument;
use crate::error::{Error, Result};
use crate::model::CompiledModel;
use crate::options::CompilerOptions;
use crate::reader::SchemaReader;

/// Compiles a schema document set into a relational table/field model
#[derive(Debug, Clone)]
pub struct Compiler {
    options: CompilerOptions,
}

impl Compiler {
    /// Create a compiler with the given options
    pub fn new(options: CompilerOptions) -> Self {
        Self { options }
    }

    /// Compile an already-parsed document set.
    ///
    /// The set must be closed: every included/imported document is expected
    /// to be present (the bundled reader closes local inclusion sets).
    pub fn compile(&self, documents: &[SchemaDocument]) -> Result<CompiledModel> {
        let source = documents
            .first()
            .map(|d| d.location.clone())
            .unwrap_or_default();

        let mut ctx = SchemaContext::new(self.options.clone());

        {
            let mut builder = ModelBuilder::new(&mut ctx);
            builder.build(documents)?;
        }

        groups::resolve_pending(&mut ctx.registry, &mut ctx.groups)?;

        if ctx.registry.is_empty() {
            return Err(Error::EmptyModel(source));
        }

        keys::derive(&mut ctx)?;
        classify::classify(&mut ctx);

        Ok(ctx.finish())
    }

    /// Compile a single in-memory schema document
    pub fn compile_str(&self, text: &str, location: &str) -> Result<CompiledModel> {
        let document = SchemaReader::read_str(text, location)?;
        self.compile(&[document])
    }

    /// Compile a schema file, following local includes and imports
    pub fn compile_file(&self, path: &str) -> Result<CompiledModel> {
        let mut reader = SchemaReader::new();
        let documents = reader.read_file(path)?;
        let mut model = self.compile(&documents)?;
        model.diagnostics.extend(reader.diagnostics().iter().cloned());
        Ok(model)
    }
}
