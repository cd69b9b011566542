//! Compilation scratch state
//!
//! `SchemaContext` is the process-wide state scoped to one compilation run:
//! the growing table registry, the group registry with its pending queue,
//! the namespace-prefix table, and the visited-location set. It is passed
//! explicitly to every pass and torn down when the model is finalized;
//! nothing in here leaks into the persisted `CompiledModel` except the
//! frozen table/field/key graph itself.

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::documents::SchemaDocument;
use crate::error::Diagnostic;
use crate::model::keys::{ForeignKeyDecl, HashKeyer, Key};
use crate::model::CompiledModel;
use crate::options::CompilerOptions;
use crate::compiler::groups::GroupRegistry;
use crate::compiler::registry::TableRegistry;

/// Name of the schema group used when namespace grouping is off or absent
pub const DEFAULT_SCHEMA_GROUP: &str = "default";

/// Mutable state for one compilation run.
///
/// Must not be shared across concurrent compilations of different schema
/// sets.
#[derive(Debug)]
pub struct SchemaContext {
    /// Options for this run
    pub options: CompilerOptions,
    /// The growing table set
    pub registry: TableRegistry,
    /// Group definitions and pending references
    pub groups: GroupRegistry,
    /// Identity constraints collected from `xs:key` / `xs:unique`
    pub keys: Vec<Key>,
    /// Foreign key declarations from `xs:keyref` and extension base links
    pub foreign_keys: Vec<ForeignKeyDecl>,
    /// Conservative fallbacks recorded so far
    pub diagnostics: Vec<Diagnostic>,
    /// Schema locations already walked, to break cyclic includes
    pub visited_locations: HashSet<String>,
    /// Namespace URI to assigned prefix
    pub namespace_prefixes: IndexMap<String, String>,
}

impl SchemaContext {
    /// Create fresh scratch state for one run
    pub fn new(options: CompilerOptions) -> Self {
        let case_sensitive = options.case_sensitive;
        Self {
            options,
            registry: TableRegistry::new(case_sensitive),
            groups: GroupRegistry::new(),
            keys: Vec::new(),
            foreign_keys: Vec::new(),
            diagnostics: Vec::new(),
            visited_locations: HashSet::new(),
            namespace_prefixes: IndexMap::new(),
        }
    }

    /// Schema group owning declarations of the given target namespace
    pub fn group_for_namespace(&self, namespace: Option<&str>) -> String {
        match namespace {
            Some(ns) if self.options.named_schema_grouping => ns.to_string(),
            _ => DEFAULT_SCHEMA_GROUP.to_string(),
        }
    }

    /// Schema group owning a document's declarations
    pub fn schema_group_of(&self, document: &SchemaDocument) -> String {
        self.group_for_namespace(document.target_namespace.as_deref())
    }

    /// Assign a prefix to a namespace, reusing a source-declared prefix
    /// when one is known, otherwise generating `ns{N}` deterministically.
    pub fn assign_prefix(&mut self, namespace: &str, declared: Option<&str>) {
        if self.namespace_prefixes.contains_key(namespace) {
            return;
        }
        let prefix = match declared {
            Some(p) if !p.is_empty() => p.to_string(),
            _ => format!("ns{}", self.namespace_prefixes.len() + 1),
        };
        self.namespace_prefixes.insert(namespace.to_string(), prefix);
    }

    /// Tear down the scratch state, freezing the compiled model.
    pub fn finish(self) -> CompiledModel {
        CompiledModel {
            tables: self.registry.into_tables(),
            keys: self.keys,
            foreign_keys: self.foreign_keys,
            namespace_prefixes: self.namespace_prefixes,
            diagnostics: self.diagnostics,
            hash: HashKeyer::new(self.options.hash_algorithm, self.options.hash_width),
            relational_extension: self.options.relational_extension,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{HashAlgorithm, HashWidth};

    fn options() -> CompilerOptions {
        CompilerOptions::new(HashAlgorithm::Sha256, HashWidth::Unsigned64)
    }

    #[test]
    fn test_group_for_namespace() {
        let ctx = SchemaContext::new(options());
        assert_eq!(ctx.group_for_namespace(Some("http://a")), "http://a");
        assert_eq!(ctx.group_for_namespace(None), DEFAULT_SCHEMA_GROUP);

        let flat = SchemaContext::new(options().with_named_schema_grouping(false));
        assert_eq!(flat.group_for_namespace(Some("http://a")), DEFAULT_SCHEMA_GROUP);
    }

    #[test]
    fn test_prefix_assignment_is_stable() {
        let mut ctx = SchemaContext::new(options());
        ctx.assign_prefix("http://a", Some("po"));
        ctx.assign_prefix("http://b", None);
        ctx.assign_prefix("http://a", Some("other"));

        assert_eq!(ctx.namespace_prefixes.get("http://a").unwrap(), "po");
        assert_eq!(ctx.namespace_prefixes.get("http://b").unwrap(), "ns2");
    }
}
