//! The persisted relational model
//!
//! Everything under this module survives compilation: tables, fields, key
//! declarations, and the frozen `CompiledModel` handed to downstream
//! collaborators (DDL emitters, document writers, indexers). Build-time
//! scratch state lives in `compiler::context` and never leaks here.

pub mod field;
pub mod keys;
pub mod stats;
pub mod table;

pub use field::{Field, FieldKind, Restriction, ScalarKind};
pub use keys::{ForeignKeyDecl, HashKeyer, Key, KeyValue};
pub use stats::ModelStats;
pub use table::{Table, TableKind};

use indexmap::IndexMap;

use crate::error::Diagnostic;

/// The finalized, immutable table/field graph of one compilation run.
///
/// Foreign-table pointers are indices into `tables`, not live references,
/// so the graph can be shared freely once frozen.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CompiledModel {
    /// All tables, in registry insertion order
    pub tables: Vec<Table>,
    /// Identity constraints from `xs:key` / `xs:unique`
    pub keys: Vec<Key>,
    /// Foreign key declarations (keyrefs and extension base links)
    pub foreign_keys: Vec<ForeignKeyDecl>,
    /// Namespace URI to assigned prefix
    pub namespace_prefixes: IndexMap<String, String>,
    /// Conservative fallbacks recorded during compilation
    pub diagnostics: Vec<Diagnostic>,
    /// Content-addressable key configuration
    pub hash: HashKeyer,
    /// Bridge/virtual tables participate in the writable model
    pub relational_extension: bool,
}

impl CompiledModel {
    /// Look up a table by schema group and canonical name
    pub fn table_by_name(&self, schema_group: &str, canonical_name: &str) -> Option<&Table> {
        self.tables
            .iter()
            .find(|t| t.schema_group == schema_group && t.canonical_name == canonical_name)
    }

    /// Look up a table by canonical name in any schema group
    pub fn table_by_canonical_name(&self, canonical_name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.canonical_name == canonical_name)
    }

    /// Look up a table by normalized storage name
    pub fn table_by_storage_name(&self, storage_name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.storage_name == storage_name)
    }

    /// Look up a table by numeric id (registry index)
    pub fn table(&self, id: usize) -> Option<&Table> {
        self.tables.get(id)
    }

    /// Resolve the foreign table a foreign/nested key field points at
    pub fn foreign_table_of(&self, field: &Field) -> Option<&Table> {
        field.foreign_table.and_then(|idx| self.tables.get(idx))
    }

    /// Tables ordered for dependency-respecting emission: shallow nesting
    /// first, then registry insertion order.
    pub fn tables_by_dependency(&self) -> Vec<&Table> {
        let mut ordered: Vec<&Table> = self.tables.iter().collect();
        ordered.sort_by_key(|t| (t.level, t.order));
        ordered
    }

    /// Tables that participate in the emitted model
    pub fn writable_tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.iter().filter(move |t| {
            t.writable
                || (self.relational_extension && t.required && (t.is_bridge || t.is_virtual))
        })
    }

    /// Hash a canonical key string into a stored key value
    pub fn hash_key(&self, key: &str) -> KeyValue {
        self.hash.hash(key)
    }

    /// Statistics summary for diagnostic reporting
    pub fn stats(&self) -> ModelStats {
        ModelStats::collect(
            &self.tables,
            self.keys.len(),
            self.foreign_keys.len(),
            self.diagnostics.len(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{HashAlgorithm, HashWidth};

    fn model_with_tables(tables: Vec<Table>) -> CompiledModel {
        CompiledModel {
            tables,
            keys: Vec::new(),
            foreign_keys: Vec::new(),
            namespace_prefixes: IndexMap::new(),
            diagnostics: Vec::new(),
            hash: HashKeyer::new(HashAlgorithm::Sha256, HashWidth::Unsigned64),
            relational_extension: false,
        }
    }

    #[test]
    fn test_dependency_order_sorts_by_level_then_order() {
        let mut a = Table::new("A", "a", "default", TableKind::RootChild, 1);
        a.order = 0;
        let mut b = Table::new("B", "b", "default", TableKind::Root, 0);
        b.order = 1;

        let model = model_with_tables(vec![a, b]);
        let ordered = model.tables_by_dependency();
        assert_eq!(ordered[0].canonical_name, "B");
        assert_eq!(ordered[1].canonical_name, "A");
    }

    #[test]
    fn test_foreign_table_of_uses_index() {
        let parent = Table::new("Order", "order_", "default", TableKind::Root, 0);
        let child = Table::new("Item", "item", "default", TableKind::RootChild, 1);
        let mut field = Field::new("item", FieldKind::NestedKey, true);
        field.foreign_table = Some(1);

        let model = model_with_tables(vec![parent, child]);
        assert_eq!(
            model.foreign_table_of(&field).unwrap().canonical_name,
            "Item"
        );
    }

    #[test]
    fn test_lookup_by_group_distinguishes_namespaces() {
        let a = Table::new("Address", "address", "http://a", TableKind::AdminRoot, 0);
        let b = Table::new("Address", "address", "http://b", TableKind::AdminRoot, 0);

        let model = model_with_tables(vec![a, b]);
        assert_eq!(
            model.table_by_name("http://b", "Address").unwrap().schema_group,
            "http://b"
        );
    }
}
