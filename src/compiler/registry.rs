//! Table registry: deduplication and merge
//!
//! The registry observes tables in a stable, repeatable sequence (the
//! extraction pass is single-threaded and depth-first), so merge outcomes
//! are deterministic. Two tables are the same table when they share an
//! owning schema group and canonical name; in case-insensitive mode a
//! lower-cased collision between distinct canonical names keeps both tables
//! and prefixes the losing declaration instead.

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::error::Diagnostic;
use crate::model::table::{Table, TableKind};

/// The growing list of compiled tables for one schema set
#[derive(Debug)]
pub struct TableRegistry {
    tables: Vec<Table>,
    /// (schema group, index name) to table index
    index: IndexMap<(String, String), usize>,
    case_sensitive: bool,
}

impl TableRegistry {
    /// Create an empty registry
    pub fn new(case_sensitive: bool) -> Self {
        Self {
            tables: Vec::new(),
            index: IndexMap::new(),
            case_sensitive,
        }
    }

    fn index_name(&self, canonical: &str) -> String {
        if self.case_sensitive {
            canonical.to_string()
        } else {
            canonical.to_lowercase()
        }
    }

    /// Number of registered tables
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Whether no table survived extraction
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// All tables in insertion order
    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    /// Mutable access for the post-processing passes
    pub fn tables_mut(&mut self) -> &mut [Table] {
        &mut self.tables
    }

    /// Consume the registry, yielding the frozen table list
    pub fn into_tables(self) -> Vec<Table> {
        self.tables
    }

    /// Position of a table by schema group and canonical name
    pub fn position(&self, schema_group: &str, canonical_name: &str) -> Option<usize> {
        let key = (schema_group.to_string(), self.index_name(canonical_name));
        self.index.get(&key).copied()
    }

    /// Look up a table by schema group and canonical name
    pub fn get(&self, schema_group: &str, canonical_name: &str) -> Option<&Table> {
        self.position(schema_group, canonical_name)
            .map(|idx| &self.tables[idx])
    }

    /// Mutable lookup by schema group and canonical name
    pub fn get_mut(&mut self, schema_group: &str, canonical_name: &str) -> Option<&mut Table> {
        let idx = self.position(schema_group, canonical_name)?;
        Some(&mut self.tables[idx])
    }

    /// Whether a table with this identity is registered
    pub fn contains(&self, schema_group: &str, canonical_name: &str) -> bool {
        self.position(schema_group, canonical_name).is_some()
    }

    /// Promote an `AdminRoot` table subsumed by a nested occurrence
    pub fn promote(&mut self, schema_group: &str, canonical_name: &str, kind: TableKind, level: u32) {
        if let Some(table) = self.get_mut(schema_group, canonical_name) {
            if table.kind == TableKind::AdminRoot && kind.is_child() {
                table.kind = kind;
                table.level = level;
            }
        }
    }

    /// Register a table, merging it into an existing one when another
    /// declaration already introduced the same identity. Returns whether
    /// the table was newly added.
    pub fn register(&mut self, mut table: Table, diagnostics: &mut Vec<Diagnostic>) -> bool {
        let key = (table.schema_group.clone(), self.index_name(&table.canonical_name));

        if let Some(&idx) = self.index.get(&key) {
            if !self.case_sensitive && self.tables[idx].canonical_name != table.canonical_name {
                // Case-folded collision between distinct declarations: the
                // losing declaration keeps its own table under a prefixed name.
                let prefix = format!("t{}_", self.tables[idx].order);
                table.canonical_name = format!("{}{}", prefix, table.canonical_name);
                table.storage_name = format!("{}{}", prefix, table.storage_name);
                table.name_collision = true;
                return self.register(table, diagnostics);
            }

            self.merge(idx, table, diagnostics);
            return false;
        }

        table.order = self.tables.len();
        self.index.insert(key, table.order);
        self.tables.push(table);
        true
    }

    /// Merge an incoming declaration into the known table.
    fn merge(&mut self, idx: usize, incoming: Table, diagnostics: &mut Vec<Diagnostic>) {
        let incoming_names: HashSet<String> = incoming
            .fields
            .iter()
            .map(|f| f.storage_name.clone())
            .collect();
        let incoming_kind = incoming.kind;

        let known = &mut self.tables[idx];
        let before = known.fields.len();

        // Annotation tie-breaking: first non-empty wins
        if known.annotation.is_none() {
            known.annotation = incoming.annotation;
        }

        for ns in incoming.target_namespaces {
            if !known.target_namespaces.contains(&ns) {
                known.target_namespaces.push(ns);
            }
        }
        for loc in incoming.schema_locations {
            if !known.schema_locations.contains(&loc) {
                known.schema_locations.push(loc);
            }
        }

        known.required |= incoming.required;
        known.list_holder |= incoming.list_holder;

        let mut collision = false;

        for field in incoming.fields {
            match known.field_index(&field.storage_name) {
                Some(ki) => {
                    let existing = &mut known.fields[ki];
                    for ns in field.target_namespaces {
                        if !existing.target_namespaces.contains(&ns) {
                            existing.target_namespaces.push(ns);
                        }
                    }
                    if let Some(incoming_parents) = field.parent_nodes {
                        let parents = existing.parent_nodes.get_or_insert_with(Vec::new);
                        for p in incoming_parents {
                            if !parents.contains(&p) {
                                parents.push(p);
                            }
                        }
                    }
                }
                None => {
                    if !field.kind.is_key()
                        && field.required
                        && known.kind == TableKind::AdminRoot
                        && incoming_kind != TableKind::AdminRoot
                    {
                        collision = true;
                    }
                    known.fields.push(field);
                }
            }
        }

        // A previously-required content field the new declaration does not
        // provide can no longer be guaranteed by every occurrence.
        let missing_required = known.fields[..before].iter().any(|f| {
            f.kind.is_content() && f.required && !incoming_names.contains(&f.storage_name)
        });

        if known.fields.len() != before || missing_required {
            collision = true;
        }

        if collision {
            for field in &mut known.fields[before..] {
                field.required = false;
            }
            for field in &mut known.fields[..before] {
                if field.kind.is_content()
                    && field.required
                    && !incoming_names.contains(&field.storage_name)
                {
                    field.required = false;
                }
            }
            known.name_collision = true;
            diagnostics.push(Diagnostic::AmbiguousTableCollision {
                table: known.canonical_name.clone(),
            });
        }

        // Kind promotion: a named-type table subsumed by a nested occurrence
        if known.kind == TableKind::AdminRoot && incoming_kind.is_child() {
            known.kind = incoming_kind;
            known.level = incoming.level;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::field::{Field, FieldKind};

    fn table(name: &str, kind: TableKind) -> Table {
        Table::new(name, name.to_lowercase(), "default", kind, 0)
    }

    fn content_field(name: &str, required: bool) -> Field {
        Field::new(name, FieldKind::Element, true).with_required(required)
    }

    #[test]
    fn test_register_then_merge_is_idempotent() {
        let mut registry = TableRegistry::new(true);
        let mut diags = Vec::new();

        let mut t = table("Order", TableKind::Root);
        t.add_field(content_field("id", true));

        assert!(registry.register(t.clone(), &mut diags));
        assert!(!registry.register(t, &mut diags));

        assert_eq!(registry.len(), 1);
        assert!(diags.is_empty());
        let known = registry.get("default", "Order").unwrap();
        assert!(known.fields[0].required);
        assert!(!known.name_collision);
    }

    #[test]
    fn test_merge_downgrades_conflicting_required_fields() {
        let mut registry = TableRegistry::new(true);
        let mut diags = Vec::new();

        let mut first = table("Order", TableKind::Root);
        first.add_field(content_field("id", true));
        registry.register(first, &mut diags);

        let mut second = table("Order", TableKind::Root);
        second.add_field(content_field("code", true));
        registry.register(second, &mut diags);

        let known = registry.get("default", "Order").unwrap();
        assert!(known.name_collision);
        // `id` is missing from the second declaration, `code` was appended:
        // neither can stay required.
        assert!(known.fields.iter().all(|f| !f.required));
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn test_admin_root_promotion() {
        let mut registry = TableRegistry::new(true);
        let mut diags = Vec::new();

        let mut admin = table("AddressType", TableKind::AdminRoot);
        admin.add_field(content_field("street", true));
        registry.register(admin, &mut diags);

        let mut nested = table("AddressType", TableKind::RootChild);
        nested.level = 2;
        nested.add_field(content_field("street", true));
        registry.register(nested, &mut diags);

        let known = registry.get("default", "AddressType").unwrap();
        assert_eq!(known.kind, TableKind::RootChild);
        assert_eq!(known.level, 2);
        // Same field set: no collision recorded
        assert!(!known.name_collision);
    }

    #[test]
    fn test_case_insensitive_collision_prefixes_loser() {
        let mut registry = TableRegistry::new(false);
        let mut diags = Vec::new();

        registry.register(table("Address", TableKind::Root), &mut diags);
        assert!(registry.register(table("ADDRESS", TableKind::Root), &mut diags));

        assert_eq!(registry.len(), 2);
        let loser = registry.get("default", "t0_ADDRESS").unwrap();
        assert!(loser.name_collision);
    }

    #[test]
    fn test_distinct_schema_groups_do_not_merge() {
        let mut registry = TableRegistry::new(true);
        let mut diags = Vec::new();

        let mut a = table("Address", TableKind::AdminRoot);
        a.schema_group = "http://a".to_string();
        let mut b = table("Address", TableKind::AdminRoot);
        b.schema_group = "http://b".to_string();

        assert!(registry.register(a, &mut diags));
        assert!(registry.register(b, &mut diags));
        assert_eq!(registry.len(), 2);
    }
}
