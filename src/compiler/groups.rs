//! Group registry and pending resolution
//!
//! Attribute-group and model-group definitions are registered as they are
//! encountered anywhere in the schema set; a reference seen before its
//! definition records a `PendingGroup`. Resolution is two-phase: the queue
//! is replayed exactly once, after the whole inclusion tree has been walked,
//! splicing the resolved group's fields into the referencing table at the
//! recorded insertion index.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::error::{CompileError, Error, Result};
use crate::model::field::Field;
use crate::compiler::registry::TableRegistry;

/// Which symbol space a group name lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    /// `xs:attributeGroup`
    Attribute,
    /// `xs:group`
    Model,
}

/// A forward reference to a group not yet defined when it was seen
#[derive(Debug, Clone)]
pub struct PendingGroup {
    /// Symbol space of the reference
    pub kind: GroupKind,
    /// Declared name of the referenced group
    pub group_name: String,
    /// Schema group of the referencing table
    pub schema_group: String,
    /// Canonical name of the referencing table
    pub table_name: String,
    /// Insertion point in the referencing table's field list
    pub insert_at: usize,
}

/// Registry of group definitions plus the pending-reference queue
#[derive(Debug, Default)]
pub struct GroupRegistry {
    /// Attribute group name to its table's (schema group, canonical name)
    attribute_groups: IndexMap<String, (String, String)>,
    /// Model group name to its table's (schema group, canonical name)
    model_groups: IndexMap<String, (String, String)>,
    /// Forward references awaiting phase 2
    pending: Vec<PendingGroup>,
}

impl GroupRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a group definition
    pub fn define(
        &mut self,
        kind: GroupKind,
        name: impl Into<String>,
        schema_group: impl Into<String>,
        table_name: impl Into<String>,
    ) {
        let entry = (schema_group.into(), table_name.into());
        match kind {
            GroupKind::Attribute => self.attribute_groups.insert(name.into(), entry),
            GroupKind::Model => self.model_groups.insert(name.into(), entry),
        };
    }

    /// Resolve a group name to its table identity
    pub fn resolve(&self, kind: GroupKind, name: &str) -> Option<&(String, String)> {
        match kind {
            GroupKind::Attribute => self.attribute_groups.get(name),
            GroupKind::Model => self.model_groups.get(name),
        }
    }

    /// Queue a forward reference for phase 2
    pub fn push_pending(&mut self, pending: PendingGroup) {
        self.pending.push(pending);
    }

    /// Number of unresolved pending references
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Drain the pending queue for resolution
    pub fn take_pending(&mut self) -> Vec<PendingGroup> {
        std::mem::take(&mut self.pending)
    }
}

/// Fields of a group table eligible for splicing: declared content,
/// wildcards, and nested keys, but never generated or parent-linking keys.
pub(crate) fn splice_fields(registry: &TableRegistry, schema_group: &str, table_name: &str) -> Vec<Field> {
    use crate::model::field::FieldKind;

    registry
        .get(schema_group, table_name)
        .map(|t| {
            t.fields
                .iter()
                .filter(|f| !f.kind.is_key() || f.kind == FieldKind::NestedKey)
                .cloned()
                .collect()
        })
        .unwrap_or_default()
}

/// Phase 2: replay every pending reference once.
///
/// All definitions must exist by the end of phase 1; a reference that never
/// resolves aborts with `UnresolvedGroupReference`. Splicing a group whose
/// own table still has an outstanding pending reference fails loudly rather
/// than splicing incomplete fields.
pub fn resolve_pending(registry: &mut TableRegistry, groups: &mut GroupRegistry) -> Result<()> {
    let pending = groups.take_pending();

    // Outstanding pendings per referencing table, for the nested-pending check
    let mut outstanding: HashMap<(String, String), usize> = HashMap::new();
    for p in &pending {
        *outstanding
            .entry((p.schema_group.clone(), p.table_name.clone()))
            .or_insert(0) += 1;
    }

    for p in pending {
        let (def_group, def_table) = groups
            .resolve(p.kind, &p.group_name)
            .cloned()
            .ok_or_else(|| Error::UnresolvedGroupReference {
                name: p.group_name.clone(),
                referencing_table: p.table_name.clone(),
            })?;

        let nested = outstanding
            .get(&(def_group.clone(), def_table.clone()))
            .copied()
            .unwrap_or(0);
        if nested > 0 {
            return Err(CompileError::new(format!(
                "group '{}' was spliced while itself containing {} unresolved group reference(s)",
                p.group_name, nested
            ))
            .with_declaration(p.group_name)
            .into());
        }

        let fields = splice_fields(registry, &def_group, &def_table);

        // The referencing table may have merged away under a collision; the
        // winning declaration already carries the group's fields then.
        if let Some(table) = registry.get_mut(&p.schema_group, &p.table_name) {
            let at = p.insert_at.min(table.fields.len());
            for (offset, field) in fields.into_iter().enumerate() {
                table.fields.insert(at + offset, field);
            }
            table.cleanup();
        }

        if let Some(count) = outstanding.get_mut(&(p.schema_group.clone(), p.table_name.clone())) {
            *count -= 1;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::field::{Field, FieldKind};
    use crate::model::table::{Table, TableKind};

    fn group_table(name: &str) -> Table {
        let mut t = Table::new(name, name.to_lowercase(), "default", TableKind::AttributeGroup, 0);
        t.add_field(Field::new("lang", FieldKind::Attribute, true));
        t.add_field(Field::new("version", FieldKind::Attribute, true));
        t
    }

    fn referencing_table(name: &str) -> Table {
        let mut t = Table::new(name, name.to_lowercase(), "default", TableKind::Root, 0);
        t.add_field(Field::new("order_id", FieldKind::PrimaryKey, true));
        t.add_field(Field::new("id", FieldKind::Attribute, true));
        t
    }

    #[test]
    fn test_pending_splices_at_recorded_index() {
        let mut registry = TableRegistry::new(true);
        let mut groups = GroupRegistry::new();
        let mut diags = Vec::new();

        registry.register(referencing_table("Order"), &mut diags);
        registry.register(group_table("commonAttrs"), &mut diags);
        groups.define(GroupKind::Attribute, "commonAttrs", "default", "commonAttrs");

        groups.push_pending(PendingGroup {
            kind: GroupKind::Attribute,
            group_name: "commonAttrs".to_string(),
            schema_group: "default".to_string(),
            table_name: "Order".to_string(),
            insert_at: 1,
        });

        resolve_pending(&mut registry, &mut groups).unwrap();

        let order = registry.get("default", "Order").unwrap();
        let names: Vec<&str> = order.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["order_id", "lang", "version", "id"]);
        assert_eq!(groups.pending_len(), 0);
    }

    #[test]
    fn test_undefined_group_aborts() {
        let mut registry = TableRegistry::new(true);
        let mut groups = GroupRegistry::new();
        let mut diags = Vec::new();

        registry.register(referencing_table("Order"), &mut diags);
        groups.push_pending(PendingGroup {
            kind: GroupKind::Model,
            group_name: "missing".to_string(),
            schema_group: "default".to_string(),
            table_name: "Order".to_string(),
            insert_at: 0,
        });

        let err = resolve_pending(&mut registry, &mut groups).unwrap_err();
        assert!(matches!(err, Error::UnresolvedGroupReference { .. }));
    }

    #[test]
    fn test_nested_unresolved_group_fails_loudly() {
        let mut registry = TableRegistry::new(true);
        let mut groups = GroupRegistry::new();
        let mut diags = Vec::new();

        registry.register(referencing_table("Order"), &mut diags);
        registry.register(group_table("outer"), &mut diags);
        registry.register(group_table("inner"), &mut diags);
        groups.define(GroupKind::Attribute, "outer", "default", "outer");
        groups.define(GroupKind::Attribute, "inner", "default", "inner");

        // Order references outer, while outer itself still waits on inner
        groups.push_pending(PendingGroup {
            kind: GroupKind::Attribute,
            group_name: "outer".to_string(),
            schema_group: "default".to_string(),
            table_name: "Order".to_string(),
            insert_at: 0,
        });
        groups.push_pending(PendingGroup {
            kind: GroupKind::Attribute,
            group_name: "inner".to_string(),
            schema_group: "default".to_string(),
            table_name: "outer".to_string(),
            insert_at: 0,
        });

        let err = resolve_pending(&mut registry, &mut groups).unwrap_err();
        assert!(matches!(err, Error::Compile(_)));
    }
}
