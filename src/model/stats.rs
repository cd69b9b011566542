//! Statistics summary for diagnostic reporting

use crate::model::field::FieldKind;
use crate::model::table::{Table, TableKind};

/// Table/field/key counts by category
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct ModelStats {
    /// Total tables
    pub tables: usize,
    /// Root tables
    pub root_tables: usize,
    /// Nested child tables
    pub child_tables: usize,
    /// Top-level named type tables
    pub admin_tables: usize,
    /// Group definition tables
    pub group_tables: usize,
    /// Virtual tables
    pub virtual_tables: usize,
    /// Bridge tables
    pub bridge_tables: usize,
    /// List-holder tables
    pub list_holder_tables: usize,
    /// Writable tables
    pub writable_tables: usize,
    /// Total fields
    pub fields: usize,
    /// Content fields (attributes, elements, simple content)
    pub content_fields: usize,
    /// Wildcard fields
    pub wildcard_fields: usize,
    /// Nested-key fields
    pub nested_keys: usize,
    /// Generated key fields (document/primary/serial/xpath)
    pub generated_keys: usize,
    /// Identity constraints
    pub keys: usize,
    /// Foreign key declarations
    pub foreign_keys: usize,
    /// Recorded diagnostics
    pub diagnostics: usize,
}

impl ModelStats {
    /// Aggregate statistics over a finalized table set
    pub fn collect(tables: &[Table], keys: usize, foreign_keys: usize, diagnostics: usize) -> Self {
        let mut stats = Self {
            tables: tables.len(),
            keys,
            foreign_keys,
            diagnostics,
            ..Self::default()
        };

        for table in tables {
            match table.kind {
                TableKind::Root => stats.root_tables += 1,
                TableKind::RootChild | TableKind::AdminChild => stats.child_tables += 1,
                TableKind::AdminRoot => stats.admin_tables += 1,
                TableKind::AttributeGroup | TableKind::ModelGroup => stats.group_tables += 1,
            }
            if table.is_virtual {
                stats.virtual_tables += 1;
            }
            if table.is_bridge {
                stats.bridge_tables += 1;
            }
            if table.list_holder {
                stats.list_holder_tables += 1;
            }
            if table.writable {
                stats.writable_tables += 1;
            }

            for field in &table.fields {
                stats.fields += 1;
                if field.kind.is_content() {
                    stats.content_fields += 1;
                } else if field.kind.is_wildcard() {
                    stats.wildcard_fields += 1;
                } else if field.kind == FieldKind::NestedKey {
                    stats.nested_keys += 1;
                } else {
                    stats.generated_keys += 1;
                }
            }
        }

        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::field::Field;

    #[test]
    fn test_collect_counts_by_category() {
        let mut root = Table::new("Order", "order_", "default", TableKind::Root, 0);
        root.add_field(Field::new("order_id", FieldKind::PrimaryKey, true));
        root.add_field(Field::new("id", FieldKind::Attribute, true));

        let mut child = Table::new("Item", "item", "default", TableKind::RootChild, 1);
        child.list_holder = true;
        child.add_field(Field::new("item_id", FieldKind::PrimaryKey, true));

        let stats = ModelStats::collect(&[root, child], 1, 2, 0);
        assert_eq!(stats.tables, 2);
        assert_eq!(stats.root_tables, 1);
        assert_eq!(stats.child_tables, 1);
        assert_eq!(stats.list_holder_tables, 1);
        assert_eq!(stats.content_fields, 1);
        assert_eq!(stats.generated_keys, 2);
        assert_eq!(stats.foreign_keys, 2);
    }
}
