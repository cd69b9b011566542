//! Table classification pass
//!
//! Assigns the final structural flags once keys are resolved: virtual
//! (no addressable content of its own), bridge (exactly one nested child
//! and nothing else), list holder, content holder, and writable. Also
//! prunes virtual duplication, so the same relationship is never modeled
//! twice through a virtual intermediate.

use std::collections::HashSet;

use crate::model::field::FieldKind;
use crate::model::table::TableKind;

use super::context::SchemaContext;

/// Run the classification pass
pub fn classify(ctx: &mut SchemaContext) {
    prune_virtual_duplication(ctx);
    assign_flags(ctx);
    propagate_required(ctx);
    assign_writable(ctx);
}

/// Follow a nested-key edge through contentless single-child intermediates
/// to its effective destination.
fn effective_target(ctx: &SchemaContext, start: usize) -> usize {
    let tables = ctx.registry.tables();
    let mut current = start;
    let mut visited = HashSet::new();

    loop {
        if !visited.insert(current) {
            return current;
        }
        let table = &tables[current];
        if table.content_field_count() > 0 || table.nested_key_count() != 1 {
            return current;
        }
        let next = table
            .nested_keys()
            .next()
            .and_then(|f| f.foreign_table);
        match next {
            Some(idx) => current = idx,
            None => return current,
        }
    }
}

/// Where a table holds two nested keys that resolve, through virtual
/// intermediates, to the same destination, the redundant edge is removed.
fn prune_virtual_duplication(ctx: &mut SchemaContext) {
    let table_count = ctx.registry.len();

    for ti in 0..table_count {
        let mut seen_targets: HashSet<usize> = HashSet::new();
        let mut drop: Vec<usize> = Vec::new();

        for (fi, field) in ctx.registry.tables()[ti].fields.iter().enumerate() {
            if field.kind != FieldKind::NestedKey {
                continue;
            }
            let Some(target) = field.foreign_table else { continue };
            let effective = effective_target(ctx, target);
            if !seen_targets.insert(effective) {
                drop.push(fi);
            }
        }

        for fi in drop.into_iter().rev() {
            ctx.registry.tables_mut()[ti].fields.remove(fi);
        }
    }
}

fn assign_flags(ctx: &mut SchemaContext) {
    for table in ctx.registry.tables_mut() {
        let content = table.content_field_count() > 0;
        let nested = table.nested_key_count();

        table.content_holder = content;
        table.list_holder |= table.fields.iter().any(|f| f.list_holder);
        table.is_virtual = !content && !table.kind.is_group();
        table.is_bridge = table.is_virtual && nested == 1;
    }
}

/// Recompute requiredness top-down: root tables are mandatory, and a child
/// is mandatory when a mandatory parent links it through a required nested
/// key. Tables that dropped an unresolved nested key do not propagate.
fn propagate_required(ctx: &mut SchemaContext) {
    let order: Vec<usize> = {
        let mut indices: Vec<usize> = (0..ctx.registry.len()).collect();
        let tables = ctx.registry.tables();
        indices.sort_by_key(|&i| (tables[i].level, tables[i].order));
        indices
    };

    let mut required: Vec<bool> = ctx
        .registry
        .tables()
        .iter()
        .map(|t| t.kind == TableKind::Root)
        .collect();

    for &ti in &order {
        if !required[ti] {
            continue;
        }
        let table = &ctx.registry.tables()[ti];
        if !table.propagate_required {
            continue;
        }
        let targets: Vec<usize> = table
            .fields
            .iter()
            .filter(|f| f.kind == FieldKind::NestedKey && f.required)
            .filter_map(|f| f.foreign_table)
            .collect();
        for target in targets {
            required[target] = true;
        }
    }

    for (ti, table) in ctx.registry.tables_mut().iter_mut().enumerate() {
        table.required = required[ti];
    }
}

fn assign_writable(ctx: &mut SchemaContext) {
    for table in ctx.registry.tables_mut() {
        table.writable = table.required && table.content_holder && !table.is_virtual;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Diagnostic;
    use crate::model::field::Field;
    use crate::model::table::Table;
    use crate::options::{CompilerOptions, HashAlgorithm, HashWidth};

    fn ctx() -> SchemaContext {
        SchemaContext::new(CompilerOptions::new(HashAlgorithm::Sha256, HashWidth::Unsigned64))
    }

    fn register(ctx: &mut SchemaContext, table: Table) {
        let mut diags: Vec<Diagnostic> = Vec::new();
        ctx.registry.register(table, &mut diags);
    }

    fn nested_to(name: &str, target: usize, required: bool) -> Field {
        let mut f = Field::new(name, FieldKind::NestedKey, true).with_required(required);
        f.foreign_table = Some(target);
        f
    }

    fn content_field(name: &str) -> Field {
        Field::new(name, FieldKind::Element, true).with_required(true)
    }

    #[test]
    fn test_bridge_and_virtual_flags() {
        let mut c = ctx();

        // Root -> wrapper (no content, one nested) -> leaf (content)
        let mut root = Table::new("Doc", "doc", "default", TableKind::Root, 0);
        root.add_field(content_field("title"));
        root.add_field(nested_to("items", 1, true));
        register(&mut c, root);

        let mut wrapper = Table::new("items", "items", "default", TableKind::RootChild, 1);
        wrapper.add_field(nested_to("item", 2, true));
        register(&mut c, wrapper);

        let mut leaf = Table::new("item", "item", "default", TableKind::RootChild, 2);
        leaf.add_field(content_field("sku"));
        register(&mut c, leaf);

        classify(&mut c);

        let tables = c.registry.tables();
        assert!(!tables[0].is_virtual);
        assert!(tables[1].is_virtual);
        assert!(tables[1].is_bridge);
        assert!(!tables[2].is_virtual);
        assert!(tables[0].writable);
        assert!(!tables[1].writable);
        assert!(tables[2].writable);
    }

    #[test]
    fn test_required_propagates_through_required_chain() {
        let mut c = ctx();

        let mut root = Table::new("Doc", "doc", "default", TableKind::Root, 0);
        root.add_field(content_field("title"));
        root.add_field(nested_to("meta", 1, true));
        root.add_field(nested_to("extra", 2, false));
        register(&mut c, root);

        let mut meta = Table::new("meta", "meta", "default", TableKind::RootChild, 1);
        meta.add_field(content_field("author"));
        register(&mut c, meta);

        let mut extra = Table::new("extra", "extra", "default", TableKind::RootChild, 1);
        extra.add_field(content_field("note"));
        register(&mut c, extra);

        classify(&mut c);

        let tables = c.registry.tables();
        assert!(tables[0].required);
        assert!(tables[1].required);
        assert!(!tables[2].required);
    }

    #[test]
    fn test_virtual_duplication_is_pruned() {
        let mut c = ctx();

        // Root has a direct edge to leaf and a second edge through a
        // contentless wrapper to the same leaf.
        let mut root = Table::new("Doc", "doc", "default", TableKind::Root, 0);
        root.add_field(content_field("title"));
        root.add_field(nested_to("item", 2, true));
        root.add_field(nested_to("wrapper", 1, true));
        register(&mut c, root);

        let mut wrapper = Table::new("wrapper", "wrapper", "default", TableKind::RootChild, 1);
        wrapper.add_field(nested_to("item", 2, true));
        register(&mut c, wrapper);

        let mut leaf = Table::new("item", "item", "default", TableKind::RootChild, 2);
        leaf.add_field(content_field("sku"));
        register(&mut c, leaf);

        classify(&mut c);

        let root = &c.registry.tables()[0];
        assert_eq!(root.nested_key_count(), 1);
        assert_eq!(root.nested_keys().next().unwrap().name, "item");
    }
}
