//! Key derivation pass
//!
//! Runs once the full table set is registered: resolves every nested and
//! foreign key field to its concrete table index, resolves keyref
//! declarations against the collected identity constraints, and derives the
//! parent/ancestor node constraints used to disambiguate repeated sibling
//! structures. Parent derivation is a best-effort hint: a cycle or fixed
//! point abandons the constraint rather than looping.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::error::{Diagnostic, Error, Result};
use crate::model::field::FieldKind;

use super::context::SchemaContext;

/// Run the full derivation pass
pub fn derive(ctx: &mut SchemaContext) -> Result<()> {
    resolve_reference_fields(ctx);
    resolve_foreign_key_decls(ctx)?;
    derive_parent_nodes(ctx);
    derive_ancestor_nodes(ctx);
    Ok(())
}

/// Resolve each nested/foreign key field to a table index; unresolved
/// fields pointed at a table that was discarded or never registered and are
/// dropped, with the owning table marked not to propagate requiredness.
fn resolve_reference_fields(ctx: &mut SchemaContext) {
    // (table index, field index, resolved target)
    let mut resolutions: Vec<(usize, usize, Option<usize>)> = Vec::new();

    for (ti, table) in ctx.registry.tables().iter().enumerate() {
        for (fi, field) in table.fields.iter().enumerate() {
            if !field.is_reference() {
                continue;
            }
            let Some(name) = &field.foreign_table_name else {
                continue;
            };
            let group = field
                .foreign_schema_group
                .as_deref()
                .unwrap_or(&table.schema_group);
            resolutions.push((ti, fi, ctx.registry.position(group, name)));
        }
    }

    // Apply removals last-field-first so earlier indices stay valid
    resolutions.sort_by(|a, b| b.cmp(a));

    for (ti, fi, target) in resolutions {
        let tables = ctx.registry.tables_mut();
        match target {
            Some(idx) => {
                tables[ti].fields[fi].foreign_table = Some(idx);
            }
            None => {
                let field = tables[ti].fields.remove(fi);
                tables[ti].propagate_required = false;
                ctx.diagnostics.push(Diagnostic::DroppedNestedKey {
                    table: tables[ti].canonical_name.clone(),
                    field: field.name,
                });
            }
        }
    }
}

/// Resolve keyrefs against the collected keys, and extension base links
/// against the registry. A keyref whose target key does not exist has no
/// safe fallback and aborts; a base link to a discarded table is dropped.
fn resolve_foreign_key_decls(ctx: &mut SchemaContext) -> Result<()> {
    let mut resolved = Vec::with_capacity(ctx.foreign_keys.len());

    for mut fk in std::mem::take(&mut ctx.foreign_keys) {
        match &fk.refer_key {
            Some(refer) => {
                let key = ctx.keys.iter().find(|k| &k.name == refer).ok_or_else(|| {
                    Error::UnresolvedKeyReference {
                        name: fk.name.clone(),
                        refer: refer.clone(),
                    }
                })?;
                fk.refer_table = Some(key.table.clone());
                fk.refer_fields = key.fields.clone();
                resolved.push(fk);
            }
            None => {
                let exists = fk
                    .refer_table
                    .as_deref()
                    .map(|t| ctx.registry.contains(&fk.schema_group, t))
                    .unwrap_or(false);
                if exists {
                    resolved.push(fk);
                }
            }
        }
    }

    ctx.foreign_keys = resolved;
    Ok(())
}

/// Map of table index to the tables whose nested keys point at it
fn referrer_map(ctx: &SchemaContext) -> HashMap<usize, Vec<usize>> {
    let mut referrers: HashMap<usize, Vec<usize>> = HashMap::new();
    for (ti, table) in ctx.registry.tables().iter().enumerate() {
        for field in &table.fields {
            if field.kind == FieldKind::NestedKey {
                if let Some(target) = field.foreign_table {
                    referrers.entry(target).or_default().push(ti);
                }
            }
        }
    }
    referrers
}

/// Content-bearing tables reachable by walking up through contentless
/// referrers. Returns None when a revisit is hit (cycle or fixed point) or
/// nothing content-bearing is found.
fn content_parents(
    ctx: &SchemaContext,
    referrers: &HashMap<usize, Vec<usize>>,
    start: usize,
) -> Option<Vec<String>> {
    let tables = ctx.registry.tables();
    let mut result: BTreeSet<String> = BTreeSet::new();
    let mut visited: HashSet<usize> = HashSet::new();
    let mut stack: Vec<usize> = referrers.get(&start).cloned().unwrap_or_default();

    while let Some(ti) = stack.pop() {
        if !visited.insert(ti) {
            return None;
        }
        let table = &tables[ti];
        if table.content_field_count() > 0 {
            result.insert(table.canonical_name.clone());
        } else {
            stack.extend(referrers.get(&ti).cloned().unwrap_or_default());
        }
    }

    if result.is_empty() {
        None
    } else {
        Some(result.into_iter().collect())
    }
}

/// For each nested key whose destination is reachable from more than one
/// structural path, record the immediate content-bearing parents.
fn derive_parent_nodes(ctx: &mut SchemaContext) {
    let referrers = referrer_map(ctx);

    let mut updates: Vec<(usize, usize, Option<Vec<String>>)> = Vec::new();
    for (ti, table) in ctx.registry.tables().iter().enumerate() {
        for (fi, field) in table.fields.iter().enumerate() {
            if field.kind != FieldKind::NestedKey {
                continue;
            }
            let Some(target) = field.foreign_table else { continue };
            let paths = referrers.get(&target).map(|v| v.len()).unwrap_or(0);
            if paths > 1 {
                updates.push((ti, fi, content_parents(ctx, &referrers, target)));
            }
        }
    }

    for (ti, fi, parents) in updates {
        ctx.registry.tables_mut()[ti].fields[fi].parent_nodes = parents;
    }
}

/// Propagate parent constraints one level further up.
fn derive_ancestor_nodes(ctx: &mut SchemaContext) {
    let referrers = referrer_map(ctx);

    // Canonical name to index, scoped per schema group won't matter here:
    // parent names were recorded from the same registry.
    let name_index: HashMap<String, usize> = ctx
        .registry
        .tables()
        .iter()
        .enumerate()
        .map(|(i, t)| (t.canonical_name.clone(), i))
        .collect();

    let mut updates: Vec<(usize, usize, Vec<String>)> = Vec::new();
    for (ti, table) in ctx.registry.tables().iter().enumerate() {
        for (fi, field) in table.fields.iter().enumerate() {
            let Some(parents) = &field.parent_nodes else { continue };
            let mut ancestors: BTreeSet<String> = BTreeSet::new();
            for parent in parents {
                let Some(&pi) = name_index.get(parent) else { continue };
                if let Some(found) = content_parents(ctx, &referrers, pi) {
                    ancestors.extend(found);
                }
            }
            if !ancestors.is_empty() {
                updates.push((ti, fi, ancestors.into_iter().collect()));
            }
        }
    }

    for (ti, fi, ancestors) in updates {
        ctx.registry.tables_mut()[ti].fields[fi].ancestor_nodes = Some(ancestors);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::field::Field;
    use crate::model::table::{Table, TableKind};
    use crate::options::{CompilerOptions, HashAlgorithm, HashWidth};

    fn ctx() -> SchemaContext {
        SchemaContext::new(CompilerOptions::new(HashAlgorithm::Sha256, HashWidth::Unsigned64))
    }

    fn nested(name: &str, target: &str) -> Field {
        let mut f = Field::new(name, FieldKind::NestedKey, true).with_foreign_table(target);
        f.foreign_schema_group = Some("default".to_string());
        f
    }

    fn content_field(name: &str) -> Field {
        Field::new(name, FieldKind::Element, true)
    }

    #[test]
    fn test_unresolved_nested_key_is_dropped() {
        let mut ctx = ctx();

        let mut parent = Table::new("Order", "order_", "default", TableKind::Root, 0);
        parent.add_field(content_field("id"));
        parent.add_field(nested("ghost", "Ghost"));
        let mut diags = Vec::new();
        ctx.registry.register(parent, &mut diags);

        derive(&mut ctx).unwrap();

        let order = ctx.registry.get("default", "Order").unwrap();
        assert_eq!(order.fields.len(), 1);
        assert!(!order.propagate_required);
        assert!(matches!(
            ctx.diagnostics.last(),
            Some(Diagnostic::DroppedNestedKey { .. })
        ));
    }

    #[test]
    fn test_nested_key_resolves_to_index() {
        let mut ctx = ctx();
        let mut diags = Vec::new();

        let mut parent = Table::new("Order", "order_", "default", TableKind::Root, 0);
        parent.add_field(nested("item", "Item"));
        ctx.registry.register(parent, &mut diags);

        let mut child = Table::new("Item", "item", "default", TableKind::RootChild, 1);
        child.add_field(content_field("sku"));
        ctx.registry.register(child, &mut diags);

        derive(&mut ctx).unwrap();

        let order = ctx.registry.get("default", "Order").unwrap();
        assert_eq!(order.fields[0].foreign_table, Some(1));
    }

    #[test]
    fn test_parent_nodes_for_shared_destination() {
        let mut ctx = ctx();
        let mut diags = Vec::new();

        let mut a = Table::new("Invoice", "invoice", "default", TableKind::Root, 0);
        a.add_field(content_field("number"));
        a.add_field(nested("address", "Address"));
        ctx.registry.register(a, &mut diags);

        let mut b = Table::new("Shipment", "shipment", "default", TableKind::Root, 0);
        b.add_field(content_field("carrier"));
        b.add_field(nested("address", "Address"));
        ctx.registry.register(b, &mut diags);

        let mut shared = Table::new("Address", "address", "default", TableKind::RootChild, 1);
        shared.add_field(content_field("street"));
        ctx.registry.register(shared, &mut diags);

        derive(&mut ctx).unwrap();

        let invoice = ctx.registry.get("default", "Invoice").unwrap();
        let field = invoice.fields.iter().find(|f| f.name == "address").unwrap();
        assert_eq!(
            field.parent_nodes.as_deref(),
            Some(&["Invoice".to_string(), "Shipment".to_string()][..])
        );
    }

    #[test]
    fn test_keyref_without_key_aborts() {
        let mut ctx = ctx();
        let mut diags = Vec::new();

        let mut t = Table::new("Order", "order_", "default", TableKind::Root, 0);
        t.add_field(content_field("id"));
        ctx.registry.register(t, &mut diags);

        ctx.foreign_keys.push(crate::model::keys::ForeignKeyDecl {
            name: "orderRef".to_string(),
            table: "Order".to_string(),
            schema_group: "default".to_string(),
            fields: vec!["id".to_string()],
            refer_key: Some("missingKey".to_string()),
            refer_table: None,
            refer_fields: Vec::new(),
        });

        let err = derive(&mut ctx).unwrap_err();
        assert!(matches!(err, Error::UnresolvedKeyReference { .. }));
    }
}
