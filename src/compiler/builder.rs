//! Model builder: recursive extraction of tables and fields
//!
//! The walk is driven by an explicit work-list of table jobs instead of
//! mutual recursion, so call depth is bounded and the walk order is
//! auditable. Nesting level travels with each job; a job builds one table
//! completely (generated keys, declared fields, nested-key links), then the
//! table is registered, where deduplication may merge it into an earlier
//! declaration of the same identity.

use std::collections::{HashSet, VecDeque};

use crate::documents::{xsd_attrs, DeclKind, DeclNode, Occurs, SchemaDocument};
use crate::error::{Diagnostic, Error, Result};
use crate::model::field::{Field, FieldKind, Restriction, ScalarKind};
use crate::model::keys::{ForeignKeyDecl, Key};
use crate::model::table::{Table, TableKind};
use crate::names::{split_qname, to_storage_name};
use crate::namespaces::NamespaceContext;
use crate::options::CompilerOptions;
use crate::XSD_NAMESPACE;

use super::context::SchemaContext;
use super::groups::{GroupKind, PendingGroup};

use indexmap::IndexMap;

/// Pre-indexed named top-level declarations across the whole document set
#[derive(Debug, Default)]
struct TypeIndex {
    complex_types: IndexMap<(String, String), DeclNode>,
    simple_types: IndexMap<(String, String), DeclNode>,
    elements: IndexMap<(String, String), DeclNode>,
    attributes: IndexMap<(String, String), DeclNode>,
}

impl TypeIndex {
    fn lookup<'a>(
        map: &'a IndexMap<(String, String), DeclNode>,
        group: &str,
        local: &str,
    ) -> Option<&'a DeclNode> {
        if let Some(node) = map.get(&(group.to_string(), local.to_string())) {
            return Some(node);
        }
        // Unambiguous cross-group fallback
        let mut hits = map.iter().filter(|((_, name), _)| name == local);
        match (hits.next(), hits.next()) {
            (Some((_, node)), None) => Some(node),
            _ => None,
        }
    }

    fn lookup_group<'a>(
        map: &'a IndexMap<(String, String), DeclNode>,
        group: &'a str,
        local: &str,
    ) -> Option<(&'a str, &'a DeclNode)> {
        if let Some(node) = map.get(&(group.to_string(), local.to_string())) {
            return Some((group, node));
        }
        let mut hits = map.iter().filter(|((_, name), _)| name == local);
        match (hits.next(), hits.next()) {
            (Some(((g, _), node)), None) => Some((g.as_str(), node)),
            _ => None,
        }
    }
}

/// Result of resolving a declared type name
#[derive(Debug)]
enum TypeRef {
    Builtin(ScalarKind),
    Simple { group: String, local: String },
    Complex { group: String, local: String },
    Unknown,
}

/// Resolved simple-type definition
#[derive(Debug, Clone)]
struct SimpleDef {
    scalar: ScalarKind,
    restriction: Restriction,
    is_list: bool,
}

impl SimpleDef {
    fn scalar(kind: ScalarKind) -> Self {
        Self {
            scalar: kind,
            restriction: Restriction::default(),
            is_list: false,
        }
    }
}

/// Content a table job extracts its fields from
#[derive(Debug)]
enum JobContent {
    /// Walk a complexType / group / attributeGroup declaration
    Complex(DeclNode),
    /// A single simple-content value field (scalar roots and list holders)
    Simple {
        field_name: String,
        def: SimpleDef,
        type_name: Option<String>,
    },
}

/// One table to build: declaration, owning identity, nesting level
#[derive(Debug)]
struct TableJob {
    canonical_name: String,
    kind: TableKind,
    schema_group: String,
    level: u32,
    required: bool,
    list_holder: bool,
    content: JobContent,
    annotation: Option<String>,
    location: String,
    target_namespace: Option<String>,
    ns: NamespaceContext,
    parent: Option<String>,
}

/// Everything known about one element particle before shaping it
#[derive(Debug)]
struct ElementInfo {
    name: String,
    type_name: Option<String>,
    inline_complex: Option<DeclNode>,
    inline_simple: Option<DeclNode>,
    occurs: Occurs,
    annotation: Option<String>,
    fixed: Option<String>,
    default_value: Option<String>,
    substitution_group: Option<String>,
    constraints: Vec<DeclNode>,
}

/// Requiredness scope threaded through the content walk
#[derive(Debug, Clone, Copy)]
struct Scope {
    required: bool,
}

/// The recursive extractor, driven by an explicit job queue
pub struct ModelBuilder<'a> {
    ctx: &'a mut SchemaContext,
    types: TypeIndex,
    jobs: VecDeque<TableJob>,
    /// Named tables already queued or built, to break type recursion
    queued: HashSet<(String, String)>,
    /// Deferred AdminRoot re-tags for skipped duplicate child jobs
    promotions: Vec<(String, String, TableKind, u32)>,
}

impl<'a> ModelBuilder<'a> {
    /// Create a builder over the given compilation context
    pub fn new(ctx: &'a mut SchemaContext) -> Self {
        Self {
            ctx,
            types: TypeIndex::default(),
            jobs: VecDeque::new(),
            queued: HashSet::new(),
            promotions: Vec::new(),
        }
    }

    fn options(&self) -> &CompilerOptions {
        &self.ctx.options
    }

    /// Walk the whole document set, populating the table registry and the
    /// group registry (queuing pending group references as encountered).
    pub fn build(&mut self, documents: &[SchemaDocument]) -> Result<()> {
        self.index_declarations(documents);

        let mut roots = 0usize;
        for doc in documents {
            let group = self.ctx.schema_group_of(doc);
            for decl in doc.top_level() {
                match decl.kind {
                    DeclKind::Element => {
                        if decl.attr_bool(xsd_attrs::ABSTRACT) {
                            continue;
                        }
                        if decl.name().is_some() {
                            roots += 1;
                            self.seed_root_element(doc, &group, decl);
                        }
                    }
                    DeclKind::ComplexType => {
                        if let Some(name) = decl.name() {
                            self.seed_named_table(
                                doc,
                                &group,
                                name,
                                TableKind::AdminRoot,
                                decl.clone(),
                            );
                        }
                    }
                    DeclKind::Group => {
                        if let Some(name) = decl.name() {
                            self.ctx.groups.define(GroupKind::Model, name, &group, name);
                            self.seed_named_table(
                                doc,
                                &group,
                                name,
                                TableKind::ModelGroup,
                                decl.clone(),
                            );
                        }
                    }
                    DeclKind::AttributeGroup => {
                        if let Some(name) = decl.name() {
                            self.ctx
                                .groups
                                .define(GroupKind::Attribute, name, &group, name);
                            self.seed_named_table(
                                doc,
                                &group,
                                name,
                                TableKind::AttributeGroup,
                                decl.clone(),
                            );
                        }
                    }
                    _ => {}
                }
            }
        }

        if roots == 0 {
            let location = documents
                .first()
                .map(|d| d.location.clone())
                .unwrap_or_default();
            return Err(Error::MissingRootDeclaration(location));
        }

        while let Some(job) = self.jobs.pop_front() {
            self.process_job(job)?;
        }

        for (group, name, kind, level) in std::mem::take(&mut self.promotions) {
            self.ctx.registry.promote(&group, &name, kind, level);
        }

        Ok(())
    }

    fn index_declarations(&mut self, documents: &[SchemaDocument]) {
        for doc in documents {
            let group = self.ctx.schema_group_of(doc);
            if let Some(tns) = &doc.target_namespace {
                let declared = doc
                    .namespaces
                    .iter()
                    .find(|(_, ns)| *ns == tns)
                    .map(|(p, _)| p.to_string());
                self.ctx.assign_prefix(tns, declared.as_deref());
            }
            self.ctx.visited_locations.insert(doc.location.clone());

            for decl in doc.top_level() {
                let Some(name) = decl.name() else { continue };
                let key = (group.clone(), name.to_string());
                let map = match decl.kind {
                    DeclKind::ComplexType => &mut self.types.complex_types,
                    DeclKind::SimpleType => &mut self.types.simple_types,
                    DeclKind::Element => &mut self.types.elements,
                    DeclKind::Attribute => &mut self.types.attributes,
                    _ => continue,
                };
                // First declaration wins; later duplicates merge at registration
                map.entry(key).or_insert_with(|| decl.clone());
            }
        }
    }

    fn seed_root_element(&mut self, doc: &SchemaDocument, group: &str, decl: &DeclNode) {
        let name = decl.name().unwrap_or_default().to_string();
        let annotation = decl.annotation();

        let content = if let Some(ct) = decl.child(DeclKind::ComplexType) {
            JobContent::Complex(ct.clone())
        } else if let Some(st) = decl.child(DeclKind::SimpleType) {
            let def =
                self.simple_def_from_node(st, &doc.namespaces, doc.target_namespace.as_deref());
            JobContent::Simple {
                field_name: name.clone(),
                def,
                type_name: None,
            }
        } else if let Some(type_name) = decl.type_name() {
            match self.resolve_type_ref(&doc.namespaces, doc.target_namespace.as_deref(), type_name)
            {
                TypeRef::Complex { group: tg, local } => {
                    match TypeIndex::lookup(&self.types.complex_types, &tg, &local) {
                        Some(node) => JobContent::Complex(node.clone()),
                        None => JobContent::Simple {
                            field_name: name.clone(),
                            def: SimpleDef::scalar(ScalarKind::String),
                            type_name: Some(type_name.to_string()),
                        },
                    }
                }
                TypeRef::Simple { group: sg, local } => {
                    let def = self.resolve_simple(
                        &sg,
                        &local,
                        &doc.namespaces,
                        doc.target_namespace.as_deref(),
                    );
                    JobContent::Simple {
                        field_name: name.clone(),
                        def,
                        type_name: Some(type_name.to_string()),
                    }
                }
                TypeRef::Builtin(scalar) => JobContent::Simple {
                    field_name: name.clone(),
                    def: SimpleDef::scalar(scalar),
                    type_name: Some(type_name.to_string()),
                },
                TypeRef::Unknown => JobContent::Simple {
                    field_name: name.clone(),
                    def: SimpleDef::scalar(ScalarKind::String),
                    type_name: Some(type_name.to_string()),
                },
            }
        } else {
            JobContent::Simple {
                field_name: name.clone(),
                def: SimpleDef::scalar(ScalarKind::String),
                type_name: None,
            }
        };

        self.record_node_constraints(decl, &name, group);

        self.queued.insert((group.to_string(), name.clone()));
        self.jobs.push_back(TableJob {
            canonical_name: name,
            kind: TableKind::Root,
            schema_group: group.to_string(),
            level: 0,
            required: true,
            list_holder: false,
            content,
            annotation,
            location: doc.location.clone(),
            target_namespace: doc.target_namespace.clone(),
            ns: doc.namespaces.clone(),
            parent: None,
        });
    }

    fn seed_named_table(
        &mut self,
        doc: &SchemaDocument,
        group: &str,
        name: &str,
        kind: TableKind,
        node: DeclNode,
    ) {
        let annotation = node.annotation();
        self.queued.insert((group.to_string(), name.to_string()));
        self.jobs.push_back(TableJob {
            canonical_name: name.to_string(),
            kind,
            schema_group: group.to_string(),
            level: 0,
            required: false,
            list_holder: false,
            content: JobContent::Complex(node),
            annotation,
            location: doc.location.clone(),
            target_namespace: doc.target_namespace.clone(),
            ns: doc.namespaces.clone(),
            parent: None,
        });
    }

    fn process_job(&mut self, job: TableJob) -> Result<()> {
        let case = self.options().case_sensitive;
        let mut table = Table::new(
            &job.canonical_name,
            to_storage_name(&job.canonical_name, case),
            &job.schema_group,
            job.kind,
            job.level,
        );
        table.required = job.required;
        table.list_holder = job.list_holder;
        table.annotation = job.annotation.clone();
        table.schema_locations.push(job.location.clone());
        if let Some(tns) = &job.target_namespace {
            table.target_namespaces.push(tns.clone());
        }

        if !job.kind.is_group() {
            self.add_generated_keys(&mut table, &job);
        }

        match &job.content {
            JobContent::Complex(node) => {
                let node = node.clone();
                self.walk_content(&mut table, node, &job)?;
            }
            JobContent::Simple {
                field_name,
                def,
                type_name,
            } => {
                let mut field = Field::new(field_name.clone(), FieldKind::SimpleContent, case);
                field.scalar = Some(def.scalar);
                field.required = true;
                field.type_name = type_name.clone();
                if !def.restriction.is_empty() {
                    field.restriction = Some(def.restriction.clone());
                }
                if let Some(tns) = &job.target_namespace {
                    field.target_namespaces.push(tns.clone());
                }
                table.add_field(field);
            }
        }

        table.cleanup();

        let addressable = table.content_field_count()
            + table.nested_key_count()
            + table.fields.iter().filter(|f| f.kind.is_wildcard()).count();
        if table.kind.is_child() && addressable < self.options().minimum_fields_per_table {
            self.ctx.diagnostics.push(Diagnostic::DiscardedSmallTable {
                table: table.canonical_name,
                fields: addressable,
            });
            return Ok(());
        }

        let ctx = &mut *self.ctx;
        ctx.registry.register(table, &mut ctx.diagnostics);
        Ok(())
    }

    fn add_generated_keys(&self, table: &mut Table, job: &TableJob) {
        let case = self.options().case_sensitive;
        let opts = self.options();

        if opts.generate_document_key {
            let field =
                Field::new("document_id", FieldKind::DocumentKey, case).with_required(true);
            table.add_field(field);
        }

        let pk_name = format!("{}_id", job.canonical_name);
        table.add_field(Field::new(pk_name, FieldKind::PrimaryKey, case).with_required(true));

        if opts.generate_xpath_key {
            let name = format!("{}_xpath_id", job.canonical_name);
            table.add_field(Field::new(name, FieldKind::XPathKey, case).with_required(true));
        }

        if opts.generate_serial_key && job.list_holder {
            let name = format!("{}_serial_id", job.canonical_name);
            table.add_field(Field::new(name, FieldKind::SerialKey, case).with_required(true));
        }

        if let Some(parent) = &job.parent {
            let mut field = Field::new(
                format!("{}_id", parent),
                FieldKind::ForeignKey,
                case,
            )
            .with_required(true)
            .with_foreign_table(parent.clone());
            field.foreign_schema_group = Some(job.schema_group.clone());
            table.add_field(field);
        }
    }

    /// Iterative content walk over one table's declaration subtree.
    fn walk_content(&mut self, table: &mut Table, root: DeclNode, job: &TableJob) -> Result<()> {
        let mut stack: Vec<(DeclNode, Scope)> = vec![(root, Scope { required: true })];

        while let Some((node, scope)) = stack.pop() {
            match node.kind {
                DeclKind::ComplexType => {
                    if node.attr_bool(xsd_attrs::MIXED) {
                        self.add_mixed_content(table, job);
                    }
                    push_children(&mut stack, &node, scope);
                }
                DeclKind::Sequence | DeclKind::All => {
                    let occurs = node.occurs();
                    if occurs.is_repeated() {
                        table.list_holder = true;
                    }
                    let child_scope = Scope {
                        required: scope.required && occurs.min >= 1,
                    };
                    push_children(&mut stack, &node, child_scope);
                }
                DeclKind::Choice => {
                    let occurs = node.occurs();
                    if occurs.is_repeated() {
                        table.list_holder = true;
                    }
                    // Alternatives can never all be present
                    push_children(&mut stack, &node, Scope { required: false });
                }
                DeclKind::Element => {
                    self.walk_element(table, &node, scope, job)?;
                }
                DeclKind::Attribute => {
                    self.walk_attribute(table, &node, job);
                }
                DeclKind::AttributeGroup => {
                    if let Some(reference) = node.reference() {
                        self.reference_group(table, GroupKind::Attribute, reference);
                    } else {
                        // The definition itself: this job's own content
                        push_children(&mut stack, &node, scope);
                    }
                }
                DeclKind::Group => {
                    if let Some(reference) = node.reference() {
                        if node.occurs().is_repeated() {
                            table.list_holder = true;
                        }
                        self.reference_group(table, GroupKind::Model, reference);
                    } else {
                        push_children(&mut stack, &node, scope);
                    }
                }
                DeclKind::SimpleContent => {
                    self.walk_simple_content(table, &node, &mut stack, scope, job);
                }
                DeclKind::ComplexContent => {
                    if node.attr_bool(xsd_attrs::MIXED) {
                        self.add_mixed_content(table, job);
                    }
                    self.walk_complex_content(table, &node, &mut stack, scope, job);
                }
                DeclKind::Any => {
                    if self.options().allow_wildcards {
                        let case = self.options().case_sensitive;
                        let mut field = Field::new("any", FieldKind::Any, case);
                        field.list_holder = node.occurs().is_repeated();
                        table.add_field(field);
                    }
                }
                DeclKind::AnyAttribute => {
                    if self.options().allow_wildcards {
                        let case = self.options().case_sensitive;
                        table.add_field(Field::new("any_attribute", FieldKind::AnyAttribute, case));
                    }
                }
                DeclKind::Annotation => {
                    if table.annotation.is_none() {
                        if let Some(text) = extract_documentation(&node) {
                            table.annotation = Some(text);
                        }
                    }
                }
                _ => {}
            }
        }

        Ok(())
    }

    fn add_mixed_content(&self, table: &mut Table, job: &TableJob) {
        if table.field_by_storage_name("content").is_none() {
            let mut field = Field::with_storage("content", "content", FieldKind::SimpleContent);
            field.scalar = Some(ScalarKind::String);
            if let Some(tns) = &job.target_namespace {
                field.target_namespaces.push(tns.clone());
            }
            table.add_field(field);
        }
    }

    fn walk_element(
        &mut self,
        table: &mut Table,
        node: &DeclNode,
        scope: Scope,
        job: &TableJob,
    ) -> Result<()> {
        let Some(info) = self.element_info(node, job) else {
            return Ok(());
        };

        let required = scope.required && info.occurs.min >= 1;
        let repeated = info.occurs.is_repeated();

        if let Some(ct) = &info.inline_complex {
            // Anonymous in-line type: the new table is named after the
            // enclosing element.
            let child_name = info.name.clone();
            self.add_nested_key(table, job, &info, &child_name, &job.schema_group, required, repeated);
            self.enqueue_child(
                job,
                table,
                child_name,
                job.schema_group.clone(),
                required,
                repeated,
                JobContent::Complex(ct.clone()),
                info.annotation.clone(),
                false,
            );
            self.record_constraints(&info, table, job);
            return Ok(());
        }

        let def = if let Some(st) = &info.inline_simple {
            Some(self.simple_def_from_node(st, &job.ns, job.target_namespace.as_deref()))
        } else if let Some(type_name) = &info.type_name {
            match self.resolve_type_ref(&job.ns, job.target_namespace.as_deref(), type_name) {
                TypeRef::Builtin(scalar) => Some(SimpleDef::scalar(scalar)),
                TypeRef::Simple { group, local } => {
                    Some(self.resolve_simple(&group, &local, &job.ns, job.target_namespace.as_deref()))
                }
                TypeRef::Complex { group, local } => {
                    let content = TypeIndex::lookup(&self.types.complex_types, &group, &local)
                        .cloned();
                    match content {
                        Some(content_node) => {
                            self.add_nested_key(table, job, &info, &local, &group, required, repeated);
                            self.enqueue_child(
                                job,
                                table,
                                local,
                                group,
                                required,
                                repeated,
                                JobContent::Complex(content_node),
                                info.annotation.clone(),
                                true,
                            );
                            self.record_constraints(&info, table, job);
                            return Ok(());
                        }
                        None => Some(SimpleDef::scalar(ScalarKind::String)),
                    }
                }
                TypeRef::Unknown => Some(SimpleDef::scalar(ScalarKind::String)),
            }
        } else {
            // No declared type: xs:anyType, treated as character data
            Some(SimpleDef::scalar(ScalarKind::String))
        };

        let def = def.unwrap_or_else(|| SimpleDef::scalar(ScalarKind::String));

        if repeated || def.is_list {
            // A repeated scalar still needs its own table in relational form
            let child_name = format!("{}_{}", table.canonical_name, info.name);
            self.add_nested_key(table, job, &info, &child_name, &job.schema_group, required, true);
            self.enqueue_child(
                job,
                table,
                child_name,
                job.schema_group.clone(),
                required,
                true,
                JobContent::Simple {
                    field_name: info.name.clone(),
                    def,
                    type_name: info.type_name.clone(),
                },
                info.annotation.clone(),
                false,
            );
        } else {
            let case = self.options().case_sensitive;
            let mut field = Field::new(info.name.clone(), FieldKind::Element, case);
            field.scalar = Some(def.scalar);
            field.required = required;
            field.type_name = info.type_name.clone();
            if !def.restriction.is_empty() {
                field.restriction = Some(def.restriction.clone());
            }
            field.annotation = info.annotation.clone();
            field.fixed_value = info.fixed.clone();
            field.default_value = info.default_value.clone();
            field.substitution_group = info.substitution_group.clone();
            if let Some(tns) = &job.target_namespace {
                field.target_namespaces.push(tns.clone());
            }
            table.add_field(field);
        }

        self.record_constraints(&info, table, job);
        Ok(())
    }

    fn walk_attribute(&mut self, table: &mut Table, node: &DeclNode, job: &TableJob) {
        let case = self.options().case_sensitive;

        // Resolve top-level attribute references, keeping the particle's use=
        let resolved;
        let node = if let Some(reference) = node.reference() {
            let (_, local) = split_qname(reference);
            match TypeIndex::lookup(&self.types.attributes, &job.schema_group, local) {
                Some(target) => {
                    let mut merged = target.clone();
                    if let Some(use_attr) = node.attr(xsd_attrs::USE) {
                        merged
                            .attributes
                            .insert(xsd_attrs::USE.to_string(), use_attr.to_string());
                    }
                    resolved = merged;
                    &resolved
                }
                None => return,
            }
        } else {
            node
        };

        let Some(name) = node.name() else { return };
        let use_attr = node.attr(xsd_attrs::USE);

        let mut field = Field::new(name, FieldKind::Attribute, case);
        field.required = use_attr == Some("required");
        field.prohibited = use_attr == Some("prohibited");
        field.fixed_value = node.attr(xsd_attrs::FIXED).map(String::from);
        field.default_value = node.attr(xsd_attrs::DEFAULT).map(String::from);
        field.annotation = node.annotation();
        if let Some(tns) = &job.target_namespace {
            field.target_namespaces.push(tns.clone());
        }

        let def = if let Some(st) = node.child(DeclKind::SimpleType) {
            self.simple_def_from_node(st, &job.ns, job.target_namespace.as_deref())
        } else if let Some(type_name) = node.type_name() {
            field.type_name = Some(type_name.to_string());
            match self.resolve_type_ref(&job.ns, job.target_namespace.as_deref(), type_name) {
                TypeRef::Builtin(scalar) => SimpleDef::scalar(scalar),
                TypeRef::Simple { group, local } => {
                    self.resolve_simple(&group, &local, &job.ns, job.target_namespace.as_deref())
                }
                _ => SimpleDef::scalar(ScalarKind::String),
            }
        } else {
            SimpleDef::scalar(ScalarKind::String)
        };

        field.scalar = Some(def.scalar);
        if !def.restriction.is_empty() {
            field.restriction = Some(def.restriction);
        }
        table.add_field(field);
    }

    fn reference_group(&mut self, table: &mut Table, kind: GroupKind, reference: &str) {
        let (_, local) = split_qname(reference);
        let resolved = self.ctx.groups.resolve(kind, local).cloned();

        match resolved {
            Some((group, table_name)) if self.ctx.registry.contains(&group, &table_name) => {
                let fields = super::groups::splice_fields(&self.ctx.registry, &group, &table_name);
                for field in fields {
                    table.add_field(field);
                }
            }
            _ => {
                self.ctx.groups.push_pending(PendingGroup {
                    kind,
                    group_name: local.to_string(),
                    schema_group: table.schema_group.clone(),
                    table_name: table.canonical_name.clone(),
                    insert_at: table.fields.len(),
                });
            }
        }
    }

    fn walk_simple_content(
        &mut self,
        table: &mut Table,
        node: &DeclNode,
        stack: &mut Vec<(DeclNode, Scope)>,
        scope: Scope,
        job: &TableJob,
    ) {
        let (base, carrier) = if let Some(ext) = node.child(DeclKind::Extension) {
            (ext.attr(xsd_attrs::BASE), ext)
        } else if let Some(restriction) = node.child(DeclKind::Restriction) {
            (restriction.attr(xsd_attrs::BASE), restriction)
        } else {
            return;
        };

        let mut def = SimpleDef::scalar(ScalarKind::String);
        if let Some(base_name) = base {
            def = match self.resolve_type_ref(&job.ns, job.target_namespace.as_deref(), base_name) {
                TypeRef::Builtin(scalar) => SimpleDef::scalar(scalar),
                TypeRef::Simple { group, local } => {
                    self.resolve_simple(&group, &local, &job.ns, job.target_namespace.as_deref())
                }
                _ => SimpleDef::scalar(ScalarKind::String),
            };
        }
        if carrier.kind == DeclKind::Restriction {
            merge_facets(&mut def.restriction, parse_facets(carrier));
        }

        let mut field = Field::with_storage("content", "content", FieldKind::SimpleContent);
        field.scalar = Some(def.scalar);
        field.required = true;
        field.type_name = base.map(String::from);
        if !def.restriction.is_empty() {
            field.restriction = Some(def.restriction);
        }
        if let Some(tns) = &job.target_namespace {
            field.target_namespaces.push(tns.clone());
        }
        table.add_field(field);

        // Attributes declared on the extension/restriction
        push_children(stack, carrier, scope);
    }

    fn walk_complex_content(
        &mut self,
        table: &mut Table,
        node: &DeclNode,
        stack: &mut Vec<(DeclNode, Scope)>,
        scope: Scope,
        job: &TableJob,
    ) {
        if let Some(ext) = node.child(DeclKind::Extension) {
            // Extension's own particles walk after the imported base fields,
            // so push them first (the stack pops in reverse).
            push_children(stack, ext, scope);

            if let Some(base_name) = ext.attr(xsd_attrs::BASE) {
                if let TypeRef::Complex { group, local } =
                    self.resolve_type_ref(&job.ns, job.target_namespace.as_deref(), base_name)
                {
                    if let Some(base_node) =
                        TypeIndex::lookup(&self.types.complex_types, &group, &local)
                    {
                        stack.push((base_node.clone(), scope));
                    }

                    let pk_storage =
                        to_storage_name(&format!("{}_id", table.canonical_name), self.options().case_sensitive);
                    let base_pk =
                        to_storage_name(&format!("{}_id", local), self.options().case_sensitive);
                    self.ctx.foreign_keys.push(ForeignKeyDecl {
                        name: format!("{}_{}_fkey", table.storage_name, to_storage_name(&local, true)),
                        table: table.canonical_name.clone(),
                        schema_group: table.schema_group.clone(),
                        fields: vec![pk_storage],
                        refer_key: None,
                        refer_table: Some(local),
                        refer_fields: vec![base_pk],
                    });
                }
            }
        } else if let Some(restriction) = node.child(DeclKind::Restriction) {
            // Restricted content stands on its own
            push_children(stack, restriction, scope);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn add_nested_key(
        &self,
        table: &mut Table,
        job: &TableJob,
        info: &ElementInfo,
        child_name: &str,
        child_group: &str,
        required: bool,
        repeated: bool,
    ) {
        let case = self.options().case_sensitive;
        let storage = to_storage_name(&format!("{}_id", info.name), case);
        let mut field = Field::with_storage(info.name.clone(), storage, FieldKind::NestedKey);
        field.required = required;
        field.list_holder = repeated;
        field.foreign_table_name = Some(child_name.to_string());
        field.foreign_schema_group = Some(child_group.to_string());
        field.annotation = info.annotation.clone();
        if let Some(tns) = &job.target_namespace {
            field.target_namespaces.push(tns.clone());
        }
        table.add_field(field);
    }

    #[allow(clippy::too_many_arguments)]
    fn enqueue_child(
        &mut self,
        job: &TableJob,
        table: &Table,
        child_name: String,
        child_group: String,
        required: bool,
        list_holder: bool,
        content: JobContent,
        annotation: Option<String>,
        named_type: bool,
    ) {
        let kind = match table.kind {
            TableKind::Root | TableKind::RootChild => TableKind::RootChild,
            _ => TableKind::AdminChild,
        };
        let level = job.level + 1;

        if named_type {
            let key = (child_group.clone(), child_name.clone());
            if self.queued.contains(&key) {
                // The type's table exists or is on the queue; only its kind
                // and level may need re-tagging.
                self.promotions.push((child_group, child_name, kind, level));
                return;
            }
            self.queued.insert(key);
        }

        self.jobs.push_back(TableJob {
            canonical_name: child_name,
            kind,
            schema_group: child_group,
            level,
            required,
            list_holder,
            content,
            annotation,
            location: job.location.clone(),
            target_namespace: job.target_namespace.clone(),
            ns: job.ns.clone(),
            parent: Some(table.canonical_name.clone()),
        });
    }

    fn record_constraints(&mut self, info: &ElementInfo, table: &Table, _job: &TableJob) {
        let constraints = info.constraints.clone();
        for constraint in &constraints {
            self.record_constraint(constraint, &table.canonical_name, &table.schema_group);
        }
    }

    /// Record the key/keyref/unique children declared on an element node
    fn record_node_constraints(&mut self, node: &DeclNode, table_name: &str, schema_group: &str) {
        let constraints: Vec<DeclNode> = node
            .children
            .iter()
            .filter(|c| matches!(c.kind, DeclKind::Key | DeclKind::Keyref | DeclKind::Unique))
            .cloned()
            .collect();
        for constraint in &constraints {
            self.record_constraint(constraint, table_name, schema_group);
        }
    }

    fn record_constraint(&mut self, constraint: &DeclNode, table_name: &str, schema_group: &str) {
        let Some(name) = constraint.name() else { return };
        let fields: Vec<String> = constraint
            .children_of(DeclKind::Other)
            .filter(|c| c.qname.local_name == "field")
            .filter_map(|c| c.attr(xsd_attrs::XPATH))
            .map(strip_xpath)
            .collect();

        match constraint.kind {
            DeclKind::Key | DeclKind::Unique => {
                self.ctx.keys.push(Key {
                    name: name.to_string(),
                    table: table_name.to_string(),
                    schema_group: schema_group.to_string(),
                    fields,
                });
            }
            DeclKind::Keyref => {
                let refer = constraint
                    .attr(xsd_attrs::REFER)
                    .map(|r| split_qname(r).1.to_string())
                    .unwrap_or_default();
                self.ctx.foreign_keys.push(ForeignKeyDecl {
                    name: name.to_string(),
                    table: table_name.to_string(),
                    schema_group: schema_group.to_string(),
                    fields,
                    refer_key: Some(refer),
                    refer_table: None,
                    refer_fields: Vec::new(),
                });
            }
            _ => {}
        }
    }

    fn element_info(&self, node: &DeclNode, job: &TableJob) -> Option<ElementInfo> {
        if let Some(reference) = node.reference() {
            let (_, local) = split_qname(reference);
            let target = TypeIndex::lookup(&self.types.elements, &job.schema_group, local)?;
            if target.attr_bool(xsd_attrs::ABSTRACT) {
                return None;
            }
            let mut info = self.element_info(target, job)?;
            info.occurs = node.occurs();
            return Some(info);
        }

        if node.attr_bool(xsd_attrs::ABSTRACT) {
            return None;
        }
        let name = node.name()?.to_string();

        let substitution_group = node
            .attr(xsd_attrs::SUBSTITUTION_GROUP)
            .map(|s| split_qname(s).1.to_string());

        // An element substituting a head inherits the head's type when it
        // declares none of its own.
        let mut type_name = node.type_name().map(String::from);
        if type_name.is_none() && node.child(DeclKind::ComplexType).is_none() {
            if let Some(head) = &substitution_group {
                if let Some(head_node) =
                    TypeIndex::lookup(&self.types.elements, &job.schema_group, head)
                {
                    type_name = head_node.type_name().map(String::from);
                }
            }
        }

        Some(ElementInfo {
            name,
            type_name,
            inline_complex: node.child(DeclKind::ComplexType).cloned(),
            inline_simple: node.child(DeclKind::SimpleType).cloned(),
            occurs: node.occurs(),
            annotation: node.annotation(),
            fixed: node.attr(xsd_attrs::FIXED).map(String::from),
            default_value: node.attr(xsd_attrs::DEFAULT).map(String::from),
            substitution_group,
            constraints: node
                .children
                .iter()
                .filter(|c| {
                    matches!(c.kind, DeclKind::Key | DeclKind::Keyref | DeclKind::Unique)
                })
                .cloned()
                .collect(),
        })
    }

    /// Resolve a declared type name against the builtin namespace and the
    /// named-type index.
    fn resolve_type_ref(
        &self,
        ns: &NamespaceContext,
        target_namespace: Option<&str>,
        name: &str,
    ) -> TypeRef {
        let (prefix, local) = split_qname(name);
        let namespace = match prefix {
            Some(p) => ns.get_namespace(p),
            None => ns.get_default_namespace().or(target_namespace),
        };

        if namespace == Some(XSD_NAMESPACE) {
            return TypeRef::Builtin(ScalarKind::from_builtin(local).unwrap_or(ScalarKind::String));
        }

        let group = self.ctx.group_for_namespace(namespace);

        if let Some((g, _)) = TypeIndex::lookup_group(&self.types.simple_types, &group, local) {
            return TypeRef::Simple {
                group: g.to_string(),
                local: local.to_string(),
            };
        }
        if let Some((g, _)) = TypeIndex::lookup_group(&self.types.complex_types, &group, local) {
            return TypeRef::Complex {
                group: g.to_string(),
                local: local.to_string(),
            };
        }

        TypeRef::Unknown
    }

    fn resolve_simple(
        &self,
        group: &str,
        local: &str,
        ns: &NamespaceContext,
        target_namespace: Option<&str>,
    ) -> SimpleDef {
        match TypeIndex::lookup(&self.types.simple_types, group, local) {
            Some(node) => {
                let node = node.clone();
                self.simple_def_from_node(&node, ns, target_namespace)
            }
            None => SimpleDef::scalar(ScalarKind::String),
        }
    }

    /// Resolve a simple type node down to a scalar classification, merging
    /// facets along the restriction chain (outermost facets win).
    fn simple_def_from_node(
        &self,
        node: &DeclNode,
        ns: &NamespaceContext,
        target_namespace: Option<&str>,
    ) -> SimpleDef {
        let mut restriction = Restriction::default();
        let mut is_list = false;
        let mut visited: HashSet<(String, String)> = HashSet::new();
        let mut current = node.clone();

        loop {
            let step = if let Some(r) = current.child(DeclKind::Restriction) {
                merge_facets(&mut restriction, parse_facets(r));

                if let Some(inner) = r.child(DeclKind::SimpleType) {
                    Step::Into(inner.clone())
                } else if let Some(base) = r.attr(xsd_attrs::BASE) {
                    self.simple_base_step(base, ns, target_namespace, &mut visited)
                } else {
                    Step::Stop
                }
            } else if let Some(list) = current.child(DeclKind::List) {
                is_list = true;
                if let Some(inner) = list.child(DeclKind::SimpleType) {
                    Step::Into(inner.clone())
                } else if let Some(item) = list.attr(xsd_attrs::ITEM_TYPE) {
                    self.simple_base_step(item, ns, target_namespace, &mut visited)
                } else {
                    Step::Stop
                }
            } else {
                // Union or empty body: degrade to character data
                Step::Stop
            };

            match step {
                Step::Into(next) => current = next,
                Step::Scalar(scalar) => {
                    return SimpleDef {
                        scalar,
                        restriction,
                        is_list,
                    }
                }
                Step::Stop => {
                    return SimpleDef {
                        scalar: ScalarKind::String,
                        restriction,
                        is_list,
                    }
                }
            }
        }
    }

    /// One chain-following step for a restriction base or list item type
    fn simple_base_step(
        &self,
        type_name: &str,
        ns: &NamespaceContext,
        target_namespace: Option<&str>,
        visited: &mut HashSet<(String, String)>,
    ) -> Step {
        match self.resolve_type_ref(ns, target_namespace, type_name) {
            TypeRef::Builtin(scalar) => Step::Scalar(scalar),
            TypeRef::Simple { group, local } => {
                if !visited.insert((group.clone(), local.clone())) {
                    return Step::Stop;
                }
                match TypeIndex::lookup(&self.types.simple_types, &group, &local) {
                    Some(next) => Step::Into(next.clone()),
                    None => Step::Stop,
                }
            }
            _ => Step::Stop,
        }
    }
}

/// One transition while following a simple-type definition chain
enum Step {
    /// Continue into another simple type node
    Into(DeclNode),
    /// Reached a builtin scalar
    Scalar(ScalarKind),
    /// Chain ends without a builtin (union, unknown, or a cycle)
    Stop,
}

/// Push a node's children so the stack pops them in document order
fn push_children(stack: &mut Vec<(DeclNode, Scope)>, node: &DeclNode, scope: Scope) {
    for child in node.children.iter().rev() {
        stack.push((child.clone(), scope));
    }
}

fn extract_documentation(annotation: &DeclNode) -> Option<String> {
    let parts: Vec<String> = annotation
        .children
        .iter()
        .filter(|c| c.qname.local_name == "documentation")
        .filter_map(|c| c.text.as_ref())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("\n"))
    }
}

/// Reduce a constraint field xpath to a plain field name
fn strip_xpath(xpath: &str) -> String {
    let last = xpath.rsplit('/').next().unwrap_or(xpath);
    last.trim_start_matches('@').to_string()
}

fn parse_u32(value: Option<&str>) -> Option<u32> {
    value.and_then(|v| v.parse().ok())
}

fn parse_decimal(value: Option<&str>) -> Option<rust_decimal::Decimal> {
    value.and_then(|v| v.parse().ok())
}

/// Collect the facet children of a restriction node
fn parse_facets(restriction: &DeclNode) -> Restriction {
    let mut facets = Restriction::default();

    for child in &restriction.children {
        if child.kind != DeclKind::Other {
            continue;
        }
        let value = child.attr(xsd_attrs::VALUE);
        match child.qname.local_name.as_str() {
            "enumeration" => {
                if let Some(v) = value {
                    facets.enumeration.push(v.to_string());
                }
            }
            "pattern" => {
                if facets.pattern.is_none() {
                    facets.pattern = value.map(String::from);
                }
            }
            "length" => facets.length = parse_u32(value),
            "minLength" => facets.min_length = parse_u32(value),
            "maxLength" => facets.max_length = parse_u32(value),
            "minInclusive" => facets.min_inclusive = parse_decimal(value),
            "maxInclusive" => facets.max_inclusive = parse_decimal(value),
            "minExclusive" => facets.min_exclusive = parse_decimal(value),
            "maxExclusive" => facets.max_exclusive = parse_decimal(value),
            "whiteSpace" => facets.white_space = value.map(String::from),
            "totalDigits" => facets.total_digits = parse_u32(value),
            "fractionDigits" => facets.fraction_digits = parse_u32(value),
            _ => {}
        }
    }

    facets
}

/// Merge inner-chain facets into the accumulated set; facets already set by
/// an outer restriction win.
fn merge_facets(dst: &mut Restriction, src: Restriction) {
    if dst.enumeration.is_empty() {
        dst.enumeration = src.enumeration;
    }
    dst.length = dst.length.or(src.length);
    dst.min_length = dst.min_length.or(src.min_length);
    dst.max_length = dst.max_length.or(src.max_length);
    dst.min_inclusive = dst.min_inclusive.or(src.min_inclusive);
    dst.max_inclusive = dst.max_inclusive.or(src.max_inclusive);
    dst.min_exclusive = dst.min_exclusive.or(src.min_exclusive);
    dst.max_exclusive = dst.max_exclusive.or(src.max_exclusive);
    if dst.pattern.is_none() {
        dst.pattern = src.pattern;
    }
    if dst.white_space.is_none() {
        dst.white_space = src.white_space;
    }
    dst.total_digits = dst.total_digits.or(src.total_digits);
    dst.fraction_digits = dst.fraction_digits.or(src.fraction_digits);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_xpath() {
        assert_eq!(strip_xpath("@id"), "id");
        assert_eq!(strip_xpath("./item/@code"), "code");
        assert_eq!(strip_xpath("name"), "name");
    }

    #[test]
    fn test_merge_facets_outer_wins() {
        let mut outer = Restriction {
            max_length: Some(10),
            ..Restriction::default()
        };
        let inner = Restriction {
            max_length: Some(50),
            min_length: Some(1),
            ..Restriction::default()
        };
        merge_facets(&mut outer, inner);
        assert_eq!(outer.max_length, Some(10));
        assert_eq!(outer.min_length, Some(1));
    }
}
