//! Table model
//!
//! A table is created when a declaration first introduces a named element or
//! type, mutated during deduplication and classification, and frozen into
//! the compiled model afterwards.

use crate::model::field::{Field, FieldKind};

/// Table kind tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum TableKind {
    /// Table of a root element declaration
    Root,
    /// Table nested under a root element
    RootChild,
    /// Table of a top-level named type declaration
    AdminRoot,
    /// Table nested under a top-level named type
    AdminChild,
    /// Attribute group definition
    AttributeGroup,
    /// Model group definition
    ModelGroup,
}

impl TableKind {
    /// Whether this kind is a nested child occurrence
    pub fn is_child(&self) -> bool {
        matches!(self, Self::RootChild | Self::AdminChild)
    }

    /// Whether this kind is a group definition
    pub fn is_group(&self) -> bool {
        matches!(self, Self::AttributeGroup | Self::ModelGroup)
    }
}

/// A relational table compiled from a schema declaration
#[derive(Debug, Clone, serde::Serialize)]
pub struct Table {
    /// Case-sensitive canonical name from the source vocabulary
    pub canonical_name: String,
    /// Normalized storage name
    pub storage_name: String,
    /// Owning schema group (target namespace name or the default group)
    pub schema_group: String,
    /// Target namespaces this table was declared under
    pub target_namespaces: Vec<String>,
    /// Schema document locations that declared this table
    pub schema_locations: Vec<String>,
    /// Table kind tag
    pub kind: TableKind,
    /// Ordered field list
    pub fields: Vec<Field>,
    /// Nesting depth of the declaration
    pub level: u32,
    /// Registry insertion order, for dependency-respecting emission
    pub order: usize,
    /// Whether an occurrence of this table is mandatory
    pub required: bool,
    /// No addressable content of its own
    pub is_virtual: bool,
    /// Exactly one nested child and no other content
    pub is_bridge: bool,
    /// Source multiplicity exceeds one occurrence
    pub list_holder: bool,
    /// Holds at least one addressable content field
    pub content_holder: bool,
    /// Participates in the emitted model
    pub writable: bool,
    /// Incompatible declarations collapsed onto this name
    pub name_collision: bool,
    /// Requiredness is propagated through this table's nested keys
    pub propagate_required: bool,
    /// Documentation text from the declaration
    pub annotation: Option<String>,
}

impl Table {
    /// Create a new table
    pub fn new(
        canonical_name: impl Into<String>,
        storage_name: impl Into<String>,
        schema_group: impl Into<String>,
        kind: TableKind,
        level: u32,
    ) -> Self {
        Self {
            canonical_name: canonical_name.into(),
            storage_name: storage_name.into(),
            schema_group: schema_group.into(),
            target_namespaces: Vec::new(),
            schema_locations: Vec::new(),
            kind,
            fields: Vec::new(),
            level,
            order: 0,
            required: false,
            is_virtual: false,
            is_bridge: false,
            list_holder: false,
            content_holder: false,
            writable: false,
            name_collision: false,
            propagate_required: true,
            annotation: None,
        }
    }

    /// Append a field
    pub fn add_field(&mut self, field: Field) {
        self.fields.push(field);
    }

    /// Find a field by its normalized storage name
    pub fn field_by_storage_name(&self, storage_name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.storage_name == storage_name)
    }

    /// Find a field index by its normalized storage name
    pub fn field_index(&self, storage_name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.storage_name == storage_name)
    }

    /// Number of addressable content fields (attributes, elements, simple content)
    pub fn content_field_count(&self) -> usize {
        self.fields.iter().filter(|f| f.kind.is_content()).count()
    }

    /// Number of nested-key fields
    pub fn nested_key_count(&self) -> usize {
        self.fields
            .iter()
            .filter(|f| f.kind == FieldKind::NestedKey)
            .count()
    }

    /// Nested-key fields in declaration order
    pub fn nested_keys(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| f.kind == FieldKind::NestedKey)
    }

    /// Remove prohibited attributes and de-duplicate fields that collapsed
    /// onto the same storage name (substitution-group folding). Re-run after
    /// group splicing.
    pub fn cleanup(&mut self) {
        self.fields.retain(|f| !f.prohibited);

        let mut seen = std::collections::HashSet::new();
        self.fields.retain(|f| seen.insert(f.storage_name.clone()));
    }
}
