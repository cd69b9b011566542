//! Schema declaration tree
//!
//! This module defines the namespace-aware declaration tree the compiler
//! walks: a parsed schema document whose nodes are tagged with a
//! declaration-kind enum so the extraction pass can dispatch via pattern
//! matching instead of string comparison. The bundled `reader` produces
//! these trees; any other loader may do the same.

use std::collections::HashMap;

use crate::namespaces::{NamespaceContext, QName};

/// XSD declaration element local names
#[allow(missing_docs)]
pub mod xsd_elements {
    pub const SCHEMA: &str = "schema";
    pub const ELEMENT: &str = "element";
    pub const COMPLEX_TYPE: &str = "complexType";
    pub const SIMPLE_TYPE: &str = "simpleType";
    pub const ATTRIBUTE: &str = "attribute";
    pub const ATTRIBUTE_GROUP: &str = "attributeGroup";
    pub const GROUP: &str = "group";
    pub const SEQUENCE: &str = "sequence";
    pub const CHOICE: &str = "choice";
    pub const ALL: &str = "all";
    pub const ANNOTATION: &str = "annotation";
    pub const DOCUMENTATION: &str = "documentation";
    pub const IMPORT: &str = "import";
    pub const INCLUDE: &str = "include";
    pub const RESTRICTION: &str = "restriction";
    pub const EXTENSION: &str = "extension";
    pub const LIST: &str = "list";
    pub const UNION: &str = "union";
    pub const COMPLEX_CONTENT: &str = "complexContent";
    pub const SIMPLE_CONTENT: &str = "simpleContent";
    pub const ANY: &str = "any";
    pub const ANY_ATTRIBUTE: &str = "anyAttribute";
    pub const KEY: &str = "key";
    pub const KEYREF: &str = "keyref";
    pub const UNIQUE: &str = "unique";
    pub const SELECTOR: &str = "selector";
    pub const FIELD: &str = "field";
}

/// XSD attribute names
#[allow(missing_docs)]
pub mod xsd_attrs {
    pub const NAME: &str = "name";
    pub const TYPE: &str = "type";
    pub const REF: &str = "ref";
    pub const TARGET_NAMESPACE: &str = "targetNamespace";
    pub const BASE: &str = "base";
    pub const VALUE: &str = "value";
    pub const MIXED: &str = "mixed";
    pub const ABSTRACT: &str = "abstract";
    pub const SUBSTITUTION_GROUP: &str = "substitutionGroup";
    pub const SCHEMA_LOCATION: &str = "schemaLocation";
    pub const NAMESPACE: &str = "namespace";
    pub const ITEM_TYPE: &str = "itemType";
    pub const MEMBER_TYPES: &str = "memberTypes";
    pub const MIN_OCCURS: &str = "minOccurs";
    pub const MAX_OCCURS: &str = "maxOccurs";
    pub const USE: &str = "use";
    pub const DEFAULT: &str = "default";
    pub const FIXED: &str = "fixed";
    pub const REFER: &str = "refer";
    pub const XPATH: &str = "xpath";
}

/// Declaration kind of a schema tree node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    /// `xs:schema` document root
    Schema,
    /// `xs:element`
    Element,
    /// `xs:attribute`
    Attribute,
    /// `xs:complexType`
    ComplexType,
    /// `xs:simpleType`
    SimpleType,
    /// `xs:attributeGroup`
    AttributeGroup,
    /// `xs:group`
    Group,
    /// `xs:sequence`
    Sequence,
    /// `xs:choice`
    Choice,
    /// `xs:all`
    All,
    /// `xs:simpleContent`
    SimpleContent,
    /// `xs:complexContent`
    ComplexContent,
    /// `xs:extension`
    Extension,
    /// `xs:restriction`
    Restriction,
    /// `xs:list`
    List,
    /// `xs:union`
    Union,
    /// `xs:any`
    Any,
    /// `xs:anyAttribute`
    AnyAttribute,
    /// `xs:annotation`
    Annotation,
    /// `xs:include`
    Include,
    /// `xs:import`
    Import,
    /// `xs:key`
    Key,
    /// `xs:keyref`
    Keyref,
    /// `xs:unique`
    Unique,
    /// Anything else (facets, notation, selector/field, ...)
    Other,
}

impl DeclKind {
    /// Classify a declaration by its local element name
    pub fn from_local_name(local: &str) -> Self {
        match local {
            xsd_elements::SCHEMA => Self::Schema,
            xsd_elements::ELEMENT => Self::Element,
            xsd_elements::ATTRIBUTE => Self::Attribute,
            xsd_elements::COMPLEX_TYPE => Self::ComplexType,
            xsd_elements::SIMPLE_TYPE => Self::SimpleType,
            xsd_elements::ATTRIBUTE_GROUP => Self::AttributeGroup,
            xsd_elements::GROUP => Self::Group,
            xsd_elements::SEQUENCE => Self::Sequence,
            xsd_elements::CHOICE => Self::Choice,
            xsd_elements::ALL => Self::All,
            xsd_elements::SIMPLE_CONTENT => Self::SimpleContent,
            xsd_elements::COMPLEX_CONTENT => Self::ComplexContent,
            xsd_elements::EXTENSION => Self::Extension,
            xsd_elements::RESTRICTION => Self::Restriction,
            xsd_elements::LIST => Self::List,
            xsd_elements::UNION => Self::Union,
            xsd_elements::ANY => Self::Any,
            xsd_elements::ANY_ATTRIBUTE => Self::AnyAttribute,
            xsd_elements::ANNOTATION => Self::Annotation,
            xsd_elements::INCLUDE => Self::Include,
            xsd_elements::IMPORT => Self::Import,
            xsd_elements::KEY => Self::Key,
            xsd_elements::KEYREF => Self::Keyref,
            xsd_elements::UNIQUE => Self::Unique,
            _ => Self::Other,
        }
    }
}

/// Occurrence constraints of a particle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurs {
    /// Minimum occurrences
    pub min: u32,
    /// Maximum occurrences (None = unbounded)
    pub max: Option<u32>,
}

impl Default for Occurs {
    fn default() -> Self {
        Self { min: 1, max: Some(1) }
    }
}

impl Occurs {
    /// Parse from minOccurs/maxOccurs attribute values
    pub fn parse(min: Option<&str>, max: Option<&str>) -> Self {
        let min = min.and_then(|s| s.parse().ok()).unwrap_or(1);
        let max = match max {
            Some("unbounded") => None,
            Some(s) => Some(s.parse().unwrap_or(1)),
            None => Some(1),
        };
        Self { min, max }
    }

    /// Whether the particle is optional
    pub fn is_optional(&self) -> bool {
        self.min == 0
    }

    /// Whether the particle may occur more than once
    pub fn is_repeated(&self) -> bool {
        self.max.map(|m| m > 1).unwrap_or(true)
    }
}

/// A node in the schema declaration tree
#[derive(Debug, Clone)]
pub struct DeclNode {
    /// Declaration kind tag
    pub kind: DeclKind,
    /// Qualified element name
    pub qname: QName,
    /// Attributes by local name (XSD declaration attributes are unqualified)
    pub attributes: HashMap<String, String>,
    /// Child declarations in document order
    pub children: Vec<DeclNode>,
    /// Text content (annotation/documentation nodes)
    pub text: Option<String>,
}

impl DeclNode {
    /// Create a new node of the given kind
    pub fn new(kind: DeclKind, qname: QName) -> Self {
        Self {
            kind,
            qname,
            attributes: HashMap::new(),
            children: Vec::new(),
            text: None,
        }
    }

    /// Get an attribute value by local name
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(|s| s.as_str())
    }

    /// Get the `name` attribute
    pub fn name(&self) -> Option<&str> {
        self.attr(xsd_attrs::NAME)
    }

    /// Get the `ref` attribute
    pub fn reference(&self) -> Option<&str> {
        self.attr(xsd_attrs::REF)
    }

    /// Get the `type` attribute
    pub fn type_name(&self) -> Option<&str> {
        self.attr(xsd_attrs::TYPE)
    }

    /// Get a boolean attribute ("true"/"1")
    pub fn attr_bool(&self, name: &str) -> bool {
        matches!(self.attr(name), Some("true") | Some("1"))
    }

    /// Parse the occurrence constraints of this particle
    pub fn occurs(&self) -> Occurs {
        Occurs::parse(self.attr(xsd_attrs::MIN_OCCURS), self.attr(xsd_attrs::MAX_OCCURS))
    }

    /// First child of a given kind
    pub fn child(&self, kind: DeclKind) -> Option<&DeclNode> {
        self.children.iter().find(|c| c.kind == kind)
    }

    /// All children of a given kind
    pub fn children_of(&self, kind: DeclKind) -> impl Iterator<Item = &DeclNode> {
        self.children.iter().filter(move |c| c.kind == kind)
    }

    /// Extract annotation documentation text, if any
    pub fn annotation(&self) -> Option<String> {
        let annotation = self.child(DeclKind::Annotation)?;
        let mut parts = Vec::new();
        for doc in &annotation.children {
            if doc.qname.local_name == xsd_elements::DOCUMENTATION {
                if let Some(text) = &doc.text {
                    let trimmed = text.trim();
                    if !trimmed.is_empty() {
                        parts.push(trimmed.to_string());
                    }
                }
            }
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("\n"))
        }
    }
}

/// A parsed schema document with its source identity
#[derive(Debug, Clone)]
pub struct SchemaDocument {
    /// Source location string (file path, URL, or inline identifier)
    pub location: String,
    /// Declared target namespace
    pub target_namespace: Option<String>,
    /// Namespace prefix declarations in scope at the schema root
    pub namespaces: NamespaceContext,
    /// The `xs:schema` root node
    pub root: DeclNode,
}

impl SchemaDocument {
    /// Iterate over the document's top-level declarations
    pub fn top_level(&self) -> impl Iterator<Item = &DeclNode> {
        self.root.children.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decl_kind_from_local_name() {
        assert_eq!(DeclKind::from_local_name("element"), DeclKind::Element);
        assert_eq!(DeclKind::from_local_name("attributeGroup"), DeclKind::AttributeGroup);
        assert_eq!(DeclKind::from_local_name("notation"), DeclKind::Other);
    }

    #[test]
    fn test_occurs_parsing() {
        let occurs = Occurs::parse(Some("0"), Some("unbounded"));
        assert!(occurs.is_optional());
        assert!(occurs.is_repeated());

        let single = Occurs::parse(None, None);
        assert!(!single.is_optional());
        assert!(!single.is_repeated());
    }

    #[test]
    fn test_node_accessors() {
        let mut node = DeclNode::new(DeclKind::Element, QName::local("element"));
        node.attributes.insert("name".to_string(), "order".to_string());
        node.attributes.insert("abstract".to_string(), "true".to_string());

        assert_eq!(node.name(), Some("order"));
        assert!(node.attr_bool("abstract"));
        assert!(!node.attr_bool("nillable"));
    }
}
