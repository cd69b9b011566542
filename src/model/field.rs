//! Field model
//!
//! A field belongs to exactly one table. Scalar fields carry a primitive
//! classification precomputed for downstream writers (SQL-ish storage type,
//! JSON-schema-style hint); key fields link tables together.

use rust_decimal::Decimal;

use crate::names::to_storage_name;

/// Classification of an XSD built-in primitive type
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum ScalarKind {
    /// Character data (string, token, Name, ID, ...)
    String,
    /// xs:boolean
    Boolean,
    /// xs:decimal
    Decimal,
    /// Unbounded integer family (integer, nonNegativeInteger, ...)
    Integer,
    /// xs:long / xs:unsignedLong
    Long,
    /// xs:int / xs:unsignedInt
    Int,
    /// xs:short / xs:byte and unsigned variants
    Short,
    /// xs:float
    Float,
    /// xs:double
    Double,
    /// xs:date
    Date,
    /// xs:time
    Time,
    /// xs:dateTime
    DateTime,
    /// xs:duration
    Duration,
    /// xs:hexBinary / xs:base64Binary
    Binary,
    /// xs:anyURI
    AnyUri,
}

impl ScalarKind {
    /// Classify an XSD built-in type by its local name
    pub fn from_builtin(local: &str) -> Option<Self> {
        let kind = match local {
            "string" | "normalizedString" | "token" | "language" | "Name" | "NCName" | "ID"
            | "IDREF" | "IDREFS" | "ENTITY" | "ENTITIES" | "NMTOKEN" | "NMTOKENS" | "QName"
            | "NOTATION" | "anyType" | "anySimpleType" | "gYear" | "gYearMonth" | "gMonth"
            | "gMonthDay" | "gDay" => Self::String,
            "boolean" => Self::Boolean,
            "decimal" => Self::Decimal,
            "integer" | "nonPositiveInteger" | "negativeInteger" | "nonNegativeInteger"
            | "positiveInteger" => Self::Integer,
            "long" | "unsignedLong" => Self::Long,
            "int" | "unsignedInt" => Self::Int,
            "short" | "unsignedShort" | "byte" | "unsignedByte" => Self::Short,
            "float" => Self::Float,
            "double" => Self::Double,
            "date" => Self::Date,
            "time" => Self::Time,
            "dateTime" => Self::DateTime,
            "duration" => Self::Duration,
            "hexBinary" | "base64Binary" => Self::Binary,
            "anyURI" => Self::AnyUri,
            _ => return None,
        };
        Some(kind)
    }

    /// SQL-ish storage type for this scalar
    pub fn sql_type(&self) -> &'static str {
        match self {
            Self::String | Self::AnyUri => "text",
            Self::Boolean => "boolean",
            Self::Decimal | Self::Integer => "numeric",
            Self::Long => "bigint",
            Self::Int => "integer",
            Self::Short => "smallint",
            Self::Float => "real",
            Self::Double => "double precision",
            Self::Date => "date",
            Self::Time => "time",
            Self::DateTime => "timestamp",
            Self::Duration => "interval",
            Self::Binary => "bytea",
        }
    }

    /// JSON-schema-style type hint
    pub fn json_hint(&self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Decimal | Self::Float | Self::Double => "number",
            Self::Integer | Self::Long | Self::Int | Self::Short => "integer",
            _ => "string",
        }
    }
}

/// Restriction facet metadata captured from a simple type
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct Restriction {
    /// Enumerated values, in declaration order
    pub enumeration: Vec<String>,
    /// Exact length facet
    pub length: Option<u32>,
    /// Minimum length facet
    pub min_length: Option<u32>,
    /// Maximum length facet
    pub max_length: Option<u32>,
    /// minInclusive bound
    pub min_inclusive: Option<Decimal>,
    /// maxInclusive bound
    pub max_inclusive: Option<Decimal>,
    /// minExclusive bound
    pub min_exclusive: Option<Decimal>,
    /// maxExclusive bound
    pub max_exclusive: Option<Decimal>,
    /// Pattern facet (first pattern wins)
    pub pattern: Option<String>,
    /// whiteSpace facet value
    pub white_space: Option<String>,
    /// totalDigits facet
    pub total_digits: Option<u32>,
    /// fractionDigits facet
    pub fraction_digits: Option<u32>,
}

impl Restriction {
    /// Whether no facet is set
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Field type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum FieldKind {
    /// Declared XML attribute
    Attribute,
    /// Declared element with simple content
    Element,
    /// Simple content of a complex type
    SimpleContent,
    /// xs:any wildcard
    Any,
    /// xs:anyAttribute wildcard
    AnyAttribute,
    /// Generated primary key
    PrimaryKey,
    /// Foreign key to a parent or base table
    ForeignKey,
    /// Link to a child table holding a sub-structure
    NestedKey,
    /// Generated source-document identifier
    DocumentKey,
    /// Generated sibling ordinal on list holders
    SerialKey,
    /// Generated hash of the node path
    XPathKey,
}

impl FieldKind {
    /// Whether this is a generated or linking key field
    pub fn is_key(&self) -> bool {
        matches!(
            self,
            Self::PrimaryKey
                | Self::ForeignKey
                | Self::NestedKey
                | Self::DocumentKey
                | Self::SerialKey
                | Self::XPathKey
        )
    }

    /// Whether this field holds addressable document content
    pub fn is_content(&self) -> bool {
        matches!(self, Self::Attribute | Self::Element | Self::SimpleContent)
    }

    /// Whether this is a wildcard field
    pub fn is_wildcard(&self) -> bool {
        matches!(self, Self::Any | Self::AnyAttribute)
    }
}

/// A single field of a table
#[derive(Debug, Clone, serde::Serialize)]
pub struct Field {
    /// Name in the source vocabulary
    pub name: String,
    /// Normalized storage name
    pub storage_name: String,
    /// Field type tag
    pub kind: FieldKind,
    /// Primitive classification for scalar fields
    pub scalar: Option<ScalarKind>,
    /// Declared XSD type name, when one was named
    pub type_name: Option<String>,
    /// Whether an occurrence is mandatory
    pub required: bool,
    /// Whether the source multiplicity exceeds one
    pub list_holder: bool,
    /// Canonical name of the foreign table (foreign/nested keys, unresolved form)
    pub foreign_table_name: Option<String>,
    /// Schema group of the foreign table, when it differs from the owner's
    pub foreign_schema_group: Option<String>,
    /// Index of the foreign table once the full table set is known
    pub foreign_table: Option<usize>,
    /// Immediate parent table names that legitimately precede this nested key
    pub parent_nodes: Option<Vec<String>>,
    /// Parent constraint propagated one level further up
    pub ancestor_nodes: Option<Vec<String>>,
    /// Target namespaces this field was declared under
    pub target_namespaces: Vec<String>,
    /// Restriction facet metadata
    pub restriction: Option<Restriction>,
    /// Documentation text from the declaration
    pub annotation: Option<String>,
    /// Fixed value constraint
    pub fixed_value: Option<String>,
    /// Default value
    pub default_value: Option<String>,
    /// Attribute declared with use="prohibited"; removed during cleanup
    pub prohibited: bool,
    /// Substitution group head named by the source element
    pub substitution_group: Option<String>,
}

impl Field {
    /// Create a field, deriving its storage name
    pub fn new(name: impl Into<String>, kind: FieldKind, case_sensitive: bool) -> Self {
        let name = name.into();
        let storage_name = to_storage_name(&name, case_sensitive);
        Self {
            name,
            storage_name,
            kind,
            scalar: None,
            type_name: None,
            required: false,
            list_holder: false,
            foreign_table_name: None,
            foreign_schema_group: None,
            foreign_table: None,
            parent_nodes: None,
            ancestor_nodes: None,
            target_namespaces: Vec::new(),
            restriction: None,
            annotation: None,
            fixed_value: None,
            default_value: None,
            prohibited: false,
            substitution_group: None,
        }
    }

    /// Create a field with an explicit storage name
    pub fn with_storage(name: impl Into<String>, storage: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            storage_name: storage.into(),
            ..Self::new(name, kind, true)
        }
    }

    /// Set the scalar classification
    pub fn with_scalar(mut self, scalar: ScalarKind) -> Self {
        self.scalar = Some(scalar);
        self
    }

    /// Set the required flag
    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Set the foreign table canonical name
    pub fn with_foreign_table(mut self, name: impl Into<String>) -> Self {
        self.foreign_table_name = Some(name.into());
        self
    }

    /// Whether this field links to another table
    pub fn is_reference(&self) -> bool {
        matches!(self.kind, FieldKind::ForeignKey | FieldKind::NestedKey)
    }

    /// JSON-schema-style type hint for this field
    pub fn json_hint(&self) -> &'static str {
        match self.scalar {
            Some(scalar) => scalar.json_hint(),
            None => "string",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_classification() {
        assert_eq!(ScalarKind::from_builtin("string"), Some(ScalarKind::String));
        assert_eq!(ScalarKind::from_builtin("unsignedByte"), Some(ScalarKind::Short));
        assert_eq!(ScalarKind::from_builtin("positiveInteger"), Some(ScalarKind::Integer));
        assert_eq!(ScalarKind::from_builtin("complexThing"), None);
    }

    #[test]
    fn test_sql_and_json_mapping() {
        assert_eq!(ScalarKind::Double.sql_type(), "double precision");
        assert_eq!(ScalarKind::Double.json_hint(), "number");
        assert_eq!(ScalarKind::Long.json_hint(), "integer");
        assert_eq!(ScalarKind::Date.json_hint(), "string");
    }

    #[test]
    fn test_field_storage_name() {
        let field = Field::new("my-attr", FieldKind::Attribute, true);
        assert_eq!(field.storage_name, "my_attr");
        assert_eq!(field.name, "my-attr");
    }

    #[test]
    fn test_kind_predicates() {
        assert!(FieldKind::NestedKey.is_key());
        assert!(!FieldKind::NestedKey.is_content());
        assert!(FieldKind::SimpleContent.is_content());
        assert!(FieldKind::AnyAttribute.is_wildcard());
    }

    #[test]
    fn test_restriction_is_empty() {
        let mut restriction = Restriction::default();
        assert!(restriction.is_empty());
        restriction.enumeration.push("red".to_string());
        assert!(!restriction.is_empty());
    }
}
