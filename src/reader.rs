//! Bundled schema reader
//!
//! Parses XSD source text into `SchemaDocument` trees and closes the
//! include/import set over local files ahead of compilation. Remote
//! schema locations are never fetched; they are collected on the reader
//! for the caller to resolve out of band.

use std::collections::{HashSet, VecDeque};
use std::fs;

use crate::documents::{xsd_attrs, DeclKind, DeclNode, SchemaDocument};
use crate::error::{Diagnostic, Error, Result};
use crate::locations::Location;
use crate::namespaces::{NamespaceContext, QName};
use crate::XSD_NAMESPACE;

/// Pending document work item for iterative include processing
struct PendingDocumentWork {
    /// Location to load
    location: Location,
    /// Target namespace of the including document (chameleon includes)
    parent_namespace: Option<String>,
}

/// Reader that loads a schema document set from local sources
#[derive(Debug, Default)]
pub struct SchemaReader {
    /// Locations already loaded, for cyclic include detection
    visited: HashSet<String>,
    /// Non-fatal conditions encountered while reading
    diagnostics: Vec<Diagnostic>,
    /// Remote locations referenced but not fetched
    skipped_remote: Vec<String>,
}

impl SchemaReader {
    /// Create a new reader
    pub fn new() -> Self {
        Self::default()
    }

    /// Diagnostics recorded while reading (cyclic includes)
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Remote schema locations referenced but not fetched
    pub fn skipped_remote(&self) -> &[String] {
        &self.skipped_remote
    }

    /// Load a schema file and every document it transitively includes or
    /// imports from local files. Cyclic includes are skipped and recorded.
    pub fn read_file(&mut self, path: &str) -> Result<Vec<SchemaDocument>> {
        let mut documents = Vec::new();
        let mut queue = VecDeque::new();
        queue.push_back(PendingDocumentWork {
            location: Location::from_str(path)?,
            parent_namespace: None,
        });

        while let Some(work) = queue.pop_front() {
            let key = work.location.as_str();
            if !self.visited.insert(key.clone()) {
                self.diagnostics.push(Diagnostic::CyclicInclude { location: key });
                continue;
            }

            if work.location.is_remote() {
                self.skipped_remote.push(key);
                continue;
            }

            let text = fs::read_to_string(key.as_str())
                .map_err(|e| Error::Resource(format!("cannot read '{}': {}", key, e)))?;
            let mut document = parse_document(&text, &key)?;

            // Chameleon include: a no-namespace document included from a
            // namespaced one takes on the including document's namespace.
            if document.target_namespace.is_none() {
                document.target_namespace = work.parent_namespace.clone();
            }

            for decl in document.top_level() {
                if matches!(decl.kind, DeclKind::Include | DeclKind::Import) {
                    if let Some(reference) = decl.attr(xsd_attrs::SCHEMA_LOCATION) {
                        queue.push_back(PendingDocumentWork {
                            location: work.location.join(reference)?,
                            parent_namespace: document.target_namespace.clone(),
                        });
                    }
                }
            }

            documents.push(document);
        }

        Ok(documents)
    }

    /// Parse a single in-memory schema document; includes are not followed.
    pub fn read_str(text: &str, location: &str) -> Result<SchemaDocument> {
        parse_document(text, location)
    }
}

/// Parse XSD text into a declaration tree
fn parse_document(text: &str, location: &str) -> Result<SchemaDocument> {
    let doc = roxmltree::Document::parse(text)
        .map_err(|e| Error::Xml(format!("{} in '{}'", e, location)))?;

    let root = doc.root_element();
    if root.tag_name().name() != "schema" || root.tag_name().namespace() != Some(XSD_NAMESPACE) {
        return Err(Error::Xml(format!(
            "'{}' is not an XML Schema document (root is '{}')",
            location,
            root.tag_name().name()
        )));
    }

    let mut namespaces = NamespaceContext::new();
    for ns in root.namespaces() {
        match ns.name() {
            Some(prefix) => namespaces.add_prefix(prefix, ns.uri()),
            None => namespaces.set_default_namespace(ns.uri()),
        }
    }

    let target_namespace = root.attribute(xsd_attrs::TARGET_NAMESPACE).map(String::from);

    Ok(SchemaDocument {
        location: location.to_string(),
        target_namespace,
        namespaces,
        root: convert_node(root),
    })
}

/// Convert a roxmltree element into a declaration node
fn convert_node(node: roxmltree::Node<'_, '_>) -> DeclNode {
    let local = node.tag_name().name();
    let kind = if node.tag_name().namespace() == Some(XSD_NAMESPACE) {
        DeclKind::from_local_name(local)
    } else {
        DeclKind::Other
    };

    let qname = QName::new(node.tag_name().namespace(), local);
    let mut decl = DeclNode::new(kind, qname);

    for attr in node.attributes() {
        decl.attributes
            .insert(attr.name().to_string(), attr.value().to_string());
    }

    for child in node.children() {
        if child.is_element() {
            decl.children.push(convert_node(child));
        }
    }

    if decl.children.is_empty() {
        if let Some(text) = node.text() {
            if !text.trim().is_empty() {
                decl.text = Some(text.to_string());
            }
        }
    }

    decl
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE: &str = r#"<?xml version="1.0"?>
        <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                   targetNamespace="http://example.com/order">
            <xs:element name="order" type="xs:string"/>
        </xs:schema>"#;

    #[test]
    fn test_parse_simple_document() {
        let doc = SchemaReader::read_str(SIMPLE, "inline.xsd").unwrap();
        assert_eq!(doc.target_namespace.as_deref(), Some("http://example.com/order"));
        assert_eq!(doc.location, "inline.xsd");

        let decls: Vec<_> = doc.top_level().collect();
        assert_eq!(decls.len(), 1);
        assert_eq!(decls[0].kind, DeclKind::Element);
        assert_eq!(decls[0].name(), Some("order"));
        assert_eq!(decls[0].type_name(), Some("xs:string"));
    }

    #[test]
    fn test_parse_rejects_non_schema_root() {
        let err = SchemaReader::read_str("<root/>", "inline.xsd");
        assert!(matches!(err, Err(Error::Xml(_))));
    }

    #[test]
    fn test_prefix_context_captured() {
        let doc = SchemaReader::read_str(SIMPLE, "inline.xsd").unwrap();
        assert_eq!(
            doc.namespaces.get_namespace("xs"),
            Some("http://www.w3.org/2001/XMLSchema")
        );
    }
}
