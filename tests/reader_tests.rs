//! Tests for the bundled schema reader: include resolution and cycle
//! breaking over local files

use std::fs;

use relschema::error::Diagnostic;
use relschema::reader::SchemaReader;
use relschema::{Compiler, CompilerOptions, HashAlgorithm, HashWidth};

fn write(dir: &std::path::Path, name: &str, content: &str) -> String {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path.to_string_lossy().to_string()
}

#[test]
fn include_set_is_closed_over_local_files() {
    let dir = tempfile::tempdir().unwrap();

    let main = write(
        dir.path(),
        "main.xsd",
        r#"<?xml version="1.0"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
    <xs:include schemaLocation="types.xsd"/>
    <xs:element name="order" type="OrderType"/>
</xs:schema>"#,
    );
    write(
        dir.path(),
        "types.xsd",
        r#"<?xml version="1.0"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
    <xs:complexType name="OrderType">
        <xs:sequence>
            <xs:element name="id" type="xs:string"/>
        </xs:sequence>
    </xs:complexType>
</xs:schema>"#,
    );

    let mut reader = SchemaReader::new();
    let documents = reader.read_file(&main).unwrap();
    assert_eq!(documents.len(), 2);
    assert!(reader.diagnostics().is_empty());

    // The closed set compiles: the type lives in the included document
    let options = CompilerOptions::new(HashAlgorithm::Sha256, HashWidth::Unsigned64);
    let model = Compiler::new(options).compile(&documents).unwrap();
    let order = model.table_by_canonical_name("order").unwrap();
    assert!(order.field_by_storage_name("id").is_some());
}

#[test]
fn cyclic_include_is_skipped_not_fatal() {
    let dir = tempfile::tempdir().unwrap();

    let a = write(
        dir.path(),
        "a.xsd",
        r#"<?xml version="1.0"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
    <xs:include schemaLocation="b.xsd"/>
    <xs:element name="root" type="xs:string"/>
</xs:schema>"#,
    );
    write(
        dir.path(),
        "b.xsd",
        r#"<?xml version="1.0"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
    <xs:include schemaLocation="a.xsd"/>
    <xs:complexType name="SharedType">
        <xs:sequence>
            <xs:element name="value" type="xs:string"/>
        </xs:sequence>
    </xs:complexType>
</xs:schema>"#,
    );

    let mut reader = SchemaReader::new();
    let documents = reader.read_file(&a).unwrap();

    // Both documents load exactly once; the repeat is recorded
    assert_eq!(documents.len(), 2);
    assert!(reader
        .diagnostics()
        .iter()
        .any(|d| matches!(d, Diagnostic::CyclicInclude { .. })));
}

#[test]
fn remote_imports_are_reported_not_fetched() {
    let dir = tempfile::tempdir().unwrap();

    let main = write(
        dir.path(),
        "main.xsd",
        r#"<?xml version="1.0"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
    <xs:import namespace="http://www.w3.org/XML/1998/namespace"
               schemaLocation="http://www.w3.org/2001/xml.xsd"/>
    <xs:element name="doc" type="xs:string"/>
</xs:schema>"#,
    );

    let mut reader = SchemaReader::new();
    let documents = reader.read_file(&main).unwrap();

    assert_eq!(documents.len(), 1);
    assert_eq!(reader.skipped_remote().len(), 1);
    assert!(reader.skipped_remote()[0].starts_with("http://"));
}
