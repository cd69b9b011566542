//! Compiler configuration
//!
//! This module defines the options recognized by one compilation run.
//! The hash algorithm and width are required at construction: hash keys are
//! stored as actual primary/foreign key values downstream, so collisions are
//! a correctness hazard and the digest configuration is never defaulted.

use std::fmt;

/// Digest algorithm used for content-addressable keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum HashAlgorithm {
    /// SHA-256 digest
    Sha256,
    /// SHA-512 digest
    Sha512,
    /// FNV-1a 64-bit, non-cryptographic; only sound with `HashWidth::Unsigned64`
    /// or narrower on small document sets
    Fnv1a64,
}

impl HashAlgorithm {
    /// Parse from a configuration string value
    pub fn from_str_value(s: &str) -> Option<Self> {
        match s {
            "sha256" | "SHA256" | "SHA-256" => Some(Self::Sha256),
            "sha512" | "SHA512" | "SHA-512" => Some(Self::Sha512),
            "fnv" | "fnv1a64" => Some(Self::Fnv1a64),
            _ => None,
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha256 => write!(f, "sha256"),
            Self::Sha512 => write!(f, "sha512"),
            Self::Fnv1a64 => write!(f, "fnv1a64"),
        }
    }
}

/// Width of the stored key value derived from the digest
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum HashWidth {
    /// No hashing: the canonical key string is stored as-is
    Raw,
    /// Full fixed-width binary digest
    Binary,
    /// Digest truncated to an unsigned 32-bit integer
    Unsigned32,
    /// Digest truncated to an unsigned 64-bit integer
    Unsigned64,
}

impl HashWidth {
    /// Parse from a configuration string value
    pub fn from_str_value(s: &str) -> Option<Self> {
        match s {
            "raw" => Some(Self::Raw),
            "binary" => Some(Self::Binary),
            "32" | "unsigned32" => Some(Self::Unsigned32),
            "64" | "unsigned64" => Some(Self::Unsigned64),
            _ => None,
        }
    }
}

impl fmt::Display for HashWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raw => write!(f, "raw"),
            Self::Binary => write!(f, "binary"),
            Self::Unsigned32 => write!(f, "unsigned32"),
            Self::Unsigned64 => write!(f, "unsigned64"),
        }
    }
}

/// Options for one compilation run
#[derive(Debug, Clone)]
pub struct CompilerOptions {
    /// Treat table names as case-sensitive; when false, lower-cased name
    /// collisions are disambiguated with a deterministic prefix
    pub case_sensitive: bool,

    /// Extract `any`/`anyAttribute` wildcard fields
    pub allow_wildcards: bool,

    /// Generate a document key field on every table
    pub generate_document_key: bool,

    /// Generate a serial key field on list-holder child tables
    pub generate_serial_key: bool,

    /// Generate an xpath key field on every table
    pub generate_xpath_key: bool,

    /// Digest algorithm for content-addressable keys
    pub hash_algorithm: HashAlgorithm,

    /// Stored width of derived key values
    pub hash_width: HashWidth,

    /// Nested tables with fewer content fields than this are discarded
    pub minimum_fields_per_table: usize,

    /// Group tables by target namespace name instead of a single default group
    pub named_schema_grouping: bool,

    /// Keep bridge/virtual tables in the writable model
    pub relational_extension: bool,
}

impl CompilerOptions {
    /// Create options with the required digest configuration; all other
    /// options start from their conventional values.
    pub fn new(hash_algorithm: HashAlgorithm, hash_width: HashWidth) -> Self {
        Self {
            case_sensitive: true,
            allow_wildcards: true,
            generate_document_key: true,
            generate_serial_key: true,
            generate_xpath_key: false,
            hash_algorithm,
            hash_width,
            minimum_fields_per_table: 1,
            named_schema_grouping: true,
            relational_extension: false,
        }
    }

    /// Set case sensitivity of table/field names
    pub fn with_case_sensitive(mut self, value: bool) -> Self {
        self.case_sensitive = value;
        self
    }

    /// Enable or disable wildcard field extraction
    pub fn with_wildcards(mut self, value: bool) -> Self {
        self.allow_wildcards = value;
        self
    }

    /// Enable or disable document key generation
    pub fn with_document_key(mut self, value: bool) -> Self {
        self.generate_document_key = value;
        self
    }

    /// Enable or disable serial key generation
    pub fn with_serial_key(mut self, value: bool) -> Self {
        self.generate_serial_key = value;
        self
    }

    /// Enable or disable xpath key generation
    pub fn with_xpath_key(mut self, value: bool) -> Self {
        self.generate_xpath_key = value;
        self
    }

    /// Set the minimum number of content fields a nested table must have
    pub fn with_minimum_fields(mut self, value: usize) -> Self {
        self.minimum_fields_per_table = value;
        self
    }

    /// Group tables by target namespace name
    pub fn with_named_schema_grouping(mut self, value: bool) -> Self {
        self.named_schema_grouping = value;
        self
    }

    /// Keep bridge/virtual tables in the writable model
    pub fn with_relational_extension(mut self, value: bool) -> Self {
        self.relational_extension = value;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_algorithm_parsing() {
        assert_eq!(
            HashAlgorithm::from_str_value("sha256"),
            Some(HashAlgorithm::Sha256)
        );
        assert_eq!(
            HashAlgorithm::from_str_value("SHA-512"),
            Some(HashAlgorithm::Sha512)
        );
        assert_eq!(HashAlgorithm::from_str_value("md5"), None);
    }

    #[test]
    fn test_hash_width_parsing() {
        assert_eq!(HashWidth::from_str_value("64"), Some(HashWidth::Unsigned64));
        assert_eq!(HashWidth::from_str_value("raw"), Some(HashWidth::Raw));
        assert_eq!(HashWidth::from_str_value("128"), None);
    }

    #[test]
    fn test_builder_style_options() {
        let opts = CompilerOptions::new(HashAlgorithm::Sha256, HashWidth::Unsigned64)
            .with_case_sensitive(false)
            .with_minimum_fields(2);

        assert!(!opts.case_sensitive);
        assert_eq!(opts.minimum_fields_per_table, 2);
        assert_eq!(opts.hash_algorithm, HashAlgorithm::Sha256);
    }
}
