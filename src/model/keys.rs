//! Key declarations and content-addressable key values
//!
//! Hash keys are stored as the actual primary/foreign key values in the
//! relational engine, so `HashKeyer::hash` must stay pure and deterministic
//! for a given digest configuration. Collisions are a correctness hazard,
//! which is why the algorithm and width come from explicit configuration.

use sha2::{Digest, Sha256, Sha512};

use crate::options::{HashAlgorithm, HashWidth};

/// Identity/unique constraint captured from `xs:key` / `xs:unique`
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Key {
    /// Declared constraint name
    pub name: String,
    /// Canonical name of the owning table
    pub table: String,
    /// Owning schema group
    pub schema_group: String,
    /// Participating field names
    pub fields: Vec<String>,
}

/// Foreign key declaration from `xs:keyref` or a type-extension base link
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ForeignKeyDecl {
    /// Constraint name
    pub name: String,
    /// Canonical name of the owning table
    pub table: String,
    /// Owning schema group
    pub schema_group: String,
    /// Participating field names on the owning table
    pub fields: Vec<String>,
    /// Name of the `xs:key` this keyref refers to (None for extension links)
    pub refer_key: Option<String>,
    /// Canonical name of the referenced table, once resolved
    pub refer_table: Option<String>,
    /// Referenced field names, once resolved
    pub refer_fields: Vec<String>,
}

/// A derived key value, shaped by the configured hash width
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub enum KeyValue {
    /// The canonical key string stored as-is
    Text(String),
    /// Full fixed-width binary digest
    Digest(Vec<u8>),
    /// Digest truncated to an unsigned 32-bit integer
    Uint32(u32),
    /// Digest truncated to an unsigned 64-bit integer
    Uint64(u64),
}

/// FNV-1a 64-bit hash.
///
/// Deterministic across platforms and cheap; not collision-resistant, so
/// only offered for small document sets where the narrower widths are
/// acceptable.
pub const fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hash = 0xcbf29ce484222325u64;
    let mut i = 0;

    while i < bytes.len() {
        hash ^= bytes[i] as u64;
        hash = hash.wrapping_mul(0x100000001b3);
        i += 1;
    }

    hash
}

/// Pure key-string hasher configured with an explicit algorithm and width
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct HashKeyer {
    /// Digest algorithm
    pub algorithm: HashAlgorithm,
    /// Stored width
    pub width: HashWidth,
}

impl HashKeyer {
    /// Create a keyer from the explicit digest configuration
    pub fn new(algorithm: HashAlgorithm, width: HashWidth) -> Self {
        Self { algorithm, width }
    }

    /// Hash a canonical key string into a stored key value.
    ///
    /// Deterministic: the same configuration and input always produce the
    /// same value.
    pub fn hash(&self, key: &str) -> KeyValue {
        if self.width == HashWidth::Raw {
            return KeyValue::Text(key.to_string());
        }

        let digest: Vec<u8> = match self.algorithm {
            HashAlgorithm::Sha256 => Sha256::digest(key.as_bytes()).to_vec(),
            HashAlgorithm::Sha512 => Sha512::digest(key.as_bytes()).to_vec(),
            HashAlgorithm::Fnv1a64 => fnv1a_64(key.as_bytes()).to_be_bytes().to_vec(),
        };

        match self.width {
            HashWidth::Raw => unreachable!("handled above"),
            HashWidth::Binary => KeyValue::Digest(digest),
            HashWidth::Unsigned32 => {
                let mut bytes = [0u8; 4];
                bytes.copy_from_slice(&digest[..4]);
                KeyValue::Uint32(u32::from_be_bytes(bytes))
            }
            HashWidth::Unsigned64 => {
                let mut bytes = [0u8; 8];
                bytes.copy_from_slice(&digest[..8]);
                KeyValue::Uint64(u64::from_be_bytes(bytes))
            }
        }
    }

    /// SQL-ish storage type of key values under this configuration
    pub fn sql_type(&self) -> &'static str {
        match self.width {
            HashWidth::Raw => "text",
            HashWidth::Binary => "bytea",
            HashWidth::Unsigned32 => "integer",
            HashWidth::Unsigned64 => "bigint",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Compile-time hash should match the runtime calculation for stability
    // across platforms.
    const HELLO_HASH: u64 = fnv1a_64(b"hello");

    #[test]
    fn test_fnv_reference_values() {
        assert_eq!(HELLO_HASH, 0xa430d84680aabd0b);
        assert_eq!(fnv1a_64(b""), 0xcbf29ce484222325);
    }

    #[test]
    fn test_hash_is_deterministic() {
        let keyer = HashKeyer::new(HashAlgorithm::Sha256, HashWidth::Unsigned64);
        assert_eq!(keyer.hash("order/1"), keyer.hash("order/1"));
        assert_ne!(keyer.hash("order/1"), keyer.hash("order/2"));
    }

    #[test]
    fn test_raw_width_keeps_string() {
        let keyer = HashKeyer::new(HashAlgorithm::Sha256, HashWidth::Raw);
        assert_eq!(keyer.hash("abc"), KeyValue::Text("abc".to_string()));
    }

    #[test]
    fn test_binary_width_length() {
        let keyer = HashKeyer::new(HashAlgorithm::Sha256, HashWidth::Binary);
        match keyer.hash("abc") {
            KeyValue::Digest(bytes) => assert_eq!(bytes.len(), 32),
            other => panic!("expected digest, got {:?}", other),
        }

        let keyer = HashKeyer::new(HashAlgorithm::Sha512, HashWidth::Binary);
        match keyer.hash("abc") {
            KeyValue::Digest(bytes) => assert_eq!(bytes.len(), 64),
            other => panic!("expected digest, got {:?}", other),
        }
    }

    #[test]
    fn test_truncation_prefix_of_digest() {
        let keyer32 = HashKeyer::new(HashAlgorithm::Sha256, HashWidth::Unsigned32);
        let keyer64 = HashKeyer::new(HashAlgorithm::Sha256, HashWidth::Unsigned64);

        let v32 = match keyer32.hash("abc") {
            KeyValue::Uint32(v) => v,
            other => panic!("expected u32, got {:?}", other),
        };
        let v64 = match keyer64.hash("abc") {
            KeyValue::Uint64(v) => v,
            other => panic!("expected u64, got {:?}", other),
        };

        // Both widths truncate the same digest prefix
        assert_eq!(u64::from(v32), v64 >> 32);
    }

    #[test]
    fn test_sql_type_by_width() {
        assert_eq!(HashKeyer::new(HashAlgorithm::Sha256, HashWidth::Raw).sql_type(), "text");
        assert_eq!(
            HashKeyer::new(HashAlgorithm::Fnv1a64, HashWidth::Unsigned64).sql_type(),
            "bigint"
        );
    }
}
