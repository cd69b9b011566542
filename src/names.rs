//! XML name validation and storage-name normalization
//!
//! Canonical names keep the source vocabulary (case-sensitive, may contain
//! `-` and `.`); storage names are what downstream relational engines see
//! and must be folded to a safe identifier form.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};

static NCNAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Z_a-z\u{C0}-\u{D6}\u{D8}-\u{F6}][A-Z_a-z\u{C0}-\u{D6}\u{D8}-\u{F6}\-\.0-9]*$")
        .unwrap()
});

static UNSAFE_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_]").unwrap());

/// Identifiers that clash with common SQL keywords when used bare
const RESERVED_WORDS: &[&str] = &[
    "all", "and", "any", "as", "asc", "by", "case", "check", "column", "constraint", "create",
    "default", "desc", "distinct", "drop", "else", "end", "false", "for", "foreign", "from",
    "group", "having", "in", "index", "into", "is", "join", "key", "like", "limit", "not",
    "null", "on", "or", "order", "primary", "references", "select", "set", "table", "then",
    "to", "true", "union", "unique", "update", "user", "values", "when", "where",
];

/// Check if a string is a valid NCName (non-colonized name)
pub fn is_valid_ncname(name: &str) -> bool {
    !name.is_empty() && !name.contains(':') && NCNAME.is_match(name)
}

/// Check if a string is a valid QName (qualified name)
pub fn is_valid_qname(name: &str) -> bool {
    if name.is_empty() {
        return false;
    }

    if let Some((prefix, local)) = name.split_once(':') {
        is_valid_ncname(prefix) && is_valid_ncname(local)
    } else {
        is_valid_ncname(name)
    }
}

/// Validate an NCName and return an error if invalid
pub fn validate_ncname(name: &str) -> Result<()> {
    if is_valid_ncname(name) {
        Ok(())
    } else {
        Err(Error::Name(format!("Invalid NCName: '{}'", name)))
    }
}

/// Split a QName into prefix and local name
pub fn split_qname(qname: &str) -> (Option<&str>, &str) {
    if let Some((prefix, local)) = qname.split_once(':') {
        (Some(prefix), local)
    } else {
        (None, qname)
    }
}

/// Normalize a canonical name into a storage-safe identifier.
///
/// Replaces characters outside `[A-Za-z0-9_]` with `_`, prefixes a leading
/// digit with `_`, and suffixes reserved words with `_`. When
/// `case_sensitive` is false the result is also lower-cased.
pub fn to_storage_name(canonical: &str, case_sensitive: bool) -> String {
    let mut name = UNSAFE_CHARS.replace_all(canonical, "_").into_owned();

    if !case_sensitive {
        name = name.to_lowercase();
    }

    if name.chars().next().map(|c| c.is_ascii_digit()).unwrap_or(true) {
        name.insert(0, '_');
    }

    if RESERVED_WORDS.contains(&name.to_lowercase().as_str()) {
        name.push('_');
    }

    name
}
