//! Schema source location resolution
//!
//! This module handles resolution of schema locations (file paths, URLs,
//! in-memory identifiers) for include/import handling and for the
//! visited-location set that breaks cyclic inclusion.

use crate::error::Result;
use std::path::{Path, PathBuf};
use url::Url;

/// Schema source location - can be a URL, file path, or string identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Location {
    /// File system path
    Path(PathBuf),
    /// URL (http, https, ftp, etc.)
    Url(Url),
    /// String identifier (for in-memory sources)
    String(String),
}

impl Location {
    /// Create a location from a string (auto-detect type)
    pub fn from_str(s: &str) -> Result<Self> {
        // Try to parse as URL first
        if let Ok(url) = Url::parse(s) {
            if url.scheme() != "file" {
                return Ok(Location::Url(url));
            }
        }

        // Try as file path
        let path = PathBuf::from(s);
        if path.exists() || s.starts_with('/') || s.starts_with('.') {
            return Ok(Location::Path(path));
        }

        // Otherwise treat as string identifier
        Ok(Location::String(s.to_string()))
    }

    /// Resolve a schemaLocation reference relative to this location
    pub fn join(&self, reference: &str) -> Result<Self> {
        // Absolute references resolve on their own
        if Url::parse(reference).is_ok() && !reference.starts_with('.') {
            return Location::from_str(reference);
        }

        match self {
            Location::Path(base) => {
                let dir = base.parent().unwrap_or_else(|| Path::new("."));
                Ok(Location::Path(dir.join(reference)))
            }
            Location::Url(base) => Ok(Location::Url(base.join(reference)?)),
            Location::String(_) => Ok(Location::String(reference.to_string())),
        }
    }

    /// Get the location as a string
    pub fn as_str(&self) -> String {
        match self {
            Location::Path(p) => p.to_string_lossy().to_string(),
            Location::Url(u) => u.to_string(),
            Location::String(s) => s.clone(),
        }
    }

    /// Check if this is a remote location (URL)
    pub fn is_remote(&self) -> bool {
        matches!(self, Location::Url(_))
    }

    /// Check if this is a local file
    pub fn is_file(&self) -> bool {
        matches!(self, Location::Path(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_from_url() {
        let loc = Location::from_str("http://example.com/schema.xsd").unwrap();
        assert!(matches!(loc, Location::Url(_)));
        assert!(loc.is_remote());
    }

    #[test]
    fn test_location_from_path() {
        let loc = Location::from_str("/tmp/schema.xsd").unwrap();
        assert!(matches!(loc, Location::Path(_)));
        assert!(loc.is_file());
    }

    #[test]
    fn test_location_join_relative_path() {
        let base = Location::Path(PathBuf::from("/schemas/main.xsd"));
        let joined = base.join("common/types.xsd").unwrap();
        assert_eq!(joined.as_str(), "/schemas/common/types.xsd");
    }

    #[test]
    fn test_location_join_url() {
        let base = Location::Url(Url::parse("http://example.com/a/main.xsd").unwrap());
        let joined = base.join("types.xsd").unwrap();
        assert_eq!(joined.as_str(), "http://example.com/a/types.xsd");
    }

    #[test]
    fn test_location_as_str() {
        let loc = Location::String("inline".to_string());
        assert_eq!(loc.as_str(), "inline");
    }
}
