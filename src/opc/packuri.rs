/// Provides the PackUri value type and utilities for working with part names.
///
/// A PackUri represents a part name within an OPC package, following the URI
/// format defined by the Open Packaging Conventions specification.
/// Represents a part name within an OPC package.
///
/// PackUris always begin with a forward slash and use forward slashes as path
/// separators. They provide access to components like the base URI
/// (directory), filename, and extension.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackUri {
    /// The full pack URI string (e.g., "/word/document.xml")
    uri: String,
}

impl PackUri {
    /// Create a new PackUri from a string.
    ///
    /// # Arguments
    /// * `uri` - The URI string, which must begin with a forward slash
    pub fn new<S: Into<String>>(uri: S) -> Result<Self, String> {
        let uri = uri.into();
        if !uri.starts_with('/') {
            return Err(format!("PackUri must begin with slash, got '{}'", uri));
        }
        Ok(PackUri { uri })
    }

    /// Create a PackUri from a relative reference and a base URI.
    ///
    /// Translates a relative reference (like "../styles.xml") onto a base URI
    /// (like "/word") to produce an absolute PackUri (like "/styles.xml").
    pub fn from_rel_ref(base_uri: &str, relative_ref: &str) -> Result<Self, String> {
        let joined = Self::join_paths(base_uri, relative_ref);
        let normalized = Self::normalize_path(&joined);
        Self::new(normalized)
    }

    /// Get the base URI (directory portion) of this PackUri.
    ///
    /// For example, "/word" for "/word/document.xml". For the package
    /// pseudo-partname "/", returns "/".
    pub fn base_uri(&self) -> &str {
        if self.uri == "/" {
            return "/";
        }

        if let Some(pos) = self.uri.rfind('/') {
            if pos == 0 { "/" } else { &self.uri[..pos] }
        } else {
            "/"
        }
    }

    /// Get the filename portion of this PackUri.
    ///
    /// For example, "document.xml" for "/word/document.xml". For the package
    /// pseudo-partname "/", returns an empty string.
    pub fn filename(&self) -> &str {
        if let Some(pos) = self.uri.rfind('/') {
            &self.uri[pos + 1..]
        } else {
            ""
        }
    }

    /// Get the extension portion of this PackUri.
    ///
    /// For example, "xml" for "/word/document.xml" (note: no leading period).
    pub fn ext(&self) -> &str {
        let filename = self.filename();
        if let Some(pos) = filename.rfind('.') {
            &filename[pos + 1..]
        } else {
            ""
        }
    }

    /// Get the membername (URI with leading slash stripped).
    ///
    /// This is the form used as the ZIP file membername for the package item.
    /// Returns an empty string for the package pseudo-partname "/".
    pub fn membername(&self) -> &str {
        if self.uri == "/" { "" } else { &self.uri[1..] }
    }

    /// Get the relative reference from a base URI to this PackUri.
    ///
    /// For example, PackUri("/word/styles.xml") returns "styles.xml" for
    /// base_uri "/word" and "word/styles.xml" for base_uri "/".
    pub fn relative_ref(&self, base_uri: &str) -> String {
        // Special case for root base URI
        if base_uri == "/" {
            return self.membername().to_string();
        }

        let from_parts: Vec<&str> = base_uri.split('/').filter(|s| !s.is_empty()).collect();
        let to_parts: Vec<&str> = self.uri.split('/').filter(|s| !s.is_empty()).collect();

        // Find common prefix length
        let common = from_parts
            .iter()
            .zip(to_parts.iter())
            .take_while(|(a, b)| a == b)
            .count();

        let mut result = String::new();

        for _ in common..from_parts.len() {
            result.push_str("../");
        }

        for (i, part) in to_parts.iter().enumerate().skip(common) {
            if i > common {
                result.push('/');
            }
            result.push_str(part);
        }

        result
    }

    /// Get the PackUri of the .rels part corresponding to this PackUri.
    ///
    /// For example, "/word/_rels/document.xml.rels" for "/word/document.xml",
    /// and "/_rels/.rels" for the package pseudo-partname "/".
    pub fn rels_uri(&self) -> Result<PackUri, String> {
        let filename = self.filename();
        let base_uri = self.base_uri();

        let rels_filename = format!("{}.rels", filename);
        let rels_uri_str = if base_uri == "/" {
            format!("/_rels/{}", rels_filename)
        } else {
            format!("{}/_rels/{}", base_uri, rels_filename)
        };

        Self::new(rels_uri_str)
    }

    /// Get the full URI string.
    pub fn as_str(&self) -> &str {
        &self.uri
    }

    /// Helper function to join two paths using forward slashes
    fn join_paths(base: &str, rel: &str) -> String {
        if base.ends_with('/') {
            format!("{}{}", base, rel)
        } else {
            format!("{}/{}", base, rel)
        }
    }

    /// Helper function to normalize a path (resolve ".." and ".")
    fn normalize_path(path: &str) -> String {
        let mut parts = Vec::new();

        for part in path.split('/') {
            match part {
                "" | "." => {
                    if parts.is_empty() {
                        // Keep leading slash
                        parts.push("");
                    }
                }
                ".." => {
                    if parts.len() > 1 {
                        parts.pop();
                    }
                }
                _ => {
                    parts.push(part);
                }
            }
        }

        if parts.is_empty() || (parts.len() == 1 && parts[0].is_empty()) {
            return "/".to_string();
        }

        parts.join("/")
    }
}

impl std::fmt::Display for PackUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.uri)
    }
}

impl AsRef<str> for PackUri {
    fn as_ref(&self) -> &str {
        &self.uri
    }
}

/// The package pseudo-partname, representing the package itself
pub const PACKAGE_URI: &str = "/";

/// The URI for the [Content_Types].xml part
pub const CONTENT_TYPES_URI: &str = "/[Content_Types].xml";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packuri_new() {
        assert!(PackUri::new("/word/document.xml").is_ok());
        assert!(PackUri::new("word/document.xml").is_err());
    }

    #[test]
    fn test_base_uri() {
        let uri = PackUri::new("/word/document.xml").unwrap();
        assert_eq!(uri.base_uri(), "/word");

        let root = PackUri::new("/").unwrap();
        assert_eq!(root.base_uri(), "/");
    }

    #[test]
    fn test_filename_and_ext() {
        let uri = PackUri::new("/word/document.xml").unwrap();
        assert_eq!(uri.filename(), "document.xml");
        assert_eq!(uri.ext(), "xml");
    }

    #[test]
    fn test_membername() {
        let uri = PackUri::new("/word/document.xml").unwrap();
        assert_eq!(uri.membername(), "word/document.xml");

        let root = PackUri::new("/").unwrap();
        assert_eq!(root.membername(), "");
    }

    #[test]
    fn test_from_rel_ref() {
        let uri = PackUri::from_rel_ref("/word", "../styles.xml").unwrap();
        assert_eq!(uri.as_str(), "/styles.xml");

        let uri = PackUri::from_rel_ref("/", "word/document.xml").unwrap();
        assert_eq!(uri.as_str(), "/word/document.xml");
    }

    #[test]
    fn test_rels_uri() {
        let uri = PackUri::new("/word/document.xml").unwrap();
        assert_eq!(uri.rels_uri().unwrap().as_str(), "/word/_rels/document.xml.rels");

        let root = PackUri::new("/").unwrap();
        assert_eq!(root.rels_uri().unwrap().as_str(), "/_rels/.rels");
    }

    #[test]
    fn test_relative_ref() {
        let uri = PackUri::new("/word/comments.xml").unwrap();
        assert_eq!(uri.relative_ref("/word"), "comments.xml");
        assert_eq!(uri.relative_ref("/"), "word/comments.xml");
    }
}
