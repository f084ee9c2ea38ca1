use crate::opc::packuri::PackUri;
use crate::opc::rel::Relationships;
use memchr::memmem;
/// OPC package parts.
///
/// Parts are the fundamental units of content in an OPC package. Each part
/// has a unique partname (PackUri), a content type, its binary content, and
/// may have relationships to other parts. Parts are owned exclusively by the
/// containing [`Package`](crate::opc::Package).

/// A part in an OPC package.
#[derive(Debug, Clone)]
pub struct Part {
    /// The partname (URI) of this part
    partname: PackUri,

    /// The content type of this part
    content_type: String,

    /// The binary content of this part
    blob: Vec<u8>,

    /// Relationships from this part to other parts
    rels: Relationships,
}

impl Part {
    /// Create a new part.
    ///
    /// # Arguments
    /// * `partname` - The partname (URI) of this part
    /// * `content_type` - The content type of this part
    /// * `blob` - The binary content of this part
    pub fn new(partname: PackUri, content_type: String, blob: Vec<u8>) -> Self {
        let rels = Relationships::new(partname.base_uri().to_string());
        Self {
            partname,
            content_type,
            blob,
            rels,
        }
    }

    /// Get the partname of this part.
    #[inline]
    pub fn partname(&self) -> &PackUri {
        &self.partname
    }

    /// Get the content type of this part.
    #[inline]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Get the binary content of this part.
    #[inline]
    pub fn blob(&self) -> &[u8] {
        &self.blob
    }

    /// Replace the binary content of this part.
    pub fn set_blob(&mut self, blob: Vec<u8>) {
        self.blob = blob;
    }

    /// Get the relationships for this part.
    #[inline]
    pub fn rels(&self) -> &Relationships {
        &self.rels
    }

    /// Get mutable access to the relationships for this part.
    #[inline]
    pub fn rels_mut(&mut self) -> &mut Relationships {
        &mut self.rels
    }

    /// Add or get a relationship to another part, returning its rId.
    pub fn relate_to(&mut self, target_ref: &str, reltype: &str) -> String {
        let rel = self.rels.get_or_add(reltype, target_ref);
        rel.r_id().to_string()
    }

    /// Check whether this part's content is XML, judged by content type.
    #[inline]
    pub fn is_xml(&self) -> bool {
        self.content_type.ends_with("+xml") || self.content_type.ends_with("/xml")
    }

    /// Count references to a relationship ID in the part content.
    ///
    /// Uses memmem for fast byte searching. Useful for detecting orphaned
    /// relationships before dropping them.
    pub fn rel_ref_count(&self, r_id: &str) -> usize {
        let pattern = format!(r#"r:id="{}""#, r_id);
        let finder = memmem::Finder::new(pattern.as_bytes());
        finder.find_iter(&self.blob).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_part_basics() {
        let partname = PackUri::new("/word/document.xml").unwrap();
        let part = Part::new(
            partname,
            "application/xml".to_string(),
            b"<document/>".to_vec(),
        );

        assert_eq!(part.content_type(), "application/xml");
        assert_eq!(part.blob(), b"<document/>");
        assert!(part.is_xml());
        assert!(part.rels().is_empty());
    }

    #[test]
    fn test_rel_ref_count() {
        let partname = PackUri::new("/word/document.xml").unwrap();
        let xml = br#"<a r:id="rId1"/><b r:id="rId1"/><c r:id="rId2"/>"#.to_vec();
        let part = Part::new(partname, "application/xml".to_string(), xml);

        assert_eq!(part.rel_ref_count("rId1"), 2);
        assert_eq!(part.rel_ref_count("rId2"), 1);
        assert_eq!(part.rel_ref_count("rId3"), 0);
    }

    #[test]
    fn test_relate_to() {
        let partname = PackUri::new("/word/document.xml").unwrap();
        let mut part = Part::new(partname, "application/xml".to_string(), Vec::new());

        let r_id = part.relate_to("styles.xml", "http://example.com/styles");
        assert_eq!(r_id, "rId1");
        // Same target and type reuses the relationship
        let again = part.relate_to("styles.xml", "http://example.com/styles");
        assert_eq!(again, "rId1");
    }
}
