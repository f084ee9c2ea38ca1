use crate::common::xml::escape_xml;
use crate::opc::constants::namespace;
use crate::opc::error::{PackageError, Result};
use crate::opc::packuri::PackUri;
/// Relationship-related objects for OPC packages.
///
/// This module provides types for managing relationships between parts in an
/// OPC package, including internal and external relationships.
use std::collections::HashMap;
use std::fmt::Write as FmtWrite;

/// Target mode of a relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetMode {
    /// Target is another part inside the package (default)
    Internal,
    /// Target is an external resource (e.g., a hyperlink URL)
    External,
}

impl TargetMode {
    /// The attribute value written to .rels XML.
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetMode::Internal => crate::opc::constants::target_mode::INTERNAL,
            TargetMode::External => crate::opc::constants::target_mode::EXTERNAL,
        }
    }
}

/// A single relationship from a source part to a target.
///
/// Represents a connection between parts in an OPC package, identified by an
/// rId (relationship ID). Can be either internal (pointing to another part)
/// or external (pointing to an external URL).
#[derive(Debug, Clone)]
pub struct Relationship {
    /// Relationship ID (e.g., "rId1", "rId2")
    r_id: String,

    /// Relationship type URI
    reltype: String,

    /// Target reference - either a part URI or external URL
    target_ref: String,

    /// Base URI for resolving relative references
    base_uri: String,

    /// Internal or external target
    mode: TargetMode,
}

impl Relationship {
    pub fn new(
        r_id: String,
        reltype: String,
        target_ref: String,
        base_uri: String,
        mode: TargetMode,
    ) -> Self {
        Self {
            r_id,
            reltype,
            target_ref,
            base_uri,
            mode,
        }
    }

    /// Get the relationship ID.
    #[inline]
    pub fn r_id(&self) -> &str {
        &self.r_id
    }

    /// Get the relationship type.
    #[inline]
    pub fn reltype(&self) -> &str {
        &self.reltype
    }

    /// Get the target reference.
    ///
    /// For internal relationships, this is a relative part reference.
    /// For external relationships, this is an absolute URL.
    #[inline]
    pub fn target_ref(&self) -> &str {
        &self.target_ref
    }

    /// Check if this is an external relationship.
    #[inline]
    pub fn is_external(&self) -> bool {
        self.mode == TargetMode::External
    }

    /// Get the absolute target partname for internal relationships.
    ///
    /// Returns an error if this is an external relationship.
    pub fn target_partname(&self) -> Result<PackUri> {
        if self.is_external() {
            return Err(PackageError::InvalidRelationship(
                "Cannot get target_partname for external relationship".to_string(),
            ));
        }
        PackUri::from_rel_ref(&self.base_uri, &self.target_ref)
            .map_err(PackageError::InvalidPartName)
    }
}

/// Collection of relationships from a single source (the package root or a part).
///
/// Relationship IDs are allocated from a strictly increasing per-collection
/// counter starting at `rId1`. An ID is never reused within the collection's
/// lifetime, even after the relationship it named is removed, so no two live
/// relationships from the same source can ever share an ID.
#[derive(Debug, Clone)]
pub struct Relationships {
    /// Base URI for resolving relative references
    base_uri: String,

    /// Map of relationship ID to Relationship
    rels: HashMap<String, Relationship>,

    /// Next rId number to allocate; only ever moves forward
    next_num: u32,
}

impl Relationships {
    /// Create a new empty relationships collection.
    ///
    /// # Arguments
    /// * `base_uri` - Base URI for resolving relative references
    pub fn new(base_uri: String) -> Self {
        Self {
            base_uri,
            rels: HashMap::new(),
            next_num: 1,
        }
    }

    /// Add a relationship with an explicit ID, as read from a .rels part.
    ///
    /// Advances the allocation counter past the parsed ID so that later
    /// allocations cannot collide with loaded relationships.
    pub fn add_relationship(
        &mut self,
        reltype: String,
        target_ref: String,
        r_id: String,
        mode: TargetMode,
    ) -> &Relationship {
        if let Some(num) = Self::r_id_num(&r_id)
            && num >= self.next_num
        {
            self.next_num = num + 1;
        }
        let rel = Relationship::new(
            r_id.clone(),
            reltype,
            target_ref,
            self.base_uri.clone(),
            mode,
        );
        self.rels.insert(r_id.clone(), rel);
        // Safe to unwrap since we just inserted it
        self.rels.get(r_id.as_str()).unwrap()
    }

    /// Get a relationship by its ID.
    #[inline]
    pub fn get(&self, r_id: &str) -> Option<&Relationship> {
        self.rels.get(r_id)
    }

    /// Get or add an internal relationship to a target part.
    ///
    /// If a relationship of the given type to the target already exists,
    /// returns that relationship. Otherwise, creates a new one with the
    /// next rId.
    pub fn get_or_add(&mut self, reltype: &str, target_ref: &str) -> &Relationship {
        if let Some(r_id) = self.find(reltype, target_ref, TargetMode::Internal) {
            return self.rels.get(&r_id).unwrap();
        }

        let r_id = self.next_r_id();
        self.add_relationship(
            reltype.to_string(),
            target_ref.to_string(),
            r_id,
            TargetMode::Internal,
        )
    }

    /// Get or add an external relationship.
    ///
    /// Similar to `get_or_add` but for external targets; returns the rId.
    pub fn get_or_add_external(&mut self, reltype: &str, target_ref: &str) -> String {
        if let Some(r_id) = self.find(reltype, target_ref, TargetMode::External) {
            return r_id;
        }

        let r_id = self.next_r_id();
        self.add_relationship(
            reltype.to_string(),
            target_ref.to_string(),
            r_id.clone(),
            TargetMode::External,
        );
        r_id
    }

    fn find(&self, reltype: &str, target_ref: &str, mode: TargetMode) -> Option<String> {
        self.rels
            .values()
            .find(|rel| {
                rel.reltype() == reltype
                    && rel.target_ref() == target_ref
                    && rel.is_external() == (mode == TargetMode::External)
            })
            .map(|rel| rel.r_id().to_string())
    }

    /// Allocate the next relationship ID.
    ///
    /// IDs take the form "rId1", "rId2", ... from a counter that never moves
    /// backwards; gaps left by removed relationships are not refilled.
    fn next_r_id(&mut self) -> String {
        let r_id = format!("rId{}", self.next_num);
        self.next_num += 1;
        r_id
    }

    /// Extract the numeric suffix from an "rId123"-style ID.
    fn r_id_num(r_id: &str) -> Option<u32> {
        if r_id.len() > 3 && &r_id[..3] == "rId" {
            atoi_simd::parse::<u32, false, false>(&r_id.as_bytes()[3..]).ok()
        } else {
            None
        }
    }

    /// Get the single relationship of a specific type.
    ///
    /// Returns an error if no relationship of the type is found, or if
    /// multiple relationships of the type exist.
    pub fn part_with_reltype(&self, reltype: &str) -> Result<&Relationship> {
        let matching: Vec<&Relationship> = self
            .rels
            .values()
            .filter(|rel| rel.reltype() == reltype)
            .collect();

        match matching.len() {
            0 => Err(PackageError::RelationshipNotFound(format!(
                "No relationship of type '{}'",
                reltype
            ))),
            1 => Ok(matching[0]),
            _ => Err(PackageError::InvalidRelationship(format!(
                "Multiple relationships of type '{}'",
                reltype
            ))),
        }
    }

    /// Get an iterator over all relationships.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.rels.values()
    }

    /// Get the number of relationships in the collection.
    #[inline]
    pub fn len(&self) -> usize {
        self.rels.len()
    }

    /// Check if the collection is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rels.is_empty()
    }

    /// Remove a relationship by its ID.
    ///
    /// The removed ID is retired: it will not be handed out again by this
    /// collection.
    pub fn remove(&mut self, r_id: &str) -> Option<Relationship> {
        self.rels.remove(r_id)
    }

    /// Serialize relationships to XML format.
    ///
    /// Generates the XML for a .rels part, with relationships sorted by their
    /// numeric ID for deterministic output.
    pub fn to_xml(&self) -> String {
        let mut xml = String::with_capacity(1024);

        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push('\n');
        let _ = write!(
            xml,
            r#"<Relationships xmlns="{}">"#,
            namespace::OPC_RELATIONSHIPS
        );
        xml.push('\n');

        let mut rels: Vec<&Relationship> = self.rels.values().collect();
        rels.sort_by_key(|rel| Self::r_id_num(rel.r_id()).unwrap_or(u32::MAX));

        for rel in rels {
            let target_mode = if rel.is_external() {
                r#" TargetMode="External""#
            } else {
                ""
            };

            let _ = write!(
                xml,
                r#"  <Relationship Id="{}" Type="{}" Target="{}"{}/>"#,
                escape_xml(rel.r_id()),
                escape_xml(rel.reltype()),
                escape_xml(rel.target_ref()),
                target_mode
            );
            xml.push('\n');
        }

        xml.push_str("</Relationships>");

        xml
    }
}

impl Default for Relationships {
    fn default() -> Self {
        Self::new("/".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relationship_creation() {
        let rel = Relationship::new(
            "rId1".to_string(),
            "http://example.com/rel".to_string(),
            "target.xml".to_string(),
            "/word".to_string(),
            TargetMode::Internal,
        );

        assert_eq!(rel.r_id(), "rId1");
        assert_eq!(rel.reltype(), "http://example.com/rel");
        assert!(!rel.is_external());
    }

    #[test]
    fn test_get_or_add() {
        let mut rels = Relationships::new("/word".to_string());

        let r_id1 = rels.get_or_add("type1", "target1").r_id().to_string();
        assert_eq!(r_id1, "rId1");

        // Getting the same relationship should return the same rId
        let r_id2 = rels.get_or_add("type1", "target1").r_id().to_string();
        assert_eq!(r_id2, "rId1");

        // Different target should create a new relationship
        let r_id3 = rels.get_or_add("type1", "target2").r_id().to_string();
        assert_eq!(r_id3, "rId2");
    }

    #[test]
    fn test_ids_not_reused_after_remove() {
        let mut rels = Relationships::new("/word".to_string());

        rels.get_or_add("type1", "target1");
        rels.get_or_add("type1", "target2");
        assert!(rels.remove("rId1").is_some());

        // The retired rId1 must not come back
        let r_id = rels.get_or_add("type1", "target3").r_id().to_string();
        assert_eq!(r_id, "rId3");
        assert!(rels.get("rId1").is_none());
    }

    #[test]
    fn test_counter_primed_from_loaded_ids() {
        let mut rels = Relationships::new("/word".to_string());
        rels.add_relationship(
            "type1".to_string(),
            "target7".to_string(),
            "rId7".to_string(),
            TargetMode::Internal,
        );

        let r_id = rels.get_or_add("type1", "target8").r_id().to_string();
        assert_eq!(r_id, "rId8");
    }

    #[test]
    fn test_generated_ids_pairwise_distinct() {
        let mut rels = Relationships::new("/word".to_string());
        let mut seen = std::collections::HashSet::new();
        for i in 0..32 {
            let r_id = rels
                .get_or_add("type", &format!("target{}", i))
                .r_id()
                .to_string();
            assert!(seen.insert(r_id));
        }
    }

    #[test]
    fn test_to_xml_sorted_and_external_mode() {
        let mut rels = Relationships::new("/".to_string());
        rels.get_or_add("typeA", "word/document.xml");
        rels.get_or_add_external("typeB", "https://example.com");

        let xml = rels.to_xml();
        let pos1 = xml.find("rId1").unwrap();
        let pos2 = xml.find("rId2").unwrap();
        assert!(pos1 < pos2);
        assert!(xml.contains(r#"TargetMode="External""#));
    }
}
