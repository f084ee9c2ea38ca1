//! Low-level, read-only API to a serialized Open Packaging Conventions package.
//!
//! This module provides the PackageReader for parsing OPC packages, including
//! content type mapping, relationship resolution, and part loading.

use crate::opc::constants::target_mode;
use crate::opc::error::{PackageError, Result};
use crate::opc::packuri::{PACKAGE_URI, PackUri};
use crate::opc::phys::PhysPackageReader;
use quick_xml::Reader;
use quick_xml::events::Event;
use smallvec::SmallVec;
use std::collections::{HashMap, HashSet};

/// Serialized part with its content and relationships.
///
/// Represents a part as loaded from the physical package, before being
/// converted into a [`Part`](crate::opc::Part) object.
#[derive(Debug)]
pub struct SerializedPart {
    /// The partname (URI) of this part
    pub partname: PackUri,

    /// The content type of this part
    pub content_type: String,

    /// The binary content of this part
    pub blob: Vec<u8>,

    /// Serialized relationships from this part
    pub srels: SmallVec<[SerializedRelationship; 8]>,
}

/// Serialized relationship as read from a .rels part.
///
/// Contains all relationship information in string form, before being
/// converted into Relationship objects with resolved part references.
#[derive(Debug, Clone)]
pub struct SerializedRelationship {
    /// Base URI for resolving relative references
    pub base_uri: String,

    /// Relationship ID (e.g., "rId1")
    pub r_id: String,

    /// Relationship type URI
    pub reltype: String,

    /// Target reference (relative URI or external URL)
    pub target_ref: String,

    /// Target mode (Internal or External)
    pub target_mode: String,
}

impl SerializedRelationship {
    /// Check if this is an external relationship.
    #[inline]
    pub fn is_external(&self) -> bool {
        self.target_mode == target_mode::EXTERNAL
    }

    /// Get the target partname for internal relationships.
    ///
    /// Resolves the relative target reference against the base URI to produce
    /// an absolute PackUri.
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

/// Content type map for looking up content types by part name or extension.
///
/// Implements the OPC content type discovery algorithm using Default and
/// Override elements from [Content_Types].xml. An Override always wins over
/// a Default for the same part.
pub(crate) struct ContentTypeMap {
    /// Maps file extensions to default content types
    defaults: HashMap<String, String>,

    /// Maps specific partnames to override content types
    overrides: HashMap<String, String>,
}

impl ContentTypeMap {
    fn new() -> Self {
        Self {
            defaults: HashMap::new(),
            overrides: HashMap::new(),
        }
    }

    /// Parse content types from [Content_Types].xml.
    pub(crate) fn from_xml(xml: &[u8]) -> Result<Self> {
        let mut map = Self::new();
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => match e.local_name().as_ref()
                {
                    b"Default" => {
                        let mut extension = None;
                        let mut content_type = None;

                        for attr in e.attributes() {
                            let attr = attr?;
                            match attr.key.as_ref() {
                                b"Extension" => {
                                    extension = Some(attr.unescape_value()?.to_string());
                                }
                                b"ContentType" => {
                                    content_type = Some(attr.unescape_value()?.to_string());
                                }
                                _ => {}
                            }
                        }

                        if let (Some(ext), Some(ct)) = (extension, content_type) {
                            map.add_default(ext, ct);
                        }
                    }
                    b"Override" => {
                        let mut partname = None;
                        let mut content_type = None;

                        for attr in e.attributes() {
                            let attr = attr?;
                            match attr.key.as_ref() {
                                b"PartName" => {
                                    partname = Some(attr.unescape_value()?.to_string());
                                }
                                b"ContentType" => {
                                    content_type = Some(attr.unescape_value()?.to_string());
                                }
                                _ => {}
                            }
                        }

                        if let (Some(pn), Some(ct)) = (partname, content_type) {
                            map.add_override(pn, ct);
                        }
                    }
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(PackageError::Xml(format!(
                        "Content types parse error: {}",
                        e
                    )));
                }
                _ => {}
            }
            buf.clear();
        }

        Ok(map)
    }

    /// Add a default content type mapping for a file extension.
    fn add_default(&mut self, extension: String, content_type: String) {
        self.defaults.insert(extension.to_lowercase(), content_type);
    }

    /// Add an override content type mapping for a specific partname.
    fn add_override(&mut self, partname: String, content_type: String) {
        self.overrides.insert(partname, content_type);
    }

    /// Get the content type for a partname.
    ///
    /// Checks for an Override first, then falls back to the Default based on
    /// file extension.
    pub(crate) fn get(&self, pack_uri: &PackUri) -> Result<String> {
        if let Some(ct) = self.overrides.get(pack_uri.as_str()) {
            return Ok(ct.clone());
        }

        let ext = pack_uri.ext().to_lowercase();
        if let Some(ct) = self.defaults.get(&ext) {
            return Ok(ct.clone());
        }

        Err(PackageError::ContentTypeNotFound(pack_uri.to_string()))
    }
}

/// Package reader that provides access to serialized parts and relationships.
///
/// This is the main entry point for reading OPC packages. It parses the
/// package structure, resolves relationships, and loads every part reachable
/// from the package root. Errors are surfaced immediately; no partially
/// loaded package is ever returned.
pub struct PackageReader {
    /// Package-level relationships
    pkg_srels: SmallVec<[SerializedRelationship; 8]>,

    /// All serialized parts in the package
    sparts: Vec<SerializedPart>,
}

impl PackageReader {
    /// Parse an OPC package from a physical package reader.
    ///
    /// 1. Parse [Content_Types].xml
    /// 2. Parse the package-level relationships (_rels/.rels)
    /// 3. Load all parts by walking the relationship graph transitively
    pub fn from_phys_reader(phys_reader: PhysPackageReader) -> Result<Self> {
        let mut members = phys_reader.into_members();

        let content_types_path =
            crate::opc::packuri::CONTENT_TYPES_URI.trim_start_matches('/');
        let content_types_xml = members
            .get(content_types_path)
            .ok_or_else(|| PackageError::MissingPart("[Content_Types].xml".to_string()))?;
        let content_types = ContentTypeMap::from_xml(content_types_xml)?;

        let package_uri = PackUri::new(PACKAGE_URI).map_err(PackageError::InvalidPartName)?;
        let pkg_srels = Self::load_rels_from_members(&members, &package_uri)?;
        if pkg_srels.is_empty() {
            return Err(PackageError::MissingPart("_rels/.rels".to_string()));
        }

        let sparts = Self::load_parts_from_members(&mut members, &pkg_srels, &content_types)?;

        Ok(Self { pkg_srels, sparts })
    }

    /// Load relationships for a source URI from the decompressed members.
    fn load_rels_from_members(
        members: &HashMap<String, Vec<u8>>,
        source_uri: &PackUri,
    ) -> Result<SmallVec<[SerializedRelationship; 8]>> {
        let rels_uri = source_uri.rels_uri().map_err(PackageError::InvalidPartName)?;

        let rels_xml = match members.get(rels_uri.membername()) {
            Some(xml) => xml,
            None => return Ok(SmallVec::new()), // No relationships file
        };

        Self::parse_rels_xml(rels_xml, source_uri.base_uri())
    }

    /// Parse relationships XML into SerializedRelationship structs.
    fn parse_rels_xml(
        rels_xml: &[u8],
        base_uri: &str,
    ) -> Result<SmallVec<[SerializedRelationship; 8]>> {
        let mut srels = SmallVec::new();
        let mut reader = Reader::from_reader(rels_xml);
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                    if e.local_name().as_ref() == b"Relationship" {
                        let mut r_id = None;
                        let mut reltype = None;
                        let mut target_ref = None;
                        let mut target_mode = target_mode::INTERNAL.to_string();

                        for attr in e.attributes() {
                            let attr = attr?;
                            match attr.key.as_ref() {
                                b"Id" => r_id = Some(attr.unescape_value()?.to_string()),
                                b"Type" => reltype = Some(attr.unescape_value()?.to_string()),
                                b"Target" => target_ref = Some(attr.unescape_value()?.to_string()),
                                b"TargetMode" => target_mode = attr.unescape_value()?.to_string(),
                                _ => {}
                            }
                        }

                        if let (Some(id), Some(rt), Some(tr)) = (r_id, reltype, target_ref) {
                            srels.push(SerializedRelationship {
                                base_uri: base_uri.to_string(),
                                r_id: id,
                                reltype: rt,
                                target_ref: tr,
                                target_mode,
                            });
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(PackageError::Xml(format!("Rels parse error: {}", e))),
                _ => {}
            }
            buf.clear();
        }

        Ok(srels)
    }

    /// Load all parts referenced transitively from the package root.
    ///
    /// The visited set makes the traversal cycle-safe; a relationship target
    /// that is absent from the archive is an error, since the package is then
    /// structurally incomplete.
    fn load_parts_from_members(
        members: &mut HashMap<String, Vec<u8>>,
        pkg_srels: &[SerializedRelationship],
        content_types: &ContentTypeMap,
    ) -> Result<Vec<SerializedPart>> {
        let mut sparts = Vec::with_capacity(16);
        let mut visited = HashSet::with_capacity(16);
        let mut work_queue: Vec<PackUri> = Vec::with_capacity(pkg_srels.len());

        for srel in pkg_srels {
            if srel.is_external() {
                continue;
            }
            let partname = srel.target_partname()?;
            if visited.insert(partname.to_string()) {
                work_queue.push(partname);
            }
        }

        while let Some(partname) = work_queue.pop() {
            let membername = partname.membername().to_string();

            // Load relationships before taking blob ownership
            let part_srels = Self::load_rels_from_members(members, &partname)?;

            for child_srel in &part_srels {
                if child_srel.is_external() {
                    continue;
                }
                let child_partname = child_srel.target_partname()?;
                if visited.insert(child_partname.to_string()) {
                    work_queue.push(child_partname);
                }
            }

            // Take ownership of the blob to avoid cloning
            let blob = members
                .remove(&membername)
                .ok_or_else(|| PackageError::PartNotFound(partname.to_string()))?;
            let content_type = content_types.get(&partname)?;

            sparts.push(SerializedPart {
                partname,
                content_type,
                blob,
                srels: part_srels,
            });
        }

        Ok(sparts)
    }

    /// Get an iterator over all serialized parts.
    pub fn iter_sparts(&self) -> impl Iterator<Item = &SerializedPart> {
        self.sparts.iter()
    }

    /// Get package-level relationships.
    pub fn pkg_srels(&self) -> &[SerializedRelationship] {
        &self.pkg_srels
    }

    /// Take ownership of all serialized parts.
    pub fn take_sparts(&mut self) -> Vec<SerializedPart> {
        std::mem::take(&mut self.sparts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_map() {
        let xml = br#"<?xml version="1.0"?>
            <Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
                <Default Extension="xml" ContentType="application/xml"/>
                <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
                <Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
            </Types>"#;

        let ct_map = ContentTypeMap::from_xml(xml).unwrap();

        let uri = PackUri::new("/test.xml").unwrap();
        assert_eq!(ct_map.get(&uri).unwrap(), "application/xml");

        // Override wins over the xml Default
        let uri = PackUri::new("/word/document.xml").unwrap();
        assert_eq!(
            ct_map.get(&uri).unwrap(),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"
        );

        let uri = PackUri::new("/image.png").unwrap();
        assert!(matches!(
            ct_map.get(&uri),
            Err(PackageError::ContentTypeNotFound(_))
        ));
    }

    #[test]
    fn test_parse_rels_xml() {
        let xml = br#"<?xml version="1.0"?>
            <Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
                <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
                <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="https://example.com" TargetMode="External"/>
            </Relationships>"#;

        let srels = PackageReader::parse_rels_xml(xml, "/").unwrap();
        assert_eq!(srels.len(), 2);
        assert_eq!(srels[0].r_id, "rId1");
        assert!(!srels[0].is_external());
        assert_eq!(
            srels[0].target_partname().unwrap().as_str(),
            "/word/document.xml"
        );
        assert!(srels[1].is_external());
        assert!(srels[1].target_partname().is_err());
    }
}
