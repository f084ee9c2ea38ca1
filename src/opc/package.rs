/// Objects that implement reading and writing OPC packages.
///
/// This module provides the main Package type, which represents an Open
/// Packaging Conventions container in memory. It owns the registered parts,
/// the package-level relationships, and provides the open/save operations.
use crate::opc::constants::relationship_type;
use crate::opc::error::{PackageError, Result};
use crate::opc::packuri::{PACKAGE_URI, PackUri};
use crate::opc::part::Part;
use crate::opc::phys::PhysPackageReader;
use crate::opc::pkgreader::PackageReader;
use crate::opc::pkgwriter::PackageWriter;
use crate::opc::rel::{Relationships, TargetMode};
use std::collections::HashMap;
use std::io::{Read, Seek};
use std::path::Path;

/// Main API type for working with OPC packages.
///
/// Package represents an Open Packaging Conventions container in memory,
/// providing access to parts, relationships, and package-level operations.
/// Opening is all-or-nothing: every structural error surfaces as a
/// [`PackageError`] before any container state is handed to the caller.
pub struct Package {
    /// Package-level relationships
    rels: Relationships,

    /// All parts in the package, indexed by partname
    parts: HashMap<String, Part>,
}

impl Package {
    /// Create a new empty OPC package.
    pub fn new() -> Self {
        Self {
            rels: Relationships::new(PACKAGE_URI.to_string()),
            parts: HashMap::new(),
        }
    }

    /// Open an OPC package from a file.
    ///
    /// Reads the ZIP archive, loads `[Content_Types].xml`, `_rels/.rels`, and
    /// every part referenced transitively from the root relationships.
    ///
    /// # Example
    /// ```no_run
    /// use longan::opc::Package;
    ///
    /// let pkg = Package::open("document.docx").unwrap();
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        log::debug!("opening package {}", path.as_ref().display());
        let phys_reader = PhysPackageReader::open(path)?;
        Self::from_phys_reader(phys_reader)
    }

    /// Load an OPC package from a reader.
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        let phys_reader = PhysPackageReader::from_reader(reader)?;
        Self::from_phys_reader(phys_reader)
    }

    /// Load an OPC package from raw archive bytes.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let phys_reader = PhysPackageReader::from_bytes(data)?;
        Self::from_phys_reader(phys_reader)
    }

    fn from_phys_reader(phys_reader: PhysPackageReader) -> Result<Self> {
        let pkg_reader = PackageReader::from_phys_reader(phys_reader)?;
        let package = Self::unmarshal(pkg_reader)?;
        // A package without a resolvable main document part is structurally
        // incomplete; open is all-or-nothing
        package.main_document_part()?;
        Ok(package)
    }

    /// Unmarshal a package from a package reader.
    ///
    /// This is the main deserialization logic that converts serialized parts
    /// and relationships into the in-memory object graph.
    fn unmarshal(mut pkg_reader: PackageReader) -> Result<Self> {
        let mut package = Self::new();

        for srel in pkg_reader.pkg_srels() {
            let mode = if srel.is_external() {
                TargetMode::External
            } else {
                TargetMode::Internal
            };
            package.rels.add_relationship(
                srel.reltype.clone(),
                srel.target_ref.clone(),
                srel.r_id.clone(),
                mode,
            );
        }

        for spart in pkg_reader.take_sparts() {
            let mut part = Part::new(spart.partname, spart.content_type, spart.blob);
            for srel in &spart.srels {
                let mode = if srel.is_external() {
                    TargetMode::External
                } else {
                    TargetMode::Internal
                };
                part.rels_mut().add_relationship(
                    srel.reltype.clone(),
                    srel.target_ref.clone(),
                    srel.r_id.clone(),
                    mode,
                );
            }
            package.parts.insert(part.partname().to_string(), part);
        }

        log::debug!("loaded package with {} parts", package.part_count());
        Ok(package)
    }

    /// Get a reference to the main document part.
    ///
    /// This is the target of the officeDocument relationship from the package
    /// root: `word/document.xml` for WordprocessingML packages.
    pub fn main_document_part(&self) -> Result<&Part> {
        let rel = self.rels.part_with_reltype(relationship_type::OFFICE_DOCUMENT)?;
        let partname = rel.target_partname()?;
        self.part(&partname)
    }

    /// Get a part by its partname.
    pub fn part(&self, partname: &PackUri) -> Result<&Part> {
        self.parts
            .get(partname.as_str())
            .ok_or_else(|| PackageError::PartNotFound(partname.to_string()))
    }

    /// Get a mutable reference to a part by its partname.
    pub fn part_mut(&mut self, partname: &PackUri) -> Result<&mut Part> {
        self.parts
            .get_mut(partname.as_str())
            .ok_or_else(|| PackageError::PartNotFound(partname.to_string()))
    }

    /// Get a part by relationship type from the package level.
    pub fn part_by_reltype(&self, reltype: &str) -> Result<&Part> {
        let rel = self.rels.part_with_reltype(reltype)?;
        let partname = rel.target_partname()?;
        self.part(&partname)
    }

    /// Register a part in the package.
    ///
    /// A part with the same name replaces the existing registration; names
    /// are unique within a package.
    ///
    /// # Arguments
    /// * `name` - The partname, beginning with a forward slash
    /// * `blob` - The binary content of the part
    /// * `content_type` - The MIME content type of the part
    pub fn add_part(&mut self, name: &str, blob: Vec<u8>, content_type: &str) -> Result<&mut Part> {
        let partname = PackUri::new(name).map_err(PackageError::InvalidPartName)?;
        let part = Part::new(partname.clone(), content_type.to_string(), blob);
        self.parts.insert(partname.to_string(), part);
        Ok(self.parts.get_mut(partname.as_str()).unwrap())
    }

    /// Get an iterator over all parts in the package.
    pub fn iter_parts(&self) -> impl Iterator<Item = &Part> {
        self.parts.values()
    }

    /// Get the number of parts in the package.
    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    /// Check if a part exists in the package.
    pub fn contains_part(&self, partname: &PackUri) -> bool {
        self.parts.contains_key(partname.as_str())
    }

    /// Get a reference to the package-level relationships.
    pub fn rels(&self) -> &Relationships {
        &self.rels
    }

    /// Get a mutable reference to the package-level relationships.
    pub fn rels_mut(&mut self) -> &mut Relationships {
        &mut self.rels
    }

    /// Relate the package root to a part, returning the relationship ID.
    pub fn relate_to(&mut self, partname: &str, reltype: &str) -> String {
        let target_ref = partname.trim_start_matches('/');
        let rel = self.rels.get_or_add(reltype, target_ref);
        rel.r_id().to_string()
    }

    /// Save the package to a file.
    ///
    /// Writes exactly one ZIP entry per registered part plus the structural
    /// parts (content types, package relationships, per-part relationships).
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        log::debug!(
            "saving package with {} parts to {}",
            self.part_count(),
            path.as_ref().display()
        );
        PackageWriter::write(path, self)
    }

    /// Serialize the package to archive bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        PackageWriter::to_bytes(self)
    }
}

impl Default for Package {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opc::constants::content_type as ct;
    use std::io::{Cursor, Write};
    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    fn create_minimal_docx() -> Vec<u8> {
        let mut zip_data = Vec::new();
        {
            let cursor = Cursor::new(&mut zip_data);
            let mut writer = ZipWriter::new(cursor);
            let options = SimpleFileOptions::default();

            writer.start_file("[Content_Types].xml", options).unwrap();
            writer.write_all(br#"<?xml version="1.0"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
    <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
    <Default Extension="xml" ContentType="application/xml"/>
    <Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
</Types>"#).unwrap();

            writer.start_file("_rels/.rels", options).unwrap();
            writer.write_all(br#"<?xml version="1.0"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
    <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
</Relationships>"#).unwrap();

            writer.start_file("word/document.xml", options).unwrap();
            writer.write_all(br#"<?xml version="1.0"?>
<document xmlns="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
    <body><p><t>Test</t></p></body>
</document>"#).unwrap();

            writer.finish().unwrap();
        }
        zip_data
    }

    #[test]
    fn test_open_package() {
        let zip_data = create_minimal_docx();
        let pkg = Package::from_bytes(zip_data).unwrap();

        assert_eq!(pkg.part_count(), 1);
        let main_part = pkg.main_document_part().unwrap();
        assert_eq!(main_part.content_type(), ct::WML_DOCUMENT_MAIN);
    }

    #[test]
    fn test_missing_content_types_fails() {
        let mut zip_data = Vec::new();
        {
            let cursor = Cursor::new(&mut zip_data);
            let mut writer = ZipWriter::new(cursor);
            let options = SimpleFileOptions::default();
            writer.start_file("word/document.xml", options).unwrap();
            writer.write_all(b"<document/>").unwrap();
            writer.finish().unwrap();
        }

        let result = Package::from_bytes(zip_data);
        assert!(matches!(result, Err(PackageError::MissingPart(_))));
    }

    #[test]
    fn test_save_round_trip() {
        let mut pkg = Package::new();
        pkg.add_part(
            "/word/document.xml",
            b"<document/>".to_vec(),
            ct::WML_DOCUMENT_MAIN,
        )
        .unwrap();
        pkg.relate_to("/word/document.xml", relationship_type::OFFICE_DOCUMENT);

        let bytes = pkg.to_bytes().unwrap();
        let reopened = Package::from_bytes(bytes).unwrap();

        assert_eq!(reopened.part_count(), 1);
        let main = reopened.main_document_part().unwrap();
        assert_eq!(main.blob(), b"<document/>");
    }

    #[test]
    fn test_part_lookup_failure() {
        let pkg = Package::new();
        let missing = PackUri::new("/word/missing.xml").unwrap();
        assert!(matches!(
            pkg.part(&missing),
            Err(PackageError::PartNotFound(_))
        ));
    }
}
