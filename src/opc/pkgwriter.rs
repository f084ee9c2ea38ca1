//! Package writer for OPC packages.
//!
//! This module serializes a [`Package`](crate::opc::Package) to a ZIP archive:
//! the [Content_Types].xml part, package relationships, per-part
//! relationships, and every registered part, in deterministic order.

use crate::common::xml::escape_xml;
use crate::opc::constants::{content_type as ct, namespace};
use crate::opc::error::{PackageError, Result};
use crate::opc::package::Package;
use crate::opc::packuri::{CONTENT_TYPES_URI, PACKAGE_URI, PackUri};
use crate::opc::phys::PhysPackageWriter;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt::Write as FmtWrite;
use std::path::Path;

/// Extension/content-type pairs served by a Default declaration rather than
/// a per-part Override.
static DEFAULT_CONTENT_TYPES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("rels", ct::OPC_RELATIONSHIPS),
        ("xml", ct::XML),
        ("png", ct::PNG),
        ("jpg", ct::JPEG),
        ("jpeg", ct::JPEG),
        ("gif", ct::GIF),
    ])
});

/// Package writer that serializes an OPC package to a ZIP archive.
///
/// # Example
///
/// ```no_run
/// use longan::opc::{Package, PackageWriter};
///
/// let mut pkg = Package::new();
/// // ... add parts to package ...
/// PackageWriter::write("output.docx", &pkg)?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct PackageWriter;

impl PackageWriter {
    /// Write an OPC package to a file.
    pub fn write<P: AsRef<Path>>(path: P, package: &Package) -> Result<()> {
        let bytes = Self::to_bytes(package)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Write an OPC package to a stream.
    pub fn write_to_stream<W: std::io::Write>(mut writer: W, package: &Package) -> Result<()> {
        let bytes = Self::to_bytes(package)?;
        writer.write_all(&bytes)?;
        Ok(())
    }

    /// Serialize an OPC package to bytes.
    pub fn to_bytes(package: &Package) -> Result<Vec<u8>> {
        let mut phys_writer = PhysPackageWriter::new();

        Self::write_content_types(&mut phys_writer, package)?;
        Self::write_pkg_rels(&mut phys_writer, package)?;
        Self::write_parts(&mut phys_writer, package)?;

        phys_writer.finish()
    }

    /// Write the [Content_Types].xml part.
    fn write_content_types(phys_writer: &mut PhysPackageWriter, package: &Package) -> Result<()> {
        let cti = ContentTypesItem::from_package(package);
        let blob = cti.to_xml();

        let content_types_uri =
            PackUri::new(CONTENT_TYPES_URI).map_err(PackageError::InvalidPartName)?;
        phys_writer.write(&content_types_uri, blob.as_bytes())?;

        Ok(())
    }

    /// Write package-level relationships (_rels/.rels).
    fn write_pkg_rels(phys_writer: &mut PhysPackageWriter, package: &Package) -> Result<()> {
        let package_uri = PackUri::new(PACKAGE_URI).map_err(PackageError::InvalidPartName)?;
        let rels_uri = package_uri.rels_uri().map_err(PackageError::InvalidPartName)?;
        let rels_xml = package.rels().to_xml();
        phys_writer.write(&rels_uri, rels_xml.as_bytes())?;

        Ok(())
    }

    /// Write all parts and their relationships, sorted by partname.
    fn write_parts(phys_writer: &mut PhysPackageWriter, package: &Package) -> Result<()> {
        let mut parts: Vec<_> = package.iter_parts().collect();
        parts.sort_by(|a, b| a.partname().as_str().cmp(b.partname().as_str()));

        for part in parts {
            phys_writer.write(part.partname(), part.blob())?;

            if !part.rels().is_empty() {
                let rels_uri = part
                    .partname()
                    .rels_uri()
                    .map_err(PackageError::InvalidPartName)?;
                let rels_xml = part.rels().to_xml();
                phys_writer.write(&rels_uri, rels_xml.as_bytes())?;
            }
        }

        Ok(())
    }
}

/// Helper for building [Content_Types].xml content.
///
/// Manages Default and Override declarations for content type mapping.
pub(crate) struct ContentTypesItem {
    /// Default content types by extension
    defaults: HashMap<String, String>,

    /// Override content types by partname
    overrides: HashMap<String, String>,
}

impl ContentTypesItem {
    pub(crate) fn new() -> Self {
        let mut defaults = HashMap::new();

        // The rels and xml defaults are required in every package
        defaults.insert("rels".to_string(), ct::OPC_RELATIONSHIPS.to_string());
        defaults.insert("xml".to_string(), ct::XML.to_string());

        Self {
            defaults,
            overrides: HashMap::new(),
        }
    }

    /// Build a ContentTypesItem from the parts of a package.
    pub(crate) fn from_package(package: &Package) -> Self {
        let mut cti = Self::new();

        for part in package.iter_parts() {
            cti.add_content_type(part.partname(), part.content_type());
        }

        cti
    }

    /// Add a content type for a part.
    ///
    /// Uses a Default declaration when the extension/content-type pair is a
    /// well-known one, otherwise an Override for the specific partname.
    pub(crate) fn add_content_type(&mut self, partname: &PackUri, content_type: &str) {
        let ext = partname.ext().to_lowercase();

        if DEFAULT_CONTENT_TYPES.get(ext.as_str()) == Some(&content_type) {
            self.defaults.insert(ext, content_type.to_string());
        } else {
            self.overrides
                .insert(partname.to_string(), content_type.to_string());
        }
    }

    /// Generate the XML for [Content_Types].xml.
    ///
    /// Defaults and Overrides are each sorted for deterministic output.
    pub(crate) fn to_xml(&self) -> String {
        let mut xml = String::with_capacity(1024);

        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push('\n');
        let _ = write!(xml, r#"<Types xmlns="{}">"#, namespace::OPC_CONTENT_TYPES);
        xml.push('\n');

        let mut exts: Vec<_> = self.defaults.keys().collect();
        exts.sort();
        for ext in exts {
            let content_type = &self.defaults[ext];
            let _ = write!(
                xml,
                r#"  <Default Extension="{}" ContentType="{}"/>"#,
                escape_xml(ext),
                escape_xml(content_type)
            );
            xml.push('\n');
        }

        let mut partnames: Vec<_> = self.overrides.keys().collect();
        partnames.sort();
        for partname in partnames {
            let content_type = &self.overrides[partname];
            let _ = write!(
                xml,
                r#"  <Override PartName="{}" ContentType="{}"/>"#,
                escape_xml(partname),
                escape_xml(content_type)
            );
            xml.push('\n');
        }

        xml.push_str("</Types>");

        xml
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_types_xml() {
        let mut cti = ContentTypesItem::new();
        cti.add_content_type(
            &PackUri::new("/word/media/image1.png").unwrap(),
            ct::PNG,
        );
        cti.add_content_type(
            &PackUri::new("/word/document.xml").unwrap(),
            ct::WML_DOCUMENT_MAIN,
        );

        let xml = cti.to_xml();

        assert!(xml.contains(r#"<Default Extension="png" ContentType="image/png"/>"#));
        assert!(xml.contains(r#"<Override PartName="/word/document.xml""#));
        assert!(xml.contains(r#"<Default Extension="rels""#));
        assert!(xml.contains(r#"<Default Extension="xml""#));
    }

    #[test]
    fn test_override_wins_for_nondefault_xml() {
        let mut cti = ContentTypesItem::new();
        cti.add_content_type(&PackUri::new("/word/styles.xml").unwrap(), ct::WML_STYLES);

        let xml = cti.to_xml();
        assert!(xml.contains(r#"<Override PartName="/word/styles.xml""#));
    }
}
