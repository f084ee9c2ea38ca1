//! Provides a general interface to a physical OPC package (ZIP archive).
//!
//! This module handles the low-level reading and writing of OPC packages as
//! ZIP archives. Reads load the whole archive into memory so parsing never
//! holds an open file handle; writes assemble the archive in memory and flush
//! it in one operation, so a failed save cannot leave a file locked or
//! partially written.

use crate::opc::error::{PackageError, Result};
use crate::opc::packuri::PackUri;
use std::collections::HashMap;
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Physical package reader that provides access to the members of a ZIP-based
/// OPC package.
pub struct PhysPackageReader {
    /// Decompressed archive contents, keyed by membername
    members: HashMap<String, Vec<u8>>,
}

impl PhysPackageReader {
    /// Open an OPC package from a file path.
    ///
    /// # Errors
    /// Returns an error if the file doesn't exist, isn't a valid ZIP archive,
    /// or cannot be decompressed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(PackageError::PackageNotFound(path.display().to_string()));
        }

        let data = std::fs::read(path)?;
        Self::from_bytes(data)
    }

    /// Create a new PhysPackageReader from archive bytes.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(data))?;

        let mut members = HashMap::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let mut blob = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut blob)?;
            members.insert(file.name().to_string(), blob);
        }

        Ok(Self { members })
    }

    /// Create a new PhysPackageReader from a reader.
    pub fn from_reader<R: Read + Seek>(mut reader: R) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::from_bytes(data)
    }

    /// Get the binary content for a part by its PackUri.
    pub fn blob_for(&self, pack_uri: &PackUri) -> Result<Vec<u8>> {
        self.members
            .get(pack_uri.membername())
            .cloned()
            .ok_or_else(|| PackageError::PartNotFound(pack_uri.to_string()))
    }

    /// Get the [Content_Types].xml content.
    ///
    /// This is a required part of every OPC package that maps parts to
    /// content types.
    pub fn content_types_xml(&self) -> Result<Vec<u8>> {
        let membername = crate::opc::packuri::CONTENT_TYPES_URI.trim_start_matches('/');
        self.members
            .get(membername)
            .cloned()
            .ok_or_else(|| PackageError::MissingPart("[Content_Types].xml".to_string()))
    }

    /// Get the relationships XML for a specific source URI.
    ///
    /// Relationships files are stored in _rels directories and have a .rels
    /// extension. Returns None if the source has no relationships file.
    pub fn rels_xml_for(&self, source_uri: &PackUri) -> Result<Option<Vec<u8>>> {
        let rels_uri = source_uri.rels_uri().map_err(PackageError::InvalidPartName)?;
        Ok(self.members.get(rels_uri.membername()).cloned())
    }

    /// Get the number of members in the package (excluding directories).
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Check if the package is empty.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// List all member names in the package.
    pub fn member_names(&self) -> Vec<&str> {
        self.members.keys().map(String::as_str).collect()
    }

    /// Check if a specific member exists in the package.
    pub fn contains(&self, pack_uri: &PackUri) -> bool {
        self.members.contains_key(pack_uri.membername())
    }

    /// Take ownership of all decompressed members, keyed by membername.
    pub fn into_members(self) -> HashMap<String, Vec<u8>> {
        self.members
    }
}

/// Physical package writer for creating OPC packages.
///
/// Writes parts into an in-memory ZIP archive with Deflate compression.
pub struct PhysPackageWriter {
    archive: ZipWriter<Cursor<Vec<u8>>>,
}

impl PhysPackageWriter {
    /// Create a new package writer that writes to memory.
    pub fn new() -> Self {
        Self {
            archive: ZipWriter::new(Cursor::new(Vec::new())),
        }
    }

    /// Write a part to the package with Deflate compression.
    ///
    /// # Arguments
    /// * `pack_uri` - The PackUri for the part
    /// * `blob` - The binary content to write
    pub fn write(&mut self, pack_uri: &PackUri, blob: &[u8]) -> Result<()> {
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        self.archive.start_file(pack_uri.membername(), options)?;
        self.archive.write_all(blob)?;
        Ok(())
    }

    /// Finish writing and return the package bytes.
    ///
    /// Consumes the writer and returns the complete ZIP archive.
    pub fn finish(self) -> Result<Vec<u8>> {
        let cursor = self.archive.finish()?;
        Ok(cursor.into_inner())
    }
}

impl Default for PhysPackageWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let mut writer = PhysPackageWriter::new();
        let pack_uri = PackUri::new("/test.txt").unwrap();
        writer.write(&pack_uri, b"Hello, World!").unwrap();
        let zip_data = writer.finish().unwrap();

        let reader = PhysPackageReader::from_bytes(zip_data).unwrap();
        let content = reader.blob_for(&pack_uri).unwrap();
        assert_eq!(content, b"Hello, World!");
    }

    #[test]
    fn test_multiple_parts() {
        let mut writer = PhysPackageWriter::new();

        let content_types = PackUri::new("/[Content_Types].xml").unwrap();
        let rels = PackUri::new("/_rels/.rels").unwrap();
        let document = PackUri::new("/word/document.xml").unwrap();

        writer.write(&content_types, b"<Types/>").unwrap();
        writer.write(&rels, b"<Relationships/>").unwrap();
        writer.write(&document, b"<document/>").unwrap();

        let zip_data = writer.finish().unwrap();
        let reader = PhysPackageReader::from_bytes(zip_data).unwrap();

        assert!(reader.contains(&content_types));
        assert!(reader.contains(&rels));
        assert!(reader.contains(&document));
        assert_eq!(reader.blob_for(&document).unwrap(), b"<document/>");
    }

    #[test]
    fn test_invalid_archive_rejected() {
        let result = PhysPackageReader::from_bytes(b"not a zip archive".to_vec());
        assert!(matches!(result, Err(PackageError::Zip(_))));
    }

    #[test]
    fn test_missing_file_is_package_not_found() {
        let result = PhysPackageReader::open("/nonexistent/file.docx");
        assert!(matches!(result, Err(PackageError::PackageNotFound(_))));
    }
}
