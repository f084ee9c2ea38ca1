/// Error types for OPC package operations.
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PackageError {
    #[error("Package not found: {0}")]
    PackageNotFound(String),

    #[error("Invalid part name: {0}")]
    InvalidPartName(String),

    #[error("Part not found: {0}")]
    PartNotFound(String),

    #[error("Required part missing: {0}")]
    MissingPart(String),

    #[error("Relationship not found: {0}")]
    RelationshipNotFound(String),

    #[error("Content type not found for partname: {0}")]
    ContentTypeNotFound(String),

    #[error("Invalid relationship: {0}")]
    InvalidRelationship(String),

    #[error("XML parsing error: {0}")]
    Xml(String),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("UTF-8 conversion error: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}

impl From<quick_xml::Error> for PackageError {
    fn from(err: quick_xml::Error) -> Self {
        PackageError::Xml(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for PackageError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        PackageError::Xml(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PackageError>;
