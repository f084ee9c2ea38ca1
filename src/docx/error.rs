/// Error types for WordprocessingML document operations.
use crate::docx::protection::ProtectionKind;
use thiserror::Error;

/// Result type for document operations.
pub type Result<T> = std::result::Result<T, DocxError>;

/// Error types for document operations.
#[derive(Error, Debug)]
pub enum DocxError {
    /// OPC package error
    #[error("Package error: {0}")]
    Package(#[from] crate::opc::error::PackageError),

    /// Mutator called before a document was created or opened
    #[error("Document not initialized")]
    NotInitialized,

    /// Paragraph, run, or table index outside the current sequence bounds
    #[error("{what} index {index} out of range (len {len})")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },

    /// A relationship target, comment id, or anchor text cannot be resolved
    #[error("Unresolved reference: {0}")]
    UnresolvedReference(String),

    /// Password did not match the stored protection hash
    #[error("Incorrect protection password")]
    WrongPassword,

    /// Mutation rejected by enforced document protection
    #[error("Document is protected ({0:?})")]
    DocumentProtected(ProtectionKind),

    /// Validation failure without auto-fix
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Invalid format or argument
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// XML parsing error
    #[error("XML error: {0}")]
    Xml(String),
}

impl From<quick_xml::Error> for DocxError {
    fn from(err: quick_xml::Error) -> Self {
        DocxError::Xml(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for DocxError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        DocxError::Xml(err.to_string())
    }
}
