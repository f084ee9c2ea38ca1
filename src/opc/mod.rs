/// Open Packaging Conventions (OPC) implementation.
///
/// This module implements the packaging layer of WordprocessingML documents:
/// the structure and container format that holds every part of a .docx file.
/// It includes support for:
///
/// - Package structure (parts, relationships)
/// - Content type management (Default and Override declarations)
/// - ZIP-based physical packaging
/// - Efficient parsing and minimal memory allocation
///
/// Opening a package is all-or-nothing: a missing required part or an archive
/// that cannot be decompressed yields a [`PackageError`] and no partial
/// container state.
pub mod constants;
pub mod error;
pub mod package;
pub mod packuri;
pub mod part;
pub mod phys;
pub mod pkgreader;
pub mod pkgwriter;
pub mod rel;

// Re-export commonly used types
pub use error::{PackageError, Result};
pub use package::Package;
pub use packuri::PackUri;
pub use part::Part;
pub use pkgwriter::PackageWriter;
pub use rel::{Relationship, Relationships, TargetMode};
