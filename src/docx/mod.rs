/// WordprocessingML document support.
///
/// This module provides the document object model, the bidirectional
/// serializer between the DOM and the package parts, the rule-based
/// validator, and the protection state machine.
///
/// # Architecture
///
/// The module is organized around these key types:
/// - `Document`: the root aggregate (paragraphs, tables, comments, styles, protection)
/// - `DocumentWriter`: builder API with initialization gating
/// - `Paragraph` / `Run`: text content with optional character formatting
/// - `Table` / `Row` / `Cell`: rectangular grids
/// - `Comment`: annotations anchored to run ranges
/// - `Protection`: the permission/watermark/encryption/signature aggregate
/// - `DocumentValidator`: aggregating rule engine with optional auto-fix
///
/// # Example
///
/// ```rust,no_run
/// use longan::docx::Document;
///
/// let doc = Document::open("document.docx")?;
///
/// for para in doc.paragraphs() {
///     println!("Paragraph: {}", para.text);
///     for run in &para.runs {
///         println!("  Run: {} (bold: {})", run.text, run.formatting.bold);
///     }
/// }
///
/// for table in doc.tables() {
///     for row in &table.rows {
///         for cell in &row.cells {
///             println!("Cell: {}", cell.text);
///         }
///     }
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub mod comment;
pub mod document;
pub mod error;
pub mod paragraph;
pub mod parse;
pub mod protection;
pub mod serialize;
pub mod styles;
pub mod table;
pub mod validator;
pub mod writer;

pub use comment::{Comment, CommentAnchor};
pub use document::Document;
pub use error::{DocxError, Result};
pub use paragraph::{Paragraph, Run, RunFormatting};
pub use protection::{Capability, Protection, ProtectionKind};
pub use styles::{Style, StyleKind, Styles};
pub use table::{Cell, Row, Table};
pub use validator::{
    DocumentValidator, ValidationResult, ValidationRule, ValidationSeverity, has_blocking_errors,
};
pub use writer::DocumentWriter;
