//! Longan - A Rust library for reading, building, and writing WordprocessingML documents
//!
//! This library implements the Office Open XML (OOXML) WordprocessingML format
//! (.docx files): the ZIP-based Open Packaging Conventions container, the
//! in-memory document object model, a bidirectional serializer with round-trip
//! fidelity, a rule-based validator, a concurrent batch pipeline, and a
//! document-protection subsystem.
//!
//! # Features
//!
//! - **OPC Container**: Parts, relationships, and content types inside a ZIP package
//! - **Document Model**: Paragraphs, runs, tables, comments, styles
//! - **Serializer**: Deterministic DOM ⇄ XML-part mapping with round-trip fidelity
//! - **Validator**: Aggregating rule engine with optional auto-fix
//! - **Batch Pipeline**: Bounded-parallelism multi-document processing with
//!   progress and error streams
//! - **Protection**: Permission, watermark, encryption, and signature settings
//!   modeled as a state machine
//!
//! # Example - Building and saving a document
//!
//! ```no_run
//! use longan::docx::DocumentWriter;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut writer = DocumentWriter::new();
//! writer.create_new()?;
//! writer.add_paragraph("Hello", None)?;
//! writer.add_table(&[
//!     vec!["A".to_string(), "B".to_string()],
//!     vec!["1".to_string(), "2".to_string()],
//! ])?;
//! writer.save("hello.docx")?;
//! # Ok(())
//! # }
//! ```
//!
//! # Example - Reading a document
//!
//! ```no_run
//! use longan::docx::Document;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let doc = Document::open("document.docx")?;
//! println!("Document text: {}", doc.text());
//!
//! for para in doc.paragraphs() {
//!     println!("Paragraph: {}", para.text);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Example - Batch processing
//!
//! ```no_run
//! use longan::batch::{BatchPipeline, BatchOperation, OperationKind};
//! use longan::docx::Document;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut pipeline = BatchPipeline::with_concurrency(4);
//! pipeline.add_document(Document::open("a.docx")?);
//! pipeline.add_document(Document::open("b.docx")?);
//! pipeline.add_operation(BatchOperation::new(OperationKind::ExtractText));
//!
//! let progress = pipeline.progress_stream().unwrap();
//! let errors = pipeline.error_stream().unwrap();
//! pipeline.process_batch()?;
//!
//! for report in progress {
//!     println!("{}/{} processed", report.processed, report.total);
//! }
//! for err in errors {
//!     eprintln!("{} failed: {}", err.document_id, err.error);
//! }
//! # Ok(())
//! # }
//! ```

/// Common helpers shared across modules
pub mod common;

/// Open Packaging Conventions (OPC) container engine
///
/// This module manages named parts, inter-part relationships, and
/// content-type declarations inside a ZIP archive.
pub mod opc;

/// WordprocessingML document model, serializer, validator, and protection
pub mod docx;

/// Concurrent batch-processing pipeline
pub mod batch;

// Re-export commonly used types for convenience
pub use docx::{Document, DocumentWriter, DocxError};
pub use opc::{Package, PackageError};
