/// High-level document writer for creating and modifying Word documents.
///
/// A [`DocumentWriter`] wraps a [`Document`] that may not exist yet: every
/// mutator called before [`DocumentWriter::create_new`] or
/// [`DocumentWriter::open_for_modification`] fails with
/// [`DocxError::NotInitialized`].
use crate::docx::document::Document;
use crate::docx::error::{DocxError, Result};
use crate::docx::paragraph::{Run, RunFormatting};
use std::path::Path;

/// Writer for building and modifying Word documents.
///
/// # Examples
///
/// ```no_run
/// use longan::docx::DocumentWriter;
///
/// let mut writer = DocumentWriter::new();
/// writer.create_new()?;
/// writer.add_paragraph("Hello, World!", None)?;
/// writer.save("hello.docx")?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Default)]
pub struct DocumentWriter {
    document: Option<Document>,
}

impl DocumentWriter {
    /// Create a writer with no document attached.
    pub fn new() -> Self {
        Self { document: None }
    }

    /// Create a new empty document to write into.
    pub fn create_new(&mut self) -> Result<()> {
        self.document = Some(Document::new());
        Ok(())
    }

    /// Open an existing document for modification.
    ///
    /// The document is reconstructed in full from the package parts.
    pub fn open_for_modification<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.document = Some(Document::open(path)?);
        Ok(())
    }

    /// Get the attached document.
    pub fn document(&self) -> Result<&Document> {
        self.document.as_ref().ok_or(DocxError::NotInitialized)
    }

    /// Get mutable access to the attached document.
    pub fn document_mut(&mut self) -> Result<&mut Document> {
        self.document.as_mut().ok_or(DocxError::NotInitialized)
    }

    /// Detach and return the document.
    pub fn into_document(self) -> Result<Document> {
        self.document.ok_or(DocxError::NotInitialized)
    }

    /// Add a paragraph of plain text.
    pub fn add_paragraph(&mut self, text: &str, style: Option<&str>) -> Result<()> {
        self.document_mut()?.add_paragraph(text, style)
    }

    /// Add a paragraph built from formatted runs.
    pub fn add_formatted_paragraph(&mut self, runs: Vec<Run>, style: Option<&str>) -> Result<()> {
        self.document_mut()?.add_formatted_paragraph(runs, style)
    }

    /// Add a table from rows of cell text.
    pub fn add_table(&mut self, rows: &[Vec<String>]) -> Result<()> {
        self.document_mut()?.add_table(rows)
    }

    /// Replace every literal occurrence of `old` with `new`.
    pub fn replace_text(&mut self, old: &str, new: &str) -> Result<usize> {
        self.document_mut()?.replace_text(old, new)
    }

    /// Set the style of the paragraph at `index`.
    pub fn set_paragraph_style(&mut self, index: usize, style: &str) -> Result<()> {
        self.document_mut()?.set_paragraph_style(index, style)
    }

    /// Set the formatting of a run.
    pub fn set_run_formatting(
        &mut self,
        paragraph_index: usize,
        run_index: usize,
        formatting: RunFormatting,
    ) -> Result<()> {
        self.document_mut()?
            .set_run_formatting(paragraph_index, run_index, formatting)
    }

    /// Add a comment anchored to the first occurrence of `anchor_text`.
    pub fn add_comment(&mut self, author: &str, body: &str, anchor_text: &str) -> Result<u32> {
        self.document_mut()?.add_comment(author, body, anchor_text)
    }

    /// Serialize the document and save it as a .docx package.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.document()?.save(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mutators_require_initialization() {
        let mut writer = DocumentWriter::new();

        assert!(matches!(
            writer.add_paragraph("text", None),
            Err(DocxError::NotInitialized)
        ));
        assert!(matches!(
            writer.add_table(&[vec!["a".to_string()]]),
            Err(DocxError::NotInitialized)
        ));
        assert!(matches!(
            writer.replace_text("a", "b"),
            Err(DocxError::NotInitialized)
        ));
        assert!(matches!(writer.save("out.docx"), Err(DocxError::NotInitialized)));
    }

    #[test]
    fn test_create_then_mutate() {
        let mut writer = DocumentWriter::new();
        writer.create_new().unwrap();
        writer.add_paragraph("Hello", None).unwrap();
        writer.replace_text("Hello", "Goodbye").unwrap();

        assert_eq!(writer.document().unwrap().text(), "Goodbye");
    }

    #[test]
    fn test_save_and_reopen_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scenario.docx");

        let mut writer = DocumentWriter::new();
        writer.create_new().unwrap();
        writer.add_paragraph("Hello", None).unwrap();
        writer
            .add_table(&[
                vec!["A".to_string(), "B".to_string()],
                vec!["1".to_string(), "2".to_string()],
            ])
            .unwrap();
        writer.save(&path).unwrap();

        let doc = crate::docx::Document::open(&path).unwrap();
        assert_eq!(doc.paragraphs().len(), 1);
        assert_eq!(doc.paragraphs()[0].text, "Hello");
        assert_eq!(doc.tables().len(), 1);
        assert_eq!(doc.tables()[0].row_count(), 2);
        assert_eq!(doc.tables()[0].columns, 2);
        assert_eq!(doc.tables()[0].cell(1, 1).unwrap().text, "2");
    }

    #[test]
    fn test_open_modify_save_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("modify.docx");
        let path2 = dir.path().join("modified.docx");

        let mut writer = DocumentWriter::new();
        writer.create_new().unwrap();
        writer.add_paragraph("draft version", None).unwrap();
        writer.save(&path).unwrap();

        let mut editor = DocumentWriter::new();
        editor.open_for_modification(&path).unwrap();
        editor.replace_text("draft", "final").unwrap();
        editor.set_paragraph_style(0, "Heading1").unwrap();
        editor.save(&path2).unwrap();

        let doc = crate::docx::Document::open(&path2).unwrap();
        assert_eq!(doc.text(), "final version");
        assert_eq!(doc.paragraphs()[0].style.as_deref(), Some("Heading1"));
    }

    #[test]
    fn test_comment_survives_disk_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("commented.docx");

        let mut writer = DocumentWriter::new();
        writer.create_new().unwrap();
        writer.add_paragraph("Please review this sentence.", None).unwrap();
        writer
            .add_comment("Alice", "Needs a citation", "this sentence")
            .unwrap();
        writer.save(&path).unwrap();

        let doc = crate::docx::Document::open(&path).unwrap();
        let comment = &doc.comments()[0];
        assert_eq!(comment.author, "Alice");
        assert_eq!(comment.text, "Needs a citation");
        assert_eq!(
            doc.comment_anchor_text(comment).as_deref(),
            Some("this sentence")
        );
    }
}
