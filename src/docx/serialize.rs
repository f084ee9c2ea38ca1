//! Serializes the document object model into package parts.
//!
//! The whole document is regenerated from the DOM on every save; parts are
//! never patched incrementally. The serializer also computes the content-type
//! and relationship closure itself: every part it emits receives a
//! content-type declaration and, for internal parts, a relationship reachable
//! from the package root — callers are never trusted to keep those in sync.
//!
//! Body ordering: paragraphs are emitted before tables. Strict insertion-order
//! interleaving of the two sequences is not preserved; the DOM keeps them as
//! separate ordered collections, and reading a package rebuilds them the same
//! way, so the ordering is stable across round trips.

use crate::common::xml::escape_xml;
use crate::docx::document::Document;
use crate::docx::error::Result;
use crate::docx::paragraph::{Paragraph, Run};
use crate::docx::styles::COMMENT_REFERENCE_STYLE_ID;
use crate::docx::table::Table;
use crate::opc::Package;
use crate::opc::constants::{content_type as ct, namespace, partname, relationship_type};
use std::fmt::Write as FmtWrite;

/// Serialize a document into a complete OPC package.
///
/// Emits `word/document.xml`, `word/styles.xml`, `word/comments.xml` when
/// comments exist, and `word/settings.xml` when protection is enabled,
/// together with their relationship and content-type entries.
pub fn to_package(doc: &Document) -> Result<Package> {
    let mut package = Package::new();

    let document_xml = document_xml(doc)?;
    package.add_part(
        partname::DOCUMENT,
        document_xml.into_bytes(),
        ct::WML_DOCUMENT_MAIN,
    )?;
    package.relate_to(partname::DOCUMENT, relationship_type::OFFICE_DOCUMENT);

    let styles_xml = doc.styles().to_xml(!doc.comments().is_empty());
    package.add_part(partname::STYLES, styles_xml.into_bytes(), ct::WML_STYLES)?;

    let mut part_rels = Vec::new();
    part_rels.push(("styles.xml", relationship_type::STYLES));

    if !doc.comments().is_empty() {
        let comments_xml = comments_xml(doc)?;
        package.add_part(partname::COMMENTS, comments_xml.into_bytes(), ct::WML_COMMENTS)?;
        part_rels.push(("comments.xml", relationship_type::COMMENTS));
    }

    if let Some(settings_xml) = settings_xml(doc) {
        package.add_part(partname::SETTINGS, settings_xml.into_bytes(), ct::WML_SETTINGS)?;
        part_rels.push(("settings.xml", relationship_type::SETTINGS));
    }

    let document_uri = crate::opc::PackUri::new(partname::DOCUMENT)
        .map_err(crate::opc::PackageError::InvalidPartName)?;
    let doc_part = package.part_mut(&document_uri)?;
    for (target, reltype) in part_rels {
        doc_part.relate_to(target, reltype);
    }

    log::debug!(
        "serialized document into {} parts ({} paragraphs, {} tables, {} comments)",
        package.part_count(),
        doc.paragraphs().len(),
        doc.tables().len(),
        doc.comments().len()
    );
    Ok(package)
}

/// Generate the `word/document.xml` part.
pub(crate) fn document_xml(doc: &Document) -> Result<String> {
    let mut xml = String::with_capacity(4096);
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    let _ = write!(
        xml,
        r#"<w:document xmlns:w="{}" xmlns:r="{}">"#,
        namespace::WML_MAIN,
        namespace::OFC_RELATIONSHIPS
    );
    xml.push_str("<w:body>");

    for (index, para) in doc.paragraphs().iter().enumerate() {
        paragraph_xml(doc, index, para, &mut xml)?;
    }

    for table in doc.tables() {
        table_xml(table, &mut xml)?;
    }

    xml.push_str(r#"<w:sectPr><w:pgSz w:w="12240" w:h="15840"/>"#);
    xml.push_str(r#"<w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440"/>"#);
    xml.push_str("</w:sectPr>");

    xml.push_str("</w:body></w:document>");
    Ok(xml)
}

/// Emit one paragraph, weaving in the range markers and reference runs of
/// every comment anchored to it.
fn paragraph_xml(doc: &Document, index: usize, para: &Paragraph, xml: &mut String) -> Result<()> {
    xml.push_str("<w:p>");

    if let Some(style) = &para.style {
        let _ = write!(xml, r#"<w:pPr><w:pStyle w:val="{}"/></w:pPr>"#, escape_xml(style));
    }

    let anchored: Vec<_> = doc
        .comments()
        .iter()
        .filter(|c| c.anchor.paragraph == index)
        .collect();

    for (run_index, run) in para.runs.iter().enumerate() {
        for comment in anchored.iter().filter(|c| c.anchor.run_start == run_index) {
            let _ = write!(xml, r#"<w:commentRangeStart w:id="{}"/>"#, comment.id);
        }

        run_xml(run, xml)?;

        for comment in anchored.iter().filter(|c| c.anchor.run_end == run_index) {
            let _ = write!(xml, r#"<w:commentRangeEnd w:id="{}"/>"#, comment.id);
            let _ = write!(
                xml,
                r#"<w:r><w:rPr><w:rStyle w:val="{}"/></w:rPr><w:commentReference w:id="{}"/></w:r>"#,
                COMMENT_REFERENCE_STYLE_ID,
                comment.id
            );
        }
    }

    xml.push_str("</w:p>");
    Ok(())
}

/// Emit one run. The `<w:rPr>` block is present if and only if at least one
/// formatting attribute is set; an empty properties element is never emitted.
fn run_xml(run: &Run, xml: &mut String) -> Result<()> {
    xml.push_str("<w:r>");

    if run.has_formatting() {
        xml.push_str("<w:rPr>");
        let fmt = &run.formatting;

        if fmt.bold {
            xml.push_str("<w:b/>");
        }
        if fmt.italic {
            xml.push_str("<w:i/>");
        }
        if fmt.underline {
            xml.push_str(r#"<w:u w:val="single"/>"#);
        }
        if let Some(name) = &fmt.font_name {
            let _ = write!(
                xml,
                r#"<w:rFonts w:ascii="{name}" w:hAnsi="{name}"/>"#,
                name = escape_xml(name)
            );
        }
        if let Some(size) = fmt.font_size {
            let _ = write!(xml, r#"<w:sz w:val="{}"/>"#, size);
        }
        if let Some(color) = &fmt.color {
            let _ = write!(xml, r#"<w:color w:val="{}"/>"#, escape_xml(color));
        }

        xml.push_str("</w:rPr>");
    }

    if !run.text.is_empty() {
        let _ = write!(
            xml,
            r#"<w:t xml:space="preserve">{}</w:t>"#,
            escape_xml(&run.text)
        );
    }

    xml.push_str("</w:r>");
    Ok(())
}

/// Emit one table.
fn table_xml(table: &Table, xml: &mut String) -> Result<()> {
    xml.push_str("<w:tbl>");
    xml.push_str(r#"<w:tblPr><w:tblW w:w="0" w:type="auto"/></w:tblPr>"#);

    xml.push_str("<w:tblGrid>");
    for _ in 0..table.columns {
        xml.push_str("<w:gridCol/>");
    }
    xml.push_str("</w:tblGrid>");

    for row in &table.rows {
        xml.push_str("<w:tr>");
        for cell in &row.cells {
            xml.push_str("<w:tc>");
            if cell.text.is_empty() {
                xml.push_str("<w:p/>");
            } else {
                let _ = write!(
                    xml,
                    r#"<w:p><w:r><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#,
                    escape_xml(&cell.text)
                );
            }
            xml.push_str("</w:tc>");
        }
        xml.push_str("</w:tr>");
    }

    xml.push_str("</w:tbl>");
    Ok(())
}

/// Generate the `word/comments.xml` part.
///
/// Each comment body is written once, keyed by the comment's integer id; the
/// matching range markers live in `word/document.xml`.
pub(crate) fn comments_xml(doc: &Document) -> Result<String> {
    let mut xml = String::with_capacity(1024);
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    let _ = write!(xml, r#"<w:comments xmlns:w="{}">"#, namespace::WML_MAIN);

    for comment in doc.comments() {
        let _ = write!(
            xml,
            r#"<w:comment w:id="{}" w:author="{}""#,
            comment.id,
            escape_xml(&comment.author)
        );
        if let Some(date) = &comment.date {
            let _ = write!(xml, r#" w:date="{}""#, escape_xml(date));
        }
        if let Some(initials) = &comment.initials {
            let _ = write!(xml, r#" w:initials="{}""#, escape_xml(initials));
        }
        xml.push('>');

        let _ = write!(
            xml,
            r#"<w:p><w:r><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#,
            escape_xml(&comment.text)
        );

        xml.push_str("</w:comment>");
    }

    xml.push_str("</w:comments>");
    Ok(xml)
}

/// Generate the `word/settings.xml` part when protection is enabled.
///
/// The protection state is persisted as a `w:documentProtection` element
/// carrying the edit mode and the salted SHA-512 password hash
/// (`w:cryptAlgorithmSid` 14).
pub(crate) fn settings_xml(doc: &Document) -> Option<String> {
    let protection = doc.protection();
    if !protection.is_enabled() {
        return None;
    }
    let edit = protection.kind().as_edit_value()?;

    let mut xml = String::with_capacity(512);
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    let _ = write!(xml, r#"<w:settings xmlns:w="{}">"#, namespace::WML_MAIN);

    let _ = write!(xml, r#"<w:documentProtection w:edit="{}" w:enforcement="1""#, edit);
    if let Some(hash) = protection.password_hash() {
        let _ = write!(
            xml,
            r#" w:cryptProviderType="rsaFull" w:cryptAlgorithmSid="14" w:hash="{}" w:salt="{}""#,
            hash.hash_base64(),
            hash.salt_base64()
        );
    }
    xml.push_str("/>");

    xml.push_str("</w:settings>");
    Some(xml)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::paragraph::RunFormatting;
    use crate::docx::protection::ProtectionKind;

    #[test]
    fn test_plain_run_has_no_rpr() {
        let mut doc = Document::new();
        doc.add_paragraph("plain", None).unwrap();

        let xml = document_xml(&doc).unwrap();
        assert!(!xml.contains("<w:rPr>"));
        assert!(xml.contains(r#"<w:t xml:space="preserve">plain</w:t>"#));
    }

    #[test]
    fn test_formatted_run_emits_rpr() {
        let mut doc = Document::new();
        doc.add_formatted_paragraph(
            vec![Run::formatted(
                "styled",
                RunFormatting {
                    bold: true,
                    italic: true,
                    font_size: Some(24),
                    ..Default::default()
                },
            )],
            None,
        )
        .unwrap();

        let xml = document_xml(&doc).unwrap();
        assert!(xml.contains("<w:rPr><w:b/><w:i/>"));
        assert!(xml.contains(r#"<w:sz w:val="24"/>"#));
    }

    #[test]
    fn test_comment_markers_bracket_anchor() {
        let mut doc = Document::new();
        doc.add_paragraph("before anchor after", None).unwrap();
        let id = doc.add_comment("Reviewer", "note", "anchor").unwrap();

        let xml = document_xml(&doc).unwrap();
        let start = xml
            .find(&format!(r#"<w:commentRangeStart w:id="{}"/>"#, id))
            .unwrap();
        let anchor = xml.find(">anchor<").unwrap();
        let end = xml
            .find(&format!(r#"<w:commentRangeEnd w:id="{}"/>"#, id))
            .unwrap();
        let reference = xml
            .find(&format!(r#"<w:commentReference w:id="{}"/>"#, id))
            .unwrap();

        assert!(start < anchor && anchor < end && end < reference);
        assert!(xml.contains(r#"<w:rStyle w:val="CommentReference"/>"#));
    }

    #[test]
    fn test_package_closure() {
        let mut doc = Document::new();
        doc.add_paragraph("has a comment", None).unwrap();
        doc.add_comment("a", "b", "comment").unwrap();

        let package = to_package(&doc).unwrap();
        // document, styles, comments
        assert_eq!(package.part_count(), 3);
        assert!(package.main_document_part().is_ok());

        let doc_part = package
            .part(&crate::opc::PackUri::new(partname::DOCUMENT).unwrap())
            .unwrap();
        assert!(!doc_part.rels().is_empty());

        // Every internal relationship from the document part resolves
        for rel in doc_part.rels().iter() {
            let target = rel.target_partname().unwrap();
            assert!(package.contains_part(&target));
        }
    }

    #[test]
    fn test_no_comments_part_without_comments() {
        let mut doc = Document::new();
        doc.add_paragraph("no comments", None).unwrap();

        let package = to_package(&doc).unwrap();
        assert_eq!(package.part_count(), 2);
        assert!(!package.contains_part(&crate::opc::PackUri::new(partname::COMMENTS).unwrap()));
    }

    #[test]
    fn test_settings_emitted_when_protected() {
        let mut doc = Document::new();
        doc.add_paragraph("locked", None).unwrap();
        doc.protection_mut()
            .enable(ProtectionKind::ReadOnly, "pw")
            .unwrap();

        let xml = settings_xml(&doc).unwrap();
        assert!(xml.contains(r#"w:edit="readOnly""#));
        assert!(xml.contains(r#"w:enforcement="1""#));
        assert!(xml.contains("w:hash="));
        assert!(xml.contains("w:salt="));

        let package = to_package(&doc).unwrap();
        assert!(package.contains_part(&crate::opc::PackUri::new(partname::SETTINGS).unwrap()));
    }

    #[test]
    fn test_tables_after_paragraphs() {
        let mut doc = Document::new();
        doc.add_table(&[vec!["cell".to_string()]]).unwrap();
        doc.add_paragraph("para", None).unwrap();

        let xml = document_xml(&doc).unwrap();
        let p = xml.find("<w:p>").unwrap();
        let tbl = xml.find("<w:tbl>").unwrap();
        assert!(p < tbl);
    }
}
