//! Reconstructs the document object model from package parts.
//!
//! This is the inverse of [`serialize`](crate::docx::serialize): it walks
//! `word/document.xml` with a streaming reader, resolves comment bodies from
//! `word/comments.xml` via the `commentRangeStart`/`commentRangeEnd`/
//! `commentReference` markers, and reads the style catalog and protection
//! settings when those parts are present. The document is rebuilt in full;
//! there is no partial or lazy loading.

use crate::common::xml::unescape_xml;
use crate::docx::comment::{Comment, CommentAnchor};
use crate::docx::document::Document;
use crate::docx::error::{DocxError, Result};
use crate::docx::paragraph::{Paragraph, Run, RunFormatting};
use crate::docx::protection::{PasswordHash, ProtectionKind};
use crate::docx::styles::{Style, StyleKind};
use crate::docx::table::{Cell, Row, Table};
use crate::opc::constants::{content_type as ct, relationship_type};
use crate::opc::error::PackageError;
use crate::opc::{Package, Part};
use memchr::memmem;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::collections::HashMap;

/// Reconstruct a [`Document`] from an OPC package.
pub fn from_package(package: &Package) -> Result<Document> {
    let doc_part = package.main_document_part()?;

    if doc_part.content_type() != ct::WML_DOCUMENT_MAIN {
        return Err(DocxError::InvalidFormat(format!(
            "main document part has content type {}, expected {}",
            doc_part.content_type(),
            ct::WML_DOCUMENT_MAIN
        )));
    }

    let mut doc = Document::new();
    let anchors = parse_document_xml(doc_part.blob(), &mut doc)?;

    if !anchors.is_empty() {
        let comments_part = related_part(package, doc_part, relationship_type::COMMENTS)?
            .ok_or_else(|| {
                DocxError::UnresolvedReference(
                    "document contains comment markers but no comments part".to_string(),
                )
            })?;
        resolve_comments(comments_part.blob(), &anchors, &mut doc)?;
    }

    if let Some(styles_part) = related_part(package, doc_part, relationship_type::STYLES)? {
        parse_styles_xml(styles_part.blob(), &mut doc)?;
    }

    if let Some(settings_part) = related_part(package, doc_part, relationship_type::SETTINGS)? {
        parse_settings_xml(settings_part.blob(), &mut doc)?;
    }

    doc.recompute_text();
    log::debug!(
        "parsed document: {} paragraphs, {} tables, {} comments",
        doc.paragraphs().len(),
        doc.tables().len(),
        doc.comments().len()
    );
    Ok(doc)
}

/// Resolve an optional part related to `source` by relationship type.
fn related_part<'a>(
    package: &'a Package,
    source: &Part,
    reltype: &str,
) -> Result<Option<&'a Part>> {
    match source.rels().part_with_reltype(reltype) {
        Ok(rel) => {
            let partname = rel.target_partname()?;
            Ok(Some(package.part(&partname)?))
        }
        Err(PackageError::RelationshipNotFound(_)) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Comment metadata parsed from `word/comments.xml`.
struct CommentMeta {
    author: String,
    initials: Option<String>,
    date: Option<String>,
    text: String,
}

/// A run being accumulated from a `<w:r>` element.
#[derive(Default)]
struct RunBuilder {
    text: String,
    formatting: RunFormatting,
    is_comment_reference: bool,
}

/// A table being accumulated from a `<w:tbl>` element.
#[derive(Default)]
struct TableBuilder {
    rows: Vec<Row>,
    current_row: Vec<Cell>,
    /// Paragraph texts of the cell being built
    cell_paragraphs: Vec<String>,
    /// Text of the cell paragraph being built
    cell_text: String,
}

/// Walk `word/document.xml`, filling the document's paragraph and table
/// sequences. Returns the comment anchors found in the body, keyed by id.
fn parse_document_xml(xml: &[u8], doc: &mut Document) -> Result<Vec<(u32, CommentAnchor)>> {
    let mut reader = Reader::from_reader(xml);

    let mut anchors: Vec<(u32, CommentAnchor)> = Vec::new();
    let mut pending_starts: HashMap<u32, (usize, usize)> = HashMap::new();

    let mut table_depth = 0usize;
    let mut table: Option<TableBuilder> = None;
    let mut para_style: Option<String> = None;
    let mut para_runs: Option<Vec<Run>> = None;
    let mut run: Option<RunBuilder> = None;
    let mut in_rpr = false;
    let mut in_text = false;

    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            // A self-closing paragraph carries no runs
            Ok(Event::Empty(ref e)) if e.local_name().as_ref() == b"p" => {
                if table_depth > 0 {
                    if let Some(t) = table.as_mut() {
                        t.cell_paragraphs.push(String::new());
                    }
                } else {
                    doc.paragraphs.push(Paragraph::from_runs(Vec::new(), None));
                }
            }
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                match e.local_name().as_ref() {
                    b"tbl" => {
                        table_depth += 1;
                        if table_depth == 1 {
                            table = Some(TableBuilder::default());
                        }
                    }
                    b"tr" if table_depth == 1 => {
                        if let Some(t) = table.as_mut() {
                            t.current_row = Vec::new();
                        }
                    }
                    b"tc" if table_depth == 1 => {
                        if let Some(t) = table.as_mut() {
                            t.cell_paragraphs = Vec::new();
                        }
                    }
                    b"p" => {
                        if table_depth > 0 {
                            if let Some(t) = table.as_mut() {
                                t.cell_text = String::new();
                            }
                        } else {
                            para_style = None;
                            para_runs = Some(Vec::new());
                        }
                    }
                    b"pStyle" if table_depth == 0 && para_runs.is_some() => {
                        if let Some(val) = attr_value(e, b"val")? {
                            para_style = Some(val);
                        }
                    }
                    b"r" => {
                        run = Some(RunBuilder::default());
                    }
                    b"rPr" => {
                        in_rpr = true;
                    }
                    b"b" if in_rpr => {
                        if let Some(r) = run.as_mut() {
                            r.formatting.bold = bool_attr(e)?;
                        }
                    }
                    b"i" if in_rpr => {
                        if let Some(r) = run.as_mut() {
                            r.formatting.italic = bool_attr(e)?;
                        }
                    }
                    b"u" if in_rpr => {
                        if let Some(r) = run.as_mut() {
                            let val = attr_value(e, b"val")?;
                            r.formatting.underline = val.as_deref() != Some("none");
                        }
                    }
                    b"sz" if in_rpr => {
                        if let Some(r) = run.as_mut()
                            && let Some(val) = attr_value(e, b"val")?
                        {
                            r.formatting.font_size =
                                atoi_simd::parse::<u32, false, false>(val.as_bytes()).ok();
                        }
                    }
                    b"rFonts" if in_rpr => {
                        if let Some(r) = run.as_mut()
                            && let Some(val) = attr_value(e, b"ascii")?
                        {
                            r.formatting.font_name = Some(val);
                        }
                    }
                    b"color" if in_rpr => {
                        if let Some(r) = run.as_mut() {
                            r.formatting.color = attr_value(e, b"val")?;
                        }
                    }
                    b"t" => {
                        in_text = true;
                    }
                    b"commentRangeStart" if table_depth == 0 => {
                        if let (Some(id), Some(runs)) = (comment_id(e)?, para_runs.as_ref()) {
                            pending_starts.insert(id, (doc.paragraphs.len(), runs.len()));
                        }
                    }
                    b"commentRangeEnd" if table_depth == 0 => {
                        if let (Some(id), Some(runs)) = (comment_id(e)?, para_runs.as_ref()) {
                            if let Some((paragraph, run_start)) = pending_starts.remove(&id) {
                                let run_end = runs.len().saturating_sub(1);
                                anchors.push((
                                    id,
                                    CommentAnchor {
                                        paragraph,
                                        run_start,
                                        run_end,
                                    },
                                ));
                            }
                        }
                    }
                    b"commentReference" => {
                        if let Some(r) = run.as_mut() {
                            r.is_comment_reference = true;
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Text(ref e)) if in_text => {
                let raw = std::str::from_utf8(e.as_ref())
                    .map_err(|err| DocxError::Xml(err.to_string()))?;
                if let Some(r) = run.as_mut() {
                    r.text.push_str(&unescape_xml(raw));
                }
            }
            Ok(Event::GeneralRef(ref e)) if in_text => {
                if let Some(r) = run.as_mut() {
                    r.text.push_str(&resolve_entity(e.as_ref())?);
                }
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"tbl" => {
                    table_depth = table_depth.saturating_sub(1);
                    if table_depth == 0
                        && let Some(t) = table.take()
                    {
                        let columns = t.rows.first().map(|r| r.cells.len()).unwrap_or(0);
                        doc.tables.push(Table {
                            rows: t.rows,
                            columns,
                        });
                    }
                }
                b"tr" if table_depth == 1 => {
                    if let Some(t) = table.as_mut() {
                        let cells = std::mem::take(&mut t.current_row);
                        t.rows.push(Row::new(cells));
                    }
                }
                b"tc" if table_depth == 1 => {
                    if let Some(t) = table.as_mut() {
                        let text = t.cell_paragraphs.join("\n");
                        t.current_row.push(Cell::new(text));
                        t.cell_paragraphs.clear();
                    }
                }
                b"p" => {
                    if table_depth > 0 {
                        if let Some(t) = table.as_mut() {
                            let text = std::mem::take(&mut t.cell_text);
                            t.cell_paragraphs.push(text);
                        }
                    } else if let Some(runs) = para_runs.take() {
                        doc.paragraphs
                            .push(Paragraph::from_runs(runs, para_style.take()));
                    }
                }
                b"r" => {
                    if let Some(r) = run.take() {
                        if table_depth > 0 {
                            if let Some(t) = table.as_mut() {
                                t.cell_text.push_str(&r.text);
                            }
                        } else if !r.is_comment_reference
                            && let Some(runs) = para_runs.as_mut()
                        {
                            runs.push(Run {
                                text: r.text,
                                formatting: r.formatting,
                            });
                        }
                    }
                }
                b"rPr" => {
                    in_rpr = false;
                }
                b"t" => {
                    in_text = false;
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(DocxError::Xml(format!("document parse error: {}", e))),
            _ => {}
        }
        buf.clear();
    }

    anchors.sort_by_key(|(id, _)| *id);
    Ok(anchors)
}

/// Parse `word/comments.xml` and attach the bodies to the parsed anchors.
///
/// A marker id with no matching `<w:comment>` entry is a dangling reference
/// and fails with [`DocxError::UnresolvedReference`].
fn resolve_comments(
    xml: &[u8],
    anchors: &[(u32, CommentAnchor)],
    doc: &mut Document,
) -> Result<()> {
    // Cheap pre-scan: an empty comments part cannot resolve anything
    if memmem::find(xml, b"<w:comment ").is_none() {
        return Err(DocxError::UnresolvedReference(
            "comments part contains no comment entries".to_string(),
        ));
    }

    let mut reader = Reader::from_reader(xml);
    let mut metas: HashMap<u32, CommentMeta> = HashMap::new();

    let mut current: Option<(u32, CommentMeta)> = None;
    let mut in_text = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => match e.local_name().as_ref() {
                b"comment" => {
                    let id = comment_id(e)?.ok_or_else(|| {
                        DocxError::Xml("comment entry without id".to_string())
                    })?;
                    let meta = CommentMeta {
                        author: attr_value(e, b"author")?.unwrap_or_default(),
                        initials: attr_value(e, b"initials")?,
                        date: attr_value(e, b"date")?,
                        text: String::new(),
                    };
                    current = Some((id, meta));
                }
                b"t" => {
                    in_text = true;
                }
                _ => {}
            },
            Ok(Event::Text(ref e)) if in_text => {
                if let Some((_, meta)) = current.as_mut() {
                    let raw = std::str::from_utf8(e.as_ref())
                        .map_err(|err| DocxError::Xml(err.to_string()))?;
                    meta.text.push_str(&unescape_xml(raw));
                }
            }
            Ok(Event::GeneralRef(ref e)) if in_text => {
                if let Some((_, meta)) = current.as_mut() {
                    meta.text.push_str(&resolve_entity(e.as_ref())?);
                }
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"comment" => {
                    if let Some((id, meta)) = current.take() {
                        metas.insert(id, meta);
                    }
                }
                b"t" => {
                    in_text = false;
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(DocxError::Xml(format!("comments parse error: {}", e))),
            _ => {}
        }
        buf.clear();
    }

    let mut max_id = 0;
    for (id, anchor) in anchors {
        let meta = metas.remove(id).ok_or_else(|| {
            DocxError::UnresolvedReference(format!("comment id {} has no body entry", id))
        })?;
        doc.comments.push(Comment {
            id: *id,
            author: meta.author,
            initials: meta.initials,
            date: meta.date,
            text: meta.text,
            anchor: *anchor,
        });
        max_id = max_id.max(*id);
    }
    doc.next_comment_id = max_id + 1;

    Ok(())
}

/// Parse the style catalog from `word/styles.xml`.
///
/// The implicit Normal default is not registered; everything else, including
/// custom styles and the comment reference character style, is kept.
fn parse_styles_xml(xml: &[u8], doc: &mut Document) -> Result<()> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();

    let mut current: Option<(String, StyleKind)> = None;
    let mut name: Option<String> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => match e.local_name().as_ref() {
                b"style" => {
                    let style_id = attr_value(e, b"styleId")?;
                    let kind = attr_value(e, b"type")?
                        .as_deref()
                        .and_then(StyleKind::from_xml)
                        .unwrap_or(StyleKind::Paragraph);
                    if let Some(id) = style_id
                        && id != "Normal"
                    {
                        current = Some((id, kind));
                        name = None;
                    }
                }
                b"name" => {
                    if current.is_some() {
                        name = attr_value(e, b"val")?;
                    }
                }
                _ => {}
            },
            Ok(Event::End(ref e)) => {
                if e.local_name().as_ref() == b"style"
                    && let Some((style_id, kind)) = current.take()
                {
                    let display = name.take().unwrap_or_else(|| style_id.clone());
                    doc.styles.add(Style::new(style_id, display, kind));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(DocxError::Xml(format!("styles parse error: {}", e))),
            _ => {}
        }
        buf.clear();
    }

    Ok(())
}

/// Parse protection state from `word/settings.xml`.
fn parse_settings_xml(xml: &[u8], doc: &mut Document) -> Result<()> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                if e.local_name().as_ref() == b"documentProtection" {
                    let edit = attr_value(e, b"edit")?;
                    let enforcement = attr_value(e, b"enforcement")?;
                    let hash = attr_value(e, b"hash")?;
                    let salt = attr_value(e, b"salt")?;

                    // An unenforced protection element carries no restrictions
                    let enforced = !matches!(enforcement.as_deref(), Some("0") | Some("false"));
                    let kind = edit
                        .as_deref()
                        .and_then(ProtectionKind::from_edit_value)
                        .unwrap_or(ProtectionKind::None);

                    if enforced && kind != ProtectionKind::None {
                        let password = match (hash, salt) {
                            (Some(h), Some(s)) => Some(PasswordHash::from_base64(&s, &h)?),
                            _ => None,
                        };
                        doc.protection.restore(kind, password);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(DocxError::Xml(format!("settings parse error: {}", e))),
            _ => {}
        }
        buf.clear();
    }

    Ok(())
}

/// Read an attribute by local name, unescaped.
fn attr_value(e: &BytesStart<'_>, local: &[u8]) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.local_name().as_ref() == local {
            return Ok(Some(attr.unescape_value()?.to_string()));
        }
    }
    Ok(None)
}

/// Read a `w:id` attribute as an integer comment id.
fn comment_id(e: &BytesStart<'_>) -> Result<Option<u32>> {
    Ok(attr_value(e, b"id")?
        .and_then(|v| atoi_simd::parse::<u32, false, false>(v.as_bytes()).ok()))
}

/// Resolve a general entity reference (`amp`, `#65`, `#x41`) to text.
///
/// Unknown named entities are preserved verbatim in `&name;` form.
fn resolve_entity(name: &[u8]) -> Result<String> {
    let name = std::str::from_utf8(name).map_err(|err| DocxError::Xml(err.to_string()))?;
    let resolved = match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = name.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                None
            }
        }
    };
    Ok(resolved
        .map(String::from)
        .unwrap_or_else(|| format!("&{};", name)))
}

/// Read a toggle attribute (`w:b`, `w:i`): absent value means on.
fn bool_attr(e: &BytesStart<'_>) -> Result<bool> {
    Ok(!matches!(
        attr_value(e, b"val")?.as_deref(),
        Some("0") | Some("false") | Some("none")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::serialize;

    fn round_trip(doc: &Document) -> Document {
        let package = serialize::to_package(doc).unwrap();
        let bytes = package.to_bytes().unwrap();
        let reopened = Package::from_bytes(bytes).unwrap();
        from_package(&reopened).unwrap()
    }

    #[test]
    fn test_round_trip_text_and_structure() {
        let mut doc = Document::new();
        doc.add_paragraph("Hello", None).unwrap();
        doc.add_paragraph("Second & last", Some("Heading1")).unwrap();
        doc.add_table(&[
            vec!["A".to_string(), "B".to_string()],
            vec!["1".to_string(), "2".to_string()],
        ])
        .unwrap();

        let restored = round_trip(&doc);

        assert_eq!(restored.text(), doc.text());
        assert_eq!(restored.paragraphs(), doc.paragraphs());
        assert_eq!(restored.tables(), doc.tables());
        assert_eq!(restored.paragraphs()[1].style.as_deref(), Some("Heading1"));
    }

    #[test]
    fn test_round_trip_formatted_runs() {
        let mut doc = Document::new();
        doc.add_formatted_paragraph(
            vec![
                Run::text("plain "),
                Run::formatted(
                    "fancy",
                    RunFormatting {
                        bold: true,
                        underline: true,
                        font_name: Some("Arial".to_string()),
                        font_size: Some(28),
                        color: Some("FF0000".to_string()),
                        ..Default::default()
                    },
                ),
            ],
            None,
        )
        .unwrap();

        let restored = round_trip(&doc);
        assert_eq!(restored.paragraphs()[0].runs, doc.paragraphs()[0].runs);
    }

    #[test]
    fn test_round_trip_comment_anchor_fidelity() {
        let mut doc = Document::new();
        doc.add_paragraph("The quick brown fox", None).unwrap();
        doc.add_comment("Reviewer", "nice phrase", "quick brown").unwrap();

        let restored = round_trip(&doc);

        assert_eq!(restored.comments().len(), 1);
        let comment = &restored.comments()[0];
        assert_eq!(comment.author, "Reviewer");
        assert_eq!(comment.text, "nice phrase");
        assert_eq!(
            restored.comment_anchor_text(comment).as_deref(),
            Some("quick brown")
        );
        // The reference marker run is not part of the paragraph content
        assert_eq!(restored.paragraphs()[0].text, "The quick brown fox");
    }

    #[test]
    fn test_round_trip_protection_settings() {
        let mut doc = Document::new();
        doc.add_paragraph("locked", None).unwrap();
        doc.protection_mut()
            .enable(ProtectionKind::ReadOnly, "pw")
            .unwrap();

        let restored = round_trip(&doc);
        assert!(restored.protection().is_enabled());
        assert_eq!(restored.protection().kind(), ProtectionKind::ReadOnly);
        // The stored hash still verifies the original password
        assert!(matches!(
            restored.protection().clone().disable("wrong"),
            Err(DocxError::WrongPassword)
        ));
        let mut protection = restored.protection().clone();
        protection.disable("pw").unwrap();
    }

    #[test]
    fn test_round_trip_preserves_whitespace() {
        let mut doc = Document::new();
        doc.add_formatted_paragraph(
            vec![Run::text("lead "), Run::text(" trail")],
            None,
        )
        .unwrap();

        let restored = round_trip(&doc);
        assert_eq!(restored.paragraphs()[0].runs[0].text, "lead ");
        assert_eq!(restored.paragraphs()[0].runs[1].text, " trail");
    }

    #[test]
    fn test_multiple_comments_round_trip() {
        let mut doc = Document::new();
        doc.add_paragraph("alpha beta gamma delta", None).unwrap();
        doc.add_comment("A", "first", "beta").unwrap();
        doc.add_comment("B", "second", "delta").unwrap();

        let restored = round_trip(&doc);
        assert_eq!(restored.comments().len(), 2);
        assert_eq!(
            restored.comment_anchor_text(&restored.comments()[0]).as_deref(),
            Some("beta")
        );
        assert_eq!(
            restored.comment_anchor_text(&restored.comments()[1]).as_deref(),
            Some("delta")
        );
        // A further comment gets a fresh id
        let mut restored = restored;
        let id = restored.add_comment("C", "third", "alpha").unwrap();
        assert_eq!(id, 3);
    }
}
