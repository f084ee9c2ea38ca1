/// Style catalog for Word documents.
///
/// Holds the styles referenced by paragraphs and comment markers and
/// generates the `word/styles.xml` part. The catalog keeps declaration
/// order; duplicate ids are tolerated here and surfaced by the validator.
use crate::common::xml::escape_xml;
use crate::opc::constants::namespace;
use std::collections::HashSet;
use std::fmt::Write as FmtWrite;

/// The kind of a style declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleKind {
    Paragraph,
    Character,
    Table,
}

impl StyleKind {
    /// The `w:type` attribute value.
    pub fn as_str(&self) -> &'static str {
        match self {
            StyleKind::Paragraph => "paragraph",
            StyleKind::Character => "character",
            StyleKind::Table => "table",
        }
    }

    pub fn from_xml(s: &str) -> Option<Self> {
        match s {
            "paragraph" => Some(Self::Paragraph),
            "character" => Some(Self::Character),
            "table" => Some(Self::Table),
            _ => None,
        }
    }
}

/// A single style declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Style {
    /// Style identifier referenced from paragraph/run properties
    pub style_id: String,
    /// Display name
    pub name: String,
    pub kind: StyleKind,
}

impl Style {
    pub fn new(style_id: impl Into<String>, name: impl Into<String>, kind: StyleKind) -> Self {
        Self {
            style_id: style_id.into(),
            name: name.into(),
            kind,
        }
    }
}

/// The ordered style catalog of a document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Styles {
    styles: Vec<Style>,
}

/// Style id of the character style applied to comment reference runs.
pub const COMMENT_REFERENCE_STYLE_ID: &str = "CommentReference";

impl Styles {
    pub fn new() -> Self {
        Self { styles: Vec::new() }
    }

    /// Add a style declaration.
    pub fn add(&mut self, style: Style) {
        self.styles.push(style);
    }

    /// Register a style id unless already declared.
    pub fn ensure(&mut self, style_id: &str, kind: StyleKind) {
        if !self.contains(style_id) {
            self.styles
                .push(Style::new(style_id, style_id, kind));
        }
    }

    /// Check whether a style id is declared.
    pub fn contains(&self, style_id: &str) -> bool {
        self.styles.iter().any(|s| s.style_id == style_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Style> {
        self.styles.iter()
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }

    /// Style ids declared more than once, in first-seen order.
    pub fn duplicate_ids(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut dupes = Vec::new();
        for style in &self.styles {
            if !seen.insert(style.style_id.as_str())
                && !dupes.iter().any(|d: &String| d == &style.style_id)
            {
                dupes.push(style.style_id.clone());
            }
        }
        dupes
    }

    /// Drop later declarations of duplicated ids, keeping the first.
    pub fn dedup(&mut self) {
        let mut seen = HashSet::new();
        self.styles.retain(|style| seen.insert(style.style_id.clone()));
    }

    /// Generate the `word/styles.xml` part.
    ///
    /// Emits document defaults, the Normal base style, every declared style,
    /// and the CommentReference character style when requested.
    pub fn to_xml(&self, with_comment_reference: bool) -> String {
        let mut xml = String::with_capacity(2048);

        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        let _ = write!(xml, r#"<w:styles xmlns:w="{}">"#, namespace::WML_MAIN);

        xml.push_str("<w:docDefaults>");
        xml.push_str("<w:rPrDefault><w:rPr>");
        xml.push_str(r#"<w:rFonts w:ascii="Calibri" w:hAnsi="Calibri" w:cs="Calibri"/>"#);
        xml.push_str(r#"<w:sz w:val="22"/>"#);
        xml.push_str(r#"<w:szCs w:val="22"/>"#);
        xml.push_str("</w:rPr></w:rPrDefault>");
        xml.push_str("<w:pPrDefault/>");
        xml.push_str("</w:docDefaults>");

        xml.push_str(r#"<w:style w:type="paragraph" w:default="1" w:styleId="Normal">"#);
        xml.push_str(r#"<w:name w:val="Normal"/><w:qFormat/></w:style>"#);

        for style in &self.styles {
            if style.style_id == "Normal" {
                continue;
            }
            let _ = write!(
                xml,
                r#"<w:style w:type="{}" w:styleId="{}"><w:name w:val="{}"/>"#,
                style.kind.as_str(),
                escape_xml(&style.style_id),
                escape_xml(&style.name)
            );
            if style.kind == StyleKind::Paragraph {
                xml.push_str(r#"<w:basedOn w:val="Normal"/><w:qFormat/>"#);
            }
            xml.push_str("</w:style>");
        }

        if with_comment_reference && !self.contains(COMMENT_REFERENCE_STYLE_ID) {
            let _ = write!(
                xml,
                r#"<w:style w:type="character" w:styleId="{id}"><w:name w:val="annotation reference"/><w:rPr><w:sz w:val="16"/><w:szCs w:val="16"/></w:rPr></w:style>"#,
                id = COMMENT_REFERENCE_STYLE_ID
            );
        }

        xml.push_str("</w:styles>");
        xml
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_no_duplicates() {
        let mut styles = Styles::new();
        styles.ensure("Heading1", StyleKind::Paragraph);
        styles.ensure("Heading1", StyleKind::Paragraph);
        assert_eq!(styles.len(), 1);
    }

    #[test]
    fn test_duplicate_detection_and_dedup() {
        let mut styles = Styles::new();
        styles.add(Style::new("Quote", "Quote", StyleKind::Paragraph));
        styles.add(Style::new("Quote", "Quote 2", StyleKind::Paragraph));
        styles.add(Style::new("Code", "Code", StyleKind::Character));

        assert_eq!(styles.duplicate_ids(), vec!["Quote".to_string()]);

        styles.dedup();
        assert_eq!(styles.len(), 2);
        assert!(styles.duplicate_ids().is_empty());
    }

    #[test]
    fn test_styles_xml() {
        let mut styles = Styles::new();
        styles.ensure("Heading1", StyleKind::Paragraph);

        let xml = styles.to_xml(true);
        assert!(xml.contains(r#"w:styleId="Normal""#));
        assert!(xml.contains(r#"w:styleId="Heading1""#));
        assert!(xml.contains(r#"<w:basedOn w:val="Normal"/>"#));
        assert!(xml.contains(r#"w:styleId="CommentReference""#));

        let xml = styles.to_xml(false);
        assert!(!xml.contains("CommentReference"));
    }
}
