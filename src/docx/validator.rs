/// Rule-based document validator with optional auto-fix.
///
/// The validator runs a fixed set of rules over a [`Document`] and aggregates
/// every result; it never aborts on the first failing rule. With auto-fix
/// enabled, a rule that knows how to repair its violation mutates the
/// document in place and reports `fixed = true`; without it, the same
/// condition reports `fixed = false` and carries the underlying error.
/// Whether an unfixed `Error`-severity result blocks further processing is
/// the caller's decision.
use crate::docx::document::Document;

/// Severity of a validation result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ValidationSeverity {
    Info,
    Warning,
    Error,
}

/// A violation found by a rule's check function.
pub struct Violation {
    pub message: String,
    pub location: String,
}

type CheckFn = fn(&Document) -> Option<Violation>;
type FixFn = fn(&mut Document);

/// A single validation rule.
///
/// `check` inspects the document and returns a violation when the rule is
/// broken; `fix`, when present, repairs the document in place.
pub struct ValidationRule {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub severity: ValidationSeverity,
    pub check: CheckFn,
    pub fix: Option<FixFn>,
}

/// The outcome of running one rule.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub rule_id: String,
    pub severity: ValidationSeverity,
    pub message: String,
    pub location: String,
    pub fixed: bool,
    /// The violation, when the rule failed; `None` for a passing rule
    pub error: Option<String>,
}

/// Document validator holding the rule set and the auto-fix switch.
pub struct DocumentValidator {
    rules: Vec<ValidationRule>,
    auto_fix: bool,
}

impl DocumentValidator {
    /// Create a validator with the default rule set.
    pub fn new() -> Self {
        Self {
            rules: default_rules(),
            auto_fix: false,
        }
    }

    /// Create a validator with the default rule set and auto-fix enabled.
    pub fn with_auto_fix() -> Self {
        Self {
            rules: default_rules(),
            auto_fix: true,
        }
    }

    /// Enable or disable auto-fix.
    pub fn set_auto_fix(&mut self, auto_fix: bool) {
        self.auto_fix = auto_fix;
    }

    /// Add a custom rule.
    pub fn add_rule(&mut self, rule: ValidationRule) {
        self.rules.push(rule);
    }

    /// The registered rules.
    pub fn rules(&self) -> &[ValidationRule] {
        &self.rules
    }

    /// Run every rule over the document and aggregate the results.
    pub fn validate(&self, doc: &mut Document) -> Vec<ValidationResult> {
        let mut results = Vec::with_capacity(self.rules.len());

        for rule in &self.rules {
            match (rule.check)(doc) {
                Some(violation) => {
                    let mut fixed = false;
                    let mut message = violation.message.clone();

                    if self.auto_fix && let Some(fix) = rule.fix {
                        fix(doc);
                        // Fixed only if the violation no longer reproduces
                        if (rule.check)(doc).is_none() {
                            fixed = true;
                            message = format!("auto-fixed: {}", message);
                        }
                    }

                    results.push(ValidationResult {
                        rule_id: rule.id.to_string(),
                        severity: rule.severity,
                        message,
                        location: violation.location,
                        fixed,
                        error: Some(violation.message),
                    });
                }
                None => {
                    results.push(ValidationResult {
                        rule_id: rule.id.to_string(),
                        severity: ValidationSeverity::Info,
                        message: format!("{} check passed", rule.name),
                        location: "document".to_string(),
                        fixed: false,
                        error: None,
                    });
                }
            }
        }

        results
    }
}

impl Default for DocumentValidator {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether any result should block further processing: an unfixed violation
/// of `Error` severity.
pub fn has_blocking_errors(results: &[ValidationResult]) -> bool {
    results
        .iter()
        .any(|r| r.severity == ValidationSeverity::Error && r.error.is_some() && !r.fixed)
}

fn default_rules() -> Vec<ValidationRule> {
    vec![
        ValidationRule {
            id: "empty_paragraph",
            name: "empty paragraph",
            description: "paragraphs must carry text",
            severity: ValidationSeverity::Warning,
            check: check_empty_paragraphs,
            fix: Some(fix_empty_paragraphs),
        },
        ValidationRule {
            id: "whitespace",
            name: "normalized whitespace",
            description: "paragraph text must not carry stray whitespace",
            severity: ValidationSeverity::Warning,
            check: check_whitespace,
            fix: Some(fix_whitespace),
        },
        ValidationRule {
            id: "duplicate_style",
            name: "duplicate style",
            description: "style ids must be declared once",
            severity: ValidationSeverity::Warning,
            check: check_duplicate_styles,
            fix: Some(fix_duplicate_styles),
        },
        ValidationRule {
            id: "table_structure",
            name: "table structure",
            description: "every table row must match the declared column count",
            severity: ValidationSeverity::Error,
            check: check_table_structure,
            fix: Some(fix_table_structure),
        },
        ValidationRule {
            id: "text_cache",
            name: "text cache",
            description: "the document text cache must match the paragraph sequence",
            severity: ValidationSeverity::Error,
            check: check_text_cache,
            fix: Some(fix_text_cache),
        },
    ]
}

fn check_empty_paragraphs(doc: &Document) -> Option<Violation> {
    let empty = doc
        .paragraphs()
        .iter()
        .filter(|p| p.text.trim().is_empty())
        .count();
    if empty == 0 {
        return None;
    }
    Some(Violation {
        message: format!("{} empty paragraph(s)", empty),
        location: "paragraphs".to_string(),
    })
}

fn fix_empty_paragraphs(doc: &mut Document) {
    doc.remove_empty_paragraphs();
}

fn check_whitespace(doc: &Document) -> Option<Violation> {
    for (i, para) in doc.paragraphs().iter().enumerate() {
        if para.text.trim().is_empty() {
            // Empty paragraphs belong to the empty_paragraph rule
            continue;
        }
        let stray = para.text != para.text.trim()
            || para.text.contains("  ")
            || para.text.chars().any(|c| c.is_whitespace() && c != ' ');
        if stray {
            return Some(Violation {
                message: format!("paragraph {} has unnormalized whitespace", i),
                location: format!("paragraphs[{}]", i),
            });
        }
    }
    None
}

fn fix_whitespace(doc: &mut Document) {
    for para in &mut doc.paragraphs {
        if !para.text.trim().is_empty() {
            para.normalize_whitespace();
        }
    }
    doc.recompute_text();
}

fn check_duplicate_styles(doc: &Document) -> Option<Violation> {
    let dupes = doc.styles().duplicate_ids();
    if dupes.is_empty() {
        return None;
    }
    Some(Violation {
        message: format!("duplicate style id(s): {}", dupes.join(", ")),
        location: "styles".to_string(),
    })
}

fn fix_duplicate_styles(doc: &mut Document) {
    doc.styles_mut().dedup();
}

fn check_table_structure(doc: &Document) -> Option<Violation> {
    for (i, table) in doc.tables().iter().enumerate() {
        if !table.is_rectangular() {
            return Some(Violation {
                message: format!("table {} is not rectangular", i),
                location: format!("tables[{}]", i),
            });
        }
    }
    None
}

fn fix_table_structure(doc: &mut Document) {
    for table in &mut doc.tables {
        let columns = table.columns;
        for row in &mut table.rows {
            row.cells.resize_with(columns, Default::default);
        }
    }
}

fn check_text_cache(doc: &Document) -> Option<Violation> {
    let expected: String = doc
        .paragraphs()
        .iter()
        .map(|p| p.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    if doc.text() == expected {
        return None;
    }
    Some(Violation {
        message: "text cache out of sync with paragraphs".to_string(),
        location: "text".to_string(),
    })
}

fn fix_text_cache(doc: &mut Document) {
    doc.recompute_text();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::table::{Cell, Row};

    #[test]
    fn test_all_rules_run_and_aggregate() {
        let mut doc = Document::new();
        doc.add_paragraph("fine", None).unwrap();

        let validator = DocumentValidator::new();
        let results = validator.validate(&mut doc);

        assert_eq!(results.len(), validator.rules().len());
        assert!(results.iter().all(|r| r.error.is_none()));
        assert!(!has_blocking_errors(&results));
    }

    #[test]
    fn test_violation_without_auto_fix() {
        let mut doc = Document::new();
        doc.add_paragraph("", None).unwrap();

        let validator = DocumentValidator::new();
        let results = validator.validate(&mut doc);

        let empty = results.iter().find(|r| r.rule_id == "empty_paragraph").unwrap();
        assert!(!empty.fixed);
        assert!(empty.error.is_some());
        // Document untouched
        assert_eq!(doc.paragraphs().len(), 1);
    }

    #[test]
    fn test_auto_fix_removes_empty_paragraphs() {
        let mut doc = Document::new();
        doc.add_paragraph("keep", None).unwrap();
        doc.add_paragraph("", None).unwrap();

        let validator = DocumentValidator::with_auto_fix();
        let results = validator.validate(&mut doc);

        let empty = results.iter().find(|r| r.rule_id == "empty_paragraph").unwrap();
        assert!(empty.fixed);
        assert_eq!(doc.paragraphs().len(), 1);
        assert_eq!(doc.text(), "keep");
    }

    #[test]
    fn test_whitespace_rule() {
        let mut doc = Document::new();
        doc.add_paragraph("  spaced   out  ", None).unwrap();

        let validator = DocumentValidator::with_auto_fix();
        let results = validator.validate(&mut doc);

        let ws = results.iter().find(|r| r.rule_id == "whitespace").unwrap();
        assert!(ws.fixed);
        assert_eq!(doc.paragraphs()[0].text, "spaced out");
    }

    #[test]
    fn test_table_structure_blocks_without_fix() {
        let mut doc = Document::new();
        doc.add_table(&[vec!["a".to_string(), "b".to_string()]]).unwrap();
        // Bypass the building API to break rectangularity
        doc.tables[0].rows.push(Row::new(vec![Cell::new("only")]));

        let validator = DocumentValidator::new();
        let results = validator.validate(&mut doc);
        assert!(has_blocking_errors(&results));

        let fixer = DocumentValidator::with_auto_fix();
        let results = fixer.validate(&mut doc);
        let table = results.iter().find(|r| r.rule_id == "table_structure").unwrap();
        assert!(table.fixed);
        assert!(doc.tables()[0].is_rectangular());
        assert!(!has_blocking_errors(&results));
    }

    #[test]
    fn test_duplicate_style_rule() {
        use crate::docx::styles::{Style, StyleKind};

        let mut doc = Document::new();
        doc.styles_mut().add(Style::new("Quote", "Quote", StyleKind::Paragraph));
        doc.styles_mut().add(Style::new("Quote", "Quote 2", StyleKind::Paragraph));

        let validator = DocumentValidator::with_auto_fix();
        let results = validator.validate(&mut doc);

        let dup = results.iter().find(|r| r.rule_id == "duplicate_style").unwrap();
        assert!(dup.fixed);
        assert!(doc.styles().duplicate_ids().is_empty());
    }
}
