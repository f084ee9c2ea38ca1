//! Comment support for Word documents.
//!
//! A comment's body lives in the separate `word/comments.xml` part, keyed by
//! an integer id; the anchored text range lives in the document body, marked
//! by `commentRangeStart`/`commentRangeEnd` elements and a `commentReference`
//! run.

/// The text range a comment is attached to.
///
/// Anchors address runs: when a comment is added, the target paragraph's runs
/// are split so the anchored text aligns with run boundaries, and the anchor
/// records the inclusive run range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommentAnchor {
    /// Index of the paragraph holding the anchored range
    pub paragraph: usize,
    /// Index of the first anchored run
    pub run_start: usize,
    /// Index of the last anchored run (inclusive)
    pub run_end: usize,
}

/// A comment in a Word document.
///
/// Comments carry author information, a creation date, body text, and an
/// anchor into a paragraph's run sequence. Ids are unique and assigned
/// monotonically by the owning document.
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    /// The comment id, unique within the document
    pub id: u32,
    /// Author name
    pub author: String,
    /// Author initials, derived from the author name when absent
    pub initials: Option<String>,
    /// Creation date (RFC 3339)
    pub date: Option<String>,
    /// The comment body text
    pub text: String,
    /// The anchored text range
    pub anchor: CommentAnchor,
}

impl Comment {
    pub fn new(id: u32, author: String, text: String, anchor: CommentAnchor) -> Self {
        let initials = derive_initials(&author);
        Self {
            id,
            author,
            initials,
            date: Some(chrono::Utc::now().to_rfc3339()),
            text,
            anchor,
        }
    }
}

/// Derive initials from an author name ("Jane Q. Smith" -> "JQS").
fn derive_initials(author: &str) -> Option<String> {
    let initials: String = author
        .split_whitespace()
        .filter_map(|word| word.chars().next())
        .filter(|c| c.is_alphanumeric())
        .collect();

    if initials.is_empty() {
        None
    } else {
        Some(initials)
    }
}
