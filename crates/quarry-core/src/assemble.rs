//! Context assembly: merge retrieved chunks into grounding text plus
//! a citation list.
//!
//! The assembled text is the concatenation of result contents in
//! retrieval order, joined by a blank line, used verbatim as grounding
//! for the answer model. Citations preserve the same order and carry a
//! bounded preview; no deduplication happens across chunks of the same
//! document — repeated sources stay as distinct entries.

use crate::models::{AssembledContext, Citation, SearchResult};

/// Separator between chunk contents in the assembled context.
pub const CONTEXT_SEPARATOR: &str = "\n\n";
/// Maximum preview length in characters, before the truncation marker.
pub const PREVIEW_CHARS: usize = 100;
/// Appended to a preview when the content was truncated.
pub const TRUNCATION_MARKER: &str = "...";

/// Merge retrieval results into a bounded context and citation list.
///
/// An empty result list produces empty context text and no citations,
/// never an error.
pub fn assemble(results: &[SearchResult]) -> AssembledContext {
    let context_text = results
        .iter()
        .map(|r| r.content.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR);

    let citations = results
        .iter()
        .map(|r| Citation {
            id: r.id.clone(),
            preview: citation_preview(&r.content),
        })
        .collect();

    AssembledContext {
        context_text,
        citations,
    }
}

/// The first [`PREVIEW_CHARS`] characters of `content`, with the
/// truncation marker appended when content was longer; shorter content
/// is returned untouched.
pub fn citation_preview(content: &str) -> String {
    if content.chars().count() > PREVIEW_CHARS {
        let head: String = content.chars().take(PREVIEW_CHARS).collect();
        format!("{}{}", head, TRUNCATION_MARKER)
    } else {
        content.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(id: &str, content: &str) -> SearchResult {
        SearchResult {
            id: id.to_string(),
            content: content.to_string(),
            title: None,
            source: None,
            tags: None,
            created_at: 0,
            similarity: Some(0.5),
        }
    }

    #[test]
    fn empty_results_assemble_to_empty() {
        let assembled = assemble(&[]);
        assert_eq!(assembled.context_text, "");
        assert!(assembled.citations.is_empty());
    }

    #[test]
    fn joins_contents_in_order_with_blank_line() {
        let assembled = assemble(&[result("c1", "first"), result("c2", "second")]);
        assert_eq!(assembled.context_text, "first\n\nsecond");
        let ids: Vec<&str> = assembled.citations.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2"]);
    }

    #[test]
    fn long_content_truncates_preview_to_100_plus_marker() {
        let content = "z".repeat(250);
        let assembled = assemble(&[result("c1", &content)]);
        let preview = &assembled.citations[0].preview;
        assert_eq!(preview.chars().count(), 103);
        assert!(preview.ends_with(TRUNCATION_MARKER));
        assert_eq!(&preview[..100], &content[..100]);
    }

    #[test]
    fn short_content_preview_untruncated() {
        let content = "y".repeat(50);
        let assembled = assemble(&[result("c1", &content)]);
        assert_eq!(assembled.citations[0].preview, content);
    }

    #[test]
    fn exactly_100_chars_is_not_truncated() {
        let content = "w".repeat(100);
        assert_eq!(citation_preview(&content), content);
    }

    #[test]
    fn preview_counts_characters_not_bytes() {
        let content = "あ".repeat(150);
        let preview = citation_preview(&content);
        assert_eq!(preview.chars().count(), 103);
        assert!(preview.starts_with(&"あ".repeat(100)));
    }

    #[test]
    fn duplicate_sources_stay_distinct() {
        let assembled = assemble(&[result("c1", "same"), result("c1", "same")]);
        assert_eq!(assembled.citations.len(), 2);
        assert_eq!(assembled.citations[0], assembled.citations[1]);
    }
}
