//! Comment inventory.
//!
//! Every comment is classified by where it sits and what it holds:
//! a file header before the first code, a docstring, an inline comment after
//! code on the same line, commented-out code, or a standalone note.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use stmig_syntax::docstring::{is_docstring, parse_docstring};
use stmig_syntax::{CommentKind, Docstring, SourceLocation};
use tracing::debug;

use crate::masked::{CommentSpan, MaskedSource};

/// Placement/content class of a comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CommentStyle {
    /// Before the first line of code in the file.
    Header,
    /// Documentation block.
    Docstring,
    /// After code on the same line.
    Inline,
    /// On its own line.
    Standalone,
    /// Disabled source code.
    CommentedCode,
}

impl CommentStyle {
    /// Returns the serialized name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Header => "header",
            Self::Docstring => "docstring",
            Self::Inline => "inline",
            Self::Standalone => "standalone",
            Self::CommentedCode => "commentedCode",
        }
    }
}

/// A classified comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedComment {
    /// Comment body without delimiters.
    pub text: String,
    /// Delimiter style.
    pub kind: CommentKind,
    /// Placement/content class.
    pub style: CommentStyle,
    /// Comment location.
    pub location: SourceLocation,
}

/// Comment counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentSummary {
    /// Number of comments.
    pub total: usize,
    /// Number of comments per style.
    pub by_style: BTreeMap<String, usize>,
    /// Number of parsed docstrings.
    pub docstrings: usize,
    /// Number of lines holding at least one comment.
    pub comment_lines: usize,
}

/// Result of [`extract_comments`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentExtraction {
    /// Comments in source order.
    pub comments: Vec<ExtractedComment>,
    /// Docstrings parsed from header and docstring comments.
    pub docstrings: Vec<Docstring>,
    /// Counts.
    pub summary: CommentSummary,
}

static CODE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^\s*(?:[A-Za-z_][\w.\[\]^]*\s*:=.*;|(?:IF|ELSIF|CASE|FOR|WHILE)\b.*\b(?:THEN|OF|DO)\b|END_(?:IF|CASE|FOR|WHILE|REPEAT)\b\s*;?\s*$|[A-Za-z_][\w.]*\s*\(.*\)\s*;\s*$)",
    )
    .unwrap_or_else(|err| panic!("commented code regex: {err}"))
});

/// Returns true if comment text reads as disabled source code.
#[must_use]
pub fn looks_like_code(text: &str) -> bool {
    text.lines().any(|line| CODE_LINE.is_match(line))
}

/// Extracts and classifies every comment of a source text.
#[must_use]
pub fn extract_comments(source: &str, file: &str) -> CommentExtraction {
    let masked = MaskedSource::new(source);
    let first_code = masked
        .masked()
        .char_indices()
        .find(|(_, ch)| !ch.is_whitespace())
        .map_or(usize::MAX, |(offset, _)| offset);

    let mut comments = Vec::new();
    let mut docstrings = Vec::new();
    for span in masked.comments() {
        let style = classify(&masked, span, first_code);
        let location = span.location(file);
        if matches!(style, CommentStyle::Header | CommentStyle::Docstring)
            && is_docstring(&span.raw, span.start.line, span.end.line)
        {
            docstrings.push(parse_docstring(&span.raw, location.clone()));
        }
        comments.push(ExtractedComment {
            text: span.body.clone(),
            kind: span.kind,
            style,
            location,
        });
    }

    debug!(file, comments = comments.len(), docstrings = docstrings.len(), "extracted comments");
    let summary = summarize(&comments, docstrings.len());
    CommentExtraction {
        comments,
        docstrings,
        summary,
    }
}

fn classify(masked: &MaskedSource<'_>, span: &CommentSpan, first_code: usize) -> CommentStyle {
    if masked.has_code_before(span) {
        CommentStyle::Inline
    } else if span.range.end <= first_code {
        CommentStyle::Header
    } else if is_docstring(&span.raw, span.start.line, span.end.line) {
        CommentStyle::Docstring
    } else if looks_like_code(&span.body) {
        CommentStyle::CommentedCode
    } else {
        CommentStyle::Standalone
    }
}

fn summarize(comments: &[ExtractedComment], docstrings: usize) -> CommentSummary {
    let mut by_style = BTreeMap::new();
    let mut lines = Vec::new();
    for comment in comments {
        *by_style.entry(comment.style.as_str().to_string()).or_insert(0) += 1;
        lines.extend(comment.location.line..=comment.location.last_line());
    }
    lines.sort_unstable();
    lines.dedup();
    CommentSummary {
        total: comments.len(),
        by_style,
        docstrings,
        comment_lines: lines.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_by_placement_and_content() {
        let source = "(*\n File header\n*)\nPROGRAM P\n(* @note single line doc *)\nx := 1; // set x\n// just a remark\n// nOld := 5;\nEND_PROGRAM";
        let result = extract_comments(source, "p.st");
        let styles: Vec<CommentStyle> = result.comments.iter().map(|c| c.style).collect();
        assert_eq!(
            styles,
            vec![
                CommentStyle::Header,
                CommentStyle::Docstring,
                CommentStyle::Inline,
                CommentStyle::Standalone,
                CommentStyle::CommentedCode,
            ]
        );
        assert_eq!(result.docstrings.len(), 2);
        assert_eq!(result.docstrings[0].summary, "File header");
        assert_eq!(result.summary.by_style.get("commentedCode"), Some(&1));
        assert_eq!(result.summary.comment_lines, 7);
    }

    #[test]
    fn prose_is_not_code() {
        assert!(!looks_like_code("Fill the tank until the level switch trips."));
        assert!(looks_like_code("IF bOld THEN"));
        assert!(looks_like_code("fbTimer(IN := TRUE, PT := T#1S);"));
    }

    #[test]
    fn empty_source_has_no_comments() {
        let result = extract_comments("", "empty.st");
        assert!(result.comments.is_empty());
        assert_eq!(result.summary, CommentSummary::default());
    }
}
