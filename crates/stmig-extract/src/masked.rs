//! Masked view of a source text.
//!
//! Structural scans run over a copy of the source in which comment, pragma
//! and string bodies are replaced by spaces. Byte offsets and line breaks are
//! preserved, so every offset found in the masked text indexes the original
//! text as well. String literals keep their quotes so that `x := '';` still
//! reads as an assignment.

use std::ops::Range;

use stmig_syntax::docstring::comment_body;
use stmig_syntax::lexer::{tokenize_with_index, TokenKind};
use stmig_syntax::{CommentKind, LineCol, LineIndex, SourceLocation};

/// A comment found while masking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentSpan {
    /// Byte range of the whole comment, delimiters included.
    pub range: Range<usize>,
    /// Raw comment text.
    pub raw: String,
    /// Comment text with delimiters stripped and trimmed.
    pub body: String,
    /// Block or line comment.
    pub kind: CommentKind,
    /// Start position.
    pub start: LineCol,
    /// End position (one past the last character).
    pub end: LineCol,
}

impl CommentSpan {
    /// Returns the location of the comment in `file`.
    #[must_use]
    pub fn location(&self, file: &str) -> SourceLocation {
        SourceLocation::new(file, self.start.line, self.start.col).with_end(self.end.line, self.end.col)
    }
}

/// A source text with its masked twin.
#[derive(Debug, Clone)]
pub struct MaskedSource<'a> {
    original: &'a str,
    masked: String,
    index: LineIndex,
    comments: Vec<CommentSpan>,
}

impl<'a> MaskedSource<'a> {
    /// Masks a source text.
    #[must_use]
    pub fn new(original: &'a str) -> Self {
        let index = LineIndex::new(original);
        let tokens = tokenize_with_index(original, &index);
        let mut masked = original.as_bytes().to_vec();
        let mut comments = Vec::new();

        for token in &tokens {
            let span = token.span();
            match token.kind {
                TokenKind::Comment => {
                    blank(original, &mut masked, span.clone());
                    comments.push(CommentSpan {
                        range: span.clone(),
                        raw: token.text.to_string(),
                        body: comment_body(&token.text).to_string(),
                        kind: if token.is_line_comment() {
                            CommentKind::Line
                        } else {
                            CommentKind::Block
                        },
                        start: LineCol {
                            line: token.start_line,
                            col: token.start_col,
                        },
                        end: LineCol {
                            line: token.end_line,
                            col: token.end_col,
                        },
                    });
                }
                TokenKind::Pragma => blank(original, &mut masked, span),
                TokenKind::StringLiteral | TokenKind::WideStringLiteral => {
                    let inner_start = span.start + 1;
                    let inner_end = if span.end > inner_start && is_closed_quote(&token.text) {
                        span.end - 1
                    } else {
                        span.end
                    };
                    blank(original, &mut masked, inner_start..inner_end);
                }
                _ => {}
            }
        }

        // Blanking only ever writes ASCII spaces over whole characters.
        let masked = String::from_utf8(masked).unwrap_or_else(|_| original.to_string());
        Self {
            original,
            masked,
            index,
            comments,
        }
    }

    /// Returns the original text.
    #[must_use]
    pub fn original(&self) -> &'a str {
        self.original
    }

    /// Returns the masked text.
    #[must_use]
    pub fn masked(&self) -> &str {
        &self.masked
    }

    /// Returns the comments in source order.
    #[must_use]
    pub fn comments(&self) -> &[CommentSpan] {
        &self.comments
    }

    /// Returns the number of lines.
    #[must_use]
    pub fn line_count(&self) -> u32 {
        u32::try_from(self.index.line_count()).unwrap_or(u32::MAX)
    }

    /// Returns the 1-based line containing `offset`.
    #[must_use]
    pub fn line_of(&self, offset: usize) -> u32 {
        self.index.line_of(offset)
    }

    /// Returns the 1-based line/column of `offset`.
    #[must_use]
    pub fn line_col(&self, offset: usize) -> LineCol {
        self.index.line_col(self.original, offset)
    }

    /// Returns a location for `offset` in `file`.
    #[must_use]
    pub fn location(&self, file: &str, offset: usize) -> SourceLocation {
        let pos = self.line_col(offset);
        SourceLocation::new(file, pos.line, pos.col)
    }

    /// Returns the byte range of a 1-based line, without its line break.
    #[must_use]
    pub fn line_range(&self, line: u32) -> Range<usize> {
        let start = self.index.line_start(line);
        let next = self.index.line_start(line.saturating_add(1));
        let mut end = next.max(start);
        let bytes = self.original.as_bytes();
        while end > start && matches!(bytes[end - 1], b'\n' | b'\r') {
            end -= 1;
        }
        start..end
    }

    /// Returns the masked text of a 1-based line.
    #[must_use]
    pub fn masked_line(&self, line: u32) -> &str {
        &self.masked[self.line_range(line)]
    }

    /// Returns the original text of `range`, trimmed to the extent of its code.
    ///
    /// Leading and trailing comments are dropped; string literals are kept.
    #[must_use]
    pub fn code_text(&self, range: Range<usize>) -> &'a str {
        let masked = &self.masked[range.clone()];
        let leading = masked.len() - masked.trim_start().len();
        let trailing = masked.len() - masked.trim_end().len();
        let start = range.start + leading;
        let end = (range.end - trailing).max(start);
        &self.original[start..end]
    }

    /// Returns true if the masked text of `range` holds anything but whitespace.
    #[must_use]
    pub fn has_code(&self, range: Range<usize>) -> bool {
        !self.masked[range].trim().is_empty()
    }

    /// Returns the first comment starting on `line` at or after `offset`.
    #[must_use]
    pub fn comment_after(&self, line: u32, offset: usize) -> Option<&CommentSpan> {
        self.comments
            .iter()
            .find(|comment| comment.start.line == line && comment.range.start >= offset)
    }

    /// Returns the first comment on `line` that has no code before it.
    #[must_use]
    pub fn standalone_comment_on(&self, line: u32) -> Option<&CommentSpan> {
        self.comments
            .iter()
            .find(|comment| comment.start.line == line && !self.has_code_before(comment))
    }

    /// Returns true if code precedes the comment on its first line.
    #[must_use]
    pub fn has_code_before(&self, comment: &CommentSpan) -> bool {
        let line_start = self.index.line_start(comment.start.line);
        self.has_code(line_start..comment.range.start)
    }
}

fn blank(original: &str, masked: &mut [u8], range: Range<usize>) {
    let Some(text) = original.get(range.clone()) else {
        return;
    };
    for (offset, ch) in text.char_indices() {
        if ch == '\n' || ch == '\r' {
            continue;
        }
        let start = range.start + offset;
        for byte in &mut masked[start..start + ch.len_utf8()] {
            *byte = b' ';
        }
    }
}

fn is_closed_quote(text: &str) -> bool {
    let mut chars = text.chars();
    let Some(quote) = chars.next() else {
        return false;
    };
    let mut escaped = false;
    let mut closed = false;
    for ch in chars {
        closed = false;
        if escaped {
            escaped = false;
        } else if ch == '$' {
            escaped = true;
        } else if ch == quote {
            closed = true;
        }
    }
    closed
}
