//! Lexer for IEC 61131-3 Structured Text.
//!
//! [`tokenize`] turns source text into a flat token stream with 1-based
//! line/column spans. It never fails: unrecognized input becomes
//! [`TokenKind::Unknown`] and the stream always ends in one [`TokenKind::Eof`].

mod tokens;

pub use tokens::{keyword_kind, TokenKind};

use logos::Logos;
use smol_str::SmolStr;
use text_size::{TextRange, TextSize};

use crate::line_index::LineIndex;
use tokens::RawToken;

/// A token produced by the lexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// The kind of token.
    pub kind: TokenKind,
    /// Token text. Digit-group separators are stripped from numeric literals.
    pub text: SmolStr,
    /// The byte range of the token in the source text.
    pub range: TextRange,
    /// 1-based line where the token starts.
    pub start_line: u32,
    /// 1-based column where the token starts.
    pub start_col: u32,
    /// 1-based line where the token ends.
    pub end_line: u32,
    /// 1-based column just past the token's last character.
    pub end_col: u32,
}

impl Token {
    /// Returns true if this is a block comment `(* ... *)` or `/* ... */`.
    #[must_use]
    pub fn is_block_comment(&self) -> bool {
        self.kind == TokenKind::Comment && (self.text.starts_with("(*") || self.text.starts_with("/*"))
    }

    /// Returns true if this is a line comment `// ...`.
    #[must_use]
    pub fn is_line_comment(&self) -> bool {
        self.kind == TokenKind::Comment && self.text.starts_with("//")
    }

    /// Returns the byte range as a `usize` range.
    #[must_use]
    pub fn span(&self) -> std::ops::Range<usize> {
        usize::from(self.range.start())..usize::from(self.range.end())
    }
}

/// Tokenizes a source text.
///
/// Whitespace is skipped; comments and pragmas are kept as tokens.
#[must_use]
pub fn tokenize(source: &str) -> Vec<Token> {
    let index = LineIndex::new(source);
    tokenize_with_index(source, &index)
}

/// Tokenizes with a precomputed line index.
#[must_use]
pub fn tokenize_with_index(source: &str, index: &LineIndex) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut lexer = RawToken::lexer(source);

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        let slice = source.get(span.clone()).unwrap_or("");
        let kind = match result {
            Ok(raw) => match raw.to_kind(slice) {
                Some(kind) => kind,
                None => continue,
            },
            Err(()) => TokenKind::Unknown,
        };
        let text = match kind {
            TokenKind::IntLiteral | TokenKind::RealLiteral => {
                SmolStr::new(slice.replace('_', ""))
            }
            _ => SmolStr::new(slice),
        };
        tokens.push(make_token(source, index, kind, text, span.start, span.end));
    }

    tokens.push(make_token(
        source,
        index,
        TokenKind::Eof,
        SmolStr::default(),
        source.len(),
        source.len(),
    ));
    tokens
}

fn make_token(
    source: &str,
    index: &LineIndex,
    kind: TokenKind,
    text: SmolStr,
    start: usize,
    end: usize,
) -> Token {
    let start_pos = index.line_col(source, start);
    let end_pos = index.line_col(source, end);
    Token {
        kind,
        text,
        range: TextRange::new(to_size(start), to_size(end)),
        start_line: start_pos.line,
        start_col: start_pos.col,
        end_line: end_pos.line,
        end_col: end_pos.col,
    }
}

fn to_size(offset: usize) -> TextSize {
    TextSize::from(u32::try_from(offset).unwrap_or(u32::MAX))
}

/// Returns the non-trivia tokens (comments and pragmas removed).
#[must_use]
pub fn significant(tokens: &[Token]) -> Vec<&Token> {
    tokens.iter().filter(|token| !token.kind.is_trivia()).collect()
}
