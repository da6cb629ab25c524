//! Main parser implementation.

use smol_str::SmolStr;
use thiserror::Error;
use tracing::{debug, warn};

use crate::docstring::{comment_body, is_docstring, parse_docstring};
use crate::lexer::{tokenize_with_index, Token, TokenKind};
use crate::line_index::LineIndex;
use crate::model::{Comment, CommentKind, Docstring, Pou, SourceLocation, Variable};
use crate::parser::source::Source;
use crate::parser::{
    grammar, ParseCode, ParseConfidence, ParseDiagnostic, ParseMetadata, ParseOptions,
    ParseResult,
};
use crate::vendor::detect_vendor;

/// Parses source text with default options.
///
/// `file_path` is used verbatim in every produced location.
#[must_use]
pub fn parse(source: &str, file_path: &str) -> ParseResult {
    parse_with_options(source, file_path, &ParseOptions::default())
}

/// Parses source text.
#[must_use]
pub fn parse_with_options(source: &str, file_path: &str, options: &ParseOptions) -> ParseResult {
    let index = LineIndex::new(source);
    let tokens = tokenize_with_index(source, &index);

    let mut parser = Parser::new(&tokens, source, file_path);
    parser.parse_file();
    let Parser {
        mut pous,
        globals,
        errors,
        mut warnings,
        ..
    } = parser;

    warnings.extend(unterminated_literals(&tokens));
    let comments = collect_comments(&tokens, file_path);
    let mut docstrings = collect_docstrings(&tokens, file_path);
    grammar::associate_docstrings(&mut docstrings, &mut pous, options.adjacency_tolerance);

    let success = errors.iter().all(|error| error.recoverable);
    let confidence = ParseConfidence::from_counts(errors.len(), pous.len());
    debug!(
        file = file_path,
        pous = pous.len(),
        globals = globals.len(),
        docstrings = docstrings.len(),
        errors = errors.len(),
        "parsed"
    );
    if !success {
        warn!(file = file_path, errors = errors.len(), ?confidence, "degraded parse");
    }

    ParseResult {
        success,
        pous,
        global_variables: globals,
        docstrings,
        comments,
        errors,
        warnings,
        metadata: ParseMetadata {
            file_path: file_path.to_string(),
            vendor: detect_vendor(source),
            line_count: index.line_count(),
            token_count: tokens.len(),
            confidence,
        },
    }
}

/// A failure that aborts the construct being parsed.
#[derive(Debug, Clone, Error)]
#[error("expected {expected}, found {found}")]
pub(crate) struct ParseFailure {
    pub(crate) code: ParseCode,
    pub(crate) expected: &'static str,
    pub(crate) found: String,
    pub(crate) line: u32,
    pub(crate) column: u32,
}

pub(crate) type PResult<T> = Result<T, ParseFailure>;

/// The parser state.
pub(crate) struct Parser<'t, 'src> {
    pub(crate) source: Source<'t, 'src>,
    pub(crate) file: SmolStr,
    pub(crate) pous: Vec<Pou>,
    pub(crate) globals: Vec<Variable>,
    errors: Vec<ParseDiagnostic>,
    warnings: Vec<ParseDiagnostic>,
}

impl<'t, 'src> Parser<'t, 'src> {
    fn new(tokens: &'t [Token], source: &'src str, file: &str) -> Self {
        Self {
            source: Source::new(tokens, source),
            file: SmolStr::new(file),
            pous: Vec::new(),
            globals: Vec::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn parse_file(&mut self) {
        while !self.at_end() {
            let kind = self.current();
            let result = if kind.is_pou_keyword() {
                self.parse_pou()
            } else if kind.is_var_keyword() {
                let mut globals = Vec::new();
                let result = self.parse_var_section(&mut globals);
                self.globals.append(&mut globals);
                result
            } else if is_unit_end(kind) {
                let message = format!("unmatched {}", self.current_text());
                self.error(ParseCode::UnmatchedEnd, message, true);
                self.bump();
                Ok(())
            } else {
                // CONFIGURATION/RESOURCE/TYPE and stray statements carry no units.
                self.bump();
                Ok(())
            };

            if let Err(failure) = result {
                self.record_failure(&failure);
                self.recover();
            }
        }
    }

    // =========================================================================
    // Helper Methods
    // =========================================================================

    pub(crate) fn current(&self) -> TokenKind {
        self.source.current()
    }

    pub(crate) fn current_token(&self) -> Option<&'t Token> {
        self.source.current_token()
    }

    pub(crate) fn current_text(&self) -> SmolStr {
        self.current_token()
            .map_or_else(SmolStr::default, |token| token.text.clone())
    }

    pub(crate) fn at(&self, kind: TokenKind) -> bool {
        self.current() == kind
    }

    pub(crate) fn at_end(&self) -> bool {
        self.source.at_end()
    }

    pub(crate) fn bump(&mut self) -> Option<&'t Token> {
        self.source.bump()
    }

    pub(crate) fn bump_if(&mut self, kind: TokenKind) -> Option<&'t Token> {
        if self.at(kind) {
            self.bump()
        } else {
            None
        }
    }

    pub(crate) fn previous_token(&self) -> Option<&'t Token> {
        self.source.previous_token()
    }

    /// Returns the 1-based position of the current token.
    pub(crate) fn position(&self) -> (u32, u32) {
        self.current_token()
            .map_or((1, 1), |token| (token.start_line, token.start_col))
    }

    pub(crate) fn failure(&self, code: ParseCode, expected: &'static str) -> ParseFailure {
        let (line, column) = self.position();
        let found = match self.current() {
            TokenKind::Eof => "end of input".to_string(),
            _ => format!("'{}'", self.current_text()),
        };
        ParseFailure {
            code,
            expected,
            found,
            line,
            column,
        }
    }

    /// Consumes a token of the given kind or fails.
    pub(crate) fn expect(
        &mut self,
        kind: TokenKind,
        code: ParseCode,
        expected: &'static str,
    ) -> PResult<&'t Token> {
        if self.at(kind) {
            if let Some(token) = self.bump() {
                return Ok(token);
            }
        }
        Err(self.failure(code, expected))
    }

    pub(crate) fn error(&mut self, code: ParseCode, message: impl Into<String>, recoverable: bool) {
        let (line, column) = self.position();
        self.errors
            .push(ParseDiagnostic::new(code, message, line, column, recoverable));
    }

    pub(crate) fn warning(&mut self, code: ParseCode, message: impl Into<String>) {
        let (line, column) = self.position();
        self.warnings
            .push(ParseDiagnostic::new(code, message, line, column, true));
    }

    pub(crate) fn record_failure(&mut self, failure: &ParseFailure) {
        self.errors.push(ParseDiagnostic::new(
            failure.code,
            failure.to_string(),
            failure.line,
            failure.column,
            false,
        ));
    }

    /// Discards tokens until the next POU or variable-section keyword.
    ///
    /// Unit terminals also stop recovery so the enclosing unit can close; an
    /// `END_VAR` closes the broken section and is consumed.
    pub(crate) fn recover(&mut self) {
        while !self.at_end() {
            if self.bump_if(TokenKind::KwEndVar).is_some() {
                break;
            }
            if self.is_sync_point() {
                break;
            }
            self.bump();
        }
    }

    /// Returns true if the current token is a synchronization point.
    pub(crate) fn is_sync_point(&self) -> bool {
        let kind = self.current();
        kind.is_pou_keyword() || kind.is_var_keyword() || kind == TokenKind::KwMethod || is_unit_end(kind)
    }

    pub(crate) fn location(&self, token: &Token) -> SourceLocation {
        SourceLocation::new(self.file.clone(), token.start_line, token.start_col)
            .with_end(token.end_line, token.end_col)
    }

    /// Returns the source text between two tokens, inclusive.
    pub(crate) fn text_between(&self, first: &Token, last: &Token) -> &'src str {
        let start = usize::from(first.range.start());
        let end = usize::from(last.range.end()).max(start);
        self.source.slice(start, end)
    }

    /// Returns the same-line comment following the last consumed token.
    pub(crate) fn trailing_comment(&self) -> Option<&'t Token> {
        let line = self.previous_token()?.end_line;
        self.source.trailing_comment(line)
    }
}

/// Returns true for the terminal keywords of units and sections.
pub(crate) fn is_unit_end(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::KwEndProgram
            | TokenKind::KwEndFunctionBlock
            | TokenKind::KwEndFunction
            | TokenKind::KwEndClass
            | TokenKind::KwEndInterface
            | TokenKind::KwEndMethod
            | TokenKind::KwEndVar
    )
}

fn collect_comments(tokens: &[Token], file: &str) -> Vec<Comment> {
    tokens
        .iter()
        .filter(|token| token.kind == TokenKind::Comment)
        .map(|token| Comment {
            text: comment_body(&token.text).to_string(),
            kind: if token.is_line_comment() {
                CommentKind::Line
            } else {
                CommentKind::Block
            },
            location: SourceLocation::new(file, token.start_line, token.start_col)
                .with_end(token.end_line, token.end_col),
        })
        .collect()
}

fn collect_docstrings(tokens: &[Token], file: &str) -> Vec<Docstring> {
    tokens
        .iter()
        .filter(|token| token.kind == TokenKind::Comment)
        .filter(|token| is_docstring(&token.text, token.start_line, token.end_line))
        .map(|token| {
            let location = SourceLocation::new(file, token.start_line, token.start_col)
                .with_end(token.end_line, token.end_col);
            parse_docstring(&token.text, location)
        })
        .collect()
}

fn unterminated_literals(tokens: &[Token]) -> Vec<ParseDiagnostic> {
    tokens
        .iter()
        .filter_map(|token| {
            let text = token.text.as_str();
            let what = match token.kind {
                TokenKind::Comment if text.starts_with("(*") && !is_closed_comment(text, "(*", "*)") => {
                    "comment"
                }
                TokenKind::Comment if text.starts_with("/*") && !is_closed_comment(text, "/*", "*/") => {
                    "comment"
                }
                TokenKind::StringLiteral if !is_closed_string(text, '\'') => "string",
                TokenKind::WideStringLiteral if !is_closed_string(text, '"') => "string",
                _ => return None,
            };
            Some(ParseDiagnostic::new(
                ParseCode::UnterminatedLiteral,
                format!("unterminated {what} runs to end of input"),
                token.start_line,
                token.start_col,
                true,
            ))
        })
        .collect()
}

/// Returns true if every opened block comment level is closed.
fn is_closed_comment(text: &str, open: &str, close: &str) -> bool {
    let mut depth = 0usize;
    let mut rest = text;
    while !rest.is_empty() {
        if rest.starts_with(open) {
            depth += 1;
            rest = &rest[open.len()..];
        } else if rest.starts_with(close) && depth > 0 {
            depth -= 1;
            if depth == 0 {
                return true;
            }
            rest = &rest[close.len()..];
        } else {
            let width = rest.chars().next().map_or(1, char::len_utf8);
            rest = &rest[width..];
        }
    }
    false
}

/// Returns true if the string ends in an unescaped closing quote.
fn is_closed_string(text: &str, quote: char) -> bool {
    let mut chars = text.chars().skip(1);
    let mut closed = false;
    while let Some(ch) = chars.next() {
        closed = false;
        if ch == '$' {
            chars.next();
        } else if ch == quote {
            closed = true;
        }
    }
    closed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty() {
        let result = parse("", "empty.st");
        assert!(result.success);
        assert!(result.pous.is_empty());
        assert_eq!(result.metadata.confidence, ParseConfidence::None);
    }

    #[test]
    fn test_parse_simple_program() {
        let result = parse("PROGRAM Test END_PROGRAM", "test.st");
        assert!(result.success, "errors: {:?}", result.errors);
        assert_eq!(result.pous.len(), 1);
        assert_eq!(result.pous[0].name, "Test");
        assert_eq!(result.metadata.confidence, ParseConfidence::Definite);
    }

    #[test]
    fn test_stray_end_is_recoverable() {
        let result = parse("END_PROGRAM\nPROGRAM A\nEND_PROGRAM", "stray.st");
        assert!(result.success);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].code, "P006");
        assert_eq!(result.metadata.confidence, ParseConfidence::Probable);
    }

    #[test]
    fn test_unterminated_comment_is_a_warning() {
        let result = parse("PROGRAM A\nEND_PROGRAM\n(* open", "open.st");
        assert!(result.success);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].code, "P010");
        assert_eq!(result.comments.len(), 1);
    }

    #[test]
    fn test_comment_closure() {
        assert!(is_closed_comment("(* a (* b *) c *)", "(*", "*)"));
        assert!(!is_closed_comment("(* a (* b *)", "(*", "*)"));
        assert!(!is_closed_comment("(*)", "(*", "*)"));
    }

    #[test]
    fn test_string_closure() {
        assert!(is_closed_string("'abc'", '\''));
        assert!(is_closed_string("''", '\''));
        assert!(!is_closed_string("'", '\''));
        assert!(!is_closed_string("'abc", '\''));
        assert!(!is_closed_string("'ab$'", '\''));
    }
}
