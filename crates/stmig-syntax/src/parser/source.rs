//! Token source for the parser.
//!
//! This module provides the `Source` struct that wraps a token stream and
//! provides lookahead and consumption operations over non-trivia tokens.

use crate::lexer::{Token, TokenKind};

/// A token source that provides tokens to the parser.
pub(crate) struct Source<'t, 'src> {
    tokens: &'t [Token],
    source: &'src str,
    cursor: usize,
}

impl<'t, 'src> Source<'t, 'src> {
    /// Creates a new source from tokens and source text.
    pub(crate) fn new(tokens: &'t [Token], source: &'src str) -> Self {
        Self {
            tokens,
            source,
            cursor: 0,
        }
    }

    /// Returns the current token kind, or `Eof` if at end.
    pub(crate) fn current(&self) -> TokenKind {
        self.peek_kind_n(0)
    }

    /// Returns the current non-trivia token. The stream always ends in `Eof`.
    pub(crate) fn current_token(&self) -> Option<&'t Token> {
        self.peek_token_n(0)
    }

    /// Peeks at the nth non-trivia token ahead.
    pub(crate) fn peek_kind_n(&self, n: usize) -> TokenKind {
        self.peek_token_n(n).map_or(TokenKind::Eof, |token| token.kind)
    }

    /// Peeks at the nth non-trivia token ahead and returns the token.
    pub(crate) fn peek_token_n(&self, n: usize) -> Option<&'t Token> {
        self.tokens[self.cursor.min(self.tokens.len())..]
            .iter()
            .filter(|token| !token.kind.is_trivia())
            .nth(n)
    }

    /// Advances past the current non-trivia token and returns it.
    pub(crate) fn bump(&mut self) -> Option<&'t Token> {
        while let Some(token) = self.tokens.get(self.cursor) {
            self.cursor += 1;
            if !token.kind.is_trivia() {
                if token.kind == TokenKind::Eof {
                    // Eof is never consumed.
                    self.cursor -= 1;
                }
                return Some(token);
            }
        }
        None
    }

    /// Returns `true` if at end of input.
    pub(crate) fn at_end(&self) -> bool {
        self.current() == TokenKind::Eof
    }

    /// Returns the last consumed non-trivia token.
    pub(crate) fn previous_token(&self) -> Option<&'t Token> {
        self.tokens[..self.cursor.min(self.tokens.len())]
            .iter()
            .rev()
            .find(|token| !token.kind.is_trivia())
    }

    /// Returns the comment that directly follows the last consumed token on
    /// the same line, if any.
    pub(crate) fn trailing_comment(&self, line: u32) -> Option<&'t Token> {
        self.tokens
            .get(self.cursor..)?
            .iter()
            .take_while(|token| token.kind.is_trivia())
            .find(|token| token.kind == TokenKind::Comment && token.start_line == line)
    }

    /// Returns the source text between two byte offsets.
    pub(crate) fn slice(&self, start: usize, end: usize) -> &'src str {
        self.source.get(start..end).unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    #[test]
    fn skips_trivia_and_keeps_eof() {
        let tokens = tokenize("(* c *) a { pragma } b");
        let mut source = Source::new(&tokens, "");
        assert_eq!(source.current(), TokenKind::Ident);
        assert_eq!(source.peek_kind_n(1), TokenKind::Ident);
        assert_eq!(source.bump().map(|t| t.text.as_str()), Some("a"));
        assert_eq!(source.bump().map(|t| t.text.as_str()), Some("b"));
        assert!(source.at_end());
        assert_eq!(source.bump().map(|t| t.kind), Some(TokenKind::Eof));
        assert!(source.at_end());
    }

    #[test]
    fn trailing_comment_must_share_the_line() {
        let text = "x : INT; // speed\ny : INT;\n// own line\n";
        let tokens = tokenize(text);
        let mut source = Source::new(&tokens, text);
        for _ in 0..4 {
            source.bump();
        }
        assert_eq!(source.trailing_comment(1).map(|t| t.text.as_str()), Some("// speed"));
        for _ in 0..4 {
            source.bump();
        }
        assert_eq!(source.trailing_comment(2), None);
    }
}
