//! Variable section and type reference parsing.
//!
//! Handles:
//! - VAR, VAR_INPUT, VAR_OUTPUT, VAR_IN_OUT, VAR_GLOBAL, VAR_TEMP, VAR_EXTERNAL,
//!   VAR_STAT, with the CONSTANT, RETAIN, NON_RETAIN and PERSISTENT modifiers
//! - `a, b AT %IX0.0 : ARRAY [1..10] OF INT := init; // comment`

use smol_str::SmolStr;

use crate::docstring::comment_body;
use crate::lexer::{Token, TokenKind};
use crate::model::{make_id, VarSection, Variable};
use crate::parser::parser::{is_unit_end, PResult, Parser};
use crate::parser::ParseCode;

/// A parsed type reference.
pub(crate) struct TypeRef {
    pub(crate) text: String,
    pub(crate) array_bounds: Option<String>,
}

fn section_of(kind: TokenKind) -> VarSection {
    match kind {
        TokenKind::KwVarInput => VarSection::VarInput,
        TokenKind::KwVarOutput => VarSection::VarOutput,
        TokenKind::KwVarInOut => VarSection::VarInOut,
        TokenKind::KwVarGlobal => VarSection::VarGlobal,
        TokenKind::KwVarTemp => VarSection::VarTemp,
        TokenKind::KwVarExternal => VarSection::VarExternal,
        _ => VarSection::Var,
    }
}

fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl<'t> Parser<'t, '_> {
    /// Parses one variable section, pushing declarations into `out` as they
    /// are read so a failure keeps everything before it.
    pub(crate) fn parse_var_section(&mut self, out: &mut Vec<Variable>) -> PResult<()> {
        let keyword = self.bump().map_or(TokenKind::KwVar, |token| token.kind);
        let mut section = section_of(keyword);

        while self.current().is_var_modifier() {
            if self.at(TokenKind::KwConstant) && section == VarSection::Var {
                section = VarSection::VarConstant;
            }
            self.bump();
        }

        loop {
            match self.current() {
                TokenKind::KwEndVar => {
                    self.bump();
                    return Ok(());
                }
                TokenKind::Semicolon => {
                    self.bump();
                }
                TokenKind::Ident => self.parse_var_decl(section, out)?,
                kind if kind == TokenKind::Eof
                    || kind.is_pou_keyword()
                    || kind.is_var_keyword()
                    || kind == TokenKind::KwMethod
                    || is_unit_end(kind) =>
                {
                    self.error(
                        ParseCode::UnterminatedVarSection,
                        format!("{} section without END_VAR", section.as_str()),
                        true,
                    );
                    return Ok(());
                }
                _ => return Err(self.failure(ParseCode::UnexpectedToken, "variable name")),
            }
        }
    }

    fn parse_var_decl(&mut self, section: VarSection, out: &mut Vec<Variable>) -> PResult<()> {
        let mut names: Vec<&'t Token> =
            vec![self.expect(TokenKind::Ident, ParseCode::UnexpectedToken, "variable name")?];
        while self.bump_if(TokenKind::Comma).is_some() {
            names.push(self.expect(TokenKind::Ident, ParseCode::UnexpectedToken, "variable name")?);
        }

        let mut io_address = None;
        if self.bump_if(TokenKind::KwAt).is_some() {
            let address =
                self.expect(TokenKind::DirectAddress, ParseCode::InvalidAddress, "I/O address")?;
            io_address = Some(address.text.clone());
        }

        if self.bump_if(TokenKind::Colon).is_none() {
            let joined = names
                .iter()
                .map(|name| name.text.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            self.warning(
                ParseCode::MissingColon,
                format!("missing ':' in declaration of {joined}; declaration dropped"),
            );
            self.skip_declaration();
            return Ok(());
        }

        let type_ref = self.parse_type_ref()?;

        let mut initial_value = None;
        if self.bump_if(TokenKind::Assign).is_some() {
            initial_value = self.parse_initializer();
        }

        if self.bump_if(TokenKind::Semicolon).is_none() {
            let name = names.last().map_or("?", |name| name.text.as_str()).to_string();
            self.error(
                ParseCode::MissingSemicolon,
                format!("expected ';' after declaration of {name}"),
                true,
            );
        }

        let comment = self
            .trailing_comment()
            .map(|token| comment_body(&token.text).to_string())
            .filter(|text| !text.is_empty());

        let data_type = SmolStr::new(&type_ref.text);
        for name in names {
            out.push(Variable {
                id: make_id("var", &self.file, name.start_line, &name.text),
                name: name.text.clone(),
                data_type: data_type.clone(),
                section,
                initial_value: initial_value.clone(),
                comment: comment.clone(),
                is_array: type_ref.array_bounds.is_some(),
                array_bounds: type_ref.array_bounds.clone(),
                is_safety_critical: stmig_patterns::is_safety_critical_name(&name.text),
                io_address: io_address.clone(),
                location: self.location(name),
            });
        }
        Ok(())
    }

    /// Skips a malformed declaration up to and including its `;`.
    fn skip_declaration(&mut self) {
        while !self.at_end() {
            if self.bump_if(TokenKind::Semicolon).is_some() {
                return;
            }
            if self.is_sync_point() {
                return;
            }
            self.bump();
        }
    }

    /// Reads an initializer up to `;` at bracket depth zero.
    fn parse_initializer(&mut self) -> Option<String> {
        let first = self.current_token()?;
        let mut last = None;
        let mut depth = 0usize;
        while !self.at_end() {
            match self.current() {
                TokenKind::Semicolon if depth == 0 => break,
                TokenKind::LParen | TokenKind::LBracket => depth += 1,
                TokenKind::RParen | TokenKind::RBracket => depth = depth.saturating_sub(1),
                kind if kind == TokenKind::KwEndVar || kind.is_pou_keyword() => break,
                _ => {}
            }
            last = self.bump();
        }
        let last = last?;
        let text = normalize(self.text_between(first, last));
        (!text.is_empty()).then_some(text)
    }

    /// Parses a type reference: `INT`, `Lib.FB_X`, `STRING(80)`,
    /// `ARRAY [1..10] OF REAL`, `POINTER TO INT`, `REF_TO T`, `(A, B)`.
    pub(crate) fn parse_type_ref(&mut self) -> PResult<TypeRef> {
        let first = self
            .current_token()
            .ok_or_else(|| self.failure(ParseCode::UnexpectedToken, "type name"))?;
        let mut array_bounds = None;

        match self.current() {
            TokenKind::KwArray => {
                self.bump();
                let open = self.expect(TokenKind::LBracket, ParseCode::InvalidArray, "'[' after ARRAY")?;
                let close = self.skip_balanced(TokenKind::LBracket, TokenKind::RBracket)?;
                let start = usize::from(open.range.end());
                let end = usize::from(close.range.start()).max(start);
                array_bounds = Some(normalize(self.source.slice(start, end)));
                self.expect(TokenKind::KwOf, ParseCode::InvalidArray, "OF after array bounds")?;
                self.parse_type_ref()?;
            }
            TokenKind::KwPointer => {
                self.bump();
                self.expect(TokenKind::KwTo, ParseCode::UnexpectedToken, "TO after POINTER")?;
                self.parse_type_ref()?;
            }
            TokenKind::KwRefTo => {
                self.bump();
                self.parse_type_ref()?;
            }
            TokenKind::LParen => {
                self.bump();
                self.skip_balanced(TokenKind::LParen, TokenKind::RParen)?;
            }
            kind if kind == TokenKind::Ident || kind.is_type_keyword() => {
                self.bump();
                while self.at(TokenKind::Dot) {
                    self.bump();
                    self.expect(TokenKind::Ident, ParseCode::UnexpectedToken, "qualified type name")?;
                }
                if self.bump_if(TokenKind::LParen).is_some() {
                    self.skip_balanced(TokenKind::LParen, TokenKind::RParen)?;
                } else if self.bump_if(TokenKind::LBracket).is_some() {
                    self.skip_balanced(TokenKind::LBracket, TokenKind::RBracket)?;
                }
            }
            _ => return Err(self.failure(ParseCode::UnexpectedToken, "type name")),
        }

        let last = self.previous_token().unwrap_or(first);
        Ok(TypeRef {
            text: normalize(self.text_between(first, last)),
            array_bounds,
        })
    }

    /// Consumes tokens up to and including the `close` that balances an
    /// already consumed `open`. Returns the closing token.
    fn skip_balanced(&mut self, open: TokenKind, close: TokenKind) -> PResult<&'t Token> {
        let mut depth = 1usize;
        loop {
            let kind = self.current();
            if kind == TokenKind::Eof || kind == TokenKind::Semicolon || kind == TokenKind::KwEndVar {
                return Err(self.failure(ParseCode::UnexpectedToken, "closing bracket"));
            }
            let token = self
                .bump()
                .ok_or_else(|| self.failure(ParseCode::UnexpectedToken, "closing bracket"))?;
            if kind == open {
                depth += 1;
            } else if kind == close {
                depth -= 1;
                if depth == 0 {
                    return Ok(token);
                }
            }
        }
    }
}
