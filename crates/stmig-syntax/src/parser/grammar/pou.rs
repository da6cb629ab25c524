//! Program Organization Unit (POU) parsing.
//!
//! Handles:
//! - PROGRAM / END_PROGRAM
//! - FUNCTION / END_FUNCTION
//! - FUNCTION_BLOCK / END_FUNCTION_BLOCK
//! - CLASS / END_CLASS
//! - INTERFACE / END_INTERFACE
//! - METHOD / END_METHOD
//! - PROPERTY and ACTION blocks, kept as body text

use smol_str::SmolStr;

use crate::lexer::{Token, TokenKind};
use crate::model::{make_id, Method, Pou, PouType};
use crate::parser::parser::{PResult, Parser};
use crate::parser::ParseCode;

const UNKNOWN_NAME: &str = "UNKNOWN";

fn pou_type_of(kind: TokenKind) -> PouType {
    match kind {
        TokenKind::KwFunctionBlock => PouType::FunctionBlock,
        TokenKind::KwFunction => PouType::Function,
        TokenKind::KwClass => PouType::Class,
        TokenKind::KwInterface => PouType::Interface,
        _ => PouType::Program,
    }
}

/// First and last lines of executable body seen so far.
#[derive(Default)]
struct BodySpan {
    start: Option<u32>,
    end: Option<u32>,
}

impl BodySpan {
    fn extend(&mut self, token: &Token) {
        self.start.get_or_insert(token.start_line);
        self.end = Some(token.end_line);
    }

    /// Resolves the span against the unit's closing line.
    fn resolve(&self, closing_line: u32) -> (u32, u32) {
        let end = closing_line.max(self.end.unwrap_or(closing_line));
        let start = self.start.unwrap_or(end).min(end);
        (start, end)
    }
}

/// How a unit's member loop ended.
enum Closing<'t> {
    /// The terminal keyword was consumed.
    Terminal(&'t Token),
    /// A new unit or end of input arrived first.
    Missing,
}

impl<'t> Parser<'t, '_> {
    /// Parses a PROGRAM, FUNCTION_BLOCK, FUNCTION, CLASS or INTERFACE.
    pub(crate) fn parse_pou(&mut self) -> PResult<()> {
        let Some(keyword) = self.bump() else {
            return Ok(());
        };
        let pou_type = pou_type_of(keyword.kind);
        let terminal = keyword.kind.terminal().unwrap_or(TokenKind::KwEndProgram);

        while self.current().is_member_modifier() {
            self.bump();
        }
        let name = self.parse_unit_name(pou_type.as_str());

        let mut pou = Pou {
            id: make_id("pou", &self.file, keyword.start_line, &name),
            pou_type,
            name,
            location: self.location(keyword),
            documentation: None,
            variables: Vec::new(),
            extends: None,
            implements: Vec::new(),
            methods: Vec::new(),
            return_type: None,
            body_start_line: keyword.start_line,
            body_end_line: keyword.start_line,
        };

        if let Err(failure) = self.parse_pou_header(&mut pou) {
            self.record_failure(&failure);
            self.recover();
        }

        let mut body = BodySpan::default();
        let closing = loop {
            let kind = self.current();
            if kind == terminal {
                if let Some(token) = self.bump() {
                    break Closing::Terminal(token);
                }
            }
            if kind == TokenKind::Eof || kind.is_pou_keyword() {
                let what = if kind == TokenKind::Eof {
                    "end of input".to_string()
                } else {
                    format!("'{}'", self.current_text())
                };
                self.error(
                    ParseCode::MissingEnd,
                    format!(
                        "expected {} to close {} '{}' before {what}",
                        terminal_text(terminal),
                        pou.pou_type,
                        pou.name
                    ),
                    false,
                );
                break Closing::Missing;
            }

            let result = if kind.is_var_keyword() {
                self.parse_var_section(&mut pou.variables)
            } else if kind == TokenKind::KwMethod {
                self.parse_method(&pou.name, terminal).map(|method| pou.methods.push(method))
            } else if kind == TokenKind::KwProperty {
                self.skip_block(TokenKind::KwEndProperty, terminal, &mut body);
                Ok(())
            } else if kind == TokenKind::KwAction {
                self.skip_block(TokenKind::KwEndAction, terminal, &mut body);
                Ok(())
            } else if matches!(kind, TokenKind::KwEndVar | TokenKind::KwEndMethod) {
                let message = format!("unmatched {} in {} '{}'", self.current_text(), pou.pou_type, pou.name);
                self.error(ParseCode::UnmatchedEnd, message, true);
                self.bump();
                Ok(())
            } else {
                if let Some(token) = self.bump() {
                    body.extend(token);
                }
                Ok(())
            };

            if let Err(failure) = result {
                self.record_failure(&failure);
                self.recover();
            }
        };

        let closing_line = match closing {
            Closing::Terminal(token) => token.end_line,
            Closing::Missing => self
                .previous_token()
                .map_or(keyword.start_line, |token| token.end_line)
                .max(keyword.start_line),
        };
        let (start, end) = body.resolve(closing_line);
        pou.body_start_line = start;
        pou.body_end_line = end;
        pou.location = pou.location.with_end(closing_line, self.closing_column(&closing));
        self.pous.push(pou);
        Ok(())
    }

    /// Parses the FUNCTION return type and EXTENDS / IMPLEMENTS clauses.
    fn parse_pou_header(&mut self, pou: &mut Pou) -> PResult<()> {
        if self.bump_if(TokenKind::Colon).is_some() {
            pou.return_type = Some(SmolStr::new(self.parse_type_ref()?.text));
        }
        loop {
            if self.bump_if(TokenKind::KwExtends).is_some() {
                pou.extends = Some(self.parse_qualified_name("base name after EXTENDS")?);
            } else if self.bump_if(TokenKind::KwImplements).is_some() {
                pou.implements
                    .push(self.parse_qualified_name("interface name after IMPLEMENTS")?);
                while self.bump_if(TokenKind::Comma).is_some() {
                    pou.implements
                        .push(self.parse_qualified_name("interface name after ','")?);
                }
            } else {
                break;
            }
        }
        // Some exports terminate headers with ';'.
        self.bump_if(TokenKind::Semicolon);
        Ok(())
    }

    /// Parses a METHOD up to END_METHOD.
    fn parse_method(&mut self, owner: &str, owner_terminal: TokenKind) -> PResult<Method> {
        let keyword = self
            .bump()
            .ok_or_else(|| self.failure(ParseCode::UnexpectedToken, "METHOD"))?;

        let mut access = None;
        while self.current().is_member_modifier() {
            if let Some(token) = self.bump() {
                if matches!(
                    token.kind,
                    TokenKind::KwPublic
                        | TokenKind::KwPrivate
                        | TokenKind::KwProtected
                        | TokenKind::KwInternal
                ) {
                    access = Some(SmolStr::new(token.text.to_ascii_uppercase()));
                }
            }
        }
        let name = self.parse_unit_name("METHOD");

        let mut method = Method {
            id: make_id("method", &self.file, keyword.start_line, &format!("{owner}.{name}")),
            name,
            access,
            return_type: None,
            location: self.location(keyword),
            documentation: None,
            variables: Vec::new(),
            body_start_line: keyword.start_line,
            body_end_line: keyword.start_line,
        };

        if self.bump_if(TokenKind::Colon).is_some() {
            match self.parse_type_ref() {
                Ok(type_ref) => method.return_type = Some(SmolStr::new(type_ref.text)),
                Err(failure) => {
                    self.record_failure(&failure);
                    self.recover();
                }
            }
        }
        self.bump_if(TokenKind::Semicolon);

        let mut body = BodySpan::default();
        let closing = loop {
            let kind = self.current();
            if kind == TokenKind::KwEndMethod {
                if let Some(token) = self.bump() {
                    break Closing::Terminal(token);
                }
            }
            if kind == TokenKind::Eof
                || kind.is_pou_keyword()
                || kind == TokenKind::KwMethod
                || kind == owner_terminal
            {
                self.error(
                    ParseCode::MissingEnd,
                    format!("expected END_METHOD to close METHOD '{owner}.{}'", method.name),
                    false,
                );
                break Closing::Missing;
            }

            if kind.is_var_keyword() {
                if let Err(failure) = self.parse_var_section(&mut method.variables) {
                    self.record_failure(&failure);
                    self.recover();
                }
            } else if let Some(token) = self.bump() {
                body.extend(token);
            }
        };

        let closing_line = match closing {
            Closing::Terminal(token) => token.end_line,
            Closing::Missing => self
                .previous_token()
                .map_or(keyword.start_line, |token| token.end_line)
                .max(keyword.start_line),
        };
        let (start, end) = body.resolve(closing_line);
        method.body_start_line = start;
        method.body_end_line = end;
        method.location = method.location.with_end(closing_line, self.closing_column(&closing));
        Ok(method)
    }

    /// Reads a unit name. A missing name is a recoverable error.
    fn parse_unit_name(&mut self, what: &str) -> SmolStr {
        if self.at(TokenKind::Ident) {
            if let Some(token) = self.bump() {
                return token.text.clone();
            }
        }
        self.error(
            ParseCode::MissingName,
            format!("expected {what} name, found '{}'", self.current_text()),
            true,
        );
        SmolStr::new(UNKNOWN_NAME)
    }

    fn parse_qualified_name(&mut self, expected: &'static str) -> PResult<SmolStr> {
        let first = self.expect(TokenKind::Ident, ParseCode::UnexpectedToken, expected)?;
        let mut last = first;
        while self.at(TokenKind::Dot) {
            self.bump();
            last = self.expect(TokenKind::Ident, ParseCode::UnexpectedToken, expected)?;
        }
        Ok(SmolStr::new(self.text_between(first, last).split_whitespace().collect::<String>()))
    }

    /// Consumes a PROPERTY or ACTION block as body text.
    fn skip_block(&mut self, end: TokenKind, owner_terminal: TokenKind, body: &mut BodySpan) {
        while !self.at_end() {
            let kind = self.current();
            if kind == owner_terminal || kind.is_pou_keyword() || kind == TokenKind::KwMethod {
                return;
            }
            if let Some(token) = self.bump() {
                body.extend(token);
                if kind == end {
                    return;
                }
            }
        }
    }

    fn closing_column(&self, closing: &Closing<'t>) -> u32 {
        match closing {
            Closing::Terminal(token) => token.end_col,
            Closing::Missing => self.previous_token().map_or(1, |token| token.end_col),
        }
    }
}

fn terminal_text(kind: TokenKind) -> &'static str {
    match kind {
        TokenKind::KwEndFunctionBlock => "END_FUNCTION_BLOCK",
        TokenKind::KwEndFunction => "END_FUNCTION",
        TokenKind::KwEndClass => "END_CLASS",
        TokenKind::KwEndInterface => "END_INTERFACE",
        TokenKind::KwEndMethod => "END_METHOD",
        _ => "END_PROGRAM",
    }
}

#[cfg(test)]
mod tests {
    use crate::model::{PouType, VarSection};
    use crate::parser::parse;

    #[test]
    fn test_parse_function_block_header() {
        let source = "FUNCTION_BLOCK PUBLIC FB_Motor EXTENDS Lib.FB_Base IMPLEMENTS I_Run, I_Stop\nVAR_INPUT\n    bEnable : BOOL;\nEND_VAR\nEND_FUNCTION_BLOCK\n";
        let result = parse(source, "motor.st");
        assert!(result.success, "errors: {:?}", result.errors);
        let pou = &result.pous[0];
        assert_eq!(pou.pou_type, PouType::FunctionBlock);
        assert_eq!(pou.name, "FB_Motor");
        assert_eq!(pou.extends.as_deref(), Some("Lib.FB_Base"));
        assert_eq!(pou.implements, vec!["I_Run", "I_Stop"]);
        assert_eq!(pou.variables.len(), 1);
        assert_eq!(pou.variables[0].section, VarSection::VarInput);
        assert_eq!(pou.location.end_line, Some(5));
    }

    #[test]
    fn test_function_return_type() {
        let result = parse("FUNCTION F_Scale : REAL\nVAR_INPUT x : INT; END_VAR\nF_Scale := x * 2;\nEND_FUNCTION", "f.st");
        assert_eq!(result.pous[0].return_type.as_deref(), Some("REAL"));
        assert_eq!(result.pous[0].body_start_line, 3);
        assert_eq!(result.pous[0].body_end_line, 4);
    }

    #[test]
    fn test_methods_are_nested() {
        let source = "FUNCTION_BLOCK FB_A\nMETHOD PUBLIC Start : BOOL\nVAR_INPUT nSpeed : INT; END_VAR\nStart := TRUE;\nEND_METHOD\nMETHOD Stop\nEND_METHOD\nEND_FUNCTION_BLOCK";
        let result = parse(source, "a.st");
        assert!(result.success, "errors: {:?}", result.errors);
        let pou = &result.pous[0];
        assert_eq!(pou.methods.len(), 2);
        assert_eq!(pou.methods[0].name, "Start");
        assert_eq!(pou.methods[0].access.as_deref(), Some("PUBLIC"));
        assert_eq!(pou.methods[0].return_type.as_deref(), Some("BOOL"));
        assert_eq!(pou.methods[0].variables.len(), 1);
        assert_eq!(pou.methods[1].name, "Stop");
        assert!(pou.variables.is_empty());
    }

    #[test]
    fn test_missing_name_is_recoverable() {
        let result = parse("PROGRAM\nVAR x : INT; END_VAR\nEND_PROGRAM", "anon.st");
        assert!(result.success);
        assert_eq!(result.pous[0].name, "UNKNOWN");
        assert_eq!(result.errors[0].code, "P002");
    }

    #[test]
    fn test_new_pou_closes_unterminated_unit() {
        let result = parse("PROGRAM A\nx := 1;\nPROGRAM B\nEND_PROGRAM", "two.st");
        assert!(!result.success);
        assert_eq!(result.pous.len(), 2);
        assert_eq!(result.pous[0].name, "A");
        assert_eq!(result.pous[0].body_end_line, 2);
        assert_eq!(result.errors[0].code, "P005");
        assert!(!result.errors[0].recoverable);
    }
}
