//! Token definitions for IEC 61131-3 Structured Text.
//!
//! Scanning is driven by a private `logos` enum ([`RawToken`]) whose callbacks
//! handle the context-sensitive parts of the language (nested comments,
//! strings spanning lines, numeric shapes, time/date literal prefixes). Raw
//! tokens are then mapped onto the public, closed [`TokenKind`] enumeration.

use logos::Logos;
use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;

fn lex_block_comment_pascal(lex: &mut logos::Lexer<RawToken>) -> bool {
    lex_nested_comment(lex, b"(*", b"*)")
}

fn lex_block_comment_c(lex: &mut logos::Lexer<RawToken>) -> bool {
    lex_nested_comment(lex, b"/*", b"*/")
}

/// Consumes a block comment body, honouring nested open/close pairs. An
/// unterminated comment runs to the end of input and is still a comment.
fn lex_nested_comment(lex: &mut logos::Lexer<RawToken>, open: &[u8], close: &[u8]) -> bool {
    let mut depth = 1usize;
    let bytes = lex.remainder().as_bytes();
    let mut i = 0usize;

    while i + 1 < bytes.len() {
        if bytes[i] == open[0] && bytes[i + 1] == open[1] {
            depth += 1;
            i += 2;
            continue;
        }
        if bytes[i] == close[0] && bytes[i + 1] == close[1] {
            depth -= 1;
            i += 2;
            if depth == 0 {
                lex.bump(i);
                return true;
            }
            continue;
        }
        i += 1;
    }

    lex.bump(bytes.len());
    true
}

fn lex_single_quoted(lex: &mut logos::Lexer<RawToken>) -> bool {
    lex_quoted(lex, b'\'')
}

fn lex_double_quoted(lex: &mut logos::Lexer<RawToken>) -> bool {
    lex_quoted(lex, b'"')
}

/// Consumes a string body verbatim, including newlines. `$` escapes the
/// following character. An unterminated string ends at end of input.
fn lex_quoted(lex: &mut logos::Lexer<RawToken>, quote: u8) -> bool {
    let remainder = lex.remainder();
    let bytes = remainder.as_bytes();
    let mut i = 0usize;

    while i < bytes.len() {
        match bytes[i] {
            b'$' => {
                i += 1;
                // Step over the escaped character as a whole code point.
                if let Some(ch) = remainder.get(i..).and_then(|rest| rest.chars().next()) {
                    i += ch.len_utf8();
                }
            }
            byte if byte == quote => {
                lex.bump(i + 1);
                return true;
            }
            _ => i += 1,
        }
    }

    lex.bump(bytes.len());
    true
}

/// Shape of a numeric literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NumberShape {
    Integer,
    Real,
}

fn count_while(bytes: &[u8], start: usize, pred: impl Fn(u8) -> bool) -> usize {
    bytes[start.min(bytes.len())..]
        .iter()
        .take_while(|byte| pred(**byte))
        .count()
}

fn lex_number(lex: &mut logos::Lexer<RawToken>) -> NumberShape {
    let head = lex.slice().to_string();
    let bytes = lex.remainder().as_bytes();
    let mut i = count_while(bytes, 0, |b| b.is_ascii_digit() || b == b'_');

    let prefix = format!("{head}{}", String::from_utf8_lossy(&bytes[..i]));
    if bytes.get(i) == Some(&b'#')
        && matches!(prefix.as_str(), "2" | "8" | "16")
        && bytes.get(i + 1).is_some_and(u8::is_ascii_hexdigit)
    {
        i += 1;
        i += count_while(bytes, i, |b| b.is_ascii_hexdigit() || b == b'_');
        lex.bump(i);
        return NumberShape::Integer;
    }

    let mut shape = NumberShape::Integer;
    if bytes.get(i) == Some(&b'.') && bytes.get(i + 1).is_some_and(u8::is_ascii_digit) {
        i += 1;
        i += count_while(bytes, i, |b| b.is_ascii_digit() || b == b'_');
        shape = NumberShape::Real;
    }

    if matches!(bytes.get(i), Some(b'e' | b'E')) {
        let mut j = i + 1;
        if matches!(bytes.get(j), Some(b'+' | b'-')) {
            j += 1;
        }
        if bytes.get(j).is_some_and(u8::is_ascii_digit) {
            j += count_while(bytes, j, |b| b.is_ascii_digit() || b == b'_');
            i = j;
            shape = NumberShape::Real;
        }
    }

    lex.bump(i);
    shape
}

/// Shape of an identifier-like word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WordShape {
    Word,
    Time,
    Date,
    TimeOfDay,
    DateAndTime,
}

fn lex_word(lex: &mut logos::Lexer<RawToken>) -> WordShape {
    if !lex.remainder().starts_with('#') {
        return WordShape::Word;
    }
    let shape = match lex.slice().to_ascii_uppercase().as_str() {
        "T" | "TIME" => WordShape::Time,
        "D" | "DATE" => WordShape::Date,
        "TOD" | "TIME_OF_DAY" => WordShape::TimeOfDay,
        "DT" | "DATE_AND_TIME" => WordShape::DateAndTime,
        _ => return WordShape::Word,
    };
    let bytes = lex.remainder().as_bytes();
    let body = count_while(bytes, 1, |b| {
        b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b':' | b'+' | b'-')
    });
    lex.bump(1 + body);
    shape
}

/// Raw scanner tokens. Whitespace is produced here and dropped by the
/// tokenizer.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RawToken {
    #[regex(r"[ \t\r\n\f]+")]
    Whitespace,

    #[regex(r"//[^\r\n]*", allow_greedy = true)]
    LineComment,

    #[token("(*", lex_block_comment_pascal)]
    #[token("/*", lex_block_comment_c)]
    BlockComment,

    #[regex(r"\{[^}]*\}")]
    Pragma,

    #[token("'", lex_single_quoted)]
    SingleQuoted,

    #[token("\"", lex_double_quoted)]
    DoubleQuoted,

    #[regex(r"[0-9]", lex_number)]
    Number(NumberShape),

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", lex_word)]
    Word(WordShape),

    #[regex(r"%[IQMiqm]\*")]
    #[regex(r"%[IQMiqm][XBWDLxbwdl]?[0-9]+(\.[0-9]+)*")]
    DirectAddress,

    #[token(";")]
    Semicolon,
    #[token(":")]
    Colon,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token("..")]
    DotDot,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("#")]
    Hash,
    #[token("^")]
    Caret,
    #[token(":=")]
    Assign,
    #[token("=>")]
    Arrow,
    #[token("=")]
    Eq,
    #[token("<>")]
    Neq,
    #[token("<")]
    Lt,
    #[token("<=")]
    LtEq,
    #[token(">")]
    Gt,
    #[token(">=")]
    GtEq,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("**")]
    Power,
    #[token("&")]
    Ampersand,
}

/// All token kinds in the Structured Text token stream.
///
/// Token kinds are divided into categories:
/// - POU keywords and their terminals
/// - Variable-section keywords and modifiers
/// - Control-flow keywords
/// - Type keywords
/// - Operators and punctuation
/// - Literals
/// - Comments, pragmas, identifiers, and the special `Unknown`/`Eof` kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TokenKind {
    // =========================================================================
    // KEYWORDS - Program Organization Units
    // =========================================================================
    /// `PROGRAM`
    KwProgram,
    /// `END_PROGRAM`
    KwEndProgram,
    /// `FUNCTION_BLOCK`
    KwFunctionBlock,
    /// `END_FUNCTION_BLOCK`
    KwEndFunctionBlock,
    /// `FUNCTION`
    KwFunction,
    /// `END_FUNCTION`
    KwEndFunction,
    /// `CLASS`
    KwClass,
    /// `END_CLASS`
    KwEndClass,
    /// `INTERFACE`
    KwInterface,
    /// `END_INTERFACE`
    KwEndInterface,
    /// `METHOD`
    KwMethod,
    /// `END_METHOD`
    KwEndMethod,
    /// `PROPERTY`
    KwProperty,
    /// `END_PROPERTY`
    KwEndProperty,
    /// `ACTION`
    KwAction,
    /// `END_ACTION`
    KwEndAction,
    /// `EXTENDS`
    KwExtends,
    /// `IMPLEMENTS`
    KwImplements,
    /// `CONFIGURATION`
    KwConfiguration,
    /// `END_CONFIGURATION`
    KwEndConfiguration,
    /// `RESOURCE`
    KwResource,
    /// `END_RESOURCE`
    KwEndResource,
    /// `TYPE`
    KwType,
    /// `END_TYPE`
    KwEndType,
    /// `STRUCT`
    KwStruct,
    /// `END_STRUCT`
    KwEndStruct,

    // =========================================================================
    // KEYWORDS - Variable Declarations
    // =========================================================================
    /// `VAR`
    KwVar,
    /// `VAR_INPUT`
    KwVarInput,
    /// `VAR_OUTPUT`
    KwVarOutput,
    /// `VAR_IN_OUT`
    KwVarInOut,
    /// `VAR_GLOBAL`
    KwVarGlobal,
    /// `VAR_TEMP`
    KwVarTemp,
    /// `VAR_EXTERNAL`
    KwVarExternal,
    /// `VAR_STAT`
    KwVarStat,
    /// `END_VAR`
    KwEndVar,
    /// `CONSTANT`
    KwConstant,
    /// `RETAIN`
    KwRetain,
    /// `NON_RETAIN`
    KwNonRetain,
    /// `PERSISTENT`
    KwPersistent,
    /// `AT`
    KwAt,

    // =========================================================================
    // KEYWORDS - Modifiers
    // =========================================================================
    /// `PUBLIC`
    KwPublic,
    /// `PRIVATE`
    KwPrivate,
    /// `PROTECTED`
    KwProtected,
    /// `INTERNAL`
    KwInternal,
    /// `ABSTRACT`
    KwAbstract,
    /// `FINAL`
    KwFinal,
    /// `OVERRIDE`
    KwOverride,

    // =========================================================================
    // KEYWORDS - Control Flow
    // =========================================================================
    /// `IF`
    KwIf,
    /// `THEN`
    KwThen,
    /// `ELSIF`
    KwElsif,
    /// `ELSE`
    KwElse,
    /// `END_IF`
    KwEndIf,
    /// `CASE`
    KwCase,
    /// `OF`
    KwOf,
    /// `END_CASE`
    KwEndCase,
    /// `FOR`
    KwFor,
    /// `TO`
    KwTo,
    /// `BY`
    KwBy,
    /// `DO`
    KwDo,
    /// `END_FOR`
    KwEndFor,
    /// `WHILE`
    KwWhile,
    /// `END_WHILE`
    KwEndWhile,
    /// `REPEAT`
    KwRepeat,
    /// `UNTIL`
    KwUntil,
    /// `END_REPEAT`
    KwEndRepeat,
    /// `RETURN`
    KwReturn,
    /// `EXIT`
    KwExit,
    /// `CONTINUE`
    KwContinue,

    // =========================================================================
    // KEYWORDS - Operators and constants
    // =========================================================================
    /// `AND`
    KwAnd,
    /// `OR`
    KwOr,
    /// `XOR`
    KwXor,
    /// `NOT`
    KwNot,
    /// `MOD`
    KwMod,
    /// `TRUE`
    KwTrue,
    /// `FALSE`
    KwFalse,

    // =========================================================================
    // KEYWORDS - Types
    // =========================================================================
    /// `ARRAY`
    KwArray,
    /// `POINTER`
    KwPointer,
    /// `REF_TO`
    KwRefTo,
    /// `BOOL`
    KwBool,
    /// `BYTE`
    KwByte,
    /// `WORD`
    KwWord,
    /// `DWORD`
    KwDword,
    /// `LWORD`
    KwLword,
    /// `SINT`
    KwSint,
    /// `INT`
    KwInt,
    /// `DINT`
    KwDint,
    /// `LINT`
    KwLint,
    /// `USINT`
    KwUsint,
    /// `UINT`
    KwUint,
    /// `UDINT`
    KwUdint,
    /// `ULINT`
    KwUlint,
    /// `REAL`
    KwReal,
    /// `LREAL`
    KwLreal,
    /// `TIME`
    KwTime,
    /// `DATE`
    KwDate,
    /// `TIME_OF_DAY` / `TOD`
    KwTimeOfDay,
    /// `DATE_AND_TIME` / `DT`
    KwDateAndTime,
    /// `STRING`
    KwString,
    /// `WSTRING`
    KwWString,
    /// `CHAR`
    KwChar,
    /// `WCHAR`
    KwWChar,

    // =========================================================================
    // PUNCTUATION AND OPERATORS
    // =========================================================================
    /// `;`
    Semicolon,
    /// `:`
    Colon,
    /// `,`
    Comma,
    /// `.`
    Dot,
    /// `..`
    DotDot,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `#`
    Hash,
    /// `^`
    Caret,
    /// `:=`
    Assign,
    /// `=>`
    Arrow,
    /// `=`
    Eq,
    /// `<>`
    Neq,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `**`
    Power,
    /// `&`
    Ampersand,

    // =========================================================================
    // LITERALS
    // =========================================================================
    /// Integer literal: `42`, `1_000`, `16#FF`
    IntLiteral,
    /// Real literal: `3.14`, `1.0E10`, `2e-3`
    RealLiteral,
    /// Single-quoted string literal
    StringLiteral,
    /// Double-quoted (wide) string literal
    WideStringLiteral,
    /// Duration literal: `T#5s`, `TIME#1h30m`
    TimeLiteral,
    /// Date literal: `D#2024-01-15`
    DateLiteral,
    /// Time-of-day literal: `TOD#14:30:00`
    TimeOfDayLiteral,
    /// Date-and-time literal: `DT#2024-01-15-14:30:00`
    DateAndTimeLiteral,
    /// Direct I/O address: `%IX0.0`, `%QW10`
    DirectAddress,

    // =========================================================================
    // SPECIAL
    // =========================================================================
    /// Block or line comment
    Comment,
    /// Pragma: `{ ... }`
    Pragma,
    /// Identifier
    Ident,
    /// Unrecognized input
    Unknown,
    /// End of input (exactly one, always last)
    Eof,
}

static KEYWORDS: &[(&str, TokenKind)] = &[
    ("PROGRAM", TokenKind::KwProgram),
    ("END_PROGRAM", TokenKind::KwEndProgram),
    ("FUNCTION_BLOCK", TokenKind::KwFunctionBlock),
    ("END_FUNCTION_BLOCK", TokenKind::KwEndFunctionBlock),
    ("FUNCTION", TokenKind::KwFunction),
    ("END_FUNCTION", TokenKind::KwEndFunction),
    ("CLASS", TokenKind::KwClass),
    ("END_CLASS", TokenKind::KwEndClass),
    ("INTERFACE", TokenKind::KwInterface),
    ("END_INTERFACE", TokenKind::KwEndInterface),
    ("METHOD", TokenKind::KwMethod),
    ("END_METHOD", TokenKind::KwEndMethod),
    ("PROPERTY", TokenKind::KwProperty),
    ("END_PROPERTY", TokenKind::KwEndProperty),
    ("ACTION", TokenKind::KwAction),
    ("END_ACTION", TokenKind::KwEndAction),
    ("EXTENDS", TokenKind::KwExtends),
    ("IMPLEMENTS", TokenKind::KwImplements),
    ("CONFIGURATION", TokenKind::KwConfiguration),
    ("END_CONFIGURATION", TokenKind::KwEndConfiguration),
    ("RESOURCE", TokenKind::KwResource),
    ("END_RESOURCE", TokenKind::KwEndResource),
    ("TYPE", TokenKind::KwType),
    ("END_TYPE", TokenKind::KwEndType),
    ("STRUCT", TokenKind::KwStruct),
    ("END_STRUCT", TokenKind::KwEndStruct),
    ("VAR", TokenKind::KwVar),
    ("VAR_INPUT", TokenKind::KwVarInput),
    ("VAR_OUTPUT", TokenKind::KwVarOutput),
    ("VAR_IN_OUT", TokenKind::KwVarInOut),
    ("VAR_GLOBAL", TokenKind::KwVarGlobal),
    ("VAR_TEMP", TokenKind::KwVarTemp),
    ("VAR_EXTERNAL", TokenKind::KwVarExternal),
    ("VAR_STAT", TokenKind::KwVarStat),
    ("END_VAR", TokenKind::KwEndVar),
    ("CONSTANT", TokenKind::KwConstant),
    ("RETAIN", TokenKind::KwRetain),
    ("NON_RETAIN", TokenKind::KwNonRetain),
    ("PERSISTENT", TokenKind::KwPersistent),
    ("AT", TokenKind::KwAt),
    ("PUBLIC", TokenKind::KwPublic),
    ("PRIVATE", TokenKind::KwPrivate),
    ("PROTECTED", TokenKind::KwProtected),
    ("INTERNAL", TokenKind::KwInternal),
    ("ABSTRACT", TokenKind::KwAbstract),
    ("FINAL", TokenKind::KwFinal),
    ("OVERRIDE", TokenKind::KwOverride),
    ("IF", TokenKind::KwIf),
    ("THEN", TokenKind::KwThen),
    ("ELSIF", TokenKind::KwElsif),
    ("ELSE", TokenKind::KwElse),
    ("END_IF", TokenKind::KwEndIf),
    ("CASE", TokenKind::KwCase),
    ("OF", TokenKind::KwOf),
    ("END_CASE", TokenKind::KwEndCase),
    ("FOR", TokenKind::KwFor),
    ("TO", TokenKind::KwTo),
    ("BY", TokenKind::KwBy),
    ("DO", TokenKind::KwDo),
    ("END_FOR", TokenKind::KwEndFor),
    ("WHILE", TokenKind::KwWhile),
    ("END_WHILE", TokenKind::KwEndWhile),
    ("REPEAT", TokenKind::KwRepeat),
    ("UNTIL", TokenKind::KwUntil),
    ("END_REPEAT", TokenKind::KwEndRepeat),
    ("RETURN", TokenKind::KwReturn),
    ("EXIT", TokenKind::KwExit),
    ("CONTINUE", TokenKind::KwContinue),
    ("AND", TokenKind::KwAnd),
    ("OR", TokenKind::KwOr),
    ("XOR", TokenKind::KwXor),
    ("NOT", TokenKind::KwNot),
    ("MOD", TokenKind::KwMod),
    ("TRUE", TokenKind::KwTrue),
    ("FALSE", TokenKind::KwFalse),
    ("ARRAY", TokenKind::KwArray),
    ("POINTER", TokenKind::KwPointer),
    ("REF_TO", TokenKind::KwRefTo),
    ("BOOL", TokenKind::KwBool),
    ("BYTE", TokenKind::KwByte),
    ("WORD", TokenKind::KwWord),
    ("DWORD", TokenKind::KwDword),
    ("LWORD", TokenKind::KwLword),
    ("SINT", TokenKind::KwSint),
    ("INT", TokenKind::KwInt),
    ("DINT", TokenKind::KwDint),
    ("LINT", TokenKind::KwLint),
    ("USINT", TokenKind::KwUsint),
    ("UINT", TokenKind::KwUint),
    ("UDINT", TokenKind::KwUdint),
    ("ULINT", TokenKind::KwUlint),
    ("REAL", TokenKind::KwReal),
    ("LREAL", TokenKind::KwLreal),
    ("TIME", TokenKind::KwTime),
    ("DATE", TokenKind::KwDate),
    ("TIME_OF_DAY", TokenKind::KwTimeOfDay),
    ("TOD", TokenKind::KwTimeOfDay),
    ("DATE_AND_TIME", TokenKind::KwDateAndTime),
    ("DT", TokenKind::KwDateAndTime),
    ("STRING", TokenKind::KwString),
    ("WSTRING", TokenKind::KwWString),
    ("CHAR", TokenKind::KwChar),
    ("WCHAR", TokenKind::KwWChar),
];

static KEYWORD_TABLE: Lazy<FxHashMap<&'static str, TokenKind>> =
    Lazy::new(|| KEYWORDS.iter().copied().collect());

/// Looks up a word in the keyword table (case-insensitive).
#[must_use]
pub fn keyword_kind(word: &str) -> Option<TokenKind> {
    KEYWORD_TABLE.get(word.to_ascii_uppercase().as_str()).copied()
}

impl RawToken {
    pub(crate) fn to_kind(self, text: &str) -> Option<TokenKind> {
        Some(match self {
            Self::Whitespace => return None,
            Self::LineComment | Self::BlockComment => TokenKind::Comment,
            Self::Pragma => TokenKind::Pragma,
            Self::SingleQuoted => TokenKind::StringLiteral,
            Self::DoubleQuoted => TokenKind::WideStringLiteral,
            Self::Number(NumberShape::Integer) => TokenKind::IntLiteral,
            Self::Number(NumberShape::Real) => TokenKind::RealLiteral,
            Self::Word(WordShape::Time) => TokenKind::TimeLiteral,
            Self::Word(WordShape::Date) => TokenKind::DateLiteral,
            Self::Word(WordShape::TimeOfDay) => TokenKind::TimeOfDayLiteral,
            Self::Word(WordShape::DateAndTime) => TokenKind::DateAndTimeLiteral,
            Self::Word(WordShape::Word) => keyword_kind(text).unwrap_or(TokenKind::Ident),
            Self::DirectAddress => TokenKind::DirectAddress,
            Self::Semicolon => TokenKind::Semicolon,
            Self::Colon => TokenKind::Colon,
            Self::Comma => TokenKind::Comma,
            Self::Dot => TokenKind::Dot,
            Self::DotDot => TokenKind::DotDot,
            Self::LParen => TokenKind::LParen,
            Self::RParen => TokenKind::RParen,
            Self::LBracket => TokenKind::LBracket,
            Self::RBracket => TokenKind::RBracket,
            Self::Hash => TokenKind::Hash,
            Self::Caret => TokenKind::Caret,
            Self::Assign => TokenKind::Assign,
            Self::Arrow => TokenKind::Arrow,
            Self::Eq => TokenKind::Eq,
            Self::Neq => TokenKind::Neq,
            Self::Lt => TokenKind::Lt,
            Self::LtEq => TokenKind::LtEq,
            Self::Gt => TokenKind::Gt,
            Self::GtEq => TokenKind::GtEq,
            Self::Plus => TokenKind::Plus,
            Self::Minus => TokenKind::Minus,
            Self::Star => TokenKind::Star,
            Self::Slash => TokenKind::Slash,
            Self::Power => TokenKind::Power,
            Self::Ampersand => TokenKind::Ampersand,
        })
    }
}

impl TokenKind {
    /// Returns `true` if this token starts a Program Organization Unit.
    pub fn is_pou_keyword(self) -> bool {
        matches!(
            self,
            Self::KwProgram
                | Self::KwFunctionBlock
                | Self::KwFunction
                | Self::KwClass
                | Self::KwInterface
        )
    }

    /// Returns the terminal keyword matching a POU or method keyword.
    pub fn terminal(self) -> Option<TokenKind> {
        Some(match self {
            Self::KwProgram => Self::KwEndProgram,
            Self::KwFunctionBlock => Self::KwEndFunctionBlock,
            Self::KwFunction => Self::KwEndFunction,
            Self::KwClass => Self::KwEndClass,
            Self::KwInterface => Self::KwEndInterface,
            Self::KwMethod => Self::KwEndMethod,
            _ => return None,
        })
    }

    /// Returns `true` if this token opens a variable section.
    pub fn is_var_keyword(self) -> bool {
        matches!(
            self,
            Self::KwVar
                | Self::KwVarInput
                | Self::KwVarOutput
                | Self::KwVarInOut
                | Self::KwVarGlobal
                | Self::KwVarTemp
                | Self::KwVarExternal
                | Self::KwVarStat
        )
    }

    /// Returns `true` if this token is a variable-section modifier.
    pub fn is_var_modifier(self) -> bool {
        matches!(
            self,
            Self::KwConstant | Self::KwRetain | Self::KwNonRetain | Self::KwPersistent
        )
    }

    /// Returns `true` if this token is an access or inheritance modifier.
    pub fn is_member_modifier(self) -> bool {
        matches!(
            self,
            Self::KwPublic
                | Self::KwPrivate
                | Self::KwProtected
                | Self::KwInternal
                | Self::KwAbstract
                | Self::KwFinal
                | Self::KwOverride
        )
    }

    /// Returns `true` if this token names an elementary or generic type.
    pub fn is_type_keyword(self) -> bool {
        matches!(
            self,
            Self::KwArray
                | Self::KwPointer
                | Self::KwRefTo
                | Self::KwBool
                | Self::KwByte
                | Self::KwWord
                | Self::KwDword
                | Self::KwLword
                | Self::KwSint
                | Self::KwInt
                | Self::KwDint
                | Self::KwLint
                | Self::KwUsint
                | Self::KwUint
                | Self::KwUdint
                | Self::KwUlint
                | Self::KwReal
                | Self::KwLreal
                | Self::KwTime
                | Self::KwDate
                | Self::KwTimeOfDay
                | Self::KwDateAndTime
                | Self::KwString
                | Self::KwWString
                | Self::KwChar
                | Self::KwWChar
        )
    }

    /// Returns `true` if this token is a literal.
    pub fn is_literal(self) -> bool {
        matches!(
            self,
            Self::IntLiteral
                | Self::RealLiteral
                | Self::StringLiteral
                | Self::WideStringLiteral
                | Self::TimeLiteral
                | Self::DateLiteral
                | Self::TimeOfDayLiteral
                | Self::DateAndTimeLiteral
                | Self::KwTrue
                | Self::KwFalse
        )
    }

    /// Returns `true` for tokens the grammar never looks at.
    pub fn is_trivia(self) -> bool {
        matches!(self, Self::Comment | Self::Pragma)
    }

    /// Returns `true` if this token is a keyword.
    pub fn is_keyword(self) -> bool {
        KEYWORDS.iter().any(|(_, kind)| *kind == self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(input: &str) -> Vec<(Result<RawToken, ()>, &str)> {
        RawToken::lexer(input)
            .spanned()
            .map(|(tok, span)| (tok, &input[span]))
            .filter(|(tok, _)| *tok != Ok(RawToken::Whitespace))
            .collect()
    }

    #[test]
    fn test_keywords_case_insensitive() {
        for word in ["PROGRAM", "program", "Program", "PrOgRaM"] {
            assert_eq!(keyword_kind(word), Some(TokenKind::KwProgram));
        }
        assert_eq!(keyword_kind("Motor"), None);
    }

    #[test]
    fn test_nested_comment_is_one_token() {
        let tokens = raw("(* a (* b *) c *) x");
        assert_eq!(tokens[0], (Ok(RawToken::BlockComment), "(* a (* b *) c *)"));
        assert_eq!(tokens.len(), 2);
    }

    #[test]
    fn test_number_shapes() {
        let tokens = raw("1_000 3.14 1.0E10 2e-3 16#FF 1..10");
        let kinds: Vec<_> = tokens.iter().map(|(tok, _)| *tok).collect();
        assert_eq!(
            kinds,
            vec![
                Ok(RawToken::Number(NumberShape::Integer)),
                Ok(RawToken::Number(NumberShape::Real)),
                Ok(RawToken::Number(NumberShape::Real)),
                Ok(RawToken::Number(NumberShape::Real)),
                Ok(RawToken::Number(NumberShape::Integer)),
                Ok(RawToken::Number(NumberShape::Integer)),
                Ok(RawToken::DotDot),
                Ok(RawToken::Number(NumberShape::Integer)),
            ]
        );
        assert_eq!(tokens[4].1, "16#FF");
    }

    #[test]
    fn test_time_prefix_needs_hash() {
        let tokens = raw("T#1h30m t TIME DT#2024-01-15-14:30:00");
        assert_eq!(tokens[0], (Ok(RawToken::Word(WordShape::Time)), "T#1h30m"));
        assert_eq!(tokens[1], (Ok(RawToken::Word(WordShape::Word)), "t"));
        assert_eq!(tokens[2], (Ok(RawToken::Word(WordShape::Word)), "TIME"));
        assert_eq!(
            tokens[3],
            (
                Ok(RawToken::Word(WordShape::DateAndTime)),
                "DT#2024-01-15-14:30:00"
            )
        );
    }

    #[test]
    fn test_string_spans_lines() {
        let tokens = raw("'line one\nline two' x");
        assert_eq!(tokens[0], (Ok(RawToken::SingleQuoted), "'line one\nline two'"));
    }

    #[test]
    fn test_escaped_quote_stays_in_string() {
        let tokens = raw("'it$'s' x");
        assert_eq!(tokens[0], (Ok(RawToken::SingleQuoted), "'it$'s'"));
    }
}
