//! `stmig-syntax` - Lexer, parser, and unit model for IEC 61131-3 Structured Text.
//!
//! This crate turns ST source text into the records the rest of the
//! migration analysis works on:
//!
//! - **Lexer**: Tokenizes source text into a total token stream with 1-based positions
//! - **Parser**: Extracts POUs, variable sections, methods and global variables
//! - **Docstrings**: Classifies and parses documentation comments and attaches them to units
//! - **Vendor detection**: Guesses the PLC tool the file was exported from
//!
//! # Design Principles
//!
//! - **Total**: Every input produces a result; malformed code degrades to diagnostics
//! - **Shallow**: Executable bodies are located, not parsed; behavioral extraction
//!   works on the raw text
//! - **Deterministic**: Identifiers derive from file, line and name
//!
//! # Example
//!
//! ```
//! use stmig_syntax::lexer::{tokenize, TokenKind};
//!
//! let tokens = tokenize("x := 42;");
//! assert_eq!(tokens[0].kind, TokenKind::Ident);
//! assert_eq!(tokens[1].kind, TokenKind::Assign);
//! assert_eq!(tokens[2].kind, TokenKind::IntLiteral);
//! assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::Eof));
//!
//! let result = stmig_syntax::parse("PROGRAM Main\nVAR nState : INT; END_VAR\nEND_PROGRAM", "main.st");
//! assert!(result.success);
//! assert_eq!(result.pous[0].name, "Main");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

pub mod docstring;
pub mod lexer;
pub mod line_index;
pub mod model;
pub mod parser;
pub mod vendor;

pub use lexer::{tokenize, Token, TokenKind};
pub use line_index::{LineCol, LineIndex};
pub use model::{
    Comment, CommentKind, DocParam, Docstring, HistoryEntry, Method, Pou, PouType,
    SourceLocation, VarSection, Variable,
};
pub use parser::{
    parse, parse_with_options, ParseCode, ParseConfidence, ParseDiagnostic, ParseMetadata,
    ParseOptions, ParseResult,
};
pub use vendor::{detect_vendor, Vendor};
