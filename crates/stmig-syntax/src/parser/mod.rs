//! Parser for IEC 61131-3 Structured Text.
//!
//! A hand-written recursive descent parser that extracts Program Organization
//! Units, their variable sections and methods, global variables, comments and
//! docstrings from a token stream.
//!
//! # Design
//!
//! The parser is meant for analysis of code that is about to be migrated, so
//! it never gives up on a file:
//!
//! - **Error-tolerant**: diagnostics are values, and a malformed construct only
//!   discards tokens up to the next POU or variable-section keyword
//! - **Shallow bodies**: executable statements are not parsed; only the first
//!   and last body lines are recorded for the extractors and scorer
//! - **Best-effort documentation**: docstrings attach to the unit they sit next
//!   to, within a small line tolerance

#![allow(clippy::module_inception)]

mod grammar;
mod parser;
mod source;

pub use parser::{parse, parse_with_options};

use serde::{Deserialize, Serialize};

use crate::model::{Comment, Docstring, Pou, Variable};
use crate::vendor::Vendor;

/// Default number of lines a docstring may sit away from its unit.
pub const DEFAULT_ADJACENCY_TOLERANCE: u32 = 2;

/// Parser options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ParseOptions {
    /// Maximum distance, in lines, between a docstring and the unit it documents.
    pub adjacency_tolerance: u32,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            adjacency_tolerance: DEFAULT_ADJACENCY_TOLERANCE,
        }
    }
}

/// Stable parse diagnostic codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParseCode {
    /// A token that cannot start or continue the current construct.
    UnexpectedToken,
    /// A POU or method without a name.
    MissingName,
    /// A declaration without `:` and a type.
    MissingColon,
    /// A declaration without a terminating `;`.
    MissingSemicolon,
    /// A unit closed by a new POU keyword or end of input.
    MissingEnd,
    /// An `END_*` keyword with no open construct.
    UnmatchedEnd,
    /// A variable section without `END_VAR`.
    UnterminatedVarSection,
    /// A malformed `ARRAY [..] OF` type.
    InvalidArray,
    /// A malformed `AT` binding.
    InvalidAddress,
    /// A comment or string that runs to end of input.
    UnterminatedLiteral,
}

impl ParseCode {
    /// Returns the diagnostic code string.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::UnexpectedToken => "P001",
            Self::MissingName => "P002",
            Self::MissingColon => "P003",
            Self::MissingSemicolon => "P004",
            Self::MissingEnd => "P005",
            Self::UnmatchedEnd => "P006",
            Self::UnterminatedVarSection => "P007",
            Self::InvalidArray => "P008",
            Self::InvalidAddress => "P009",
            Self::UnterminatedLiteral => "P010",
        }
    }
}

impl std::fmt::Display for ParseCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// A parse error or warning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseDiagnostic {
    /// Stable diagnostic code (`P001`, ...).
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// 1-based line.
    pub line: u32,
    /// 1-based column.
    pub column: u32,
    /// False when the diagnostic made the parse unsuccessful.
    pub recoverable: bool,
}

impl ParseDiagnostic {
    pub(crate) fn new(
        code: ParseCode,
        message: impl Into<String>,
        line: u32,
        column: u32,
        recoverable: bool,
    ) -> Self {
        Self {
            code: code.code().to_string(),
            message: message.into(),
            line,
            column,
            recoverable,
        }
    }
}

impl std::fmt::Display for ParseDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} at {}:{}: {}",
            self.code, self.line, self.column, self.message
        )
    }
}

/// Ordinal confidence that the input really is Structured Text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseConfidence {
    /// No POU was found.
    None,
    /// At least one POU, with more than two errors.
    Possible,
    /// At least one POU and at most two errors.
    Probable,
    /// At least one POU and no errors.
    Definite,
}

impl ParseConfidence {
    /// Derives the confidence from the error and POU counts.
    #[must_use]
    pub fn from_counts(error_count: usize, pou_count: usize) -> Self {
        match (error_count, pou_count) {
            (_, 0) => Self::None,
            (0, _) => Self::Definite,
            (1..=2, _) => Self::Probable,
            _ => Self::Possible,
        }
    }
}

/// Facts about a parse run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseMetadata {
    /// File path as given by the caller.
    pub file_path: String,
    /// Detected tool vendor.
    pub vendor: Vendor,
    /// Number of source lines.
    pub line_count: usize,
    /// Number of tokens, `Eof` included.
    pub token_count: usize,
    /// Ordinal parse confidence.
    pub confidence: ParseConfidence,
}

/// Result of parsing one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseResult {
    /// True iff no non-recoverable error occurred.
    pub success: bool,
    /// Program Organization Units in source order.
    pub pous: Vec<Pou>,
    /// Variables declared outside any POU.
    pub global_variables: Vec<Variable>,
    /// Every docstring, associated or not.
    pub docstrings: Vec<Docstring>,
    /// Every comment in the file.
    pub comments: Vec<Comment>,
    /// Errors, recoverable or not.
    pub errors: Vec<ParseDiagnostic>,
    /// Warnings.
    pub warnings: Vec<ParseDiagnostic>,
    /// Run metadata.
    pub metadata: ParseMetadata,
}

impl ParseResult {
    /// Returns a POU by name (case-insensitive).
    #[must_use]
    pub fn pou(&self, name: &str) -> Option<&Pou> {
        self.pous.iter().find(|pou| pou.name.eq_ignore_ascii_case(name))
    }

    /// Returns every declared variable, globals first.
    pub fn all_variables(&self) -> impl Iterator<Item = &Variable> {
        self.global_variables.iter().chain(self.pous.iter().flat_map(|pou| {
            pou.variables
                .iter()
                .chain(pou.methods.iter().flat_map(|method| method.variables.iter()))
        }))
    }

    /// Returns the non-recoverable errors.
    pub fn fatal_errors(&self) -> impl Iterator<Item = &ParseDiagnostic> {
        self.errors.iter().filter(|error| !error.recoverable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_ladder() {
        assert_eq!(ParseConfidence::from_counts(0, 0), ParseConfidence::None);
        assert_eq!(ParseConfidence::from_counts(5, 0), ParseConfidence::None);
        assert_eq!(ParseConfidence::from_counts(0, 1), ParseConfidence::Definite);
        assert_eq!(ParseConfidence::from_counts(2, 3), ParseConfidence::Probable);
        assert_eq!(ParseConfidence::from_counts(3, 1), ParseConfidence::Possible);
        assert!(ParseConfidence::Definite > ParseConfidence::Probable);
    }

    #[test]
    fn codes_are_stable() {
        assert_eq!(ParseCode::UnexpectedToken.code(), "P001");
        assert_eq!(ParseCode::MissingEnd.to_string(), "P005");
    }
}
