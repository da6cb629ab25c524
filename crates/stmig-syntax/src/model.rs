//! Records produced by the parser and shared with the extractors.
//!
//! All records serialize with camelCase field names. They are created once
//! per file pass and never mutated after being returned.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// A position in a source file. Lines are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceLocation {
    /// File path, relative to the project root, used verbatim.
    pub file: SmolStr,
    /// 1-based start line.
    pub line: u32,
    /// 1-based start column.
    pub column: u32,
    /// 1-based end line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_line: Option<u32>,
    /// 1-based end column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_column: Option<u32>,
}

impl SourceLocation {
    /// Creates a point location.
    pub fn new(file: impl Into<SmolStr>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
            end_line: None,
            end_column: None,
        }
    }

    /// Adds an end position.
    #[must_use]
    pub fn with_end(mut self, end_line: u32, end_column: u32) -> Self {
        self.end_line = Some(end_line);
        self.end_column = Some(end_column);
        self
    }

    /// Returns the last line covered by this location.
    #[must_use]
    pub fn last_line(&self) -> u32 {
        self.end_line.unwrap_or(self.line)
    }
}

/// Kind of Program Organization Unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PouType {
    /// `PROGRAM`
    Program,
    /// `FUNCTION_BLOCK`
    FunctionBlock,
    /// `FUNCTION`
    Function,
    /// `CLASS`
    Class,
    /// `INTERFACE`
    Interface,
}

impl PouType {
    /// Returns the keyword spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Program => "PROGRAM",
            Self::FunctionBlock => "FUNCTION_BLOCK",
            Self::Function => "FUNCTION",
            Self::Class => "CLASS",
            Self::Interface => "INTERFACE",
        }
    }
}

impl std::fmt::Display for PouType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Variable section a declaration belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VarSection {
    /// `VAR`
    Var,
    /// `VAR_INPUT`
    VarInput,
    /// `VAR_OUTPUT`
    VarOutput,
    /// `VAR_IN_OUT`
    VarInOut,
    /// `VAR_GLOBAL`
    VarGlobal,
    /// `VAR_TEMP`
    VarTemp,
    /// `VAR CONSTANT`
    VarConstant,
    /// `VAR_EXTERNAL`
    VarExternal,
}

impl VarSection {
    /// Returns the keyword spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Var => "VAR",
            Self::VarInput => "VAR_INPUT",
            Self::VarOutput => "VAR_OUTPUT",
            Self::VarInOut => "VAR_IN_OUT",
            Self::VarGlobal => "VAR_GLOBAL",
            Self::VarTemp => "VAR_TEMP",
            Self::VarConstant => "VAR_CONSTANT",
            Self::VarExternal => "VAR_EXTERNAL",
        }
    }

    /// Parses a section keyword (case-insensitive). `VAR_STAT` maps to `VAR`.
    #[must_use]
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Some(match keyword.to_ascii_uppercase().as_str() {
            "VAR" | "VAR_STAT" => Self::Var,
            "VAR_INPUT" => Self::VarInput,
            "VAR_OUTPUT" => Self::VarOutput,
            "VAR_IN_OUT" => Self::VarInOut,
            "VAR_GLOBAL" => Self::VarGlobal,
            "VAR_TEMP" => Self::VarTemp,
            "VAR_CONSTANT" => Self::VarConstant,
            "VAR_EXTERNAL" => Self::VarExternal,
            _ => return None,
        })
    }

    /// Returns true for sections that feed values into the unit.
    #[must_use]
    pub const fn is_input(self) -> bool {
        matches!(self, Self::VarInput | Self::VarInOut)
    }

    /// Returns true for sections that carry values out of the unit.
    #[must_use]
    pub const fn is_output(self) -> bool {
        matches!(self, Self::VarOutput | Self::VarInOut)
    }
}

impl std::fmt::Display for VarSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A declared variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
    /// Stable identifier derived from owner, name and line.
    pub id: String,
    /// Declared name.
    pub name: SmolStr,
    /// Declared type text (`INT`, `STRING(80)`, `ARRAY [1..10] OF REAL`).
    pub data_type: SmolStr,
    /// Section the declaration lives in.
    pub section: VarSection,
    /// Initializer source text after `:=`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_value: Option<String>,
    /// Same-line trailing comment, without delimiters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// True for `ARRAY [..] OF` declarations.
    pub is_array: bool,
    /// Array bounds text (`1..10, 0..3`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub array_bounds: Option<String>,
    /// Derived from the safety name tables.
    pub is_safety_critical: bool,
    /// `AT` binding (`%IX0.0`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub io_address: Option<SmolStr>,
    /// Declaration location.
    pub location: SourceLocation,
}

impl Variable {
    /// Returns true if the declaration carries a non-empty comment.
    #[must_use]
    pub fn is_documented(&self) -> bool {
        self.comment.as_deref().is_some_and(|c| !c.trim().is_empty())
    }

    /// Returns true if the declared type is `BOOL` or a vendor safe boolean.
    #[must_use]
    pub fn is_bool_like(&self) -> bool {
        is_bool_like_type(&self.data_type)
    }
}

/// Returns true if a type name is `BOOL`-like (`BOOL`, `SAFEBOOL`, `BIT`).
#[must_use]
pub fn is_bool_like_type(data_type: &str) -> bool {
    matches!(
        data_type.trim().to_ascii_uppercase().as_str(),
        "BOOL" | "SAFEBOOL" | "BIT" | "SAFE_BOOL"
    )
}

/// A documented `@param`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocParam {
    /// Parameter name.
    pub name: SmolStr,
    /// Parameter description.
    pub description: String,
}

/// A dated change-history line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// `YYYY-MM-DD` date.
    pub date: SmolStr,
    /// Author initials or name, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<SmolStr>,
    /// Change description.
    pub description: String,
}

/// A structured documentation comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Docstring {
    /// Stable identifier derived from file and line.
    pub id: String,
    /// First unmarked line.
    pub summary: String,
    /// Subsequent unmarked lines, newline-joined.
    pub description: String,
    /// `@param` entries.
    pub params: Vec<DocParam>,
    /// `@returns` text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returns: Option<String>,
    /// `@author` / `Auth:` text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// `@date` / `Date:` text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Dated history entries.
    pub history: Vec<HistoryEntry>,
    /// `WARNING`/`DANGER`/`CAUTION` lines.
    pub warnings: Vec<String>,
    /// `NOTE` lines.
    pub notes: Vec<String>,
    /// Original comment text including delimiters.
    pub raw: String,
    /// Location of the comment.
    pub location: SourceLocation,
    /// Name of the unit the docstring documents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub associated_block: Option<SmolStr>,
    /// Kind of the unit the docstring documents (`PROGRAM`, `METHOD`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub associated_block_type: Option<SmolStr>,
}

impl Docstring {
    /// Returns the description of a documented parameter (case-insensitive).
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&DocParam> {
        self.params
            .iter()
            .find(|param| param.name.eq_ignore_ascii_case(name))
    }
}

/// Comment delimiter style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentKind {
    /// `(* ... *)` or `/* ... */`
    Block,
    /// `// ...`
    Line,
}

/// A source comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    /// Comment body without delimiters, trimmed.
    pub text: String,
    /// Delimiter style.
    pub kind: CommentKind,
    /// Location of the comment.
    pub location: SourceLocation,
}

/// A `METHOD` nested in a function block, class, or interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Method {
    /// Stable identifier.
    pub id: String,
    /// Method name (`UNKNOWN` when missing).
    pub name: SmolStr,
    /// Access modifier (`PUBLIC`, `PRIVATE`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access: Option<SmolStr>,
    /// Return type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<SmolStr>,
    /// Header location.
    pub location: SourceLocation,
    /// Associated docstring.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation: Option<Docstring>,
    /// Method-local variables.
    pub variables: Vec<Variable>,
    /// First body line.
    pub body_start_line: u32,
    /// Last body line (the `END_METHOD` line).
    pub body_end_line: u32,
}

/// A Program Organization Unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pou {
    /// Stable identifier derived from file, kind and name.
    pub id: String,
    /// Unit kind.
    #[serde(rename = "type")]
    pub pou_type: PouType,
    /// Unit name (`UNKNOWN` when missing).
    pub name: SmolStr,
    /// Header location; `end_line` is the terminal keyword line.
    pub location: SourceLocation,
    /// Associated docstring.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation: Option<Docstring>,
    /// Variables of every section, in declaration order.
    pub variables: Vec<Variable>,
    /// `EXTENDS` base.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<SmolStr>,
    /// `IMPLEMENTS` interfaces.
    pub implements: Vec<SmolStr>,
    /// Nested methods.
    pub methods: Vec<Method>,
    /// `FUNCTION` return type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<SmolStr>,
    /// First executable line.
    pub body_start_line: u32,
    /// Last line of the unit.
    pub body_end_line: u32,
}

impl Pou {
    /// Returns the variables of one section.
    pub fn variables_in(&self, section: VarSection) -> impl Iterator<Item = &Variable> {
        self.variables.iter().filter(move |var| var.section == section)
    }

    /// Returns input variables (`VAR_INPUT`, `VAR_IN_OUT`).
    pub fn inputs(&self) -> impl Iterator<Item = &Variable> {
        self.variables.iter().filter(|var| var.section.is_input())
    }

    /// Returns output variables (`VAR_OUTPUT`, `VAR_IN_OUT`).
    pub fn outputs(&self) -> impl Iterator<Item = &Variable> {
        self.variables.iter().filter(|var| var.section.is_output())
    }

    /// Returns the number of body lines.
    #[must_use]
    pub fn body_length(&self) -> u32 {
        self.body_end_line.saturating_sub(self.body_start_line) + 1
    }

    /// Returns the first and last source line the unit spans.
    #[must_use]
    pub fn line_span(&self) -> (u32, u32) {
        (self.location.line, self.location.last_line().max(self.body_end_line))
    }

    /// Finds a variable by name (case-insensitive), methods included.
    #[must_use]
    pub fn find_variable(&self, name: &str) -> Option<&Variable> {
        self.variables
            .iter()
            .chain(self.methods.iter().flat_map(|method| method.variables.iter()))
            .find(|var| var.name.eq_ignore_ascii_case(name))
    }
}

/// Builds a stable identifier from parts.
#[must_use]
pub fn make_id(kind: &str, file: &str, line: u32, name: &str) -> String {
    format!("{kind}:{file}:{line}:{name}")
}
