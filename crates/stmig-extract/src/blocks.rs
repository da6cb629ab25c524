//! Block structure scan.
//!
//! Finds POU, method, property, action and type headers with their `END_*`
//! keywords in the masked text and nests them with a stack. A missing `END_*`
//! never loses a block: it is closed by the enclosing block's end, by the next
//! top-level header, or by the end of the file.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use stmig_syntax::SourceLocation;
use tracing::debug;

use crate::masked::MaskedSource;

/// Kind of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockKind {
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
    /// `METHOD`
    Method,
    /// `PROPERTY`
    Property,
    /// `ACTION`
    Action,
    /// `TYPE`
    Type,
}

impl BlockKind {
    /// Returns the keyword for this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Program => "PROGRAM",
            Self::FunctionBlock => "FUNCTION_BLOCK",
            Self::Function => "FUNCTION",
            Self::Class => "CLASS",
            Self::Interface => "INTERFACE",
            Self::Method => "METHOD",
            Self::Property => "PROPERTY",
            Self::Action => "ACTION",
            Self::Type => "TYPE",
        }
    }

    fn from_keyword(keyword: &str) -> Option<Self> {
        Some(match keyword.to_ascii_uppercase().as_str() {
            "PROGRAM" => Self::Program,
            "FUNCTION_BLOCK" => Self::FunctionBlock,
            "FUNCTION" => Self::Function,
            "CLASS" => Self::Class,
            "INTERFACE" => Self::Interface,
            "METHOD" => Self::Method,
            "PROPERTY" => Self::Property,
            "ACTION" => Self::Action,
            "TYPE" => Self::Type,
            _ => return None,
        })
    }

    /// Returns true for kinds that live at the top level of a file.
    #[must_use]
    pub const fn is_top_level(self) -> bool {
        !matches!(self, Self::Method | Self::Property | Self::Action)
    }

    /// Returns true for kinds that own executable code and variables.
    #[must_use]
    pub const fn is_pou(self) -> bool {
        matches!(
            self,
            Self::Program | Self::FunctionBlock | Self::Function | Self::Class | Self::Interface
        )
    }

    const fn has_return_type(self) -> bool {
        matches!(self, Self::Function | Self::Method | Self::Property)
    }
}

impl std::fmt::Display for BlockKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A block found in the source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    /// Block name, `UNKNOWN` when missing.
    pub name: SmolStr,
    /// Block kind.
    pub kind: BlockKind,
    /// Header location, with the end of the `END_*` keyword as its end.
    pub location: SourceLocation,
    /// Line of the closing keyword, or the last line it extends to.
    pub end_line: u32,
    /// Base type of `EXTENDS`.
    pub extends: Option<SmolStr>,
    /// Interfaces of `IMPLEMENTS`.
    pub implements: Vec<SmolStr>,
    /// Return type of functions, methods and properties.
    pub return_type: Option<SmolStr>,
    /// Name of the enclosing block.
    pub parent: Option<SmolStr>,
}

impl Block {
    /// Returns true if `line` lies within the block.
    #[must_use]
    pub fn contains_line(&self, line: u32) -> bool {
        (self.location.line..=self.end_line).contains(&line)
    }
}

/// Block counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockSummary {
    /// Number of blocks.
    pub total: usize,
    /// Number of blocks per kind keyword.
    pub by_type: BTreeMap<String, usize>,
}

/// Result of [`extract_blocks`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockExtraction {
    /// Blocks in header order.
    pub blocks: Vec<Block>,
    /// Counts.
    pub summary: BlockSummary,
}

impl BlockExtraction {
    /// Returns the innermost block containing `line`.
    #[must_use]
    pub fn enclosing(&self, line: u32) -> Option<&Block> {
        self.blocks
            .iter()
            .filter(|block| block.contains_line(line))
            .max_by_key(|block| block.location.line)
    }

    /// Returns the innermost POU (program, function block, ...) containing `line`.
    #[must_use]
    pub fn enclosing_pou(&self, line: u32) -> Option<&Block> {
        self.blocks
            .iter()
            .filter(|block| block.kind.is_pou() && block.contains_line(line))
            .max_by_key(|block| block.location.line)
    }
}

fn regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|err| panic!("invalid block pattern {pattern:?}: {err}"))
}

static BLOCK_KEYWORD: Lazy<Regex> = Lazy::new(|| {
    regex(r"(?i)\b(END_)?(FUNCTION_BLOCK|FUNCTION|PROGRAM|CLASS|INTERFACE|METHOD|PROPERTY|ACTION|TYPE)\b")
});
static MODIFIERS: Lazy<Regex> = Lazy::new(|| {
    regex(r"(?i)^\s*(?:(?:PUBLIC|PRIVATE|PROTECTED|INTERNAL|ABSTRACT|FINAL|OVERRIDE)\s+)*")
});
static NAME: Lazy<Regex> = Lazy::new(|| regex(r"^\s*([A-Za-z_][A-Za-z0-9_]*)"));
static TYPE_NAME: Lazy<Regex> = Lazy::new(|| regex(r"^\s*([A-Za-z_][A-Za-z0-9_]*)\s*:"));
static EXTENDS: Lazy<Regex> = Lazy::new(|| regex(r"(?i)\bEXTENDS\s+([A-Za-z_][\w.]*)"));
static IMPLEMENTS: Lazy<Regex> =
    Lazy::new(|| regex(r"(?i)\bIMPLEMENTS\s+([A-Za-z_][\w.]*(?:\s*,\s*[A-Za-z_][\w.]*)*)"));
static RETURN_TYPE: Lazy<Regex> =
    Lazy::new(|| regex(r"^\s*:\s*([A-Za-z_][\w.]*(?:\s*\(\s*\d+\s*\))?)"));
static TASK_BINDING: Lazy<Regex> = Lazy::new(|| regex(r"(?i)\bWITH\b"));

struct Open {
    index: usize,
    kind: BlockKind,
}

/// Extracts the block structure of a source text.
#[must_use]
pub fn extract_blocks(source: &str, file: &str) -> BlockExtraction {
    let masked = MaskedSource::new(source);
    let blocks = scan_blocks(&masked, file);
    debug!(file, blocks = blocks.len(), "extracted blocks");
    BlockExtraction {
        summary: summarize(&blocks),
        blocks,
    }
}

pub(crate) fn scan_blocks(masked: &MaskedSource<'_>, file: &str) -> Vec<Block> {
    let text = masked.masked();
    let last_line = masked.line_count();
    let mut blocks: Vec<Block> = Vec::new();
    let mut stack: Vec<Open> = Vec::new();

    for captures in BLOCK_KEYWORD.captures_iter(text) {
        let Some(whole) = captures.get(0) else { continue };
        let Some(kind) = captures.get(2).and_then(|m| BlockKind::from_keyword(m.as_str())) else {
            continue;
        };
        if whole.start() > 0 && text.as_bytes()[whole.start() - 1] == b'.' {
            continue;
        }
        let pos = masked.line_col(whole.start());

        if captures.get(1).is_some() {
            let Some(depth) = stack.iter().rposition(|open| open.kind == kind) else {
                continue;
            };
            let end = masked.line_col(whole.end());
            for open in stack.drain(depth..) {
                let block = &mut blocks[open.index];
                block.end_line = end.line;
                block.location = block.location.clone().with_end(end.line, end.col);
            }
            continue;
        }

        let rest = rest_of_line(masked, whole.end());
        if kind == BlockKind::Program && TASK_BINDING.is_match(rest) {
            continue;
        }
        if kind.is_top_level() {
            if let Some(depth) = stack.iter().position(|open| open.kind.is_top_level()) {
                let closing_line = pos.line.saturating_sub(1).max(1);
                for open in stack.drain(depth..) {
                    let block = &mut blocks[open.index];
                    block.end_line = closing_line.max(block.location.line);
                    block.location = block.location.clone().with_end(block.end_line, 1);
                }
            }
        }

        let header = parse_header(masked, kind, rest, pos.line);
        let parent = stack.last().map(|open| blocks[open.index].name.clone());
        stack.push(Open {
            index: blocks.len(),
            kind,
        });
        blocks.push(Block {
            name: header.name,
            kind,
            location: SourceLocation::new(file, pos.line, pos.col).with_end(last_line, 1),
            end_line: last_line,
            extends: header.extends,
            implements: header.implements,
            return_type: header.return_type,
            parent,
        });
    }
    blocks
}

struct Header {
    name: SmolStr,
    extends: Option<SmolStr>,
    implements: Vec<SmolStr>,
    return_type: Option<SmolStr>,
}

fn parse_header(masked: &MaskedSource<'_>, kind: BlockKind, rest: &str, line: u32) -> Header {
    let after_modifiers = MODIFIERS.find(rest).map_or(rest, |m| &rest[m.end()..]);
    let end_keyword = BLOCK_KEYWORD.find(after_modifiers).map_or(after_modifiers.len(), |m| m.start());
    let header = &after_modifiers[..end_keyword];

    let named = NAME.captures(header).and_then(|c| c.get(1));
    let mut name = named.map(|m| SmolStr::new(m.as_str()));
    if name.is_none() && kind == BlockKind::Type {
        name = (line + 1..=line.saturating_add(5).min(masked.line_count()))
            .find_map(|next| TYPE_NAME.captures(masked.masked_line(next)))
            .and_then(|c| c.get(1))
            .map(|m| SmolStr::new(m.as_str()));
    }
    let after_name = named.map_or(header, |m| &header[m.end()..]);

    let return_type = if kind.has_return_type() {
        RETURN_TYPE
            .captures(after_name)
            .and_then(|c| c.get(1))
            .map(|m| SmolStr::new(m.as_str()))
    } else {
        None
    };
    let extends = EXTENDS
        .captures(after_name)
        .and_then(|c| c.get(1))
        .map(|m| SmolStr::new(m.as_str()));
    let implements = IMPLEMENTS
        .captures(after_name)
        .and_then(|c| c.get(1))
        .map(|m| {
            m.as_str()
                .split(',')
                .map(|name| SmolStr::new(name.trim()))
                .filter(|name| !name.is_empty())
                .collect()
        })
        .unwrap_or_default();

    Header {
        name: name.unwrap_or_else(|| SmolStr::new_inline("UNKNOWN")),
        extends,
        implements,
        return_type,
    }
}

fn rest_of_line<'m>(masked: &'m MaskedSource<'_>, offset: usize) -> &'m str {
    let text = masked.masked();
    let end = text[offset..].find('\n').map_or(text.len(), |len| offset + len);
    &text[offset..end]
}

fn summarize(blocks: &[Block]) -> BlockSummary {
    let mut by_type = BTreeMap::new();
    for block in blocks {
        *by_type.entry(block.kind.as_str().to_string()).or_insert(0) += 1;
    }
    BlockSummary {
        total: blocks.len(),
        by_type,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nests_methods_under_their_owner() {
        let source = "FUNCTION_BLOCK FB_Axis EXTENDS FB_Base IMPLEMENTS I_Move, I_Home\nVAR END_VAR\nMETHOD PUBLIC MoveTo : BOOL\nEND_METHOD\nEND_FUNCTION_BLOCK\n";
        let result = extract_blocks(source, "axis.st");
        assert_eq!(result.blocks.len(), 2);
        let fb = &result.blocks[0];
        assert_eq!(fb.kind, BlockKind::FunctionBlock);
        assert_eq!(fb.extends.as_deref(), Some("FB_Base"));
        assert_eq!(fb.implements, vec!["I_Move", "I_Home"]);
        assert_eq!((fb.location.line, fb.end_line), (1, 5));
        let method = &result.blocks[1];
        assert_eq!(method.name, "MoveTo");
        assert_eq!(method.return_type.as_deref(), Some("BOOL"));
        assert_eq!(method.parent.as_deref(), Some("FB_Axis"));
        assert_eq!(method.end_line, 4);
        assert_eq!(result.summary.by_type.get("METHOD"), Some(&1));
    }

    #[test]
    fn header_and_end_on_one_line() {
        let result = extract_blocks("FUNCTION F : INT END_FUNCTION\nPROGRAM P END_PROGRAM", "f.st");
        let names: Vec<(&str, u32, u32)> = result
            .blocks
            .iter()
            .map(|b| (b.name.as_str(), b.location.line, b.end_line))
            .collect();
        assert_eq!(names, vec![("F", 1, 1), ("P", 2, 2)]);
        assert_eq!(result.blocks[0].return_type.as_deref(), Some("INT"));
    }

    #[test]
    fn missing_end_is_closed_by_next_top_level_header() {
        let source = "PROGRAM A\nx := 1;\nFUNCTION_BLOCK B\nEND_FUNCTION_BLOCK\n";
        let result = extract_blocks(source, "a.st");
        assert_eq!(result.blocks[0].end_line, 2);
        assert_eq!(result.blocks[1].parent, None);
    }

    #[test]
    fn type_name_on_following_line_and_task_bindings() {
        let source = "TYPE\n  E_State : (IDLE, RUN);\nEND_TYPE\nCONFIGURATION C\n  PROGRAM Inst WITH Fast : Main;\nEND_CONFIGURATION\n";
        let result = extract_blocks(source, "t.st");
        assert_eq!(result.blocks.len(), 1);
        assert_eq!(result.blocks[0].name, "E_State");
        assert_eq!(result.blocks[0].kind, BlockKind::Type);
    }

    #[test]
    fn keywords_in_comments_are_ignored() {
        let result = extract_blocks("(* PROGRAM Fake *)\n// END_PROGRAM\n", "c.st");
        assert!(result.blocks.is_empty());
        assert_eq!(result.summary.total, 0);
    }

    #[test]
    fn enclosing_pou_skips_methods() {
        let source = "FUNCTION_BLOCK FB\nMETHOD M\nx := 1;\nEND_METHOD\nEND_FUNCTION_BLOCK";
        let result = extract_blocks(source, "fb.st");
        assert_eq!(result.enclosing(3).map(|b| b.name.as_str()), Some("M"));
        assert_eq!(result.enclosing_pou(3).map(|b| b.name.as_str()), Some("FB"));
        assert!(result.enclosing_pou(9).is_none());
    }
}
