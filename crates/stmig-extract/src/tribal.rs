//! Tribal knowledge: the warnings, workarounds and unexplained constants that
//! live only in comments.
//!
//! Each comment yields at most one item, classified by the first marker
//! family it matches. Numeric literals on a code line that carries a trailing
//! comment are reported as commented magic numbers.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use stmig_syntax::SourceLocation;
use tracing::debug;

use crate::comments::looks_like_code;
use crate::masked::{CommentSpan, MaskedSource};
use crate::severity::Severity;

/// Kind of a knowledge item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KnowledgeType {
    /// `WARNING`, `CAUTION`, `DANGER`.
    Warning,
    /// Hacks and temporary fixes.
    Workaround,
    /// Open work.
    Todo,
    /// Explicit instruction not to change something.
    DoNotChange,
    /// Change history.
    History,
    /// A literal explained only by its comment.
    MagicNumber,
    /// Safety-related remark.
    SafetyNote,
    /// Why the code is the way it is.
    Explanation,
}

impl KnowledgeType {
    /// Returns the serialized name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Workaround => "workaround",
            Self::Todo => "todo",
            Self::DoNotChange => "do-not-change",
            Self::History => "history",
            Self::MagicNumber => "magic-number",
            Self::SafetyNote => "safety-note",
            Self::Explanation => "explanation",
        }
    }
}

/// A piece of knowledge found in the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TribalKnowledge {
    /// Item kind.
    #[serde(rename = "type")]
    pub kind: KnowledgeType,
    /// Comment text, whitespace collapsed.
    pub content: String,
    /// How much losing it would hurt.
    pub importance: Severity,
    /// Where it was found.
    pub location: SourceLocation,
    /// The code it refers to.
    pub context: Option<String>,
}

/// Knowledge counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TribalSummary {
    /// Number of items.
    pub total: usize,
    /// Items per kind.
    pub by_type: BTreeMap<String, usize>,
    /// Items per importance.
    pub by_importance: BTreeMap<String, usize>,
}

/// Result of [`extract_tribal_knowledge`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TribalKnowledgeExtraction {
    /// Items in source order.
    pub items: Vec<TribalKnowledge>,
    /// Counts.
    pub summary: TribalSummary,
}

fn regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|err| panic!("invalid tribal marker {pattern:?}: {err}"))
}

/// Marker families in priority order.
static MARKERS: Lazy<Vec<(KnowledgeType, Regex)>> = Lazy::new(|| {
    vec![
        (
            KnowledgeType::DoNotChange,
            regex(r"(?i)\b(?:do\s+not|don'?t|never)\s+(?:change|modify|touch|remove|edit|delete)\b|\bleave\s+as\s+is\b|\bmust\s+not\s+be\s+(?:changed|modified)\b"),
        ),
        (
            KnowledgeType::Warning,
            regex(r"(?i)\b(?:warning|danger|caution|attention|achtung|careful)\b"),
        ),
        (
            KnowledgeType::SafetyNote,
            regex(r"(?i)\b(?:safety|interlock|e-?stop|emergency|hazard|lockout|SIL\s*[1-4])\b"),
        ),
        (
            KnowledgeType::Workaround,
            regex(r"(?i)\b(?:workaround|work-around|hack|kludge|quick\s*fix|temporary\s+fix|fixme|xxx)\b"),
        ),
        (KnowledgeType::Todo, regex(r"(?i)\b(?:todo|tbd)\b")),
        (
            KnowledgeType::Explanation,
            regex(r"(?i)\b(?:because|reason|due\s+to|needed\s+(?:for|because)|required\s+(?:for|by)|otherwise|so\s+that)\b"),
        ),
        (
            KnowledgeType::History,
            regex(r"(?i)\b(?:changed|modified|added|removed|fixed)\s+(?:by|on|in)\b|\b\d{4}-\d{2}-\d{2}\b|\bv\d+\.\d+\b|\brev(?:ision)?\.?\s*\d+"),
        ),
    ]
});

static SAFETY_WORD: Lazy<Regex> =
    Lazy::new(|| regex(r"(?i)\b(?:safety|interlock|e-?stop|emergency|injury|hazard)\b"));
static NUMBER: Lazy<Regex> = Lazy::new(|| regex(r"\d+(?:\.\d+)?"));

const CONTEXT_WIDTH: usize = 120;
const CONTEXT_LOOKAHEAD_LINES: u32 = 3;

fn importance(kind: KnowledgeType, content: &str) -> Severity {
    match kind {
        KnowledgeType::DoNotChange => Severity::Critical,
        KnowledgeType::Warning if SAFETY_WORD.is_match(content) => Severity::Critical,
        KnowledgeType::Warning | KnowledgeType::SafetyNote | KnowledgeType::Workaround => Severity::High,
        KnowledgeType::Todo | KnowledgeType::Explanation | KnowledgeType::MagicNumber => Severity::Medium,
        KnowledgeType::History => Severity::Low,
    }
}

fn classify(content: &str) -> Option<KnowledgeType> {
    MARKERS
        .iter()
        .find(|(_, marker)| marker.is_match(content))
        .map(|(kind, _)| *kind)
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn clip(text: &str) -> String {
    text.chars().take(CONTEXT_WIDTH).collect()
}

/// The code of a line, trimmed, or `None` when the line has no code.
fn code_on_line(masked: &MaskedSource<'_>, line: u32) -> Option<String> {
    let range = masked.line_range(line);
    if !masked.has_code(range.clone()) {
        return None;
    }
    Some(clip(&collapse(masked.code_text(range))))
}

/// The same-line code of an inline comment, else the next code line.
fn context_of(masked: &MaskedSource<'_>, comment: &CommentSpan) -> Option<String> {
    if masked.has_code_before(comment) {
        let range = masked.line_range(comment.start.line);
        return Some(clip(&collapse(masked.code_text(range.start..comment.range.start))));
    }
    let last = masked.line_count();
    (comment.end.line + 1..=comment.end.line.saturating_add(CONTEXT_LOOKAHEAD_LINES).min(last))
        .find_map(|line| code_on_line(masked, line))
}

fn is_number_boundary(byte: Option<&u8>) -> bool {
    byte.map_or(true, |b| !(b.is_ascii_alphanumeric() || matches!(b, b'_' | b'#' | b'.')))
}

fn magic_numbers(masked: &MaskedSource<'_>, file: &str, items: &mut Vec<TribalKnowledge>) {
    let text = masked.masked().as_bytes();
    for comment in masked.comments() {
        if !masked.has_code_before(comment) {
            continue;
        }
        let line_start = masked.line_range(comment.start.line).start;
        let code_range = line_start..comment.range.start;
        let code = &masked.masked()[code_range.clone()];
        let context = clip(&collapse(masked.code_text(code_range)));
        for number in NUMBER.find_iter(code) {
            let start = line_start + number.start();
            let end = line_start + number.end();
            let before = start.checked_sub(1).and_then(|i| text.get(i));
            if !is_number_boundary(before) || !is_number_boundary(text.get(end)) {
                continue;
            }
            if matches!(number.as_str(), "0" | "1") {
                continue;
            }
            items.push(TribalKnowledge {
                kind: KnowledgeType::MagicNumber,
                content: format!("{} ({})", number.as_str(), collapse(&comment.body)),
                importance: Severity::Medium,
                location: masked.location(file, start),
                context: Some(context.clone()),
            });
        }
    }
}

fn summarize(items: &[TribalKnowledge]) -> TribalSummary {
    let mut by_type = BTreeMap::new();
    let mut by_importance = BTreeMap::new();
    for item in items {
        *by_type.entry(item.kind.as_str().to_string()).or_insert(0) += 1;
        *by_importance.entry(item.importance.as_str().to_string()).or_insert(0) += 1;
    }
    TribalSummary {
        total: items.len(),
        by_type,
        by_importance,
    }
}

/// Extracts tribal knowledge from a source text.
#[must_use]
pub fn extract_tribal_knowledge(source: &str, file: &str) -> TribalKnowledgeExtraction {
    let masked = MaskedSource::new(source);
    let mut items = Vec::new();

    for comment in masked.comments() {
        if looks_like_code(&comment.body) {
            continue;
        }
        let content = collapse(&comment.body);
        let Some(kind) = classify(&content) else {
            continue;
        };
        items.push(TribalKnowledge {
            importance: importance(kind, &content),
            kind,
            location: comment.location(file),
            context: context_of(&masked, comment),
            content,
        });
    }
    magic_numbers(&masked, file, &mut items);
    items.sort_by_key(|item| (item.location.line, item.location.column));

    debug!(file, items = items.len(), "extracted tribal knowledge");
    TribalKnowledgeExtraction {
        summary: summarize(&items),
        items,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<(KnowledgeType, Severity)> {
        extract_tribal_knowledge(source, "t.st")
            .items
            .iter()
            .map(|item| (item.kind, item.importance))
            .collect()
    }

    #[test]
    fn first_marker_family_wins() {
        assert_eq!(
            kinds("(* WARNING: do not change the ramp *)\nx := 2;"),
            vec![(KnowledgeType::DoNotChange, Severity::Critical)]
        );
        assert_eq!(
            kinds("// CAUTION: e-stop chain is wired in series\nx := 2;"),
            vec![(KnowledgeType::Warning, Severity::Critical)]
        );
        assert_eq!(kinds("// TODO tune this"), vec![(KnowledgeType::Todo, Severity::Medium)]);
        assert_eq!(
            kinds("// 2019-04-02 changed by JK"),
            vec![(KnowledgeType::History, Severity::Low)]
        );
        assert_eq!(
            kinds("// hack until the new valve arrives"),
            vec![(KnowledgeType::Workaround, Severity::High)]
        );
    }

    #[test]
    fn plain_remarks_and_commented_code_are_ignored() {
        assert!(kinds("// start the pump\n// bPump := TRUE;").is_empty());
    }

    #[test]
    fn context_is_the_adjacent_code() {
        let result = extract_tribal_knowledge(
            "// needed because the sensor bounces\nbDebounced := bRaw AND bLast;\n",
            "t.st",
        );
        assert_eq!(result.items[0].kind, KnowledgeType::Explanation);
        assert_eq!(result.items[0].context.as_deref(), Some("bDebounced := bRaw AND bLast;"));
    }

    #[test]
    fn commented_literals_are_magic_numbers() {
        let source = "nLimit := 1500; // rpm, gearbox limit\naBuf : ARRAY[1..100] OF INT; // ring\ntDelay := T#5S; // settle\nx := 1; // one\n";
        let result = extract_tribal_knowledge(source, "t.st");
        let magic: Vec<&str> = result
            .items
            .iter()
            .filter(|item| item.kind == KnowledgeType::MagicNumber)
            .map(|item| item.content.as_str())
            .collect();
        assert_eq!(magic, vec!["1500 (rpm, gearbox limit)"]);
        assert_eq!(result.items[0].context.as_deref(), Some("nLimit := 1500;"));
        assert_eq!(result.summary.by_type.get("magic-number"), Some(&1));
    }
}
