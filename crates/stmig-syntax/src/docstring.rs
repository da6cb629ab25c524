//! Documentation comment classification and parsing.
//!
//! A block comment is a docstring when it spans several lines, carries a tag
//! marker (`@param`, `@returns`, ...), or is written as a banner (`(***`,
//! `(*===`). Its body is split into lines and each line is classified on its
//! own: tags, dated history entries, warnings, notes, legacy `Auth:`/`Date:`
//! headers, and otherwise plain text that forms the summary and description.

use once_cell::sync::Lazy;
use regex::Regex;
use smol_str::SmolStr;

use crate::model::{DocParam, Docstring, HistoryEntry, SourceLocation};

const TAG_MARKERS: &[&str] = &[
    "@param", "@returns", "@author", "@date", "@history", "@warning", "@note",
];

static TAG_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^@([A-Za-z]+)\b\s*(.*)$").unwrap_or_else(|err| panic!("tag regex: {err}"))
});

static PARAM_BODY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)\s*(?:[:\-]\s*)?(.*)$")
        .unwrap_or_else(|err| panic!("param regex: {err}"))
});

static HISTORY_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(\d{4}-\d{2}-\d{2})\s*(?:[-:]\s*)?(?:([A-Za-z][A-Za-z.]{0,19})\s*[:\-]\s*)?(.*)$",
    )
    .unwrap_or_else(|err| panic!("history regex: {err}"))
});

static WARNING_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:WARNING|DANGER|CAUTION)(?:\s*[:!\-]\s*|\s+|$)(.*)$")
        .unwrap_or_else(|err| panic!("warning regex: {err}"))
});

static NOTE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^NOTE(?:\s*[:!\-]\s*|\s+|$)(.*)$")
        .unwrap_or_else(|err| panic!("note regex: {err}"))
});

static AUTHOR_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:Auth|Author)\s*:\s*(.*)$")
        .unwrap_or_else(|err| panic!("author regex: {err}"))
});

static DATE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^Date\s*:\s*(.*)$").unwrap_or_else(|err| panic!("date regex: {err}"))
});

/// Returns true if a block comment qualifies as a docstring.
///
/// `raw` is the comment text including its delimiters.
#[must_use]
pub fn is_docstring(raw: &str, start_line: u32, end_line: u32) -> bool {
    if !is_block(raw) {
        return false;
    }
    if end_line > start_line || is_banner(raw) {
        return true;
    }
    let lowered = raw.to_ascii_lowercase();
    TAG_MARKERS.iter().any(|marker| lowered.contains(marker))
}

fn is_block(raw: &str) -> bool {
    raw.starts_with("(*") || raw.starts_with("/*")
}

fn is_banner(raw: &str) -> bool {
    raw.starts_with("(***") || raw.starts_with("(*===") || raw.starts_with("/***")
}

/// Strips the comment delimiters from a comment token's text.
#[must_use]
pub fn comment_body(raw: &str) -> &str {
    let body = if let Some(rest) = raw.strip_prefix("//") {
        rest
    } else if let Some(rest) = raw.strip_prefix("(*") {
        rest.strip_suffix("*)").unwrap_or(rest)
    } else if let Some(rest) = raw.strip_prefix("/*") {
        rest.strip_suffix("*/").unwrap_or(rest)
    } else {
        raw
    };
    body.trim()
}

/// Cleans one body line: drops leading decoration and whole-line banners.
fn clean_line(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed
        .chars()
        .all(|ch| matches!(ch, '*' | '=' | '-' | '#' | '_' | '~' | '+'))
    {
        return None;
    }
    let stripped = trimmed.trim_start_matches('*').trim_end_matches('*').trim();
    (!stripped.is_empty()).then_some(stripped)
}

/// Parses a docstring comment.
#[must_use]
pub fn parse_docstring(raw: &str, location: SourceLocation) -> Docstring {
    let mut doc = Docstring {
        id: format!("doc:{}:{}", location.file, location.line),
        summary: String::new(),
        description: String::new(),
        params: Vec::new(),
        returns: None,
        author: None,
        date: None,
        history: Vec::new(),
        warnings: Vec::new(),
        notes: Vec::new(),
        raw: raw.to_string(),
        location,
        associated_block: None,
        associated_block_type: None,
    };

    let mut description: Vec<&str> = Vec::new();
    for line in comment_body(raw).lines().filter_map(clean_line) {
        if let Some(caps) = TAG_LINE.captures(line) {
            let tag = caps[1].to_ascii_lowercase();
            let rest = caps.get(2).map_or("", |m| m.as_str()).trim();
            if apply_tag(&mut doc, &tag, rest) {
                continue;
            }
        }
        if let Some(entry) = parse_history(line) {
            doc.history.push(entry);
        } else if let Some(caps) = WARNING_LINE.captures(line) {
            doc.warnings.push(tagged_text(line, caps.get(1)));
        } else if let Some(caps) = NOTE_LINE.captures(line) {
            doc.notes.push(tagged_text(line, caps.get(1)));
        } else if let Some(caps) = AUTHOR_LINE.captures(line) {
            doc.author = non_empty(&caps[1]);
        } else if let Some(caps) = DATE_LINE.captures(line) {
            doc.date = non_empty(&caps[1]);
        } else if doc.summary.is_empty() {
            doc.summary = line.to_string();
        } else {
            description.push(line);
        }
    }
    doc.description = description.join("\n");
    doc
}

/// Applies an `@tag` line. Returns false for unknown tags.
fn apply_tag(doc: &mut Docstring, tag: &str, rest: &str) -> bool {
    match tag {
        "param" => {
            if let Some(caps) = PARAM_BODY.captures(rest) {
                doc.params.push(DocParam {
                    name: SmolStr::new(&caps[1]),
                    description: caps[2].trim().to_string(),
                });
            }
        }
        "returns" | "return" => doc.returns = non_empty(rest),
        "author" => doc.author = non_empty(rest),
        "date" => doc.date = non_empty(rest),
        "history" => match parse_history(rest) {
            Some(entry) => doc.history.push(entry),
            None if !rest.is_empty() => doc.notes.push(rest.to_string()),
            None => {}
        },
        "warning" => doc.warnings.push(rest.to_string()),
        "note" => doc.notes.push(rest.to_string()),
        _ => return false,
    }
    true
}

fn parse_history(line: &str) -> Option<HistoryEntry> {
    let caps = HISTORY_LINE.captures(line)?;
    Some(HistoryEntry {
        date: SmolStr::new(&caps[1]),
        author: caps.get(2).map(|m| SmolStr::new(m.as_str())),
        description: caps.get(3).map_or("", |m| m.as_str()).trim().to_string(),
    })
}

fn tagged_text(line: &str, rest: Option<regex::Match<'_>>) -> String {
    match rest.map(|m| m.as_str().trim()) {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => line.to_string(),
    }
}

fn non_empty(text: &str) -> Option<String> {
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc() -> SourceLocation {
        SourceLocation::new("main.st", 1, 1)
    }

    #[test]
    fn classification() {
        assert!(is_docstring("(* one\n two *)", 1, 2));
        assert!(is_docstring("(* @param x speed *)", 4, 4));
        assert!(is_docstring("(*** Header ***)", 1, 1));
        assert!(is_docstring("(*=== Header ===*)", 1, 1));
        assert!(!is_docstring("(* single line *)", 3, 3));
        assert!(!is_docstring("// @param x", 3, 3));
    }

    #[test]
    fn tags_and_text() {
        let raw = "(*\n * Motor control block\n * Drives the conveyor.\n * @param bEnable Enables the drive\n * @returns TRUE when running\n * @author JD\n *)";
        let doc = parse_docstring(raw, loc());
        assert_eq!(doc.summary, "Motor control block");
        assert_eq!(doc.description, "Drives the conveyor.");
        assert_eq!(doc.params.len(), 1);
        assert_eq!(doc.params[0].name, "bEnable");
        assert_eq!(doc.params[0].description, "Enables the drive");
        assert_eq!(doc.returns.as_deref(), Some("TRUE when running"));
        assert_eq!(doc.author.as_deref(), Some("JD"));
    }

    #[test]
    fn history_warnings_notes_and_legacy_headers() {
        let raw = "(*===================\n Auth: K. Smith\n Date: 2019-03-01\n 2020-01-15 KS: Added bypass for commissioning\n 2021-06-01: Removed timer\n WARNING: do not change the order of outputs\n NOTE keep in sync with HMI\n===================*)";
        let doc = parse_docstring(raw, loc());
        assert_eq!(doc.author.as_deref(), Some("K. Smith"));
        assert_eq!(doc.date.as_deref(), Some("2019-03-01"));
        assert_eq!(doc.history.len(), 2);
        assert_eq!(doc.history[0].author.as_deref(), Some("KS"));
        assert_eq!(doc.history[0].description, "Added bypass for commissioning");
        assert_eq!(doc.history[1].author, None);
        assert_eq!(doc.history[1].description, "Removed timer");
        assert_eq!(doc.warnings, vec!["do not change the order of outputs"]);
        assert_eq!(doc.notes, vec!["keep in sync with HMI"]);
        assert!(doc.summary.is_empty());
    }

    #[test]
    fn banner_lines_are_skipped() {
        let doc = parse_docstring("(****************\n  Conveyor\n ****************)", loc());
        assert_eq!(doc.summary, "Conveyor");
        assert!(doc.description.is_empty());
    }

    #[test]
    fn comment_body_strips_delimiters() {
        assert_eq!(comment_body("(* a *)"), "a");
        assert_eq!(comment_body("// b"), "b");
        assert_eq!(comment_body("/* c */"), "c");
        assert_eq!(comment_body("(* unterminated"), "unterminated");
    }
}
