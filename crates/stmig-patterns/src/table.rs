//! Ordered pattern tables.

use regex::Regex;

/// How a table resolves a name against its patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// The first pattern (in table order) that matches decides the result.
    FirstMatch,
    /// Every matching pattern is reported.
    AnyMatch,
}

/// A compiled pattern with a stable label.
#[derive(Debug, Clone)]
pub struct NamedPattern {
    /// Label reported when the pattern matches (e.g. `"bypass"`).
    pub label: &'static str,
    /// The compiled expression.
    pub regex: Regex,
    /// When set, the name must additionally contain a safety stem.
    pub requires_stem: bool,
}

impl NamedPattern {
    /// Compiles a user-supplied pattern.
    pub fn compile(
        label: &'static str,
        pattern: &str,
        requires_stem: bool,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            label,
            regex: Regex::new(pattern)?,
            requires_stem,
        })
    }

    /// Compiles a pattern. Table sources are literals, so a failure is a bug
    /// in the table itself.
    pub(crate) fn literal(label: &'static str, pattern: &str, requires_stem: bool) -> Self {
        let regex = match Regex::new(pattern) {
            Ok(regex) => regex,
            Err(err) => panic!("invalid built-in pattern {label:?}: {err}"),
        };
        Self {
            label,
            regex,
            requires_stem,
        }
    }
}

/// An ordered list of patterns with a documented resolution mode.
#[derive(Debug, Clone)]
pub struct PatternTable {
    mode: MatchMode,
    patterns: Vec<NamedPattern>,
}

impl PatternTable {
    /// Creates a table from patterns in priority order.
    #[must_use]
    pub fn new(mode: MatchMode, patterns: Vec<NamedPattern>) -> Self {
        Self { mode, patterns }
    }

    /// Returns the resolution mode.
    #[must_use]
    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    /// Returns the patterns in table order.
    #[must_use]
    pub fn patterns(&self) -> &[NamedPattern] {
        &self.patterns
    }

    /// Appends a pattern after the built-in entries.
    pub fn push(&mut self, pattern: NamedPattern) {
        self.patterns.push(pattern);
    }

    /// Returns the labels of matching patterns.
    ///
    /// In [`MatchMode::FirstMatch`] at most one label is returned. `stem`
    /// decides whether a stem-gated pattern may fire for this name.
    pub fn matches(&self, name: &str, stem: impl Fn(&str) -> bool) -> Vec<&'static str> {
        let mut labels = Vec::new();
        for pattern in &self.patterns {
            if !pattern.regex.is_match(name) {
                continue;
            }
            if pattern.requires_stem && !stem(name) {
                continue;
            }
            labels.push(pattern.label);
            if self.mode == MatchMode::FirstMatch {
                break;
            }
        }
        labels
    }

    /// Returns true if any pattern matches.
    pub fn is_match(&self, name: &str, stem: impl Fn(&str) -> bool) -> bool {
        self.patterns.iter().any(|pattern| {
            pattern.regex.is_match(name) && (!pattern.requires_stem || stem(name))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(mode: MatchMode) -> PatternTable {
        PatternTable::new(
            mode,
            vec![
                NamedPattern::literal("a", "(?i)alpha", false),
                NamedPattern::literal("b", "(?i)al", false),
                NamedPattern::literal("gated", "(?i)alpha", true),
            ],
        )
    }

    #[test]
    fn first_match_stops_at_first_pattern() {
        assert_eq!(table(MatchMode::FirstMatch).matches("ALPHA", |_| true), vec!["a"]);
    }

    #[test]
    fn any_match_reports_all_patterns() {
        assert_eq!(
            table(MatchMode::AnyMatch).matches("alpha", |_| true),
            vec!["a", "b", "gated"]
        );
    }

    #[test]
    fn stem_gate_suppresses_gated_patterns() {
        assert_eq!(
            table(MatchMode::AnyMatch).matches("alpha", |_| false),
            vec!["a", "b"]
        );
    }
}
