//! Safety interlocks, bypasses and critical warnings.
//!
//! Roles are assigned to `BOOL`-like declarations by name. Bypass idioms are
//! checked everywhere a name can hide: every declaration regardless of type,
//! identifiers used in code without a local declaration (globals, I/O lists),
//! and comment text. The detector is biased toward reporting: every bypass
//! produces a critical warning, and a bypass phrase in a comment produces one
//! even when no identifier is involved.

use std::collections::BTreeMap;
use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use stmig_patterns::{bypass_patterns, classify_role, has_safety_word_stem, BypassPatterns, SafetyRole};
use stmig_syntax::lexer::keyword_kind;
use stmig_syntax::model::make_id;
use stmig_syntax::{SourceLocation, VarSection, Variable};
use tracing::{debug, warn};

use crate::blocks::{scan_blocks, Block};
use crate::masked::MaskedSource;
use crate::severity::Severity;
use crate::variables::{scan_variables, section_spans};

/// Name tables used by [`extract_safety`].
#[derive(Debug, Clone, Default)]
pub struct SafetyPatterns {
    bypass: BypassPatterns,
}

impl SafetyPatterns {
    /// The built-in tables.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            bypass: bypass_patterns().clone(),
        }
    }

    /// The built-in tables with extra bypass name patterns appended.
    pub fn with_extra_bypass_patterns<S: AsRef<str>>(extra: &[S]) -> Result<Self, regex::Error> {
        Ok(Self {
            bypass: BypassPatterns::with_extra_name_patterns(extra)?,
        })
    }

    /// Returns the bypass tables.
    #[must_use]
    pub fn bypass(&self) -> &BypassPatterns {
        &self.bypass
    }
}

/// A safety-relevant boolean signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetyInterlock {
    /// Stable identifier.
    pub id: String,
    /// Variable name.
    pub name: SmolStr,
    /// Classified role.
    #[serde(rename = "type")]
    pub interlock_type: SafetyRole,
    /// Declaration location.
    pub location: SourceLocation,
    /// An assignment to this signal references a bypass.
    pub is_bypassed: bool,
    /// The condition or expression through which it is bypassed.
    pub bypass_condition: Option<String>,
    /// Confidence of the role classification, in `[0, 1]`.
    pub confidence: f64,
    /// Severity of the role.
    pub severity: Severity,
}

/// Where a bypass was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BypassSource {
    /// A declared variable.
    Declaration,
    /// An identifier used in code without a local declaration.
    Usage,
    /// An identifier mentioned in a comment.
    Comment,
}

/// A signal that can defeat safety logic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetyBypass {
    /// Stable identifier.
    pub id: String,
    /// Identifier name.
    pub name: SmolStr,
    /// Location of the declaration, first usage or comment.
    pub location: SourceLocation,
    /// Interlocks this bypass defeats.
    pub affected_interlocks: Vec<SmolStr>,
    /// Matched idiom labels (`debug-flag`, `skip`, ...).
    pub condition: Option<String>,
    /// Always critical.
    pub severity: Severity,
    /// Where it was found.
    pub source: BypassSource,
}

/// Kind of a critical warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WarningKind {
    /// A bypass identifier.
    SafetyBypass,
    /// A comment describing a bypass.
    BypassComment,
    /// An interlock assigned a constant.
    ForcedInterlock,
    /// An emergency stop written by program logic.
    EstopWrittenInLogic,
}

/// A finding that must be reviewed before migration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriticalWarning {
    /// Warning kind.
    #[serde(rename = "type")]
    pub kind: WarningKind,
    /// What was found.
    pub message: String,
    /// Severity.
    pub severity: Severity,
    /// Where it was found.
    pub location: SourceLocation,
    /// What to do about it. Never empty.
    pub remediation: String,
}

/// Safety counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetySummary {
    /// Number of interlocks.
    pub total_interlocks: usize,
    /// Number of bypasses.
    pub total_bypasses: usize,
    /// Interlocks with `isBypassed`.
    pub bypassed_interlocks: usize,
    /// Number of critical warnings.
    pub critical_warnings: usize,
    /// Interlocks per role.
    pub by_type: BTreeMap<String, usize>,
    /// Warnings per severity.
    pub by_severity: BTreeMap<String, usize>,
}

impl SafetySummary {
    /// Recomputes the counts.
    #[must_use]
    pub fn from_parts(
        interlocks: &[SafetyInterlock],
        bypasses: &[SafetyBypass],
        warnings: &[CriticalWarning],
    ) -> Self {
        let mut by_type = BTreeMap::new();
        for interlock in interlocks {
            *by_type.entry(interlock.interlock_type.as_str().to_string()).or_insert(0) += 1;
        }
        let mut by_severity = BTreeMap::new();
        for warning in warnings {
            *by_severity.entry(warning.severity.as_str().to_string()).or_insert(0) += 1;
        }
        Self {
            total_interlocks: interlocks.len(),
            total_bypasses: bypasses.len(),
            bypassed_interlocks: interlocks.iter().filter(|i| i.is_bypassed).count(),
            critical_warnings: warnings.len(),
            by_type,
            by_severity,
        }
    }
}

/// Result of [`extract_safety`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetyExtraction {
    /// Interlocks in declaration order.
    pub interlocks: Vec<SafetyInterlock>,
    /// Bypasses: declarations, then usages, then comments.
    pub bypasses: Vec<SafetyBypass>,
    /// Warnings in detection order.
    pub critical_warnings: Vec<CriticalWarning>,
    /// Counts.
    pub summary: SafetySummary,
}

fn regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|err| panic!("invalid safety pattern {pattern:?}: {err}"))
}

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| regex(r"[A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)*"));
static EXPLICIT_PREFIX: Lazy<Regex> = Lazy::new(|| regex(r"(?:^|[a-z_])(?:IL|ES|SR)_"));
static GUARD: Lazy<Regex> = Lazy::new(|| regex(r"(?is)\b(?:IF|ELSIF)\b\s*(.+?)\s*\bTHEN\b"));
/// `target := expression;` where the expression holds no further assignment.
static ASSIGNMENT: Lazy<Regex> = Lazy::new(|| regex(r"([A-Za-z_][\w.]*)\s*:=\s*((?:[^;:]|:[^=])+);"));
static CONSTANT: Lazy<Regex> = Lazy::new(|| regex(r"(?i)^(?:TRUE|FALSE|0|1|BOOL#\w+)$"));

const GUARD_WINDOW_LINES: u32 = 20;
const MIN_STEM_LEN: usize = 4;

fn role_severity(role: SafetyRole) -> Severity {
    match role {
        SafetyRole::Estop | SafetyRole::Bypass => Severity::Critical,
        SafetyRole::Interlock | SafetyRole::SafetyRelay => Severity::High,
        SafetyRole::Permissive | SafetyRole::SafetyDevice => Severity::Medium,
    }
}

fn role_confidence(role: SafetyRole, name: &str) -> f64 {
    match role {
        SafetyRole::SafetyDevice => 0.6,
        _ if EXPLICIT_PREFIX.is_match(name) => 0.9,
        _ => 0.8,
    }
}

/// The part of an interlock name that identifies the guarded thing:
/// `bIL_DoorClosed` -> `doorclosed`.
fn name_stem(name: &str) -> String {
    let lower_prefix = name.bytes().take_while(u8::is_ascii_lowercase).count();
    let rest = if lower_prefix <= 3 && name.len() > lower_prefix {
        &name[lower_prefix..]
    } else {
        name
    };
    let rest = rest.trim_start_matches('_');
    let rest = ["IL_", "ES_", "SR_"]
        .iter()
        .find_map(|prefix| rest.strip_prefix(prefix))
        .unwrap_or(rest);
    rest.replace('_', "").to_ascii_lowercase()
}

fn squash(name: &str) -> String {
    name.replace('_', "").to_ascii_lowercase()
}

fn bypass_warning(bypass: &SafetyBypass) -> CriticalWarning {
    let idioms = bypass.condition.as_deref().unwrap_or("bypass");
    CriticalWarning {
        kind: WarningKind::SafetyBypass,
        message: format!("Safety bypass '{}' ({idioms}) can defeat safety logic", bypass.name),
        severity: Severity::Critical,
        location: bypass.location.clone(),
        remediation: format!(
            "Review '{}' with a safety engineer before migration; remove it or gate it behind an audited maintenance mode with a documented owner.",
            bypass.name
        ),
    }
}

/// Line spans of the program organisation units in a file.
struct Units(Vec<(u32, u32)>);

impl Units {
    fn new(blocks: &[Block]) -> Self {
        Self(
            blocks
                .iter()
                .filter(|block| block.kind.is_pou())
                .map(|block| (block.location.line, block.end_line))
                .collect(),
        )
    }

    /// Start line of the innermost unit containing `line`.
    fn of(&self, line: u32) -> Option<u32> {
        self.0
            .iter()
            .filter(|(start, end)| (*start..=*end).contains(&line))
            .map(|(start, _)| *start)
            .max()
    }
}

/// Units that can see each other's signals. Code outside any unit is
/// visible to all of them.
fn shares_unit(a: Option<u32>, b: Option<u32>) -> bool {
    a.is_none() || b.is_none() || a == b
}

struct Scan<'s, 'a> {
    masked: &'s MaskedSource<'a>,
    file: &'s str,
    patterns: &'s BypassPatterns,
    units: Units,
    interlocks: Vec<SafetyInterlock>,
    bypasses: Vec<SafetyBypass>,
    /// Enclosing unit of each entry in `bypasses`.
    bypass_units: Vec<Option<u32>>,
    warnings: Vec<CriticalWarning>,
    seen_bypasses: FxHashSet<(Option<u32>, String)>,
}

impl Scan<'_, '_> {
    /// Records a bypass. Declarations are always recorded; usages and
    /// comments only when the unit has no record of that name yet.
    fn push_bypass(&mut self, name: &str, labels: &[&str], location: SourceLocation, source: BypassSource) {
        let unit = self.units.of(location.line);
        let fresh = self.seen_bypasses.insert((unit, name.to_ascii_lowercase()));
        if !fresh && source != BypassSource::Declaration {
            return;
        }
        warn!(file = self.file, name, line = location.line, ?source, "safety bypass detected");
        self.bypasses.push(SafetyBypass {
            id: make_id("bp", self.file, location.line, name),
            name: SmolStr::new(name),
            location,
            affected_interlocks: Vec::new(),
            condition: Some(labels.join(", ")),
            severity: Severity::Critical,
            source,
        });
        self.bypass_units.push(unit);
    }

    fn declarations(&mut self, variables: &[Variable]) {
        for var in variables {
            let labels = self.patterns.bypass_labels(&var.name);
            if !labels.is_empty() {
                self.push_bypass(&var.name, &labels, var.location.clone(), BypassSource::Declaration);
                continue;
            }
            if !var.is_bool_like() {
                continue;
            }
            let Some(role) = classify_role(&var.name) else {
                continue;
            };
            self.interlocks.push(SafetyInterlock {
                id: make_id("il", self.file, var.location.line, &var.name),
                name: var.name.clone(),
                interlock_type: role,
                location: var.location.clone(),
                is_bypassed: false,
                bypass_condition: None,
                confidence: role_confidence(role, &var.name),
                severity: role_severity(role),
            });
        }
    }

    fn usages(&mut self, block_names: &FxHashSet<String>, excluded: &[Range<usize>]) {
        let masked = self.masked;
        let text = masked.masked();
        for word in IDENTIFIER.find_iter(text) {
            if excluded.iter().any(|range| range.contains(&word.start())) {
                continue;
            }
            if word.start() > 0 && text.as_bytes()[word.start() - 1] == b'#' {
                continue;
            }
            let name = word.as_str().rsplit('.').next().unwrap_or(word.as_str());
            if keyword_kind(name).is_some() || block_names.contains(&name.to_ascii_lowercase()) {
                continue;
            }
            let labels = self.patterns.bypass_labels(name);
            if !labels.is_empty() {
                let location = masked.location(self.file, word.start());
                self.push_bypass(name, &labels, location, BypassSource::Usage);
            }
        }
    }

    fn comments(&mut self) {
        let masked = self.masked;
        for comment in masked.comments() {
            let labels = self.patterns.comment_labels(&comment.body);
            if labels.is_empty() {
                continue;
            }
            let location = comment.location(self.file);
            for word in IDENTIFIER.find_iter(&comment.body) {
                let name = word.as_str();
                if !is_identifier_shaped(name) && !has_safety_word_stem(name) {
                    continue;
                }
                let name_labels = self.patterns.bypass_labels(name);
                if !name_labels.is_empty() {
                    self.push_bypass(name, &name_labels, location.clone(), BypassSource::Comment);
                }
            }
            let excerpt: String = comment.body.split_whitespace().collect::<Vec<_>>().join(" ");
            let excerpt: String = excerpt.chars().take(80).collect();
            warn!(file = self.file, line = location.line, "bypass described in comment");
            self.warnings.push(CriticalWarning {
                kind: WarningKind::BypassComment,
                message: format!("Comment describes a safety bypass ({}): \"{excerpt}\"", labels.join(", ")),
                severity: Severity::Critical,
                location,
                remediation: "Confirm with a safety engineer whether the described bypass is still active; remove it or record its approval before migration.".to_string(),
            });
        }
    }

    /// Links interlocks to the bypasses referenced where they are assigned,
    /// and flags forced interlocks and e-stops written in logic.
    fn assignments(&mut self, variables: &[Variable]) {
        let masked = self.masked;
        let text = masked.masked();
        let bypass_names: Vec<String> = self.bypasses.iter().map(|b| b.name.to_ascii_lowercase()).collect();
        let interlock_units: Vec<Option<u32>> =
            self.interlocks.iter().map(|i| self.units.of(i.location.line)).collect();
        let outputs: Vec<bool> = self
            .interlocks
            .iter()
            .map(|interlock| {
                variables.iter().any(|var| {
                    var.name == interlock.name
                        && var.location.line == interlock.location.line
                        && var.section == VarSection::VarOutput
                })
            })
            .collect();
        let mut by_name: FxHashMap<String, Vec<usize>> = FxHashMap::default();
        for (index, interlock) in self.interlocks.iter().enumerate() {
            by_name.entry(interlock.name.to_ascii_lowercase()).or_default().push(index);
        }
        let mut warned = vec![false; self.interlocks.len()];
        let mut extra_warnings = Vec::new();

        for captures in ASSIGNMENT.captures_iter(text) {
            let (Some(target), Some(rhs)) = (captures.get(1), captures.get(2)) else {
                continue;
            };
            if target.as_str().contains('.') {
                continue;
            }
            let Some(candidates) = by_name.get(&target.as_str().to_ascii_lowercase()) else {
                continue;
            };
            let location = masked.location(self.file, target.start());
            let unit = self.units.of(location.line);
            let local: Vec<usize> = candidates.iter().copied().filter(|&i| interlock_units[i] == unit).collect();
            let targets = if local.is_empty() { candidates.clone() } else { local };

            let rhs_text = masked.code_text(rhs.range()).trim().to_string();
            let guard = self.enclosing_guard(target.start());
            let referenced: Vec<usize> = bypass_names
                .iter()
                .enumerate()
                .filter(|&(i, bypass)| {
                    shares_unit(self.bypass_units[i], unit)
                        && (mentions(&rhs_text, bypass) || guard.as_deref().is_some_and(|g| mentions(g, bypass)))
                })
                .map(|(i, _)| i)
                .collect();

            for index in targets {
                let name = self.interlocks[index].name.clone();
                let role = self.interlocks[index].interlock_type;
                if !referenced.is_empty() {
                    let interlock = &mut self.interlocks[index];
                    if !interlock.is_bypassed {
                        interlock.is_bypassed = true;
                        interlock.bypass_condition = Some(guard.clone().unwrap_or_else(|| rhs_text.clone()));
                    }
                    for &bypass in &referenced {
                        let affected = &mut self.bypasses[bypass].affected_interlocks;
                        if !affected.contains(&name) {
                            affected.push(name.clone());
                        }
                    }
                }

                if warned[index] {
                    continue;
                }
                if role == SafetyRole::Estop && !outputs[index] {
                    warned[index] = true;
                    extra_warnings.push(CriticalWarning {
                        kind: WarningKind::EstopWrittenInLogic,
                        message: format!("Emergency stop '{name}' is written by program logic ({name} := {rhs_text})"),
                        severity: Severity::High,
                        location: location.clone(),
                        remediation: format!("Verify that '{name}' comes from the hardwired safety chain; move the write into the safety controller or document why logic may set it."),
                    });
                } else if role != SafetyRole::Estop && CONSTANT.is_match(&rhs_text) {
                    warned[index] = true;
                    extra_warnings.push(CriticalWarning {
                        kind: WarningKind::ForcedInterlock,
                        message: format!("Interlock '{name}' is forced to the constant {rhs_text}"),
                        severity: Severity::High,
                        location: location.clone(),
                        remediation: format!("Replace the constant assignment to '{name}' with the real permissive condition, or document and approve the forced value with a safety engineer."),
                    });
                }
            }
        }
        self.warnings.extend(extra_warnings);
    }

    fn enclosing_guard(&self, offset: usize) -> Option<String> {
        let line = self.masked.line_of(offset);
        let window_start = self.masked.line_range(line.saturating_sub(GUARD_WINDOW_LINES).max(1)).start;
        let text = self.masked.masked();
        let captures = GUARD.captures_iter(&text[window_start..offset]).last()?;
        let condition = captures.get(1)?;
        let range = window_start + condition.start()..window_start + condition.end();
        Some(
            self.masked
                .code_text(range)
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" "),
        )
    }

    fn stem_links(&mut self) {
        for interlock in &self.interlocks {
            let stem = name_stem(&interlock.name);
            if stem.len() < MIN_STEM_LEN {
                continue;
            }
            let unit = self.units.of(interlock.location.line);
            for (bypass, bypass_unit) in self.bypasses.iter_mut().zip(&self.bypass_units) {
                if shares_unit(*bypass_unit, unit)
                    && squash(&bypass.name).contains(&stem)
                    && !bypass.affected_interlocks.contains(&interlock.name)
                {
                    bypass.affected_interlocks.push(interlock.name.clone());
                }
            }
        }
    }
}

fn is_identifier_shaped(word: &str) -> bool {
    let has_lower = word.chars().any(|c| c.is_ascii_lowercase());
    let has_upper_after_first = word.chars().skip(1).any(|c| c.is_ascii_uppercase());
    word.len() > 2 && (word.contains('_') || (has_lower && has_upper_after_first))
}

/// Returns true if `text` contains `name` (lower-case) as a whole identifier
/// or as the last segment of a qualified one.
fn mentions(text: &str, name: &str) -> bool {
    IDENTIFIER.find_iter(text).any(|word| {
        let word = word.as_str();
        word.eq_ignore_ascii_case(name)
            || word.rsplit('.').next().is_some_and(|last| last.eq_ignore_ascii_case(name))
    })
}

/// Extracts interlocks, bypasses and critical warnings from a source text.
#[must_use]
pub fn extract_safety(source: &str, file: &str, patterns: &SafetyPatterns) -> SafetyExtraction {
    let masked = MaskedSource::new(source);
    let variables = scan_variables(&masked, file);
    let excluded: Vec<Range<usize>> = section_spans(&masked).into_iter().map(|span| span.range).collect();
    let blocks = scan_blocks(&masked, file);
    let block_names: FxHashSet<String> = blocks.iter().map(|b| b.name.to_ascii_lowercase()).collect();

    let mut scan = Scan {
        masked: &masked,
        file,
        patterns: patterns.bypass(),
        units: Units::new(&blocks),
        interlocks: Vec::new(),
        bypasses: Vec::new(),
        bypass_units: Vec::new(),
        warnings: Vec::new(),
        seen_bypasses: FxHashSet::default(),
    };
    scan.declarations(&variables);
    scan.usages(&block_names, &excluded);
    scan.comments();
    scan.assignments(&variables);
    scan.stem_links();

    let bypass_warnings: Vec<CriticalWarning> = scan.bypasses.iter().map(bypass_warning).collect();
    let mut warnings = bypass_warnings;
    warnings.append(&mut scan.warnings);

    debug!(
        file,
        interlocks = scan.interlocks.len(),
        bypasses = scan.bypasses.len(),
        warnings = warnings.len(),
        "extracted safety logic"
    );
    SafetyExtraction {
        summary: SafetySummary::from_parts(&scan.interlocks, &scan.bypasses, &warnings),
        interlocks: scan.interlocks,
        bypasses: scan.bypasses,
        critical_warnings: warnings,
    }
}
