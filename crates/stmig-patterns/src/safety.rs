//! Safety-role and bypass-idiom tables.
//!
//! Role classification is [`MatchMode::FirstMatch`]: the most specific role
//! wins, with the generic `Safety` token as fallback. Bypass classification is
//! [`MatchMode::AnyMatch`] and deliberately permissive. A reviewer dismissing
//! a false alarm is acceptable; a missed bypass is not.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::table::{MatchMode, NamedPattern, PatternTable};

/// Role of a safety-relevant signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SafetyRole {
    /// Condition that must hold before an action is permitted.
    Interlock,
    /// Permissive/permit signal.
    Permissive,
    /// Emergency-stop chain.
    Estop,
    /// Safety relay.
    SafetyRelay,
    /// Generic safety device (fallback).
    SafetyDevice,
    /// Signal that defeats a safety function.
    Bypass,
}

impl SafetyRole {
    /// Returns the serialized name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Interlock => "interlock",
            Self::Permissive => "permissive",
            Self::Estop => "estop",
            Self::SafetyRelay => "safety-relay",
            Self::SafetyDevice => "safety-device",
            Self::Bypass => "bypass",
        }
    }
}

impl std::fmt::Display for SafetyRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Names every bypass table must flag. Kept as data so that new idioms are
/// added here first and the detector is tested against the whole family.
pub const BYPASS_NAME_FIXTURE: &[&str] = &[
    "bDbg_SkipIL",
    "Dbg_ForceOn",
    "bDebugMode",
    "bBypassSafety",
    "bIL_Bypass",
    "BYPASS_DOOR",
    "bSkipInterlock",
    "bSkip_LC",
    "bOverrideSafety",
    "xOvrdInterlock",
    "bDisableSafety",
    "bDisable_EStop",
    "bForceInterlock",
    "bForcedGuard",
    "bInhibitSafety",
    "bIgnoreDoorSwitch",
    "bMuteLightCurtain",
    "bNoCheckInterlock",
    "bJumperES",
    "bMaintBypass",
    "bMaintenanceMode",
    "bCommissioning",
    "bServiceMode",
    "bTestMode",
    "xTest",
    "bSimulationMode",
    "bSimMode",
];

/// Comments every bypass table must flag, one per idiom of the name family
/// and in both word orders where the idiom takes an object.
pub const BYPASS_COMMENT_FIXTURE: &[&str] = &[
    "debug only: door switch not evaluated",
    "debug mode active",
    "bypass the light curtain while loading",
    "door interlock bypassed",
    "skip the interlock when homing",
    "Interlock skipped in test mode",
    "test mode overrides the guard",
    "operator may override",
    "jumper on the guard door contacts",
    "safety relay defeated by jumper",
    "disable the door switch",
    "door switch disabled",
    "force the interlock true",
    "e-stop forced on",
    "debug: ignore safety door switch",
    "door switch ignored",
    "inhibit the light curtain",
    "curtain inhibited while muting",
    "mute the light curtain",
    "safety check suppressed during maintenance",
    "suppress alarms",
    "no check of the guard here",
    "maintenance mode: interlocks inhibited",
    "mode: maintenance",
    "set bskipinterlock for commissioning",
    "commissioning mode only",
    "service mode",
    "guard open allowed in service",
    "test mode",
    "simulation mode, limits not checked",
    "temporarily removed the safety check",
];

static ROLE_PATTERNS: Lazy<PatternTable> = Lazy::new(|| {
    PatternTable::new(
        MatchMode::FirstMatch,
        vec![
            NamedPattern::literal("estop", r"(?:^|[a-z_])ES_", false),
            NamedPattern::literal("estop", r"(?i)e_?stop|emergency_?stop|emerg_?stop|not_?halt", false),
            NamedPattern::literal("safety-relay", r"(?:^|[a-z_])SR_", false),
            NamedPattern::literal("safety-relay", r"(?i)safety_?relay", false),
            NamedPattern::literal("interlock", r"(?:^|[a-z_])IL_", false),
            NamedPattern::literal("interlock", r"(?i)interlock", false),
            NamedPattern::literal("permissive", r"(?i)permissive|permit", false),
            NamedPattern::literal("safety-device", r"(?i)safety|safe_|_safe$", false),
        ],
    )
});

const SAFETY_WORD_STEMS: &str =
    r"safe|interlock|e_?stop|emergency|guard|door|curtain|relay|permissive|permit|limit|trip|protect|alarm|fault|lockout|sis|chk|check";

static SAFETY_STEM: Lazy<Regex> = Lazy::new(|| {
    let pattern = format!(r"(?i){SAFETY_WORD_STEMS}|(?:^|[a-z_])(?:il|es|sr|lc)(?:_|$|[0-9])");
    match Regex::new(&pattern) {
        Ok(regex) => regex,
        Err(err) => panic!("invalid safety stem pattern: {err}"),
    }
});

static SAFETY_WORD_STEM: Lazy<Regex> = Lazy::new(|| match Regex::new(&format!("(?i){SAFETY_WORD_STEMS}")) {
    Ok(regex) => regex,
    Err(err) => panic!("invalid safety word stem pattern: {err}"),
});

// The case-sensitive variant catches `bForceIL`, `bJumperES` where the stem is
// an upper-case abbreviation glued to a camel-case word.
static SAFETY_STEM_ABBREVIATION: Lazy<Regex> = Lazy::new(|| {
    match Regex::new(r"(?:IL|ES|SR|LC)(?:_|$|[0-9A-Z])") {
        Ok(regex) => regex,
        Err(err) => panic!("invalid safety stem abbreviation pattern: {err}"),
    }
});

fn builtin_bypass_table() -> PatternTable {
    PatternTable::new(
        MatchMode::AnyMatch,
        vec![
            NamedPattern::literal("debug-flag", r"(?i)dbg|debug", false),
            NamedPattern::literal("bypass", r"(?i)by_?pass|bypas", false),
            NamedPattern::literal("skip", r"(?i)skip", false),
            NamedPattern::literal("override", r"(?i)over_?ride|ovrd|ovr_", false),
            NamedPattern::literal("defeat", r"(?i)defeat|jumper|jmpr", false),
            NamedPattern::literal("disable", r"(?i)disabl|dis_|dsbl", true),
            NamedPattern::literal("force", r"(?i)forc|frc_", true),
            NamedPattern::literal(
                "inhibit",
                r"(?i)inhib|ignor|suppress|mut(?:e|ing)|no_?check|nochk",
                true,
            ),
            NamedPattern::literal("maintenance-mode", r"(?i)maint|mntc", false),
            NamedPattern::literal("commissioning-mode", r"(?i)commission|cmsn", false),
            NamedPattern::literal("service-mode", r"(?i)service|svc_", false),
            NamedPattern::literal(
                "test-mode",
                r"(?i)test_?mode|test_?run|^[a-z]{0,3}_?test(?:$|_)|^[a-z]{0,3}test$",
                false,
            ),
            NamedPattern::literal("test-mode", r"^[a-z]{0,3}Test(?:[A-Z]|$)", false),
            NamedPattern::literal("simulation-mode", r"(?i)simulat|sim_?mode", false),
        ],
    )
}

/// Things a bypass comment is about. Plural forms included.
const SAFETY_NOUN: &str = r"(?:interlock|safety|check|guard|e-?stop|emergency[- ]stop|limit|door|light[- ]?curtain|curtain|alarm|protection|permissive|sis)(?:s|es)?";

/// `verb ... noun` and `noun ... verb`, across lines.
fn both_orders(label: &'static str, verb: &str) -> [NamedPattern; 2] {
    [
        NamedPattern::literal(label, &format!(r"(?is)\b{verb}\b.*\b{SAFETY_NOUN}\b"), false),
        NamedPattern::literal(label, &format!(r"(?is)\b{SAFETY_NOUN}\b.*\b{verb}\b"), false),
    ]
}

/// `<word> mode`, `mode: <word>`, and `<word>` next to a safety noun in either order.
fn mode_phrases(label: &'static str, word: &str) -> [NamedPattern; 4] {
    let [before, after] = both_orders(label, word);
    [
        NamedPattern::literal(label, &format!(r"(?is)\b{word}[-_ ]?mode\b"), false),
        NamedPattern::literal(label, &format!(r"(?is)\bmode\b.*\b{word}\b"), false),
        before,
        after,
    ]
}

fn builtin_comment_phrases() -> PatternTable {
    let mut patterns = vec![
        NamedPattern::literal("bypass", r"(?i)\bby[-_ ]?pass", false),
        NamedPattern::literal("override", r"(?i)\bover[-_ ]?rid(?:e|es|den|ing)\b|\bovrd\b", false),
        NamedPattern::literal(
            "defeat",
            r"(?i)\b(?:defeat(?:s|ed|ing)?|jumper(?:s|ed)?|jumped out|jmpr)\b",
            false,
        ),
        NamedPattern::literal("force", r"(?is)\bforc(?:e|es|ed|ing)\b.*\b(?:on|true|high)\b", false),
        NamedPattern::literal("debug-flag", r"(?i)\bdbg_|\bdebug only\b|\bfor debugging\b", false),
        NamedPattern::literal(
            "temporary",
            r"(?is)\btemporar(?:y|ily)\b.*\b(?:safety|interlock|guard|e-?stop|disabled?|removed)\b",
            false,
        ),
    ];
    patterns.extend(both_orders("skip", r"skip(?:s|ped|ping)?"));
    patterns.extend(both_orders(
        "disable",
        r"(?:disabl(?:e|es|ed|ing)|deactivat(?:e|es|ed|ing)|removed|commented out)",
    ));
    patterns.extend(both_orders("force", r"forc(?:e|es|ed|ing)"));
    patterns.extend(both_orders(
        "inhibit",
        r"(?:inhibit(?:s|ed|ing)?|ignor(?:e|es|ed|ing)|suppress(?:es|ed|ing)?|mut(?:e|es|ed|ing)|no[- ]?check)",
    ));
    patterns.extend(mode_phrases("debug-flag", r"debug(?:ging)?"));
    patterns.extend(mode_phrases("maintenance-mode", r"maint(?:enance)?"));
    patterns.extend(mode_phrases("commissioning-mode", r"commission(?:ing|ed)?"));
    patterns.extend(mode_phrases("service-mode", r"service"));
    patterns.extend(mode_phrases("test-mode", r"test(?:ing)?"));
    patterns.extend(mode_phrases("simulation-mode", r"sim(?:ulation|ulated)?"));
    PatternTable::new(MatchMode::AnyMatch, patterns)
}

/// The bypass detection tables for identifiers and comment text.
#[derive(Debug, Clone)]
pub struct BypassPatterns {
    names: PatternTable,
    phrases: PatternTable,
}

static BUILTIN_BYPASS: Lazy<BypassPatterns> = Lazy::new(BypassPatterns::builtin);

/// Returns the built-in bypass tables.
#[must_use]
pub fn bypass_patterns() -> &'static BypassPatterns {
    &BUILTIN_BYPASS
}

impl Default for BypassPatterns {
    fn default() -> Self {
        Self::builtin()
    }
}

impl BypassPatterns {
    /// Builds the built-in tables.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            names: builtin_bypass_table(),
            phrases: builtin_comment_phrases(),
        }
    }

    /// Returns the built-in tables extended with extra name patterns.
    ///
    /// Extra patterns are appended; built-in entries are never removed.
    pub fn with_extra_name_patterns<S: AsRef<str>>(extra: &[S]) -> Result<Self, regex::Error> {
        let mut patterns = Self::builtin();
        for source in extra {
            patterns
                .names
                .push(NamedPattern::compile("custom", source.as_ref(), false)?);
        }
        Ok(patterns)
    }

    /// Returns the identifier table.
    #[must_use]
    pub fn name_table(&self) -> &PatternTable {
        &self.names
    }

    /// Returns the comment phrase table.
    #[must_use]
    pub fn phrase_table(&self) -> &PatternTable {
        &self.phrases
    }

    /// Returns the labels of bypass idioms matched by an identifier.
    #[must_use]
    pub fn bypass_labels(&self, name: &str) -> Vec<&'static str> {
        self.names.matches(name, has_safety_stem)
    }

    /// Returns true if the identifier matches any bypass idiom.
    #[must_use]
    pub fn is_bypass_name(&self, name: &str) -> bool {
        self.names.is_match(name, has_safety_stem)
    }

    /// Returns the labels of bypass idioms found in comment text.
    ///
    /// Prose is checked against the phrase table, and every word of the
    /// comment against the identifier table whatever its case. Stem-gated
    /// identifier entries fire when the word or the comment carries a
    /// safety stem.
    #[must_use]
    pub fn comment_labels(&self, text: &str) -> Vec<&'static str> {
        let mut labels = self.phrases.matches(text, |_| true);
        let comment_has_stem = has_safety_stem(text);
        for word in comment_words(text) {
            for label in self.names.matches(word, |word| comment_has_stem || has_safety_stem(word)) {
                if !labels.contains(&label) {
                    labels.push(label);
                }
            }
        }
        labels
    }
}

/// Words of a comment that can be identifiers.
pub fn comment_words(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .filter(|word| word.len() > 2)
}

/// Returns true if the name contains a safety-related stem.
#[must_use]
pub fn has_safety_stem(name: &str) -> bool {
    SAFETY_STEM.is_match(name) || SAFETY_STEM_ABBREVIATION.is_match(name)
}

/// Like [`has_safety_stem`] without the two-letter abbreviations, which
/// lower-case prose would hit (`forces`, `disables`).
#[must_use]
pub fn has_safety_word_stem(word: &str) -> bool {
    SAFETY_WORD_STEM.is_match(word)
}

/// Classifies a name into a safety role (first match wins).
///
/// Bypass idioms are classified separately by [`BypassPatterns`]; this
/// function never returns [`SafetyRole::Bypass`].
#[must_use]
pub fn classify_role(name: &str) -> Option<SafetyRole> {
    let label = ROLE_PATTERNS.matches(name, |_| true).into_iter().next()?;
    Some(match label {
        "estop" => SafetyRole::Estop,
        "safety-relay" => SafetyRole::SafetyRelay,
        "interlock" => SafetyRole::Interlock,
        "permissive" => SafetyRole::Permissive,
        _ => SafetyRole::SafetyDevice,
    })
}

/// Returns true if a variable of this name is safety-critical.
#[must_use]
pub fn is_safety_critical_name(name: &str) -> bool {
    classify_role(name).is_some() || BUILTIN_BYPASS.is_bypass_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_precedence_prefers_specific_roles() {
        assert_eq!(classify_role("bES_Pressed"), Some(SafetyRole::Estop));
        assert_eq!(classify_role("bEmergencyStop"), Some(SafetyRole::Estop));
        assert_eq!(classify_role("bE_Stop_Ok"), Some(SafetyRole::Estop));
        assert_eq!(classify_role("SR_Main"), Some(SafetyRole::SafetyRelay));
        assert_eq!(classify_role("bSafetyRelayOk"), Some(SafetyRole::SafetyRelay));
        assert_eq!(classify_role("bIL_OK"), Some(SafetyRole::Interlock));
        assert_eq!(classify_role("xDoorInterlock"), Some(SafetyRole::Interlock));
        assert_eq!(classify_role("bStartPermissive"), Some(SafetyRole::Permissive));
        assert_eq!(classify_role("bPermitRun"), Some(SafetyRole::Permissive));
        assert_eq!(classify_role("bSafetyOk"), Some(SafetyRole::SafetyDevice));
    }

    #[test]
    fn ordinary_names_have_no_role() {
        for name in ["bMotorRunning", "nCounter", "rTemperature", "sMessage", "bFil_Level"] {
            assert_eq!(classify_role(name), None, "{name}");
        }
    }

    #[test]
    fn stem_matches_abbreviations() {
        assert!(has_safety_stem("bForceIL"));
        assert!(has_safety_stem("bJumperES"));
        assert!(has_safety_stem("bDisableSafety"));
        assert!(!has_safety_stem("bMotorRunning"));
        assert!(has_safety_stem("forces"));
        assert!(!has_safety_word_stem("forces"));
        assert!(has_safety_word_stem("bskipinterlock"));
    }

    #[test]
    fn disable_and_force_need_a_safety_stem() {
        let patterns = bypass_patterns();
        assert!(!patterns.is_bypass_name("bDisableLogging"));
        assert!(!patterns.is_bypass_name("rForceNewton"));
        assert!(patterns.is_bypass_name("bDisableInterlock"));
        assert!(patterns.is_bypass_name("bForceGuardClosed"));
    }

    #[test]
    fn extra_patterns_are_appended() {
        let patterns = BypassPatterns::with_extra_name_patterns(&["(?i)hotwire"]).unwrap();
        assert!(patterns.is_bypass_name("bHotwireDoor"));
        assert!(patterns.is_bypass_name("bBypassSafety"));
        assert!(BypassPatterns::with_extra_name_patterns(&["("]).is_err());
    }

    #[test]
    fn override_inflections_are_phrases() {
        for text in ["the guard overrides it", "overridden by the PLC", "overriding"] {
            assert!(bypass_patterns().comment_labels(text).contains(&"override"), "{text}");
        }
    }

    #[test]
    fn lowercase_words_are_checked_against_names() {
        let labels = bypass_patterns().comment_labels("set bskipinterlock first");
        assert!(labels.contains(&"skip"));
        assert!(bypass_patterns().comment_labels("ignore the door").contains(&"inhibit"));
        assert!(bypass_patterns().comment_labels("ignore the sign").is_empty());
    }

    #[test]
    fn comment_labels_cover_prose_and_identifiers() {
        let patterns = bypass_patterns();
        assert!(patterns
            .comment_labels("Interlock temporarily disabled for commissioning")
            .contains(&"disable"));
        assert!(patterns
            .comment_labels("set bDbg_SkipIL to skip the door check")
            .contains(&"debug-flag"));
        assert!(patterns.comment_labels("Normal motor start sequence").is_empty());
    }
}
