//! State-variable name heuristics.
//!
//! A `CASE` selector is treated as a state variable when any of these
//! patterns matches its name ([`MatchMode::AnyMatch`]).

use once_cell::sync::Lazy;

use crate::table::{MatchMode, NamedPattern, PatternTable};

static STATE_VARIABLE_PATTERNS: Lazy<PatternTable> = Lazy::new(|| {
    PatternTable::new(
        MatchMode::AnyMatch,
        vec![
            NamedPattern::literal("state-suffix", r"(?i)(state|status)$", false),
            NamedPattern::literal("state-prefix", r"(?i)^(state|status)", false),
            NamedPattern::literal("step-suffix", r"(?i)step$", false),
            NamedPattern::literal("step-prefix", r"(?i)^step", false),
            NamedPattern::literal("mode-suffix", r"(?i)mode$", false),
            NamedPattern::literal("mode-prefix", r"(?i)^mode", false),
            NamedPattern::literal("phase", r"(?i)(^phase|phase$)", false),
            NamedPattern::literal("sequence", r"(?i)(^seq|seq$|sequence|seqno|seq_?step)", false),
            // Hungarian prefixes: nState, iStep, eMode, uiPhase, diSeq, _state
            NamedPattern::literal(
                "hungarian",
                r"^(?:[a-z]{1,3}|_)(?:State|STATE|Step|STEP|Mode|MODE|Phase|PHASE|Seq|SEQ)",
                false,
            ),
            NamedPattern::literal("underscore-state", r"(?i)_(state|step|mode|phase|seq)(_|$)", false),
            NamedPattern::literal("st-prefix", r"^(?:St|ST|Sm|SM)_", false),
        ],
    )
});

/// Returns the state-variable heuristic table.
#[must_use]
pub fn state_variable_patterns() -> &'static PatternTable {
    &STATE_VARIABLE_PATTERNS
}

/// Returns true if the name looks like the selector of a state machine.
#[must_use]
pub fn is_state_variable_name(name: &str) -> bool {
    let name = name.rsplit('.').next().unwrap_or(name);
    STATE_VARIABLE_PATTERNS.is_match(name, |_| true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn common_state_variable_names_match() {
        for name in [
            "nState",
            "iStep",
            "eMode",
            "uiPhase",
            "diSeq",
            "State",
            "MachineState",
            "stepNo",
            "_state",
            "Fill_Step_1",
            "fbMixer.nState",
            "ST_Main",
            "SequenceNumber",
        ] {
            assert!(is_state_variable_name(name), "{name} should match");
        }
    }

    #[test]
    fn ordinary_selectors_do_not_match() {
        for name in ["nIndex", "i", "nCommand", "rSetpoint", "nRecipe"] {
            assert!(!is_state_variable_name(name), "{name} should not match");
        }
    }
}
