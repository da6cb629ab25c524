//! `CASE`-based state machines.
//!
//! A state machine is a `CASE <var> OF` block whose selector is named like a
//! state variable (`nState`, `iStep`, `eMode`, ...). Each label is a state;
//! each `<var> := <target>;` inside a state's branch is a transition. The
//! verifier checks reachability, deadlocks and numbering gaps, and two
//! renderers produce a Mermaid diagram and a plain-text report.

mod extract;
mod render;
mod verify;

pub use extract::extract_state_machines;
pub use render::{render_mermaid, render_text};
pub use verify::{gap_values, verify};

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use stmig_syntax::SourceLocation;

/// Default minimum number of states for a machine to be reported.
pub const DEFAULT_MIN_STATES: usize = 2;
/// Default average spacing above which numbering gaps are not checked.
pub const DEFAULT_MAX_GAP_SPACING: f64 = 2.0;
/// Default number of lines scanned for an unterminated `CASE`.
pub const DEFAULT_FALLBACK_WINDOW_LINES: u32 = 200;
/// Default number of actions captured per state.
pub const DEFAULT_MAX_ACTIONS_PER_STATE: usize = 5;

/// Tuning knobs for [`extract_state_machines`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateMachineOptions {
    /// Machines with fewer states are discarded.
    pub min_states: usize,
    /// Gaps are reported only when the average spacing of numeric state
    /// values is at most this.
    pub max_gap_spacing: f64,
    /// Lines scanned after the `CASE` header when `END_CASE` is missing.
    pub fallback_window_lines: u32,
    /// Actions captured per state.
    pub max_actions_per_state: usize,
}

impl Default for StateMachineOptions {
    fn default() -> Self {
        Self {
            min_states: DEFAULT_MIN_STATES,
            max_gap_spacing: DEFAULT_MAX_GAP_SPACING,
            fallback_window_lines: DEFAULT_FALLBACK_WINDOW_LINES,
            max_actions_per_state: DEFAULT_MAX_ACTIONS_PER_STATE,
        }
    }
}

/// A `CASE` label value: an integer or a symbolic name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StateValue {
    /// Numeric label.
    Int(i64),
    /// Enumerator or constant label, as written.
    Name(SmolStr),
}

impl StateValue {
    /// Returns the numeric value, if any.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            Self::Name(_) => None,
        }
    }

    /// Returns true if `text` denotes this value (case-insensitive, with or
    /// without an enumeration type qualifier).
    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        match self {
            Self::Int(value) => text.parse::<i64>().is_ok_and(|parsed| parsed == *value),
            Self::Name(name) => {
                name.eq_ignore_ascii_case(text) || last_segment(name).eq_ignore_ascii_case(last_segment(text))
            }
        }
    }
}

impl std::fmt::Display for StateValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}

pub(crate) fn last_segment(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

/// One `CASE` branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct State {
    /// Stable identifier.
    pub id: String,
    /// Label value, unique within the machine.
    pub value: StateValue,
    /// Symbolic name: the label itself, or the first word of the
    /// documentation for numeric labels.
    pub name: Option<SmolStr>,
    /// Inline or next-line comment.
    pub documentation: Option<String>,
    /// Entry state.
    pub is_initial: bool,
    /// Terminal state.
    pub is_final: bool,
    /// Assignment or call lines of the branch, verbatim.
    pub actions: Vec<String>,
    /// Label location.
    pub location: SourceLocation,
}

impl State {
    /// Returns true if the state has a name.
    #[must_use]
    pub fn is_named(&self) -> bool {
        self.name.is_some()
    }
}

/// A `<var> := <target>;` assignment between two states.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transition {
    /// Stable identifier.
    pub id: String,
    /// Source state id.
    pub from_state_id: String,
    /// Target state id.
    pub to_state_id: String,
    /// Nearest preceding `IF`/`ELSIF` condition within the source state.
    pub guard: Option<String>,
    /// Statements between the guard and the assignment.
    pub actions: Vec<String>,
    /// Assignment location.
    pub location: SourceLocation,
}

/// Structural checks of a machine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verification {
    /// Some non-final state has no outgoing transition.
    pub has_deadlocks: bool,
    /// The non-final states without outgoing transitions.
    pub deadlock_states: Vec<StateValue>,
    /// Non-initial states no transition leads to.
    pub unreachable_states: Vec<StateValue>,
    /// Transition targets without a matching label.
    pub missing_transitions: Vec<StateValue>,
    /// Numeric labels skip values.
    pub has_gaps: bool,
    /// The skipped values.
    pub gap_values: Vec<i64>,
}

/// Rendered diagrams.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visualizations {
    /// Mermaid `stateDiagram-v2` source.
    pub mermaid: String,
    /// Plain-text report.
    pub text: String,
}

/// A detected state machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateMachine {
    /// Stable identifier.
    pub id: String,
    /// Display name (`Main.nState`).
    pub name: SmolStr,
    /// The POU containing the `CASE`.
    pub pou_name: SmolStr,
    /// The `CASE` selector.
    pub state_variable: SmolStr,
    /// States in label order.
    pub states: Vec<State>,
    /// Transitions in source order.
    pub transitions: Vec<Transition>,
    /// From `CASE` to `END_CASE`.
    pub location: SourceLocation,
    /// Structural checks.
    pub verification: Verification,
    /// Rendered diagrams.
    pub visualizations: Visualizations,
}

impl StateMachine {
    /// Looks up a state by id.
    #[must_use]
    pub fn state(&self, id: &str) -> Option<&State> {
        self.states.iter().find(|state| state.id == id)
    }

    /// Returns the transitions leaving a state.
    pub fn outgoing<'a>(&'a self, state_id: &'a str) -> impl Iterator<Item = &'a Transition> + 'a {
        self.transitions
            .iter()
            .filter(move |transition| transition.from_state_id == state_id)
    }

    /// Returns the share of states without a name, in `[0, 1]`.
    #[must_use]
    pub fn unnamed_ratio(&self) -> f64 {
        if self.states.is_empty() {
            return 0.0;
        }
        let unnamed = self.states.iter().filter(|state| !state.is_named()).count();
        #[allow(clippy::cast_precision_loss)]
        let ratio = unnamed as f64 / self.states.len() as f64;
        ratio
    }
}

/// State machine counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateMachineSummary {
    /// Number of machines.
    pub total: usize,
    /// States over all machines.
    pub total_states: usize,
    /// Transitions over all machines.
    pub total_transitions: usize,
    /// Machines with deadlocks.
    pub with_deadlocks: usize,
    /// Machines with numbering gaps.
    pub with_gaps: usize,
    /// Machines with unreachable states.
    pub with_unreachable: usize,
}

impl StateMachineSummary {
    /// Recomputes the counts from a list of machines.
    #[must_use]
    pub fn from_machines(machines: &[StateMachine]) -> Self {
        Self {
            total: machines.len(),
            total_states: machines.iter().map(|m| m.states.len()).sum(),
            total_transitions: machines.iter().map(|m| m.transitions.len()).sum(),
            with_deadlocks: machines.iter().filter(|m| m.verification.has_deadlocks).count(),
            with_gaps: machines.iter().filter(|m| m.verification.has_gaps).count(),
            with_unreachable: machines
                .iter()
                .filter(|m| !m.verification.unreachable_states.is_empty())
                .count(),
        }
    }
}

/// Result of [`extract_state_machines`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateMachineExtraction {
    /// Machines in source order.
    pub state_machines: Vec<StateMachine>,
    /// Counts.
    pub summary: StateMachineSummary,
}
