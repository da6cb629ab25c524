//! Diagram renderers.
//!
//! Both renderers are pure functions of a machine's states, transitions and
//! verification. Nodes are aliased `S0`, `S1`, ... by state index.

use std::fmt::Write;

use super::{State, StateMachine, StateValue};

const NOTE_WIDTH: usize = 50;
const GUARD_WIDTH: usize = 30;

/// Collapses whitespace and cuts `text` to `width` characters plus `...`.
fn truncate(text: &str, width: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= width {
        return flat;
    }
    let mut cut: String = flat.chars().take(width).collect();
    cut.push_str("...");
    cut
}

fn quote_safe(text: &str) -> String {
    text.replace('"', "'")
}

fn node_label(state: &State) -> String {
    match (&state.value, &state.name) {
        (StateValue::Int(value), Some(name)) => format!("{value}: {name}"),
        (value, _) => value.to_string(),
    }
}

fn alias_of(machine: &StateMachine, state_id: &str) -> Option<usize> {
    machine.states.iter().position(|state| state.id == state_id)
}

/// Renders a Mermaid `stateDiagram-v2`.
#[must_use]
pub fn render_mermaid(machine: &StateMachine) -> String {
    let mut out = String::from("stateDiagram-v2\n");

    for (index, state) in machine.states.iter().enumerate() {
        let _ = writeln!(out, "    state \"{}\" as S{index}", quote_safe(&node_label(state)));
        if let Some(doc) = &state.documentation {
            let _ = writeln!(out, "    note right of S{index} : {}", truncate(doc, NOTE_WIDTH));
        }
    }
    for (index, state) in machine.states.iter().enumerate() {
        if state.is_initial {
            let _ = writeln!(out, "    [*] --> S{index}");
        }
    }
    for transition in &machine.transitions {
        let (Some(from), Some(to)) = (
            alias_of(machine, &transition.from_state_id),
            alias_of(machine, &transition.to_state_id),
        ) else {
            continue;
        };
        match &transition.guard {
            Some(guard) => {
                let _ = writeln!(out, "    S{from} --> S{to} : {}", truncate(guard, GUARD_WIDTH));
            }
            None => {
                let _ = writeln!(out, "    S{from} --> S{to}");
            }
        }
    }
    for (index, state) in machine.states.iter().enumerate() {
        if state.is_final {
            let _ = writeln!(out, "    S{index} --> [*]");
        }
    }
    out
}

fn join_values(values: &[StateValue]) -> String {
    values.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

/// Renders a plain-text report.
#[must_use]
pub fn render_text(machine: &StateMachine) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "State Machine: {}", machine.name);
    let _ = writeln!(out, "Variable: {}", machine.state_variable);

    let _ = writeln!(out, "States ({}):", machine.states.len());
    for state in &machine.states {
        let _ = write!(out, "  [{}]", state.value);
        if let Some(name) = &state.name {
            if state.value != StateValue::Name(name.clone()) {
                let _ = write!(out, " {name}");
            }
        }
        if state.is_initial {
            out.push_str(" (INITIAL)");
        }
        if state.is_final {
            out.push_str(" (FINAL)");
        }
        if let Some(doc) = &state.documentation {
            let _ = write!(out, " - {}", truncate(doc, NOTE_WIDTH));
        }
        out.push('\n');
    }

    let _ = writeln!(out, "Transitions ({}):", machine.transitions.len());
    for transition in &machine.transitions {
        let (Some(from), Some(to)) = (
            machine.state(&transition.from_state_id),
            machine.state(&transition.to_state_id),
        ) else {
            continue;
        };
        let _ = write!(out, "  {} -> {}", from.value, to.value);
        if let Some(guard) = &transition.guard {
            let _ = write!(out, " when {guard}");
        }
        out.push('\n');
    }

    let verification = &machine.verification;
    if !verification.deadlock_states.is_empty() {
        let _ = writeln!(out, "Deadlocks: {}", join_values(&verification.deadlock_states));
    }
    if !verification.unreachable_states.is_empty() {
        let _ = writeln!(out, "Unreachable: {}", join_values(&verification.unreachable_states));
    }
    if verification.has_gaps {
        let gaps: Vec<String> = verification.gap_values.iter().map(ToString::to_string).collect();
        let _ = writeln!(out, "Gaps: {}", gaps.join(", "));
    }
    if !verification.missing_transitions.is_empty() {
        let _ = writeln!(
            out,
            "Missing targets: {}",
            join_values(&verification.missing_transitions)
        );
    }
    out
}
