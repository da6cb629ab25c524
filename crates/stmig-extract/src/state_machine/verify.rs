//! Reachability, deadlock and numbering-gap checks.
//!
//! The three checks are independent: one state can be unreachable and a
//! deadlock at the same time.

use rustc_hash::FxHashSet;

use super::{State, StateValue, Transition, Verification};

/// Returns the integers missing between the smallest and largest numeric
/// label, or nothing when the numbering is sparse.
///
/// Sparse schemes (`0, 10, 20` or `0, 100, 500`) are deliberate and are only
/// checked when the average spacing is at most `max_spacing`.
#[must_use]
pub fn gap_values(states: &[State], max_spacing: f64) -> Vec<i64> {
    let mut values: Vec<i64> = states.iter().filter_map(|state| state.value.as_int()).collect();
    values.sort_unstable();
    values.dedup();
    let (Some(&min), Some(&max)) = (values.first(), values.last()) else {
        return Vec::new();
    };
    if values.len() < 2 {
        return Vec::new();
    }
    #[allow(clippy::cast_precision_loss)]
    let average = (max - min) as f64 / (values.len() - 1) as f64;
    if average > max_spacing {
        return Vec::new();
    }
    let present: FxHashSet<i64> = values.iter().copied().collect();
    (min..=max).filter(|value| !present.contains(value)).collect()
}

/// Runs every check over a machine's states and transitions.
#[must_use]
pub fn verify(
    states: &[State],
    transitions: &[Transition],
    missing_targets: &[StateValue],
    max_gap_spacing: f64,
) -> Verification {
    let targeted: FxHashSet<&str> = transitions.iter().map(|t| t.to_state_id.as_str()).collect();
    let leaving: FxHashSet<&str> = transitions.iter().map(|t| t.from_state_id.as_str()).collect();

    let unreachable_states = states
        .iter()
        .filter(|state| !state.is_initial && !targeted.contains(state.id.as_str()))
        .map(|state| state.value.clone())
        .collect();
    let deadlock_states: Vec<StateValue> = states
        .iter()
        .filter(|state| !state.is_final && !leaving.contains(state.id.as_str()))
        .map(|state| state.value.clone())
        .collect();
    let gap_values = gap_values(states, max_gap_spacing);

    Verification {
        has_deadlocks: !deadlock_states.is_empty(),
        deadlock_states,
        unreachable_states,
        missing_transitions: missing_targets.to_vec(),
        has_gaps: !gap_values.is_empty(),
        gap_values,
    }
}

#[cfg(test)]
mod tests {
    use stmig_syntax::SourceLocation;

    use super::*;

    fn state(value: i64, is_initial: bool, is_final: bool) -> State {
        State {
            id: format!("s{value}"),
            value: StateValue::Int(value),
            name: None,
            documentation: None,
            is_initial,
            is_final,
            actions: Vec::new(),
            location: SourceLocation::new("t.st", 1, 1),
        }
    }

    fn transition(from: i64, to: i64) -> Transition {
        Transition {
            id: format!("t{from}-{to}"),
            from_state_id: format!("s{from}"),
            to_state_id: format!("s{to}"),
            guard: None,
            actions: Vec::new(),
            location: SourceLocation::new("t.st", 1, 1),
        }
    }

    #[test]
    fn dense_numbering_reports_gaps() {
        let states: Vec<State> = [0, 1, 2, 5].into_iter().map(|v| state(v, v == 0, false)).collect();
        assert_eq!(gap_values(&states, 2.0), vec![3, 4]);
    }

    #[test]
    fn sparse_numbering_is_not_checked() {
        let states: Vec<State> = [0, 100, 500].into_iter().map(|v| state(v, v == 0, false)).collect();
        assert!(gap_values(&states, 2.0).is_empty());
        let tens: Vec<State> = [0, 10, 20, 30].into_iter().map(|v| state(v, v == 0, false)).collect();
        assert!(verify(&tens, &[], &[], 2.0).gap_values.is_empty());
    }

    #[test]
    fn checks_are_independent() {
        let states = vec![state(0, true, false), state(1, false, false), state(2, false, true)];
        let transitions = vec![transition(0, 2)];
        let verification = verify(&states, &transitions, &[StateValue::Int(9)], 2.0);
        assert_eq!(verification.unreachable_states, vec![StateValue::Int(1)]);
        assert_eq!(verification.deadlock_states, vec![StateValue::Int(1)]);
        assert!(verification.has_deadlocks);
        assert!(!verification.has_gaps);
        assert_eq!(verification.missing_transitions, vec![StateValue::Int(9)]);
    }

    #[test]
    fn final_states_never_deadlock() {
        let states = vec![state(0, true, false), state(1, false, true)];
        let verification = verify(&states, &[transition(0, 1)], &[], 2.0);
        assert!(!verification.has_deadlocks);
        assert!(verification.unreachable_states.is_empty());
    }
}
