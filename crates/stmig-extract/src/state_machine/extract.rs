//! State machine detection over the masked text.
//!
//! Handles:
//! - `CASE <var> OF` selectors named like state variables
//! - numeric, symbolic and qualified labels (`10:`, `Idle:`, `E_State.Idle:`),
//!   also after `;` on the same line and in comma lists (`1, 2:`)
//! - nested `CASE` blocks (their labels are not states of the outer machine)
//! - the `ELSE` branch of the `CASE` (not a state)
//! - `CASE` without `END_CASE` (bounded by the fallback window)

use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;
use smol_str::SmolStr;
use stmig_patterns::is_state_variable_name;
use stmig_syntax::lexer::keyword_kind;
use stmig_syntax::model::make_id;
use stmig_syntax::SourceLocation;
use tracing::debug;

use super::render::{render_mermaid, render_text};
use super::verify::verify;
use super::{
    last_segment, State, StateMachine, StateMachineExtraction, StateMachineOptions,
    StateMachineSummary, StateValue, Transition, Verification, Visualizations,
};
use crate::blocks::{scan_blocks, Block};
use crate::masked::MaskedSource;

fn regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|err| panic!("invalid state machine pattern {pattern:?}: {err}"))
}

static CASE_HEAD: Lazy<Regex> = Lazy::new(|| regex(r"(?i)\bCASE\s+([A-Za-z_][\w.]*)\s+OF\b"));
static CASE_TOKEN: Lazy<Regex> = Lazy::new(|| regex(r"(?i)\b(END_CASE|CASE)\b"));
static NESTING: Lazy<Regex> = Lazy::new(|| regex(r"(?i)\b(END_CASE|CASE|END_IF|IF|ELSE)\b"));
static LABEL: Lazy<Regex> = Lazy::new(|| {
    regex(r"^\s*((?:[0-9]+|[A-Za-z_][\w.]*)(?:\s*,\s*(?:[0-9]+|[A-Za-z_][\w.]*))*)\s*(:)(?:[^=]|$)")
});
static GUARD: Lazy<Regex> = Lazy::new(|| regex(r"(?is)\b(?:IF|ELSIF)\b\s*(.+?)\s*\bTHEN\b"));
static ACTION: Lazy<Regex> =
    Lazy::new(|| regex(r"^([A-Za-z_]\w*)(?:(?:[.\[\]^][\w.\[\]^]*)?\s*:=|(?:\.[\w.]*)?\s*\()"));
static WORD: Lazy<Regex> = Lazy::new(|| regex(r"[A-Za-z_][A-Za-z0-9_]*"));
static INITIAL_NAME: Lazy<Regex> = Lazy::new(|| regex(r"(?i)^(?:IDLE|INIT|START|READY)"));
static FINAL_NAME: Lazy<Regex> = Lazy::new(|| {
    regex(r"(?i:^(?:DONE|COMPLETE|FINISHED|END|STOP))|(?:_|[a-z0-9])(?:Done|Complete|Finished|End|Stop|DONE|COMPLETE|FINISHED|END|STOP)(?:$|[_A-Z0-9])")
});

/// A label found in a `CASE` body.
struct Label {
    values: Vec<StateValue>,
    /// Offset of the first label value.
    start: usize,
    /// Offset just past the `:`.
    end: usize,
    /// Where the branch stops: the next label, the `ELSE` branch or the body end.
    branch_end: usize,
}

struct CaseBody {
    head: Range<usize>,
    body: Range<usize>,
    end: usize,
}

/// Extracts every state machine of a source text.
///
/// `pou_name_hint` names the owning POU; without it the POU enclosing each
/// `CASE` is looked up from the block structure.
#[must_use]
pub fn extract_state_machines(
    source: &str,
    file: &str,
    pou_name_hint: Option<&str>,
    options: &StateMachineOptions,
) -> StateMachineExtraction {
    let masked = MaskedSource::new(source);
    let text = masked.masked();
    let mut blocks: Option<Vec<Block>> = None;
    let mut machines = Vec::new();

    for captures in CASE_HEAD.captures_iter(text) {
        let (Some(head), Some(selector)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        if !is_state_variable_name(selector.as_str()) {
            continue;
        }
        let case = case_body(&masked, head.range(), options.fallback_window_lines);
        let head_line = masked.line_of(head.start());
        let pou_name = match pou_name_hint {
            Some(hint) => SmolStr::new(hint),
            None => {
                let blocks = blocks.get_or_insert_with(|| scan_blocks(&masked, file));
                enclosing_pou(blocks, head_line)
            }
        };
        let machine = build_machine(&masked, file, &case, selector.as_str(), pou_name, options);
        if machine.states.len() >= options.min_states {
            machines.push(machine);
        } else {
            debug!(file, line = head_line, states = machine.states.len(), "discarded small CASE");
        }
    }

    debug!(file, machines = machines.len(), "extracted state machines");
    StateMachineExtraction {
        summary: StateMachineSummary::from_machines(&machines),
        state_machines: machines,
    }
}

fn enclosing_pou(blocks: &[Block], line: u32) -> SmolStr {
    blocks
        .iter()
        .filter(|block| block.kind.is_pou() && block.contains_line(line))
        .max_by_key(|block| block.location.line)
        .map_or_else(|| SmolStr::new_inline("UNKNOWN"), |block| block.name.clone())
}

/// Locates the body of a `CASE`: up to the matching `END_CASE`, or to the end
/// of the fallback window.
fn case_body(masked: &MaskedSource<'_>, head: Range<usize>, window: u32) -> CaseBody {
    let text = masked.masked();
    let mut depth = 1usize;
    for token in CASE_TOKEN.find_iter(&text[head.end..]) {
        if token.as_str().eq_ignore_ascii_case("END_CASE") {
            depth -= 1;
            if depth == 0 {
                let start = head.end + token.start();
                return CaseBody {
                    body: head.end..start,
                    end: head.end + token.end(),
                    head,
                };
            }
        } else {
            depth += 1;
        }
    }
    let last_line = masked
        .line_of(head.start)
        .saturating_add(window)
        .min(masked.line_count());
    let end = masked.line_range(last_line).end.max(head.end);
    CaseBody {
        body: head.end..end,
        end,
        head,
    }
}

fn parse_value(text: &str) -> Option<StateValue> {
    if text.bytes().all(|b| b.is_ascii_digit()) {
        return text.parse().ok().map(StateValue::Int);
    }
    if keyword_kind(text).is_some() {
        return None;
    }
    Some(StateValue::Name(SmolStr::new(text)))
}

/// Finds the labels of the outermost `CASE` level.
fn find_labels(text: &str, body: Range<usize>) -> Vec<Label> {
    let slice = &text[body.clone()];
    let markers: Vec<(usize, String)> = NESTING
        .find_iter(slice)
        .map(|m| (m.start(), m.as_str().to_ascii_uppercase()))
        .collect();

    let mut candidates = vec![0];
    candidates.extend(
        slice
            .bytes()
            .enumerate()
            .filter(|(_, b)| *b == b'\n' || *b == b';')
            .map(|(offset, _)| offset + 1),
    );

    let mut labels: Vec<Label> = Vec::new();
    let mut marker = 0;
    let (mut case_depth, mut if_depth) = (0usize, 0usize);
    let mut else_at = None;

    for candidate in candidates {
        while marker < markers.len() && markers[marker].0 < candidate {
            match markers[marker].1.as_str() {
                "CASE" => case_depth += 1,
                "END_CASE" => case_depth = case_depth.saturating_sub(1),
                "IF" => if_depth += 1,
                "END_IF" => if_depth = if_depth.saturating_sub(1),
                _ if case_depth == 0 && if_depth == 0 && else_at.is_none() => {
                    else_at = Some(markers[marker].0);
                }
                _ => {}
            }
            marker += 1;
        }
        if else_at.is_some() {
            break;
        }
        if case_depth > 0 || if_depth > 0 || candidate >= slice.len() {
            continue;
        }
        let line_end = slice[candidate..].find('\n').map_or(slice.len(), |len| candidate + len);
        let Some(captures) = LABEL.captures(&slice[candidate..line_end]) else {
            continue;
        };
        let (Some(list), Some(colon)) = (captures.get(1), captures.get(2)) else {
            continue;
        };
        let values: Option<Vec<StateValue>> =
            list.as_str().split(',').map(|value| parse_value(value.trim())).collect();
        let Some(values) = values else { continue };
        labels.push(Label {
            values,
            start: body.start + candidate + list.start(),
            end: body.start + candidate + colon.end(),
            branch_end: body.end,
        });
    }

    let else_at = else_at.map(|offset| body.start + offset);
    for index in 0..labels.len() {
        let next = labels.get(index + 1).map(|next| next.start);
        let end = next.into_iter().chain(else_at).chain([body.end]).min().unwrap_or(body.end);
        labels[index].branch_end = end.max(labels[index].end);
    }
    labels
}

/// Splits `range` into `;`-separated statements, line by line, and keeps the
/// assignment- and call-shaped ones.
fn actions_in(masked: &MaskedSource<'_>, range: Range<usize>, limit: usize) -> Vec<String> {
    let text = masked.masked();
    let mut actions = Vec::new();
    let mut start = range.start;
    while start < range.end && actions.len() < limit {
        let end = text[start..range.end]
            .find(|ch| ch == ';' || ch == '\n')
            .map_or(range.end, |len| (start + len + 1).min(range.end));
        let statement = text[start..end].trim();
        let is_action = ACTION
            .captures(statement)
            .and_then(|caps| caps.get(1))
            .is_some_and(|word| keyword_kind(word.as_str()).is_none());
        if is_action {
            actions.push(masked.code_text(start..end).to_string());
        }
        start = end;
    }
    actions
}

fn documentation(masked: &MaskedSource<'_>, label: &Label) -> Option<String> {
    let line = masked.line_of(label.start);
    let within = |start: usize| start >= label.start && start < label.branch_end.max(label.end + 1);
    masked
        .comment_after(line, label.start)
        .filter(|comment| within(comment.range.start))
        .or_else(|| {
            masked
                .standalone_comment_on(line + 1)
                .filter(|comment| within(comment.range.start))
        })
        .map(|comment| comment.body.clone())
        .filter(|body| !body.is_empty())
}

fn state_name(value: &StateValue, documentation: Option<&str>) -> Option<SmolStr> {
    match value {
        StateValue::Name(name) => Some(SmolStr::new(last_segment(name))),
        StateValue::Int(_) => documentation
            .and_then(|doc| WORD.find(doc))
            .map(|word| SmolStr::new(word.as_str())),
    }
}

fn build_machine(
    masked: &MaskedSource<'_>,
    file: &str,
    case: &CaseBody,
    selector: &str,
    pou_name: SmolStr,
    options: &StateMachineOptions,
) -> StateMachine {
    let text = masked.masked();
    let head = masked.line_col(case.head.start);
    let end = masked.line_col(case.end);
    let id = make_id("sm", file, head.line, selector);
    let labels = find_labels(text, case.body.clone());

    let mut states: Vec<State> = Vec::new();
    let mut owners: Vec<Vec<usize>> = Vec::with_capacity(labels.len());
    for label in &labels {
        let doc = documentation(masked, label);
        let actions = actions_in(masked, label.end..label.branch_end, options.max_actions_per_state);
        let mut owned = Vec::new();
        for value in &label.values {
            if states.iter().any(|state| &state.value == value) {
                continue;
            }
            let name = state_name(value, doc.as_deref());
            let is_initial = value.as_int() == Some(0)
                || name.as_deref().is_some_and(|name| INITIAL_NAME.is_match(name));
            let is_final = name.as_deref().is_some_and(|name| FINAL_NAME.is_match(name));
            owned.push(states.len());
            states.push(State {
                id: format!("{id}:state:{value}"),
                value: value.clone(),
                name,
                documentation: doc.clone(),
                is_initial,
                is_final,
                actions: actions.clone(),
                location: masked.location(file, label.start),
            });
        }
        owners.push(owned);
    }
    if !states.iter().any(|state| state.is_initial) {
        if let Some(first) = states.first_mut() {
            first.is_initial = true;
        }
    }

    let (transitions, missing) = find_transitions(masked, file, &id, selector, &labels, &owners, &states, options);

    let mut machine = StateMachine {
        name: if pou_name == "UNKNOWN" {
            SmolStr::new(selector)
        } else {
            SmolStr::new(format!("{pou_name}.{selector}"))
        },
        id,
        pou_name,
        state_variable: SmolStr::new(selector),
        location: SourceLocation::new(file, head.line, head.col).with_end(end.line, end.col),
        verification: Verification::default(),
        visualizations: Visualizations::default(),
        states,
        transitions,
    };
    machine.verification = verify(
        &machine.states,
        &machine.transitions,
        &missing,
        options.max_gap_spacing,
    );
    machine.visualizations = Visualizations {
        mermaid: render_mermaid(&machine),
        text: render_text(&machine),
    };
    machine
}

#[allow(clippy::too_many_arguments)]
fn find_transitions(
    masked: &MaskedSource<'_>,
    file: &str,
    machine_id: &str,
    selector: &str,
    labels: &[Label],
    owners: &[Vec<usize>],
    states: &[State],
    options: &StateMachineOptions,
) -> (Vec<Transition>, Vec<StateValue>) {
    let text = masked.masked();
    let assignment = regex(&format!(
        r"(?i)(?:^|[^\w.])({})\s*:=\s*([A-Za-z0-9_.#]+)\s*;",
        regex::escape(selector)
    ));
    let mut transitions: Vec<Transition> = Vec::new();
    let mut missing: Vec<StateValue> = Vec::new();

    for (label, owned) in labels.iter().zip(owners) {
        let branch = &text[label.end..label.branch_end];
        for captures in assignment.captures_iter(branch) {
            let (Some(target_var), Some(target)) = (captures.get(1), captures.get(2)) else {
                continue;
            };
            let target_text = target.as_str().rsplit('#').next().unwrap_or(target.as_str());
            let assign_at = label.end + target_var.start();
            let Some(to) = states.iter().find(|state| state.value.matches(target_text)) else {
                if let Some(value) = parse_value(target_text) {
                    if !missing.contains(&value) {
                        missing.push(value);
                    }
                }
                continue;
            };

            let guard = GUARD
                .captures_iter(&text[label.end..assign_at])
                .last()
                .and_then(|caps| {
                    let condition = caps.get(1)?;
                    let then_end = label.end + caps.get(0)?.end();
                    let range = label.end + condition.start()..label.end + condition.end();
                    let condition = masked.code_text(range).split_whitespace().collect::<Vec<_>>().join(" ");
                    Some((condition, then_end))
                });
            let actions = guard.as_ref().map_or_else(Vec::new, |(_, then_end)| {
                actions_in(masked, *then_end..assign_at, options.max_actions_per_state)
            });

            for &from_index in owned {
                let from = &states[from_index];
                if from.id == to.id
                    || transitions
                        .iter()
                        .any(|t| t.from_state_id == from.id && t.to_state_id == to.id)
                {
                    continue;
                }
                transitions.push(Transition {
                    id: format!("{machine_id}:t:{}->{}", from.value, to.value),
                    from_state_id: from.id.clone(),
                    to_state_id: to.id.clone(),
                    guard: guard.as_ref().map(|(condition, _)| condition.clone()),
                    actions: actions.clone(),
                    location: masked.location(file, assign_at),
                });
            }
        }
    }
    (transitions, missing)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(source: &str) -> StateMachineExtraction {
        extract_state_machines(source, "sm.st", Some("Main"), &StateMachineOptions::default())
    }

    #[test]
    fn labels_after_semicolons_on_one_line() {
        let result = extract("CASE nState OF 0: x:=1; 1: x:=2; END_CASE");
        let machine = &result.state_machines[0];
        let values: Vec<&StateValue> = machine.states.iter().map(|s| &s.value).collect();
        assert_eq!(values, vec![&StateValue::Int(0), &StateValue::Int(1)]);
        assert_eq!(machine.states[0].actions, vec!["x:=1;"]);
        assert_eq!(machine.states[1].actions, vec!["x:=2;"]);
    }

    #[test]
    fn nested_case_labels_belong_to_the_inner_machine() {
        let source = "CASE nState OF\n0:\n  CASE nSubStep OF\n  10: a := 1;\n  20: a := 2;\n  END_CASE\n  nState := 1;\n1:\n  nState := 0;\nEND_CASE";
        let result = extract(source);
        assert_eq!(result.state_machines.len(), 2);
        let outer = &result.state_machines[0];
        assert_eq!(outer.state_variable, "nState");
        assert_eq!(outer.states.len(), 2);
        assert_eq!(outer.transitions.len(), 2);
        let inner = &result.state_machines[1];
        assert_eq!(inner.state_variable, "nSubStep");
        assert_eq!(inner.states.len(), 2);
    }

    #[test]
    fn else_branch_and_if_blocks_are_not_states() {
        let source = "CASE eMode OF\nIdle:\n  IF bGo THEN\n    eMode := Run;\n  ELSE\n    x := 0;\n  END_IF\nRun:\n  eMode := Idle;\nELSE\n  eMode := Idle;\nEND_CASE";
        let machine = &extract(source).state_machines[0];
        let names: Vec<Option<&str>> = machine.states.iter().map(|s| s.name.as_deref()).collect();
        assert_eq!(names, vec![Some("Idle"), Some("Run")]);
        assert_eq!(machine.transitions[0].guard.as_deref(), Some("bGo"));
        assert_eq!(machine.transitions[1].guard, None);
        assert!(machine.states[0].is_initial);
    }

    #[test]
    fn selectors_that_are_not_state_variables_are_ignored() {
        let result = extract("CASE nIndex OF 0: a := 1; 1: a := 2; END_CASE");
        assert!(result.state_machines.is_empty());
    }

    #[test]
    fn small_machines_are_discarded() {
        let result = extract("CASE nState OF 0: a := 1; END_CASE");
        assert!(result.state_machines.is_empty());
    }

    #[test]
    fn documentation_names_numeric_states() {
        let source = "CASE nStep OF\n  10: // Fill tank\n    nStep := 20;\n  20:\n    (* Drain until empty *)\n    nStep := 30;\n  30: bDone := TRUE;\nEND_CASE";
        let machine = &extract(source).state_machines[0];
        let docs: Vec<(Option<&str>, Option<&str>)> = machine
            .states
            .iter()
            .map(|s| (s.name.as_deref(), s.documentation.as_deref()))
            .collect();
        assert_eq!(
            docs,
            vec![
                (Some("Fill"), Some("Fill tank")),
                (Some("Drain"), Some("Drain until empty")),
                (None, None),
            ]
        );
        assert!(machine.states[0].is_initial, "first state is initial when none qualifies");
    }

    #[test]
    fn unterminated_case_is_bounded_by_the_window() {
        let options = StateMachineOptions {
            fallback_window_lines: 3,
            ..StateMachineOptions::default()
        };
        let source = "CASE nState OF\n0: nState := 1;\n1: nState := 0;\n2: x := 1;\n3: x := 2;\n";
        let result = extract_state_machines(source, "w.st", None, &options);
        let machine = &result.state_machines[0];
        assert_eq!(machine.states.len(), 3);
        assert_eq!(machine.pou_name, "UNKNOWN");
        assert_eq!(machine.name, "nState");
    }

    #[test]
    fn missing_targets_and_typed_literals() {
        let source = "CASE nState OF\n0: nState := INT#1;\n1: nState := 99;\nEND_CASE";
        let machine = &extract(source).state_machines[0];
        assert_eq!(machine.transitions.len(), 1);
        assert_eq!(machine.verification.missing_transitions, vec![StateValue::Int(99)]);
    }
}
