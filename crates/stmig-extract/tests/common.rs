//! Shared helpers for extractor integration tests.
#![allow(dead_code, unused_imports)]

pub use stmig_extract::{
    extract_safety, extract_state_machines, SafetyExtraction, SafetyPatterns, StateMachine,
    StateMachineOptions,
};

/// Wraps declarations and a body into a `PROGRAM`.
pub fn program(declarations: &[&str], body: &str) -> String {
    let mut source = String::from("PROGRAM Main\nVAR\n");
    for declaration in declarations {
        source.push_str("    ");
        source.push_str(declaration);
        source.push('\n');
    }
    source.push_str("END_VAR\n");
    source.push_str(body);
    source.push_str("\nEND_PROGRAM\n");
    source
}

/// Runs the safety extractor with the built-in tables.
pub fn safety(source: &str) -> SafetyExtraction {
    extract_safety(source, "main.st", &SafetyPatterns::default())
}

/// Returns the single state machine of a source text.
pub fn single_machine(source: &str) -> StateMachine {
    let mut result = extract_state_machines(source, "main.st", None, &StateMachineOptions::default());
    assert_eq!(result.state_machines.len(), 1, "expected one machine in {source}");
    result.state_machines.remove(0)
}

/// A chain `0 -> 1 -> ... -> n-1` over labels `0..n`.
pub fn chain_case(selector: &str, states: usize) -> String {
    let mut body = format!("CASE {selector} OF\n");
    for value in 0..states {
        body.push_str(&format!("    {value}:\n"));
        if value + 1 < states {
            body.push_str(&format!("        {selector} := {};\n", value + 1));
        }
    }
    body.push_str("END_CASE");
    body
}
