//! Every extractor accepts any input without panicking.

use proptest::prelude::*;
use stmig_extract::{
    extract_blocks, extract_comments, extract_safety, extract_state_machines, extract_timers,
    extract_tribal_knowledge, extract_variables, SafetyPatterns, StateMachineOptions,
};

fn st_fragment_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("PROGRAM P\n".to_string()),
        Just("END_PROGRAM\n".to_string()),
        Just("VAR\n".to_string()),
        Just("END_VAR\n".to_string()),
        Just("CASE nState OF\n".to_string()),
        Just("END_CASE\n".to_string()),
        Just("IF ".to_string()),
        Just(" THEN\n".to_string()),
        Just("nState := 1;\n".to_string()),
        Just("(*".to_string()),
        Just("*)".to_string()),
        Just("//".to_string()),
        Just("'".to_string()),
        Just(": BOOL;".to_string()),
        Just("T#1s".to_string()),
        "[a-zA-Z_][a-zA-Z0-9_]{0,8}",
        "[0-9]{1,4}:",
        "[ \t;:,.()\\[\\]<>=*#\n-]{1,4}",
        "\\PC{1,3}",
    ]
}

proptest! {
    #[test]
    fn prop_extractors_are_total(parts in prop::collection::vec(st_fragment_strategy(), 0..40)) {
        let source = parts.concat();
        let blocks = extract_blocks(&source, "f.st");
        prop_assert_eq!(blocks.summary.total, blocks.blocks.len());
        let variables = extract_variables(&source, "f.st");
        prop_assert_eq!(variables.summary.total, variables.variables.len());
        let _ = extract_comments(&source, "f.st");
        let _ = extract_timers(&source, "f.st");
        let machines = extract_state_machines(&source, "f.st", None, &StateMachineOptions::default());
        prop_assert_eq!(machines.summary.total, machines.state_machines.len());
        let safety = extract_safety(&source, "f.st", &SafetyPatterns::default());
        prop_assert!(safety.critical_warnings.iter().all(|w| !w.remediation.is_empty()));
        let tribal = extract_tribal_knowledge(&source, "f.st");
        prop_assert_eq!(tribal.summary.total, tribal.items.len());
    }
}

#[test]
fn test_empty_input_yields_empty_results() {
    assert!(extract_blocks("", "e.st").blocks.is_empty());
    assert!(extract_variables("", "e.st").variables.is_empty());
    assert!(extract_comments("", "e.st").comments.is_empty());
    assert!(extract_safety("", "e.st", &SafetyPatterns::default()).bypasses.is_empty());
    assert!(extract_tribal_knowledge("", "e.st").items.is_empty());
}
