mod common;
use common::*;

use expect_test::expect;
use proptest::prelude::*;
use stmig_migrate::RiskKind;

const CONVEYOR: &str = r#"(*
 * Main conveyor sequence
 * @author JK
 *)
PROGRAM Main
VAR
    nState : INT;
    bIL_OK : BOOL;
    bDbg_SkipIL : BOOL;
    bStart : BOOL;
END_VAR
CASE nState OF
    0: // Idle
        IF bStart THEN
            nState := 1;
        END_IF
    1: // Filling
        nState := 2;
    2: // Done
        nState := 0;
END_CASE
IF bDbg_SkipIL THEN
    bIL_OK := TRUE;
END_IF
END_PROGRAM
"#;

#[test]
fn test_end_to_end_conveyor() {
    let parsed = stmig_syntax::parse(CONVEYOR, "main.st");
    assert!(!parsed.docstrings.is_empty());
    let machines = extract_state_machines(CONVEYOR, "main.st", None, &StateMachineOptions::default());
    assert_eq!(machines.state_machines.len(), 1);
    assert_eq!(machines.state_machines[0].states.len(), 3);
    let safety = extract_safety(CONVEYOR, "main.st", &SafetyPatterns::default());
    assert!(!safety.interlocks.is_empty());
    assert!(!safety.bypasses.is_empty());
    assert!(safety.critical_warnings.iter().any(|w| w.severity == Severity::Critical));

    let report = score(
        &parsed.pous,
        &parsed.docstrings,
        &machines.state_machines,
        &safety,
        None,
        &ScoringWeights::default(),
    );
    let unit = &report.pou_scores[0];
    assert_eq!(unit.pou_name, "Main");
    assert!(unit.dimension_scores.safety < 70.0, "safety {}", unit.dimension_scores.safety);
    assert!((unit.dimension_scores.dependencies - 80.0).abs() < f64::EPSILON);
    assert!(unit
        .blockers
        .iter()
        .any(|b| b.kind == BlockerKind::SafetyBypass && b.severity == Severity::Critical));
    assert!(report.risks.iter().any(|risk| risk.kind == RiskKind::SafetyBypass));
    assert_eq!(report.estimated_effort.per_pou.len(), 1);
}

#[test]
fn test_each_block_declaring_a_bypass_is_blocked() {
    let source = "FUNCTION_BLOCK FB_A\nVAR\n  bBypassSafety : BOOL;\nEND_VAR\nEND_FUNCTION_BLOCK\n\nFUNCTION_BLOCK FB_B\nVAR\n  bBypassSafety : BOOL;\nEND_VAR\nEND_FUNCTION_BLOCK\n";
    let report = score_source(source, "blocks.st");
    assert_eq!(report.pou_scores.len(), 2);
    for unit in &report.pou_scores {
        assert!(
            unit.blockers.iter().any(|b| b.kind == BlockerKind::SafetyBypass),
            "{} has no bypass blocker",
            unit.pou_name
        );
    }
}

#[test]
fn test_blocked_units_migrate_last() {
    let source = "FUNCTION_BLOCK FB_Clean\nVAR_INPUT\n  bEnable : BOOL; // run request\nEND_VAR\nVAR_OUTPUT\n  bBusy : BOOL; // running\nEND_VAR\nEND_FUNCTION_BLOCK\n\nPROGRAM Cell\nVAR\n  bBypassSafety : BOOL;\nEND_VAR\nEND_PROGRAM\n";
    let report = score_source(source, "cell.st");
    let order: Vec<&str> = report.migration_order.iter().map(|step| step.pou_name.as_str()).collect();
    assert_eq!(order, vec!["FB_Clean", "Cell"]);
    assert_eq!(report.migration_order[0].position, 1);
    assert_eq!(report.migration_order[0].blocker_count, 0);

    let cell = &report.pou_scores[1];
    expect![[r#"Safety bypass 'bBypassSafety' at line 12 must be reviewed before migration"#]]
        .assert_eq(&cell.blockers[0].message);
}

#[test]
fn test_order_ties_keep_input_order() {
    let scores = vec![
        unit_score("a", 1, 50.0),
        unit_score("b", 0, 70.0),
        unit_score("c", 0, 70.0),
        unit_score("d", 0, 90.0),
    ];
    let names: Vec<String> = migration_order(&scores).into_iter().map(|s| s.pou_name.to_string()).collect();
    assert_eq!(names, vec!["d", "b", "c", "a"]);
}

#[test]
fn test_report_serializes_with_camel_case_keys() {
    let report = score_source(CONVEYOR, "main.st");
    let json = serde_json::to_value(&report).unwrap();
    assert!(json["pouScores"][0]["dimensionScores"]["safety"].is_number());
    assert_eq!(json["pouScores"][0]["blockers"][0]["kind"], "safety-bypass");
    assert!(json["estimatedEffort"]["totalHours"].is_number());
}

fn st_fragment_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("PROGRAM P\n".to_string()),
        Just("FUNCTION_BLOCK FB\n".to_string()),
        Just("END_PROGRAM\n".to_string()),
        Just("END_FUNCTION_BLOCK\n".to_string()),
        Just("VAR_INPUT\n".to_string()),
        Just("VAR\n".to_string()),
        Just("END_VAR\n".to_string()),
        Just("bDbg_SkipIL : BOOL;\n".to_string()),
        Just("bIL_OK : BOOL; // door\n".to_string()),
        Just("nState : INT;\n".to_string()),
        Just("CASE nState OF\n0: nState := 1;\n1: nState := 0;\n".to_string()),
        Just("END_CASE\n".to_string()),
        Just("(* WARNING: interlock\n  removed *)\n".to_string()),
        "[a-zA-Z_][a-zA-Z0-9_]{0,8}",
        "[ \t;:=()\n]{1,4}",
    ]
}

proptest! {
    #[test]
    fn prop_scores_stay_in_bounds(parts in prop::collection::vec(st_fragment_strategy(), 0..40)) {
        let report = score_source(&parts.concat(), "p.st");
        prop_assert!((0.0..=100.0).contains(&report.overall_score));
        for unit in &report.pou_scores {
            let dims = unit.dimension_scores;
            for value in [unit.overall_score, dims.documentation, dims.safety, dims.complexity, dims.dependencies, dims.testability] {
                prop_assert!((0.0..=100.0).contains(&value), "{} out of bounds", value);
            }
            prop_assert_eq!(unit.grade, Grade::from_score(unit.overall_score));
        }
        prop_assert!(report.estimated_effort.confidence <= 0.9);
    }

    #[test]
    fn prop_fewer_blockers_always_first(units in prop::collection::vec((0usize..4, 0.0f64..=100.0), 0..12)) {
        let scores: Vec<PouMigrationScore> = units
            .iter()
            .enumerate()
            .map(|(index, (blockers, score))| unit_score(&format!("u{index}"), *blockers, *score))
            .collect();
        let order = migration_order(&scores);
        prop_assert_eq!(order.len(), scores.len());
        for pair in order.windows(2) {
            prop_assert!(pair[0].blocker_count <= pair[1].blocker_count);
            if pair[0].blocker_count == pair[1].blocker_count {
                prop_assert!(pair[0].overall_score >= pair[1].overall_score);
            }
        }
    }
}
