mod common;
use common::*;

use stmig_extract::{BypassSource, Severity, WarningKind};
use stmig_patterns::{BYPASS_COMMENT_FIXTURE, BYPASS_NAME_FIXTURE};

#[test]
fn test_every_fixture_bypass_is_detected_when_declared() {
    for name in BYPASS_NAME_FIXTURE {
        let declaration = format!("{name} : BOOL;");
        let result = safety(&program(&[declaration.as_str()], ""));
        assert_eq!(result.bypasses.len(), 1, "{name} not detected");
        assert_eq!(result.bypasses[0].source, BypassSource::Declaration);
        let warning = &result.critical_warnings[0];
        assert_eq!(warning.kind, WarningKind::SafetyBypass);
        assert_eq!(warning.severity, Severity::Critical);
        assert!(!warning.remediation.is_empty());
    }
}

#[test]
fn test_every_fixture_bypass_is_detected_when_only_used() {
    for name in BYPASS_NAME_FIXTURE {
        let body = format!("bRun := {name} AND bStart;");
        let result = safety(&program(&["bRun : BOOL;", "bStart : BOOL;"], &body));
        assert_eq!(result.bypasses.len(), 1, "{name} not detected as usage");
        assert_eq!(result.bypasses[0].source, BypassSource::Usage);
    }
}

#[test]
fn test_ordinary_names_are_not_flagged() {
    let source = program(
        &[
            "bMotorRunning : BOOL;",
            "nCounter : INT;",
            "rTemperature : REAL;",
            "sMessage : STRING;",
        ],
        "bMotorRunning := nCounter > 10 AND rTemperature < 80.0;\nsMessage := 'running';",
    );
    let result = safety(&source);
    assert!(result.bypasses.is_empty());
    assert!(result.interlocks.is_empty());
    assert!(result.critical_warnings.is_empty());
}

#[test]
fn test_comment_only_bypass_still_warns() {
    let source = program(
        &["bIL_Guard : BOOL;"],
        "// guard interlock bypassed during commissioning\nbIL_Guard := bGuardClosed;",
    );
    let result = safety(&source);
    assert!(result.bypasses.is_empty());
    assert_eq!(result.critical_warnings.len(), 1);
    assert_eq!(result.critical_warnings[0].kind, WarningKind::BypassComment);
    assert_eq!(result.critical_warnings[0].severity, Severity::Critical);
    assert_eq!(result.critical_warnings[0].location.line, 5);
}

#[test]
fn test_every_fixture_comment_warns() {
    for text in BYPASS_COMMENT_FIXTURE {
        for comment in [format!("// {text}"), format!("(* {text} *)")] {
            let body = format!("{comment}\nbRun := bStart;");
            let result = safety(&program(&["bRun : BOOL;", "bStart : BOOL;"], &body));
            let warned = result
                .critical_warnings
                .iter()
                .any(|w| w.kind == WarningKind::BypassComment && w.severity == Severity::Critical);
            assert!(warned, "{comment} not flagged");
        }
    }
}

const TWO_BLOCKS: &str = "\
FUNCTION_BLOCK FB_A
VAR
    bBypassSafety : BOOL;
END_VAR
END_FUNCTION_BLOCK

FUNCTION_BLOCK FB_B
VAR
    bBypassSafety : BOOL;
END_VAR
IF bBypassSafety THEN
    bBypassSafety := FALSE;
END_IF
END_FUNCTION_BLOCK
";

#[test]
fn test_same_bypass_name_in_two_function_blocks() {
    let result = safety(TWO_BLOCKS);
    let lines: Vec<u32> = result.bypasses.iter().map(|b| b.location.line).collect();
    assert_eq!(lines, vec![3, 9]);
    assert!(result.bypasses.iter().all(|b| b.source == BypassSource::Declaration));
    assert_eq!(result.summary.total_bypasses, 2);
}

#[test]
fn test_extra_patterns_only_extend_the_family() {
    let patterns = SafetyPatterns::with_extra_bypass_patterns(&["(?i)hotwire"]).unwrap();
    let source = program(&["bHotwireDoor : BOOL;", "bDbg_SkipIL : BOOL;"], "");
    let result = extract_safety(&source, "main.st", &patterns);
    let names: Vec<&str> = result.bypasses.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, vec!["bHotwireDoor", "bDbg_SkipIL"]);
}

#[test]
fn test_summary_counts_match_records() {
    let source = program(
        &["bES_Main : BOOL;", "bIL_Door : BOOL;", "bBypassDoor : BOOL;"],
        "IF bBypassDoor THEN\n    bIL_Door := TRUE;\nEND_IF",
    );
    let result = safety(&source);
    assert_eq!(result.summary.total_interlocks, result.interlocks.len());
    assert_eq!(result.summary.total_bypasses, 1);
    assert_eq!(result.summary.bypassed_interlocks, 1);
    assert_eq!(result.summary.critical_warnings, result.critical_warnings.len());
    assert_eq!(result.summary.by_type.get("estop"), Some(&1));
    assert_eq!(result.bypasses[0].affected_interlocks, vec!["bIL_Door"]);
}
