mod common;
use common::*;

use expect_test::expect;
use stmig_syntax::{parse_with_options, ParseConfidence, ParseOptions, PouType, VarSection};

#[test]
fn test_documented_program_with_declarations() {
    let source = r#"(*
 * Main conveyor sequence
 *)
PROGRAM Main
VAR
    nState : INT := 0; // current step
    bIL_OK AT %IX0.0 : BOOL;
    aBuf : ARRAY [1..10] OF REAL;
END_VAR
nState := 1;
END_PROGRAM
"#;
    expect![[r#"
        PROGRAM Main lines 4..11 body 10..11
          doc "Main conveyor sequence"
          VAR nState : INT := 0 // current step
          VAR bIL_OK : BOOL AT %IX0.0 [safety]
          VAR aBuf : ARRAY [1..10] OF REAL
    "#]]
    .assert_eq(&snapshot_parse(source));
}

#[test]
fn test_missing_colon_warns_and_missing_end_is_fatal() {
    let source = r#"FUNCTION_BLOCK FB_Valve
VAR_INPUT
    bOpen BOOL;
    nPos : INT;
END_VAR
"#;
    expect![[r#"
        FUNCTION_BLOCK FB_Valve lines 1..5 body 5..5
          VAR_INPUT nPos : INT
        error P005 6:1 fatal
        warning P003 3:11
    "#]]
    .assert_eq(&snapshot_parse(source));
}

#[test]
fn test_method_and_post_header_docstrings() {
    let source = r#"FUNCTION_BLOCK FB_Pump
(*** Pump wrapper ***)
VAR
    bRun : BOOL;
END_VAR
(*
 Starts the pump.
*)
METHOD Start : BOOL
Start := TRUE;
END_METHOD
END_FUNCTION_BLOCK
"#;
    expect![[r#"
        FUNCTION_BLOCK FB_Pump lines 1..12 body 12..12
          doc "Pump wrapper"
          VAR bRun : BOOL
          METHOD Start lines 9..11
            doc "Starts the pump."
    "#]]
    .assert_eq(&snapshot_parse(source));
}

#[test]
fn test_globals_and_constant_sections() {
    let source = r#"VAR_GLOBAL
    gEStop : BOOL;
END_VAR
PROGRAM P
VAR CONSTANT
    MAX_STEPS : INT := 10;
END_VAR
END_PROGRAM
"#;
    expect![[r#"
        PROGRAM P lines 4..8 body 8..8
          VAR_CONSTANT MAX_STEPS : INT := 10
        GLOBAL
          VAR_GLOBAL gEStop : BOOL [safety]
    "#]]
    .assert_eq(&snapshot_parse(source));
}

#[test]
fn test_all_unit_kinds() {
    let source = "PROGRAM A END_PROGRAM\nFUNCTION_BLOCK B END_FUNCTION_BLOCK\nFUNCTION C : INT END_FUNCTION\nCLASS D END_CLASS\nINTERFACE E END_INTERFACE\n";
    let result = parse(source, "kinds.st");
    assert!(result.success, "errors: {:?}", result.errors);
    let kinds: Vec<PouType> = result.pous.iter().map(|pou| pou.pou_type).collect();
    assert_eq!(
        kinds,
        vec![
            PouType::Program,
            PouType::FunctionBlock,
            PouType::Function,
            PouType::Class,
            PouType::Interface
        ]
    );
    for pou in &result.pous {
        assert!(pou.body_start_line <= pou.body_end_line);
    }
}

#[test]
fn test_comma_separated_names_share_type_and_comment() {
    let result = parse(
        "PROGRAM P\nVAR\n  a, b, c : INT; (* counters *)\nEND_VAR\nEND_PROGRAM",
        "p.st",
    );
    let names: Vec<&str> = result.pous[0].variables.iter().map(|v| v.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b", "c"]);
    assert!(result.pous[0]
        .variables
        .iter()
        .all(|v| v.data_type == "INT" && v.comment.as_deref() == Some("counters")));
}

#[test]
fn test_retain_and_persistent_are_ignored() {
    let result = parse(
        "PROGRAM P\nVAR RETAIN PERSISTENT\n  nCount : DINT;\nEND_VAR\nEND_PROGRAM",
        "p.st",
    );
    assert!(result.success);
    assert_eq!(result.pous[0].variables[0].section, VarSection::Var);
}

#[test]
fn test_types_with_arguments_and_references() {
    let result = parse(
        "PROGRAM P\nVAR\n  s : STRING(80) := 'idle';\n  p : POINTER TO INT;\n  r : REF_TO FB_Motor;\n  m : ARRAY [0..3, 1..2] OF Lib.ST_Data;\nEND_VAR\nEND_PROGRAM",
        "types.st",
    );
    assert!(result.success, "errors: {:?}", result.errors);
    let vars = &result.pous[0].variables;
    assert_eq!(vars[0].data_type, "STRING(80)");
    assert_eq!(vars[0].initial_value.as_deref(), Some("'idle'"));
    assert_eq!(vars[1].data_type, "POINTER TO INT");
    assert_eq!(vars[2].data_type, "REF_TO FB_Motor");
    assert_eq!(vars[3].data_type, "ARRAY [0..3, 1..2] OF Lib.ST_Data");
    assert!(vars[3].is_array);
    assert_eq!(vars[3].array_bounds.as_deref(), Some("0..3, 1..2"));
}

#[test]
fn test_broken_declaration_recovers_at_next_section() {
    let source = "PROGRAM P\nVAR\n  x : ARRAY [1..3 INT;\nEND_VAR\nVAR_OUTPUT\n  y : BOOL;\nEND_VAR\nEND_PROGRAM";
    let result = parse(source, "broken.st");
    assert!(!result.success);
    assert_eq!(result.pous.len(), 1);
    let pou = &result.pous[0];
    assert_eq!(pou.variables.len(), 1);
    assert_eq!(pou.variables[0].name, "y");
    assert!(result.fatal_errors().count() >= 1);
}

#[test]
fn test_docstring_outside_tolerance_is_unattached() {
    let source = "(*** Header ***)\n\n\n\nPROGRAM Main\nEND_PROGRAM";
    let result = parse(source, "far.st");
    assert_eq!(result.docstrings.len(), 1);
    assert!(result.docstrings[0].associated_block.is_none());
    assert!(result.pous[0].documentation.is_none());

    let relaxed = parse_with_options(source, "far.st", &ParseOptions { adjacency_tolerance: 5 });
    assert_eq!(relaxed.docstrings[0].associated_block.as_deref(), Some("Main"));
    assert_eq!(relaxed.docstrings[0].associated_block_type.as_deref(), Some("PROGRAM"));
}

#[test]
fn test_confidence_and_vendor_metadata() {
    let result = parse("(* TwinCAT export *)\nPROGRAM Main\nEND_PROGRAM", "main.st");
    assert_eq!(result.metadata.confidence, ParseConfidence::Definite);
    assert_eq!(result.metadata.vendor.as_str(), "twincat");
    assert_eq!(result.metadata.line_count, 3);

    let garbage = parse("just some text ; := ", "notes.txt");
    assert!(garbage.success);
    assert_eq!(garbage.metadata.confidence, ParseConfidence::None);
}

#[test]
fn test_result_serializes_camel_case() {
    let result = parse("PROGRAM Main\nVAR_INPUT bStart : BOOL; END_VAR\nEND_PROGRAM", "main.st");
    let json = serde_json::to_value(&result).expect("serialize");
    let pou = &json["pous"][0];
    assert_eq!(pou["type"], "PROGRAM");
    assert_eq!(pou["bodyStartLine"], 3);
    assert_eq!(pou["variables"][0]["section"], "VAR_INPUT");
    assert_eq!(pou["variables"][0]["dataType"], "BOOL");
    assert_eq!(pou["variables"][0]["isSafetyCritical"], false);
    assert!(json["globalVariables"].as_array().is_some_and(Vec::is_empty));
    assert_eq!(json["metadata"]["confidence"], "definite");
}
