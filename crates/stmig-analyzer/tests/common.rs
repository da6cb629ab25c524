//! Shared fixtures for pipeline tests.
#![allow(dead_code, unused_imports)]

pub use stmig_analyzer::{analyze_project, AnalysisConfig, ProjectAnalysis, SourceFile};

/// A function block library with one documented valve block.
pub const VALVES: &str = "\
(*
 Two-way valve with feedback supervision
 2023-05-02 MK initial version
*)
FUNCTION_BLOCK FB_Valve
VAR_INPUT
    bOpen : BOOL; // open request
END_VAR
VAR_OUTPUT
    bIsOpen : BOOL; // feedback
END_VAR
bIsOpen := bOpen;
END_FUNCTION_BLOCK
";

/// A program that drives the valve and carries a debug bypass.
pub const CELL: &str = "\
PROGRAM Cell
VAR
    nStep : INT;
    fbInlet : FB_Valve;
    bIL_DoorClosed : BOOL; // door switch
    bDbg_SkipIL : BOOL;
END_VAR
CASE nStep OF
    0: // Idle
        IF bIL_DoorClosed THEN
            nStep := 10;
        END_IF
    10: // Filling
        fbInlet(bOpen := TRUE);
        IF fbInlet.bIsOpen THEN
            nStep := 20;
        END_IF
    20: // Drain
        nStep := 0;
END_CASE
IF bDbg_SkipIL THEN
    bIL_DoorClosed := TRUE;
END_IF
END_PROGRAM
";

/// The two fixture files, library first.
pub fn project() -> Vec<SourceFile> {
    vec![SourceFile::new("lib/valves.st", VALVES), SourceFile::new("cell.st", CELL)]
}

pub fn analyze(files: &[SourceFile]) -> ProjectAnalysis {
    analyze_project(files, &AnalysisConfig::default())
}
