//! Shared helpers for scoring tests.
#![allow(dead_code, unused_imports)]

use smol_str::SmolStr;
pub use stmig_extract::{
    extract_safety, extract_state_machines, SafetyExtraction, SafetyPatterns, Severity,
    StateMachineOptions,
};
pub use stmig_migrate::{
    migration_order, score, Blocker, BlockerKind, DimensionScores, Grade, MigrationReport,
    PouMigrationScore, ScoringWeights,
};

/// Parses, extracts and scores one file.
pub fn score_source(source: &str, file: &str) -> MigrationReport {
    let parsed = stmig_syntax::parse(source, file);
    let machines = extract_state_machines(source, file, None, &StateMachineOptions::default());
    let safety = extract_safety(source, file, &SafetyPatterns::default());
    score(
        &parsed.pous,
        &parsed.docstrings,
        &machines.state_machines,
        &safety,
        None,
        &ScoringWeights::default(),
    )
}

/// A score record with `blockers` placeholder blockers.
pub fn unit_score(name: &str, blockers: usize, overall_score: f64) -> PouMigrationScore {
    PouMigrationScore {
        pou_id: format!("pou:{name}"),
        pou_name: SmolStr::new(name),
        overall_score,
        dimension_scores: DimensionScores::default(),
        grade: Grade::from_score(overall_score),
        blockers: (0..blockers)
            .map(|index| Blocker {
                severity: Severity::High,
                kind: BlockerKind::LowDocumentation,
                message: format!("blocker {index}"),
            })
            .collect(),
        warnings: Vec::new(),
        suggestions: Vec::new(),
    }
}
