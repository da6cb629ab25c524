//! `stmig-migrate` - Migration-readiness scoring for Structured Text units.
//!
//! Combines parsed units with the state machine and safety findings into a
//! weighted score per unit, lists what blocks each unit, orders the units
//! into a migration plan and estimates the effort.
//!
//! - **Dimensions**: documentation, safety, complexity, dependencies, testability
//! - **Blockers**: bypasses, mostly unnamed state machines, missing documentation
//! - **Plan**: ascending blocker count, then descending score
//! - **Effort**: per-unit hours from the unit kind, score and blockers
//!
//! # Example
//!
//! ```
//! use stmig_extract::SafetyExtraction;
//! use stmig_migrate::{score, Grade, ScoringWeights};
//!
//! let source = "FUNCTION F_Add : INT\nVAR_INPUT\n  a : INT; // addend\nEND_VAR\nF_Add := a + 1;\nEND_FUNCTION";
//! let parsed = stmig_syntax::parse(source, "f.st");
//! let report = score(&parsed.pous, &parsed.docstrings, &[], &SafetyExtraction::default(), None, &ScoringWeights::default());
//! assert_eq!(report.pou_scores.len(), 1);
//! assert!(report.pou_scores[0].blockers.is_empty());
//! assert_ne!(report.overall_grade, Grade::A);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

pub mod call_graph;
pub mod dimensions;
pub mod report;
mod scorer;
pub mod weights;

pub use call_graph::CallGraph;
pub use dimensions::UnitFindings;
pub use report::{
    Blocker, BlockerKind, DimensionScores, EstimatedEffort, Grade, MigrationReport, MigrationStep,
    PouEffort, PouMigrationScore, ProjectRisk, RiskKind,
};
pub use scorer::{base_hours, migration_order, score, score_unit, unit_hours};
pub use weights::{ScoringWeights, WeightsError};
