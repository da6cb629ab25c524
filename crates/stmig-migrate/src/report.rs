//! Scoring records.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use stmig_extract::Severity;

/// Letter grade of a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Grade {
    /// 90 and above.
    A,
    /// 80 and above.
    B,
    /// 70 and above.
    C,
    /// 60 and above.
    D,
    /// Below 60.
    F,
}

impl Grade {
    /// Maps a score in `[0, 100]` to a grade.
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            Self::A
        } else if score >= 80.0 {
            Self::B
        } else if score >= 70.0 {
            Self::C
        } else if score >= 60.0 {
            Self::D
        } else {
            Self::F
        }
    }

    /// Returns the letter.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
            Self::F => "F",
        }
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The five dimension scores of a unit, each in `[0, 100]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DimensionScores {
    /// Documentation coverage.
    pub documentation: f64,
    /// Safety findings.
    pub safety: f64,
    /// Size and state machine shape.
    pub complexity: f64,
    /// Outgoing dependencies.
    pub dependencies: f64,
    /// Interface clarity.
    pub testability: f64,
}

/// What blocks a unit's migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockerKind {
    /// A safety bypass inside the unit.
    SafetyBypass,
    /// A state machine whose states are mostly unnamed.
    UnnamedStates,
    /// Documentation score below the floor.
    LowDocumentation,
}

/// A finding that must be resolved before migrating a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blocker {
    /// `critical` or `high`.
    pub severity: Severity,
    /// Blocker kind.
    pub kind: BlockerKind,
    /// Human-readable description.
    pub message: String,
}

/// Score of one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PouMigrationScore {
    /// Unit id.
    pub pou_id: String,
    /// Unit name.
    pub pou_name: SmolStr,
    /// Weighted score in `[0, 100]`.
    pub overall_score: f64,
    /// Per-dimension scores.
    pub dimension_scores: DimensionScores,
    /// Grade of `overall_score`.
    pub grade: Grade,
    /// Findings that block migration.
    pub blockers: Vec<Blocker>,
    /// Findings that do not block migration.
    pub warnings: Vec<String>,
    /// Improvements that would raise the score.
    pub suggestions: Vec<String>,
}

/// One entry of the migration plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationStep {
    /// 1-based position in the plan.
    pub position: usize,
    /// Unit id.
    pub pou_id: String,
    /// Unit name.
    pub pou_name: SmolStr,
    /// Weighted score.
    pub overall_score: f64,
    /// Number of blockers.
    pub blocker_count: usize,
}

/// Estimated hours for one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PouEffort {
    /// Unit id.
    pub pou_id: String,
    /// Unit name.
    pub pou_name: SmolStr,
    /// Rounded hours.
    pub hours: u32,
}

/// Effort estimate for the whole project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimatedEffort {
    /// Sum of the per-unit hours.
    pub total_hours: u32,
    /// Hours per unit, in input order.
    pub per_pou: Vec<PouEffort>,
    /// `min(0.9, mean score / 100)`.
    pub confidence: f64,
}

/// Kind of a project-level risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RiskKind {
    /// Safety bypasses exist somewhere in the project.
    SafetyBypass,
    /// State machines with deadlock states.
    StateMachineDeadlock,
    /// Documentation is thin across the project.
    LowDocumentation,
    /// Units graded F.
    FailingUnits,
}

/// A project-level risk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRisk {
    /// Risk kind.
    pub kind: RiskKind,
    /// Severity.
    pub severity: Severity,
    /// What was found.
    pub description: String,
    /// Names of the affected units or signals.
    pub affected: Vec<SmolStr>,
    /// What to do about it.
    pub mitigation: String,
}

/// Result of [`score`](crate::score).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationReport {
    /// Mean of the unit scores, `0` without units.
    pub overall_score: f64,
    /// Grade of `overall_score`.
    pub overall_grade: Grade,
    /// Unit scores in input order.
    pub pou_scores: Vec<PouMigrationScore>,
    /// Units by ascending blocker count, then descending score.
    pub migration_order: Vec<MigrationStep>,
    /// Project-level risks.
    pub risks: Vec<ProjectRisk>,
    /// Effort estimate.
    pub estimated_effort: EstimatedEffort,
}
